//! network
//!
//! Transport abstraction for the REST backend.
//!
//! # Architecture
//!
//! The model layer never talks to an HTTP client directly. It goes through
//! [`NetworkRequest`], which adds default headers and the offline
//! short-circuit, and hands requests to a [`Transport`] implementation.
//!
//! # Modules
//!
//! - `traits`: Core `Transport` trait, [`Request`] and [`TransportError`]
//! - `request`: [`NetworkRequest`] and [`RequestConfig`]
//! - [`http`]: reqwest-backed transport
//! - [`mock`]: Mock implementation for deterministic testing

pub mod http;
pub mod mock;
mod request;
mod traits;

pub use http::HttpTransport;
pub use request::{NetworkRequest, RequestConfig, DEFAULT_ACCEPT};
pub use traits::*;
