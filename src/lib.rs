//! Truck - client-side object-relational mapping for JSON REST APIs
//!
//! Truck turns plain JSON coming from a REST backend into model instances
//! with typed fields, dates, defaults and nested relations, and persists
//! them back with conventional URLs (`/resume/1/section/2`).
//!
//! # Architecture
//!
//! - [`config`] - Explicit configuration value and TOML loading
//! - [`network`] - Transport trait, HTTP and mock transports, request layer
//! - [`model`] - Schemas, model classes, instances, collections, relations
//! - [`util`] - URL joining, loose comparison and logging helpers
//! - [`cli`] - The `truck` command-line tool
//!
//! [`Truck`] ties configuration and network layer together and builds
//! model classes.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use serde_json::json;
//! use truck::config::TruckConfig;
//! use truck::model::ModelOptions;
//! use truck::network::mock::MockTransport;
//! use truck::Truck;
//!
//! let truck = Truck::with_transport(TruckConfig::default(), Arc::new(MockTransport::new()));
//! let section = truck
//!     .define(ModelOptions::new("section").fields(["name", "type"]))
//!     .unwrap();
//!
//! let experience = section.make(&json!({ "id": 4, "name": "Experience" }));
//! assert_eq!(experience.get("name"), Some(json!("Experience")));
//! assert_eq!(experience.api_path(), "/section/4");
//! ```
//!
//! # Invariants
//!
//! 1. An instance's key is `null` until the backend assigns one
//! 2. Children refer to their owner weakly; dropping the owner frees the graph
//! 3. No lock is held across a network request or a user callback

pub mod cli;
pub mod config;
pub mod model;
pub mod network;
mod truck;
pub mod util;

pub use truck::Truck;
