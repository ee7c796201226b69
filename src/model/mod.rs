//! model
//!
//! The object-relational mapping layer.
//!
//! # Architecture
//!
//! A [`ModelOptions`] declaration goes through [`ModelFactory::build`] and
//! becomes a [`ModelClass`]. Instances ([`Model`]) are hydrated from JSON,
//! serialize back to JSON, derive their REST URLs from the object graph,
//! and persist themselves through the class's
//! [`NetworkRequest`](crate::network::NetworkRequest).
//!
//! Relations wrap either one child ([`HasOneRelation`]) or a
//! [`ModelCollection`] ([`HasManyRelation`]). Children refer back to their
//! owner weakly, through [`RelationRef`].
//!
//! # Modules
//!
//! - `schema`: [`ModelOptions`] builder and the resolved [`Schema`]
//! - `factory`: [`ModelFactory`] and [`ModelClass`]
//! - `instance`: [`Model`] and its operation options
//! - `collection`: [`ModelCollection`]
//! - `relation`: [`HasManyRelation`], [`HasOneRelation`], [`RelationRef`]
//! - [`dates`]: date parsing and formatting
//! - `error`: [`ModelError`] and [`SchemaError`]

mod collection;
pub mod dates;
mod error;
mod factory;
mod instance;
mod relation;
mod schema;

pub use collection::{ModelCollection, WeakCollection};
pub use error::{ModelError, SchemaError};
pub use factory::{ModelClass, ModelFactory};
pub use instance::{
    CloneOptions, DeleteOptions, Model, ObjectOptions, Patch, SaveOptions, WeakModel,
};
pub use relation::{HasManyRelation, HasOneRelation, RelationRef, WeakHasMany, WeakHasOne};
pub use schema::{
    Computed, DefaultValue, Event, Hook, InstanceMethod, ModelOptions, RelationDef,
    RelationOptions, Schema, StaticMethod, DEFAULT_DATES, DEFAULT_KEY,
};
