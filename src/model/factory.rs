//! model::factory
//!
//! Builds model classes from [`ModelOptions`].
//!
//! # Design
//!
//! [`ModelFactory::build`] validates the declaration and resolves options
//! left unset from the [`TruckConfig`]. The result is a [`ModelClass`]: a
//! cheap-to-clone handle holding the immutable [`Schema`], the configuration
//! it was built under, and the network layer its instances talk to.
//!
//! The class carries the static side of the model contract: construction,
//! `find`, `all`/`index`, local `collect`, and static methods.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use super::collection::ModelCollection;
use super::error::{ModelError, SchemaError};
use super::instance::{Meta, Model};
use super::schema::{ModelOptions, Schema};
use crate::config::TruckConfig;
use crate::network::{NetworkRequest, RequestConfig};
use crate::util::{is_empty_body, join_url, key_segment, log};

/// Builds [`ModelClass`]es.
pub struct ModelFactory;

impl ModelFactory {
    /// Validate `options` and build a class.
    ///
    /// `api`, `drop_key` and `drop_parent_api_path` fall back to the
    /// configuration when the options leave them unset.
    pub fn build(
        options: ModelOptions,
        config: Arc<TruckConfig>,
        network: NetworkRequest,
    ) -> Result<ModelClass, SchemaError> {
        Self::validate(&options)?;

        let ModelOptions {
            name,
            api,
            key,
            drop_key,
            drop_parent_api_path,
            fields,
            dates,
            defaults,
            dynamic,
            methods,
            static_methods,
            has_many,
            has_one,
            events,
        } = options;

        let schema = Schema {
            api: api.unwrap_or_else(|| config.api.clone()),
            drop_key: drop_key.unwrap_or(config.drop_key),
            drop_parent_api_path: drop_parent_api_path.unwrap_or(config.drop_parent_api_path),
            name,
            key,
            fields,
            dates,
            defaults,
            dynamic,
            methods,
            static_methods,
            has_many,
            has_one,
            events,
        };

        tracing::debug!(
            target: crate::util::LOG_TARGET,
            model = %schema.name,
            api = %schema.api,
            "built model class"
        );

        Ok(ModelClass {
            inner: Arc::new(ClassInner {
                schema,
                config,
                network,
            }),
        })
    }

    fn validate(options: &ModelOptions) -> Result<(), SchemaError> {
        let model = options.name.trim();
        if model.is_empty() {
            return Err(SchemaError::MissingName);
        }
        if options.key.trim().is_empty() {
            return Err(SchemaError::MissingKey(model.to_string()));
        }

        let mut seen: Vec<&str> = Vec::new();
        for field in options.fields.iter().chain(options.dates.iter()) {
            if *field == options.key {
                return Err(SchemaError::KeyDeclaredAsField {
                    model: model.to_string(),
                    key: field.clone(),
                });
            }
            if seen.contains(&field.as_str()) {
                return Err(SchemaError::DuplicateField {
                    model: model.to_string(),
                    field: field.clone(),
                });
            }
            seen.push(field);
        }

        for field in options.defaults.keys() {
            if !options.fields.contains(field) {
                return Err(SchemaError::DefaultForUnknownField {
                    model: model.to_string(),
                    field: field.clone(),
                });
            }
        }

        for relation in options.has_many.keys().chain(options.has_one.keys()) {
            let taken = seen.contains(&relation.as_str()) || *relation == options.key;
            if taken {
                return Err(SchemaError::RelationCollision {
                    model: model.to_string(),
                    relation: relation.clone(),
                });
            }
            seen.push(relation);
        }

        Ok(())
    }
}

/// A built model class.
///
/// Clones share the same schema; two handles are equal when they come from
/// the same [`ModelFactory::build`] call.
#[derive(Clone)]
pub struct ModelClass {
    inner: Arc<ClassInner>,
}

struct ClassInner {
    schema: Schema,
    config: Arc<TruckConfig>,
    network: NetworkRequest,
}

impl ModelClass {
    pub fn schema(&self) -> &Schema {
        &self.inner.schema
    }

    pub fn name(&self) -> &str {
        &self.inner.schema.name
    }

    /// The configuration this class was built under.
    pub fn config(&self) -> &Arc<TruckConfig> {
        &self.inner.config
    }

    pub fn network(&self) -> &NetworkRequest {
        &self.inner.network
    }

    /// Free-form configuration value.
    pub fn setting(&self, key: &str) -> Option<&Value> {
        self.inner.config.settings.get(key)
    }

    /// A new, empty instance with defaults applied.
    pub fn create(&self) -> Model {
        Model::construct(self, &Value::Null, Meta::default())
    }

    /// An instance hydrated from `data`.
    pub fn make(&self, data: &Value) -> Model {
        Model::construct(self, data, Meta::default())
    }

    /// A collection built locally from `data`, without a network call.
    pub fn collect(&self, data: &[Value]) -> ModelCollection {
        let collection = ModelCollection::standalone(self);
        collection.set_data(&Value::Array(data.to_vec()));
        collection
    }

    /// Fetch one entity by primary key.
    ///
    /// An empty body (null, empty string or `false`) resolves to `None`.
    pub async fn find(&self, id: impl Into<Value>) -> Result<Option<Model>, ModelError> {
        let id = id.into();
        let Some(segment) = key_segment(&id) else {
            log("Model", "find", format!("Empty key given for {}.", self.name()));
            return Ok(None);
        };

        let url = join_url([self.collection_url(), segment]);
        let body = self
            .network()
            .get(&url, RequestConfig::default())
            .await?;

        if is_empty_body(&body) {
            log(
                "Model",
                "find",
                format!("No {} found for key {}.", self.name(), id),
            );
            return Ok(None);
        }

        Ok(Some(self.make(&body)))
    }

    /// Fetch every entity.
    pub async fn all(&self) -> Result<ModelCollection, ModelError> {
        let body = self
            .network()
            .get(&self.collection_url(), RequestConfig::default())
            .await?;

        match body {
            Value::Array(_) => {
                let collection = ModelCollection::standalone(self);
                collection.set_data(&body);
                Ok(collection)
            }
            other => Err(ModelError::InvalidData(format!(
                "expected an array of {} but got {}",
                self.name(),
                json_kind(&other)
            ))),
        }
    }

    /// Alias for [`ModelClass::all`].
    pub async fn index(&self) -> Result<ModelCollection, ModelError> {
        self.all().await
    }

    /// Invoke a static method; `None` if it is not declared.
    pub fn call_static(&self, name: &str, args: &[Value]) -> Option<Value> {
        self.schema().static_method(name).map(|f| f(self, args))
    }

    /// Whether both handles refer to the same class.
    pub fn ptr_eq(&self, other: &ModelClass) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// `<api>/<name>`
    pub fn collection_url(&self) -> String {
        join_url([self.schema().api(), format!("/{}", self.name()).as_str()])
    }
}

impl PartialEq for ModelClass {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for ModelClass {}

impl fmt::Debug for ModelClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelClass")
            .field("name", &self.name())
            .field("api", &self.schema().api())
            .finish_non_exhaustive()
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
