//! model::instance
//!
//! A single entity instance: hydration, serialization, URL derivation and
//! network operations.
//!
//! # Design
//!
//! [`Model`] is a shared handle. Cloning it clones the handle, not the
//! entity; [`Model::clone_with`] makes a copy. State sits behind
//! `parking_lot` locks that are released before any `.await` and before
//! user callbacks (defaults, hooks, dynamic properties) run, so callbacks
//! may read the instance they are given.
//!
//! Relation wrappers are created once, when the instance is constructed,
//! and refilled in place on every hydration from the matching key of the
//! data. A missing key or `null` empties the relation.
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
//! # tokio_test::block_on(async {
//! let truck = Truck::with_transport(TruckConfig::default(), Arc::new(MockTransport::new()));
//! let resume = truck.define(ModelOptions::new("resume").fields(["name"])).unwrap();
//!
//! let model = resume.create();
//! model.set("name", "Alex");
//! assert_eq!(model.api_path(), "/resume");
//!
//! model.set("id", 1);
//! model.save().await.unwrap();
//! assert_eq!(model.api_path(), "/resume/1");
//! # });
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Weak};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde_json::{Map, Value};
use uuid::Uuid;

use super::collection::{ModelCollection, WeakCollection};
use super::dates::{format_date, parse_date};
use super::error::ModelError;
use super::factory::ModelClass;
use super::relation::{HasManyRelation, HasOneRelation, RelationRef};
use super::schema::{Event, RelationOptions, Schema};
use crate::network::{Method, RequestConfig};
use crate::util::{is_blank, is_empty_body, join_url, key_segment, log};

/// Options for [`Model::to_object_with`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectOptions {
    /// Embed relation data (has-many as arrays, has-one as objects).
    pub include_relations: bool,
}

impl Default for ObjectOptions {
    fn default() -> Self {
        Self {
            include_relations: true,
        }
    }
}

/// Options for [`Model::save_with`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SaveOptions {
    /// Embed relation data in the request body.
    pub include_relations: bool,
    /// Extra properties merged into the request body.
    pub append: Map<String, Value>,
}

/// Options for [`Model::delete_with`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeleteOptions {
    /// Remove from the owner and fire `DidDelete` before the request settles.
    pub optimistic: bool,
}

/// Options for [`Model::clone_with`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CloneOptions {
    /// Carry the relation and collection back-references over.
    pub preserve_relations: bool,
    /// Carry the primary key over.
    pub preserve_key: bool,
    /// Force the copy offline. A copy of an offline instance is always offline.
    pub offline: bool,
}

impl Default for CloneOptions {
    fn default() -> Self {
        Self {
            preserve_relations: true,
            preserve_key: true,
            offline: false,
        }
    }
}

/// Body of an [`Model::update`] call.
#[derive(Debug, Clone, PartialEq)]
pub enum Patch {
    /// Send this object as is.
    Object(Map<String, Value>),
    /// Send the current values of these fields.
    Fields(Vec<String>),
}

impl From<Map<String, Value>> for Patch {
    fn from(map: Map<String, Value>) -> Self {
        Patch::Object(map)
    }
}

impl From<Vec<String>> for Patch {
    fn from(fields: Vec<String>) -> Self {
        Patch::Fields(fields)
    }
}

impl From<Vec<&str>> for Patch {
    fn from(fields: Vec<&str>) -> Self {
        Patch::Fields(fields.into_iter().map(str::to_string).collect())
    }
}

impl<const N: usize> From<[&str; N]> for Patch {
    fn from(fields: [&str; N]) -> Self {
        Patch::Fields(fields.iter().map(|f| f.to_string()).collect())
    }
}

/// Back-references and flags that are not part of the entity's data.
#[derive(Debug, Clone, Default)]
pub(crate) struct Meta {
    pub(crate) relation: RelationRef,
    pub(crate) collection: Option<WeakCollection>,
    pub(crate) offline: bool,
}

#[derive(Debug, Default)]
struct State {
    key: Value,
    fields: Map<String, Value>,
    dates: BTreeMap<String, Option<DateTime<Utc>>>,
}

pub(crate) struct ModelInner {
    class: ModelClass,
    local_id: Uuid,
    state: RwLock<State>,
    meta: RwLock<Meta>,
    has_many: BTreeMap<String, HasManyRelation>,
    has_one: BTreeMap<String, HasOneRelation>,
}

/// Handle to an entity instance.
#[derive(Clone)]
pub struct Model {
    inner: Arc<ModelInner>,
}

/// Non-owning reference to a [`Model`].
#[derive(Clone, Default)]
pub struct WeakModel(Weak<ModelInner>);

impl WeakModel {
    pub fn upgrade(&self) -> Option<Model> {
        self.0.upgrade().map(|inner| Model { inner })
    }
}

impl fmt::Debug for WeakModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("WeakModel(..)")
    }
}

impl Model {
    /// Build an instance and run its `DidBoot` hooks.
    ///
    /// `Null` data constructs an empty, new instance.
    pub(crate) fn construct(class: &ModelClass, data: &Value, meta: Meta) -> Model {
        let schema = class.schema();
        let inner = Arc::new_cyclic(|weak: &Weak<ModelInner>| {
            let parent = WeakModel(weak.clone());
            ModelInner {
                class: class.clone(),
                local_id: Uuid::new_v4(),
                state: RwLock::new(State::default()),
                meta: RwLock::new(meta),
                has_many: schema
                    .has_many()
                    .iter()
                    .map(|(name, def)| {
                        (name.clone(), HasManyRelation::build(name, def, parent.clone()))
                    })
                    .collect(),
                has_one: schema
                    .has_one()
                    .iter()
                    .map(|(name, def)| {
                        (name.clone(), HasOneRelation::build(name, def, parent.clone()))
                    })
                    .collect(),
            }
        });

        let model = Model { inner };
        match data {
            Value::Null => model.set_data(&Value::Object(Map::new())),
            data => model.set_data(data),
        }

        for hook in model.schema().hooks(Event::DidBoot) {
            hook(&model);
        }
        model
    }

    pub fn class(&self) -> &ModelClass {
        &self.inner.class
    }

    pub fn schema(&self) -> &Schema {
        self.inner.class.schema()
    }

    /// Process-unique identifier, independent of the primary key.
    pub fn local_id(&self) -> Uuid {
        self.inner.local_id
    }

    pub fn downgrade(&self) -> WeakModel {
        WeakModel(Arc::downgrade(&self.inner))
    }

    pub fn is_offline(&self) -> bool {
        self.inner.meta.read().offline
    }

    pub(crate) fn set_meta(&self, meta: Meta) {
        *self.inner.meta.write() = meta;
    }

    pub(crate) fn relation_ref(&self) -> RelationRef {
        self.inner.meta.read().relation.clone()
    }

    /// The collection this instance was placed in, if it is still alive.
    pub fn collection(&self) -> Option<ModelCollection> {
        let weak = self.inner.meta.read().collection.clone();
        weak.and_then(|c| c.upgrade())
    }

    // ------------------------------------------------------------------
    // Hydration
    // ------------------------------------------------------------------

    /// Re-hydrate in place from a data object.
    pub fn fill(&self, data: &Value) {
        self.set_data(data);
    }

    /// Re-hydrate in place from another instance's serialized form.
    pub fn fill_from(&self, other: &Model) {
        self.set_data(&other.to_object());
    }

    pub(crate) fn set_data(&self, data: &Value) {
        let schema = self.schema();
        let empty = Map::new();
        let object = match data {
            Value::Object(map) => map,
            other => {
                log(
                    "Model",
                    "setData",
                    format!("Expected an object for {} but got {}.", schema.name(), other),
                );
                &empty
            }
        };

        let key = object
            .get(schema.key())
            .filter(|v| !is_blank(v))
            .cloned()
            .unwrap_or(Value::Null);
        let is_new = key.is_null();
        self.inner.state.write().key = key;

        // Each field is stored as soon as it is resolved so computed
        // defaults see the fields declared before them.
        for field in schema.fields() {
            let incoming = object.get(field);
            let value = if is_new {
                match incoming {
                    Some(v) if !v.is_null() => v.clone(),
                    _ => schema
                        .default_for(field)
                        .map(|default| default.resolve(self))
                        .unwrap_or(Value::Null),
                }
            } else {
                match incoming {
                    Some(v) if !is_blank(v) => v.clone(),
                    _ => Value::Null,
                }
            };
            self.inner
                .state
                .write()
                .fields
                .insert(field.clone(), value);
        }

        let mut dates = BTreeMap::new();
        for name in schema.dates() {
            let parsed = match object.get(name) {
                Some(Value::String(raw)) if !raw.is_empty() => {
                    let parsed = parse_date(raw);
                    if parsed.is_none() {
                        log(
                            "Model",
                            "setData",
                            format!("Could not parse date {} = {:?}.", name, raw),
                        );
                    }
                    parsed
                }
                _ => None,
            };
            dates.insert(name.clone(), parsed);
        }

        self.inner.state.write().dates = dates;

        for (name, relation) in &self.inner.has_many {
            relation.set_data(object.get(name).unwrap_or(&Value::Null));
        }
        for (name, relation) in &self.inner.has_one {
            relation.set_data(object.get(name).unwrap_or(&Value::Null));
        }
    }

    /// Hydrate from a response body, keeping local state when it is empty.
    fn absorb(&self, method: &str, response: &Value) {
        if is_empty_body(response) {
            log(
                "Model",
                method,
                format!("Empty response for {}, keeping local state.", self.schema().name()),
            );
            return;
        }
        self.set_data(response);
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    /// Primary key value; `Null` until the entity is persisted.
    pub fn key(&self) -> Value {
        self.inner.state.read().key.clone()
    }

    /// Key, field, date (formatted) or dynamic property by name.
    pub fn get(&self, name: &str) -> Option<Value> {
        let schema = self.schema();
        if name == schema.key() {
            return Some(self.key());
        }

        {
            let state = self.inner.state.read();
            if let Some(value) = state.fields.get(name) {
                return Some(value.clone());
            }
            if let Some(date) = state.dates.get(name) {
                return Some(date_value(date.as_ref()));
            }
        }

        self.compute(name)
    }

    /// Set the key, a field, or a date (strings are parsed).
    pub fn set(&self, name: &str, value: impl Into<Value>) {
        let value = value.into();
        let schema = self.schema();

        if name == schema.key() {
            self.inner.state.write().key = if is_blank(&value) { Value::Null } else { value };
        } else if schema.is_field(name) {
            self.inner
                .state
                .write()
                .fields
                .insert(name.to_string(), value);
        } else if schema.is_date(name) {
            let parsed = match &value {
                Value::String(raw) => parse_date(raw),
                _ => None,
            };
            self.inner
                .state
                .write()
                .dates
                .insert(name.to_string(), parsed);
        } else {
            log(
                "Model",
                "set",
                format!("Unknown field {} on {}.", name, schema.name()),
            );
        }
    }

    pub fn date(&self, name: &str) -> Option<DateTime<Utc>> {
        self.inner.state.read().dates.get(name).copied().flatten()
    }

    pub fn set_date(&self, name: &str, date: Option<DateTime<Utc>>) {
        if !self.schema().is_date(name) {
            log(
                "Model",
                "setDate",
                format!("Unknown date {} on {}.", name, self.schema().name()),
            );
            return;
        }
        self.inner
            .state
            .write()
            .dates
            .insert(name.to_string(), date);
    }

    pub fn has_many(&self, name: &str) -> Option<&HasManyRelation> {
        self.inner.has_many.get(name)
    }

    pub fn has_one(&self, name: &str) -> Option<&HasOneRelation> {
        self.inner.has_one.get(name)
    }

    /// Evaluate a dynamic property.
    pub fn compute(&self, name: &str) -> Option<Value> {
        self.schema().dynamic(name).map(|f| f(self))
    }

    /// Invoke an instance method.
    pub fn call(&self, name: &str, args: &[Value]) -> Option<Value> {
        self.schema().method(name).map(|f| f(self, args))
    }

    // ------------------------------------------------------------------
    // Serialization and comparison
    // ------------------------------------------------------------------

    /// Serialized form including relations.
    pub fn to_object(&self) -> Value {
        self.to_object_with(ObjectOptions::default())
    }

    pub fn to_object_with(&self, options: ObjectOptions) -> Value {
        Value::Object(self.serialize(options.include_relations))
    }

    fn serialize(&self, include_relations: bool) -> Map<String, Value> {
        let schema = self.schema();
        let mut map = Map::new();

        {
            let state = self.inner.state.read();
            map.insert(schema.key().to_string(), state.key.clone());
            for field in schema.fields() {
                let value = state.fields.get(field).cloned().unwrap_or(Value::Null);
                map.insert(field.clone(), value);
            }
            for name in schema.dates() {
                let date = state.dates.get(name).and_then(Option::as_ref);
                map.insert(name.clone(), date_value(date));
            }
        }

        if include_relations {
            for (name, relation) in &self.inner.has_many {
                map.insert(name.clone(), relation.collection().to_value());
            }
            for (name, relation) in &self.inner.has_one {
                let value = relation.get().map(|m| m.to_object()).unwrap_or(Value::Null);
                map.insert(name.clone(), value);
            }
        }

        map
    }

    /// Deep equality of the serialized forms.
    pub fn equals(&self, other: &Model) -> bool {
        self.to_object() == other.to_object()
    }

    /// Identity: both handles refer to the same instance.
    pub fn is(&self, other: &Model) -> bool {
        self.inner.local_id == other.inner.local_id
    }

    /// A new instance of the same class carrying this one's data.
    pub fn clone_with(&self, options: CloneOptions) -> Model {
        let mut data = self.serialize(true);
        if !options.preserve_key {
            data.insert(self.schema().key().to_string(), Value::Null);
        }

        let meta = {
            let current = self.inner.meta.read();
            Meta {
                relation: if options.preserve_relations {
                    current.relation.clone()
                } else {
                    RelationRef::None
                },
                collection: if options.preserve_relations {
                    current.collection.clone()
                } else {
                    None
                },
                offline: options.offline || current.offline,
            }
        };

        Model::construct(self.class(), &Value::Object(data), meta)
    }

    /// A copy whose network operations resolve locally.
    pub fn clone_offline(&self) -> Model {
        self.clone_with(CloneOptions {
            offline: true,
            ..CloneOptions::default()
        })
    }

    // ------------------------------------------------------------------
    // Relations and URLs
    // ------------------------------------------------------------------

    /// The owning instance and the options of the relation linking to it.
    fn owner(&self) -> Option<(Model, RelationOptions)> {
        match self.relation_ref() {
            RelationRef::None => None,
            RelationRef::BelongsToOne(weak) => {
                let relation = weak.upgrade()?;
                Some((relation.parent()?, relation.options()))
            }
            RelationRef::BelongsToMany(weak) => {
                let relation = weak.upgrade()?;
                Some((relation.parent()?, relation.options()))
            }
        }
    }

    /// The instance that owns this one through a relation.
    pub fn parent(&self) -> Option<Model> {
        self.owner()
            .map(|(parent, _)| parent)
            .or_else(|| self.collection()?.parent())
    }

    /// Path of this instance relative to the API base, always starting with `/`.
    pub fn api_path(&self) -> String {
        let schema = self.schema();
        let mut parts: Vec<String> = Vec::with_capacity(3);

        if !schema.drop_parent_api_path() {
            if let Some((parent, options)) = self.owner() {
                if !options.drop_parent_api_path {
                    parts.push(parent.api_path());
                }
            }
        }

        parts.push(schema.name().to_string());

        if !schema.drop_key() {
            if let Some(segment) = key_segment(&self.key()) {
                parts.push(segment);
            }
        }

        let path = join_url(parts);
        if path.starts_with('/') {
            path
        } else {
            format!("/{}", path)
        }
    }

    /// Full URL: the API base joined with [`Model::api_path`].
    pub fn api_url(&self) -> String {
        join_url([self.schema().api(), self.api_path().as_str()])
    }

    fn request_config(&self) -> RequestConfig {
        RequestConfig::offline(self.is_offline())
    }

    // ------------------------------------------------------------------
    // Network operations
    // ------------------------------------------------------------------

    /// Persist with default options.
    pub async fn save(&self) -> Result<Model, ModelError> {
        self.save_with(SaveOptions::default()).await
    }

    /// Persist: POST when the instance has no key yet, PUT otherwise.
    ///
    /// After an update, an instance that lives in a collection replaces the
    /// collection entry with the same key.
    pub async fn save_with(&self, options: SaveOptions) -> Result<Model, ModelError> {
        let mut body = self.serialize(options.include_relations);
        body.extend(options.append);

        let updating = !self.key().is_null();
        let url = self.api_url();
        let network = self.class().network();
        let config = self.request_config();

        let response = if updating {
            network.put(&url, Some(Value::Object(body)), config).await?
        } else {
            network.post(&url, Some(Value::Object(body)), config).await?
        };

        self.absorb("save", &response);

        if updating {
            if let Some(collection) = self.collection() {
                collection.swap(self, None, None);
            }
        }

        Ok(self.clone())
    }

    /// PUT a partial update and re-hydrate from the response.
    ///
    /// An existing entity's fields missing from the response become null,
    /// exactly as with any other hydration.
    pub async fn update(&self, patch: impl Into<Patch>) -> Result<Model, ModelError> {
        let body: Map<String, Value> = match patch.into() {
            Patch::Object(map) => map,
            Patch::Fields(names) => names
                .into_iter()
                .map(|name| {
                    let value = self.get(&name).unwrap_or(Value::Null);
                    (name, value)
                })
                .collect(),
        };

        let response = self
            .class()
            .network()
            .put(&self.api_url(), Some(Value::Object(body)), self.request_config())
            .await?;

        self.absorb("update", &response);

        Ok(self.clone())
    }

    /// POST to `<own URL>/<suffix>` and hydrate from the response.
    pub async fn post(&self, suffix: &str, data: Option<Value>) -> Result<Model, ModelError> {
        let response = self.request(Method::Post, suffix, data).await?;
        self.absorb("post", &response);
        Ok(self.clone())
    }

    /// PUT to `<own URL>/<suffix>` and hydrate from the response.
    pub async fn put(&self, suffix: &str, data: Option<Value>) -> Result<Model, ModelError> {
        let response = self.request(Method::Put, suffix, data).await?;
        self.absorb("put", &response);
        Ok(self.clone())
    }

    /// POST to `<own URL>/<suffix>` and return the raw body, leaving the
    /// instance untouched.
    pub async fn post_immutable(
        &self,
        suffix: &str,
        data: Option<Value>,
    ) -> Result<Value, ModelError> {
        self.request(Method::Post, suffix, data).await
    }

    /// PUT to `<own URL>/<suffix>` and return the raw body.
    pub async fn put_immutable(
        &self,
        suffix: &str,
        data: Option<Value>,
    ) -> Result<Value, ModelError> {
        self.request(Method::Put, suffix, data).await
    }

    async fn request(
        &self,
        method: Method,
        suffix: &str,
        data: Option<Value>,
    ) -> Result<Value, ModelError> {
        let url = join_url([self.api_url().as_str(), suffix]);
        let network = self.class().network();
        let config = self.request_config();

        let body = match method {
            Method::Post => network.post(&url, data, config).await?,
            Method::Put => network.put(&url, data, config).await?,
            Method::Get => network.get(&url, config).await?,
            Method::Delete => network.delete(&url, config).await?,
        };
        Ok(body)
    }

    /// PUT `{key, value}` (merged with `extra`) to `<own URL>/sync`.
    ///
    /// `value` defaults to the current value of `key`. When a value is
    /// supplied, the local field takes the response's `key` property, or
    /// the supplied value when the response lacks it.
    pub async fn sync(
        &self,
        key: &str,
        value: Option<Value>,
        extra: Option<Map<String, Value>>,
    ) -> Result<Value, ModelError> {
        let explicit = value.is_some();
        let sent = value.unwrap_or_else(|| self.get(key).unwrap_or(Value::Null));

        let mut body = Map::new();
        body.insert("key".to_string(), Value::String(key.to_string()));
        body.insert("value".to_string(), sent.clone());
        if let Some(extra) = extra {
            body.extend(extra);
        }

        let response = self
            .request(Method::Put, "sync", Some(Value::Object(body)))
            .await?;

        if explicit {
            let updated = response.get(key).cloned().unwrap_or(sent);
            self.set(key, updated);
        }

        Ok(response)
    }

    /// DELETE with default options.
    pub fn delete(&self) -> impl Future<Output = Result<Model, ModelError>> + Send + 'static {
        self.delete_with(DeleteOptions::default())
    }

    /// DELETE against the instance URL.
    ///
    /// In optimistic mode the instance leaves its relation or collection
    /// and `DidDelete` fires when this method is called, before the
    /// returned future is polled. Otherwise both happen after the request
    /// succeeds.
    pub fn delete_with(
        &self,
        options: DeleteOptions,
    ) -> impl Future<Output = Result<Model, ModelError>> + Send + 'static {
        let model = self.clone();
        let url = self.api_url();
        let config = self.request_config();
        let network = self.class().network().clone();

        if options.optimistic {
            model.commit_delete();
        }

        async move {
            network
                .delete(&url, config)
                .await
                .map_err(ModelError::from)?;
            if !options.optimistic {
                model.commit_delete();
            }
            Ok::<Model, ModelError>(model)
        }
    }

    fn commit_delete(&self) {
        let collection = self.collection();

        match self.relation_ref() {
            RelationRef::BelongsToOne(weak) => {
                if let Some(relation) = weak.upgrade() {
                    relation.release(self);
                }
            }
            RelationRef::BelongsToMany(weak) => {
                if collection.is_none() {
                    if let Some(relation) = weak.upgrade() {
                        relation.collection().delete(self);
                    }
                }
            }
            RelationRef::None => {}
        }

        if let Some(collection) = collection {
            collection.delete(self);
        }

        for hook in self.schema().hooks(Event::DidDelete) {
            hook(self);
        }
    }
}

fn date_value(date: Option<&DateTime<Utc>>) -> Value {
    date.map(|d| Value::String(format_date(d)))
        .unwrap_or(Value::Null)
}

impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.read();
        f.debug_struct("Model")
            .field("class", &self.class().name())
            .field("local_id", &self.inner.local_id)
            .field("key", &state.key)
            .field("fields", &state.fields)
            .finish_non_exhaustive()
    }
}
