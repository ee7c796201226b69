//! model::schema
//!
//! Declarative entity options and the resolved, immutable schema.
//!
//! # Design
//!
//! [`ModelOptions`] is a builder the caller fills in. [`ModelFactory`]
//! validates it and resolves the options left unset from the configuration,
//! producing a [`Schema`] that every instance of the class shares.
//!
//! Behavior that JavaScript-style ORMs attach as ad hoc properties (computed
//! properties, instance methods, static methods, lifecycle hooks) lives in
//! closure tables here and is resolved by name through
//! [`Model::compute`], [`Model::call`] and [`ModelClass::call_static`].
//!
//! [`ModelFactory`]: super::ModelFactory
//! [`Model::compute`]: super::Model::compute
//! [`Model::call`]: super::Model::call
//! [`ModelClass::call_static`]: super::ModelClass::call_static
//!
//! # Example
//!
//! ```
//! use serde_json::json;
//! use truck::model::ModelOptions;
//!
//! let options = ModelOptions::new("section")
//!     .fields(["name", "type"])
//!     .default("type", json!("list"))
//!     .dynamic("label", |m| json!(format!("{} section", m.get("name").unwrap_or_default())));
//!
//! assert_eq!(options.name(), "section");
//! ```

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use super::factory::ModelClass;
use super::instance::Model;

/// Computed value in the context of an instance.
pub type Computed = Arc<dyn Fn(&Model) -> Value + Send + Sync>;

/// Instance method taking positional arguments.
pub type InstanceMethod = Arc<dyn Fn(&Model, &[Value]) -> Value + Send + Sync>;

/// Static method taking positional arguments.
pub type StaticMethod = Arc<dyn Fn(&ModelClass, &[Value]) -> Value + Send + Sync>;

/// Lifecycle hook.
pub type Hook = Arc<dyn Fn(&Model) + Send + Sync>;

/// Default primary key name.
pub const DEFAULT_KEY: &str = "id";

/// Date fields every model has unless overridden.
pub const DEFAULT_DATES: [&str; 2] = ["created_at", "updated_at"];

/// Default value provider for a field.
#[derive(Clone)]
pub enum DefaultValue {
    /// Cloned into each new instance.
    Literal(Value),
    /// Evaluated with the instance under construction.
    Computed(Computed),
}

impl DefaultValue {
    /// Produce the default for `model`.
    pub fn resolve(&self, model: &Model) -> Value {
        match self {
            DefaultValue::Literal(value) => value.clone(),
            DefaultValue::Computed(f) => f(model),
        }
    }
}

impl fmt::Debug for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefaultValue::Literal(value) => f.debug_tuple("Literal").field(value).finish(),
            DefaultValue::Computed(_) => f.write_str("Computed(..)"),
        }
    }
}

/// Lifecycle events a schema can hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Event {
    /// After every construction, once hydration completes.
    DidBoot,
    /// Once a deletion is considered committed.
    DidDelete,
}

/// Per-relation options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelationOptions {
    /// Omit the parent's path from the child's URL.
    pub drop_parent_api_path: bool,
}

/// A declared relation: the child class and its options.
#[derive(Debug, Clone)]
pub struct RelationDef {
    pub model: ModelClass,
    pub options: RelationOptions,
}

/// Caller-facing schema builder.
///
/// Options left as `None` are resolved from the configuration by the
/// factory.
#[derive(Clone)]
pub struct ModelOptions {
    pub(crate) name: String,
    pub(crate) api: Option<String>,
    pub(crate) key: String,
    pub(crate) drop_key: Option<bool>,
    pub(crate) drop_parent_api_path: Option<bool>,
    pub(crate) fields: Vec<String>,
    pub(crate) dates: Vec<String>,
    pub(crate) defaults: BTreeMap<String, DefaultValue>,
    pub(crate) dynamic: BTreeMap<String, Computed>,
    pub(crate) methods: BTreeMap<String, InstanceMethod>,
    pub(crate) static_methods: BTreeMap<String, StaticMethod>,
    pub(crate) has_many: BTreeMap<String, RelationDef>,
    pub(crate) has_one: BTreeMap<String, RelationDef>,
    pub(crate) events: HashMap<Event, Vec<Hook>>,
}

impl ModelOptions {
    /// Options for a model named `name` with every other option defaulted.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            api: None,
            key: DEFAULT_KEY.to_string(),
            drop_key: None,
            drop_parent_api_path: None,
            fields: Vec::new(),
            dates: DEFAULT_DATES.iter().map(|d| d.to_string()).collect(),
            defaults: BTreeMap::new(),
            dynamic: BTreeMap::new(),
            methods: BTreeMap::new(),
            static_methods: BTreeMap::new(),
            has_many: BTreeMap::new(),
            has_one: BTreeMap::new(),
            events: HashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Base URL for this model, overriding the configured one.
    pub fn api(mut self, api: impl Into<String>) -> Self {
        self.api = Some(api.into());
        self
    }

    /// Primary key field name.
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    /// Leave the primary key out of this model's URLs.
    pub fn drop_key(mut self, drop: bool) -> Self {
        self.drop_key = Some(drop);
        self
    }

    /// Leave the parent's path out of this model's URLs.
    pub fn drop_parent_api_path(mut self, drop: bool) -> Self {
        self.drop_parent_api_path = Some(drop);
        self
    }

    /// Replace the scalar field list.
    pub fn fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Add one scalar field.
    pub fn field(mut self, field: impl Into<String>) -> Self {
        self.fields.push(field.into());
        self
    }

    /// Replace the date field list.
    pub fn dates<I, S>(mut self, dates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dates = dates.into_iter().map(Into::into).collect();
        self
    }

    /// Literal default for a field.
    pub fn default(mut self, field: impl Into<String>, value: Value) -> Self {
        self.defaults
            .insert(field.into(), DefaultValue::Literal(value));
        self
    }

    /// Computed default for a field.
    pub fn default_with<F>(mut self, field: impl Into<String>, f: F) -> Self
    where
        F: Fn(&Model) -> Value + Send + Sync + 'static,
    {
        self.defaults
            .insert(field.into(), DefaultValue::Computed(Arc::new(f)));
        self
    }

    /// Dynamic (computed) property.
    pub fn dynamic<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&Model) -> Value + Send + Sync + 'static,
    {
        self.dynamic.insert(name.into(), Arc::new(f));
        self
    }

    /// Instance method.
    pub fn method<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&Model, &[Value]) -> Value + Send + Sync + 'static,
    {
        self.methods.insert(name.into(), Arc::new(f));
        self
    }

    /// Static method.
    pub fn static_method<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&ModelClass, &[Value]) -> Value + Send + Sync + 'static,
    {
        self.static_methods.insert(name.into(), Arc::new(f));
        self
    }

    /// Has-many relation with default options.
    pub fn has_many(self, name: impl Into<String>, model: &ModelClass) -> Self {
        self.has_many_with(name, model, RelationOptions::default())
    }

    pub fn has_many_with(
        mut self,
        name: impl Into<String>,
        model: &ModelClass,
        options: RelationOptions,
    ) -> Self {
        self.has_many.insert(
            name.into(),
            RelationDef {
                model: model.clone(),
                options,
            },
        );
        self
    }

    /// Has-one relation with default options.
    pub fn has_one(self, name: impl Into<String>, model: &ModelClass) -> Self {
        self.has_one_with(name, model, RelationOptions::default())
    }

    pub fn has_one_with(
        mut self,
        name: impl Into<String>,
        model: &ModelClass,
        options: RelationOptions,
    ) -> Self {
        self.has_one.insert(
            name.into(),
            RelationDef {
                model: model.clone(),
                options,
            },
        );
        self
    }

    /// Register a lifecycle hook. Hooks for one event run in registration order.
    pub fn on<F>(mut self, event: Event, hook: F) -> Self
    where
        F: Fn(&Model) + Send + Sync + 'static,
    {
        self.events.entry(event).or_default().push(Arc::new(hook));
        self
    }
}

impl fmt::Debug for ModelOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelOptions")
            .field("name", &self.name)
            .field("api", &self.api)
            .field("key", &self.key)
            .field("fields", &self.fields)
            .field("dates", &self.dates)
            .field("has_many", &self.has_many.keys().collect::<Vec<_>>())
            .field("has_one", &self.has_one.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

/// Resolved entity schema, shared by every instance of a class.
pub struct Schema {
    pub(crate) name: String,
    pub(crate) api: String,
    pub(crate) key: String,
    pub(crate) drop_key: bool,
    pub(crate) drop_parent_api_path: bool,
    pub(crate) fields: Vec<String>,
    pub(crate) dates: Vec<String>,
    pub(crate) defaults: BTreeMap<String, DefaultValue>,
    pub(crate) dynamic: BTreeMap<String, Computed>,
    pub(crate) methods: BTreeMap<String, InstanceMethod>,
    pub(crate) static_methods: BTreeMap<String, StaticMethod>,
    pub(crate) has_many: BTreeMap<String, RelationDef>,
    pub(crate) has_one: BTreeMap<String, RelationDef>,
    pub(crate) events: HashMap<Event, Vec<Hook>>,
}

impl Schema {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn api(&self) -> &str {
        &self.api
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn drop_key(&self) -> bool {
        self.drop_key
    }

    pub fn drop_parent_api_path(&self) -> bool {
        self.drop_parent_api_path
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn dates(&self) -> &[String] {
        &self.dates
    }

    pub fn is_field(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f == name)
    }

    pub fn is_date(&self, name: &str) -> bool {
        self.dates.iter().any(|d| d == name)
    }

    pub fn default_for(&self, field: &str) -> Option<&DefaultValue> {
        self.defaults.get(field)
    }

    pub fn dynamic(&self, name: &str) -> Option<&Computed> {
        self.dynamic.get(name)
    }

    pub fn method(&self, name: &str) -> Option<&InstanceMethod> {
        self.methods.get(name)
    }

    pub fn static_method(&self, name: &str) -> Option<&StaticMethod> {
        self.static_methods.get(name)
    }

    pub fn has_many(&self) -> &BTreeMap<String, RelationDef> {
        &self.has_many
    }

    pub fn has_one(&self) -> &BTreeMap<String, RelationDef> {
        &self.has_one
    }

    /// Hooks registered for `event`, in registration order.
    pub fn hooks(&self, event: Event) -> &[Hook] {
        self.events.get(&event).map(Vec::as_slice).unwrap_or(&[])
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("name", &self.name)
            .field("api", &self.api)
            .field("key", &self.key)
            .field("drop_key", &self.drop_key)
            .field("drop_parent_api_path", &self.drop_parent_api_path)
            .field("fields", &self.fields)
            .field("dates", &self.dates)
            .field("defaults", &self.defaults)
            .field("dynamic", &self.dynamic.keys().collect::<Vec<_>>())
            .field("methods", &self.methods.keys().collect::<Vec<_>>())
            .field("static_methods", &self.static_methods.keys().collect::<Vec<_>>())
            .field("has_many", &self.has_many.keys().collect::<Vec<_>>())
            .field("has_one", &self.has_one.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn new_options_carry_defaults() {
        let options = ModelOptions::new("resume");
        assert_eq!(options.key, "id");
        assert_eq!(options.dates, vec!["created_at", "updated_at"]);
        assert!(options.fields.is_empty());
        assert!(options.api.is_none());
        assert!(options.drop_key.is_none());
        assert!(options.events.is_empty());
    }

    #[test]
    fn builder_accumulates() {
        let options = ModelOptions::new("section")
            .fields(["name"])
            .field("type")
            .default("type", json!("list"))
            .dates(Vec::<String>::new())
            .key("uuid")
            .drop_key(true)
            .on(Event::DidBoot, |_| {})
            .on(Event::DidBoot, |_| {});

        assert_eq!(options.fields, vec!["name", "type"]);
        assert!(options.dates.is_empty());
        assert_eq!(options.key, "uuid");
        assert_eq!(options.drop_key, Some(true));
        assert_eq!(options.events[&Event::DidBoot].len(), 2);
        assert!(matches!(
            options.defaults.get("type"),
            Some(DefaultValue::Literal(v)) if *v == json!("list")
        ));
    }

    #[test]
    fn literal_default_debug() {
        let rendered = format!("{:?}", DefaultValue::Literal(json!(0)));
        assert_eq!(rendered, "Literal(Number(0))");
    }
}
