//! model::relation
//!
//! Relation wrappers binding a parent instance to its children.
//!
//! # Ownership
//!
//! The parent owns its wrappers; wrappers hold the parent weakly, and
//! children hold the wrapper that owns them weakly through
//! [`RelationRef`]. Dropping the last handle to a parent frees the whole
//! subtree even though every child can still walk up to it while it lives.

use std::fmt;
use std::future::Future;
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use serde_json::{Map, Value};

use super::collection::ModelCollection;
use super::error::ModelError;
use super::factory::ModelClass;
use super::instance::{DeleteOptions, Meta, Model, Patch, SaveOptions, WeakModel};
use super::schema::{RelationDef, RelationOptions};
use crate::util::{is_blank, loose_eq, log};

/// A child's back-reference to the relation that owns it.
#[derive(Debug, Clone, Default)]
pub enum RelationRef {
    /// Not owned through a relation.
    #[default]
    None,
    /// Held by a has-one relation.
    BelongsToOne(WeakHasOne),
    /// Member of a has-many relation's collection.
    BelongsToMany(WeakHasMany),
}

// ----------------------------------------------------------------------
// HasMany
// ----------------------------------------------------------------------

/// A parent's collection of children.
#[derive(Clone)]
pub struct HasManyRelation {
    inner: Arc<HasManyInner>,
}

pub(crate) struct HasManyInner {
    name: String,
    parent: WeakModel,
    options: RelationOptions,
    collection: ModelCollection,
}

/// Non-owning reference to a [`HasManyRelation`].
#[derive(Clone)]
pub struct WeakHasMany(Weak<HasManyInner>);

impl WeakHasMany {
    pub fn upgrade(&self) -> Option<HasManyRelation> {
        self.0.upgrade().map(|inner| HasManyRelation { inner })
    }
}

impl fmt::Debug for WeakHasMany {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("WeakHasMany(..)")
    }
}

impl HasManyRelation {
    pub(crate) fn build(name: &str, def: &RelationDef, parent: WeakModel) -> Self {
        let inner = Arc::new_cyclic(|weak: &Weak<HasManyInner>| HasManyInner {
            name: name.to_string(),
            parent: parent.clone(),
            options: def.options,
            collection: ModelCollection::owned(&def.model, parent, WeakHasMany(weak.clone())),
        });
        Self { inner }
    }

    pub(crate) fn set_data(&self, data: &Value) {
        self.inner.collection.set_data(data);
    }

    pub fn downgrade(&self) -> WeakHasMany {
        WeakHasMany(Arc::downgrade(&self.inner))
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn collection(&self) -> &ModelCollection {
        &self.inner.collection
    }

    pub fn parent(&self) -> Option<Model> {
        self.inner.parent.upgrade()
    }

    pub fn options(&self) -> RelationOptions {
        self.inner.options
    }

    pub fn class(&self) -> &ModelClass {
        self.inner.collection.class()
    }

    pub fn all(&self) -> Vec<Model> {
        self.inner.collection.all()
    }

    pub fn get(&self, index: usize) -> Option<Model> {
        self.inner.collection.get(index)
    }

    pub fn find(&self, key: impl Into<Value>) -> Option<Model> {
        self.inner.collection.find(key)
    }

    pub fn find_where(&self, field: &str, value: &Value, ignore_case: bool) -> Option<Model> {
        self.inner.collection.find_where(field, value, ignore_case)
    }

    pub fn exists_where(&self, field: &str, value: &Value, ignore_case: bool) -> bool {
        self.inner.collection.exists_where(field, value, ignore_case)
    }

    pub fn find_index(&self, field: &str, value: &Value) -> Option<usize> {
        self.inner.collection.find_index(field, value)
    }

    pub fn count(&self) -> usize {
        self.inner.collection.count()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.collection.is_empty()
    }

    pub fn map<T, F>(&self, f: F) -> Vec<T>
    where
        F: FnMut(&Model) -> T,
    {
        self.inner.collection.map(f)
    }

    pub fn pluck(&self, field: &str) -> Vec<Value> {
        self.inner.collection.pluck(field)
    }

    pub fn filter<F>(&self, f: F) -> Vec<Model>
    where
        F: FnMut(&Model) -> bool,
    {
        self.inner.collection.filter(f)
    }

    pub fn new(&self, data: Option<&Value>) -> Model {
        self.inner.collection.new(data)
    }

    pub fn append(&self, model: &Model) {
        self.inner.collection.append(model)
    }

    pub fn replace(&self, model: &Model, key: Option<&str>, value: Option<Value>) {
        self.inner.collection.replace(model, key, value)
    }

    pub fn delete(&self, model: &Model) {
        self.inner.collection.delete(model)
    }

    pub async fn add(
        &self,
        model: &Model,
        options: SaveOptions,
    ) -> Result<Option<Model>, ModelError> {
        self.inner.collection.add(model, options).await
    }
}

impl fmt::Debug for HasManyRelation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HasManyRelation")
            .field("name", &self.inner.name)
            .field("options", &self.inner.options)
            .field("collection", &self.inner.collection)
            .finish()
    }
}

// ----------------------------------------------------------------------
// HasOne
// ----------------------------------------------------------------------

/// A parent's single child.
#[derive(Clone)]
pub struct HasOneRelation {
    inner: Arc<HasOneInner>,
}

pub(crate) struct HasOneInner {
    name: String,
    parent: WeakModel,
    class: ModelClass,
    options: RelationOptions,
    model: RwLock<Option<Model>>,
}

/// Non-owning reference to a [`HasOneRelation`].
#[derive(Clone)]
pub struct WeakHasOne(Weak<HasOneInner>);

impl WeakHasOne {
    pub fn upgrade(&self) -> Option<HasOneRelation> {
        self.0.upgrade().map(|inner| HasOneRelation { inner })
    }
}

impl fmt::Debug for WeakHasOne {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("WeakHasOne(..)")
    }
}

impl HasOneRelation {
    pub(crate) fn build(name: &str, def: &RelationDef, parent: WeakModel) -> Self {
        Self {
            inner: Arc::new(HasOneInner {
                name: name.to_string(),
                parent,
                class: def.model.clone(),
                options: def.options,
                model: RwLock::new(None),
            }),
        }
    }

    pub fn downgrade(&self) -> WeakHasOne {
        WeakHasOne(Arc::downgrade(&self.inner))
    }

    fn inherited_offline(&self) -> bool {
        self.parent().map(|p| p.is_offline()).unwrap_or(false)
    }

    fn child_meta(&self, offline: bool) -> Meta {
        Meta {
            relation: RelationRef::BelongsToOne(self.downgrade()),
            collection: None,
            offline,
        }
    }

    /// Refill from a sub-object; `null` clears the relation.
    pub(crate) fn set_data(&self, data: &Value) {
        let child = match data {
            Value::Null => None,
            Value::Object(_) => Some(Model::construct(
                &self.inner.class,
                data,
                self.child_meta(self.inherited_offline()),
            )),
            other => {
                log(
                    "HasOneRelation",
                    "setData",
                    format!("Expected an object for {} but got {}.", self.inner.name, other),
                );
                None
            }
        };
        *self.inner.model.write() = child;
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn class(&self) -> &ModelClass {
        &self.inner.class
    }

    pub fn parent(&self) -> Option<Model> {
        self.inner.parent.upgrade()
    }

    pub fn options(&self) -> RelationOptions {
        self.inner.options
    }

    pub fn get(&self) -> Option<Model> {
        self.inner.model.read().clone()
    }

    /// A property of the related model.
    pub fn get_value(&self, key: &str) -> Option<Value> {
        self.get()?.get(key)
    }

    pub fn exists(&self) -> bool {
        self.inner.model.read().is_some()
    }

    /// Hold `model`, pointing its back-reference here. The model takes the
    /// parent's offline flag.
    pub fn attach(&self, model: &Model) {
        if !model.class().ptr_eq(&self.inner.class) {
            log(
                "HasOneRelation",
                "attach",
                format!(
                    "Expected a {} model but got {}.",
                    self.inner.class.name(),
                    model.class().name()
                ),
            );
            return;
        }

        model.set_meta(self.child_meta(self.inherited_offline()));
        *self.inner.model.write() = Some(model.clone());
    }

    /// Release the held model, clearing its back-reference.
    pub fn detach(&self) -> Option<Model> {
        let detached = self.inner.model.write().take();
        if let Some(model) = &detached {
            model.set_meta(Meta {
                offline: model.is_offline(),
                ..Meta::default()
            });
        }
        detached
    }

    /// Clear the relation if it holds `model` or an instance with its key.
    pub(crate) fn release(&self, model: &Model) {
        let key = model.key();
        let mut held = self.inner.model.write();
        let matches = held.as_ref().is_some_and(|current| {
            current.is(model) || (!is_blank(&key) && loose_eq(&current.key(), &key, false))
        });
        if matches {
            *held = None;
        }
    }

    fn require(&self) -> Result<Model, ModelError> {
        self.get()
            .ok_or_else(|| ModelError::MissingRelated(self.inner.name.clone()))
    }

    pub async fn save(&self) -> Result<Model, ModelError> {
        self.require()?.save().await
    }

    pub async fn save_with(&self, options: SaveOptions) -> Result<Model, ModelError> {
        self.require()?.save_with(options).await
    }

    pub async fn update(&self, patch: impl Into<Patch>) -> Result<Model, ModelError> {
        let patch = patch.into();
        self.require()?.update(patch).await
    }

    pub async fn post(&self, suffix: &str, data: Option<Value>) -> Result<Model, ModelError> {
        self.require()?.post(suffix, data).await
    }

    pub async fn put(&self, suffix: &str, data: Option<Value>) -> Result<Model, ModelError> {
        self.require()?.put(suffix, data).await
    }

    pub async fn post_immutable(
        &self,
        suffix: &str,
        data: Option<Value>,
    ) -> Result<Value, ModelError> {
        self.require()?.post_immutable(suffix, data).await
    }

    pub async fn put_immutable(
        &self,
        suffix: &str,
        data: Option<Value>,
    ) -> Result<Value, ModelError> {
        self.require()?.put_immutable(suffix, data).await
    }

    pub async fn sync(
        &self,
        key: &str,
        value: Option<Value>,
        extra: Option<Map<String, Value>>,
    ) -> Result<Value, ModelError> {
        self.require()?.sync(key, value, extra).await
    }

    pub fn delete(&self) -> impl Future<Output = Result<Model, ModelError>> + Send + 'static {
        self.delete_with(DeleteOptions::default())
    }

    /// Delete the held model. Optimistic removal happens before this
    /// returns, exactly as with [`Model::delete_with`].
    pub fn delete_with(
        &self,
        options: DeleteOptions,
    ) -> impl Future<Output = Result<Model, ModelError>> + Send + 'static {
        let pending = self.require().map(|model| model.delete_with(options));
        async move { pending?.await }
    }
}

impl fmt::Debug for HasOneRelation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HasOneRelation")
            .field("name", &self.inner.name)
            .field("options", &self.inner.options)
            .field("model", &self.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TruckConfig;
    use crate::model::{ModelFactory, ModelOptions};
    use crate::network::mock::MockTransport;
    use crate::network::{Method, NetworkRequest};
    use serde_json::json;

    struct Fixture {
        mock: MockTransport,
        thing: ModelClass,
        subthing: ModelClass,
        detail: ModelClass,
    }

    fn fixture(drop_parent: bool) -> Fixture {
        let mock = MockTransport::new();
        let network = NetworkRequest::new(Arc::new(mock.clone()));
        let config = Arc::new(TruckConfig::default());
        let build =
            |options| ModelFactory::build(options, config.clone(), network.clone()).unwrap();

        let subthing = build(ModelOptions::new("subthings").fields(["name"]));
        let detail = build(ModelOptions::new("detail").fields(["text"]).drop_key(true));
        let thing = build(
            ModelOptions::new("things")
                .fields(["name"])
                .has_many_with(
                    "subthings",
                    &subthing,
                    RelationOptions {
                        drop_parent_api_path: drop_parent,
                    },
                )
                .has_one("detail", &detail),
        );

        Fixture {
            mock,
            thing,
            subthing,
            detail,
        }
    }

    fn sample(f: &Fixture) -> Model {
        f.thing.make(&json!({
            "id": 1,
            "name": "thing",
            "subthings": [{ "id": 10, "name": "a" }, { "id": 11, "name": "b" }],
            "detail": { "text": "hello" }
        }))
    }

    #[test]
    fn nested_urls_compose() {
        let f = fixture(false);
        let thing = sample(&f);
        let sub = thing.has_many("subthings").unwrap().find(10).unwrap();

        assert_eq!(sub.api_path(), "/things/1/subthings/10");
        assert!(sub.parent().unwrap().is(&thing));
        assert_eq!(
            thing.has_one("detail").unwrap().get().unwrap().api_path(),
            "/things/1/detail"
        );
    }

    #[test]
    fn dropped_parent_path() {
        let f = fixture(true);
        let thing = sample(&f);
        let sub = thing.has_many("subthings").unwrap().get(0).unwrap();
        assert_eq!(sub.api_path(), "/subthings/10");
    }

    #[test]
    fn children_do_not_keep_parent_alive() {
        let f = fixture(false);
        let thing = sample(&f);
        let relation = thing.has_many("subthings").unwrap().clone();
        let sub = relation.get(0).unwrap();

        drop(thing);
        assert!(relation.parent().is_none());
        assert!(sub.parent().is_none());
        assert_eq!(sub.api_path(), "/subthings/10");
    }

    #[test]
    fn relation_data_serializes_back() {
        let f = fixture(false);
        let thing = sample(&f);
        let object = thing.to_object();

        assert_eq!(object["subthings"][1]["name"], json!("b"));
        assert_eq!(object["detail"]["text"], json!("hello"));

        let without = thing.to_object_with(crate::model::ObjectOptions {
            include_relations: false,
        });
        assert!(without.get("subthings").is_none());
    }

    #[test]
    fn hydration_without_relation_key_resets_relations() {
        let f = fixture(false);
        let thing = sample(&f);
        let subthings = thing.has_many("subthings").unwrap().clone();

        thing.fill(&json!({ "id": 1, "name": "renamed" }));
        assert!(subthings.is_empty());
        assert!(!thing.has_one("detail").unwrap().exists());

        thing.fill(&json!({ "id": 1, "subthings": [{ "id": 12 }], "detail": null }));
        assert_eq!(subthings.count(), 1);
        assert!(!thing.has_one("detail").unwrap().exists());
    }

    #[tokio::test]
    async fn keyed_save_without_relations_in_response_empties_them() {
        let f = fixture(false);
        let thing = sample(&f);
        f.mock
            .set_response(Method::Put, "/things/1", json!({ "id": 1, "name": "thing" }));

        thing.save().await.unwrap();
        assert!(thing.has_many("subthings").unwrap().is_empty());
        assert!(!thing.has_one("detail").unwrap().exists());
    }

    #[test]
    fn has_one_attach_and_detach() {
        let f = fixture(false);
        let thing = f.thing.make(&json!({ "id": 2 }));
        let detail = thing.has_one("detail").unwrap();
        assert!(!detail.exists());

        let child = f.detail.make(&json!({ "text": "x" }));
        detail.attach(&child);
        assert!(detail.exists());
        assert_eq!(detail.get_value("text"), Some(json!("x")));
        assert!(child.parent().unwrap().is(&thing));

        detail.attach(&f.subthing.create());
        assert!(detail.get().unwrap().is(&child));

        let released = detail.detach().unwrap();
        assert!(released.is(&child));
        assert!(child.parent().is_none());
        assert!(!detail.exists());
    }

    #[test]
    fn offline_parent_propagates() {
        let f = fixture(false);
        let thing = sample(&f).clone_offline();

        let sub = thing.has_many("subthings").unwrap().get(0).unwrap();
        assert!(sub.is_offline());

        let child = f.detail.create();
        thing.has_one("detail").unwrap().attach(&child);
        assert!(child.is_offline());
    }

    #[test]
    fn attach_takes_online_parent_flag() {
        let f = fixture(false);
        let thing = sample(&f);
        let child = f.detail.create().clone_offline();

        thing.has_one("detail").unwrap().attach(&child);
        assert!(!child.is_offline());
    }

    #[tokio::test]
    async fn add_takes_parent_offline_flag() {
        let f = fixture(false);
        let thing = sample(&f);
        let subthings = thing.has_many("subthings").unwrap();

        let child = f.subthing.make(&json!({ "name": "c" })).clone_offline();
        subthings.add(&child, SaveOptions::default()).await.unwrap();
        assert!(!child.is_offline());
        assert_eq!(f.mock.last_request().unwrap().url, "/things/1/subthings");

        let offline = sample(&f).clone_offline();
        let before = f.mock.request_count();
        let other = f.subthing.make(&json!({ "name": "d" }));
        offline
            .has_many("subthings")
            .unwrap()
            .add(&other, SaveOptions::default())
            .await
            .unwrap();
        assert!(other.is_offline());
        assert_eq!(f.mock.request_count(), before);
    }

    #[tokio::test]
    async fn has_one_proxies_need_a_model() {
        let f = fixture(false);
        let thing = f.thing.make(&json!({ "id": 3 }));
        let detail = thing.has_one("detail").unwrap();

        assert_eq!(
            detail.save().await.unwrap_err(),
            ModelError::MissingRelated("detail".into())
        );
        assert!(detail.delete().await.is_err());
        assert_eq!(f.mock.request_count(), 0);
    }

    #[tokio::test]
    async fn has_one_delete_clears() {
        let f = fixture(false);
        let thing = sample(&f);
        let detail = thing.has_one("detail").unwrap();

        detail.delete().await.unwrap();
        assert!(!detail.exists());
        assert_eq!(f.mock.last_request().unwrap().url, "/things/1/detail");
    }

    #[tokio::test]
    async fn optimistic_delete_removes_before_settling() {
        let f = fixture(false);
        let thing = sample(&f);
        let subthings = thing.has_many("subthings").unwrap();
        let sub = subthings.find(11).unwrap();

        let pending = sub.delete_with(DeleteOptions { optimistic: true });
        assert_eq!(subthings.count(), 1);
        pending.await.unwrap();
        assert_eq!(f.mock.last_request().unwrap().url, "/things/1/subthings/11");
    }

    #[tokio::test]
    async fn add_to_relation_posts_nested() {
        let f = fixture(false);
        let thing = sample(&f);
        let subthings = thing.has_many("subthings").unwrap();

        let child = subthings.new(Some(&json!({ "name": "c" })));
        subthings.add(&child, SaveOptions::default()).await.unwrap();

        let request = f.mock.last_request().unwrap();
        assert_eq!(request.url, "/things/1/subthings");
        assert_eq!(subthings.count(), 3);
        assert!(child.parent().unwrap().is(&thing));
    }
}
