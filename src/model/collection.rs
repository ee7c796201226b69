//! model::collection
//!
//! Ordered container of instances of one class.
//!
//! A collection is either standalone (a query result or a local
//! [`ModelClass::collect`]) or owned by a [`HasManyRelation`], in which case
//! its members point back at the relation and at the collection so that
//! URL derivation and deletion can find their owner.
//!
//! Lookups run against a snapshot of the items, so predicates and dynamic
//! properties may touch the collection without deadlocking.

use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use serde_json::Value;

use super::error::ModelError;
use super::factory::ModelClass;
use super::instance::{Meta, Model, SaveOptions, WeakModel};
use super::relation::{HasManyRelation, RelationRef, WeakHasMany};
use crate::util::{loose_eq, log};

/// Shared handle to an ordered set of instances.
#[derive(Clone)]
pub struct ModelCollection {
    inner: Arc<CollectionInner>,
}

pub(crate) struct CollectionInner {
    class: ModelClass,
    belongs_to: Option<WeakModel>,
    relation: Option<WeakHasMany>,
    items: RwLock<Vec<Model>>,
}

/// Non-owning reference to a [`ModelCollection`].
#[derive(Clone)]
pub struct WeakCollection(Weak<CollectionInner>);

impl WeakCollection {
    pub fn upgrade(&self) -> Option<ModelCollection> {
        self.0.upgrade().map(|inner| ModelCollection { inner })
    }
}

impl fmt::Debug for WeakCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("WeakCollection(..)")
    }
}

impl ModelCollection {
    /// An empty collection not owned by any relation.
    pub fn standalone(class: &ModelClass) -> Self {
        Self::with_owner(class, None, None)
    }

    pub(crate) fn owned(class: &ModelClass, parent: WeakModel, relation: WeakHasMany) -> Self {
        Self::with_owner(class, Some(parent), Some(relation))
    }

    fn with_owner(
        class: &ModelClass,
        belongs_to: Option<WeakModel>,
        relation: Option<WeakHasMany>,
    ) -> Self {
        Self {
            inner: Arc::new(CollectionInner {
                class: class.clone(),
                belongs_to,
                relation,
                items: RwLock::new(Vec::new()),
            }),
        }
    }

    pub fn downgrade(&self) -> WeakCollection {
        WeakCollection(Arc::downgrade(&self.inner))
    }

    pub fn ptr_eq(&self, other: &ModelCollection) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn class(&self) -> &ModelClass {
        &self.inner.class
    }

    /// The instance owning this collection, if any.
    pub fn parent(&self) -> Option<Model> {
        self.inner.belongs_to.as_ref()?.upgrade()
    }

    /// The relation wrapping this collection, if any.
    pub fn relation(&self) -> Option<HasManyRelation> {
        self.inner.relation.as_ref()?.upgrade()
    }

    fn inherited_offline(&self) -> bool {
        self.parent().map(|p| p.is_offline()).unwrap_or(false)
    }

    fn child_meta(&self, offline: bool) -> Meta {
        Meta {
            relation: self
                .inner
                .relation
                .clone()
                .map(RelationRef::BelongsToMany)
                .unwrap_or_default(),
            collection: Some(self.downgrade()),
            offline,
        }
    }

    /// Replace the items with one instance per array element.
    ///
    /// Children inherit the parent's offline flag. `null` empties the
    /// collection; other non-array data is logged and treated as empty.
    pub fn set_data(&self, data: &Value) {
        let elements: &[Value] = match data {
            Value::Array(items) => items,
            Value::Null => &[],
            other => {
                log(
                    "ModelCollection",
                    "setData",
                    format!(
                        "Expected an array of {} but got {}.",
                        self.class().name(),
                        other
                    ),
                );
                &[]
            }
        };

        let offline = self.inherited_offline();
        let models: Vec<Model> = elements
            .iter()
            .map(|element| Model::construct(self.class(), element, self.child_meta(offline)))
            .collect();

        *self.inner.items.write() = models;
    }

    // ------------------------------------------------------------------
    // Read / query
    // ------------------------------------------------------------------

    fn snapshot(&self) -> Vec<Model> {
        self.inner.items.read().clone()
    }

    /// Every member, in order.
    pub fn all(&self) -> Vec<Model> {
        self.snapshot()
    }

    pub fn get(&self, index: usize) -> Option<Model> {
        self.inner.items.read().get(index).cloned()
    }

    /// The member whose primary key matches `key`.
    pub fn find(&self, key: impl Into<Value>) -> Option<Model> {
        let key = key.into();
        self.snapshot()
            .into_iter()
            .find(|m| loose_eq(&m.key(), &key, false))
    }

    /// The first member whose `field` matches `value`.
    pub fn find_where(&self, field: &str, value: &Value, ignore_case: bool) -> Option<Model> {
        self.snapshot().into_iter().find(|m| {
            m.get(field)
                .map(|v| loose_eq(&v, value, ignore_case))
                .unwrap_or(false)
        })
    }

    pub fn exists_where(&self, field: &str, value: &Value, ignore_case: bool) -> bool {
        self.find_where(field, value, ignore_case).is_some()
    }

    /// Position of the first member whose `field` matches `value`.
    pub fn find_index(&self, field: &str, value: &Value) -> Option<usize> {
        self.snapshot().iter().position(|m| {
            m.get(field)
                .map(|v| loose_eq(&v, value, false))
                .unwrap_or(false)
        })
    }

    pub fn count(&self) -> usize {
        self.inner.items.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.items.read().is_empty()
    }

    pub fn contains(&self, model: &Model) -> bool {
        self.inner.items.read().iter().any(|m| m.is(model))
    }

    pub fn map<T, F>(&self, f: F) -> Vec<T>
    where
        F: FnMut(&Model) -> T,
    {
        self.snapshot().iter().map(f).collect()
    }

    /// The value of `field` on every member (`null` where absent).
    pub fn pluck(&self, field: &str) -> Vec<Value> {
        self.map(|m| m.get(field).unwrap_or(Value::Null))
    }

    pub fn filter<F>(&self, mut f: F) -> Vec<Model>
    where
        F: FnMut(&Model) -> bool,
    {
        self.snapshot().into_iter().filter(|m| f(m)).collect()
    }

    /// Serialized members as a JSON array.
    pub fn to_value(&self) -> Value {
        Value::Array(self.map(Model::to_object))
    }

    // ------------------------------------------------------------------
    // Mutators
    // ------------------------------------------------------------------

    /// Construct a child wired to this collection without adding or
    /// persisting it.
    pub fn new(&self, data: Option<&Value>) -> Model {
        Model::construct(
            self.class(),
            data.unwrap_or(&Value::Null),
            self.child_meta(false),
        )
    }

    /// Add an instance at the end, pointing its back-references here.
    pub fn append(&self, model: &Model) {
        model.set_meta(self.child_meta(model.is_offline()));
        self.inner.items.write().push(model.clone());
    }

    /// Swap in `model` for the member whose `key` field equals `value`.
    ///
    /// `key` defaults to the primary key and `value` to the model's own
    /// value for it. Logs and does nothing when no member matches.
    pub fn replace(&self, model: &Model, key: Option<&str>, value: Option<Value>) {
        if !self.swap(model, key, value) {
            log(
                "ModelCollection",
                "replace",
                "Model couldn't be found in collection.",
            );
        }
    }

    pub(crate) fn swap(&self, model: &Model, key: Option<&str>, value: Option<Value>) -> bool {
        let key = key.unwrap_or(self.class().schema().key());
        let Some(value) = value.or_else(|| model.get(key)).filter(|v| !v.is_null()) else {
            return false;
        };

        let Some(target) = self.find_where(key, &value, false) else {
            return false;
        };

        let replaced = {
            let mut items = self.inner.items.write();
            match items.iter().position(|m| m.is(&target)) {
                Some(index) => {
                    items[index] = model.clone();
                    true
                }
                None => false,
            }
        };

        if replaced {
            model.set_meta(self.child_meta(model.is_offline()));
        }
        replaced
    }

    /// Remove the member with the same primary key, or the same instance
    /// when `model` has no key. Logs and does nothing when absent.
    pub fn delete(&self, model: &Model) {
        let key = model.key();
        let target = if key.is_null() {
            Some(model.clone())
        } else {
            self.find(key)
        };

        let removed = target.is_some_and(|target| {
            let mut items = self.inner.items.write();
            match items.iter().position(|m| m.is(&target)) {
                Some(index) => {
                    items.remove(index);
                    true
                }
                None => false,
            }
        });

        if !removed {
            log(
                "ModelCollection",
                "delete",
                "Model couldn't be found in collection.",
            );
        }
    }

    /// Persist `model` and append it once the save succeeds.
    ///
    /// A model of another class is logged and resolves to `None`. A failed
    /// save propagates and leaves the collection unchanged.
    pub async fn add(
        &self,
        model: &Model,
        options: SaveOptions,
    ) -> Result<Option<Model>, ModelError> {
        if !model.class().ptr_eq(self.class()) {
            log(
                "ModelCollection",
                "add",
                format!(
                    "Expected a {} model but got {}.",
                    self.class().name(),
                    model.class().name()
                ),
            );
            return Ok(None);
        }

        model.set_meta(self.child_meta(self.inherited_offline()));

        let saved = model.save_with(options).await?;
        if !self.contains(&saved) {
            self.inner.items.write().push(saved.clone());
        }
        Ok(Some(saved))
    }
}

impl fmt::Debug for ModelCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelCollection")
            .field("class", &self.class().name())
            .field("count", &self.count())
            .finish_non_exhaustive()
    }
}
