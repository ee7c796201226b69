//! config::schema
//!
//! Declarative model schemas carried in the configuration file.
//!
//! Only the data-describing parts of a model can be declared here: fields,
//! dates, literal defaults and relations. Computed defaults, dynamic
//! properties, methods and hooks need code and are added through
//! [`ModelOptions`] directly.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::ConfigError;
use crate::model::{ModelClass, ModelOptions, RelationOptions, SchemaError};

/// A model declared under `[models.<name>]`.
///
/// # Example
///
/// ```toml
/// [models.resume]
/// fields = ["name", "email"]
/// dates = ["created_at"]
///
/// [models.resume.defaults]
/// email = ""
///
/// [models.resume.has_many.sections]
/// model = "section"
///
/// [models.resume.has_one.profile]
/// model = "profile"
/// drop_parent_api_path = true
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ModelDecl {
    /// Model name used in URLs (default: the table name)
    pub name: Option<String>,

    /// Base URL override
    pub api: Option<String>,

    /// Primary key field (default: "id")
    pub key: Option<String>,

    /// Leave the key out of URLs
    pub drop_key: Option<bool>,

    /// Leave the parent's path out of URLs
    pub drop_parent_api_path: Option<bool>,

    /// Scalar fields
    pub fields: Vec<String>,

    /// Date fields (default: created_at, updated_at)
    pub dates: Option<Vec<String>>,

    /// Literal defaults per field
    pub defaults: BTreeMap<String, Value>,

    /// Has-many relations by name
    pub has_many: BTreeMap<String, RelationDecl>,

    /// Has-one relations by name
    pub has_one: BTreeMap<String, RelationDecl>,
}

/// A relation inside a [`ModelDecl`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct RelationDecl {
    /// Table name of the related model under `[models]`
    pub model: String,

    /// Leave the parent's path out of the child's URLs
    pub drop_parent_api_path: bool,
}

impl ModelDecl {
    /// Names of the models this one refers to.
    pub fn dependencies(&self) -> impl Iterator<Item = &str> {
        self.has_many
            .values()
            .chain(self.has_one.values())
            .map(|r| r.model.as_str())
    }

    /// Validate the declaration in isolation.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` for empty names or relation
    /// targets.
    pub fn validate(&self, table: &str) -> Result<(), ConfigError> {
        if let Some(name) = &self.name {
            if name.trim().is_empty() {
                return Err(ConfigError::InvalidValue(format!(
                    "models.{}.name cannot be empty",
                    table
                )));
            }
        }

        if let Some(key) = &self.key {
            if key.trim().is_empty() {
                return Err(ConfigError::InvalidValue(format!(
                    "models.{}.key cannot be empty",
                    table
                )));
            }
        }

        if let Some(field) = self.fields.iter().find(|f| f.trim().is_empty()) {
            return Err(ConfigError::InvalidValue(format!(
                "models.{}.fields contains an empty name {:?}",
                table, field
            )));
        }

        for (relation, decl) in self.has_many.iter().chain(self.has_one.iter()) {
            if decl.model.trim().is_empty() {
                return Err(ConfigError::InvalidValue(format!(
                    "models.{}: relation '{}' needs a model",
                    table, relation
                )));
            }
        }

        Ok(())
    }

    /// Turn the declaration into builder options.
    ///
    /// `resolve` maps a relation target's table name to its built class.
    pub fn to_options<F>(&self, table: &str, mut resolve: F) -> Result<ModelOptions, SchemaError>
    where
        F: FnMut(&str) -> Result<ModelClass, SchemaError>,
    {
        let mut options = ModelOptions::new(self.name.as_deref().unwrap_or(table))
            .fields(self.fields.iter().cloned());

        if let Some(api) = &self.api {
            options = options.api(api.clone());
        }
        if let Some(key) = &self.key {
            options = options.key(key.clone());
        }
        if let Some(drop) = self.drop_key {
            options = options.drop_key(drop);
        }
        if let Some(drop) = self.drop_parent_api_path {
            options = options.drop_parent_api_path(drop);
        }
        if let Some(dates) = &self.dates {
            options = options.dates(dates.iter().cloned());
        }
        for (field, value) in &self.defaults {
            options = options.default(field.clone(), value.clone());
        }
        for (name, decl) in &self.has_many {
            let class = resolve(&decl.model)?;
            options = options.has_many_with(name.clone(), &class, decl.options());
        }
        for (name, decl) in &self.has_one {
            let class = resolve(&decl.model)?;
            options = options.has_one_with(name.clone(), &class, decl.options());
        }

        Ok(options)
    }
}

impl RelationDecl {
    pub fn options(&self) -> RelationOptions {
        RelationOptions {
            drop_parent_api_path: self.drop_parent_api_path,
        }
    }
}
