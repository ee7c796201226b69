//! model::error
//!
//! Error types for schema construction and model operations.
//!
//! # Policy
//!
//! Expected conditions (empty `find` body, wrong-typed model handed to a
//! collection, missing collection entry) are not errors: they are logged
//! and resolve to a safe default. Transport failures are wrapped
//! transparently so callers see the original [`TransportError`].

use thiserror::Error;

use crate::network::TransportError;

/// Errors from model operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    /// The transport rejected the request; surfaced unchanged.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A response had a shape the operation cannot use.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// A has-one relation was asked to proxy an operation without a model.
    #[error("relation '{0}' has no related model")]
    MissingRelated(String),
}

impl ModelError {
    /// The transport error behind this failure, if any.
    pub fn transport(&self) -> Option<&TransportError> {
        match self {
            ModelError::Transport(err) => Some(err),
            _ => None,
        }
    }
}

/// Errors from building a model class out of its options.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("model name cannot be empty")]
    MissingName,

    #[error("primary key name cannot be empty for model '{0}'")]
    MissingKey(String),

    #[error("field '{field}' is declared more than once on model '{model}'")]
    DuplicateField { model: String, field: String },

    #[error("primary key '{key}' of model '{model}' cannot also be a field")]
    KeyDeclaredAsField { model: String, key: String },

    #[error("relation '{relation}' of model '{model}' collides with a field or another relation")]
    RelationCollision { model: String, relation: String },

    #[error("default declared for undeclared field '{field}' on model '{model}'")]
    DefaultForUnknownField { model: String, field: String },

    #[error("unknown model '{0}'")]
    UnknownModel(String),

    #[error("cyclic relation between models: {0}")]
    CyclicRelation(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_errors_are_transparent() {
        let err: ModelError = TransportError::NotFound("/resume/1".into()).into();
        assert_eq!(err.to_string(), "not found: /resume/1");
        assert_eq!(
            err.transport(),
            Some(&TransportError::NotFound("/resume/1".into()))
        );
    }

    #[test]
    fn model_error_display() {
        assert_eq!(
            ModelError::MissingRelated("profile".into()).to_string(),
            "relation 'profile' has no related model"
        );
        assert_eq!(
            ModelError::InvalidData("expected an array".into()).to_string(),
            "invalid data: expected an array"
        );
        assert!(ModelError::InvalidData(String::new()).transport().is_none());
    }

    #[test]
    fn schema_error_display() {
        assert_eq!(
            SchemaError::DuplicateField {
                model: "resume".into(),
                field: "name".into()
            }
            .to_string(),
            "field 'name' is declared more than once on model 'resume'"
        );
        assert_eq!(
            SchemaError::CyclicRelation("a -> b -> a".into()).to_string(),
            "cyclic relation between models: a -> b -> a"
        );
    }
}
