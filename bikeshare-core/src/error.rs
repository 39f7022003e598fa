//! Error types and result types for the data-access layer.
//!
//! Every fallible operation in the workspace returns [`DocumentStoreResult<T>`].
//! Errors raised by the storage backend are carried through unchanged in meaning;
//! there is no retry or recovery logic at this layer.

use bson::error::Error as BsonError;
use serde_json::Error as SerdeJsonError;
use thiserror::Error;

/// Represents all possible errors that can occur when reading, projecting or persisting records.
#[derive(Error, Debug)]
pub enum DocumentStoreError {
    /// A field was accessed on a record that does not carry it.
    ///
    /// `model` is the type name of the wrapper (`Station`, `Network`, ...), `field` the missing key.
    #[error("'{model}' object has no attribute '{field}'")]
    FieldNotFound {
        model: &'static str,
        field: String,
    },
    /// A field exists but holds a value of an unexpected type.
    #[error("'{model}' attribute '{field}' is not {expected}")]
    InvalidField {
        model: &'static str,
        field: String,
        expected: &'static str,
    },
    /// The requested document was not found in the collection.
    /// The first argument is the document ID, the second is the collection name.
    #[error("Document not found {0} in collection {1}")]
    DocumentNotFound(String, String),
    /// Serialization/deserialization error when converting between document formats (BSON, JSON).
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// Error during store initialization or connection setup.
    #[error("Initialization error: {0}")]
    Initialization(String),
    /// Settings could not be read or parsed.
    #[error("Configuration error: {0}")]
    Configuration(String),
    /// An error occurred in the underlying storage backend.
    #[error("Backend error: {0}")]
    Backend(String),
}

/// A specialized `Result` type for data-access operations.
pub type DocumentStoreResult<T> = Result<T, DocumentStoreError>;

impl DocumentStoreError {
    pub fn field_not_found(model: &'static str, field: impl Into<String>) -> Self {
        DocumentStoreError::FieldNotFound { model, field: field.into() }
    }

    pub fn invalid_field(model: &'static str, field: impl Into<String>, expected: &'static str) -> Self {
        DocumentStoreError::InvalidField { model, field: field.into(), expected }
    }

    /// Returns `true` when this error reports a missing field.
    pub fn is_field_not_found(&self) -> bool {
        matches!(self, DocumentStoreError::FieldNotFound { .. })
    }
}

impl From<BsonError> for DocumentStoreError {
    fn from(err: BsonError) -> Self {
        DocumentStoreError::Serialization(err.to_string())
    }
}

impl From<SerdeJsonError> for DocumentStoreError {
    fn from(err: SerdeJsonError) -> Self {
        DocumentStoreError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_not_found_message_names_model_and_field() {
        let err = DocumentStoreError::field_not_found("Station", "name");

        assert!(err.is_field_not_found());
        assert_eq!(err.to_string(), "'Station' object has no attribute 'name'");
    }

    #[test]
    fn invalid_field_is_not_a_missing_field() {
        let err = DocumentStoreError::invalid_field("Network", "latitude", "a number");

        assert!(!err.is_field_not_found());
        assert_eq!(err.to_string(), "'Network' attribute 'latitude' is not a number");
    }
}
