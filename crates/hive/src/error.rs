use std::path::PathBuf;

use thiserror::Error;

/// Hive-wide error type for the document store.
///
/// Every fallible operation of the engine reports one of these variants. Validation
/// and naming errors are raised directly by the operation that detected them, while
/// disk failures are wrapped exactly once at the I/O boundary (see [`crate::io`]) so
/// the caller always gets a context message together with the original cause.
#[derive(Error, Debug)]
pub enum HiveError {
    /// A store or collection identifier failed the naming rules.
    #[error("{kind} name '{name}' is invalid")]
    InvalidName {
        kind: NameKind,
        name: String,
    },

    /// A schema declares a field name that cannot be stored.
    #[error("Invalid schema: {reason}")]
    InvalidSchema {
        reason: String,
    },

    /// A store with this name was already created by this registry instance.
    #[error("Database with name \"{name}\" already exists")]
    DatabaseExists {
        name: String,
    },

    /// A collection with this name was already created by this store instance.
    #[error("Collection with name \"{name}\" already exists")]
    CollectionExists {
        name: String,
    },

    /// The store is unknown to the registry.
    #[error("The database \"{name}\" does not exist")]
    DatabaseNotFound {
        name: String,
    },

    /// The collection is unknown to the store.
    #[error("The collection \"{name}\" does not exist")]
    CollectionNotFound {
        name: String,
    },

    /// `create` was called without a document.
    #[error("Document cannot be undefined")]
    UndefinedDocument,

    /// A document or patch is not a JSON object.
    #[error("Invalid document: {reason}")]
    InvalidDocument {
        reason: String,
    },

    /// A predicate is not a JSON object.
    #[error("Invalid query: {reason}")]
    InvalidQuery {
        reason: String,
    },

    /// A required field is missing on create.
    #[error("The field \"{field}\" is missing or empty")]
    ValidationFailed {
        field: String,
    },

    /// A field value does not have the type the schema declares.
    #[error("Invalid type for field \"{field}\". Expect {expected}, got {actual}")]
    InvalidFieldType {
        field:    String,
        expected: &'static str,
        actual:   &'static str,
    },

    /// A folder-level disk operation failed.
    #[error("{message}: {source}")]
    FolderIo {
        message: String,
        source:  std::io::Error,
    },

    /// A file-level disk operation failed.
    #[error("{message}: {source}")]
    FileIo {
        message: String,
        source:  std::io::Error,
    },

    /// A collection file could not be parsed and strict recovery is enabled.
    #[error("Collection file {path:?} is corrupt: {source}")]
    CorruptData {
        path:   PathBuf,
        source: serde_json::Error,
    },

    /// JSON serialization failed
    #[error("JSON error: {source}")]
    Json {
        #[from]
        source: serde_json::Error,
    },
}

/// The kind of identifier reported by [`HiveError::InvalidName`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameKind {
    /// A store (database) name.
    Database,
    /// A collection name.
    Collection,
}

impl std::fmt::Display for NameKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            Self::Database => f.write_str("Database"),
            Self::Collection => f.write_str("Collection"),
        }
    }
}

/// Result type alias for Hive operations.
pub type Result<T> = std::result::Result<T, HiveError>;
