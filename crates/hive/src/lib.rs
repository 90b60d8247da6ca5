//! An embedded, schema-typed JSON document store.
//!
//! A [`Hive`] is the registry of named [`Store`]s under one root directory. A store
//! owns [`Collection`]s; each collection validates its documents against a
//! [`Schema`] and persists them as one JSON array file.

pub mod collection;
pub mod config;
pub mod constants;
pub mod document;
pub mod error;
pub mod filtering;
pub mod hive;
pub mod io;
pub mod metadata;
pub mod persistence;
pub mod schema;
pub mod store;
pub mod validation;

pub use collection::Collection;
pub use config::{CollectionConfig, HiveConfig, HivePaths, RecoveryMode, WriteMode};
pub use document::Document;
pub use error::{HiveError, NameKind, Result};
pub use filtering::Predicate;
pub use hive::Hive;
pub use persistence::{DocumentStorage, JsonFileStorage};
pub use schema::{FieldKind, FieldSpec, Schema};
pub use store::Store;
