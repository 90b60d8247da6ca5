//! Constants for special file and directory names used throughout Hive.
//!
//! This module centralizes all special names to prevent typos and ensure consistency.

/// Environment variable that overrides the root directory of every store.
pub const ROOT_ENV_VAR: &str = "HIVEDB_ROOT";

/// Directory under the root holding one folder per store.
pub const DATABASES_DIR: &str = "hives";

/// Directory under the root holding registry and store metadata.
pub const DATA_DIR: &str = "data-folder";

/// Directory under [`DATA_DIR`] holding the per-store collection metadata files.
pub const COLLECTIONS_INFO_DIR: &str = "collections";

/// Filename of the registry metadata file inside [`DATA_DIR`].
pub const DATABASES_INFO_FILE: &str = "databases-info.json";

/// Suffix appended to a store name to build its collection metadata filename.
pub const COLLECTIONS_INFO_SUFFIX: &str = "-collections.json";

/// File extension for collection files.
pub const COLLECTION_EXTENSION: &str = "json";

/// Extension of the sibling file used by atomic writes before the rename.
pub const TEMP_EXTENSION: &str = "tmp";

/// Name of the system-assigned identifier field of every document.
pub const ID_FIELD: &str = "_id";

/// Content written to a freshly created collection file.
pub const EMPTY_COLLECTION: &str = "[]";
