//! Configuration structures and operational modes.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::constants::{
    COLLECTIONS_INFO_DIR,
    COLLECTIONS_INFO_SUFFIX,
    DATABASES_DIR,
    DATABASES_INFO_FILE,
    DATA_DIR,
    ROOT_ENV_VAR,
};

/// How a collection file that fails to parse is handled on load.
///
/// - `Discard`: log a warning and start from an empty collection; the bad bytes are
///   overwritten by the next flush
/// - `Strict`: fail the load with [`crate::HiveError::CorruptData`] and leave the file alone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RecoveryMode {
    /// Treat unparsable content as an empty collection
    #[default]
    Discard,
    /// Reject unparsable content
    Strict,
}

/// How the document cache is written back to its file.
///
/// - `Overwrite`: a single write call on the collection file
/// - `Atomic`: write a sibling temporary file, then rename it over the collection file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum WriteMode {
    /// Overwrite the file in place
    #[default]
    Overwrite,
    /// Write to a temporary file and rename it
    Atomic,
}

/// Persistence settings applied to every collection of a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct CollectionConfig {
    /// Handling of corrupt collection files
    #[serde(default)]
    pub recovery:   RecoveryMode,
    /// Flush strategy
    #[serde(default)]
    pub write_mode: WriteMode,
}

/// Top-level configuration of a [`crate::Hive`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HiveConfig {
    /// Base directory of every store and metadata file
    pub root:       PathBuf,
    /// Settings passed down to every collection
    #[serde(default)]
    pub collection: CollectionConfig,
}

impl HiveConfig {
    /// Builds a configuration rooted at `root`.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root:       root.into(),
            collection: CollectionConfig::default(),
        }
    }

    /// Builds a configuration from the environment.
    ///
    /// `HIVEDB_ROOT` selects the root directory. When it is unset or blank the
    /// package directory is used.
    pub fn from_env() -> Self {
        let root = resolve_root(std::env::var(ROOT_ENV_VAR).ok().as_deref());
        debug!("Resolved hive root directory: {:?}", root);
        Self::with_root(root)
    }

    /// Replaces the collection settings.
    #[must_use]
    pub fn with_collection_config(mut self, collection: CollectionConfig) -> Self {
        self.collection = collection;
        self
    }

    /// Returns the directory layout derived from the root.
    pub fn paths(&self) -> HivePaths { HivePaths::new(&self.root) }
}

impl Default for HiveConfig {
    fn default() -> Self { Self::from_env() }
}

/// Picks the root directory from an optional override value.
pub fn resolve_root(value: Option<&str>) -> PathBuf {
    match value.map(str::trim) {
        Some(value) if !value.is_empty() => PathBuf::from(value),
        _ => PathBuf::from(env!("CARGO_MANIFEST_DIR")),
    }
}

/// Every path derived from the root directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HivePaths {
    /// Folder holding one sub-folder per store
    pub databases_dir:       PathBuf,
    /// Folder holding registry and store metadata
    pub data_dir:            PathBuf,
    /// Folder holding the per-store collection metadata files
    pub collections_dir:     PathBuf,
    /// Registry metadata file
    pub databases_info_path: PathBuf,
}

impl HivePaths {
    /// Derives the layout under `root`.
    pub fn new(root: &Path) -> Self {
        let data_dir = root.join(DATA_DIR);
        Self {
            databases_dir: root.join(DATABASES_DIR),
            collections_dir: data_dir.join(COLLECTIONS_INFO_DIR),
            databases_info_path: data_dir.join(DATABASES_INFO_FILE),
            data_dir,
        }
    }

    /// Folder of a store.
    pub fn database_dir(&self, name: &str) -> PathBuf { self.databases_dir.join(name) }

    /// Collection metadata file of a store.
    pub fn collections_info_path(&self, name: &str) -> PathBuf {
        self.collections_dir
            .join(format!("{}{}", name, COLLECTIONS_INFO_SUFFIX))
    }
}
