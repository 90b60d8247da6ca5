//! The persistence gateway between a collection's cache and its file.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs as tokio_fs;
use tracing::{debug, trace, warn};

use crate::{
    config::{CollectionConfig, RecoveryMode, WriteMode},
    constants::{EMPTY_COLLECTION, TEMP_EXTENSION},
    io::{exists, file_io},
    Document,
    HiveError,
    Result,
};

/// Durable backing of one collection's documents.
///
/// Implementations always move the full ordered document sequence; there is no
/// partial or append path.
#[async_trait]
pub trait DocumentStorage: Send + Sync + std::fmt::Debug {
    /// Loads the stored documents, creating an empty backing if none exists.
    async fn load(&self) -> Result<Vec<Document>>;

    /// Replaces the stored documents with `documents`.
    async fn save(&self, documents: &[Document]) -> Result<()>;

    /// Deletes the backing. Succeeds if it does not exist.
    async fn remove(&self) -> Result<()>;
}

/// Stores a collection as a JSON array in a single file.
#[derive(Debug, Clone)]
pub struct JsonFileStorage {
    /// Collection name, used in error messages
    name:   String,
    /// The collection file
    path:   PathBuf,
    /// Recovery and write strategy
    config: CollectionConfig,
}

impl JsonFileStorage {
    /// Creates a gateway for the collection `name` stored at `path`. Does not touch disk.
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>, config: CollectionConfig) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            config,
        }
    }

    /// Returns the collection file path.
    pub fn path(&self) -> &Path { &self.path }

    /// Writes an empty collection file.
    async fn create_file(&self) -> Result<()> {
        debug!("Creating collection file {:?}", self.path);
        file_io(
            || format!("Error creating collection \"{}\"", self.name),
            tokio_fs::write(&self.path, EMPTY_COLLECTION),
        )
        .await
    }

    /// Parses file content according to the recovery mode.
    fn parse(&self, content: &str) -> Result<Vec<Document>> {
        let trimmed = content.trim();
        if trimmed.is_empty() {
            return Ok(Vec::new());
        }
        match serde_json::from_str::<Vec<Document>>(trimmed) {
            Ok(documents) => Ok(documents),
            Err(source) => {
                match self.config.recovery {
                    RecoveryMode::Discard => {
                        warn!(
                            "Collection file {:?} is not a valid document array, starting empty: {}",
                            self.path, source
                        );
                        Ok(Vec::new())
                    },
                    RecoveryMode::Strict => {
                        warn!("Collection file {:?} is corrupt: {}", self.path, source);
                        Err(HiveError::CorruptData {
                            path: self.path.clone(),
                            source,
                        })
                    },
                }
            },
        }
    }

    /// Path of the temporary file used by atomic writes.
    fn temp_path(&self) -> PathBuf {
        let mut file_name = self
            .path
            .file_name()
            .map(std::ffi::OsStr::to_os_string)
            .unwrap_or_default();
        file_name.push(".");
        file_name.push(TEMP_EXTENSION);
        self.path.with_file_name(file_name)
    }
}

#[async_trait]
impl DocumentStorage for JsonFileStorage {
    async fn load(&self) -> Result<Vec<Document>> {
        trace!("Loading collection '{}' from {:?}", self.name, self.path);
        if !exists(&self.path).await {
            self.create_file().await?;
            return Ok(Vec::new());
        }

        let content = file_io(
            || format!("Error reading collection \"{}\"", self.name),
            tokio_fs::read_to_string(&self.path),
        )
        .await?;
        let documents = self.parse(&content)?;
        debug!(
            "Loaded {} document(s) for collection '{}'",
            documents.len(),
            self.name
        );
        Ok(documents)
    }

    async fn save(&self, documents: &[Document]) -> Result<()> {
        trace!(
            "Saving {} document(s) for collection '{}'",
            documents.len(),
            self.name
        );
        let content = serde_json::to_string_pretty(documents)?;
        let context = || format!("Error saving document to collection \"{}\"", self.name);

        match self.config.write_mode {
            WriteMode::Overwrite => file_io(context, tokio_fs::write(&self.path, content)).await?,
            WriteMode::Atomic => {
                let temp_path = self.temp_path();
                file_io(context, tokio_fs::write(&temp_path, content)).await?;
                file_io(context, tokio_fs::rename(&temp_path, &self.path)).await?;
            },
        }
        debug!("Collection '{}' flushed to {:?}", self.name, self.path);
        Ok(())
    }

    async fn remove(&self) -> Result<()> {
        if !exists(&self.path).await {
            debug!("Collection file {:?} already absent", self.path);
            return Ok(());
        }
        file_io(
            || format!("Error deleting collection \"{}\"", self.name),
            tokio_fs::remove_file(&self.path),
        )
        .await?;
        debug!("Collection file {:?} removed", self.path);
        Ok(())
    }
}
