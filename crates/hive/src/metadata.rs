//! Metadata records describing which stores and collections exist.
//!
//! The registry keeps an array of [`DatabaseInfo`] in `databases-info.json` and each
//! store keeps an array of [`CollectionInfo`] in `<store>-collections.json`. Both
//! files are read once at bootstrap and rewritten after every create/delete.

use std::path::Path;

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tokio::fs as tokio_fs;
use tracing::{debug, trace, warn};

use crate::{
    io::{exists, file_io},
    schema::Schema,
    Result,
};

/// A collection known to a store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionInfo {
    /// Collection name
    pub name:   String,
    /// Field declarations of the collection
    pub schema: Schema,
}

/// A store known to the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseInfo {
    /// Store name
    pub name: String,
}

/// Reads a metadata array, returning an empty list when the file is absent or
/// cannot be parsed.
pub async fn read_info_file<T: DeserializeOwned>(path: &Path, context: &str) -> Result<Vec<T>> {
    trace!("Reading metadata file {:?}", path);
    if !exists(path).await {
        debug!("Metadata file {:?} does not exist yet", path);
        return Ok(Vec::new());
    }
    let content = file_io(
        || format!("Error getting {}", context),
        tokio_fs::read_to_string(path),
    )
    .await?;
    if content.trim().is_empty() {
        return Ok(Vec::new());
    }
    match serde_json::from_str(&content) {
        Ok(entries) => Ok(entries),
        Err(e) => {
            warn!("Ignoring unparsable metadata file {:?}: {}", path, e);
            Ok(Vec::new())
        },
    }
}

/// Rewrites a metadata array with 2-space indentation.
pub async fn write_info_file<T: Serialize + Sync>(path: &Path, entries: &[T], context: &str) -> Result<()> {
    let content = serde_json::to_string_pretty(entries)?;
    file_io(
        || format!("Error saving {}", context),
        tokio_fs::write(path, content),
    )
    .await?;
    debug!("Metadata file {:?} written ({} entries)", path, entries.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::schema::FieldSpec;

    #[tokio::test]
    async fn test_missing_metadata_file_is_empty() {
        let temp_dir = tempfile::tempdir().unwrap();
        let entries: Vec<DatabaseInfo> = read_info_file(&temp_dir.path().join("none.json"), "databases info")
            .await
            .unwrap();
        assert!(entries.is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_metadata_file_is_empty() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("shop-collections.json");
        tokio_fs::write(&path, "{not json").await.unwrap();
        let entries: Vec<CollectionInfo> = read_info_file(&path, "collections info").await.unwrap();
        assert!(entries.is_empty());
    }

    #[tokio::test]
    async fn test_collection_info_round_trip_on_disk() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("shop-collections.json");
        let info = CollectionInfo {
            name:   "users".to_owned(),
            schema: Schema::new()
                .field("name", FieldSpec::string().required())
                .unwrap(),
        };
        write_info_file(&path, std::slice::from_ref(&info), "collections info")
            .await
            .unwrap();

        let raw: serde_json::Value = serde_json::from_str(&tokio_fs::read_to_string(&path).await.unwrap()).unwrap();
        assert_eq!(
            raw,
            json!([{"name": "users", "schema": {"name": {"type": "string", "required": true}}}])
        );

        let entries: Vec<CollectionInfo> = read_info_file(&path, "collections info").await.unwrap();
        assert_eq!(entries, vec![info]);
    }
}
