//! The root registry of stores.

use std::{collections::HashSet, sync::Arc};

use tokio::sync::Mutex;
use tracing::{debug, trace, warn};

use crate::{
    config::{HiveConfig, HivePaths},
    io::ensure_folder,
    metadata::{read_info_file, write_info_file, DatabaseInfo},
    store::validation::validate_database_name,
    HiveError,
    Result,
    Store,
};

/// Human-readable name of the registry metadata, used in error messages.
const DATABASES_INFO_CONTEXT: &str = "databases info";

/// The registry of every store under one root directory.
///
/// A `Hive` is an explicit value: construct it with [`Hive::open`], which reads
/// `data-folder/databases-info.json` and opens every listed store, then create or
/// delete stores through it. Every change rewrites the metadata file.
///
/// ```rust
/// use hive_dbms::{FieldSpec, Hive, HiveConfig, Schema};
/// use serde_json::json;
///
/// # async fn example() -> hive_dbms::Result<()> {
/// let root = tempfile::tempdir().unwrap();
/// let hive = Hive::open(HiveConfig::with_root(root.path())).await?;
///
/// let shop = hive.create_database("shop").await?;
/// let users = shop
///     .create_collection("users", Schema::new().field("name", FieldSpec::string())?)
///     .await?;
/// users.create(json!({"name": "Ada"})).await?;
///
/// assert_eq!(hive.list_databases().await, vec!["shop".to_owned()]);
/// # Ok(())
/// # }
/// # tokio::runtime::Runtime::new().unwrap().block_on(example()).unwrap();
/// ```
#[derive(Debug)]
pub struct Hive {
    /// Configuration the registry was opened with
    config: HiveConfig,
    /// Paths derived from the root
    paths:  HivePaths,
    /// Known stores
    state:  Mutex<HiveState>,
}

/// Mutable part of a [`Hive`].
#[derive(Debug, Default)]
struct HiveState {
    /// Stores in metadata order
    stores:  Vec<Arc<Store>>,
    /// Names passed to `create_database` during this instance's lifetime
    created: HashSet<String>,
}

impl HiveState {
    /// Returns the store with this name.
    fn get(&self, name: &str) -> Option<&Arc<Store>> { self.stores.iter().find(|store| store.name() == name) }

    /// Metadata entries for every known store.
    fn infos(&self) -> Vec<DatabaseInfo> {
        self.stores
            .iter()
            .map(|store| {
                DatabaseInfo {
                    name: store.name().to_owned(),
                }
            })
            .collect()
    }
}

impl Hive {
    /// Opens the registry described by `config`.
    ///
    /// Creates the metadata folders when missing and opens every store listed in
    /// the registry metadata file. Entries with an invalid or repeated name are
    /// skipped with a warning.
    ///
    /// # Errors
    ///
    /// Returns [`HiveError::FolderIo`] if a folder cannot be created, or
    /// [`HiveError::FileIo`] if a metadata file exists but cannot be read.
    pub async fn open(config: HiveConfig) -> Result<Self> {
        trace!("Opening hive at {:?}", config.root);
        let paths = config.paths();
        ensure_folder(&paths.data_dir, || "Error creating data folder".to_owned()).await?;
        ensure_folder(&paths.collections_dir, || {
            "Error creating collections info folder".to_owned()
        })
        .await?;

        let infos: Vec<DatabaseInfo> = read_info_file(&paths.databases_info_path, DATABASES_INFO_CONTEXT).await?;
        let mut state = HiveState::default();
        for info in infos {
            if validate_database_name(&info.name).is_err() {
                warn!("Skipping database with invalid name '{}'", info.name);
                continue;
            }
            if state.get(&info.name).is_some() {
                warn!("Skipping repeated database '{}'", info.name);
                continue;
            }
            let store = Store::open(info.name, &paths, config.collection).await?;
            state.stores.push(Arc::new(store));
        }

        debug!("Hive opened with {} known database(s)", state.stores.len());
        Ok(Self {
            config,
            paths,
            state: Mutex::new(state),
        })
    }

    /// Returns the configuration of the registry.
    pub const fn config(&self) -> &HiveConfig { &self.config }

    /// Returns the paths derived from the root directory.
    pub const fn paths(&self) -> &HivePaths { &self.paths }

    /// Creates the store `name`.
    ///
    /// A store already known from the metadata file is returned as is.
    ///
    /// # Errors
    ///
    /// - [`HiveError::InvalidName`] if `name` breaks the naming rules
    /// - [`HiveError::DatabaseExists`] if this registry instance already created it
    /// - [`HiveError::FolderIo`] / [`HiveError::FileIo`] if its folders or the metadata
    ///   file cannot be written
    pub async fn create_database(&self, name: &str) -> Result<Arc<Store>> {
        trace!("Creating database '{}'", name);
        validate_database_name(name)?;

        let mut state = self.state.lock().await;
        if state.created.contains(name) {
            warn!("Database '{}' already created", name);
            return Err(HiveError::DatabaseExists {
                name: name.to_owned(),
            });
        }
        if let Some(existing) = state.get(name).cloned() {
            state.created.insert(name.to_owned());
            debug!("Database '{}' reopened from metadata", name);
            return Ok(existing);
        }

        let store = Arc::new(Store::open(name, &self.paths, self.config.collection).await?);
        state.stores.push(Arc::clone(&store));
        state.created.insert(name.to_owned());
        write_info_file(
            &self.paths.databases_info_path,
            &state.infos(),
            DATABASES_INFO_CONTEXT,
        )
        .await?;

        debug!("Database '{}' created", name);
        Ok(store)
    }

    /// Returns the store `name` if the registry knows it.
    pub async fn database(&self, name: &str) -> Option<Arc<Store>> { self.state.lock().await.get(name).cloned() }

    /// Lists the names of every known store in metadata order.
    pub async fn list_databases(&self) -> Vec<String> {
        self.state
            .lock()
            .await
            .stores
            .iter()
            .map(|store| store.name().to_owned())
            .collect()
    }

    /// Deletes the store `name` with all its collections.
    ///
    /// # Errors
    ///
    /// - [`HiveError::DatabaseNotFound`] if the registry does not know `name`
    /// - [`HiveError::FolderIo`] / [`HiveError::FileIo`] if removal or the metadata
    ///   rewrite fails
    pub async fn delete_database(&self, name: &str) -> Result<()> {
        trace!("Deleting database '{}'", name);
        let mut state = self.state.lock().await;
        let Some(index) = state
            .stores
            .iter()
            .position(|store| store.name() == name)
        else {
            warn!("Database '{}' not found", name);
            return Err(HiveError::DatabaseNotFound {
                name: name.to_owned(),
            });
        };

        if let Some(store) = state.stores.get(index) {
            store.delete_store().await?;
        }
        state.stores.remove(index);
        state.created.remove(name);
        write_info_file(
            &self.paths.databases_info_path,
            &state.infos(),
            DATABASES_INFO_CONTEXT,
        )
        .await?;

        debug!("Database '{}' deleted", name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tokio::fs;

    use super::*;
    use crate::{FieldSpec, Schema};

    async fn open_hive(root: &std::path::Path) -> Hive { Hive::open(HiveConfig::with_root(root)).await.unwrap() }

    #[tokio::test]
    async fn test_open_creates_metadata_folders() {
        let temp_dir = tempfile::tempdir().unwrap();
        let hive = open_hive(temp_dir.path()).await;

        assert!(temp_dir.path().join("data-folder").is_dir());
        assert!(temp_dir
            .path()
            .join("data-folder")
            .join("collections")
            .is_dir());
        assert!(hive.list_databases().await.is_empty());
        assert_eq!(hive.config().root, temp_dir.path());
    }

    #[tokio::test]
    async fn test_create_database_records_metadata() {
        let temp_dir = tempfile::tempdir().unwrap();
        let hive = open_hive(temp_dir.path()).await;

        let shop = hive.create_database("shop").await.unwrap();
        assert_eq!(shop.name(), "shop");
        assert!(temp_dir.path().join("hives").join("shop").is_dir());

        let raw = fs::read_to_string(&hive.paths().databases_info_path)
            .await
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value, json!([{"name": "shop"}]));
    }

    #[tokio::test]
    async fn test_create_database_twice_fails() {
        let temp_dir = tempfile::tempdir().unwrap();
        let hive = open_hive(temp_dir.path()).await;

        hive.create_database("shop").await.unwrap();
        match hive.create_database("shop").await {
            Err(HiveError::DatabaseExists {
                name,
            }) => assert_eq!(name, "shop"),
            other => panic!("expected DatabaseExists, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_create_database_rejects_invalid_name() {
        let temp_dir = tempfile::tempdir().unwrap();
        let hive = open_hive(temp_dir.path()).await;

        assert!(matches!(
            hive.create_database("PRN").await,
            Err(HiveError::InvalidName { .. })
        ));
        assert!(hive.list_databases().await.is_empty());
    }

    #[tokio::test]
    async fn test_reopen_restores_stores_and_data() {
        let temp_dir = tempfile::tempdir().unwrap();
        {
            let hive = open_hive(temp_dir.path()).await;
            let shop = hive.create_database("shop").await.unwrap();
            hive.create_database("blog").await.unwrap();
            let users = shop
                .create_collection(
                    "users",
                    Schema::new()
                        .field("name", FieldSpec::string().required())
                        .unwrap(),
                )
                .await
                .unwrap();
            users.create(json!({"name": "Ada"})).await.unwrap();
        }

        let hive = open_hive(temp_dir.path()).await;
        assert_eq!(
            hive.list_databases().await,
            vec!["shop".to_owned(), "blog".to_owned()]
        );
        let shop = hive.database("shop").await.unwrap();
        let users = shop.collection("users").await.unwrap();
        let ada = users
            .find_one(&json!({"name": "Ada"}))
            .await
            .unwrap();
        assert!(ada.is_some());

        // Known from metadata: returned, and only then counted as created.
        let again = hive.create_database("shop").await.unwrap();
        assert!(Arc::ptr_eq(&again, &shop));
        assert!(matches!(
            hive.create_database("shop").await,
            Err(HiveError::DatabaseExists { .. })
        ));
    }

    #[tokio::test]
    async fn test_delete_database() {
        let temp_dir = tempfile::tempdir().unwrap();
        let hive = open_hive(temp_dir.path()).await;
        let shop = hive.create_database("shop").await.unwrap();
        shop.create_collection("users", Schema::new())
            .await
            .unwrap();

        hive.delete_database("shop").await.unwrap();
        assert!(!temp_dir.path().join("hives").join("shop").exists());
        assert!(!hive
            .paths()
            .collections_info_path("shop")
            .exists());
        assert!(hive.database("shop").await.is_none());

        let hive = open_hive(temp_dir.path()).await;
        assert!(hive.list_databases().await.is_empty());
    }

    #[tokio::test]
    async fn test_stale_store_cannot_touch_recreated_database() {
        let temp_dir = tempfile::tempdir().unwrap();
        let hive = open_hive(temp_dir.path()).await;
        let old = hive.create_database("shop").await.unwrap();
        let old_users = old
            .create_collection("users", Schema::new().field("name", FieldSpec::string()).unwrap())
            .await
            .unwrap();

        hive.delete_database("shop").await.unwrap();
        let fresh = hive.create_database("shop").await.unwrap();
        let users = fresh
            .create_collection("users", Schema::new().field("name", FieldSpec::string()).unwrap())
            .await
            .unwrap();
        users.create(json!({"name": "new"})).await.unwrap();

        assert!(matches!(
            old_users.create(json!({"name": "stale"})).await,
            Err(HiveError::CollectionNotFound { .. })
        ));
        assert!(matches!(
            old.create_collection("orders", Schema::new()).await,
            Err(HiveError::DatabaseNotFound { .. })
        ));
        assert!(matches!(
            old.delete_collection("users").await,
            Err(HiveError::DatabaseNotFound { .. })
        ));

        let hive = open_hive(temp_dir.path()).await;
        let shop = hive.database("shop").await.unwrap();
        assert_eq!(shop.list_collections().await, vec!["users".to_owned()]);
        let users = shop.collection("users").await.unwrap();
        assert_eq!(users.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_delete_unknown_database() {
        let temp_dir = tempfile::tempdir().unwrap();
        let hive = open_hive(temp_dir.path()).await;

        assert!(matches!(
            hive.delete_database("ghost").await,
            Err(HiveError::DatabaseNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_corrupt_registry_metadata_starts_empty() {
        let temp_dir = tempfile::tempdir().unwrap();
        let paths = HivePaths::new(temp_dir.path());
        fs::create_dir_all(&paths.data_dir).await.unwrap();
        fs::write(&paths.databases_info_path, "[{\"name\":")
            .await
            .unwrap();

        let hive = open_hive(temp_dir.path()).await;
        assert!(hive.list_databases().await.is_empty());
        hive.create_database("shop").await.unwrap();
        assert_eq!(hive.list_databases().await, vec!["shop".to_owned()]);
    }
}
