use std::{
    collections::HashSet,
    path::{Path, PathBuf},
    sync::Arc,
};

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::{debug, trace, warn};

use crate::{
    config::{CollectionConfig, HivePaths},
    constants::COLLECTION_EXTENSION,
    io::ensure_folder,
    metadata::{read_info_file, CollectionInfo},
    Collection,
    HiveError,
    Result,
};
use super::validation::{validate_collection_name, validate_database_name};

/// Human-readable name of the collections metadata, used in error messages.
pub(crate) const COLLECTIONS_INFO_CONTEXT: &str = "collections info";

/// A named database owning many collections.
///
/// A `Store` keeps its collection files under `hives/<name>/` and records the name and
/// schema of every collection in `data-folder/collections/<name>-collections.json`.
/// Opening a store reads that metadata file and reconstructs every listed collection
/// without loading its documents; each collection loads lazily on first use.
///
/// # Examples
///
/// ```rust
/// use hive_dbms::{CollectionConfig, FieldSpec, HivePaths, Schema, Store};
/// use serde_json::json;
///
/// # async fn example() -> hive_dbms::Result<()> {
/// let root = tempfile::tempdir().unwrap();
/// let paths = HivePaths::new(root.path());
/// let store = Store::open("shop", &paths, CollectionConfig::default()).await?;
///
/// let schema = Schema::new().field("title", FieldSpec::string().required())?;
/// let products = store.create_collection("products", schema).await?;
/// products.create(json!({"title": "Lamp"})).await?;
///
/// assert_eq!(store.list_collections().await, vec!["products".to_owned()]);
/// # Ok(())
/// # }
/// # tokio::runtime::Runtime::new().unwrap().block_on(example()).unwrap();
/// ```
///
/// # Thread Safety
///
/// `Store` is safe to share across tasks. Collections are handed out as
/// `Arc<Collection>` so one backing file is only ever owned by one instance.
#[derive(Debug)]
#[allow(
    clippy::field_scoped_visibility_modifiers,
    reason = "fields need to be pub(crate) for internal access"
)]
pub struct Store {
    /// The store name.
    pub(crate) name:       String,
    /// Folder holding the collection files.
    pub(crate) root_path:  PathBuf,
    /// The collections metadata file.
    pub(crate) info_path:  PathBuf,
    /// Settings applied to every collection.
    pub(crate) config:     CollectionConfig,
    /// Known collections and the ones created by this instance.
    pub(crate) state:      Mutex<StoreState>,
    /// When the store was opened.
    pub(crate) created_at: DateTime<Utc>,
}

/// Mutable part of a [`Store`].
#[derive(Debug, Default)]
pub(crate) struct StoreState {
    /// Collections in metadata order.
    pub(crate) collections: Vec<Arc<Collection>>,
    /// Names passed to `create_collection` during this instance's lifetime.
    pub(crate) created:     HashSet<String>,
    /// Set by `delete_store`; later collection changes fail.
    pub(crate) deleted:     bool,
}

impl StoreState {
    /// Returns the collection with this name.
    pub(crate) fn get(&self, name: &str) -> Option<&Arc<Collection>> {
        self.collections
            .iter()
            .find(|collection| collection.name() == name)
    }

    /// Metadata entries for every known collection.
    pub(crate) fn infos(&self) -> Vec<CollectionInfo> {
        self.collections
            .iter()
            .map(|collection| {
                CollectionInfo {
                    name:   collection.name().to_owned(),
                    schema: collection.schema().clone(),
                }
            })
            .collect()
    }

    /// Fails with [`HiveError::DatabaseNotFound`] once the store is deleted.
    pub(crate) fn ensure_live(&self, store_name: &str) -> Result<()> {
        if self.deleted {
            return Err(HiveError::DatabaseNotFound {
                name: store_name.to_owned(),
            });
        }
        Ok(())
    }
}

impl Store {
    /// Opens the store `name` under the layout `paths`.
    ///
    /// Creates the store folder and the collections metadata folder when missing, then
    /// reconstructs every collection listed in the metadata file. Entries with an
    /// invalid or repeated name are skipped with a warning.
    ///
    /// # Errors
    ///
    /// - [`crate::HiveError::InvalidName`] if `name` breaks the naming rules
    /// - [`crate::HiveError::FolderIo`] if a folder cannot be created
    /// - [`crate::HiveError::FileIo`] if the metadata file exists but cannot be read
    pub async fn open(name: impl Into<String>, paths: &HivePaths, config: CollectionConfig) -> Result<Self> {
        let name = name.into();
        validate_database_name(&name)?;
        trace!("Opening store '{}'", name);

        let root_path = paths.database_dir(&name);
        ensure_folder(&root_path, || format!("Error creating database \"{}\"", name)).await?;
        ensure_folder(&paths.collections_dir, || {
            format!("Error creating collections info folder for \"{}\"", name)
        })
        .await?;

        let info_path = paths.collections_info_path(&name);
        let infos: Vec<CollectionInfo> = read_info_file(&info_path, COLLECTIONS_INFO_CONTEXT).await?;

        let mut state = StoreState::default();
        for info in infos {
            if validate_collection_name(&info.name).is_err() {
                warn!("Skipping collection with invalid name '{}' in store '{}'", info.name, name);
                continue;
            }
            if state.get(&info.name).is_some() {
                warn!("Skipping repeated collection '{}' in store '{}'", info.name, name);
                continue;
            }
            let path = collection_path(&root_path, &info.name);
            let collection = Collection::open(info.name, name.clone(), info.schema, path, config)?;
            state.collections.push(Arc::new(collection));
        }

        debug!(
            "Store '{}' opened with {} known collection(s)",
            name,
            state.collections.len()
        );
        Ok(Self {
            name,
            root_path,
            info_path,
            config,
            state: Mutex::new(state),
            created_at: Utc::now(),
        })
    }

    /// Returns the name of the store.
    pub fn name(&self) -> &str { &self.name }

    /// Returns the folder holding the collection files.
    pub fn root_path(&self) -> &Path { &self.root_path }

    /// Returns the collections metadata file.
    pub fn info_path(&self) -> &Path { &self.info_path }

    /// Returns the settings applied to every collection.
    pub const fn config(&self) -> CollectionConfig { self.config }

    /// Returns when the store was opened.
    pub const fn created_at(&self) -> DateTime<Utc> { self.created_at }

    /// File of the collection `name` in this store.
    pub(crate) fn collection_path(&self, name: &str) -> PathBuf { collection_path(&self.root_path, name) }
}

/// File of the collection `name` under `root_path`.
fn collection_path(root_path: &Path, name: &str) -> PathBuf {
    root_path.join(format!("{}.{}", name, COLLECTION_EXTENSION))
}
