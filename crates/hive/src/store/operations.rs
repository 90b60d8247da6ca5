use std::sync::Arc;

use tokio::fs as tokio_fs;
use tracing::{debug, trace, warn};

use crate::{
    io::{exists, file_io, folder_io},
    metadata::write_info_file,
    schema::Schema,
    Collection,
    HiveError,
    Result,
};
use super::{
    stor::{Store, StoreState, COLLECTIONS_INFO_CONTEXT},
    validation::validate_collection_name,
};

#[allow(clippy::multiple_inherent_impl, reason = "multiple impl blocks for Store are intentional for organization")]
impl Store {
    /// Creates the collection `name` and loads its documents.
    ///
    /// If the collection is already known from the metadata file, the existing
    /// instance is initialized and returned; its stored schema is kept and a
    /// different `schema` argument only produces a warning. Otherwise a new collection
    /// is recorded in the metadata file.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use hive_dbms::{CollectionConfig, FieldSpec, HiveError, HivePaths, Schema, Store};
    ///
    /// # async fn example() -> hive_dbms::Result<()> {
    /// let root = tempfile::tempdir().unwrap();
    /// let store = Store::open("shop", &HivePaths::new(root.path()), CollectionConfig::default()).await?;
    /// let schema = Schema::new().field("title", FieldSpec::string())?;
    ///
    /// store.create_collection("products", schema.clone()).await?;
    /// let again = store.create_collection("products", schema).await;
    /// assert!(matches!(again, Err(HiveError::CollectionExists { .. })));
    /// # Ok(())
    /// # }
    /// # tokio::runtime::Runtime::new().unwrap().block_on(example()).unwrap();
    /// ```
    ///
    /// # Errors
    ///
    /// - [`HiveError::InvalidName`] if `name` breaks the naming rules
    /// - [`HiveError::CollectionExists`] if this store instance already created it
    /// - [`HiveError::DatabaseNotFound`] if the store was deleted
    /// - [`HiveError::FileIo`] if the collection or metadata file cannot be written
    pub async fn create_collection(&self, name: &str, schema: Schema) -> Result<Arc<Collection>> {
        trace!("Creating collection '{}' in store '{}'", name, self.name);
        validate_collection_name(name)?;

        let mut state = self.state.lock().await;
        state.ensure_live(&self.name)?;
        if state.created.contains(name) {
            warn!("Collection '{}' already created in store '{}'", name, self.name);
            return Err(HiveError::CollectionExists {
                name: name.to_owned(),
            });
        }

        if let Some(existing) = state.get(name).cloned() {
            if existing.schema() != &schema {
                warn!(
                    "Collection '{}' in store '{}' keeps its stored schema, the given one differs",
                    name, self.name
                );
            }
            existing.init().await?;
            state.created.insert(name.to_owned());
            debug!("Collection '{}' reopened from metadata", name);
            return Ok(existing);
        }

        let collection = Arc::new(Collection::open(
            name,
            self.name.clone(),
            schema,
            self.collection_path(name),
            self.config,
        )?);
        collection.init().await?;
        state.collections.push(Arc::clone(&collection));
        state.created.insert(name.to_owned());
        self.write_infos(&state).await?;

        debug!("Collection '{}' created in store '{}'", name, self.name);
        Ok(collection)
    }

    /// Returns the collection `name` if the store knows it.
    pub async fn collection(&self, name: &str) -> Option<Arc<Collection>> { self.state.lock().await.get(name).cloned() }

    /// Lists the names of every known collection in metadata order.
    pub async fn list_collections(&self) -> Vec<String> {
        self.state
            .lock()
            .await
            .collections
            .iter()
            .map(|collection| collection.name().to_owned())
            .collect()
    }

    /// Deletes the collection `name`: its file, its metadata entry and its instance.
    ///
    /// Handles previously returned for this collection fail with
    /// [`HiveError::CollectionNotFound`] from then on.
    ///
    /// # Errors
    ///
    /// - [`HiveError::CollectionNotFound`] if the store does not know `name`
    /// - [`HiveError::DatabaseNotFound`] if the store itself was deleted
    /// - [`HiveError::FileIo`] if the file or the metadata cannot be written
    pub async fn delete_collection(&self, name: &str) -> Result<()> {
        trace!("Deleting collection '{}' from store '{}'", name, self.name);
        let mut state = self.state.lock().await;
        state.ensure_live(&self.name)?;
        let Some(index) = state
            .collections
            .iter()
            .position(|collection| collection.name() == name)
        else {
            warn!("Collection '{}' not found in store '{}'", name, self.name);
            return Err(HiveError::CollectionNotFound {
                name: name.to_owned(),
            });
        };

        if let Some(collection) = state.collections.get(index) {
            collection.delete_collection().await?;
        }
        state.collections.remove(index);
        state.created.remove(name);
        self.write_infos(&state).await?;

        debug!("Collection '{}' deleted from store '{}'", name, self.name);
        Ok(())
    }

    /// Deletes the store folder with every collection file and the metadata file.
    ///
    /// Afterwards the store and every collection handle it gave out refuse further
    /// writes, so stale handles cannot touch a store recreated under the same name.
    /// Deleting twice is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`HiveError::FolderIo`] or [`HiveError::FileIo`] if removal fails.
    pub async fn delete_store(&self) -> Result<()> {
        trace!("Deleting store '{}'", self.name);
        let mut state = self.state.lock().await;
        if state.deleted {
            return Ok(());
        }

        if exists(&self.root_path).await {
            folder_io(
                || format!("Error deleting database \"{}\"", self.name),
                tokio_fs::remove_dir_all(&self.root_path),
            )
            .await?;
        }
        if exists(&self.info_path).await {
            file_io(
                || format!("Error deleting {} of \"{}\"", COLLECTIONS_INFO_CONTEXT, self.name),
                tokio_fs::remove_file(&self.info_path),
            )
            .await?;
        }
        for collection in &state.collections {
            collection.detach().await;
        }
        state.collections.clear();
        state.created.clear();
        state.deleted = true;

        debug!("Store '{}' deleted", self.name);
        Ok(())
    }

    /// Rewrites the collections metadata file from `state`.
    async fn write_infos(&self, state: &StoreState) -> Result<()> {
        write_info_file(&self.info_path, &state.infos(), COLLECTIONS_INFO_CONTEXT).await
    }
}
