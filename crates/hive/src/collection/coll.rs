use std::path::Path;

use chrono::{DateTime, Utc};
use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, trace, warn};

use crate::{
    config::CollectionConfig,
    persistence::{DocumentStorage, JsonFileStorage},
    schema::Schema,
    store::validation::validate_collection_name,
    Document,
    HiveError,
    Result,
};

/// A collection is a named, schema-typed set of documents backed by one file.
///
/// The collection keeps every document in an in-memory cache that is the source of
/// truth while the process runs. Writes validate against the [`Schema`], mutate the
/// cache and then flush the whole cache through its [`DocumentStorage`]; reads only
/// look at the cache and never touch disk once it is loaded.
///
/// # Locking
///
/// The cache sits behind a `tokio::sync::RwLock`. Mutations hold the exclusive lock
/// from the cache change until the flush completes, so two tasks writing to the same
/// collection can never interleave their flushes.
///
/// # Example
///
/// ```rust
/// use hive_dbms::{Collection, FieldSpec, Schema};
/// use serde_json::json;
///
/// # async fn example() -> hive_dbms::Result<()> {
/// let dir = tempfile::tempdir().unwrap();
/// let schema = Schema::new()
///     .field("name", FieldSpec::string().required())?
///     .field("age", FieldSpec::number())?;
/// let users = Collection::open("users", "app", schema, dir.path().join("users.json"), Default::default())?;
///
/// let ada = users.create(json!({"name": "Ada", "age": 30})).await?;
/// let found = users.find_by_id(ada.id()).await?;
/// assert_eq!(found, Some(ada));
/// # Ok(())
/// # }
/// # tokio::runtime::Runtime::new().unwrap().block_on(example()).unwrap();
/// ```
#[derive(Debug)]
#[allow(
    clippy::field_scoped_visibility_modifiers,
    reason = "fields need to be pub(crate) for internal access"
)]
pub struct Collection {
    /// The collection name.
    pub(crate) name:       String,
    /// The name of the owning store.
    pub(crate) store_name: String,
    /// Field declarations, fixed for the lifetime of the collection.
    pub(crate) schema:     Schema,
    /// Persistence gateway of the collection.
    pub(crate) storage:    Box<dyn DocumentStorage>,
    /// The document cache.
    pub(crate) cache:      RwLock<Cache>,
    /// When this collection instance was constructed.
    pub(crate) created_at: DateTime<Utc>,
    /// When the collection last flushed a mutation.
    pub(crate) updated_at: std::sync::RwLock<DateTime<Utc>>,
}

/// Ordered documents of a collection plus its load state.
#[derive(Debug, Default)]
pub(crate) struct Cache {
    /// Documents in insertion order.
    pub(crate) documents: Vec<Document>,
    /// Set once the backing file has been read.
    pub(crate) loaded:    bool,
    /// Set by `delete_collection`; every later operation fails.
    pub(crate) deleted:   bool,
}

impl Cache {
    /// Position of the document with this identifier.
    pub(crate) fn position_by_id(&self, id: &str) -> Option<usize> {
        self.documents
            .iter()
            .position(|doc| doc.id() == id)
    }

    /// Drops every document and marks the collection as deleted.
    pub(crate) fn detach(&mut self) {
        self.documents.clear();
        self.loaded = true;
        self.deleted = true;
    }
}

impl Collection {
    /// Creates a collection over any storage backend. Does not touch disk.
    ///
    /// # Errors
    ///
    /// Returns [`crate::HiveError::InvalidName`] if `name` breaks the naming rules.
    pub fn new(
        name: impl Into<String>,
        store_name: impl Into<String>,
        schema: Schema,
        storage: impl DocumentStorage + 'static,
    ) -> Result<Self> {
        let name = name.into();
        validate_collection_name(&name)?;
        let now = Utc::now();
        Ok(Self {
            name,
            store_name: store_name.into(),
            schema,
            storage: Box::new(storage),
            cache: RwLock::new(Cache::default()),
            created_at: now,
            updated_at: std::sync::RwLock::new(now),
        })
    }

    /// Creates a collection stored as a JSON file at `path`. Does not touch disk.
    ///
    /// # Errors
    ///
    /// Returns [`crate::HiveError::InvalidName`] if `name` breaks the naming rules.
    pub fn open(
        name: impl Into<String>,
        store_name: impl Into<String>,
        schema: Schema,
        path: impl AsRef<Path>,
        config: CollectionConfig,
    ) -> Result<Self> {
        let name = name.into();
        let storage = JsonFileStorage::new(name.clone(), path.as_ref(), config);
        Self::new(name, store_name, schema, storage)
    }

    /// Returns the name of the collection.
    pub fn name(&self) -> &str { &self.name }

    /// Returns the name of the store owning the collection.
    pub fn store_name(&self) -> &str { &self.store_name }

    /// Returns the schema of the collection.
    pub const fn schema(&self) -> &Schema { &self.schema }

    /// Returns the construction timestamp of the collection.
    pub const fn created_at(&self) -> DateTime<Utc> { self.created_at }

    /// Returns the timestamp of the last flushed mutation.
    pub fn updated_at(&self) -> DateTime<Utc> {
        *self
            .updated_at
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Returns true once the documents have been loaded from storage.
    pub async fn is_initialized(&self) -> bool { self.cache.read().await.loaded }

    /// Loads the documents from storage.
    ///
    /// Every operation initializes the collection on first use, so calling this is
    /// optional. Only the first successful call reads storage; later calls are
    /// no-ops.
    ///
    /// # Errors
    ///
    /// Returns [`crate::HiveError::FileIo`] if the file cannot be created or read, or
    /// [`crate::HiveError::CorruptData`] for unparsable content in strict recovery mode.
    ///
    /// Returns [`crate::HiveError::CollectionNotFound`] once the collection has been
    /// deleted.
    pub async fn init(&self) -> Result<()> {
        let mut cache = self.cache.write().await;
        self.load_into(&mut cache).await
    }

    /// Drops the cached documents and refuses every later operation, without
    /// touching storage.
    pub(crate) async fn detach(&self) { self.cache.write().await.detach(); }

    /// Fails with [`HiveError::CollectionNotFound`] once the collection is deleted.
    fn ensure_live(&self, cache: &Cache) -> Result<()> {
        if cache.deleted {
            return Err(HiveError::CollectionNotFound {
                name: self.name.clone(),
            });
        }
        Ok(())
    }

    /// Fills the cache from storage unless it is already loaded.
    async fn load_into(&self, cache: &mut Cache) -> Result<()> {
        self.ensure_live(cache)?;
        if cache.loaded {
            return Ok(());
        }
        trace!("Initializing collection '{}'", self.name);
        let mut documents = self.storage.load().await?;

        let count = documents.len();
        let mut seen = std::collections::HashSet::with_capacity(count);
        documents.retain(|doc| seen.insert(doc.id().to_owned()));
        if documents.len() != count {
            warn!(
                "Collection '{}' contained {} duplicate document id(s), keeping the first of each",
                self.name,
                count.saturating_sub(documents.len())
            );
        }

        cache.documents = documents;
        cache.loaded = true;
        debug!(
            "Collection '{}' initialized with {} document(s)",
            self.name,
            cache.documents.len()
        );
        Ok(())
    }

    /// Returns a shared view of the loaded cache.
    pub(crate) async fn read_cache(&self) -> Result<RwLockReadGuard<'_, Cache>> {
        let cache = self.cache.read().await;
        self.ensure_live(&cache)?;
        if cache.loaded {
            return Ok(cache);
        }
        drop(cache);

        let mut cache = self.cache.write().await;
        self.load_into(&mut cache).await?;
        Ok(cache.downgrade())
    }

    /// Returns exclusive access to the loaded cache.
    pub(crate) async fn write_cache(&self) -> Result<RwLockWriteGuard<'_, Cache>> {
        let mut cache = self.cache.write().await;
        self.load_into(&mut cache).await?;
        Ok(cache)
    }

    /// Writes the whole cache through the persistence gateway.
    pub(crate) async fn flush(&self, cache: &Cache) -> Result<()> {
        self.storage.save(&cache.documents).await?;
        *self
            .updated_at
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = Utc::now();
        Ok(())
    }
}
