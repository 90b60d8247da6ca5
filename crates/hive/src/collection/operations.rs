use serde_json::{Map, Value};
use tracing::{debug, trace};

use crate::{
    filtering::Predicate,
    validation::{json_type_name, project, validate_field_types, validate_required_fields},
    Document,
    HiveError,
    Result,
};
use super::coll::{Cache, Collection};

#[allow(clippy::multiple_inherent_impl, reason = "multiple impl blocks for Collection are intentional for organization")]
impl Collection {
    /// Validates `input` against the schema and stores it as a new document.
    ///
    /// Keys the schema does not declare are dropped before validation. The stored
    /// document gets a fresh `_id` and is appended at the end of the collection.
    ///
    /// # Example
    ///
    /// ```rust
    /// use hive_dbms::{Collection, FieldSpec, HiveError, Schema};
    /// use serde_json::json;
    ///
    /// # async fn example() -> hive_dbms::Result<()> {
    /// let dir = tempfile::tempdir().unwrap();
    /// let schema = Schema::new()
    ///     .field("name", FieldSpec::string().required())?
    ///     .field("age", FieldSpec::number())?;
    /// let users = Collection::open("users", "app", schema, dir.path().join("users.json"), Default::default())?;
    ///
    /// let bo = users.create(json!({"name": "Bo", "extra": "x"})).await?;
    /// assert!(bo.field("extra").is_none());
    ///
    /// let missing = users.create(json!({"age": 30})).await;
    /// assert!(matches!(missing, Err(HiveError::ValidationFailed { .. })));
    /// # Ok(())
    /// # }
    /// # tokio::runtime::Runtime::new().unwrap().block_on(example()).unwrap();
    /// ```
    ///
    /// # Errors
    ///
    /// - [`HiveError::UndefinedDocument`] if `input` is `null`
    /// - [`HiveError::InvalidDocument`] if `input` is not an object
    /// - [`HiveError::ValidationFailed`] if a required field is missing
    /// - [`HiveError::InvalidFieldType`] if a field has the wrong type
    /// - [`HiveError::FileIo`] if the flush fails
    pub async fn create(&self, input: Value) -> Result<Document> {
        trace!("Creating document in collection '{}'", self.name);
        let fields = self.prepare_new(input)?;

        let mut cache = self.write_cache().await?;
        let document = push_new(&mut cache, fields);
        self.flush(&cache).await?;

        debug!(
            "Document '{}' created in collection '{}'",
            document.id(),
            self.name
        );
        Ok(document)
    }

    /// Stores several documents with a single flush.
    ///
    /// Every input is validated before anything is stored; if one fails, the
    /// collection is left untouched.
    ///
    /// # Errors
    ///
    /// Same as [`Collection::create`], reported for the first failing input.
    pub async fn create_many(&self, inputs: Vec<Value>) -> Result<Vec<Document>> {
        trace!(
            "Creating {} document(s) in collection '{}'",
            inputs.len(),
            self.name
        );
        let prepared = inputs
            .into_iter()
            .map(|input| self.prepare_new(input))
            .collect::<Result<Vec<_>>>()?;
        if prepared.is_empty() {
            return Ok(Vec::new());
        }

        let mut cache = self.write_cache().await?;
        let documents: Vec<Document> = prepared
            .into_iter()
            .map(|fields| push_new(&mut cache, fields))
            .collect();
        self.flush(&cache).await?;

        debug!(
            "{} document(s) created in collection '{}'",
            documents.len(),
            self.name
        );
        Ok(documents)
    }

    /// Merges `patch` into the document with identifier `id`.
    ///
    /// Returns `None` without writing if the document does not exist. A patch that
    /// is empty after projection returns the document unchanged without writing.
    ///
    /// # Errors
    ///
    /// - [`HiveError::InvalidDocument`] if `patch` is not an object
    /// - [`HiveError::InvalidFieldType`] if a patched field has the wrong type
    /// - [`HiveError::FileIo`] if the flush fails
    pub async fn update_by_id(&self, id: &str, patch: Value) -> Result<Option<Document>> {
        trace!("Updating document '{}' in collection '{}'", id, self.name);
        let patch = patch_fields(patch)?;

        let mut cache = self.write_cache().await?;
        let Some(index) = cache.position_by_id(id)
        else {
            debug!("Document '{}' not found in collection '{}'", id, self.name);
            return Ok(None);
        };
        let updated = self
            .apply_patch(&mut cache, &[index], patch)
            .await?;
        Ok(updated.into_iter().next())
    }

    /// Merges `patch` into the first document matching `predicate`.
    ///
    /// An empty predicate matches nothing and returns `None`.
    ///
    /// # Errors
    ///
    /// [`HiveError::InvalidQuery`] for a non-object predicate, otherwise as
    /// [`Collection::update_by_id`].
    pub async fn update_one(&self, predicate: &Value, patch: Value) -> Result<Option<Document>> {
        let predicate = Predicate::from_value(predicate)?;
        let patch = patch_fields(patch)?;
        if predicate.is_empty() {
            debug!("Empty predicate, update_one on '{}' is a no-op", self.name);
            return Ok(None);
        }

        let mut cache = self.write_cache().await?;
        let Some(index) = cache
            .documents
            .iter()
            .position(|doc| predicate.matches(doc))
        else {
            return Ok(None);
        };
        let updated = self
            .apply_patch(&mut cache, &[index], patch)
            .await?;
        Ok(updated.into_iter().next())
    }

    /// Merges `patch` into every document matching `predicate`.
    ///
    /// Returns the updated documents in collection order. An empty predicate matches
    /// nothing; an empty patch returns the matched documents unchanged.
    ///
    /// The flush happens once after every match is patched; if it fails, the cache
    /// keeps the patched documents.
    ///
    /// # Errors
    ///
    /// [`HiveError::InvalidQuery`] for a non-object predicate, otherwise as
    /// [`Collection::update_by_id`].
    pub async fn update_many(&self, predicate: &Value, patch: Value) -> Result<Vec<Document>> {
        let predicate = Predicate::from_value(predicate)?;
        let patch = patch_fields(patch)?;
        if predicate.is_empty() {
            debug!("Empty predicate, update_many on '{}' is a no-op", self.name);
            return Ok(Vec::new());
        }

        let mut cache = self.write_cache().await?;
        let targets: Vec<usize> = cache
            .documents
            .iter()
            .enumerate()
            .filter(|&(_, doc)| predicate.matches(doc))
            .map(|(index, _)| index)
            .collect();
        if targets.is_empty() {
            return Ok(Vec::new());
        }
        self.apply_patch(&mut cache, &targets, patch).await
    }

    /// Removes the document with identifier `id`.
    ///
    /// Succeeds whether or not the document existed; the collection file is written
    /// in both cases.
    ///
    /// # Errors
    ///
    /// Returns [`HiveError::FileIo`] if the flush fails.
    pub async fn delete_by_id(&self, id: &str) -> Result<()> {
        trace!("Deleting document '{}' from collection '{}'", id, self.name);
        let mut cache = self.write_cache().await?;
        if let Some(index) = cache.position_by_id(id) {
            cache.documents.remove(index);
            debug!("Document '{}' deleted from collection '{}'", id, self.name);
        }
        else {
            debug!("Document '{}' not found in collection '{}'", id, self.name);
        }
        self.flush(&cache).await
    }

    /// Removes the first document matching `predicate`.
    ///
    /// An empty predicate deletes nothing and does not write.
    ///
    /// # Errors
    ///
    /// [`HiveError::InvalidQuery`] for a non-object predicate, [`HiveError::FileIo`] if
    /// the flush fails.
    pub async fn delete_one(&self, predicate: &Value) -> Result<()> {
        let predicate = Predicate::from_value(predicate)?;
        if predicate.is_empty() {
            debug!("Empty predicate, delete_one on '{}' is a no-op", self.name);
            return Ok(());
        }

        let mut cache = self.write_cache().await?;
        if let Some(index) = cache
            .documents
            .iter()
            .position(|doc| predicate.matches(doc))
        {
            let removed = cache.documents.remove(index);
            debug!(
                "Document '{}' deleted from collection '{}'",
                removed.id(),
                self.name
            );
        }
        self.flush(&cache).await
    }

    /// Removes every document matching `predicate`.
    ///
    /// An empty predicate deletes nothing and does not write.
    ///
    /// # Errors
    ///
    /// [`HiveError::InvalidQuery`] for a non-object predicate, [`HiveError::FileIo`] if
    /// the flush fails.
    pub async fn delete_many(&self, predicate: &Value) -> Result<()> {
        let predicate = Predicate::from_value(predicate)?;
        if predicate.is_empty() {
            debug!("Empty predicate, delete_many on '{}' is a no-op", self.name);
            return Ok(());
        }

        let mut cache = self.write_cache().await?;
        let before = cache.documents.len();
        cache.documents.retain(|doc| !predicate.matches(doc));
        debug!(
            "{} document(s) deleted from collection '{}'",
            before.saturating_sub(cache.documents.len()),
            self.name
        );
        self.flush(&cache).await
    }

    /// Deletes the collection file and empties the cache.
    ///
    /// Every later operation on this instance fails with
    /// [`HiveError::CollectionNotFound`], so a stale handle can never rewrite a file
    /// that now belongs to a new collection of the same name. Deleting twice is a
    /// no-op.
    ///
    /// # Errors
    ///
    /// Returns [`HiveError::FileIo`] if the file exists but cannot be removed.
    pub async fn delete_collection(&self) -> Result<()> {
        trace!("Deleting collection '{}'", self.name);
        let mut cache = self.cache.write().await;
        if cache.deleted {
            return Ok(());
        }
        self.storage.remove().await?;
        cache.detach();
        debug!("Collection '{}' deleted", self.name);
        Ok(())
    }

    /// Projects and fully validates a create input.
    fn prepare_new(&self, input: Value) -> Result<Map<String, Value>> {
        let mut fields = match input {
            Value::Null => return Err(HiveError::UndefinedDocument),
            Value::Object(fields) => fields,
            other => {
                return Err(HiveError::InvalidDocument {
                    reason: format!("a document must be an object, got {}", json_type_name(&other)),
                });
            },
        };
        project(&mut fields, &self.schema);
        validate_required_fields(&fields, &self.schema)?;
        validate_field_types(&fields, &self.schema)?;
        Ok(fields)
    }

    /// Projects and type-checks `patch`, then merges it into the documents at
    /// `targets` and flushes.
    ///
    /// A patch that is empty after projection returns the targets unchanged.
    async fn apply_patch(&self, cache: &mut Cache, targets: &[usize], mut patch: Map<String, Value>) -> Result<Vec<Document>> {
        project(&mut patch, &self.schema);
        if patch.is_empty() {
            debug!("Empty patch, update on '{}' leaves documents unchanged", self.name);
            return Ok(targets
                .iter()
                .filter_map(|&index| cache.documents.get(index).cloned())
                .collect());
        }
        validate_field_types(&patch, &self.schema)?;

        let mut updated = Vec::with_capacity(targets.len());
        for &index in targets {
            if let Some(slot) = cache.documents.get_mut(index) {
                *slot = slot.merged(&patch);
                updated.push(slot.clone());
            }
        }
        self.flush(cache).await?;
        debug!(
            "{} document(s) updated in collection '{}'",
            updated.len(),
            self.name
        );
        Ok(updated)
    }
}

/// Unwraps a patch value. `null` is the empty patch.
fn patch_fields(patch: Value) -> Result<Map<String, Value>> {
    match patch {
        Value::Null => Ok(Map::new()),
        Value::Object(fields) => Ok(fields),
        other => {
            Err(HiveError::InvalidDocument {
                reason: format!("a patch must be an object, got {}", json_type_name(&other)),
            })
        },
    }
}

/// Appends a new document, regenerating its identifier on the unlikely collision.
fn push_new(cache: &mut Cache, fields: Map<String, Value>) -> Document {
    let mut document = Document::with_new_id(fields);
    while cache.position_by_id(document.id()).is_some() {
        document.regenerate_id();
    }
    cache.documents.push(document.clone());
    document
}
