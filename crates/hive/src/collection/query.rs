use serde_json::Value;
use tracing::{debug, trace};

use crate::{filtering::Predicate, Document, Result};
use super::coll::Collection;

#[allow(clippy::multiple_inherent_impl, reason = "multiple impl blocks for Collection are intentional for organization")]
impl Collection {
    /// Retrieves a document by its identifier.
    ///
    /// Returns `None` if no document has this identifier.
    ///
    /// # Errors
    ///
    /// Fails only if this call triggers the lazy initialization and loading fails.
    pub async fn find_by_id(&self, id: &str) -> Result<Option<Document>> {
        trace!("Finding document by id '{}' in collection '{}'", id, self.name);
        let cache = self.read_cache().await?;
        Ok(cache
            .position_by_id(id)
            .and_then(|index| cache.documents.get(index).cloned()))
    }

    /// Returns the first document in insertion order matching `predicate`.
    ///
    /// An empty (or `null`) predicate matches the first document.
    ///
    /// # Errors
    ///
    /// Returns [`crate::HiveError::InvalidQuery`] if `predicate` is not an object.
    pub async fn find_one(&self, predicate: &Value) -> Result<Option<Document>> {
        let predicate = Predicate::from_value(predicate)?;
        let cache = self.read_cache().await?;
        Ok(cache
            .documents
            .iter()
            .find(|doc| predicate.matches(doc))
            .cloned())
    }

    /// Returns every document matching `predicate`, in insertion order.
    ///
    /// An empty (or `null`) predicate returns all documents.
    ///
    /// # Example
    ///
    /// ```rust
    /// use hive_dbms::{Collection, FieldSpec, Schema};
    /// use serde_json::{json, Value};
    ///
    /// # async fn example() -> hive_dbms::Result<()> {
    /// let dir = tempfile::tempdir().unwrap();
    /// let schema = Schema::new()
    ///     .field("city", FieldSpec::string())?;
    /// let users = Collection::open("users", "app", schema, dir.path().join("users.json"), Default::default())?;
    /// users.create(json!({"city": "NYC"})).await?;
    /// users.create(json!({"city": "LA"})).await?;
    ///
    /// assert_eq!(users.find_many(&json!({"city": "NYC"})).await?.len(), 1);
    /// assert_eq!(users.find_many(&Value::Null).await?.len(), 2);
    /// # Ok(())
    /// # }
    /// # tokio::runtime::Runtime::new().unwrap().block_on(example()).unwrap();
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`crate::HiveError::InvalidQuery`] if `predicate` is not an object.
    pub async fn find_many(&self, predicate: &Value) -> Result<Vec<Document>> {
        let predicate = Predicate::from_value(predicate)?;
        let cache = self.read_cache().await?;
        let documents: Vec<Document> = cache
            .documents
            .iter()
            .filter(|doc| predicate.matches(doc))
            .cloned()
            .collect();
        debug!(
            "Query on collection '{}' matched {} document(s)",
            self.name,
            documents.len()
        );
        Ok(documents)
    }

    /// Returns every document in insertion order.
    pub async fn find_all(&self) -> Result<Vec<Document>> {
        let cache = self.read_cache().await?;
        Ok(cache.documents.clone())
    }

    /// Returns the number of documents in the collection.
    pub async fn count(&self) -> Result<usize> {
        let cache = self.read_cache().await?;
        Ok(cache.documents.len())
    }
}
