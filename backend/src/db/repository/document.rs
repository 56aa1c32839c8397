//! Generic document CRUD trait.
//!
//! The operations mirror a document database accessor: insert, equality
//! find (optionally sorted), find by id, find-one-and-update, update by id and
//! delete by id. Updates are shallow field sets and return the document as it
//! was before the write.

use async_trait::async_trait;

use super::error::RepositoryResult;
use crate::models::{
    Collection, Document, DocumentId, Filter, FindOptions, ID_FIELD,
};

/// Repository trait for document storage.
///
/// # Thread Safety
/// Implementations must be `Send + Sync` to work with async Rust.
#[async_trait]
pub trait DocumentRepository: Send + Sync {
    /// Check if the storage backend is reachable.
    ///
    /// # Returns
    /// - `Ok(true)` if connection is healthy
    /// - `Ok(false)` if connection is unhealthy but no error occurred
    /// - `Err(RepositoryError)` if an error occurred during the check
    async fn health_check(&self) -> RepositoryResult<bool>;

    /// Insert one document and return its id.
    ///
    /// A string `_id` already present in the document is kept; otherwise a
    /// fresh id is generated.
    async fn insert(&self, collection: Collection, document: Document)
        -> RepositoryResult<DocumentId>;

    /// Insert several documents, returning their ids in input order.
    async fn insert_many(
        &self,
        collection: Collection,
        documents: Vec<Document>,
    ) -> RepositoryResult<Vec<DocumentId>> {
        let mut ids = Vec::with_capacity(documents.len());
        for document in documents {
            ids.push(self.insert(collection, document).await?);
        }
        Ok(ids)
    }

    /// Find all documents whose fields equal every entry of `filter`.
    ///
    /// Without a sort, documents come back in insertion order.
    async fn find(
        &self,
        collection: Collection,
        filter: &Filter,
        options: &FindOptions,
    ) -> RepositoryResult<Vec<Document>>;

    /// Fetch a single document by id.
    ///
    /// # Returns
    /// * `Ok(None)` - If no document has this id
    async fn find_by_id(
        &self,
        collection: Collection,
        id: &DocumentId,
    ) -> RepositoryResult<Option<Document>>;

    /// Set the fields of `update` on the first document matching `filter`.
    ///
    /// # Returns
    /// * `Ok(Some(previous))` - The document before the update
    /// * `Ok(None)` - If nothing matched
    async fn find_one_and_update(
        &self,
        collection: Collection,
        filter: &Filter,
        update: Document,
    ) -> RepositoryResult<Option<Document>>;

    /// Set the fields of `update` on the document with this id.
    async fn update_by_id(
        &self,
        collection: Collection,
        id: &DocumentId,
        update: Document,
    ) -> RepositoryResult<Option<Document>> {
        let mut filter = Filter::new();
        filter.insert(ID_FIELD.to_string(), id.as_str().into());
        self.find_one_and_update(collection, &filter, update).await
    }

    /// Delete the document with this id, returning it.
    async fn delete_by_id(
        &self,
        collection: Collection,
        id: &DocumentId,
    ) -> RepositoryResult<Option<Document>>;
}
