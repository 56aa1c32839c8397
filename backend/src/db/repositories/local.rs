//! In-memory local repository implementation.
//!
//! Documents live in per-collection vectors behind a single lock, which keeps
//! insertion order stable and makes the backend deterministic for tests and
//! local development.

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::db::repository::{DocumentRepository, RepositoryError, RepositoryResult};
use crate::models::{
    apply_update, compare_field, matches_filter, Collection, Document, DocumentId, Filter,
    FindOptions, SortOrder, ID_FIELD,
};

/// In-memory local repository.
///
/// # Example
/// ```
/// use trainer_backend::db::repositories::LocalRepository;
///
/// let repo = LocalRepository::new();
/// assert_eq!(repo.document_count(trainer_backend::models::Collection::Clubs), 0);
/// ```
#[derive(Clone, Default)]
pub struct LocalRepository {
    data: Arc<RwLock<LocalData>>,
}

struct LocalData {
    collections: HashMap<Collection, Vec<Document>>,
    // Connection health
    is_healthy: bool,
}

impl Default for LocalData {
    fn default() -> Self {
        Self {
            collections: HashMap::new(),
            is_healthy: true,
        }
    }
}

impl LocalRepository {
    /// Create a new empty local repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the health status for testing connection failures.
    pub fn set_healthy(&self, healthy: bool) {
        self.data.write().is_healthy = healthy;
    }

    /// Remove every document, keeping the health flag.
    pub fn clear(&self) {
        self.data.write().collections.clear();
    }

    /// Number of documents stored in a collection.
    pub fn document_count(&self, collection: Collection) -> usize {
        self.data
            .read()
            .collections
            .get(&collection)
            .map_or(0, Vec::len)
    }

    fn check_health(&self) -> RepositoryResult<()> {
        if !self.data.read().is_healthy {
            return Err(RepositoryError::connection("Database is not healthy"));
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentRepository for LocalRepository {
    async fn health_check(&self) -> RepositoryResult<bool> {
        Ok(self.data.read().is_healthy)
    }

    async fn insert(
        &self,
        collection: Collection,
        mut document: Document,
    ) -> RepositoryResult<DocumentId> {
        self.check_health()?;

        let id = match document.get(ID_FIELD) {
            None | Some(Value::Null) => DocumentId::generate(),
            Some(_) => DocumentId::of(&document).ok_or_else(|| {
                RepositoryError::validation(format!("{} must be a string or number", ID_FIELD))
            })?,
        };
        document.insert(ID_FIELD.to_string(), Value::String(id.0.clone()));

        let mut data = self.data.write();
        let documents = data.collections.entry(collection).or_default();
        if documents
            .iter()
            .any(|existing| DocumentId::of(existing).as_ref() == Some(&id))
        {
            return Err(RepositoryError::validation(format!(
                "Duplicate document id {} in {}",
                id, collection
            )));
        }
        documents.push(document);
        debug!(%collection, %id, "Inserted document");

        Ok(id)
    }

    async fn find(
        &self,
        collection: Collection,
        filter: &Filter,
        options: &FindOptions,
    ) -> RepositoryResult<Vec<Document>> {
        self.check_health()?;

        let data = self.data.read();
        let mut found: Vec<Document> = data
            .collections
            .get(&collection)
            .map(|documents| {
                documents
                    .iter()
                    .filter(|d| matches_filter(d, filter))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        if let Some(sort) = &options.sort {
            // Stable sort keeps insertion order between equal keys.
            found.sort_by(|a, b| {
                let ordering = compare_field(a.get(&sort.field), b.get(&sort.field));
                match sort.order {
                    SortOrder::Ascending => ordering,
                    SortOrder::Descending => ordering.reverse(),
                }
            });
        }

        Ok(found)
    }

    async fn find_by_id(
        &self,
        collection: Collection,
        id: &DocumentId,
    ) -> RepositoryResult<Option<Document>> {
        self.check_health()?;

        let data = self.data.read();
        Ok(data.collections.get(&collection).and_then(|documents| {
            documents
                .iter()
                .find(|d| DocumentId::of(d).as_ref() == Some(id))
                .cloned()
        }))
    }

    async fn find_one_and_update(
        &self,
        collection: Collection,
        filter: &Filter,
        update: Document,
    ) -> RepositoryResult<Option<Document>> {
        self.check_health()?;

        let mut data = self.data.write();
        let Some(documents) = data.collections.get_mut(&collection) else {
            return Ok(None);
        };
        let Some(document) = documents.iter_mut().find(|d| matches_filter(d, filter)) else {
            return Ok(None);
        };

        let previous = document.clone();
        apply_update(document, &update);
        Ok(Some(previous))
    }

    async fn delete_by_id(
        &self,
        collection: Collection,
        id: &DocumentId,
    ) -> RepositoryResult<Option<Document>> {
        self.check_health()?;

        let mut data = self.data.write();
        let Some(documents) = data.collections.get_mut(&collection) else {
            return Ok(None);
        };
        let position = documents
            .iter()
            .position(|d| DocumentId::of(d).as_ref() == Some(id));
        Ok(position.map(|index| documents.remove(index)))
    }
}
