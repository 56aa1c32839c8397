//! Service layer over [`DocumentRepository`].
//!
//! Thin helpers that attach operation/collection context to failures and log
//! writes. Handlers go through these instead of calling the trait directly.

use tracing::{debug, info, instrument};

use super::repository::{DocumentRepository, RepositoryResult};
use crate::models::{Collection, Document, DocumentId, Filter, FindOptions, ID_FIELD};

/// Check the repository connection.
pub async fn health_check(repo: &dyn DocumentRepository) -> RepositoryResult<bool> {
    repo.health_check()
        .await
        .map_err(|e| e.with_operation("health_check"))
}

/// Store a document and return it with its assigned `_id`.
#[instrument(skip(repo, document), fields(collection = %collection))]
pub async fn create(
    repo: &dyn DocumentRepository,
    collection: Collection,
    mut document: Document,
) -> RepositoryResult<Document> {
    let id = repo
        .insert(collection, document.clone())
        .await
        .map_err(|e| e.with_operation("insert").with_collection(collection))?;
    document.insert(ID_FIELD.to_string(), id.as_str().into());
    info!(%id, "Document created");
    Ok(document)
}

/// Store several documents and return their ids in input order.
#[instrument(skip(repo, documents), fields(collection = %collection, count = documents.len()))]
pub async fn create_many(
    repo: &dyn DocumentRepository,
    collection: Collection,
    documents: Vec<Document>,
) -> RepositoryResult<Vec<DocumentId>> {
    let ids = repo
        .insert_many(collection, documents)
        .await
        .map_err(|e| e.with_operation("insert_many").with_collection(collection))?;
    info!(count = ids.len(), "Documents created");
    Ok(ids)
}

/// All documents matching `filter`.
pub async fn find(
    repo: &dyn DocumentRepository,
    collection: Collection,
    filter: &Filter,
    options: &FindOptions,
) -> RepositoryResult<Vec<Document>> {
    let documents = repo
        .find(collection, filter, options)
        .await
        .map_err(|e| e.with_operation("find").with_collection(collection))?;
    debug!(%collection, count = documents.len(), "Find completed");
    Ok(documents)
}

/// Like [`find`] but `None` instead of an empty list.
pub async fn find_non_empty(
    repo: &dyn DocumentRepository,
    collection: Collection,
    filter: &Filter,
    options: &FindOptions,
) -> RepositoryResult<Option<Vec<Document>>> {
    let documents = find(repo, collection, filter, options).await?;
    Ok((!documents.is_empty()).then_some(documents))
}

/// First document matching `filter`.
pub async fn find_first(
    repo: &dyn DocumentRepository,
    collection: Collection,
    filter: &Filter,
) -> RepositoryResult<Option<Document>> {
    let documents = find(repo, collection, filter, &FindOptions::default()).await?;
    Ok(documents.into_iter().next())
}

pub async fn get_by_id(
    repo: &dyn DocumentRepository,
    collection: Collection,
    id: &DocumentId,
) -> RepositoryResult<Option<Document>> {
    repo.find_by_id(collection, id)
        .await
        .map_err(|e| e.with_operation("find_by_id").with_collection(collection))
}

/// Apply `update` to the first match of `filter`; returns the document as it
/// was before the update.
#[instrument(skip(repo, filter, update), fields(collection = %collection))]
pub async fn update_one(
    repo: &dyn DocumentRepository,
    collection: Collection,
    filter: &Filter,
    update: Document,
) -> RepositoryResult<Option<Document>> {
    let previous = repo
        .find_one_and_update(collection, filter, update)
        .await
        .map_err(|e| {
            e.with_operation("find_one_and_update")
                .with_collection(collection)
        })?;
    match &previous {
        Some(doc) => info!(id = ?DocumentId::of(doc), "Document updated"),
        None => debug!("No document matched update filter"),
    }
    Ok(previous)
}

/// Apply `update` to the document with `id`; returns the previous version.
pub async fn update_by_id(
    repo: &dyn DocumentRepository,
    collection: Collection,
    id: &DocumentId,
    update: Document,
) -> RepositoryResult<Option<Document>> {
    let mut filter = Filter::new();
    filter.insert(ID_FIELD.to_string(), id.as_str().into());
    update_one(repo, collection, &filter, update).await
}

/// Delete by id, returning the removed document.
#[instrument(skip(repo), fields(collection = %collection))]
pub async fn delete(
    repo: &dyn DocumentRepository,
    collection: Collection,
    id: &DocumentId,
) -> RepositoryResult<Option<Document>> {
    let removed = repo
        .delete_by_id(collection, id)
        .await
        .map_err(|e| e.with_operation("delete_by_id").with_collection(collection))?;
    if removed.is_some() {
        info!(%id, "Document deleted");
    }
    Ok(removed)
}

#[cfg(test)]
#[path = "services_tests.rs"]
mod tests;
