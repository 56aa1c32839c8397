use diesel::prelude::*;
use diesel::sql_types::{Jsonb, Text};
use serde_json::Value;

use super::schema::documents;
use crate::db::repository::{RepositoryError, RepositoryResult};
use crate::models::Document;

/// Row shape returned by the raw containment queries.
#[derive(Debug, Clone, QueryableByName)]
pub struct DocumentRow {
    #[diesel(sql_type = Text)]
    pub id: String,
    #[diesel(sql_type = Jsonb)]
    pub body: Value,
}

impl DocumentRow {
    pub fn into_document(self) -> RepositoryResult<Document> {
        body_to_document(self.body)
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = documents)]
pub struct NewDocumentRow {
    pub id: String,
    pub collection: String,
    pub body: Value,
}

pub fn body_to_document(body: Value) -> RepositoryResult<Document> {
    match body {
        Value::Object(map) => Ok(map),
        other => Err(RepositoryError::internal(format!(
            "Stored document body is not an object: {}",
            other
        ))),
    }
}
