//! Request and response bodies for the REST API.
//!
//! Collection documents travel as free-form JSON objects; only the few
//! fixed-shape requests get a struct here.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::Document;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub database: String,
}

/// Body of `POST /oauth/google`.
#[derive(Debug, Clone, Deserialize)]
pub struct OAuthCodeRequest {
    pub code: String,
}

/// Body of `POST /user/login`.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Query of `GET /user/get`. When both are given `googleId` wins.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserLookupQuery {
    pub id: Option<String>,
    pub google_id: Option<String>,
}

/// Body of `POST /user/update-user-trainer-id`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainerAssignment {
    pub id: Value,
    #[serde(default)]
    pub trainer_id: Value,
}

/// `?id=` for delete routes.
#[derive(Debug, Clone, Deserialize)]
pub struct IdQuery {
    pub id: String,
}

/// Body of the create routes: one document, or a non-empty array inserted as
/// a batch.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum InsertBody {
    Many(Vec<Document>),
    One(Document),
}

/// Id of the inserted document, or ids in input order for a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum InsertedIds {
    One(String),
    Many(Vec<String>),
}
