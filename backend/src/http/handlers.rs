//! HTTP handlers for the REST API.
//!
//! Each handler maps one route onto the document service layer. Finds answer
//! `null` when nothing matches; updates and deletes answer the document as it
//! was before the write (or `null`).

use std::collections::HashMap;

use axum::{
    extract::{Query, State},
    Json,
};
use serde_json::Value;
use tracing::info;

use super::dto::{
    HealthResponse, IdQuery, InsertBody, InsertedIds, LoginRequest, OAuthCodeRequest,
    TrainerAssignment, UserLookupQuery,
};
use super::error::AppError;
use super::state::AppState;
use crate::db::services as db_services;
use crate::db::DocumentRepository;
use crate::models::{Collection, Document, DocumentId, Filter, FindOptions, SortOrder};
use crate::services::{attach_sessions, hash_credentials, login, redact};

/// Result type for handlers.
pub type HandlerResult<T> = Result<Json<T>, AppError>;

/// Body field naming the target document of an update.
const BODY_ID_FIELD: &str = "id";

/// Split `{id, ...rest}` into the target id and the fields to set.
fn split_id(mut body: Document) -> Result<(DocumentId, Document), AppError> {
    let id = match body.remove(BODY_ID_FIELD) {
        Some(Value::String(id)) => DocumentId::new(id),
        Some(Value::Number(n)) => DocumentId::new(n.to_string()),
        _ => {
            return Err(AppError::BadRequest(
                "body must carry the document 'id'".to_string(),
            ))
        }
    };
    Ok((id, body))
}

fn equality_filter(field: &str, value: Option<&String>) -> Filter {
    let mut filter = Filter::new();
    filter.insert(
        field.to_string(),
        value.map_or(Value::Null, |v| Value::String(v.clone())),
    );
    filter
}

// =============================================================================
// Health Check
// =============================================================================

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> HandlerResult<HealthResponse> {
    let db_status = match db_services::health_check(state.repository.as_ref()).await {
        Ok(true) => "connected".to_string(),
        Ok(false) => "disconnected".to_string(),
        Err(e) => format!("error: {}", e),
    };

    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: db_status,
    }))
}

// =============================================================================
// Authentication
// =============================================================================

/// POST /oauth/google
///
/// Exchange an authorization code and return the Google profile as served.
pub async fn google_oauth(
    State(state): State<AppState>,
    Json(request): Json<OAuthCodeRequest>,
) -> HandlerResult<Value> {
    let client = state.google.as_ref().ok_or_else(|| {
        AppError::ServiceUnavailable("Google sign-in is not configured".to_string())
    })?;
    let profile = client.sign_in(&request.code).await?;
    Ok(Json(profile))
}

/// POST /user/login
pub async fn login_user(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> HandlerResult<Document> {
    login(state.repository.as_ref(), &request.email, &request.password)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::Unauthorized("invalid email or password".to_string()))
}

// =============================================================================
// Users
// =============================================================================

/// POST /user/create
pub async fn create_user(
    State(state): State<AppState>,
    Json(body): Json<InsertBody>,
) -> HandlerResult<InsertedIds> {
    let body = match body {
        InsertBody::One(mut user) => {
            hash_credentials(&mut user)?;
            InsertBody::One(user)
        }
        InsertBody::Many(mut users) => {
            for user in users.iter_mut() {
                hash_credentials(user)?;
            }
            InsertBody::Many(users)
        }
    };
    insert(state.repository.as_ref(), Collection::Users, body).await
}

/// GET /user/get
pub async fn get_user(
    State(state): State<AppState>,
    Query(query): Query<UserLookupQuery>,
) -> HandlerResult<Option<Document>> {
    let repo = state.repository.as_ref();
    let user = if let Some(google_id) = query.google_id.as_ref() {
        let filter = equality_filter("googleId", Some(google_id));
        db_services::find_first(repo, Collection::Users, &filter).await?
    } else if let Some(id) = query.id {
        db_services::get_by_id(repo, Collection::Users, &DocumentId::new(id)).await?
    } else {
        None
    };
    Ok(Json(user.map(redact)))
}

/// POST /user/update-user-trainer-id
///
/// Matches on the user's own `id` field, not the document id.
pub async fn update_user_trainer_id(
    State(state): State<AppState>,
    Json(request): Json<TrainerAssignment>,
) -> HandlerResult<Option<Document>> {
    let mut filter = Filter::new();
    filter.insert("id".to_string(), request.id);
    let mut update = Document::new();
    update.insert("trainerId".to_string(), request.trainer_id);

    let previous =
        db_services::update_one(state.repository.as_ref(), Collection::Users, &filter, update)
            .await?;
    Ok(Json(previous.map(redact)))
}

/// PUT /user
pub async fn update_user(
    State(state): State<AppState>,
    Json(body): Json<Document>,
) -> HandlerResult<Option<Document>> {
    let (id, mut update) = split_id(body)?;
    hash_credentials(&mut update)?;
    let previous =
        db_services::update_by_id(state.repository.as_ref(), Collection::Users, &id, update)
            .await?;
    Ok(Json(previous.map(redact)))
}

/// GET /trainees
///
/// Every query parameter is an equality condition on the user document.
pub async fn list_trainees(
    State(state): State<AppState>,
    Query(query): Query<HashMap<String, String>>,
) -> HandlerResult<Option<Vec<Document>>> {
    let filter: Filter = query
        .into_iter()
        .map(|(key, value)| (key, Value::String(value)))
        .collect();
    let trainees = db_services::find_non_empty(
        state.repository.as_ref(),
        Collection::Users,
        &filter,
        &FindOptions::default(),
    )
    .await?;
    Ok(Json(
        trainees.map(|users| users.into_iter().map(redact).collect()),
    ))
}

/// DELETE /trainee
pub async fn delete_trainee(
    State(state): State<AppState>,
    Query(query): Query<IdQuery>,
) -> HandlerResult<Option<Document>> {
    let removed = db_services::delete(
        state.repository.as_ref(),
        Collection::Users,
        &DocumentId::new(query.id),
    )
    .await?;
    Ok(Json(removed.map(redact)))
}

// =============================================================================
// Training schedules
// =============================================================================

/// POST /training-schedule
pub async fn create_training_schedule(
    State(state): State<AppState>,
    Json(mut body): Json<Document>,
) -> HandlerResult<String> {
    attach_sessions(&mut body, state.config.schedule_window)?;
    let created =
        db_services::create(state.repository.as_ref(), Collection::TrainingSchedules, body)
            .await?;
    info!("Training schedule created");
    inserted_id(&created)
}

/// PUT /training-schedule
pub async fn update_training_schedule(
    State(state): State<AppState>,
    Json(body): Json<Document>,
) -> HandlerResult<Option<Document>> {
    let (id, mut update) = split_id(body)?;
    attach_sessions(&mut update, state.config.schedule_window)?;
    let previous = db_services::update_by_id(
        state.repository.as_ref(),
        Collection::TrainingSchedules,
        &id,
        update,
    )
    .await?;
    Ok(Json(previous))
}

// =============================================================================
// Owned collections (training schedules, exercises, clubs, weights)
// =============================================================================

/// A collection listed by an owner field and edited by document id.
#[derive(Debug, Clone, Copy)]
pub struct OwnedCollection {
    pub collection: Collection,
    /// Query parameter and document field used by the list route.
    pub owner_field: &'static str,
    /// Ascending sort applied by the list route.
    pub sort_field: Option<&'static str>,
}

pub const TRAINING_SCHEDULES: OwnedCollection = OwnedCollection {
    collection: Collection::TrainingSchedules,
    owner_field: "traineeId",
    sort_field: None,
};

pub const EXERCISES: OwnedCollection = OwnedCollection {
    collection: Collection::Exercises,
    owner_field: "trainerId",
    sort_field: None,
};

pub const CLUBS: OwnedCollection = OwnedCollection {
    collection: Collection::Clubs,
    owner_field: "trainerId",
    sort_field: None,
};

pub const WEIGHTS: OwnedCollection = OwnedCollection {
    collection: Collection::Weights,
    owner_field: "traineeId",
    sort_field: Some("date"),
};

impl OwnedCollection {
    fn find_options(&self) -> FindOptions {
        self.sort_field
            .map(|field| FindOptions::sorted_by(field, SortOrder::Ascending))
            .unwrap_or_default()
    }

    /// GET list route. A missing owner parameter matches documents whose owner
    /// field is `null`.
    pub async fn list(
        self,
        state: AppState,
        query: HashMap<String, String>,
    ) -> HandlerResult<Option<Vec<Document>>> {
        let filter = equality_filter(self.owner_field, query.get(self.owner_field));
        let documents = db_services::find_non_empty(
            state.repository.as_ref(),
            self.collection,
            &filter,
            &self.find_options(),
        )
        .await?;
        Ok(Json(documents))
    }

    pub async fn create(self, state: AppState, body: InsertBody) -> HandlerResult<InsertedIds> {
        insert(state.repository.as_ref(), self.collection, body).await
    }

    pub async fn update(self, state: AppState, body: Document) -> HandlerResult<Option<Document>> {
        let (id, update) = split_id(body)?;
        let previous =
            db_services::update_by_id(state.repository.as_ref(), self.collection, &id, update)
                .await?;
        Ok(Json(previous))
    }

    pub async fn delete(self, state: AppState, query: IdQuery) -> HandlerResult<Option<Document>> {
        let removed = db_services::delete(
            state.repository.as_ref(),
            self.collection,
            &DocumentId::new(query.id),
        )
        .await?;
        Ok(Json(removed))
    }
}

/// Insert one document, or a non-empty batch through `insert_many`.
async fn insert(
    repo: &dyn DocumentRepository,
    collection: Collection,
    body: InsertBody,
) -> HandlerResult<InsertedIds> {
    match body {
        InsertBody::One(document) => {
            let created = db_services::create(repo, collection, document).await?;
            inserted_id(&created).map(|Json(id)| Json(InsertedIds::One(id)))
        }
        InsertBody::Many(documents) if documents.is_empty() => Err(AppError::BadRequest(
            "cannot insert an empty array".to_string(),
        )),
        InsertBody::Many(documents) => {
            let ids = db_services::create_many(repo, collection, documents).await?;
            Ok(Json(InsertedIds::Many(ids.into_iter().map(|id| id.0).collect())))
        }
    }
}

fn inserted_id(document: &Document) -> HandlerResult<String> {
    DocumentId::of(document)
        .map(|id| Json(id.0))
        .ok_or_else(|| AppError::Internal("stored document has no id".to_string()))
}
