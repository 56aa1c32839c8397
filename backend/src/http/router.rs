//! Router configuration for the HTTP API.
//!
//! Sets up all routes and middleware (CORS, compression, tracing).

use std::collections::HashMap;

use axum::{
    extract::{DefaultBodyLimit, Query, State},
    http::HeaderValue,
    routing::{delete, get, post, put, MethodRouter},
    Json, Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;

use super::dto::{IdQuery, InsertBody};
use super::handlers::{self, OwnedCollection, CLUBS, EXERCISES, TRAINING_SCHEDULES, WEIGHTS};
use super::state::AppState;
use crate::models::Document;

/// Request bodies above this size are rejected.
const BODY_LIMIT_BYTES: usize = 5 * 1024 * 1024;

/// Create the main application router with all routes and middleware.
pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(state.config.cors_origin.as_deref());

    Router::new()
        .route("/health", get(handlers::health_check))
        // Authentication
        .route("/oauth/google", post(handlers::google_oauth))
        .route("/user/login", post(handlers::login_user))
        // Users and trainees
        .route("/user/create", post(handlers::create_user))
        .route("/user/get", get(handlers::get_user))
        .route(
            "/user/update-user-trainer-id",
            post(handlers::update_user_trainer_id),
        )
        .route("/user", put(handlers::update_user))
        .route("/trainees", get(handlers::list_trainees))
        .route("/trainee", delete(handlers::delete_trainee))
        // Training schedules
        .route("/training-schedules", list_route(TRAINING_SCHEDULES))
        .route(
            "/training-schedule",
            post(handlers::create_training_schedule)
                .put(handlers::update_training_schedule)
                .delete(
                    move |State(state): State<AppState>, Query(query): Query<IdQuery>| {
                        TRAINING_SCHEDULES.delete(state, query)
                    },
                ),
        )
        // Exercises, clubs, weights
        .route("/exercises", list_route(EXERCISES))
        .route("/exercise", item_route(EXERCISES))
        .route("/clubs", list_route(CLUBS))
        .route("/club", item_route(CLUBS))
        .route("/weights", list_route(WEIGHTS))
        .route("/weight", item_route(WEIGHTS))
        .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn list_route(owned: OwnedCollection) -> MethodRouter<AppState> {
    get(
        move |State(state): State<AppState>, Query(query): Query<HashMap<String, String>>| {
            owned.list(state, query)
        },
    )
}

fn item_route(owned: OwnedCollection) -> MethodRouter<AppState> {
    post(move |State(state): State<AppState>, Json(body): Json<InsertBody>| owned.create(state, body))
        .put(move |State(state): State<AppState>, Json(body): Json<Document>| owned.update(state, body))
        .delete(move |State(state): State<AppState>, Query(query): Query<IdQuery>| {
            owned.delete(state, query)
        })
}

/// Allow exactly `origin` when configured, any origin otherwise.
fn cors_layer(origin: Option<&str>) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    match origin {
        None => layer.allow_origin(Any),
        Some(origin) => match HeaderValue::from_str(origin) {
            Ok(value) => layer.allow_origin(AllowOrigin::exact(value)),
            Err(_) => {
                warn!(%origin, "APP_CORS_ORIGIN is not a valid header value; cross-origin requests are refused");
                layer
            }
        },
    }
}
