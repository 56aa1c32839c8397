//! Postgres repository implementation using Diesel.
//!
//! Every collection shares one `documents` table; bodies are stored as JSONB
//! and equality filters are answered with JSONB containment (`body @> filter`).
//!
//! ## Features
//!
//! - Connection pooling with r2d2
//! - Automatic retry for transient failures
//! - Automatic migration execution
//!
//! ## Configuration
//!
//! Environment variables:
//! - `DATABASE_URL` or `PG_DATABASE_URL`: Connection string (required)
//! - `PG_POOL_MAX`: Maximum pool size (default: 10)
//! - `PG_POOL_MIN`: Minimum pool size (default: 1)
//! - `PG_CONN_TIMEOUT_SEC`: Connection timeout in seconds (default: 30)
//! - `PG_IDLE_TIMEOUT_SEC`: Idle connection timeout in seconds (default: 600)
//! - `PG_MAX_RETRIES`: Maximum retry attempts for transient failures (default: 3)
//! - `PG_RETRY_DELAY_MS`: Initial retry delay in milliseconds (default: 100)

use async_trait::async_trait;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel::sql_query;
use diesel::sql_types::{Jsonb, Text};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use serde_json::Value;
use std::str::FromStr;
use std::time::Duration;
use tokio::task;
use tracing::{debug, warn};

use crate::db::repository::{
    DocumentRepository, ErrorContext, RepositoryError, RepositoryResult,
};
use crate::models::{
    apply_update, Collection, Document, DocumentId, Filter, FindOptions, SortOrder, ID_FIELD,
};

mod models;
mod schema;

use models::*;
use schema::documents;

type PgPool = Pool<ConnectionManager<PgConnection>>;

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("src/db/repositories/postgres/migrations");

/// Configuration for connecting to Postgres.
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    pub database_url: String,
    pub max_pool_size: u32,
    pub min_pool_size: u32,
    pub connection_timeout_sec: u64,
    pub idle_timeout_sec: u64,
    /// Maximum number of retry attempts for transient failures
    pub max_retries: u32,
    /// Initial retry delay in milliseconds (doubles with each retry)
    pub retry_delay_ms: u64,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            database_url: String::new(),
            max_pool_size: 10,
            min_pool_size: 1,
            connection_timeout_sec: 30,
            idle_timeout_sec: 600,
            max_retries: 3,
            retry_delay_ms: 100,
        }
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

impl PostgresConfig {
    /// Create configuration from environment variables (see module docs).
    pub fn from_env() -> Result<Self, String> {
        let database_url = std::env::var("DATABASE_URL")
            .or_else(|_| std::env::var("PG_DATABASE_URL"))
            .map_err(|_| "DATABASE_URL or PG_DATABASE_URL must be set".to_string())?;
        let defaults = Self::default();

        Ok(Self {
            database_url,
            max_pool_size: env_or("PG_POOL_MAX", defaults.max_pool_size),
            min_pool_size: env_or("PG_POOL_MIN", defaults.min_pool_size),
            connection_timeout_sec: env_or("PG_CONN_TIMEOUT_SEC", defaults.connection_timeout_sec),
            idle_timeout_sec: env_or("PG_IDLE_TIMEOUT_SEC", defaults.idle_timeout_sec),
            max_retries: env_or("PG_MAX_RETRIES", defaults.max_retries),
            retry_delay_ms: env_or("PG_RETRY_DELAY_MS", defaults.retry_delay_ms),
        })
    }

    pub fn with_url(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            ..Default::default()
        }
    }
}

/// Diesel-backed document repository.
#[derive(Clone, Debug)]
pub struct PostgresRepository {
    pool: PgPool,
    config: PostgresConfig,
}

impl PostgresRepository {
    /// Create a new repository and run pending migrations.
    pub fn new(config: PostgresConfig) -> RepositoryResult<Self> {
        let manager = ConnectionManager::<PgConnection>::new(&config.database_url);

        let pool = Pool::builder()
            .max_size(config.max_pool_size)
            .min_idle(Some(config.min_pool_size))
            .connection_timeout(Duration::from_secs(config.connection_timeout_sec))
            .idle_timeout(Some(Duration::from_secs(config.idle_timeout_sec)))
            .test_on_check_out(true)
            .build(manager)
            .map_err(|e| {
                RepositoryError::connection_with_context(
                    e.to_string(),
                    ErrorContext::new("create_pool")
                        .with_details(format!("max_size={}", config.max_pool_size)),
                )
            })?;

        {
            let mut conn = pool.get().map_err(|e| {
                RepositoryError::connection_with_context(
                    e.to_string(),
                    ErrorContext::new("get_connection_for_migrations"),
                )
            })?;
            conn.run_pending_migrations(MIGRATIONS).map_err(|e| {
                RepositoryError::internal_with_context(
                    format!("Migration failed: {}", e),
                    ErrorContext::new("run_migrations"),
                )
            })?;
        }

        Ok(Self { pool, config })
    }

    /// Run `f` on a pooled connection inside `spawn_blocking`, retrying
    /// retryable failures with exponential backoff.
    async fn with_conn<T, F>(&self, f: F) -> RepositoryResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut PgConnection) -> RepositoryResult<T> + Send + 'static + Clone,
    {
        let pool = self.pool.clone();
        let max_retries = self.config.max_retries;
        let mut retry_delay = Duration::from_millis(self.config.retry_delay_ms);

        task::spawn_blocking(move || {
            let mut last_error = None;

            for attempt in 0..=max_retries {
                if attempt > 0 {
                    std::thread::sleep(retry_delay);
                    retry_delay *= 2;
                }

                let mut conn = match pool.get() {
                    Ok(c) => c,
                    Err(e) => {
                        let err = RepositoryError::connection_with_context(
                            e.to_string(),
                            ErrorContext::new("get_connection")
                                .with_details(format!("attempt={}", attempt + 1)),
                        );
                        warn!(attempt = attempt + 1, "Postgres connection failed: {}", err);
                        last_error = Some(err);
                        continue;
                    }
                };

                match f.clone()(&mut conn) {
                    Ok(result) => return Ok(result),
                    Err(e) if e.is_retryable() && attempt < max_retries => {
                        warn!(attempt = attempt + 1, "Retrying Postgres operation: {}", e);
                        last_error = Some(e);
                    }
                    Err(e) => return Err(e),
                }
            }

            Err(last_error.unwrap_or_else(|| {
                RepositoryError::internal("Max retries exceeded with no error captured")
            }))
        })
        .await
        .map_err(|e| {
            RepositoryError::internal_with_context(
                format!("Task join error: {}", e),
                ErrorContext::new("spawn_blocking"),
            )
        })?
    }
}

fn filter_value(filter: &Filter) -> Value {
    Value::Object(filter.clone())
}

fn load_matching(
    conn: &mut PgConnection,
    collection: &str,
    filter: Value,
    options: &FindOptions,
) -> Result<Vec<DocumentRow>, DieselError> {
    const SELECT: &str =
        "SELECT id, body FROM documents WHERE collection = $1 AND body @> $2";

    match &options.sort {
        None => sql_query(format!("{} ORDER BY seq", SELECT))
            .bind::<Text, _>(collection.to_string())
            .bind::<Jsonb, _>(filter)
            .load(conn),
        Some(sort) => {
            let direction = match sort.order {
                SortOrder::Ascending => "ASC NULLS FIRST",
                SortOrder::Descending => "DESC NULLS LAST",
            };
            sql_query(format!("{} ORDER BY body -> $3 {}, seq", SELECT, direction))
                .bind::<Text, _>(collection.to_string())
                .bind::<Jsonb, _>(filter)
                .bind::<Text, _>(sort.field.clone())
                .load(conn)
        }
    }
}

#[async_trait]
impl DocumentRepository for PostgresRepository {
    async fn health_check(&self) -> RepositoryResult<bool> {
        self.with_conn(|conn| {
            sql_query("SELECT 1")
                .execute(conn)
                .map(|_| true)
                .map_err(RepositoryError::from)
        })
        .await
    }

    async fn insert(
        &self,
        collection: Collection,
        mut document: Document,
    ) -> RepositoryResult<DocumentId> {
        let id = match document.get(ID_FIELD) {
            None | Some(Value::Null) => DocumentId::generate(),
            Some(_) => DocumentId::of(&document).ok_or_else(|| {
                RepositoryError::validation(format!("{} must be a string or number", ID_FIELD))
            })?,
        };
        document.insert(ID_FIELD.to_string(), Value::String(id.0.clone()));

        let row = NewDocumentRow {
            id: id.0.clone(),
            collection: collection.as_str().to_string(),
            body: Value::Object(document),
        };

        self.with_conn(move |conn| {
            diesel::insert_into(documents::table)
                .values(&row)
                .execute(conn)
                .map_err(|e| match e {
                    DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                        RepositoryError::validation_with_context(
                            "Duplicate document id",
                            ErrorContext::new("insert").with_document_id(&row.id),
                        )
                    }
                    other => RepositoryError::from(other),
                })
        })
        .await
        .map_err(|e| e.with_collection(collection))?;

        debug!(%collection, %id, "Inserted document");
        Ok(id)
    }

    async fn find(
        &self,
        collection: Collection,
        filter: &Filter,
        options: &FindOptions,
    ) -> RepositoryResult<Vec<Document>> {
        let filter = filter_value(filter);
        let options = options.clone();

        self.with_conn(move |conn| {
            load_matching(conn, collection.as_str(), filter, &options)
                .map_err(RepositoryError::from)?
                .into_iter()
                .map(DocumentRow::into_document)
                .collect()
        })
        .await
        .map_err(|e| e.with_operation("find").with_collection(collection))
    }

    async fn find_by_id(
        &self,
        collection: Collection,
        id: &DocumentId,
    ) -> RepositoryResult<Option<Document>> {
        let id = id.0.clone();

        self.with_conn(move |conn| {
            documents::table
                .filter(documents::collection.eq(collection.as_str()))
                .filter(documents::id.eq(&id))
                .select(documents::body)
                .first::<Value>(conn)
                .optional()
                .map_err(RepositoryError::from)?
                .map(body_to_document)
                .transpose()
        })
        .await
    }

    async fn find_one_and_update(
        &self,
        collection: Collection,
        filter: &Filter,
        update: Document,
    ) -> RepositoryResult<Option<Document>> {
        let filter = filter_value(filter);

        self.with_conn(move |conn| {
            conn.transaction::<_, RepositoryError, _>(|tx| {
                let row = sql_query(
                    "SELECT id, body FROM documents \
                     WHERE collection = $1 AND body @> $2 \
                     ORDER BY seq LIMIT 1 FOR UPDATE",
                )
                .bind::<Text, _>(collection.as_str().to_string())
                .bind::<Jsonb, _>(filter.clone())
                .get_result::<DocumentRow>(tx)
                .optional()?;

                let Some(row) = row else {
                    return Ok(None);
                };
                let id = row.id.clone();
                let previous = row.into_document()?;
                let mut updated = previous.clone();
                apply_update(&mut updated, &update);

                diesel::update(documents::table.find(&id))
                    .set(documents::body.eq(Value::Object(updated)))
                    .execute(tx)?;

                Ok(Some(previous))
            })
        })
        .await
        .map_err(|e| {
            e.with_operation("find_one_and_update")
                .with_collection(collection)
        })
    }

    async fn delete_by_id(
        &self,
        collection: Collection,
        id: &DocumentId,
    ) -> RepositoryResult<Option<Document>> {
        let id = id.0.clone();

        self.with_conn(move |conn| {
            diesel::delete(
                documents::table
                    .filter(documents::collection.eq(collection.as_str()))
                    .filter(documents::id.eq(&id)),
            )
            .returning(documents::body)
            .get_result::<Value>(conn)
            .optional()
            .map_err(RepositoryError::from)?
            .map(body_to_document)
            .transpose()
        })
        .await
    }
}
