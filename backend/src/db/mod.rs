//! Document storage for users, schedules, exercises, clubs and weights.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │  HTTP handlers / application services                    │
//! └───────────────────┬─────────────────────────────────────┘
//!                     │
//! ┌───────────────────▼─────────────────────────────────────┐
//! │  Service Layer (services.rs)                             │
//! │  - Logged create / find / update / delete helpers        │
//! └───────────────────┬─────────────────────────────────────┘
//!                     │
//! ┌───────────────────▼─────────────────────────────────────┐
//! │  DocumentRepository trait (repository/)                  │
//! └───────────────────┬─────────────────────────────────────┘
//!                     │
//!     ┌───────────────┴──────────────────┐
//!     │  LocalRepository  │  PostgresRepository (JSONB)  │
//!     └──────────────────────────────────┘
//! ```
//!
//! # Usage
//! ```ignore
//! use trainer_backend::db::{services, RepositoryFactory};
//! use trainer_backend::models::Collection;
//!
//! async fn example() -> anyhow::Result<()> {
//!     let repo = RepositoryFactory::from_env().await?;
//!     let clubs = services::find(repo.as_ref(), Collection::Clubs, &Default::default(), &Default::default()).await?;
//!     Ok(())
//! }
//! ```

#[cfg(not(any(feature = "postgres-repo", feature = "local-repo")))]
compile_error!("Enable at least one repository backend feature.");

pub mod factory;
pub mod repo_config;
pub mod repositories;
pub mod repository;
pub mod services;

// Postgres config is colocated with the repository implementation.
#[cfg(feature = "postgres-repo")]
pub use repositories::postgres::PostgresConfig;
#[cfg(not(feature = "postgres-repo"))]
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    _private: (),
}

pub use factory::{RepositoryFactory, RepositoryType};
pub use repo_config::RepositoryConfig;
pub use repositories::LocalRepository;
#[cfg(feature = "postgres-repo")]
pub use repositories::PostgresRepository;
pub use repository::{DocumentRepository, ErrorContext, RepositoryError, RepositoryResult};

use anyhow::{Context, Result};
use std::sync::{Arc, OnceLock};

/// Global repository instance initialized once per process.
static REPOSITORY: OnceLock<Arc<dyn DocumentRepository>> = OnceLock::new();

/// Select a backend: `repository.toml` when one exists, the environment
/// otherwise.
async fn create_selected_repository() -> RepositoryResult<Arc<dyn DocumentRepository>> {
    RepositoryFactory::from_config_or_env(RepositoryConfig::find_default_path().as_deref()).await
}

/// Initialize the global repository singleton and return it.
///
/// Later calls return the instance created by the first successful call.
pub async fn init_repository() -> Result<Arc<dyn DocumentRepository>> {
    if let Some(repo) = REPOSITORY.get() {
        return Ok(Arc::clone(repo));
    }

    let repo = create_selected_repository()
        .await
        .context("Failed to initialize document repository")?;
    Ok(Arc::clone(REPOSITORY.get_or_init(|| repo)))
}
