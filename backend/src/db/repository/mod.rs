//! Repository trait definitions for document storage.
//!
//! - [`error`]: Error types for repository operations
//! - [`document`]: Generic document CRUD used by every collection
//!
//! Handlers and services depend on `Arc<dyn DocumentRepository>` so the
//! in-memory and Postgres backends are interchangeable.

pub mod document;
pub mod error;

pub use document::DocumentRepository;
pub use error::{ErrorContext, RepositoryError, RepositoryResult};
