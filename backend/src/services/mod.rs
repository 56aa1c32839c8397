//! Application services between the HTTP handlers and the repository.
//!
//! Generic document CRUD lives in [`crate::db::services`]; the modules here add
//! the per-collection logic.

pub mod training_schedule;
pub mod users;

pub use training_schedule::attach_sessions;
pub use users::{hash_credentials, login, redact, UserError};
