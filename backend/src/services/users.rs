//! User documents: password handling and the email/password login.

use serde_json::Value;
use tracing::{debug, warn};

use crate::auth::{hash_password, verify_password, PasswordError};
use crate::db::repository::{DocumentRepository, RepositoryError};
use crate::db::services;
use crate::models::{Collection, Document, Filter};

pub const PASSWORD_FIELD: &str = "password";
pub const PASSWORD_HASH_FIELD: &str = "passwordHash";
pub const EMAIL_FIELD: &str = "email";

#[derive(Debug, thiserror::Error)]
pub enum UserError {
    #[error("'{0}' must be a string")]
    InvalidField(&'static str),

    #[error(transparent)]
    Password(#[from] PasswordError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Replace a plain `password` field with its argon2 hash under `passwordHash`.
///
/// A client supplied `passwordHash` is always dropped.
pub fn hash_credentials(document: &mut Document) -> Result<(), UserError> {
    document.remove(PASSWORD_HASH_FIELD);
    match document.remove(PASSWORD_FIELD) {
        None | Some(Value::Null) => Ok(()),
        Some(Value::String(password)) => {
            let hash = hash_password(&password)?;
            document.insert(PASSWORD_HASH_FIELD.to_string(), Value::String(hash));
            Ok(())
        }
        Some(_) => Err(UserError::InvalidField(PASSWORD_FIELD)),
    }
}

/// Strip credential material before a user leaves the service.
pub fn redact(mut document: Document) -> Document {
    document.remove(PASSWORD_HASH_FIELD);
    document.remove(PASSWORD_FIELD);
    document
}

/// Find the user with this email whose stored hash matches `password`.
pub async fn login(
    repo: &dyn DocumentRepository,
    email: &str,
    password: &str,
) -> Result<Option<Document>, UserError> {
    let mut filter = Filter::new();
    filter.insert(EMAIL_FIELD.to_string(), Value::String(email.to_string()));
    let candidates = services::find(repo, Collection::Users, &filter, &Default::default()).await?;

    for user in candidates {
        let Some(Value::String(hash)) = user.get(PASSWORD_HASH_FIELD) else {
            continue;
        };
        match verify_password(password, hash) {
            Ok(true) => {
                debug!("Password login succeeded");
                return Ok(Some(redact(user)));
            }
            Ok(false) => {}
            Err(e) => warn!(error = %e, "Skipping user with unreadable password hash"),
        }
    }
    Ok(None)
}
