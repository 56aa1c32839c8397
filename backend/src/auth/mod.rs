//! Sign-in helpers: Google OAuth code exchange and argon2 password hashes.

pub mod google;
pub mod password;

pub use google::{GoogleOAuthClient, GoogleOAuthConfig, GoogleTokenResponse, OAuthConfigError, OAuthError};
pub use password::{hash_password, verify_password, PasswordError};
