//! Application state for the HTTP server.

use std::sync::Arc;

use crate::auth::GoogleOAuthClient;
use crate::config::ServerConfig;
use crate::db::repository::DocumentRepository;

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Repository instance for database operations
    pub repository: Arc<dyn DocumentRepository>,
    pub config: Arc<ServerConfig>,
    /// Google sign-in; `None` when the OAuth variables are not configured.
    pub google: Option<Arc<GoogleOAuthClient>>,
}

impl AppState {
    /// Create a new application state with default server settings.
    pub fn new(repository: Arc<dyn DocumentRepository>) -> Self {
        Self::with_config(repository, ServerConfig::default())
    }

    pub fn with_config(repository: Arc<dyn DocumentRepository>, config: ServerConfig) -> Self {
        Self {
            repository,
            config: Arc::new(config),
            google: None,
        }
    }

    pub fn with_google(mut self, client: GoogleOAuthClient) -> Self {
        self.google = Some(Arc::new(client));
        self
    }
}
