//! Google OAuth 2.0 authorization-code exchange.
//!
//! The browser obtains an authorization `code` from Google and posts it to
//! `/oauth/google`. The server exchanges the code for tokens and returns the
//! profile served by the configured userinfo endpoint, unchanged.

use serde::Deserialize;
use serde_json::Value;
use std::env;
use std::time::Duration;
use url::Url;

const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const GOOGLE_USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v2/userinfo";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum OAuthConfigError {
    #[error("missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Errors that can occur during OAuth operations.
#[derive(Debug, thiserror::Error)]
pub enum OAuthError {
    /// The HTTP request to Google failed (network error, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    HttpRequest(#[from] reqwest::Error),

    #[error("failed to parse response: {0}")]
    ParseError(String),

    /// Google rejected the code or token.
    #[error("Google API error: {0}")]
    GoogleError(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// Credentials and endpoints for the Google OAuth client.
#[derive(Clone)]
pub struct GoogleOAuthConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    /// Userinfo endpoint queried with the exchanged access token.
    pub userinfo_url: String,
    pub token_url: String,
}

impl std::fmt::Debug for GoogleOAuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleOAuthConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("redirect_uri", &self.redirect_uri)
            .field("userinfo_url", &self.userinfo_url)
            .field("token_url", &self.token_url)
            .finish()
    }
}

impl GoogleOAuthConfig {
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        redirect_uri: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            redirect_uri: redirect_uri.into(),
            userinfo_url: GOOGLE_USERINFO_URL.to_string(),
            token_url: GOOGLE_TOKEN_URL.to_string(),
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Required: `GOOGLE_AUTH_CLIENT_ID`, `GOOGLE_AUTH_CLIENT_SECRET`,
    /// `GOOGLE_AUTH_REDIRECT_URI`. Optional: `GOOGLE_AUTH_TOKEN_REQUEST_URL`
    /// (the userinfo endpoint).
    pub fn from_env() -> Result<Self, OAuthConfigError> {
        let required = |key: &str| {
            env::var(key).map_err(|_| OAuthConfigError::MissingEnvVar(key.to_string()))
        };

        let mut config = Self::new(
            required("GOOGLE_AUTH_CLIENT_ID")?,
            required("GOOGLE_AUTH_CLIENT_SECRET")?,
            required("GOOGLE_AUTH_REDIRECT_URI")?,
        );
        if let Ok(url) = env::var("GOOGLE_AUTH_TOKEN_REQUEST_URL") {
            config.userinfo_url = url;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), OAuthConfigError> {
        if self.client_id.trim().is_empty() {
            return Err(OAuthConfigError::InvalidConfig(
                "client_id cannot be empty".to_string(),
            ));
        }
        if self.client_secret.trim().is_empty() {
            return Err(OAuthConfigError::InvalidConfig(
                "client_secret cannot be empty".to_string(),
            ));
        }
        for (name, value) in [
            ("redirect_uri", &self.redirect_uri),
            ("userinfo_url", &self.userinfo_url),
            ("token_url", &self.token_url),
        ] {
            Url::parse(value).map_err(|e| {
                OAuthConfigError::InvalidConfig(format!("{} is not a valid URL: {}", name, e))
            })?;
        }
        Ok(())
    }
}

/// Tokens returned by Google's token endpoint.
#[derive(Clone, Deserialize)]
pub struct GoogleTokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub id_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub token_type: Option<String>,
}

impl std::fmt::Debug for GoogleTokenResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleTokenResponse")
            .field("access_token", &"[REDACTED]")
            .field("id_token", &self.id_token.as_ref().map(|_| "[REDACTED]"))
            .field("expires_in", &self.expires_in)
            .field("token_type", &self.token_type)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct GoogleErrorResponse {
    error: String,
    error_description: Option<String>,
}

/// OAuth client for Google sign-in.
#[derive(Debug, Clone)]
pub struct GoogleOAuthClient {
    config: GoogleOAuthConfig,
    http_client: reqwest::Client,
}

impl GoogleOAuthClient {
    pub fn new(config: GoogleOAuthConfig) -> Result<Self, OAuthError> {
        let http_client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            config,
            http_client,
        })
    }

    pub fn config(&self) -> &GoogleOAuthConfig {
        &self.config
    }

    /// Exchange an authorization code for tokens.
    #[tracing::instrument(skip(self, code), name = "GoogleOAuthClient::exchange_code")]
    pub async fn exchange_code(&self, code: &str) -> Result<GoogleTokenResponse, OAuthError> {
        tracing::debug!("exchanging authorization code for tokens");

        let response = self
            .http_client
            .post(&self.config.token_url)
            .header("Accept", "application/json")
            .form(&[
                ("code", code),
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("redirect_uri", self.config.redirect_uri.as_str()),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await?;

        let body = response.text().await?;

        if let Ok(error_response) = serde_json::from_str::<GoogleErrorResponse>(&body) {
            let message = error_response
                .error_description
                .unwrap_or(error_response.error);
            return Err(OAuthError::GoogleError(message));
        }

        serde_json::from_str(&body)
            .map_err(|e| OAuthError::ParseError(format!("failed to parse token response: {e}")))
    }

    /// Userinfo URL carrying `alt=json` and the access token as query
    /// parameters.
    pub fn profile_url(&self, access_token: &str) -> Result<Url, OAuthError> {
        let mut url = Url::parse(&self.config.userinfo_url)?;
        url.query_pairs_mut()
            .append_pair("alt", "json")
            .append_pair("access_token", access_token);
        Ok(url)
    }

    /// Fetch the profile for an access token as raw JSON.
    #[tracing::instrument(skip_all, name = "GoogleOAuthClient::fetch_profile")]
    pub async fn fetch_profile(&self, tokens: &GoogleTokenResponse) -> Result<Value, OAuthError> {
        let url = self.profile_url(&tokens.access_token)?;
        let mut request = self.http_client.get(url);
        if let Some(id_token) = &tokens.id_token {
            request = request.bearer_auth(id_token);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(OAuthError::GoogleError(format!(
                "userinfo request failed with {status}: {body}"
            )));
        }

        response
            .json()
            .await
            .map_err(|e| OAuthError::ParseError(format!("failed to parse profile: {e}")))
    }

    /// Full sign-in: exchange the code, then fetch the profile.
    pub async fn sign_in(&self, code: &str) -> Result<Value, OAuthError> {
        let tokens = self.exchange_code(code).await?;
        let profile = self.fetch_profile(&tokens).await?;
        tracing::info!("Google sign-in completed");
        Ok(profile)
    }
}
