//! Environment and file based configuration.

mod support;

use std::io::Write;

use support::with_scoped_env;
use trainer_backend::auth::{GoogleOAuthConfig, OAuthConfigError};
use trainer_backend::config::{ConfigError, ServerConfig};
use trainer_backend::db::{
    DocumentRepository, RepositoryConfig, RepositoryError, RepositoryFactory, RepositoryType,
};
use trainer_backend::scheduler::WindowBound;

const SERVER_VARS: [&str; 4] = ["HOST", "PORT", "APP_CORS_ORIGIN", "SCHEDULE_WINDOW"];

fn cleared(keys: &[&'static str]) -> Vec<(&'static str, Option<&'static str>)> {
    keys.iter().map(|k| (*k, None)).collect()
}

#[test]
fn test_server_config_defaults() {
    with_scoped_env(&cleared(&SERVER_VARS), || {
        let config = ServerConfig::from_env().unwrap();
        assert_eq!(config, ServerConfig::default());
        assert_eq!(config.port, 3000);
        assert!(config.cors_origin.is_none());
    });
}

#[test]
fn test_server_config_from_env() {
    with_scoped_env(
        &[
            ("HOST", Some("127.0.0.1")),
            ("PORT", Some("8088")),
            ("APP_CORS_ORIGIN", Some("https://coach.example.com")),
            ("SCHEDULE_WINDOW", Some("total-span")),
        ],
        || {
            let config = ServerConfig::from_env().unwrap();
            assert_eq!(config.socket_addr().unwrap().to_string(), "127.0.0.1:8088");
            assert_eq!(
                config.cors_origin.as_deref(),
                Some("https://coach.example.com")
            );
            assert_eq!(config.schedule_window, WindowBound::TotalSpan);
        },
    );
}

#[test]
fn test_server_config_rejects_bad_values() {
    with_scoped_env(&[("PORT", Some("eighty")), ("SCHEDULE_WINDOW", None)], || {
        let err = ServerConfig::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key: "PORT", .. }));
    });
    with_scoped_env(&[("PORT", None), ("SCHEDULE_WINDOW", Some("weekly"))], || {
        let err = ServerConfig::from_env().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                key: "SCHEDULE_WINDOW",
                ..
            }
        ));
    });
}

#[test]
fn test_google_config_from_env() {
    with_scoped_env(
        &[
            ("GOOGLE_AUTH_CLIENT_ID", Some("client-id")),
            ("GOOGLE_AUTH_CLIENT_SECRET", Some("client-secret")),
            ("GOOGLE_AUTH_REDIRECT_URI", Some("http://localhost:8080")),
            (
                "GOOGLE_AUTH_TOKEN_REQUEST_URL",
                Some("https://www.googleapis.com/oauth2/v1/userinfo"),
            ),
        ],
        || {
            let config = GoogleOAuthConfig::from_env().unwrap();
            assert_eq!(config.client_id, "client-id");
            assert_eq!(
                config.userinfo_url,
                "https://www.googleapis.com/oauth2/v1/userinfo"
            );
        },
    );
}

#[test]
fn test_google_config_requires_credentials() {
    with_scoped_env(
        &[
            ("GOOGLE_AUTH_CLIENT_ID", None),
            ("GOOGLE_AUTH_CLIENT_SECRET", Some("client-secret")),
            ("GOOGLE_AUTH_REDIRECT_URI", Some("http://localhost:8080")),
        ],
        || {
            let err = GoogleOAuthConfig::from_env().unwrap_err();
            assert!(
                matches!(err, OAuthConfigError::MissingEnvVar(ref key) if key == "GOOGLE_AUTH_CLIENT_ID")
            );
        },
    );
}

#[test]
fn test_repository_type_from_env() {
    with_scoped_env(
        &[
            ("REPOSITORY_TYPE", None),
            ("DATABASE_URL", None),
            ("PG_DATABASE_URL", None),
        ],
        || assert_eq!(RepositoryType::from_env().unwrap(), RepositoryType::Local),
    );
    with_scoped_env(
        &[
            ("REPOSITORY_TYPE", None),
            ("DATABASE_URL", Some("postgres://localhost/trainer")),
        ],
        || assert_eq!(RepositoryType::from_env().unwrap(), RepositoryType::Postgres),
    );
    with_scoped_env(
        &[
            ("REPOSITORY_TYPE", Some("LOCAL")),
            ("DATABASE_URL", Some("postgres://localhost/trainer")),
        ],
        || assert_eq!(RepositoryType::from_env().unwrap(), RepositoryType::Local),
    );
}

#[test]
fn test_unknown_repository_type_in_env_is_rejected() {
    with_scoped_env(
        &[
            ("REPOSITORY_TYPE", Some("postgress")),
            ("DATABASE_URL", None),
            ("PG_DATABASE_URL", None),
        ],
        || {
            assert!(matches!(
                RepositoryType::from_env(),
                Err(RepositoryError::ConfigurationError { .. })
            ));
            let runtime = tokio::runtime::Runtime::new().unwrap();
            let result = runtime.block_on(RepositoryFactory::from_env());
            assert!(matches!(
                result,
                Err(RepositoryError::ConfigurationError { .. })
            ));
        },
    );
}

#[test]
fn test_factory_from_env_builds_local_repository() {
    with_scoped_env(&[("REPOSITORY_TYPE", Some("local"))], || {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let repo = runtime.block_on(RepositoryFactory::from_env()).unwrap();
        assert!(runtime.block_on(repo.health_check()).unwrap());
    });
}

#[tokio::test]
async fn test_factory_from_config_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[repository]\ntype = \"local\"").unwrap();

    let repo = RepositoryFactory::from_config_file(file.path()).await.unwrap();
    assert!(repo.health_check().await.unwrap());
}

#[tokio::test]
async fn test_factory_rejects_unknown_type_in_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("repository.toml");
    std::fs::write(&path, "[repository]\ntype = \"mongodb\"\n").unwrap();

    let config = RepositoryConfig::from_file(&path).unwrap();
    assert!(config.repository_type().is_err());

    let result = RepositoryFactory::from_config_file(&path).await;
    assert!(matches!(
        result,
        Err(RepositoryError::ConfigurationError { .. })
    ));
}

#[test]
fn test_malformed_config_file_is_not_replaced_by_env() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("repository.toml");
    std::fs::write(&path, "[repository\ntype = \"postgres\"\n").unwrap();

    with_scoped_env(&[("REPOSITORY_TYPE", Some("local"))], || {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let result = runtime.block_on(RepositoryFactory::from_config_or_env(Some(&path)));
        assert!(matches!(
            result,
            Err(RepositoryError::ConfigurationError { .. })
        ));
    });
}

#[test]
fn test_absent_config_file_falls_back_to_env() {
    with_scoped_env(&[("REPOSITORY_TYPE", Some("local"))], || {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let repo = runtime
            .block_on(RepositoryFactory::from_config_or_env(None))
            .unwrap();
        assert!(runtime.block_on(repo.health_check()).unwrap());
    });
}

#[test]
fn test_missing_config_file_is_configuration_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = RepositoryConfig::from_file(dir.path().join("absent.toml"));
    assert!(matches!(
        result,
        Err(RepositoryError::ConfigurationError { .. })
    ));
}
