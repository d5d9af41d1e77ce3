//! Tests for db::factory - repository creation, configuration, bootstrap.

mod support;

use std::str::FromStr;
use std::sync::Arc;

use patrol_rust::db::factory::{RepositoryFactory, RepositoryType};
use patrol_rust::db::{get_repository, init_repository, RepositoryError};

#[test]
fn test_repository_type_from_str() {
    assert_eq!(
        RepositoryType::from_str("local").unwrap(),
        RepositoryType::Local
    );
    assert_eq!(
        RepositoryType::from_str("MEMORY").unwrap(),
        RepositoryType::Local
    );

    let result = RepositoryType::from_str("cloud");
    assert!(result.is_err());
    assert!(result.unwrap_err().contains("Unknown repository type"));
}

#[test]
fn test_repository_type_from_env_default() {
    support::with_scoped_env(&[("REPOSITORY_TYPE", None)], || {
        assert_eq!(RepositoryType::from_env(), RepositoryType::Local);
    });
}

#[test]
fn test_repository_type_from_env_explicit() {
    support::with_scoped_env(&[("REPOSITORY_TYPE", Some("memory"))], || {
        assert_eq!(RepositoryType::from_env(), RepositoryType::Local);
    });
}

#[test]
fn test_repository_type_from_env_invalid_defaults_to_local() {
    support::with_scoped_env(&[("REPOSITORY_TYPE", Some("cloud"))], || {
        assert_eq!(RepositoryType::from_env(), RepositoryType::Local);
    });
}

#[tokio::test]
async fn test_create_from_type_is_healthy() {
    let repo = RepositoryFactory::create(RepositoryType::Local).unwrap();
    assert!(repo.health_check().await.unwrap());
}

#[test]
fn test_from_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("repository.toml");
    std::fs::write(&path, "[repository]\ntype = \"local\"\n").unwrap();

    let repo = RepositoryFactory::from_config_file(&path);
    assert!(repo.is_ok());
}

#[test]
fn test_from_config_file_rejects_unknown_type() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("repository.toml");
    std::fs::write(&path, "[repository]\ntype = \"cloud\"\n").unwrap();

    let result = RepositoryFactory::from_config_file(&path);
    assert!(matches!(
        result,
        Err(RepositoryError::ConfigurationError { .. })
    ));
}

#[test]
fn test_from_default_config_without_file_is_configuration_error() {
    // The crate ships no repository.toml; the search comes up empty
    let result = RepositoryFactory::from_default_config();
    assert!(matches!(
        result,
        Err(RepositoryError::ConfigurationError { .. })
    ));
}

#[tokio::test]
async fn test_global_repository_bootstrap() {
    support::with_scoped_env(&[("REPOSITORY_TYPE", Some("local"))], || {
        init_repository().unwrap();
        // Re-initialization is a no-op, not an error
        init_repository().unwrap();
    });

    let first = get_repository().unwrap();
    let second = get_repository().unwrap();
    assert!(Arc::ptr_eq(first, second));
    assert!(first.health_check().await.unwrap());
}
