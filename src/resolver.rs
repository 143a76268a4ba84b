use std::collections::HashMap;

use async_trait::async_trait;
use bollard::Docker;
use bollard::query_parameters::{InspectContainerOptions, InspectContainerOptionsBuilder};

use crate::event::ContainerMetadata;

/// Environment variables designating the owning service and instance.
pub const SERVICE_ENV_VAR: &str = "PAASTA_SERVICE";
pub const INSTANCE_ENV_VAR: &str = "PAASTA_INSTANCE";

/// Substituted per-field when a container does not carry one of the
/// well-known variables.
pub const UNKNOWN: &str = "unknown";

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("container {0} not found")]
    NotFound(String),
    #[error("Docker API error: {0}")]
    DockerApi(#[from] bollard::errors::Error),
}

/// Lookup capability over the container runtime. The production
/// implementation talks to the Docker Engine API; tests substitute a fake.
#[async_trait]
pub trait ContainerInspector: Send + Sync {
    /// Fetch the `NAME=VALUE` environment entries of a container. The id may
    /// be a shortened prefix; the runtime accepts truncated identifiers.
    async fn container_env(&self, container_id: &str) -> Result<Vec<String>, ResolveError>;
}

pub struct DockerInspector {
    docker: Docker,
}

impl DockerInspector {
    pub fn new(docker: Docker) -> Self {
        Self { docker }
    }
}

#[async_trait]
impl ContainerInspector for DockerInspector {
    async fn container_env(&self, container_id: &str) -> Result<Vec<String>, ResolveError> {
        let options: InspectContainerOptions = InspectContainerOptionsBuilder::new().build();

        match self
            .docker
            .inspect_container(container_id, Some(options))
            .await
        {
            Ok(info) => Ok(info.config.and_then(|c| c.env).unwrap_or_default()),
            Err(bollard::errors::Error::DockerResponseServerError {
                status_code: 404, ..
            }) => Err(ResolveError::NotFound(container_id.to_string())),
            Err(e) => Err(ResolveError::DockerApi(e)),
        }
    }
}

/// Build a name→value map from the raw `NAME=VALUE` list. Splits on the
/// first `=` only (values may themselves contain `=`); last write wins on a
/// repeated name; an entry without `=` maps to the empty string.
pub fn container_env_as_map(env: &[String]) -> HashMap<String, String> {
    let mut vars = HashMap::new();
    for entry in env {
        match entry.split_once('=') {
            Some((name, value)) => vars.insert(name.to_string(), value.to_string()),
            None => vars.insert(entry.clone(), String::new()),
        };
    }
    vars
}

/// Look the container up and derive its owning service and instance. The two
/// fields fall back to [`UNKNOWN`] independently; only a failed inspection
/// fails the whole resolution.
pub async fn resolve_metadata(
    inspector: &dyn ContainerInspector,
    container_id: &str,
) -> Result<ContainerMetadata, ResolveError> {
    let env = inspector.container_env(container_id).await?;
    let mut vars = container_env_as_map(&env);
    Ok(ContainerMetadata {
        service: vars
            .remove(SERVICE_ENV_VAR)
            .unwrap_or_else(|| UNKNOWN.to_string()),
        instance: vars
            .remove(INSTANCE_ENV_VAR)
            .unwrap_or_else(|| UNKNOWN.to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeInspector {
        env: Option<Vec<String>>,
    }

    #[async_trait]
    impl ContainerInspector for FakeInspector {
        async fn container_env(&self, container_id: &str) -> Result<Vec<String>, ResolveError> {
            match &self.env {
                Some(env) => Ok(env.clone()),
                None => Err(ResolveError::NotFound(container_id.to_string())),
            }
        }
    }

    fn env(entries: &[&str]) -> Vec<String> {
        entries.iter().map(|e| e.to_string()).collect()
    }

    #[test]
    fn test_env_map_splits_on_first_equals_only() {
        let vars = container_env_as_map(&env(&["OPTS=-Da=b -Dc=d"]));
        assert_eq!(vars.get("OPTS").map(|s| s.as_str()), Some("-Da=b -Dc=d"));
    }

    #[test]
    fn test_env_map_last_write_wins() {
        let vars = container_env_as_map(&env(&["NAME=first", "NAME=second"]));
        assert_eq!(vars.get("NAME").map(|s| s.as_str()), Some("second"));
    }

    #[test]
    fn test_env_map_entry_without_equals_is_empty() {
        let vars = container_env_as_map(&env(&["BARE"]));
        assert_eq!(vars.get("BARE").map(|s| s.as_str()), Some(""));
    }

    #[tokio::test]
    async fn test_resolves_service_and_instance() {
        let inspector = FakeInspector {
            env: Some(env(&["PAASTA_SERVICE=foo", "PAASTA_INSTANCE=bar", "PATH=/bin"])),
        };
        let metadata = resolve_metadata(&inspector, "abcdef012345")
            .await
            .expect("resolution must succeed");
        assert_eq!(metadata.service, "foo");
        assert_eq!(metadata.instance, "bar");
    }

    #[tokio::test]
    async fn test_fields_fall_back_independently() {
        let inspector = FakeInspector {
            env: Some(env(&["PAASTA_SERVICE=foo"])),
        };
        let metadata = resolve_metadata(&inspector, "abcdef012345").await.unwrap();
        assert_eq!(metadata.service, "foo");
        assert_eq!(metadata.instance, UNKNOWN);

        let inspector = FakeInspector {
            env: Some(env(&["PAASTA_INSTANCE=bar"])),
        };
        let metadata = resolve_metadata(&inspector, "abcdef012345").await.unwrap();
        assert_eq!(metadata.service, UNKNOWN);
        assert_eq!(metadata.instance, "bar");
    }

    #[tokio::test]
    async fn test_empty_env_resolves_to_unknown() {
        let inspector = FakeInspector { env: Some(vec![]) };
        let metadata = resolve_metadata(&inspector, "abcdef012345").await.unwrap();
        assert_eq!(metadata.service, UNKNOWN);
        assert_eq!(metadata.instance, UNKNOWN);
    }

    #[tokio::test]
    async fn test_missing_container_fails_resolution() {
        let inspector = FakeInspector { env: None };
        let result = resolve_metadata(&inspector, "abcdef012345").await;
        assert!(matches!(result, Err(ResolveError::NotFound(_))), "{result:?}");
    }
}
