//! Shared value types.

use derive_more::Display;
use serde::{Deserialize, Serialize};

/// A single ingress basic-auth credential.
#[derive(Debug, Clone, PartialEq, Eq, Display, Serialize, Deserialize)]
#[display("{username}:***")]
pub struct BasicAuthUser {
    pub username: String,
    pub password: String,
}

impl BasicAuthUser {
    /// Parse a `username:password` pair. Returns `None` unless the input
    /// is exactly two non-empty segments separated by a single colon.
    pub fn from_colon_string(colon_string: &str) -> Option<Self> {
        let (username, password) = colon_string.split_once(':')?;
        if username.is_empty() || password.is_empty() || password.contains(':') {
            return None;
        }
        Some(Self {
            username: username.to_string(),
            password: password.to_string(),
        })
    }
}

/// A parsed Docker image reference: `[registry/]repository[:tag]`.
///
/// The leading segment is treated as a registry only when it looks like a
/// hostname (contains a dot), so `bitnami/postgresql` keeps its full
/// repository path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DockerImageRef {
    pub registry: Option<String>,
    pub repository: String,
    pub tag: Option<String>,
}

impl DockerImageRef {
    pub fn parse(reference: &str) -> Self {
        let (registry, rest) = match reference.split_once('/') {
            Some((head, rest)) if head_is_registry(head) => (Some(head.to_string()), rest),
            _ => (None, reference),
        };

        let (repository, tag) = match rest.split_once(':') {
            Some((repository, tag)) => (repository.to_string(), Some(tag.to_string())),
            None => (rest.to_string(), None),
        };

        Self {
            registry,
            repository,
            tag,
        }
    }
}

impl std::fmt::Display for DockerImageRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(registry) = &self.registry {
            write!(f, "{}/", registry)?;
        }
        write!(f, "{}", self.repository)?;
        if let Some(tag) = &self.tag {
            write!(f, ":{}", tag)?;
        }
        Ok(())
    }
}

// A registry prefix is a hostname-looking segment: dotted and colon-free.
fn head_is_registry(head: &str) -> bool {
    !head.contains(':') && head.contains('.')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_auth_from_colon_string() {
        let user = BasicAuthUser::from_colon_string("admin:hunter2").unwrap();
        assert_eq!(user.username, "admin");
        assert_eq!(user.password, "hunter2");
    }

    #[test]
    fn test_basic_auth_rejects_malformed() {
        assert!(BasicAuthUser::from_colon_string("nocolon").is_none());
        assert!(BasicAuthUser::from_colon_string(":missinguser").is_none());
        assert!(BasicAuthUser::from_colon_string("missingpass:").is_none());
        assert!(BasicAuthUser::from_colon_string("a:b:c").is_none());
    }

    #[test]
    fn test_basic_auth_display_masks_password() {
        let user = BasicAuthUser::from_colon_string("admin:hunter2").unwrap();
        assert_eq!(user.to_string(), "admin:***");
    }

    #[test]
    fn test_image_ref_full() {
        let image = DockerImageRef::parse("docker.io/bitnami/postgresql:9.6-alpine");
        assert_eq!(image.registry.as_deref(), Some("docker.io"));
        assert_eq!(image.repository, "bitnami/postgresql");
        assert_eq!(image.tag.as_deref(), Some("9.6-alpine"));
    }

    #[test]
    fn test_image_ref_without_registry() {
        let image = DockerImageRef::parse("bitnami/postgresql:9.6-alpine");
        assert_eq!(image.registry, None);
        assert_eq!(image.repository, "bitnami/postgresql");
        assert_eq!(image.tag.as_deref(), Some("9.6-alpine"));
    }

    #[test]
    fn test_image_ref_without_tag() {
        let image = DockerImageRef::parse("docker.io/bitnami/postgresql");
        assert_eq!(image.registry.as_deref(), Some("docker.io"));
        assert_eq!(image.repository, "bitnami/postgresql");
        assert_eq!(image.tag, None);
    }

    #[test]
    fn test_image_ref_undotted_head_is_repository() {
        let image = DockerImageRef::parse("docker-io/bitnami/postgresql");
        assert_eq!(image.registry, None);
        assert_eq!(image.repository, "docker-io/bitnami/postgresql");
        assert_eq!(image.tag, None);
    }

    #[test]
    fn test_image_ref_roundtrip_display() {
        for reference in [
            "docker.io/bitnami/postgresql:9.6-alpine",
            "bitnami/postgresql",
            "alpine:latest",
        ] {
            assert_eq!(DockerImageRef::parse(reference).to_string(), reference);
        }
    }
}
