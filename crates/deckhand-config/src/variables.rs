//! The variable definition table.
//!
//! Every setting deckhand recognizes is declared here once: its
//! canonical name, its parser, and its default. The table is built a
//! single time per process and never changes afterward; the resolver
//! guarantees each key ends up with exactly one value of the declared
//! kind.

use std::sync::LazyLock;

use uuid::Uuid;

use crate::value::{Value, ValueKind};

// Canonical keys referenced from code elsewhere in the workspace.
pub const PROJECT_NAME: &str = "PROJECT_NAME";
pub const PROJECT_QUALIFIED_ID: &str = "PROJECT_QUALIFIED_ID";
pub const DEFAULT_TRACK: &str = "DEFAULT_TRACK";
pub const KUBECONFIG: &str = "KUBECONFIG";
pub const DOCKER_BUILD_ARG_PREFIX: &str = "DOCKER_BUILD_ARG_PREFIX";
pub const K8S_SECRET_PREFIX: &str = "K8S_SECRET_PREFIX";
pub const K8S_FILE_SECRET_PREFIX: &str = "K8S_FILE_SECRET_PREFIX";
pub const SERVICE_ARTIFACT_FOLDER: &str = "SERVICE_ARTIFACT_FOLDER";
pub const BUILD_ARTIFACT_FOLDER: &str = "BUILD_ARTIFACT_FOLDER";

/// A single entry in the definition table.
#[derive(Debug, Clone)]
pub struct VariableDef {
    pub key: &'static str,
    pub kind: ValueKind,
    pub default: Value,
}

fn string(key: &'static str, default: &str) -> VariableDef {
    VariableDef {
        key,
        kind: ValueKind::Str,
        default: Value::Str(default.to_string()),
    }
}

fn boolean(key: &'static str, default: bool) -> VariableDef {
    VariableDef {
        key,
        kind: ValueKind::Bool,
        default: Value::Bool(default),
    }
}

fn integer(key: &'static str, default: i64) -> VariableDef {
    VariableDef {
        key,
        kind: ValueKind::Int,
        default: Value::Int(default),
    }
}

fn list(key: &'static str) -> VariableDef {
    VariableDef {
        key,
        kind: ValueKind::List,
        default: Value::List(Vec::new()),
    }
}

fn basic_auth(key: &'static str) -> VariableDef {
    VariableDef {
        key,
        kind: ValueKind::BasicAuth,
        default: Value::BasicAuth(Vec::new()),
    }
}

static DEFINITIONS: LazyLock<Vec<VariableDef>> = LazyLock::new(|| {
    vec![
        // Project
        string(PROJECT_NAME, ""),
        string("PROJECT_DIR", ""),
        string("PROJECT_PATH_SLUG", ""),
        string(PROJECT_QUALIFIED_ID, ""),
        // Docker
        string("BUILDKIT_CACHE_IMAGE_NAME", "cache"),
        string("BUILDKIT_CACHE_REPO", ""),
        boolean("BUILDKIT_CACHE_DISABLE", false),
        string("CONTAINER_REGISTRY", "docker.io"),
        string("CONTAINER_REGISTRY_PASSWORD", ""),
        string("CONTAINER_REGISTRY_REPO", ""),
        string("CONTAINER_REGISTRY_USER", ""),
        string("BUILT_DOCKER_TEST_IMAGE", ""),
        string(DOCKER_BUILD_ARG_PREFIX, "DOCKER_BUILD_ARG_"),
        string("DOCKER_BUILD_CONTEXT", "."),
        string("DOCKER_BUILD_SOURCE", "Dockerfile"),
        string("DOCKER_HOST", ""),
        string("DOCKER_IMAGE_NAME", ""),
        string("DOCKER_TEST_IMAGE_STAGE", "development"),
        // Environment
        string(DEFAULT_TRACK, "stable"),
        string("ENVIRONMENT_SLUG", ""),
        string("ENVIRONMENT_URL", ""),
        integer("SERVICE_PORT", 8000),
        // Git
        string("GIT_COMMIT_REF_NAME", ""),
        string("GIT_COMMIT_SHA", ""),
        string("GIT_DEFAULT_TARGET_BRANCH", "master"),
        string("GIT_TARGET_BRANCH", ""),
        // Application
        string("APP_INITIALIZE_COMMAND", ""),
        string("APP_MIGRATE_COMMAND", ""),
        string(BUILD_ARTIFACT_FOLDER, ""),
        string("DATABASE_DB", "appdb"),
        // A throwaway credential for ephemeral per-track databases; a
        // fresh one is generated each process.
        string("DATABASE_PASSWORD", &Uuid::new_v4().to_string()),
        string("DATABASE_USER", "user"),
        string("MYSQL_VERSION_TAG", "5.7"),
        string("POSTGRES_IMAGE", "docker.io/bitnami/postgresql:9.6"),
        string("RABBITMQ_VERSION_TAG", "3.8.5"),
        string(SERVICE_ARTIFACT_FOLDER, ""),
        // Kubernetes
        list("K8S_ADDITIONAL_HOSTNAMES"),
        string("K8S_CLUSTER_ISSUER", ""),
        boolean("K8S_HPA_ENABLED", false),
        integer("K8S_HPA_MAX_REPLICAS", 3),
        integer("K8S_HPA_MIN_REPLICAS", 1),
        integer("K8S_HPA_MAX_CPU_AVG", 75),
        integer("K8S_HPA_MAX_RAM_AVG", 0),
        list("K8S_INGRESS_ANNOTATIONS"),
        string("K8S_INGRESS_BASE_DOMAIN", ""),
        basic_auth("K8S_INGRESS_BASIC_AUTH"),
        boolean("K8S_INGRESS_DISABLED", false),
        boolean("K8S_CERTMANAGER_USE_OLD_API", false),
        string("K8S_INGRESS_MAX_BODY_SIZE", "100m"),
        boolean("K8S_INGRESS_PREVENT_ROBOTS", false),
        string("K8S_INGRESS_SECRET_NAME", ""),
        string("K8S_INGRESS_WHITELIST_IPS", ""),
        string("K8S_LIVENESS_PATH", "/healthz"),
        string("K8S_NAMESPACE", ""),
        integer("K8S_PROBE_FAILURE_THRESHOLD", 3),
        integer("K8S_PROBE_INITIAL_DELAY", 60),
        integer("K8S_PROBE_PERIOD", 10),
        string("K8S_FILE_SECRET_MOUNTPATH", "/tmp/secrets"),
        string(K8S_FILE_SECRET_PREFIX, "K8S_FILE_SECRET_"),
        string("K8S_READINESS_PATH", "/readiness"),
        string("K8S_REQUEST_CPU", "50m"),
        string("K8S_REQUEST_RAM", "128Mi"),
        string("K8S_LIMIT_CPU", ""),
        string("K8S_LIMIT_RAM", ""),
        string(K8S_SECRET_PREFIX, "K8S_SECRET_"),
        string("K8S_LIVENESS_FILE", ""),
        boolean("K8S_PERSISTENT_STORAGE", false),
        string("K8S_PERSISTENT_STORAGE_ACCESS_MODE", "ReadWriteOnce"),
        string("K8S_PERSISTENT_STORAGE_PATH", ""),
        string("K8S_PERSISTENT_STORAGE_SIZE", "1Gi"),
        string("K8S_PERSISTENT_STORAGE_STORAGE_TYPE", "standard"),
        string("K8S_READINESS_FILE", ""),
        integer("K8S_REPLICACOUNT", 1),
        string("K8S_TEMP_STORAGE_PATH", ""),
        string(KUBECONFIG, ""),
        string("DEPENDS_ON_PROJECTS", ""),
        // Pipeline
        boolean("DECKHAND_JOBS_ONLY", false),
        // Vault
        string("VAULT_ADDR", ""),
        string("VAULT_JWT_AUTH_PATH", "jwt"),
        string("VAULT_KV_SECRET_MOUNT_POINT", "secrets"),
        string("VAULT_JWT", ""),
        boolean("VAULT_TLS_ENABLED", true),
        // Job
        string("JOB_ACTOR", ""),
        // Merge/pull request
        string("PR_ASSIGNEES", ""),
        string("PR_ID", ""),
        string("PR_TITLE", ""),
        string("PR_URL", ""),
    ]
});

/// All recognized variable definitions, in declaration order.
pub fn definitions() -> &'static [VariableDef] {
    &DEFINITIONS
}

/// Look up a definition by canonical key.
pub fn definition(key: &str) -> Option<&'static VariableDef> {
    DEFINITIONS.iter().find(|def| def.key == key)
}
