//! CI provider mappers.
//!
//! Each supported provider declares how to recognize that it is running
//! the current job and how its native variables map onto canonical
//! setting names. Providers form a closed set, probed in a fixed order;
//! the first active one wins, and none being active simply means a
//! local or manual run.

use std::path::Path;

use tracing::debug;
use url::Url;

use crate::environ::Environ;

/// Where a mapped value comes from: a provider-native environment
/// variable, or a value the mapper computes itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapSource {
    FromEnvironment(&'static str),
    Derived(DerivedField),
}

/// Values a mapper computes from ambient state instead of reading a
/// single variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DerivedField {
    /// `host[:port]/path` identity of the repository.
    ProjectQualifiedId,
    PrId,
    PrTitle,
    PrUrl,
}

/// One entry of a provider's mapping table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapEntry {
    pub source: MapSource,
    pub target: &'static str,
}

const fn from_env(key: &'static str, target: &'static str) -> MapEntry {
    MapEntry {
        source: MapSource::FromEnvironment(key),
        target,
    }
}

const fn derived(field: DerivedField, target: &'static str) -> MapEntry {
    MapEntry {
        source: MapSource::Derived(field),
        target,
    }
}

const GITLAB_MAPPING: &[MapEntry] = &[
    from_env("CI_COMMIT_REF_NAME", "GIT_COMMIT_REF_NAME"),
    from_env("CI_COMMIT_SHA", "GIT_COMMIT_SHA"),
    from_env("CI_DEFAULT_BRANCH", "GIT_DEFAULT_TARGET_BRANCH"),
    from_env("CI_ENVIRONMENT_SLUG", "ENVIRONMENT_SLUG"),
    from_env("CI_ENVIRONMENT_URL", "ENVIRONMENT_URL"),
    from_env("CI_JOB_JWT", "VAULT_JWT"),
    from_env("CI_MERGE_REQUEST_ASSIGNEES", "PR_ASSIGNEES"),
    from_env("CI_MERGE_REQUEST_ID", "PR_ID"),
    from_env("CI_MERGE_REQUEST_PROJECT_URL", "PR_URL"),
    from_env("CI_MERGE_REQUEST_TARGET_BRANCH_NAME", "GIT_TARGET_BRANCH"),
    from_env("CI_MERGE_REQUEST_TITLE", "PR_TITLE"),
    from_env("CI_PROJECT_DIR", "PROJECT_DIR"),
    from_env("CI_PROJECT_NAME", "PROJECT_NAME"),
    from_env("CI_PROJECT_PATH_SLUG", "PROJECT_PATH_SLUG"),
    from_env("CI_REGISTRY", "CONTAINER_REGISTRY"),
    from_env("CI_REGISTRY_IMAGE", "CONTAINER_REGISTRY_REPO"),
    from_env("CI_REGISTRY_PASSWORD", "CONTAINER_REGISTRY_PASSWORD"),
    from_env("CI_REGISTRY_USER", "CONTAINER_REGISTRY_USER"),
    from_env("GITLAB_USER_NAME", "JOB_ACTOR"),
    from_env("KUBE_CLUSTER_ISSUER", "K8S_CLUSTER_ISSUER"),
    from_env("KUBECONFIG", "KUBECONFIG"),
    from_env("KUBE_INGRESS_BASE_DOMAIN", "K8S_INGRESS_BASE_DOMAIN"),
    from_env("KUBE_INGRESS_PREVENT_ROBOTS", "K8S_INGRESS_PREVENT_ROBOTS"),
    from_env("KUBE_NAMESPACE", "K8S_NAMESPACE"),
    derived(DerivedField::ProjectQualifiedId, "PROJECT_QUALIFIED_ID"),
];

const AZURE_MAPPING: &[MapEntry] = &[
    from_env("BUILD_DEFINITIONNAME", "DOCKER_IMAGE_NAME"),
    from_env("BUILD_SOURCEBRANCHNAME", "GIT_COMMIT_REF_NAME"),
    from_env("BUILD_SOURCEVERSION", "GIT_COMMIT_SHA"),
    from_env("SYSTEM_TEAMPROJECT", "PROJECT_NAME"),
    derived(DerivedField::ProjectQualifiedId, "PROJECT_QUALIFIED_ID"),
];

const GITHUB_MAPPING: &[MapEntry] = &[
    from_env("GITHUB_ACTOR", "JOB_ACTOR"),
    from_env("GITHUB_BASE_REF", "GIT_TARGET_BRANCH"),
    from_env("GITHUB_REF", "GIT_COMMIT_REF_NAME"),
    from_env("GITHUB_REPOSITORY", "PROJECT_NAME"),
    from_env("GITHUB_SHA", "GIT_COMMIT_SHA"),
    derived(DerivedField::PrId, "PR_ID"),
    derived(DerivedField::PrTitle, "PR_TITLE"),
    derived(DerivedField::PrUrl, "PR_URL"),
    derived(DerivedField::ProjectQualifiedId, "PROJECT_QUALIFIED_ID"),
];

/// Pull-request fields cached off the GitHub event payload when the
/// mapper activates. Any problem reading the payload leaves the fields
/// unset; downstream resolution falls through to other sources.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PullRequestEvent {
    pub id: Option<String>,
    pub title: Option<String>,
    pub url: Option<String>,
}

impl PullRequestEvent {
    fn load(env: &Environ) -> Self {
        if env.get("GITHUB_EVENT_NAME") != Some("pull_request") {
            return Self::default();
        }
        let Some(path) = env.get_nonempty("GITHUB_EVENT_PATH") else {
            return Self::default();
        };
        Self::from_file(Path::new(path))
    }

    fn from_file(path: &Path) -> Self {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(error) => {
                debug!(path = %path.display(), %error, "no readable event payload");
                return Self::default();
            }
        };
        let data: serde_json::Value = match serde_json::from_str(&raw) {
            Ok(data) => data,
            Err(error) => {
                debug!(path = %path.display(), %error, "event payload is not valid JSON");
                return Self::default();
            }
        };

        Self {
            id: project_string(&data, "/pull_request/number"),
            title: project_string(&data, "/pull_request/title"),
            url: project_string(&data, "/pull_request/url"),
        }
    }
}

/// Project a nested field out of a JSON payload as a string. Numbers and
/// other scalars are rendered in their JSON form.
fn project_string(data: &serde_json::Value, pointer: &str) -> Option<String> {
    match data.pointer(pointer)? {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// An active CI provider mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CiMapper {
    GitLab,
    AzurePipelines,
    GitHubActions { event: PullRequestEvent },
}

impl CiMapper {
    /// Probe providers in registration order and return the first whose
    /// activation marker is present. GitHub Actions additionally caches
    /// the pull-request event payload at this point.
    pub fn detect(env: &Environ) -> Option<CiMapper> {
        if truthy(env.get("GITLAB_CI")) {
            return Some(CiMapper::GitLab);
        }
        if env.get_nonempty("AZURE_HTTP_USER_AGENT").is_some() {
            return Some(CiMapper::AzurePipelines);
        }
        if truthy(env.get("GITHUB_ACTIONS")) {
            return Some(CiMapper::GitHubActions {
                event: PullRequestEvent::load(env),
            });
        }
        None
    }

    /// This provider's mapping table, in precedence order.
    pub fn mapping(&self) -> &'static [MapEntry] {
        match self {
            CiMapper::GitLab => GITLAB_MAPPING,
            CiMapper::AzurePipelines => AZURE_MAPPING,
            CiMapper::GitHubActions { .. } => GITHUB_MAPPING,
        }
    }

    /// Compute a derived value. Absent prerequisites yield `None`, never
    /// an error, so the resolver can fall through.
    pub fn derived(&self, field: DerivedField, env: &Environ) -> Option<String> {
        match field {
            DerivedField::ProjectQualifiedId => self.project_qualified_id(env),
            DerivedField::PrId => self.event()?.id.clone(),
            DerivedField::PrTitle => self.event()?.title.clone(),
            DerivedField::PrUrl => self.event()?.url.clone(),
        }
    }

    fn event(&self) -> Option<&PullRequestEvent> {
        match self {
            CiMapper::GitHubActions { event } => Some(event),
            _ => None,
        }
    }

    fn project_qualified_id(&self, env: &Environ) -> Option<String> {
        match self {
            CiMapper::GitLab => {
                let server_url = Url::parse(env.get("CI_SERVER_URL")?).ok()?;
                let project_path = env.get("CI_PROJECT_PATH")?;
                Some(format!("{}/{}", netloc(&server_url)?, project_path))
            }
            CiMapper::AzurePipelines => {
                let repo_uri = Url::parse(env.get("BUILD_REPOSITORY_URI")?).ok()?;
                Some(format!("{}{}", netloc(&repo_uri)?, repo_uri.path()))
            }
            CiMapper::GitHubActions { .. } => {
                let server_url = Url::parse(env.get("GITHUB_SERVER_URL")?).ok()?;
                let repository = env.get("GITHUB_REPOSITORY")?;
                Some(format!("{}/{}", netloc(&server_url)?, repository))
            }
        }
    }
}

impl std::fmt::Display for CiMapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CiMapper::GitLab => write!(f, "GitLab CI"),
            CiMapper::AzurePipelines => write!(f, "Azure Pipelines"),
            CiMapper::GitHubActions { .. } => write!(f, "GitHub Actions"),
        }
    }
}

fn truthy(value: Option<&str>) -> bool {
    value.is_some_and(|raw| {
        matches!(
            raw.to_ascii_lowercase().as_str(),
            "true" | "1" | "yes" | "y" | "on"
        )
    })
}

fn netloc(url: &Url) -> Option<String> {
    let host = url.host_str()?;
    Some(match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    })
}

// Mapping targets must stay aligned with the definition table; the
// resolver warns at runtime, this keeps them honest at test time.
#[cfg(test)]
mod tests {
    use super::*;
    use crate::variables;
    use std::io::Write;

    #[test]
    fn test_all_mapping_targets_are_defined() {
        for mapping in [GITLAB_MAPPING, AZURE_MAPPING, GITHUB_MAPPING] {
            for entry in mapping {
                assert!(
                    variables::definition(entry.target).is_some(),
                    "unmapped target {}",
                    entry.target
                );
            }
        }
    }

    #[test]
    fn test_detection_priority_first_match_wins() {
        let env = Environ::from_vars([("GITLAB_CI", "true"), ("GITHUB_ACTIONS", "true")]);
        assert_eq!(CiMapper::detect(&env), Some(CiMapper::GitLab));
    }

    #[test]
    fn test_detection_azure() {
        let env = Environ::from_vars([("AZURE_HTTP_USER_AGENT", "VSTS/1.0")]);
        assert_eq!(CiMapper::detect(&env), Some(CiMapper::AzurePipelines));
    }

    #[test]
    fn test_no_provider_active() {
        let env = Environ::from_vars([("GITLAB_CI", "false"), ("AZURE_HTTP_USER_AGENT", "")]);
        assert_eq!(CiMapper::detect(&env), None);
    }

    #[test]
    fn test_gitlab_qualified_id() {
        let env = Environ::from_vars([
            ("CI_SERVER_URL", "https://gitlab.example.com:8443"),
            ("CI_PROJECT_PATH", "group/app"),
        ]);
        let mapper = CiMapper::GitLab;
        assert_eq!(
            mapper.derived(DerivedField::ProjectQualifiedId, &env),
            Some("gitlab.example.com:8443/group/app".to_string())
        );
    }

    #[test]
    fn test_gitlab_qualified_id_requires_both_inputs() {
        let env = Environ::from_vars([("CI_SERVER_URL", "https://gitlab.example.com")]);
        assert_eq!(
            CiMapper::GitLab.derived(DerivedField::ProjectQualifiedId, &env),
            None
        );
    }

    #[test]
    fn test_azure_qualified_id() {
        let env = Environ::from_vars([(
            "BUILD_REPOSITORY_URI",
            "https://dev.azure.com/org/project/_git/app",
        )]);
        assert_eq!(
            CiMapper::AzurePipelines.derived(DerivedField::ProjectQualifiedId, &env),
            Some("dev.azure.com/org/project/_git/app".to_string())
        );
    }

    #[test]
    fn test_github_qualified_id() {
        let env = Environ::from_vars([
            ("GITHUB_SERVER_URL", "https://github.com"),
            ("GITHUB_REPOSITORY", "octocat/hello-world"),
        ]);
        let mapper = CiMapper::GitHubActions {
            event: PullRequestEvent::default(),
        };
        assert_eq!(
            mapper.derived(DerivedField::ProjectQualifiedId, &env),
            Some("github.com/octocat/hello-world".to_string())
        );
    }

    fn write_event_payload(json: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_pull_request_event_projection() {
        let file = write_event_payload(
            r#"{
                "action": "opened",
                "number": 2,
                "pull_request": {
                    "url": "https://api.github.com/repos/Codertocat/Hello-World/pulls/2",
                    "number": 2,
                    "title": "Update the README with new information."
                }
            }"#,
        );
        let env = Environ::from_vars([
            ("GITHUB_ACTIONS", "true"),
            ("GITHUB_EVENT_NAME", "pull_request"),
            ("GITHUB_EVENT_PATH", file.path().to_str().unwrap()),
        ]);

        let mapper = CiMapper::detect(&env).unwrap();
        assert_eq!(
            mapper.derived(DerivedField::PrUrl, &env).as_deref(),
            Some("https://api.github.com/repos/Codertocat/Hello-World/pulls/2")
        );
        assert_eq!(
            mapper.derived(DerivedField::PrTitle, &env).as_deref(),
            Some("Update the README with new information.")
        );
        assert_eq!(mapper.derived(DerivedField::PrId, &env).as_deref(), Some("2"));
    }

    #[test]
    fn test_pull_request_event_missing_file() {
        let env = Environ::from_vars([
            ("GITHUB_ACTIONS", "true"),
            ("GITHUB_EVENT_NAME", "pull_request"),
            ("GITHUB_EVENT_PATH", "/no/such/event.json"),
        ]);
        let mapper = CiMapper::detect(&env).unwrap();
        assert_eq!(mapper.derived(DerivedField::PrUrl, &env), None);
        assert_eq!(mapper.derived(DerivedField::PrTitle, &env), None);
        assert_eq!(mapper.derived(DerivedField::PrId, &env), None);
    }

    #[test]
    fn test_pull_request_event_invalid_json() {
        let file = write_event_payload("not json at all");
        let env = Environ::from_vars([
            ("GITHUB_ACTIONS", "1"),
            ("GITHUB_EVENT_NAME", "pull_request"),
            ("GITHUB_EVENT_PATH", file.path().to_str().unwrap()),
        ]);
        let mapper = CiMapper::detect(&env).unwrap();
        assert_eq!(mapper.derived(DerivedField::PrId, &env), None);
    }

    #[test]
    fn test_other_event_names_are_ignored() {
        let file = write_event_payload(r#"{"pull_request": {"number": 9}}"#);
        let env = Environ::from_vars([
            ("GITHUB_ACTIONS", "true"),
            ("GITHUB_EVENT_NAME", "push"),
            ("GITHUB_EVENT_PATH", file.path().to_str().unwrap()),
        ]);
        let mapper = CiMapper::detect(&env).unwrap();
        assert_eq!(mapper.derived(DerivedField::PrId, &env), None);
    }
}
