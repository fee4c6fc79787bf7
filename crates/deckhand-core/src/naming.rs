//! Pure name derivation helpers.
//!
//! Deployment names, secret names, and environment-variable-safe slugs
//! are all derived from the project name and the deployment track. The
//! helpers here take every input as an argument so they stay independent
//! of the settings object.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

static UNSAFE_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-zA-Z0-9]").expect("valid regex"));

/// Turn an arbitrary name into something usable as an environment
/// variable prefix: non-alphanumeric bytes become `_`, the rest is
/// uppercased. `my-app` becomes `MY_APP`.
pub fn env_var_safe_key(key: &str) -> String {
    UNSAFE_CHARS.replace_all(key, "_").to_uppercase()
}

/// Name of a deployment for a track. The default track deploys under the
/// bare project name; every other track gets a `-{track}` suffix.
pub fn deploy_name(project_name: &str, track: &str, default_track: &str) -> String {
    if track.is_empty() || track == default_track {
        project_name.to_string()
    } else {
        format!("{}-{}", project_name, track)
    }
}

/// Name of the Kubernetes secret backing a deployment.
pub fn secret_name(project_name: &str, track: &str, default_track: &str) -> String {
    format!("{}-secret", deploy_name(project_name, track, default_track))
}

/// Collect `(key, value)` pairs whose key starts with `prefix`, with the
/// prefix stripped from the returned keys. Used for gathering Docker
/// build args and Kubernetes secrets out of the environment.
pub fn vars_by_prefix<'a, I>(vars: I, prefix: &str) -> BTreeMap<String, String>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    vars.into_iter()
        .filter_map(|(key, value)| {
            key.strip_prefix(prefix)
                .filter(|stripped| !stripped.is_empty())
                .map(|stripped| (stripped.to_string(), value.to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_var_safe_key() {
        assert_eq!(env_var_safe_key("my-app"), "MY_APP");
        assert_eq!(env_var_safe_key("testing"), "TESTING");
        assert_eq!(env_var_safe_key("org/repo.name"), "ORG_REPO_NAME");
        assert_eq!(env_var_safe_key("already_SAFE_1"), "ALREADY_SAFE_1");
    }

    #[test]
    fn test_deploy_name_default_track() {
        assert_eq!(deploy_name("testing", "stable", "stable"), "testing");
        assert_eq!(deploy_name("testing", "", "stable"), "testing");
    }

    #[test]
    fn test_deploy_name_other_tracks() {
        assert_eq!(deploy_name("testing", "qa", "stable"), "testing-qa");
        assert_eq!(deploy_name("testing", "lizard", "stable"), "testing-lizard");
        assert_eq!(deploy_name("testing", "1", "stable"), "testing-1");
    }

    #[test]
    fn test_secret_name() {
        assert_eq!(secret_name("testing", "stable", "stable"), "testing-secret");
        assert_eq!(secret_name("testing", "qa", "stable"), "testing-qa-secret");
    }

    #[test]
    fn test_vars_by_prefix() {
        let vars = [
            ("K8S_SECRET_PASSWORD", "pass"),
            ("K8S_SECRET_LIZARD", "-1"),
            ("K8S_SECRET_", "ignored"),
            ("UNRELATED", "x"),
        ];
        let collected = vars_by_prefix(vars, "K8S_SECRET_");
        assert_eq!(collected.len(), 2);
        assert_eq!(collected["PASSWORD"], "pass");
        assert_eq!(collected["LIZARD"], "-1");
    }
}
