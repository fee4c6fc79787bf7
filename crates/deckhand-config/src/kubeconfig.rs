//! Kubeconfig selection.
//!
//! Cluster credentials arrive either as inline file content
//! (`KUBECONFIG_RAW`, optionally track-suffixed) or as a path
//! (`KUBECONFIG`, optionally track-suffixed). Inline content always
//! wins and is materialized into a temporary file that lives for the
//! rest of the process. Whatever is selected is exported back into the
//! environment under `KUBECONFIG`, because the cluster tools invoked
//! afterwards read the ambient environment, not an argument.

use std::io::Write;

use tracing::info;

use crate::environ::Environ;
use crate::error::{ConfigError, ConfigResult};
use crate::settings::Settings;
use crate::value::Value;
use crate::variables;

/// Result of a kubeconfig selection: the adopted path (or path to the
/// materialized blob) and the environment key that supplied it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KubeconfigSelection {
    pub kubeconfig: String,
    pub source_key: String,
}

impl Settings {
    /// Select cluster credentials for `track`.
    ///
    /// Phase 1 tries the inline-content keys, most specific first:
    /// `KUBECONFIG_RAW_{TRACK}` (non-empty track only), then
    /// `KUBECONFIG_RAW`. A hit is written to a fresh temporary file and
    /// adopted immediately; phase 2 never runs.
    ///
    /// Phase 2 tries the path keys the same way: `KUBECONFIG_{TRACK}`,
    /// then `KUBECONFIG`.
    ///
    /// Empty values count as absent in both phases. If nothing matches
    /// there is no safe default credential and selection fails.
    pub fn setup_kubeconfig(
        &mut self,
        env: &mut Environ,
        track: &str,
    ) -> ConfigResult<KubeconfigSelection> {
        if let Some((content, key)) = first_nonempty(env, candidate_keys("KUBECONFIG_RAW", track)) {
            let path = materialize(&content)?;
            info!(key = %key, path = %path, "created kubeconfig from inline content");
            self.adopt_kubeconfig(env, &path);
            return Ok(KubeconfigSelection {
                kubeconfig: path,
                source_key: key,
            });
        }

        if let Some((path, key)) = first_nonempty(env, candidate_keys("KUBECONFIG", track)) {
            info!(key = %key, "using kubeconfig path");
            self.adopt_kubeconfig(env, &path);
            return Ok(KubeconfigSelection {
                kubeconfig: path,
                source_key: key,
            });
        }

        Err(ConfigError::NoClusterConfig {
            track: track.to_string(),
        })
    }

    fn adopt_kubeconfig(&mut self, env: &mut Environ, path: &str) {
        self.set(variables::KUBECONFIG, Value::Str(path.to_string()));
        env.set(variables::KUBECONFIG, path);
    }
}

fn candidate_keys(base: &str, track: &str) -> Vec<String> {
    let mut keys = Vec::with_capacity(2);
    if !track.is_empty() {
        keys.push(format!("{}_{}", base, track.to_uppercase()));
    }
    keys.push(base.to_string());
    keys
}

fn first_nonempty(env: &Environ, keys: Vec<String>) -> Option<(String, String)> {
    keys.into_iter()
        .find_map(|key| env.get_nonempty(&key).map(|value| (value.to_string(), key)))
}

/// Write inline kubeconfig content to a fresh process-owned temporary
/// file and return its path. The file is kept for the lifetime of the
/// process; no cleanup is guaranteed.
fn materialize(content: &str) -> ConfigResult<String> {
    let mut file = tempfile::NamedTempFile::new()?;
    file.write_all(content.as_bytes())?;
    let (_, path) = file.keep().map_err(|persist| ConfigError::Io(persist.error))?;
    Ok(path.to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolved(extra: &[(&str, &str)]) -> (Settings, Environ) {
        let mut vars = vec![("PROJECT_NAME", "testing")];
        vars.extend_from_slice(extra);
        let env = Environ::from_vars(vars);
        let settings = Settings::resolve(&env).unwrap();
        (settings, env)
    }

    #[test]
    fn test_raw_track_key_wins_over_everything() {
        let (mut settings, mut env) = resolved(&[
            ("KUBECONFIG_RAW_STABLE", "content from raw stable"),
            ("KUBECONFIG_RAW", "content from raw"),
            ("KUBECONFIG_STABLE", "/path/stable"),
            ("KUBECONFIG", "/path/plain"),
        ]);

        let selection = settings.setup_kubeconfig(&mut env, "stable").unwrap();
        assert_eq!(selection.source_key, "KUBECONFIG_RAW_STABLE");

        let written = std::fs::read_to_string(&selection.kubeconfig).unwrap();
        assert_eq!(written, "content from raw stable");

        // The temp file path is adopted both on the settings object and
        // in the environment.
        assert_eq!(
            settings.string(variables::KUBECONFIG),
            Some(selection.kubeconfig.as_str())
        );
        assert_eq!(env.get(variables::KUBECONFIG), Some(selection.kubeconfig.as_str()));

        std::fs::remove_file(&selection.kubeconfig).unwrap();
    }

    #[test]
    fn test_raw_key_used_for_unknown_track() {
        let (mut settings, mut env) = resolved(&[("KUBECONFIG_RAW", "raw content")]);
        let selection = settings.setup_kubeconfig(&mut env, "fake_track").unwrap();
        assert_eq!(selection.source_key, "KUBECONFIG_RAW");
        let written = std::fs::read_to_string(&selection.kubeconfig).unwrap();
        assert_eq!(written, "raw content");
        std::fs::remove_file(&selection.kubeconfig).unwrap();
    }

    #[test]
    fn test_empty_raw_falls_through_to_path_key() {
        let (mut settings, mut env) =
            resolved(&[("KUBECONFIG_RAW", ""), ("KUBECONFIG", "X")]);
        let selection = settings.setup_kubeconfig(&mut env, "fake_track").unwrap();
        assert_eq!(selection.kubeconfig, "X");
        assert_eq!(selection.source_key, "KUBECONFIG");
    }

    #[test]
    fn test_track_specific_path_key() {
        let (mut settings, mut env) = resolved(&[
            ("KUBECONFIG", "Value from fall-back KUBECONFIG"),
            ("KUBECONFIG_STABLE", "Value from track-specific KUBECONFIG"),
            ("KUBECONFIG_REVIEW", "A totally wrong KUBECONFIG"),
        ]);
        let selection = settings.setup_kubeconfig(&mut env, "stable").unwrap();
        assert_eq!(selection.source_key, "KUBECONFIG_STABLE");
        assert_eq!(selection.kubeconfig, "Value from track-specific KUBECONFIG");
        assert_eq!(
            env.get(variables::KUBECONFIG),
            Some("Value from track-specific KUBECONFIG")
        );
    }

    #[test]
    fn test_fallback_when_track_key_missing() {
        let (mut settings, mut env) = resolved(&[
            ("KUBECONFIG", "Value from fall-back KUBECONFIG"),
            ("KUBECONFIG_OTHER", "A totally wrong KUBECONFIG"),
        ]);
        let selection = settings.setup_kubeconfig(&mut env, "review").unwrap();
        assert_eq!(selection.source_key, "KUBECONFIG");
        assert_eq!(selection.kubeconfig, "Value from fall-back KUBECONFIG");
    }

    #[test]
    fn test_empty_track_skips_track_keys() {
        let (mut settings, mut env) = resolved(&[
            ("KUBECONFIG", "plain"),
            ("KUBECONFIG_", "never considered"),
        ]);
        let selection = settings.setup_kubeconfig(&mut env, "").unwrap();
        assert_eq!(selection.source_key, "KUBECONFIG");
        assert_eq!(selection.kubeconfig, "plain");
    }

    #[test]
    fn test_no_candidates_is_fatal() {
        let (mut settings, mut env) = resolved(&[]);
        match settings.setup_kubeconfig(&mut env, "stable") {
            Err(ConfigError::NoClusterConfig { track }) => assert_eq!(track, "stable"),
            other => panic!("expected NoClusterConfig, got {:?}", other),
        }
    }

    #[test]
    fn test_track_is_uppercased_in_keys() {
        let (mut settings, mut env) =
            resolved(&[("KUBECONFIG_REVIEW", "/path/review")]);
        let selection = settings.setup_kubeconfig(&mut env, "review").unwrap();
        assert_eq!(selection.source_key, "KUBECONFIG_REVIEW");
    }
}
