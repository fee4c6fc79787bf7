//! Environment snapshot.
//!
//! Resolution never reads `std::env` directly; it works off an
//! [`Environ`] snapshot taken once at startup. The snapshot also folds
//! in `*.env` files from the service/build artifact folders, so values
//! produced by earlier pipeline jobs are visible to resolution without
//! polluting the real process environment.

use std::collections::BTreeMap;
use std::path::Path;

use tracing::{debug, warn};

use crate::variables;

/// A point-in-time view of the environment variables resolution reads
/// from, and the single place writes go through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Environ {
    vars: BTreeMap<String, String>,
    process_backed: bool,
}

impl Environ {
    /// Snapshot the process environment, then merge `*.env` files found
    /// in the directories named by `SERVICE_ARTIFACT_FOLDER` and
    /// `BUILD_ARTIFACT_FOLDER`. Keys already present always win over
    /// file values.
    pub fn capture() -> Self {
        let mut environ = Self {
            vars: std::env::vars().collect(),
            process_backed: true,
        };

        let folders = [
            variables::SERVICE_ARTIFACT_FOLDER,
            variables::BUILD_ARTIFACT_FOLDER,
        ];
        for folder_key in folders {
            if let Some(folder) = environ.get_nonempty(folder_key).map(str::to_string) {
                environ.merge_env_dir(Path::new(&folder));
            }
        }

        environ
    }

    /// Build a snapshot from explicit pairs. Such a snapshot is not
    /// process-backed: [`Environ::set`] only touches the map. Used in
    /// tests and by embedders that manage the environment themselves.
    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: vars
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
            process_backed: false,
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    /// Like [`Environ::get`], but an empty value counts as absent.
    pub fn get_nonempty(&self, key: &str) -> Option<&str> {
        self.get(key).filter(|value| !value.is_empty())
    }

    /// Write a variable. For a process-backed snapshot this also exports
    /// to the real process environment so subsequently spawned tools
    /// observe it.
    pub fn set(&mut self, key: &str, value: &str) {
        self.vars.insert(key.to_string(), value.to_string());
        if self.process_backed {
            // SAFETY: resolution and kubeconfig selection run on the
            // main thread before any worker threads or child processes
            // exist.
            unsafe { std::env::set_var(key, value) };
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    /// Merge every `*.env` file in `dir`, skipping keys that are already
    /// set. A missing directory is not an error.
    fn merge_env_dir(&mut self, dir: &Path) {
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(error) => {
                debug!(dir = %dir.display(), %error, "no artifact env files");
                return;
            }
        };

        let mut paths: Vec<_> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "env"))
            .collect();
        paths.sort();

        for path in paths {
            self.merge_env_file(&path);
        }
    }

    fn merge_env_file(&mut self, path: &Path) {
        let entries = match dotenvy::from_path_iter(path) {
            Ok(entries) => entries,
            Err(error) => {
                warn!(path = %path.display(), %error, "skipping unreadable env file");
                return;
            }
        };

        for entry in entries {
            match entry {
                Ok((key, value)) => {
                    self.vars.entry(key).or_insert(value);
                }
                Err(error) => {
                    warn!(path = %path.display(), %error, "skipping malformed env entry");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_get_and_nonempty() {
        let env = Environ::from_vars([("A", "1"), ("EMPTY", "")]);
        assert_eq!(env.get("A"), Some("1"));
        assert_eq!(env.get("EMPTY"), Some(""));
        assert_eq!(env.get_nonempty("EMPTY"), None);
        assert_eq!(env.get("MISSING"), None);
    }

    #[test]
    fn test_set_on_plain_snapshot_stays_local() {
        let mut env = Environ::from_vars([("A", "1")]);
        env.set("DECKHAND_TEST_LOCAL_ONLY", "x");
        assert_eq!(env.get("DECKHAND_TEST_LOCAL_ONLY"), Some("x"));
        assert!(std::env::var("DECKHAND_TEST_LOCAL_ONLY").is_err());
    }

    #[test]
    fn test_env_file_merge_existing_wins() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("build.env");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "FROM_FILE=file").unwrap();
        writeln!(file, "ALREADY_SET=file").unwrap();

        let mut env = Environ::from_vars([("ALREADY_SET", "process")]);
        env.merge_env_file(&path);

        assert_eq!(env.get("FROM_FILE"), Some("file"));
        assert_eq!(env.get("ALREADY_SET"), Some("process"));
    }

    #[test]
    fn test_env_dir_merge_ignores_other_extensions() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("vars.env"), "FROM_ENV=1\n").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "FROM_TXT=1\n").unwrap();

        let mut env = Environ::from_vars::<_, &str, &str>([]);
        env.merge_env_dir(dir.path());

        assert_eq!(env.get("FROM_ENV"), Some("1"));
        assert_eq!(env.get("FROM_TXT"), None);
    }

    #[test]
    fn test_missing_env_dir_is_silent() {
        let mut env = Environ::from_vars([("A", "1")]);
        env.merge_env_dir(Path::new("/definitely/not/a/real/dir"));
        assert_eq!(env.get("A"), Some("1"));
    }
}
