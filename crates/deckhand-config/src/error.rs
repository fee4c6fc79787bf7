//! Configuration errors.

use thiserror::Error;

/// The source a raw value was read from, carried in errors and logs so
/// parse failures are attributable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueSource {
    Environment,
    ProjectPrefixed,
    CiMapper,
    Seed,
    Default,
}

impl std::fmt::Display for ValueSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValueSource::Environment => write!(f, "environment"),
            ValueSource::ProjectPrefixed => write!(f, "project-prefixed environment"),
            ValueSource::CiMapper => write!(f, "CI mapper"),
            ValueSource::Seed => write!(f, "pre-seeded value"),
            ValueSource::Default => write!(f, "default"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no project name could be found")]
    ProjectNameUnresolved,

    #[error("invalid value for {key} from {source_kind} (raw {raw:?}): {reason}")]
    ValueParse {
        key: String,
        source_kind: ValueSource,
        raw: String,
        reason: String,
    },

    #[error("no cluster configuration found for track {track:?}")]
    NoClusterConfig { track: String },

    #[error("plugin {plugin} is missing required configuration: {missing:?}")]
    PluginMissingConfiguration {
        plugin: String,
        missing: Vec<String>,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
