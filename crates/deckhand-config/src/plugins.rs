//! Plugin configuration surface.
//!
//! Plugins declare the variables they need up front; the registry reads
//! and parses those from the environment snapshot and either hands the
//! plugin its configuration or skips it. A plugin that cannot configure
//! itself is never fatal — the run continues without it.

use std::collections::BTreeMap;

use tracing::{info, warn};

use crate::environ::Environ;
use crate::error::{ConfigError, ConfigResult, ValueSource};
use crate::value::{Value, ValueKind};

/// A pluggable extension's configuration contract.
pub trait Plugin {
    fn name(&self) -> &'static str;
    fn verbose_name(&self) -> &'static str;

    /// Variables that must be present for the plugin to load.
    fn required_variables(&self) -> &'static [(&'static str, ValueKind)];

    /// Variables picked up when present.
    fn optional_variables(&self) -> &'static [(&'static str, ValueKind)] {
        &[]
    }

    /// Receive the parsed configuration. Only called once every required
    /// variable parsed successfully.
    fn configure(&mut self, values: &BTreeMap<&'static str, Value>);
}

/// Holds the plugins that configured successfully.
#[derive(Default)]
pub struct PluginRegistry {
    plugins: Vec<Box<dyn Plugin>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configure and register a plugin. Missing or unparsable
    /// configuration downgrades to a skip-with-warning; returns whether
    /// the plugin was registered.
    pub fn load(&mut self, env: &Environ, mut plugin: Box<dyn Plugin>) -> bool {
        match configure_plugin(env, plugin.as_mut()) {
            Ok(()) => {
                info!(plugin = plugin.verbose_name(), "plugin loaded");
                self.plugins.push(plugin);
                true
            }
            Err(error) => {
                warn!(plugin = plugin.verbose_name(), %error, "plugin skipped");
                false
            }
        }
    }

    pub fn is_loaded(&self, name: &str) -> bool {
        self.plugins.iter().any(|plugin| plugin.name() == name)
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.plugins.iter().map(|plugin| plugin.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}

fn configure_plugin(env: &Environ, plugin: &mut dyn Plugin) -> ConfigResult<()> {
    let mut values = BTreeMap::new();
    let mut missing = Vec::new();

    for (key, kind) in plugin.required_variables() {
        match env.get(key) {
            Some(raw) => {
                let value = parse_plugin_value(key, *kind, raw)?;
                values.insert(*key, value);
            }
            None => missing.push((*key).to_string()),
        }
    }

    if !missing.is_empty() {
        return Err(ConfigError::PluginMissingConfiguration {
            plugin: plugin.name().to_string(),
            missing,
        });
    }

    for (key, kind) in plugin.optional_variables() {
        if let Some(raw) = env.get(key) {
            let value = parse_plugin_value(key, *kind, raw)?;
            values.insert(*key, value);
        }
    }

    plugin.configure(&values);
    Ok(())
}

fn parse_plugin_value(key: &str, kind: ValueKind, raw: &str) -> ConfigResult<Value> {
    kind.parse(raw).map_err(|reason| ConfigError::ValueParse {
        key: key.to_string(),
        source_kind: ValueSource::Environment,
        raw: raw.to_string(),
        reason,
    })
}

/// The plugins shipped with deckhand. Only their configuration surface
/// lives here; actual delivery happens in the external hook mechanism.
pub fn core_plugins() -> Vec<Box<dyn Plugin>> {
    vec![
        Box::new(SlackNotifier::default()),
        Box::new(SentryReporter::default()),
    ]
}

/// Posts deployment notifications to Slack.
#[derive(Debug, Default)]
pub struct SlackNotifier {
    pub token: String,
    pub channel: Option<String>,
}

const SLACK_REQUIRED: &[(&str, ValueKind)] = &[("SLACK_TOKEN", ValueKind::Str)];
const SLACK_OPTIONAL: &[(&str, ValueKind)] = &[("SLACK_CHANNEL", ValueKind::Str)];

impl Plugin for SlackNotifier {
    fn name(&self) -> &'static str {
        "slack"
    }

    fn verbose_name(&self) -> &'static str {
        "Slack notifier"
    }

    fn required_variables(&self) -> &'static [(&'static str, ValueKind)] {
        SLACK_REQUIRED
    }

    fn optional_variables(&self) -> &'static [(&'static str, ValueKind)] {
        SLACK_OPTIONAL
    }

    fn configure(&mut self, values: &BTreeMap<&'static str, Value>) {
        if let Some(Value::Str(token)) = values.get("SLACK_TOKEN") {
            self.token = token.clone();
        }
        self.channel = match values.get("SLACK_CHANNEL") {
            Some(Value::Str(channel)) => Some(channel.clone()),
            _ => None,
        };
    }
}

/// Reports deployments to Sentry.
#[derive(Debug, Default)]
pub struct SentryReporter {
    pub dsn: String,
}

const SENTRY_REQUIRED: &[(&str, ValueKind)] = &[("SENTRY_DSN", ValueKind::Str)];

impl Plugin for SentryReporter {
    fn name(&self) -> &'static str {
        "sentry"
    }

    fn verbose_name(&self) -> &'static str {
        "Sentry reporter"
    }

    fn required_variables(&self) -> &'static [(&'static str, ValueKind)] {
        SENTRY_REQUIRED
    }

    fn configure(&mut self, values: &BTreeMap<&'static str, Value>) {
        if let Some(Value::Str(dsn)) = values.get("SENTRY_DSN") {
            self.dsn = dsn.clone();
        }
    }
}
