//! Settings resolution.
//!
//! One [`Settings`] object is resolved per process. Resolution consults,
//! per canonical key and in this order: the environment, the
//! project-prefixed environment, the active CI mapper, any pre-seeded
//! value, and finally the static default. The first source that yields a
//! value wins; a present-but-unparsable raw value is the only fatal
//! per-key condition.
//!
//! The project name is resolved in a dedicated prerequisite pass, since
//! the project-prefixed lookups cannot run without it.

use std::collections::BTreeMap;

use deckhand_core::naming;
use tracing::{info, trace, warn};

use crate::environ::Environ;
use crate::error::{ConfigError, ConfigResult, ValueSource};
use crate::providers::{CiMapper, MapSource};
use crate::value::Value;
use crate::variables::{self, VariableDef};

/// The resolved configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    values: BTreeMap<&'static str, Value>,
    project_name: String,
    project_name_safe: String,
    ci: Option<CiMapper>,
}

impl Settings {
    /// Resolve settings from an environment snapshot.
    pub fn resolve(env: &Environ) -> ConfigResult<Self> {
        Self::resolve_seeded(env, BTreeMap::new())
    }

    /// Resolve settings with pre-seeded values. A seeded value ranks
    /// above the static default but below every environment-backed
    /// source, so seeding never shadows anything the environment or the
    /// CI provider established.
    pub fn resolve_seeded(
        env: &Environ,
        mut seed: BTreeMap<&'static str, Value>,
    ) -> ConfigResult<Self> {
        let ci = CiMapper::detect(env);
        if let Some(mapper) = &ci {
            info!(provider = %mapper, "detected CI environment");
            warn_unmapped_targets(mapper);
        }

        let project_name = resolve_project_name(env, ci.as_ref())?;
        let project_name_safe = naming::env_var_safe_key(&project_name);
        seed.entry(variables::PROJECT_NAME)
            .or_insert_with(|| Value::Str(project_name.clone()));

        let mut values = BTreeMap::new();
        for def in variables::definitions() {
            let (value, source) =
                resolve_variable(def, env, &project_name_safe, ci.as_ref(), &seed)?;
            trace!(key = def.key, source = %source, "resolved setting");
            values.insert(def.key, value);
        }

        Ok(Self {
            values,
            project_name,
            project_name_safe,
            ci,
        })
    }

    pub fn project_name(&self) -> &str {
        &self.project_name
    }

    /// The project name as an environment-variable-safe slug, used as
    /// the prefix for project-scoped overrides.
    pub fn project_name_safe(&self) -> &str {
        &self.project_name_safe
    }

    pub fn active_ci(&self) -> Option<&CiMapper> {
        self.ci.as_ref()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Replace a resolved value. Rejects unknown keys and values of the
    /// wrong kind so the schema invariant holds after mutation.
    pub fn set(&mut self, key: &str, value: Value) -> bool {
        let Some(def) = variables::definition(key) else {
            return false;
        };
        if value.kind() != def.kind {
            return false;
        }
        self.values.insert(def.key, value);
        true
    }

    pub fn string(&self, key: &str) -> Option<&str> {
        match self.get(key)? {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn boolean(&self, key: &str) -> Option<bool> {
        match self.get(key)? {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn integer(&self, key: &str) -> Option<i64> {
        match self.get(key)? {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn list(&self, key: &str) -> Option<&[String]> {
        match self.get(key)? {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &Value)> {
        self.values.iter().map(|(key, value)| (*key, value))
    }

    pub fn default_track(&self) -> &str {
        self.string(variables::DEFAULT_TRACK).unwrap_or("stable")
    }

    /// Deployment name for a track; the default track deploys under the
    /// bare project name.
    pub fn deploy_name(&self, track: &str) -> String {
        naming::deploy_name(&self.project_name, track, self.default_track())
    }

    /// Name of the Kubernetes secret for a track's deployment.
    pub fn secret_name(&self, track: &str) -> String {
        naming::secret_name(&self.project_name, track, self.default_track())
    }

    /// Docker build args gathered from `DOCKER_BUILD_ARG_`-prefixed
    /// variables, prefix stripped.
    pub fn build_args(&self, env: &Environ) -> BTreeMap<String, String> {
        let prefix = self
            .string(variables::DOCKER_BUILD_ARG_PREFIX)
            .unwrap_or("DOCKER_BUILD_ARG_");
        naming::vars_by_prefix(env.iter(), prefix)
    }

    /// Kubernetes secret payload gathered from `K8S_SECRET_`-prefixed
    /// variables, prefix stripped.
    pub fn k8s_secrets(&self, env: &Environ) -> BTreeMap<String, String> {
        let prefix = self
            .string(variables::K8S_SECRET_PREFIX)
            .unwrap_or("K8S_SECRET_");
        naming::vars_by_prefix(env.iter(), prefix)
    }

    /// JSON rendering of the full configuration.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "project_name": self.project_name,
            "project_name_safe": self.project_name_safe,
            "active_ci": self.ci.as_ref().map(|mapper| mapper.to_string()),
            "values": self.values,
        })
    }
}

fn resolve_project_name(env: &Environ, ci: Option<&CiMapper>) -> ConfigResult<String> {
    if let Some(name) = env.get_nonempty(variables::PROJECT_NAME) {
        return Ok(name.to_string());
    }

    if let Some(mapper) = ci {
        for entry in mapper
            .mapping()
            .iter()
            .filter(|entry| entry.target == variables::PROJECT_NAME)
        {
            if let MapSource::FromEnvironment(key) = entry.source {
                if let Some(name) = env.get_nonempty(key) {
                    return Ok(name.to_string());
                }
            }
        }
    }

    Err(ConfigError::ProjectNameUnresolved)
}

fn resolve_variable(
    def: &'static VariableDef,
    env: &Environ,
    safe_name: &str,
    ci: Option<&CiMapper>,
    seed: &BTreeMap<&'static str, Value>,
) -> ConfigResult<(Value, ValueSource)> {
    if let Some(raw) = env.get(def.key) {
        return parse_with_context(def, ValueSource::Environment, raw);
    }

    let prefixed = format!("{}_{}", safe_name, def.key);
    if let Some(raw) = env.get(&prefixed) {
        return parse_with_context(def, ValueSource::ProjectPrefixed, raw);
    }

    if let Some(mapper) = ci {
        if let Some(value) = ci_candidate(def, mapper, env)? {
            return Ok((value, ValueSource::CiMapper));
        }
    }

    if let Some(value) = seed.get(def.key) {
        return Ok((value.clone(), ValueSource::Seed));
    }

    Ok((def.default.clone(), ValueSource::Default))
}

/// Read the mapped provider value for a canonical key, if the active
/// mapper has one and it is present. Derived accessors with absent
/// prerequisites yield `None` so lower-precedence sources get a turn.
fn ci_candidate(
    def: &'static VariableDef,
    mapper: &CiMapper,
    env: &Environ,
) -> ConfigResult<Option<Value>> {
    for entry in mapper
        .mapping()
        .iter()
        .filter(|entry| entry.target == def.key)
    {
        let raw = match entry.source {
            MapSource::FromEnvironment(key) => env.get(key).map(str::to_string),
            MapSource::Derived(field) => mapper.derived(field, env),
        };
        if let Some(raw) = raw {
            let (value, _) = parse_with_context(def, ValueSource::CiMapper, &raw)?;
            return Ok(Some(value));
        }
    }
    Ok(None)
}

fn parse_with_context(
    def: &'static VariableDef,
    source: ValueSource,
    raw: &str,
) -> ConfigResult<(Value, ValueSource)> {
    match def.kind.parse(raw) {
        Ok(value) => Ok((value, source)),
        Err(reason) => Err(ConfigError::ValueParse {
            key: def.key.to_string(),
            source_kind: source,
            raw: raw.to_string(),
            reason,
        }),
    }
}

fn warn_unmapped_targets(mapper: &CiMapper) {
    for entry in mapper.mapping() {
        if variables::definition(entry.target).is_none() {
            warn!(
                provider = %mapper,
                target = entry.target,
                "CI variable mapping skipped, no such setting"
            );
        }
    }
}
