//! Typed setting values and their parsers.
//!
//! Every recognized setting declares a [`ValueKind`]; raw environment
//! strings go through the kind's parser exactly once, whichever source
//! supplied them. A raw value that is present but unparsable is the one
//! failure that must surface loudly — the caller wraps the reason
//! returned here with the key and source that produced it.

use std::sync::LazyLock;

use deckhand_core::BasicAuthUser;
use regex::Regex;
use serde::Serialize;

static BASIC_AUTH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^:\s]+:[^:\s]+").expect("valid regex"));

/// A resolved setting value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Str(String),
    Bool(bool),
    Int(i64),
    List(Vec<String>),
    BasicAuth(Vec<BasicAuthUser>),
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Str(_) => ValueKind::Str,
            Value::Bool(_) => ValueKind::Bool,
            Value::Int(_) => ValueKind::Int,
            Value::List(_) => ValueKind::List,
            Value::BasicAuth(_) => ValueKind::BasicAuth,
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Str(s) => write!(f, "{}", s),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::List(items) => write!(f, "{}", items.join(",")),
            Value::BasicAuth(users) => {
                let masked: Vec<String> = users.iter().map(|u| u.to_string()).collect();
                write!(f, "{}", masked.join(" "))
            }
        }
    }
}

/// The parser half of a variable definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Str,
    Bool,
    Int,
    List,
    BasicAuth,
}

impl ValueKind {
    /// Parse a raw string into a value of this kind.
    ///
    /// - `Str` takes the raw value verbatim; empty is a valid string.
    /// - `Bool` accepts `true/false`, `1/0`, `yes/no`, `y/n`, `on/off`
    ///   in any case; everything else fails.
    /// - `List` splits on commas, trims items, and drops empty items,
    ///   so an empty raw value is the empty list.
    /// - `BasicAuth` scans for whitespace-separated `user:password`
    ///   credentials and skips malformed fragments.
    pub fn parse(self, raw: &str) -> Result<Value, String> {
        match self {
            ValueKind::Str => Ok(Value::Str(raw.to_string())),
            ValueKind::Bool => match raw.to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" | "y" | "on" => Ok(Value::Bool(true)),
                "false" | "0" | "no" | "n" | "off" => Ok(Value::Bool(false)),
                _ => Err(format!("{:?} is not a boolean", raw)),
            },
            ValueKind::Int => raw
                .trim()
                .parse::<i64>()
                .map(Value::Int)
                .map_err(|_| format!("{:?} is not an integer", raw)),
            ValueKind::List => Ok(Value::List(
                raw.split(',')
                    .map(str::trim)
                    .filter(|item| !item.is_empty())
                    .map(String::from)
                    .collect(),
            )),
            ValueKind::BasicAuth => Ok(Value::BasicAuth(
                BASIC_AUTH
                    .find_iter(raw)
                    .filter_map(|m| BasicAuthUser::from_colon_string(m.as_str()))
                    .collect(),
            )),
        }
    }
}

impl std::fmt::Display for ValueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValueKind::Str => write!(f, "string"),
            ValueKind::Bool => write!(f, "boolean"),
            ValueKind::Int => write!(f, "integer"),
            ValueKind::List => write!(f, "list"),
            ValueKind::BasicAuth => write!(f, "basic-auth list"),
        }
    }
}
