//! Namespace bindings consulted by placeholder substitution.
//!
//! Three independent scopes exist: `conf` (from `--hiveconf`), `var`
//! (from `--hivevar`) and `env` (a snapshot of the process environment).
//! Bindings are built once per run and never change afterwards.

use std::collections::HashMap;
use std::ffi::OsString;
use std::fmt;

use crate::error::{HiveError, HiveResult};

/// One of the three placeholder namespaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    Conf,
    Var,
    Env,
}

impl Namespace {
    /// The literal token used inside `${...}`.
    pub fn token(self) -> &'static str {
        match self {
            Namespace::Conf => "conf",
            Namespace::Var => "var",
            Namespace::Env => "env",
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Immutable key/value scopes for a single run.
#[derive(Debug, Clone, Default)]
pub struct Bindings {
    conf: HashMap<String, String>,
    var: HashMap<String, String>,
    env: HashMap<String, String>,
}

impl Bindings {
    /// Empty bindings in every namespace.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build bindings from raw `key=value` flag values plus an environment snapshot.
    pub fn from_flags<C, V, E>(hiveconf: C, hivevar: V, env: E) -> HiveResult<Self>
    where
        C: IntoIterator,
        C::Item: AsRef<str>,
        V: IntoIterator,
        V::Item: AsRef<str>,
        E: IntoIterator<Item = (String, String)>,
    {
        let mut bindings = Self::new();
        for kv in hiveconf {
            let (k, v) = parse_kv("--hiveconf", kv.as_ref())?;
            bindings.conf.insert(k, v);
        }
        for kv in hivevar {
            let (k, v) = parse_kv("--hivevar", kv.as_ref())?;
            bindings.var.insert(k, v);
        }
        bindings.env = env.into_iter().collect();
        Ok(bindings)
    }

    /// Snapshot the current process environment into the `env` namespace.
    pub fn capture_env(mut self) -> Self {
        self.env = env_snapshot().collect();
        self
    }

    /// Bind `key` to `value` in `ns`, replacing any previous value.
    pub fn with(mut self, ns: Namespace, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.scope_mut(ns).insert(key.into(), value.into());
        self
    }

    /// Look up `key` in exactly one namespace. No fallback across scopes.
    pub fn get(&self, ns: Namespace, key: &str) -> Option<&str> {
        self.scope(ns).get(key).map(String::as_str)
    }

    /// Number of bindings held in `ns`.
    pub fn len(&self, ns: Namespace) -> usize {
        self.scope(ns).len()
    }

    fn scope(&self, ns: Namespace) -> &HashMap<String, String> {
        match ns {
            Namespace::Conf => &self.conf,
            Namespace::Var => &self.var,
            Namespace::Env => &self.env,
        }
    }

    fn scope_mut(&mut self, ns: Namespace) -> &mut HashMap<String, String> {
        match ns {
            Namespace::Conf => &mut self.conf,
            Namespace::Var => &mut self.var,
            Namespace::Env => &mut self.env,
        }
    }
}

/// The process environment, skipping entries that are not valid UTF-8.
pub fn env_snapshot() -> impl Iterator<Item = (String, String)> {
    utf8_pairs(std::env::vars_os())
}

fn utf8_pairs<I>(vars: I) -> impl Iterator<Item = (String, String)>
where
    I: IntoIterator<Item = (OsString, OsString)>,
{
    vars.into_iter()
        .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
}

/// Split `key=value` at the first `=`, trimming both sides.
fn parse_kv(flag: &'static str, input: &str) -> HiveResult<(String, String)> {
    match input.split_once('=') {
        Some((k, v)) if !k.trim().is_empty() => Ok((k.trim().to_string(), v.trim().to_string())),
        _ => Err(HiveError::InvalidBinding {
            flag,
            input: input.to_string(),
        }),
    }
}
