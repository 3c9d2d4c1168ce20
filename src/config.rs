//! Database map configuration.
//!
//! Maps Hive database names to storage locations. The file is TOML by
//! default; `.yaml`/`.yml` files are read as YAML:
//!
//! ```toml
//! default = "sales"
//!
//! [databases]
//! sales = "data/sales.db"
//! scratch = ":memory:"
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::error::{HiveError, HiveResult};

/// Location value meaning "an in-memory database".
pub const MEMORY: &str = ":memory:";

/// Hive database name -> storage location, plus an optional default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct DatabaseMap {
    #[serde(default)]
    pub databases: BTreeMap<String, String>,
    #[serde(default)]
    pub default: Option<String>,
}

impl DatabaseMap {
    /// Build a map from `(name, location)` pairs with no default.
    pub fn from_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            databases: entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            default: None,
        }
    }

    /// Load and validate a map file, resolving locations against its directory.
    pub fn load(path: impl AsRef<Path>) -> HiveResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            HiveError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;

        let mut map = match path.extension().and_then(|e| e.to_str()) {
            Some("yaml" | "yml") => Self::from_yaml(&content)?,
            _ => Self::from_toml(&content)?,
        };

        let base = path.parent().unwrap_or_else(|| Path::new(""));
        for location in map.databases.values_mut() {
            *location = resolve_location(base, location);
        }
        map.default = map.default.filter(|name| !name.is_empty());
        map.validate()?;

        debug!(
            path = %path.display(),
            databases = map.databases.len(),
            default = ?map.default,
            "loaded database map"
        );
        Ok(map)
    }

    /// Parse TOML text without touching the filesystem.
    pub fn from_toml(content: &str) -> HiveResult<Self> {
        toml::from_str(content)
            .map_err(|e| HiveError::Config(format!("failed to parse database map: {}", e)))
    }

    /// Parse YAML text without touching the filesystem.
    pub fn from_yaml(content: &str) -> HiveResult<Self> {
        serde_yaml::from_str(content)
            .map_err(|e| HiveError::Config(format!("failed to parse database map: {}", e)))
    }

    /// True if `name` is mapped.
    pub fn contains(&self, name: &str) -> bool {
        self.databases.contains_key(name)
    }

    /// Location mapped to `name`.
    pub fn location(&self, name: &str) -> Option<&str> {
        self.databases.get(name).map(String::as_str)
    }

    /// All mapped names, sorted.
    pub fn names(&self) -> Vec<String> {
        self.databases.keys().cloned().collect()
    }

    fn validate(&self) -> HiveResult<()> {
        match &self.default {
            Some(name) if !self.contains(name) => Err(HiveError::Config(format!(
                "default database '{}' is not listed under [databases]",
                name
            ))),
            _ => Ok(()),
        }
    }
}

/// Resolve a configured location relative to the config file directory.
fn resolve_location(base: &Path, location: &str) -> String {
    if location == MEMORY {
        return location.to_string();
    }
    let expanded: PathBuf = match location.strip_prefix("~/") {
        Some(rest) => match dirs::home_dir() {
            Some(home) => home.join(rest),
            None => PathBuf::from(location),
        },
        None => PathBuf::from(location),
    };
    if expanded.is_absolute() {
        expanded.to_string_lossy().into_owned()
    } else {
        base.join(expanded).to_string_lossy().into_owned()
    }
}
