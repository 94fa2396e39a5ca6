use crate::constants::{CONFIG_EXCLUDED_PATHS, DEFAULT_EXCLUDED_PATHS};
use crate::{PluginError, Result};
use std::collections::{BTreeMap, HashMap};
use tracing::warn;

/// Typed view of the host-provided configuration map.
///
/// Recognized keys:
///
/// - `excluded_paths`: comma-separated path prefixes that bypass header injection.
///   Every non-empty entry must start with `/`. When the key is absent the defaults
///   (`/health`, `/docs`) apply; an empty value disables exclusions entirely.
///
/// Every other key is kept in [`PluginSettings::ignored`] and has no effect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginSettings {
    pub excluded_paths: Vec<String>,
    pub ignored: BTreeMap<String, String>,
}

impl Default for PluginSettings {
    fn default() -> Self {
        Self {
            excluded_paths: DEFAULT_EXCLUDED_PATHS
                .iter()
                .map(|p| p.to_string())
                .collect(),
            ignored: BTreeMap::new(),
        }
    }
}

impl PluginSettings {
    /// Parses a configuration map. Either the whole map is accepted or an error is
    /// returned; there is no partial result.
    pub fn from_map(values: &HashMap<String, String>) -> Result<Self> {
        let mut settings = Self::default();

        for (key, value) in values {
            if key.is_empty() || key.chars().any(char::is_whitespace) {
                return Err(PluginError::Configuration(format!(
                    "invalid configuration key {key:?}"
                )));
            }

            match key.as_str() {
                CONFIG_EXCLUDED_PATHS => settings.excluded_paths = parse_prefixes(value)?,
                _ => {
                    settings.ignored.insert(key.clone(), value.clone());
                }
            }
        }

        for key in settings.ignored.keys() {
            warn!("Ignoring unrecognized configuration key: {}", key);
        }

        Ok(settings)
    }

    /// Returns true when `path` starts with any excluded prefix.
    pub fn is_excluded(&self, path: &str) -> bool {
        self.excluded_paths
            .iter()
            .any(|prefix| path.starts_with(prefix.as_str()))
    }
}

fn parse_prefixes(value: &str) -> Result<Vec<String>> {
    value
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|p| {
            if p.starts_with('/') {
                Ok(p.to_string())
            } else {
                Err(PluginError::Configuration(format!(
                    "{CONFIG_EXCLUDED_PATHS}: prefix {p:?} must start with '/'"
                )))
            }
        })
        .collect()
}
