//! Destination table configuration
//!
//! Maps short asset names to their origin URLs. The table is loaded once at
//! construction, injected into the proxy, and read-only for the process
//! lifetime; there is no process-wide singleton.

use std::collections::BTreeMap;

use serde::Deserialize;
use url::Url;

use crate::Result;

/// Read-only mapping from asset names to origin URLs
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct Destinations {
    map: BTreeMap<String, Url>,
}

impl Destinations {
    /// Build a table from an existing map
    pub fn new(map: BTreeMap<String, Url>) -> Self {
        Self { map }
    }

    /// Parse a table from a JSON object of `name -> url` pairs
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Look up the origin URL for an asset name
    pub fn resolve(&self, name: &str) -> Option<&Url> {
        self.map.get(name)
    }

    /// All known asset names, in stable order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.map.keys().map(String::as_str)
    }

    /// All `(name, url)` pairs, in stable order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Url)> {
        self.map.iter().map(|(name, url)| (name.as_str(), url))
    }

    /// Number of configured assets
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Whether the table is empty
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl FromIterator<(String, Url)> for Destinations {
    fn from_iter<I: IntoIterator<Item = (String, Url)>>(iter: I) -> Self {
        Self {
            map: iter.into_iter().collect(),
        }
    }
}
