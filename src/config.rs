//! Configuration for regridder construction

use crate::error::{RegridError, Result};
use crate::regrid::types::{MissingValuePolicy, RegridMethod};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration for building a [`crate::regrid::Regridder`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegridConfig {
    /// Reduction method
    #[serde(default = "default_method")]
    pub method: RegridMethod,

    /// Missing-value policy applied during `regrid`
    #[serde(default)]
    pub missing: MissingValuePolicy,
}

fn default_method() -> RegridMethod {
    RegridMethod::Mean
}

impl Default for RegridConfig {
    fn default() -> Self {
        Self {
            method: RegridMethod::Mean,
            missing: MissingValuePolicy::Skip,
        }
    }
}

impl RegridConfig {
    /// Create a configuration from a method and policy
    pub fn new(method: RegridMethod, missing: MissingValuePolicy) -> Self {
        Self { method, missing }
    }

    /// Parse a configuration from method and policy names
    ///
    /// Accepts the same spellings as the `FromStr` impls, e.g.
    /// `("area_weighted_average", "propagate")`.
    pub fn parse(method: &str, missing: &str) -> Result<Self> {
        Ok(Self {
            method: method.parse()?,
            missing: missing.parse()?,
        })
    }

    /// Load configuration from a JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            RegridError::Config(format!("Failed to read config file: {}", e))
        })?;

        serde_json::from_str(&content).map_err(|e| {
            RegridError::Config(format!("Failed to parse config file: {}", e))
        })
    }

    /// Save configuration to a JSON file
    pub fn to_file(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self).map_err(|e| {
            RegridError::Config(format!("Failed to serialize config: {}", e))
        })?;

        std::fs::write(path, content).map_err(|e| {
            RegridError::Config(format!("Failed to write config file: {}", e))
        })?;

        Ok(())
    }
}
