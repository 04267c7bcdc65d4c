//! Configuration for hydration and dehydration
//!
//! A [`MapperConfig`] selects how strictly the mapper treats data that does
//! not line up with the schema. It is plain serde data and is usually read
//! from a TOML file:
//!
//! ```toml
//! dangling_foreign_keys = "drop"
//! cell_rewrites = "allow_equal"
//! validate_schema = true
//! ```

pub mod error;

pub use error::{ConfigError, ConfigResult};

use serde::{Deserialize, Serialize};
use std::path::Path;

/// What hydration does with a table row whose foreign key matches no parent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DanglingKeyPolicy {
    /// Fail the whole call with a join error
    #[default]
    Reject,
    /// Skip the row and log a warning
    Drop,
}

/// What dehydration does when a cell that already holds a value is written
///
/// Two scalar leaves write the same cell when a nested scalar reads a
/// variable bound further up, such as a dict key that is also a member of
/// its value. Under the default `Reject` such schemas fail with
/// `DoubleWrite` on every dehydration, so a store to tree to store round trip
/// through them needs `AllowEqual`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CellRewritePolicy {
    /// Every second write is a cell error
    #[default]
    Reject,
    /// A second write of an equal value is accepted
    AllowEqual,
}

/// Mapper configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapperConfig {
    /// Handling of table rows that reference a missing parent
    pub dangling_foreign_keys: DanglingKeyPolicy,
    /// Handling of repeated writes to one cell
    pub cell_rewrites: CellRewritePolicy,
    /// Validate the schema's bindings before every call
    pub validate_schema: bool,
}

impl Default for MapperConfig {
    fn default() -> Self {
        Self {
            dangling_foreign_keys: DanglingKeyPolicy::Reject,
            cell_rewrites: CellRewritePolicy::Reject,
            validate_schema: true,
        }
    }
}

impl MapperConfig {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_dangling_foreign_keys(mut self, policy: DanglingKeyPolicy) -> Self {
        self.dangling_foreign_keys = policy;
        self
    }

    #[must_use]
    pub fn with_cell_rewrites(mut self, policy: CellRewritePolicy) -> Self {
        self.cell_rewrites = policy;
        self
    }

    #[must_use]
    pub fn with_schema_validation(mut self, enabled: bool) -> Self {
        self.validate_schema = enabled;
        self
    }

    /// Parse a configuration from TOML text. Missing keys take their defaults.
    pub fn from_toml_str(text: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Load a configuration file
    pub fn load<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::not_found(path.display().to_string()));
        }
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&text)?;
        log::debug!("Loaded mapper configuration from {}", path.display());
        Ok(config)
    }

    /// Save the configuration as TOML
    pub fn save<P: AsRef<Path>>(&self, path: P) -> ConfigResult<()> {
        let text = toml::to_string_pretty(self)?;
        std::fs::write(path, text)?;
        Ok(())
    }
}
