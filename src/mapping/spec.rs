//! Parsed mapping specifications
//!
//! A `MappingSpec` is built once from a mapping string and reused across
//! extraction runs. It pairs every source column with its target path and
//! records the level table shared by all paths.

use crate::error::MappingError;
use crate::nest::types::NestConfig;
use std::str::FromStr;

/// One `column [AS target.path]` entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingEntry {
    column: String,
    path: Vec<String>,
}

impl MappingEntry {
    pub(crate) fn new(column: &str, path: Vec<String>) -> Self {
        MappingEntry {
            column: column.to_uppercase(),
            path,
        }
    }

    /// Source column, uppercased
    pub fn column(&self) -> &str {
        &self.column
    }

    /// Full target path, level segments first and the field name last
    pub fn path(&self) -> &[String] {
        &self.path
    }

    /// Number of level lists crossed before reaching the field
    pub fn depth(&self) -> usize {
        self.path.len() - 1
    }

    /// Field name written at the end of the path
    pub fn leaf(&self) -> &str {
        &self.path[self.path.len() - 1]
    }
}

/// A parsed mapping: entries in declaration order plus the level table
#[derive(Debug, Clone)]
pub struct MappingSpec {
    pub(crate) entries: Vec<MappingEntry>,
    pub(crate) levels: Vec<String>,
    pub(crate) config: NestConfig,
}

impl MappingSpec {
    /// Parse a mapping string with the default configuration
    ///
    /// # Example
    /// ```rust
    /// use foundry::MappingSpec;
    ///
    /// let spec = MappingSpec::parse("cowGroupId, cowId AS cows.cowId").unwrap();
    /// assert_eq!(spec.levels(), ["cows"]);
    /// assert_eq!(spec.entries()[1].column(), "COWID");
    /// ```
    pub fn parse(spec: &str) -> Result<Self, MappingError> {
        Self::parse_with(spec, NestConfig::default())
    }

    /// Parse a mapping string with a custom configuration
    pub fn parse_with(spec: &str, config: NestConfig) -> Result<Self, MappingError> {
        super::parser::parse(spec, config)
    }

    pub fn entries(&self) -> &[MappingEntry] {
        &self.entries
    }

    /// Level names indexed by depth
    pub fn levels(&self) -> &[String] {
        &self.levels
    }

    pub fn config(&self) -> &NestConfig {
        &self.config
    }

    /// Entries whose field lives directly on records at `depth`
    pub fn entries_at(&self, depth: usize) -> impl Iterator<Item = &MappingEntry> {
        self.entries.iter().filter(move |e| e.depth() == depth)
    }
}

impl FromStr for MappingSpec {
    type Err = MappingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MappingSpec::parse(s)
    }
}
