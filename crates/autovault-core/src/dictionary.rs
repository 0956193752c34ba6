//! Hub name dictionary (name_dictionary.json)
//!
//! Maps hub names to the short tokens that composite link names are built from.

use indexmap::IndexMap;
use std::path::Path;
use crate::metadata::MetadataError;

/// Hub name -> abbreviation, remembering where it was loaded from
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NameDictionary {
    /// Where the dictionary came from (reported in lookup errors)
    source: String,

    entries: IndexMap<String, String>,
}

impl NameDictionary {
    pub fn new(source: impl Into<String>, entries: IndexMap<String, String>) -> Self {
        Self {
            source: source.into(),
            entries,
        }
    }

    /// Load dictionary from file
    pub fn from_file(path: &Path) -> Result<Self, MetadataError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| MetadataError::IoError(path.display().to_string(), e.to_string()))?;

        Self::from_json_str(path.display().to_string(), &contents)
    }

    /// Parse dictionary from a JSON string
    pub fn from_json_str(source: impl Into<String>, json: &str) -> Result<Self, MetadataError> {
        let entries = serde_json::from_str(json)
            .map_err(|e| MetadataError::ParseError(e.to_string()))?;

        Ok(Self::new(source, entries))
    }

    /// Build from an already parsed JSON value
    pub fn from_value(source: impl Into<String>, value: serde_json::Value) -> Result<Self, MetadataError> {
        let entries = serde_json::from_value(value)
            .map_err(|e| MetadataError::ParseError(e.to_string()))?;

        Ok(Self::new(source, entries))
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Abbreviation for a hub
    pub fn abbreviation(&self, hub: &str) -> Result<&str, MetadataError> {
        self.entries
            .get(hub)
            .map(String::as_str)
            .ok_or_else(|| MetadataError::MissingDictionaryEntry {
                hub: hub.to_string(),
                dictionary: self.source.clone(),
            })
    }
}
