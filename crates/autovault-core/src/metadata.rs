//! Source metadata parsing
//!
//! A metadata document describes one source table: where it lands in the
//! warehouse, and which hubs, satellites and payload columns it feeds.
//! Mappings keep the order they were written in, since generated hash keys,
//! hash diffs and link names all follow document order.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Column data type as written in the document
///
/// Generation only ever reads column names, so any JSON value is accepted here
/// (`"STRING"`, `null`, or an object describing the type).
pub type DataType = serde_json::Value;

/// A single payload column, as a one-entry `column -> data type` mapping
pub type Attribute = IndexMap<String, DataType>;

/// Parsed metadata document (schema-validated, field presence checked on access)
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MetadataDocument {
    /// Warehouse database the source is loaded into
    #[serde(default)]
    pub target_database: Option<String>,

    /// Warehouse schema the source is loaded into
    #[serde(default)]
    pub target_schema: Option<String>,

    /// Source table name (without version)
    #[serde(default)]
    pub source_name: Option<String>,

    /// Source version marker
    #[serde(default)]
    pub version: Option<SourceVersion>,

    /// Unit of work token, used in link names
    #[serde(default)]
    pub unit_of_work: Option<String>,

    /// Hub name -> topic, in document order
    #[serde(default)]
    pub business_topics: Option<IndexMap<String, Topic>>,
}

/// Source version marker
///
/// Written either as a label (`"V1"`) or a bare number (`1`, rendered `V1`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SourceVersion {
    Number(u64),
    Label(String),
}

impl std::fmt::Display for SourceVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "V{}", n),
            Self::Label(label) => write!(f, "{}", label),
        }
    }
}

/// A business topic: the hub's business keys and the satellites it owns
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Topic {
    /// Business key column -> data type
    #[serde(default)]
    pub business_keys: IndexMap<String, DataType>,

    /// Satellites hanging off this hub
    #[serde(default)]
    pub business_attributes: Vec<Satellite>,

    /// Replacement name for the hub's business key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
}

/// A satellite: a named group of descriptive payload columns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Satellite {
    /// Satellite name
    pub business_definition: String,

    /// Payload column -> data type
    #[serde(default)]
    pub payload: IndexMap<String, DataType>,
}

impl Satellite {
    /// Payload flattened into one single-entry mapping per column
    pub fn attributes(&self) -> impl Iterator<Item = Attribute> + '_ {
        self.payload.iter().map(|(column, data_type)| {
            let mut attribute = Attribute::with_capacity(1);
            attribute.insert(column.clone(), data_type.clone());
            attribute
        })
    }
}

/// Read-only view over one source metadata document
#[derive(Debug, Clone, PartialEq)]
pub struct Metadata {
    document: MetadataDocument,
}

impl Metadata {
    /// Wrap an already parsed document
    pub fn new(document: MetadataDocument) -> Self {
        Self { document }
    }

    /// Parse from a JSON value
    pub fn from_value(value: serde_json::Value) -> Result<Self, MetadataError> {
        let document = serde_json::from_value(value)
            .map_err(|e| MetadataError::ParseError(e.to_string()))?;
        Ok(Self::new(document))
    }

    /// Parse from a JSON string
    pub fn from_json_str(json: &str) -> Result<Self, MetadataError> {
        let document = serde_json::from_str(json)
            .map_err(|e| MetadataError::ParseError(e.to_string()))?;
        Ok(Self::new(document))
    }

    /// Load from a metadata file
    pub fn from_file(path: &Path) -> Result<Self, MetadataError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| MetadataError::IoError(path.display().to_string(), e.to_string()))?;

        Self::from_json_str(&contents)
    }

    fn required<'a, T>(value: &'a Option<T>, field: &str) -> Result<&'a T, MetadataError> {
        value.as_ref().ok_or_else(|| MetadataError::MissingField {
            field: field.to_string(),
        })
    }

    pub fn get_target_database(&self) -> Result<&str, MetadataError> {
        Self::required(&self.document.target_database, "target_database").map(String::as_str)
    }

    pub fn get_target_schema(&self) -> Result<&str, MetadataError> {
        Self::required(&self.document.target_schema, "target_schema").map(String::as_str)
    }

    pub fn get_unit_of_work(&self) -> Result<&str, MetadataError> {
        Self::required(&self.document.unit_of_work, "unit_of_work").map(String::as_str)
    }

    /// Source name and version joined into one token (e.g. `TEST_V1`)
    pub fn get_versioned_source_name(&self) -> Result<String, MetadataError> {
        let source_name = Self::required(&self.document.source_name, "source_name")?;
        let version = Self::required(&self.document.version, "version")?;

        Ok(format!("{}_{}", source_name, version))
    }

    /// `<database>_<schema>`, the source model key used by the staging model
    pub fn get_source_model_name(&self) -> Result<String, MetadataError> {
        Ok(format!(
            "{}_{}",
            self.get_target_database()?,
            self.get_target_schema()?
        ))
    }

    /// All topics keyed by hub name, in document order
    pub fn get_business_topics(&self) -> Result<&IndexMap<String, Topic>, MetadataError> {
        Self::required(&self.document.business_topics, "business_topics")
    }

    /// Topic for a single hub
    pub fn get_topic(&self, hub: &str) -> Result<&Topic, MetadataError> {
        self.get_business_topics()?
            .get(hub)
            .ok_or_else(|| MetadataError::UnknownHub {
                hub: hub.to_string(),
            })
    }

    pub fn get_hubs_from_business_topics(&self) -> Result<Vec<&str>, MetadataError> {
        Ok(self.get_business_topics()?.keys().map(String::as_str).collect())
    }

    /// First business key column of a hub
    pub fn get_hub_business_key(&self, hub: &str) -> Result<&str, MetadataError> {
        self.get_topic(hub)?
            .business_keys
            .keys()
            .next()
            .map(String::as_str)
            .ok_or_else(|| MetadataError::MissingField {
                field: format!("business_topics.{}.business_keys", hub),
            })
    }

    /// Satellite names owned by a hub, in order
    pub fn get_sat_from_hub(&self, hub: &str) -> Result<Vec<&str>, MetadataError> {
        Ok(self
            .get_topic(hub)?
            .business_attributes
            .iter()
            .map(|sat| sat.business_definition.as_str())
            .collect())
    }

    pub fn get_sats_from_source(&self) -> Result<IndexMap<&str, Vec<&str>>, MetadataError> {
        let mut sats = IndexMap::new();
        for hub in self.get_hubs_from_business_topics()? {
            sats.insert(hub, self.get_sat_from_hub(hub)?);
        }
        Ok(sats)
    }

    pub fn get_source_business_topics(&self) -> Result<Vec<&Topic>, MetadataError> {
        Ok(self.get_business_topics()?.values().collect())
    }

    /// Every satellite across all hubs, hub-major then satellite order
    pub fn flatten_business_attributes(&self) -> Result<Vec<&Satellite>, MetadataError> {
        Ok(self
            .get_business_topics()?
            .values()
            .flat_map(|topic| topic.business_attributes.iter())
            .collect())
    }

    /// Every payload column of every satellite
    pub fn get_source_attributes(&self) -> Result<Vec<Attribute>, MetadataError> {
        Ok(self
            .flatten_business_attributes()?
            .into_iter()
            .flat_map(Satellite::attributes)
            .collect())
    }

    /// Payload columns of the satellite(s) with the given name
    pub fn get_attributes(&self, satellite: &str) -> Result<Vec<Attribute>, MetadataError> {
        Ok(self
            .flatten_business_attributes()?
            .into_iter()
            .filter(|sat| sat.business_definition == satellite)
            .flat_map(Satellite::attributes)
            .collect())
    }

    pub fn get_business_keys(&self) -> Result<IndexMap<&str, &IndexMap<String, DataType>>, MetadataError> {
        Ok(self
            .get_business_topics()?
            .iter()
            .map(|(hub, topic)| (hub.as_str(), &topic.business_keys))
            .collect())
    }

    /// Check every field staging generation depends on
    pub fn validate(&self) -> Result<(), MetadataError> {
        self.get_target_database()?;
        self.get_target_schema()?;
        self.get_versioned_source_name()?;
        self.get_unit_of_work()?;

        for hub in self.get_hubs_from_business_topics()? {
            self.get_hub_business_key(hub)?;
        }

        Ok(())
    }
}

/// Metadata errors
#[derive(Debug, thiserror::Error)]
pub enum MetadataError {
    #[error("Required metadata field '{field}' is missing")]
    MissingField { field: String },

    #[error("Hub '{hub}' is not defined in business_topics")]
    UnknownHub { hub: String },

    #[error("Hub '{hub}' missing from name dictionary, check hub name convention and existence in file {dictionary}")]
    MissingDictionaryEntry { hub: String, dictionary: String },

    #[error("Failed to read {0}: {1}")]
    IoError(String, String),

    #[error("Failed to parse metadata JSON: {0}")]
    ParseError(String),
}
