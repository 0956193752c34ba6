//! AutoVault Core
//!
//! Typed model of the JSON source metadata that drives staging generation,
//! the hub name dictionary, and the generator configuration (autovault.toml).

pub mod metadata;
pub mod dictionary;
pub mod config;

pub use metadata::{Attribute, DataType, Metadata, MetadataDocument, MetadataError, Satellite, SourceVersion, Topic};
pub use dictionary::NameDictionary;
pub use config::{ConfigError, GeneratorConfig};
