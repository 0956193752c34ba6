//! Staging model generation for the raw vault
//!
//! This crate handles:
//! - Parsing the closed-slot SQL templates
//! - Building hub hash key, hash diff, link and alias substitutions
//! - Rendering and writing one staging model per source metadata file
//! - Discovering metadata files on disk

pub mod error;
pub mod template;
pub mod substitutions;
pub mod sources;
pub mod generator;

pub use error::StagingError;
pub use template::{Substitutions, Template, TemplateError, TemplateKind};
pub use sources::{find_metadata_files, FileSystemSources, StagingSources};
pub use generator::{BatchReport, FileFailure, RenderedStagingFile, StagingGenerator, staging_file_name};
