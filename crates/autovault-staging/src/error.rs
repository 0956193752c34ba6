//! Staging generation errors

use autovault_core::MetadataError;
use crate::template::TemplateError;

/// Error raised while generating a staging model
#[derive(Debug, thiserror::Error)]
pub enum StagingError {
    #[error(transparent)]
    Metadata(#[from] MetadataError),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error("Failed to read {path}: {message}")]
    ReadError { path: String, message: String },

    #[error("Failed to write {path}: {message}")]
    WriteError { path: String, message: String },

    #[error("Failed to parse {path}: {message}")]
    ParseError { path: String, message: String },

    #[error("{path}: {source}")]
    InFile {
        path: String,
        #[source]
        source: Box<StagingError>,
    },
}

impl StagingError {
    /// Attach the metadata file being processed
    pub fn in_file(self, path: &std::path::Path) -> Self {
        StagingError::InFile {
            path: path.display().to_string(),
            source: Box::new(self),
        }
    }
}
