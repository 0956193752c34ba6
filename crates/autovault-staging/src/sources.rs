//! Loading templates, metadata and the name dictionary
//!
//! The generator reads everything through [`StagingSources`] so tests (and
//! embedders) can serve inputs from memory instead of the file system.

use autovault_core::NameDictionary;
use crate::error::StagingError;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Where the generator gets its inputs from
pub trait StagingSources {
    /// Raw template text
    fn load_template(&self, path: &Path) -> Result<String, StagingError>;

    /// Parsed metadata document
    fn load_metadata(&self, path: &Path) -> Result<serde_json::Value, StagingError>;

    /// Hub name dictionary
    fn load_name_dictionary(&self, path: &Path) -> Result<NameDictionary, StagingError> {
        let value = self.load_metadata(path)?;
        Ok(NameDictionary::from_value(path.display().to_string(), value)?)
    }
}

/// Reads inputs from the local file system
#[derive(Debug, Clone, Copy, Default)]
pub struct FileSystemSources;

impl StagingSources for FileSystemSources {
    fn load_template(&self, path: &Path) -> Result<String, StagingError> {
        std::fs::read_to_string(path).map_err(|e| StagingError::ReadError {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    fn load_metadata(&self, path: &Path) -> Result<serde_json::Value, StagingError> {
        let contents = std::fs::read_to_string(path).map_err(|e| StagingError::ReadError {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        serde_json::from_str(&contents).map_err(|e| StagingError::ParseError {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }
}

/// Every `.json` file below `directory`, sorted by path
pub fn find_metadata_files(directory: &Path) -> Result<Vec<PathBuf>, StagingError> {
    if !directory.is_dir() {
        return Err(StagingError::ReadError {
            path: directory.display().to_string(),
            message: "not a directory".to_string(),
        });
    }

    let mut metadata_files = Vec::new();

    for entry in WalkDir::new(directory)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        if entry.file_type().is_file() {
            if let Some(ext) = entry.path().extension() {
                if ext == "json" {
                    metadata_files.push(entry.path().to_path_buf());
                }
            }
        }
    }

    metadata_files.sort();
    tracing::debug!(directory = %directory.display(), found = metadata_files.len(), "discovered metadata files");

    Ok(metadata_files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_nested_json_files_sorted() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("crm/nested")).unwrap();
        std::fs::write(dir.path().join("b.json"), "{}").unwrap();
        std::fs::write(dir.path().join("crm/a.json"), "{}").unwrap();
        std::fs::write(dir.path().join("crm/nested/c.json"), "{}").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let files = find_metadata_files(dir.path()).unwrap();
        let relative: Vec<_> = files
            .iter()
            .map(|f| f.strip_prefix(dir.path()).unwrap().to_path_buf())
            .collect();

        assert_eq!(
            relative,
            vec![
                PathBuf::from("b.json"),
                PathBuf::from("crm/a.json"),
                PathBuf::from("crm/nested/c.json"),
            ]
        );
    }

    #[test]
    fn missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let err = find_metadata_files(&dir.path().join("absent")).unwrap_err();
        assert!(matches!(err, StagingError::ReadError { .. }));
    }

    #[test]
    fn load_metadata_reports_parse_errors_with_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{not json").unwrap();

        let err = FileSystemSources.load_metadata(&path).unwrap_err();
        match err {
            StagingError::ParseError { path: reported, .. } => assert!(reported.ends_with("broken.json")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn load_name_dictionary_remembers_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("names.json");
        std::fs::write(&path, r#"{"HUB1": "h1"}"#).unwrap();

        let dictionary = FileSystemSources.load_name_dictionary(&path).unwrap();
        assert_eq!(dictionary.abbreviation("HUB1").unwrap(), "h1");
        assert_eq!(dictionary.source(), path.display().to_string());
    }
}
