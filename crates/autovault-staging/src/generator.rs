//! Staging model generation
//!
//! One metadata file in, one `stg_<source>.sql` file out. Every substitution is
//! computed before anything touches the output directory, so a data error
//! never leaves a half-written model behind.

use autovault_core::{GeneratorConfig, Metadata, MetadataError};
use crate::error::StagingError;
use crate::sources::{FileSystemSources, StagingSources};
use crate::substitutions::{
    alias_substitutions, derived_columns_substitution, hub_substitutions, link_substitutions,
    sat_substitutions, source_substitution,
};
use crate::template::{slot, Substitutions, Template, TemplateKind};
use std::path::{Path, PathBuf};

/// A rendered staging model, not yet written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedStagingFile {
    /// Output file name (`stg_<versioned source, lower-cased>.sql`)
    pub file_name: String,

    /// SQL text
    pub contents: String,
}

/// A file that failed during a batch run
#[derive(Debug)]
pub struct FileFailure {
    pub path: PathBuf,
    pub error: StagingError,
}

/// Outcome of [`StagingGenerator::generate_all`]
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Staging files written, in processing order
    pub written: Vec<PathBuf>,

    /// Files that failed (only collected with `continue_on_error`)
    pub failures: Vec<FileFailure>,
}

impl BatchReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Output file name for a metadata document
pub fn staging_file_name(metadata: &Metadata) -> Result<String, MetadataError> {
    Ok(format!(
        "stg_{}.sql",
        metadata.get_versioned_source_name()?.to_lowercase()
    ))
}

/// Assemble the staging template substitutions
pub fn create_staging_substitutions(
    metadata: &Metadata,
    hubs_substitution: String,
    alias_substitution: String,
    links_substitution: String,
    sats_substitution: String,
) -> Result<Substitutions, MetadataError> {
    let mut substitutions = Substitutions::new();
    substitutions.insert(slot::SOURCE.to_string(), source_substitution(metadata)?);
    substitutions.insert(slot::DERIVED_COLUMNS.to_string(), derived_columns_substitution());
    substitutions.insert(slot::HASHED_HUBS_PRIMARY_KEY.to_string(), hubs_substitution);
    substitutions.insert(slot::ALIAS_COLUMNS.to_string(), alias_substitution);
    substitutions.insert(slot::HASHED_LINKS.to_string(), links_substitution);
    substitutions.insert(slot::HASHDIFF.to_string(), sats_substitution);
    Ok(substitutions)
}

/// Generates staging models from source metadata
pub struct StagingGenerator<S = FileSystemSources> {
    config: GeneratorConfig,
    sources: S,
}

impl StagingGenerator<FileSystemSources> {
    /// Generator reading from the local file system
    pub fn new(config: GeneratorConfig) -> Self {
        Self::with_sources(config, FileSystemSources)
    }
}

impl<S: StagingSources> StagingGenerator<S> {
    pub fn with_sources(config: GeneratorConfig, sources: S) -> Self {
        Self { config, sources }
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    fn load_template(&self, kind: TemplateKind, path: &Path) -> Result<Template, StagingError> {
        let text = self.sources.load_template(path)?;
        Ok(Template::parse(kind, &text)?)
    }

    fn load_metadata(&self, metadata_path: &Path) -> Result<Metadata, StagingError> {
        Ok(Metadata::from_value(self.sources.load_metadata(metadata_path)?)?)
    }

    fn render_loaded(&self, metadata: &Metadata) -> Result<RenderedStagingFile, StagingError> {
        let staging_template =
            self.load_template(TemplateKind::Staging, &self.config.staging_template())?;
        let sat_hashdiff_template =
            self.load_template(TemplateKind::SatHashdiff, &self.config.sat_hashdiff_template())?;

        self.render_metadata(metadata, &staging_template, &sat_hashdiff_template)
    }

    /// Render the staging model for one metadata file without writing it
    pub fn render_staging_file(&self, metadata_path: &Path) -> Result<RenderedStagingFile, StagingError> {
        let metadata = self.load_metadata(metadata_path)?;
        self.render_loaded(&metadata)
    }

    /// Validate every required metadata field, then render without writing
    ///
    /// Stricter than [`render_staging_file`](Self::render_staging_file): a
    /// single-hub source must still declare its unit of work.
    pub fn check_staging_file(&self, metadata_path: &Path) -> Result<RenderedStagingFile, StagingError> {
        let metadata = self.load_metadata(metadata_path)?;
        metadata.validate()?;
        self.render_loaded(&metadata)
    }

    /// Render an already parsed metadata document
    pub fn render_metadata(
        &self,
        metadata: &Metadata,
        staging_template: &Template,
        sat_hashdiff_template: &Template,
    ) -> Result<RenderedStagingFile, StagingError> {
        let hubs = metadata.get_hubs_from_business_topics()?;

        let hub_substitutions = hub_substitutions(metadata, &hubs)?;
        let sat_substitutions = sat_substitutions(metadata, sat_hashdiff_template)?;
        let link_substitutions = link_substitutions(metadata, &hubs, || {
            self.sources.load_name_dictionary(&self.config.name_dictionary())
        })?;
        let alias_substitutions = alias_substitutions(metadata)?;

        let substitutions = create_staging_substitutions(
            metadata,
            hub_substitutions,
            alias_substitutions,
            link_substitutions,
            sat_substitutions,
        )?;

        Ok(RenderedStagingFile {
            file_name: staging_file_name(metadata)?,
            contents: staging_template.render(&substitutions)?,
        })
    }

    /// Render and write the staging model for one metadata file
    pub fn create_staging_file(&self, metadata_path: &Path) -> Result<PathBuf, StagingError> {
        let rendered = self.render_staging_file(metadata_path)?;

        let output_directory = self.config.output_directory();
        std::fs::create_dir_all(&output_directory).map_err(|e| StagingError::WriteError {
            path: output_directory.display().to_string(),
            message: e.to_string(),
        })?;

        let output_path = output_directory.join(&rendered.file_name);
        std::fs::write(&output_path, &rendered.contents).map_err(|e| StagingError::WriteError {
            path: output_path.display().to_string(),
            message: e.to_string(),
        })?;

        tracing::info!(
            metadata = %metadata_path.display(),
            output = %output_path.display(),
            "wrote staging model"
        );

        Ok(output_path)
    }

    /// Generate a staging model for every metadata file
    ///
    /// Stops at the first failure unless `continue_on_error` is configured, in
    /// which case failures are collected in the report.
    pub fn generate_all<P: AsRef<Path>>(&self, metadata_paths: &[P]) -> Result<BatchReport, StagingError> {
        let mut report = BatchReport::default();

        for metadata_path in metadata_paths {
            let metadata_path = metadata_path.as_ref();

            match self.create_staging_file(metadata_path) {
                Ok(output_path) => report.written.push(output_path),
                Err(error) if self.config.continue_on_error => {
                    tracing::warn!(metadata = %metadata_path.display(), %error, "staging generation failed");
                    report.failures.push(FileFailure {
                        path: metadata_path.to_path_buf(),
                        error,
                    });
                }
                Err(error) => return Err(error.in_file(metadata_path)),
            }
        }

        Ok(report)
    }
}
