use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use autovault_core::GeneratorConfig;
use autovault_staging::{find_metadata_files, StagingError, StagingGenerator};

/// AutoVault - raw vault staging model generator
#[derive(Parser)]
#[command(name = "autovault")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to config file (default: autovault.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate stg_*.sql files from source metadata
    Generate {
        /// Metadata files (default: every .json file under the metadata directory)
        files: Vec<PathBuf>,

        /// Directory to discover metadata files in
        #[arg(short, long)]
        metadata_dir: Option<PathBuf>,

        /// Directory to write staging models to
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Keep going when a file fails
        #[arg(long)]
        continue_on_error: bool,
    },

    /// Validate and render metadata without writing anything
    Check {
        /// Metadata files (default: every .json file under the metadata directory)
        files: Vec<PathBuf>,

        /// Directory to discover metadata files in
        #[arg(short, long)]
        metadata_dir: Option<PathBuf>,
    },

    /// Write the default configuration
    InitConfig {
        /// Output file
        #[arg(short, long, default_value = "autovault.toml")]
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)))
        .init();

    // Load config if specified
    let config = if let Some(config_path) = &cli.config {
        GeneratorConfig::from_file(config_path)
            .with_context(|| format!("Failed to load config {}", config_path.display()))?
    } else if Path::new("autovault.toml").exists() {
        GeneratorConfig::from_file(Path::new("autovault.toml"))?
    } else {
        if cli.verbose {
            eprintln!("{}", "No config file found, using defaults".yellow());
        }
        GeneratorConfig::default()
    };

    match cli.command {
        Commands::Generate { files, metadata_dir, output_dir, continue_on_error } => {
            generate_command(config, files, metadata_dir, output_dir, continue_on_error, cli.verbose)
        }
        Commands::Check { files, metadata_dir } => {
            check_command(config, files, metadata_dir, cli.verbose)
        }
        Commands::InitConfig { output } => init_config_command(&output),
    }
}

/// Explicit files win; otherwise discover under the metadata directory
fn resolve_metadata_files(
    config: &GeneratorConfig,
    files: Vec<PathBuf>,
    metadata_dir: Option<PathBuf>,
    verbose: bool,
) -> Result<Vec<PathBuf>> {
    if !files.is_empty() {
        return Ok(files);
    }

    let directory = metadata_dir.unwrap_or_else(|| config.metadata_directory());
    if verbose {
        eprintln!("{} {}", "Discovering metadata in:".cyan(), directory.display());
    }

    let files = find_metadata_files(&directory)
        .with_context(|| format!("Failed to discover metadata files in {}", directory.display()))?;

    if files.is_empty() {
        eprintln!("{} {}", "Warning: no metadata files found in".yellow(), directory.display());
    }

    Ok(files)
}

/// Generate command - write one staging model per metadata file
fn generate_command(
    mut config: GeneratorConfig,
    files: Vec<PathBuf>,
    metadata_dir: Option<PathBuf>,
    output_dir: Option<PathBuf>,
    continue_on_error: bool,
    verbose: bool,
) -> Result<()> {
    if let Some(output_dir) = output_dir {
        let working_directory =
            std::env::current_dir().context("Failed to read the current directory")?;
        config.override_output_directory(&output_dir, &working_directory);
    }
    config.continue_on_error |= continue_on_error;

    let files = resolve_metadata_files(&config, files, metadata_dir, verbose)?;
    let generator = StagingGenerator::new(config);

    if verbose {
        eprintln!(
            "{} {} metadata files into {}",
            "Generating".cyan(),
            files.len(),
            generator.config().output_directory().display()
        );
    }

    let report = generator.generate_all(&files)?;

    for written in &report.written {
        println!("{} {}", "✓".green(), written.display());
    }

    for failure in &report.failures {
        println!("{} {}: {}", "✗".red(), failure.path.display(), failure.error);
    }

    println!();
    println!(
        "{} staging models written, {} failed",
        report.written.len().to_string().green(),
        report.failures.len().to_string().red()
    );

    if !report.is_success() {
        std::process::exit(1);
    }

    Ok(())
}

/// Check command - validate and render without writing
fn check_command(
    config: GeneratorConfig,
    files: Vec<PathBuf>,
    metadata_dir: Option<PathBuf>,
    verbose: bool,
) -> Result<()> {
    let files = resolve_metadata_files(&config, files, metadata_dir, verbose)?;
    let generator = StagingGenerator::new(config);

    let mut failed = 0;

    for path in &files {
        let result = check_file(&generator, path);

        match result {
            Ok(file_name) => println!("{} {} -> {}", "✓".green(), path.display(), file_name),
            Err(e) => {
                failed += 1;
                println!("{} {}: {}", "✗".red(), path.display(), e);
            }
        }
    }

    println!();
    println!(
        "Checked {} metadata files ({} failed)",
        files.len(),
        failed.to_string().red()
    );

    if failed > 0 {
        std::process::exit(1);
    }

    Ok(())
}

fn check_file(generator: &StagingGenerator, path: &Path) -> Result<String, StagingError> {
    Ok(generator.check_staging_file(path)?.file_name)
}

/// Init-config command - write the default configuration
fn init_config_command(output: &Path) -> Result<()> {
    if output.exists() {
        anyhow::bail!("{} already exists", output.display());
    }

    GeneratorConfig::default()
        .save_to_file(output)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    println!("{} {}", "Wrote".green(), output.display());
    Ok(())
}
