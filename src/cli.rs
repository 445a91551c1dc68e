//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::study::StudyKind;
use clap::Parser;
use std::path::PathBuf;

/// titanic-report - survival statistics from the Titanic passenger manifest
///
/// Reads the semicolon-delimited manifest, prints survival tables and
/// conclusions, and exports the charts of each study as a PDF (or as PNG
/// images when the PDF cannot be written).
///
/// Examples:
///   titanic-report --input titanic3.csv
///   titanic-report --study law-of-the-sea --output lei_do_mar.pdf
///   titanic-report --format json --no-progress > report.json
///   titanic-report --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Passenger manifest (semicolon-delimited CSV)
    ///
    /// Defaults to the `input` of the config file, or titanic3.csv.
    #[arg(short, long, value_name = "FILE", env = "TITANIC_INPUT")]
    pub input: Option<PathBuf>,

    /// Study to run
    #[arg(short, long, value_enum, default_value = "all")]
    pub study: StudySelection,

    /// Output PDF path (only with a single --study)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Directory for PNG images when the PDF cannot be written
    #[arg(long, value_name = "DIR")]
    pub image_dir: Option<PathBuf>,

    /// Output format of the printed report (text, json)
    #[arg(short, long, value_enum, default_value = "text", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Path to configuration file
    ///
    /// If not specified, looks for .titanic-report.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (errors only, no progress bars)
    #[arg(short, long)]
    pub quiet: bool,

    /// Disable progress bars
    #[arg(long)]
    pub no_progress: bool,

    /// Generate a default .titanic-report.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Which studies to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum StudySelection {
    /// Survival by sex, age group and class
    Survival,
    /// Women and children first
    LawOfTheSea,
    /// Both studies (default)
    #[default]
    All,
}

impl StudySelection {
    /// Studies to run, in order.
    pub fn studies(&self) -> Vec<StudyKind> {
        match self {
            StudySelection::Survival => vec![StudyKind::Survival],
            StudySelection::LawOfTheSea => vec![StudyKind::LawOfTheSea],
            StudySelection::All => StudyKind::ALL.to_vec(),
        }
    }
}

/// Output format for the printed report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Aligned text tables (default)
    #[default]
    Text,
    /// JSON format
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if self.output.is_some() && self.study == StudySelection::All {
            return Err("--output needs a single --study (survival or law-of-the-sea)".to_string());
        }

        if let Some(ref input) = self.input {
            if input.is_dir() {
                return Err(format!("Input is a directory: {}", input.display()));
            }
        }

        if let Some(ref dir) = self.image_dir {
            if dir.is_file() {
                return Err(format!("Image directory is a file: {}", dir.display()));
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
