//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.titanic-report.toml` files.

use crate::study::StudyKind;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Name of the configuration file looked up in the working directory.
pub const CONFIG_FILE: &str = ".titanic-report.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Chart style.
    #[serde(default)]
    pub style: StyleConfig,

    /// Export settings.
    #[serde(default)]
    pub export: ExportConfig,

    /// Insight thresholds.
    #[serde(default)]
    pub insights: InsightsConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Passenger manifest to read.
    #[serde(default = "default_input")]
    pub input: PathBuf,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            input: default_input(),
            verbose: false,
        }
    }
}

fn default_input() -> PathBuf {
    PathBuf::from("titanic3.csv")
}

/// Figure style. Colors are `#rrggbb`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StyleConfig {
    /// Figure width in points (pixels for PNG).
    #[serde(default = "default_width")]
    pub width: u32,

    #[serde(default = "default_height")]
    pub height: u32,

    /// Plot area background.
    #[serde(default = "default_background")]
    pub background: String,

    #[serde(default = "default_palette")]
    pub palette: Vec<String>,

    #[serde(default = "default_title_size")]
    pub title_size: f32,

    #[serde(default = "default_label_size")]
    pub label_size: f32,

    /// Size of the percentage labels on bars and slices.
    #[serde(default = "default_annotation_size")]
    pub annotation_size: f32,
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            background: default_background(),
            palette: default_palette(),
            title_size: default_title_size(),
            label_size: default_label_size(),
            annotation_size: default_annotation_size(),
        }
    }
}

fn default_width() -> u32 {
    864 // 12in at 72pt/in
}

fn default_height() -> u32 {
    576
}

fn default_background() -> String {
    "#f0f0f0".to_string()
}

fn default_palette() -> Vec<String> {
    vec!["#3498db", "#e74c3c", "#2ecc71", "#f39c12", "#9b59b6"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_title_size() -> f32 {
    20.0
}

fn default_label_size() -> f32 {
    14.0
}

fn default_annotation_size() -> f32 {
    12.0
}

/// Export settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// PDF of the survival study.
    #[serde(default = "default_survival_pdf")]
    pub survival_pdf: PathBuf,

    /// PDF of the Law of the Sea study.
    #[serde(default = "default_law_of_the_sea_pdf")]
    pub law_of_the_sea_pdf: PathBuf,

    /// Where PNG images go when a PDF cannot be written.
    #[serde(default = "default_image_dir")]
    pub image_dir: PathBuf,

    /// Show progress bars while exporting.
    #[serde(default = "default_true")]
    pub show_progress: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            survival_pdf: default_survival_pdf(),
            law_of_the_sea_pdf: default_law_of_the_sea_pdf(),
            image_dir: default_image_dir(),
            show_progress: true,
        }
    }
}

impl ExportConfig {
    /// PDF path of `study`.
    pub fn output_for(&self, study: StudyKind) -> &Path {
        match study {
            StudyKind::Survival => &self.survival_pdf,
            StudyKind::LawOfTheSea => &self.law_of_the_sea_pdf,
        }
    }
}

fn default_survival_pdf() -> PathBuf {
    PathBuf::from("analise_titanic.pdf")
}

fn default_law_of_the_sea_pdf() -> PathBuf {
    PathBuf::from("lei_do_mar_titanic.pdf")
}

fn default_image_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_true() -> bool {
    true
}

/// Insight thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsightsConfig {
    /// Class 1 vs class 3 survival gap, in percentage points, above which
    /// social class is called significant.
    #[serde(default = "default_class_gap_threshold")]
    pub class_gap_threshold: f64,
}

impl Default for InsightsConfig {
    fn default() -> Self {
        Self {
            class_gap_threshold: default_class_gap_threshold(),
        }
    }
}

fn default_class_gap_threshold() -> f64 {
    crate::analysis::CLASS_GAP_THRESHOLD_PP
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        Self::load_from_dir(Path::new("."))
    }

    /// Try to load `.titanic-report.toml` from `dir`.
    pub fn load_from_dir(dir: &Path) -> Result<Option<Self>> {
        let config_path = dir.join(CONFIG_FILE);

        if config_path.exists() {
            Ok(Some(Self::load(&config_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    /// This method only overrides config when CLI provides explicit values.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref input) = args.input {
            self.general.input = input.clone();
        }

        // --output applies to the one selected study
        if let Some(ref output) = args.output {
            for study in args.study.studies() {
                match study {
                    StudyKind::Survival => self.export.survival_pdf = output.clone(),
                    StudyKind::LawOfTheSea => self.export.law_of_the_sea_pdf = output.clone(),
                }
            }
        }

        if let Some(ref dir) = args.image_dir {
            self.export.image_dir = dir.clone();
        }

        // Flags always override
        if args.verbose {
            self.general.verbose = true;
        }
        if args.quiet || args.no_progress {
            self.export.show_progress = false;
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
