//! Report model and rendering.
//!
//! Studies fill [`SummaryTable`]s and [`ShareTable`]s; the generator turns
//! them, together with the dataset overview and coercion summary, into
//! aligned text or pretty JSON.

pub mod generator;

pub use generator::{generate_json_report, generate_text_report};

use crate::analysis::{GroupKeySelector, ShareRow};
use crate::loader::{DatasetOverview, Manifest};
use crate::models::{CoercionWarning, GroupSummary};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;

/// Survival per group for one selector.
#[derive(Debug, Clone, Serialize)]
pub struct SummaryTable {
    pub title: String,
    /// One header per key component.
    pub headers: Vec<String>,
    pub rows: Vec<GroupSummary>,
}

impl SummaryTable {
    pub fn new(title: &str, selector: &GroupKeySelector, rows: Vec<GroupSummary>) -> Self {
        Self {
            title: title.to_string(),
            headers: selector.headers().into_iter().map(String::from).collect(),
            rows,
        }
    }
}

/// Lifeboat share per group.
#[derive(Debug, Clone, Serialize)]
pub struct ShareTable {
    pub title: String,
    pub header: String,
    pub rows: Vec<ShareRow>,
}

/// Counts of the coercions applied while loading.
#[derive(Debug, Clone, Serialize)]
pub struct CoercionSummary {
    pub filled_survived: usize,
    pub nulled_age: usize,
    pub skipped_rows: usize,
    pub warnings: Vec<CoercionWarning>,
}

impl CoercionSummary {
    pub fn from_manifest(manifest: &Manifest) -> Self {
        Self {
            filled_survived: manifest.filled_survived_count(),
            nulled_age: manifest.nulled_age_count(),
            skipped_rows: manifest.skipped_row_count(),
            warnings: manifest.warnings.clone(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty()
    }
}

/// Run-level information printed before the studies.
#[derive(Debug, Clone, Serialize)]
pub struct ReportMetadata {
    pub input: String,
    pub generated_at: DateTime<Utc>,
    pub version: String,
    pub records: usize,
}

impl ReportMetadata {
    pub fn new(input: &Path, records: usize) -> Self {
        Self {
            input: input.display().to_string(),
            generated_at: Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            records,
        }
    }
}

/// Everything printed for one run.
#[derive(Debug, Serialize)]
pub struct Report<'a> {
    pub metadata: ReportMetadata,
    pub overview: &'a DatasetOverview,
    pub coercions: CoercionSummary,
    pub studies: &'a [crate::study::StudyReport],
}
