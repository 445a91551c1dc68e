//! Passenger manifest loader.
//!
//! Reads the semicolon-delimited manifest, normalizes the typed columns and
//! derives the child flag and age bracket. Recoverable anomalies are
//! collected as [`CoercionWarning`]s instead of aborting the load.

use crate::models::{CoercionKind, CoercionWarning, PassengerClass, PassengerRecord, Sex};
use csv::{ByteRecord, ReaderBuilder, Trim};
use serde::Serialize;
use std::fs::File;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Field delimiter of the manifest.
pub const DELIMITER: u8 = b';';

/// Columns every manifest must provide.
pub const REQUIRED_COLUMNS: [&str; 6] = ["pclass", "sex", "age", "fare", "survived", "boat"];

/// Errors that abort a load.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cannot read passenger file {}: {source}", .path.display())]
    FileAccess {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("malformed passenger file {}: {reason}", .path.display())]
    MalformedFile { path: PathBuf, reason: String },

    #[error("line {line}: cannot parse {field} value {value:?}: {reason}")]
    MalformedField {
        line: u64,
        field: &'static str,
        value: String,
        reason: String,
    },
}

/// Shape of the source table as read from disk.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DatasetOverview {
    /// Data rows (header excluded), skipped rows included.
    pub rows: usize,
    /// Header names in file order.
    pub columns: Vec<String>,
    /// Blank values per column, in header order.
    pub blank_counts: Vec<(String, usize)>,
}

/// Result of a successful load.
#[derive(Debug, Clone, Default)]
pub struct Manifest {
    pub records: Vec<PassengerRecord>,
    pub warnings: Vec<CoercionWarning>,
    pub overview: DatasetOverview,
}

impl Manifest {
    /// Number of blank `survived` values that were filled with 0.
    pub fn filled_survived_count(&self) -> usize {
        self.warnings
            .iter()
            .filter(|w| w.kind == CoercionKind::MissingSurvivedFilled)
            .count()
    }

    /// Number of unparseable ages that were nulled.
    pub fn nulled_age_count(&self) -> usize {
        self.warnings
            .iter()
            .filter(|w| matches!(w.kind, CoercionKind::UnparseableAgeNulled { .. }))
            .count()
    }

    /// Number of rows dropped entirely.
    pub fn skipped_row_count(&self) -> usize {
        self.warnings
            .iter()
            .filter(|w| matches!(w.kind, CoercionKind::RowSkipped { .. }))
            .count()
    }
}

/// Positions of the required columns within the header.
struct ColumnIndex {
    pclass: usize,
    sex: usize,
    age: usize,
    fare: usize,
    survived: usize,
    boat: usize,
}

impl ColumnIndex {
    fn from_header(columns: &[String]) -> Result<Self, Vec<&'static str>> {
        let find = |name: &str| columns.iter().position(|c| c == name);

        let missing: Vec<&'static str> = REQUIRED_COLUMNS
            .iter()
            .copied()
            .filter(|name| find(name).is_none())
            .collect();
        if !missing.is_empty() {
            return Err(missing);
        }

        Ok(Self {
            pclass: find("pclass").unwrap_or_default(),
            sex: find("sex").unwrap_or_default(),
            age: find("age").unwrap_or_default(),
            fare: find("fare").unwrap_or_default(),
            survived: find("survived").unwrap_or_default(),
            boat: find("boat").unwrap_or_default(),
        })
    }
}

/// Load the manifest at `path`.
pub fn load_manifest(path: &Path) -> Result<Manifest, LoadError> {
    info!("Loading passenger manifest from {}", path.display());

    let file = File::open(path).map_err(|source| LoadError::FileAccess {
        path: path.to_path_buf(),
        source,
    })?;

    let mut reader = ReaderBuilder::new()
        .delimiter(DELIMITER)
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(file);

    let columns: Vec<String> = reader
        .byte_headers()
        .map_err(|e| malformed_file(path, e))?
        .iter()
        .map(|name| {
            String::from_utf8_lossy(name)
                .trim_start_matches('\u{feff}')
                .trim()
                .to_lowercase()
        })
        .collect();

    let index = ColumnIndex::from_header(&columns).map_err(|missing| {
        let hint = if columns.len() == 1 {
            " (is the file semicolon-delimited?)"
        } else {
            ""
        };
        LoadError::MalformedFile {
            path: path.to_path_buf(),
            reason: format!("missing required columns: {}{}", missing.join(", "), hint),
        }
    })?;

    debug!("Header columns: {:?}", columns);

    let mut manifest = Manifest::default();
    let mut blank_counts = vec![0usize; columns.len()];

    for result in reader.byte_records() {
        let record = result.map_err(|e| malformed_file(path, e))?;
        let line = record.position().map(|p| p.line()).unwrap_or_default();
        manifest.overview.rows += 1;

        for (i, count) in blank_counts.iter_mut().enumerate() {
            if record.get(i).map_or(true, |v| v.is_empty()) {
                *count += 1;
            }
        }

        if let Some(passenger) = parse_row(&record, &index, line, &mut manifest.warnings)? {
            manifest.records.push(passenger);
        }
    }

    manifest.overview.blank_counts = columns.iter().cloned().zip(blank_counts).collect();
    manifest.overview.columns = columns;

    let filled = manifest.filled_survived_count();
    if filled > 0 {
        warn!(
            "{} blank values found in 'survived'; filled with 0 (did not survive)",
            filled
        );
    }
    let skipped = manifest.skipped_row_count();
    if skipped > 0 {
        warn!("{} rows skipped because of unrecognized values", skipped);
    }

    info!(
        "Loaded {} passengers ({} rows, {} warnings)",
        manifest.records.len(),
        manifest.overview.rows,
        manifest.warnings.len()
    );

    Ok(manifest)
}

fn malformed_file(path: &Path, error: csv::Error) -> LoadError {
    LoadError::MalformedFile {
        path: path.to_path_buf(),
        reason: error.to_string(),
    }
}

/// Text of one field; missing trailing fields read as blank.
fn field(record: &ByteRecord, index: usize) -> String {
    record
        .get(index)
        .map(|raw| String::from_utf8_lossy(raw).trim().to_string())
        .unwrap_or_default()
}

/// Convert one CSV row. `Ok(None)` means the row was skipped with a warning.
fn parse_row(
    record: &ByteRecord,
    index: &ColumnIndex,
    line: u64,
    warnings: &mut Vec<CoercionWarning>,
) -> Result<Option<PassengerRecord>, LoadError> {
    let raw_class = field(record, index.pclass);
    let Some(pclass) = PassengerClass::parse(&raw_class) else {
        warnings.push(skipped(line, "pclass", format!("unknown class {:?}", raw_class)));
        return Ok(None);
    };

    let raw_sex = field(record, index.sex);
    let Some(sex) = Sex::parse(&raw_sex) else {
        warnings.push(skipped(line, "sex", format!("unknown sex {:?}", raw_sex)));
        return Ok(None);
    };

    let raw_survived = field(record, index.survived);
    let survived = match parse_survived(&raw_survived) {
        Some(Some(value)) => value,
        Some(None) => {
            warnings.push(CoercionWarning {
                line,
                field: "survived",
                kind: CoercionKind::MissingSurvivedFilled,
            });
            false
        }
        None => {
            warnings.push(skipped(
                line,
                "survived",
                format!("unknown outcome {:?}", raw_survived),
            ));
            return Ok(None);
        }
    };

    let raw_age = field(record, index.age);
    let age = match parse_age(&raw_age) {
        Ok(age) => age,
        Err(()) => {
            warnings.push(CoercionWarning {
                line,
                field: "age",
                kind: CoercionKind::UnparseableAgeNulled { raw: raw_age },
            });
            None
        }
    };

    let raw_fare = field(record, index.fare);
    let fare = parse_fare(&raw_fare).map_err(|reason| LoadError::MalformedField {
        line,
        field: "fare",
        value: raw_fare.clone(),
        reason,
    })?;

    let boat = Some(field(record, index.boat)).filter(|b| !b.is_empty());

    Ok(Some(PassengerRecord::new(pclass, sex, age, fare, survived, boat)))
}

fn skipped(line: u64, field: &'static str, reason: String) -> CoercionWarning {
    CoercionWarning {
        line,
        field,
        kind: CoercionKind::RowSkipped { reason },
    }
}

/// Parse the `survived` column.
///
/// `Some(None)` is a blank value; `None` is a value that is neither 0 nor 1.
fn parse_survived(raw: &str) -> Option<Option<bool>> {
    if raw.is_empty() {
        return Some(None);
    }

    match raw.replace(',', ".").parse::<f64>() {
        Ok(v) if v == 0.0 => Some(Some(false)),
        Ok(v) if v == 1.0 => Some(Some(true)),
        _ => None,
    }
}

/// Parse an age. Blank is missing; anything unparseable or negative is an error
/// for the caller to coerce.
fn parse_age(raw: &str) -> Result<Option<f64>, ()> {
    if raw.is_empty() {
        return Ok(None);
    }

    match raw.replacen(',', ".", 1).parse::<f64>() {
        Ok(age) if age.is_finite() && age >= 0.0 => Ok(Some(age)),
        _ => Err(()),
    }
}

/// Parse a decimal-comma fare such as `"71,2833"`.
pub fn parse_fare(raw: &str) -> Result<Option<f64>, String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }

    let (whole, fraction) = match raw.split_once(',') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (raw, None),
    };

    let all_digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    if !all_digits(whole) || !fraction.map_or(true, all_digits) {
        return Err("expected digits with an optional decimal comma".to_string());
    }

    raw.replacen(',', ".", 1)
        .parse::<f64>()
        .map(Some)
        .map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AgeBracket;
    use std::io::Write;
    use tempfile::TempDir;

    const HEADER: &str = "pclass;survived;name;sex;age;sibsp;parch;ticket;fare;cabin;embarked;boat;body;home.dest";

    fn write_csv(dir: &TempDir, rows: &[&str]) -> PathBuf {
        let path = dir.path().join("titanic3.csv");
        let mut file = File::create(&path).unwrap();
        writeln!(file, "{}", HEADER).unwrap();
        for row in rows {
            writeln!(file, "{}", row).unwrap();
        }
        path
    }

    #[test]
    fn test_load_normalizes_decimal_comma_fares() {
        let dir = TempDir::new().unwrap();
        let path = write_csv(
            &dir,
            &[
                "3;0;Braund, Mr. Owen;male;22;1;0;A/5 21171;7,25;;S;;;",
                "1;1;Cumings, Mrs. John;female;38;1;0;PC 17599;71,2833;C85;C;4;;",
            ],
        );

        let manifest = load_manifest(&path).unwrap();
        assert_eq!(manifest.records.len(), 2);
        assert_eq!(manifest.records[0].fare, Some(7.25));
        assert_eq!(manifest.records[1].fare, Some(71.2833));
        assert_eq!(manifest.records[1].boat.as_deref(), Some("4"));
        assert!(manifest.warnings.is_empty());
    }

    #[test]
    fn test_blank_survived_is_filled_and_reported() {
        let dir = TempDir::new().unwrap();
        let path = write_csv(
            &dir,
            &[
                "2;;Doe, Mr. John;male;30;0;0;111;13;;S;;;",
                "2;1;Doe, Mrs. Jane;female;29;0;0;112;13;;S;9;;",
            ],
        );

        let manifest = load_manifest(&path).unwrap();
        assert_eq!(manifest.records.len(), 2);
        assert!(!manifest.records[0].survived);
        assert_eq!(manifest.filled_survived_count(), 1);
        assert_eq!(manifest.warnings[0].line, 2);
        assert_eq!(manifest.warnings[0].field, "survived");
    }

    #[test]
    fn test_unparseable_age_becomes_missing() {
        let dir = TempDir::new().unwrap();
        let path = write_csv(
            &dir,
            &[
                "3;0;A;male;unknown;0;0;1;8;;S;;;",
                "3;1;B;female;;0;0;1;8;;S;13;;",
                "3;1;C;female;0,9167;0;0;1;8;;S;13;;",
            ],
        );

        let manifest = load_manifest(&path).unwrap();
        assert_eq!(manifest.records.len(), 3);
        assert_eq!(manifest.records[0].age, None);
        assert_eq!(manifest.records[0].age_bracket, None);
        assert_eq!(manifest.records[1].age, None);
        assert_eq!(manifest.records[2].age, Some(0.9167));
        assert_eq!(manifest.records[2].age_bracket, Some(AgeBracket::Child));
        // Only the non-blank garbage value is reported
        assert_eq!(manifest.nulled_age_count(), 1);
    }

    #[test]
    fn test_malformed_fare_aborts() {
        let dir = TempDir::new().unwrap();
        let path = write_csv(&dir, &["3;0;A;male;22;0;0;1;7.25;;S;;;"]);

        match load_manifest(&path) {
            Err(LoadError::MalformedField { line, field, value, .. }) => {
                assert_eq!(line, 2);
                assert_eq!(field, "fare");
                assert_eq!(value, "7.25");
            }
            other => panic!("expected MalformedField, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_sex_skips_row() {
        let dir = TempDir::new().unwrap();
        let path = write_csv(
            &dir,
            &["3;0;A;unknown;22;0;0;1;8;;S;;;", "3;0;B;male;22;0;0;1;8;;S;;;"],
        );

        let manifest = load_manifest(&path).unwrap();
        assert_eq!(manifest.records.len(), 1);
        assert_eq!(manifest.skipped_row_count(), 1);
        assert_eq!(manifest.overview.rows, 2);
    }

    #[test]
    fn test_missing_file_is_file_access_error() {
        let dir = TempDir::new().unwrap();
        let result = load_manifest(&dir.path().join("missing.csv"));
        assert!(matches!(result, Err(LoadError::FileAccess { .. })));
    }

    #[test]
    fn test_wrong_delimiter_is_malformed_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("comma.csv");
        std::fs::write(&path, "pclass,survived,sex,age,fare,boat\n1,1,female,29,211,2\n").unwrap();

        match load_manifest(&path) {
            Err(LoadError::MalformedFile { reason, .. }) => {
                assert!(reason.contains("semicolon"));
            }
            other => panic!("expected MalformedFile, got {:?}", other),
        }
    }

    #[test]
    fn test_overview_counts_blanks() {
        let dir = TempDir::new().unwrap();
        let path = write_csv(
            &dir,
            &["3;0;A;male;;0;0;1;8;;S;;;", "1;1;B;female;40;0;0;1;80;B5;S;6;;"],
        );

        let manifest = load_manifest(&path).unwrap();
        assert_eq!(manifest.overview.columns.len(), 14);
        let blanks: std::collections::HashMap<_, _> =
            manifest.overview.blank_counts.iter().cloned().collect();
        assert_eq!(blanks.get("age"), Some(&1));
        assert_eq!(blanks.get("boat"), Some(&1));
        assert_eq!(blanks.get("body"), Some(&2));
    }

    #[test]
    fn test_parse_fare_formats() {
        assert_eq!(parse_fare("8"), Ok(Some(8.0)));
        assert_eq!(parse_fare(""), Ok(None));
        assert!(parse_fare("7.25").is_err());
        assert!(parse_fare("-7,25").is_err());
        assert!(parse_fare("7,2,5").is_err());
        assert!(parse_fare("abc").is_err());
    }
}
