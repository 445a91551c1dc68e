//! Text and JSON report generation.
//!
//! The text report is meant for a terminal: aligned tables, one line per
//! group, followed by the conclusions of each study.

use super::{CoercionSummary, Report, ReportMetadata, ShareTable, SummaryTable};
use crate::analysis::{format_rate, Insight, RescueTotals};
use crate::loader::DatasetOverview;
use crate::study::StudyReport;
use anyhow::Result;

/// Warnings listed individually before the rest are summarized.
const MAX_LISTED_WARNINGS: usize = 10;

/// Generate the complete text report.
pub fn generate_text_report(report: &Report<'_>) -> String {
    let mut output = String::new();

    output.push_str(&generate_metadata_section(&report.metadata));
    output.push_str(&generate_overview_section(report.overview));
    output.push_str(&generate_coercion_section(&report.coercions));

    for study in report.studies {
        output.push_str(&generate_study_section(study));
    }

    output
}

/// Generate a JSON report.
pub fn generate_json_report(report: &Report<'_>) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}

fn heading(title: &str, underline: char) -> String {
    format!("{}\n{}\n\n", title, underline.to_string().repeat(title.chars().count()))
}

fn generate_metadata_section(metadata: &ReportMetadata) -> String {
    let mut section = String::new();

    section.push_str(&heading("Titanic passenger manifest report", '='));
    section.push_str(&format!("Input:      {}\n", metadata.input));
    section.push_str(&format!("Records:    {}\n", metadata.records));
    section.push_str(&format!(
        "Generated:  {}\n",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!("Version:    {}\n\n", metadata.version));

    section
}

fn generate_overview_section(overview: &DatasetOverview) -> String {
    let mut section = String::new();

    section.push_str(&heading("Dataset overview", '-'));
    section.push_str(&format!("Rows:    {}\n", overview.rows));
    section.push_str(&format!("Columns: {}\n\n", overview.columns.join(", ")));

    let blanks: Vec<Vec<String>> = overview
        .blank_counts
        .iter()
        .filter(|(_, count)| *count > 0)
        .map(|(column, count)| vec![column.clone(), count.to_string()])
        .collect();

    if blanks.is_empty() {
        section.push_str("No blank values.\n\n");
    } else {
        section.push_str("Blank values per column:\n\n");
        section.push_str(&render_table(
            &["Column".to_string(), "Blank".to_string()],
            &blanks,
            1,
        ));
        section.push('\n');
    }

    section
}

fn generate_coercion_section(coercions: &CoercionSummary) -> String {
    if coercions.is_empty() {
        return String::new();
    }

    let mut section = String::new();

    section.push_str(&heading("Data cleaning", '-'));
    section.push_str(&format!(
        "Missing survived filled with 0: {}\n",
        coercions.filled_survived
    ));
    section.push_str(&format!("Unparseable ages set to missing: {}\n", coercions.nulled_age));
    section.push_str(&format!("Rows skipped: {}\n\n", coercions.skipped_rows));

    for warning in coercions.warnings.iter().take(MAX_LISTED_WARNINGS) {
        section.push_str(&format!("  - {}\n", warning));
    }
    if coercions.warnings.len() > MAX_LISTED_WARNINGS {
        section.push_str(&format!(
            "  ... and {} more\n",
            coercions.warnings.len() - MAX_LISTED_WARNINGS
        ));
    }
    section.push('\n');

    section
}

/// Generate the section of one study.
fn generate_study_section(study: &StudyReport) -> String {
    let mut section = String::new();

    section.push_str(&heading(&study.title, '='));

    if let Some(totals) = &study.totals {
        section.push_str(&generate_totals(totals));
    }
    for table in &study.tables {
        section.push_str(&format_summary_table(table));
    }
    for table in &study.shares {
        section.push_str(&format_share_table(table));
    }
    for insight in &study.insights {
        section.push_str(&format_insight(insight));
    }

    section
}

fn generate_totals(totals: &RescueTotals) -> String {
    format!(
        "Passengers: {}  Survivors: {}  Casualties: {}  Rescue rate: {}\n\n",
        totals.passengers,
        totals.survivors,
        totals.casualties(),
        format_rate(totals.rescue_rate())
    )
}

/// Format a summary table, one line per group.
fn format_summary_table(table: &SummaryTable) -> String {
    let mut headers = table.headers.clone();
    let key_columns = headers.len();
    headers.extend(["Total", "Survived", "Rate"].map(String::from));

    let rows: Vec<Vec<String>> = table
        .rows
        .iter()
        .map(|summary| {
            let mut row: Vec<String> = summary.key.values().iter().map(|v| v.to_string()).collect();
            row.push(summary.total.to_string());
            row.push(summary.survived_count.to_string());
            row.push(format_rate(summary.survival_rate()));
            row
        })
        .collect();

    let mut section = heading(&table.title, '-');
    if rows.is_empty() {
        section.push_str("(no data)\n\n");
    } else {
        section.push_str(&render_table(&headers, &rows, key_columns));
        section.push('\n');
    }
    section
}

fn format_share_table(table: &ShareTable) -> String {
    let headers = [table.header.clone(), "Total".to_string(), "In lifeboats".to_string(), "Share".to_string()];
    let rows: Vec<Vec<String>> = table
        .rows
        .iter()
        .map(|row| {
            vec![
                row.group.to_string(),
                row.total.to_string(),
                row.in_lifeboats.to_string(),
                format_rate(row.share()),
            ]
        })
        .collect();

    let mut section = heading(&table.title, '-');
    if rows.is_empty() {
        section.push_str("(no data)\n\n");
    } else {
        section.push_str(&render_table(&headers, &rows, 1));
        section.push('\n');
    }
    section
}

fn format_insight(insight: &Insight) -> String {
    let mut section = heading(&insight.heading, '-');
    for statement in &insight.statements {
        section.push_str(&format!("  * {}\n", statement));
    }
    section.push('\n');
    section
}

/// Render rows under headers; columns from `first_numeric` on are
/// right-aligned.
fn render_table(headers: &[String], rows: &[Vec<String>], first_numeric: usize) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if let Some(width) = widths.get_mut(i) {
                *width = (*width).max(cell.chars().count());
            }
        }
    }

    let line = |cells: &[String]| {
        let formatted: Vec<String> = cells
            .iter()
            .zip(&widths)
            .enumerate()
            .map(|(i, (cell, width))| {
                if i >= first_numeric {
                    format!("{:>width$}", cell, width = width)
                } else {
                    format!("{:<width$}", cell, width = width)
                }
            })
            .collect();
        format!("{}\n", formatted.join(" | ").trim_end())
    };

    let mut table = line(headers);
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    table.push_str(&format!("{}\n", rule.join("-+-")));
    for row in rows {
        table.push_str(&line(row));
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::GroupKeySelector;
    use crate::chart::{ChartBuilder, ChartStyleConfig};
    use crate::models::{
        CoercionKind, CoercionWarning, GroupKey, GroupSummary, GroupValue, PassengerClass,
        PassengerRecord, Sex,
    };
    use crate::study::{run_study, StudyKind};
    use std::path::Path;

    fn sex_table() -> SummaryTable {
        SummaryTable::new(
            "Survival by sex",
            &GroupKeySelector::Sex,
            vec![
                GroupSummary {
                    key: GroupKey(vec![GroupValue::Sex(Sex::Female)]),
                    total: 2,
                    survived_count: 1,
                },
                GroupSummary {
                    key: GroupKey(vec![GroupValue::Sex(Sex::Male)]),
                    total: 2,
                    survived_count: 0,
                },
            ],
        )
    }

    fn overview() -> DatasetOverview {
        DatasetOverview {
            rows: 4,
            columns: vec!["pclass".to_string(), "sex".to_string(), "age".to_string()],
            blank_counts: vec![("age".to_string(), 1), ("sex".to_string(), 0)],
        }
    }

    fn studies() -> Vec<StudyReport> {
        let records = vec![
            PassengerRecord::new(PassengerClass::First, Sex::Female, Some(20.0), None, true, Some("4".into())),
            PassengerRecord::new(PassengerClass::Third, Sex::Male, Some(9.0), None, false, None),
        ];
        let charts = ChartBuilder::new(ChartStyleConfig::default());
        StudyKind::ALL
            .into_iter()
            .map(|kind| run_study(kind, &records, &charts, 20.0))
            .collect()
    }

    fn coercions(warnings: usize) -> CoercionSummary {
        CoercionSummary {
            filled_survived: warnings,
            nulled_age: 0,
            skipped_rows: 0,
            warnings: (0..warnings)
                .map(|i| CoercionWarning {
                    line: i as u64 + 2,
                    field: "survived",
                    kind: CoercionKind::MissingSurvivedFilled,
                })
                .collect(),
        }
    }

    #[test]
    fn test_format_summary_table() {
        let text = format_summary_table(&sex_table());

        assert!(text.starts_with("Survival by sex\n---------------\n"));
        assert!(text.contains("Sex   | Total | Survived |  Rate\n"));
        assert!(text.contains("Women |     2 |        1 | 50.0%\n"));
        assert!(text.contains("Men   |     2 |        0 |  0.0%\n"));
    }

    #[test]
    fn test_empty_group_rate_is_undefined() {
        let mut table = sex_table();
        table.rows[1].total = 0;
        let text = format_summary_table(&table);
        assert!(text.contains("undefined"));
    }

    #[test]
    fn test_generate_text_report() {
        let studies = studies();
        let overview = overview();
        let report = Report {
            metadata: ReportMetadata::new(Path::new("titanic.csv"), 2),
            overview: &overview,
            coercions: coercions(12),
            studies: &studies,
        };

        let text = generate_text_report(&report);
        assert!(text.contains("Input:      titanic.csv"));
        assert!(text.contains("age    |     1"));
        assert!(text.contains("Missing survived filled with 0: 12"));
        assert!(text.contains("... and 2 more"));
        assert!(text.contains("Titanic survival analysis"));
        assert!(text.contains("Law of the Sea: women and children first"));
        assert!(text.contains("Lifeboat access by sex"));
        assert!(text.contains("  * Women: 100.0%"));
        assert!(!text.contains("NaN"));
    }

    #[test]
    fn test_generate_json_report() {
        let studies = studies();
        let overview = overview();
        let report = Report {
            metadata: ReportMetadata::new(Path::new("titanic.csv"), 2),
            overview: &overview,
            coercions: coercions(1),
            studies: &studies,
        };

        let json = generate_json_report(&report).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed["metadata"]["records"], 2);
        assert_eq!(parsed["studies"][0]["kind"], "survival");
        assert_eq!(parsed["studies"][1]["kind"], "law-of-the-sea");
        assert_eq!(parsed["studies"][1]["totals"]["survivors"], 1);
        assert!(parsed["studies"][0].get("totals").is_none());
        assert_eq!(parsed["coercions"]["warnings"][0]["field"], "survived");
    }

    #[test]
    fn test_no_coercion_section_when_clean() {
        assert!(generate_coercion_section(&coercions(0)).is_empty());
    }
}
