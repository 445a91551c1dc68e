//! The two studies run over the manifest.
//!
//! A study aggregates the records, fills the tables the reporter prints,
//! draws the conclusions and builds the figures handed to the exporter.

use crate::analysis::{
    aggregate, law_of_the_sea_conclusions, lifeboat_shares, survival_conclusions, GroupKeySelector,
    Insight, RescueTotals,
};
use crate::chart::{BarSpec, ChartBuilder, Figure};
use crate::models::{GroupSummary, PassengerRecord};
use crate::report::{ShareTable, SummaryTable};
use serde::Serialize;
use std::fmt;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StudyKind {
    Survival,
    LawOfTheSea,
}

impl StudyKind {
    pub const ALL: [StudyKind; 2] = [StudyKind::Survival, StudyKind::LawOfTheSea];

    pub fn title(&self) -> &'static str {
        match self {
            StudyKind::Survival => "Titanic survival analysis",
            StudyKind::LawOfTheSea => "Law of the Sea: women and children first",
        }
    }
}

impl fmt::Display for StudyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StudyKind::Survival => write!(f, "survival"),
            StudyKind::LawOfTheSea => write!(f, "law-of-the-sea"),
        }
    }
}

/// Result of one study.
#[derive(Debug, Serialize)]
pub struct StudyReport {
    pub kind: StudyKind,
    pub title: String,
    pub tables: Vec<SummaryTable>,
    pub shares: Vec<ShareTable>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub totals: Option<RescueTotals>,
    pub insights: Vec<Insight>,
    #[serde(skip)]
    figures: Vec<Figure>,
}

impl StudyReport {
    fn new(kind: StudyKind) -> Self {
        Self {
            kind,
            title: kind.title().to_string(),
            tables: Vec::new(),
            shares: Vec::new(),
            totals: None,
            insights: Vec::new(),
            figures: Vec::new(),
        }
    }

    pub fn figure_count(&self) -> usize {
        self.figures.len()
    }

    /// Hand the figures over, e.g. to the exporter.
    pub fn take_figures(&mut self) -> Vec<Figure> {
        std::mem::take(&mut self.figures)
    }

    fn table(&mut self, title: &str, selector: &GroupKeySelector, rows: &[GroupSummary]) {
        self.tables.push(SummaryTable::new(title, selector, rows.to_vec()));
    }
}

/// Run `kind` over `records`.
pub fn run_study(
    kind: StudyKind,
    records: &[PassengerRecord],
    charts: &ChartBuilder,
    class_gap_threshold: f64,
) -> StudyReport {
    let report = match kind {
        StudyKind::Survival => survival_study(records, charts, class_gap_threshold),
        StudyKind::LawOfTheSea => law_of_the_sea_study(records, charts, class_gap_threshold),
    };
    debug!(
        "Study {}: {} tables, {} figures",
        kind,
        report.tables.len(),
        report.figures.len()
    );
    report
}

fn survival_study(records: &[PassengerRecord], charts: &ChartBuilder, threshold: f64) -> StudyReport {
    let mut report = StudyReport::new(StudyKind::Survival);

    let sex = GroupKeySelector::Sex;
    let child = GroupKeySelector::IsChild;
    let class = GroupKeySelector::Class;
    let class_sex = GroupKeySelector::pair(GroupKeySelector::Class, GroupKeySelector::Sex);
    let class_child = GroupKeySelector::pair(GroupKeySelector::Class, GroupKeySelector::IsChild);

    let by_sex = aggregate(records, &sex);
    let by_child = aggregate(records, &child);
    let by_class = aggregate(records, &class);
    let by_class_sex = aggregate(records, &class_sex);
    let by_class_child = aggregate(records, &class_child);

    report.table("Survival by sex", &sex, &by_sex);
    report.table("Survival by age group", &child, &by_child);
    report.table("Survival by class", &class, &by_class);
    report.table("Survival by class and sex", &class_sex, &by_class_sex);
    report.table("Survival by class and age group", &class_child, &by_class_child);

    report.insights = survival_conclusions(&by_sex, &by_child, &by_class_sex, threshold);

    report.figures = vec![
        charts.bar(
            BarSpec::new("survival_by_sex", "Survival rate by sex", "Sex"),
            &by_sex,
        ),
        charts.bar(
            BarSpec::new("survival_by_age", "Survival rate of children and adults", "Age group")
                .palette_offset(2),
            &by_child,
        ),
        charts.bar(
            BarSpec::new("survival_by_class", "Survival rate by class", "Class"),
            &by_class,
        ),
        charts.grouped_bar(
            BarSpec::new(
                "survival_by_class_and_sex",
                "Survival rate by class and sex",
                "Class",
            )
            .legend("Sex"),
            &by_class_sex,
            0,
            1,
        ),
        charts.grouped_bar(
            BarSpec::new(
                "survival_by_class_and_age",
                "Survival rate by class and age group",
                "Class",
            )
            .legend("Age group")
            .palette_offset(2),
            &by_class_child,
            0,
            1,
        ),
    ];

    report
}

fn law_of_the_sea_study(
    records: &[PassengerRecord],
    charts: &ChartBuilder,
    threshold: f64,
) -> StudyReport {
    let mut report = StudyReport::new(StudyKind::LawOfTheSea);

    let class_sex = GroupKeySelector::pair(GroupKeySelector::Class, GroupKeySelector::Sex);
    let bracket = GroupKeySelector::AgeBracket;
    let bracket_sex = GroupKeySelector::pair(GroupKeySelector::AgeBracket, GroupKeySelector::Sex);

    let by_class_sex = aggregate(records, &class_sex);
    let by_bracket = aggregate(records, &bracket);
    let by_bracket_sex = aggregate(records, &bracket_sex);
    let boats = lifeboat_shares(records, &GroupKeySelector::Sex);
    let totals = RescueTotals::from_records(records);

    report.table("Survival by class and sex", &class_sex, &by_class_sex);
    report.table("Survival by age bracket", &bracket, &by_bracket);
    report.table("Survival by age bracket and sex", &bracket_sex, &by_bracket_sex);
    report.shares.push(ShareTable {
        title: "Lifeboat access by sex".to_string(),
        header: "Sex".to_string(),
        rows: boats.clone(),
    });
    report.totals = Some(totals);

    report.insights = law_of_the_sea_conclusions(&by_class_sex, &by_bracket, &boats, &totals, threshold);

    let boat_points: Vec<(String, Option<f64>)> = boats
        .iter()
        .map(|row| (row.group.to_string(), row.share()))
        .collect();
    let rescue_slices = [
        ("Survivors".to_string(), totals.survivors as f64),
        ("Casualties".to_string(), totals.casualties() as f64),
    ];

    report.figures = vec![
        charts.grouped_bar(
            BarSpec::new(
                "law_of_the_sea_class_sex",
                "Survival rate by class and sex",
                "Class",
            )
            .legend("Sex"),
            &by_class_sex,
            0,
            1,
        ),
        charts.bar(
            BarSpec::new(
                "law_of_the_sea_age_bracket",
                "Survival rate by age bracket",
                "Age bracket",
            ),
            &by_bracket,
        ),
        charts.grouped_bar(
            BarSpec::new(
                "law_of_the_sea_age_bracket_sex",
                "Survival rate by age bracket and sex",
                "Age bracket",
            )
            .legend("Sex"),
            &by_bracket_sex,
            0,
            1,
        ),
        charts.bar_from_points(
            BarSpec::new(
                "law_of_the_sea_lifeboats_by_sex",
                "Lifeboat access by sex",
                "Sex",
            )
            .y_label("Share in lifeboats (%)"),
            &boat_points,
        ),
        charts.pie(
            "law_of_the_sea_survivor_share",
            "Rescue capacity: survivors vs casualties",
            &rescue_slices,
            2,
        ),
    ];

    report
}
