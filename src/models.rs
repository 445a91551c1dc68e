//! Data models for the survival report.
//!
//! This module contains the typed passenger records produced by the loader,
//! the categorical values used as grouping keys, and the group summaries
//! computed by the aggregator.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Passenger sex as recorded in the manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sex {
    Female,
    Male,
}

impl fmt::Display for Sex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sex::Female => write!(f, "female"),
            Sex::Male => write!(f, "male"),
        }
    }
}

impl Sex {
    /// Parse the manifest spelling (`male` / `female`, case-insensitive).
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "female" => Some(Sex::Female),
            "male" => Some(Sex::Male),
            _ => None,
        }
    }

    /// Plural label used on charts and in conclusions.
    pub fn label(&self) -> &'static str {
        match self {
            Sex::Female => "Women",
            Sex::Male => "Men",
        }
    }
}

/// Ticket class. Ordered first to third.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PassengerClass {
    First,
    Second,
    Third,
}

impl PassengerClass {
    pub const ALL: [PassengerClass; 3] = [
        PassengerClass::First,
        PassengerClass::Second,
        PassengerClass::Third,
    ];

    /// Parse the numeric `pclass` column (`1`, `2`, `3`).
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "1" => Some(PassengerClass::First),
            "2" => Some(PassengerClass::Second),
            "3" => Some(PassengerClass::Third),
            _ => None,
        }
    }

    pub fn number(&self) -> u8 {
        match self {
            PassengerClass::First => 1,
            PassengerClass::Second => 2,
            PassengerClass::Third => 3,
        }
    }
}

impl fmt::Display for PassengerClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Class {}", self.number())
    }
}

/// Fixed, ordered partition of ages.
///
/// Bins are right-inclusive: `[0, 12]`, `(12, 18]`, `(18, 35]`, `(35, 50]`
/// and everything above 50.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgeBracket {
    Child,
    Adolescent,
    YoungAdult,
    Adult,
    Senior,
}

impl AgeBracket {
    pub const ALL: [AgeBracket; 5] = [
        AgeBracket::Child,
        AgeBracket::Adolescent,
        AgeBracket::YoungAdult,
        AgeBracket::Adult,
        AgeBracket::Senior,
    ];

    /// Classify an age. Negative or non-finite ages have no bracket.
    pub fn from_age(age: f64) -> Option<Self> {
        if !age.is_finite() || age < 0.0 {
            return None;
        }

        let bracket = if age <= 12.0 {
            AgeBracket::Child
        } else if age <= 18.0 {
            AgeBracket::Adolescent
        } else if age <= 35.0 {
            AgeBracket::YoungAdult
        } else if age <= 50.0 {
            AgeBracket::Adult
        } else {
            AgeBracket::Senior
        };

        Some(bracket)
    }

    /// Whether the bracket counts as "children" in the Law of the Sea sense.
    pub fn is_minor(&self) -> bool {
        matches!(self, AgeBracket::Child | AgeBracket::Adolescent)
    }
}

impl fmt::Display for AgeBracket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgeBracket::Child => write!(f, "Child (0-12)"),
            AgeBracket::Adolescent => write!(f, "Adolescent (13-18)"),
            AgeBracket::YoungAdult => write!(f, "Young adult (19-35)"),
            AgeBracket::Adult => write!(f, "Adult (36-50)"),
            AgeBracket::Senior => write!(f, "Senior (50+)"),
        }
    }
}

/// One row of the passenger manifest after normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct PassengerRecord {
    pub pclass: PassengerClass,
    pub sex: Sex,
    /// Age in years; `None` when blank or unparseable.
    pub age: Option<f64>,
    /// Fare in pounds; `None` when blank.
    pub fare: Option<f64>,
    pub survived: bool,
    /// Lifeboat identifier, present only for passengers who boarded one.
    pub boat: Option<String>,
    /// `age < 18`; `None` when age is missing.
    pub is_child: Option<bool>,
    pub age_bracket: Option<AgeBracket>,
}

impl PassengerRecord {
    /// Build a record, deriving the child flag and age bracket from `age`.
    pub fn new(
        pclass: PassengerClass,
        sex: Sex,
        age: Option<f64>,
        fare: Option<f64>,
        survived: bool,
        boat: Option<String>,
    ) -> Self {
        Self {
            pclass,
            sex,
            age,
            fare,
            survived,
            boat,
            is_child: age.map(|a| a < 18.0),
            age_bracket: age.and_then(AgeBracket::from_age),
        }
    }

    pub fn boarded_lifeboat(&self) -> bool {
        self.boat.is_some()
    }
}

/// A single categorical value of a grouping key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "dimension", content = "value", rename_all = "snake_case")]
pub enum GroupValue {
    Sex(Sex),
    Class(PassengerClass),
    AgeBracket(AgeBracket),
    Child(bool),
    Lifeboat(bool),
}

impl fmt::Display for GroupValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupValue::Sex(sex) => write!(f, "{}", sex.label()),
            GroupValue::Class(class) => write!(f, "{}", class),
            GroupValue::AgeBracket(bracket) => write!(f, "{}", bracket),
            GroupValue::Child(true) => write!(f, "Children (<18)"),
            GroupValue::Child(false) => write!(f, "Adults (>=18)"),
            GroupValue::Lifeboat(true) => write!(f, "In lifeboat"),
            GroupValue::Lifeboat(false) => write!(f, "No lifeboat"),
        }
    }
}

/// Ordered tuple of values identifying one group.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupKey(pub Vec<GroupValue>);

impl GroupKey {
    pub fn values(&self) -> &[GroupValue] {
        &self.0
    }

    /// Value at a key position, if the key has that many components.
    pub fn component(&self, index: usize) -> Option<GroupValue> {
        self.0.get(index).copied()
    }

    pub fn contains(&self, value: GroupValue) -> bool {
        self.0.contains(&value)
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let labels: Vec<String> = self.0.iter().map(|v| v.to_string()).collect();
        write!(f, "{}", labels.join(" / "))
    }
}

/// Count and survival of one group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupSummary {
    pub key: GroupKey,
    pub total: usize,
    pub survived_count: usize,
}

impl GroupSummary {
    /// Survival percentage in `[0, 100]`; `None` for an empty group.
    pub fn survival_rate(&self) -> Option<f64> {
        if self.total == 0 {
            return None;
        }
        Some(self.survived_count as f64 / self.total as f64 * 100.0)
    }
}

/// What the loader did to a value it could not take as-is.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CoercionKind {
    /// Blank `survived` was filled with "did not survive".
    MissingSurvivedFilled,
    /// Unparseable `age` was treated as missing.
    UnparseableAgeNulled { raw: String },
    /// The whole row was dropped.
    RowSkipped { reason: String },
}

/// A recoverable data anomaly found while loading.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoercionWarning {
    /// 1-indexed line in the source file (the header is line 1).
    pub line: u64,
    pub field: &'static str,
    #[serde(flatten)]
    pub kind: CoercionKind,
}

impl fmt::Display for CoercionWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            CoercionKind::MissingSurvivedFilled => {
                write!(f, "line {}: blank {} filled with 0", self.line, self.field)
            }
            CoercionKind::UnparseableAgeNulled { raw } => write!(
                f,
                "line {}: {} value {:?} is not a number, treated as missing",
                self.line, self.field, raw
            ),
            CoercionKind::RowSkipped { reason } => {
                write!(f, "line {}: row skipped ({})", self.line, reason)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_age_bracket_boundaries() {
        assert_eq!(AgeBracket::from_age(0.0), Some(AgeBracket::Child));
        assert_eq!(AgeBracket::from_age(0.17), Some(AgeBracket::Child));
        assert_eq!(AgeBracket::from_age(12.0), Some(AgeBracket::Child));
        assert_eq!(AgeBracket::from_age(12.5), Some(AgeBracket::Adolescent));
        assert_eq!(AgeBracket::from_age(18.0), Some(AgeBracket::Adolescent));
        assert_eq!(AgeBracket::from_age(35.0), Some(AgeBracket::YoungAdult));
        assert_eq!(AgeBracket::from_age(50.0), Some(AgeBracket::Adult));
        assert_eq!(AgeBracket::from_age(80.0), Some(AgeBracket::Senior));
        assert_eq!(AgeBracket::from_age(-1.0), None);
        assert_eq!(AgeBracket::from_age(f64::NAN), None);
    }

    #[test]
    fn test_record_derives_child_flag() {
        let child = PassengerRecord::new(
            PassengerClass::Third,
            Sex::Female,
            Some(17.0),
            None,
            true,
            None,
        );
        assert_eq!(child.is_child, Some(true));
        assert_eq!(child.age_bracket, Some(AgeBracket::Adolescent));

        let adult = PassengerRecord::new(
            PassengerClass::Third,
            Sex::Female,
            Some(18.0),
            None,
            true,
            None,
        );
        assert_eq!(adult.is_child, Some(false));
        assert_eq!(adult.age_bracket, Some(AgeBracket::Adolescent));

        let unknown = PassengerRecord::new(PassengerClass::First, Sex::Male, None, None, false, None);
        assert_eq!(unknown.is_child, None);
        assert_eq!(unknown.age_bracket, None);
    }

    #[test]
    fn test_group_key_ordering() {
        let a = GroupKey(vec![GroupValue::Class(PassengerClass::First), GroupValue::Sex(Sex::Male)]);
        let b = GroupKey(vec![GroupValue::Class(PassengerClass::Second), GroupValue::Sex(Sex::Female)]);
        let c = GroupKey(vec![GroupValue::Class(PassengerClass::First), GroupValue::Sex(Sex::Female)]);
        let mut keys = vec![a.clone(), b.clone(), c.clone()];
        keys.sort();
        assert_eq!(keys, vec![c, a, b]);
    }

    #[test]
    fn test_survival_rate_undefined_for_empty_group() {
        let empty = GroupSummary {
            key: GroupKey(vec![GroupValue::Sex(Sex::Male)]),
            total: 0,
            survived_count: 0,
        };
        assert_eq!(empty.survival_rate(), None);

        let half = GroupSummary {
            total: 4,
            survived_count: 2,
            ..empty
        };
        assert_eq!(half.survival_rate(), Some(50.0));
    }

    #[test]
    fn test_parse_categoricals() {
        assert_eq!(Sex::parse(" Female "), Some(Sex::Female));
        assert_eq!(Sex::parse("unknown"), None);
        assert_eq!(PassengerClass::parse("2"), Some(PassengerClass::Second));
        assert_eq!(PassengerClass::parse("4"), None);
    }

    #[test]
    fn test_group_value_labels() {
        assert_eq!(GroupValue::Sex(Sex::Female).to_string(), "Women");
        assert_eq!(GroupValue::Child(true).to_string(), "Children (<18)");
        assert_eq!(
            GroupKey(vec![
                GroupValue::Class(PassengerClass::Third),
                GroupValue::Lifeboat(false)
            ])
            .to_string(),
            "Class 3 / No lifeboat"
        );
    }
}
