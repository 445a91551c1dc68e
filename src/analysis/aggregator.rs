//! Group aggregation and survival statistics.
//!
//! This module groups passenger records by categorical keys and computes
//! per-group totals and survival counts.

use crate::models::{GroupKey, GroupSummary, GroupValue, PassengerRecord};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Maps a record to the category it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupKeySelector {
    Sex,
    Class,
    AgeBracket,
    IsChild,
    Lifeboat,
    Composite(Vec<GroupKeySelector>),
}

impl GroupKeySelector {
    /// Shorthand for a two-level composite key.
    pub fn pair(first: GroupKeySelector, second: GroupKeySelector) -> Self {
        GroupKeySelector::Composite(vec![first, second])
    }

    /// The key of `record`, or `None` if any component is undefined.
    pub fn select(&self, record: &PassengerRecord) -> Option<GroupKey> {
        let mut values = Vec::with_capacity(self.arity());
        if self.push_values(record, &mut values) {
            Some(GroupKey(values))
        } else {
            None
        }
    }

    /// Number of key components produced.
    pub fn arity(&self) -> usize {
        match self {
            GroupKeySelector::Composite(parts) => parts.iter().map(|p| p.arity()).sum(),
            _ => 1,
        }
    }

    /// Column header for each key component.
    pub fn headers(&self) -> Vec<&'static str> {
        match self {
            GroupKeySelector::Sex => vec!["Sex"],
            GroupKeySelector::Class => vec!["Class"],
            GroupKeySelector::AgeBracket => vec!["Age bracket"],
            GroupKeySelector::IsChild => vec!["Age group"],
            GroupKeySelector::Lifeboat => vec!["Lifeboat"],
            GroupKeySelector::Composite(parts) => parts.iter().flat_map(|p| p.headers()).collect(),
        }
    }

    fn push_values(&self, record: &PassengerRecord, out: &mut Vec<GroupValue>) -> bool {
        let value = match self {
            GroupKeySelector::Sex => Some(GroupValue::Sex(record.sex)),
            GroupKeySelector::Class => Some(GroupValue::Class(record.pclass)),
            GroupKeySelector::AgeBracket => record.age_bracket.map(GroupValue::AgeBracket),
            GroupKeySelector::IsChild => record.is_child.map(GroupValue::Child),
            GroupKeySelector::Lifeboat => Some(GroupValue::Lifeboat(record.boarded_lifeboat())),
            GroupKeySelector::Composite(parts) => {
                return parts.iter().all(|p| p.push_values(record, out));
            }
        };

        match value {
            Some(value) => {
                out.push(value);
                true
            }
            None => false,
        }
    }
}

impl fmt::Display for GroupKeySelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.headers().join(" x "))
    }
}

/// Group records by `selector`, ascending by key.
///
/// Records with an undefined key component are left out entirely.
pub fn aggregate(records: &[PassengerRecord], selector: &GroupKeySelector) -> Vec<GroupSummary> {
    let mut groups: BTreeMap<GroupKey, (usize, usize)> = BTreeMap::new();

    for record in records {
        let Some(key) = selector.select(record) else {
            continue;
        };

        let entry = groups.entry(key).or_insert((0, 0));
        entry.0 += 1;
        if record.survived {
            entry.1 += 1;
        }
    }

    groups
        .into_iter()
        .map(|(key, (total, survived_count))| GroupSummary {
            key,
            total,
            survived_count,
        })
        .collect()
}

/// Find the summary whose key contains every value in `values`.
pub fn find_group<'a>(summaries: &'a [GroupSummary], values: &[GroupValue]) -> Option<&'a GroupSummary> {
    summaries
        .iter()
        .find(|s| values.iter().all(|v| s.key.contains(*v)))
}

/// Whole-ship survival figures.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RescueTotals {
    pub passengers: usize,
    pub survivors: usize,
}

impl RescueTotals {
    pub fn from_records(records: &[PassengerRecord]) -> Self {
        Self {
            passengers: records.len(),
            survivors: records.iter().filter(|r| r.survived).count(),
        }
    }

    pub fn casualties(&self) -> usize {
        self.passengers - self.survivors
    }

    /// Survivor percentage; `None` with no passengers.
    pub fn rescue_rate(&self) -> Option<f64> {
        if self.passengers == 0 {
            return None;
        }
        Some(self.survivors as f64 / self.passengers as f64 * 100.0)
    }
}

/// Share of a group that boarded a lifeboat.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShareRow {
    pub group: GroupValue,
    pub in_lifeboats: usize,
    pub total: usize,
}

impl ShareRow {
    /// Lifeboat percentage; `None` for an empty group.
    pub fn share(&self) -> Option<f64> {
        if self.total == 0 {
            return None;
        }
        Some(self.in_lifeboats as f64 / self.total as f64 * 100.0)
    }
}

/// Lifeboat share per group of `selector`.
///
/// `selector` must be a single-level selector; the lifeboat dimension is
/// appended internally.
pub fn lifeboat_shares(records: &[PassengerRecord], selector: &GroupKeySelector) -> Vec<ShareRow> {
    let by_boat = aggregate(
        records,
        &GroupKeySelector::pair(selector.clone(), GroupKeySelector::Lifeboat),
    );

    let mut rows: BTreeMap<GroupValue, ShareRow> = BTreeMap::new();
    for summary in &by_boat {
        let (Some(group), Some(GroupValue::Lifeboat(boarded))) =
            (summary.key.component(0), summary.key.component(1))
        else {
            continue;
        };

        let row = rows.entry(group).or_insert(ShareRow {
            group,
            in_lifeboats: 0,
            total: 0,
        });
        row.total += summary.total;
        if boarded {
            row.in_lifeboats += summary.total;
        }
    }

    rows.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AgeBracket, PassengerClass, Sex};

    fn passenger(class: PassengerClass, sex: Sex, age: Option<f64>, survived: bool) -> PassengerRecord {
        PassengerRecord::new(class, sex, age, Some(10.0), survived, None)
    }

    fn four_passengers() -> Vec<PassengerRecord> {
        vec![
            passenger(PassengerClass::First, Sex::Female, Some(30.0), true),
            passenger(PassengerClass::Third, Sex::Female, Some(8.0), false),
            passenger(PassengerClass::Second, Sex::Male, None, false),
            passenger(PassengerClass::Third, Sex::Male, Some(45.0), false),
        ]
    }

    #[test]
    fn test_aggregate_by_sex() {
        let summaries = aggregate(&four_passengers(), &GroupKeySelector::Sex);

        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].key, GroupKey(vec![GroupValue::Sex(Sex::Female)]));
        assert_eq!(summaries[0].total, 2);
        assert_eq!(summaries[0].survival_rate(), Some(50.0));
        assert_eq!(summaries[1].key, GroupKey(vec![GroupValue::Sex(Sex::Male)]));
        assert_eq!(summaries[1].total, 2);
        assert_eq!(summaries[1].survival_rate(), Some(0.0));
    }

    #[test]
    fn test_missing_age_excluded_only_from_age_groupings() {
        let records = four_passengers();

        let by_child: usize = aggregate(&records, &GroupKeySelector::IsChild)
            .iter()
            .map(|s| s.total)
            .sum();
        let by_bracket: usize = aggregate(&records, &GroupKeySelector::AgeBracket)
            .iter()
            .map(|s| s.total)
            .sum();
        let by_class: usize = aggregate(&records, &GroupKeySelector::Class)
            .iter()
            .map(|s| s.total)
            .sum();
        let by_class_child: usize = aggregate(
            &records,
            &GroupKeySelector::pair(GroupKeySelector::Class, GroupKeySelector::IsChild),
        )
        .iter()
        .map(|s| s.total)
        .sum();

        assert_eq!(by_child, 3);
        assert_eq!(by_bracket, 3);
        assert_eq!(by_class, 4);
        assert_eq!(by_class_child, 3);
    }

    #[test]
    fn test_partition_totals_and_counts_are_consistent() {
        let records = four_passengers();
        let selectors = [
            GroupKeySelector::Sex,
            GroupKeySelector::Class,
            GroupKeySelector::AgeBracket,
            GroupKeySelector::pair(GroupKeySelector::Class, GroupKeySelector::Sex),
            GroupKeySelector::pair(GroupKeySelector::AgeBracket, GroupKeySelector::Sex),
        ];

        for selector in &selectors {
            let summaries = aggregate(&records, selector);
            let defined = records.iter().filter(|r| selector.select(r).is_some()).count();
            let total: usize = summaries.iter().map(|s| s.total).sum();

            assert_eq!(total, defined, "partition total for {}", selector);
            for summary in &summaries {
                assert!(summary.survived_count <= summary.total);
                assert_eq!(summary.key.values().len(), selector.arity());
            }
        }
    }

    #[test]
    fn test_composite_keys_are_sorted() {
        let summaries = aggregate(
            &four_passengers(),
            &GroupKeySelector::pair(GroupKeySelector::Class, GroupKeySelector::Sex),
        );
        let keys: Vec<GroupKey> = summaries.into_iter().map(|s| s.key).collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
        assert_eq!(
            keys[0],
            GroupKey(vec![
                GroupValue::Class(PassengerClass::First),
                GroupValue::Sex(Sex::Female)
            ])
        );
    }

    #[test]
    fn test_empty_input_yields_no_groups() {
        assert!(aggregate(&[], &GroupKeySelector::Sex).is_empty());

        let no_ages = vec![passenger(PassengerClass::First, Sex::Male, None, true)];
        assert!(aggregate(&no_ages, &GroupKeySelector::AgeBracket).is_empty());
    }

    #[test]
    fn test_find_group() {
        let summaries = aggregate(
            &four_passengers(),
            &GroupKeySelector::pair(GroupKeySelector::Class, GroupKeySelector::Sex),
        );

        let third_male = find_group(
            &summaries,
            &[
                GroupValue::Class(PassengerClass::Third),
                GroupValue::Sex(Sex::Male),
            ],
        )
        .unwrap();
        assert_eq!(third_male.total, 1);

        assert!(find_group(
            &summaries,
            &[GroupValue::AgeBracket(AgeBracket::Senior)]
        )
        .is_none());
    }

    #[test]
    fn test_lifeboat_shares() {
        let mut records = four_passengers();
        records[0].boat = Some("4".to_string());

        let shares = lifeboat_shares(&records, &GroupKeySelector::Sex);
        assert_eq!(shares.len(), 2);
        assert_eq!(shares[0].group, GroupValue::Sex(Sex::Female));
        assert_eq!(shares[0].in_lifeboats, 1);
        assert_eq!(shares[0].total, 2);
        assert_eq!(shares[0].share(), Some(50.0));
        assert_eq!(shares[1].share(), Some(0.0));
    }

    #[test]
    fn test_rescue_totals() {
        let totals = RescueTotals::from_records(&four_passengers());
        assert_eq!(totals.passengers, 4);
        assert_eq!(totals.survivors, 1);
        assert_eq!(totals.casualties(), 3);
        assert_eq!(totals.rescue_rate(), Some(25.0));
        assert_eq!(RescueTotals::from_records(&[]).rescue_rate(), None);
    }
}
