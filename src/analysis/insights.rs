//! Comparative conclusions drawn from group summaries.
//!
//! Everything here is a pure function of the aggregated tables. Ratios with
//! an empty or zero-survival denominator are reported as undefined rather
//! than printed as infinity or NaN.

use crate::analysis::aggregator::{find_group, RescueTotals, ShareRow};
use crate::models::{AgeBracket, GroupSummary, GroupValue, PassengerClass, Sex};
use serde::Serialize;
use std::fmt;

/// Class 1 vs class 3 gap, in percentage points, above which class is
/// considered to have had a significant impact on survival.
pub const CLASS_GAP_THRESHOLD_PP: f64 = 20.0;

/// Outcome of dividing one rate by another.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum Ratio {
    Defined(f64),
    Undefined(&'static str),
}

impl fmt::Display for Ratio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ratio::Defined(v) => write!(f, "{:.1}x", v),
            Ratio::Undefined(reason) => write!(f, "undefined ({})", reason),
        }
    }
}

/// Survival-rate ratio of two groups.
///
/// Undefined when either group is empty or the denominator has no survivors.
pub fn rate_ratio(numerator: &GroupSummary, denominator: &GroupSummary) -> Ratio {
    if denominator.total == 0 || numerator.total == 0 {
        return Ratio::Undefined("empty group");
    }
    if denominator.survived_count == 0 {
        return Ratio::Undefined("no survivors in comparison group");
    }
    ratio_of_rates(numerator.survival_rate(), denominator.survival_rate())
}

/// Ratio of two already-computed rates.
pub fn ratio_of_rates(numerator: Option<f64>, denominator: Option<f64>) -> Ratio {
    match (numerator, denominator) {
        (Some(n), Some(d)) if d > 0.0 && n.is_finite() && d.is_finite() => Ratio::Defined(n / d),
        (Some(_), Some(_)) => Ratio::Undefined("zero survival rate in comparison group"),
        _ => Ratio::Undefined("no data"),
    }
}

/// Format a percentage with one decimal, or `undefined`.
pub fn format_rate(rate: Option<f64>) -> String {
    match rate {
        Some(rate) if rate.is_finite() => format!("{:.1}%", rate),
        _ => "undefined".to_string(),
    }
}

/// A headed block of conclusions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Insight {
    pub heading: String,
    pub statements: Vec<String>,
}

impl Insight {
    fn new(heading: impl Into<String>) -> Self {
        Self {
            heading: heading.into(),
            statements: Vec::new(),
        }
    }

    fn say(&mut self, statement: impl Into<String>) {
        self.statements.push(statement.into());
    }
}

fn mean(values: impl IntoIterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values
        .into_iter()
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}

fn rate_of(summaries: &[GroupSummary], values: &[GroupValue]) -> Option<f64> {
    find_group(summaries, values).and_then(GroupSummary::survival_rate)
}

fn class_sex_rate(by_class_sex: &[GroupSummary], class: PassengerClass, sex: Sex) -> Option<f64> {
    rate_of(by_class_sex, &[GroupValue::Class(class), GroupValue::Sex(sex)])
}

/// `Some(true)` when women out-survived men in every class with data for
/// both sexes; `None` when no class has data for both.
fn women_ahead_in_every_class(by_class_sex: &[GroupSummary]) -> Option<bool> {
    let mut compared = 0;
    for class in PassengerClass::ALL {
        let women = class_sex_rate(by_class_sex, class, Sex::Female);
        let men = class_sex_rate(by_class_sex, class, Sex::Male);
        match (women, men) {
            (Some(w), Some(m)) => {
                compared += 1;
                if w <= m {
                    return Some(false);
                }
            }
            _ => continue,
        }
    }
    (compared > 0).then_some(true)
}

/// Mean of the two sexes' rates in class 1 minus the same in class 3.
fn class_gap(by_class_sex: &[GroupSummary]) -> Option<f64> {
    let class_mean = |class| {
        mean(
            [Sex::Female, Sex::Male]
                .into_iter()
                .filter_map(|sex| class_sex_rate(by_class_sex, class, sex)),
        )
    };
    Some(class_mean(PassengerClass::First)? - class_mean(PassengerClass::Third)?)
}

/// Conclusions of the survival study.
///
/// `by_sex` is keyed by sex, `by_child` by the child flag and
/// `by_class_sex` by class then sex.
pub fn survival_conclusions(
    by_sex: &[GroupSummary],
    by_child: &[GroupSummary],
    by_class_sex: &[GroupSummary],
    class_gap_threshold: f64,
) -> Vec<Insight> {
    let mut insights = Vec::new();

    let women = find_group(by_sex, &[GroupValue::Sex(Sex::Female)]);
    let men = find_group(by_sex, &[GroupValue::Sex(Sex::Male)]);
    let women_rate = women.and_then(GroupSummary::survival_rate);
    let men_rate = men.and_then(GroupSummary::survival_rate);

    let mut sex = Insight::new("Survival rate by sex");
    sex.say(format!("Women: {}", format_rate(women_rate)));
    sex.say(format!("Men: {}", format_rate(men_rate)));
    let sex_ratio = match (women, men) {
        (Some(w), Some(m)) => rate_ratio(w, m),
        _ => Ratio::Undefined("no data"),
    };
    sex.say(match sex_ratio {
        Ratio::Defined(_) => format!("Women were {} as likely to survive as men", sex_ratio),
        Ratio::Undefined(_) => format!("Women/men survival ratio: {}", sex_ratio),
    });
    insights.push(sex);

    let children = find_group(by_child, &[GroupValue::Child(true)]);
    let adults = find_group(by_child, &[GroupValue::Child(false)]);
    let children_rate = children.and_then(GroupSummary::survival_rate);
    let adults_rate = adults.and_then(GroupSummary::survival_rate);

    let mut age = Insight::new("Survival rate by age");
    age.say(format!("Children (<18): {}", format_rate(children_rate)));
    age.say(format!("Adults (>=18): {}", format_rate(adults_rate)));
    let age_ratio = match (children, adults) {
        (Some(c), Some(a)) => rate_ratio(c, a),
        _ => Ratio::Undefined("no data"),
    };
    age.say(match age_ratio {
        Ratio::Defined(_) => format!("Children were {} as likely to survive as adults", age_ratio),
        Ratio::Undefined(_) => format!("Children/adults survival ratio: {}", age_ratio),
    });
    insights.push(age);

    let mut by_class = Insight::new("Survival rate by class and sex");
    for class in PassengerClass::ALL {
        by_class.say(format!(
            "{}: women {}, men {}",
            class,
            format_rate(class_sex_rate(by_class_sex, class, Sex::Female)),
            format_rate(class_sex_rate(by_class_sex, class, Sex::Male)),
        ));
    }
    insights.push(by_class);

    let women_everywhere = women_ahead_in_every_class(by_class_sex);
    let children_ahead = matches!((children_rate, adults_rate), (Some(c), Some(a)) if c > a);

    let mut law = Insight::new("Law of the Sea (women and children first)");
    law.say(match women_everywhere {
        Some(true) => "Women had a higher survival rate than men in every class",
        Some(false) => "No consistent evidence that women were prioritized in every class",
        None => "Not enough data to compare women and men within classes",
    });
    law.say(if children_ahead {
        "Children had a higher survival rate than adults"
    } else {
        "No evidence that children were prioritized over adults"
    });
    insights.push(law);

    let women_ahead = matches!((women_rate, men_rate), (Some(w), Some(m)) if w > m);
    let gap = class_gap(by_class_sex);

    let mut verdict = Insight::new("Conclusion");
    verdict.say(if women_ahead {
        "Women had clear priority over men"
    } else {
        "Women did not have priority over men"
    });
    match gap {
        Some(gap) if gap > class_gap_threshold => verdict.say(format!(
            "Socioeconomic status (class) significantly influenced survival ({:.1} percentage points between class 1 and class 3)",
            gap
        )),
        Some(gap) => verdict.say(format!(
            "Class had a limited influence on survival ({:.1} percentage points between class 1 and class 3)",
            gap
        )),
        None => verdict.say("Class influence could not be assessed"),
    }
    verdict.say(if women_ahead && children_ahead {
        "The claim that the crew followed the Law of the Sea is partially supported"
    } else {
        "The claim that the crew followed the Law of the Sea is not supported"
    });
    insights.push(verdict);

    insights
}

/// Conclusions of the Law of the Sea study.
///
/// `by_class_sex` is keyed by class then sex, `by_bracket` by age bracket and
/// `lifeboats` holds lifeboat shares by sex.
pub fn law_of_the_sea_conclusions(
    by_class_sex: &[GroupSummary],
    by_bracket: &[GroupSummary],
    lifeboats: &[ShareRow],
    totals: &RescueTotals,
    class_gap_threshold: f64,
) -> Vec<Insight> {
    let mut insights = Vec::new();

    let mut capacity = Insight::new("Rescue capacity");
    capacity.say(format!("Total passengers: {}", totals.passengers));
    capacity.say(format!("Total survivors: {}", totals.survivors));
    capacity.say(format!("Rescue rate: {}", format_rate(totals.rescue_rate())));
    insights.push(capacity);

    let women_mean = mean(
        PassengerClass::ALL
            .into_iter()
            .filter_map(|class| class_sex_rate(by_class_sex, class, Sex::Female)),
    );
    let men_mean = mean(
        PassengerClass::ALL
            .into_iter()
            .filter_map(|class| class_sex_rate(by_class_sex, class, Sex::Male)),
    );
    let women_ahead = matches!((women_mean, men_mean), (Some(w), Some(m)) if w > m);

    let mut women = Insight::new("Priority for women");
    women.say(format!(
        "Mean survival rate of women across classes: {}",
        format_rate(women_mean)
    ));
    women.say(format!(
        "Mean survival rate of men across classes: {}",
        format_rate(men_mean)
    ));
    if women_ahead {
        let ratio = ratio_of_rates(women_mean, men_mean);
        women.say(match ratio {
            Ratio::Defined(_) => format!("Women were {} as likely to survive as men", ratio),
            Ratio::Undefined(_) => format!("Women/men survival ratio: {}", ratio),
        });
        women.say("There is clear evidence of priority for women");
    } else {
        women.say("There is no evidence of priority for women");
    }
    insights.push(women);

    let bracket_rate = |bracket: AgeBracket| rate_of(by_bracket, &[GroupValue::AgeBracket(bracket)]);
    let minors_mean = mean(
        AgeBracket::ALL
            .into_iter()
            .filter(AgeBracket::is_minor)
            .filter_map(bracket_rate),
    );
    let adults_mean = mean(
        AgeBracket::ALL
            .into_iter()
            .filter(|b| !b.is_minor())
            .filter_map(bracket_rate),
    );
    let children_ahead = matches!((minors_mean, adults_mean), (Some(c), Some(a)) if c > a);

    let mut children = Insight::new("Priority for children");
    children.say(format!(
        "Mean survival rate of children and adolescents: {}",
        format_rate(minors_mean)
    ));
    children.say(format!(
        "Mean survival rate of adults: {}",
        format_rate(adults_mean)
    ));
    if children_ahead {
        let ratio = ratio_of_rates(minors_mean, adults_mean);
        children.say(match ratio {
            Ratio::Defined(_) => format!("Children were {} as likely to survive as adults", ratio),
            Ratio::Undefined(_) => format!("Children/adults survival ratio: {}", ratio),
        });
        children.say("There is evidence of priority for children");
    } else {
        children.say("There is no consistent evidence of priority for children");
    }
    insights.push(children);

    let mut classes = Insight::new("Consistency across socioeconomic classes");
    for class in PassengerClass::ALL {
        let w = class_sex_rate(by_class_sex, class, Sex::Female);
        let m = class_sex_rate(by_class_sex, class, Sex::Male);
        let difference = match (w, m) {
            (Some(w), Some(m)) => format!("{:.1} percentage points", w - m),
            _ => "undefined".to_string(),
        };
        classes.say(format!(
            "{}: women {}, men {}, difference {}",
            class,
            format_rate(w),
            format_rate(m),
            difference
        ));
    }
    insights.push(classes);

    let share_of = |sex: Sex| {
        lifeboats
            .iter()
            .find(|row| row.group == GroupValue::Sex(sex))
            .and_then(ShareRow::share)
    };
    let mut boats = Insight::new("Access to lifeboats");
    boats.say(format!(
        "Share of women who reached a lifeboat: {}",
        format_rate(share_of(Sex::Female))
    ));
    boats.say(format!(
        "Share of men who reached a lifeboat: {}",
        format_rate(share_of(Sex::Male))
    ));
    insights.push(boats);

    let gap = class_gap(by_class_sex);
    let class_matters = matches!(gap, Some(gap) if gap > class_gap_threshold);

    let mut verdict = Insight::new("Conclusion");
    verdict.say(
        if women_ahead && women_ahead_in_every_class(by_class_sex) == Some(true) {
            "The crew prioritized the rescue of women in every class"
        } else {
            "Priority for women was not consistent across classes"
        },
    );
    verdict.say(if children_ahead {
        "Children had priority over adults"
    } else {
        "There is no consistent evidence of priority for children"
    });
    if let (true, Some(gap)) = (class_matters, gap) {
        verdict.say(format!(
            "Social class had a significant impact on survival ({:.1} percentage points between class 1 and class 3)",
            gap
        ));
        verdict.say("The Law of the Sea appears to have been applied unequally across social classes");
    }
    verdict.say(if women_ahead && children_ahead {
        "The claim that the crew followed the Law of the Sea is partially true: women and children were more likely to survive"
    } else {
        "The claim that the crew followed the Law of the Sea is not entirely accurate"
    });
    verdict.say(if class_matters {
        "Its application was significantly influenced by socioeconomic class"
    } else {
        "Priority for children was not applied consistently in all circumstances"
    });
    insights.push(verdict);

    insights
}
