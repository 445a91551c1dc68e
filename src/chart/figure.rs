//! Backend-neutral figure model.

use anyhow::{bail, Context, Result};
use std::fmt;
use std::str::FromStr;

use super::ChartStyleConfig;

/// An sRGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const BLACK: Rgb = Rgb(0, 0, 0);
    pub const WHITE: Rgb = Rgb(255, 255, 255);
    pub const GRAY: Rgb = Rgb(128, 128, 128);

    /// Components scaled to `[0, 1]`.
    pub fn unit(&self) -> (f32, f32, f32) {
        (
            f32::from(self.0) / 255.0,
            f32::from(self.1) / 255.0,
            f32::from(self.2) / 255.0,
        )
    }
}

impl FromStr for Rgb {
    type Err = anyhow::Error;

    /// Parse `#rrggbb`.
    fn from_str(s: &str) -> Result<Self> {
        let hex = s.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.is_ascii() {
            bail!("invalid color {:?}: expected #rrggbb", s);
        }
        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&hex[range], 16).with_context(|| format!("invalid color {:?}", s))
        };
        Ok(Rgb(channel(0..2)?, channel(2..4)?, channel(4..6)?))
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.0, self.1, self.2)
    }
}

/// One series of bars. `values[i]` belongs to category `i`; `None` leaves a gap.
#[derive(Debug, Clone, PartialEq)]
pub struct BarSeries {
    pub name: String,
    /// One color per value.
    pub colors: Vec<Rgb>,
    pub values: Vec<Option<f64>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BarChart {
    pub x_label: String,
    pub y_label: String,
    pub categories: Vec<String>,
    pub series: Vec<BarSeries>,
    /// Shown when present; grouped charts always carry one.
    pub legend_title: Option<String>,
}

impl BarChart {
    /// Largest plotted value, 0 when empty.
    pub fn max_value(&self) -> f64 {
        self.series
            .iter()
            .flat_map(|s| s.values.iter().flatten())
            .fold(0.0, |acc: f64, v| acc.max(*v))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PieSlice {
    pub label: String,
    pub value: f64,
    pub color: Rgb,
    /// Pulled out of the pie.
    pub exploded: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PieChart {
    pub slices: Vec<PieSlice>,
}

impl PieChart {
    pub fn total(&self) -> f64 {
        self.slices.iter().map(|s| s.value).sum()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FigureBody {
    Bars(BarChart),
    Pie(PieChart),
}

/// A self-contained chart: content plus the style it was built with.
#[derive(Debug, Clone, PartialEq)]
pub struct Figure {
    /// File-name friendly topic, e.g. `survival_by_sex`.
    pub slug: String,
    pub title: String,
    pub body: FigureBody,
    pub style: ChartStyleConfig,
}

#[cfg(test)]
impl Figure {
    /// Every annotation printed on the figure, in drawing order.
    pub fn annotations(&self) -> Vec<String> {
        match &self.body {
            FigureBody::Bars(chart) => chart
                .series
                .iter()
                .flat_map(|s| s.values.iter().flatten())
                .map(|v| format_percent(*v))
                .collect(),
            FigureBody::Pie(pie) => {
                let total = pie.total();
                if total <= 0.0 {
                    return Vec::new();
                }
                pie.slices
                    .iter()
                    .map(|s| format_percent(s.value / total * 100.0))
                    .collect()
            }
        }
    }
}

/// Percentage label with one decimal place.
pub fn format_percent(value: f64) -> String {
    format!("{:.1}%", value)
}
