//! Chart construction.
//!
//! [`ChartBuilder`] turns group summaries into annotated [`Figure`]s. Style is
//! fixed when the builder is created and copied into every figure, so a
//! figure never depends on anything outside itself.

pub mod figure;
pub mod layout;

pub use figure::{BarChart, BarSeries, Figure, FigureBody, PieChart, PieSlice, Rgb};

use crate::models::{GroupSummary, GroupValue};
use anyhow::{bail, Result};

/// Immutable chart styling shared by every figure of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartStyleConfig {
    /// Page/image width in points (= pixels for PNG).
    pub width: u32,
    pub height: u32,
    /// Plot area background.
    pub background: Rgb,
    pub palette: Vec<Rgb>,
    pub title_size: f32,
    pub label_size: f32,
    pub annotation_size: f32,
}

impl Default for ChartStyleConfig {
    fn default() -> Self {
        Self {
            width: 864,
            height: 576,
            background: Rgb(0xf0, 0xf0, 0xf0),
            palette: vec![
                Rgb(0x34, 0x98, 0xdb),
                Rgb(0xe7, 0x4c, 0x3c),
                Rgb(0x2e, 0xcc, 0x71),
                Rgb(0xf3, 0x9c, 0x12),
                Rgb(0x9b, 0x59, 0xb6),
            ],
            title_size: 20.0,
            label_size: 14.0,
            annotation_size: 12.0,
        }
    }
}

impl ChartStyleConfig {
    /// Palette entry `index`, wrapping around.
    pub fn color(&self, index: usize) -> Rgb {
        if self.palette.is_empty() {
            return Rgb::GRAY;
        }
        self.palette[index % self.palette.len()]
    }
}

impl TryFrom<&crate::config::StyleConfig> for ChartStyleConfig {
    type Error = anyhow::Error;

    fn try_from(config: &crate::config::StyleConfig) -> Result<Self> {
        if config.width < 200 || config.height < 150 {
            bail!(
                "figure size {}x{} is too small (minimum 200x150)",
                config.width,
                config.height
            );
        }
        if config.palette.is_empty() {
            bail!("style palette must contain at least one color");
        }

        Ok(Self {
            width: config.width,
            height: config.height,
            background: config.background.parse()?,
            palette: config
                .palette
                .iter()
                .map(|c| c.parse())
                .collect::<Result<Vec<Rgb>>>()?,
            title_size: config.title_size,
            label_size: config.label_size,
            annotation_size: config.annotation_size,
        })
    }
}

/// Titles and labels of a bar chart.
#[derive(Debug, Clone)]
pub struct BarSpec {
    pub slug: String,
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub legend_title: Option<String>,
    /// First palette entry used.
    pub palette_offset: usize,
}

impl BarSpec {
    pub fn new(slug: &str, title: &str, x_label: &str) -> Self {
        Self {
            slug: slug.to_string(),
            title: title.to_string(),
            x_label: x_label.to_string(),
            y_label: "Survival rate (%)".to_string(),
            legend_title: None,
            palette_offset: 0,
        }
    }

    pub fn y_label(mut self, label: &str) -> Self {
        self.y_label = label.to_string();
        self
    }

    pub fn legend(mut self, title: &str) -> Self {
        self.legend_title = Some(title.to_string());
        self
    }

    pub fn palette_offset(mut self, offset: usize) -> Self {
        self.palette_offset = offset;
        self
    }
}

/// Builds figures with a fixed style.
#[derive(Debug, Clone)]
pub struct ChartBuilder {
    style: ChartStyleConfig,
}

impl ChartBuilder {
    pub fn new(style: ChartStyleConfig) -> Self {
        Self { style }
    }

    /// One bar per group, height = survival rate.
    pub fn bar(&self, spec: BarSpec, summaries: &[GroupSummary]) -> Figure {
        let points: Vec<(String, Option<f64>)> = summaries
            .iter()
            .map(|s| (s.key.to_string(), s.survival_rate()))
            .collect();
        self.bar_from_points(spec, &points)
    }

    /// One bar per labeled value. Each bar takes the next palette color.
    pub fn bar_from_points(&self, spec: BarSpec, points: &[(String, Option<f64>)]) -> Figure {
        let colors = (0..points.len())
            .map(|i| self.style.color(spec.palette_offset + i))
            .collect();

        let chart = BarChart {
            x_label: spec.x_label,
            y_label: spec.y_label,
            categories: points.iter().map(|(label, _)| label.clone()).collect(),
            series: vec![BarSeries {
                name: spec.title.clone(),
                colors,
                values: points.iter().map(|(_, value)| *value).collect(),
            }],
            legend_title: spec.legend_title,
        };

        self.figure(spec.slug, spec.title, FigureBody::Bars(chart))
    }

    /// Pivot a composite summary into grouped bars.
    ///
    /// Key component `category_dim` picks the x-axis group and `series_dim`
    /// the bar within the group. Combinations that were never observed are
    /// left as gaps.
    pub fn grouped_bar(
        &self,
        spec: BarSpec,
        summaries: &[GroupSummary],
        category_dim: usize,
        series_dim: usize,
    ) -> Figure {
        let mut categories: Vec<GroupValue> = Vec::new();
        let mut series_keys: Vec<GroupValue> = Vec::new();

        for summary in summaries {
            if let Some(value) = summary.key.component(category_dim) {
                if !categories.contains(&value) {
                    categories.push(value);
                }
            }
            if let Some(value) = summary.key.component(series_dim) {
                if !series_keys.contains(&value) {
                    series_keys.push(value);
                }
            }
        }
        categories.sort();
        series_keys.sort();

        let series = series_keys
            .iter()
            .enumerate()
            .map(|(i, series_value)| {
                let values: Vec<Option<f64>> = categories
                    .iter()
                    .map(|category| {
                        summaries
                            .iter()
                            .find(|s| {
                                s.key.component(category_dim) == Some(*category)
                                    && s.key.component(series_dim) == Some(*series_value)
                            })
                            .and_then(GroupSummary::survival_rate)
                    })
                    .collect();
                let color = self.style.color(spec.palette_offset + i);
                BarSeries {
                    name: series_value.to_string(),
                    colors: vec![color; values.len()],
                    values,
                }
            })
            .collect();

        let legend_title = spec.legend_title.or_else(|| Some(String::new()));
        let chart = BarChart {
            x_label: spec.x_label,
            y_label: spec.y_label,
            categories: categories.iter().map(|c| c.to_string()).collect(),
            series,
            legend_title,
        };

        self.figure(spec.slug, spec.title, FigureBody::Bars(chart))
    }

    /// Pie of labeled counts; the first slice is pulled out.
    pub fn pie(&self, slug: &str, title: &str, slices: &[(String, f64)], palette_offset: usize) -> Figure {
        let slices = slices
            .iter()
            .enumerate()
            .map(|(i, (label, value))| PieSlice {
                label: label.clone(),
                value: value.max(0.0),
                color: self.style.color(palette_offset + i),
                exploded: i == 0,
            })
            .collect();

        self.figure(
            slug.to_string(),
            title.to_string(),
            FigureBody::Pie(PieChart { slices }),
        )
    }

    fn figure(&self, slug: String, title: String, body: FigureBody) -> Figure {
        Figure {
            slug,
            title,
            body,
            style: self.style.clone(),
        }
    }
}
