//! Figure layout.
//!
//! Converts a [`Figure`] into drawing primitives in a top-left origin
//! coordinate space (points for PDF, pixels for PNG). Both output backends
//! draw the same [`Scene`], so PDF pages and PNG fallbacks look alike.

use super::figure::{format_percent, BarChart, Figure, FigureBody, PieChart, Rgb};
use std::f32::consts::PI;

/// Horizontal text alignment relative to the anchor point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    Start,
    Middle,
    End,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    Rect {
        x: f32,
        y: f32,
        w: f32,
        h: f32,
        fill: Rgb,
    },
    Polygon {
        points: Vec<(f32, f32)>,
        fill: Rgb,
    },
    Line {
        from: (f32, f32),
        to: (f32, f32),
        color: Rgb,
        width: f32,
    },
    /// `y` is the text baseline.
    Text {
        x: f32,
        y: f32,
        text: String,
        size: f32,
        anchor: Anchor,
        color: Rgb,
    },
}

/// Everything needed to draw one figure.
#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    pub width: u32,
    pub height: u32,
    pub primitives: Vec<Primitive>,
}

#[cfg(test)]
impl Scene {
    /// Text of every text primitive, in drawing order.
    pub fn texts(&self) -> Vec<&str> {
        self.primitives
            .iter()
            .filter_map(|p| match p {
                Primitive::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }
}

/// Approximate rendered width of `text` in a Helvetica-like face.
pub fn text_width(text: &str, size: f32) -> f32 {
    text.chars().count() as f32 * size * 0.5
}

const MIN_LABEL_SCALE: f32 = 0.6;

/// Fit a category label into `max_width`.
///
/// A label that is too wide is split at the space closest to its middle,
/// then shrunk (down to `MIN_LABEL_SCALE` of `size`) until the widest line
/// fits.
fn fit_label(text: &str, size: f32, max_width: f32) -> (Vec<String>, f32) {
    if text_width(text, size) <= max_width {
        return (vec![text.to_string()], size);
    }

    let middle = text.chars().count() / 2;
    let split = text
        .char_indices()
        .filter(|(_, c)| *c == ' ')
        .map(|(i, _)| i)
        .min_by_key(|i| text[..*i].chars().count().abs_diff(middle));
    let lines = match split {
        Some(i) => vec![text[..i].to_string(), text[i + 1..].to_string()],
        None => vec![text.to_string()],
    };

    let widest = lines
        .iter()
        .map(|line| text_width(line, size))
        .fold(0.0, f32::max);
    let size = if widest > max_width {
        (size * max_width / widest).max(size * MIN_LABEL_SCALE)
    } else {
        size
    };
    (lines, size)
}

const MARGIN_LEFT: f32 = 80.0;
const MARGIN_RIGHT: f32 = 40.0;
const MARGIN_TOP: f32 = 80.0;
const MARGIN_BOTTOM: f32 = 90.0;
const LEGEND_WIDTH: f32 = 180.0;
const PIE_SEGMENTS: f32 = 120.0;

/// Lay out a figure.
pub fn layout(figure: &Figure) -> Scene {
    let style = &figure.style;
    let width = style.width as f32;
    let mut primitives = vec![
        Primitive::Rect {
            x: 0.0,
            y: 0.0,
            w: width,
            h: style.height as f32,
            fill: Rgb::WHITE,
        },
        Primitive::Text {
            x: width / 2.0,
            y: MARGIN_TOP / 2.0,
            text: figure.title.clone(),
            size: style.title_size,
            anchor: Anchor::Middle,
            color: Rgb::BLACK,
        },
    ];

    match &figure.body {
        FigureBody::Bars(chart) => layout_bars(figure, chart, &mut primitives),
        FigureBody::Pie(pie) => layout_pie(figure, pie, &mut primitives),
    }

    Scene {
        width: style.width,
        height: style.height,
        primitives,
    }
}

/// Upper end of the value axis and the tick step.
fn value_axis(max_value: f64) -> (f64, f64) {
    let padded = (max_value * 1.15 / 10.0).ceil() * 10.0;
    let top = padded.max(10.0);
    let step = if top <= 50.0 { 10.0 } else { 20.0 };
    (top, step)
}

fn layout_bars(figure: &Figure, chart: &BarChart, out: &mut Vec<Primitive>) {
    let style = &figure.style;
    let (width, height) = (style.width as f32, style.height as f32);

    let legend_width = if chart.legend_title.is_some() { LEGEND_WIDTH } else { 0.0 };
    let left = MARGIN_LEFT;
    let right = width - MARGIN_RIGHT - legend_width;
    let top = MARGIN_TOP;
    let bottom = height - MARGIN_BOTTOM;
    let plot_w = (right - left).max(1.0);
    let plot_h = (bottom - top).max(1.0);

    out.push(Primitive::Rect {
        x: left,
        y: top,
        w: plot_w,
        h: plot_h,
        fill: style.background,
    });

    let (axis_top, step) = value_axis(chart.max_value());
    let to_y = |value: f64| bottom - (value / axis_top) as f32 * plot_h;

    let mut tick = 0.0;
    while tick <= axis_top + f64::EPSILON {
        let y = to_y(tick);
        out.push(Primitive::Line {
            from: (left, y),
            to: (right, y),
            color: Rgb::WHITE,
            width: 1.0,
        });
        out.push(Primitive::Text {
            x: left - 8.0,
            y: y + style.label_size * 0.35,
            text: format!("{}", tick),
            size: style.label_size,
            anchor: Anchor::End,
            color: Rgb::BLACK,
        });
        tick += step;
    }

    out.push(Primitive::Text {
        x: left,
        y: top - 12.0,
        text: chart.y_label.clone(),
        size: style.label_size,
        anchor: Anchor::Start,
        color: Rgb::BLACK,
    });
    out.push(Primitive::Text {
        x: left + plot_w / 2.0,
        y: height - 24.0,
        text: chart.x_label.clone(),
        size: style.label_size,
        anchor: Anchor::Middle,
        color: Rgb::BLACK,
    });

    let categories = chart.categories.len().max(1) as f32;
    let group_w = plot_w / categories;
    let series_count = chart.series.len().max(1) as f32;
    let bar_w = group_w * 0.8 / series_count;

    for (c, category) in chart.categories.iter().enumerate() {
        let group_x = left + group_w * c as f32;
        let (lines, size) = fit_label(category, style.label_size, group_w * 0.95);
        let mut y = bottom + size + 8.0;
        for line in lines {
            out.push(Primitive::Text {
                x: group_x + group_w / 2.0,
                y,
                text: line,
                size,
                anchor: Anchor::Middle,
                color: Rgb::BLACK,
            });
            y += size * 1.2;
        }

        for (s, series) in chart.series.iter().enumerate() {
            let Some(Some(value)) = series.values.get(c).copied() else {
                continue;
            };
            let x = group_x + group_w * 0.1 + bar_w * s as f32;
            let y = to_y(value);
            out.push(Primitive::Rect {
                x,
                y,
                w: bar_w,
                h: bottom - y,
                fill: series.colors.get(c).copied().unwrap_or(Rgb::GRAY),
            });
            out.push(Primitive::Text {
                x: x + bar_w / 2.0,
                y: y - 4.0,
                text: format_percent(value),
                size: style.annotation_size,
                anchor: Anchor::Middle,
                color: Rgb::BLACK,
            });
        }
    }

    out.push(Primitive::Line {
        from: (left, bottom),
        to: (right, bottom),
        color: Rgb::BLACK,
        width: 1.0,
    });

    if let Some(legend_title) = &chart.legend_title {
        let x = right + 24.0;
        let mut y = top + style.label_size;
        if !legend_title.is_empty() {
            out.push(Primitive::Text {
                x,
                y,
                text: legend_title.clone(),
                size: style.label_size,
                anchor: Anchor::Start,
                color: Rgb::BLACK,
            });
            y += style.label_size * 1.6;
        }
        for series in &chart.series {
            let swatch = style.label_size;
            out.push(Primitive::Rect {
                x,
                y: y - swatch,
                w: swatch,
                h: swatch,
                fill: series.colors.first().copied().unwrap_or(Rgb::GRAY),
            });
            out.push(Primitive::Text {
                x: x + swatch + 8.0,
                y: y - 2.0,
                text: series.name.clone(),
                size: style.label_size,
                anchor: Anchor::Start,
                color: Rgb::BLACK,
            });
            y += style.label_size * 1.6;
        }
    }
}

fn layout_pie(figure: &Figure, pie: &PieChart, out: &mut Vec<Primitive>) {
    let style = &figure.style;
    let (width, height) = (style.width as f32, style.height as f32);
    let cx = width / 2.0;
    let cy = MARGIN_TOP + (height - MARGIN_TOP) / 2.0;
    let radius = (width.min(height - MARGIN_TOP) * 0.33).max(10.0);

    let total = pie.total();
    if total <= 0.0 {
        out.push(Primitive::Text {
            x: cx,
            y: cy,
            text: "No data".to_string(),
            size: style.label_size,
            anchor: Anchor::Middle,
            color: Rgb::BLACK,
        });
        return;
    }

    let point = |center: (f32, f32), r: f32, angle: f32| {
        (center.0 + r * angle.cos(), center.1 - r * angle.sin())
    };

    let mut start = 0.0f32;
    for slice in &pie.slices {
        let fraction = (slice.value / total) as f32;
        let sweep = fraction * 2.0 * PI;
        if sweep <= 0.0 {
            continue;
        }
        let middle = start + sweep / 2.0;
        let center = if slice.exploded {
            point((cx, cy), radius * 0.1, middle)
        } else {
            (cx, cy)
        };

        let segments = (fraction * PIE_SEGMENTS).ceil().max(2.0) as usize;
        let mut points = Vec::with_capacity(segments + 2);
        if fraction < 1.0 {
            points.push(center);
        }
        for i in 0..=segments {
            let angle = start + sweep * i as f32 / segments as f32;
            points.push(point(center, radius, angle));
        }
        out.push(Primitive::Polygon {
            points,
            fill: slice.color,
        });

        let label_at = point(center, radius * 1.15, middle);
        out.push(Primitive::Text {
            x: label_at.0,
            y: label_at.1,
            text: slice.label.clone(),
            size: style.label_size,
            anchor: if middle.cos() >= 0.0 {
                Anchor::Start
            } else {
                Anchor::End
            },
            color: Rgb::BLACK,
        });
        let share_at = point(center, radius * 0.6, middle);
        out.push(Primitive::Text {
            x: share_at.0,
            y: share_at.1,
            text: format_percent(f64::from(fraction) * 100.0),
            size: style.annotation_size,
            anchor: Anchor::Middle,
            color: Rgb::BLACK,
        });

        start += sweep;
    }
}
