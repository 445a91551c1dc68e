//! PNG output, one image per figure.
//!
//! Text is drawn with DejaVu Sans, compiled into the binary and registered
//! with plotters on first use, so no system fonts are needed.

use super::{ExportError, ImageWriter};
use crate::chart::layout::{layout, Anchor, Primitive};
use crate::chart::{Figure, Rgb};
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use plotters::style::{register_font, FontStyle};
use std::path::Path;
use std::sync::OnceLock;
use tracing::debug;

const FONT_FAMILY: &str = "titanic-sans";
static FONT_BYTES: &[u8] = include_bytes!("../../assets/fonts/DejaVuSans.ttf");
static FONT_REGISTERED: OnceLock<bool> = OnceLock::new();

/// Register the embedded font once per process.
fn ensure_font() -> Result<(), String> {
    let registered = *FONT_REGISTERED.get_or_init(|| {
        let ok = register_font(FONT_FAMILY, FontStyle::Normal, FONT_BYTES).is_ok();
        debug!("Registered embedded font {}: {}", FONT_FAMILY, ok);
        ok
    });
    if registered {
        Ok(())
    } else {
        Err("embedded font could not be loaded".to_string())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PngImageWriter;

fn color(rgb: Rgb) -> RGBColor {
    RGBColor(rgb.0, rgb.1, rgb.2)
}

fn point((x, y): (f32, f32)) -> (i32, i32) {
    (x.round() as i32, y.round() as i32)
}

impl ImageWriter for PngImageWriter {
    fn write_image(&self, figure: &Figure, path: &Path) -> Result<(), ExportError> {
        let fail = |message: String| ExportError::Image {
            path: path.to_path_buf(),
            message,
        };

        ensure_font().map_err(fail)?;

        let scene = layout(figure);
        let root = BitMapBackend::new(path, (scene.width, scene.height)).into_drawing_area();
        root.fill(&WHITE).map_err(|e| fail(e.to_string()))?;

        for primitive in &scene.primitives {
            match primitive {
                Primitive::Rect { x, y, w, h, fill } => {
                    let corners = [point((*x, *y)), point((x + w, y + h))];
                    root.draw(&Rectangle::new(corners, color(*fill).filled()))
                        .map_err(|e| fail(e.to_string()))?;
                }
                Primitive::Polygon { points, fill } => {
                    let points: Vec<(i32, i32)> = points.iter().copied().map(point).collect();
                    root.draw(&Polygon::new(points, color(*fill).filled()))
                        .map_err(|e| fail(e.to_string()))?;
                }
                Primitive::Line {
                    from,
                    to,
                    color: stroke,
                    width,
                } => {
                    let style = color(*stroke).stroke_width(width.round().max(1.0) as u32);
                    root.draw(&PathElement::new(vec![point(*from), point(*to)], style))
                        .map_err(|e| fail(e.to_string()))?;
                }
                Primitive::Text {
                    x,
                    y,
                    text,
                    size,
                    anchor,
                    color: fill,
                } => {
                    let hpos = match anchor {
                        Anchor::Start => HPos::Left,
                        Anchor::Middle => HPos::Center,
                        Anchor::End => HPos::Right,
                    };
                    let style = (FONT_FAMILY, f64::from(*size))
                        .into_font()
                        .color(&color(*fill))
                        .pos(Pos::new(hpos, VPos::Bottom));
                    root.draw(&Text::new(text.clone(), point((*x, *y)), style))
                        .map_err(|e| fail(format!("label {:?}: {}", text, e)))?;
                }
            }
        }

        root.present().map_err(|e| fail(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::{BarSpec, ChartBuilder, ChartStyleConfig};
    use crate::models::{GroupKey, GroupSummary, GroupValue, Sex};
    use tempfile::TempDir;

    fn by_sex_figure(title: &str) -> Figure {
        let summaries = vec![
            GroupSummary {
                key: GroupKey(vec![GroupValue::Sex(Sex::Female)]),
                total: 4,
                survived_count: 3,
            },
            GroupSummary {
                key: GroupKey(vec![GroupValue::Sex(Sex::Male)]),
                total: 5,
                survived_count: 1,
            },
        ];
        ChartBuilder::new(ChartStyleConfig::default())
            .bar(BarSpec::new("survival_by_sex", title, "Sex"), &summaries)
    }

    #[test]
    fn test_writes_png_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("survivors.png");
        let figure = ChartBuilder::new(ChartStyleConfig::default()).pie(
            "survivors",
            "Survivors",
            &[("Survivors".to_string(), 3.0), ("Casualties".to_string(), 5.0)],
            0,
        );

        PngImageWriter.write_image(&figure, &path).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[1..4], b"PNG");
    }

    #[test]
    fn test_titles_are_rasterized() {
        let dir = TempDir::new().unwrap();
        let first = dir.path().join("first.png");
        let second = dir.path().join("second.png");

        PngImageWriter
            .write_image(&by_sex_figure("Survival by sex"), &first)
            .unwrap();
        PngImageWriter
            .write_image(&by_sex_figure("Survival rate of passengers"), &second)
            .unwrap();

        assert_ne!(std::fs::read(&first).unwrap(), std::fs::read(&second).unwrap());
    }

    #[test]
    fn test_non_latin_text_does_not_fail() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("symbols.png");
        PngImageWriter
            .write_image(&by_sex_figure("Survival ≥ 50% ✓"), &path)
            .unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_point_rounds() {
        assert_eq!(point((1.4, 2.6)), (1, 3));
    }
}
