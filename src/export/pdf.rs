//! Multi-page PDF output.
//!
//! Each figure becomes one page drawn with the standard Helvetica font, so
//! no font files are embedded.

use super::{DocumentWriter, ExportError};
use crate::chart::layout::{layout, text_width, Anchor, Primitive, Scene};
use crate::chart::{Figure, Rgb};
use chrono::Utc;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream, StringFormat};
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::debug;

/// Writes figures as pages of a single PDF.
#[derive(Debug, Clone, Default)]
pub struct PdfDocumentWriter {
    /// Document title stored in the PDF info dictionary.
    pub title: Option<String>,
}

impl PdfDocumentWriter {
    pub fn titled(title: &str) -> Self {
        Self {
            title: Some(title.to_string()),
        }
    }
}

impl DocumentWriter for PdfDocumentWriter {
    fn write_document(&self, figures: &[Figure], path: &Path) -> Result<usize, ExportError> {
        let fail = |message: String| ExportError::Document {
            path: path.to_path_buf(),
            message,
        };

        let mut doc = build_document(figures, self.title.as_deref()).map_err(fail)?;

        // Write next to the target and rename, so a failed write never
        // leaves a truncated PDF behind.
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let mut tmp = NamedTempFile::new_in(dir).map_err(|e| fail(e.to_string()))?;
        doc.save_to(&mut tmp).map_err(|e| fail(e.to_string()))?;
        tmp.persist(path).map_err(|e| fail(e.to_string()))?;

        debug!("Wrote {} pages to {}", figures.len(), path.display());
        Ok(figures.len())
    }
}

fn build_document(figures: &[Figure], title: Option<&str>) -> Result<Document, String> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    });

    let mut kids: Vec<Object> = Vec::with_capacity(figures.len());
    for figure in figures {
        let scene = layout(figure);
        let content = Content {
            operations: page_operations(&scene),
        };
        let encoded = content
            .encode()
            .map_err(|e| format!("page '{}': {}", figure.slug, e))?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(i64::from(scene.width)),
                Object::Integer(i64::from(scene.height)),
            ],
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => Object::Integer(count),
            "Resources" => resources_id,
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let info_id = doc.add_object(dictionary! {
        "Title" => pdf_text(title.unwrap_or("Titanic survival report")),
        "Producer" => pdf_text(concat!("titanic-report ", env!("CARGO_PKG_VERSION"))),
        "CreationDate" => pdf_text(&Utc::now().format("D:%Y%m%d%H%M%SZ").to_string()),
    });
    doc.trailer.set("Info", info_id);

    doc.compress();
    Ok(doc)
}

/// Encode text for a WinAnsi font; characters outside Latin-1 become `?`.
fn pdf_text(text: &str) -> Object {
    let bytes = text
        .chars()
        .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
        .collect();
    Object::String(bytes, StringFormat::Literal)
}

fn real(value: f32) -> Object {
    Object::Real(value.into())
}

fn set_fill(ops: &mut Vec<Operation>, color: Rgb) {
    let (r, g, b) = color.unit();
    ops.push(Operation::new("rg", vec![real(r), real(g), real(b)]));
}

fn set_stroke(ops: &mut Vec<Operation>, color: Rgb, width: f32) {
    let (r, g, b) = color.unit();
    ops.push(Operation::new("RG", vec![real(r), real(g), real(b)]));
    ops.push(Operation::new("w", vec![real(width)]));
}

/// Content stream operations for one page. PDF's origin is bottom-left, so
/// every y coordinate is flipped.
fn page_operations(scene: &Scene) -> Vec<Operation> {
    let height = scene.height as f32;
    let flip = |y: f32| height - y;
    let mut ops = Vec::new();

    for primitive in &scene.primitives {
        match primitive {
            Primitive::Rect { x, y, w, h, fill } => {
                set_fill(&mut ops, *fill);
                ops.push(Operation::new(
                    "re",
                    vec![real(*x), real(flip(y + h)), real(*w), real(*h)],
                ));
                ops.push(Operation::new("f", vec![]));
            }
            Primitive::Polygon { points, fill } => {
                let Some((first, rest)) = points.split_first() else {
                    continue;
                };
                set_fill(&mut ops, *fill);
                ops.push(Operation::new("m", vec![real(first.0), real(flip(first.1))]));
                for (px, py) in rest {
                    ops.push(Operation::new("l", vec![real(*px), real(flip(*py))]));
                }
                ops.push(Operation::new("h", vec![]));
                ops.push(Operation::new("f", vec![]));
            }
            Primitive::Line {
                from,
                to,
                color,
                width,
            } => {
                set_stroke(&mut ops, *color, *width);
                ops.push(Operation::new("m", vec![real(from.0), real(flip(from.1))]));
                ops.push(Operation::new("l", vec![real(to.0), real(flip(to.1))]));
                ops.push(Operation::new("S", vec![]));
            }
            Primitive::Text {
                x,
                y,
                text,
                size,
                anchor,
                color,
            } => {
                let shift = match anchor {
                    Anchor::Start => 0.0,
                    Anchor::Middle => text_width(text, *size) / 2.0,
                    Anchor::End => text_width(text, *size),
                };
                ops.push(Operation::new("BT", vec![]));
                set_fill(&mut ops, *color);
                ops.push(Operation::new(
                    "Tf",
                    vec![Object::Name(b"F1".to_vec()), real(*size)],
                ));
                ops.push(Operation::new("Td", vec![real(x - shift), real(flip(*y))]));
                ops.push(Operation::new("Tj", vec![pdf_text(text)]));
                ops.push(Operation::new("ET", vec![]));
            }
        }
    }

    ops
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::{BarSpec, ChartBuilder, ChartStyleConfig};
    use crate::models::{GroupKey, GroupSummary, GroupValue, PassengerClass};
    use tempfile::TempDir;

    fn figures(n: usize) -> Vec<Figure> {
        let builder = ChartBuilder::new(ChartStyleConfig::default());
        let summaries = vec![GroupSummary {
            key: GroupKey(vec![GroupValue::Class(PassengerClass::First)]),
            total: 3,
            survived_count: 2,
        }];
        (0..n)
            .map(|i| {
                builder.bar(
                    BarSpec::new(&format!("figure_{}", i), "Survival (1st)", "Class"),
                    &summaries,
                )
            })
            .collect()
    }

    #[test]
    fn test_writes_one_page_per_figure() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("report.pdf");

        let pages = PdfDocumentWriter::default()
            .write_document(&figures(3), &path)
            .unwrap();
        assert_eq!(pages, 3);

        let doc = Document::load(&path).unwrap();
        assert_eq!(doc.get_pages().len(), 3);
    }

    #[test]
    fn test_pdf_text_uses_latin1() {
        match pdf_text("Sobrevivência ≥") {
            Object::String(bytes, _) => {
                assert_eq!(bytes[8], 0xea);
                assert_eq!(*bytes.last().unwrap(), b'?');
            }
            other => panic!("unexpected object {:?}", other),
        }
    }

    #[test]
    fn test_text_is_flipped_and_centered() {
        let scene = Scene {
            width: 100,
            height: 50,
            primitives: vec![Primitive::Text {
                x: 50.0,
                y: 10.0,
                text: "abcd".to_string(),
                size: 10.0,
                anchor: Anchor::Middle,
                color: Rgb::BLACK,
            }],
        };

        let ops = page_operations(&scene);
        let td = ops.iter().find(|op| op.operator == "Td").unwrap();
        assert_eq!(td.operands[0].as_float().unwrap(), 40.0);
        assert_eq!(td.operands[1].as_float().unwrap(), 40.0);
    }

    #[test]
    fn test_missing_directory_fails() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing").join("report.pdf");
        let result = PdfDocumentWriter::default().write_document(&figures(1), &path);
        assert!(matches!(result, Err(ExportError::Document { .. })));
    }
}
