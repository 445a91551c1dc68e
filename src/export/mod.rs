//! Figure export.
//!
//! [`ReportExporter`] writes every figure of a study as one page of a
//! multi-page document. If the document cannot be written it falls back to
//! one image per figure and says so in its [`ExportOutcome`].

pub mod pdf;
pub mod png;

pub use pdf::PdfDocumentWriter;
pub use png::PngImageWriter;

use crate::chart::Figure;
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors that can occur while exporting figures.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("No figures to export")]
    NoFigures,

    #[error("Failed to write document {}: {message}", .path.display())]
    Document { path: PathBuf, message: String },

    #[error("Failed to write image {}: {message}", .path.display())]
    Image { path: PathBuf, message: String },
}

/// Writes all figures into one document; returns the page count.
pub trait DocumentWriter {
    fn write_document(&self, figures: &[Figure], path: &Path) -> Result<usize, ExportError>;
}

/// Writes a single figure as an image.
pub trait ImageWriter {
    fn write_image(&self, figure: &Figure, path: &Path) -> Result<(), ExportError>;
}

/// What ended up on disk.
#[derive(Debug)]
pub enum ExportOutcome {
    Written {
        path: PathBuf,
        pages: usize,
    },
    /// The document failed; `cause` is that failure and `images` the files
    /// written instead.
    FellBackToImages {
        images: Vec<PathBuf>,
        cause: ExportError,
    },
}

/// Exports figures to a document with an image fallback.
pub struct ReportExporter<D = PdfDocumentWriter, I = PngImageWriter> {
    output: PathBuf,
    image_dir: PathBuf,
    show_progress: bool,
    document: D,
    images: I,
}

impl ReportExporter {
    pub fn new(output: impl Into<PathBuf>, image_dir: impl Into<PathBuf>) -> Self {
        Self::with_writers(output, image_dir, PdfDocumentWriter::default(), PngImageWriter)
    }
}

impl<D: DocumentWriter, I: ImageWriter> ReportExporter<D, I> {
    pub fn with_writers(
        output: impl Into<PathBuf>,
        image_dir: impl Into<PathBuf>,
        document: D,
        images: I,
    ) -> Self {
        Self {
            output: output.into(),
            image_dir: image_dir.into(),
            show_progress: false,
            document,
            images,
        }
    }

    pub fn show_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Export `figures`, consuming them.
    ///
    /// Any file already at the output path is replaced. Figures are dropped
    /// once this returns, whichever branch was taken.
    pub fn export(&self, figures: Vec<Figure>) -> Result<ExportOutcome, ExportError> {
        if figures.is_empty() {
            return Err(ExportError::NoFigures);
        }

        if self.output.exists() {
            match fs::remove_file(&self.output) {
                Ok(()) => debug!("Removed previous {}", self.output.display()),
                Err(e) => warn!(
                    "Could not remove previous {}: {}",
                    self.output.display(),
                    e
                ),
            }
        }

        info!(
            "Writing {} figures to {}",
            figures.len(),
            self.output.display()
        );

        let progress = self.progress_bar(figures.len());
        progress.set_message(self.output.display().to_string());
        let written = self.document.write_document(&figures, &self.output);
        if written.is_ok() {
            progress.inc(figures.len() as u64);
        }
        progress.finish_and_clear();

        let outcome = match written {
            Ok(pages) => {
                info!("Wrote {} ({} pages)", self.output.display(), pages);
                ExportOutcome::Written {
                    path: self.output.clone(),
                    pages,
                }
            }
            Err(cause) => {
                warn!("{}; falling back to images", cause);
                if self.output.exists() {
                    let _ = fs::remove_file(&self.output);
                }
                let images = self.write_images(&figures)?;
                ExportOutcome::FellBackToImages { images, cause }
            }
        };

        debug!("Released {} figures", figures.len());
        drop(figures);
        Ok(outcome)
    }

    fn write_images(&self, figures: &[Figure]) -> Result<Vec<PathBuf>, ExportError> {
        fs::create_dir_all(&self.image_dir).map_err(|e| ExportError::Image {
            path: self.image_dir.clone(),
            message: e.to_string(),
        })?;

        let progress = self.progress_bar(figures.len());
        let mut written = Vec::with_capacity(figures.len());

        for (i, figure) in figures.iter().enumerate() {
            let path = self.image_dir.join(image_name(figure, i + 1));
            progress.set_message(figure.slug.clone());
            self.images.write_image(figure, &path)?;
            debug!("Wrote {}", path.display());
            written.push(path);
            progress.inc(1);
        }

        progress.finish_and_clear();
        info!(
            "Wrote {} images to {}",
            written.len(),
            self.image_dir.display()
        );
        Ok(written)
    }

    fn progress_bar(&self, len: usize) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }

        let pb = ProgressBar::new(len as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:30.cyan/blue}] {pos}/{len} {msg}")
                .map(|s| s.progress_chars("#>-"))
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        pb
    }
}

/// `<slug>.png`, or `figure_<n>.png` for figures without a slug.
fn image_name(figure: &Figure, n: usize) -> String {
    if figure.slug.trim().is_empty() {
        format!("figure_{}.png", n)
    } else {
        format!("{}.png", figure.slug)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::{BarSpec, ChartBuilder, ChartStyleConfig};
    use crate::models::{GroupKey, GroupSummary, GroupValue, Sex};
    use std::cell::RefCell;
    use tempfile::TempDir;

    fn figures() -> Vec<Figure> {
        let builder = ChartBuilder::new(ChartStyleConfig::default());
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
        vec![
            builder.bar(BarSpec::new("survival_by_sex", "Survival by sex", "Sex"), &summaries),
            builder.bar(BarSpec::new("", "Untitled", "Sex"), &summaries),
            builder.pie(
                "survivors",
                "Survivors",
                &[("Survivors".to_string(), 4.0), ("Casualties".to_string(), 5.0)],
                0,
            ),
        ]
    }

    struct BrokenDocument;

    impl DocumentWriter for BrokenDocument {
        fn write_document(&self, _: &[Figure], path: &Path) -> Result<usize, ExportError> {
            fs::write(path, b"%PDF-partial").unwrap();
            Err(ExportError::Document {
                path: path.to_path_buf(),
                message: "disk full".to_string(),
            })
        }
    }

    #[derive(Default)]
    struct RecordingImages {
        written: RefCell<Vec<PathBuf>>,
    }

    impl ImageWriter for &RecordingImages {
        fn write_image(&self, _: &Figure, path: &Path) -> Result<(), ExportError> {
            fs::write(path, b"png").unwrap();
            self.written.borrow_mut().push(path.to_path_buf());
            Ok(())
        }
    }

    struct FailingImages;

    impl ImageWriter for FailingImages {
        fn write_image(&self, _: &Figure, path: &Path) -> Result<(), ExportError> {
            Err(ExportError::Image {
                path: path.to_path_buf(),
                message: "read-only file system".to_string(),
            })
        }
    }

    #[test]
    fn test_export_writes_pdf() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("analysis.pdf");
        let exporter = ReportExporter::new(&output, dir.path().join("images"));

        match exporter.export(figures()).unwrap() {
            ExportOutcome::Written { path, pages } => {
                assert_eq!(path, output);
                assert_eq!(pages, 3);
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        assert!(!dir.path().join("images").exists());
    }

    #[test]
    fn test_export_replaces_previous_file() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("analysis.pdf");
        let exporter = ReportExporter::new(&output, dir.path().join("images"));

        exporter.export(figures()).unwrap();
        exporter.export(figures()).unwrap();

        let doc = lopdf::Document::load(&output).unwrap();
        assert_eq!(doc.get_pages().len(), 3);
    }

    #[test]
    fn test_fallback_writes_images() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("analysis.pdf");
        let image_dir = dir.path().join("images");
        let images = RecordingImages::default();
        let exporter = ReportExporter::with_writers(&output, &image_dir, BrokenDocument, &images);

        match exporter.export(figures()).unwrap() {
            ExportOutcome::FellBackToImages { images: paths, cause } => {
                assert_eq!(
                    paths,
                    vec![
                        image_dir.join("survival_by_sex.png"),
                        image_dir.join("figure_2.png"),
                        image_dir.join("survivors.png"),
                    ]
                );
                assert!(cause.to_string().contains("disk full"));
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        assert_eq!(images.written.borrow().len(), 3);
        assert!(!output.exists());
    }

    #[test]
    fn test_fallback_renders_real_png_files() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("analysis.pdf");
        let image_dir = dir.path().join("images");
        let exporter =
            ReportExporter::with_writers(&output, &image_dir, BrokenDocument, PngImageWriter);

        let paths = match exporter.export(figures()).unwrap() {
            ExportOutcome::FellBackToImages { images, .. } => images,
            other => panic!("unexpected outcome {:?}", other),
        };
        assert_eq!(paths.len(), 3);
        for path in &paths {
            let bytes = fs::read(path).unwrap();
            assert_eq!(&bytes[1..4], b"PNG");
        }
        assert!(!output.exists());
    }

    #[test]
    fn test_failed_fallback_is_an_error() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("analysis.pdf");
        let exporter = ReportExporter::with_writers(
            &output,
            dir.path().join("images"),
            BrokenDocument,
            FailingImages,
        );

        match exporter.export(figures()) {
            Err(ExportError::Image { path, message }) => {
                assert_eq!(path, dir.path().join("images").join("survival_by_sex.png"));
                assert_eq!(message, "read-only file system");
            }
            other => panic!("unexpected result {:?}", other),
        }
        assert!(!output.exists());
    }

    #[test]
    fn test_no_figures_is_an_error() {
        let dir = TempDir::new().unwrap();
        let exporter = ReportExporter::new(dir.path().join("a.pdf"), dir.path());
        assert!(matches!(exporter.export(Vec::new()), Err(ExportError::NoFigures)));
    }
}
