//! titanic-report - survival statistics from the Titanic passenger manifest
//!
//! Loads the semicolon-delimited manifest, prints survival tables and
//! conclusions for each study, and exports the study charts as a PDF with
//! a PNG fallback.
//!
//! Exit codes:
//!   0 - Success (PDF written, or PNG fallback written)
//!   1 - Runtime error (unreadable or malformed input, bad config, fallback failure)

mod analysis;
mod chart;
mod cli;
mod config;
mod export;
mod loader;
mod models;
mod report;
mod study;

use anyhow::{Context, Result};
use chart::{ChartBuilder, ChartStyleConfig};
use cli::{Args, OutputFormat};
use config::{Config, CONFIG_FILE};
use export::{ExportOutcome, PdfDocumentWriter, PngImageWriter, ReportExporter};
use report::{CoercionSummary, Report, ReportMetadata};
use std::path::Path;
use std::time::Instant;
use study::{run_study, StudyReport};
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Config comes first so `verbose = true` in the file can raise the log level
    let mut config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    };
    config.merge_with_args(&args);

    // Initialize logging
    init_logging(&args, &config);

    info!("titanic-report v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    match run(&args, &config) {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Report failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .titanic-report.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(CONFIG_FILE);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            CONFIG_FILE
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).with_context(|| format!("Failed to write {}", CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE);
    println!("   Edit it to customize the input, chart style, output files and thresholds.");
    Ok(())
}

/// `--config FILE`, else `./.titanic-report.toml`, else defaults.
fn load_config(args: &Args) -> Result<Config> {
    if let Some(ref path) = args.config {
        return Config::load(path);
    }
    Ok(Config::load_default()?.unwrap_or_default())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args, config: &Config) {
    let level = if config.general.verbose && !args.quiet {
        tracing::Level::DEBUG
    } else {
        args.log_level()
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Run the selected studies. Returns the exit code.
fn run(args: &Args, config: &Config) -> Result<i32> {
    let start_time = Instant::now();
    // Narrative goes to stdout only for the text report; JSON output stays parseable
    let text = args.format == OutputFormat::Text;
    let say = |line: String| {
        if text {
            println!("{}", line);
        }
    };

    let style =
        ChartStyleConfig::try_from(&config.style).context("Invalid [style] configuration")?;

    // Step 1: Load the manifest
    let input = &config.general.input;
    say(format!("📥 Loading manifest: {}", input.display()));
    let manifest = loader::load_manifest(input)
        .with_context(|| format!("Failed to load passenger manifest {}", input.display()))?;
    say(format!(
        "   {} passengers, {} warnings",
        manifest.records.len(),
        manifest.warnings.len()
    ));

    // Step 2: Aggregate, conclude and chart each study
    let charts = ChartBuilder::new(style);
    let threshold = config.insights.class_gap_threshold;
    let mut studies: Vec<StudyReport> = args
        .study
        .studies()
        .into_iter()
        .map(|kind| {
            info!("Running {} study", kind);
            run_study(kind, &manifest.records, &charts, threshold)
        })
        .collect();

    // Step 3: Print the report
    let report = Report {
        metadata: ReportMetadata::new(input, manifest.records.len()),
        overview: &manifest.overview,
        coercions: CoercionSummary::from_manifest(&manifest),
        studies: &studies,
    };
    match args.format {
        OutputFormat::Text => {
            println!();
            print!("{}", report::generate_text_report(&report));
        }
        OutputFormat::Json => {
            let json = report::generate_json_report(&report).context("Failed to serialize report")?;
            println!("{}", json);
        }
    }

    // Step 4: Export the figures of each study
    let mut fallbacks = 0;
    for study in &mut studies {
        let output = config.export.output_for(study.kind);
        say(format!(
            "📄 Exporting {} figures of the {} study to {}",
            study.figure_count(),
            study.kind,
            output.display()
        ));

        let exporter = ReportExporter::with_writers(
            output,
            &config.export.image_dir,
            PdfDocumentWriter::titled(&study.title),
            PngImageWriter,
        )
        .show_progress(config.export.show_progress);

        let outcome = exporter
            .export(study.take_figures())
            .with_context(|| format!("Failed to export the {} study", study.kind))?;

        match outcome {
            ExportOutcome::Written { path, pages } => {
                say(format!("   ✅ {} ({} pages)", path.display(), pages));
            }
            ExportOutcome::FellBackToImages { images, cause } => {
                fallbacks += 1;
                warn!("PDF export failed for {}: {}", study.kind, cause);
                say(format!("   ⚠️  PDF failed: {}", cause));
                say(format!(
                    "   ✅ Wrote {} images to {} instead",
                    images.len(),
                    config.export.image_dir.display()
                ));
            }
        }
    }

    let elapsed = start_time.elapsed();
    info!(
        "Finished {} studies in {:.1}s ({} PNG fallbacks)",
        studies.len(),
        elapsed.as_secs_f64(),
        fallbacks
    );
    say(format!("\n🏁 Done in {:.1}s", elapsed.as_secs_f64()));

    Ok(0)
}
