mod classify;
mod fragment;
mod report;
mod settings;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::bail;
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use classify::ClassifiedResults;
use settings::Settings;

#[derive(Parser)]
#[command(
    name = "a11y_report",
    about = "Classify scraped accessibility-checker text and write reports"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify one pane dump and write its report
    Report {
        /// Pane dump (.json, or indented [ControlType] text listing)
        dump: PathBuf,
        /// Document name shown in the report (default: <dump stem>.docx)
        #[arg(short, long)]
        document: Option<String>,
        /// Report path (default: <output dir>/<document stem><suffix>)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Write reports for many pane dumps in parallel
    Batch {
        #[arg(required = true)]
        dumps: Vec<PathBuf>,
        /// Directory for reports (default: next to each dump)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },
    /// Print the fragment tree of a pane dump
    Tree { dump: PathBuf },
    /// Print classified results as JSON
    Classify { dump: PathBuf },
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() -> anyhow::Result<()> {
    init_tracing();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let settings = Settings::load()?;

    let result = match cli.command {
        Commands::Report { dump, document, output } => {
            let document = document.unwrap_or_else(|| default_document(&dump));
            let output = output.unwrap_or_else(|| {
                let dir = settings.output_dir.clone().unwrap_or_else(|| dump_dir(&dump));
                report::output_path(&dir, &document, &settings.report_suffix)
            });

            let results = load_and_classify(&dump);
            if !report::save_report(&output, &results, &settings.title, &document) {
                bail!("failed to save results to {}", output.display());
            }

            println!("Accessibility check completed for {}", document);
            println!("Results saved to: {}", output.display());
            print_summary(&results);
            Ok(())
        }
        Commands::Batch { dumps, output_dir } => {
            let output_dir = output_dir.or_else(|| settings.output_dir.clone());
            let counts = process_dumps(&dumps, output_dir.as_deref(), &settings);
            println!("Wrote {} reports ({} failed).", counts.ok, counts.failed);
            if counts.failed > 0 {
                bail!("{} of {} reports failed", counts.failed, dumps.len());
            }
            Ok(())
        }
        Commands::Tree { dump } => {
            let pane = fragment::load_or_empty(&dump);
            if pane.fragments.is_empty() {
                println!("Accessibility pane not found.");
                return Ok(());
            }
            for f in &pane.fragments {
                println!("{}- [{}] '{}'", "  ".repeat(f.depth), f.source_label, f.text);
            }
            Ok(())
        }
        Commands::Classify { dump } => {
            let results = load_and_classify(&dump);
            println!("{}", serde_json::to_string_pretty(&results)?);
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        info!("Done in {}", format_duration(elapsed));
    }

    result
}

/// Unreadable or malformed dumps classify as an empty pane rather than failing.
fn load_and_classify(dump: &Path) -> ClassifiedResults {
    let pane = fragment::load_or_empty(dump);
    if pane.fragments.is_empty() {
        warn!(
            "{} holds no text fragments; the checker pane was probably not found",
            dump.display()
        );
    }
    let results = classify::classify(&pane);
    if results.is_uncategorized() && !pane.fragments.is_empty() {
        warn!("No fragments in {} matched an error, warning or tip keyword", dump.display());
    }
    results
}

fn print_summary(results: &ClassifiedResults) {
    println!("Summary:");
    for (key, value) in results.summary.entries() {
        println!("   {}: {}", report::title_case_key(key), value);
    }
}

struct BatchCounts {
    ok: usize,
    failed: usize,
}

struct BatchJob<'a> {
    dump: &'a Path,
    document: String,
    output: PathBuf,
}

/// Resolve report paths up front. A dump whose report path is already taken by an
/// earlier dump is left out and counted as a collision.
fn plan_batch<'a>(
    dumps: &'a [PathBuf],
    output_dir: Option<&Path>,
    settings: &Settings,
) -> (Vec<BatchJob<'a>>, usize) {
    let mut claimed: HashMap<PathBuf, &Path> = HashMap::new();
    let mut jobs = Vec::with_capacity(dumps.len());
    let mut collisions = 0;

    for dump in dumps {
        let dump: &Path = dump;
        let document = default_document(dump);
        let dir = output_dir.map(Path::to_path_buf).unwrap_or_else(|| dump_dir(dump));
        let output = report::output_path(&dir, &document, &settings.report_suffix);

        if let Some(first) = claimed.get(&output) {
            warn!(
                "Skipping {}: its report {} is already written for {}",
                dump.display(),
                output.display(),
                first.display()
            );
            collisions += 1;
            continue;
        }
        claimed.insert(output.clone(), dump);
        jobs.push(BatchJob {
            dump,
            document,
            output,
        });
    }

    (jobs, collisions)
}

fn process_dumps(dumps: &[PathBuf], output_dir: Option<&Path>, settings: &Settings) -> BatchCounts {
    use indicatif::{ProgressBar, ProgressStyle};
    use rayon::prelude::*;

    let (jobs, collisions) = plan_batch(dumps, output_dir, settings);

    let pb = ProgressBar::new(jobs.len() as u64);
    if let Ok(style) = ProgressStyle::default_bar().template(
        "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec})",
    ) {
        pb.set_style(style.progress_chars("#>-"));
    }

    let outcomes: Vec<bool> = jobs
        .par_iter()
        .map(|job| {
            let results = load_and_classify(job.dump);
            let ok = report::save_report(&job.output, &results, &settings.title, &job.document);
            pb.inc(1);
            ok
        })
        .collect();

    pb.finish_and_clear();
    let ok = outcomes.iter().filter(|&&ok| ok).count();
    BatchCounts {
        ok,
        failed: outcomes.len() - ok + collisions,
    }
}

/// `scans/ConflictDoc.json` -> `ConflictDoc.docx`
fn default_document(dump: &Path) -> String {
    let stem = dump
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("document");
    format!("{}.docx", stem)
}

fn dump_dir(dump: &Path) -> PathBuf {
    match dump.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
