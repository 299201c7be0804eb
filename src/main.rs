use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod aggregate;
mod dates;
mod models;
mod normalize;
mod report;
mod sheet;
mod summary;

use crate::aggregate::{TimeRange, ViewFilter, YearFilter};
use crate::models::{AnalysisSummary, FlagRecord};

#[derive(Parser)]
#[command(name = "flag-insights")]
#[command(about = "Behaviour flag report ingestion and dashboard statistics", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Markdown,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Normalise a flag report and summarise what was found
    Ingest {
        #[arg(long)]
        input: PathBuf,
        /// Print the records as JSON instead of a per-year count
        #[arg(long)]
        json: bool,
    },
    /// Write the payload for the summarization service
    Request {
        #[arg(long)]
        input: PathBuf,
        #[arg(long, default_value = "request.json")]
        out: PathBuf,
    },
    /// Aggregate a flag report into dashboard statistics
    Report {
        #[arg(long)]
        input: PathBuf,
        /// Summarization response (JSON) to merge into the report
        #[arg(long, env = "FLAG_INSIGHTS_SUMMARY")]
        summary: Option<PathBuf>,
        #[arg(long, env = "FLAG_INSIGHTS_YEAR", default_value = aggregate::OVERALL)]
        year: String,
        /// First day to include (YYYY-MM-DD)
        #[arg(long)]
        from: Option<NaiveDate>,
        /// Last day to include (YYYY-MM-DD)
        #[arg(long)]
        to: Option<NaiveDate>,
        #[arg(long, value_enum, default_value_t = OutputFormat::Markdown)]
        format: OutputFormat,
        /// Write to a file instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "flag_insights=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

async fn load_records(input: &Path) -> anyhow::Result<Vec<FlagRecord>> {
    let path = input.to_path_buf();
    let rows = tokio::task::spawn_blocking(move || sheet::load_first_sheet(&path))
        .await
        .context("sheet loader panicked")?
        .with_context(|| format!("failed to load {}", input.display()))?;

    let outcome = normalize::scan_rows(&rows);
    if outcome.records.is_empty() {
        anyhow::bail!(
            "no flags found in {}: expected a header row with Pupil Name, Date and Category",
            input.display()
        );
    }

    info!(
        records = outcome.records.len(),
        header_blocks = outcome.header_blocks,
        "normalised flags"
    );
    Ok(outcome.records)
}

fn time_range(from: Option<NaiveDate>, to: Option<NaiveDate>) -> TimeRange {
    TimeRange {
        start: from.map(dates::date_to_millis).unwrap_or(0),
        end: to.map(dates::date_to_millis),
    }
}

fn range_label(from: Option<NaiveDate>, to: Option<NaiveDate>) -> String {
    match (from, to) {
        (None, None) => "all dates".to_string(),
        (Some(from), None) => format!("from {from}"),
        (None, Some(to)) => format!("up to {to}"),
        (Some(from), Some(to)) => format!("{from} to {to}"),
    }
}

fn emit(out: Option<&Path>, content: &str) -> anyhow::Result<()> {
    match out {
        Some(path) => {
            std::fs::write(path, content)
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!("Report written to {}.", path.display());
        }
        None => print!("{content}"),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();
    let cli = Cli::parse();

    match cli.command {
        Commands::Ingest { input, json } => {
            let records = load_records(&input).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&records)?);
                return Ok(());
            }

            println!("Found {} flags in {}.", records.len(), input.display());
            let options = aggregate::year_options(&records);
            for year in options.iter().skip(1) {
                let count = records.iter().filter(|r| r.year_group == *year).count();
                println!("- {year}: {count} flags");
            }
        }
        Commands::Request { input, out } => {
            let records = load_records(&input).await?;
            let request = summary::SummaryRequest::from_records(&records);
            let body = serde_json::to_string_pretty(&request)?;
            tokio::fs::write(&out, body)
                .await
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!(
                "Request for {} flags ({} rows) written to {}.",
                request.total_records,
                request.rows.len(),
                out.display()
            );
        }
        Commands::Report {
            input,
            summary,
            year,
            from,
            to,
            format,
            out,
        } => {
            let records = load_records(&input).await?;
            let analysis = match summary {
                Some(path) => summary::load_summary(&path).await?,
                None => AnalysisSummary::default(),
            };

            let filter = ViewFilter {
                year: YearFilter::parse(&year),
                range: time_range(from, to),
            };
            let view = aggregate::build_view(&records, &filter, &analysis);

            let content = match format {
                OutputFormat::Markdown => {
                    report::build_report(&view, &analysis, &range_label(from, to))
                }
                OutputFormat::Json => format!("{}\n", serde_json::to_string_pretty(&view)?),
            };
            emit(out.as_deref(), &content)?;
        }
    }

    Ok(())
}
