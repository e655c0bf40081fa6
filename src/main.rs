use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};

mod canvas;
mod config;
mod missing;
mod models;
mod recent;
mod report;

use missing::{AssignmentLimit, CourseSelection};

#[derive(Parser)]
#[command(name = "canvas-submission-tracker")]
#[command(about = "Submission activity reports for Canvas courses", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Report submissions made within the trailing lookback window
    Recent {
        /// Override the configured lookback window, in hours
        #[arg(long)]
        lookback_hours: Option<i64>,
        #[arg(long, default_value = "recent.csv")]
        out: PathBuf,
    },
    /// Report roster students with no submission, newest assignments first
    Missing {
        /// A course id, or "all" for every configured course
        #[arg(long, default_value = "all")]
        course: String,
        /// Cap on assignments per course, or "all"
        #[arg(long, default_value = "all")]
        limit: String,
        /// Wall-clock seconds before the continue/cancel checkpoint
        #[arg(long, default_value_t = missing::DEFAULT_BUDGET.as_secs())]
        budget_secs: u64,
        /// Keep going past the checkpoint without prompting
        #[arg(long)]
        assume_yes: bool,
        /// Output file; a .csv extension writes flat rows instead of Markdown
        #[arg(long, default_value = "missing.md")]
        out: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Recent { lookback_hours, out } => {
            let mut config = config::Config::load().context("configuration is incomplete")?;
            if let Some(hours) = lookback_hours {
                anyhow::ensure!(hours > 0, "--lookback-hours must be positive");
                config.lookback_hours = hours;
            }
            let client =
                canvas::CanvasClient::new(&config).context("failed to build the HTTP client")?;

            let records = recent::aggregate(&config, &client, Utc::now()).await;
            let file = std::fs::File::create(&out)
                .with_context(|| format!("failed to create {}", out.display()))?;
            report::write_recent_csv(&records, config.highlight_late, file)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!(
                "{} submission(s) from the last {}h written to {}.",
                records.len(),
                config.lookback_hours,
                out.display()
            );
        }
        Commands::Missing {
            course,
            limit,
            budget_secs,
            assume_yes,
            out,
        } => {
            let config = config::Config::load().context("configuration is incomplete")?;
            let client =
                canvas::CanvasClient::new(&config).context("failed to build the HTTP client")?;
            let selection = parse_selection(&course);
            let limit = parse_limit(&limit)?;

            let mut checkpoint = |elapsed: Duration, remaining: usize| {
                if assume_yes {
                    true
                } else {
                    prompt_continue(elapsed, remaining)
                }
            };
            let reports = missing::resolve(
                &config,
                &client,
                &selection,
                limit,
                Duration::from_secs(budget_secs),
                &mut checkpoint,
            )
            .await;

            let wants_csv = out
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
            if wants_csv {
                let file = std::fs::File::create(&out)
                    .with_context(|| format!("failed to create {}", out.display()))?;
                report::write_missing_csv(&reports, file)
                    .with_context(|| format!("failed to write {}", out.display()))?;
            } else {
                std::fs::write(&out, report::build_missing_report(&reports, Utc::now()))
                    .with_context(|| format!("failed to write {}", out.display()))?;
            }
            let total: usize = reports
                .iter()
                .flat_map(|report| report.groups.iter())
                .map(|group| group.entries.len())
                .sum();
            println!(
                "{total} missing submission(s) across {} course(s) written to {}.",
                reports.len(),
                out.display()
            );
        }
    }

    Ok(())
}

fn parse_selection(raw: &str) -> CourseSelection {
    if raw.eq_ignore_ascii_case("all") {
        CourseSelection::All
    } else {
        CourseSelection::One(raw.trim().to_string())
    }
}

fn parse_limit(raw: &str) -> anyhow::Result<AssignmentLimit> {
    if raw.eq_ignore_ascii_case("all") {
        return Ok(AssignmentLimit::All);
    }
    let count: usize = raw
        .trim()
        .parse()
        .context("--limit must be a positive number or \"all\"")?;
    anyhow::ensure!(count > 0, "--limit must be a positive number or \"all\"");
    Ok(AssignmentLimit::Top(count))
}

fn prompt_continue(elapsed: Duration, remaining: usize) -> bool {
    print!(
        "{}s elapsed with {remaining} course(s) still to resolve. Continue? [y/N] ",
        elapsed.as_secs()
    );
    let _ = std::io::stdout().flush();

    let mut answer = String::new();
    if std::io::stdin().read_line(&mut answer).is_err() {
        return false;
    }
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}
