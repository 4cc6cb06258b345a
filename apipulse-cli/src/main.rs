mod display;

use std::path::{Path, PathBuf};

use anyhow::Context;
use apipulse_core::colors::PaletteExt;
use apipulse_core::output::{get_formatter, OutputFormat, OutputFormatter};
use apipulse_core::{BatchRunner, Config, Pipeline, PipelinePaths, ProgressCallback, StalePolicy};
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use display::progress::{clear_bulk_progress_bar, new_bulk_progress_bar, ProgressWriterFactory};
use display::spinner::Spinner;

#[derive(Parser)]
#[command(name = "apipulse")]
#[command(about = "API catalog health checker - probes documented URLs and marks dead ones")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format (human or json)
    #[arg(short, long, default_value = "human", global = true)]
    format: String,

    /// Configuration file (TOML); missing files fall back to defaults
    #[arg(short, long, env = "APIPULSE_CONFIG", default_value = "apipulse.toml", global = true)]
    config: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Check every catalog URL, write reports and update the catalogs
    #[command(
        after_help = "Logs default to warnings only. Set RUST_LOG=info to also log progress with ETA every 100 checks and the number of entries marked per catalog."
    )]
    Run {
        /// Category-grouped catalog
        #[arg(long, env = "APIPULSE_RAW", default_value = "apis-raw.json")]
        raw: PathBuf,
        /// Flat catalog
        #[arg(long, env = "APIPULSE_ZAPIER", default_value = "apis-zapier.json")]
        zapier: PathBuf,
        /// Per-URL JSON audit log
        #[arg(long, env = "APIPULSE_AUDIT", default_value = "url-health-check.json")]
        audit: PathBuf,
        /// Markdown summary
        #[arg(long, env = "APIPULSE_SUMMARY", default_value = "health-check-summary.md")]
        summary: PathBuf,
        #[command(flatten)]
        tuning: Tuning,
        /// Check and report without rewriting the catalogs
        #[arg(long)]
        dry_run: bool,
        /// Also clear deprecation marks on URLs that were not checked
        #[arg(long)]
        clear_unchecked: bool,
    },
    /// Classify a single URL
    Check {
        /// URL to probe
        url: String,
        /// Per-probe timeout in seconds
        #[arg(short, long, env = "APIPULSE_TIMEOUT")]
        timeout: Option<u64>,
    },
    /// Classify URLs from a file: one per line, # for comments, or CSV (uses first column)
    Bulk {
        file: PathBuf,
        #[command(flatten)]
        tuning: Tuning,
    },
}

#[derive(clap::Args)]
struct Tuning {
    /// Concurrent checks
    #[arg(short, long, env = "APIPULSE_WORKERS")]
    workers: Option<usize>,
    /// URLs per batch
    #[arg(short, long, env = "APIPULSE_BATCH_SIZE")]
    batch_size: Option<usize>,
    /// Per-probe timeout in seconds
    #[arg(short, long, env = "APIPULSE_TIMEOUT")]
    timeout: Option<u64>,
}

impl Tuning {
    fn apply(&self, config: &mut Config) {
        if let Some(workers) = self.workers {
            config.runner.concurrency = workers;
        }
        if let Some(batch_size) = self.batch_size {
            config.runner.batch_size = batch_size;
        }
        if let Some(secs) = self.timeout {
            config.probe.timeout_ms = secs.saturating_mul(1_000);
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Log lines go through the progress bar while one is active
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(ProgressWriterFactory::new())
        .init();

    let cli = Cli::parse();
    let output_format: OutputFormat = cli.format.parse().unwrap_or_default();
    let formatter = get_formatter(output_format);

    if let Err(e) = execute_command(cli.command, &cli.config, formatter.as_ref()).await {
        clear_bulk_progress_bar();
        eprintln!("{} {:#}", "Error:".bad(), e);
        std::process::exit(1);
    }

    Ok(())
}

fn load_config(path: &Path) -> anyhow::Result<Config> {
    let config = Config::load(path)
        .with_context(|| format!("failed to load config from {}", path.display()))?;
    debug!(path = %path.display(), "Loaded configuration");
    Ok(config)
}

/// Progress callback driving a bar sized on the first completion.
fn progress_callback() -> ProgressCallback {
    let bar = new_bulk_progress_bar();
    Box::new(move |done, total, url| {
        if bar.length() != Some(total as u64) {
            bar.set_length(total as u64);
        }
        bar.set_position(done as u64);
        bar.set_message(url.to_string());
    })
}

async fn execute_command(
    command: Commands,
    config_path: &Path,
    formatter: &dyn OutputFormatter,
) -> anyhow::Result<()> {
    let mut config = load_config(config_path)?;

    match command {
        Commands::Run {
            raw,
            zapier,
            audit,
            summary,
            tuning,
            dry_run,
            clear_unchecked,
        } => {
            tuning.apply(&mut config);
            if clear_unchecked {
                config.merge.stale_policy = StalePolicy::ClearUnchecked;
            }
            config.validate()?;

            let paths = PipelinePaths {
                raw,
                zapier,
                audit,
                summary,
            };
            let pipeline = Pipeline::from_config(&config)?.with_dry_run(dry_run);
            let outcome = pipeline.run(&paths, Some(progress_callback())).await;
            clear_bulk_progress_bar();

            println!("{}", formatter.format_outcome(&outcome?));
        }
        Commands::Check { url, timeout } => {
            if let Some(secs) = timeout {
                config.probe.timeout_ms = secs.saturating_mul(1_000);
            }
            config.validate()?;

            let checker = apipulse_core::UrlChecker::from_config(&config)?;
            let spinner = Spinner::new(&format!("Checking {}...", url));
            let result = checker.check(&url).await;
            spinner.finish();

            println!("{}", formatter.format_result(&result));
        }
        Commands::Bulk { file, tuning } => {
            tuning.apply(&mut config);
            config.validate()?;

            let content = std::fs::read_to_string(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let urls = apipulse_core::bulk::parse_urls_from_file(&content);
            if urls.is_empty() {
                anyhow::bail!(
                    "No valid URLs found in file. Expected format: one http(s) URL per line, # for comments, or CSV (first column)"
                );
            }

            let runner = BatchRunner::from_config(&config)?;
            let results = runner.run_all(urls, Some(progress_callback())).await;
            clear_bulk_progress_bar();

            println!("{}", formatter.format_results(&results));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_run_help_mentions_info_logging() {
        let command = Cli::command();
        let run = command.find_subcommand("run").unwrap();
        let after_help = run.get_after_help().unwrap().to_string();
        assert!(after_help.contains("RUST_LOG=info"));
    }

    #[test]
    fn test_run_flags_parse() {
        let cli = Cli::try_parse_from([
            "apipulse",
            "run",
            "--workers",
            "8",
            "--timeout",
            "3",
            "--dry-run",
            "--clear-unchecked",
        ])
        .unwrap();

        match cli.command {
            Commands::Run {
                tuning,
                dry_run,
                clear_unchecked,
                ..
            } => {
                let mut config = Config::default();
                tuning.apply(&mut config);
                assert_eq!(config.runner.concurrency, 8);
                assert_eq!(config.probe.timeout_ms, 3_000);
                assert!(dry_run);
                assert!(clear_unchecked);
            }
            _ => panic!("Expected run command"),
        }
    }
}
