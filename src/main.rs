use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Parser;
use log::info;

use rusty_raman::config::polynomial_sweep;
use rusty_raman::{
    MatchConfig, MethodKind, RankingDriver, RankingReport, load_catalog, load_spectrum,
};

#[derive(Parser, Debug)]
#[command(name = "rusty-raman")]
#[command(about = "Rank catalog spectra by similarity to an unknown Raman spectrum", long_about = None)]
struct Cli {
    /// Unknown spectrum: two-column x,y CSV
    #[arg(short, long)]
    unknown: PathBuf,

    /// Reference catalog (.parquet, .json or .csv)
    #[arg(short, long)]
    catalog: PathBuf,

    /// Baseline strategy
    #[arg(short, long, value_enum, default_value = "air-pls")]
    method: MethodKind,

    /// JSON file overriding the method preset
    #[arg(long, conflicts_with = "sweep_orders")]
    config: Option<PathBuf>,

    /// Number of matches to report
    #[arg(short = 'k', long, default_value = "10")]
    top: usize,

    /// Worker threads (0 = one per core)
    #[arg(short, long, default_value = "0")]
    workers: usize,

    /// Rank with every polynomial order in FROM..=TO
    #[arg(long, num_args = 2, value_names = ["FROM", "TO"])]
    sweep_orders: Option<Vec<usize>>,

    /// Abort the batch after this many seconds
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Write the full report (matches and failures) as JSON
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let configs = build_configs(&cli)?;
    let unknown = load_spectrum(&cli.unknown)?;
    let catalog = load_catalog(&cli.catalog)?;
    info!(
        "unknown {} ({} samples) vs {} reference(s)",
        cli.unknown.display(),
        unknown.len(),
        catalog.len()
    );

    let driver = RankingDriver::new(cli.workers);
    let report = match cli.timeout_secs {
        Some(secs) => driver.rank_with_timeout(
            Arc::new(unknown),
            Arc::new(catalog),
            configs.clone(),
            cli.top,
            Duration::from_secs(secs),
        ),
        None => driver.rank_sweep(&unknown, &catalog, &configs, cli.top),
    }
    .context("ranking failed")?;

    print_report(&report, &configs);

    if let Some(path) = &cli.output {
        let json = serde_json::to_string_pretty(&report).context("serializing report")?;
        std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
        info!("report written to {}", path.display());
    }
    Ok(())
}

fn build_configs(cli: &Cli) -> Result<Vec<MatchConfig>> {
    if let Some(orders) = &cli.sweep_orders {
        if cli.method != MethodKind::Polynomial {
            bail!("--sweep-orders requires --method polynomial");
        }
        let (from, to) = (orders[0], orders[1]);
        return polynomial_sweep(from, to).context("building polynomial sweep");
    }
    let config = match &cli.config {
        Some(path) => MatchConfig::from_json_file(path)?,
        None => MatchConfig::for_method(cli.method),
    };
    Ok(vec![config])
}

fn print_report(report: &RankingReport, configs: &[MatchConfig]) {
    for (rank, m) in report.matches.iter().enumerate() {
        if configs.len() > 1 {
            println!(
                "{}. {} - {:.4}  [{}]",
                rank + 1,
                m.label,
                m.score,
                configs[m.config_index].describe()
            );
        } else {
            println!("{}. {} - {:.4}", rank + 1, m.label, m.score);
        }
    }
    if !report.failures.is_empty() {
        eprintln!("{} comparison(s) failed:", report.failures.len());
        for f in &report.failures {
            eprintln!("  #{} {}: {}", f.index, f.label, f.reason);
        }
    }
}
