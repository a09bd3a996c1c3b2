//! Holder overlap: finds the most and least similar pair of wallets among
//! the holders of a set of NFT collections.
//!
//! Usage:
//!   cargo run -- 0xcollection1 0xcollection2
//!   cargo run -- --config holder-overlap.toml --json

use anyhow::{bail, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use holder_overlap::batch::LogReporter;
use holder_overlap::config::Config;
use holder_overlap::fetcher::ReqwestFetcher;
use holder_overlap::pipeline::{Pipeline, PipelineReport};
use holder_overlap::similarity::SimilarPair;

const DEFAULT_CONFIG: &str = "holder-overlap.toml";

#[derive(Debug, Default, PartialEq)]
struct CliArgs {
    config: Option<PathBuf>,
    json: bool,
    collections: Vec<String>,
}

fn parse_args(args: &[String]) -> Result<CliArgs> {
    let mut parsed = CliArgs::default();
    let mut iter = args.iter();

    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--json" => parsed.json = true,
            "--config" => match iter.next() {
                Some(path) => parsed.config = Some(PathBuf::from(path)),
                None => bail!("--config needs a path"),
            },
            flag if flag.starts_with("--") => bail!("unknown flag {}", flag),
            address => parsed.collections.push(address.to_string()),
        }
    }

    Ok(parsed)
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let cli = parse_args(&args)?;

    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None if Path::new(DEFAULT_CONFIG).exists() => Config::load(Path::new(DEFAULT_CONFIG))?,
        None => Config::from_env(),
    };
    if !cli.collections.is_empty() {
        config.collections = cli.collections.clone();
    }

    // Initialize logging
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level));

    if config.logging.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .init();
    }

    info!("holder-overlap v{} starting", env!("CARGO_PKG_VERSION"));

    let collections = config.require_collections()?.to_vec();
    let fetcher = ReqwestFetcher::with_timeout(config.fetch.request_timeout())?;
    let pipeline = Pipeline::with_reporter(
        Arc::new(fetcher),
        config.api.clone(),
        &config.fetch,
        Arc::new(LogReporter),
    );

    let report = pipeline.run(&collections).await?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        display_report(&report);
    }

    Ok(())
}

fn describe_pair(pair: &SimilarPair) -> String {
    match &pair.accounts {
        Some((a, b)) => format!("{} <-> {} ({} shared tokens)", a, b, pair.size),
        None => "no comparison possible".to_string(),
    }
}

fn display_report(report: &PipelineReport) {
    println!();
    println!("Collections:      {}", report.collections);
    println!("Holders:          {}", report.holders);
    println!("Indexed accounts: {}", report.indexed_accounts);
    println!("Failed requests:  {}", report.failures.len());
    for f in &report.failures {
        println!("  [{}] {}: {}", f.stage, f.input, f.error);
    }
    println!("{}", "-".repeat(60));
    println!("Most similar:  {}", describe_pair(&report.result.most_similar));
    println!("Least similar: {}", describe_pair(&report.result.least_similar));
    if !report.is_complete() {
        println!();
        println!("Note: results cover only the requests that succeeded.");
    }
}
