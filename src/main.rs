use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;

use vidlink::catalog;
use vidlink::models::MatchConfig;
use vidlink::pipeline;
use vidlink::progress;
use vidlink::retry::RetryPolicy;
use vidlink::youtube::YoutubeProvider;

#[derive(Parser)]
#[command(name = "vidlink")]
#[command(about = "Find the best matching video for each track in a music catalog")]
struct Args {
    /// Directory scanned for input *.csv files
    #[arg(long, default_value = "input")]
    input_dir: PathBuf,

    /// Output CSV path
    #[arg(long, default_value = "output/output.csv")]
    output: PathBuf,

    /// Skip tracks already present in the output and merge results into it
    #[arg(long)]
    resume: bool,

    /// Concurrent lookup workers
    #[arg(long, default_value = "10")]
    workers: usize,

    /// Search results to consider per track, across both search passes
    #[arg(long, default_value = "15")]
    max_results: usize,

    /// Stop scanning candidates once a confidence exceeds this
    #[arg(long, default_value = "0.8")]
    confidence_exit: f64,

    /// Videos at least this long (seconds) are scored zero
    #[arg(long, default_value = "900")]
    duration_cutoff: u64,

    /// Only process the first N tracks
    #[arg(long)]
    subset: Option<usize>,

    /// Disable progress bars, log counters only
    #[arg(long)]
    log_only: bool,

    /// Increase log verbosity (-v: debug, -vv: trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = match args.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .init();

    progress::set_log_only(args.log_only);

    if let Some(parent) = args.output.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create output directory {}", parent.display()))?;
    }

    let start = Instant::now();

    let tracks = catalog::load_tracks(&args.input_dir, args.resume, &args.output, args.subset)?;
    if tracks.is_empty() {
        log::info!("Nothing to process.");
        return Ok(());
    }
    log::info!("Processing {} tracks with {} workers.", tracks.len(), args.workers);

    let cfg = MatchConfig {
        max_results: args.max_results,
        confidence_exit: args.confidence_exit,
        duration_cutoff_sec: args.duration_cutoff,
    };
    let provider = Arc::new(YoutubeProvider::new());
    let result = pipeline::run_pool(tracks, provider, RetryPolicy::default(), cfg, args.workers);

    catalog::write_tracks(&result.tracks, &args.output, args.resume)?;

    let elapsed = start.elapsed();
    let per_track = elapsed.as_secs_f64() / result.stats.completed.max(1) as f64;
    log::info!(
        "Done: {} tracks in {} ({:.2}s per track), {} succeeded, {} failed.",
        result.stats.completed,
        progress::format_duration(elapsed),
        per_track,
        result.stats.succeeded,
        result.stats.failed
    );

    Ok(())
}
