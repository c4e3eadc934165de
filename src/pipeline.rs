//! Concurrent dispatcher: a fixed worker pool consuming a job channel, with
//! a single aggregator loop owning the progress counters.
//!
//! Workers block on provider calls, so parallelism is plain OS threads over
//! bounded crossbeam channels rather than a compute pool. Each track is
//! owned by exactly one worker for its whole lifetime and comes back through
//! the outcome channel, failed or not.

use std::sync::Arc;
use std::thread;

use crossbeam_channel::bounded;

use crate::matcher::enrich_track;
use crate::models::{MatchConfig, RunStats, Track, TrackOutcome};
use crate::progress::create_progress_bar;
use crate::provider::VideoProvider;
use crate::retry::RetryPolicy;

/// Emit a progress snapshot every Nth completion.
const SNAPSHOT_EVERY: usize = 2;

pub struct PipelineResult {
    /// Every dispatched track, enriched or failed, in completion order.
    pub tracks: Vec<Track>,
    pub stats: RunStats,
}

/// Run the matcher for every track over `workers` parallel threads.
///
/// Per-track failures are isolated: the track is counted as failed and kept
/// with whatever fields were set before the failure. An empty input spawns
/// nothing and returns immediately.
pub fn run_pool(
    tracks: Vec<Track>,
    provider: Arc<dyn VideoProvider>,
    retry: RetryPolicy,
    cfg: MatchConfig,
    workers: usize,
) -> PipelineResult {
    let total = tracks.len();
    let mut stats = RunStats::new(total);
    if total == 0 {
        return PipelineResult {
            tracks: Vec::new(),
            stats,
        };
    }

    let workers = workers.clamp(1, total);
    let (job_tx, job_rx) = bounded::<Track>(workers * 2);
    let (out_tx, out_rx) = bounded::<TrackOutcome>(workers * 2);

    let mut handles = Vec::with_capacity(workers);
    for _ in 0..workers {
        let rx = job_rx.clone();
        let tx = out_tx.clone();
        let provider = Arc::clone(&provider);
        let cfg = cfg.clone();
        handles.push(thread::spawn(move || {
            while let Ok(mut track) = rx.recv() {
                let error = match enrich_track(&mut track, provider.as_ref(), &retry, &cfg) {
                    Ok(()) => None,
                    Err(err) => Some(err.to_string()),
                };
                if tx.send(TrackOutcome { track, error }).is_err() {
                    break;
                }
            }
        }));
    }
    drop(job_rx);
    drop(out_tx);

    // Feed jobs from a separate thread so the aggregator below can drain
    // outcomes while the bounded queue fills.
    let feeder = thread::spawn(move || {
        for track in tracks {
            if job_tx.send(track).is_err() {
                break;
            }
        }
    });

    let pb = create_progress_bar(total as u64, "Enriching tracks");
    let mut done = Vec::with_capacity(total);
    for outcome in out_rx.iter() {
        match &outcome.error {
            None => stats.succeeded += 1,
            Some(err) => {
                stats.failed += 1;
                log::error!("track {} failed: {err}", outcome.track.isrc);
            }
        }
        stats.completed += 1;
        pb.inc(1);
        if stats.completed % SNAPSHOT_EVERY == 0 {
            stats.log_snapshot();
        }
        done.push(outcome.track);
    }
    pb.finish_with_message(format!(
        "{} succeeded, {} failed",
        stats.succeeded, stats.failed
    ));

    let _ = feeder.join();
    for handle in handles {
        let _ = handle.join();
    }

    PipelineResult {
        tracks: done,
        stats,
    }
}
