//! Core data models for the enrichment pipeline.
//!
//! This module contains the catalog row type, the ephemeral search/metadata
//! types returned by providers, and the run-wide configuration and counters.

use std::collections::BTreeMap;

// ============================================================================
// Catalog Models
// ============================================================================

/// One catalog row, keyed by ISRC.
///
/// `extra` carries any input columns the pipeline does not interpret; they
/// are written back out unchanged. The computed fields stay `None` until the
/// track has been through the matcher, so a resumed or failed track is
/// distinguishable from one that scored 0.
#[derive(Clone, Debug, Default)]
pub struct Track {
    pub isrc: String,
    pub artists: String,
    pub song_name: String,
    pub extra: BTreeMap<String, String>,

    /// Query string of the second (cleaned) search pass.
    pub search_terms: Option<String>,
    pub cleaned_artist: Option<String>,
    pub cleaned_song_name: Option<String>,
    pub best: Option<BestMatch>,
}

impl Track {
    pub fn new(isrc: &str, artists: &str, song_name: &str) -> Self {
        Self {
            isrc: isrc.to_string(),
            artists: artists.to_string(),
            song_name: song_name.to_string(),
            ..Default::default()
        }
    }
}

/// Best-scoring candidate found for a track. Every field describes the
/// winning candidate only; nothing here is sticky across overwrites.
#[derive(Clone, Debug, PartialEq)]
pub struct BestMatch {
    pub url: String,
    /// In [0, 1]; rounded to 2 decimals once the scan finishes.
    pub confidence: f64,
    pub artist_dist: f64,
    pub song_name_dist: f64,
    /// Artist tokens that were found in the candidate metadata.
    pub matched_artist: String,
    pub matched_song: String,
    /// "official" occurred in the winning candidate's cleaned metadata.
    pub official: bool,
    /// Index of the winner within the concatenated search results.
    pub result_idx: usize,
}

// ============================================================================
// Provider Models
// ============================================================================

/// One search result. Never persisted; only the winner's fields end up on
/// the track.
#[derive(Clone, Debug)]
pub struct SearchHit {
    pub url: String,
    pub title: Option<String>,
    pub long_desc: Option<String>,
    pub channel: Option<String>,
}

/// Per-candidate metadata from a separate fetch.
#[derive(Clone, Debug)]
pub struct VideoMetadata {
    /// 0 when the provider had no duration (logged as a warning there).
    pub duration_sec: u64,
    /// Raw metadata dump; scored together with the search hit fields.
    pub raw: String,
}

// ============================================================================
// Configuration
// ============================================================================

/// Tunables for the candidate scan. Defaults match the empirically tuned
/// values; all of them are exposed as CLI flags.
#[derive(Clone, Debug)]
pub struct MatchConfig {
    /// Results requested per search pass.
    pub max_results: usize,
    /// Stop scanning once best confidence exceeds this.
    pub confidence_exit: f64,
    /// Candidates at least this long are scored 0 (mixes, compilations).
    pub duration_cutoff_sec: u64,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            max_results: 15,
            confidence_exit: 0.8,
            duration_cutoff_sec: 900,
        }
    }
}

// ============================================================================
// Run State
// ============================================================================

/// Outcome of one track's enrichment, sent from a worker to the aggregator.
#[derive(Debug)]
pub struct TrackOutcome {
    pub track: Track,
    /// Rendered provider error after retry exhaustion, if the track failed.
    pub error: Option<String>,
}

/// Run-wide progress counters. Owned solely by the aggregator loop; workers
/// report completions through the outcome channel instead of sharing state.
#[derive(Clone, Copy, Debug, Default)]
pub struct RunStats {
    pub total: usize,
    pub completed: usize,
    pub succeeded: usize,
    pub failed: usize,
}

impl RunStats {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            ..Default::default()
        }
    }

    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            100.0 * self.completed as f64 / self.total as f64
        }
    }

    pub fn log_snapshot(&self) {
        log::info!(
            "count: {}/{} - {:.2}%",
            self.completed,
            self.total,
            self.percent()
        );
        log::info!("succeeded: {} - failed: {}", self.succeeded, self.failed);
    }
}
