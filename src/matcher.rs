//! Per-track candidate ranking: search, score each result's metadata, keep
//! the best, stop early once the match is confident enough.

use crate::models::{BestMatch, MatchConfig, Track};
use crate::normalize::{light_clean, strong_clean};
use crate::provider::{ProviderError, VideoProvider};
use crate::retry::RetryPolicy;
use crate::scoring::{asymmetric_token_distance, confidence, round2};

/// Find the best-matching video for one track, writing the computed fields
/// in place. Greedy scan in provider order with early exit; not globally
/// optimal by design.
///
/// Errors only on retry-exhausted provider calls; a scan that finds nothing
/// convincing still returns `Ok` with whatever best (possibly 0-confidence)
/// candidate it saw. Zero search results leave `track.best` as `None`.
pub fn enrich_track(
    track: &mut Track,
    provider: &dyn VideoProvider,
    retry: &RetryPolicy,
    cfg: &MatchConfig,
) -> Result<(), ProviderError> {
    // Two query passes: the raw strings, then a light-cleaned variant that
    // drops parenthesized noise. Raw results keep scan priority.
    let raw_query = format!("{} {} official", track.artists, track.song_name);
    let cleaned_query = light_clean(&raw_query);

    let mut results = retry.run("video search", || provider.search(&raw_query, cfg.max_results))?;
    let second_pass = retry.run("video search", || {
        provider.search(&cleaned_query, cfg.max_results)
    })?;
    results.extend(second_pass);

    let cleaned_artist = strong_clean(&track.artists);
    let cleaned_song = strong_clean(&track.song_name);
    track.search_terms = Some(cleaned_query);
    track.cleaned_artist = Some(cleaned_artist.clone());
    track.cleaned_song_name = Some(cleaned_song.clone());

    for (idx, hit) in results.iter().enumerate() {
        let meta = retry.run("metadata fetch", || provider.fetch_metadata(&hit.url))?;

        // Fold the search hit's fields into the raw metadata dump; absent
        // fields are skipped.
        let mut combined = meta.raw.clone();
        for part in [
            hit.title.as_deref(),
            hit.long_desc.as_deref(),
            hit.channel.as_deref(),
        ]
        .into_iter()
        .flatten()
        {
            combined.push(' ');
            combined.push_str(part);
        }
        let combined = strong_clean(&combined);

        let (artist_dist, matched_artist) = asymmetric_token_distance(&cleaned_artist, &combined);
        let (song_dist, matched_song) = asymmetric_token_distance(&cleaned_song, &combined);

        let mut score = confidence(artist_dist, song_dist);
        if meta.duration_sec >= cfg.duration_cutoff_sec {
            // Long-form content (mixes, compilations) never matches.
            score = 0.0;
        }

        let better = match &track.best {
            None => true,
            Some(best) => score > best.confidence,
        };
        if idx == 0 || better {
            track.best = Some(BestMatch {
                url: hit.url.clone(),
                confidence: score,
                artist_dist,
                song_name_dist: song_dist,
                matched_artist,
                matched_song,
                official: combined.contains("official"),
                result_idx: idx,
            });
        }

        if track
            .best
            .as_ref()
            .is_some_and(|b| b.confidence > cfg.confidence_exit)
        {
            break;
        }
    }

    if let Some(best) = track.best.as_mut() {
        best.confidence = round2(best.confidence);
    }
    Ok(())
}
