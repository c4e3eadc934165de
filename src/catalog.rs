//! Catalog I/O: CSV loading with resume-by-diff, CSV writing with
//! resume merge.
//!
//! Every `*.csv` under the input directory is concatenated into one track
//! set keyed by ISRC. In resume mode the prior output's keys are subtracted
//! on load, and on save the new records are merged back into the prior
//! output with new-overwrites-old precedence on key conflicts. An absent or
//! unreadable prior output degrades both steps to non-resume behavior with
//! a logged error, never a failed run.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::models::Track;

const KEY_COLUMN: &str = "isrc";
const ARTISTS_COLUMN: &str = "artists";
const SONG_COLUMN: &str = "song_name";

/// Computed columns appended after the pass-through columns, in write order.
const COMPUTED_COLUMNS: [&str; 11] = [
    "search_terms",
    "cleaned_artist",
    "cleaned_song_name",
    "matched_artist",
    "artist_dist",
    "matched_song",
    "song_name_dist",
    "video_url",
    "video_confidence",
    "official",
    "result_idx",
];

/// Load every input CSV, optionally truncated to `subset` rows, minus the
/// tracks a prior output already covers when `resume` is set.
pub fn load_tracks(
    input_dir: &Path,
    resume: bool,
    output_path: &Path,
    subset: Option<usize>,
) -> Result<Vec<Track>> {
    log::info!("Loading csv files in {}.", input_dir.display());

    let mut files: Vec<PathBuf> = std::fs::read_dir(input_dir)
        .with_context(|| format!("Failed to read input directory {}", input_dir.display()))?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
        })
        .collect();
    files.sort();
    log::info!("Found {} csv files.", files.len());

    let mut tracks = Vec::new();
    let mut seen: FxHashSet<String> = FxHashSet::default();
    for file in &files {
        read_tracks_from(file, &mut tracks, &mut seen)?;
    }

    if let Some(limit) = subset {
        tracks.truncate(limit);
    }

    if resume {
        match read_output_keys(output_path) {
            Ok(done) => {
                let before = tracks.len();
                tracks.retain(|t| !done.contains(&t.isrc));
                log::info!(
                    "Resume: skipping {} already-processed tracks.",
                    before - tracks.len()
                );
            }
            Err(err) => {
                log::error!(
                    "Output file {} is not readable ({err:#}). Cannot resume.",
                    output_path.display()
                );
            }
        }
    }

    Ok(tracks)
}

fn read_tracks_from(
    path: &Path,
    tracks: &mut Vec<Track>,
    seen: &mut FxHashSet<String>,
) -> Result<()> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    let headers = reader.headers()?.clone();

    let position = |name: &str| headers.iter().position(|h| h == name);
    let Some(key_idx) = position(KEY_COLUMN) else {
        bail!("{}: missing required column '{KEY_COLUMN}'", path.display());
    };
    let Some(artists_idx) = position(ARTISTS_COLUMN) else {
        bail!("{}: missing required column '{ARTISTS_COLUMN}'", path.display());
    };
    let Some(song_idx) = position(SONG_COLUMN) else {
        bail!("{}: missing required column '{SONG_COLUMN}'", path.display());
    };

    for record in reader.records() {
        let record = record.with_context(|| format!("Malformed row in {}", path.display()))?;
        let isrc = record.get(key_idx).unwrap_or("").trim();
        if isrc.is_empty() {
            bail!("{}: row with empty '{KEY_COLUMN}' key", path.display());
        }
        if !seen.insert(isrc.to_string()) {
            log::warn!(
                "Duplicate isrc {isrc} in {}; keeping the first occurrence.",
                path.display()
            );
            continue;
        }

        let mut track = Track::new(
            isrc,
            record.get(artists_idx).unwrap_or(""),
            record.get(song_idx).unwrap_or(""),
        );
        for (idx, header) in headers.iter().enumerate() {
            if idx == key_idx || idx == artists_idx || idx == song_idx {
                continue;
            }
            track
                .extra
                .insert(header.to_string(), record.get(idx).unwrap_or("").to_string());
        }
        tracks.push(track);
    }

    Ok(())
}

/// Keys already present in a prior output file.
fn read_output_keys(path: &Path) -> Result<FxHashSet<String>> {
    let (headers, rows) = read_output_rows(path)?;
    debug_assert!(headers.iter().any(|h| h == KEY_COLUMN));
    Ok(rows
        .into_iter()
        .filter_map(|mut row| row.remove(KEY_COLUMN))
        .collect())
}

/// Full prior output as generic column->value rows, for merging.
fn read_output_rows(path: &Path) -> Result<(Vec<String>, Vec<FxHashMap<String, String>>)> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    if !headers.iter().any(|h| h == KEY_COLUMN) {
        bail!("{}: missing required column '{KEY_COLUMN}'", path.display());
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.with_context(|| format!("Malformed row in {}", path.display()))?;
        let mut row = FxHashMap::default();
        for (header, value) in headers.iter().zip(record.iter()) {
            row.insert(header.clone(), value.to_string());
        }
        rows.push(row);
    }
    Ok((headers, rows))
}

fn track_to_row(track: &Track) -> FxHashMap<String, String> {
    let mut row = FxHashMap::default();
    row.insert(KEY_COLUMN.to_string(), track.isrc.clone());
    row.insert(ARTISTS_COLUMN.to_string(), track.artists.clone());
    row.insert(SONG_COLUMN.to_string(), track.song_name.clone());
    for (key, value) in &track.extra {
        row.insert(key.clone(), value.clone());
    }
    if let Some(v) = &track.search_terms {
        row.insert("search_terms".to_string(), v.clone());
    }
    if let Some(v) = &track.cleaned_artist {
        row.insert("cleaned_artist".to_string(), v.clone());
    }
    if let Some(v) = &track.cleaned_song_name {
        row.insert("cleaned_song_name".to_string(), v.clone());
    }
    if let Some(best) = &track.best {
        row.insert("matched_artist".to_string(), best.matched_artist.clone());
        row.insert("artist_dist".to_string(), best.artist_dist.to_string());
        row.insert("matched_song".to_string(), best.matched_song.clone());
        row.insert("song_name_dist".to_string(), best.song_name_dist.to_string());
        row.insert("video_url".to_string(), best.url.clone());
        row.insert(
            "video_confidence".to_string(),
            format!("{:.2}", best.confidence),
        );
        row.insert("official".to_string(), best.official.to_string());
        row.insert("result_idx".to_string(), best.result_idx.to_string());
    }
    row
}

/// Write this run's records, merged with any prior output when `resume` is
/// set. On key conflicts the new record wins; a key is never written twice.
pub fn write_tracks(tracks: &[Track], output_path: &Path, resume: bool) -> Result<()> {
    let new_rows: Vec<FxHashMap<String, String>> = tracks.iter().map(track_to_row).collect();
    let new_keys: FxHashSet<&str> = tracks.iter().map(|t| t.isrc.as_str()).collect();

    let mut prior_headers: Vec<String> = Vec::new();
    let mut prior_rows: Vec<FxHashMap<String, String>> = Vec::new();
    if resume {
        match read_output_rows(output_path) {
            Ok((headers, rows)) => {
                prior_headers = headers;
                prior_rows = rows;
            }
            Err(err) => {
                log::error!(
                    "Output file {} is not readable ({err:#}). Writing this run's records only.",
                    output_path.display()
                );
            }
        }
    }

    // Column order: key + inputs, pass-through columns sorted, computed last.
    let fixed = [KEY_COLUMN, ARTISTS_COLUMN, SONG_COLUMN];
    let mut extras: BTreeSet<String> = BTreeSet::new();
    for track in tracks {
        extras.extend(track.extra.keys().cloned());
    }
    for header in &prior_headers {
        if !fixed.contains(&header.as_str()) && !COMPUTED_COLUMNS.contains(&header.as_str()) {
            extras.insert(header.clone());
        }
    }
    let mut columns: Vec<String> = fixed.iter().map(|c| c.to_string()).collect();
    columns.extend(extras);
    columns.extend(COMPUTED_COLUMNS.iter().map(|c| c.to_string()));

    log::info!("Writing file {}.", output_path.display());
    let mut writer = csv::Writer::from_path(output_path)
        .with_context(|| format!("Failed to create {}", output_path.display()))?;
    writer.write_record(&columns)?;

    let superseded = |row: &FxHashMap<String, String>| {
        row.get(KEY_COLUMN)
            .is_some_and(|key| new_keys.contains(key.as_str()))
    };
    for row in new_rows.iter().chain(prior_rows.iter().filter(|r| !superseded(r))) {
        let record: Vec<&str> = columns
            .iter()
            .map(|col| row.get(col).map(String::as_str).unwrap_or(""))
            .collect();
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BestMatch;
    use std::fs;

    fn write_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    fn enriched(isrc: &str, url: &str, confidence: f64) -> Track {
        let mut track = Track::new(isrc, "Artist", "Song");
        track.search_terms = Some("Artist Song official".to_string());
        track.cleaned_artist = Some("artist".to_string());
        track.cleaned_song_name = Some("song".to_string());
        track.best = Some(BestMatch {
            url: url.to_string(),
            confidence,
            artist_dist: 0.0,
            song_name_dist: 0.0,
            matched_artist: "artist".to_string(),
            matched_song: "song".to_string(),
            official: true,
            result_idx: 0,
        });
        track
    }

    #[test]
    fn loads_all_csv_files_with_passthrough_columns() {
        let dir = tempfile::tempdir().unwrap();
        write_file(
            dir.path(),
            "a.csv",
            "isrc,artists,song_name,album\nISRC001,Daft Punk,One More Time,Discovery\n",
        );
        write_file(
            dir.path(),
            "b.csv",
            "isrc,artists,song_name,album\nISRC002,Kino,Gruppa Krovi,Best Of\n",
        );

        let tracks =
            load_tracks(dir.path(), false, &dir.path().join("out.csv"), None).unwrap();
        assert_eq!(tracks.len(), 2);
        assert_eq!(tracks[0].isrc, "ISRC001");
        assert_eq!(tracks[0].extra.get("album").unwrap(), "Discovery");
        assert_eq!(tracks[1].artists, "Kino");
    }

    #[test]
    fn missing_key_column_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "a.csv", "artists,song_name\nDaft Punk,Around\n");
        let err = load_tracks(dir.path(), false, &dir.path().join("out.csv"), None)
            .unwrap_err();
        assert!(err.to_string().contains("isrc"));
    }

    #[test]
    fn duplicate_keys_keep_the_first_occurrence() {
        let dir = tempfile::tempdir().unwrap();
        write_file(
            dir.path(),
            "a.csv",
            "isrc,artists,song_name\nISRC001,First,Song\nISRC001,Second,Song\n",
        );
        let tracks =
            load_tracks(dir.path(), false, &dir.path().join("out.csv"), None).unwrap();
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].artists, "First");
    }

    #[test]
    fn subset_truncates_the_track_list() {
        let dir = tempfile::tempdir().unwrap();
        write_file(
            dir.path(),
            "a.csv",
            "isrc,artists,song_name\nISRC001,A,S\nISRC002,B,S\nISRC003,C,S\n",
        );
        let tracks =
            load_tracks(dir.path(), false, &dir.path().join("out.csv"), Some(2)).unwrap();
        assert_eq!(tracks.len(), 2);
    }

    #[test]
    fn resume_subtracts_keys_already_in_output() {
        let dir = tempfile::tempdir().unwrap();
        write_file(
            dir.path(),
            "a.csv",
            "isrc,artists,song_name\nISRC001,A,S\nISRC002,B,S\n",
        );
        let output = write_file(
            dir.path(),
            "out.csv",
            "isrc,artists,song_name,video_url\nISRC001,A,S,v1\n",
        );

        let tracks = load_tracks(dir.path(), true, &output, None).unwrap();
        // out.csv itself is also picked up as an input file in this layout,
        // but its only key is resumed away.
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].isrc, "ISRC002");
    }

    #[test]
    fn resume_with_missing_output_keeps_everything() {
        let dir = tempfile::tempdir().unwrap();
        write_file(
            dir.path(),
            "a.csv",
            "isrc,artists,song_name\nISRC001,A,S\nISRC002,B,S\n",
        );
        let tracks =
            load_tracks(dir.path(), true, &dir.path().join("absent.csv"), None).unwrap();
        assert_eq!(tracks.len(), 2);
    }

    #[test]
    fn write_and_merge_overwrites_on_key_conflict() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.csv");

        // First run: ISRC001 with a low-confidence match.
        write_tracks(&[enriched("ISRC001", "old-video", 0.40)], &output, false).unwrap();

        // Second run resumes with a better ISRC001 and a new ISRC002.
        write_tracks(
            &[
                enriched("ISRC001", "new-video", 0.95),
                enriched("ISRC002", "other-video", 0.80),
            ],
            &output,
            true,
        )
        .unwrap();

        let (_, rows) = read_output_rows(&output).unwrap();
        assert_eq!(rows.len(), 2);
        let row1 = rows
            .iter()
            .find(|r| r.get("isrc").map(String::as_str) == Some("ISRC001"))
            .unwrap();
        assert_eq!(row1.get("video_url").unwrap(), "new-video");
        assert_eq!(row1.get("video_confidence").unwrap(), "0.95");
        assert!(rows
            .iter()
            .any(|r| r.get("isrc").map(String::as_str) == Some("ISRC002")));
    }

    #[test]
    fn merge_keeps_prior_rows_with_disjoint_keys() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.csv");

        write_tracks(&[enriched("ISRC001", "v1", 1.0)], &output, false).unwrap();
        write_tracks(&[enriched("ISRC002", "v2", 1.0)], &output, true).unwrap();

        let (_, rows) = read_output_rows(&output).unwrap();
        let keys: Vec<&str> = rows
            .iter()
            .filter_map(|r| r.get("isrc").map(String::as_str))
            .collect();
        assert_eq!(keys, vec!["ISRC002", "ISRC001"]);
    }

    #[test]
    fn unprocessed_track_round_trips_with_empty_computed_fields() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.csv");

        let mut track = Track::new("ISRC009", "Artist", "Song");
        track.extra.insert("album".to_string(), "Album".to_string());
        write_tracks(&[track], &output, false).unwrap();

        let (headers, rows) = read_output_rows(&output).unwrap();
        assert!(headers.iter().any(|h| h == "album"));
        assert_eq!(rows[0].get("video_url").unwrap(), "");
        assert_eq!(rows[0].get("video_confidence").unwrap(), "");
        assert_eq!(rows[0].get("album").unwrap(), "Album");
    }
}
