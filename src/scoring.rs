//! Scoring functions for candidate ranking.
//!
//! The core metric is an asymmetric token distance: the fraction of a short
//! string's tokens that do NOT occur as substrings of a long string. It is
//! cheap, order-insensitive, and deliberately asymmetric - the long string
//! is noisy metadata, the short string is a known artist or title.

/// Asymmetric token distance between two already strong-cleaned strings.
///
/// `short` is split on whitespace; single-letter tokens are pulled out and
/// re-joined into one replacement token so initials ("B B King") don't each
/// count as a full hit or miss. Each token missing from `long` (substring
/// containment, not word-boundary aware) adds `1/token_count`.
///
/// Returns the distance in [0, 1] and the space-joined tokens that were
/// found. An empty `short` has no tokens to miss: `(0.0, "")`.
pub fn asymmetric_token_distance(short: &str, long: &str) -> (f64, String) {
    // Token length is counted in characters, not bytes; a lone Cyrillic or
    // CJK letter is still a single-letter token.
    let is_single = |t: &str| t.chars().nth(1).is_none();
    let mut tokens: Vec<String> = short
        .split_whitespace()
        .filter(|t| !is_single(t))
        .map(str::to_string)
        .collect();
    let singles: Vec<&str> = short.split_whitespace().filter(|t| is_single(t)).collect();
    if !singles.is_empty() {
        tokens.push(singles.join(" "));
    }

    if tokens.is_empty() {
        return (0.0, String::new());
    }

    let unit = 1.0 / tokens.len() as f64;
    let mut dist = 0.0;
    let mut matched: Vec<&str> = Vec::new();
    for token in &tokens {
        if long.contains(token.as_str()) {
            matched.push(token);
        } else {
            dist += unit;
        }
    }

    (dist, matched.join(" "))
}

/// Confidence that a candidate matches a track: the mean of the two
/// inverted distances. 1.0 when artist and title were both found exactly,
/// 0.5 when only one of them was, 0.0 when neither.
pub fn confidence(artist_dist: f64, song_dist: f64) -> f64 {
    ((1.0 - song_dist) + (1.0 - artist_dist)) / 2.0
}

/// Round to 2 decimals for the persisted confidence score.
pub fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}
