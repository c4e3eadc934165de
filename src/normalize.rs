//! String normalization for query building and metadata matching.
//!
//! Two transforms: `light_clean` tidies a string while preserving case and
//! script (used for the second search query), `strong_clean` reduces a
//! string to a lowercase token soup suitable for the distance scorer.

use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

/// Non-greedy `(...)` / `[...]` spans, including mixed delimiters.
static BRACKETED_SPAN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\(\[].*?[\)\]]").unwrap());

/// Regex to collapse runs of whitespace into a single space.
static MULTI_SPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Featuring markers removed from cleaned strings, in application order.
/// Matched literally against the already-lowercased string.
const FEAT_MARKERS: [&str; 4] = ["featurering", "feature", "feat.", "ft."];

/// Check if a character is a Unicode combining mark (diacritical mark).
/// Used to filter out accents during normalization.
fn is_combining_mark(c: char) -> bool {
    matches!(c as u32, 0x0300..=0x036F | 0x1AB0..=0x1AFF | 0x1DC0..=0x1DFF | 0xFE20..=0xFE2F)
}

/// Strip diacritics via NFD decomposition, keeping base letters in any
/// script. e.g., "Beyoncé" → "Beyonce", "Motörhead" → "Motorhead"
fn strip_diacritics(s: &str) -> String {
    s.nfd().filter(|c| !is_combining_mark(*c)).collect()
}

/// Characters allowed to survive `strong_clean`: ASCII alphanumerics, the
/// space, and letters from the explicitly supported non-Latin blocks.
fn is_allowed(c: char) -> bool {
    c.is_ascii_alphanumeric()
        || c == ' '
        || matches!(c as u32,
            0xAC00..=0xD7A3     // Hangul syllables
            | 0x3040..=0x30FF   // Hiragana + Katakana
            | 0x4E00..=0x9FFF   // CJK unified ideographs
            | 0x0400..=0x04FF   // Cyrillic
            | 0x0E00..=0x0E7F)  // Thai
}

/// Light cleanup: strip bracketed spans, collapse whitespace, trim.
/// Preserves case and non-Latin scripts.
pub fn light_clean(s: &str) -> String {
    let stripped = BRACKETED_SPAN.replace_all(s, " ");
    MULTI_SPACE.replace_all(&stripped, " ").trim().to_string()
}

/// Aggressive cleanup for matching: lowercase, strip bracketed spans and
/// stray brackets, fold `/` and `&` to spaces, strip diacritics, drop
/// featuring markers, then keep only the allowed alphabet.
///
/// Total and idempotent: `strong_clean(strong_clean(x)) == strong_clean(x)`.
pub fn strong_clean(s: &str) -> String {
    let lowered = s.to_lowercase();
    let stripped = BRACKETED_SPAN.replace_all(&lowered, " ");
    let mut out = stripped.replace(['[', ']', '(', ')', '/', '&'], " ");
    out = strip_diacritics(&out);
    for marker in FEAT_MARKERS {
        out = out.replace(marker, "");
    }
    let filtered: String = out
        .chars()
        .map(|c| if is_allowed(c) { c } else { ' ' })
        .collect();
    MULTI_SPACE.replace_all(&filtered, " ").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn light_clean_strips_bracketed_spans() {
        assert_eq!(light_clean("One More Time (Radio Edit)"), "One More Time");
        assert_eq!(light_clean("Song [Remastered 2021] Title"), "Song Title");
        assert_eq!(light_clean("  spaced   out  "), "spaced out");
    }

    #[test]
    fn light_clean_preserves_case_and_script() {
        assert_eq!(light_clean("Daft Punk"), "Daft Punk");
        assert_eq!(light_clean("ДДТ (Live)"), "ДДТ");
    }

    #[test]
    fn strong_clean_lowercases_and_strips_punctuation() {
        assert_eq!(strong_clean("AC/DC & Friends!"), "ac dc friends");
        assert_eq!(strong_clean("One More Time (Radio Edit)"), "one more time");
        assert_eq!(strong_clean("Song [Live] (Acoustic)"), "song");
    }

    #[test]
    fn strong_clean_strips_diacritics_keeping_base_letters() {
        assert_eq!(strong_clean("Beyoncé"), "beyonce");
        assert_eq!(strong_clean("Motörhead"), "motorhead");
        assert_eq!(strong_clean("naïve"), "naive");
    }

    #[test]
    fn strong_clean_keeps_allowed_scripts() {
        assert_eq!(strong_clean("강남스타일"), "강남스타일");
        assert_eq!(strong_clean("キラキラ"), "キラキラ");
        assert_eq!(strong_clean("Кино - Группа крови"), "кино группа крови");
        assert_eq!(strong_clean("สวัสดี"), "สวัสดี");
        // Hebrew is not in the allowed blocks and folds away.
        assert_eq!(strong_clean("שלום hello"), "hello");
    }

    #[test]
    fn strong_clean_removes_featuring_markers() {
        assert_eq!(strong_clean("Song feat. Artist"), "song artist");
        assert_eq!(strong_clean("Song ft. Artist"), "song artist");
        assert_eq!(strong_clean("Song Feature Artist"), "song artist");
    }

    #[test]
    fn strong_clean_is_idempotent() {
        for s in [
            "Daft Punk - One More Time (Official Video)",
            "AC/DC & Friends feat. Someone",
            "Кино (Live) [2021] ££",
            "",
            "   ",
            "強い曲 feat. 誰か",
        ] {
            let once = strong_clean(s);
            assert_eq!(strong_clean(&once), once, "not idempotent for {s:?}");
        }
    }

    #[test]
    fn strong_clean_output_alphabet_is_restricted() {
        for s in [
            "Hello, Wörld! ~ (test) — 中文 / 한국어 & русский? ไทย",
            "emoji 🎵 and punctuation!!!",
            "tabs\tand\nnewlines",
        ] {
            let cleaned = strong_clean(s);
            assert!(
                cleaned.chars().all(is_allowed),
                "disallowed char survived in {cleaned:?}"
            );
            assert!(!cleaned.contains("  "), "double space in {cleaned:?}");
        }
    }

    #[test]
    fn strong_clean_total_on_empty_input() {
        assert_eq!(strong_clean(""), "");
        assert_eq!(light_clean(""), "");
    }
}
