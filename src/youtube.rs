//! YouTube search and watch-page scraping.
//!
//! Both pages embed their data as JSON assigned to a well-known variable in
//! an inline script. The parsers locate that assignment, deserialize the
//! first complete JSON value after it, and walk the renderer tree. They are
//! plain functions over the page text so tests can feed handcrafted pages.

use serde_json::Value;

use crate::models::{SearchHit, VideoMetadata};
use crate::provider::{ProviderError, VideoProvider};

const SEARCH_URL: &str = "https://www.youtube.com/results?search_query=";
const WATCH_URL_PREFIX: &str = "https://www.youtube.com/watch?v=";

const SEARCH_DATA_MARKER: &str = "ytInitialData = ";
const PLAYER_DATA_MARKER: &str = "var ytInitialPlayerResponse = ";

pub struct YoutubeProvider {
    agent: ureq::Agent,
}

impl YoutubeProvider {
    pub fn new() -> Self {
        Self {
            agent: ureq::Agent::new_with_defaults(),
        }
    }

    fn fetch_page(&self, url: &str) -> Result<String, ProviderError> {
        self.agent
            .get(url)
            .call()
            .map_err(|e| ProviderError::Http(e.to_string()))?
            .body_mut()
            .read_to_string()
            .map_err(|e| ProviderError::Http(e.to_string()))
    }
}

impl Default for YoutubeProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl VideoProvider for YoutubeProvider {
    fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>, ProviderError> {
        let url = format!("{SEARCH_URL}{}", urlencoding::encode(query));
        let page = self.fetch_page(&url)?;
        parse_search_results(&page, max_results)
    }

    fn fetch_metadata(&self, url: &str) -> Result<VideoMetadata, ProviderError> {
        let page = self.fetch_page(url)?;
        parse_video_metadata(&page)
    }
}

/// Extract the first JSON value assigned after `marker` in the page.
fn embedded_json(page: &str, marker: &str) -> Result<Value, ProviderError> {
    let start = page
        .find(marker)
        .ok_or_else(|| ProviderError::Parse(format!("page data marker '{marker}' not found")))?;
    let tail = &page[start + marker.len()..];
    // The assignment is followed by `;</script>` and more markup; the stream
    // deserializer stops cleanly at the end of the first value.
    serde_json::Deserializer::from_str(tail)
        .into_iter::<Value>()
        .next()
        .ok_or_else(|| ProviderError::Parse("empty page data assignment".to_string()))?
        .map_err(|e| ProviderError::Parse(format!("malformed page data: {e}")))
}

/// Pull up to `max_results` video renderers out of a search results page.
pub fn parse_search_results(page: &str, max_results: usize) -> Result<Vec<SearchHit>, ProviderError> {
    let data = embedded_json(page, SEARCH_DATA_MARKER)?;
    let sections = data
        .pointer("/contents/twoColumnSearchResultsRenderer/primaryContents/sectionListRenderer/contents")
        .and_then(Value::as_array)
        .ok_or_else(|| ProviderError::Parse("search results layout not recognized".to_string()))?;

    let mut hits = Vec::new();
    for section in sections {
        let Some(items) = section
            .pointer("/itemSectionRenderer/contents")
            .and_then(Value::as_array)
        else {
            continue;
        };
        for item in items {
            let Some(video) = item.get("videoRenderer") else {
                continue;
            };
            let Some(id) = video.get("videoId").and_then(Value::as_str) else {
                continue;
            };
            hits.push(SearchHit {
                url: format!("{WATCH_URL_PREFIX}{id}"),
                title: runs_text(video.pointer("/title/runs")),
                long_desc: runs_text(
                    video.pointer("/detailedMetadataSnippets/0/snippetText/runs"),
                ),
                channel: runs_text(video.pointer("/longBylineText/runs")),
            });
            if hits.len() >= max_results {
                return Ok(hits);
            }
        }
    }
    Ok(hits)
}

/// Concatenate the `text` fields of a `runs` array, if present.
fn runs_text(runs: Option<&Value>) -> Option<String> {
    let runs = runs?.as_array()?;
    let text: String = runs
        .iter()
        .filter_map(|run| run.get("text").and_then(Value::as_str))
        .collect();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Read the duration and raw details blob out of a watch page.
pub fn parse_video_metadata(page: &str) -> Result<VideoMetadata, ProviderError> {
    let data = embedded_json(page, PLAYER_DATA_MARKER)?;
    let details = data
        .get("videoDetails")
        .ok_or_else(|| ProviderError::MissingField("videoDetails".to_string()))?;

    let duration_sec = match details.get("lengthSeconds").and_then(Value::as_str) {
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            log::warn!("Unparseable video length '{raw}'; treating the video as zero-length.");
            0
        }),
        None => {
            log::warn!("Watch page has no length; treating the video as zero-length.");
            0
        }
    };

    Ok(VideoMetadata {
        duration_sec,
        raw: details.to_string(),
    })
}
