use async_trait::async_trait;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};
use serde::Deserialize;
use std::fmt::Write;
use std::time::Duration;
use tracing::{debug, info, warn};
use tunedeck_core::{
    Backend, BackendId, Capability, CoreError, RawLyrics, Result, TrackInfo, TrackQuery,
};

const LRCLIB_API_URL: &str = "https://lrclib.net/api";

/// Default timeout for HTTP requests (10 seconds)
const DEFAULT_TIMEOUT_SECS: u64 = 10;
/// Default number of retry attempts
const DEFAULT_MAX_RETRIES: u32 = 3;

/// Duration tolerance for matching (±2 seconds)
const DURATION_TOLERANCE_SECS: f64 = 2.0;

const CAPABILITIES: &[Capability] = &[Capability::Search, Capability::Lyrics];

/// Calculate a score for duration matching (lower is better).
/// Returns 0 for exact matches, higher values for larger differences.
/// Capped at `i32::MAX` to prevent overflow.
fn duration_score(actual: Option<f64>, expected: Option<u32>, scale: f64) -> i32 {
    match (actual, expected) {
        (Some(d), Some(q)) => {
            let diff = (d - f64::from(q)).abs() * scale;
            #[allow(clippy::cast_possible_truncation)]
            if diff > f64::from(i32::MAX) {
                i32::MAX
            } else {
                diff as i32
            }
        }
        _ => 50, // Default score when duration is unknown
    }
}

/// LRCLIB.net backend. Searches tracks and serves their lyrics, nothing else.
pub struct LrclibBackend {
    client: ClientWithMiddleware,
    base_url: String,
}

impl LrclibBackend {
    /// Create a new LRCLIB backend with default 10-second timeout and 3 retries.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new() -> Result<Self> {
        Self::with_base_url(LRCLIB_API_URL)
    }

    /// Same as [`LrclibBackend::new`] against a different API root, for
    /// self-hosted mirrors.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self> {
        let base_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .connect_timeout(Duration::from_secs(5))
            .user_agent("Tunedeck/0.1 (https://github.com/tunedeck/tunedeck)")
            .build()?;

        // Wrap with retry middleware (exponential backoff)
        let retry_policy =
            ExponentialBackoff::builder().build_with_max_retries(DEFAULT_MAX_RETRIES);
        let client = ClientBuilder::new(base_client)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

/// Response from LRCLIB API
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LrclibResponse {
    id: i64,
    track_name: String,
    artist_name: String,
    album_name: Option<String>,
    duration: Option<f64>,
    #[serde(default)]
    instrumental: bool,
    plain_lyrics: Option<String>,
    synced_lyrics: Option<String>,
}

impl LrclibResponse {
    fn has_lyrics(&self) -> bool {
        self.synced_lyrics.is_some() || self.plain_lyrics.is_some()
    }

    fn track_info(&self) -> TrackInfo {
        TrackInfo {
            backend: BackendId::Lrclib,
            id: self.id.to_string(),
            title: self.track_name.clone(),
            artist: self.artist_name.clone(),
            album: self.album_name.clone().filter(|a| !a.is_empty()),
            duration_secs: self.duration.and_then(whole_seconds),
        }
    }

    /// Synced text wins over plain text; instrumentals have neither.
    fn raw_lyrics(self) -> RawLyrics {
        if self.instrumental {
            debug!("Track is instrumental (lrclib id: {})", self.id);
            return RawLyrics::default();
        }

        let lyric = [self.synced_lyrics, self.plain_lyrics]
            .into_iter()
            .flatten()
            .find(|text| !text.trim().is_empty())
            .unwrap_or_default();

        RawLyrics {
            lyric,
            translation: String::new(),
        }
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn whole_seconds(duration: f64) -> Option<u32> {
    (duration.is_finite() && duration >= 0.0 && duration <= f64::from(u32::MAX))
        .then(|| duration.round() as u32)
}

/// Prefer synced lyrics, then by duration match
fn best_candidate(
    results: Vec<LrclibResponse>,
    duration_secs: Option<u32>,
    scale: f64,
) -> Option<LrclibResponse> {
    results
        .into_iter()
        .filter(LrclibResponse::has_lyrics)
        .min_by_key(|r| {
            let sync_score: i32 = if r.synced_lyrics.is_some() { 0 } else { 100 };
            sync_score.saturating_add(duration_score(r.duration, duration_secs, scale))
        })
}

/// Keep results within ±2 seconds of the query duration, if it has one
fn within_duration(results: Vec<LrclibResponse>, duration_secs: Option<u32>) -> Vec<LrclibResponse> {
    let Some(expected) = duration_secs else {
        return results;
    };
    let expected = f64::from(expected);
    results
        .into_iter()
        .filter(|r| {
            r.duration
                .is_some_and(|d| (d - expected).abs() <= DURATION_TOLERANCE_SECS)
        })
        .collect()
}

fn exact_match_url(base_url: &str, query: &TrackQuery) -> String {
    let mut url = format!(
        "{}/get?artist_name={}&track_name={}",
        base_url,
        urlencoding::encode(&query.artist),
        urlencoding::encode(&query.title)
    );

    if let Some(ref album) = query.album {
        let _ = write!(url, "&album_name={}", urlencoding::encode(album));
    }

    if let Some(duration) = query.duration_secs {
        let _ = write!(url, "&duration={duration}");
    }

    url
}

#[async_trait]
impl Backend for LrclibBackend {
    fn id(&self) -> BackendId {
        BackendId::Lrclib
    }

    fn name(&self) -> &'static str {
        "LRCLIB"
    }

    fn capabilities(&self) -> &'static [Capability] {
        CAPABILITIES
    }

    async fn search(&self, query: &TrackQuery) -> Result<Vec<TrackInfo>> {
        let url = format!(
            "{}/search?track_name={}&artist_name={}",
            self.base_url,
            urlencoding::encode(&query.title),
            urlencoding::encode(&query.artist)
        );
        let results = self.get_results(&url).await?;
        Ok(results.iter().map(LrclibResponse::track_info).collect())
    }

    async fn match_track(&self, query: &TrackQuery) -> Result<Option<TrackInfo>> {
        info!(
            "Matching on LRCLIB: {} - {} (duration: {:?}s)",
            query.artist, query.title, query.duration_secs
        );

        // Try the /get endpoint first for exact match with artist + track + album + duration
        let url = exact_match_url(&self.base_url, query);
        debug!("LRCLIB GET (exact match): {}", url);

        let response = self.client.get(&url).send().await?;
        debug!("LRCLIB response status: {}", response.status());

        if response.status().is_success() {
            let result: LrclibResponse = response.json().await?;
            info!("LRCLIB found exact match with id: {}", result.id);
            return Ok(Some(result.track_info()));
        }

        if response.status() != reqwest::StatusCode::NOT_FOUND {
            warn!("LRCLIB returned status: {}", response.status());
        }

        if let Some(result) = self.search_by_track_name(query).await? {
            return Ok(Some(result.track_info()));
        }

        Ok(self
            .search_fallback(query)
            .await?
            .as_ref()
            .map(LrclibResponse::track_info))
    }

    async fn lyrics(&self, track_id: &str, _word_synced: bool) -> Result<RawLyrics> {
        let url = format!("{}/get/{}", self.base_url, urlencoding::encode(track_id));
        debug!("LRCLIB GET (by id): {}", url);

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(CoreError::BackendFailed {
                backend: BackendId::Lrclib,
                reason: format!("LRCLIB returned status: {}", response.status()),
            });
        }

        let result: LrclibResponse = response.json().await?;
        Ok(result.raw_lyrics())
    }
}

impl LrclibBackend {
    async fn get_results(&self, url: &str) -> Result<Vec<LrclibResponse>> {
        debug!("LRCLIB GET (search): {}", url);

        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(CoreError::BackendFailed {
                backend: BackendId::Lrclib,
                reason: format!("LRCLIB search returned status: {}", response.status()),
            });
        }

        Ok(response.json().await?)
    }

    /// Search by track name only and match duration within ±2 seconds
    async fn search_by_track_name(&self, query: &TrackQuery) -> Result<Option<LrclibResponse>> {
        let url = format!(
            "{}/search?track_name={}",
            self.base_url,
            urlencoding::encode(&query.title)
        );

        let results = match self.get_results(&url).await {
            Ok(results) => results,
            Err(e) => {
                warn!("{e}");
                return Ok(None);
            }
        };

        let filtered = within_duration(results, query.duration_secs);
        let best = best_candidate(filtered, query.duration_secs, 10.0);

        if let Some(ref result) = best {
            info!(
                "LRCLIB found match by track name + duration (id: {}, artist: {}, duration: {:?})",
                result.id, result.artist_name, result.duration
            );
        }
        Ok(best)
    }

    async fn search_fallback(&self, query: &TrackQuery) -> Result<Option<LrclibResponse>> {
        debug!("Trying LRCLIB search endpoint with artist + track as final fallback");

        let search_query = format!("{} {}", query.artist, query.title);
        let url = format!(
            "{}/search?q={}",
            self.base_url,
            urlencoding::encode(&search_query)
        );

        let results = self.get_results(&url).await?;
        let best = best_candidate(results, query.duration_secs, 1.0);

        match best {
            Some(ref result) => info!(
                "LRCLIB found match via full search (id: {}, artist: {})",
                result.id, result.artist_name
            ),
            None => info!("LRCLIB has no match for {} - {}", query.artist, query.title),
        }
        Ok(best)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn results(value: serde_json::Value) -> Vec<LrclibResponse> {
        serde_json::from_value(value).unwrap()
    }

    fn fixture() -> Vec<LrclibResponse> {
        results(json!([
            {
                "id": 1, "trackName": "Blue Sky", "artistName": "Aoi", "albumName": "",
                "duration": 215.0, "instrumental": false,
                "plainLyrics": "Blue sky", "syncedLyrics": null
            },
            {
                "id": 2, "trackName": "Blue Sky", "artistName": "Aoi", "albumName": "Skies",
                "duration": 201.4, "instrumental": false,
                "plainLyrics": "Blue sky", "syncedLyrics": "[00:01.00]Blue sky"
            },
            {
                "id": 3, "trackName": "Blue Sky", "artistName": "Aoi",
                "duration": 200.2, "instrumental": false,
                "plainLyrics": null, "syncedLyrics": null
            }
        ]))
    }

    #[test]
    fn test_duration_score() {
        assert_eq!(duration_score(Some(200.0), Some(200), 10.0), 0);
        assert_eq!(duration_score(Some(201.5), Some(200), 10.0), 15);
        assert_eq!(duration_score(None, Some(200), 10.0), 50);
        assert_eq!(duration_score(Some(f64::MAX), Some(0), 10.0), i32::MAX);
    }

    #[test]
    fn test_duration_filter_and_synced_preference() {
        let filtered = within_duration(fixture(), Some(200));
        let ids: Vec<_> = filtered.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![2, 3]);

        // id 3 is closer but has no lyrics at all
        let best = best_candidate(filtered, Some(200), 10.0).unwrap();
        assert_eq!(best.id, 2);
    }

    #[test]
    fn test_synced_beats_closer_plain() {
        let mut candidates = fixture();
        candidates[0].duration = Some(200.0);
        let best = best_candidate(candidates, Some(200), 1.0).unwrap();
        assert_eq!(best.id, 2);
    }

    #[test]
    fn test_no_duration_keeps_everything() {
        assert_eq!(within_duration(fixture(), None).len(), 3);
    }

    #[test]
    fn test_track_info_conversion() {
        let info: Vec<_> = fixture().iter().map(LrclibResponse::track_info).collect();

        assert_eq!(info[0].backend, BackendId::Lrclib);
        assert_eq!(info[0].id, "1");
        assert_eq!(info[0].album, None);
        assert_eq!(info[1].album.as_deref(), Some("Skies"));
        assert_eq!(info[1].duration_secs, Some(201));
        assert_eq!(whole_seconds(-1.0), None);
        assert_eq!(whole_seconds(f64::NAN), None);
    }

    #[test]
    fn test_raw_lyrics_prefers_synced() {
        let mut all = fixture();
        let synced = all.remove(1).raw_lyrics();
        assert_eq!(synced.lyric, "[00:01.00]Blue sky");

        let plain = all.remove(0).raw_lyrics();
        assert_eq!(plain.lyric, "Blue sky");

        let instrumental = results(json!([{
            "id": 9, "trackName": "Intro", "artistName": "Aoi", "duration": 60.0,
            "instrumental": true, "plainLyrics": "x", "syncedLyrics": "[00:00.00]x"
        }]))
        .remove(0)
        .raw_lyrics();
        assert!(instrumental.lyric.is_empty());
    }

    #[test]
    fn test_blank_synced_falls_back_to_plain() {
        let response = results(json!([{
            "id": 5, "trackName": "T", "artistName": "A",
            "plainLyrics": "words", "syncedLyrics": "  \n"
        }]))
        .remove(0);
        assert_eq!(response.raw_lyrics().lyric, "words");
    }

    #[test]
    fn test_exact_match_url() {
        let query = TrackQuery::new("Blue Sky", "Aoi & Co")
            .with_album("Skies")
            .with_duration(201);
        assert_eq!(
            exact_match_url("https://lrclib.net/api", &query),
            "https://lrclib.net/api/get?artist_name=Aoi%20%26%20Co&track_name=Blue%20Sky&album_name=Skies&duration=201"
        );
    }

    #[test]
    fn test_base_url_is_normalized() {
        let backend = LrclibBackend::with_base_url("http://localhost:3000/api/").unwrap();
        assert_eq!(backend.base_url, "http://localhost:3000/api");
        assert!(backend.has_capability(Capability::Lyrics));
        assert!(!backend.has_capability(Capability::Play));
    }
}
