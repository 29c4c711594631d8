//! Backend identification, capabilities and the [`Backend`] trait.

use crate::error::{CoreError, Result};
use crate::quality::{self, QualityPreference, ResolvedUrl, Tier};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;

/// Maximum duration difference for two tracks to count as the same recording
const MATCH_DURATION_TOLERANCE_SECS: u32 = 3;

/// Identifies a music backend.
///
/// The string form is stable and is used in config files and in results that
/// report which backend served a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendId {
    #[serde(rename = "qqmusic")]
    QqMusic,
    Netease,
    Spotify,
    Lrclib,
}

impl BackendId {
    pub const ALL: [Self; 4] = [Self::QqMusic, Self::Netease, Self::Spotify, Self::Lrclib];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::QqMusic => "qqmusic",
            Self::Netease => "netease",
            Self::Spotify => "spotify",
            Self::Lrclib => "lrclib",
        }
    }
}

impl std::fmt::Display for BackendId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|id| id.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| CoreError::ConfigInvalid {
                message: format!("unknown backend: {s}"),
            })
    }
}

/// Optional operations a backend may offer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    Search,
    Play,
    BatchUrls,
    Lyrics,
    LyricsWordByWord,
    LyricsTranslation,
    QualitySelection,
}

impl Capability {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Search => "search",
            Self::Play => "play",
            Self::BatchUrls => "batch_urls",
            Self::Lyrics => "lyrics",
            Self::LyricsWordByWord => "lyrics_word_by_word",
            Self::LyricsTranslation => "lyrics_translation",
            Self::QualitySelection => "quality_selection",
        }
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Search parameters used to find a track on a backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackQuery {
    pub title: String,
    pub artist: String,
    pub album: Option<String>,
    /// Track duration in seconds (for matching)
    pub duration_secs: Option<u32>,
}

impl TrackQuery {
    pub fn new(title: impl Into<String>, artist: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            artist: artist.into(),
            album: None,
            duration_secs: None,
        }
    }

    #[must_use]
    pub fn with_album(mut self, album: impl Into<String>) -> Self {
        self.album = Some(album.into());
        self
    }

    #[must_use]
    pub const fn with_duration(mut self, duration_secs: u32) -> Self {
        self.duration_secs = Some(duration_secs);
        self
    }
}

/// A track as known to one specific backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrackInfo {
    pub backend: BackendId,
    /// Backend-specific track identifier
    pub id: String,
    pub title: String,
    pub artist: String,
    pub album: Option<String>,
    pub duration_secs: Option<u32>,
}

impl TrackInfo {
    /// Query describing this track, for looking it up elsewhere
    #[must_use]
    pub fn query(&self) -> TrackQuery {
        TrackQuery {
            title: self.title.clone(),
            artist: self.artist.clone(),
            album: self.album.clone(),
            duration_secs: self.duration_secs,
        }
    }
}

/// Unparsed lyric payload as returned by a backend
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawLyrics {
    pub lyric: String,
    /// Translation text, empty when the backend has none
    pub translation: String,
}

/// The error every default capability returns.
#[must_use]
pub const fn unsupported(backend: BackendId, capability: Capability) -> CoreError {
    CoreError::Unsupported {
        backend,
        capability,
    }
}

/// A music backend.
///
/// Only identity is required. Every other operation is optional and defaults
/// to [`CoreError::Unsupported`], so callers dispatch on [`Capability`]
/// instead of probing implementations.
#[async_trait]
pub trait Backend: Send + Sync {
    fn id(&self) -> BackendId;

    /// Human-readable name
    fn name(&self) -> &'static str;

    fn capabilities(&self) -> &'static [Capability];

    fn has_capability(&self, capability: Capability) -> bool {
        self.capabilities().contains(&capability)
    }

    /// Whether the backend currently holds valid credentials.
    async fn is_authenticated(&self) -> bool {
        false
    }

    /// Search for tracks.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot search or the request fails.
    async fn search(&self, _query: &TrackQuery) -> Result<Vec<TrackInfo>> {
        Err(unsupported(self.id(), Capability::Search))
    }

    /// Fetch the URL of one track encoded at `tier`. An empty string means
    /// the tier is not available for this track.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot play tracks or the request fails.
    async fn song_url(&self, _track_id: &str, _tier: Tier) -> Result<String> {
        Err(unsupported(self.id(), Capability::Play))
    }

    /// Fetch URLs for many tracks at once. Ids the backend cannot resolve are
    /// left out of the returned map.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend has no batch endpoint or the request fails.
    async fn song_urls(&self, _track_ids: &[i64]) -> Result<HashMap<String, String>> {
        Err(unsupported(self.id(), Capability::BatchUrls))
    }

    /// Fetch raw lyric text.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend has no lyrics or the request fails.
    async fn lyrics(&self, _track_id: &str, _word_synced: bool) -> Result<RawLyrics> {
        Err(unsupported(self.id(), Capability::Lyrics))
    }

    /// Find this backend's equivalent of a track from another backend.
    ///
    /// # Errors
    ///
    /// Returns an error if searching fails.
    async fn match_track(&self, query: &TrackQuery) -> Result<Option<TrackInfo>> {
        let candidates = self.search(query).await?;
        Ok(best_match(query, candidates))
    }

    /// Resolve a playable URL, walking the quality tiers for `preference`.
    ///
    /// # Errors
    ///
    /// Returns a classified resolution error when every tier fails.
    async fn resolve_url(
        &self,
        track_id: &str,
        preference: QualityPreference,
    ) -> Result<ResolvedUrl> {
        let authenticated = self.is_authenticated().await;
        quality::resolve_url(track_id, preference, authenticated, |tier| {
            self.song_url(track_id, tier)
        })
        .await
    }
}

/// Pick the candidate that is the same recording as `query`.
///
/// Title and artist must agree after case and whitespace folding (either
/// artist string may contain the other, to tolerate featured artists). When
/// both durations are known they must be within a few seconds; the closest
/// duration wins.
#[must_use]
pub fn best_match(query: &TrackQuery, candidates: Vec<TrackInfo>) -> Option<TrackInfo> {
    let title = fold(&query.title);
    let artist = fold(&query.artist);

    candidates
        .into_iter()
        .filter(|c| fold(&c.title) == title)
        .filter(|c| {
            let candidate_artist = fold(&c.artist);
            candidate_artist.contains(&artist) || artist.contains(&candidate_artist)
        })
        .filter_map(|c| match (c.duration_secs, query.duration_secs) {
            (Some(actual), Some(expected)) => {
                let diff = actual.abs_diff(expected);
                (diff <= MATCH_DURATION_TOLERANCE_SECS).then_some((diff, c))
            }
            // Unknown duration ranks after any known match
            _ => Some((MATCH_DURATION_TOLERANCE_SECS + 1, c)),
        })
        .min_by_key(|(diff, _)| *diff)
        .map(|(_, c)| c)
}

fn fold(s: &str) -> String {
    s.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
