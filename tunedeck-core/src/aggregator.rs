//! Routes requests to a primary backend and falls back to alternate
//! backends when it cannot serve them.

use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::backend::{Backend, BackendId, Capability, TrackInfo};
use crate::batch::{describe_partial_failure, normalize_track_ids, project_urls};
use crate::config::{Config, FallbackConfig};
use crate::error::Result;
use crate::fallback::{collect_provider_matches, ProviderMatch};
use crate::lyric::{self, LyricDocument, ParseOptions};
use crate::quality::{QualityPreference, Tier};

/// A playable URL and where it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SongUrl {
    pub url: String,
    pub tier: Tier,
    /// Id of the track on the backend that served the URL
    pub track_id: String,
    /// Set when an alternate backend served the request
    pub fallback: Option<BackendId>,
}

/// URLs for a batch of raw track ids
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchUrls {
    /// raw id (as supplied) -> URL
    pub urls: HashMap<String, String>,
    /// Partial-failure summary, empty when every id resolved
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LyricsOutcome {
    pub document: LyricDocument,
    pub fallback: Option<BackendId>,
}

type Candidate = ProviderMatch<Arc<dyn Backend>, TrackInfo>;

/// Front door for song, URL and lyric requests
pub struct Aggregator {
    primary: Arc<dyn Backend>,
    fallbacks: Vec<Arc<dyn Backend>>,
    fallback_config: FallbackConfig,
    word_synced: bool,
    parse_options: ParseOptions,
    cancel_token: CancellationToken,
}

impl Aggregator {
    /// Create an aggregator.
    ///
    /// # Arguments
    /// * `primary` - Backend every request goes to first
    /// * `fallbacks` - Alternate backends, ranked by `config.fallback.providers`
    /// * `config` - Loaded configuration
    #[must_use]
    pub fn new(
        primary: Arc<dyn Backend>,
        fallbacks: Vec<Arc<dyn Backend>>,
        config: &Config,
    ) -> Self {
        Self {
            primary,
            fallbacks,
            fallback_config: config.fallback.clone(),
            word_synced: config.lyrics.word_synced,
            parse_options: config.parse_options(),
            cancel_token: CancellationToken::new(),
        }
    }

    /// Get a clone of the cancellation token
    #[must_use]
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    /// Cancel outstanding fallback lookups. Later requests only use the
    /// primary backend.
    pub fn shutdown(&self) {
        info!("Aggregator shutting down");
        self.cancel_token.cancel();
    }

    /// Resolve a playable URL for `track`.
    ///
    /// # Errors
    ///
    /// Returns the primary backend's resolution error when no fallback
    /// backend can serve the track either.
    pub async fn song_url(
        &self,
        track: &TrackInfo,
        preference: QualityPreference,
    ) -> Result<SongUrl> {
        let primary_error = match self.primary.resolve_url(&track.id, preference).await {
            Ok(resolved) => {
                return Ok(SongUrl {
                    url: resolved.url,
                    tier: resolved.tier,
                    track_id: track.id.clone(),
                    fallback: None,
                })
            }
            Err(e) => e,
        };

        info!(
            "{} could not resolve {} - {}: {primary_error}",
            self.primary.name(),
            track.artist,
            track.title
        );

        for candidate in self.fallback_matches(track, Capability::Play).await {
            let backend = candidate.backend.id();
            match candidate
                .backend
                .resolve_url(&candidate.track.id, preference)
                .await
            {
                Ok(resolved) => {
                    info!("Using fallback {backend} at tier {}", resolved.tier);
                    return Ok(SongUrl {
                        url: resolved.url,
                        tier: resolved.tier,
                        track_id: candidate.track.id,
                        fallback: Some(backend),
                    });
                }
                Err(e) => debug!("Fallback {backend} could not resolve: {e}"),
            }
        }

        Err(primary_error)
    }

    /// Resolve URLs for many raw track ids in one primary-backend request.
    ///
    /// # Errors
    ///
    /// Returns an error if the primary backend's batch request fails.
    pub async fn song_urls<S: AsRef<str>>(&self, raw_ids: &[S]) -> Result<BatchUrls> {
        let maps = normalize_track_ids(raw_ids);

        let urls = if maps.request_ids.is_empty() {
            HashMap::new()
        } else {
            let backend_urls = self.primary.song_urls(&maps.request_ids).await?;
            project_urls(&maps.normalized, &backend_urls)
        };

        let message = describe_partial_failure(raw_ids.len(), urls.len(), maps.invalid.len());
        if !message.is_empty() {
            warn!("Batch URL request partially failed: {message}");
        }

        Ok(BatchUrls { urls, message })
    }

    /// Fetch and parse lyrics for `track`. An empty document means no
    /// backend had any.
    pub async fn lyrics(&self, track: &TrackInfo) -> LyricsOutcome {
        if self.primary.has_capability(Capability::Lyrics) {
            let document = self.fetch_document(&self.primary, &track.id).await;
            if !document.is_empty() {
                return LyricsOutcome {
                    document,
                    fallback: None,
                };
            }
        }

        for candidate in self.fallback_matches(track, Capability::Lyrics).await {
            let document = self
                .fetch_document(&candidate.backend, &candidate.track.id)
                .await;
            if !document.is_empty() {
                let backend = candidate.backend.id();
                info!(
                    "Found lyrics on fallback {backend} ({} lines)",
                    document.lines.len()
                );
                return LyricsOutcome {
                    document,
                    fallback: Some(backend),
                };
            }
        }

        info!("No lyrics found for {} - {}", track.artist, track.title);
        LyricsOutcome::default()
    }

    async fn fetch_document(&self, backend: &Arc<dyn Backend>, track_id: &str) -> LyricDocument {
        match backend.lyrics(track_id, self.word_synced).await {
            Ok(raw) => lyric::parse_with(&raw.lyric, &raw.translation, &self.parse_options),
            Err(e) => {
                debug!("{} returned no lyrics for {track_id}: {e}", backend.name());
                LyricDocument::default()
            }
        }
    }

    /// Match `track` on every fallback backend with `capability`, best
    /// priority first.
    async fn fallback_matches(&self, track: &TrackInfo, capability: Capability) -> Vec<Candidate> {
        if !self.fallback_config.enabled {
            return Vec::new();
        }

        let providers: Vec<_> = self
            .fallbacks
            .iter()
            .filter(|b| b.id() != track.backend && b.has_capability(capability))
            .map(|b| (b.id().to_string(), Arc::clone(b)))
            .collect();

        let query = track.query();
        let mut matches = collect_provider_matches(
            providers,
            move |backend: Arc<dyn Backend>| {
                let query = query.clone();
                async move { backend.match_track(&query).await }
            },
            std::time::Duration::from_millis(self.fallback_config.timeout_ms),
            &self.cancel_token,
        )
        .await;

        matches.sort_by_key(|m| self.fallback_config.priority(m.backend.id()));
        matches
    }
}
