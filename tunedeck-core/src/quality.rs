//! Quality-tiered playback URL resolution.
//!
//! A backend usually offers a track in several encodings. The caller states a
//! [`QualityPreference`]; together with whether the caller is signed in, that
//! selects a [`QualityProfile`], an ordered list of [`Tier`]s that is tried
//! until one yields a URL.

use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::future::Future;
use std::str::FromStr;
use tracing::{debug, info};

/// Error-text markers that identify a paid-content restriction
const PAID_CONTENT_MARKERS: &[&str] = &["vip", "付费"];

const HIGH_CHAIN: &[Tier] = &[
    Tier::Mp3_320,
    Tier::Ogg192,
    Tier::Mp3_128,
    Tier::Aac192,
    Tier::Aac96,
    Tier::Aac48,
];

const BALANCED_CHAIN: &[Tier] = &[
    Tier::Ogg192,
    Tier::Mp3_128,
    Tier::Aac192,
    Tier::Aac96,
    Tier::Aac48,
];

const COMPAT_CHAIN: &[Tier] = &[Tier::Mp3_128, Tier::Aac96, Tier::Aac48, Tier::Ogg192];

/// What the listener asked for
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityPreference {
    /// Best the current credentials allow
    #[default]
    Auto,
    High,
    Balanced,
    /// Formats every player can decode
    Compat,
}

impl QualityPreference {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::High => "high",
            Self::Balanced => "balanced",
            Self::Compat => "compat",
        }
    }

    /// Lenient parse: unknown or missing values mean [`QualityPreference::Auto`].
    #[must_use]
    pub fn from_setting(value: Option<&str>) -> Self {
        value.and_then(|v| v.parse().ok()).unwrap_or_default()
    }
}

impl FromStr for QualityPreference {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "high" => Ok(Self::High),
            "balanced" => Ok(Self::Balanced),
            "compat" => Ok(Self::Compat),
            other => Err(CoreError::ConfigInvalid {
                message: format!("unknown quality preference: {other}"),
            }),
        }
    }
}

impl std::fmt::Display for QualityPreference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An encoding offered by a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tier {
    #[serde(rename = "MP3_320")]
    Mp3_320,
    #[serde(rename = "OGG_192")]
    Ogg192,
    #[serde(rename = "MP3_128")]
    Mp3_128,
    #[serde(rename = "ACC_192")]
    Aac192,
    #[serde(rename = "ACC_96")]
    Aac96,
    #[serde(rename = "ACC_48")]
    Aac48,
}

impl Tier {
    /// Name used by the backend APIs.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Mp3_320 => "MP3_320",
            Self::Ogg192 => "OGG_192",
            Self::Mp3_128 => "MP3_128",
            Self::Aac192 => "ACC_192",
            Self::Aac96 => "ACC_96",
            Self::Aac48 => "ACC_48",
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered tiers to try for one request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QualityProfile {
    tiers: &'static [Tier],
}

impl QualityProfile {
    /// Select the tier chain for a preference.
    ///
    /// Premium tiers need a signed-in account, so `High` and `Auto` use the
    /// balanced chain when unauthenticated.
    #[must_use]
    pub const fn select(preference: QualityPreference, is_authenticated: bool) -> Self {
        let tiers = match preference {
            QualityPreference::High | QualityPreference::Auto => {
                if is_authenticated {
                    HIGH_CHAIN
                } else {
                    BALANCED_CHAIN
                }
            }
            QualityPreference::Balanced => BALANCED_CHAIN,
            QualityPreference::Compat => COMPAT_CHAIN,
        };
        Self { tiers }
    }

    #[must_use]
    pub const fn tiers(&self) -> &'static [Tier] {
        self.tiers
    }
}

/// A URL together with the tier that produced it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedUrl {
    pub url: String,
    pub tier: Tier,
}

/// Try each tier of the selected profile in order until `fetch` returns a
/// non-empty URL.
///
/// `fetch` is called once per tier, strictly one after another. Its errors do
/// not stop the walk; the last one only feeds the final error classification.
///
/// # Errors
///
/// When every tier fails: [`CoreError::NotAuthenticated`] for unauthenticated
/// callers, [`CoreError::PaidContent`] when the last backend error mentions a
/// paid restriction, [`CoreError::TrackUnavailable`] otherwise.
pub async fn resolve_url<F, Fut, E>(
    track_id: &str,
    preference: QualityPreference,
    is_authenticated: bool,
    mut fetch: F,
) -> Result<ResolvedUrl>
where
    F: FnMut(Tier) -> Fut,
    Fut: Future<Output = std::result::Result<String, E>>,
    E: Display,
{
    let profile = QualityProfile::select(preference, is_authenticated);
    let mut last_error = String::new();

    for &tier in profile.tiers() {
        match fetch(tier).await {
            Ok(url) if !url.is_empty() => {
                info!("Resolved {track_id} at tier {tier} (preference: {preference})");
                return Ok(ResolvedUrl { url, tier });
            }
            Ok(_) => debug!("Tier {tier} has no URL for {track_id}"),
            Err(e) => {
                debug!("Tier {tier} failed for {track_id}: {e}");
                last_error = e.to_string();
            }
        }
    }

    Err(classify_failure(track_id, is_authenticated, &last_error))
}

fn classify_failure(track_id: &str, is_authenticated: bool, last_error: &str) -> CoreError {
    let track_id = track_id.to_string();
    let lowered = last_error.to_lowercase();

    if !is_authenticated {
        CoreError::NotAuthenticated { track_id }
    } else if PAID_CONTENT_MARKERS.iter().any(|m| lowered.contains(m)) {
        CoreError::PaidContent { track_id }
    } else {
        CoreError::TrackUnavailable { track_id }
    }
}
