pub mod aggregator;
pub mod backend;
pub mod batch;
pub mod config;
pub mod error;
pub mod fallback;
pub mod lyric;
pub mod paths;
pub mod quality;

pub use aggregator::{Aggregator, BatchUrls, LyricsOutcome, SongUrl};
pub use backend::{best_match, Backend, BackendId, Capability, RawLyrics, TrackInfo, TrackQuery};
pub use batch::{
    describe_partial_failure, extract_track_urls, normalize_track_ids, project_urls,
    BatchResolutionMaps, BATCH_MESSAGE_SEPARATOR,
};
pub use config::{Config, FallbackConfig, LyricsConfig, PlaybackConfig, CONFIG_TEMPLATE};
pub use error::{CoreError, Result};
pub use fallback::{collect_provider_matches, ProviderMatch};
pub use lyric::{LyricDocument, LyricLine, ParseOptions, Word, WordSyncedLine};
pub use paths::{config_dir, config_path, CONFIG_DIR_ENV, CONFIG_DIR_NAME, CONFIG_FILE_NAME};
pub use quality::{QualityPreference, QualityProfile, ResolvedUrl, Tier};

/// Re-export toml error type for config parsing error handling
pub use toml::de::Error as TomlParseError;
