use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use tunedeck_core::lyric::{self, LyricDocument};
use tunedeck_core::{Aggregator, Backend, Config, CoreError, TrackQuery};
use tunedeck_lyrics_lrclib::LrclibBackend;

#[derive(Debug, Parser)]
#[command(name = "tunedeck", version, about = "Timed lyrics and multi-backend track lookup")]
struct Cli {
    /// Override config file path.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Parse a lyric file and print the document as JSON.
    Parse {
        lyric_file: PathBuf,
        /// Translation file with matching time tags.
        #[arg(long)]
        translation: Option<PathBuf>,
        /// Print only the line active at this position (milliseconds).
        #[arg(long)]
        at: Option<u32>,
    },
    /// Look up a track's lyrics on LRCLIB and print them.
    Lyrics {
        #[arg(long)]
        title: String,
        #[arg(long)]
        artist: String,
        #[arg(long)]
        album: Option<String>,
        /// Track length in seconds, improves matching.
        #[arg(long)]
        duration: Option<u32>,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Parse {
            lyric_file,
            translation,
            at,
        } => parse_file(&config, &lyric_file, translation.as_deref(), at),
        Command::Lyrics {
            title,
            artist,
            album,
            duration,
        } => {
            let mut query = TrackQuery::new(title, artist);
            if let Some(album) = album {
                query = query.with_album(album);
            }
            if let Some(duration) = duration {
                query = query.with_duration(duration);
            }
            lookup_lyrics(&config, &query).await
        }
    }
}

/// Logs go to stderr so stdout stays machine-readable
fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,reqwest_retry=warn"));

    let fmt_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}

fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    if let Some(path) = path {
        return Config::load_from(path)
            .with_context(|| format!("failed to load config from {}", path.display()));
    }

    match Config::load_or_create() {
        Ok(config) => Ok(config),
        Err(CoreError::ConfigNotFound { path }) => {
            info!(
                "Created config template at {}, using defaults",
                path.display()
            );
            Ok(Config::default())
        }
        Err(e) => Err(e).context("failed to load config"),
    }
}

fn parse_file(
    config: &Config,
    lyric_file: &Path,
    translation: Option<&Path>,
    at: Option<u32>,
) -> anyhow::Result<()> {
    let lyric_text = std::fs::read_to_string(lyric_file)
        .with_context(|| format!("failed to read {}", lyric_file.display()))?;
    let translation_text = match translation {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?,
        None => String::new(),
    };

    let document = lyric::parse_with(&lyric_text, &translation_text, &config.parse_options());
    if document.is_empty() {
        warn!("No timed lyrics in {}", lyric_file.display());
    }

    match at {
        Some(position_ms) => {
            if let Some(line) = document.current_line(position_ms) {
                println!("{}", serde_json::to_string_pretty(line)?);
            }
        }
        None => println!("{}", serde_json::to_string_pretty(&document)?),
    }
    Ok(())
}

async fn lookup_lyrics(config: &Config, query: &TrackQuery) -> anyhow::Result<()> {
    let lrclib: Arc<dyn Backend> = Arc::new(LrclibBackend::new()?);

    let Some(track) = lrclib.match_track(query).await? else {
        warn!("No LRCLIB match for {} - {}", query.artist, query.title);
        return Ok(());
    };

    let aggregator = Aggregator::new(lrclib, Vec::new(), config);
    let outcome = aggregator.lyrics(&track).await;
    print_lines(&outcome.document);
    Ok(())
}

fn print_lines(document: &LyricDocument) {
    for line in &document.lines {
        let minutes = line.time_ms / 60_000;
        let seconds = line.time_ms % 60_000 / 1000;
        let centis = line.time_ms % 1000 / 10;
        println!("[{minutes:02}:{seconds:02}.{centis:02}] {}", line.text);
        if let Some(ref translation) = line.translation {
            println!("           {translation}");
        }
    }
}
