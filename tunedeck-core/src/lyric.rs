//! Time-coded lyric parsing.
//!
//! Two source formats are understood:
//!
//! - line-synced text, one or more `[mm:ss.xx]` tags per line
//! - word-synced text, a `[start,duration]` line tag followed by
//!   `word(start,duration)` segments (the optional third marker component is
//!   ignored)
//!
//! Both end up in a [`LyricDocument`]. Parsing never fails: input that cannot
//! be understood simply produces fewer (or no) lines.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::HashMap;

/// Duration given to a word whose timing marker is malformed or zero-length.
pub const DEFAULT_WORD_DURATION_MS: u32 = 100;

/// Credit labels (lyricist, composer, arranger) that open metadata lines.
const CREDIT_LABELS: &[&str] = &["作词", "作曲", "编曲"];

/// Separator used by title/artist header lines.
const TITLE_ARTIST_SEPARATOR: &str = " - ";

// `mm:ss.xxx` / `mm:ss:xxx`, fraction optional
#[allow(clippy::expect_used)]
static TIME_TAG_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d+):(\d+)(?:[.:](\d{1,3}))?$").expect("TIME_TAG_REGEX should compile")
});

// `start,duration` / `start,duration,extra` inside a line-level tag
#[allow(clippy::expect_used)]
static WORD_LINE_TAG_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d+),(\d+)(?:,\d+)?$").expect("WORD_LINE_TAG_REGEX should compile")
});

// Well-formed inline marker, used for format detection
#[allow(clippy::expect_used)]
static WORD_MARKER_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\((\d+),(\d+)(?:,\d+)?\)").expect("WORD_MARKER_REGEX should compile")
});

// Any marker-shaped group, including ones with unparsable components
#[allow(clippy::expect_used)]
static LOOSE_WORD_MARKER_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\(([^\s(),]+),([^\s(),]+)(?:,[^\s(),]*)?\)")
        .expect("LOOSE_WORD_MARKER_REGEX should compile")
});

#[allow(clippy::expect_used)]
static COORDINATE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\(\d+(?:,\d+)*\)$").expect("COORDINATE_REGEX should compile")
});

#[allow(clippy::expect_used)]
static PUNCTUATION_ONLY_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[\p{P}\p{Z}\s]+$").expect("PUNCTUATION_ONLY_REGEX should compile")
});

/// A parsed lyric document.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LyricDocument {
    /// Line-level view. Always populated, also for word-synced sources.
    pub lines: Vec<LyricLine>,
    /// Whether the source carried per-word timing
    pub is_word_synced: bool,
    /// Word-level view, only present for word-synced sources
    #[serde(skip_serializing_if = "Option::is_none")]
    pub word_lines: Option<Vec<WordSyncedLine>>,
}

/// A single line of lyrics with its start time
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LyricLine {
    pub time_ms: u32,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub translation: Option<String>,
}

/// A line with per-word timing
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WordSyncedLine {
    pub time_ms: u32,
    pub duration_ms: u32,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub translation: Option<String>,
    pub words: Vec<Word>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Word {
    pub text: String,
    pub start_ms: u32,
    pub duration_s: f32,
}

/// Tunables for [`parse_with`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseOptions {
    /// Duration assigned to words with malformed or zero-length timing.
    pub default_word_duration_ms: u32,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            default_word_duration_ms: DEFAULT_WORD_DURATION_MS,
        }
    }
}

/// Parse lyric text and an optional translation (pass `""` for none).
#[must_use]
pub fn parse(lyric_text: &str, translation_text: &str) -> LyricDocument {
    parse_with(lyric_text, translation_text, &ParseOptions::default())
}

/// Parse with explicit [`ParseOptions`].
#[must_use]
pub fn parse_with(
    lyric_text: &str,
    translation_text: &str,
    options: &ParseOptions,
) -> LyricDocument {
    let source_lines = split_lines(lyric_text);
    if source_lines.is_empty() {
        return LyricDocument::default();
    }

    let translations = parse_translation(translation_text);

    if source_lines.iter().any(|line| is_word_synced_line(line)) {
        build_word_synced(&source_lines, &translations, options)
    } else {
        build_line_synced(&source_lines, &translations)
    }
}

/// Parse a time tag body such as `01:30.50` or `01:30:50` into milliseconds.
///
/// The fraction is right-padded to three digits, so `00:00.5` is 500 ms.
/// Returns `None` when the text is not a time tag.
#[must_use]
pub fn parse_time(text: &str) -> Option<u32> {
    let caps = TIME_TAG_REGEX.captures(text.trim())?;
    let minutes: u32 = caps.get(1)?.as_str().parse().ok()?;
    let seconds: u32 = caps.get(2)?.as_str().parse().ok()?;
    let fraction_ms = match caps.get(3) {
        Some(fraction) => format!("{:0<3}", fraction.as_str()).parse::<u32>().ok()?,
        None => 0,
    };

    minutes
        .checked_mul(60_000)?
        .checked_add(seconds.checked_mul(1000)?)?
        .checked_add(fraction_ms)
}

/// Whether a piece of lyric text is noise that should never be displayed.
///
/// Empty text, text made only of punctuation or separators, and bracketed
/// coordinate artifacts like `(1062,531)` are all rejected.
#[must_use]
pub fn is_invalid_lyric_text(text: &str) -> bool {
    let text = text.trim();
    text.is_empty() || PUNCTUATION_ONLY_REGEX.is_match(text) || COORDINATE_REGEX.is_match(text)
}

/// Whether the text contains any word-synced line.
#[must_use]
pub fn is_word_synced_format(text: &str) -> bool {
    split_lines(text).iter().any(|line| is_word_synced_line(line))
}

impl LyricDocument {
    /// True when there is nothing to display.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Index of the line playing at `position_ms`: the last line, in document
    /// order, which started at or before that position.
    #[must_use]
    pub fn current_line_index(&self, position_ms: u32) -> Option<usize> {
        self.lines
            .iter()
            .enumerate()
            .rev()
            .find(|(_, line)| line.time_ms <= position_ms)
            .map(|(i, _)| i)
    }

    /// The line playing at `position_ms`
    #[must_use]
    pub fn current_line(&self, position_ms: u32) -> Option<&LyricLine> {
        self.current_line_index(position_ms)
            .and_then(|i| self.lines.get(i))
    }
}

impl WordSyncedLine {
    #[must_use]
    pub const fn end_ms(&self) -> u32 {
        self.time_ms.saturating_add(self.duration_ms)
    }
}

impl Word {
    /// Fill fraction (0.0 to 1.0) of this word at `position_ms`.
    #[must_use]
    pub fn progress(&self, position_ms: u32) -> f32 {
        if position_ms < self.start_ms {
            return 0.0;
        }
        if self.duration_s <= 0.0 {
            return 1.0;
        }

        let elapsed_s = ms_to_secs(position_ms - self.start_ms);
        (elapsed_s / self.duration_s).clamp(0.0, 1.0)
    }
}

/// BOM-stripped, trimmed, non-empty lines. `\r\n` and lone `\r` both end a line.
fn split_lines(text: &str) -> Vec<&str> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    text.split(['\r', '\n'])
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect()
}

/// Split `[a][b]rest` into (`["a", "b"]`, `"rest"`).
fn split_leading_tags(line: &str) -> (Vec<&str>, &str) {
    let mut tags = Vec::new();
    let mut remaining = line;

    while let Some(after_open) = remaining.strip_prefix('[') {
        let Some(end) = after_open.find(']') else {
            break;
        };
        tags.push(&after_open[..end]);
        remaining = &after_open[end + 1..];
    }

    (tags, remaining)
}

fn is_word_synced_line(line: &str) -> bool {
    let (tags, rest) = split_leading_tags(line);
    let Some(first) = tags.first() else {
        return false;
    };

    if WORD_LINE_TAG_REGEX.is_match(first) {
        return true;
    }

    // A marker with no text in front of it is a coordinate artifact, not a word
    WORD_MARKER_REGEX
        .find_iter(rest)
        .any(|marker| !rest[..marker.start()].trim().is_empty())
}

/// Expand line-synced lines into `(time, text)` pairs, one per valid tag.
fn parse_timed_lines<'a>(lines: &[&'a str]) -> Vec<(u32, &'a str)> {
    let mut results = Vec::new();

    for &line in lines {
        let (tags, rest) = split_leading_tags(line);
        let text = rest.trim();
        if is_invalid_lyric_text(text) {
            continue;
        }

        results.extend(tags.iter().filter_map(|tag| parse_time(tag)).map(|time| (time, text)));
    }

    results
}

fn parse_translation(translation_text: &str) -> HashMap<u32, String> {
    parse_timed_lines(&split_lines(translation_text))
        .into_iter()
        .map(|(time, text)| (time, text.to_string()))
        .collect()
}

fn build_line_synced(lines: &[&str], translations: &HashMap<u32, String>) -> LyricDocument {
    let lines = parse_timed_lines(lines)
        .into_iter()
        .map(|(time_ms, text)| LyricLine {
            time_ms,
            text: text.to_string(),
            translation: translations.get(&time_ms).cloned(),
        })
        .collect();

    LyricDocument {
        lines,
        is_word_synced: false,
        word_lines: None,
    }
}

fn build_word_synced(
    lines: &[&str],
    translations: &HashMap<u32, String>,
    options: &ParseOptions,
) -> LyricDocument {
    let word_lines: Vec<WordSyncedLine> = lines
        .iter()
        .filter_map(|line| parse_word_synced_line(line, options))
        .map(|mut line| {
            line.translation = translations.get(&line.time_ms).cloned();
            line
        })
        .collect();

    if word_lines.is_empty() {
        return LyricDocument::default();
    }

    let lines = word_lines
        .iter()
        .map(|line| LyricLine {
            time_ms: line.time_ms,
            text: line.text.clone(),
            translation: line.translation.clone(),
        })
        .collect();

    LyricDocument {
        lines,
        is_word_synced: true,
        word_lines: Some(word_lines),
    }
}

fn parse_word_synced_line(line: &str, options: &ParseOptions) -> Option<WordSyncedLine> {
    let (tags, content) = split_leading_tags(line);
    let tag = tags.first()?;

    let (time_ms, declared_duration) = match WORD_LINE_TAG_REGEX.captures(tag) {
        Some(caps) => (
            caps.get(1)?.as_str().parse().ok()?,
            Some(caps.get(2)?.as_str().parse::<u32>().ok()?),
        ),
        None => (parse_time(tag)?, None),
    };

    // Metadata is rejected before the line reaches the word tokenizer
    let plain = LOOSE_WORD_MARKER_REGEX.replace_all(content, "");
    if is_invalid_lyric_text(&plain) || is_metadata_line(&plain) {
        return None;
    }

    let words = tokenize_words(content, time_ms, declared_duration, options);
    let text = words.iter().map(|w| w.text.as_str()).collect::<String>();
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    let duration_ms = declared_duration.unwrap_or_else(|| {
        words
            .last()
            .map_or(0, |last| word_end_ms(last).saturating_sub(time_ms))
            .max(options.default_word_duration_ms)
    });

    Some(WordSyncedLine {
        time_ms,
        duration_ms,
        text: text.to_string(),
        translation: None,
        words,
    })
}

fn tokenize_words(
    content: &str,
    line_start_ms: u32,
    line_duration_ms: Option<u32>,
    options: &ParseOptions,
) -> Vec<Word> {
    let mut words = Vec::new();
    let mut cursor = 0;
    let mut marker_count = 0;
    let mut previous_end = line_start_ms;

    for caps in LOOSE_WORD_MARKER_REGEX.captures_iter(content) {
        let (Some(marker), Some(start), Some(duration)) = (caps.get(0), caps.get(1), caps.get(2))
        else {
            continue;
        };
        marker_count += 1;

        let text = &content[cursor..marker.start()];
        cursor = marker.end();

        let start_ms = start.as_str().parse::<u32>().unwrap_or(previous_end);
        let duration_ms = duration
            .as_str()
            .parse::<u32>()
            .ok()
            .filter(|d| *d > 0)
            .unwrap_or(options.default_word_duration_ms);
        previous_end = start_ms.saturating_add(duration_ms);

        if !text.is_empty() {
            words.push(Word {
                text: text.to_string(),
                start_ms,
                duration_s: ms_to_secs(duration_ms),
            });
        }
    }

    if marker_count == 0 {
        let duration_ms = line_duration_ms
            .filter(|d| *d > 0)
            .unwrap_or(options.default_word_duration_ms);
        return vec![Word {
            text: content.trim().to_string(),
            start_ms: line_start_ms,
            duration_s: ms_to_secs(duration_ms),
        }];
    }

    let trailing = &content[cursor..];
    if !trailing.trim().is_empty() {
        words.push(Word {
            text: trailing.to_string(),
            start_ms: previous_end,
            duration_s: ms_to_secs(options.default_word_duration_ms),
        });
    }

    words
}

fn is_metadata_line(text: &str) -> bool {
    let text = text.trim();
    text.contains(TITLE_ARTIST_SEPARATOR) || CREDIT_LABELS.iter().any(|label| text.starts_with(label))
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn word_end_ms(word: &Word) -> u32 {
    let duration_ms = (f64::from(word.duration_s) * 1000.0).round();
    word.start_ms.saturating_add(duration_ms as u32)
}

#[allow(clippy::cast_precision_loss)]
fn ms_to_secs(ms: u32) -> f32 {
    ms as f32 / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn test_parse_time_standard() {
        assert_eq!(parse_time("00:00.00"), Some(0));
        assert_eq!(parse_time("01:30.50"), Some(90_500));
        assert_eq!(parse_time("02:45.123"), Some(165_123));
        assert_eq!(parse_time("10:00.00"), Some(600_000));
    }

    #[test]
    fn test_parse_time_colon_separator() {
        assert_eq!(parse_time("00:00:00"), Some(0));
        assert_eq!(parse_time("01:30:50"), Some(90_500));
    }

    #[test]
    fn test_parse_time_pads_fraction_on_the_right() {
        assert_eq!(parse_time("00:00.5"), Some(500));
        assert_eq!(parse_time("00:00.50"), Some(500));
        assert_eq!(parse_time("00:00.10"), Some(100));
        assert_eq!(parse_time("00:00.99"), Some(990));
        assert_eq!(parse_time("00:00.005"), Some(5));
    }

    #[test]
    fn test_parse_time_without_fraction() {
        assert_eq!(parse_time("00:12"), Some(12_000));
    }

    #[test]
    fn test_parse_time_invalid() {
        assert_eq!(parse_time("invalid"), None);
        assert_eq!(parse_time(""), None);
        assert_eq!(parse_time("abc:def"), None);
        assert_eq!(parse_time("ti:Song"), None);
        assert_eq!(parse_time("00:00.1234"), None);
    }

    #[test]
    fn test_is_invalid_lyric_text() {
        assert!(is_invalid_lyric_text("---"));
        assert!(is_invalid_lyric_text("..."));
        assert!(is_invalid_lyric_text("  "));
        assert!(is_invalid_lyric_text(""));
        assert!(is_invalid_lyric_text("(1062,531)"));
        assert!(is_invalid_lyric_text("(100)"));
        assert!(is_invalid_lyric_text("//"));
        assert!(is_invalid_lyric_text("\u{3000}、。"));

        assert!(!is_invalid_lyric_text("Hello World"));
        assert!(!is_invalid_lyric_text("歌词内容"));
        assert!(!is_invalid_lyric_text("(oh yeah)"));
        assert!(!is_invalid_lyric_text("♪ ♪"));
        assert!(!is_invalid_lyric_text("$$$"));
    }

    #[test]
    fn test_is_word_synced_format() {
        assert!(is_word_synced_format("[0,2000]Hello(100,200)World(300,400)"));
        assert!(is_word_synced_format("[0,2000]整行歌词没有逐字标记"));
        assert!(!is_word_synced_format("[00:00.00]Hello World"));
        assert!(!is_word_synced_format("[00:03.00](1062,531)"));
        assert!(!is_word_synced_format(""));
    }

    #[test]
    fn test_parse_simple_lrc() {
        let doc = parse("[00:12.34]Hello world", "");
        assert!(!doc.is_word_synced);
        assert!(doc.word_lines.is_none());
        assert_eq!(doc.lines.len(), 1);
        assert_eq!(doc.lines[0].time_ms, 12_340);
        assert_eq!(doc.lines[0].text, "Hello world");
        assert_eq!(doc.lines[0].translation, None);
    }

    #[test]
    fn test_parse_lrc_basic() {
        let lrc = "[00:00.50]第一句歌词\n[00:05.00]第二句歌词\n[00:10.00]第三句歌词";
        let doc = parse(lrc, "");

        assert_eq!(doc.lines.len(), 3);
        assert_eq!(doc.lines[0].time_ms, 500);
        assert_eq!(doc.lines[0].text, "第一句歌词");
        assert_eq!(doc.lines[1].time_ms, 5000);
        assert_eq!(doc.lines[2].time_ms, 10_000);
    }

    #[test]
    fn test_parse_lrc_with_translation() {
        let lrc = "[00:00.50]你好世界\n[00:05.00]再见世界";
        let trans = "[00:00.50]Hello World\n[00:05.00]Goodbye World\n[00:09.00]Orphan";
        let doc = parse(lrc, trans);

        assert_eq!(doc.lines.len(), 2);
        assert_eq!(doc.lines[0].text, "你好世界");
        assert_eq!(doc.lines[0].translation.as_deref(), Some("Hello World"));
        assert_eq!(doc.lines[1].translation.as_deref(), Some("Goodbye World"));
    }

    #[test]
    fn test_translation_placeholder_is_ignored() {
        let doc = parse("[00:01.00]Line", "[00:01.00]//");
        assert_eq!(doc.lines[0].translation, None);
    }

    #[test]
    fn test_parse_lrc_multiple_time_tags() {
        let doc = parse("[00:10.00][01:10.00][02:10.00]副歌部分", "");

        assert_eq!(doc.lines.len(), 3);
        assert_eq!(doc.lines[0].time_ms, 10_000);
        assert_eq!(doc.lines[1].time_ms, 70_000);
        assert_eq!(doc.lines[2].time_ms, 130_000);
        assert!(doc.lines.iter().all(|l| l.text == "副歌部分"));
    }

    #[test]
    fn test_multi_tag_order_is_preserved() {
        let doc = parse("[00:20.00][00:05.00]Chorus\n[00:10.00]Verse", "");
        let times: Vec<u32> = doc.lines.iter().map(|l| l.time_ms).collect();
        assert_eq!(times, vec![20_000, 5000, 10_000]);
    }

    #[test]
    fn test_parse_lrc_filter_invalid() {
        let lrc = "[00:00.00]正常歌词\n[00:01.00]---\n[00:02.00]\n[00:03.00](1062,531)\n[00:04.00]另一句正常歌词";
        let doc = parse(lrc, "");

        assert!(!doc.is_word_synced);
        assert_eq!(doc.lines.len(), 2);
        assert_eq!(doc.lines[0].text, "正常歌词");
        assert_eq!(doc.lines[1].text, "另一句正常歌词");
    }

    #[test]
    fn test_symbol_lines_are_kept() {
        let doc = parse("[00:01.00]♥\n[00:02.00]😀\n[00:03.00]...", "");
        let texts: Vec<&str> = doc.lines.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, vec!["♥", "😀"]);
    }

    #[test]
    fn test_id_tags_and_invalid_tags_are_dropped() {
        let lrc = "[ti:Song Title]\n[ar:Artist]\n[xx:yy]Broken\n[00:05.00]Lyrics here";
        let doc = parse(lrc, "");
        assert_eq!(doc.lines.len(), 1);
        assert_eq!(doc.lines[0].text, "Lyrics here");
    }

    #[test]
    fn test_parse_lrc_bom_and_crlf() {
        let doc = parse("\u{feff}[00:00.00]测试歌词\r\n[00:05.00]第二句\r\n", "");
        assert_eq!(doc.lines.len(), 2);
        assert_eq!(doc.lines[0].text, "测试歌词");
        assert_eq!(doc.lines[1].text, "第二句");
    }

    #[test]
    fn test_lone_carriage_returns_split_lines() {
        let doc = parse("[00:01.00]One\r[00:02.00]Two", "");
        assert_eq!(doc.lines.len(), 2);
    }

    #[test]
    fn test_parse_empty_lyric() {
        let doc = parse("", "");
        assert!(doc.is_empty());
        assert!(!doc.is_word_synced);
        assert!(doc.word_lines.is_none());

        let doc = parse("plain text with no tags\nanother line", "");
        assert!(doc.is_empty());
    }

    #[test]
    fn test_parse_word_synced_basic() {
        let qrc = "[0,2000]你(0,500)好(500,500)世(1000,500)界(1500,500)\n[2000,2000]再(2000,500)见(2500,500)";
        let doc = parse(qrc, "");

        assert!(doc.is_word_synced);
        let word_lines = doc.word_lines.as_ref().unwrap();
        assert_eq!(word_lines.len(), 2);

        let first = &word_lines[0];
        assert_eq!(first.time_ms, 0);
        assert_eq!(first.duration_ms, 2000);
        assert_eq!(first.text, "你好世界");
        assert_eq!(first.words.len(), 4);
        assert_eq!(first.words[0].text, "你");
        assert_eq!(first.words[0].start_ms, 0);
        assert!(approx(first.words[0].duration_s, 0.5));

        let total: f32 = first.words.iter().map(|w| w.duration_s).sum();
        assert!(approx(total, 2.0));
    }

    #[test]
    fn test_parse_word_synced_with_translation() {
        let doc = parse("[0,2000]你(0,500)好(500,500)", "[00:00.00]Hello");
        let word_lines = doc.word_lines.as_ref().unwrap();
        assert_eq!(word_lines[0].translation.as_deref(), Some("Hello"));
        assert_eq!(doc.lines[0].translation.as_deref(), Some("Hello"));
    }

    #[test]
    fn test_parse_three_component_markers() {
        let doc = parse("[0,2000,0]歌(0,500,0)词(500,500,0)", "");
        let word_lines = doc.word_lines.as_ref().unwrap();
        assert_eq!(word_lines.len(), 1);
        assert_eq!(word_lines[0].text, "歌词");
        assert_eq!(word_lines[0].words.len(), 2);
    }

    #[test]
    fn test_parse_line_without_word_markers() {
        let doc = parse("[0,2000]整行歌词没有逐字标记", "");
        assert!(doc.is_word_synced);
        let word_lines = doc.word_lines.as_ref().unwrap();
        assert_eq!(word_lines.len(), 1);
        assert_eq!(word_lines[0].text, "整行歌词没有逐字标记");
        assert_eq!(word_lines[0].words.len(), 1);
        assert_eq!(word_lines[0].words[0].text, "整行歌词没有逐字标记");
        assert!(approx(word_lines[0].words[0].duration_s, 2.0));
    }

    #[test]
    fn test_parse_word_synced_filter_metadata() {
        let qrc = "[0,1000]Song Title - Artist Name\n\
                   [60000,2000]正(60000,500)常(60500,500)歌(61000,500)词(61500,500)\n\
                   [62000,2000]作词：张三\n\
                   [63000,1000]作(63000,500)曲(63500,500)：(64000,100)李(64100,100)四(64200,100)\n\
                   [64000,2000]另(64000,500)一(64500,500)句(65000,500)";
        let doc = parse(qrc, "");

        let word_lines = doc.word_lines.as_ref().unwrap();
        assert_eq!(word_lines.len(), 2);
        assert_eq!(word_lines[0].text, "正常歌词");
        assert_eq!(word_lines[1].text, "另一句");
    }

    #[test]
    fn test_parse_word_synced_filters_noise() {
        let qrc = "[0,1000](1062,531)\n[1000,1000]---\n[2000,1000]Go(2000,500)!(2500,500)";
        let doc = parse(qrc, "");
        let word_lines = doc.word_lines.as_ref().unwrap();
        assert_eq!(word_lines.len(), 1);
        assert_eq!(word_lines[0].text, "Go!");
    }

    #[test]
    fn test_invalid_duration_falls_back_to_default() {
        let doc = parse("[0,2000]歌(0,0)词(invalid,invalid)", "");
        let word_lines = doc.word_lines.as_ref().unwrap();
        let words = &word_lines[0].words;

        assert_eq!(words.len(), 2);
        assert!(approx(words[0].duration_s, 0.1));
        assert_eq!(words[1].text, "词");
        assert_eq!(words[1].start_ms, 100);
        assert!(approx(words[1].duration_s, 0.1));
    }

    #[test]
    fn test_default_word_duration_is_tunable() {
        let options = ParseOptions {
            default_word_duration_ms: 250,
        };
        let doc = parse_with("[0,2000]歌(0,0)", "", &options);
        let word_lines = doc.word_lines.as_ref().unwrap();
        assert!(approx(word_lines[0].words[0].duration_s, 0.25));
    }

    #[test]
    fn test_word_text_keeps_spacing() {
        let doc = parse("[0,1000]Hello (0,400)world(400,600)", "");
        let word_lines = doc.word_lines.as_ref().unwrap();
        assert_eq!(word_lines[0].words[0].text, "Hello ");
        assert_eq!(word_lines[0].words[1].text, "world");
        assert_eq!(word_lines[0].text, "Hello world");
    }

    #[test]
    fn test_trailing_text_becomes_final_word() {
        let doc = parse("[0,1000]Hey(0,300) you", "");
        let words = &doc.word_lines.as_ref().unwrap()[0].words;
        assert_eq!(words.len(), 2);
        assert_eq!(words[1].text, " you");
        assert_eq!(words[1].start_ms, 300);
    }

    #[test]
    fn test_word_markers_after_time_tag() {
        let doc = parse("[00:01.00]Hi(1000,500)there(1500,500)", "");
        assert!(doc.is_word_synced);
        let line = &doc.word_lines.as_ref().unwrap()[0];
        assert_eq!(line.time_ms, 1000);
        assert_eq!(line.duration_ms, 1000);
        assert_eq!(line.text, "Hithere");
    }

    #[test]
    fn test_markers_before_line_start_keep_a_duration() {
        let doc = parse("[00:01.00]Chapter(1,2) text", "");
        let line = &doc.word_lines.as_ref().unwrap()[0];
        assert_eq!(line.time_ms, 1000);
        assert_eq!(line.duration_ms, 100);
    }

    #[test]
    fn test_word_synced_generates_line_fallback() {
        let doc = parse("[0,2000]歌(0,500)词(500,500)\n[3000,1000]再(3000,1000)", "");

        assert!(doc.is_word_synced);
        assert_eq!(doc.lines.len(), 2);
        assert_eq!(doc.lines[0].text, "歌词");
        assert_eq!(doc.lines[0].time_ms, 0);
        assert_eq!(doc.lines[1].time_ms, 3000);
    }

    #[test]
    fn test_word_synced_with_only_metadata_degrades_to_empty() {
        let doc = parse("[0,1000]Title - Artist\n[1000,1000]作曲：某人", "");
        assert!(doc.is_empty());
        assert!(!doc.is_word_synced);
        assert!(doc.word_lines.is_none());
    }

    #[test]
    fn test_current_line_index() {
        let doc = parse("[00:05.00]First\n[00:10.00]Second\n[00:15.00]Third", "");

        assert_eq!(doc.current_line_index(0), None);
        assert_eq!(doc.current_line_index(7000), Some(0));
        assert_eq!(doc.current_line(12_000).unwrap().text, "Second");
        assert_eq!(doc.current_line(20_000).unwrap().text, "Third");
    }

    #[test]
    fn test_word_progress() {
        let word = Word {
            text: "la".to_string(),
            start_ms: 1000,
            duration_s: 0.5,
        };

        assert!(approx(word.progress(500), 0.0));
        assert!(approx(word.progress(1000), 0.0));
        assert!(approx(word.progress(1250), 0.5));
        assert!(approx(word.progress(1500), 1.0));
        assert!(approx(word.progress(9000), 1.0));
    }
}
