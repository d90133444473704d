//! Request-path filter grammar.
//!
//! A request path is a `/`-separated list of segments. Filter expressions
//! (`key(args)`) and plugin lists (`[name,name]`) are consumed into a
//! [`MediaFilters`] record; every other segment is part of the upstream
//! manifest path and is passed through untouched, in order.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::{BakeryError, BakeryResult};

pub const DEFAULT_MIN_BITRATE: u64 = 0;
pub const DEFAULT_MAX_BITRATE: u64 = i32::MAX as u64;

static FILTER_EXPRESSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([a-z]+)\((.*)\)$").unwrap());
static PLUGIN_LIST: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\[(.*)\]$").unwrap());

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Protocol {
    Hls,
    Dash,
}

impl Protocol {
    /// Sniffs the protocol from a manifest path or url extension.
    pub fn from_path(path: &str) -> Option<Self> {
        if path.contains(".m3u8") {
            Some(Self::Hls)
        } else if path.contains(".mpd") {
            Some(Self::Dash)
        } else {
            None
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Hls => "application/vnd.apple.mpegurl",
            Self::Dash => "application/dash+xml",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hls => write!(f, "hls"),
            Self::Dash => write!(f, "dash"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StreamType {
    Audio,
    Video,
    Text,
}

/// Inclusive trim window in POSIX seconds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Trim {
    pub start: u64,
    pub end: u64,
}

impl Trim {
    pub fn contains(&self, timestamp: i64) -> bool {
        u64::try_from(timestamp)
            .map(|t| t >= self.start && t <= self.end)
            .unwrap_or(false)
    }
}

/// Per-media-type bandwidth window and codec set, nested inside `v(...)` or
/// `a(...)`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Subfilter {
    pub min_bitrate: u64,
    pub max_bitrate: u64,
    pub codecs: Vec<String>,
}

impl Default for Subfilter {
    fn default() -> Self {
        Self {
            min_bitrate: DEFAULT_MIN_BITRATE,
            max_bitrate: DEFAULT_MAX_BITRATE,
            codecs: Vec::new(),
        }
    }
}

impl Subfilter {
    pub fn has_default_window(&self) -> bool {
        self.min_bitrate == DEFAULT_MIN_BITRATE && self.max_bitrate == DEFAULT_MAX_BITRATE
    }

    pub fn is_empty(&self) -> bool {
        self.has_default_window() && self.codecs.is_empty()
    }

    pub fn window_contains(&self, bandwidth: u64) -> bool {
        bandwidth >= self.min_bitrate && bandwidth <= self.max_bitrate
    }

    /// Forces this window into the overall window: disjoint windows are
    /// replaced outright, overlapping windows are clamped to the
    /// intersection.
    fn reconcile_window(&mut self, overall_min: u64, overall_max: u64) {
        if self.max_bitrate < overall_min || self.min_bitrate > overall_max {
            self.min_bitrate = overall_min;
            self.max_bitrate = overall_max;
        } else {
            self.min_bitrate = self.min_bitrate.max(overall_min);
            self.max_bitrate = self.max_bitrate.min(overall_max);
        }
    }
}

/// Everything the request url asked the proxy to do to the manifest.
#[derive(Clone, Debug, PartialEq)]
pub struct MediaFilters {
    pub protocol: Option<Protocol>,
    pub min_bitrate: u64,
    pub max_bitrate: u64,
    pub video: Subfilter,
    pub audio: Subfilter,
    pub caption_types: Vec<String>,
    pub audio_languages: Vec<String>,
    pub caption_languages: Vec<String>,
    pub filter_stream_types: Vec<StreamType>,
    pub trim: Option<Trim>,
    pub plugins: Vec<String>,
}

impl Default for MediaFilters {
    fn default() -> Self {
        Self {
            protocol: None,
            min_bitrate: DEFAULT_MIN_BITRATE,
            max_bitrate: DEFAULT_MAX_BITRATE,
            video: Subfilter::default(),
            audio: Subfilter::default(),
            caption_types: Vec::new(),
            audio_languages: Vec::new(),
            caption_languages: Vec::new(),
            filter_stream_types: Vec::new(),
            trim: None,
            plugins: Vec::new(),
        }
    }
}

impl MediaFilters {
    /// Returns a copy whose audio and video windows have been forced into
    /// the overall window. Filters operate on the reconciled copy so that
    /// the per-media window they enforce is always a subset of the overall
    /// one.
    pub fn reconciled(&self) -> Self {
        let mut filters = self.clone();
        filters
            .audio
            .reconcile_window(self.min_bitrate, self.max_bitrate);
        filters
            .video
            .reconcile_window(self.min_bitrate, self.max_bitrate);
        filters
    }

    /// True when any of the overall, audio, or video windows differs from
    /// the defaults.
    pub fn defines_bitrate_filter(&self) -> bool {
        !(self.min_bitrate == DEFAULT_MIN_BITRATE
            && self.max_bitrate == DEFAULT_MAX_BITRATE
            && self.audio.has_default_window()
            && self.video.has_default_window())
    }
}

/// Parses a request path into the cleaned upstream manifest path and the
/// filters to apply to it.
pub fn url_parse(url_path: &str) -> BakeryResult<(String, MediaFilters)> {
    let mut filters = MediaFilters {
        protocol: Protocol::from_path(url_path),
        ..Default::default()
    };

    let mut manifest_path = String::new();
    for part in url_path.split('/') {
        if part.is_empty() {
            continue;
        }

        if let Some(caps) = FILTER_EXPRESSION.captures(part) {
            apply_filter(&mut filters, &caps[1], &caps[2])?;
            continue;
        }

        if let Some(caps) = PLUGIN_LIST.captures(part) {
            filters
                .plugins
                .extend(caps[1].split(',').filter(|p| !p.is_empty()).map(String::from));
            continue;
        }

        manifest_path.push('/');
        manifest_path.push_str(part);
    }

    if manifest_path.is_empty() {
        manifest_path.push('/');
    }

    Ok((manifest_path, filters))
}

fn apply_filter(filters: &mut MediaFilters, key: &str, args: &str) -> BakeryResult<()> {
    match key {
        "v" => parse_subfilter(&mut filters.video, args, true),
        "a" => parse_subfilter(&mut filters.audio, args, false),
        "al" => {
            filters.audio_languages.extend(tokens(args));
            Ok(())
        }
        "c" => {
            filters.caption_languages.extend(tokens(args));
            Ok(())
        }
        "ct" => {
            filters.caption_types.extend(tokens(args));
            Ok(())
        }
        "fs" => {
            for kind in args.split(',') {
                filters.filter_stream_types.push(parse_stream_type(kind)?);
            }
            Ok(())
        }
        "b" => {
            let (min, max) = parse_range(key, args, DEFAULT_MIN_BITRATE, DEFAULT_MAX_BITRATE)?;
            filters.min_bitrate = min;
            filters.max_bitrate = max;
            Ok(())
        }
        "t" => {
            let (start, end) = parse_range(key, args, 0, 0)?;
            filters.trim = Some(Trim { start, end });
            Ok(())
        }
        _ => Err(key_error(key, "unknown filter key")),
    }
}

/// Inner grammar of `v(...)` and `a(...)`: a comma-separated list where each
/// token is a bare codec, `codec(list)`, or `b(min,max)`. Nesting stops
/// there.
fn parse_subfilter(subfilter: &mut Subfilter, args: &str, video: bool) -> BakeryResult<()> {
    let key = if video { "v" } else { "a" };

    for token in split_paren_aware(args) {
        if token.is_empty() {
            continue;
        }

        if let Some(caps) = FILTER_EXPRESSION.captures(token) {
            let inner_args = &caps[2];
            if inner_args.contains('(') {
                return Err(key_error(key, "filters may only nest one level deep"));
            }

            match &caps[1] {
                "codec" => push_codecs(subfilter, inner_args, video),
                "b" => {
                    let (min, max) =
                        parse_range(key, inner_args, DEFAULT_MIN_BITRATE, DEFAULT_MAX_BITRATE)?;
                    subfilter.min_bitrate = min;
                    subfilter.max_bitrate = max;
                }
                inner => {
                    return Err(key_error(
                        key,
                        format!("unknown nested filter key {inner}"),
                    ))
                }
            }
            continue;
        }

        if token.contains('(') || token.contains(')') {
            return Err(key_error(key, format!("malformed token {token}")));
        }

        push_codecs(subfilter, token, video);
    }

    Ok(())
}

fn push_codecs(subfilter: &mut Subfilter, list: &str, video: bool) {
    for codec in list.split(',').filter(|c| !c.is_empty()) {
        // hdr10 is a synthetic token standing in for the two hevc profiles
        // that carry hdr10 metadata.
        if video && codec == "hdr10" {
            subfilter.codecs.push("hev1.2".to_string());
            subfilter.codecs.push("hvc1.2".to_string());
        } else {
            subfilter.codecs.push(codec.to_string());
        }
    }
}

fn parse_range(
    key: &str,
    args: &str,
    default_min: u64,
    default_max: u64,
) -> BakeryResult<(u64, u64)> {
    let mut parts = args.split(',');
    let (Some(min), Some(max), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(key_error(key, "expected two comma-separated values"));
    };

    let min = if min.is_empty() {
        default_min
    } else {
        min.parse().map_err(|e| key_error(key, e))?
    };
    let max = if max.is_empty() {
        default_max
    } else {
        max.parse().map_err(|e| key_error(key, e))?
    };

    if min >= max {
        return Err(key_error(key, "min must be lower than max"));
    }

    Ok((min, max))
}

fn parse_stream_type(kind: &str) -> BakeryResult<StreamType> {
    match kind {
        "audio" => Ok(StreamType::Audio),
        "video" => Ok(StreamType::Video),
        "text" => Ok(StreamType::Text),
        _ => Err(key_error("fs", format!("unknown stream type {kind}"))),
    }
}

fn tokens(args: &str) -> impl Iterator<Item = String> + '_ {
    args.split(',').filter(|t| !t.is_empty()).map(String::from)
}

/// Splits on commas outside parentheses, so `codec(a,b),b(0,1)` yields two
/// tokens.
fn split_paren_aware(args: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;

    for (i, ch) in args.char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                tokens.push(&args[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    tokens.push(&args[start..]);

    tokens
}

fn key_error(key: &str, reason: impl ToString) -> BakeryError {
    BakeryError::FilterParse {
        key: key.to_string(),
        reason: reason.to_string(),
    }
}
