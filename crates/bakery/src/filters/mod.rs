//! Manifest transformation.
//!
//! Codec filters are exclusions: a variant or representation matching a
//! supplied codec set is removed, not kept. Matching is substring
//! containment, so the token `avc` covers `avc1.42e01e`.

pub mod dash;
pub mod hls;

use url::Url;

use crate::config::Config;
use crate::error::{BakeryError, BakeryResult};
use crate::parser::{MediaFilters, Protocol};

pub use dash::DashFilter;
pub use hls::HlsFilter;

/// Common surface of the hls and dash filters.
pub trait ManifestFilter {
    fn filter_manifest(&self, filters: &MediaFilters) -> BakeryResult<String>;
}

const AUDIO_CODECS: [&str; 3] = ["mp4a", "ec-3", "ac-3"];
const VIDEO_CODECS: [&str; 3] = ["hvc", "avc", "dvh"];
const CAPTION_CODECS: [&str; 2] = ["stpp", "wvtt"];

pub(crate) fn codec_matches(codec: &str, filter: &str) -> bool {
    codec.contains(filter)
}

pub(crate) fn is_audio_codec(codec: &str) -> bool {
    AUDIO_CODECS.iter().any(|family| codec_matches(codec, family))
}

pub(crate) fn is_video_codec(codec: &str) -> bool {
    VIDEO_CODECS.iter().any(|family| codec_matches(codec, family))
}

pub(crate) fn is_caption_codec(codec: &str) -> bool {
    CAPTION_CODECS.iter().any(|family| codec_matches(codec, family))
}

/// True when any of `codecs` belongs to the family and matches a token of
/// the filter set.
pub(crate) fn family_matches(
    family: fn(&str) -> bool,
    codecs: &[&str],
    set: &[String],
) -> bool {
    codecs
        .iter()
        .any(|codec| family(codec) && set.iter().any(|filter| codec_matches(codec, filter)))
}

/// Resolves `uri` against `base` when relative. The base's query string is
/// carried over unless the reference brings its own.
pub(crate) fn absolutize(base: &Url, uri: &str) -> BakeryResult<String> {
    if uri.is_empty() || uri.starts_with("http://") || uri.starts_with("https://") {
        return Ok(uri.to_string());
    }

    let mut merged = base.join(uri)?;
    if merged.query().is_none() {
        merged.set_query(base.query());
    }
    Ok(merged.to_string())
}

/// The protocol this request filters, from the parsed filters or the
/// playback url extension.
pub fn protocol_for(filters: &MediaFilters, playback_url: &Url) -> BakeryResult<Protocol> {
    filters
        .protocol
        .or_else(|| Protocol::from_path(playback_url.path()))
        .ok_or(BakeryError::UnknownProtocol)
}

/// Runs the filter matching `protocol` over the fetched manifest text.
pub fn filter_manifest(
    protocol: Protocol,
    config: &Config,
    filters: &MediaFilters,
    playback_url: &Url,
    manifest: &str,
) -> BakeryResult<String> {
    match protocol {
        Protocol::Hls => HlsFilter::new(playback_url, manifest, config).filter_manifest(filters),
        Protocol::Dash => DashFilter::new(playback_url, manifest).filter_manifest(filters),
    }
}
