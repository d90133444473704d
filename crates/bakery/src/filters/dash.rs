//! Structural filtering of dash mpds.

use dash_mpd::{AdaptationSet, Representation, MPD};
use url::Url;

use crate::error::{BakeryError, BakeryResult};
use crate::parser::{MediaFilters, Protocol, StreamType};

use super::{absolutize, codec_matches, ManifestFilter};

pub struct DashFilter<'a> {
    manifest_url: &'a Url,
    manifest: &'a str,
}

impl<'a> DashFilter<'a> {
    pub fn new(manifest_url: &'a Url, manifest: &'a str) -> Self {
        Self {
            manifest_url,
            manifest,
        }
    }
}

impl ManifestFilter for DashFilter<'_> {
    fn filter_manifest(&self, filters: &MediaFilters) -> BakeryResult<String> {
        if filters.trim.is_some() {
            return Err(BakeryError::TrimUnsupported(Protocol::Dash));
        }

        let filters = filters.reconciled();
        let mut mpd = dash_mpd::parse(self.manifest)?;

        // Base urls resolve hierarchically; each level inherits the first
        // resolved url of the level above.
        let mut mpd_base = self.manifest_url.clone();
        for base in &mut mpd.base_url {
            base.base = absolutize(&mpd_base, &base.base)?;
        }
        if let Some(first) = mpd.base_url.first() {
            mpd_base = Url::parse(&first.base)?;
        }

        let mut periods = Vec::with_capacity(mpd.periods.len());
        for mut period in std::mem::take(&mut mpd.periods) {
            let period_base = resolve_bases(&mpd_base, &mut period.BaseURL)?;

            let mut adaptations = Vec::with_capacity(period.adaptations.len());
            for mut adaptation in std::mem::take(&mut period.adaptations) {
                let adaptation_base = resolve_bases(&period_base, &mut adaptation.BaseURL)?;
                let content_type = adaptation_content_type(&adaptation)?;

                let mut representations =
                    Vec::with_capacity(adaptation.representations.len());
                for mut representation in std::mem::take(&mut adaptation.representations) {
                    resolve_bases(&adaptation_base, &mut representation.BaseURL)?;

                    if should_remove_representation(
                        &filters,
                        content_type,
                        &adaptation,
                        &representation,
                    ) {
                        continue;
                    }

                    representations.push(representation);
                }
                adaptation.representations = representations;

                if !adaptation.representations.is_empty() {
                    adaptations.push(adaptation);
                }
            }
            period.adaptations = adaptations;

            if !period.adaptations.is_empty() {
                periods.push(period);
            }
        }
        mpd.periods = periods;

        encode_mpd(&mpd)
    }
}

/// Absolutizes every base url at one level and returns the base the next
/// level resolves against.
fn resolve_bases(
    parent: &Url,
    bases: &mut [dash_mpd::BaseURL],
) -> BakeryResult<Url> {
    for base in bases.iter_mut() {
        base.base = absolutize(parent, &base.base)?;
    }

    match bases.first() {
        Some(first) => Ok(Url::parse(&first.base)?),
        None => Ok(parent.clone()),
    }
}

/// The adaptation set's stream kind, from `@contentType` or the major type
/// of `@mimeType`. Subtitle carriage shows up as either `text/*` or
/// `application/*`.
fn adaptation_content_type(adaptation: &AdaptationSet) -> BakeryResult<StreamType> {
    let raw = adaptation
        .contentType
        .as_deref()
        .or(adaptation.mimeType.as_deref())
        .ok_or(BakeryError::UnknownContentType)?;

    match raw.split('/').next().unwrap_or(raw) {
        "audio" => Ok(StreamType::Audio),
        "video" => Ok(StreamType::Video),
        "text" | "application" => Ok(StreamType::Text),
        _ => Err(BakeryError::UnknownContentType),
    }
}

fn should_remove_representation(
    filters: &MediaFilters,
    content_type: StreamType,
    adaptation: &AdaptationSet,
    representation: &Representation,
) -> bool {
    if filters.filter_stream_types.contains(&content_type) {
        return true;
    }

    if filters.defines_bitrate_filter() {
        let bandwidth = representation.bandwidth.unwrap_or(0);
        let (min, max) = match content_type {
            StreamType::Audio => (filters.audio.min_bitrate, filters.audio.max_bitrate),
            StreamType::Video => (filters.video.min_bitrate, filters.video.max_bitrate),
            StreamType::Text => (filters.min_bitrate, filters.max_bitrate),
        };
        if bandwidth < min || bandwidth > max {
            return true;
        }
    }

    let codecs = representation
        .codecs
        .as_deref()
        .or(adaptation.codecs.as_deref())
        .unwrap_or_default();
    let lang = representation
        .lang
        .as_deref()
        .or(adaptation.lang.as_deref())
        .unwrap_or_default();

    match content_type {
        StreamType::Audio => {
            filters
                .audio
                .codecs
                .iter()
                .any(|filter| codec_matches(codecs, filter))
                || filters.audio_languages.iter().any(|l| l == lang)
        }
        StreamType::Video => filters
            .video
            .codecs
            .iter()
            .any(|filter| codec_matches(codecs, filter)),
        StreamType::Text => {
            filters
                .caption_types
                .iter()
                .any(|filter| codec_matches(codecs, filter))
                || filters.caption_languages.iter().any(|l| l == lang)
        }
    }
}

fn encode_mpd(mpd: &MPD) -> BakeryResult<String> {
    let body = quick_xml::se::to_string(mpd).map_err(|e| BakeryError::MpdEncode(e.to_string()))?;
    Ok(format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n{body}"))
}
