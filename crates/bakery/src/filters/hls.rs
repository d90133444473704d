//! Structural filtering of hls playlists.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use m3u8_rs::{MasterPlaylist, MediaPlaylist, Playlist, VariantStream};
use url::Url;

use crate::config::Config;
use crate::error::{BakeryError, BakeryResult};
use crate::parser::{MediaFilters, Trim};

use super::{
    absolutize, family_matches, is_audio_codec, is_caption_codec, is_video_codec, ManifestFilter,
};

pub struct HlsFilter<'a> {
    manifest_url: &'a Url,
    manifest: &'a str,
    config: &'a Config,
}

impl<'a> HlsFilter<'a> {
    pub fn new(manifest_url: &'a Url, manifest: &'a str, config: &'a Config) -> Self {
        Self {
            manifest_url,
            manifest,
            config,
        }
    }
}

impl ManifestFilter for HlsFilter<'_> {
    fn filter_manifest(&self, filters: &MediaFilters) -> BakeryResult<String> {
        let filters = filters.reconciled();

        let playlist = m3u8_rs::parse_playlist_res(self.manifest.as_bytes())
            .map_err(|e| BakeryError::PlaylistDecode(e.to_string()))?;

        match playlist {
            Playlist::MasterPlaylist(master) => self.filter_master_playlist(&filters, master),
            Playlist::MediaPlaylist(media) => self.filter_media_playlist(&filters, media),
        }
    }
}

impl HlsFilter<'_> {
    /// Walks the variants in order, keeping survivors with their uris
    /// rewritten to absolute form. Kept entries stay in input order, which
    /// players rely on for selection.
    fn filter_master_playlist(
        &self,
        filters: &MediaFilters,
        mut master: MasterPlaylist,
    ) -> BakeryResult<String> {
        let mut variants = Vec::with_capacity(master.variants.len());

        for mut variant in std::mem::take(&mut master.variants) {
            variant.uri = absolutize(self.manifest_url, &variant.uri)?;

            if should_remove_variant(filters, &variant) {
                continue;
            }

            if let Some(trim) = &filters.trim {
                variant.uri = self.trim_redirect_uri(trim, &variant.uri)?;
            }

            variants.push(variant);
        }
        master.variants = variants;

        for alternative in &mut master.alternatives {
            if let Some(uri) = alternative.uri.take() {
                alternative.uri = Some(absolutize(self.manifest_url, &uri)?);
            }
        }

        encode_master(&master)
    }

    /// Rendition playlists only change under a trim window; without one the
    /// playlist passes through with its uris absolutized.
    fn filter_media_playlist(
        &self,
        filters: &MediaFilters,
        mut media: MediaPlaylist,
    ) -> BakeryResult<String> {
        let segments = std::mem::take(&mut media.segments);
        let mut kept = Vec::with_capacity(segments.len());

        for mut segment in segments {
            if let Some(trim) = &filters.trim {
                let date_time = segment
                    .program_date_time
                    .as_ref()
                    .ok_or(BakeryError::MissingProgramDateTime)?;

                if !trim.contains(date_time.timestamp()) {
                    continue;
                }
            }

            segment.uri = absolutize(self.manifest_url, &segment.uri)?;
            kept.push(segment);
        }

        media.segments = kept;
        if filters.trim.is_some() {
            // A trimmed window is complete by construction.
            media.end_list = true;
        }

        encode_media(&media)
    }

    /// Points the variant back at this proxy so the follow-up rendition
    /// request re-enters the pipeline with the same window.
    fn trim_redirect_uri(&self, trim: &Trim, uri: &str) -> BakeryResult<String> {
        let scheme = Url::parse(uri)?.scheme().to_string();
        let encoded = URL_SAFE_NO_PAD.encode(uri);

        Ok(format!(
            "{scheme}://{host}/t({start},{end})/{encoded}.m3u8",
            host = self.config.hostname,
            start = trim.start,
            end = trim.end,
        ))
    }
}

/// True when the variant fails any active predicate. Codec filters remove
/// matching variants; the bandwidth window keeps a variant as long as at
/// least one of its codecs qualifies under the window for that codec's
/// family.
fn should_remove_variant(filters: &MediaFilters, variant: &VariantStream) -> bool {
    let codecs_attr = variant.codecs.clone().unwrap_or_default();
    let codecs: Vec<&str> = codecs_attr.split(',').map(str::trim).collect();

    if filters.defines_bitrate_filter() {
        let qualifies = codecs.iter().any(|codec| {
            let (min, max) = effective_window(filters, codec);
            variant.bandwidth >= min && variant.bandwidth <= max
        });
        if !qualifies {
            return true;
        }
    }

    if !filters.audio.codecs.is_empty()
        && family_matches(is_audio_codec, &codecs, &filters.audio.codecs)
    {
        return true;
    }

    if !filters.video.codecs.is_empty()
        && family_matches(is_video_codec, &codecs, &filters.video.codecs)
    {
        return true;
    }

    if !filters.caption_types.is_empty()
        && family_matches(is_caption_codec, &codecs, &filters.caption_types)
    {
        return true;
    }

    false
}

fn effective_window(filters: &MediaFilters, codec: &str) -> (u64, u64) {
    if is_audio_codec(codec) {
        (filters.audio.min_bitrate, filters.audio.max_bitrate)
    } else if is_video_codec(codec) {
        (filters.video.min_bitrate, filters.video.max_bitrate)
    } else {
        (filters.min_bitrate, filters.max_bitrate)
    }
}

fn encode_master(master: &MasterPlaylist) -> BakeryResult<String> {
    let mut out = Vec::new();
    master.write_to(&mut out)?;
    Ok(String::from_utf8_lossy(&out).into_owned())
}

fn encode_media(media: &MediaPlaylist) -> BakeryResult<String> {
    let mut out = Vec::new();
    media.write_to(&mut out)?;
    Ok(String::from_utf8_lossy(&out).into_owned())
}
