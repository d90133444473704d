//! Mapping from a cleaned manifest path to the upstream it plays back from.

pub mod propeller;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use url::Url;

use crate::config::Config;
use crate::error::{BakeryError, BakeryResult};

pub use propeller::{Channel, PropellerClient};

/// Where a request's manifest lives. Built once per request from the
/// cleaned path, immutable afterwards.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Origin {
    /// A manifest served relative to the configured origin host, or an
    /// absolute url embedded in the path.
    Direct { origin_host: String, path: String },

    /// A channel resolved through the propeller directory.
    Channel { org_id: String, channel_id: String },
}

impl Origin {
    pub fn from_path(config: &Config, path: &str) -> BakeryResult<Self> {
        let segments: Vec<&str> = path.split('/').collect();

        if segments.get(1) == Some(&"propeller") {
            // ["", "propeller", orgID, channelID.m3u8]
            let (org_id, channel) = match segments.as_slice() {
                ["", "propeller", org_id, channel] => (*org_id, *channel),
                _ => return Err(BakeryError::PropellerPath(path.to_string())),
            };
            let channel_id = channel.split('.').next().unwrap_or_default();
            if org_id.is_empty() || channel_id.is_empty() {
                return Err(BakeryError::PropellerPath(path.to_string()));
            }

            return Ok(Self::Channel {
                org_id: org_id.to_string(),
                channel_id: channel_id.to_string(),
            });
        }

        // A single base64url segment is a rendition url pointing straight at
        // an absolute upstream.
        if let ["", rendition] = segments.as_slice() {
            if let Some(encoded) = rendition.strip_suffix(".m3u8") {
                return Ok(Self::Direct {
                    origin_host: String::new(),
                    path: decode_rendition_url(encoded)?,
                });
            }
        }

        Ok(Self::Direct {
            origin_host: config.origin_host.clone(),
            path: path.to_string(),
        })
    }

    /// The url the manifest is fetched from. Channel origins resolve through
    /// the directory service first.
    pub async fn playback_url(&self, propeller: Option<&PropellerClient>) -> BakeryResult<Url> {
        match self {
            Self::Direct { origin_host, path } => {
                if let Ok(absolute) = Url::parse(path) {
                    return Ok(absolute);
                }
                Ok(Url::parse(&format!("{origin_host}{path}"))?)
            }
            Self::Channel { org_id, channel_id } => {
                let propeller = propeller.ok_or(BakeryError::PropellerNotConfigured)?;
                let channel = propeller.get_channel(org_id, channel_id).await?;
                Ok(Url::parse(channel.playback_url()?)?)
            }
        }
    }
}

fn decode_rendition_url(encoded: &str) -> BakeryResult<String> {
    let decoded = URL_SAFE_NO_PAD
        .decode(encoded)
        .map_err(|e| BakeryError::RenditionDecode(e.to_string()))?;

    String::from_utf8(decoded).map_err(|e| BakeryError::RenditionDecode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        Config {
            origin_host: "https://origin.example.com".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn propeller_paths_become_channel_origins() {
        let origin = Origin::from_path(&config(), "/propeller/org1/ch1.m3u8").unwrap();
        assert_eq!(
            origin,
            Origin::Channel {
                org_id: "org1".to_string(),
                channel_id: "ch1".to_string(),
            }
        );
    }

    #[test]
    fn malformed_propeller_paths_are_rejected() {
        assert!(Origin::from_path(&config(), "/propeller/org1.m3u8").is_err());
        assert!(Origin::from_path(&config(), "/propeller/org1/extra/ch1.m3u8").is_err());
        assert!(Origin::from_path(&config(), "/propeller/org1/.m3u8").is_err());
    }

    #[test]
    fn rendition_urls_decode_to_absolute_upstreams() {
        let encoded = URL_SAFE_NO_PAD.encode("https://o/rendition.m3u8");
        let origin = Origin::from_path(&config(), &format!("/{encoded}.m3u8")).unwrap();
        assert_eq!(
            origin,
            Origin::Direct {
                origin_host: String::new(),
                path: "https://o/rendition.m3u8".to_string(),
            }
        );
    }

    #[test]
    fn invalid_rendition_base64_is_rejected() {
        assert!(Origin::from_path(&config(), "/@@@.m3u8").is_err());
    }

    #[tokio::test]
    async fn direct_paths_combine_with_the_origin_host() {
        let origin = Origin::from_path(&config(), "/some/master.m3u8").unwrap();
        let url = origin.playback_url(None).await.unwrap();
        assert_eq!(url.as_str(), "https://origin.example.com/some/master.m3u8");
    }

    #[tokio::test]
    async fn absolute_paths_are_used_verbatim() {
        let origin = Origin::Direct {
            origin_host: String::new(),
            path: "https://o/rendition.m3u8".to_string(),
        };
        let url = origin.playback_url(None).await.unwrap();
        assert_eq!(url.as_str(), "https://o/rendition.m3u8");
    }
}
