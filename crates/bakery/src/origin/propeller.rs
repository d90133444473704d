//! Minimal client for the propeller channel directory.

use reqwest::StatusCode;
use serde::Deserialize;

use crate::config::PropellerConfig;
use crate::error::{BakeryError, BakeryResult};

#[derive(Clone)]
pub struct PropellerClient {
    host: String,
    creds: String,
    client: reqwest::Client,
}

/// A channel as the directory describes it. Playback urls are picked in
/// preference order: ad-stitched, then captioned, then the plain stream.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Channel {
    #[serde(default)]
    pub ads: bool,
    #[serde(default)]
    pub ads_url: String,
    #[serde(default)]
    pub captions: bool,
    #[serde(default)]
    pub captions_url: String,
    #[serde(default)]
    pub url: String,
}

impl Channel {
    pub fn playback_url(&self) -> BakeryResult<&str> {
        if self.ads && !self.ads_url.is_empty() {
            return Ok(&self.ads_url);
        }
        if self.captions && !self.captions_url.is_empty() {
            return Ok(&self.captions_url);
        }
        if !self.url.is_empty() {
            return Ok(&self.url);
        }
        Err(BakeryError::ChannelWithoutPlayback)
    }
}

impl PropellerClient {
    pub fn new(config: &PropellerConfig, client: reqwest::Client) -> Self {
        Self {
            host: config.host.trim_end_matches('/').to_string(),
            creds: config.creds.clone(),
            client,
        }
    }

    pub async fn get_channel(&self, org_id: &str, channel_id: &str) -> BakeryResult<Channel> {
        let url = format!(
            "{}/v1/organization/{org_id}/channel/{channel_id}",
            self.host
        );

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.creds)
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(BakeryError::ChannelNotFound {
                org_id: org_id.to_string(),
                channel_id: channel_id.to_string(),
            }),
            status if !status.is_success() => Err(BakeryError::PropellerStatus(status)),
            _ => Ok(response.json().await?),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ads_url_wins_when_the_channel_has_ads() {
        let channel = Channel {
            ads: true,
            ads_url: "https://cdn/a.m3u8".to_string(),
            url: "https://cdn/p.m3u8".to_string(),
            ..Default::default()
        };
        assert_eq!(channel.playback_url().unwrap(), "https://cdn/a.m3u8");
    }

    #[test]
    fn captions_url_comes_before_the_plain_stream() {
        let channel = Channel {
            captions: true,
            captions_url: "https://cdn/c.m3u8".to_string(),
            url: "https://cdn/p.m3u8".to_string(),
            ..Default::default()
        };
        assert_eq!(channel.playback_url().unwrap(), "https://cdn/c.m3u8");
    }

    #[test]
    fn flagged_but_empty_urls_fall_through() {
        let channel = Channel {
            ads: true,
            captions: true,
            url: "https://cdn/p.m3u8".to_string(),
            ..Default::default()
        };
        assert_eq!(channel.playback_url().unwrap(), "https://cdn/p.m3u8");
    }

    #[test]
    fn a_channel_without_urls_is_an_error() {
        assert!(Channel::default().playback_url().is_err());
    }
}
