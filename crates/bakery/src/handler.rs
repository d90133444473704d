//! Request orchestration: parse → resolve → fetch → filter.

use crate::config::Config;
use crate::error::BakeryResult;
use crate::origin::{Origin, PropellerClient};
use crate::{fetch, filters, parser};

/// A filtered manifest ready to be written to the client.
#[derive(Clone, Debug)]
pub struct FilteredManifest {
    pub body: String,
    pub content_type: &'static str,
}

/// Per-process context shared read-only across requests: the configuration
/// plus the pooled upstream clients.
pub struct App {
    config: Config,
    client: reqwest::Client,
    propeller: Option<PropellerClient>,
}

impl App {
    pub fn new(config: Config) -> Self {
        let client = config.client();
        let propeller = config
            .propeller
            .as_ref()
            .map(|p| PropellerClient::new(p, client.clone()));

        Self {
            config,
            client,
            propeller,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Serves one request path. Every failure is surfaced; the unfiltered
    /// upstream manifest is never returned.
    pub async fn handle(&self, path: &str) -> BakeryResult<FilteredManifest> {
        let (manifest_path, filters) = parser::url_parse(path)?;
        if !filters.plugins.is_empty() {
            log::debug!("plugins requested, executed elsewhere: {:?}", filters.plugins);
        }

        let origin = Origin::from_path(&self.config, &manifest_path)?;
        let playback_url = origin.playback_url(self.propeller.as_ref()).await?;
        log::debug!("proxying {path} via {playback_url}");

        let manifest = fetch::fetch_manifest(&self.client, &playback_url).await?;

        let protocol = filters::protocol_for(&filters, &playback_url)?;
        let body =
            filters::filter_manifest(protocol, &self.config, &filters, &playback_url, &manifest)?;

        Ok(FilteredManifest {
            body,
            content_type: protocol.content_type(),
        })
    }
}
