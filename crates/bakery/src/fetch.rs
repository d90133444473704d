use reqwest::Client;
use url::Url;

use crate::error::{BakeryError, BakeryResult};

/// Fetches the manifest text behind `url`. Responses below 400 count as
/// success so redirect bodies the client followed on its own pass through;
/// anything else surfaces the upstream status.
pub async fn fetch_manifest(client: &Client, url: &Url) -> BakeryResult<String> {
    log::debug!("fetching manifest from {url}");

    let response = client.get(url.clone()).send().await?;

    let status = response.status();
    if status.as_u16() >= 400 {
        return Err(BakeryError::UpstreamStatus(status));
    }

    Ok(response.text().await?)
}
