use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::extract::State;
use axum::http::{header, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;
use bakery::{App, Config, PropellerConfig};
use clap::Parser;
use tracing_subscriber::filter::LevelFilter;

#[derive(Parser, Debug, Clone)]
#[clap(name = "bakery", about = "Manifest filtering proxy for hls and dash streams")]
struct BakeryArgs {
    /// Address the http listener binds to
    #[clap(long, env = "BAKERY_HTTP_PORT", default_value = "0.0.0.0:8080")]
    listen: String,

    /// Url prefix for direct origins
    #[clap(long, env = "BAKERY_ORIGIN_HOST", default_value = "")]
    origin_host: String,

    /// Host clients reach this proxy on, used in trim redirect urls
    #[clap(long, env = "BAKERY_HOSTNAME", default_value = "localhost")]
    hostname: String,

    /// Upstream fetch timeout, in seconds
    #[clap(long, env = "BAKERY_CLIENT_TIMEOUT", default_value = "5")]
    client_timeout: u64,

    /// Propeller directory host
    #[clap(long, env = "BAKERY_PROPELLER_HOST")]
    propeller_host: Option<String>,

    /// Propeller directory credentials
    #[clap(long, env = "BAKERY_PROPELLER_CREDS")]
    propeller_creds: Option<String>,
}

impl BakeryArgs {
    fn config(&self) -> Config {
        let propeller = match (&self.propeller_host, &self.propeller_creds) {
            (Some(host), Some(creds)) => Some(PropellerConfig {
                host: host.clone(),
                creds: creds.clone(),
            }),
            _ => None,
        };

        Config {
            listen: self.listen.clone(),
            origin_host: self.origin_host.trim_end_matches('/').to_string(),
            hostname: self.hostname.clone(),
            client_timeout: Duration::from_secs(self.client_timeout),
            propeller,
        }
    }
}

async fn proxy(State(app): State<Arc<App>>, uri: Uri) -> Response {
    match app.handle(uri.path()).await {
        Ok(manifest) => {
            ([(header::CONTENT_TYPE, manifest.content_type)], manifest.body).into_response()
        }
        Err(error) => {
            log::warn!("request {} failed: {error}", uri.path());
            (error.http_status(), error.to_string()).into_response()
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = BakeryArgs::parse();
    let config = args.config();

    log::info!("listening on {}", config.listen);
    if !config.origin_host.is_empty() {
        log::info!("direct origin host: {}", config.origin_host);
    }
    if config.propeller.is_some() {
        log::info!("propeller directory configured");
    }

    let listen = config.listen.clone();
    let app = Arc::new(App::new(config));
    let router = Router::new().fallback(proxy).with_state(app);

    let listener = tokio::net::TcpListener::bind(&listen)
        .await
        .with_context(|| format!("binding {listen}"))?;
    axum::serve(listener, router).await?;

    Ok(())
}
