use std::time::Duration;

/// Service configuration. Built once at startup and shared read-only with
/// every request.
#[derive(Clone, Debug)]
pub struct Config {
    /// Address the HTTP listener binds to.
    pub listen: String,

    /// URL prefix prepended to relative manifest paths.
    pub origin_host: String,

    /// Host clients reach this proxy on, used when synthesizing
    /// self-referential trim urls.
    pub hostname: String,

    /// Timeout for each upstream manifest fetch.
    pub client_timeout: Duration,

    pub propeller: Option<PropellerConfig>,
}

/// Connection details for the propeller channel directory.
#[derive(Clone, Debug)]
pub struct PropellerConfig {
    pub host: String,
    pub creds: String,
}

impl Config {
    pub fn client(&self) -> reqwest::Client {
        reqwest::Client::builder()
            .timeout(self.client_timeout)
            .build()
            .unwrap()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:8080".to_string(),
            origin_host: String::new(),
            hostname: "localhost".to_string(),
            client_timeout: Duration::from_secs(5),
            propeller: None,
        }
    }
}
