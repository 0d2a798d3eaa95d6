//! HTTP source fetching
//!
//! Lives in the CLI so the compiler libraries stay network-free.

use std::time::Duration;

use hostmill_compiler::fetch::{ContentFetcher, FetchError};

const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    pub fn new() -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .user_agent(concat!("hostmill/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_default();
        Self { client }
    }
}

impl ContentFetcher for HttpFetcher {
    fn can_handle(&self, source: &str) -> bool {
        source.starts_with("http://") || source.starts_with("https://")
    }

    fn fetch(&self, source: &str) -> Result<String, FetchError> {
        let response = self
            .client
            .get(source)
            .send()
            .map_err(|e| FetchError::Http {
                url: source.to_string(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Http {
                url: source.to_string(),
                message: format!("unexpected status {status}"),
            });
        }

        response.text().map_err(|e| FetchError::Http {
            url: source.to_string(),
            message: e.to_string(),
        })
    }
}
