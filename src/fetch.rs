use std::path::Path;
use std::time::Instant;

use tracing::{debug, info};

use crate::error::{EtlError, Result};

/// Returns the raw markup behind a URL.
pub trait Fetcher {
    fn fetch(&self, url: &str) -> Result<String>;
}

/// Blocking HTTP fetch; anything that is not an http(s) URL is read from disk.
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("bank_etl/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| EtlError::Fetch {
                url: String::new(),
                reason: format!("failed to build HTTP client: {}", e),
            })?;
        Ok(HttpFetcher { client })
    }

    fn fetch_http(&self, url: &str) -> Result<String> {
        let fail = |reason: String| EtlError::Fetch {
            url: url.to_string(),
            reason,
        };

        let start = Instant::now();
        let response = self.client.get(url).send().map_err(|e| fail(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(fail(format!("HTTP {}", status)));
        }
        let body = response.text().map_err(|e| fail(e.to_string()))?;
        info!(
            "Fetched {} ({} bytes, {} ms)",
            url,
            body.len(),
            start.elapsed().as_millis()
        );
        Ok(body)
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<String> {
        if is_remote(url) {
            self.fetch_http(url)
        } else {
            read_local(url)
        }
    }
}

fn is_remote(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

fn read_local(url: &str) -> Result<String> {
    let path = Path::new(url.strip_prefix("file://").unwrap_or(url));
    debug!("Reading source from {:?}", path);
    std::fs::read_to_string(path).map_err(|e| EtlError::Fetch {
        url: url.to_string(),
        reason: e.to_string(),
    })
}
