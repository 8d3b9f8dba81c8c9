use std::fs;
use std::io::ErrorKind;

use crate::error::CacheFetchError;
use crate::offline::{FetchRequest, FetchResponse, ResourceFetch};

/// The network side of the cache worker.
pub trait Fetcher: Send {
    fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, CacheFetchError>;
}

/// HTTP(S) through a blocking `reqwest` client; anything else is read from
/// the filesystem (`file://` prefix optional). A missing file answers 404.
pub struct SourceFetcher {
    #[cfg(feature = "network")]
    client: Option<reqwest::blocking::Client>,
}

impl SourceFetcher {
    pub fn new() -> Self {
        Self {
            #[cfg(feature = "network")]
            client: reqwest::blocking::Client::builder()
                .timeout(std::time::Duration::from_secs(10))
                .build()
                .map_err(|e| tracing::warn!(error = %e, "http client unavailable"))
                .ok(),
        }
    }

    fn fetch_file(&self, url: &str) -> Result<FetchResponse, CacheFetchError> {
        let path = url.strip_prefix("file://").unwrap_or(url);
        match fs::read(path) {
            Ok(body) => Ok(FetchResponse::ok(body)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(FetchResponse {
                status: 404,
                body: Vec::new(),
            }),
            Err(e) => Err(CacheFetchError::Network {
                url: url.to_string(),
                reason: e.to_string(),
            }),
        }
    }

    #[cfg(feature = "network")]
    fn fetch_http(&self, request: &FetchRequest) -> Result<FetchResponse, CacheFetchError> {
        let network_error = |reason: String| CacheFetchError::Network {
            url: request.url.clone(),
            reason,
        };
        let client = self
            .client
            .as_ref()
            .ok_or_else(|| network_error("http client unavailable".to_string()))?;
        let method = reqwest::Method::from_bytes(request.method.to_ascii_uppercase().as_bytes())
            .map_err(|e| network_error(e.to_string()))?;
        let response = client
            .request(method, &request.url)
            .send()
            .map_err(|e| network_error(e.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .bytes()
            .map_err(|e| network_error(e.to_string()))?
            .to_vec();
        Ok(FetchResponse { status, body })
    }

    #[cfg(not(feature = "network"))]
    fn fetch_http(&self, request: &FetchRequest) -> Result<FetchResponse, CacheFetchError> {
        Err(CacheFetchError::Network {
            url: request.url.clone(),
            reason: "built without network support".to_string(),
        })
    }
}

impl Default for SourceFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Fetcher for SourceFetcher {
    fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, CacheFetchError> {
        if request.url.starts_with("http://") || request.url.starts_with("https://") {
            self.fetch_http(request)
        } else {
            self.fetch_file(&request.url)
        }
    }
}

/// Direct fetching for when the cache worker could not be started.
impl ResourceFetch for SourceFetcher {
    fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, CacheFetchError> {
        let response = self.fetch(&FetchRequest::get(url))?;
        if response.is_ok() {
            Ok(response.body)
        } else {
            Err(CacheFetchError::Status {
                url: url.to_string(),
                status: response.status,
            })
        }
    }
}
