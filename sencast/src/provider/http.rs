//! HTTP client abstraction for testability

use super::types::ProviderError;
use std::future::Future;
use std::path::Path;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{debug, trace, warn};

/// Authentication applied to a streamed download.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestAuth<'a> {
    None,
    Bearer(&'a str),
    Basic { username: &'a str, password: &'a str },
    /// Arbitrary header, e.g. `X-Auth-Token`
    Header(&'a str, &'a str),
}

/// Trait for asynchronous HTTP client operations.
///
/// This abstraction allows for dependency injection and easier testing
/// by enabling mock HTTP clients in tests.
pub trait AsyncHttpClient: Send + Sync {
    /// Performs an async HTTP GET request.
    fn get(&self, url: &str) -> impl Future<Output = Result<Vec<u8>, ProviderError>> + Send;

    /// Performs an async HTTP GET request with custom headers.
    ///
    /// # Arguments
    ///
    /// * `url` - The URL to request
    /// * `headers` - Slice of (header_name, header_value) tuples
    fn get_with_headers(
        &self,
        url: &str,
        headers: &[(&str, &str)],
    ) -> impl Future<Output = Result<Vec<u8>, ProviderError>> + Send;

    /// Performs an async HTTP GET request with Bearer token authentication.
    fn get_with_bearer(
        &self,
        url: &str,
        bearer_token: &str,
    ) -> impl Future<Output = Result<Vec<u8>, ProviderError>> + Send;

    /// Performs an async HTTP GET request with basic authentication.
    fn get_with_basic(
        &self,
        url: &str,
        username: &str,
        password: &str,
    ) -> impl Future<Output = Result<Vec<u8>, ProviderError>> + Send;

    /// Performs an async HTTP POST request with JSON body.
    fn post_json(
        &self,
        url: &str,
        json_body: &str,
    ) -> impl Future<Output = Result<Vec<u8>, ProviderError>> + Send;

    /// Performs an async HTTP POST request with JSON body and custom headers.
    fn post_json_with_headers(
        &self,
        url: &str,
        json_body: &str,
        headers: &[(&str, &str)],
    ) -> impl Future<Output = Result<Vec<u8>, ProviderError>> + Send;

    /// Performs an async HTTP POST of an URL-encoded form.
    fn post_form(
        &self,
        url: &str,
        fields: &[(&str, &str)],
    ) -> impl Future<Output = Result<Vec<u8>, ProviderError>> + Send;

    /// Streams a response body into `dest`, returning the number of bytes
    /// written.
    fn download_to(
        &self,
        url: &str,
        auth: RequestAuth<'_>,
        dest: &Path,
    ) -> impl Future<Output = Result<u64, ProviderError>> + Send;
}

/// Default User-Agent string for HTTP requests.
const DEFAULT_USER_AGENT: &str = concat!("sencast/", env!("CARGO_PKG_VERSION"));

/// Async HTTP client implementation using reqwest.
#[derive(Clone)]
pub struct AsyncReqwestClient {
    client: reqwest::Client,
}

impl AsyncReqwestClient {
    /// Creates a new AsyncReqwestClient with the given request timeout.
    ///
    /// The timeout bounds whole requests, including product downloads, so it
    /// should be generous.
    pub fn with_timeout(timeout: Duration) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(30))
            .user_agent(DEFAULT_USER_AGENT)
            .tcp_keepalive(Duration::from_secs(30))
            .build()
            .map_err(|e| ProviderError::Http(format!("Failed to create async HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    async fn execute(
        &self,
        request: reqwest::RequestBuilder,
        method: &str,
        url: &str,
    ) -> Result<reqwest::Response, ProviderError> {
        trace!(method, url, "HTTP request starting");

        let response = match request.send().await {
            Ok(resp) => {
                debug!(method, url, status = resp.status().as_u16(), "HTTP response received");
                resp
            }
            Err(e) => {
                warn!(
                    method,
                    url,
                    error = %e,
                    is_connect = e.is_connect(),
                    is_timeout = e.is_timeout(),
                    "HTTP request failed"
                );
                return Err(ProviderError::Http(format!("Request failed: {}", e)));
            }
        };

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(ProviderError::Authentication(format!(
                "HTTP {} from {} {}",
                status, method, url
            )));
        }
        if !status.is_success() {
            warn!(method, url, status = status.as_u16(), "HTTP error status");
            return Err(ProviderError::Http(format!(
                "HTTP {} from {} {}",
                status, method, url
            )));
        }

        Ok(response)
    }

    async fn body(
        &self,
        request: reqwest::RequestBuilder,
        method: &str,
        url: &str,
    ) -> Result<Vec<u8>, ProviderError> {
        let response = self.execute(request, method, url).await?;
        match response.bytes().await {
            Ok(bytes) => {
                trace!(url, bytes = bytes.len(), "HTTP response body read");
                Ok(bytes.to_vec())
            }
            Err(e) => {
                warn!(url, error = %e, "Failed to read response body");
                Err(ProviderError::Http(format!("Failed to read response: {}", e)))
            }
        }
    }
}

impl AsyncHttpClient for AsyncReqwestClient {
    async fn get(&self, url: &str) -> Result<Vec<u8>, ProviderError> {
        self.body(self.client.get(url), "GET", url).await
    }

    async fn get_with_headers(
        &self,
        url: &str,
        headers: &[(&str, &str)],
    ) -> Result<Vec<u8>, ProviderError> {
        let mut request = self.client.get(url);
        for (name, value) in headers {
            request = request.header(*name, *value);
        }
        self.body(request, "GET", url).await
    }

    async fn get_with_bearer(&self, url: &str, bearer_token: &str) -> Result<Vec<u8>, ProviderError> {
        self.body(self.client.get(url).bearer_auth(bearer_token), "GET", url)
            .await
    }

    async fn get_with_basic(
        &self,
        url: &str,
        username: &str,
        password: &str,
    ) -> Result<Vec<u8>, ProviderError> {
        self.body(
            self.client.get(url).basic_auth(username, Some(password)),
            "GET",
            url,
        )
        .await
    }

    async fn post_json(&self, url: &str, json_body: &str) -> Result<Vec<u8>, ProviderError> {
        self.post_json_with_headers(url, json_body, &[]).await
    }

    async fn post_json_with_headers(
        &self,
        url: &str,
        json_body: &str,
        headers: &[(&str, &str)],
    ) -> Result<Vec<u8>, ProviderError> {
        let mut request = self
            .client
            .post(url)
            .header("Content-Type", "application/json")
            .body(json_body.to_string());
        for (name, value) in headers {
            request = request.header(*name, *value);
        }
        self.body(request, "POST", url).await
    }

    async fn post_form(&self, url: &str, fields: &[(&str, &str)]) -> Result<Vec<u8>, ProviderError> {
        self.body(self.client.post(url).form(fields), "POST", url)
            .await
    }

    async fn download_to(
        &self,
        url: &str,
        auth: RequestAuth<'_>,
        dest: &Path,
    ) -> Result<u64, ProviderError> {
        let request = match auth {
            RequestAuth::None => self.client.get(url),
            RequestAuth::Bearer(token) => self.client.get(url).bearer_auth(token),
            RequestAuth::Basic { username, password } => {
                self.client.get(url).basic_auth(username, Some(password))
            }
            RequestAuth::Header(name, value) => self.client.get(url).header(name, value),
        };
        let mut response = self.execute(request, "GET", url).await?;

        let mut file = tokio::fs::File::create(dest).await?;
        let mut written = 0u64;
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| ProviderError::Http(format!("Download interrupted: {}", e)))?
        {
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;

        debug!(url, bytes = written, dest = %dest.display(), "Download complete");
        Ok(written)
    }
}
