use std::thread;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue, USER_AGENT};

use crate::domain::IndicatorId;
use crate::error::SotkaError;

pub const DEFAULT_BASE_URL: &str = "https://sotkanet.fi/rest/1.1";

pub trait SotkaClient: Send + Sync {
    fn fetch_indicators(&self) -> Result<String, SotkaError>;
    fn fetch_indicator_metadata(&self, id: &IndicatorId) -> Result<String, SotkaError>;
}

#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub base_url: String,
    pub timeout: Duration,
    pub retries: usize,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(30),
            retries: 0,
        }
    }
}

#[derive(Clone)]
pub struct SotkaHttpClient {
    client: Client,
    base_url: String,
    retries: usize,
}

impl SotkaHttpClient {
    pub fn new(settings: HttpSettings) -> Result<Self, SotkaError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("sotka-indicators/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| SotkaError::SotkaHttp(err.to_string()))?,
        );
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .timeout(settings.timeout)
            .build()
            .map_err(|err| SotkaError::SotkaHttp(err.to_string()))?;
        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            retries: settings.retries,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn indicators_url(&self) -> String {
        format!("{}/indicators", self.base_url)
    }

    pub fn metadata_url(&self, id: &IndicatorId) -> String {
        format!("{}/indicators/{}", self.base_url, id)
    }

    fn get_text(&self, url: &str) -> Result<String, SotkaError> {
        tracing::debug!(url, "requesting");
        let response = self.send_with_retries(|| self.client.get(url))?;
        let response = Self::handle_status(response)?;
        response
            .text()
            .map_err(|err| SotkaError::SotkaHttp(err.to_string()))
    }

    fn send_with_retries<F>(
        &self,
        mut make_req: F,
    ) -> Result<reqwest::blocking::Response, SotkaError>
    where
        F: FnMut() -> reqwest::blocking::RequestBuilder,
    {
        const BASE_DELAY_MS: u64 = 200;
        let mut attempt = 0usize;
        loop {
            let response = make_req().send();
            match response {
                Ok(resp) => {
                    let status = resp.status().as_u16();
                    if attempt < self.retries && is_retryable_status(status) {
                        let delay = BASE_DELAY_MS * (attempt as u64 + 1);
                        thread::sleep(Duration::from_millis(delay));
                        attempt += 1;
                        continue;
                    }
                    return Ok(resp);
                }
                Err(err) => {
                    if attempt < self.retries && is_retryable_error(&err) {
                        let delay = BASE_DELAY_MS * (attempt as u64 + 1);
                        thread::sleep(Duration::from_millis(delay));
                        attempt += 1;
                        continue;
                    }
                    return Err(SotkaError::SotkaHttp(err.to_string()));
                }
            }
        }
    }

    fn handle_status(
        response: reqwest::blocking::Response,
    ) -> Result<reqwest::blocking::Response, SotkaError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let message = response
            .text()
            .unwrap_or_else(|_| "SotkaNET request failed".to_string());
        Err(SotkaError::SotkaStatus { status, message })
    }
}

impl SotkaClient for SotkaHttpClient {
    fn fetch_indicators(&self) -> Result<String, SotkaError> {
        self.get_text(&self.indicators_url())
    }

    fn fetch_indicator_metadata(&self, id: &IndicatorId) -> Result<String, SotkaError> {
        self.get_text(&self.metadata_url(id))
    }
}

fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

fn is_retryable_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_request()
}
