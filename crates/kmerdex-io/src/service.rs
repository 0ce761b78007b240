//! Blocking HTTP client for the remote peptide match service

use kmerdex_core::error::LookupError;
use kmerdex_core::fanout::{IonCharge, MatchService, ReferenceMatch};
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, RETRY_AFTER, USER_AGENT};
use reqwest::{StatusCode, Url};
use std::thread;
use std::time::Duration;

pub struct HttpMatchService {
    client: Client,
    url: Url,
    retries: u32,
    backoff: Duration,
    /// Upper bound on any single wait between attempts
    max_wait: Duration,
}

#[derive(thiserror::Error, Debug)]
pub enum ServiceError {
    #[error("invalid service url `{url}`: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("failed to build http client: {0}")]
    Client(#[from] reqwest::Error),
}

impl HttpMatchService {
    pub fn new(url: &str, timeout: Duration, retries: u32) -> Result<Self, ServiceError> {
        let parsed = Url::parse(url).map_err(|e| ServiceError::InvalidUrl {
            url: url.into(),
            reason: e.to_string(),
        })?;

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("kmerdex/", env!("CARGO_PKG_VERSION"))),
        );

        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            url: parsed,
            retries,
            backoff: Duration::from_millis(500),
            max_wait: timeout,
        })
    }

    /// Wait between attempts grows linearly: `backoff`, `2 * backoff`, ...
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn lookup_url(&self, weight: f64, ion_charge: IonCharge, ppm_tolerance: f64) -> Url {
        let mut url = self.url.clone();
        url.query_pairs_mut()
            .append_pair("ion_charge", &ion_charge.to_string())
            .append_pair("weight", &weight.to_string())
            .append_pair("ppm_tolerance", &ppm_tolerance.to_string());
        url
    }

    /// Delay before retry number `attempt + 1`: the server's `Retry-After`
    /// if it sent one, linear backoff otherwise, never more than the
    /// request timeout
    fn retry_wait(&self, attempt: u32, retry_after: Option<u64>) -> Duration {
        let wait = match retry_after {
            Some(secs) => Duration::from_secs(secs),
            None => self.backoff * (attempt + 1),
        };
        wait.min(self.max_wait)
    }
}

fn retryable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

impl MatchService for HttpMatchService {
    fn lookup(
        &self,
        weight: f64,
        ion_charge: IonCharge,
        ppm_tolerance: f64,
    ) -> Result<Vec<ReferenceMatch>, LookupError> {
        let url = self.lookup_url(weight, ion_charge, ppm_tolerance);
        let mut attempt = 0;
        loop {
            match self.client.get(url.clone()).send() {
                Ok(response) if response.status().is_success() => {
                    return response
                        .json::<Vec<ReferenceMatch>>()
                        .map_err(|e| LookupError::Decode(e.to_string()));
                }
                Ok(response) if retryable(response.status()) && attempt < self.retries => {
                    let retry_after = response
                        .headers()
                        .get(RETRY_AFTER)
                        .and_then(|value| value.to_str().ok())
                        .and_then(|value| value.parse::<u64>().ok());
                    log::warn!(
                        "{} responded with {}, retrying ({}/{})",
                        url,
                        response.status(),
                        attempt + 1,
                        self.retries
                    );
                    thread::sleep(self.retry_wait(attempt, retry_after));
                }
                Ok(response) => {
                    return Err(LookupError::Status {
                        status: response.status().as_u16(),
                    })
                }
                Err(err) if attempt < self.retries && (err.is_timeout() || err.is_connect()) => {
                    log::warn!(
                        "request to {} failed: {}, retrying ({}/{})",
                        url,
                        err,
                        attempt + 1,
                        self.retries
                    );
                    thread::sleep(self.retry_wait(attempt, None));
                }
                Err(err) => return Err(LookupError::Network(Box::new(err))),
            }
            attempt += 1;
        }
    }
}
