//! HTTP client wrapper
//!
//! This module builds the client every request of a source goes through:
//! - fixed request headers (User-Agent, Accept, Accept-Language, Connection)
//! - mandatory request and connect timeouts
//! - bounded automatic retry with exponential backoff
//! - error classification into [`FetchError`]

use crate::config::{HttpSettings, RetryPolicy};
use crate::FetchError;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CONNECTION};
use reqwest::Client;
use std::time::Duration;
use url::Url;

/// Connection-pooled client with a retry policy
///
/// Cloning is cheap and shares the connection pool. One client serves every
/// request of one source during one run.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    retry: RetryPolicy,
}

impl RetryPolicy {
    /// Wait before retry number `retry` (1-based)
    ///
    /// `backoff_factor * 2^(retry-1)` seconds, capped at `backoff_max_secs`.
    pub fn backoff(&self, retry: u32) -> Duration {
        if retry == 0 {
            return Duration::ZERO;
        }
        let exponent = (retry - 1).min(62) as i32;
        let secs = (self.backoff_factor * 2f64.powi(exponent)).min(self.backoff_max_secs);
        if secs.is_finite() && secs > 0.0 {
            Duration::from_secs_f64(secs)
        } else {
            Duration::ZERO
        }
    }

    /// Returns true if a response with this status should be retried
    pub fn is_retryable(&self, status: u16) -> bool {
        self.status_forcelist.contains(&status)
    }
}

impl HttpClient {
    /// Builds a client bound to the given headers, timeouts and retry policy
    ///
    /// # Example
    ///
    /// ```no_run
    /// use law_crawler::config::{HttpSettings, RetryPolicy};
    /// use law_crawler::crawler::HttpClient;
    ///
    /// let client = HttpClient::open(&HttpSettings::default(), &RetryPolicy::default()).unwrap();
    /// ```
    pub fn open(settings: &HttpSettings, retry: &RetryPolicy) -> Result<Self, reqwest::Error> {
        let mut headers = HeaderMap::new();
        if let Ok(value) = HeaderValue::from_str(&settings.accept) {
            headers.insert(ACCEPT, value);
        }
        if let Ok(value) = HeaderValue::from_str(&settings.accept_language) {
            headers.insert(ACCEPT_LANGUAGE, value);
        }
        headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));

        let client = Client::builder()
            .user_agent(settings.user_agent.as_str())
            .default_headers(headers)
            .timeout(Duration::from_secs(settings.timeout_secs.max(1)))
            .connect_timeout(Duration::from_secs(settings.connect_timeout_secs.max(1)))
            .pool_idle_timeout(Duration::from_secs(90))
            .gzip(true)
            .brotli(true)
            .build()?;

        Ok(Self {
            client,
            retry: retry.clone(),
        })
    }

    /// The retry policy this client applies
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Fetches a page body as text
    ///
    /// # Retry Logic
    ///
    /// | Condition                     | Action                               |
    /// |-------------------------------|--------------------------------------|
    /// | 2xx                           | Return the body                      |
    /// | Status in `status_forcelist`  | Retry with backoff                   |
    /// | Timeout / connection failure  | Retry with backoff                   |
    /// | Any other status              | Fail immediately (`FetchError::Status`) |
    /// | Other request errors          | Fail immediately (`FetchError::Http`)   |
    ///
    /// At most `total + 1` attempts are made. When every attempt timed out the
    /// result is `FetchError::Timeout`, otherwise `FetchError::RetriesExhausted`.
    pub async fn get_text(&self, url: &Url) -> Result<String, FetchError> {
        let attempts = self.retry.total.saturating_add(1);
        let mut last_error = None;
        let mut only_timeouts = true;

        for attempt in 1..=attempts {
            if attempt > 1 {
                let wait = self.retry.backoff(attempt - 1);
                tracing::debug!(
                    url = %url,
                    attempt,
                    wait_ms = wait.as_millis() as u64,
                    "Retrying request"
                );
                tokio::time::sleep(wait).await;
            }

            match self.client.get(url.clone()).send().await {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        return response.text().await.map_err(|e| classify(url, e));
                    }

                    let error = FetchError::Status {
                        url: url.to_string(),
                        status: status.as_u16(),
                    };

                    if !self.retry.is_retryable(status.as_u16()) {
                        return Err(error);
                    }

                    tracing::warn!(url = %url, status = status.as_u16(), attempt, "Retryable status");
                    only_timeouts = false;
                    last_error = Some(error);
                }
                Err(e) if e.is_timeout() || e.is_connect() => {
                    tracing::warn!(url = %url, attempt, error = %e, "Transient network error");
                    only_timeouts &= e.is_timeout();
                    last_error = Some(classify(url, e));
                }
                Err(e) => return Err(classify(url, e)),
            }
        }

        Err(match last_error {
            Some(timeout @ FetchError::Timeout { .. }) if only_timeouts => timeout,
            Some(other) => FetchError::RetriesExhausted {
                url: url.to_string(),
                attempts,
                last: other.to_string(),
            },
            None => FetchError::RetriesExhausted {
                url: url.to_string(),
                attempts,
                last: "no response".to_string(),
            },
        })
    }
}

/// Maps a reqwest error onto the fetch error taxonomy
fn classify(url: &Url, error: reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
        }
    } else {
        FetchError::Http {
            url: url.to_string(),
            source: error,
        }
    }
}
