//! Shared HTTP client.
//!
//! Every remote stage goes through one `reqwest::Client` configured with the
//! same User-Agent and timeout, plus a helper that turns non-success
//! statuses into [`Error::Api`].

use tracing::debug;

use crate::config::HttpConfig;
use crate::error::{Error, Result};

/// Upper bound on how much of an error body is kept for diagnostics.
const MAX_ERROR_BODY: usize = 512;

/// A thin wrapper around `reqwest::Client` with the tracker's defaults applied.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: reqwest::Client,
}

impl HttpClient {
    /// Build a client from the HTTP section of the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS backend cannot be initialised.
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder().user_agent(config.user_agent.clone());
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
        })
    }

    /// The underlying `reqwest::Client`.
    #[must_use]
    pub fn inner(&self) -> &reqwest::Client {
        &self.client
    }
}

/// Pass successful responses through, convert anything else into [`Error::Api`].
///
/// # Errors
///
/// Returns [`Error::Api`] carrying the status and a truncated body.
pub async fn check_status(
    service: &'static str,
    response: reqwest::Response,
) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        debug!(service, %status, "request succeeded");
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(Error::api(service, status.as_u16(), truncate(&body)))
}

fn truncate(body: &str) -> String {
    if body.len() <= MAX_ERROR_BODY {
        return body.to_string();
    }
    let mut end = MAX_ERROR_BODY;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &body[..end])
}

/// Join a base URL and a path without doubling or dropping the slash.
#[must_use]
pub fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
