// Shared transport configuration for building reqwest::Client instances.
//
// Both auth legs and the telemetry client go through the same client,
// which carries the FordPass application headers on every request.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue};

/// Application identifier expected by the FordPass backend.
const APPLICATION_ID: &str = "71A3AD0A-CF46-4CCF-B473-FC7FE5BC4592";

/// User agent matching the mobile app; some endpoints reject unknown agents.
const USER_AGENT: &str = "FordPass/2 CFNetwork/1475 Darwin/23.0.0";

/// Shared transport configuration for building HTTP clients.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
        }
    }
}

impl TransportConfig {
    /// Build a `reqwest::Client` from this config.
    ///
    /// The FordPass headers (`Application-Id`, user agent) are installed
    /// as default headers so every request carries them.
    pub fn build_client(&self) -> Result<reqwest::Client, crate::error::Error> {
        let mut headers = HeaderMap::new();
        headers.insert("Accept", HeaderValue::from_static("*/*"));
        headers.insert(
            "Accept-Language",
            HeaderValue::from_static("en-US,en;q=0.9"),
        );
        headers.insert("Application-Id", HeaderValue::from_static(APPLICATION_ID));

        reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .build()
            .map_err(crate::error::Error::Transport)
    }
}
