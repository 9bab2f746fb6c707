use std::time::Duration;

pub const DEFAULT_API_URL: &str = "http://127.0.0.1:4000/api/monitored";

/// Deadline for every request to the visit API.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(10_000);

/// Where the visit API lives and how long to wait for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Collection endpoint, without trailing slash.
    pub base_url: String,
    pub timeout: Duration,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_API_URL, DEFAULT_TIMEOUT)
    }
}
