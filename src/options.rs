use std::time::Duration;

use crate::{KrakenError, Result};

/// Default REST endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.kraken.com";

/// Client identification sent as `User-Agent` on every request.
pub(crate) const USER_AGENT: &str = concat!("kraken-http/", env!("CARGO_PKG_VERSION"));

/// Configures timeouts, retry budget and rate limiting.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ClientOptions {
    /// Base URL requests are sent to; endpoint paths are appended verbatim.
    pub base_url: String,
    /// Combined connect and read timeout in milliseconds.
    pub timeout_ms: Option<u64>,
    /// Connect timeout in milliseconds. Use together with `read_timeout_ms`.
    pub connect_timeout_ms: Option<u64>,
    /// Read timeout in milliseconds. Use together with `connect_timeout_ms`.
    pub read_timeout_ms: Option<u64>,
    /// Overall time budget across retries of one call, in milliseconds.
    pub retry_timeout_ms: u64,
    /// Base retry backoff in milliseconds, grown by 1.5x per retry.
    pub retry_backoff_ms: u64,
    /// Maximum number of sends in any trailing one-second window.
    pub queries_per_second: usize,
    /// Optional proxy for all requests.
    pub proxy_url: Option<String>,
    /// Exchange error prefixes that are retried instead of surfaced.
    pub retriable_api_errors: Vec<String>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_owned(),
            timeout_ms: None,
            connect_timeout_ms: None,
            read_timeout_ms: None,
            retry_timeout_ms: 60_000,
            retry_backoff_ms: 500,
            queries_per_second: 10,
            proxy_url: None,
            retriable_api_errors: vec![
                "EService:Unavailable".to_owned(),
                "EService:Busy".to_owned(),
            ],
        }
    }
}

impl ClientOptions {
    /// Checks option combinations that cannot be expressed by the field types.
    pub fn validate(&self) -> Result<()> {
        if self.timeout_ms.is_some()
            && (self.connect_timeout_ms.is_some() || self.read_timeout_ms.is_some())
        {
            return Err(KrakenError::Configuration(
                "specify either timeout_ms, or connect_timeout_ms and read_timeout_ms".to_owned(),
            ));
        }
        if self.queries_per_second == 0 {
            return Err(KrakenError::Configuration(
                "queries_per_second must be at least 1".to_owned(),
            ));
        }
        if self.base_url.trim().is_empty() {
            return Err(KrakenError::Configuration("base_url is empty".to_owned()));
        }
        Ok(())
    }

    pub(crate) fn retry_timeout(&self) -> Duration {
        Duration::from_millis(self.retry_timeout_ms)
    }

    pub(crate) fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    /// Builds the HTTP transport. Certificate verification stays enabled.
    pub(crate) fn build_http(&self) -> Result<reqwest::Client> {
        let mut builder = reqwest::Client::builder().user_agent(USER_AGENT);

        if let Some(timeout_ms) = self.timeout_ms {
            builder = builder.timeout(Duration::from_millis(timeout_ms));
        }
        if let Some(connect_ms) = self.connect_timeout_ms {
            builder = builder.connect_timeout(Duration::from_millis(connect_ms));
        }
        if let Some(read_ms) = self.read_timeout_ms {
            builder = builder.read_timeout(Duration::from_millis(read_ms));
        }
        if let Some(proxy_url) = &self.proxy_url {
            let proxy = reqwest::Proxy::all(proxy_url).map_err(|err| {
                KrakenError::Configuration(format!("invalid proxy url '{proxy_url}': {err}"))
            })?;
            builder = builder.proxy(proxy);
        }

        builder
            .build()
            .map_err(|err| KrakenError::Configuration(format!("cannot build http client: {err}")))
    }
}

#[cfg(test)]
mod tests {
    use crate::{ClientOptions, KrakenError};

    #[test]
    fn defaults_match_exchange_limits() {
        let opts = ClientOptions::default();
        assert_eq!(opts.base_url, "https://api.kraken.com");
        assert_eq!(opts.retry_timeout_ms, 60_000);
        assert_eq!(opts.queries_per_second, 10);
        assert!(opts.validate().is_ok());
    }

    #[test]
    fn combined_and_split_timeouts_conflict() {
        let opts = ClientOptions {
            timeout_ms: Some(1_000),
            read_timeout_ms: Some(500),
            ..ClientOptions::default()
        };
        assert!(matches!(
            opts.validate(),
            Err(KrakenError::Configuration(_))
        ));
    }

    #[test]
    fn zero_rate_ceiling_is_rejected() {
        let opts = ClientOptions {
            queries_per_second: 0,
            ..ClientOptions::default()
        };
        assert!(matches!(
            opts.validate(),
            Err(KrakenError::Configuration(_))
        ));
    }

    #[test]
    fn split_timeouts_build_a_client() {
        let opts = ClientOptions {
            connect_timeout_ms: Some(1_000),
            read_timeout_ms: Some(2_000),
            ..ClientOptions::default()
        };
        assert!(opts.validate().is_ok());
        assert!(opts.build_http().is_ok());
    }
}
