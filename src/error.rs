/// Error type returned by this crate.
#[derive(Debug, thiserror::Error)]
pub enum KrakenError {
    /// Missing or invalid caller-supplied parameter. Raised before any
    /// network call and never retried.
    #[error("validation error: {0}")]
    Validation(String),
    /// Invalid credentials or client options.
    #[error("configuration error: {0}")]
    Configuration(String),
    /// Retry budget exhausted, or the network exchange itself timed out.
    #[error("request timed out")]
    Timeout,
    /// Network or request execution error from `reqwest`.
    #[error("transport error: {0}")]
    Transport(reqwest::Error),
    /// Non-success, non-retriable HTTP status code with raw response body.
    #[error("http error {status}: {body}")]
    Http { status: u16, body: String },
    /// Response body could not be decoded into the `{error, result}` envelope.
    #[error("decode error: {0}")]
    Decode(String),
    /// Request reached the exchange, which reported application-level errors.
    #[error("api error {status}: {}", messages.join(", "))]
    Api {
        /// HTTP status of the response carrying the errors.
        status: u16,
        /// Error strings from the `error` array, e.g. `EGeneral:Invalid arguments`.
        messages: Vec<String>,
    },
    /// The call was aborted through a cancellation token.
    #[error("request cancelled")]
    Cancelled,
}

impl KrakenError {
    /// Returns `true` for network-level failures: transport errors, unexpected
    /// HTTP statuses and undecodable responses.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Transport(_) | Self::Http { .. } | Self::Decode(_)
        )
    }

    /// Returns the HTTP status code carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } | Self::Api { status, .. } => Some(*status),
            Self::Transport(err) => err.status().map(|status| status.as_u16()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::KrakenError;

    #[test]
    fn api_error_display_joins_messages() {
        let err = KrakenError::Api {
            status: 200,
            messages: vec![
                "EGeneral:Invalid arguments".to_owned(),
                "EOrder:Insufficient funds".to_owned(),
            ],
        };
        assert_eq!(
            err.to_string(),
            "api error 200: EGeneral:Invalid arguments, EOrder:Insufficient funds"
        );
        assert_eq!(err.status(), Some(200));
        assert!(!err.is_transport());
    }

    #[test]
    fn http_and_decode_are_transport_failures() {
        let http = KrakenError::Http {
            status: 403,
            body: String::new(),
        };
        assert!(http.is_transport());
        assert_eq!(http.status(), Some(403));
        assert!(KrakenError::Decode("bad".to_owned()).is_transport());
        assert!(!KrakenError::Timeout.is_transport());
    }
}
