use serde_json::Value;

use crate::{wire::ResponseEnvelope, KrakenError};

/// Statuses worth another attempt; everything else non-200 is surfaced.
const RETRIABLE_STATUSES: [u16; 3] = [500, 503, 504];

/// Result of one network exchange, as seen by the retry loop.
#[derive(Debug)]
pub(crate) enum Outcome {
    /// `error` was empty; carries the `result` payload.
    Success(Value),
    /// Worth another attempt if the retry budget allows.
    RetriableFailure(String),
    /// The exchange reported errors that retrying will not fix.
    FatalApi { status: u16, messages: Vec<String> },
    /// Network failure, unexpected status or garbled body.
    FatalTransport(KrakenError),
}

/// Maps raw transport results onto [`Outcome`]s.
#[derive(Debug, Clone, Default)]
pub(crate) struct ResponseClassifier {
    retriable_api_errors: Vec<String>,
}

impl ResponseClassifier {
    /// `retriable_api_errors` are prefixes of exchange error strings that are
    /// retried instead of surfaced.
    pub(crate) fn new(retriable_api_errors: Vec<String>) -> Self {
        Self {
            retriable_api_errors,
        }
    }

    pub(crate) fn classify(
        &self,
        exchange: std::result::Result<(u16, String), reqwest::Error>,
    ) -> Outcome {
        match exchange {
            Ok((status, body)) => self.classify_response(status, body),
            Err(err) if err.is_timeout() => Outcome::FatalTransport(KrakenError::Timeout),
            Err(err) => Outcome::FatalTransport(KrakenError::Transport(err)),
        }
    }

    fn classify_response(&self, status: u16, body: String) -> Outcome {
        if RETRIABLE_STATUSES.contains(&status) {
            return Outcome::RetriableFailure(format!("http status {status}"));
        }
        if status != 200 {
            return Outcome::FatalTransport(KrakenError::Http { status, body });
        }

        let envelope = match serde_json::from_str::<ResponseEnvelope>(&body) {
            Ok(envelope) => envelope,
            Err(err) => {
                return Outcome::FatalTransport(KrakenError::Decode(format!(
                    "invalid response JSON: {err}; body: {body}"
                )))
            }
        };

        if !envelope.error.is_empty() {
            if self.all_retriable(&envelope.error) {
                return Outcome::RetriableFailure(envelope.error.join(", "));
            }
            return Outcome::FatalApi {
                status,
                messages: envelope.error,
            };
        }

        match envelope.result {
            Some(result) => Outcome::Success(result),
            None => Outcome::FatalTransport(KrakenError::Decode(format!(
                "response has no result; body: {body}"
            ))),
        }
    }

    fn all_retriable(&self, messages: &[String]) -> bool {
        messages.iter().all(|message| {
            self.retriable_api_errors
                .iter()
                .any(|prefix| message.starts_with(prefix.as_str()))
        })
    }
}
