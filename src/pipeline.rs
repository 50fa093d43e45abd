use reqwest::header;
use serde_json::Value;
use tokio::time::sleep;

use crate::{
    classify::{Outcome, ResponseClassifier},
    rate_limit::RateLimiter,
    retry::{RetryScheduler, RetrySession},
    ClientOptions, Credentials, KrakenError, Params, Result,
};

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Whether a request carries `API-Key`/`API-Sign` headers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Auth {
    Public,
    Private,
}

/// Rate limiting, signing, sending, classification and retry for one client.
///
/// Shared by every clone of a client, so the rate window and the nonce
/// counter are global to it.
pub(crate) struct RequestPipeline {
    http: reqwest::Client,
    base_url: String,
    credentials: Option<Credentials>,
    limiter: RateLimiter,
    scheduler: RetryScheduler,
    classifier: ResponseClassifier,
}

impl RequestPipeline {
    pub(crate) fn new(options: &ClientOptions, credentials: Option<Credentials>) -> Result<Self> {
        options.validate()?;
        Ok(Self {
            http: options.build_http()?,
            base_url: options.base_url.trim_end_matches('/').to_owned(),
            credentials,
            limiter: RateLimiter::new(options.queries_per_second),
            scheduler: RetryScheduler::new(options.retry_timeout(), options.retry_backoff()),
            classifier: ResponseClassifier::new(options.retriable_api_errors.clone()),
        })
    }

    pub(crate) fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    /// Runs one logical call to completion and returns the `result` payload.
    pub(crate) async fn execute(&self, path: &str, params: &Params, auth: Auth) -> Result<Value> {
        let credentials = match auth {
            Auth::Private => Some(self.credentials.as_ref().ok_or_else(|| {
                KrakenError::Configuration(format!("{path} requires API credentials"))
            })?),
            Auth::Public => None,
        };
        let url = format!("{}{path}", self.base_url);
        let mut session = RetrySession::start();

        loop {
            let permit = self.limiter.admit().await;

            let request = match credentials {
                Some(credentials) => {
                    let signed = credentials.sign(path, params)?;
                    self.http
                        .post(&url)
                        .header("API-Key", credentials.api_key())
                        .header("API-Sign", signed.signature)
                        .body(signed.body)
                }
                None => self.http.post(&url).body(params.encode()?),
            };

            let exchange = match request
                .header(header::CONTENT_TYPE, FORM_CONTENT_TYPE)
                .send()
                .await
            {
                Ok(response) => {
                    let status = response.status().as_u16();
                    response.text().await.map(|body| (status, body))
                }
                Err(err) => Err(err),
            };
            drop(permit);

            match self.classifier.classify(exchange) {
                Outcome::Success(result) => return Ok(result),
                Outcome::FatalApi { status, messages } => {
                    #[cfg(feature = "tracing")]
                    tracing::debug!("{path} rejected by exchange: {}", messages.join(", "));
                    return Err(KrakenError::Api { status, messages });
                }
                Outcome::FatalTransport(err) => return Err(err),
                Outcome::RetriableFailure(_reason) => {
                    session.record_retry();
                    self.scheduler.should_retry(&session)?;

                    let delay = self.scheduler.delay(session.attempts());
                    #[cfg(feature = "tracing")]
                    tracing::debug!(
                        "retrying {path} after {} ms (attempt {}): {_reason}",
                        delay.as_millis(),
                        session.attempts()
                    );
                    sleep(delay).await;

                    self.scheduler.should_retry(&session)?;
                }
            }
        }
    }
}
