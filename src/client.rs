use std::{fmt, sync::Arc};

use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::{
    pipeline::{Auth, RequestPipeline},
    ClientOptions, Credentials, KrakenError, Params, Result,
};

/// Client for the Kraken REST API.
///
/// Clones share the rate window, the nonce counter and the cancellation
/// token, so one client can be handed to many concurrent tasks.
#[derive(Clone)]
pub struct KrakenClient {
    pipeline: Arc<RequestPipeline>,
    options: ClientOptions,
    cancellation: CancellationToken,
}

impl fmt::Debug for KrakenClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KrakenClient")
            .field("credentials", &self.pipeline.credentials())
            .field("options", &self.options)
            .finish()
    }
}

impl KrakenClient {
    /// Creates an authenticated client from an API key and base64 private key.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use kraken_http::KrakenClient;
    ///
    /// let kraken = KrakenClient::new("api-key", "c2VjcmV0").expect("valid credentials");
    /// ```
    pub fn new(api_key: impl Into<String>, private_key: impl AsRef<str>) -> Result<Self> {
        Self::with_credentials(Credentials::new(api_key, private_key)?)
    }

    /// Creates an authenticated client from existing credentials.
    pub fn with_credentials(credentials: Credentials) -> Result<Self> {
        Self::build(Some(credentials), ClientOptions::default(), CancellationToken::new())
    }

    /// Creates a client limited to public endpoints. Private calls fail with
    /// [`KrakenError::Configuration`].
    pub fn public() -> Result<Self> {
        Self::build(None, ClientOptions::default(), CancellationToken::new())
    }

    /// Creates an authenticated client from environment variables.
    ///
    /// Reads:
    /// - `KRAKEN_API_KEY` — API key
    /// - `KRAKEN_API_SECRET` — base64 private key
    pub fn from_env() -> Result<Self> {
        Self::with_credentials(Credentials::from_env()?)
    }

    /// Applies client options such as timeouts, retry budget and rate ceiling.
    ///
    /// Rebuilds the transport and starts a fresh rate window; the credentials,
    /// their nonce counter and the cancellation token are kept.
    pub fn with_options(self, opts: ClientOptions) -> Result<Self> {
        let credentials = self.pipeline.credentials().cloned();
        Self::build(credentials, opts, self.cancellation)
    }

    fn build(
        credentials: Option<Credentials>,
        options: ClientOptions,
        cancellation: CancellationToken,
    ) -> Result<Self> {
        Ok(Self {
            pipeline: Arc::new(RequestPipeline::new(&options, credentials)?),
            options,
            cancellation,
        })
    }

    /// Returns the options the client was built with.
    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// Aborts every in-flight and future call made through this client or
    /// its clones.
    pub fn cancel_all_requests(&self) {
        self.cancellation.cancel();
    }

    /// Returns the client-wide token; cancelling it aborts every call.
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// Sends a signed request to a private endpoint and returns its `result`.
    ///
    /// `path` is the endpoint path, e.g. `/0/private/Balance`. The nonce is
    /// added by the client.
    pub async fn query_private<P: Into<Params>>(&self, path: &str, params: P) -> Result<Value> {
        self.run(path, params.into(), Auth::Private, None).await
    }

    /// Like [`KrakenClient::query_private`], aborting with
    /// [`KrakenError::Cancelled`] when `cancel` fires.
    pub async fn query_private_with_cancel<P: Into<Params>>(
        &self,
        path: &str,
        params: P,
        cancel: &CancellationToken,
    ) -> Result<Value> {
        self.run(path, params.into(), Auth::Private, Some(cancel))
            .await
    }

    /// Sends an unsigned request to a public endpoint and returns its `result`.
    pub async fn query_public<P: Into<Params>>(&self, path: &str, params: P) -> Result<Value> {
        self.run(path, params.into(), Auth::Public, None).await
    }

    /// Like [`KrakenClient::query_public`], aborting with
    /// [`KrakenError::Cancelled`] when `cancel` fires.
    pub async fn query_public_with_cancel<P: Into<Params>>(
        &self,
        path: &str,
        params: P,
        cancel: &CancellationToken,
    ) -> Result<Value> {
        self.run(path, params.into(), Auth::Public, Some(cancel))
            .await
    }

    async fn run(
        &self,
        path: &str,
        params: Params,
        auth: Auth,
        cancel: Option<&CancellationToken>,
    ) -> Result<Value> {
        let call = match cancel {
            Some(token) => token.clone(),
            None => CancellationToken::new(),
        };

        tokio::select! {
            biased;
            _ = self.cancellation.cancelled() => Err(KrakenError::Cancelled),
            _ = call.cancelled() => Err(KrakenError::Cancelled),
            result = self.pipeline.execute(path, &params, auth) => result,
        }
    }
}
