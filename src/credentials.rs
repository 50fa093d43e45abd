use std::{fmt, sync::Arc};

use base64::{engine::general_purpose::STANDARD, Engine};

use crate::{
    signer::{self, NonceGenerator, SignedRequest},
    KrakenError, Params, Result,
};

/// API key plus decoded private key.
///
/// Clones share one nonce counter, so every request signed through any clone
/// carries a strictly larger nonce than the one before it.
#[derive(Clone)]
pub struct Credentials {
    api_key: String,
    secret: Arc<[u8]>,
    nonces: Arc<NonceGenerator>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &self.api_key)
            .field("secret", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    /// Creates credentials from an API key and the base64 private key shown
    /// by the exchange.
    ///
    /// Fails with [`KrakenError::Configuration`] when the key is empty or the
    /// secret is not valid base64.
    pub fn new(api_key: impl Into<String>, private_key: impl AsRef<str>) -> Result<Self> {
        let api_key = api_key.into().trim().to_owned();
        if api_key.is_empty() {
            return Err(KrakenError::Configuration(
                "api key must not be empty".to_owned(),
            ));
        }
        let secret = STANDARD
            .decode(private_key.as_ref().trim())
            .map_err(|err| KrakenError::Configuration(format!("private key is not base64: {err}")))?;

        Ok(Self {
            api_key,
            secret: secret.into(),
            nonces: Arc::new(NonceGenerator::new()),
        })
    }

    /// Reads `KRAKEN_API_KEY` and `KRAKEN_API_SECRET`.
    pub fn from_env() -> Result<Self> {
        let key = read_env("KRAKEN_API_KEY")?;
        let secret = read_env("KRAKEN_API_SECRET")?;
        Self::new(key, secret)
    }

    /// Returns the public API key.
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Assigns the next nonce and signs `params` for `path`.
    pub(crate) fn sign(&self, path: &str, params: &Params) -> Result<SignedRequest> {
        let nonce = self.nonces.next();
        signer::sign(&self.secret, path, params, nonce)
    }
}

fn read_env(name: &str) -> Result<String> {
    let value = std::env::var(name)
        .map_err(|_| KrakenError::Configuration(format!("missing {name} environment variable")))?;
    if value.trim().is_empty() {
        return Err(KrakenError::Configuration(format!(
            "{name} is set but empty"
        )));
    }
    Ok(value)
}
