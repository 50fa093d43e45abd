//! `kraken-http` is an async client for the Kraken REST API.
//!
//! Every call goes through one request pipeline:
//! - a sliding-window rate limiter shared by all clones of a client,
//! - nonce assignment and `API-Sign` signing for private endpoints,
//! - classification of the response into success, retriable or fatal,
//! - jittered exponential backoff bounded by an overall retry budget.
//!
//! Typed helpers cover the public market data and private account/trading
//! endpoints; [`KrakenClient::query_public`] and
//! [`KrakenClient::query_private`] reach anything else.

mod classify;
mod client;
mod credentials;
mod error;
mod options;
mod params;
mod pipeline;
mod private;
mod public;
mod rate_limit;
mod retry;
mod signer;
mod types;
mod wire;

pub use client::KrakenClient;
pub use credentials::Credentials;
pub use error::KrakenError;
pub use options::{ClientOptions, DEFAULT_BASE_URL};
pub use params::Params;
pub use private::{ClosedOrdersRequest, LedgersRequest, OrderRequest, TradesHistoryRequest};
pub use types::{
    AssetPairInfo, CloseTime, LedgerType, OrderFlag, OrderSide, OrderType, PriceRequirement,
    ServerTime, TradeType, OHLC_INTERVALS,
};

pub type Result<T> = std::result::Result<T, KrakenError>;
