//! Public market data endpoints.

use serde_json::Value;

use crate::{
    params::comma_separated, AssetPairInfo, KrakenClient, KrakenError, Params, Result, ServerTime,
    OHLC_INTERVALS,
};

impl KrakenClient {
    /// Returns the exchange's current time.
    pub async fn server_time(&self) -> Result<ServerTime> {
        let result = self.query_public("/0/public/Time", ()).await?;
        serde_json::from_value(result)
            .map_err(|err| KrakenError::Decode(format!("invalid server time: {err}")))
    }

    /// Returns asset information, optionally restricted to `assets`.
    ///
    /// `aclass` may only be `currency`, which is also the default.
    pub async fn assets<S: AsRef<str>>(&self, assets: &[S], aclass: Option<&str>) -> Result<Value> {
        if let Some(aclass) = aclass {
            if aclass != "currency" {
                return Err(KrakenError::Validation(format!(
                    "aclass must be 'currency', got '{aclass}'"
                )));
            }
        }
        let params = Params::new()
            .push("info", "info")
            .push_opt("aclass", aclass)
            .push_list("asset", assets);
        self.query_public("/0/public/Assets", params).await
    }

    /// Returns tradable asset pairs, optionally restricted to `pairs`.
    pub async fn asset_pairs<S: AsRef<str>>(
        &self,
        info: AssetPairInfo,
        pairs: &[S],
    ) -> Result<Value> {
        let params = Params::new()
            .push("info", info)
            .push_list("pair", pairs);
        self.query_public("/0/public/AssetPairs", params).await
    }

    /// Returns ticker information for one or more pairs.
    pub async fn ticker<S: AsRef<str>>(&self, pairs: &[S]) -> Result<Value> {
        let params = Params::new().push("pair", required_pairs(pairs)?);
        self.query_public("/0/public/Ticker", params).await
    }

    /// Returns OHLC candles. `interval` is in minutes and defaults to 1.
    pub async fn ohlc(&self, pair: &str, interval: Option<u32>, since: Option<&str>) -> Result<Value> {
        if let Some(interval) = interval {
            if !OHLC_INTERVALS.contains(&interval) {
                return Err(KrakenError::Validation(format!(
                    "interval {interval} is not one of {OHLC_INTERVALS:?}"
                )));
            }
        }
        let params = Params::new()
            .push("pair", required_pair(pair)?)
            .push_opt("interval", interval)
            .push_opt("since", since);
        self.query_public("/0/public/OHLC", params).await
    }

    /// Returns the order book, with at most `count` levels per side.
    pub async fn depth(&self, pair: &str, count: Option<u32>) -> Result<Value> {
        let params = Params::new()
            .push("pair", required_pair(pair)?)
            .push_opt("count", count);
        self.query_public("/0/public/Depth", params).await
    }

    /// Returns recent trades, exclusive of `since`.
    pub async fn trades(&self, pair: &str, since: Option<&str>) -> Result<Value> {
        let params = Params::new()
            .push("pair", required_pair(pair)?)
            .push_opt("since", since);
        self.query_public("/0/public/Trades", params).await
    }

    /// Returns recent spreads, inclusive of `since`.
    pub async fn spread(&self, pair: &str, since: Option<&str>) -> Result<Value> {
        let params = Params::new()
            .push("pair", required_pair(pair)?)
            .push_opt("since", since);
        self.query_public("/0/public/Spread", params).await
    }
}

fn required_pair(pair: &str) -> Result<&str> {
    let pair = pair.trim();
    if pair.is_empty() {
        return Err(KrakenError::Validation("pair is required".to_owned()));
    }
    Ok(pair)
}

fn required_pairs<S: AsRef<str>>(pairs: &[S]) -> Result<String> {
    let joined = comma_separated(pairs);
    if joined.is_empty() {
        return Err(KrakenError::Validation(
            "at least one pair is required".to_owned(),
        ));
    }
    Ok(joined)
}
