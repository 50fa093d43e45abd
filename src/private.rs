//! Private account and trading endpoints. All calls are signed.

use serde_json::Value;

use crate::{
    params::comma_separated, CloseTime, KrakenClient, KrakenError, LedgerType, OrderFlag,
    OrderSide, OrderType, Params, PriceRequirement, Result, TradeType,
};

const MAX_QUERY_ORDERS: usize = 50;
const MAX_QUERY_IDS: usize = 20;

/// Filters for [`KrakenClient::closed_orders`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ClosedOrdersRequest {
    pub trades: bool,
    pub userref: Option<i64>,
    /// Unix timestamp or order txid, exclusive.
    pub start: Option<String>,
    /// Unix timestamp or order txid, inclusive.
    pub end: Option<String>,
    pub ofs: Option<u64>,
    pub closetime: Option<CloseTime>,
}

/// Filters for [`KrakenClient::trades_history`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TradesHistoryRequest {
    pub kind: Option<TradeType>,
    pub trades: bool,
    pub start: Option<String>,
    pub end: Option<String>,
    pub ofs: Option<u64>,
}

/// Filters for [`KrakenClient::ledgers`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LedgersRequest {
    pub assets: Vec<String>,
    pub kind: Option<LedgerType>,
    pub start: Option<String>,
    pub end: Option<String>,
    pub ofs: Option<u64>,
}

/// Parameters for [`KrakenClient::add_order`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrderRequest {
    pub pair: String,
    pub side: OrderSide,
    pub order_type: OrderType,
    pub volume: String,
    pub price: Option<String>,
    pub price2: Option<String>,
    pub leverage: Option<String>,
    pub flags: Vec<OrderFlag>,
    /// `+<n>` seconds from now, or `<n>` as a Unix timestamp.
    pub starttm: Option<String>,
    /// `+<n>` seconds from now, or `<n>` as a Unix timestamp.
    pub expiretm: Option<String>,
    pub userref: Option<i64>,
    /// Validate inputs on the exchange without submitting the order.
    pub validate: bool,
}

impl OrderRequest {
    /// Starts an order with only the required fields set.
    pub fn new(
        pair: impl Into<String>,
        side: OrderSide,
        order_type: OrderType,
        volume: impl ToString,
    ) -> Self {
        Self {
            pair: pair.into(),
            side,
            order_type,
            volume: volume.to_string(),
            price: None,
            price2: None,
            leverage: None,
            flags: Vec::new(),
            starttm: None,
            expiretm: None,
            userref: None,
            validate: false,
        }
    }

    /// Sets the limit or trigger price.
    pub fn price(mut self, price: impl ToString) -> Self {
        self.price = Some(price.to_string());
        self
    }

    /// Sets the secondary price used by two-price order types.
    pub fn price2(mut self, price2: impl ToString) -> Self {
        self.price2 = Some(price2.to_string());
        self
    }

    /// Adds an order flag.
    pub fn flag(mut self, flag: OrderFlag) -> Self {
        self.flags.push(flag);
        self
    }

    /// Asks the exchange to validate the order without placing it.
    pub fn validate_only(mut self) -> Self {
        self.validate = true;
        self
    }

    /// Checks the order and builds its parameters.
    pub fn to_params(&self) -> Result<Params> {
        let pair = self.pair.trim();
        if pair.is_empty() {
            return Err(KrakenError::Validation("pair is required".to_owned()));
        }
        if self.volume.trim().is_empty() {
            return Err(KrakenError::Validation("volume is required".to_owned()));
        }

        let (price, price2) = match self.order_type.price_requirement() {
            PriceRequirement::None => {
                if self.price.is_some() || self.price2.is_some() {
                    return Err(KrakenError::Validation(format!(
                        "{} orders do not take a price",
                        self.order_type
                    )));
                }
                (None, None)
            }
            PriceRequirement::Primary => {
                let price = self.price.as_deref().ok_or_else(|| {
                    KrakenError::Validation(format!(
                        "price is required for {} orders",
                        self.order_type
                    ))
                })?;
                (Some(price), None)
            }
            PriceRequirement::PrimaryAndSecondary => match (&self.price, &self.price2) {
                (Some(price), Some(price2)) => (Some(price.as_str()), Some(price2.as_str())),
                _ => {
                    return Err(KrakenError::Validation(format!(
                        "price and price2 are required for {} orders",
                        self.order_type
                    )))
                }
            },
        };

        if let Some(starttm) = &self.starttm {
            validate_schedule("starttm", starttm)?;
        }
        if let Some(expiretm) = &self.expiretm {
            validate_schedule("expiretm", expiretm)?;
        }

        Ok(Params::new()
            .push("pair", pair)
            .push("type", self.side)
            .push("ordertype", self.order_type)
            .push_opt("price", price)
            .push_opt("price2", price2)
            .push("volume", self.volume.trim())
            .push_opt("leverage", self.leverage.as_deref())
            .push_list("oflags", self.flags.iter().map(|flag| flag.as_str()))
            .push_opt("starttm", self.starttm.as_deref())
            .push_opt("expiretm", self.expiretm.as_deref())
            .push_opt("userref", self.userref)
            .push_flag("validate", self.validate))
    }
}

impl KrakenClient {
    /// Returns account balances per asset.
    pub async fn balance(&self) -> Result<Value> {
        self.query_private("/0/private/Balance", ()).await
    }

    /// Returns margin and equity figures, valued in `asset` (default `ZUSD`).
    pub async fn trade_balance(&self, asset: Option<&str>) -> Result<Value> {
        let params = Params::new()
            .push("aclass", "currency")
            .push("asset", asset.unwrap_or("ZUSD"));
        self.query_private("/0/private/TradeBalance", params).await
    }

    /// Returns open orders, optionally restricted to `userref`.
    pub async fn open_orders(&self, trades: bool, userref: Option<i64>) -> Result<Value> {
        let params = Params::new()
            .push_flag("trades", trades)
            .push_opt("userref", userref);
        self.query_private("/0/private/OpenOrders", params).await
    }

    /// Returns closed orders, 50 per page starting at `ofs`.
    pub async fn closed_orders(&self, request: &ClosedOrdersRequest) -> Result<Value> {
        let params = Params::new()
            .push_flag("trades", request.trades)
            .push_opt("userref", request.userref)
            .push_opt("start", request.start.as_deref())
            .push_opt("end", request.end.as_deref())
            .push_opt("ofs", request.ofs)
            .push_opt("closetime", request.closetime);
        self.query_private("/0/private/ClosedOrders", params).await
    }

    /// Returns details for up to 50 orders.
    pub async fn query_orders<S: AsRef<str>>(
        &self,
        txids: &[S],
        trades: bool,
        userref: Option<i64>,
    ) -> Result<Value> {
        let params = Params::new()
            .push("txid", id_list("txid", txids, MAX_QUERY_ORDERS)?)
            .push_flag("trades", trades)
            .push_opt("userref", userref);
        self.query_private("/0/private/QueryOrders", params).await
    }

    /// Returns trade history, 50 per page starting at `ofs`.
    pub async fn trades_history(&self, request: &TradesHistoryRequest) -> Result<Value> {
        let params = Params::new()
            .push_opt("type", request.kind)
            .push_flag("trades", request.trades)
            .push_opt("start", request.start.as_deref())
            .push_opt("end", request.end.as_deref())
            .push_opt("ofs", request.ofs);
        self.query_private("/0/private/TradesHistory", params).await
    }

    /// Returns details for up to 20 trades.
    pub async fn query_trades<S: AsRef<str>>(&self, txids: &[S], trades: bool) -> Result<Value> {
        let params = Params::new()
            .push("txid", id_list("txid", txids, MAX_QUERY_IDS)?)
            .push_flag("trades", trades);
        self.query_private("/0/private/QueryTrades", params).await
    }

    /// Returns open margin positions, with profit/loss when `docalcs` is set.
    pub async fn open_positions<S: AsRef<str>>(&self, txids: &[S], docalcs: bool) -> Result<Value> {
        let params = Params::new()
            .push_list("txid", txids)
            .push_flag("docalcs", docalcs);
        self.query_private("/0/private/OpenPositions", params).await
    }

    /// Returns ledger entries, filtered by asset, type and time range.
    pub async fn ledgers(&self, request: &LedgersRequest) -> Result<Value> {
        let assets = comma_separated(&request.assets);
        let params = Params::new()
            .push("aclass", "currency")
            .push("asset", if assets.is_empty() { "all".to_owned() } else { assets })
            .push("type", request.kind.unwrap_or(LedgerType::All))
            .push_opt("start", request.start.as_deref())
            .push_opt("end", request.end.as_deref())
            .push_opt("ofs", request.ofs);
        self.query_private("/0/private/Ledgers", params).await
    }

    /// Returns details for up to 20 ledger entries.
    pub async fn query_ledgers<S: AsRef<str>>(&self, ids: &[S]) -> Result<Value> {
        let params = Params::new().push("id", id_list("id", ids, MAX_QUERY_IDS)?);
        self.query_private("/0/private/QueryLedgers", params).await
    }

    /// Returns 30-day volume and, with `fee_info`, fee tiers for `pairs`.
    pub async fn trade_volume<S: AsRef<str>>(&self, pairs: &[S], fee_info: bool) -> Result<Value> {
        let params = Params::new()
            .push_list("pair", pairs)
            .push_flag("fee-info", fee_info);
        self.query_private("/0/private/TradeVolume", params).await
    }

    /// Places an order. Invalid combinations fail before anything is sent.
    pub async fn add_order(&self, order: &OrderRequest) -> Result<Value> {
        let params = order.to_params()?;
        self.query_private("/0/private/AddOrder", params).await
    }

    /// Cancels an open order by transaction id or user reference.
    pub async fn cancel_order(&self, txid: &str) -> Result<Value> {
        let txid = txid.trim();
        if txid.is_empty() {
            return Err(KrakenError::Validation(
                "transaction id is required".to_owned(),
            ));
        }
        let params = Params::new().push("txid", txid);
        self.query_private("/0/private/CancelOrder", params).await
    }
}

fn id_list<S: AsRef<str>>(name: &str, ids: &[S], max: usize) -> Result<String> {
    let joined = comma_separated(ids);
    if joined.is_empty() {
        return Err(KrakenError::Validation(format!("{name} is required")));
    }
    let count = joined.split(',').count();
    if count > max {
        return Err(KrakenError::Validation(format!(
            "at most {max} values allowed for {name}, got {count}"
        )));
    }
    Ok(joined)
}

fn validate_schedule(name: &str, value: &str) -> Result<()> {
    let digits = value.strip_prefix('+').unwrap_or(value);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(KrakenError::Validation(format!(
            "{name} must be +<n> (seconds from now) or <n> (unix timestamp), got '{value}'"
        )));
    }
    Ok(())
}
