use std::{fmt, str::FromStr};

use serde::Deserialize;

use crate::KrakenError;

/// Exchange server time.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct ServerTime {
    /// Seconds since the Unix epoch.
    pub unixtime: i64,
    /// The same instant formatted per RFC 1123.
    pub rfc1123: String,
}

/// Declares a string-backed enum with a static table of its wire names.
macro_rules! wire_enum {
    ($(#[$meta:meta])* $name:ident, $what:literal { $($variant:ident => $wire:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            /// Every accepted value, in wire order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Name sent to the exchange.
            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $wire),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = KrakenError;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                Self::ALL
                    .iter()
                    .copied()
                    .find(|candidate| candidate.as_str() == value)
                    .ok_or_else(|| {
                        let allowed: Vec<_> = Self::ALL.iter().map(|v| v.as_str()).collect();
                        KrakenError::Validation(format!(
                            "{} '{value}' is not one of: {}",
                            $what,
                            allowed.join(", ")
                        ))
                    })
            }
        }
    };
}

wire_enum!(
    /// Direction of an order.
    OrderSide, "order side" {
        Buy => "buy",
        Sell => "sell",
    }
);

wire_enum!(
    /// Order types accepted by `AddOrder`.
    OrderType, "order type" {
        Market => "market",
        Limit => "limit",
        StopLoss => "stop-loss",
        TakeProfit => "take-profit",
        TrailingStop => "trailing-stop",
        StopLossProfit => "stop-loss-profit",
        StopLossProfitLimit => "stop-loss-profit-limit",
        StopLossLimit => "stop-loss-limit",
        TakeProfitLimit => "take-profit-limit",
        TrailingStopLimit => "trailing-stop-limit",
        StopLossAndLimit => "stop-loss-and-limit",
    }
);

wire_enum!(
    /// Order flags, sent comma-separated as `oflags`.
    OrderFlag, "order flag" {
        VolumeInQuote => "viqc",
        FeeInBase => "fcib",
        FeeInQuote => "fciq",
        NoMarketPriceProtection => "nompp",
        PostOnly => "post",
    }
);

wire_enum!(
    /// Subset of asset pair information to return.
    AssetPairInfo, "asset pair info" {
        Info => "info",
        Leverage => "leverage",
        Fees => "fees",
        Margin => "margin",
    }
);

wire_enum!(
    /// Which timestamp `start`/`end` filter closed orders by.
    CloseTime, "close time" {
        Open => "open",
        Close => "close",
        Both => "both",
    }
);

wire_enum!(
    /// Trade history filter.
    TradeType, "trade type" {
        All => "all",
        AnyPosition => "any position",
        ClosedPosition => "closed position",
        ClosingPosition => "closing position",
        NoPosition => "no position",
    }
);

wire_enum!(
    /// Ledger entry filter.
    LedgerType, "ledger type" {
        All => "all",
        Deposit => "deposit",
        Withdrawal => "withdrawal",
        Trade => "trade",
        Margin => "margin",
    }
);

/// How many prices an order type needs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PriceRequirement {
    /// Market orders; a price is rejected.
    None,
    /// `price` is required.
    Primary,
    /// `price` and `price2` are both required.
    PrimaryAndSecondary,
}

impl OrderType {
    /// Which of `price` and `price2` this order type needs.
    pub fn price_requirement(self) -> PriceRequirement {
        match self {
            Self::Market => PriceRequirement::None,
            Self::Limit | Self::StopLoss | Self::TakeProfit | Self::TrailingStop => {
                PriceRequirement::Primary
            }
            Self::StopLossProfit
            | Self::StopLossProfitLimit
            | Self::StopLossLimit
            | Self::TakeProfitLimit
            | Self::TrailingStopLimit
            | Self::StopLossAndLimit => PriceRequirement::PrimaryAndSecondary,
        }
    }
}

/// OHLC candle widths in minutes.
pub const OHLC_INTERVALS: [u32; 9] = [1, 5, 15, 30, 60, 240, 1440, 10080, 21600];
