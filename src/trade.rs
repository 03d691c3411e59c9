//! Proposed whole-share trades

use std::fmt;

use crate::types::Symbol;

/// Direction of a proposed trade.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "UPPERCASE"))]
pub enum Side {
    Buy,
    Sell,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Side::Buy => "BUY",
            Side::Sell => "SELL",
        };
        f.pad(s)
    }
}

/// A proposed trade. Never applied by this crate; `shares` is always > 0.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Trade {
    pub symbol: Symbol,
    pub side: Side,
    pub shares: u64,
}

impl Trade {
    /// Turn a signed share delta into a trade. Zero yields `None`.
    pub fn from_delta(symbol: Symbol, delta: i64) -> Option<Self> {
        let side = match delta.signum() {
            1 => Side::Buy,
            -1 => Side::Sell,
            _ => return None,
        };
        Some(Self {
            symbol,
            side,
            shares: delta.unsigned_abs(),
        })
    }

    /// Share change with sign: positive for buys, negative for sells.
    pub fn signed_shares(&self) -> i64 {
        let shares = i64::try_from(self.shares).unwrap_or(i64::MAX);
        match self.side {
            Side::Buy => shares,
            Side::Sell => -shares,
        }
    }

    /// Cash value of the trade at `price`.
    #[inline]
    pub fn notional(&self, price: f64) -> f64 {
        self.shares as f64 * price
    }
}

impl fmt::Display for Trade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:<4} {} shares of {}", self.side, self.shares, self.symbol)
    }
}
