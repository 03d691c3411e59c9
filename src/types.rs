//! Core types: Symbol, Timestamp, Holdings, CurrentPrices, WeightVector

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Timestamp of an observation, in seconds since the Unix epoch.
///
/// The cleaner only relies on ordering, so any monotone unit works.
pub type Timestamp = i64;

/// Share quantity held per symbol. Fractional quantities are allowed.
pub type Holdings = BTreeMap<Symbol, f64>;

/// Latest quote per symbol. A symbol missing here has an unknown price.
pub type CurrentPrices = BTreeMap<Symbol, f64>;

/// Ticker symbol stored inline (1–8 ASCII bytes), cheap to copy and hash.
///
/// Ordering is lexicographic on the ticker text, so maps keyed by `Symbol`
/// iterate in a stable, human-readable order.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Symbol {
    bytes: [u8; Symbol::MAX_LEN],
    len: u8,
}

impl Symbol {
    /// Longest ticker accepted, in bytes.
    pub const MAX_LEN: usize = 8;

    /// Build a symbol, returning `None` if `s` is empty, longer than
    /// [`Symbol::MAX_LEN`] bytes, or not printable ASCII.
    pub fn try_new(s: &str) -> Option<Self> {
        let raw = s.as_bytes();
        if raw.is_empty() || raw.len() > Self::MAX_LEN {
            return None;
        }
        if !raw.iter().all(|b| b.is_ascii_graphic()) {
            return None;
        }
        let mut bytes = [0u8; Self::MAX_LEN];
        bytes[..raw.len()].copy_from_slice(raw);
        Some(Self {
            bytes,
            len: raw.len() as u8,
        })
    }

    /// Build a symbol from a literal.
    ///
    /// # Panics
    ///
    /// Panics if `s` is not a valid ticker; use [`Symbol::try_new`] for
    /// untrusted input.
    pub fn new(s: &str) -> Self {
        match Self::try_new(s) {
            Some(sym) => sym,
            None => panic!("invalid symbol {s:?}"),
        }
    }

    /// Ticker text.
    pub fn as_str(&self) -> &str {
        std::str::from_utf8(&self.bytes[..self.len as usize]).unwrap_or_default()
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({:?})", self.as_str())
    }
}

impl FromStr for Symbol {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Symbol::try_new(s).ok_or_else(|| Error::InvalidSymbol(s.to_string()))
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Symbol {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for Symbol {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Symbol::try_new(&s)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid symbol {s:?}")))
    }
}

/// Target allocation: weight in [0, 1] per symbol, summing to 1.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct WeightVector(BTreeMap<Symbol, f64>);

impl WeightVector {
    /// Weight for `symbol`, if it is part of the allocation.
    pub fn get(&self, symbol: &Symbol) -> Option<f64> {
        self.0.get(symbol).copied()
    }

    /// Iterate `(symbol, weight)` in symbol order.
    pub fn iter(&self) -> impl Iterator<Item = (Symbol, f64)> + '_ {
        self.0.iter().map(|(s, w)| (*s, *w))
    }

    pub fn symbols(&self) -> impl Iterator<Item = Symbol> + '_ {
        self.0.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Sum of all weights.
    pub fn total(&self) -> f64 {
        self.0.values().sum()
    }

    pub fn as_map(&self) -> &BTreeMap<Symbol, f64> {
        &self.0
    }
}

impl From<BTreeMap<Symbol, f64>> for WeightVector {
    fn from(map: BTreeMap<Symbol, f64>) -> Self {
        Self(map)
    }
}

impl FromIterator<(Symbol, f64)> for WeightVector {
    fn from_iter<I: IntoIterator<Item = (Symbol, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
