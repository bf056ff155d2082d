//! OHLCV candles built from the trade ledger.
//!
//! Buckets are anchored at the unix epoch: a trade at `t` seconds falls into
//! the bucket starting at `floor(t / width) * width`.

use std::{collections::BTreeMap, fmt, str::FromStr, time::UNIX_EPOCH};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{errors::ValidationError, trade::Trade};

/// Supported candle widths. Anything else is rejected at parse time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Interval {
    #[serde(rename = "1m")]
    OneMinute,
    #[serde(rename = "5m")]
    FiveMinutes,
    #[serde(rename = "15m")]
    FifteenMinutes,
    #[serde(rename = "1h")]
    OneHour,
    #[serde(rename = "4h")]
    FourHours,
    #[serde(rename = "1d")]
    OneDay,
}

impl Interval {
    pub fn seconds(&self) -> u64 {
        match self {
            Interval::OneMinute => 60,
            Interval::FiveMinutes => 300,
            Interval::FifteenMinutes => 900,
            Interval::OneHour => 3_600,
            Interval::FourHours => 14_400,
            Interval::OneDay => 86_400,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Interval::OneMinute => "1m",
            Interval::FiveMinutes => "5m",
            Interval::FifteenMinutes => "15m",
            Interval::OneHour => "1h",
            Interval::FourHours => "4h",
            Interval::OneDay => "1d",
        }
    }

    pub fn all() -> &'static [Interval] {
        &[
            Interval::OneMinute,
            Interval::FiveMinutes,
            Interval::FifteenMinutes,
            Interval::OneHour,
            Interval::FourHours,
            Interval::OneDay,
        ]
    }

    /// Start of the bucket containing `secs` (seconds since the epoch).
    pub fn bucket_start(&self, secs: u64) -> u64 {
        let width = self.seconds();
        (secs / width) * width
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Interval {
    type Err = ValidationError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1m" => Ok(Interval::OneMinute),
            "5m" => Ok(Interval::FiveMinutes),
            "15m" => Ok(Interval::FifteenMinutes),
            "1h" => Ok(Interval::OneHour),
            "4h" => Ok(Interval::FourHours),
            "1d" | "1 day" => Ok(Interval::OneDay),
            _ => Err(ValidationError::UnsupportedInterval(s.to_string())),
        }
    }
}

/// A single OHLCV candle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candle {
    /// Bucket start, seconds since the unix epoch.
    pub time: u64,
    pub interval: Interval,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    /// Total traded quantity, widened so a busy bucket cannot overflow.
    pub volume: u128,
    pub trade_count: u64,
}

impl Candle {
    fn open_with(time: u64, interval: Interval, trade: &Trade) -> Self {
        Self {
            time,
            interval,
            open: trade.price,
            high: trade.price,
            low: trade.price,
            close: trade.price,
            volume: u128::from(trade.quantity),
            trade_count: 1,
        }
    }

    fn update(&mut self, trade: &Trade) {
        if trade.price > self.high {
            self.high = trade.price;
        }
        if trade.price < self.low {
            self.low = trade.price;
        }
        self.close = trade.price;
        self.volume += u128::from(trade.quantity);
        self.trade_count += 1;
    }
}

/// Buckets `trades` into candles of `interval` width.
///
/// Open and close come from the earliest and latest trade of each bucket, so
/// trades are ordered by timestamp first (ties keep their input order).
/// Candles are returned newest bucket first, at most `limit` of them.
pub fn build_candles(trades: &[Trade], interval: Interval, limit: usize) -> Vec<Candle> {
    let mut ordered: Vec<&Trade> = trades.iter().collect();
    ordered.sort_by_key(|t| t.timestamp);

    let mut buckets: BTreeMap<u64, Candle> = BTreeMap::new();
    for trade in ordered {
        let secs = trade
            .timestamp
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        let start = interval.bucket_start(secs);
        buckets
            .entry(start)
            .and_modify(|c| c.update(trade))
            .or_insert_with(|| Candle::open_with(start, interval, trade));
    }

    buckets.into_values().rev().take(limit).collect()
}
