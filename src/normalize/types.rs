//! Row types flowing through the normalization pipeline.

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Market columns of the bid feed, in feed order after `MotelID` and `BidDate`.
pub const BID_MARKETS: [&str; 16] = [
    "HU", "UK", "NL", "US", "MX", "AU", "CA", "CN", "KR", "BE", "I", "JP", "IN", "HN", "GY", "DE",
];

/// Prefix marking a bid cell as a data-quality error.
pub const ERROR_PREFIX: &str = "ERROR";

/// Returns the position of `market` among [`BID_MARKETS`].
pub fn market_index(market: &str) -> Option<usize> {
    BID_MARKETS.iter().position(|m| *m == market)
}

/// Returns `true` if a raw cell carries an error marker.
pub fn is_error_marker(cell: &str) -> bool {
    cell.starts_with(ERROR_PREFIX)
}

/// A raw row of the bid feed.
#[derive(Debug, Clone, PartialEq)]
pub struct BidRecord {
    /// 1-based row in the source feed.
    pub row: usize,
    pub motel_id: String,
    pub bid_date: String,
    /// One cell per entry of [`BID_MARKETS`]; `None` when the cell is empty.
    pub prices: Vec<Option<String>>,
}

impl BidRecord {
    /// Returns the raw cell for `market`, if the market exists and the cell is set.
    pub fn price(&self, market: &str) -> Option<&str> {
        let idx = market_index(market)?;
        self.prices.get(idx)?.as_deref()
    }
}

/// A raw row of the exchange-rate feed.
#[derive(Debug, Clone, PartialEq)]
pub struct ExchangeRateRecord {
    pub row: usize,
    pub valid_from: String,
    pub currency_name: String,
    pub currency_code: String,
    pub exchange_rate: String,
}

/// A row of the motel reference feed. Only counted by the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MotelRecord {
    #[serde(rename = "MotelID")]
    pub motel_id: String,
    #[serde(rename = "MotelName")]
    pub motel_name: String,
    #[serde(rename = "Country")]
    pub country: String,
    #[serde(rename = "URL")]
    pub url: String,
    #[serde(rename = "Comment")]
    pub comment: String,
}

/// A validity interval of the rate schedule, `[valid_from, valid_to)`.
#[derive(Debug, Clone, PartialEq)]
pub struct RateInterval {
    pub row: usize,
    pub valid_from: NaiveDateTime,
    /// `None` for the latest interval, which never ends.
    pub valid_to: Option<NaiveDateTime>,
    pub currency_name: String,
    pub currency_code: String,
    pub exchange_rate: Decimal,
}

impl RateInterval {
    /// Half-open membership test.
    pub fn contains(&self, t: NaiveDateTime) -> bool {
        self.valid_from <= t && self.valid_to.is_none_or(|end| t < end)
    }
}

/// A clean bid annotated with the exchange rate in force at its timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct RatedBid {
    pub row: usize,
    pub motel_id: String,
    pub bid_time: NaiveDateTime,
    pub exchange_rate: Decimal,
    pub prices: Vec<Option<String>>,
}

/// One (bid, country) pair after the wide-to-long reshape.
#[derive(Debug, Clone, PartialEq)]
pub struct LongBid {
    pub row: usize,
    pub motel_id: String,
    pub bid_time: NaiveDateTime,
    pub exchange_rate: Decimal,
    pub country: String,
    pub bid_local: Option<String>,
}

/// Final pipeline output row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedBid {
    #[serde(rename = "MotelID")]
    pub motel_id: String,
    #[serde(rename = "BidDate")]
    pub bid_date: String,
    #[serde(rename = "Country")]
    pub country: String,
    #[serde(rename = "BidLocal")]
    pub bid_local: Decimal,
    #[serde(rename = "ExchangeRate")]
    pub exchange_rate: Decimal,
    #[serde(rename = "BidConverted")]
    pub bid_converted: Decimal,
}

/// Count of one error code on one bid date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorReportRow {
    #[serde(rename = "BidDate")]
    pub bid_date: String,
    #[serde(rename = "Error")]
    pub error_code: String,
    #[serde(rename = "Counts")]
    pub count: usize,
}
