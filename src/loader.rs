//! Headerless CSV readers for the bid, exchange-rate and motel feeds.

use std::fs::File;
use std::io::Read;

use anyhow::{Context, Result, bail};
use csv::{ReaderBuilder, StringRecord, Trim};
use tracing::debug;

use crate::normalize::types::{BID_MARKETS, BidRecord, ExchangeRateRecord, MotelRecord};

/// Fields per bid row: `MotelID`, `BidDate`, then one per market.
pub const BID_FIELDS: usize = 2 + BID_MARKETS.len();

/// Fields per rate row: `ValidFrom`, `CurrencyName`, `CurrencyCode`, `ExchangeRate`.
pub const RATE_FIELDS: usize = 4;

fn reader<R: Read>(rdr: R) -> csv::Reader<R> {
    ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(rdr)
}

/// Row number of a record, falling back to its index when the reader has no position.
fn row_of(record: &StringRecord, index: usize) -> usize {
    record
        .position()
        .map(|p| p.line() as usize)
        .unwrap_or(index + 1)
}

fn check_width(feed: &str, record: &StringRecord, row: usize, expected: usize) -> Result<()> {
    if record.len() != expected {
        bail!(
            "{feed} feed row {row}: expected {expected} fields, found {}",
            record.len()
        );
    }
    Ok(())
}

pub fn read_bids<R: Read>(rdr: R) -> Result<Vec<BidRecord>> {
    let mut bids = Vec::new();

    for (index, result) in reader(rdr).records().enumerate() {
        let record = result.with_context(|| format!("bids feed record {}", index + 1))?;
        let row = row_of(&record, index);
        check_width("bids", &record, row, BID_FIELDS)?;

        let prices = record
            .iter()
            .skip(2)
            .map(|cell| (!cell.is_empty()).then(|| cell.to_string()))
            .collect();

        bids.push(BidRecord {
            row,
            motel_id: record[0].to_string(),
            bid_date: record[1].to_string(),
            prices,
        });
    }

    Ok(bids)
}

pub fn read_rates<R: Read>(rdr: R) -> Result<Vec<ExchangeRateRecord>> {
    let mut rates = Vec::new();

    for (index, result) in reader(rdr).records().enumerate() {
        let record = result.with_context(|| format!("exchange rate feed record {}", index + 1))?;
        let row = row_of(&record, index);
        check_width("exchange rate", &record, row, RATE_FIELDS)?;

        rates.push(ExchangeRateRecord {
            row,
            valid_from: record[0].to_string(),
            currency_name: record[1].to_string(),
            currency_code: record[2].to_string(),
            exchange_rate: record[3].to_string(),
        });
    }

    Ok(rates)
}

pub fn read_motels<R: Read>(rdr: R) -> Result<Vec<MotelRecord>> {
    let mut motels = Vec::new();

    for (index, result) in reader(rdr).deserialize::<MotelRecord>().enumerate() {
        let motel = result.with_context(|| format!("motels feed record {}", index + 1))?;
        motels.push(motel);
    }

    Ok(motels)
}

/// Opens `path` and reads it with `read`, tagging errors with the path.
fn load<T>(path: &str, read: impl FnOnce(File) -> Result<Vec<T>>) -> Result<Vec<T>> {
    let file = File::open(path).with_context(|| format!("opening '{path}'"))?;
    let rows = read(file).with_context(|| format!("loading '{path}'"))?;
    debug!(path, rows = rows.len(), "Loaded table");
    Ok(rows)
}

pub fn load_bids(path: &str) -> Result<Vec<BidRecord>> {
    load(path, read_bids)
}

pub fn load_rates(path: &str) -> Result<Vec<ExchangeRateRecord>> {
    load(path, read_rates)
}

pub fn load_motels(path: &str) -> Result<Vec<MotelRecord>> {
    load(path, read_motels)
}
