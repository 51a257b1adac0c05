//! Bid normalization pipeline.
//!
//! Three stages run in strict sequence, each taking ownership of the previous
//! stage's table and returning a new one:
//!
//! 1. [`extract`] splits rows marked `ERROR...` out of the bid feed and starts
//!    the error report.
//! 2. [`rates`] attaches the exchange rate in force at each bid's timestamp.
//! 3. [`reshape`] pivots the allow-listed markets into one row per
//!    (bid, country) and converts each bid into the reference currency.
//!
//! Error markers met in stage 3 join the same report, which reaches the
//! [`ErrorReportSink`] in one write once every stage has succeeded.

pub mod extract;
pub mod rates;
pub mod reshape;
pub mod types;

use tracing::info;

use crate::config::PipelineConfig;
use crate::error::Result;
use extract::{ErrorReportSink, extract_errors};
use rates::{RateSchedule, as_of_join};
use types::{BidRecord, ExchangeRateRecord, MotelRecord, NormalizedBid};

/// The three loaded feeds.
#[derive(Debug, Clone, Default)]
pub struct Tables {
    pub bids: Vec<BidRecord>,
    pub rates: Vec<ExchangeRateRecord>,
    pub motels: Vec<MotelRecord>,
}

/// Row counts of the loaded feeds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TableCounts {
    pub bids: usize,
    pub rates: usize,
    pub motels: usize,
}

#[derive(Debug, Default)]
pub struct PipelineOutput {
    pub counts: TableCounts,
    /// Bids removed by error extraction.
    pub rejected: usize,
    /// Clean bids no rate interval covers.
    pub dropped: usize,
    pub bids: Vec<NormalizedBid>,
}

/// Runs error extraction, rate assignment and reshaping over `tables`.
///
/// Error markers from extraction and from allow-listed cells are tallied into
/// one report keyed by bid day and written to `sink` once. A failing stage
/// leaves `sink` untouched. Motels are only counted.
#[tracing::instrument(skip_all)]
pub fn run(
    tables: Tables,
    config: &PipelineConfig,
    sink: &mut dyn ErrorReportSink,
) -> Result<PipelineOutput> {
    let Tables {
        bids,
        rates,
        motels,
    } = tables;

    let counts = TableCounts {
        bids: bids.len(),
        rates: rates.len(),
        motels: motels.len(),
    };
    info!(
        bids = counts.bids,
        rates = counts.rates,
        motels = counts.motels,
        "Tables loaded"
    );

    let extraction = extract_errors(bids, &config.marker_column)?;

    let schedule = RateSchedule::from_records(rates)?;
    let assignment = as_of_join(extraction.clean, &schedule)?;

    let conversion = reshape::reshape(assignment.rated, &config.countries)?;

    let mut report = extraction.report;
    report.merge(conversion.cell_errors);
    report.write_to(sink)?;

    info!(
        rejected = extraction.rejected.len(),
        dropped = assignment.dropped,
        normalized = conversion.bids.len(),
        report_rows = report.len(),
        "Pipeline complete"
    );

    Ok(PipelineOutput {
        counts,
        rejected: extraction.rejected.len(),
        dropped: assignment.dropped,
        bids: conversion.bids,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Stage;
    use crate::normalize::types::{BID_MARKETS, ErrorReportRow, market_index};

    fn bid(row: usize, bid_date: &str, cells: &[(&str, &str)]) -> BidRecord {
        let mut prices = vec![None; BID_MARKETS.len()];
        for (market, value) in cells {
            prices[market_index(market).unwrap()] = Some(value.to_string());
        }
        BidRecord {
            row,
            motel_id: row.to_string(),
            bid_date: bid_date.to_string(),
            prices,
        }
    }

    fn rate(row: usize, valid_from: &str, value: &str) -> ExchangeRateRecord {
        ExchangeRateRecord {
            row,
            valid_from: valid_from.to_string(),
            currency_name: "Euro".to_string(),
            currency_code: "EUR".to_string(),
            exchange_rate: value.to_string(),
        }
    }

    fn report_row(bid_date: &str, code: &str, count: usize) -> ErrorReportRow {
        ErrorReportRow {
            bid_date: bid_date.to_string(),
            error_code: code.to_string(),
            count,
        }
    }

    fn tables() -> Tables {
        Tables {
            bids: vec![
                bid(
                    1,
                    "08-15-01-2024",
                    &[("US", "100"), ("MX", "200"), ("CA", "ERROR_RATE"), ("UK", "50")],
                ),
                bid(2, "08-15-01-2024", &[("HU", "ERROR_NO_BIDS_FOR_HOTEL"), ("US", "1")]),
                bid(3, "23-14-01-2024", &[("US", "10")]),
            ],
            rates: vec![
                rate(1, "00-15-01-2024", "0.92"),
                rate(2, "00-16-01-2024", "0.95"),
            ],
            motels: vec![],
        }
    }

    #[test]
    fn test_run_chains_stages() {
        let mut report: Vec<ErrorReportRow> = Vec::new();
        let out = run(tables(), &PipelineConfig::default(), &mut report).unwrap();

        assert_eq!(
            out.counts,
            TableCounts {
                bids: 3,
                rates: 2,
                motels: 0
            }
        );
        assert_eq!(out.rejected, 1);
        assert_eq!(out.dropped, 1);

        let rows: Vec<_> = out
            .bids
            .iter()
            .map(|b| (b.country.as_str(), b.bid_converted.to_string()))
            .collect();
        assert_eq!(
            rows,
            vec![("US", "92.000".to_string()), ("MX", "184.000".to_string())]
        );

        assert_eq!(
            report,
            vec![
                report_row("15-01-2024", "ERROR_NO_BIDS_FOR_HOTEL", 1),
                report_row("15-01-2024", "ERROR_RATE", 1),
            ]
        );
    }

    #[test]
    fn test_same_code_in_marker_and_country_cells_is_one_row() {
        let tables = Tables {
            bids: vec![
                bid(1, "08-15-01-2024", &[("HU", "ERROR_NO_BIDS_FOR_HOTEL")]),
                bid(2, "8-15-01-2024", &[("CA", "ERROR_NO_BIDS_FOR_HOTEL"), ("US", "1")]),
            ],
            rates: vec![rate(1, "00-15-01-2024", "0.92")],
            motels: vec![],
        };

        let mut report: Vec<ErrorReportRow> = Vec::new();
        let out = run(tables, &PipelineConfig::default(), &mut report).unwrap();

        assert_eq!(out.rejected, 1);
        assert_eq!(out.bids.len(), 1);
        assert_eq!(
            report,
            vec![report_row("15-01-2024", "ERROR_NO_BIDS_FOR_HOTEL", 2)]
        );
    }

    struct CountingSink {
        writes: usize,
    }

    impl ErrorReportSink for CountingSink {
        fn write_report(&mut self, _rows: &[ErrorReportRow]) -> anyhow::Result<()> {
            self.writes += 1;
            Ok(())
        }
    }

    #[test]
    fn test_report_reaches_sink_once() {
        let mut sink = CountingSink { writes: 0 };
        run(tables(), &PipelineConfig::default(), &mut sink).unwrap();
        assert_eq!(sink.writes, 1);
    }

    #[test]
    fn test_failed_stage_writes_no_report() {
        let mut tables = tables();
        tables.rates.push(rate(3, "00-15-01-2024", "0.93"));

        let mut sink = CountingSink { writes: 0 };
        let err = run(tables, &PipelineConfig::default(), &mut sink).unwrap_err();
        assert_eq!(err.stage(), Stage::RateAssignment);
        assert_eq!(sink.writes, 0);
    }

    #[test]
    fn test_run_is_idempotent() {
        let config = PipelineConfig::default();
        let mut first_report: Vec<ErrorReportRow> = Vec::new();
        let mut second_report: Vec<ErrorReportRow> = Vec::new();

        let first = run(tables(), &config, &mut first_report).unwrap();
        let second = run(tables(), &config, &mut second_report).unwrap();

        assert_eq!(first.bids, second.bids);
        assert_eq!(first_report, second_report);
    }
}
