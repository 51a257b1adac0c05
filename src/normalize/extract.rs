//! Error extraction: splits malformed bids out of the feed and summarizes them.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use tracing::{debug, info};

use crate::error::{PipelineError, Result, Stage};
use crate::normalize::types::{BidRecord, ErrorReportRow, is_error_marker, market_index};
use crate::timestamp::{render_report_day, report_day};

/// Destination for error report rows.
///
/// The caller decides where the report lives; the pipeline only hands rows over.
pub trait ErrorReportSink {
    fn write_report(&mut self, rows: &[ErrorReportRow]) -> anyhow::Result<()>;
}

/// Collects report rows in memory.
impl ErrorReportSink for Vec<ErrorReportRow> {
    fn write_report(&mut self, rows: &[ErrorReportRow]) -> anyhow::Result<()> {
        self.extend_from_slice(rows);
        Ok(())
    }
}

/// Tally of error codes per bid day.
///
/// Every source of error markers records into the same tally, so each
/// `(day, code)` pair ends up on exactly one report row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorReport {
    counts: BTreeMap<(String, String), usize>,
}

impl ErrorReport {
    /// Counts `code` against the day of a raw `BidDate`.
    pub fn record(&mut self, bid_date: &str, code: &str) {
        self.bump(report_day(bid_date), code);
    }

    /// Counts `code` against the day of an already parsed bid time.
    pub fn record_at(&mut self, bid_time: &NaiveDateTime, code: &str) {
        self.bump(render_report_day(bid_time), code);
    }

    fn bump(&mut self, day: String, code: &str) {
        *self.counts.entry((day, code.to_string())).or_default() += 1;
    }

    /// Folds `other` into this tally.
    pub fn merge(&mut self, other: ErrorReport) {
        for (key, count) in other.counts {
            *self.counts.entry(key).or_default() += count;
        }
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Number of distinct `(day, code)` pairs.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    /// Report rows ordered by day text, then code.
    pub fn rows(&self) -> Vec<ErrorReportRow> {
        self.counts
            .iter()
            .map(|((bid_date, error_code), count)| ErrorReportRow {
                bid_date: bid_date.clone(),
                error_code: error_code.clone(),
                count: *count,
            })
            .collect()
    }

    /// Hands the whole report to `sink` in a single write.
    pub fn write_to(&self, sink: &mut dyn ErrorReportSink) -> Result<()> {
        sink.write_report(&self.rows())
            .map_err(|reason| PipelineError::Sink {
                stage: Stage::ErrorExtraction,
                reason,
            })
    }
}

/// Result of [`partition_errors`].
#[derive(Debug, Default)]
pub struct ErrorExtraction {
    pub clean: Vec<BidRecord>,
    pub rejected: Vec<BidRecord>,
    pub report: ErrorReport,
}

/// Splits `bids` on whether `marker_column` starts with `ERROR`.
///
/// Empty marker cells pass through as clean. Both outputs keep input order
/// and together contain every input row exactly once.
pub fn partition_errors(bids: Vec<BidRecord>, marker_column: &str) -> Result<ErrorExtraction> {
    let idx = market_index(marker_column).ok_or_else(|| PipelineError::MissingColumn {
        stage: Stage::ErrorExtraction,
        column: marker_column.to_string(),
    })?;

    let (rejected, clean): (Vec<_>, Vec<_>) = bids.into_iter().partition(|bid| {
        bid.prices
            .get(idx)
            .and_then(|cell| cell.as_deref())
            .is_some_and(is_error_marker)
    });

    let mut report = ErrorReport::default();
    for bid in &rejected {
        if let Some(code) = bid.prices.get(idx).and_then(|cell| cell.as_deref()) {
            report.record(&bid.bid_date, code);
        }
    }

    Ok(ErrorExtraction {
        clean,
        rejected,
        report,
    })
}

/// Runs [`partition_errors`] and logs the rejected rows.
///
/// The report is returned rather than written so later stages can add to it
/// before it reaches the sink.
#[tracing::instrument(skip_all, fields(marker_column = %marker_column, bids = bids.len()))]
pub fn extract_errors(bids: Vec<BidRecord>, marker_column: &str) -> Result<ErrorExtraction> {
    let extraction = partition_errors(bids, marker_column)?;

    for bid in &extraction.rejected {
        debug!(row = bid.row, motel_id = %bid.motel_id, "Rejected bid");
    }

    info!(
        clean = extraction.clean.len(),
        rejected = extraction.rejected.len(),
        report_rows = extraction.report.len(),
        "Error extraction complete"
    );

    Ok(extraction)
}
