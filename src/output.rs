//! Output formatting and persistence for the normalized bids and error report.
//!
//! Supports pretty-printing, JSON serialization, and CSV writing.

use std::fs::File;
use std::io::Write;

use anyhow::{Context, Result};
use csv::{Writer, WriterBuilder};
use tracing::{debug, info};

use crate::normalize::extract::ErrorReportSink;
use crate::normalize::types::{ErrorReportRow, NormalizedBid};

/// Logs normalized bids using Rust's debug pretty-print format.
pub fn print_pretty(bids: &[NormalizedBid]) {
    debug!("{:#?}", bids);
}

/// Logs normalized bids as pretty-printed JSON.
pub fn print_json(bids: &[NormalizedBid]) -> Result<()> {
    info!("{}", serde_json::to_string_pretty(bids)?);
    Ok(())
}

/// Writes normalized bids as CSV with a header row.
pub fn write_normalized<W: Write>(writer: W, bids: &[NormalizedBid]) -> Result<()> {
    let mut writer = WriterBuilder::new().has_headers(true).from_writer(writer);
    for bid in bids {
        writer.serialize(bid)?;
    }
    writer.flush()?;
    Ok(())
}

/// Error report sink backed by a CSV file with `BidDate,Error,Counts` columns.
///
/// The file is truncated when the sink is created, so every run starts from
/// an empty report. Each report handed over during the run is appended.
pub struct CsvErrorSink {
    path: String,
    writer: Writer<File>,
    rows: usize,
}

impl CsvErrorSink {
    pub fn create(path: &str) -> Result<Self> {
        let file = File::create(path).with_context(|| format!("creating error report '{path}'"))?;
        debug!(path, "Error report opened");
        Ok(Self {
            path: path.to_string(),
            writer: WriterBuilder::new().has_headers(true).from_writer(file),
            rows: 0,
        })
    }

    /// Rows written so far.
    pub fn rows(&self) -> usize {
        self.rows
    }
}

impl ErrorReportSink for CsvErrorSink {
    fn write_report(&mut self, rows: &[ErrorReportRow]) -> Result<()> {
        for row in rows {
            self.writer
                .serialize(row)
                .with_context(|| format!("writing error report '{}'", self.path))?;
        }
        self.writer.flush()?;
        self.rows += rows.len();
        debug!(path = %self.path, rows = rows.len(), "Error report rows written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use std::env;
    use std::fs;
    use std::str::FromStr;

    fn temp_path(name: &str) -> String {
        format!("{}/{}", env::temp_dir().display(), name)
    }

    fn report_row(bid_date: &str, code: &str, count: usize) -> ErrorReportRow {
        ErrorReportRow {
            bid_date: bid_date.to_string(),
            error_code: code.to_string(),
            count,
        }
    }

    fn normalized() -> NormalizedBid {
        NormalizedBid {
            motel_id: "0000001".to_string(),
            bid_date: "2024-01-15-08:00".to_string(),
            country: "US".to_string(),
            bid_local: Decimal::from_str("100").unwrap(),
            exchange_rate: Decimal::from_str("0.92").unwrap(),
            bid_converted: Decimal::from_str("92.00").unwrap(),
        }
    }

    #[test]
    fn test_print_pretty_does_not_panic() {
        print_pretty(&[normalized()]);
    }

    #[test]
    fn test_print_json_does_not_panic() {
        print_json(&[normalized()]).unwrap();
    }

    #[test]
    fn test_write_normalized_csv() {
        let mut buf = Vec::new();
        write_normalized(&mut buf, &[normalized()]).unwrap();

        let content = String::from_utf8(buf).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(
            lines,
            vec![
                "MotelID,BidDate,Country,BidLocal,ExchangeRate,BidConverted",
                "0000001,2024-01-15-08:00,US,100,0.92,92.00",
            ]
        );
    }

    #[test]
    fn test_error_sink_writes_header_once() {
        let path = temp_path("motel_bids_test_errors_header.csv");
        let _ = fs::remove_file(&path);

        let mut sink = CsvErrorSink::create(&path).unwrap();
        sink.write_report(&[report_row("11-05-08-2015", "ERROR_NO_BIDS_FOR_HOTEL", 2)])
            .unwrap();
        sink.write_report(&[report_row("11-05-08-2015", "ERROR_RATE", 1)])
            .unwrap();
        assert_eq!(sink.rows(), 2);

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(
            lines,
            vec![
                "BidDate,Error,Counts",
                "11-05-08-2015,ERROR_NO_BIDS_FOR_HOTEL,2",
                "11-05-08-2015,ERROR_RATE,1",
            ]
        );

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_error_sink_truncates_previous_run() {
        let path = temp_path("motel_bids_test_errors_truncate.csv");
        fs::write(&path, "stale,content,9\n").unwrap();

        let mut sink = CsvErrorSink::create(&path).unwrap();
        sink.write_report(&[]).unwrap();
        drop(sink);

        let content = fs::read_to_string(&path).unwrap();
        assert!(!content.contains("stale"));

        fs::remove_file(&path).unwrap();
    }
}
