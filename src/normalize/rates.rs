//! Exchange-rate schedule and the point-in-time ("as of") join of bids onto it.

use std::str::FromStr;

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use crate::error::{PipelineError, Result, Stage};
use crate::normalize::types::{BidRecord, ExchangeRateRecord, RateInterval, RatedBid};
use crate::timestamp::{parse_input, render_input};

/// Rate intervals sorted by start, contiguous and non-overlapping.
#[derive(Debug, Clone, Default)]
pub struct RateSchedule {
    intervals: Vec<RateInterval>,
}

impl RateSchedule {
    /// Builds the schedule from raw rate rows.
    ///
    /// Each interval ends where the next one starts; the latest never ends.
    /// Two rows sharing a start would overlap and abort the run.
    pub fn from_records(records: Vec<ExchangeRateRecord>) -> Result<Self> {
        let mut intervals = records
            .into_iter()
            .map(parse_record)
            .collect::<Result<Vec<_>>>()?;

        intervals.sort_by_key(|interval| interval.valid_from);

        for pair in intervals.windows(2) {
            if pair[0].valid_from == pair[1].valid_from {
                return Err(PipelineError::OverlappingRates {
                    stage: Stage::RateAssignment,
                    first_row: pair[0].row.min(pair[1].row),
                    second_row: pair[0].row.max(pair[1].row),
                    valid_from: render_input(&pair[1].valid_from),
                });
            }
        }

        let starts: Vec<NaiveDateTime> = intervals.iter().map(|i| i.valid_from).collect();
        for (interval, next_start) in intervals.iter_mut().zip(starts.into_iter().skip(1)) {
            interval.valid_to = Some(next_start);
        }

        Ok(Self { intervals })
    }

    pub fn intervals(&self) -> &[RateInterval] {
        &self.intervals
    }

    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    /// Intervals containing `t`.
    ///
    /// Pairs `t` with every interval and filters on `valid_from <= t < valid_to`,
    /// so a lookup costs O(intervals). The intervals are sorted, which leaves
    /// room for a binary search with the same result.
    pub fn matching(&self, t: NaiveDateTime) -> impl Iterator<Item = &RateInterval> {
        self.intervals.iter().filter(move |interval| interval.contains(t))
    }
}

fn parse_record(record: ExchangeRateRecord) -> Result<RateInterval> {
    let valid_from =
        parse_input(&record.valid_from).map_err(|source| PipelineError::Timestamp {
            stage: Stage::RateAssignment,
            row: record.row,
            value: record.valid_from.clone(),
            source,
        })?;

    let exchange_rate = Decimal::from_str(record.exchange_rate.trim())
        .ok()
        .filter(|rate| rate.is_sign_positive() && !rate.is_zero())
        .ok_or_else(|| PipelineError::InvalidValue {
            stage: Stage::RateAssignment,
            row: record.row,
            field: "ExchangeRate".to_string(),
            value: record.exchange_rate.clone(),
        })?;

    Ok(RateInterval {
        row: record.row,
        valid_from,
        valid_to: None,
        currency_name: record.currency_name,
        currency_code: record.currency_code,
        exchange_rate,
    })
}

/// Result of [`as_of_join`].
#[derive(Debug, Default)]
pub struct RateAssignment {
    pub rated: Vec<RatedBid>,
    /// Bids no interval covers, e.g. dated before the first `ValidFrom`.
    pub dropped: usize,
}

/// Attaches to each bid the rate in force at its `BidDate`.
///
/// Every bid is paired with every interval of the schedule and only pairs
/// with `valid_from <= bid_date < valid_to` survive, for a total cost of
/// O(bids x intervals). Bids with no surviving pair are dropped without
/// error. A bid matching more than one interval aborts the run.
#[tracing::instrument(skip_all, fields(bids = bids.len(), intervals = schedule.len()))]
pub fn as_of_join(bids: Vec<BidRecord>, schedule: &RateSchedule) -> Result<RateAssignment> {
    if schedule.is_empty() {
        warn!("Rate schedule is empty, every bid will be dropped");
    }

    let mut assignment = RateAssignment::default();

    for bid in bids {
        let bid_time = parse_input(&bid.bid_date).map_err(|source| PipelineError::Timestamp {
            stage: Stage::RateAssignment,
            row: bid.row,
            value: bid.bid_date.clone(),
            source,
        })?;

        let matches: Vec<&RateInterval> = schedule.matching(bid_time).collect();
        match matches.as_slice() {
            [interval] => assignment.rated.push(RatedBid {
                row: bid.row,
                motel_id: bid.motel_id,
                bid_time,
                exchange_rate: interval.exchange_rate,
                prices: bid.prices,
            }),
            [] => {
                debug!(row = bid.row, bid_date = %bid.bid_date, "No rate interval covers bid");
                assignment.dropped += 1;
            }
            _ => {
                return Err(PipelineError::AmbiguousRate {
                    stage: Stage::RateAssignment,
                    row: bid.row,
                    matches: matches.len(),
                });
            }
        }
    }

    info!(
        rated = assignment.rated.len(),
        dropped = assignment.dropped,
        "Rate assignment complete"
    );

    Ok(assignment)
}
