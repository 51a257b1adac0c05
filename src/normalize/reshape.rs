//! Wide-to-long reshape of rated bids and conversion into the reference currency.

use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use tracing::info;

use crate::error::{PipelineError, Result, Stage};
use crate::normalize::extract::ErrorReport;
use crate::normalize::types::{LongBid, NormalizedBid, RatedBid, is_error_marker, market_index};
use crate::timestamp::render_canonical;

/// Decimal places kept in `bid_converted`.
pub const CONVERTED_SCALE: u32 = 3;

/// Result of [`convert`].
#[derive(Debug, Default)]
pub struct Conversion {
    pub bids: Vec<NormalizedBid>,
    /// Allow-listed cells that carried an `ERROR` marker.
    pub cell_errors: ErrorReport,
    /// Allow-listed cells with no bid.
    pub missing: usize,
}

/// Emits one [`LongBid`] per (bid, country), whether or not the cell holds a bid.
///
/// Markets outside `countries` are left behind.
pub fn melt(rated: Vec<RatedBid>, countries: &[String]) -> Result<Vec<LongBid>> {
    let columns = countries
        .iter()
        .map(|country| {
            market_index(country)
                .map(|idx| (country.as_str(), idx))
                .ok_or_else(|| PipelineError::MissingColumn {
                    stage: Stage::Reshape,
                    column: country.clone(),
                })
        })
        .collect::<Result<Vec<_>>>()?;

    let mut long = Vec::with_capacity(rated.len() * columns.len());
    for bid in rated {
        for &(country, idx) in &columns {
            long.push(LongBid {
                row: bid.row,
                motel_id: bid.motel_id.clone(),
                bid_time: bid.bid_time,
                exchange_rate: bid.exchange_rate,
                country: country.to_string(),
                bid_local: bid.prices.get(idx).cloned().flatten(),
            });
        }
    }

    Ok(long)
}

/// Drops rows without a bid, then converts the rest at their exchange rate.
///
/// `bid_converted` is `bid_local * exchange_rate` rounded half-to-even to
/// [`CONVERTED_SCALE`] places and always carries that scale. Cells carrying an error marker are counted in
/// `cell_errors` instead of being converted. Any other non-decimal or negative
/// cell aborts the run.
pub fn convert(long: Vec<LongBid>) -> Result<Conversion> {
    let mut conversion = Conversion::default();

    for bid in long {
        let Some(raw) = bid.bid_local else {
            conversion.missing += 1;
            continue;
        };

        if is_error_marker(&raw) {
            conversion.cell_errors.record_at(&bid.bid_time, &raw);
            continue;
        }

        let bid_local = Decimal::from_str(raw.trim())
            .ok()
            .filter(|value| !value.is_sign_negative())
            .ok_or_else(|| PipelineError::InvalidValue {
                stage: Stage::Reshape,
                row: bid.row,
                field: bid.country.clone(),
                value: raw.clone(),
            })?;

        let mut bid_converted = (bid_local * bid.exchange_rate)
            .round_dp_with_strategy(CONVERTED_SCALE, RoundingStrategy::MidpointNearestEven);
        bid_converted.rescale(CONVERTED_SCALE);

        conversion.bids.push(NormalizedBid {
            motel_id: bid.motel_id,
            bid_date: render_canonical(&bid.bid_time),
            country: bid.country,
            bid_local,
            exchange_rate: bid.exchange_rate,
            bid_converted,
        });
    }

    Ok(conversion)
}

/// Restricts rated bids to `countries`, pivots them to long form and converts.
#[tracing::instrument(skip_all, fields(bids = rated.len(), countries = ?countries))]
pub fn reshape(rated: Vec<RatedBid>, countries: &[String]) -> Result<Conversion> {
    let long = melt(rated, countries)?;
    let conversion = convert(long)?;

    info!(
        converted = conversion.bids.len(),
        missing = conversion.missing,
        cell_errors = conversion.cell_errors.len(),
        "Reshape complete"
    );

    Ok(conversion)
}
