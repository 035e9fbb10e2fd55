//! Future occurrences of irregular categories.
//!
//! Two modes: a deterministic expected-case line (fixed gap, peak-weekday snap)
//! and a Monte Carlo simulation summarised as per-day percentile bands.

use std::collections::BTreeMap;

use chrono::{Datelike, Duration, NaiveDate};
use rand::distributions::WeightedIndex;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, LogNormal, Normal};
use rusqlite::Connection;

use crate::config::{ForecastMode, MonteCarloConfig, ProjectionConfig, Quantile};
use crate::error::{Result, RunwayError};
use crate::learner;
use crate::models::IrregularState;
use crate::store;

const MIN_SIMULATED_GAP: f64 = 1.0;
const MAX_SIMULATED_GAP: f64 = 30.0;

pub type Series = Vec<(NaiveDate, f64)>;

/// Percentile bands of a Monte Carlo run, one entry per day of the window.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bands {
    pub p50: Series,
    pub p80: Series,
    pub p90: Series,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Forecast {
    Deterministic(Series),
    MonteCarlo(Bands),
}

impl Forecast {
    /// The series the ledger merges: the point forecast, or the chosen band.
    pub fn series(&self, quantile: Quantile) -> Series {
        match self {
            Forecast::Deterministic(series) => series.clone(),
            Forecast::MonteCarlo(bands) => match quantile {
                Quantile::P50 => bands.p50.clone(),
                Quantile::P80 => bands.p80.clone(),
            },
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Forecast::Deterministic(series) => series.is_empty(),
            Forecast::MonteCarlo(bands) => bands.p50.is_empty(),
        }
    }
}

/// First date on or after `date` falling on `weekday` (Monday = 0).
pub(crate) fn snap_forward(date: NaiveDate, weekday: u32) -> NaiveDate {
    let current = date.weekday().num_days_from_monday();
    date + Duration::days(((weekday + 7 - current) % 7) as i64)
}

/// Linear-interpolation order statistic of an already sorted slice.
pub fn percentile(sorted: &[f64], q: f64) -> f64 {
    match sorted.len() {
        0 => 0.0,
        1 => sorted[0],
        n => {
            let pos = q.clamp(0.0, 1.0) * (n - 1) as f64;
            let lo = pos.floor() as usize;
            let hi = pos.ceil() as usize;
            sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
        }
    }
}

/// Expected-case occurrences of one category within `[start, end]`.
///
/// Empty until the state has a gap, a median and a last event.
pub fn deterministic(state: &IrregularState, start: NaiveDate, end: NaiveDate) -> Series {
    let (Some(avg_gap), Some(median), Some(last)) =
        (state.avg_gap_days, state.median_amount, state.last_event_at)
    else {
        return Vec::new();
    };
    if start > end {
        return Vec::new();
    }
    let step = Duration::days((avg_gap.ceil() as i64).max(1));
    let peak = state.peak_weekday();
    let advance = |date: NaiveDate| {
        let next = date + step;
        match peak {
            Some(weekday) => snap_forward(next, weekday),
            None => next,
        }
    };

    let mut next = advance(last.date());
    while next < start {
        next = advance(next);
    }
    let mut totals: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    while next <= end {
        *totals.entry(next).or_insert(0.0) += median;
        next = advance(next);
    }
    totals.into_iter().collect()
}

fn sampling_error(e: impl std::fmt::Display) -> RunwayError {
    RunwayError::Other(format!("invalid sampling parameters: {e}"))
}

enum AmountModel {
    LogNormal(LogNormal<f64>),
    Noisy { median: f64, noise: Normal<f64> },
}

impl AmountModel {
    fn sample(&self, rng: &mut StdRng) -> f64 {
        match self {
            AmountModel::LogNormal(dist) => dist.sample(rng),
            AmountModel::Noisy { median, noise } => (median * (1.0 + noise.sample(rng))).max(0.0),
        }
    }
}

/// Simulates `config.paths` independent futures and reduces them to bands.
///
/// Path `i` draws from its own generator seeded with `seed + i`, so a fixed seed
/// reproduces the run exactly.
pub fn monte_carlo(
    state: &IrregularState,
    start: NaiveDate,
    end: NaiveDate,
    config: &MonteCarloConfig,
) -> Result<Bands> {
    let (Some(avg_gap), Some(median)) = (state.avg_gap_days, state.median_amount) else {
        return Ok(Bands::default());
    };
    if start > end || config.paths == 0 {
        return Ok(Bands::default());
    }

    let gap_dist = Normal::new(avg_gap, config.gap_cv * avg_gap).map_err(sampling_error)?;
    let amounts = match (state.amount_mu, state.amount_sigma) {
        (Some(mu), Some(sigma)) => {
            AmountModel::LogNormal(LogNormal::new(mu, sigma).map_err(sampling_error)?)
        }
        _ => AmountModel::Noisy {
            median,
            noise: Normal::new(0.0, config.amount_cv).map_err(sampling_error)?,
        },
    };
    let weekdays = match &state.weekday_probs {
        Some(probs) => Some(WeightedIndex::new(probs.iter().copied()).map_err(sampling_error)?),
        None => None,
    };

    let days = (end - start).num_days() as usize + 1;
    let mut buckets = vec![vec![0.0; config.paths]; days];
    let origin = state.last_event_at.map(|ts| ts.date()).unwrap_or(start);
    let base_seed = config.seed.unwrap_or_else(rand::random);

    for path in 0..config.paths {
        let mut rng = StdRng::seed_from_u64(base_seed.wrapping_add(path as u64));
        let mut date = origin;
        loop {
            let gap = gap_dist
                .sample(&mut rng)
                .clamp(MIN_SIMULATED_GAP, MAX_SIMULATED_GAP)
                .round() as i64;
            date += Duration::days(gap);
            if let Some(weekdays) = &weekdays {
                date = snap_forward(date, weekdays.sample(&mut rng) as u32);
            }
            if date > end {
                break;
            }
            let amount = amounts.sample(&mut rng);
            if date >= start {
                buckets[(date - start).num_days() as usize][path] += amount;
            }
        }
    }

    let mut bands = Bands::default();
    for (offset, mut values) in buckets.into_iter().enumerate() {
        let date = start + Duration::days(offset as i64);
        values.sort_by(|a, b| a.total_cmp(b));
        bands.p50.push((date, percentile(&values, 0.5)));
        bands.p80.push((date, percentile(&values, 0.8)));
        bands.p90.push((date, percentile(&values, 0.9)));
    }
    Ok(bands)
}

fn needs_bootstrap(state: &IrregularState) -> bool {
    state.avg_gap_days.is_none() || state.median_amount.is_none() || state.last_event_at.is_none()
}

/// Forecasts one category, learning its state first when it is incomplete.
pub fn forecast(
    conn: &Connection,
    category_id: i64,
    start: NaiveDate,
    end: NaiveDate,
    mode: ForecastMode,
    config: &MonteCarloConfig,
) -> Result<Forecast> {
    let category = store::category(conn, category_id)?;
    let mut state = store::state(conn, category_id)?.unwrap_or_default();
    if needs_bootstrap(&state) {
        let learn_start = end - Duration::days(category.window_days);
        state = learner::learn_state(conn, category_id, learn_start, end)?;
    }

    let result = match mode {
        ForecastMode::Deterministic => Forecast::Deterministic(deterministic(&state, start, end)),
        ForecastMode::MonteCarlo => Forecast::MonteCarlo(monte_carlo(&state, start, end, config)?),
    };
    tracing::debug!(category = %category.name, ?mode, %start, %end, empty = result.is_empty(), "forecast");
    Ok(result)
}

/// Combined irregular spending of every active category, one entry per day
/// with a non-zero amount. Amounts are positive outflows.
pub fn irregular_daily_series(
    conn: &Connection,
    account_id: i64,
    start: NaiveDate,
    end: NaiveDate,
    config: &ProjectionConfig,
) -> Result<Series> {
    let mut totals: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for category in store::categories(conn, account_id)?.into_iter().filter(|c| c.active) {
        let mut mc = config.monte_carlo;
        // Decorrelate categories under a shared seed.
        mc.seed = mc.seed.map(|s| s ^ (category.id as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15));
        let result = forecast(conn, category.id, start, end, config.forecast_mode, &mc)?;
        for (date, amount) in result.series(config.quantile) {
            *totals.entry(date).or_insert(0.0) += amount;
        }
    }
    Ok(totals.into_iter().filter(|(_, amount)| *amount != 0.0).collect())
}
