//! Fits timing and amount statistics for irregular categories.
//!
//! `learn_state` re-fits from history over the category's lookback window;
//! `update_state` folds in one new transaction without rescanning.

use chrono::{Datelike, Duration, NaiveDate};
use rusqlite::Connection;

use crate::categorizer::Matcher;
use crate::error::Result;
use crate::models::{IrregularCategory, IrregularState, PostedTransaction};
use crate::store;

/// Gaps needed before switching from a plain mean to exponential smoothing.
const MIN_GAPS_FOR_SMOOTHING: usize = 3;
const MIN_EVENTS_FOR_TIMING: usize = 3;
const MIN_SAMPLES_FOR_LOGNORMAL: usize = 8;
/// Incremental gaps shorter than this are same-day repeats and are not folded in.
const MIN_INCREMENTAL_GAP_DAYS: f64 = 1.0;

pub(crate) fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation; a single sample has none.
fn stdev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    var.sqrt()
}

fn normalize(counts: [f64; 7]) -> [f64; 7] {
    let total: f64 = counts.iter().sum();
    let mut probs = counts;
    for p in probs.iter_mut() {
        *p /= total;
    }
    probs
}

fn weekday_index(txn: &PostedTransaction) -> usize {
    txn.timestamp.weekday().num_days_from_monday() as usize
}

/// Full re-fit from the matched transactions of one window.
pub fn fit_state(
    category: &IrregularCategory,
    matched: &[PostedTransaction],
    prior: IrregularState,
) -> IrregularState {
    if matched.is_empty() {
        return prior;
    }
    let mut events: Vec<&PostedTransaction> = matched.iter().collect();
    events.sort_by_key(|t| t.timestamp);

    let amounts: Vec<f64> = events.iter().map(|t| t.amount.abs()).collect();
    let mut state = prior;
    state.median_amount = median(&amounts);
    state.last_event_at = events.last().map(|t| t.timestamp);

    if events.len() < MIN_EVENTS_FOR_TIMING {
        return state;
    }

    let gaps: Vec<f64> = events
        .windows(2)
        .map(|w| (w[1].timestamp - w[0].timestamp).num_seconds() as f64 / 86_400.0)
        .collect();
    state.avg_gap_days = Some(if gaps.len() >= MIN_GAPS_FOR_SMOOTHING {
        gaps[1..]
            .iter()
            .fold(gaps[0], |avg, gap| category.alpha * gap + (1.0 - category.alpha) * avg)
    } else {
        mean(&gaps)
    });

    let mut counts = [1.0; 7];
    for txn in &events {
        counts[weekday_index(txn)] += 1.0;
    }
    state.weekday_probs = Some(normalize(counts));

    let logs: Vec<f64> = amounts.iter().filter(|a| **a > 0.0).map(|a| a.ln()).collect();
    if logs.len() >= MIN_SAMPLES_FOR_LOGNORMAL {
        state.amount_mu = Some(mean(&logs));
        state.amount_sigma = Some(stdev(&logs));
    } else {
        state.amount_mu = None;
        state.amount_sigma = None;
    }
    state
}

/// Re-learns a category from history and commits the result.
///
/// The window is `[start, end]` clipped to the category's `window_days` lookback.
pub fn learn_state(
    conn: &Connection,
    category_id: i64,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<IrregularState> {
    let category = store::category(conn, category_id)?;
    let prior = store::state(conn, category_id)?.unwrap_or_default();
    let learn_start = start.max(end - Duration::days(category.window_days));

    let matcher = Matcher::for_account(conn, category.account_id)?;
    let matched: Vec<PostedTransaction> = if matcher.is_empty() || learn_start > end {
        Vec::new()
    } else {
        store::transactions_between(conn, category.account_id, learn_start, end)?
            .into_iter()
            .filter(|t| matcher.category_for(&t.description) == Some(category_id))
            .collect()
    };

    let state = fit_state(&category, &matched, prior);
    tracing::debug!(
        category = %category.name,
        matched = matched.len(),
        avg_gap = ?state.avg_gap_days,
        median = ?state.median_amount,
        "learned irregular state"
    );
    store::save_state(conn, category_id, &state)?;
    Ok(state)
}

/// Folds one new matched transaction into an existing state.
///
/// `median_amount` is moved toward the new amount by exponential smoothing, an
/// approximation of a running median rather than a true one.
pub fn update_state(state: &IrregularState, alpha: f64, txn: &PostedTransaction) -> IrregularState {
    let mut next = state.clone();

    if let Some(last) = state.last_event_at {
        let gap = (txn.timestamp - last).num_seconds() as f64 / 86_400.0;
        if gap >= MIN_INCREMENTAL_GAP_DAYS {
            next.avg_gap_days = Some(match state.avg_gap_days {
                Some(avg) => alpha * gap + (1.0 - alpha) * avg,
                None => gap,
            });
        }
    }

    let amount = txn.amount.abs();
    next.median_amount = Some(match state.median_amount {
        Some(m) => alpha * amount + (1.0 - alpha) * m,
        None => amount,
    });

    let mut counts = state.weekday_probs.unwrap_or([1.0; 7]);
    counts[weekday_index(txn)] += 1.0;
    next.weekday_probs = Some(normalize(counts));

    next.last_event_at = Some(txn.timestamp);
    next
}

/// A category whose state changed because of a newly recorded transaction.
#[derive(Debug, Clone)]
pub struct Observation {
    pub category_id: i64,
    pub category: String,
    pub state: IrregularState,
}

/// Stores a posted transaction and, when it matches an irregular category,
/// updates that category's state before returning.
pub fn record_transaction(
    conn: &Connection,
    txn: &PostedTransaction,
) -> Result<(i64, Option<Observation>)> {
    let id = store::add_transaction(conn, txn)?;
    let matcher = Matcher::for_account(conn, txn.account_id)?;
    let Some(category_id) = matcher.category_for(&txn.description) else {
        return Ok((id, None));
    };

    let category = store::category(conn, category_id)?;
    let prior = store::state(conn, category_id)?.unwrap_or_default();
    let state = update_state(&prior, category.alpha, txn);
    store::save_state(conn, category_id, &state)?;
    tracing::info!(category = %category.name, transaction = id, "updated irregular state");

    Ok((
        id,
        Some(Observation {
            category_id,
            category: category.name,
            state,
        }),
    ))
}
