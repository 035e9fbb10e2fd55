//! Merges posted, recurring and forecast irregular events into one ordered
//! ledger with a running balance anchored to the account's balance snapshot.
//!
//! A `Projection` is an immutable buffer built for one window. Widening the
//! window means building a new one; nothing is patched in place.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use rusqlite::Connection;

use crate::config::ProjectionConfig;
use crate::error::Result;
use crate::forecaster;
use crate::models::{BalanceSnapshot, EventSource, LedgerRow};
use crate::recurrence;
use crate::store;

pub const IRREGULAR_DESCRIPTION: &str = "Irregular";

/// An event before ordering and balance assignment.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerEvent {
    pub timestamp: NaiveDateTime,
    pub description: String,
    pub amount: f64,
    pub source: EventSource,
}

impl LedgerEvent {
    pub fn new(timestamp: NaiveDateTime, description: impl Into<String>, amount: f64, source: EventSource) -> Self {
        Self { timestamp, description: description.into(), amount, source }
    }

    pub fn date(&self) -> NaiveDate {
        self.timestamp.date()
    }

    /// Within a day: credits, then debits, then forecast irregular spending.
    fn priority(&self) -> u8 {
        match self.source {
            EventSource::Irregular => 2,
            _ if self.amount >= 0.0 => 0,
            _ => 1,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Projection {
    start: NaiveDate,
    end: NaiveDate,
    rows: Vec<LedgerRow>,
}

impl Projection {
    /// Orders events, assigns unique keys and walks the running balance.
    ///
    /// Every event gets a key strictly after its own timestamp and after the
    /// previous key. The offset absorbs every real event stamped strictly
    /// before the snapshot, judged by its own timestamp rather than its key,
    /// so same-day reordering never moves an event across the anchor. An
    /// event stamped exactly at the snapshot instant is applied after it, and
    /// forecast irregular rows are never part of a recorded balance. Rows
    /// dated before `start` take part in the balance but are not kept.
    pub fn from_events(
        mut events: Vec<LedgerEvent>,
        snapshot: Option<BalanceSnapshot>,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Self {
        events.retain(|e| e.date() <= end);
        events.sort_by(|a, b| {
            (a.date(), a.priority(), a.timestamp, a.source)
                .cmp(&(b.date(), b.priority(), b.timestamp, b.source))
        });

        let tick = Duration::microseconds(1);
        let mut keys = Vec::with_capacity(events.len());
        let mut prev: Option<NaiveDateTime> = None;
        for event in &events {
            let floor = match prev {
                Some(p) if p > event.timestamp => p,
                _ => event.timestamp,
            };
            let key = floor + tick;
            keys.push(key);
            prev = Some(key);
        }

        let offset = match snapshot {
            Some(snap) => {
                let before: f64 = events
                    .iter()
                    .filter(|e| e.source != EventSource::Irregular && e.timestamp < snap.timestamp)
                    .map(|e| e.amount)
                    .sum();
                snap.amount - before
            }
            None => 0.0,
        };

        let mut running = 0.0;
        let mut rows = Vec::with_capacity(events.len());
        for (event, key) in events.into_iter().zip(keys) {
            running += event.amount;
            if event.date() < start {
                continue;
            }
            rows.push(LedgerRow {
                timestamp: key,
                date: event.date(),
                description: event.description,
                amount: event.amount,
                balance: running + offset,
                source: event.source,
            });
        }
        Self { start, end, rows }
    }

    /// Reads the account and materializes `[start, end]` as of `today`.
    ///
    /// With a snapshot, events from the snapshot date on are walked so the
    /// anchor holds. Without one the balance starts at zero on the earliest
    /// possible event, so every window over the account agrees on it.
    pub fn build(
        conn: &Connection,
        account_id: i64,
        start: NaiveDate,
        end: NaiveDate,
        today: NaiveDate,
        config: &ProjectionConfig,
    ) -> Result<Self> {
        let snapshot = store::balance(conn, account_id)?;
        // Events between the snapshot and the window start still move the balance.
        let from = match snapshot {
            Some(snap) => start.min(snap.timestamp.date()),
            None => earliest_event(conn, account_id)?.map_or(start, |e| start.min(e)),
        };

        let mut events = Vec::new();
        for txn in store::transactions_between(conn, account_id, from, end)? {
            events.push(LedgerEvent::new(txn.timestamp, txn.description, txn.amount, EventSource::Posted));
        }

        for schedule in store::recurring(conn, account_id)? {
            let time = schedule.start.time();
            for date in recurrence::occurrences_between(schedule.start.date(), schedule.frequency, from, end) {
                events.push(LedgerEvent::new(
                    date.and_time(time),
                    schedule.description.clone(),
                    schedule.amount,
                    EventSource::Recurring,
                ));
            }
        }

        let forecast_from = match snapshot {
            Some(snap) => today.max(snap.timestamp.date()),
            None => today,
        }
        .max(from);
        if forecast_from <= end {
            for (date, amount) in forecaster::irregular_daily_series(conn, account_id, forecast_from, end, config)? {
                events.push(LedgerEvent::new(
                    store::day_start(date),
                    IRREGULAR_DESCRIPTION,
                    -amount,
                    EventSource::Irregular,
                ));
            }
        }

        let projection = Self::from_events(events, snapshot, start, end);
        tracing::debug!(account = account_id, %start, %end, rows = projection.rows.len(), "built projection");
        Ok(projection)
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn rows(&self) -> &[LedgerRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// First row keyed strictly after `after`.
    pub fn get_next(&self, after: NaiveDateTime) -> Option<&LedgerRow> {
        let idx = self.rows.partition_point(|r| r.timestamp <= after);
        self.rows.get(idx)
    }

    /// Last row keyed strictly before `before`.
    pub fn get_prev(&self, before: NaiveDateTime) -> Option<&LedgerRow> {
        let idx = self.rows.partition_point(|r| r.timestamp < before);
        idx.checked_sub(1).and_then(|i| self.rows.get(i))
    }

    /// Index of the row with exactly this key.
    pub fn position(&self, key: NaiveDateTime) -> Option<usize> {
        self.rows.binary_search_by(|r| r.timestamp.cmp(&key)).ok()
    }

    /// Index of the first row dated on or after `date`.
    pub fn first_on_or_after(&self, date: NaiveDate) -> usize {
        self.rows.partition_point(|r| r.date < date)
    }
}

/// Earliest date any posted, recurring or snapshot event of the account can
/// carry.
pub fn earliest_event(conn: &Connection, account_id: i64) -> Result<Option<NaiveDate>> {
    let mut earliest = store::earliest_transaction(conn, account_id)?.map(|ts| ts.date());
    if let Some(snap) = store::balance(conn, account_id)? {
        earliest = Some(earliest.map_or(snap.timestamp.date(), |e| e.min(snap.timestamp.date())));
    }
    for schedule in store::recurring(conn, account_id)? {
        let anchor = schedule.start.date();
        earliest = Some(earliest.map_or(anchor, |e| e.min(anchor)));
    }
    Ok(earliest)
}

/// One-shot merged rows for `[start, end]`.
pub fn project_rows(
    conn: &Connection,
    account_id: i64,
    start: NaiveDate,
    end: NaiveDate,
    today: NaiveDate,
    config: &ProjectionConfig,
) -> Result<Vec<LedgerRow>> {
    Ok(Projection::build(conn, account_id, start, end, today, config)?.rows)
}
