//! Interactive, bidirectional walk over a projected ledger.
//!
//! The session owns one immutable `Projection` for its current window. When a
//! move lands within `trigger_days` of either edge the window grows by
//! `extension_months`, a fresh projection is built over the whole new window
//! and swapped in, and the cursor is relocated by its row key.

use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::Connection;

use crate::config::ProjectionConfig;
use crate::error::Result;
use crate::models::LedgerRow;
use crate::projection::{earliest_event, Projection};
use crate::recurrence::add_months;
use crate::store;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Rendering(PlanWindow),
    Extending { from: PlanWindow, to: PlanWindow },
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Forward,
    Backward,
}

pub struct LedgerSession<'c> {
    conn: &'c Connection,
    account_id: i64,
    today: NaiveDate,
    config: ProjectionConfig,
    /// No event can be dated before this, so backward extension stops here.
    floor: NaiveDate,
    projection: Arc<Projection>,
    position: Option<usize>,
    state: SessionState,
}

impl<'c> LedgerSession<'c> {
    /// Builds the initial window and positions the cursor on the first row
    /// dated today or later (or the last row when everything is in the past).
    ///
    /// An unseeded Monte Carlo config gets one seed for the whole session, so
    /// every rebuild replays the same simulation.
    pub fn open(
        conn: &'c Connection,
        account_id: i64,
        today: NaiveDate,
        mut config: ProjectionConfig,
    ) -> Result<Self> {
        if config.monte_carlo.seed.is_none() {
            config.monte_carlo.seed = Some(rand::random());
        }

        let earliest = store::earliest_transaction(conn, account_id)?.map(|ts| ts.date());
        let snapshot = store::balance(conn, account_id)?.map(|s| s.timestamp.date());
        let start = earliest.or(snapshot).unwrap_or(today);
        let floor = earliest_event(conn, account_id)?.map_or(start, |e| e.min(start));

        let window = PlanWindow { start, end: add_months(today, config.initial_months).max(start) };
        let projection = Projection::build(conn, account_id, window.start, window.end, today, &config)?;
        let position = match projection.len() {
            0 => None,
            n => Some(projection.first_on_or_after(today).min(n - 1)),
        };

        let mut session = Self {
            conn,
            account_id,
            today,
            config,
            floor,
            projection: Arc::new(projection),
            position,
            state: SessionState::Idle,
        };
        session.state = SessionState::Rendering(window);
        Ok(session)
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn window(&self) -> PlanWindow {
        PlanWindow { start: self.projection.start(), end: self.projection.end() }
    }

    /// Shared handle to the buffer currently being rendered.
    pub fn projection(&self) -> Arc<Projection> {
        Arc::clone(&self.projection)
    }

    /// Settings every rebuild in this session uses.
    pub fn config(&self) -> &ProjectionConfig {
        &self.config
    }

    pub fn current(&self) -> Option<&LedgerRow> {
        if self.state == SessionState::Closed {
            return None;
        }
        self.position.and_then(|i| self.projection.rows().get(i))
    }

    /// Moves to the next row; `None` when nothing follows even after extending.
    pub fn advance_next(&mut self) -> Result<Option<&LedgerRow>> {
        let Some(key) = self.current().map(|r| r.timestamp) else {
            return Ok(None);
        };
        if self.get_next(key)?.is_none() {
            return Ok(None);
        }
        let idx = self.projection.rows().partition_point(|r| r.timestamp <= key);
        self.position = Some(idx);
        Ok(self.projection.rows().get(idx))
    }

    /// Moves to the previous row; `None` at the earliest possible event.
    pub fn advance_prev(&mut self) -> Result<Option<&LedgerRow>> {
        let Some(key) = self.current().map(|r| r.timestamp) else {
            return Ok(None);
        };
        if self.get_prev(key)?.is_none() {
            return Ok(None);
        }
        let idx = self.projection.rows().partition_point(|r| r.timestamp < key) - 1;
        self.position = Some(idx);
        Ok(self.projection.rows().get(idx))
    }

    /// First row keyed after `after`, extending the window forward when the
    /// answer lies within the trigger distance of its end.
    pub fn get_next(&mut self, after: NaiveDateTime) -> Result<Option<LedgerRow>> {
        if self.state == SessionState::Closed {
            return Ok(None);
        }
        let end = self.projection.end();
        let date = self.projection.get_next(after).map(|r| r.date).unwrap_or(end);
        if (end - date).num_days() <= self.config.trigger_days {
            self.extend(Direction::Forward)?;
        }
        Ok(self.projection.get_next(after).cloned())
    }

    /// Last row keyed before `before`, extending the window backward when the
    /// answer lies within the trigger distance of its start.
    pub fn get_prev(&mut self, before: NaiveDateTime) -> Result<Option<LedgerRow>> {
        if self.state == SessionState::Closed {
            return Ok(None);
        }
        let start = self.projection.start();
        let date = self.projection.get_prev(before).map(|r| r.date).unwrap_or(start);
        if (date - start).num_days() <= self.config.trigger_days && start > self.floor {
            self.extend(Direction::Backward)?;
        }
        Ok(self.projection.get_prev(before).cloned())
    }

    /// Positions the cursor on the first row dated on or after `date`,
    /// widening the window until it covers the date.
    pub fn seek(&mut self, date: NaiveDate) -> Result<Option<&LedgerRow>> {
        if self.state == SessionState::Closed {
            return Ok(None);
        }
        while date < self.window().start && self.window().start > self.floor {
            let before = self.window();
            self.extend(Direction::Backward)?;
            if self.window() == before {
                break;
            }
        }
        while date > self.window().end {
            let before = self.window();
            self.extend(Direction::Forward)?;
            if self.window() == before {
                break;
            }
        }
        let idx = self.projection.first_on_or_after(date);
        self.position = (idx < self.projection.len()).then_some(idx);
        Ok(self.current())
    }

    pub fn close(&mut self) {
        self.state = SessionState::Closed;
        self.position = None;
    }

    fn extend(&mut self, direction: Direction) -> Result<()> {
        let from = self.window();
        let to = match direction {
            Direction::Forward => PlanWindow {
                start: from.start,
                end: add_months(from.end, self.config.extension_months),
            },
            Direction::Backward => PlanWindow {
                start: add_months(from.start, -self.config.extension_months).max(self.floor),
                end: from.end,
            },
        };
        if to == from {
            return Ok(());
        }

        let key = self.current().map(|r| r.timestamp);
        self.state = SessionState::Extending { from, to };
        let built = Projection::build(self.conn, self.account_id, to.start, to.end, self.today, &self.config);
        let projection = match built {
            Ok(p) => p,
            Err(e) => {
                self.state = SessionState::Rendering(from);
                return Err(e);
            }
        };

        self.position = key.and_then(|k| {
            let idx = projection.rows().partition_point(|r| r.timestamp < k);
            (idx < projection.len()).then_some(idx)
        });
        self.projection = Arc::new(projection);
        self.state = SessionState::Rendering(to);
        tracing::info!(
            account = self.account_id,
            ?direction,
            start = %to.start,
            end = %to.end,
            rows = self.projection.len(),
            "extended ledger window"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ForecastMode;
    use crate::db::tests::test_db;
    use crate::models::{Frequency, IrregularState, PostedTransaction};

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn at(y: i32, m: u32, day: u32) -> NaiveDateTime {
        d(y, m, day).and_hms_opt(0, 0, 0).unwrap()
    }

    fn small_config() -> ProjectionConfig {
        ProjectionConfig { initial_months: 2, extension_months: 1, trigger_days: 7, ..Default::default() }
    }

    #[test]
    fn test_empty_account_has_no_rows() {
        let (_dir, conn) = test_db();
        let mut session = LedgerSession::open(&conn, 1, d(2023, 1, 1), small_config()).unwrap();
        assert!(session.current().is_none());
        assert!(session.advance_next().unwrap().is_none());
        assert!(session.advance_prev().unwrap().is_none());
        assert_eq!(session.state(), SessionState::Rendering(PlanWindow { start: d(2023, 1, 1), end: d(2023, 3, 1) }));
    }

    #[test]
    fn test_initial_window_starts_at_earliest_transaction() {
        let (_dir, conn) = test_db();
        store::set_balance(&conn, 1, 0.0, at(2023, 1, 1)).unwrap();
        let txn = PostedTransaction { id: None, account_id: 1, description: "Old".into(), amount: -3.0, timestamp: at(2022, 11, 20) };
        store::add_transaction(&conn, &txn).unwrap();
        let session = LedgerSession::open(&conn, 1, d(2023, 1, 1), small_config()).unwrap();
        assert_eq!(session.window(), PlanWindow { start: d(2022, 11, 20), end: d(2023, 3, 1) });
        assert_eq!(session.current().unwrap().description, "Old");
    }

    #[test]
    fn test_scrolling_forward_extends_window() {
        let (_dir, conn) = test_db();
        store::set_balance(&conn, 1, 0.0, at(2023, 1, 1)).unwrap();
        store::add_recurring(&conn, 1, "Rent", 50.0, at(2023, 1, 1), Frequency::Weekly, false).unwrap();

        let mut session = LedgerSession::open(&conn, 1, d(2023, 1, 1), small_config()).unwrap();
        let first = session.current().unwrap().clone();
        assert_eq!(first.date, d(2023, 1, 1));
        assert_eq!(first.balance, -50.0);

        let mut prev = first;
        for _ in 0..30 {
            let row = session.advance_next().unwrap().unwrap().clone();
            assert!(row.timestamp > prev.timestamp);
            assert_eq!(row.date - prev.date, chrono::Duration::days(7));
            assert!((row.balance - (prev.balance - 50.0)).abs() < 1e-9);
            prev = row;
        }
        assert!(session.window().end > d(2023, 3, 1));
        assert!(matches!(session.state(), SessionState::Rendering(_)));
    }

    #[test]
    fn test_backward_extension_stops_at_earliest_event() {
        let (_dir, conn) = test_db();
        store::set_balance(&conn, 1, 0.0, at(2023, 1, 1)).unwrap();
        store::add_recurring(&conn, 1, "Gym", 20.0, at(2022, 9, 1), Frequency::Monthly, false).unwrap();

        let mut session = LedgerSession::open(&conn, 1, d(2023, 1, 1), small_config()).unwrap();
        assert_eq!(session.window().start, d(2023, 1, 1));
        assert_eq!(session.current().unwrap().date, d(2023, 1, 1));

        let mut dates = vec![];
        while let Some(row) = session.advance_prev().unwrap() {
            dates.push(row.date);
        }
        assert_eq!(dates, vec![d(2022, 12, 1), d(2022, 11, 1), d(2022, 10, 1), d(2022, 9, 1)]);
        assert_eq!(session.window().start, d(2022, 9, 1));
        assert_eq!(session.current().unwrap().date, d(2022, 9, 1));
    }

    #[test]
    fn test_balances_survive_backward_rebuild() {
        let (_dir, conn) = test_db();
        store::set_balance(&conn, 1, 1000.0, at(2023, 1, 1)).unwrap();
        store::add_recurring(&conn, 1, "Gym", 20.0, at(2022, 9, 1), Frequency::Monthly, false).unwrap();

        let mut session = LedgerSession::open(&conn, 1, d(2023, 1, 1), small_config()).unwrap();
        let jan = session.current().unwrap().clone();
        assert_eq!(jan.balance, 980.0);
        let dec = session.advance_prev().unwrap().unwrap().clone();
        assert_eq!(dec.balance, 1000.0);
        let jan_again = session.advance_next().unwrap().unwrap().clone();
        assert_eq!(jan_again, jan);
    }

    #[test]
    fn test_balances_without_snapshot_survive_backward_rebuild() {
        let (_dir, conn) = test_db();
        store::add_recurring(&conn, 1, "Gym", 20.0, at(2022, 9, 1), Frequency::Monthly, false).unwrap();

        let mut session = LedgerSession::open(&conn, 1, d(2023, 1, 1), small_config()).unwrap();
        assert_eq!(session.window().start, d(2023, 1, 1));
        let jan = session.current().unwrap().clone();
        assert_eq!(jan.balance, -100.0);
        let dec = session.advance_prev().unwrap().unwrap().clone();
        assert_eq!(dec.date, d(2022, 12, 1));
        assert_eq!(dec.balance, -80.0);
        let jan_again = session.advance_next().unwrap().unwrap().clone();
        assert_eq!(jan_again, jan);
    }

    #[test]
    fn test_unseeded_monte_carlo_rows_stable_across_extension() {
        let (_dir, conn) = test_db();
        let cat = store::add_category(&conn, 1, "Fuel", 120, 0.3).unwrap();
        let state = IrregularState {
            avg_gap_days: Some(3.0),
            median_amount: Some(40.0),
            last_event_at: Some(at(2023, 1, 1)),
            ..Default::default()
        };
        store::save_state(&conn, cat, &state).unwrap();
        store::set_balance(&conn, 1, 1000.0, at(2023, 1, 1)).unwrap();

        let mut config = small_config().with_mode(ForecastMode::MonteCarlo);
        config.monte_carlo.paths = 20;
        assert!(config.monte_carlo.seed.is_none());

        let mut session = LedgerSession::open(&conn, 1, d(2023, 1, 1), config).unwrap();
        assert!(session.config().monte_carlo.seed.is_some());
        let before: Vec<LedgerRow> = session.projection().rows().iter().take(20).cloned().collect();
        assert!(!before.is_empty());

        let end = session.window().end;
        session.seek(add_months(end, 1)).unwrap();
        session.seek(add_months(end, 2)).unwrap();
        assert!(session.window().end > end);
        let after: Vec<LedgerRow> = session.projection().rows().iter().take(20).cloned().collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_seek_past_window_end_extends() {
        let (_dir, conn) = test_db();
        store::set_balance(&conn, 1, 0.0, at(2023, 1, 1)).unwrap();
        store::add_recurring(&conn, 1, "Rent", 100.0, at(2023, 1, 1), Frequency::Monthly, false).unwrap();
        let mut session = LedgerSession::open(&conn, 1, d(2023, 1, 1), small_config()).unwrap();

        let row = session.seek(d(2023, 6, 2)).unwrap().unwrap().clone();
        assert_eq!(row.date, d(2023, 7, 1));
        assert_eq!(row.balance, -700.0);
        assert!(session.window().end >= d(2023, 6, 2));
        assert_eq!(session.current().unwrap().date, d(2023, 7, 1));
    }

    #[test]
    fn test_closed_session_yields_nothing() {
        let (_dir, conn) = test_db();
        store::add_recurring(&conn, 1, "Rent", 50.0, at(2023, 1, 1), Frequency::Weekly, false).unwrap();
        let mut session = LedgerSession::open(&conn, 1, d(2023, 1, 1), small_config()).unwrap();
        assert!(session.current().is_some());
        session.close();
        assert_eq!(session.state(), SessionState::Closed);
        assert!(session.current().is_none());
        assert!(session.advance_next().unwrap().is_none());
        assert!(session.get_next(at(2023, 1, 1)).unwrap().is_none());
    }
}
