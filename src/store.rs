//! Per-account reads and the few writes the ledger core needs.
//!
//! Every query is scoped by `account_id`; nothing here crosses accounts.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::{Result, RunwayError};
use crate::models::{
    Account, BalanceSnapshot, Frequency, IrregularCategory, IrregularRule, IrregularState,
    PostedTransaction, RecurringSchedule,
};

pub const DEFAULT_WINDOW_DAYS: i64 = 120;
pub const DEFAULT_ALPHA: f64 = 0.3;

pub fn day_start(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN)
}

// ---------------------------------------------------------------------------
// Accounts
// ---------------------------------------------------------------------------

pub fn account_id(conn: &Connection, name: &str) -> Result<i64> {
    conn.query_row("SELECT id FROM accounts WHERE name = ?1", [name], |row| row.get(0))
        .optional()?
        .ok_or_else(|| RunwayError::UnknownAccount(name.to_string()))
}

pub fn add_account(conn: &Connection, name: &str, account_type: &str) -> Result<i64> {
    conn.execute(
        "INSERT INTO accounts (name, account_type) VALUES (?1, ?2)",
        params![name, account_type],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn list_accounts(conn: &Connection) -> Result<Vec<Account>> {
    let mut stmt =
        conn.prepare("SELECT id, name, account_type, archived FROM accounts ORDER BY id")?;
    let rows = stmt
        .query_map([], |row| {
            Ok(Account {
                id: row.get(0)?,
                name: row.get(1)?,
                account_type: row.get(2)?,
                archived: row.get::<_, Option<bool>>(3)?.unwrap_or(false),
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

// ---------------------------------------------------------------------------
// Posted transactions
// ---------------------------------------------------------------------------

fn map_transaction(row: &rusqlite::Row<'_>) -> rusqlite::Result<PostedTransaction> {
    Ok(PostedTransaction {
        id: row.get(0)?,
        account_id: row.get(1)?,
        description: row.get(2)?,
        amount: row.get(3)?,
        timestamp: row.get(4)?,
    })
}

pub fn add_transaction(conn: &Connection, txn: &PostedTransaction) -> Result<i64> {
    conn.execute(
        "INSERT INTO transactions (account_id, description, amount, timestamp) VALUES (?1, ?2, ?3, ?4)",
        params![txn.account_id, txn.description, txn.amount, txn.timestamp],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn delete_transaction(conn: &Connection, account_id: i64, id: i64) -> Result<()> {
    let changed = conn.execute(
        "DELETE FROM transactions WHERE id = ?1 AND account_id = ?2",
        params![id, account_id],
    )?;
    if changed == 0 {
        return Err(RunwayError::Other(format!("No transaction with ID {id}")));
    }
    Ok(())
}

/// All posted transactions of the account, oldest first.
pub fn transactions(conn: &Connection, account_id: i64) -> Result<Vec<PostedTransaction>> {
    let mut stmt = conn.prepare(
        "SELECT id, account_id, description, amount, timestamp FROM transactions \
         WHERE account_id = ?1 ORDER BY timestamp, id",
    )?;
    let rows = stmt
        .query_map([account_id], map_transaction)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Posted transactions dated within `[start, end]`, oldest first.
pub fn transactions_between(
    conn: &Connection,
    account_id: i64,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<PostedTransaction>> {
    let Some(after_end) = end.succ_opt() else {
        return Ok(Vec::new());
    };
    let mut stmt = conn.prepare(
        "SELECT id, account_id, description, amount, timestamp FROM transactions \
         WHERE account_id = ?1 AND timestamp >= ?2 AND timestamp < ?3 ORDER BY timestamp, id",
    )?;
    let rows = stmt
        .query_map(
            params![account_id, day_start(start), day_start(after_end)],
            map_transaction,
        )?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn earliest_transaction(conn: &Connection, account_id: i64) -> Result<Option<NaiveDateTime>> {
    let ts: Option<NaiveDateTime> = conn.query_row(
        "SELECT min(timestamp) FROM transactions WHERE account_id = ?1",
        [account_id],
        |row| row.get(0),
    )?;
    Ok(ts)
}

// ---------------------------------------------------------------------------
// Recurring schedules
// ---------------------------------------------------------------------------

/// Stores a schedule with its sign fixed by `is_income`.
pub fn add_recurring(
    conn: &Connection,
    account_id: i64,
    description: &str,
    amount: f64,
    start: NaiveDateTime,
    frequency: Frequency,
    is_income: bool,
) -> Result<i64> {
    let signed = if is_income { amount.abs() } else { -amount.abs() };
    conn.execute(
        "INSERT INTO recurring (account_id, description, amount, start_date, frequency) \
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![account_id, description, signed, start, frequency.as_str()],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Schedules of the account. Rows whose stored frequency does not parse are skipped.
pub fn recurring(conn: &Connection, account_id: i64) -> Result<Vec<RecurringSchedule>> {
    let mut stmt = conn.prepare(
        "SELECT id, account_id, description, amount, start_date, frequency FROM recurring \
         WHERE account_id = ?1 ORDER BY id",
    )?;
    let raw: Vec<(i64, i64, String, f64, NaiveDateTime, String)> = stmt
        .query_map([account_id], |row| {
            Ok((
                row.get(0)?,
                row.get(1)?,
                row.get(2)?,
                row.get(3)?,
                row.get(4)?,
                row.get(5)?,
            ))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut schedules = Vec::with_capacity(raw.len());
    for (id, account_id, description, amount, start, frequency) in raw {
        match frequency.parse::<Frequency>() {
            Ok(frequency) => schedules.push(RecurringSchedule {
                id: Some(id),
                account_id,
                description,
                amount,
                start,
                frequency,
            }),
            Err(_) => {
                tracing::warn!(schedule = id, %frequency, "skipping schedule with unknown frequency");
            }
        }
    }
    Ok(schedules)
}

pub fn delete_recurring(conn: &Connection, account_id: i64, id: i64) -> Result<()> {
    let changed = conn.execute(
        "DELETE FROM recurring WHERE id = ?1 AND account_id = ?2",
        params![id, account_id],
    )?;
    if changed == 0 {
        return Err(RunwayError::UnknownSchedule(id));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Balance snapshot
// ---------------------------------------------------------------------------

/// Replaces the account's current balance snapshot.
pub fn set_balance(
    conn: &Connection,
    account_id: i64,
    amount: f64,
    timestamp: NaiveDateTime,
) -> Result<()> {
    conn.execute(
        "INSERT INTO balance (account_id, amount, timestamp) VALUES (?1, ?2, ?3) \
         ON CONFLICT(account_id) DO UPDATE SET amount = excluded.amount, timestamp = excluded.timestamp",
        params![account_id, amount, timestamp],
    )?;
    Ok(())
}

pub fn balance(conn: &Connection, account_id: i64) -> Result<Option<BalanceSnapshot>> {
    let snapshot = conn
        .query_row(
            "SELECT amount, timestamp FROM balance WHERE account_id = ?1",
            [account_id],
            |row| {
                Ok(BalanceSnapshot {
                    amount: row.get(0)?,
                    timestamp: row.get(1)?,
                })
            },
        )
        .optional()?;
    Ok(snapshot)
}

// ---------------------------------------------------------------------------
// Irregular categories, rules and learned state
// ---------------------------------------------------------------------------

const CATEGORY_COLUMNS: &str =
    "id, account_id, name, active, window_days, alpha, safety_quantile";

fn map_category(row: &rusqlite::Row<'_>) -> rusqlite::Result<IrregularCategory> {
    Ok(IrregularCategory {
        id: row.get(0)?,
        account_id: row.get(1)?,
        name: row.get(2)?,
        active: row.get(3)?,
        window_days: row.get(4)?,
        alpha: row.get(5)?,
        safety_quantile: row.get(6)?,
    })
}

/// Creates a category together with its empty learned state.
pub fn add_category(
    conn: &Connection,
    account_id: i64,
    name: &str,
    window_days: i64,
    alpha: f64,
) -> Result<i64> {
    if !(alpha > 0.0 && alpha <= 1.0) {
        return Err(RunwayError::Other(format!(
            "alpha must be in (0, 1], got {alpha}"
        )));
    }
    conn.execute(
        "INSERT INTO irregular_categories (account_id, name, window_days, alpha) VALUES (?1, ?2, ?3, ?4)",
        params![account_id, name, window_days, alpha],
    )?;
    let id = conn.last_insert_rowid();
    conn.execute("INSERT INTO irregular_state (category_id) VALUES (?1)", [id])?;
    Ok(id)
}

pub fn categories(conn: &Connection, account_id: i64) -> Result<Vec<IrregularCategory>> {
    let sql = format!(
        "SELECT {CATEGORY_COLUMNS} FROM irregular_categories WHERE account_id = ?1 ORDER BY id"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([account_id], map_category)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn category(conn: &Connection, id: i64) -> Result<IrregularCategory> {
    let sql = format!("SELECT {CATEGORY_COLUMNS} FROM irregular_categories WHERE id = ?1");
    conn.query_row(&sql, [id], map_category)
        .optional()?
        .ok_or_else(|| RunwayError::UnknownCategory(format!("#{id}")))
}

pub fn category_by_name(conn: &Connection, account_id: i64, name: &str) -> Result<IrregularCategory> {
    let sql = format!(
        "SELECT {CATEGORY_COLUMNS} FROM irregular_categories WHERE account_id = ?1 AND name = ?2"
    );
    conn.query_row(&sql, params![account_id, name], map_category)
        .optional()?
        .ok_or_else(|| RunwayError::UnknownCategory(name.to_string()))
}

pub fn set_category_active(conn: &Connection, id: i64, active: bool) -> Result<()> {
    let changed = conn.execute(
        "UPDATE irregular_categories SET active = ?1, updated_at = datetime('now') WHERE id = ?2",
        params![active, id],
    )?;
    if changed == 0 {
        return Err(RunwayError::UnknownCategory(format!("#{id}")));
    }
    Ok(())
}

pub fn add_rule(conn: &Connection, category_id: i64, pattern: &str) -> Result<i64> {
    let cat = category(conn, category_id)?;
    conn.execute(
        "INSERT INTO irregular_rules (category_id, account_id, pattern) VALUES (?1, ?2, ?3)",
        params![category_id, cat.account_id, pattern],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Active patterns of one category, in rule id order.
pub fn rules_for(conn: &Connection, category_id: i64) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT pattern FROM irregular_rules WHERE category_id = ?1 AND active = 1 ORDER BY id",
    )?;
    let rows = stmt
        .query_map([category_id], |row| row.get(0))?
        .collect::<std::result::Result<Vec<String>, _>>()?;
    Ok(rows)
}

/// Active rules of active categories for the account, in rule id order.
pub fn active_rules(conn: &Connection, account_id: i64) -> Result<Vec<IrregularRule>> {
    let mut stmt = conn.prepare(
        "SELECT r.id, r.category_id, r.pattern, r.active FROM irregular_rules r \
         JOIN irregular_categories c ON r.category_id = c.id \
         WHERE c.account_id = ?1 AND c.active = 1 AND r.active = 1 ORDER BY r.id",
    )?;
    let rows = stmt
        .query_map([account_id], |row| {
            Ok(IrregularRule {
                id: row.get(0)?,
                category_id: row.get(1)?,
                pattern: row.get(2)?,
                active: row.get(3)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn decode_probs(raw: Option<String>) -> Option<[f64; 7]> {
    let values: Vec<f64> = serde_json::from_str(raw.as_deref()?).ok()?;
    values.try_into().ok()
}

pub fn state(conn: &Connection, category_id: i64) -> Result<Option<IrregularState>> {
    let row = conn
        .query_row(
            "SELECT avg_gap_days, weekday_probs, amount_mu, amount_sigma, median_amount, last_event_at \
             FROM irregular_state WHERE category_id = ?1",
            [category_id],
            |row| {
                Ok((
                    row.get::<_, Option<f64>>(0)?,
                    row.get::<_, Option<String>>(1)?,
                    row.get::<_, Option<f64>>(2)?,
                    row.get::<_, Option<f64>>(3)?,
                    row.get::<_, Option<f64>>(4)?,
                    row.get::<_, Option<NaiveDateTime>>(5)?,
                ))
            },
        )
        .optional()?;
    Ok(row.map(|(avg_gap_days, probs, amount_mu, amount_sigma, median_amount, last_event_at)| {
        IrregularState {
            avg_gap_days,
            weekday_probs: decode_probs(probs),
            amount_mu,
            amount_sigma,
            median_amount,
            last_event_at,
        }
    }))
}

/// Full replace of the category's learned state.
pub fn save_state(conn: &Connection, category_id: i64, state: &IrregularState) -> Result<()> {
    let probs = match &state.weekday_probs {
        Some(p) => Some(serde_json::to_string(&p.to_vec())?),
        None => None,
    };
    conn.execute(
        "INSERT INTO irregular_state \
         (category_id, avg_gap_days, weekday_probs, amount_mu, amount_sigma, median_amount, last_event_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, datetime('now')) \
         ON CONFLICT(category_id) DO UPDATE SET \
         avg_gap_days = excluded.avg_gap_days, weekday_probs = excluded.weekday_probs, \
         amount_mu = excluded.amount_mu, amount_sigma = excluded.amount_sigma, \
         median_amount = excluded.median_amount, last_event_at = excluded.last_event_at, \
         updated_at = excluded.updated_at",
        params![
            category_id,
            state.avg_gap_days,
            probs,
            state.amount_mu,
            state.amount_sigma,
            state.median_amount,
            state.last_event_at,
        ],
    )?;
    Ok(())
}
