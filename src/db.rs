use std::path::Path;

use rusqlite::Connection;

use crate::error::Result;

pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS accounts (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    account_type TEXT NOT NULL DEFAULT 'checking',
    archived INTEGER DEFAULT 0,
    created_at TEXT DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS transactions (
    id INTEGER PRIMARY KEY,
    account_id INTEGER NOT NULL,
    description TEXT NOT NULL,
    amount REAL NOT NULL,
    timestamp TEXT NOT NULL,
    created_at TEXT DEFAULT (datetime('now')),
    FOREIGN KEY (account_id) REFERENCES accounts(id)
);
CREATE INDEX IF NOT EXISTS ix_transactions_account_ts ON transactions(account_id, timestamp);

CREATE TABLE IF NOT EXISTS recurring (
    id INTEGER PRIMARY KEY,
    account_id INTEGER NOT NULL,
    description TEXT NOT NULL,
    amount REAL NOT NULL,
    start_date TEXT NOT NULL,
    frequency TEXT NOT NULL,
    FOREIGN KEY (account_id) REFERENCES accounts(id)
);

CREATE TABLE IF NOT EXISTS balance (
    id INTEGER PRIMARY KEY,
    account_id INTEGER NOT NULL UNIQUE,
    amount REAL NOT NULL DEFAULT 0.0,
    timestamp TEXT NOT NULL,
    FOREIGN KEY (account_id) REFERENCES accounts(id)
);

CREATE TABLE IF NOT EXISTS irregular_categories (
    id INTEGER PRIMARY KEY,
    account_id INTEGER NOT NULL,
    name TEXT NOT NULL UNIQUE,
    active INTEGER DEFAULT 1,
    window_days INTEGER DEFAULT 120,
    alpha REAL DEFAULT 0.3,
    safety_quantile REAL DEFAULT 0.8,
    created_at TEXT DEFAULT (datetime('now')),
    updated_at TEXT DEFAULT (datetime('now')),
    FOREIGN KEY (account_id) REFERENCES accounts(id)
);

CREATE TABLE IF NOT EXISTS irregular_state (
    id INTEGER PRIMARY KEY,
    category_id INTEGER NOT NULL UNIQUE,
    avg_gap_days REAL,
    weekday_probs TEXT,
    amount_mu REAL,
    amount_sigma REAL,
    median_amount REAL,
    last_event_at TEXT,
    updated_at TEXT DEFAULT (datetime('now')),
    FOREIGN KEY (category_id) REFERENCES irregular_categories(id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS irregular_rules (
    id INTEGER PRIMARY KEY,
    category_id INTEGER NOT NULL,
    account_id INTEGER NOT NULL,
    pattern TEXT NOT NULL,
    active INTEGER DEFAULT 1,
    FOREIGN KEY (category_id) REFERENCES irregular_categories(id) ON DELETE CASCADE,
    FOREIGN KEY (account_id) REFERENCES accounts(id)
);
CREATE INDEX IF NOT EXISTS ix_irregular_rules_category_pattern ON irregular_rules(category_id, pattern);
";

pub const DEFAULT_ACCOUNT: &str = "Default";

pub fn get_connection(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open(db_path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;

    let count: i64 = conn.query_row("SELECT count(*) FROM accounts", [], |row| row.get(0))?;
    if count == 0 {
        conn.execute(
            "INSERT INTO accounts (name, account_type) VALUES (?1, 'checking')",
            [DEFAULT_ACCOUNT],
        )?;
    }
    Ok(())
}
