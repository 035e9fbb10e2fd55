use std::path::Path;

use comfy_table::{Cell, Table};

use crate::cli::{parse_date_opt, today, Context, ModeArg};
use crate::cursor::LedgerSession;
use crate::error::Result;
use crate::fmt;

pub fn run(
    db: Option<&Path>,
    account: Option<&str>,
    from_date: Option<&str>,
    limit: usize,
    mode: Option<ModeArg>,
    seed: Option<u64>,
) -> Result<()> {
    let ctx = Context::open(db, account)?;
    let config = ctx.config_with(mode, seed, None);
    let today = today();
    let from = parse_date_opt(from_date)?.unwrap_or(today);

    let mut session = LedgerSession::open(&ctx.conn, ctx.account_id, today, config)?;
    let mut rows = Vec::with_capacity(limit);
    if let Some(row) = session.seek(from)? {
        rows.push(row.clone());
    }
    while !rows.is_empty() && rows.len() < limit {
        match session.advance_next()? {
            Some(row) => rows.push(row.clone()),
            None => break,
        }
    }
    session.close();

    if rows.is_empty() {
        println!("Nothing to show for {} from {from}.", ctx.account);
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["Date", "Description", "Amount", "Balance", "Source"]);
    for row in &rows {
        table.add_row(vec![
            Cell::new(row.date),
            Cell::new(&row.description),
            Cell::new(fmt::signed_money(row.amount)),
            Cell::new(fmt::balance(row.balance)),
            Cell::new(fmt::source(row.source)),
        ]);
    }
    println!("Ledger ({})\n{table}", ctx.account);
    Ok(())
}
