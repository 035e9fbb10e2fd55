use std::path::Path;

use crate::cli::{parse_timestamp, Context};
use crate::error::Result;
use crate::fmt::money;
use crate::store;

pub fn set(db: Option<&Path>, account: Option<&str>, amount: f64, at: Option<&str>) -> Result<()> {
    let ctx = Context::open(db, account)?;
    let timestamp = match at {
        Some(s) => parse_timestamp(s)?,
        None => chrono::Local::now().naive_local(),
    };
    store::set_balance(&ctx.conn, ctx.account_id, amount, timestamp)?;
    println!("Balance of {} set to {} at {}", ctx.account, money(amount), timestamp.format("%Y-%m-%d %H:%M"));
    Ok(())
}

pub fn show(db: Option<&Path>, account: Option<&str>) -> Result<()> {
    let ctx = Context::open(db, account)?;
    match store::balance(&ctx.conn, ctx.account_id)? {
        Some(snap) => println!(
            "{}: {} as of {}",
            ctx.account,
            money(snap.amount),
            snap.timestamp.format("%Y-%m-%d %H:%M")
        ),
        None => println!("{}: no balance set. Use `runway balance set`.", ctx.account),
    }
    Ok(())
}
