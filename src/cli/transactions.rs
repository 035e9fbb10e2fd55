use std::path::Path;

use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::cli::{parse_date_opt, parse_timestamp, Context};
use crate::error::Result;
use crate::fmt::signed_money;
use crate::learner::record_transaction;
use crate::models::PostedTransaction;
use crate::store;

pub fn add(db: Option<&Path>, account: Option<&str>, description: &str, amount: f64, date: Option<&str>) -> Result<()> {
    let ctx = Context::open(db, account)?;
    let timestamp = match date {
        Some(s) => parse_timestamp(s)?,
        None => chrono::Local::now().naive_local(),
    };
    let txn = PostedTransaction {
        id: None,
        account_id: ctx.account_id,
        description: description.to_string(),
        amount,
        timestamp,
    };
    let (id, observed) = record_transaction(&ctx.conn, &txn)?;
    println!("Recorded #{id}: {description} {}", signed_money(amount));
    if let Some(observed) = observed {
        println!("{}", format!("Updated \u{2018}{}\u{2019}", observed.category).green());
    }
    Ok(())
}

pub fn list(db: Option<&Path>, account: Option<&str>, from_date: Option<&str>, to_date: Option<&str>) -> Result<()> {
    let ctx = Context::open(db, account)?;
    let from = parse_date_opt(from_date)?;
    let to = parse_date_opt(to_date)?;
    let txns: Vec<_> = store::transactions(&ctx.conn, ctx.account_id)?
        .into_iter()
        .filter(|t| from.map_or(true, |f| t.timestamp.date() >= f))
        .filter(|t| to.map_or(true, |e| t.timestamp.date() <= e))
        .collect();

    let mut table = Table::new();
    table.set_header(vec!["ID", "When", "Description", "Amount"]);
    for txn in &txns {
        table.add_row(vec![
            Cell::new(txn.id.unwrap_or_default()),
            Cell::new(txn.timestamp.format("%Y-%m-%d %H:%M")),
            Cell::new(&txn.description),
            Cell::new(signed_money(txn.amount)),
        ]);
    }
    println!("Transactions ({})\n{table}", ctx.account);
    Ok(())
}

pub fn delete(db: Option<&Path>, account: Option<&str>, id: i64) -> Result<()> {
    let ctx = Context::open(db, account)?;
    store::delete_transaction(&ctx.conn, ctx.account_id, id)?;
    println!("Deleted transaction #{id}");
    Ok(())
}
