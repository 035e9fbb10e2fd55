use std::path::Path;

use comfy_table::{Cell, Table};

use crate::cli::{parse_timestamp, today, Context};
use crate::error::Result;
use crate::fmt::{optional, signed_money};
use crate::models::Frequency;
use crate::recurrence::{next_occurrence_on_or_after, previous_occurrence_on_or_before};
use crate::store;

pub fn add(
    db: Option<&Path>,
    account: Option<&str>,
    description: &str,
    amount: f64,
    start: &str,
    frequency: &str,
    income: bool,
) -> Result<()> {
    let ctx = Context::open(db, account)?;
    let frequency: Frequency = frequency.parse()?;
    let start = parse_timestamp(start)?;
    let id = store::add_recurring(&ctx.conn, ctx.account_id, description, amount, start, frequency, income)?;
    println!("Added recurring #{id}: {description} ({frequency})");
    Ok(())
}

pub fn list(db: Option<&Path>, account: Option<&str>) -> Result<()> {
    let ctx = Context::open(db, account)?;
    let today = today();

    let mut table = Table::new();
    table.set_header(vec!["ID", "Description", "Kind", "Amount", "Frequency", "Last", "Next due"]);
    for schedule in store::recurring(&ctx.conn, ctx.account_id)? {
        let anchor = schedule.start.date();
        let last = today.pred_opt().and_then(|d| previous_occurrence_on_or_before(anchor, schedule.frequency, d));
        let next = next_occurrence_on_or_after(anchor, schedule.frequency, today);
        table.add_row(vec![
            Cell::new(schedule.id.unwrap_or_default()),
            Cell::new(&schedule.description),
            Cell::new(if schedule.is_income() { "income" } else { "bill" }),
            Cell::new(signed_money(schedule.amount)),
            Cell::new(schedule.frequency),
            Cell::new(optional(last)),
            Cell::new(optional(next)),
        ]);
    }
    println!("Recurring ({})\n{table}", ctx.account);
    Ok(())
}

pub fn delete(db: Option<&Path>, account: Option<&str>, id: i64) -> Result<()> {
    let ctx = Context::open(db, account)?;
    store::delete_recurring(&ctx.conn, ctx.account_id, id)?;
    println!("Deleted recurring #{id}");
    Ok(())
}
