use std::path::Path;

use chrono::Duration;
use comfy_table::{Cell, Table};

use crate::cli::{parse_date_opt, today, Context, ModeArg};
use crate::error::Result;
use crate::fmt::{money, optional};
use crate::forecaster::{forecast as run_forecast, Forecast};
use crate::learner::learn_state;
use crate::recurrence::add_months;
use crate::store;

const WEEKDAYS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

pub fn category(db: Option<&Path>, account: Option<&str>, name: &str, window_days: i64, alpha: f64) -> Result<()> {
    let ctx = Context::open(db, account)?;
    let id = store::add_category(&ctx.conn, ctx.account_id, name, window_days, alpha)?;
    println!("Added irregular category #{id}: {name}");
    Ok(())
}

pub fn rule(db: Option<&Path>, account: Option<&str>, category: &str, pattern: &str) -> Result<()> {
    let ctx = Context::open(db, account)?;
    let cat = store::category_by_name(&ctx.conn, ctx.account_id, category)?;
    store::add_rule(&ctx.conn, cat.id, pattern)?;
    println!("Added rule: '{pattern}' \u{2192} {}", cat.name);
    Ok(())
}

pub fn list(db: Option<&Path>, account: Option<&str>) -> Result<()> {
    let ctx = Context::open(db, account)?;

    let mut table = Table::new();
    table.set_header(vec!["ID", "Name", "Active", "Rules", "Avg gap", "Median", "Peak day", "Last event"]);
    for cat in store::categories(&ctx.conn, ctx.account_id)? {
        let rules = store::rules_for(&ctx.conn, cat.id)?.join(", ");
        let state = store::state(&ctx.conn, cat.id)?.unwrap_or_default();
        table.add_row(vec![
            Cell::new(cat.id),
            Cell::new(&cat.name),
            Cell::new(if cat.active { "yes" } else { "no" }),
            Cell::new(rules),
            Cell::new(optional(state.avg_gap_days.map(|g| format!("{g:.1}d")))),
            Cell::new(optional(state.median_amount.map(money))),
            Cell::new(optional(state.peak_weekday().map(|w| WEEKDAYS[w as usize]))),
            Cell::new(optional(state.last_event_at.map(|ts| ts.date()))),
        ]);
    }
    println!("Irregular categories ({})\n{table}", ctx.account);
    Ok(())
}

pub fn learn(
    db: Option<&Path>,
    account: Option<&str>,
    category: &str,
    from_date: Option<&str>,
    to_date: Option<&str>,
) -> Result<()> {
    let ctx = Context::open(db, account)?;
    let cat = store::category_by_name(&ctx.conn, ctx.account_id, category)?;
    let end = parse_date_opt(to_date)?.unwrap_or_else(today);
    let start = parse_date_opt(from_date)?.unwrap_or(end - Duration::days(cat.window_days));

    let state = learn_state(&ctx.conn, cat.id, start, end)?;
    println!("Learned \u{2018}{}\u{2019} from {start} to {end}", cat.name);
    println!("  Avg gap:    {}", optional(state.avg_gap_days.map(|g| format!("{g:.2} days"))));
    println!("  Median:     {}", optional(state.median_amount.map(money)));
    println!("  Peak day:   {}", optional(state.peak_weekday().map(|w| WEEKDAYS[w as usize])));
    println!(
        "  Log-normal: {}",
        if state.has_lognormal() {
            format!(
                "mu={:.3} sigma={:.3}",
                state.amount_mu.unwrap_or_default(),
                state.amount_sigma.unwrap_or_default()
            )
        } else {
            "not enough history".to_string()
        }
    );
    println!("  Last event: {}", optional(state.last_event_at.map(|ts| ts.date())));
    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub fn forecast(
    db: Option<&Path>,
    account: Option<&str>,
    category: &str,
    from_date: Option<&str>,
    to_date: Option<&str>,
    mode: Option<ModeArg>,
    paths: Option<usize>,
    seed: Option<u64>,
) -> Result<()> {
    let ctx = Context::open(db, account)?;
    let config = ctx.config_with(mode, seed, paths);
    let cat = store::category_by_name(&ctx.conn, ctx.account_id, category)?;
    let start = parse_date_opt(from_date)?.unwrap_or_else(today);
    let end = parse_date_opt(to_date)?.unwrap_or_else(|| add_months(start, 3));

    let result = run_forecast(&ctx.conn, cat.id, start, end, config.forecast_mode, &config.monte_carlo)?;
    if result.is_empty() {
        println!("Not enough history to forecast \u{2018}{}\u{2019} yet.", cat.name);
        return Ok(());
    }

    let mut table = Table::new();
    match &result {
        Forecast::Deterministic(series) => {
            table.set_header(vec!["Date", "Amount"]);
            for (date, amount) in series {
                table.add_row(vec![Cell::new(date), Cell::new(money(*amount))]);
            }
            let total: f64 = series.iter().map(|(_, a)| a).sum();
            table.add_row(vec![Cell::new("Total"), Cell::new(money(total))]);
        }
        Forecast::MonteCarlo(bands) => {
            table.set_header(vec!["Date", "p50", "p80", "p90"]);
            let rows = bands.p50.iter().zip(&bands.p80).zip(&bands.p90);
            for (((date, p50), (_, p80)), (_, p90)) in rows {
                if *p90 == 0.0 {
                    continue;
                }
                table.add_row(vec![
                    Cell::new(date),
                    Cell::new(money(*p50)),
                    Cell::new(money(*p80)),
                    Cell::new(money(*p90)),
                ]);
            }
            let totals = [&bands.p50, &bands.p80, &bands.p90]
                .map(|series| series.iter().map(|(_, a)| a).sum::<f64>());
            table.add_row(vec![
                Cell::new("Total"),
                Cell::new(money(totals[0])),
                Cell::new(money(totals[1])),
                Cell::new(money(totals[2])),
            ]);
        }
    }
    println!("Forecast for \u{2018}{}\u{2019} ({start} to {end})\n{table}", cat.name);
    Ok(())
}
