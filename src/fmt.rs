use colored::Colorize;

use crate::models::EventSource;

/// Format a float as a dollar amount with thousands separators: $1,234.56
pub fn money(val: f64) -> String {
    let negative = val < 0.0;
    let cents = format!("{:.2}", val.abs());
    let (int_part, dec_part) = cents.split_once('.').unwrap_or((cents.as_str(), "00"));

    let mut with_commas = String::new();
    for (i, c) in int_part.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            with_commas.push(',');
        }
        with_commas.push(c);
    }
    let with_commas: String = with_commas.chars().rev().collect();

    if negative && cents != "0.00" {
        format!("-${with_commas}.{dec_part}")
    } else {
        format!("${with_commas}.{dec_part}")
    }
}

/// Credits green, debits red.
pub fn signed_money(val: f64) -> String {
    if val < 0.0 {
        money(val).red().to_string()
    } else {
        money(val).green().to_string()
    }
}

/// Running balance, red once it drops below zero.
pub fn balance(val: f64) -> String {
    if val < 0.0 {
        money(val).red().bold().to_string()
    } else {
        money(val)
    }
}

pub fn source(source: EventSource) -> String {
    match source {
        EventSource::Posted => source.label().to_string(),
        EventSource::Recurring => source.label().cyan().to_string(),
        EventSource::Irregular => source.label().yellow().to_string(),
    }
}

pub fn optional<T: std::fmt::Display>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}
