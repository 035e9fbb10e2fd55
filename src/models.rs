use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::RunwayError;

#[derive(Debug, Clone)]
pub struct Account {
    pub id: i64,
    pub name: String,
    pub account_type: String,
    pub archived: bool,
}

/// A transaction that actually happened. Positive amounts are credits.
#[derive(Debug, Clone, PartialEq)]
pub struct PostedTransaction {
    pub id: Option<i64>,
    pub account_id: i64,
    pub description: String,
    pub amount: f64,
    pub timestamp: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    Weekly,
    Biweekly,
    SemiMonthly,
    Monthly,
    Quarterly,
    SemiAnnual,
    Annual,
}

impl Frequency {
    pub const ALL: [Frequency; 7] = [
        Frequency::Weekly,
        Frequency::Biweekly,
        Frequency::SemiMonthly,
        Frequency::Monthly,
        Frequency::Quarterly,
        Frequency::SemiAnnual,
        Frequency::Annual,
    ];

    /// Stored form, also accepted by `FromStr`.
    pub fn as_str(self) -> &'static str {
        match self {
            Frequency::Weekly => "weekly",
            Frequency::Biweekly => "biweekly",
            Frequency::SemiMonthly => "semi monthly",
            Frequency::Monthly => "monthly",
            Frequency::Quarterly => "quarterly",
            Frequency::SemiAnnual => "semi annually",
            Frequency::Annual => "annually",
        }
    }

    /// Stride in days for the fixed-stride kinds.
    pub fn day_stride(self) -> Option<i64> {
        match self {
            Frequency::Weekly => Some(7),
            Frequency::Biweekly => Some(14),
            _ => None,
        }
    }

    /// Stride in months for the month-arithmetic kinds.
    pub fn month_stride(self) -> Option<i32> {
        match self {
            Frequency::Monthly => Some(1),
            Frequency::Quarterly => Some(3),
            Frequency::SemiAnnual => Some(6),
            Frequency::Annual => Some(12),
            _ => None,
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Frequency {
    type Err = RunwayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .to_lowercase()
            .chars()
            .map(|c| if c == '-' || c == '_' { ' ' } else { c })
            .collect();
        match normalized.as_str() {
            "weekly" => Ok(Frequency::Weekly),
            "biweekly" | "bi weekly" => Ok(Frequency::Biweekly),
            "semi monthly" | "semimonthly" => Ok(Frequency::SemiMonthly),
            "monthly" => Ok(Frequency::Monthly),
            "quarterly" => Ok(Frequency::Quarterly),
            "semi annually" | "semi annual" | "semiannual" => Ok(Frequency::SemiAnnual),
            "annually" | "annual" | "yearly" => Ok(Frequency::Annual),
            _ => Err(RunwayError::InvalidFrequency(s.to_string())),
        }
    }
}

/// A bill or income that repeats on a calendar cadence from `start`.
#[derive(Debug, Clone, PartialEq)]
pub struct RecurringSchedule {
    pub id: Option<i64>,
    pub account_id: i64,
    pub description: String,
    pub amount: f64,
    pub start: NaiveDateTime,
    pub frequency: Frequency,
}

impl RecurringSchedule {
    pub fn is_income(&self) -> bool {
        self.amount > 0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BalanceSnapshot {
    pub amount: f64,
    pub timestamp: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IrregularCategory {
    pub id: i64,
    pub account_id: i64,
    pub name: String,
    pub active: bool,
    pub window_days: i64,
    pub alpha: f64,
    pub safety_quantile: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IrregularRule {
    pub id: i64,
    pub category_id: i64,
    pub pattern: String,
    pub active: bool,
}

/// Learned timing and amount statistics for one irregular category.
///
/// Every field is optional: a freshly created category has an empty state, and
/// sparse history only fills part of it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IrregularState {
    pub avg_gap_days: Option<f64>,
    /// Monday-first, length 7, sums to 1.
    pub weekday_probs: Option<[f64; 7]>,
    pub amount_mu: Option<f64>,
    pub amount_sigma: Option<f64>,
    pub median_amount: Option<f64>,
    pub last_event_at: Option<NaiveDateTime>,
}

impl IrregularState {
    /// Most likely weekday as a Monday-based index.
    pub fn peak_weekday(&self) -> Option<u32> {
        let probs = self.weekday_probs.as_ref()?;
        let mut best = 0usize;
        for (i, p) in probs.iter().enumerate() {
            if *p > probs[best] {
                best = i;
            }
        }
        Some(best as u32)
    }

    pub fn has_lognormal(&self) -> bool {
        self.amount_mu.is_some() && self.amount_sigma.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventSource {
    Posted,
    Recurring,
    Irregular,
}

impl EventSource {
    pub fn label(self) -> &'static str {
        match self {
            EventSource::Posted => "posted",
            EventSource::Recurring => "recurring",
            EventSource::Irregular => "forecast",
        }
    }
}

/// One merged row of the projected ledger.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerRow {
    /// Unique, strictly increasing ordering key.
    pub timestamp: NaiveDateTime,
    pub date: NaiveDate,
    pub description: String,
    pub amount: f64,
    pub balance: f64,
    pub source: EventSource,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frequency_parses_stored_forms() {
        for freq in Frequency::ALL {
            assert_eq!(freq.as_str().parse::<Frequency>().unwrap(), freq);
        }
        assert_eq!("Semi-Monthly".parse::<Frequency>().unwrap(), Frequency::SemiMonthly);
        assert_eq!(" yearly ".parse::<Frequency>().unwrap(), Frequency::Annual);
    }

    #[test]
    fn test_frequency_rejects_typos() {
        assert!(matches!(
            "montly".parse::<Frequency>(),
            Err(RunwayError::InvalidFrequency(_))
        ));
    }

    #[test]
    fn test_peak_weekday_prefers_first_max() {
        let state = IrregularState {
            weekday_probs: Some([0.1, 0.3, 0.3, 0.1, 0.1, 0.05, 0.05]),
            ..Default::default()
        };
        assert_eq!(state.peak_weekday(), Some(1));
        assert_eq!(IrregularState::default().peak_weekday(), None);
    }
}
