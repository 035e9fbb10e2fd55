use chrono::{Datelike, Duration, NaiveDate};

use crate::models::Frequency;

pub fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|first| first.pred_opt())
        .map(|last| last.day())
        .unwrap_or(28)
}

pub fn is_month_end(date: NaiveDate) -> bool {
    date.day() == days_in_month(date.year(), date.month())
}

/// Shift by `months`, keeping the day of month but clamping it to the target month.
pub fn add_months(date: NaiveDate, months: i32) -> NaiveDate {
    let index = date.year() * 12 + date.month0() as i32 + months;
    let year = index.div_euclid(12);
    let month = index.rem_euclid(12) as u32 + 1;
    let day = date.day().min(days_in_month(year, month));
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or(date)
}

/// Whole months from `a` to `b`; negative when `b` precedes `a`.
pub fn months_between(a: NaiveDate, b: NaiveDate) -> i32 {
    let mut months = (b.year() - a.year()) * 12 + b.month() as i32 - a.month() as i32;
    if b.day() < a.day() {
        months -= 1;
    }
    months
}

/// The `k`-th monthly step from `anchor`. Month-end anchors stay on month end.
fn month_step(anchor: NaiveDate, k: i32) -> NaiveDate {
    let shifted = add_months(anchor, k);
    if is_month_end(anchor) {
        let last = days_in_month(shifted.year(), shifted.month());
        shifted.with_day(last).unwrap_or(shifted)
    } else {
        shifted
    }
}

/// Every date in `[start, end]` on which a schedule anchored at `anchor` fires.
///
/// Inclusive on both ends, sorted, and never earlier than the anchor itself.
pub fn occurrences_between(
    anchor: NaiveDate,
    frequency: Frequency,
    start: NaiveDate,
    end: NaiveDate,
) -> Vec<NaiveDate> {
    if start > end {
        return Vec::new();
    }
    if let Some(step) = frequency.day_stride() {
        return stride_series(anchor, start, end, step);
    }
    if let Some(step) = frequency.month_stride() {
        return month_series(anchor, start, end, step);
    }
    semi_monthly_series(anchor, start, end)
}

fn stride_series(anchor: NaiveDate, start: NaiveDate, end: NaiveDate, step: i64) -> Vec<NaiveDate> {
    let offset = (start - anchor).num_days();
    let k = offset.div_euclid(step).max(0);
    let mut date = anchor + Duration::days(k * step);
    if date < start {
        date += Duration::days(step);
    }
    let mut out = Vec::new();
    while date <= end {
        out.push(date);
        date += Duration::days(step);
    }
    out
}

fn month_series(anchor: NaiveDate, start: NaiveDate, end: NaiveDate, step: i32) -> Vec<NaiveDate> {
    let behind = months_between(anchor, start).max(0);
    // round up to the cadence so quarterly/annual never land off-cycle
    let mut k = (behind + step - 1) / step * step;
    let mut date = month_step(anchor, k);
    while date < start {
        k += step;
        date = month_step(anchor, k);
    }
    let mut out = Vec::new();
    while date <= end {
        out.push(date);
        k += step;
        date = month_step(anchor, k);
    }
    out
}

fn semi_monthly_series(anchor: NaiveDate, start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    let from = start.max(anchor);
    let mut month = NaiveDate::from_ymd_opt(from.year(), from.month(), 1).unwrap_or(from);
    let mut out = Vec::new();
    while month <= end {
        let last = days_in_month(month.year(), month.month());
        for day in [1, 15.min(last)] {
            if let Some(date) = month.with_day(day) {
                if date >= from && date <= end {
                    out.push(date);
                }
            }
        }
        month = add_months(month, 1);
    }
    out
}

/// Widest possible gap between two consecutive occurrences.
fn max_gap_days(frequency: Frequency) -> i64 {
    match frequency {
        Frequency::SemiMonthly => 31,
        f => f
            .day_stride()
            .or_else(|| f.month_stride().map(|m| m as i64 * 31 + 1))
            .unwrap_or(366),
    }
}

/// First occurrence on or after `target`.
pub fn next_occurrence_on_or_after(
    anchor: NaiveDate,
    frequency: Frequency,
    target: NaiveDate,
) -> Option<NaiveDate> {
    let end = target.max(anchor) + Duration::days(max_gap_days(frequency));
    occurrences_between(anchor, frequency, target, end)
        .into_iter()
        .next()
}

/// Last occurrence on or before `target`; `None` before the anchor.
pub fn previous_occurrence_on_or_before(
    anchor: NaiveDate,
    frequency: Frequency,
    target: NaiveDate,
) -> Option<NaiveDate> {
    if target < anchor {
        return None;
    }
    let start = target - Duration::days(max_gap_days(frequency));
    occurrences_between(anchor, frequency, start, target)
        .into_iter()
        .last()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_add_months_clamps_day() {
        assert_eq!(add_months(d(2023, 1, 31), 1), d(2023, 2, 28));
        assert_eq!(add_months(d(2024, 1, 31), 1), d(2024, 2, 29));
        assert_eq!(add_months(d(2023, 11, 15), 3), d(2024, 2, 15));
        assert_eq!(add_months(d(2023, 3, 10), -4), d(2022, 11, 10));
    }

    #[test]
    fn test_months_between() {
        assert_eq!(months_between(d(2023, 1, 15), d(2023, 4, 15)), 3);
        assert_eq!(months_between(d(2023, 1, 15), d(2023, 4, 14)), 2);
        assert_eq!(months_between(d(2023, 4, 15), d(2023, 1, 15)), -3);
    }

    #[test]
    fn test_weekly_from_anchor() {
        let dates = occurrences_between(d(2023, 1, 1), Frequency::Weekly, d(2023, 1, 1), d(2023, 1, 22));
        assert_eq!(dates, vec![d(2023, 1, 1), d(2023, 1, 8), d(2023, 1, 15), d(2023, 1, 22)]);
    }

    #[test]
    fn test_biweekly_window_starts_mid_cycle() {
        let dates = occurrences_between(d(2023, 1, 1), Frequency::Biweekly, d(2023, 1, 10), d(2023, 2, 20));
        assert_eq!(dates, vec![d(2023, 1, 15), d(2023, 1, 29), d(2023, 2, 12)]);
    }

    #[test]
    fn test_nothing_before_anchor() {
        let dates = occurrences_between(d(2023, 3, 1), Frequency::Weekly, d(2023, 1, 1), d(2023, 3, 8));
        assert_eq!(dates, vec![d(2023, 3, 1), d(2023, 3, 8)]);
        let dates = occurrences_between(d(2023, 3, 1), Frequency::Monthly, d(2023, 1, 1), d(2023, 4, 30));
        assert_eq!(dates, vec![d(2023, 3, 1), d(2023, 4, 1)]);
    }

    #[test]
    fn test_month_end_anchor_is_sticky() {
        let dates = occurrences_between(d(2023, 1, 31), Frequency::Monthly, d(2023, 1, 1), d(2023, 5, 31));
        assert_eq!(
            dates,
            vec![d(2023, 1, 31), d(2023, 2, 28), d(2023, 3, 31), d(2023, 4, 30), d(2023, 5, 31)]
        );
        // a 30th that is month end follows month end, not day 30
        let dates = occurrences_between(d(2023, 4, 30), Frequency::Monthly, d(2023, 5, 1), d(2023, 7, 31));
        assert_eq!(dates, vec![d(2023, 5, 31), d(2023, 6, 30), d(2023, 7, 31)]);
    }

    #[test]
    fn test_mid_month_anchor_clamps_without_drift() {
        let dates = occurrences_between(d(2023, 1, 30), Frequency::Monthly, d(2023, 1, 1), d(2023, 4, 30));
        assert_eq!(dates, vec![d(2023, 1, 30), d(2023, 2, 28), d(2023, 3, 30), d(2023, 4, 30)]);
    }

    #[test]
    fn test_quarterly_stays_on_cycle() {
        let dates = occurrences_between(d(2023, 1, 15), Frequency::Quarterly, d(2023, 2, 1), d(2024, 1, 31));
        assert_eq!(dates, vec![d(2023, 4, 15), d(2023, 7, 15), d(2023, 10, 15), d(2024, 1, 15)]);
    }

    #[test]
    fn test_semi_annual_and_annual() {
        let semi = occurrences_between(d(2022, 8, 31), Frequency::SemiAnnual, d(2023, 1, 1), d(2023, 12, 31));
        assert_eq!(semi, vec![d(2023, 2, 28), d(2023, 8, 31)]);
        let annual = occurrences_between(d(2020, 2, 29), Frequency::Annual, d(2021, 1, 1), d(2024, 12, 31));
        assert_eq!(annual, vec![d(2021, 2, 28), d(2022, 2, 28), d(2023, 2, 28), d(2024, 2, 29)]);
    }

    #[test]
    fn test_semi_monthly_ignores_anchor_day() {
        let dates = occurrences_between(d(2023, 1, 7), Frequency::SemiMonthly, d(2023, 1, 1), d(2023, 3, 1));
        assert_eq!(dates, vec![d(2023, 1, 15), d(2023, 2, 1), d(2023, 2, 15), d(2023, 3, 1)]);
    }

    #[test]
    fn test_semi_monthly_never_fires_before_anchor() {
        let dates = occurrences_between(d(2023, 3, 10), Frequency::SemiMonthly, d(2023, 1, 1), d(2023, 4, 30));
        assert_eq!(dates, vec![d(2023, 3, 15), d(2023, 4, 1), d(2023, 4, 15)]);
        assert!(occurrences_between(d(2023, 3, 10), Frequency::SemiMonthly, d(2023, 1, 1), d(2023, 3, 9)).is_empty());
    }

    #[test]
    fn test_empty_when_start_after_end() {
        for freq in Frequency::ALL {
            assert!(occurrences_between(d(2023, 1, 1), freq, d(2023, 5, 1), d(2023, 4, 1)).is_empty());
        }
    }

    #[test]
    fn test_occurrences_are_pure_sorted_and_bounded() {
        let start = d(2023, 2, 3);
        let end = d(2025, 7, 19);
        for freq in Frequency::ALL {
            let first = occurrences_between(d(2022, 12, 31), freq, start, end);
            let second = occurrences_between(d(2022, 12, 31), freq, start, end);
            assert_eq!(first, second);
            assert!(!first.is_empty());
            assert!(first.windows(2).all(|w| w[0] < w[1]), "{freq} not increasing");
            assert!(first.iter().all(|x| *x >= start && *x <= end), "{freq} out of window");
        }
    }

    #[test]
    fn test_snapping_queries() {
        let anchor = d(2023, 1, 31);
        assert_eq!(next_occurrence_on_or_after(anchor, Frequency::Monthly, d(2023, 3, 1)), Some(d(2023, 3, 31)));
        assert_eq!(next_occurrence_on_or_after(anchor, Frequency::Monthly, d(2023, 3, 31)), Some(d(2023, 3, 31)));
        assert_eq!(next_occurrence_on_or_after(anchor, Frequency::Monthly, d(2022, 6, 1)), Some(anchor));
        assert_eq!(previous_occurrence_on_or_before(anchor, Frequency::Monthly, d(2023, 3, 30)), Some(d(2023, 2, 28)));
        assert_eq!(previous_occurrence_on_or_before(anchor, Frequency::Monthly, d(2023, 1, 30)), None);
        assert_eq!(
            previous_occurrence_on_or_before(d(2023, 1, 1), Frequency::Annual, d(2025, 6, 1)),
            Some(d(2025, 1, 1))
        );
    }
}
