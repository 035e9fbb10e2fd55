use chrono::{Duration, NaiveDate};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use runway::models::{BalanceSnapshot, EventSource};
use runway::projection::{LedgerEvent, Projection};

fn sample_events(days: i64, per_day: usize) -> Vec<LedgerEvent> {
    let start = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
    let mut events = Vec::with_capacity(days as usize * per_day);
    for day in 0..days {
        let date = start + Duration::days(day);
        for slot in 0..per_day {
            let ts = date.and_hms_opt(9 + slot as u32, 0, 0).unwrap();
            let (amount, source) = match slot % 3 {
                0 => (-(12.0 + (day % 40) as f64), EventSource::Posted),
                1 => (if day % 14 == 0 { 1800.0 } else { -35.0 }, EventSource::Recurring),
                _ => (-(20.0 + (day % 7) as f64), EventSource::Irregular),
            };
            events.push(LedgerEvent::new(ts, format!("event {day}-{slot}"), amount, source));
        }
    }
    events
}

fn bench_projection(c: &mut Criterion) {
    let events = sample_events(365, 3);
    let start = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
    let end = NaiveDate::from_ymd_opt(2025, 12, 31).unwrap();
    let snapshot = BalanceSnapshot {
        amount: 5_000.0,
        timestamp: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap().and_hms_opt(0, 0, 0).unwrap(),
    };

    c.bench_function("projection_build_1y_3_per_day", |b| {
        b.iter(|| {
            let projection = Projection::from_events(black_box(events.clone()), Some(snapshot), start, end);
            black_box(projection.len());
        })
    });

    let projection = Projection::from_events(events.clone(), Some(snapshot), start, end);
    let probe = snapshot.timestamp;
    c.bench_function("projection_cursor_lookup", |b| {
        b.iter(|| {
            black_box(projection.get_next(black_box(probe)));
            black_box(projection.get_prev(black_box(probe)));
        })
    });
}

criterion_group!(benches, bench_projection);
criterion_main!(benches);
