use time::{Date, Month};

use crate::record::DateKey;
use crate::store::RecordStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrendRange {
    OneMonth,
    ThreeMonths,
    SixMonths,
    OneYear,
}

impl TrendRange {
    fn start(self, today: Date) -> Date {
        let months = match self {
            TrendRange::OneMonth => 1,
            TrendRange::ThreeMonths => 3,
            TrendRange::SixMonths => 6,
            TrendRange::OneYear => 12,
        };
        months_back(today, months)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrendPoint {
    pub date_key: DateKey,
    pub weight_kg: f64,
}

/// Morning weights within the range, in chronological order. Days without a
/// parseable positive weight are skipped. Reads the store only, never the
/// draft.
pub fn weight_series(store: &RecordStore, range: TrendRange, today: Date) -> Vec<TrendPoint> {
    let start = range.start(today);
    store
        .iter()
        .filter(|(key, _)| key.date() >= start)
        .filter_map(|(key, rec)| {
            let entry = rec.weights.morning.as_ref()?;
            let kg = entry.value.trim().parse::<f64>().ok()?;
            (kg.is_finite() && kg > 0.0).then(|| TrendPoint {
                date_key: key.clone(),
                weight_kg: kg,
            })
        })
        .collect()
}

/// Calendar-aware month subtraction, clamping the day into the shorter
/// target month (2024-03-31 minus one month is 2024-02-29).
fn months_back(date: Date, months: u32) -> Date {
    let mut year = date.year();
    let mut month = i32::from(u8::from(date.month())) - months as i32;
    while month < 1 {
        month += 12;
        year -= 1;
    }
    let month = Month::try_from(month as u8).unwrap_or(Month::January);
    let day = date.day().min(time::util::days_in_year_month(year, month));
    Date::from_calendar_date(year, month, day).unwrap_or(date)
}
