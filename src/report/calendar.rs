use crate::util::{day_key, days_between, parse_day};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CalendarDay {
    pub date: String,
    pub value: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CalendarSeries {
    pub days: Vec<CalendarDay>,
    pub total: f64,
    /// Upper end of the value domain, shared with comparison targets.
    pub max: f64,
}

impl CalendarSeries {
    pub fn is_empty(&self) -> bool {
        self.total == 0.0
    }
}

/// Re-keys raw day values by calendar day (summing keys that fall on the
/// same day) and fills every gap between the first and last day with zero.
pub fn fill_days(raw: &BTreeMap<String, f64>) -> Vec<CalendarDay> {
    let mut by_day: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for (key, value) in raw {
        match parse_day(key) {
            Some(day) => *by_day.entry(day).or_insert(0.0) += value,
            None => tracing::debug!(key = %key, "dropping unparseable calendar key"),
        }
    }

    let (Some(first), Some(last)) = (by_day.keys().next().copied(), by_day.keys().next_back().copied())
    else {
        return Vec::new();
    };

    days_between(first, last)
        .map(|day| CalendarDay {
            date: day_key(day),
            value: by_day.get(&day).copied().unwrap_or(0.0),
        })
        .collect()
}

/// Builds the calendar series. `compare` holds the per-day values of each
/// comparison target; they only widen `max`.
pub fn normalize(raw: &BTreeMap<String, f64>, compare: &[BTreeMap<String, f64>]) -> CalendarSeries {
    let days = fill_days(raw);
    let total = days.iter().map(|d| d.value).sum();
    let max = days
        .iter()
        .map(|d| d.value)
        .chain(compare.iter().flat_map(|c| c.values().copied()))
        .fold(0.0, f64::max);
    CalendarSeries { days, total, max }
}
