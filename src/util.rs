use chrono::{DateTime, NaiveDate, Utc};

pub const DAY_FORMAT: &str = "%Y-%m-%d";

pub fn day_key(date: NaiveDate) -> String {
    date.format(DAY_FORMAT).to_string()
}

pub fn timestamp_day_key(timestamp: &DateTime<Utc>) -> String {
    day_key(timestamp.date_naive())
}

/// Parses a day-map key. Accepts `YYYY-MM-DD`, RFC 3339 timestamps and
/// anything starting with a `YYYY-MM-DD` prefix.
pub fn parse_day(key: &str) -> Option<NaiveDate> {
    let key = key.trim();
    if let Ok(date) = NaiveDate::parse_from_str(key, DAY_FORMAT) {
        return Some(date);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(key) {
        return Some(dt.with_timezone(&Utc).date_naive());
    }
    key.get(..10)
        .and_then(|prefix| NaiveDate::parse_from_str(prefix, DAY_FORMAT).ok())
}

/// Every day from `first` to `last`, both inclusive.
pub fn days_between(first: NaiveDate, last: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    first.iter_days().take_while(move |d| *d <= last)
}

/// True when `date` lies in the trailing `limit` days ending at `now`.
/// `limit: 1` means `now` only.
pub fn within_limit(date: NaiveDate, now: NaiveDate, limit: Option<u32>) -> bool {
    match limit {
        None => true,
        Some(limit) => {
            let age = (now - date).num_days();
            age >= 0 && age < i64::from(limit)
        }
    }
}
