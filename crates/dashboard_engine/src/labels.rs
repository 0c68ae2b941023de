//! de-CH date labels used for grouping, filtering and treemap buckets.

use chrono::{Datelike, NaiveDate};

const MONTHS_LONG: [&str; 12] = [
    "Januar", "Februar", "März", "April", "Mai", "Juni", "Juli", "August", "September", "Oktober",
    "November", "Dezember",
];

const MONTHS_SHORT: [&str; 12] = [
    "Jan.", "Feb.", "März", "Apr.", "Mai", "Juni", "Juli", "Aug.", "Sept.", "Okt.", "Nov.", "Dez.",
];

pub const NO_DATE: &str = "Kein Datum";

/// "März 2024"
pub fn month_year_label(date: NaiveDate) -> String {
    format!("{} {}", MONTHS_LONG[date.month0() as usize], date.year())
}

/// "Jan. 2024"
pub fn short_month_year_label(date: NaiveDate) -> String {
    format!("{} {}", MONTHS_SHORT[date.month0() as usize], date.year())
}

pub fn year_label(date: NaiveDate) -> String {
    date.year().to_string()
}
