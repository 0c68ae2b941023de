use chrono::{Datelike, NaiveDate};
use models::Booking;
use serde::Serialize;

use crate::aggregation::round2;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BurnDownPoint {
    pub date: NaiveDate,
    pub budget: f64,
    pub spent: f64,
    /// `budget - spent`, negative once the budget is overrun.
    pub available: f64,
    /// `available` floored at zero, as drawn on the chart.
    pub remaining: f64,
    pub ideal_remaining: f64,
    pub percentage: f64,
}

/// Cumulative spend for one year, one point per booking plus a seed point at the first booking.
///
/// The ideal line runs linearly from the full budget on the first booking date down to zero
/// on December 31st of `year`.
pub fn project(bookings: &[Booking], budget_total: f64, year: i32) -> Vec<BurnDownPoint> {
    let mut in_year: Vec<&Booking> = bookings.iter().filter(|b| b.booking_date.year() == year).collect();
    if in_year.is_empty() {
        return Vec::new();
    }
    in_year.sort_by_key(|b| b.booking_date);

    let start = in_year[0].booking_date;
    let end = NaiveDate::from_ymd_opt(year, 12, 31).unwrap_or(start);
    let duration = (end - start).num_days() as f64;
    let ceiling = budget_total.max(0.0);

    let point = |date: NaiveDate, spent: f64| {
        let fraction = if duration <= 0.0 {
            1.0
        } else {
            ((date - start).num_days() as f64 / duration).clamp(0.0, 1.0)
        };
        let available = round2(budget_total - spent);
        BurnDownPoint {
            date,
            budget: budget_total,
            spent: round2(spent),
            available,
            remaining: available.max(0.0),
            ideal_remaining: round2((budget_total * (1.0 - fraction)).clamp(0.0, ceiling)),
            percentage: if budget_total == 0.0 {
                0.0
            } else {
                spent / budget_total * 100.0
            },
        }
    };

    let mut points = Vec::with_capacity(in_year.len() + 1);
    points.push(point(start, 0.0));

    let mut spent = 0.0;
    for booking in in_year {
        spent += booking.amount.abs();
        points.push(point(booking.booking_date, spent));
    }
    points
}

/// Distinct booking years, newest first.
pub fn available_years(bookings: &[Booking]) -> Vec<i32> {
    let mut years: Vec<i32> = bookings.iter().map(|b| b.booking_date.year()).collect();
    years.sort_unstable_by(|a, b| b.cmp(a));
    years.dedup();
    years
}

/// The requested year if it has bookings, else the current year if it has bookings,
/// else the most recent year with bookings, else the current year.
pub fn resolve_year(requested: Option<i32>, years: &[i32], today: NaiveDate) -> i32 {
    let current = today.year();
    if let Some(year) = requested.filter(|y| years.contains(y)) {
        return year;
    }
    if years.contains(&current) {
        return current;
    }
    years.first().copied().unwrap_or(current)
}
