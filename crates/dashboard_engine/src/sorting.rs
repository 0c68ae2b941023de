use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::aggregation::OkRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    #[default]
    OkNr,
    Title,
    KontoNr,
    AccountName,
    BudgetTotal,
    Spent,
    Available,
    FirstBooking,
    LastBooking,
    BookingCount,
    Utilization,
}

impl SortKey {
    pub const ALL: [SortKey; 11] = [
        SortKey::OkNr,
        SortKey::Title,
        SortKey::KontoNr,
        SortKey::AccountName,
        SortKey::BudgetTotal,
        SortKey::Spent,
        SortKey::Available,
        SortKey::FirstBooking,
        SortKey::LastBooking,
        SortKey::BookingCount,
        SortKey::Utilization,
    ];

    /// Value used for the `Sortierung` query parameter.
    pub fn param(&self) -> &'static str {
        match self {
            SortKey::OkNr => "OK",
            SortKey::Title => "Titel",
            SortKey::KontoNr => "Konto",
            SortKey::AccountName => "Kontoname",
            SortKey::BudgetTotal => "Budget",
            SortKey::Spent => "Verbraucht",
            SortKey::Available => "Verfuegbar",
            SortKey::FirstBooking => "Datum",
            SortKey::LastBooking => "Letzte",
            SortKey::BookingCount => "Buchungen",
            SortKey::Utilization => "Auslastung",
        }
    }

    pub fn from_param(value: &str) -> Option<SortKey> {
        SortKey::ALL.into_iter().find(|k| k.param() == value)
    }

    pub fn compare(&self, a: &OkRow, b: &OkRow) -> Ordering {
        match self {
            SortKey::OkNr => cmp_text(&a.ok_nr, &b.ok_nr),
            SortKey::Title => cmp_text(&a.title, &b.title),
            SortKey::KontoNr => cmp_text(&a.konto_nr, &b.konto_nr),
            SortKey::AccountName => cmp_text(&a.account_name, &b.account_name),
            SortKey::BudgetTotal => a.budget_total.total_cmp(&b.budget_total),
            SortKey::Spent => a.spent.total_cmp(&b.spent),
            SortKey::Available => a.available.total_cmp(&b.available),
            // rows without bookings sort before any date
            SortKey::FirstBooking => a.first_booking.cmp(&b.first_booking),
            SortKey::LastBooking => a.last_booking.cmp(&b.last_booking),
            SortKey::BookingCount => a.booking_count.cmp(&b.booking_count),
            SortKey::Utilization => a.utilization.total_cmp(&b.utilization),
        }
    }
}

fn cmp_text(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn param(&self) -> &'static str {
        match self {
            SortOrder::Asc => "auf",
            SortOrder::Desc => "ab",
        }
    }

    pub fn from_param(value: &str) -> Option<SortOrder> {
        match value {
            "auf" => Some(SortOrder::Asc),
            "ab" => Some(SortOrder::Desc),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SortState {
    pub key: SortKey,
    pub order: SortOrder,
}

impl SortState {
    pub fn new(key: SortKey, order: SortOrder) -> Self {
        Self { key, order }
    }
}

/// Stable single-key sort. Ties keep their input order in both directions.
pub fn sort_rows(rows: &mut [OkRow], sort: SortState) {
    rows.sort_by(|a, b| {
        let ord = sort.key.compare(a, b);
        match sort.order {
            SortOrder::Asc => ord,
            SortOrder::Desc => ord.reverse(),
        }
    });
}
