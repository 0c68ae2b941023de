use chrono::NaiveDate;
use models::{Account, AccountOverview, OkOverview, Snapshot};
use serde::Serialize;
use std::collections::HashMap;

use crate::error::{EngineError, Result};
use crate::status::{classify, BudgetStatus};

pub fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// `|spent| / budget * 100`, or 0 for a zero budget.
pub fn utilization(spent: f64, budget: f64) -> f64 {
    if budget == 0.0 {
        0.0
    } else {
        spent.abs() / budget * 100.0
    }
}

#[derive(Default)]
struct BookingTotals {
    sum: f64,
    count: usize,
    first: Option<NaiveDate>,
    last: Option<NaiveDate>,
}

/// Derives the `v_ok_overview` rows from raw tables, in object-credit order.
pub fn ok_overviews(snapshot: &Snapshot) -> Result<Vec<OkOverview>> {
    let accounts: HashMap<&str, &Account> = snapshot
        .accounts
        .iter()
        .map(|a| (a.id.as_str(), a))
        .collect();

    let mut totals: HashMap<&str, BookingTotals> = HashMap::new();
    for booking in &snapshot.bookings {
        let entry = totals.entry(booking.ok_id.as_str()).or_default();
        entry.sum += booking.amount;
        entry.count += 1;
        entry.first = Some(entry.first.map_or(booking.booking_date, |d| d.min(booking.booking_date)));
        entry.last = Some(entry.last.map_or(booking.booking_date, |d| d.max(booking.booking_date)));
    }

    snapshot
        .object_credits
        .iter()
        .map(|credit| -> Result<OkOverview> {
            let account = accounts.get(credit.account_id.as_str()).ok_or_else(|| {
                EngineError::UnknownAccount {
                    ok_nr: credit.ok_nr.clone(),
                    account_id: credit.account_id.clone(),
                }
            })?;
            let t = totals.remove(credit.id.as_str()).unwrap_or_default();
            let spent = round2(t.sum);

            Ok(OkOverview {
                ok_id: credit.id.clone(),
                ok_nr: credit.ok_nr.clone(),
                title: credit.title.clone(),
                budget_total: credit.budget_total,
                spent,
                available: round2(credit.budget_total - spent.abs()),
                booking_count: t.count,
                first_booking: t.first,
                last_booking: t.last,
                account_id: account.id.clone(),
                konto_nr: account.konto_nr.clone(),
                account_name: account.name.clone(),
            })
        })
        .collect()
}

/// Derives the `v_account_overview` rows. Accounts without credits get zero totals.
pub fn account_overviews(accounts: &[Account], oks: &[OkOverview]) -> Vec<AccountOverview> {
    accounts
        .iter()
        .map(|account| {
            let owned: Vec<&OkOverview> = oks.iter().filter(|ok| ok.account_id == account.id).collect();
            let total_budget: f64 = owned.iter().map(|ok| ok.budget_total).sum();
            let total_spent: f64 = owned.iter().map(|ok| ok.spent.abs()).sum();
            let total_available: f64 = owned.iter().map(|ok| ok.available).sum();

            AccountOverview {
                account_id: account.id.clone(),
                konto_nr: account.konto_nr.clone(),
                account_name: account.name.clone(),
                ok_count: owned.len(),
                total_budget: round2(total_budget),
                total_spent: round2(total_spent),
                total_available: round2(total_available),
            }
        })
        .collect()
}

/// Konto-level totals re-derived from the credits of one account.
pub fn account_rollup(oks: &[OkOverview]) -> Option<AccountOverview> {
    let first = oks.first()?;
    Some(AccountOverview {
        account_id: first.account_id.clone(),
        konto_nr: first.konto_nr.clone(),
        account_name: first.account_name.clone(),
        ok_count: oks.len(),
        total_budget: round2(oks.iter().map(|ok| ok.budget_total).sum()),
        total_spent: round2(oks.iter().map(|ok| ok.spent.abs()).sum()),
        total_available: round2(oks.iter().map(|ok| ok.available).sum()),
    })
}

/// An OK as shown to users: `spent` is always non-negative here.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OkRow {
    pub ok_id: String,
    pub ok_nr: String,
    pub title: String,
    pub budget_total: f64,
    pub spent: f64,
    pub available: f64,
    pub booking_count: usize,
    pub first_booking: Option<NaiveDate>,
    pub last_booking: Option<NaiveDate>,
    pub account_id: String,
    pub konto_nr: String,
    pub account_name: String,
    pub status: BudgetStatus,
    pub available_percentage: f64,
    pub utilization: f64,
}

impl From<&OkOverview> for OkRow {
    fn from(ok: &OkOverview) -> Self {
        let info = classify(ok.available, ok.budget_total);
        OkRow {
            ok_id: ok.ok_id.clone(),
            ok_nr: ok.ok_nr.clone(),
            title: ok.title.clone(),
            budget_total: ok.budget_total,
            spent: ok.spent.abs(),
            available: ok.available,
            booking_count: ok.booking_count,
            first_booking: ok.first_booking,
            last_booking: ok.last_booking,
            account_id: ok.account_id.clone(),
            konto_nr: ok.konto_nr.clone(),
            account_name: ok.account_name.clone(),
            status: info.status,
            available_percentage: info.percentage,
            utilization: utilization(ok.spent, ok.budget_total),
        }
    }
}

pub fn to_rows(oks: &[OkOverview]) -> Vec<OkRow> {
    oks.iter().map(OkRow::from).collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccountSpend {
    pub konto_nr: String,
    pub account_name: String,
    pub spent: f64,
    pub budget: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UtilizationBucket {
    pub range: &'static str,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortfolioSummary {
    pub total_budget: f64,
    pub total_spent: f64,
    pub total_available: f64,
    pub average_utilization: f64,
    pub healthy_count: usize,
    pub warning_count: usize,
    pub critical_count: usize,
    pub top_accounts: Vec<AccountSpend>,
    pub utilization_distribution: Vec<UtilizationBucket>,
}

const TOP_ACCOUNTS: usize = 5;

pub fn portfolio_summary(oks: &[OkOverview], accounts: &[AccountOverview]) -> PortfolioSummary {
    let total_budget: f64 = oks.iter().map(|ok| ok.budget_total).sum();
    let total_spent: f64 = oks.iter().map(|ok| ok.spent.abs()).sum();

    let mut healthy_count = 0;
    let mut warning_count = 0;
    let mut critical_count = 0;
    let mut buckets = [0usize; 4];
    for ok in oks {
        match classify(ok.available, ok.budget_total).status {
            BudgetStatus::Healthy => healthy_count += 1,
            BudgetStatus::Warning => warning_count += 1,
            BudgetStatus::Critical => critical_count += 1,
        }
        let util = utilization(ok.spent, ok.budget_total);
        let idx = if util <= 25.0 {
            0
        } else if util <= 50.0 {
            1
        } else if util <= 75.0 {
            2
        } else {
            3
        };
        buckets[idx] += 1;
    }

    let mut ranked: Vec<&AccountOverview> = accounts.iter().collect();
    ranked.sort_by(|a, b| b.total_spent.total_cmp(&a.total_spent));
    let top_accounts = ranked
        .into_iter()
        .take(TOP_ACCOUNTS)
        .map(|acc| AccountSpend {
            konto_nr: acc.konto_nr.clone(),
            account_name: acc.account_name.clone(),
            spent: acc.total_spent,
            budget: acc.total_budget,
        })
        .collect();

    let ranges = ["0-25%", "25-50%", "50-75%", "75-100%"];
    PortfolioSummary {
        total_budget: round2(total_budget),
        total_spent: round2(total_spent),
        total_available: round2(total_budget - total_spent),
        average_utilization: utilization(total_spent, total_budget),
        healthy_count,
        warning_count,
        critical_count,
        top_accounts,
        utilization_distribution: ranges
            .into_iter()
            .zip(buckets)
            .map(|(range, count)| UtilizationBucket { range, count })
            .collect(),
    }
}
