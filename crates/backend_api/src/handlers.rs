use axum::{
    extract::{Path, RawQuery, State},
    response::IntoResponse,
    Json,
};
use chrono::Local;
use dashboard_engine::{
    account_rollup, apply, available_years, bookings_treemap, classify, column_options, date_options,
    oks_treemap, portfolio_summary, project, resolve_year, round2, sort_rows, to_rows, url_state, utilization,
    BurnDownPoint, Column, DateOptions, FilterState, OkRow, RowGroup, SavedViews, SortKey, SortOrder,
    SortState, StatusInfo, Treemap, ViewStore,
};
use models::{AccountOverview, Booking, OkOverview, Settings};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::{
    error::ApiError,
    repository::{BookingScope, BudgetRepository, DateOrder, ListOrder},
    Result,
};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<dyn BudgetRepository>,
    pub views: Arc<Mutex<SavedViews<Box<dyn ViewStore>>>>,
    pub settings: Arc<Settings>,
}

impl AppState {
    pub fn new(repo: Arc<dyn BudgetRepository>, view_store: Box<dyn ViewStore>, settings: Settings) -> Self {
        Self {
            repo,
            views: Arc::new(Mutex::new(SavedViews::new(view_store))),
            settings: Arc::new(settings),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BurnDownResponse {
    pub year: i32,
    pub available_years: Vec<i32>,
    pub budget_total: f64,
    pub points: Vec<BurnDownPoint>,
}

fn burn_down(bookings: &[Booking], budget_total: f64, requested_year: Option<i32>) -> BurnDownResponse {
    let years = available_years(bookings);
    let year = resolve_year(requested_year, &years, Local::now().date_naive());
    BurnDownResponse {
        year,
        points: project(bookings, budget_total, year),
        available_years: years,
        budget_total,
    }
}

/// Burn-down of the single OK the dashboard filters isolate
#[derive(Debug, Serialize)]
pub struct IsolatedOk {
    pub ok_id: String,
    pub ok_nr: String,
    pub burndown: BurnDownResponse,
}

#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    /// Canonical form of the request's filter state
    pub query: String,
    pub filters: FilterState,
    pub total_count: usize,
    pub visible_count: usize,
    pub groups: Vec<RowGroup>,
    pub treemap: Treemap,
    pub isolated: Option<IsolatedOk>,
}

/// GET /api/dashboard
/// Filtered, sorted and grouped OK table plus the charts for the visible rows
pub async fn get_dashboard(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
) -> Result<impl IntoResponse> {
    let query = query.unwrap_or_default();
    let filters = url_state::decode(&query)?;
    let year = url_state::decode_year(&query)?;

    let oks = state.repo.fetch_ok_overviews(ListOrder::ByNumber).await?;
    let rows = to_rows(&oks);
    let groups = apply(&rows, &filters);
    let visible: Vec<OkRow> = groups.iter().flat_map(|g| g.rows.iter().cloned()).collect();
    tracing::debug!("Dashboard: {} of {} credits visible", visible.len(), rows.len());

    let isolated = match filters.isolated_ok() {
        Some(ok_nr) => match rows.iter().find(|r| r.ok_nr == ok_nr) {
            Some(row) => {
                let bookings = state
                    .repo
                    .fetch_bookings(BookingScope::Ok(row.ok_id.clone()), DateOrder::OldestFirst)
                    .await?;
                Some(IsolatedOk {
                    ok_id: row.ok_id.clone(),
                    ok_nr: row.ok_nr.clone(),
                    burndown: burn_down(&bookings, row.budget_total, year),
                })
            }
            None => None,
        },
        None => None,
    };

    Ok(Json(DashboardResponse {
        query: url_state::encode(&filters),
        total_count: rows.len(),
        visible_count: visible.len(),
        treemap: oks_treemap(&visible, &state.settings.treemap),
        filters,
        groups,
        isolated,
    }))
}

#[derive(Debug, Serialize)]
pub struct OptionsResponse {
    /// Keyed by query parameter name
    pub columns: BTreeMap<&'static str, Vec<String>>,
    pub dates: DateOptions,
}

/// GET /api/dashboard/options
/// Values offered in the column filter dropdowns
pub async fn get_dashboard_options(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let oks = state.repo.fetch_ok_overviews(ListOrder::ByNumber).await?;
    let rows = to_rows(&oks);

    let columns = Column::ALL
        .into_iter()
        .filter(|c| *c != Column::BookingDate)
        .map(|c| (c.param(), column_options(&rows, c)))
        .collect();

    Ok(Json(OptionsResponse {
        columns,
        dates: date_options(&rows),
    }))
}

/// GET /api/summary
pub async fn get_summary(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let oks = state.repo.fetch_ok_overviews(ListOrder::AsStored).await?;
    let accounts = state.repo.fetch_account_overviews(ListOrder::AsStored).await?;
    Ok(Json(portfolio_summary(&oks, &accounts)))
}

#[derive(Debug, Serialize)]
pub struct AccountEntry {
    #[serde(flatten)]
    pub overview: AccountOverview,
    pub status: StatusInfo,
    pub utilization: f64,
    pub dashboard_link: String,
    pub oks: Vec<OkRow>,
}

#[derive(Debug, Serialize)]
pub struct AccountTotals {
    pub account_count: usize,
    pub ok_count: usize,
    pub total_budget: f64,
    pub total_spent: f64,
    pub total_available: f64,
}

#[derive(Debug, Serialize)]
pub struct AccountsResponse {
    pub totals: AccountTotals,
    pub accounts: Vec<AccountEntry>,
}

/// GET /api/accounts
/// Every account with its credits, ordered by Konto number
pub async fn get_accounts(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let accounts = state.repo.fetch_account_overviews(ListOrder::ByNumber).await?;
    let oks = state.repo.fetch_ok_overviews(ListOrder::ByNumber).await?;

    let totals = AccountTotals {
        account_count: accounts.len(),
        ok_count: accounts.iter().map(|a| a.ok_count).sum(),
        total_budget: round2(accounts.iter().map(|a| a.total_budget).sum()),
        total_spent: round2(accounts.iter().map(|a| a.total_spent).sum()),
        total_available: round2(accounts.iter().map(|a| a.total_available).sum()),
    };

    let accounts = accounts
        .into_iter()
        .map(|overview| {
            let owned: Vec<OkOverview> = oks
                .iter()
                .filter(|ok| ok.account_id == overview.account_id)
                .cloned()
                .collect();
            AccountEntry {
                status: classify(overview.total_available, overview.total_budget),
                utilization: utilization(overview.total_spent, overview.total_budget),
                dashboard_link: url_state::konto_link(&[overview.konto_nr.as_str()]),
                oks: to_rows(&owned),
                overview,
            }
        })
        .collect();

    Ok(Json(AccountsResponse { totals, accounts }))
}

#[derive(Debug, Serialize)]
pub struct KontoResponse {
    pub account: AccountOverview,
    pub status: StatusInfo,
    pub utilization: f64,
    pub sort: SortState,
    pub booking_count: usize,
    pub dashboard_link: String,
    pub oks: Vec<OkRow>,
}

/// Account matching a Konto number plus its credits
async fn konto_credits(state: &AppState, konto_nr: &str) -> Result<(AccountOverview, Vec<OkOverview>)> {
    let account = state
        .repo
        .fetch_account_overviews(ListOrder::ByNumber)
        .await?
        .into_iter()
        .find(|a| a.konto_nr == konto_nr)
        .ok_or_else(|| ApiError::KontoNotFound(konto_nr.to_string()))?;

    let oks: Vec<OkOverview> = state
        .repo
        .fetch_ok_overviews(ListOrder::ByNumber)
        .await?
        .into_iter()
        .filter(|ok| ok.konto_nr == konto_nr)
        .collect();

    // totals re-derived from the credits actually listed
    let account = account_rollup(&oks).unwrap_or(account);
    Ok((account, oks))
}

/// GET /api/konto/:konto_nr
/// Konto detail. Credits default to newest first booking first.
pub async fn get_konto(
    State(state): State<AppState>,
    Path(konto_nr): Path<String>,
    RawQuery(query): RawQuery,
) -> Result<impl IntoResponse> {
    let default_sort = SortState::new(SortKey::FirstBooking, SortOrder::Desc);
    let sort = url_state::decode_sort(query.as_deref().unwrap_or_default(), default_sort)?;

    let (account, oks) = konto_credits(&state, &konto_nr).await?;
    let bookings = state
        .repo
        .fetch_bookings(BookingScope::Account(account.account_id.clone()), DateOrder::OldestFirst)
        .await?;

    let mut rows = to_rows(&oks);
    sort_rows(&mut rows, sort);

    Ok(Json(KontoResponse {
        status: classify(account.total_available, account.total_budget),
        utilization: utilization(account.total_spent, account.total_budget),
        dashboard_link: url_state::konto_link(&[konto_nr.as_str()]),
        booking_count: bookings.len(),
        sort,
        oks: rows,
        account,
    }))
}

/// GET /api/konto/:konto_nr/burndown
pub async fn get_konto_burndown(
    State(state): State<AppState>,
    Path(konto_nr): Path<String>,
    RawQuery(query): RawQuery,
) -> Result<impl IntoResponse> {
    let year = url_state::decode_year(query.as_deref().unwrap_or_default())?;
    let (account, _) = konto_credits(&state, &konto_nr).await?;
    let bookings = state
        .repo
        .fetch_bookings(BookingScope::Account(account.account_id.clone()), DateOrder::OldestFirst)
        .await?;

    Ok(Json(burn_down(&bookings, account.total_budget, year)))
}

/// GET /api/konto/:konto_nr/treemap
pub async fn get_konto_treemap(
    State(state): State<AppState>,
    Path(konto_nr): Path<String>,
) -> Result<impl IntoResponse> {
    let (_, oks) = konto_credits(&state, &konto_nr).await?;
    Ok(Json(oks_treemap(&to_rows(&oks), &state.settings.treemap)))
}

#[derive(Debug, Serialize)]
pub struct OkDetailResponse {
    pub ok: OkRow,
    pub account: AccountOverview,
    pub dashboard_link: String,
    pub bookings: Vec<Booking>,
}

/// GET /api/oks/:ok_id
/// OK detail with its bookings, newest first
pub async fn get_ok(State(state): State<AppState>, Path(ok_id): Path<String>) -> Result<impl IntoResponse> {
    let ok = state.repo.fetch_ok_overview(&ok_id).await?;
    let account = state.repo.fetch_account_overview(&ok.account_id).await?;
    let bookings = state
        .repo
        .fetch_bookings(BookingScope::Ok(ok_id), DateOrder::NewestFirst)
        .await?;

    Ok(Json(OkDetailResponse {
        dashboard_link: url_state::ok_link(&[ok.ok_nr.as_str()]),
        ok: OkRow::from(&ok),
        account,
        bookings,
    }))
}

/// GET /api/oks/:ok_id/burndown
pub async fn get_ok_burndown(
    State(state): State<AppState>,
    Path(ok_id): Path<String>,
    RawQuery(query): RawQuery,
) -> Result<impl IntoResponse> {
    let year = url_state::decode_year(query.as_deref().unwrap_or_default())?;
    let ok = state.repo.fetch_ok_overview(&ok_id).await?;
    let bookings = state
        .repo
        .fetch_bookings(BookingScope::Ok(ok_id), DateOrder::OldestFirst)
        .await?;

    Ok(Json(burn_down(&bookings, ok.budget_total, year)))
}

/// GET /api/oks/:ok_id/treemap
pub async fn get_ok_treemap(
    State(state): State<AppState>,
    Path(ok_id): Path<String>,
) -> Result<impl IntoResponse> {
    // 404 for unknown ids rather than an empty map
    state.repo.fetch_ok_overview(&ok_id).await?;
    let bookings = state
        .repo
        .fetch_bookings(BookingScope::Ok(ok_id), DateOrder::OldestFirst)
        .await?;

    Ok(Json(bookings_treemap(&bookings, &state.settings.treemap)))
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "kontoradar-api"
    }))
}

/// POST /api/cache/invalidate
/// Drops the cached snapshot so the next request reads the file again.
/// Useful after the ETL job exported a new snapshot.
pub async fn invalidate_cache(State(state): State<AppState>) -> impl IntoResponse {
    state.repo.invalidate_cache().await;

    Json(serde_json::json!({
        "status": "success",
        "message": "Cache invalidated. Fresh data will be loaded on next request."
    }))
}
