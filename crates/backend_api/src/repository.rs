use async_trait::async_trait;
use dashboard_engine::{account_overviews, ok_overviews};
use models::{AccountOverview, Booking, OkOverview, Snapshot};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::{ApiError, Result};

/// Row order for the overview lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ListOrder {
    /// Order of the underlying snapshot.
    #[default]
    AsStored,
    /// By `ok_nr` for credits, by `konto_nr` for accounts.
    ByNumber,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DateOrder {
    #[default]
    OldestFirst,
    NewestFirst,
}

/// Foreign key a booking list is filtered by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookingScope {
    Ok(String),
    Account(String),
}

/// Read-only access to the budget store.
/// Handlers only see this trait, so tests run against fixtures instead of files.
#[async_trait]
pub trait BudgetRepository: Send + Sync {
    async fn fetch_ok_overviews(&self, order: ListOrder) -> Result<Vec<OkOverview>>;
    async fn fetch_account_overviews(&self, order: ListOrder) -> Result<Vec<AccountOverview>>;
    async fn fetch_bookings(&self, scope: BookingScope, order: DateOrder) -> Result<Vec<Booking>>;
    async fn fetch_ok_overview(&self, ok_id: &str) -> Result<OkOverview>;
    async fn fetch_account_overview(&self, account_id: &str) -> Result<AccountOverview>;
    async fn invalidate_cache(&self);
}

/// Overview views derived once per snapshot load.
#[derive(Debug, Clone)]
struct Views {
    oks: Vec<OkOverview>,
    accounts: Vec<AccountOverview>,
    bookings: Vec<Booking>,
}

impl Views {
    fn derive(snapshot: Snapshot) -> Result<Self> {
        let oks = ok_overviews(&snapshot)?;
        let accounts = account_overviews(&snapshot.accounts, &oks);
        Ok(Self {
            oks,
            accounts,
            bookings: snapshot.bookings,
        })
    }

    fn oks(&self, order: ListOrder) -> Vec<OkOverview> {
        let mut oks = self.oks.clone();
        if order == ListOrder::ByNumber {
            oks.sort_by(|a, b| a.ok_nr.cmp(&b.ok_nr));
        }
        oks
    }

    fn accounts(&self, order: ListOrder) -> Vec<AccountOverview> {
        let mut accounts = self.accounts.clone();
        if order == ListOrder::ByNumber {
            accounts.sort_by(|a, b| a.konto_nr.cmp(&b.konto_nr));
        }
        accounts
    }

    fn bookings(&self, scope: &BookingScope, order: DateOrder) -> Vec<Booking> {
        let mut bookings: Vec<Booking> = self
            .bookings
            .iter()
            .filter(|b| match scope {
                BookingScope::Ok(ok_id) => b.ok_id == *ok_id,
                BookingScope::Account(account_id) => b.account_id == *account_id,
            })
            .cloned()
            .collect();
        match order {
            DateOrder::OldestFirst => bookings.sort_by_key(|b| b.booking_date),
            DateOrder::NewestFirst => bookings.sort_by(|a, b| b.booking_date.cmp(&a.booking_date)),
        }
        bookings
    }

    fn ok(&self, ok_id: &str) -> Result<OkOverview> {
        self.oks
            .iter()
            .find(|ok| ok.ok_id == ok_id)
            .cloned()
            .ok_or_else(|| ApiError::OkNotFound(ok_id.to_string()))
    }

    fn account(&self, account_id: &str) -> Result<AccountOverview> {
        self.accounts
            .iter()
            .find(|acc| acc.account_id == account_id)
            .cloned()
            .ok_or_else(|| ApiError::AccountNotFound(account_id.to_string()))
    }
}

/// File-based implementation that reads a snapshot JSON exported by the ETL job
pub struct FileBudgetRepository {
    snapshot_path: PathBuf,
    cache: Arc<RwLock<Option<Arc<Views>>>>,
}

impl FileBudgetRepository {
    pub fn new<P: AsRef<Path>>(snapshot_path: P) -> Self {
        Self {
            snapshot_path: snapshot_path.as_ref().to_path_buf(),
            cache: Arc::new(RwLock::new(None)),
        }
    }

    /// Load views from the cache, or from disk if the cache is empty
    async fn load(&self) -> Result<Arc<Views>> {
        {
            let cache = self.cache.read().await;
            if let Some(views) = cache.as_ref() {
                return Ok(Arc::clone(views));
            }
        }

        let mut cache = self.cache.write().await;
        // another request may have filled it while we waited
        if let Some(views) = cache.as_ref() {
            return Ok(Arc::clone(views));
        }

        tracing::debug!("Loading snapshot from {}", self.snapshot_path.display());
        let content = tokio::fs::read_to_string(&self.snapshot_path).await?;
        let snapshot: Snapshot = serde_json::from_str(&content)?;
        let views = Arc::new(Views::derive(snapshot)?);
        tracing::info!(
            "Snapshot loaded: {} credits, {} accounts, {} bookings",
            views.oks.len(),
            views.accounts.len(),
            views.bookings.len()
        );

        *cache = Some(Arc::clone(&views));
        Ok(views)
    }
}

#[async_trait]
impl BudgetRepository for FileBudgetRepository {
    async fn fetch_ok_overviews(&self, order: ListOrder) -> Result<Vec<OkOverview>> {
        Ok(self.load().await?.oks(order))
    }

    async fn fetch_account_overviews(&self, order: ListOrder) -> Result<Vec<AccountOverview>> {
        Ok(self.load().await?.accounts(order))
    }

    async fn fetch_bookings(&self, scope: BookingScope, order: DateOrder) -> Result<Vec<Booking>> {
        Ok(self.load().await?.bookings(&scope, order))
    }

    async fn fetch_ok_overview(&self, ok_id: &str) -> Result<OkOverview> {
        self.load().await?.ok(ok_id)
    }

    async fn fetch_account_overview(&self, account_id: &str) -> Result<AccountOverview> {
        self.load().await?.account(account_id)
    }

    async fn invalidate_cache(&self) {
        let mut cache = self.cache.write().await;
        *cache = None;
        tracing::info!("Snapshot cache invalidated");
    }
}

/// Fixture-backed implementation for tests and demos
pub struct InMemoryBudgetRepository {
    views: Views,
}

impl InMemoryBudgetRepository {
    pub fn new(snapshot: Snapshot) -> Result<Self> {
        Ok(Self {
            views: Views::derive(snapshot)?,
        })
    }
}

#[async_trait]
impl BudgetRepository for InMemoryBudgetRepository {
    async fn fetch_ok_overviews(&self, order: ListOrder) -> Result<Vec<OkOverview>> {
        Ok(self.views.oks(order))
    }

    async fn fetch_account_overviews(&self, order: ListOrder) -> Result<Vec<AccountOverview>> {
        Ok(self.views.accounts(order))
    }

    async fn fetch_bookings(&self, scope: BookingScope, order: DateOrder) -> Result<Vec<Booking>> {
        Ok(self.views.bookings(&scope, order))
    }

    async fn fetch_ok_overview(&self, ok_id: &str) -> Result<OkOverview> {
        self.views.ok(ok_id)
    }

    async fn fetch_account_overview(&self, account_id: &str) -> Result<AccountOverview> {
        self.views.account(account_id)
    }

    async fn invalidate_cache(&self) {}
}
