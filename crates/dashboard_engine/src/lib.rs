//! Budget dashboard core: derives the overview views from a snapshot and shapes them for
//! tables, charts and shareable links. Nothing in here does I/O except the saved-views
//! file adapter.

pub mod aggregation;
pub mod burndown;
pub mod error;
pub mod filter;
pub mod grouping;
pub mod labels;
pub mod sorting;
pub mod status;
pub mod treemap;
pub mod url_state;
pub mod views;

pub use aggregation::{
    account_overviews, account_rollup, ok_overviews, portfolio_summary, round2, to_rows, utilization, OkRow,
    PortfolioSummary,
};
pub use burndown::{available_years, project, resolve_year, BurnDownPoint};
pub use error::{EngineError, Result};
pub use filter::{apply, apply_filters, column_options, date_options, Column, DateOptions, FilterState};
pub use grouping::{group_rows, GroupBy, RowGroup};
pub use sorting::{sort_rows, SortKey, SortOrder, SortState};
pub use status::{classify, BudgetStatus, StatusInfo};
pub use treemap::{bookings_treemap, oks_treemap, Treemap, TreemapNode};
pub use views::{JsonFileViewStore, MemoryViewStore, SavedView, SavedViews, ViewStore};
