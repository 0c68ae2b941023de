use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

use crate::aggregation::OkRow;
use crate::grouping::{group_rows, GroupBy, RowGroup};
use crate::labels::{month_year_label, year_label};
use crate::sorting::{sort_rows, SortState};

/// Filterable dashboard columns, in query-string order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Column {
    BookingDate,
    OkNr,
    KontoNr,
    Title,
    AccountName,
    BudgetTotal,
    Spent,
    Available,
    Status,
}

impl Column {
    pub const ALL: [Column; 9] = [
        Column::BookingDate,
        Column::OkNr,
        Column::KontoNr,
        Column::Title,
        Column::AccountName,
        Column::BudgetTotal,
        Column::Spent,
        Column::Available,
        Column::Status,
    ];

    /// German query parameter name. Existing bookmarks depend on these.
    pub fn param(&self) -> &'static str {
        match self {
            Column::BookingDate => "Datum",
            Column::OkNr => "OK",
            Column::KontoNr => "Konto",
            Column::Title => "Titel",
            Column::AccountName => "Kontoname",
            Column::BudgetTotal => "Budget",
            Column::Spent => "Verbraucht",
            Column::Available => "Verfuegbar",
            Column::Status => "Status",
        }
    }

    pub fn from_param(name: &str) -> Option<Column> {
        Column::ALL.into_iter().find(|c| c.param() == name)
    }

    /// Free-text columns match by substring, the rest by exact value.
    pub fn is_text(&self) -> bool {
        matches!(self, Column::Title)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Column::BudgetTotal | Column::Spent | Column::Available)
    }

    /// String form of the cell as shown in the table and offered as a filter option.
    pub fn value(&self, row: &OkRow) -> String {
        match self {
            Column::BookingDate => row.first_booking.map(|d| d.to_string()).unwrap_or_default(),
            Column::OkNr => row.ok_nr.clone(),
            Column::KontoNr => row.konto_nr.clone(),
            Column::Title => row.title.clone(),
            Column::AccountName => row.account_name.clone(),
            Column::BudgetTotal => display_number(row.budget_total),
            Column::Spent => display_number(row.spent),
            Column::Available => display_number(row.available),
            Column::Status => row.status.to_string(),
        }
    }

    fn matches(&self, row: &OkRow, selected: &[String]) -> bool {
        match self {
            Column::BookingDate => match row.first_booking {
                Some(date) => {
                    let year = year_label(date);
                    let month = month_year_label(date);
                    selected.iter().any(|v| *v == year || *v == month)
                }
                None => false,
            },
            column if column.is_text() => {
                let haystack = column.value(row).to_lowercase();
                selected.iter().any(|v| haystack.contains(&v.to_lowercase()))
            }
            column => {
                let value = column.value(row);
                selected.iter().any(|v| *v == value)
            }
        }
    }
}

fn display_number(v: f64) -> String {
    // avoid "-0"
    if v == 0.0 {
        "0".to_string()
    } else {
        v.to_string()
    }
}

/// Selected values per column. Columns without a selection are not stored.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(
    from = "BTreeMap<Column, Vec<String>>",
    into = "BTreeMap<Column, Vec<String>>"
)]
pub struct ColumnFilters(BTreeMap<Column, Vec<String>>);

impl From<BTreeMap<Column, Vec<String>>> for ColumnFilters {
    fn from(map: BTreeMap<Column, Vec<String>>) -> Self {
        let mut filters = ColumnFilters::default();
        for (column, values) in map {
            filters.set(column, values);
        }
        filters
    }
}

impl From<ColumnFilters> for BTreeMap<Column, Vec<String>> {
    fn from(filters: ColumnFilters) -> Self {
        filters.0
    }
}

impl ColumnFilters {
    pub fn values(&self, column: Column) -> &[String] {
        self.0.get(&column).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn set(&mut self, column: Column, values: Vec<String>) {
        if values.is_empty() {
            self.0.remove(&column);
        } else {
            self.0.insert(column, values);
        }
    }

    pub fn push(&mut self, column: Column, value: impl Into<String>) {
        self.0.entry(column).or_default().push(value.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.values().all(Vec::is_empty)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Column, &[String])> {
        self.0.iter().map(|(c, v)| (*c, v.as_slice()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BudgetRange {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DateRange {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

/// Everything that narrows, orders or groups the dashboard table.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterState {
    #[serde(deserialize_with = "non_empty")]
    pub search: Option<String>,
    pub columns: ColumnFilters,
    pub budget_range: BudgetRange,
    pub date_range: DateRange,
    pub sort: SortState,
    pub group_by: GroupBy,
}

// An empty search box means no search.
fn non_empty<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.filter(|s| !s.is_empty()))
}

impl FilterState {
    pub fn has_active_filters(&self) -> bool {
        !self.columns.is_empty()
            || self.search.as_deref().is_some_and(|s| !s.is_empty())
            || self.budget_range != BudgetRange::default()
            || self.date_range != DateRange::default()
    }

    /// The OK number when exactly one OK is selected and no Konto filter narrows further.
    pub fn isolated_ok(&self) -> Option<&str> {
        match self.columns.values(Column::OkNr) {
            [single] if self.columns.values(Column::KontoNr).is_empty() => Some(single.as_str()),
            _ => None,
        }
    }

    pub fn matches(&self, row: &OkRow) -> bool {
        if let Some(term) = self.search.as_deref().filter(|s| !s.is_empty()) {
            let term = term.to_lowercase();
            let hit = [&row.ok_nr, &row.title, &row.account_name, &row.konto_nr]
                .iter()
                .any(|field| field.to_lowercase().contains(&term));
            if !hit {
                return false;
            }
        }

        if !self
            .columns
            .iter()
            .all(|(column, selected)| selected.is_empty() || column.matches(row, selected))
        {
            return false;
        }

        if self.budget_range.min.is_some_and(|min| row.budget_total < min)
            || self.budget_range.max.is_some_and(|max| row.budget_total > max)
        {
            return false;
        }

        if let Some(from) = self.date_range.from {
            if !row.first_booking.is_some_and(|d| d >= from) {
                return false;
            }
        }
        if let Some(to) = self.date_range.to {
            if !row.last_booking.is_some_and(|d| d <= to) {
                return false;
            }
        }

        true
    }
}

pub fn apply_filters(rows: &[OkRow], state: &FilterState) -> Vec<OkRow> {
    rows.iter().filter(|row| state.matches(row)).cloned().collect()
}

/// Filter, sort and group in one pass over the table.
pub fn apply(rows: &[OkRow], state: &FilterState) -> Vec<RowGroup> {
    let mut filtered = apply_filters(rows, state);
    sort_rows(&mut filtered, state.sort);
    group_rows(filtered, state.group_by)
}

/// Distinct values offered in a column's dropdown. Numbers descending, text ascending.
pub fn column_options(rows: &[OkRow], column: Column) -> Vec<String> {
    if column == Column::BookingDate {
        let options = date_options(rows);
        return options.years.into_iter().chain(options.months).collect();
    }

    let mut values: Vec<String> = Vec::new();
    for row in rows {
        let value = column.value(row);
        if !values.contains(&value) {
            values.push(value);
        }
    }

    if column.is_numeric() {
        values.sort_by(|a, b| {
            let a: f64 = a.parse().unwrap_or(0.0);
            let b: f64 = b.parse().unwrap_or(0.0);
            b.total_cmp(&a)
        });
    } else {
        values.sort_by_key(|v| v.to_lowercase());
    }
    values
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct DateOptions {
    pub years: Vec<String>,
    pub months: Vec<String>,
}

/// Years and month labels present in `first_booking`, newest first.
pub fn date_options(rows: &[OkRow]) -> DateOptions {
    let mut dates: Vec<NaiveDate> = rows.iter().filter_map(|r| r.first_booking).collect();
    dates.sort_by(|a, b| b.cmp(a));

    let mut options = DateOptions::default();
    for date in dates {
        let year = year_label(date);
        if !options.years.contains(&year) {
            options.years.push(year);
        }
        let month = month_year_label(date);
        if !options.months.contains(&month) {
            options.months.push(month);
        }
    }
    options
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregation::to_rows;
    use crate::sorting::tests::overview;
    use crate::sorting::{SortKey, SortOrder};
    use crate::status::BudgetStatus;

    fn rows() -> Vec<OkRow> {
        let mut data = vec![
            overview("OK-100", "3911000000", 5000.0, -1000.0, Some("2024-03-15")),
            overview("OK-200", "3911000000", 2000.0, -1900.0, Some("2023-11-02")),
            overview("OK-300", "3921000000", 1500.5, -900.0, None),
            overview("OK-400", "3921000000", 800.0, -100.0, Some("2024-07-01")),
        ];
        data[0].title = "Ticketing Plattform".to_string();
        data[1].title = "Netzwerk Erneuerung".to_string();
        to_rows(&data)
    }

    fn numbers(rows: &[OkRow]) -> Vec<&str> {
        rows.iter().map(|r| r.ok_nr.as_str()).collect()
    }

    #[test]
    fn test_no_filters_keeps_everything() {
        let state = FilterState::default();
        assert!(!state.has_active_filters());
        assert_eq!(apply_filters(&rows(), &state).len(), 4);
    }

    #[test]
    fn test_select_column_is_or_within_and_across() {
        let mut state = FilterState::default();
        state.columns.set(Column::OkNr, vec!["OK-100".into(), "OK-300".into()]);
        assert_eq!(numbers(&apply_filters(&rows(), &state)), vec!["OK-100", "OK-300"]);

        state.columns.set(Column::KontoNr, vec!["3921000000".into()]);
        assert_eq!(numbers(&apply_filters(&rows(), &state)), vec!["OK-300"]);
    }

    #[test]
    fn test_select_column_is_exact_match() {
        let mut state = FilterState::default();
        state.columns.set(Column::OkNr, vec!["OK-1".into()]);
        assert!(apply_filters(&rows(), &state).is_empty());
    }

    #[test]
    fn test_title_filter_is_case_insensitive_substring() {
        let mut state = FilterState::default();
        state.columns.set(Column::Title, vec!["netzWERK".into()]);
        assert_eq!(numbers(&apply_filters(&rows(), &state)), vec!["OK-200"]);
    }

    #[test]
    fn test_numeric_columns_match_displayed_values() {
        let mut state = FilterState::default();
        state.columns.set(Column::Spent, vec!["1900".into()]);
        assert_eq!(numbers(&apply_filters(&rows(), &state)), vec!["OK-200"]);

        state.columns.set(Column::Spent, vec![]);
        state.columns.set(Column::BudgetTotal, vec!["1500.5".into()]);
        assert_eq!(numbers(&apply_filters(&rows(), &state)), vec!["OK-300"]);
    }

    #[test]
    fn test_status_filter() {
        let mut state = FilterState::default();
        state.columns.set(Column::Status, vec![BudgetStatus::Critical.to_string()]);
        assert_eq!(numbers(&apply_filters(&rows(), &state)), vec!["OK-200"]);
    }

    #[test]
    fn test_date_filter_by_year_or_month_label() {
        let mut state = FilterState::default();
        state.columns.set(Column::BookingDate, vec!["2023".into()]);
        assert_eq!(numbers(&apply_filters(&rows(), &state)), vec!["OK-200"]);

        state.columns.set(Column::BookingDate, vec!["Juli 2024".into(), "2023".into()]);
        assert_eq!(numbers(&apply_filters(&rows(), &state)), vec!["OK-200", "OK-400"]);
    }

    #[test]
    fn test_search_budget_and_date_ranges() {
        let mut state = FilterState {
            search: Some("3921".into()),
            ..Default::default()
        };
        assert_eq!(numbers(&apply_filters(&rows(), &state)), vec!["OK-300", "OK-400"]);

        state.budget_range = BudgetRange {
            min: Some(1000.0),
            max: None,
        };
        assert_eq!(numbers(&apply_filters(&rows(), &state)), vec!["OK-300"]);

        let state = FilterState {
            date_range: DateRange {
                from: NaiveDate::from_ymd_opt(2024, 1, 1),
                to: None,
            },
            ..Default::default()
        };
        assert_eq!(numbers(&apply_filters(&rows(), &state)), vec!["OK-100", "OK-400"]);
    }

    #[test]
    fn test_filter_order_does_not_matter() {
        let mut a = FilterState::default();
        a.columns.set(Column::KontoNr, vec!["3911000000".into()]);
        a.columns.set(Column::Status, vec!["healthy".into()]);

        let mut b = FilterState::default();
        b.columns.set(Column::Status, vec!["healthy".into()]);
        b.columns.set(Column::KontoNr, vec!["3911000000".into()]);

        assert_eq!(apply_filters(&rows(), &a), apply_filters(&rows(), &b));
        assert_eq!(a, b);
    }

    #[test]
    fn test_apply_sorts_and_groups() {
        let mut state = FilterState::default();
        state.sort = SortState::new(SortKey::BudgetTotal, SortOrder::Desc);
        state.group_by = GroupBy::Account;
        let groups = apply(&rows(), &state);
        assert_eq!(groups.len(), 2);
        assert_eq!(numbers(&groups[0].rows), vec!["OK-100", "OK-200"]);
        assert_eq!(numbers(&groups[1].rows), vec!["OK-300", "OK-400"]);
    }

    #[test]
    fn test_isolated_ok() {
        let mut state = FilterState::default();
        assert_eq!(state.isolated_ok(), None);
        state.columns.set(Column::OkNr, vec!["OK-100".into()]);
        assert_eq!(state.isolated_ok(), Some("OK-100"));
        state.columns.set(Column::KontoNr, vec!["3911000000".into()]);
        assert_eq!(state.isolated_ok(), None);
    }

    #[test]
    fn test_column_options() {
        let data = rows();
        assert_eq!(column_options(&data, Column::BudgetTotal), vec!["5000", "2000", "1500.5", "800"]);
        assert_eq!(column_options(&data, Column::KontoNr), vec!["3911000000", "3921000000"]);
        assert_eq!(
            column_options(&data, Column::BookingDate),
            vec!["2024", "2023", "Juli 2024", "März 2024", "November 2023"]
        );
    }
}
