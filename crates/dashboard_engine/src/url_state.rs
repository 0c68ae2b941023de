//! Shareable dashboard links.
//!
//! A [`FilterState`] is written to a query string with German parameter names so that
//! bookmarks and links pasted into mails keep working. Default values are never written,
//! unknown parameters are ignored when reading.

use chrono::NaiveDate;
use url::form_urlencoded;

use crate::error::{EngineError, Result};
use crate::filter::{Column, FilterState};
use crate::grouping::GroupBy;
use crate::sorting::{SortKey, SortOrder, SortState};

pub const SEARCH: &str = "Suche";
pub const BUDGET_MIN: &str = "BudgetMin";
pub const BUDGET_MAX: &str = "BudgetMax";
pub const DATE_FROM: &str = "Von";
pub const DATE_TO: &str = "Bis";
pub const SORT: &str = "Sortierung";
pub const DIRECTION: &str = "Richtung";
pub const GROUP: &str = "Gruppierung";
pub const YEAR: &str = "Jahr";

const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn encode(state: &FilterState) -> String {
    let mut query = form_urlencoded::Serializer::new(String::new());

    for column in Column::ALL {
        for value in state.columns.values(column) {
            query.append_pair(column.param(), value);
        }
    }
    if let Some(search) = state.search.as_deref().filter(|s| !s.is_empty()) {
        query.append_pair(SEARCH, search);
    }
    if let Some(min) = state.budget_range.min {
        query.append_pair(BUDGET_MIN, &min.to_string());
    }
    if let Some(max) = state.budget_range.max {
        query.append_pair(BUDGET_MAX, &max.to_string());
    }
    if let Some(from) = state.date_range.from {
        query.append_pair(DATE_FROM, &from.format(DATE_FORMAT).to_string());
    }
    if let Some(to) = state.date_range.to {
        query.append_pair(DATE_TO, &to.format(DATE_FORMAT).to_string());
    }
    if state.sort.key != SortKey::default() {
        query.append_pair(SORT, state.sort.key.param());
    }
    if state.sort.order != SortOrder::default() {
        query.append_pair(DIRECTION, state.sort.order.param());
    }
    if state.group_by != GroupBy::default() {
        query.append_pair(GROUP, state.group_by.param());
    }

    query.finish()
}

/// Parses a query string (with or without the leading `?`).
pub fn decode(query: &str) -> Result<FilterState> {
    let mut state = FilterState::default();

    for (key, value) in pairs(query) {
        if let Some(column) = Column::from_param(&key) {
            state.columns.push(column, value.into_owned());
            continue;
        }
        match &*key {
            SEARCH => state.search = Some(value.into_owned()).filter(|s| !s.is_empty()),
            BUDGET_MIN => state.budget_range.min = Some(parse_amount(BUDGET_MIN, &value)?),
            BUDGET_MAX => state.budget_range.max = Some(parse_amount(BUDGET_MAX, &value)?),
            DATE_FROM => state.date_range.from = Some(parse_date(DATE_FROM, &value)?),
            DATE_TO => state.date_range.to = Some(parse_date(DATE_TO, &value)?),
            SORT => {
                state.sort.key =
                    SortKey::from_param(&value).ok_or_else(|| EngineError::invalid(SORT, &value))?
            }
            DIRECTION => {
                state.sort.order = SortOrder::from_param(&value)
                    .ok_or_else(|| EngineError::invalid(DIRECTION, &value))?
            }
            GROUP => {
                state.group_by =
                    GroupBy::from_param(&value).ok_or_else(|| EngineError::invalid(GROUP, &value))?
            }
            _ => {}
        }
    }

    Ok(state)
}

/// Reads only `Sortierung`/`Richtung`, falling back to `default` for whichever is absent.
pub fn decode_sort(query: &str, default: SortState) -> Result<SortState> {
    let mut sort = default;
    for (key, value) in pairs(query) {
        match &*key {
            SORT => {
                sort.key =
                    SortKey::from_param(&value).ok_or_else(|| EngineError::invalid(SORT, &value))?
            }
            DIRECTION => {
                sort.order = SortOrder::from_param(&value)
                    .ok_or_else(|| EngineError::invalid(DIRECTION, &value))?
            }
            _ => {}
        }
    }
    Ok(sort)
}

/// The `Jahr` parameter used by the burn-down chart, if present.
pub fn decode_year(query: &str) -> Result<Option<i32>> {
    let mut year = None;
    for (key, value) in pairs(query) {
        if key == YEAR {
            year = Some(value.parse::<i32>().map_err(|_| EngineError::invalid(YEAR, &value))?);
        }
    }
    Ok(year)
}

/// Dashboard link with the given OK numbers preselected.
pub fn ok_link(ok_nrs: &[&str]) -> String {
    link_for(Column::OkNr, ok_nrs)
}

/// Dashboard link with the given Konto numbers preselected.
pub fn konto_link(konto_nrs: &[&str]) -> String {
    link_for(Column::KontoNr, konto_nrs)
}

fn link_for(column: Column, values: &[&str]) -> String {
    let mut state = FilterState::default();
    state.columns.set(column, values.iter().map(|v| v.to_string()).collect());
    let query = encode(&state);
    if query.is_empty() {
        "/".to_string()
    } else {
        format!("/?{query}")
    }
}

fn pairs(query: &str) -> form_urlencoded::Parse<'_> {
    form_urlencoded::parse(query.strip_prefix('?').unwrap_or(query).as_bytes())
}

fn parse_amount(param: &str, value: &str) -> Result<f64> {
    value
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| EngineError::invalid(param, value))
}

fn parse_date(param: &str, value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, DATE_FORMAT).map_err(|_| EngineError::invalid(param, value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{BudgetRange, DateRange};

    fn full_state() -> FilterState {
        let mut state = FilterState {
            search: Some("Netz & Co".into()),
            budget_range: BudgetRange {
                min: Some(1000.0),
                max: Some(250000.75),
            },
            date_range: DateRange {
                from: NaiveDate::from_ymd_opt(2024, 1, 1),
                to: NaiveDate::from_ymd_opt(2024, 12, 31),
            },
            sort: SortState::new(SortKey::Spent, SortOrder::Desc),
            group_by: GroupBy::Status,
            ..Default::default()
        };
        state.columns.set(Column::OkNr, vec!["OK-1".into(), "OK-2".into()]);
        state.columns.set(Column::KontoNr, vec!["3911000000".into()]);
        state.columns.set(Column::BookingDate, vec!["März 2024".into()]);
        state.columns.set(Column::Title, vec!["Netzwerk".into()]);
        state
    }

    #[test]
    fn test_default_state_encodes_to_empty() {
        assert_eq!(encode(&FilterState::default()), "");
        assert_eq!(decode("").unwrap(), FilterState::default());
    }

    #[test]
    fn test_round_trip() {
        let state = full_state();
        assert_eq!(decode(&encode(&state)).unwrap(), state);
    }

    #[test]
    fn test_round_trip_of_deserialized_empty_selections() {
        let state: FilterState =
            serde_json::from_str(r#"{"search": "", "columns": {"ok_nr": [], "konto_nr": ["3911000000"]}}"#).unwrap();
        assert_eq!(state.search, None);
        assert_eq!(state.columns.iter().count(), 1);
        assert_eq!(decode(&encode(&state)).unwrap(), state);

        let empty: FilterState = serde_json::from_str(r#"{"search": "", "columns": {"ok_nr": []}}"#).unwrap();
        assert_eq!(empty, FilterState::default());
        assert_eq!(decode(&encode(&empty)).unwrap(), empty);
    }

    #[test]
    fn test_repeated_params_and_german_names() {
        let state = decode("?OK=A&OK=B&Konto=3911000000&Jahr=2024").unwrap();
        assert_eq!(state.columns.values(Column::OkNr), ["A", "B"]);
        assert_eq!(state.columns.values(Column::KontoNr), ["3911000000"]);
        assert_eq!(state.isolated_ok(), None);

        let mut state = FilterState::default();
        state.columns.set(Column::OkNr, vec!["A".into(), "B".into()]);
        state.columns.set(Column::BookingDate, vec!["2024".into()]);
        assert_eq!(encode(&state), "Datum=2024&OK=A&OK=B");
    }

    #[test]
    fn test_defaults_are_omitted() {
        let mut state = FilterState::default();
        state.sort = SortState::new(SortKey::OkNr, SortOrder::Desc);
        assert_eq!(encode(&state), "Richtung=ab");
    }

    #[test]
    fn test_malformed_values_are_rejected() {
        for query in ["BudgetMin=abc", "Von=2024-13-01", "Sortierung=Nope", "Richtung=down", "Gruppierung=Jahr"] {
            let err = decode(query).unwrap_err();
            assert!(matches!(err, EngineError::InvalidParameter { .. }), "{query}");
        }
        assert!(decode("BudgetMax=NaN").is_err());
    }

    #[test]
    fn test_decode_sort_and_year() {
        let default = SortState::new(SortKey::FirstBooking, SortOrder::Desc);
        assert_eq!(decode_sort("", default).unwrap(), default);
        assert_eq!(
            decode_sort("Sortierung=Budget", default).unwrap(),
            SortState::new(SortKey::BudgetTotal, SortOrder::Desc)
        );
        assert_eq!(decode_year("Jahr=2023").unwrap(), Some(2023));
        assert_eq!(decode_year("OK=1").unwrap(), None);
        assert!(decode_year("Jahr=zwei").is_err());
    }

    #[test]
    fn test_links() {
        assert_eq!(ok_link(&["OK-1", "OK-2"]), "/?OK=OK-1&OK=OK-2");
        assert_eq!(konto_link(&["3911000000"]), "/?Konto=3911000000");
        assert_eq!(konto_link(&[]), "/");
    }
}
