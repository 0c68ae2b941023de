use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::aggregation::OkRow;
use crate::labels::{month_year_label, NO_DATE};

pub const ALL_ROWS_LABEL: &str = "Alle";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GroupBy {
    #[default]
    None,
    Account,
    Status,
    DateMonth,
}

impl GroupBy {
    /// Value used for the `Gruppierung` query parameter. `None` is never written.
    pub fn param(&self) -> &'static str {
        match self {
            GroupBy::None => "Keine",
            GroupBy::Account => "Konto",
            GroupBy::Status => "Status",
            GroupBy::DateMonth => "Monat",
        }
    }

    pub fn from_param(value: &str) -> Option<GroupBy> {
        match value {
            "Keine" => Some(GroupBy::None),
            "Konto" => Some(GroupBy::Account),
            "Status" => Some(GroupBy::Status),
            "Monat" => Some(GroupBy::DateMonth),
            _ => None,
        }
    }

    fn label(&self, row: &OkRow) -> String {
        match self {
            GroupBy::None => ALL_ROWS_LABEL.to_string(),
            GroupBy::Account => row.account_name.clone(),
            GroupBy::Status => row.status.to_string(),
            GroupBy::DateMonth => row
                .first_booking
                .map(month_year_label)
                .unwrap_or_else(|| NO_DATE.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowGroup {
    pub label: String,
    pub rows: Vec<OkRow>,
}

/// Groups rows by label, in order of first appearance. Row order within a group is kept.
pub fn group_rows(rows: Vec<OkRow>, group_by: GroupBy) -> Vec<RowGroup> {
    if group_by == GroupBy::None {
        return vec![RowGroup {
            label: ALL_ROWS_LABEL.to_string(),
            rows,
        }];
    }

    let mut groups: Vec<RowGroup> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    for row in rows {
        let label = group_by.label(&row);
        match index.get(&label) {
            Some(&i) => groups[i].rows.push(row),
            None => {
                index.insert(label.clone(), groups.len());
                groups.push(RowGroup {
                    label,
                    rows: vec![row],
                });
            }
        }
    }
    groups
}
