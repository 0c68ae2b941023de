use models::{Booking, TreemapSettings};
use serde::Serialize;
use std::collections::HashMap;

use crate::aggregation::{round2, OkRow};
use crate::labels::short_month_year_label;

pub const NO_DESCRIPTION: &str = "Keine Beschreibung";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TreemapNode {
    pub name: String,
    pub value: f64,
    pub percentage: f64,
    /// Only set when the tile is large enough to carry text.
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ok_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub booking_id: Option<i64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TreemapNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Treemap {
    pub total: f64,
    pub nodes: Vec<TreemapNode>,
}

fn share(value: f64, total: f64) -> f64 {
    if total == 0.0 { 0.0 } else { value / total * 100.0 }
}

/// One tile per OK, sized by spend.
pub fn oks_treemap(rows: &[OkRow], settings: &TreemapSettings) -> Treemap {
    let total: f64 = rows.iter().map(|r| r.spent.abs()).sum();

    let nodes = rows
        .iter()
        .map(|row| {
            let value = row.spent.abs();
            let pct = share(value, total);
            let label = if pct >= settings.ok_full_label_pct {
                Some(format!("{}\n{:.1}%", row.ok_nr, pct))
            } else if pct >= settings.ok_short_label_pct {
                Some(format!("{pct:.1}%"))
            } else {
                None
            };
            TreemapNode {
                name: row.ok_nr.clone(),
                value,
                percentage: pct,
                label,
                ok_id: Some(row.ok_id.clone()),
                booking_id: None,
                children: Vec::new(),
            }
        })
        .collect();

    Treemap {
        total: round2(total),
        nodes,
    }
}

/// Bookings of one OK grouped into month tiles.
pub fn bookings_treemap(bookings: &[Booking], settings: &TreemapSettings) -> Treemap {
    let total: f64 = bookings.iter().map(|b| b.amount.abs()).sum();

    let mut months: Vec<TreemapNode> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    for booking in bookings {
        let value = booking.amount.abs();
        let pct = share(value, total);
        let leaf = TreemapNode {
            name: booking
                .text_long
                .clone()
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(|| NO_DESCRIPTION.to_string()),
            value,
            percentage: pct,
            label: (pct >= settings.booking_label_pct).then(|| format!("{pct:.1}%")),
            ok_id: None,
            booking_id: Some(booking.id),
            children: Vec::new(),
        };

        let month = short_month_year_label(booking.booking_date);
        let i = *index.entry(month.clone()).or_insert_with(|| {
            months.push(TreemapNode {
                name: month,
                value: 0.0,
                percentage: 0.0,
                label: None,
                ok_id: None,
                booking_id: None,
                children: Vec::new(),
            });
            months.len() - 1
        });
        months[i].value += value;
        months[i].children.push(leaf);
    }

    for month in &mut months {
        month.value = round2(month.value);
        month.percentage = share(month.value, total);
    }

    Treemap {
        total: round2(total),
        nodes: months,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregation::to_rows;
    use crate::sorting::tests::overview;
    use serde_json::json;

    #[test]
    fn test_ok_labels_follow_thresholds() {
        let rows = to_rows(&[
            overview("OK-A", "1", 10000.0, -9600.0, None),
            overview("OK-B", "1", 10000.0, -200.0, None),
            overview("OK-C", "1", 10000.0, -100.0, None),
            overview("OK-D", "1", 10000.0, -100.0, None),
        ]);
        let map = oks_treemap(&rows, &TreemapSettings::default());

        assert_eq!(map.total, 10000.0);
        assert_eq!(map.nodes[0].label.as_deref(), Some("OK-A\n96.0%"));
        assert_eq!(map.nodes[1].label.as_deref(), Some("2.0%"));
        assert_eq!(map.nodes[2].label, None);
        assert_eq!(map.nodes[0].ok_id.as_deref(), Some("id-OK-A"));
    }

    #[test]
    fn test_zero_total_has_zero_percentages() {
        let rows = to_rows(&[overview("OK-A", "1", 100.0, 0.0, None)]);
        let map = oks_treemap(&rows, &TreemapSettings::default());
        assert_eq!(map.nodes[0].percentage, 0.0);
        assert_eq!(map.nodes[0].label, None);
    }

    #[test]
    fn test_bookings_grouped_by_month() {
        let bookings: Vec<Booking> = serde_json::from_value(json!([
            {"id": 1, "ok_id": "ok1", "account_id": "a1", "booking_date": "2024-01-05", "amount": -100.0, "text_long": "Lizenz"},
            {"id": 2, "ok_id": "ok1", "account_id": "a1", "booking_date": "2024-02-10", "amount": -50.0},
            {"id": 3, "ok_id": "ok1", "account_id": "a1", "booking_date": "2024-01-20", "amount": -850.0, "text_long": "Hardware"}
        ]))
        .unwrap();
        let map = bookings_treemap(&bookings, &TreemapSettings::default());

        assert_eq!(map.total, 1000.0);
        let names: Vec<&str> = map.nodes.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["Jan. 2024", "Feb. 2024"]);
        assert_eq!(map.nodes[0].value, 950.0);
        assert_eq!(map.nodes[0].children.len(), 2);
        assert_eq!(map.nodes[1].children[0].name, "Keine Beschreibung");
        assert_eq!(map.nodes[1].children[0].label.as_deref(), Some("5.0%"));
        assert_eq!(map.nodes[0].children[1].booking_id, Some(3));
    }
}
