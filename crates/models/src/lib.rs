
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// Budget store rows
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Account {
	pub id: String,
	pub konto_nr: String,
	pub name: String,
	#[serde(default = "default_currency")]
	pub currency: String,
}

/// A budget envelope ("Objektkredit"). Owned by exactly one account.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ObjectCredit {
	pub id: String,
	pub ok_nr: String,
	pub account_id: String,
	pub title: String,
	pub budget_total: f64,
	#[serde(default)]
	pub start_date: Option<NaiveDate>,
	#[serde(default)]
	pub end_date: Option<NaiveDate>,
}

/// A ledger line. Negative amounts are expenses.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Booking {
	pub id: i64,
	pub ok_id: String,
	pub account_id: String,
	#[serde(default)]
	pub import_batch_id: Option<String>,
	pub booking_date: NaiveDate,
	#[serde(default)]
	pub beleg_nr: Option<String>,
	#[serde(default)]
	pub text_long: Option<String>,
	#[serde(default)]
	pub gegenkonto: Option<String>,
	pub amount: f64,
	#[serde(default = "default_currency")]
	pub currency: String,
}

fn default_currency() -> String {
	"CHF".to_string()
}

// Pre-aggregated views

/// One row of `v_ok_overview`. `spent` keeps the store's sign (expenses negative),
/// `available` is `budget_total - |spent|` and is never clamped.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct OkOverview {
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
}

/// One row of `v_account_overview`. `total_spent` is the sum of absolute spend.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct AccountOverview {
	pub account_id: String,
	pub konto_nr: String,
	pub account_name: String,
	pub ok_count: usize,
	pub total_budget: f64,
	pub total_spent: f64,
	pub total_available: f64,
}

/// Whole-table dump of the budget store as served by the file-backed repository.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct Snapshot {
	#[serde(default)]
	pub accounts: Vec<Account>,
	#[serde(default, alias = "object_credit")]
	pub object_credits: Vec<ObjectCredit>,
	#[serde(default, alias = "booking")]
	pub bookings: Vec<Booking>,
}

// Settings models
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ServerSettings {
	pub host: String,
	pub port: u16,
}

impl Default for ServerSettings {
	fn default() -> Self {
		Self {
			host: "127.0.0.1".to_string(),
			port: 3000,
		}
	}
}

/// Label visibility thresholds in percent of the visible total.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct TreemapSettings {
	pub ok_full_label_pct: f64,
	pub ok_short_label_pct: f64,
	pub booking_label_pct: f64,
}

impl Default for TreemapSettings {
	fn default() -> Self {
		Self {
			ok_full_label_pct: 3.0,
			ok_short_label_pct: 1.5,
			booking_label_pct: 3.0,
		}
	}
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct Settings {
	pub settings_version: u32,
	pub currency: String,
	pub data_path: String,
	pub views_path: String,
	pub server: ServerSettings,
	pub treemap: TreemapSettings,
}

impl Default for Settings {
	fn default() -> Self {
		Self {
			settings_version: 1,
			currency: default_currency(),
			data_path: "data/snapshot.json".to_string(),
			views_path: "data/saved_views.json".to_string(),
			server: ServerSettings::default(),
			treemap: TreemapSettings::default(),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	#[test]
	fn test_booking_optional_fields_default() {
		let booking: Booking = serde_json::from_value(json!({
			"id": 7,
			"ok_id": "ok-1",
			"account_id": "acc-1",
			"booking_date": "2024-03-15",
			"amount": -250.0
		}))
		.unwrap();

		assert_eq!(booking.currency, "CHF");
		assert!(booking.text_long.is_none());
		assert_eq!(booking.booking_date, NaiveDate::from_ymd_opt(2024, 3, 15).unwrap());
	}

	#[test]
	fn test_snapshot_accepts_table_names() {
		let snapshot: Snapshot = serde_json::from_value(json!({
			"accounts": [{"id": "acc-1", "konto_nr": "3911000000", "name": "Informatik"}],
			"object_credit": [{
				"id": "ok-1", "ok_nr": "OK-001", "account_id": "acc-1",
				"title": "Ticketing", "budget_total": 5000.0
			}],
			"booking": []
		}))
		.unwrap();

		assert_eq!(snapshot.object_credits.len(), 1);
		assert!(snapshot.object_credits[0].start_date.is_none());
	}

	#[test]
	fn test_settings_partial_file_uses_defaults() {
		let settings: Settings = serde_json::from_value(json!({
			"server": {"port": 8080}
		}))
		.unwrap();

		assert_eq!(settings.server.port, 8080);
		assert_eq!(settings.server.host, "127.0.0.1");
		assert_eq!(settings.treemap.ok_short_label_pct, 1.5);
		assert_eq!(settings.data_path, "data/snapshot.json");
	}
}
