use anyhow::{Context, Result, anyhow};
use clap::Parser;
use models::Snapshot;
use std::{
    collections::{HashMap, HashSet},
    fs,
    path::PathBuf,
};

#[derive(Parser, Debug)]
#[command(
    name = "validate-snapshot",
    about = "Check a budget snapshot for referential problems before the API serves it."
)]
struct Args {
    /// Snapshot JSON exported by the ETL job
    #[arg(short, long, default_value = "data/snapshot.json")]
    data: PathBuf,

    /// Settings file providing the expected currency (defaults to settings.json if present)
    #[arg(short, long)]
    settings: Option<PathBuf>,
}

#[derive(Default)]
struct Report {
    errors: Vec<String>,
    warnings: Vec<String>,
}

impl Report {
    fn error(&mut self, msg: impl Into<String>) {
        self.errors.push(msg.into());
    }
    fn warn(&mut self, msg: impl Into<String>) {
        self.warnings.push(msg.into());
    }
    fn print(&self, file: &str) {
        for w in &self.warnings {
            println!("[WARN] {}: {}", file, w);
        }
        for e in &self.errors {
            println!("[ERROR] {}: {}", file, e);
        }
    }
    fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

fn duplicates<'a>(ids: impl Iterator<Item = &'a str>) -> Vec<&'a str> {
    let mut seen = HashSet::new();
    let mut dups = Vec::new();
    for id in ids {
        if !seen.insert(id) && !dups.contains(&id) {
            dups.push(id);
        }
    }
    dups
}

fn validate_snapshot(snapshot: &Snapshot, currency: &str) -> Report {
    let mut rep = Report::default();

    // accounts
    for id in duplicates(snapshot.accounts.iter().map(|a| a.id.as_str())) {
        rep.error(format!("duplicate account id '{}'", id));
    }
    for konto_nr in duplicates(snapshot.accounts.iter().map(|a| a.konto_nr.as_str())) {
        rep.error(format!("konto_nr '{}' used by more than one account", konto_nr));
    }
    for account in &snapshot.accounts {
        if account.konto_nr.is_empty() || !account.konto_nr.chars().all(|c| c.is_ascii_digit()) {
            rep.warn(format!(
                "account '{}' has non-numeric konto_nr '{}'",
                account.id, account.konto_nr
            ));
        }
        if account.currency != currency {
            rep.warn(format!(
                "account '{}' uses currency '{}', expected '{}'",
                account.id, account.currency, currency
            ));
        }
    }
    let account_ids: HashSet<&str> = snapshot.accounts.iter().map(|a| a.id.as_str()).collect();

    // object credits
    for id in duplicates(snapshot.object_credits.iter().map(|c| c.id.as_str())) {
        rep.error(format!("duplicate object credit id '{}'", id));
    }
    for ok_nr in duplicates(snapshot.object_credits.iter().map(|c| c.ok_nr.as_str())) {
        rep.warn(format!("ok_nr '{}' appears on more than one credit", ok_nr));
    }
    for credit in &snapshot.object_credits {
        if !account_ids.contains(credit.account_id.as_str()) {
            rep.error(format!(
                "credit '{}' ({}) references unknown account '{}'",
                credit.id, credit.ok_nr, credit.account_id
            ));
        }
        if credit.budget_total < 0.0 {
            rep.warn(format!(
                "credit '{}' ({}) has negative budget {}",
                credit.id, credit.ok_nr, credit.budget_total
            ));
        }
    }
    let credit_accounts: HashMap<&str, &str> = snapshot
        .object_credits
        .iter()
        .map(|c| (c.id.as_str(), c.account_id.as_str()))
        .collect();

    // bookings
    let mut booking_ids = HashSet::new();
    for (i, booking) in snapshot.bookings.iter().enumerate() {
        if !booking_ids.insert(booking.id) {
            rep.error(format!("bookings[{}] duplicate booking id {}", i, booking.id));
        }
        match credit_accounts.get(booking.ok_id.as_str()) {
            None => rep.error(format!(
                "bookings[{}] (id {}) references unknown credit '{}'",
                i, booking.id, booking.ok_id
            )),
            Some(account_id) if *account_id != booking.account_id => rep.error(format!(
                "bookings[{}] (id {}) is on account '{}' but its credit belongs to '{}'",
                i, booking.id, booking.account_id, account_id
            )),
            Some(_) => {}
        }
        if booking.currency != currency {
            rep.warn(format!(
                "bookings[{}] (id {}) uses currency '{}', expected '{}'",
                i, booking.id, booking.currency, currency
            ));
        }
    }

    rep
}

fn main() -> Result<()> {
    let args = Args::parse();
    let settings = settings_loader::load_settings_or_default(args.settings.as_deref())?;

    let txt = fs::read_to_string(&args.data)
        .with_context(|| format!("reading {}", args.data.display()))?;
    let snapshot: Snapshot =
        serde_json::from_str(&txt).with_context(|| format!("parsing {}", args.data.display()))?;

    let file_name = args
        .data
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("snapshot");
    let report = validate_snapshot(&snapshot, &settings.currency);
    report.print(file_name);

    if report.has_errors() {
        return Err(anyhow!("Validation failed"));
    }

    // the API derives these on load; make sure it will succeed
    let oks = dashboard_engine::ok_overviews(&snapshot)?;
    println!(
        "Snapshot passed validation: {} accounts, {} credits, {} bookings.",
        snapshot.accounts.len(),
        oks.len(),
        snapshot.bookings.len()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn snapshot() -> Snapshot {
        serde_json::from_value(json!({
            "accounts": [
                {"id": "a1", "konto_nr": "3911000000", "name": "Informatik"},
                {"id": "a2", "konto_nr": "39-21", "name": "Fahrzeuge", "currency": "EUR"}
            ],
            "object_credits": [
                {"id": "ok1", "ok_nr": "OK-1", "account_id": "a1", "title": "Ticketing", "budget_total": 1000.0},
                {"id": "ok2", "ok_nr": "OK-2", "account_id": "zz", "title": "Bremsen", "budget_total": -5.0}
            ],
            "bookings": [
                {"id": 1, "ok_id": "ok1", "account_id": "a1", "booking_date": "2024-01-01", "amount": -10.0},
                {"id": 1, "ok_id": "ok1", "account_id": "a2", "booking_date": "2024-01-02", "amount": -10.0},
                {"id": 3, "ok_id": "nope", "account_id": "a1", "booking_date": "2024-01-03", "amount": -10.0}
            ]
        }))
        .unwrap()
    }

    #[test]
    fn test_clean_snapshot_passes() {
        let mut snap = snapshot();
        snap.accounts.truncate(1);
        snap.object_credits.truncate(1);
        snap.bookings.truncate(1);
        let report = validate_snapshot(&snap, "CHF");
        assert!(!report.has_errors());
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn test_reports_referential_problems() {
        let report = validate_snapshot(&snapshot(), "CHF");
        let errors = report.errors.join("\n");
        assert!(errors.contains("unknown account 'zz'"));
        assert!(errors.contains("duplicate booking id 1"));
        assert!(errors.contains("but its credit belongs to 'a1'"));
        assert!(errors.contains("unknown credit 'nope'"));
        assert_eq!(report.errors.len(), 4);

        let warnings = report.warnings.join("\n");
        assert!(warnings.contains("non-numeric konto_nr '39-21'"));
        assert!(warnings.contains("currency 'EUR'"));
        assert!(warnings.contains("negative budget"));
    }

    #[test]
    fn test_duplicates_listed_once() {
        assert_eq!(duplicates(["a", "b", "a", "a"].into_iter()), vec!["a"]);
    }
}
