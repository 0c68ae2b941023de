use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Parser;
use dashboard_engine::{OkRow, apply, ok_overviews, to_rows, url_state};
use models::Snapshot;
use std::{fs, path::PathBuf};

const PLACEHOLDER: &str = "–";

#[derive(Parser, Debug)]
#[command(name = "report", about = "Print the dashboard table for a snapshot, optionally filtered by a dashboard query.")]
struct Args {
    /// Snapshot JSON exported by the ETL job
    #[arg(short, long, default_value = "data/snapshot.json")]
    data: PathBuf,

    /// Dashboard query string, e.g. "Konto=3911000000&Gruppierung=Status"
    #[arg(short, long, default_value = "")]
    query: String,

    /// Print rows as JSON instead of a table
    #[arg(long)]
    json: bool,
}

fn fmt_date(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format("%d.%m.%Y").to_string())
        .unwrap_or_else(|| PLACEHOLDER.to_string())
}

fn fmt_row(row: &OkRow) -> String {
    format!(
        "{:<12} {:<32} {:<12} {:>14.2} {:>14.2} {:>14.2} {:>6.1}% {:<9} {:>10} {:>10}",
        row.ok_nr,
        truncate(&row.title, 32),
        row.konto_nr,
        row.budget_total,
        row.spent,
        row.available,
        row.available_percentage,
        row.status.as_str(),
        fmt_date(row.first_booking),
        fmt_date(row.last_booking),
    )
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        text.to_string()
    } else {
        let cut: String = text.chars().take(width - 1).collect();
        format!("{cut}…")
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let txt = fs::read_to_string(&args.data)
        .with_context(|| format!("reading {}", args.data.display()))?;
    let snapshot: Snapshot =
        serde_json::from_str(&txt).with_context(|| format!("parsing {}", args.data.display()))?;
    let filters = url_state::decode(&args.query).context("parsing --query")?;

    let rows = to_rows(&ok_overviews(&snapshot)?);
    let groups = apply(&rows, &filters);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&groups)?);
        return Ok(());
    }

    let visible: usize = groups.iter().map(|g| g.rows.len()).sum();
    for group in &groups {
        println!("== {} ({}) ==", group.label, group.rows.len());
        println!(
            "{:<12} {:<32} {:<12} {:>14} {:>14} {:>14} {:>7} {:<9} {:>10} {:>10}",
            "OK", "Titel", "Konto", "Budget", "Verbraucht", "Verfuegbar", "%", "Status", "Erste", "Letzte"
        );
        for row in &group.rows {
            println!("{}", fmt_row(row));
        }
        println!();
    }

    let canonical = url_state::encode(&filters);
    println!("{} of {} credits shown", visible, rows.len());
    if !canonical.is_empty() {
        println!("Link: /?{}", canonical);
    }
    Ok(())
}
