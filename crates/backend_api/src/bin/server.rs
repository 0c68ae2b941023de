use anyhow::Context;
use backend_api::{run_server, AppState, FileBudgetRepository};
use dashboard_engine::JsonFileViewStore;
use std::path::{Path, PathBuf};
use std::{env, sync::Arc};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env is optional
    dotenvy::dotenv().ok();

    let crate_root = env::current_dir().context("Reading current directory")?;
    let workspace_root = find_workspace_root().unwrap_or_else(|| crate_root.clone());
    let bases = [&workspace_root, &crate_root];

    let settings_raw = env::var("KONTORADAR_SETTINGS").unwrap_or_else(|_| "settings.json".to_string());
    let settings_path = resolve_with_fallback(&settings_raw, &bases);
    let settings = settings_loader::load_settings_or_default(Some(settings_path.as_path()))?;
    let settings = settings_loader::apply_env_overrides(settings, |key| env::var(key).ok())?;

    // Relative paths resolve against the workspace root first, then the crate root.
    let snapshot_path = resolve_with_fallback(&settings.data_path, &bases);
    let views_path = resolve_with_fallback(&settings.views_path, &bases);

    println!("KontoRadar API Server");
    println!("=====================");
    println!("Workspace root: {}", workspace_root.display());
    println!("Settings file: {}", settings_path.display());
    println!("Snapshot path (resolved): {}", snapshot_path.display());
    println!("Saved views (resolved): {}", views_path.display());
    println!("Listening on: {}:{}", settings.server.host, settings.server.port);
    println!();

    // Pre-flight checks
    if !snapshot_path.exists() {
        eprintln!("[FATAL] snapshot not found at: {}", snapshot_path.display());
        eprintln!("        Set DATA_PATH or data_path in settings.json to the exported snapshot.");
        std::process::exit(1);
    }

    let repo = Arc::new(FileBudgetRepository::new(&snapshot_path));
    let view_store = Box::new(JsonFileViewStore::new(&views_path));
    let host = settings.server.host.clone();
    let port = settings.server.port;

    run_server(AppState::new(repo, view_store, settings), &host, port).await?;

    Ok(())
}

/// Find the Cargo workspace root by traversing up until a Cargo.toml that contains a [workspace] section.
fn find_workspace_root() -> Option<PathBuf> {
    let mut dir = env::current_dir().ok()?;
    for _ in 0..10 {
        let candidate = dir.join("Cargo.toml");
        if let Ok(content) = std::fs::read_to_string(&candidate) {
            if content.contains("[workspace]") {
                return Some(dir);
            }
        }
        if !dir.pop() {
            break;
        }
    }
    None
}

/// Resolve a raw path against a list of base directories, returning the first existing match,
/// or the path under the first base when none exists yet.
fn resolve_with_fallback(raw: &str, bases: &[&PathBuf]) -> PathBuf {
    let input = PathBuf::from(raw);
    if input.is_absolute() {
        return input;
    }
    for base in bases {
        let candidate = base.join(&input);
        if candidate.exists() {
            return candidate;
        }
    }
    bases
        .first()
        .map(|base| base.join(&input))
        .unwrap_or_else(|| Path::new(".").join(input))
}
