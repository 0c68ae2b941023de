//! # Settings Loader
//!
//! Loads the dashboard's `settings.json` into [`models::Settings`].
//!
//! Every field of the settings file is optional, so a partial file only overrides what it
//! names. When no file exists at all the built-in defaults are used. A file that exists but
//! does not parse is always an error.
//!
//! ```rust,no_run
//! let settings = settings_loader::load_settings_or_default(None)?;
//! let settings = settings_loader::apply_env_overrides(settings, |key| std::env::var(key).ok())?;
//! # Ok::<(), anyhow::Error>(())
//! ```

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use models::Settings;

pub const DEFAULT_SETTINGS_PATH: &str = "settings.json";

/// Loads settings from a JSON file
pub fn load_settings<P: AsRef<Path>>(path: P) -> Result<Settings> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Reading settings file: {}", path.display()))?;
    let settings: Settings = serde_json::from_str(&raw)
        .with_context(|| format!("Parsing settings JSON in {}", path.display()))?;
    validate(&settings).with_context(|| format!("Validating settings in {}", path.display()))?;
    Ok(settings)
}

/// Loads settings from the default location (settings.json in the current directory)
pub fn load_default_settings() -> Result<Settings> {
    load_settings(DEFAULT_SETTINGS_PATH)
}

/// Loads `path` (or `settings.json` when None). A missing file yields the defaults.
pub fn load_settings_or_default(path: Option<&Path>) -> Result<Settings> {
    let path = path.unwrap_or(Path::new(DEFAULT_SETTINGS_PATH));
    if !settings_file_exists(path) {
        return Ok(Settings::default());
    }
    load_settings(path)
}

/// Applies `DATA_PATH`, `VIEWS_PATH`, `HOST` and `PORT` on top of loaded settings.
pub fn apply_env_overrides<F>(mut settings: Settings, lookup: F) -> Result<Settings>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(data_path) = lookup("DATA_PATH") {
        settings.data_path = data_path;
    }
    if let Some(views_path) = lookup("VIEWS_PATH") {
        settings.views_path = views_path;
    }
    if let Some(host) = lookup("HOST") {
        settings.server.host = host;
    }
    if let Some(port) = lookup("PORT") {
        settings.server.port = port
            .parse()
            .with_context(|| format!("PORT must be a number, got '{port}'"))?;
    }
    Ok(settings)
}

fn validate(settings: &Settings) -> Result<()> {
    let treemap = &settings.treemap;
    if treemap.ok_short_label_pct > treemap.ok_full_label_pct {
        bail!(
            "treemap.ok_short_label_pct ({}) must not exceed treemap.ok_full_label_pct ({})",
            treemap.ok_short_label_pct,
            treemap.ok_full_label_pct
        );
    }
    if settings.data_path.trim().is_empty() {
        bail!("data_path must not be empty");
    }
    Ok(())
}

/// Checks if a settings file exists at the given path
pub fn settings_file_exists<P: AsRef<Path>>(path: P) -> bool {
    path.as_ref().exists() && path.as_ref().is_file()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::path::PathBuf;

    fn temp_file(name: &str, content: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("kontoradar_{}_{}", std::process::id(), name));
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let path = temp_file("partial.json", r#"{"data_path": "fixtures/snap.json", "server": {"port": 8080}}"#);
        let settings = load_settings(&path).unwrap();
        assert_eq!(settings.data_path, "fixtures/snap.json");
        assert_eq!(settings.server.port, 8080);
        assert_eq!(settings.server.host, "127.0.0.1");
        assert_eq!(settings.currency, "CHF");
        assert_eq!(settings.treemap.ok_full_label_pct, 3.0);
        fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let missing = std::env::temp_dir().join("kontoradar_does_not_exist.json");
        let settings = load_settings_or_default(Some(missing.as_path())).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let path = temp_file("broken.json", "{ not json");
        assert!(load_settings_or_default(Some(path.as_path())).is_err());
        fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_inverted_thresholds_are_rejected() {
        let path = temp_file(
            "thresholds.json",
            r#"{"treemap": {"ok_full_label_pct": 1.0, "ok_short_label_pct": 2.0}}"#,
        );
        let err = load_settings(&path).unwrap_err();
        assert!(format!("{err:#}").contains("ok_short_label_pct"));
        fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([("DATA_PATH", "/srv/snap.json"), ("PORT", "9000")]);
        let settings =
            apply_env_overrides(Settings::default(), |key| env.get(key).map(|v| v.to_string())).unwrap();
        assert_eq!(settings.data_path, "/srv/snap.json");
        assert_eq!(settings.server.port, 9000);
        assert_eq!(settings.views_path, "data/saved_views.json");

        let bad = apply_env_overrides(Settings::default(), |key| (key == "PORT").then(|| "http".to_string()));
        assert!(bad.is_err());
    }
}
