//! Named filter presets persisted through a small key-value port.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::filter::FilterState;
use crate::url_state;

pub const VIEWS_KEY: &str = "savedViews";

/// Key-value storage for serialized views.
pub trait ViewStore: Send {
    fn load(&self, key: &str) -> Result<Option<String>>;
    fn store(&mut self, key: &str, value: &str) -> Result<()>;
}

impl<T: ViewStore + ?Sized> ViewStore for Box<T> {
    fn load(&self, key: &str) -> Result<Option<String>> {
        (**self).load(key)
    }

    fn store(&mut self, key: &str, value: &str) -> Result<()> {
        (**self).store(key, value)
    }
}

#[derive(Debug, Default)]
pub struct MemoryViewStore {
    entries: HashMap<String, String>,
}

impl MemoryViewStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ViewStore for MemoryViewStore {
    fn load(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn store(&mut self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// All keys live in one JSON object on disk. A missing file reads as empty.
#[derive(Debug, Clone)]
pub struct JsonFileViewStore {
    path: PathBuf,
}

impl JsonFileViewStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let content = fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        Ok(serde_json::from_str(&content)?)
    }
}

impl ViewStore for JsonFileViewStore {
    fn load(&self, key: &str) -> Result<Option<String>> {
        Ok(self.read_all()?.remove(key))
    }

    fn store(&mut self, key: &str, value: &str) -> Result<()> {
        let mut all = self.read_all()?;
        all.insert(key.to_string(), value.to_string());
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_string_pretty(&all)?)?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedView {
    pub id: String,
    pub name: String,
    pub filters: FilterState,
    /// Canonical query string of `filters`, ready to append to a dashboard link.
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub is_default: bool,
}

pub struct SavedViews<S: ViewStore> {
    store: S,
}

impl<S: ViewStore> SavedViews<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn list(&self) -> Result<Vec<SavedView>> {
        match self.store.load(VIEWS_KEY)? {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(Vec::new()),
        }
    }

    pub fn get(&self, id: &str) -> Result<Option<SavedView>> {
        Ok(self.list()?.into_iter().find(|v| v.id == id))
    }

    pub fn default_view(&self) -> Result<Option<SavedView>> {
        Ok(self.list()?.into_iter().find(|v| v.is_default))
    }

    pub fn save(&mut self, name: &str, filters: FilterState) -> Result<SavedView> {
        let mut views = self.list()?;

        // ids are creation timestamps; bump on collision
        let mut id = Utc::now().timestamp_millis();
        while views.iter().any(|v| v.id == id.to_string()) {
            id += 1;
        }

        let view = SavedView {
            id: id.to_string(),
            name: name.to_string(),
            query: url_state::encode(&filters),
            filters,
            is_default: false,
        };
        views.push(view.clone());
        self.write(&views)?;
        Ok(view)
    }

    pub fn remove(&mut self, id: &str) -> Result<bool> {
        let mut views = self.list()?;
        let before = views.len();
        views.retain(|v| v.id != id);
        if views.len() == before {
            return Ok(false);
        }
        self.write(&views)?;
        Ok(true)
    }

    /// Marks `id` as the default and clears the flag everywhere else.
    pub fn set_default(&mut self, id: &str) -> Result<Option<SavedView>> {
        let mut views = self.list()?;
        if !views.iter().any(|v| v.id == id) {
            return Ok(None);
        }
        for view in &mut views {
            view.is_default = view.id == id;
        }
        self.write(&views)?;
        Ok(views.into_iter().find(|v| v.id == id))
    }

    fn write(&mut self, views: &[SavedView]) -> Result<()> {
        let raw = serde_json::to_string(views)?;
        self.store.store(VIEWS_KEY, &raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::Column;
    use crate::grouping::GroupBy;

    fn filters() -> FilterState {
        let mut state = FilterState {
            group_by: GroupBy::Account,
            ..Default::default()
        };
        state.columns.set(Column::KontoNr, vec!["3911000000".into()]);
        state
    }

    #[test]
    fn test_save_list_and_get() {
        let mut views = SavedViews::new(MemoryViewStore::new());
        assert!(views.list().unwrap().is_empty());

        let a = views.save("Informatik", filters()).unwrap();
        let b = views.save("Alle", FilterState::default()).unwrap();
        assert_ne!(a.id, b.id);
        assert_eq!(a.query, "Konto=3911000000&Gruppierung=Konto");

        let listed = views.list().unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(views.get(&a.id).unwrap().unwrap().filters, filters());
        assert!(views.get("nope").unwrap().is_none());
    }

    #[test]
    fn test_set_default_is_exclusive() {
        let mut views = SavedViews::new(MemoryViewStore::new());
        let a = views.save("A", filters()).unwrap();
        let b = views.save("B", filters()).unwrap();

        views.set_default(&a.id).unwrap();
        views.set_default(&b.id).unwrap();

        let defaults: Vec<String> = views.list().unwrap().into_iter().filter(|v| v.is_default).map(|v| v.id).collect();
        assert_eq!(defaults, vec![b.id.clone()]);
        assert_eq!(views.default_view().unwrap().unwrap().id, b.id);
        assert!(views.set_default("missing").unwrap().is_none());
    }

    #[test]
    fn test_remove() {
        let mut views = SavedViews::new(MemoryViewStore::new());
        let a = views.save("A", filters()).unwrap();
        assert!(views.remove(&a.id).unwrap());
        assert!(!views.remove(&a.id).unwrap());
        assert!(views.list().unwrap().is_empty());
    }

    #[test]
    fn test_json_file_store_persists() {
        let path = std::env::temp_dir().join(format!("kontoradar_views_{}.json", std::process::id()));
        let _ = fs::remove_file(&path);

        let saved = {
            let mut views = SavedViews::new(JsonFileViewStore::new(&path));
            views.save("Persistiert", filters()).unwrap()
        };

        let views = SavedViews::new(JsonFileViewStore::new(&path));
        assert_eq!(views.list().unwrap(), vec![saved]);

        let raw: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert!(raw.get(VIEWS_KEY).is_some());
        fs::remove_file(&path).unwrap();
    }
}
