use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

impl Theme {
    /// Value of the document-level theme attribute.
    pub fn attribute(self) -> &'static str {
        match self {
            Theme::Dark => "dark",
            Theme::Light => "light",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Theme::Dark => Theme::Light,
            Theme::Light => Theme::Dark,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    pub theme: Theme,
}

pub trait PreferenceStore: Send + Sync {
    fn load(&self) -> Result<Option<Preferences>>;
    fn save(&self, prefs: &Preferences) -> Result<()>;
}

pub struct FilePreferenceStore {
    path: PathBuf,
}

impl FilePreferenceStore {
    pub fn new(root: PathBuf) -> Result<Self> {
        fs::create_dir_all(&root)
            .with_context(|| format!("failed to create preference directory at {:?}", root))?;
        Ok(Self {
            path: root.join("preferences.json"),
        })
    }
}

impl PreferenceStore for FilePreferenceStore {
    fn load(&self) -> Result<Option<Preferences>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let mut file = File::open(&self.path)
            .with_context(|| format!("failed to open preference file {:?}", self.path))?;
        let mut buf = String::new();
        file.read_to_string(&mut buf)?;
        let prefs = serde_json::from_str(&buf)
            .with_context(|| format!("failed to decode preference file {:?}", self.path))?;
        Ok(Some(prefs))
    }

    fn save(&self, prefs: &Preferences) -> Result<()> {
        let tmp = self.path.with_extension("json.tmp");
        let payload = serde_json::to_string_pretty(prefs)?;
        let mut file = File::create(&tmp)
            .with_context(|| format!("failed to open temp preference file {:?}", tmp))?;
        file.write_all(payload.as_bytes())?;
        file.flush()?;
        fs::rename(tmp, &self.path)?;
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryPreferenceStore {
    inner: Mutex<Option<Preferences>>,
}

impl MemoryPreferenceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreferenceStore for MemoryPreferenceStore {
    fn load(&self) -> Result<Option<Preferences>> {
        Ok(self.inner.lock().clone())
    }

    fn save(&self, prefs: &Preferences) -> Result<()> {
        *self.inner.lock() = Some(prefs.clone());
        Ok(())
    }
}

/// Loaded once at start, written through on every change.
pub struct ThemeSetting {
    store: Arc<dyn PreferenceStore>,
    current: Theme,
}

impl ThemeSetting {
    pub fn load(store: Arc<dyn PreferenceStore>) -> Result<Self> {
        let current = store.load()?.unwrap_or_default().theme;
        Ok(Self { store, current })
    }

    pub fn current(&self) -> Theme {
        self.current
    }

    pub fn set(&mut self, theme: Theme) -> Result<()> {
        if theme == self.current {
            return Ok(());
        }
        self.store.save(&Preferences { theme })?;
        self.current = theme;
        info!(theme = theme.attribute(), "theme changed");
        Ok(())
    }
}
