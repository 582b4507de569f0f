//! Client-local preferences
//!
//! A small key/value store persisted as one JSON object, and the theme
//! manager built on top of it.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

/// Key the theme preference is stored under
pub const THEME_KEY: &str = "theme";

/// Errors from reading or writing the preference file
#[derive(Error, Debug)]
pub enum PrefsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Preference file is not a JSON object")]
    NotAnObject,
}

pub type PrefsResult<T> = Result<T, PrefsError>;

/// File-backed preference store
#[derive(Debug, Clone)]
pub struct PreferenceStore {
    path: PathBuf,
}

impl PreferenceStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read a value. Missing keys, unreadable files and values of the wrong
    /// type all come back as `None`.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = match self.load() {
            Ok(mut entries) => entries.remove(key)?,
            Err(e) => {
                tracing::error!(path = ?self.path, "Error reading preferences: {}", e);
                return None;
            }
        };

        serde_json::from_value(value)
            .map_err(|e| tracing::warn!(key, "Ignoring malformed preference: {}", e))
            .ok()
    }

    pub fn set<T: Serialize>(&self, key: &str, value: &T) -> PrefsResult<()> {
        let value = serde_json::to_value(value)?;
        // A corrupt file is replaced rather than blocking every write
        let mut entries = self.load().unwrap_or_default();
        entries.insert(key.to_string(), value);
        self.save(&entries)
    }

    pub fn remove(&self, key: &str) -> PrefsResult<()> {
        let mut entries = self.load()?;
        if entries.remove(key).is_some() {
            self.save(&entries)?;
        }
        Ok(())
    }

    fn load(&self) -> PrefsResult<Map<String, Value>> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_str(&content)? {
            Value::Object(entries) => Ok(entries),
            _ => Err(PrefsError::NotAnObject),
        }
    }

    fn save(&self, entries: &Map<String, Value>) -> PrefsResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(entries)?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }
}

/// Dashboard color theme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Theme::Dark => Theme::Light,
            Theme::Light => Theme::Dark,
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Theme::Light => f.write_str("light"),
            Theme::Dark => f.write_str("dark"),
        }
    }
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            other => Err(format!("unknown theme '{}' (expected light or dark)", other)),
        }
    }
}

/// Applies and persists the theme preference
pub struct ThemeManager {
    store: PreferenceStore,
    current: Theme,
}

impl ThemeManager {
    /// Load the saved theme (light if none) and persist it back.
    pub fn init(store: PreferenceStore) -> Self {
        let saved = store.get::<Theme>(THEME_KEY).unwrap_or_default();
        let mut manager = Self {
            store,
            current: saved,
        };
        manager.set_theme(saved);
        manager
    }

    pub fn current(&self) -> Theme {
        self.current
    }

    /// Apply a theme. A failed write is logged; the theme still applies.
    pub fn set_theme(&mut self, theme: Theme) {
        self.current = theme;
        if let Err(e) = self.store.set(THEME_KEY, &theme) {
            tracing::error!("Error saving theme preference: {}", e);
        }
    }

    pub fn toggle(&mut self) -> Theme {
        let next = self.current.toggled();
        self.set_theme(next);
        next
    }
}
