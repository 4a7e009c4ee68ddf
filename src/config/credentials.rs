//! Local key-value store for secrets such as API keys.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::debug;

/// Key holding the text-generation API key.
pub const OPENAI_API_KEY: &str = "openai_api_key";

/// Key holding a trade store URL that overrides the default.
pub const DATABASE_URL: &str = "database_url";

/// String secrets persisted as a flat JSON object.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
    values: BTreeMap<String, String>,
}

impl CredentialStore {
    /// Open the store at `path`. A missing file is an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let mut store = Self {
            path: path.into(),
            values: BTreeMap::new(),
        };
        store.reload()?;
        Ok(store)
    }

    /// Re-read the file, picking up changes made by other processes.
    pub fn reload(&mut self) -> Result<()> {
        if !self.path.exists() {
            self.values.clear();
            return Ok(());
        }

        let raw = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read credentials from {}", self.path.display()))?;

        self.values = if raw.trim().is_empty() {
            BTreeMap::new()
        } else {
            serde_json::from_str(&raw)
                .with_context(|| format!("Malformed credentials file {}", self.path.display()))?
        };

        debug!(path = %self.path.display(), keys = self.values.len(), "Loaded credentials");
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// Store a value and write the file.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.values.insert(key.to_string(), value.trim().to_string());
        self.save()
    }

    /// Remove a value. Returns whether it existed.
    pub fn remove(&mut self, key: &str) -> Result<bool> {
        let existed = self.values.remove(key).is_some();
        if existed {
            self.save()?;
        }
        Ok(existed)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let json = serde_json::to_string_pretty(&self.values)?;
        fs::write(&self.path, json)
            .with_context(|| format!("Failed to write credentials to {}", self.path.display()))?;
        Ok(())
    }
}

/// Hide most of a secret for display.
pub fn mask(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() <= 8 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..3].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}
