//! Named vaults and the active-vault pointer, persisted as one JSON document.
//!
//! The registry is constructed once and handed to every engine operation;
//! storage sits behind [`RegistryStore`] so tests and embedders can swap it.
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::traits::RegistryStore;
use crate::types::Vault;

pub const INDEX_DIR_NAME: &str = "index";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultEntry {
    pub vault_path: PathBuf,
    pub index_path: PathBuf,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryState {
    #[serde(default)]
    pub active_vault: Option<String>,
    #[serde(default)]
    pub vaults: BTreeMap<String, VaultEntry>,
}

impl RegistryState {
    fn vault(&self, name: &str) -> Result<Vault> {
        let entry = self.vaults.get(name).ok_or_else(|| Error::VaultNotFound(name.to_string()))?;
        Ok(Vault { name: name.to_string(), root_path: entry.vault_path.clone(), index_path: entry.index_path.clone() })
    }
}

/// Registry state stored as pretty JSON at a fixed path. A missing file reads
/// as the empty registry.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self { Self { path: path.into() } }
}

impl RegistryStore for JsonFileStore {
    fn load(&self) -> Result<RegistryState> {
        if !self.path.exists() {
            return Ok(RegistryState::default());
        }
        let raw = fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    fn save(&self, state: &RegistryState) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_string_pretty(state)?)?;
        fs::rename(&tmp, &self.path)?;
        debug!("registry saved to {}", self.path.display());
        Ok(())
    }

    fn location(&self) -> PathBuf { self.path.clone() }
}

pub struct VaultRegistry {
    store: Box<dyn RegistryStore>,
}

impl VaultRegistry {
    pub fn new(store: impl RegistryStore + 'static) -> Self { Self { store: Box::new(store) } }

    pub fn open(path: impl Into<PathBuf>) -> Self { Self::new(JsonFileStore::new(path)) }

    pub fn location(&self) -> PathBuf { self.store.location() }

    /// Register `name` at `root_path`, creating the root and its index directory.
    /// The first vault ever created becomes the active one.
    /// Returns the canonical root path and the registry location.
    pub fn create_vault(&self, name: &str, root_path: &Path) -> Result<(PathBuf, PathBuf)> {
        if name.trim().is_empty() {
            return Err(Error::InvalidConfig("vault name must not be empty".into()));
        }
        let mut state = self.store.load()?;
        if let Some(existing) = state.vaults.get(name) {
            return Err(Error::VaultAlreadyExists { name: name.to_string(), existing_path: existing.vault_path.clone() });
        }

        fs::create_dir_all(root_path)?;
        let root = root_path.canonicalize()?;
        let index = root.join(INDEX_DIR_NAME);
        fs::create_dir_all(&index)?;

        state.vaults.insert(name.to_string(), VaultEntry { vault_path: root.clone(), index_path: index });
        if state.active_vault.is_none() {
            state.active_vault = Some(name.to_string());
        }
        self.store.save(&state)?;
        info!("created vault '{}' at {}", name, root.display());
        Ok((root, self.store.location()))
    }

    pub fn get_vault_config(&self, name: &str) -> Result<Vault> {
        self.store.load()?.vault(name)
    }

    pub fn active_vault_name(&self) -> Result<String> {
        self.store.load()?.active_vault.ok_or(Error::VaultNotInitialized)
    }

    pub fn get_active_vault_config(&self) -> Result<Vault> {
        let state = self.store.load()?;
        let name = state.active_vault.as_deref().ok_or(Error::VaultNotInitialized)?;
        state.vault(name)
    }

    pub fn set_active_vault(&self, name: &str) -> Result<()> {
        let mut state = self.store.load()?;
        if !state.vaults.contains_key(name) {
            return Err(Error::VaultNotFound(name.to_string()));
        }
        state.active_vault = Some(name.to_string());
        self.store.save(&state)?;
        info!("active vault is now '{}'", name);
        Ok(())
    }

    /// Registered vault names, sorted.
    pub fn list_vaults(&self) -> Result<Vec<String>> {
        Ok(self.store.load()?.vaults.into_keys().collect())
    }

    /// The named vault, or the active one when `name` is `None`.
    pub fn resolve(&self, name: Option<&str>) -> Result<Vault> {
        match name {
            Some(name) => self.get_vault_config(name),
            None => self.get_active_vault_config(),
        }
    }
}
