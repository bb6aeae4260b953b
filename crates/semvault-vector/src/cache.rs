//! Per-vault store cache.
//!
//! A store is opened the first time a vault's index directory is touched and
//! then reused for the life of the process. Entries are never rebound to a
//! different directory.
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tracing::info;

use semvault_core::config::StoreSettings;
use semvault_core::traits::{StoreProvider, VectorStore};
use semvault_core::{Error, Result};

use crate::lance::LanceVectorStore;
use crate::memory::MemoryStore;

type Opener = Box<dyn Fn(&Path) -> Result<Arc<dyn VectorStore>> + Send + Sync>;

pub struct StoreCache {
    opener: Opener,
    stores: Mutex<HashMap<PathBuf, Arc<dyn VectorStore>>>,
}

impl StoreCache {
    pub fn new(opener: impl Fn(&Path) -> Result<Arc<dyn VectorStore>> + Send + Sync + 'static) -> Self {
        Self { opener: Box::new(opener), stores: Mutex::new(HashMap::new()) }
    }

    /// LanceDB tables named `settings.table`, one per index directory, sharing one runtime.
    pub fn lance(settings: &StoreSettings, dim: usize) -> Result<Self> {
        let runtime = Arc::new(
            tokio::runtime::Builder::new_multi_thread().enable_all().build()?,
        );
        let table = settings.table.clone();
        Ok(Self::new(move |index_path| {
            let store = LanceVectorStore::open(runtime.clone(), index_path, &table, dim)?;
            Ok(Arc::new(store) as Arc<dyn VectorStore>)
        }))
    }

    /// Fresh in-memory store per index directory.
    pub fn memory(dim: usize) -> Self {
        Self::new(move |_| Ok(Arc::new(MemoryStore::new(dim)) as Arc<dyn VectorStore>))
    }

    pub fn cached(&self) -> usize {
        self.stores.lock().map(|s| s.len()).unwrap_or(0)
    }
}

impl StoreProvider for StoreCache {
    fn open(&self, index_path: &Path) -> Result<Arc<dyn VectorStore>> {
        let key = index_path.canonicalize().unwrap_or_else(|_| index_path.to_path_buf());
        let mut stores = self.stores.lock().map_err(|_| Error::Store("store cache lock poisoned".into()))?;
        if let Some(store) = stores.get(&key) {
            return Ok(store.clone());
        }
        let store = (self.opener)(&key)?;
        info!("opened vector store at {}", key.display());
        stores.insert(key, store.clone());
        Ok(store)
    }
}
