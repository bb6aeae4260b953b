use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::Result;
use crate::registry::RegistryState;
use crate::types::{ChunkId, ChunkMetadata, MetadataFilter, SearchRows};

pub trait Embedder: Send + Sync {
    fn dim(&self) -> usize;
    fn max_len(&self) -> usize;
    /// Output has the same length and order as `texts`.
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Turns a file into `(text, filetype)`.
pub trait Extractor: Send + Sync {
    fn supports(&self, path: &Path) -> bool;
    fn extract(&self, path: &Path) -> Result<(String, String)>;
}

/// A persistent collection of chunk vectors keyed by chunk id.
pub trait VectorStore: Send + Sync {
    /// Insert or replace rows by id. All slices are index-aligned.
    fn upsert(
        &self,
        ids: &[ChunkId],
        embeddings: &[Vec<f32>],
        metadatas: &[ChunkMetadata],
        documents: &[String],
    ) -> Result<()>;

    /// Nearest rows to `embedding`, closest first.
    fn query(&self, embedding: &[f32], k: usize, filter: Option<&MetadataFilter>) -> Result<SearchRows>;

    /// Remove every row matching `filter`. Matching nothing is not an error.
    fn delete(&self, filter: &MetadataFilter) -> Result<()>;

    fn get_all_metadata(&self) -> Result<Vec<ChunkMetadata>>;
}

/// Hands out the vector store bound to a vault's index directory.
pub trait StoreProvider: Send + Sync {
    fn open(&self, index_path: &Path) -> Result<Arc<dyn VectorStore>>;
}

/// Backing storage for the vault registry.
pub trait RegistryStore: Send + Sync {
    fn load(&self) -> Result<RegistryState>;
    fn save(&self, state: &RegistryState) -> Result<()>;
    fn location(&self) -> PathBuf;
}
