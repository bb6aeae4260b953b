//! In-memory `VectorStore` for tests and fake-embedding runs.
//!
//! Brute-force cosine distance over every row; rows keep insertion order so
//! metadata listings are stable.
use std::sync::RwLock;

use tracing::debug;

use semvault_core::traits::VectorStore;
use semvault_core::types::{ChunkId, ChunkMetadata, MetadataFilter, SearchRows};
use semvault_core::{Error, Result};

#[derive(Debug, Clone)]
struct Row {
    id: ChunkId,
    embedding: Vec<f32>,
    metadata: ChunkMetadata,
    document: String,
}

#[derive(Debug)]
pub struct MemoryStore {
    dimension: usize,
    rows: RwLock<Vec<Row>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new(dimension: usize) -> Self {
        Self { dimension, rows: RwLock::new(Vec::new()) }
    }

    pub fn len(&self) -> usize {
        self.rows.read().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool { self.len() == 0 }

    /// 1 - cosine similarity; orthogonal or degenerate vectors sit at 1.0.
    fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
        if a.len() != b.len() {
            return 1.0;
        }
        let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
        let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm_a == 0.0 || norm_b == 0.0 {
            return 1.0;
        }
        1.0 - dot / (norm_a * norm_b)
    }
}

fn poisoned<T>(_: T) -> Error { Error::Store("memory store lock poisoned".into()) }

impl VectorStore for MemoryStore {
    fn upsert(&self, ids: &[ChunkId], embeddings: &[Vec<f32>], metadatas: &[ChunkMetadata], documents: &[String]) -> Result<()> {
        if embeddings.len() != ids.len() || metadatas.len() != ids.len() || documents.len() != ids.len() {
            return Err(Error::Store(format!(
                "upsert arrays differ in length: ids={} embeddings={} metadatas={} documents={}",
                ids.len(), embeddings.len(), metadatas.len(), documents.len()
            )));
        }
        if let Some(v) = embeddings.iter().find(|v| v.len() != self.dimension) {
            return Err(Error::Store(format!("dim mismatch: got {} expected {}", v.len(), self.dimension)));
        }
        let mut rows = self.rows.write().map_err(poisoned)?;
        for (((id, embedding), metadata), document) in ids.iter().zip(embeddings).zip(metadatas).zip(documents) {
            let row = Row { id: id.clone(), embedding: embedding.clone(), metadata: metadata.clone(), document: document.clone() };
            match rows.iter_mut().find(|r| &r.id == id) {
                Some(existing) => *existing = row,
                None => rows.push(row),
            }
        }
        debug!("upserted {} chunks", ids.len());
        Ok(())
    }

    fn query(&self, embedding: &[f32], k: usize, filter: Option<&MetadataFilter>) -> Result<SearchRows> {
        if k == 0 {
            return Err(Error::InvalidConfig("k must be at least 1".into()));
        }
        let rows = self.rows.read().map_err(poisoned)?;
        let mut scored: Vec<(f32, &Row)> = rows
            .iter()
            .filter(|r| filter.map_or(true, |f| f.matches(&r.metadata)))
            .map(|r| (Self::cosine_distance(embedding, &r.embedding), r))
            .collect();
        scored.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut out = SearchRows::default();
        for (distance, row) in scored.into_iter().take(k) {
            out.documents.push(row.document.clone());
            out.metadatas.push(row.metadata.clone());
            out.distances.push(distance);
        }
        Ok(out)
    }

    fn delete(&self, filter: &MetadataFilter) -> Result<()> {
        let mut rows = self.rows.write().map_err(poisoned)?;
        let before = rows.len();
        rows.retain(|r| !filter.matches(&r.metadata));
        debug!("deleted {} chunks", before - rows.len());
        Ok(())
    }

    fn get_all_metadata(&self) -> Result<Vec<ChunkMetadata>> {
        Ok(self.rows.read().map_err(poisoned)?.iter().map(|r| r.metadata.clone()).collect())
    }
}
