//! semvault-engine
//!
//! The vault engine: resolves vaults through the registry and runs the
//! ingestion pipeline (extract, chunk, embed, tag, upsert) and the query path
//! against each vault's own vector store.
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use semvault_core::chunker::{chunk_with, ChunkingConfig};
use semvault_core::config::Settings;
use semvault_core::extract::PlainTextExtractor;
use semvault_core::guard::{ensure_has_extension, ensure_supported, ensure_within, resolve_in_vault, walk_files};
use semvault_core::ids::doc_id;
use semvault_core::metadata::{build_chunk_metadata, check_tags};
use semvault_core::registry::VaultRegistry;
use semvault_core::traits::{Embedder, Extractor, StoreProvider, VectorStore};
use semvault_core::types::{BulkReport, ChunkMatch, DocumentInfo, Meta, MetadataFilter, QueryResult, SearchRows, SkippedFile, Vault};
use semvault_core::{Error, Result};
use semvault_embed::default_embedder;
use semvault_vector::StoreCache;

pub mod documents;

pub use documents::group_documents;

pub struct VaultEngine {
    registry: VaultRegistry,
    extractor: Box<dyn Extractor>,
    embedder: Box<dyn Embedder>,
    stores: Box<dyn StoreProvider>,
    chunking: ChunkingConfig,
    top_k: usize,
}

impl VaultEngine {
    pub fn new(
        registry: VaultRegistry,
        extractor: Box<dyn Extractor>,
        embedder: Box<dyn Embedder>,
        stores: Box<dyn StoreProvider>,
    ) -> Self {
        Self { registry, extractor, embedder, stores, chunking: ChunkingConfig::default(), top_k: 5 }
    }

    /// Wire the production stack: JSON registry, plain-text extractor, the
    /// configured embedder and one LanceDB table per vault.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        settings.validate()?;
        let embedder = default_embedder(&settings.embed)?;
        let stores = StoreCache::lance(&settings.store, embedder.dim())?;
        let engine = Self::new(
            VaultRegistry::open(settings.registry_path()),
            Box::new(PlainTextExtractor::new()),
            embedder,
            Box::new(stores),
        );
        Ok(engine.with_chunking(settings.chunking).with_top_k(settings.query.top_k))
    }

    #[must_use]
    pub fn with_chunking(mut self, chunking: ChunkingConfig) -> Self { self.chunking = chunking; self }

    #[must_use]
    pub fn with_top_k(mut self, top_k: usize) -> Self { self.top_k = top_k; self }

    pub fn registry(&self) -> &VaultRegistry { &self.registry }

    // ---- vaults ----

    /// Register `name` at `root_path`, creating the root and its index directory.
    /// Returns the canonical root and the registry file location.
    pub fn init_vault(&self, name: &str, root_path: &Path) -> Result<(PathBuf, PathBuf)> {
        let created = self.registry.create_vault(name, root_path)?;
        info!("initialized vault '{}' at {}", name, created.0.display());
        Ok(created)
    }

    /// Make `name` the active vault and return its configuration.
    pub fn use_vault(&self, name: &str) -> Result<Vault> {
        self.registry.set_active_vault(name)?;
        self.registry.get_active_vault_config()
    }

    pub fn list_vaults(&self) -> Result<Vec<String>> { self.registry.list_vaults() }

    pub fn active_vault_name(&self) -> Result<String> { self.registry.active_vault_name() }

    /// The named vault, or the active one when `name` is `None`.
    pub fn vault(&self, name: Option<&str>) -> Result<Vault> { self.registry.resolve(name) }

    fn store(&self, vault: &Vault) -> Result<std::sync::Arc<dyn VectorStore>> {
        self.stores.open(&vault.index_path)
    }

    // ---- single-file pipeline ----

    fn checked_path(&self, path: &Path, vault: &Vault) -> Result<PathBuf> {
        ensure_supported(path, self.extractor.as_ref())?;
        ensure_within(path, &vault.root_path)
    }

    /// Extract, chunk, embed and upsert one file. Returns the number of chunks written.
    pub fn index_file(&self, path: &Path, vault: &Vault, tags: Option<&Meta>) -> Result<usize> {
        let resolved = self.checked_path(path, vault)?;
        if let Some(tags) = tags { check_tags(tags)?; }

        let (text, filetype) = self.extractor.extract(&resolved)?;
        let chunks = chunk_with(&text, &self.chunking)?;
        let embeddings = self.embedder.embed_batch(&chunks)?;
        if embeddings.len() != chunks.len() {
            return Err(Error::Embedding(format!(
                "embedder returned {} vectors for {} chunks",
                embeddings.len(),
                chunks.len()
            )));
        }

        let doc = doc_id(&resolved);
        let source = resolved.to_string_lossy();
        let (ids, metadatas) = build_chunk_metadata(&doc, chunks.len(), &source, &filetype, tags)?;
        self.store(vault)?.upsert(&ids, &embeddings, &metadatas, &chunks)?;
        debug!("indexed {} ({} chunks)", resolved.display(), chunks.len());
        Ok(chunks.len())
    }

    /// Remove every chunk of one file. Deleting a file that was never indexed is fine.
    pub fn delete_file(&self, path: &Path, vault: &Vault) -> Result<()> {
        let resolved = self.checked_path(path, vault)?;
        self.store(vault)?.delete(&MetadataFilter::new().eq("doc_id", doc_id(&resolved)))?;
        debug!("deleted {}", resolved.display());
        Ok(())
    }

    /// Delete then index. Not atomic: if indexing fails the file stays out of the index.
    pub fn reindex_file(&self, path: &Path, vault: &Vault, tags: Option<&Meta>) -> Result<usize> {
        self.delete_file(path, vault)?;
        self.index_file(path, vault, tags)
    }

    // ---- bulk walks ----

    fn walk_apply(&self, base: &Path, vault: &Vault, op: &str, f: impl Fn(&Path) -> Result<()>) -> Result<BulkReport> {
        let mut report = BulkReport::default();
        if !base.exists() {
            warn!("{} skipped {}: path does not exist", op, base.display());
            report.skipped.push(SkippedFile { path: base.to_path_buf(), reason: "path does not exist".into() });
            return Ok(report);
        }
        for file in walk_files(base, std::slice::from_ref(&vault.index_path))? {
            match f(&file) {
                Ok(()) => report.succeeded.push(file),
                Err(e) => {
                    warn!("{} skipped {}: {}", op, file.display(), e);
                    report.skipped.push(SkippedFile { path: file, reason: e.to_string() });
                }
            }
        }
        info!("{}: {} succeeded, {} skipped", op, report.succeeded.len(), report.skipped.len());
        Ok(report)
    }

    /// Index `base` (a file, or every file below a directory) into the vault.
    /// Per-file failures are collected in the report instead of aborting.
    pub fn index_files(&self, base: &Path, vault_name: Option<&str>, tags: Option<&Meta>) -> Result<BulkReport> {
        let vault = self.vault(vault_name)?;
        self.walk_apply(base, &vault, "index", |p| self.index_file(p, &vault, tags).map(|_| ()))
    }

    pub fn delete_files(&self, base: &Path, vault_name: Option<&str>) -> Result<BulkReport> {
        let vault = self.vault(vault_name)?;
        self.walk_apply(base, &vault, "delete", |p| self.delete_file(p, &vault))
    }

    pub fn reindex_files(&self, base: &Path, vault_name: Option<&str>, tags: Option<&Meta>) -> Result<BulkReport> {
        let vault = self.vault(vault_name)?;
        self.walk_apply(base, &vault, "reindex", |p| self.reindex_file(p, &vault, tags).map(|_| ()))
    }

    /// Write `content` to `relative` inside the vault and index it.
    /// The file stays on disk even if indexing fails afterwards.
    pub fn write_file(
        &self,
        relative: &Path,
        content: &str,
        overwrite: bool,
        vault_name: Option<&str>,
        tags: Option<&Meta>,
    ) -> Result<PathBuf> {
        let vault = self.vault(vault_name)?;
        ensure_has_extension(relative)?;
        ensure_supported(relative, self.extractor.as_ref())?;
        let target = resolve_in_vault(&vault.root_path, relative)?;
        if let Some(tags) = tags { check_tags(tags)?; }
        if target.exists() && !overwrite {
            return Err(Error::FileAlreadyExists(target));
        }
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&target, content)?;
        info!("wrote {}", target.display());
        self.index_file(&target, &vault, tags)?;
        Ok(target)
    }

    // ---- query ----

    /// Embed `text` and return the closest chunks, lowest distance first.
    /// `k` defaults to the configured top-k.
    pub fn query(
        &self,
        text: &str,
        vault_name: Option<&str>,
        filter: Option<&MetadataFilter>,
        k: Option<usize>,
    ) -> Result<QueryResult> {
        if text.trim().is_empty() {
            return Err(Error::EmptyQuery);
        }
        let k = k.unwrap_or(self.top_k);
        if k == 0 {
            return Err(Error::InvalidConfig("k must be at least 1".into()));
        }
        let vault = self.vault(vault_name)?;
        let embedding = self
            .embedder
            .embed_batch(&[text.to_string()])?
            .pop()
            .ok_or_else(|| Error::Embedding("embedder returned no vector for the query".into()))?;
        let filter = filter.filter(|f| !f.is_empty());
        let rows = self.store(&vault)?.query(&embedding, k, filter)?;
        debug!("query '{}' on '{}' returned {} rows", text, vault.name, rows.documents.len());
        Ok(QueryResult { query: text.to_string(), results: zip_rows(rows)? })
    }

    /// One summary per indexed document, in the order the store returns its rows.
    pub fn list_documents(&self, vault_name: Option<&str>) -> Result<Vec<DocumentInfo>> {
        let vault = self.vault(vault_name)?;
        Ok(group_documents(&self.store(&vault)?.get_all_metadata()?))
    }
}

/// Pair the store's parallel arrays position by position.
pub fn zip_rows(rows: SearchRows) -> Result<Vec<ChunkMatch>> {
    let SearchRows { documents, metadatas, distances } = rows;
    if documents.len() != metadatas.len() || documents.len() != distances.len() {
        return Err(Error::Store(format!(
            "misaligned search rows: documents={} metadatas={} distances={}",
            documents.len(),
            metadatas.len(),
            distances.len()
        )));
    }
    Ok(documents
        .into_iter()
        .zip(metadatas)
        .zip(distances)
        .map(|((text, meta), score)| ChunkMatch {
            chunk_id: meta.chunk_id,
            chunk_index: meta.chunk_index,
            text,
            score,
            doc_id: meta.doc_id,
            source: meta.source,
            generated_by: meta.generated_by,
            artifact_type: meta.artifact_type,
            topic: meta.topic,
        })
        .collect())
}
