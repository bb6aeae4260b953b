//! Domain types shared by the registry, the ingestion pipeline and the query engine.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

pub type ChunkId = String;
pub type Meta = BTreeMap<String, String>;

/// A named vault: an on-disk root plus the vector index living inside it.
///
/// `index_path` is always `root_path/index`; both are created together by the
/// registry and never relocated independently.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vault {
    pub name: String,
    #[serde(rename = "vault_path")]
    pub root_path: PathBuf,
    pub index_path: PathBuf,
}

/// Well-known tags an agent attaches to content it writes into a vault.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentTags {
    pub generated_by: Option<String>,
    pub artifact_type: Option<String>,
    pub topic: Option<String>,
}

impl From<AgentTags> for Meta {
    fn from(tags: AgentTags) -> Self {
        let mut meta = Meta::new();
        if let Some(v) = tags.generated_by { meta.insert("generated_by".into(), v); }
        if let Some(v) = tags.artifact_type { meta.insert("artifact_type".into(), v); }
        if let Some(v) = tags.topic { meta.insert("topic".into(), v); }
        meta
    }
}

/// Metadata stored next to every chunk vector.
///
/// The base fields are written by the pipeline; `generated_by`, `artifact_type`
/// and `topic` are promoted caller tags, anything else lands in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub doc_id: String,
    pub chunk_id: ChunkId,
    pub chunk_index: usize,
    pub source: String,
    pub filetype: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: Meta,
}

impl ChunkMetadata {
    /// Look up any field by its flat key name.
    pub fn get(&self, key: &str) -> Option<String> {
        match key {
            "doc_id" => Some(self.doc_id.clone()),
            "chunk_id" => Some(self.chunk_id.clone()),
            "chunk_index" => Some(self.chunk_index.to_string()),
            "source" => Some(self.source.clone()),
            "filetype" => Some(self.filetype.clone()),
            "generated_by" => self.generated_by.clone(),
            "artifact_type" => self.artifact_type.clone(),
            "topic" => self.topic.clone(),
            other => self.extra.get(other).cloned(),
        }
    }
}

/// Equality constraints over chunk metadata, all of which must hold.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetadataFilter {
    clauses: BTreeMap<String, String>,
}

impl MetadataFilter {
    pub fn new() -> Self { Self::default() }

    #[must_use]
    pub fn eq(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.clauses.insert(key.into(), value.into());
        self
    }

    pub fn is_empty(&self) -> bool { self.clauses.is_empty() }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.clauses.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// `chunk_index` compares numerically (`"03"` matches index 3); every other
    /// key compares as a string.
    pub fn matches(&self, meta: &ChunkMetadata) -> bool {
        self.clauses.iter().all(|(k, v)| match k.as_str() {
            "chunk_index" => v.parse::<usize>().is_ok_and(|n| n == meta.chunk_index),
            _ => meta.get(k).as_deref() == Some(v.as_str()),
        })
    }
}

impl From<Meta> for MetadataFilter {
    fn from(clauses: Meta) -> Self { Self { clauses } }
}

/// Raw similarity-search output: three parallel arrays for a single query vector,
/// ordered by increasing distance.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchRows {
    pub documents: Vec<String>,
    pub metadatas: Vec<ChunkMetadata>,
    pub distances: Vec<f32>,
}

/// One ranked chunk returned by a query. Lower `score` means more similar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkMatch {
    pub chunk_id: ChunkId,
    pub chunk_index: usize,
    pub text: String,
    pub score: f32,
    pub doc_id: String,
    pub source: String,
    pub generated_by: Option<String>,
    pub artifact_type: Option<String>,
    pub topic: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub query: String,
    pub results: Vec<ChunkMatch>,
}

/// Per-document summary aggregated from stored chunk rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentInfo {
    pub doc_id: String,
    pub source: String,
    pub filetype: String,
    pub chunk_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

impl fmt::Display for SkippedFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.path.display(), self.reason)
    }
}

/// Outcome of a bulk walk: files the operation succeeded on and files it skipped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkReport {
    pub succeeded: Vec<PathBuf>,
    pub skipped: Vec<SkippedFile>,
}
