//! Deterministic identifiers: a document id per source path and a chunk id
//! per (document, ordinal) pair. Re-indexing the same path yields the same ids,
//! which is what makes upsert and delete-by-document idempotent.
use std::path::Path;

use crate::types::ChunkId;

pub const CHUNK_ID_SEPARATOR: &str = "::";

fn blake3_hex(bytes: &[u8]) -> String { blake3::hash(bytes).to_hex().to_string() }

/// Hashes the raw path bytes, so paths that are not valid UTF-8 stay distinct.
pub fn doc_id(path: &Path) -> String {
    blake3_hex(path.as_os_str().as_encoded_bytes())
}

pub fn chunk_id_suffix(index: usize) -> String {
    blake3_hex(index.to_string().as_bytes())
}

pub fn chunk_id(doc_id: &str, index: usize) -> ChunkId {
    format!("{doc_id}{CHUNK_ID_SEPARATOR}{}", chunk_id_suffix(index))
}
