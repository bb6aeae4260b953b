use crate::error::{Error, Result};
use crate::ids;
use crate::types::{ChunkId, ChunkMetadata, Meta};

/// Keys the pipeline always writes; caller tags may not reuse them.
pub const RESERVED_KEYS: [&str; 5] = ["doc_id", "chunk_id", "chunk_index", "source", "filetype"];

pub fn check_tags(tags: &Meta) -> Result<()> {
    match tags.keys().find(|k| RESERVED_KEYS.contains(&k.as_str())) {
        Some(key) => Err(Error::ReservedMetadataKey(key.clone())),
        None => Ok(()),
    }
}

/// Build `n` chunk ids and `n` index-aligned metadata records for one document.
pub fn build_chunk_metadata(
    doc_id: &str,
    n: usize,
    source: &str,
    filetype: &str,
    tags: Option<&Meta>,
) -> Result<(Vec<ChunkId>, Vec<ChunkMetadata>)> {
    let mut extra = tags.cloned().unwrap_or_default();
    check_tags(&extra)?;
    let generated_by = extra.remove("generated_by");
    let artifact_type = extra.remove("artifact_type");
    let topic = extra.remove("topic");

    let mut chunk_ids = Vec::with_capacity(n);
    let mut metadatas = Vec::with_capacity(n);
    for chunk_index in 0..n {
        let chunk_id = ids::chunk_id(doc_id, chunk_index);
        metadatas.push(ChunkMetadata {
            doc_id: doc_id.to_string(),
            chunk_id: chunk_id.clone(),
            chunk_index,
            source: source.to_string(),
            filetype: filetype.to_string(),
            generated_by: generated_by.clone(),
            artifact_type: artifact_type.clone(),
            topic: topic.clone(),
            extra: extra.clone(),
        });
        chunk_ids.push(chunk_id);
    }
    Ok((chunk_ids, metadatas))
}
