use std::collections::HashMap;

use semvault_core::types::{ChunkMetadata, DocumentInfo};

/// Group chunk rows by `doc_id`, keeping first-seen order and the first row's
/// source and filetype.
pub fn group_documents(rows: &[ChunkMetadata]) -> Vec<DocumentInfo> {
    let mut out: Vec<DocumentInfo> = Vec::new();
    let mut by_doc: HashMap<&str, usize> = HashMap::new();
    for row in rows {
        match by_doc.get(row.doc_id.as_str()) {
            Some(&i) => out[i].chunk_count += 1,
            None => {
                by_doc.insert(&row.doc_id, out.len());
                out.push(DocumentInfo {
                    doc_id: row.doc_id.clone(),
                    source: row.source.clone(),
                    filetype: row.filetype.clone(),
                    chunk_count: 1,
                });
            }
        }
    }
    out
}
