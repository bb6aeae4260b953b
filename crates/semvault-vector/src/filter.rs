//! Compile `MetadataFilter` equality clauses into a Lance SQL predicate.
use semvault_core::types::MetadataFilter;
use semvault_core::Result;

use crate::schema::{EXTRA_COL, ID_COL};

const STRING_COLUMNS: &[&str] = &["doc_id", "source", "filetype", "generated_by", "artifact_type", "topic"];

fn quote(s: &str) -> String { format!("'{}'", s.replace('\'', "''")) }

/// Backslash-escape LIKE metacharacters so the pattern matches literally.
fn like_literal(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn clause(key: &str, value: &str) -> Result<String> {
    if key == "chunk_id" {
        return Ok(format!("{ID_COL} = {}", quote(value)));
    }
    if key == "chunk_index" {
        // same rule as MetadataFilter::matches: numeric equality, non-numbers match nothing
        return Ok(match value.parse::<usize>() {
            Ok(n) => format!("chunk_index = {n}"),
            Err(_) => "false".to_string(),
        });
    }
    if STRING_COLUMNS.contains(&key) {
        return Ok(format!("{key} = {}", quote(value)));
    }
    // extra tags live in a JSON object column; match the serialized pair
    let pair = format!("{}:{}", serde_json::to_string(key)?, serde_json::to_string(value)?);
    Ok(format!("{EXTRA_COL} LIKE {}", quote(&format!("%{}%", like_literal(&pair)))))
}

/// `None` for an empty filter.
pub fn to_predicate(filter: &MetadataFilter) -> Result<Option<String>> {
    if filter.is_empty() {
        return Ok(None);
    }
    let parts = filter.iter().map(|(k, v)| clause(k, v)).collect::<Result<Vec<_>>>()?;
    Ok(Some(parts.join(" AND ")))
}
