use arrow_schema::{DataType, Field, Schema};
use std::sync::Arc;

pub const ID_COL: &str = "id";
pub const VECTOR_COL: &str = "vector";
pub const DISTANCE_COL: &str = "_distance";
pub const EXTRA_COL: &str = "extra";

/// One row per chunk. `extra` holds caller tags beyond the well-known ones as a JSON object.
pub fn build_chunk_schema(dim: i32) -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new(ID_COL, DataType::Utf8, false),
        Field::new("doc_id", DataType::Utf8, false),
        Field::new("chunk_index", DataType::Int32, false),
        Field::new("source", DataType::Utf8, false),
        Field::new("filetype", DataType::Utf8, false),
        Field::new("content", DataType::Utf8, false),
        Field::new("generated_by", DataType::Utf8, true),
        Field::new("artifact_type", DataType::Utf8, true),
        Field::new("topic", DataType::Utf8, true),
        Field::new(EXTRA_COL, DataType::Utf8, false),
        Field::new(VECTOR_COL, DataType::FixedSizeList(Arc::new(Field::new("item", DataType::Float32, true)), dim), true),
    ]))
}
