//! `VectorStore` over a LanceDB table living in a vault's index directory.
//!
//! LanceDB is async; the store owns a handle to a shared tokio runtime and
//! blocks on it so the engine can stay synchronous.
use anyhow::{anyhow, Context};
use arrow_array::types::Float32Type;
use arrow_array::{Array, FixedSizeListArray, Float32Array, Int32Array, RecordBatch, RecordBatchIterator, StringArray};
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase, Select};
use lancedb::{connect, DistanceType, Table};
use std::path::Path;
use std::sync::Arc;
use tokio::runtime::Runtime;
use tracing::{debug, info};

use semvault_core::types::{ChunkId, ChunkMetadata, Meta, MetadataFilter, SearchRows};
use semvault_core::traits::VectorStore;
use semvault_core::{Error, Result};

use crate::filter::to_predicate;
use crate::schema::{build_chunk_schema, DISTANCE_COL, EXTRA_COL, ID_COL};

const METADATA_COLUMNS: &[&str] =
    &[ID_COL, "doc_id", "chunk_index", "source", "filetype", "generated_by", "artifact_type", "topic", EXTRA_COL];

fn store_err(e: anyhow::Error) -> Error { Error::Store(format!("{e:#}")) }

/// Open `name` under `uri`, creating it empty with the chunk schema on first use.
async fn open_or_create(uri: &str, name: &str, dim: i32) -> anyhow::Result<Table> {
    let conn = connect(uri).execute().await?;
    if conn.table_names().execute().await?.iter().any(|t| t.as_str() == name) {
        return Ok(conn.open_table(name).execute().await?);
    }
    let schema = build_chunk_schema(dim);
    let empty = RecordBatchIterator::new(Vec::new().into_iter(), schema);
    let table = conn.create_table(name, Box::new(empty)).execute().await?;
    info!("created table '{}' in {}", name, uri);
    Ok(table)
}

#[derive(Debug)]
pub struct LanceVectorStore { runtime: Arc<Runtime>, table: Table, dim: usize, width: i32 }

impl LanceVectorStore {
    pub fn open(runtime: Arc<Runtime>, index_path: &Path, table_name: &str, dim: usize) -> Result<Self> {
        let width = i32::try_from(dim)
            .map_err(|_| Error::Store(format!("vector dimension {dim} does not fit the table schema")))?;
        std::fs::create_dir_all(index_path)?;
        let uri = index_path.to_string_lossy().to_string();
        let table = runtime.block_on(open_or_create(&uri, table_name, width)).map_err(store_err)?;
        debug!("opened lance table '{}' at {}", table_name, uri);
        Ok(Self { runtime, table, dim, width })
    }

    fn to_record_batch(
        &self,
        ids: &[ChunkId],
        embeddings: &[Vec<f32>],
        metadatas: &[ChunkMetadata],
        documents: &[String],
    ) -> anyhow::Result<RecordBatch> {
        if embeddings.len() != ids.len() || metadatas.len() != ids.len() || documents.len() != ids.len() {
            return Err(anyhow!(
                "upsert arrays differ in length: ids={} embeddings={} metadatas={} documents={}",
                ids.len(), embeddings.len(), metadatas.len(), documents.len()
            ));
        }
        if let Some(v) = embeddings.iter().find(|v| v.len() != self.dim) {
            return Err(anyhow!("dim mismatch: got {} expected {}", v.len(), self.dim));
        }
        let mut extras = Vec::with_capacity(metadatas.len());
        for m in metadatas { extras.push(serde_json::to_string(&m.extra)?); }
        let indices = metadatas
            .iter()
            .map(|m| i32::try_from(m.chunk_index).map_err(|_| anyhow!("chunk_index {} out of range", m.chunk_index)))
            .collect::<anyhow::Result<Vec<i32>>>()?;
        let vectors: Vec<Option<Vec<Option<f32>>>> =
            embeddings.iter().map(|v| Some(v.iter().map(|&x| Some(x)).collect())).collect();
        let batch = RecordBatch::try_new(build_chunk_schema(self.width), vec![
            Arc::new(StringArray::from(ids.to_vec())),
            Arc::new(StringArray::from(metadatas.iter().map(|m| m.doc_id.clone()).collect::<Vec<_>>())),
            Arc::new(Int32Array::from(indices)),
            Arc::new(StringArray::from(metadatas.iter().map(|m| m.source.clone()).collect::<Vec<_>>())),
            Arc::new(StringArray::from(metadatas.iter().map(|m| m.filetype.clone()).collect::<Vec<_>>())),
            Arc::new(StringArray::from(documents.to_vec())),
            Arc::new(StringArray::from(metadatas.iter().map(|m| m.generated_by.clone()).collect::<Vec<_>>())),
            Arc::new(StringArray::from(metadatas.iter().map(|m| m.artifact_type.clone()).collect::<Vec<_>>())),
            Arc::new(StringArray::from(metadatas.iter().map(|m| m.topic.clone()).collect::<Vec<_>>())),
            Arc::new(StringArray::from(extras)),
            Arc::new(FixedSizeListArray::from_iter_primitive::<Float32Type, _, _>(vectors.into_iter(), self.width)),
        ])?;
        Ok(batch)
    }
}

fn string_col<'a>(batch: &'a RecordBatch, name: &str) -> anyhow::Result<&'a StringArray> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<StringArray>())
        .ok_or_else(|| anyhow!("missing {name} col"))
}

fn opt_value(col: &StringArray, i: usize) -> Option<String> {
    if col.is_null(i) { None } else { Some(col.value(i).to_string()) }
}

fn metadata_from_batch(batch: &RecordBatch) -> anyhow::Result<Vec<ChunkMetadata>> {
    let ids = string_col(batch, ID_COL)?;
    let doc_ids = string_col(batch, "doc_id")?;
    let sources = string_col(batch, "source")?;
    let filetypes = string_col(batch, "filetype")?;
    let generated_by = string_col(batch, "generated_by")?;
    let artifact_types = string_col(batch, "artifact_type")?;
    let topics = string_col(batch, "topic")?;
    let extras = string_col(batch, EXTRA_COL)?;
    let indices = batch
        .column_by_name("chunk_index")
        .and_then(|c| c.as_any().downcast_ref::<Int32Array>())
        .ok_or_else(|| anyhow!("missing chunk_index col"))?;
    let mut out = Vec::with_capacity(batch.num_rows());
    for i in 0..batch.num_rows() {
        let extra: Meta = serde_json::from_str(extras.value(i)).context("decoding extra tags")?;
        out.push(ChunkMetadata {
            doc_id: doc_ids.value(i).to_string(),
            chunk_id: ids.value(i).to_string(),
            chunk_index: indices.value(i).max(0) as usize,
            source: sources.value(i).to_string(),
            filetype: filetypes.value(i).to_string(),
            generated_by: opt_value(generated_by, i),
            artifact_type: opt_value(artifact_types, i),
            topic: opt_value(topics, i),
            extra,
        });
    }
    Ok(out)
}

impl VectorStore for LanceVectorStore {
    fn upsert(&self, ids: &[ChunkId], embeddings: &[Vec<f32>], metadatas: &[ChunkMetadata], documents: &[String]) -> Result<()> {
        if ids.is_empty() { return Ok(()); }
        let batch = self.to_record_batch(ids, embeddings, metadatas, documents).map_err(store_err)?;
        let schema = batch.schema();
        self.runtime
            .block_on(async {
                let reader = Box::new(RecordBatchIterator::new(vec![Ok(batch)].into_iter(), schema));
                let mut merge = self.table.merge_insert(&[ID_COL]);
                merge.when_matched_update_all(None).when_not_matched_insert_all();
                merge.execute(reader).await?;
                Ok::<_, anyhow::Error>(())
            })
            .map_err(store_err)?;
        debug!("upserted {} rows", ids.len());
        Ok(())
    }

    fn query(&self, embedding: &[f32], k: usize, filter: Option<&MetadataFilter>) -> Result<SearchRows> {
        if k == 0 { return Err(Error::InvalidConfig("k must be at least 1".into())); }
        let predicate = match filter { Some(f) => to_predicate(f)?, None => None };
        let mut rows: Vec<(String, ChunkMetadata, f32)> = self
            .runtime
            .block_on(async {
                let mut q = self.table.vector_search(embedding.to_vec())?.distance_type(DistanceType::Cosine).limit(k);
                if let Some(p) = predicate { q = q.only_if(p); }
                let mut stream = q.execute().await?;
                let mut rows = Vec::new();
                while let Some(batch) = stream.try_next().await? {
                    let contents = string_col(&batch, "content")?;
                    let distances = batch
                        .column_by_name(DISTANCE_COL)
                        .and_then(|c| c.as_any().downcast_ref::<Float32Array>())
                        .ok_or_else(|| anyhow!("missing {DISTANCE_COL} col"))?;
                    for (i, meta) in metadata_from_batch(&batch)?.into_iter().enumerate() {
                        rows.push((contents.value(i).to_string(), meta, distances.value(i)));
                    }
                }
                Ok::<_, anyhow::Error>(rows)
            })
            .map_err(store_err)?;
        if let Some(f) = filter { rows.retain(|(_, meta, _)| f.matches(meta)); }
        rows.sort_by(|a, b| a.2.total_cmp(&b.2));
        rows.truncate(k);

        let mut out = SearchRows::default();
        for (doc, meta, dist) in rows {
            out.documents.push(doc);
            out.metadatas.push(meta);
            out.distances.push(dist);
        }
        Ok(out)
    }

    fn delete(&self, filter: &MetadataFilter) -> Result<()> {
        let predicate = to_predicate(filter)?.unwrap_or_else(|| "true".to_string());
        self.runtime.block_on(self.table.delete(&predicate)).map_err(|e| Error::Store(e.to_string()))?;
        debug!("deleted rows where {}", predicate);
        Ok(())
    }

    fn get_all_metadata(&self) -> Result<Vec<ChunkMetadata>> {
        self.runtime
            .block_on(async {
                let total = self.table.count_rows(None).await?;
                if total == 0 { return Ok(Vec::new()); }
                let mut stream = self
                    .table
                    .query()
                    .select(Select::columns(METADATA_COLUMNS))
                    .limit(total)
                    .execute()
                    .await?;
                let mut out = Vec::with_capacity(total);
                while let Some(batch) = stream.try_next().await? {
                    out.extend(metadata_from_batch(&batch)?);
                }
                Ok::<_, anyhow::Error>(out)
            })
            .map_err(store_err)
    }
}
