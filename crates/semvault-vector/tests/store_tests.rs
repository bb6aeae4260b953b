use std::sync::Arc;

use tempfile::TempDir;

use semvault_core::metadata::build_chunk_metadata;
use semvault_core::traits::{Embedder, StoreProvider, VectorStore};
use semvault_core::types::{ChunkMetadata, Meta, MetadataFilter};
use semvault_embed::FakeEmbedder;
use semvault_vector::filter::to_predicate;
use semvault_vector::{LanceVectorStore, MemoryStore, StoreCache};

const DIM: usize = 64;

struct Fixture {
    ids: Vec<String>,
    embeddings: Vec<Vec<f32>>,
    metadatas: Vec<ChunkMetadata>,
    documents: Vec<String>,
}

fn fixture(doc_id: &str, source: &str, texts: &[&str], tags: Option<&Meta>) -> Fixture {
    let documents: Vec<String> = texts.iter().map(|t| t.to_string()).collect();
    let (ids, metadatas) = build_chunk_metadata(doc_id, documents.len(), source, "md", tags).unwrap();
    let embeddings = FakeEmbedder::new(DIM).embed_batch(&documents).unwrap();
    Fixture { ids, embeddings, metadatas, documents }
}

fn load(store: &dyn VectorStore, f: &Fixture) {
    store.upsert(&f.ids, &f.embeddings, &f.metadatas, &f.documents).unwrap();
}

fn query_text(store: &dyn VectorStore, text: &str, k: usize, filter: Option<&MetadataFilter>) -> semvault_core::types::SearchRows {
    let q = FakeEmbedder::new(DIM).embed_batch(&[text.to_string()]).unwrap().remove(0);
    store.query(&q, k, filter).unwrap()
}

fn exercise(store: &dyn VectorStore) {
    let tags = Meta::from([("topic".to_string(), "rust".to_string()), ("team".to_string(), "core".to_string())]);
    let a = fixture("doc-a", "/v/a.md", &["borrow checker lifetimes", "cargo workspaces"], Some(&tags));
    let b = fixture("doc-b", "/v/b.md", &["sourdough starter hydration"], None);
    load(store, &a);
    load(store, &b);
    assert_eq!(store.get_all_metadata().unwrap().len(), 3);

    // re-upserting the same ids replaces rows
    load(store, &a);
    assert_eq!(store.get_all_metadata().unwrap().len(), 3);

    let rows = query_text(store, "borrow checker lifetimes", 2, None);
    assert_eq!(rows.documents.len(), 2);
    assert_eq!(rows.metadatas.len(), 2);
    assert_eq!(rows.distances.len(), 2);
    assert_eq!(rows.documents[0], "borrow checker lifetimes");
    assert!(rows.distances[0] < 1e-4);
    assert!(rows.distances[0] <= rows.distances[1]);

    let only_b = MetadataFilter::new().eq("doc_id", "doc-b");
    let rows = query_text(store, "borrow checker lifetimes", 5, Some(&only_b));
    assert_eq!(rows.documents, vec!["sourdough starter hydration".to_string()]);

    let tagged = MetadataFilter::new().eq("topic", "rust").eq("team", "core");
    let rows = query_text(store, "cargo", 5, Some(&tagged));
    assert_eq!(rows.metadatas.len(), 2);
    assert!(rows.metadatas.iter().all(|m| m.doc_id == "doc-a" && m.extra["team"] == "core"));

    let second = MetadataFilter::new().eq("doc_id", "doc-a").eq("chunk_index", "01");
    let rows = query_text(store, "cargo", 5, Some(&second));
    assert_eq!(rows.documents, vec!["cargo workspaces".to_string()]);
    let worded = MetadataFilter::new().eq("chunk_index", "one");
    assert!(query_text(store, "cargo", 5, Some(&worded)).documents.is_empty());

    store.delete(&MetadataFilter::new().eq("doc_id", "doc-a")).unwrap();
    let remaining = store.get_all_metadata().unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].source, "/v/b.md");

    // deleting an absent document is a no-op
    store.delete(&MetadataFilter::new().eq("doc_id", "doc-a")).unwrap();
    assert_eq!(store.get_all_metadata().unwrap().len(), 1);
}

#[test]
fn memory_store_behaves_like_a_vector_store() {
    let store = MemoryStore::new(DIM);
    exercise(&store);
    assert_eq!(store.len(), 1);
}

#[test]
fn lance_store_persists_in_index_directory() {
    let tmp = TempDir::new().unwrap();
    let index = tmp.path().join("vault").join("index");
    let runtime = Arc::new(tokio::runtime::Runtime::new().unwrap());
    let store = LanceVectorStore::open(runtime.clone(), &index, "chunks", DIM).unwrap();
    exercise(&store);
    drop(store);

    let reopened = LanceVectorStore::open(runtime, &index, "chunks", DIM).unwrap();
    let metas = reopened.get_all_metadata().unwrap();
    assert_eq!(metas.len(), 1);
    assert_eq!(metas[0].doc_id, "doc-b");
    assert_eq!(metas[0].topic, None);
}

fn team_rows(store: &dyn VectorStore, team: &str) -> Vec<String> {
    let filter = MetadataFilter::new().eq("team", team);
    let mut sources: Vec<String> =
        query_text(store, "notes", 10, Some(&filter)).metadatas.into_iter().map(|m| m.source).collect();
    sources.sort();
    sources
}

fn tag_values_match_literally(store: &dyn VectorStore) {
    for (i, team) in [r"a\b", "a_b", "axb", "50%", "500"].iter().enumerate() {
        let tags = Meta::from([("team".to_string(), team.to_string())]);
        load(store, &fixture(&format!("t{i}"), &format!("/v/t{i}.md"), &["team notes"], Some(&tags)));
    }
    assert_eq!(team_rows(store, r"a\b"), vec!["/v/t0.md"]);
    assert_eq!(team_rows(store, "a_b"), vec!["/v/t1.md"]);
    assert_eq!(team_rows(store, "50%"), vec!["/v/t3.md"]);
    assert!(team_rows(store, r"a\").is_empty());
}

#[test]
fn tag_values_with_wildcards_match_literally() {
    tag_values_match_literally(&MemoryStore::new(DIM));

    let tmp = TempDir::new().unwrap();
    let runtime = Arc::new(tokio::runtime::Runtime::new().unwrap());
    let store = LanceVectorStore::open(runtime, &tmp.path().join("index"), "chunks", DIM).unwrap();
    tag_values_match_literally(&store);
}

#[test]
fn out_of_range_widths_are_store_errors() {
    let tmp = TempDir::new().unwrap();
    let runtime = Arc::new(tokio::runtime::Runtime::new().unwrap());
    let err = LanceVectorStore::open(runtime.clone(), &tmp.path().join("wide"), "chunks", usize::MAX).unwrap_err();
    assert!(matches!(err, semvault_core::Error::Store(_)), "{err:?}");

    let store = LanceVectorStore::open(runtime, &tmp.path().join("index"), "chunks", DIM).unwrap();
    let mut f = fixture("d", "/v/d.md", &["overflowing chunk"], None);
    f.metadatas[0].chunk_index = i32::MAX as usize + 1;
    let err = store.upsert(&f.ids, &f.embeddings, &f.metadatas, &f.documents).unwrap_err();
    assert!(matches!(err, semvault_core::Error::Store(_)), "{err:?}");
    assert!(store.get_all_metadata().unwrap().is_empty());
}

#[test]
fn mismatched_arrays_and_zero_k_are_rejected() {
    let store = MemoryStore::new(DIM);
    let f = fixture("d", "/v/d.md", &["one", "two"], None);
    assert!(store.upsert(&f.ids, &f.embeddings[..1], &f.metadatas, &f.documents).is_err());
    assert!(store.upsert(&f.ids, &[vec![0.0; 3], vec![0.0; 3]], &f.metadatas, &f.documents).is_err());
    load(&store, &f);
    assert!(store.query(&f.embeddings[0], 0, None).is_err());
}

#[test]
fn cache_hands_out_one_store_per_index_dir() {
    let tmp = TempDir::new().unwrap();
    let a = tmp.path().join("a");
    let b = tmp.path().join("b");
    std::fs::create_dir_all(&a).unwrap();
    std::fs::create_dir_all(&b).unwrap();

    let cache = StoreCache::memory(DIM);
    let first = cache.open(&a).unwrap();
    let again = cache.open(&a).unwrap();
    let other = cache.open(&b).unwrap();
    assert!(Arc::ptr_eq(&first, &again));
    assert!(!Arc::ptr_eq(&first, &other));
    assert_eq!(cache.cached(), 2);

    load(first.as_ref(), &fixture("d", "/a/d.md", &["only in a"], None));
    assert!(other.get_all_metadata().unwrap().is_empty());
}

#[test]
fn filters_compile_to_quoted_predicates() {
    assert_eq!(to_predicate(&MetadataFilter::new()).unwrap(), None);
    let p = to_predicate(&MetadataFilter::new().eq("doc_id", "it's")).unwrap().unwrap();
    assert_eq!(p, "doc_id = 'it''s'");
    let p = to_predicate(&MetadataFilter::new().eq("chunk_index", "3").eq("chunk_id", "x::y")).unwrap().unwrap();
    assert_eq!(p, "id = 'x::y' AND chunk_index = 3");
    let p = to_predicate(&MetadataFilter::new().eq("team", "core")).unwrap().unwrap();
    assert_eq!(p, r#"extra LIKE '%"team":"core"%'"#);
    let p = to_predicate(&MetadataFilter::new().eq("chunk_index", "03")).unwrap().unwrap();
    assert_eq!(p, "chunk_index = 3");
    let p = to_predicate(&MetadataFilter::new().eq("chunk_index", "two")).unwrap().unwrap();
    assert_eq!(p, "false");
    let p = to_predicate(&MetadataFilter::new().eq("team", "50%_a")).unwrap().unwrap();
    assert_eq!(p, r#"extra LIKE '%"team":"50\%\_a"%'"#);
    let p = to_predicate(&MetadataFilter::new().eq("team", r"a\b")).unwrap().unwrap();
    assert_eq!(p, r#"extra LIKE '%"team":"a\\\\b"%'"#);
}
