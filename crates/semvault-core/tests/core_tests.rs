use std::path::Path;

use semvault_core::chunker::{chunk, chunk_with, ChunkingConfig};
use semvault_core::ids::{chunk_id, doc_id};
use semvault_core::metadata::build_chunk_metadata;
use semvault_core::types::{AgentTags, ChunkMetadata, Meta, MetadataFilter};
use semvault_core::{Error, ErrorKind};

fn words(n: usize) -> String {
    (0..n).map(|i| format!("w{i}")).collect::<Vec<_>>().join(" ")
}

#[test]
fn hundred_words_yield_four_windows() {
    let chunks = chunk(&words(100), 50, 20).expect("chunk");
    assert_eq!(chunks.len(), 4, "windows start at 0, 30, 60, 90");
    assert!(chunks[0].starts_with("w0 ") && chunks[0].ends_with(" w49"));
    assert!(chunks[1].starts_with("w30 ") && chunks[1].ends_with(" w79"));
    assert!(chunks[3].starts_with("w90 ") && chunks[3].ends_with(" w99"));
    assert_eq!(chunks[3].split_whitespace().count(), 10, "last window is shorter");
}

#[test]
fn empty_and_blank_text_yield_no_chunks() {
    assert!(chunk("", 50, 20).expect("chunk").is_empty());
    assert!(chunk("  \n\t ", 50, 20).expect("chunk").is_empty());
}

#[test]
fn short_text_is_one_chunk_with_normalized_spacing() {
    let chunks = chunk_with("alpha   bravo\ncharlie", &ChunkingConfig::default()).expect("chunk");
    assert_eq!(chunks, vec!["alpha bravo charlie".to_string()]);
}

#[test]
fn overlap_not_smaller_than_size_is_rejected() {
    for (size, overlap) in [(10, 10), (10, 20), (0, 0)] {
        let err = chunk("a b c", size, overlap).expect_err("must fail");
        assert!(matches!(err, Error::InvalidConfig(_)), "size={size} overlap={overlap}");
    }
}

#[test]
fn ids_are_deterministic_and_path_sensitive() {
    let a1 = doc_id(Path::new("/a/b.md"));
    let a2 = doc_id(Path::new("/a/b.md"));
    let c = doc_id(Path::new("/a/c.md"));
    assert_eq!(a1, a2);
    assert_ne!(a1, c);

    let id0 = chunk_id(&a1, 0);
    assert!(id0.starts_with(&format!("{a1}::")));
    assert_eq!(id0, chunk_id(&a1, 0));
    assert_ne!(id0, chunk_id(&a1, 1));
    // suffix depends on the ordinal only
    assert_eq!(id0.split("::").nth(1), chunk_id(&c, 0).split("::").nth(1));
}

#[cfg(unix)]
#[test]
fn non_utf8_paths_get_distinct_doc_ids() {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    let a = doc_id(Path::new(OsStr::from_bytes(b"/v/\xff.md")));
    let b = doc_id(Path::new(OsStr::from_bytes(b"/v/\xfe.md")));
    assert_ne!(a, b);
    assert_ne!(chunk_id(&a, 0), chunk_id(&b, 0));
    // valid UTF-8 paths hash the same bytes as their string form
    assert_eq!(doc_id(Path::new("/v/a.md")), blake3::hash(b"/v/a.md").to_hex().to_string());
}

#[test]
fn metadata_records_are_index_aligned() {
    let (ids, metas) = build_chunk_metadata("doc", 3, "/v/a.md", "md", None).expect("build");
    assert_eq!(ids.len(), 3);
    assert_eq!(metas.len(), 3);
    for (i, (id, meta)) in ids.iter().zip(&metas).enumerate() {
        assert_eq!(&meta.chunk_id, id);
        assert_eq!(meta.chunk_index, i);
        assert_eq!(meta.doc_id, "doc");
        assert_eq!(meta.source, "/v/a.md");
        assert_eq!(meta.filetype, "md");
        assert!(meta.extra.is_empty());
    }
}

#[test]
fn agent_tags_are_promoted_and_extra_tags_kept() {
    let mut tags: Meta = AgentTags {
        generated_by: Some("planner".into()),
        artifact_type: Some("note".into()),
        topic: None,
    }
    .into();
    tags.insert("project".into(), "apollo".into());

    let (_, metas) = build_chunk_metadata("doc", 1, "/v/a.md", "md", Some(&tags)).expect("build");
    let meta = &metas[0];
    assert_eq!(meta.generated_by.as_deref(), Some("planner"));
    assert_eq!(meta.artifact_type.as_deref(), Some("note"));
    assert_eq!(meta.topic, None);
    assert_eq!(meta.extra.get("project").map(String::as_str), Some("apollo"));
    assert!(!meta.extra.contains_key("generated_by"));
}

#[test]
fn reserved_tag_keys_are_rejected() {
    let mut tags = Meta::new();
    tags.insert("source".into(), "/elsewhere".into());
    let err = build_chunk_metadata("doc", 2, "/v/a.md", "md", Some(&tags)).expect_err("reserved");
    assert!(matches!(err, Error::ReservedMetadataKey(ref k) if k == "source"));
    assert_eq!(err.kind(), ErrorKind::BadRequest);
}

#[test]
fn filter_matches_base_and_tag_fields() {
    let meta = ChunkMetadata {
        doc_id: "d".into(),
        chunk_id: "d::x".into(),
        chunk_index: 2,
        source: "/v/a.md".into(),
        filetype: "md".into(),
        generated_by: None,
        artifact_type: None,
        topic: Some("rust".into()),
        extra: Meta::from([("team".to_string(), "core".to_string())]),
    };
    assert!(MetadataFilter::new().matches(&meta));
    assert!(MetadataFilter::new().eq("doc_id", "d").eq("topic", "rust").matches(&meta));
    assert!(MetadataFilter::new().eq("chunk_index", "2").eq("team", "core").matches(&meta));
    assert!(!MetadataFilter::new().eq("topic", "go").matches(&meta));
    assert!(!MetadataFilter::new().eq("generated_by", "anyone").matches(&meta));
    assert!(MetadataFilter::new().eq("chunk_index", "02").matches(&meta));
    assert!(!MetadataFilter::new().eq("chunk_index", "two").matches(&meta));
}

#[test]
fn error_kinds_distinguish_conflicts_from_validation() {
    let conflict = Error::VaultAlreadyExists { name: "a".into(), existing_path: "/tmp/a".into() };
    assert_eq!(conflict.kind(), ErrorKind::Conflict);
    assert!(conflict.to_string().contains("/tmp/a"));
    assert_eq!(Error::FileAlreadyExists("x.md".into()).kind(), ErrorKind::Conflict);
    assert_eq!(Error::VaultNotFound("a".into()).kind(), ErrorKind::NotFound);
    assert_eq!(Error::EmptyQuery.kind(), ErrorKind::BadRequest);
    assert_eq!(Error::FileOutsideVault("../x".into()).kind(), ErrorKind::BadRequest);
    assert_eq!(Error::Store("boom".into()).kind(), ErrorKind::Internal);
}
