use semvault_core::config::EmbedSettings;
use semvault_core::traits::Embedder;
use semvault_embed::{default_embedder, FakeEmbedder, MODEL_DIM};

#[test]
fn fake_embedder_shapes_and_determinism() {
    let embedder = FakeEmbedder::default();
    let texts = vec!["hello world".to_string(), "hello world".to_string(), "other words".to_string()];
    let embs = embedder.embed_batch(&texts).expect("embed_batch");
    assert_eq!(embs.len(), 3, "one vector per input, in order");

    let v1 = &embs[0];
    assert_eq!(v1.len(), MODEL_DIM);
    assert_eq!(embedder.dim(), MODEL_DIM);

    let norm: f32 = v1.iter().map(|x| x * x).sum::<f32>().sqrt();
    assert!((norm - 1.0).abs() <= 1e-3, "vector is L2-normalized (norm={norm})");

    for (a, b) in v1.iter().zip(embs[1].iter()) { assert!((a - b).abs() <= 1e-6); }
    assert!(v1.iter().zip(embs[2].iter()).any(|(a, b)| (a - b).abs() > 1e-6));
}

#[test]
fn empty_batch_is_empty() {
    assert!(FakeEmbedder::new(8).embed_batch(&[]).expect("embed").is_empty());
}

#[test]
fn settings_flag_selects_fake_embedder() {
    let settings = EmbedSettings { model_dir: None, use_fake: true };
    let embedder = default_embedder(&settings).expect("embedder");
    assert_eq!(embedder.dim(), MODEL_DIM);
    assert_eq!(embedder.embed_batch(&["x".to_string()]).expect("embed").len(), 1);
}

#[test]
fn missing_model_dir_is_an_embedding_error() {
    if std::env::var("SEMVAULT_USE_FAKE_EMBEDDINGS").is_ok() || std::env::var("SEMVAULT_MODEL_DIR").is_ok() {
        return;
    }
    let settings = EmbedSettings { model_dir: Some("/definitely/not/here".into()), use_fake: false };
    match default_embedder(&settings) {
        Err(semvault_core::Error::Embedding(msg)) => assert!(msg.contains("model directory") || msg.contains("tokenizer")),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => {}
    }
}
