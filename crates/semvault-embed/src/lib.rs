//! semvault-embed
//!
//! Embedding backends behind `semvault_core::traits::Embedder`: a local
//! XLM-RoBERTa (BGE-M3 layout) model run with candle, and a hashing
//! `FakeEmbedder` for tests and offline development.
use anyhow::{anyhow, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::xlm_roberta::{Config as XLMRobertaConfig, XLMRobertaModel};
use tokenizers::Tokenizer;
use tracing::{debug, info, warn};

use semvault_core::config::EmbedSettings;
use semvault_core::traits::Embedder;
use semvault_core::Error;

pub mod pool;
pub mod tokenize;

pub use pool::{l2_normalize, masked_mean, masked_mean_l2};

pub const MODEL_DIM: usize = 1024;
pub const MODEL_MAX_LEN: usize = 256;
const MODEL_BATCH: usize = 16;

fn embed_err(e: anyhow::Error) -> Error { Error::Embedding(format!("{e:#}")) }

/// Metal when built with the `metal` feature and a GPU is present, CPU otherwise.
fn select_device() -> Device {
    #[cfg(feature = "metal")]
    {
        match Device::new_metal(0) {
            Ok(dev) => {
                info!("embedding on Metal");
                return dev;
            }
            Err(e) => warn!("metal unavailable, falling back to CPU: {e}"),
        }
    }
    info!("embedding on CPU");
    Device::Cpu
}

pub struct EmbeddingModel { model: XLMRobertaModel, tokenizer: Tokenizer, device: Device, dim: usize }

impl EmbeddingModel {
    pub fn load(model_dir: &Path) -> Result<Self> {
        let device = select_device();
        info!("loading embedding model from {}", model_dir.display());
        let tokenizer_path = model_dir.join("tokenizer.json");
        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow!("Failed to load tokenizer from {}: {}", tokenizer_path.display(), e))?;
        let config_path = model_dir.join("config.json");
        let config: XLMRobertaConfig = serde_json::from_str(&std::fs::read_to_string(&config_path)?)?;
        let dim = config.hidden_size;

        let safetensors = model_dir.join("model.safetensors");
        let vb = if safetensors.exists() {
            debug!("reading weights from {}", safetensors.display());
            // SAFETY: the weights file is not modified while mapped.
            unsafe { VarBuilder::from_mmaped_safetensors(&[safetensors], DType::F32, &device)? }
        } else {
            let weights_path = model_dir.join("pytorch_model.bin");
            debug!("reading weights from {}", weights_path.display());
            let weights: HashMap<String, Tensor> = candle_core::pickle::read_all(&weights_path)?.into_iter().collect();
            VarBuilder::from_tensors(weights, DType::F32, &device)
        };
        let model = XLMRobertaModel::new(&config, vb)?;
        info!("embedding model loaded (dim {})", dim);
        Ok(Self { model, tokenizer, device, dim })
    }

    fn embed_chunk(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let start = Instant::now();
        let (input_ids, attention_mask) = tokenize::tokenize_batch(&self.tokenizer, texts, MODEL_MAX_LEN, &self.device)?;
        let token_type_ids = Tensor::zeros((texts.len(), MODEL_MAX_LEN), DType::I64, &self.device)?;
        let hidden = self.model.forward(&input_ids, &attention_mask, &token_type_ids, None, None, None)?;
        let pooled = masked_mean_l2(&hidden, &attention_mask)?;
        let vectors: Vec<Vec<f32>> = pooled.to_device(&Device::Cpu)?.to_vec2()?;
        if start.elapsed().as_millis() > 100 * texts.len() as u128 {
            warn!("slow embedding: {} texts in {:?}", texts.len(), start.elapsed());
        }
        Ok(vectors)
    }
}

impl Embedder for EmbeddingModel {
    fn dim(&self) -> usize { self.dim }
    fn max_len(&self) -> usize { MODEL_MAX_LEN }
    fn embed_batch(&self, texts: &[String]) -> semvault_core::Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(MODEL_BATCH) {
            out.extend(self.embed_chunk(chunk).map_err(embed_err)?);
        }
        Ok(out)
    }
}

/// Deterministic bag-of-tokens embedder: each token hashes into one bucket,
/// the result is L2-normalized. Same text always maps to the same vector.
pub struct FakeEmbedder { dim: usize }

impl FakeEmbedder {
    pub fn new(dim: usize) -> Self { Self { dim } }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        use std::hash::{Hash, Hasher};
        use twox_hash::XxHash64;
        let mut v = vec![0f32; self.dim];
        for (i, token) in text.split_whitespace().enumerate() {
            let mut hasher = XxHash64::with_seed(0);
            token.to_lowercase().hash(&mut hasher);
            let h = hasher.finish();
            let idx = (h as usize) % self.dim;
            let val = (((h >> 32) as u32) as f32) / (u32::MAX as f32);
            v[idx] += val + (i as f32 % 3.0) * 0.01;
        }
        let norm = (v.iter().map(|x| x * x).sum::<f32>()).sqrt().max(1e-6);
        for x in &mut v { *x /= norm; }
        v
    }
}

impl Default for FakeEmbedder {
    fn default() -> Self { Self::new(MODEL_DIM) }
}

impl Embedder for FakeEmbedder {
    fn dim(&self) -> usize { self.dim }
    fn max_len(&self) -> usize { MODEL_MAX_LEN }
    fn embed_batch(&self, texts: &[String]) -> semvault_core::Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }
}

fn env_flag(name: &str) -> bool {
    std::env::var(name).ok().is_some_and(|v| v == "1" || v.eq_ignore_ascii_case("true"))
}

/// Pick the embedder for this process: the fake one when requested through
/// settings or `SEMVAULT_USE_FAKE_EMBEDDINGS`, otherwise the local model.
pub fn default_embedder(settings: &EmbedSettings) -> semvault_core::Result<Box<dyn Embedder>> {
    if settings.use_fake || env_flag("SEMVAULT_USE_FAKE_EMBEDDINGS") {
        info!("using FakeEmbedder");
        return Ok(Box::new(FakeEmbedder::default()));
    }
    let dir = resolve_model_dir(settings).map_err(embed_err)?;
    Ok(Box::new(EmbeddingModel::load(&dir).map_err(embed_err)?))
}

fn resolve_model_dir(settings: &EmbedSettings) -> Result<PathBuf> {
    let configured = settings.model_dir.as_deref().map(semvault_core::config::expand_path);
    let from_env = std::env::var("SEMVAULT_MODEL_DIR").ok().map(PathBuf::from);
    let candidates = configured.into_iter().chain(from_env).chain([PathBuf::from("models/bge-m3")]);
    for p in candidates {
        if p.exists() { debug!("using model dir {}", p.display()); return Ok(p); }
    }
    Err(anyhow!("Could not locate embedding model directory (set embed.model_dir or SEMVAULT_MODEL_DIR)"))
}
