use anyhow::{anyhow, Result};
use candle_core::{Device, Tensor};
use tokenizers::Tokenizer;

const PAD_ID: u32 = 1;

/// Encode `texts` into `[B, max_len]` input-id and attention-mask tensors,
/// truncating long inputs and right-padding short ones.
pub fn tokenize_batch(tokenizer: &Tokenizer, texts: &[String], max_len: usize, device: &Device) -> Result<(Tensor, Tensor)> {
    let mut ids = Vec::with_capacity(texts.len() * max_len);
    let mut mask = Vec::with_capacity(texts.len() * max_len);
    for text in texts {
        let enc = tokenizer.encode(text.as_str(), true).map_err(|e| anyhow!("Tokenization failed: {}", e))?;
        let mut row_ids = enc.get_ids().to_vec();
        let mut row_mask = enc.get_attention_mask().to_vec();
        row_ids.truncate(max_len);
        row_mask.truncate(max_len);
        let pad = max_len - row_ids.len();
        row_ids.extend(std::iter::repeat(PAD_ID).take(pad));
        row_mask.extend(std::iter::repeat(0).take(pad));
        ids.extend(row_ids);
        mask.extend(row_mask);
    }
    let input_ids = Tensor::from_vec(ids, (texts.len(), max_len), device)?;
    let attention_mask = Tensor::from_vec(mask, (texts.len(), max_len), device)?;
    Ok((input_ids, attention_mask))
}
