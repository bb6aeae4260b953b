//! Sentence pooling over transformer hidden states.
use anyhow::Result;
use candle_core::Tensor;

/// Average the hidden states of real (unmasked) tokens: `[B,T,H]` + `[B,T]` -> `[B,H]`.
pub fn masked_mean(hidden: &Tensor, attention_mask: &Tensor) -> Result<Tensor> {
    hidden.dims3()?;
    let mask = attention_mask.to_device(hidden.device())?.to_dtype(hidden.dtype())?.unsqueeze(2)?;
    let summed = hidden.broadcast_mul(&mask)?.sum(1)?;
    // all-padding rows would divide by zero
    let counts = mask.sum(1)?.maximum(1e-9)?;
    Ok(summed.broadcast_div(&counts)?)
}

/// Scale each row to unit length.
pub fn l2_normalize(rows: &Tensor) -> Result<Tensor> {
    let norms = rows.sqr()?.sum_keepdim(1)?.sqrt()?.maximum(1e-12)?;
    Ok(rows.broadcast_div(&norms)?)
}

pub fn masked_mean_l2(hidden: &Tensor, attention_mask: &Tensor) -> Result<Tensor> {
    l2_normalize(&masked_mean(hidden, attention_mask)?)
}
