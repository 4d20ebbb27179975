//! Model inputs: fixed-width token windows and the device they run on.

use candle_core::{Device, Tensor};
use thiserror::Error;
use tokenizers::Tokenizer;
use tracing::info;

/// XLM-RoBERTa pad token id.
pub const PAD_ID: u32 = 1;

#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("tokenization failed: {0}")]
    Tokenizer(String),

    #[error("token window width must be positive")]
    ZeroWidth,

    #[error(transparent)]
    Tensor(#[from] candle_core::Error),
}

/// Token ids and attention mask fitted to exactly `width()` positions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenWindow {
    ids: Vec<u32>,
    mask: Vec<u32>,
}

impl TokenWindow {
    /// Truncate, or pad with `PAD_ID` under a zero mask, to `width`.
    pub fn fit(mut ids: Vec<u32>, mut mask: Vec<u32>, width: usize) -> Result<Self, EncodeError> {
        if width == 0 {
            return Err(EncodeError::ZeroWidth);
        }
        ids.resize(width, PAD_ID);
        mask.resize(width, 0);
        Ok(Self { ids, mask })
    }

    pub fn width(&self) -> usize {
        self.ids.len()
    }

    pub fn ids(&self) -> &[u32] {
        &self.ids
    }

    /// Positions the model attends to.
    pub fn attended(&self) -> usize {
        self.mask.iter().filter(|&&m| m != 0).count()
    }

    /// `(input_ids, attention_mask)` as `[1, width]` tensors.
    pub fn to_tensors(&self, device: &Device) -> Result<(Tensor, Tensor), EncodeError> {
        let shape = (1, self.width());
        let input_ids = Tensor::from_slice(&self.ids, shape, device)?;
        let attention_mask = Tensor::from_slice(&self.mask, shape, device)?;
        Ok((input_ids, attention_mask))
    }
}

pub fn encode(tokenizer: &Tokenizer, text: &str, width: usize) -> Result<TokenWindow, EncodeError> {
    let enc = tokenizer.encode(text, true).map_err(|e| EncodeError::Tokenizer(e.to_string()))?;
    TokenWindow::fit(enc.get_ids().to_vec(), enc.get_attention_mask().to_vec(), width)
}

/// Metal when built with the `metal` feature and a GPU is present, else CPU.
pub fn select_device() -> Device {
    #[cfg(feature = "metal")]
    {
        match Device::new_metal(0) {
            Ok(dev) => {
                info!("Embedding on Metal");
                return dev;
            }
            Err(e) => tracing::warn!("Metal unavailable, falling back to CPU: {e}"),
        }
    }
    info!("Embedding on CPU");
    Device::Cpu
}
