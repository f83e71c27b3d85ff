use base64::{engine::general_purpose, Engine as _};
use thiserror::Error;

use crate::model::{AudioBytes, EncodedAudio};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("payload of {size} bytes exceeds the {limit} byte limit")]
    PayloadTooLarge { size: usize, limit: usize },

    #[error("invalid base64: {0}")]
    InvalidEncoding(String),
}

/// Standard padded base64, with an upper bound on the raw payload size.
#[derive(Clone, Copy, Debug)]
pub struct AudioCodec {
    max_payload_bytes: usize,
}

impl AudioCodec {
    pub fn new(max_payload_bytes: usize) -> Self {
        Self { max_payload_bytes }
    }

    pub fn encode(&self, bytes: &AudioBytes) -> Result<EncodedAudio, CodecError> {
        if bytes.len() > self.max_payload_bytes {
            return Err(CodecError::PayloadTooLarge {
                size: bytes.len(),
                limit: self.max_payload_bytes,
            });
        }
        Ok(EncodedAudio::from_string(
            general_purpose::STANDARD.encode(bytes.as_slice()),
        ))
    }

    pub fn decode(&self, text: &EncodedAudio) -> Result<AudioBytes, CodecError> {
        general_purpose::STANDARD
            .decode(text.as_str())
            .map(AudioBytes::new)
            .map_err(|e| CodecError::InvalidEncoding(e.to_string()))
    }
}
