//! Binary wire format for embeddings.
//!
//! RediSearch KNN queries (and the fast embedding cache) take the vector as an opaque
//! blob: `dim` consecutive little-endian IEEE-754 `f32` values. Byte order and width
//! must match the index schema (`TYPE FLOAT32`) or every score is garbage.


use thiserror::Error;

/// Bytes per encoded component.
pub const F32_WIDTH: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
/// Errors returned when decoding an embedding blob.
pub enum CodecError {
    /// The buffer is not a whole number of `f32` values.
    #[error("invalid embedding byte length {len}: not a multiple of {F32_WIDTH}")]
    TruncatedBuffer {
        /// Buffer length in bytes.
        len: usize,
    },

    /// The buffer decodes to the wrong number of components.
    #[error("invalid embedding byte length: expected {expected} bytes, got {actual}")]
    InvalidLength {
        /// Expected byte length.
        expected: usize,
        /// Actual byte length.
        actual: usize,
    },
}

/// Encodes `vector` as little-endian `f32` bytes (`4 * vector.len()` bytes).
pub fn encode(vector: &[f32]) -> Vec<u8> {
    let mut out = Vec::with_capacity(vector.len() * F32_WIDTH);
    for value in vector {
        out.extend_from_slice(&value.to_le_bytes());
    }
    out
}

/// Decodes little-endian `f32` bytes. Exact inverse of [`encode`].
pub fn decode(bytes: &[u8]) -> Result<Vec<f32>, CodecError> {
    if !bytes.len().is_multiple_of(F32_WIDTH) {
        return Err(CodecError::TruncatedBuffer { len: bytes.len() });
    }

    Ok(bytes
        .chunks_exact(F32_WIDTH)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect())
}

/// Decodes and checks the component count against `dim`.
pub fn decode_with_dim(bytes: &[u8], dim: usize) -> Result<Vec<f32>, CodecError> {
    let expected = dim * F32_WIDTH;
    if bytes.len() != expected {
        return Err(CodecError::InvalidLength {
            expected,
            actual: bytes.len(),
        });
    }
    decode(bytes)
}
