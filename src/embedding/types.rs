use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use crate::codec::{self, CodecError};

/// Immutable, cheaply clonable embedding vector.
///
/// Shared between the resolver's background writes, the cascade and the write-back
/// tasks without copying the underlying floats.
#[derive(Clone, PartialEq)]
pub struct Embedding(Arc<[f32]>);

impl Embedding {
    pub fn new(values: Vec<f32>) -> Self {
        Self(values.into())
    }

    /// Number of components.
    #[inline]
    pub fn dim(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    /// Encodes into the little-endian `f32` wire format.
    pub fn to_bytes(&self) -> Vec<u8> {
        codec::encode(&self.0)
    }

    /// Decodes from the little-endian `f32` wire format.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CodecError> {
        codec::decode(bytes).map(Self::new)
    }

    /// Decodes and rejects blobs that do not hold exactly `dim` components.
    pub fn from_bytes_with_dim(bytes: &[u8], dim: usize) -> Result<Self, CodecError> {
        codec::decode_with_dim(bytes, dim).map(Self::new)
    }
}

impl Deref for Embedding {
    type Target = [f32];

    fn deref(&self) -> &[f32] {
        &self.0
    }
}

impl From<Vec<f32>> for Embedding {
    fn from(values: Vec<f32>) -> Self {
        Self::new(values)
    }
}

impl fmt::Debug for Embedding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Embedding")
            .field("dim", &self.dim())
            .field("head", &&self.0[..self.0.len().min(4)])
            .finish()
    }
}
