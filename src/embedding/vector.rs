//! Semantic vector attached to a function node.

use serde::{Deserialize, Serialize};

/// Dimensions produced by the default embedding model.
pub const DIMENSIONS: usize = 1536;

/// A dense vector; empty means "not annotated".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Embedding(Vec<f32>);

impl Embedding {
    pub fn new(data: Vec<f32>) -> Self {
        Self(data)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    /// Scale to unit length. Zero and empty vectors are left alone.
    pub fn normalize(&mut self) {
        let magnitude = self.0.iter().map(|v| v * v).sum::<f32>().sqrt();
        if magnitude > 0.0 {
            self.0.iter_mut().for_each(|v| *v /= magnitude);
        }
    }

    pub fn normalized(mut self) -> Self {
        self.normalize();
        self
    }

    /// Similarity of two annotated vectors of equal length.
    pub fn similarity(&self, other: &Embedding) -> Option<f32> {
        if self.is_empty() || self.len() != other.len() {
            return None;
        }
        Some(dot(self, other))
    }
}

impl From<Vec<f32>> for Embedding {
    fn from(data: Vec<f32>) -> Self {
        Self(data)
    }
}

/// Dot product over the shared prefix of both vectors.
pub fn dot(a: &Embedding, b: &Embedding) -> f32 {
    a.0.iter().zip(&b.0).map(|(x, y)| x * y).sum()
}
