use std::hash::{Hash, Hasher};

use twox_hash::XxHash64;

use ecorec_core::traits::Embedder;

/// Deterministic offline embedder: hashed bag of lower-cased tokens,
/// L2-normalized. Texts sharing words land close together, which is enough
/// for development indexes and tests.
pub struct HashEmbedder {
    dim: usize,
    model_id: String,
}

impl HashEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim: dim.max(1), model_id: format!("hash:xxh64:d{}", dim.max(1)) }
    }

    fn vector(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0f32; self.dim];
        for (i, token) in text.split_whitespace().enumerate() {
            let token = token.to_lowercase();
            let mut hasher = XxHash64::with_seed(0);
            token.hash(&mut hasher);
            let h = hasher.finish();
            let idx = (h % self.dim as u64) as usize;
            let weight = ((h >> 32) as u32) as f32 / u32::MAX as f32;
            v[idx] += 0.5 + weight + (i % 3) as f32 * 0.01;
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt().max(1e-6);
        for x in &mut v {
            *x /= norm;
        }
        v
    }
}

impl Embedder for HashEmbedder {
    fn dim(&self) -> usize {
        self.dim
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn embed_text(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        Ok(self.vector(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_text_same_vector() {
        let e = HashEmbedder::new(64);
        assert_eq!(e.embed_text("air terjun").unwrap(), e.embed_text("air terjun").unwrap());
    }

    #[test]
    fn vectors_are_unit_length() {
        let e = HashEmbedder::new(32);
        let v = e.embed_text("Pantai Pangandaran, Jawa Barat").unwrap();
        assert_eq!(v.len(), 32);
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4);
    }

    #[test]
    fn blank_text_is_the_zero_vector() {
        let e = HashEmbedder::new(8);
        assert!(e.embed_text(" ").unwrap().iter().all(|x| *x == 0.0));
    }
}
