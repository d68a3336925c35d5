use tracing::warn;

use crate::filter::MetaFilter;
use crate::types::{SearchHit, TextUnit};

/// Placeholder sent instead of empty input; embedding services reject "".
pub const EMPTY_TEXT_PLACEHOLDER: &str = " ";

pub trait Embedder: Send + Sync {
    /// Dimensionality of every vector this embedder returns.
    fn dim(&self) -> usize;
    /// Stable identifier for the provider/model (e.g. `openai:text-embedding-004:d768`).
    fn model_id(&self) -> &str;
    /// Embeds a single text. Errors are per-text; see [`Embedder::embed_batch`].
    fn embed_text(&self, text: &str) -> anyhow::Result<Vec<f32>>;

    /// Embeds texts in order. A text that fails, or comes back with the wrong
    /// dimension, is replaced by a zero vector so the rest of the batch survives.
    fn embed_batch(&self, texts: &[String]) -> Vec<Vec<f32>> {
        let dim = self.dim();
        texts
            .iter()
            .enumerate()
            .map(|(index, text)| {
                let input =
                    if text.trim().is_empty() { EMPTY_TEXT_PLACEHOLDER } else { text.as_str() };
                match self.embed_text(input) {
                    Ok(v) if v.len() == dim => v,
                    Ok(v) => {
                        warn!(
                            index,
                            got = v.len(),
                            expected = dim,
                            "embedding has wrong dimension, substituting zero vector"
                        );
                        vec![0.0; dim]
                    }
                    Err(e) => {
                        warn!(index, error = %e, "embedding failed, substituting zero vector");
                        vec![0.0; dim]
                    }
                }
            })
            .collect()
    }
}

pub trait VectorStore: Send + Sync {
    /// Persists units with their vectors. Returns the number of rows written.
    fn add(&self, units: &[TextUnit], embeddings: &[Vec<f32>]) -> anyhow::Result<usize>;
    fn query(
        &self,
        vector: &[f32],
        k: usize,
        filter: Option<&MetaFilter>,
    ) -> anyhow::Result<Vec<SearchHit>>;
    fn has_source(&self, name: &str) -> anyhow::Result<bool>;
    /// Removes every row stored under `name`. Missing sources are a no-op.
    fn delete_source(&self, name: &str) -> anyhow::Result<()>;
    fn count(&self) -> anyhow::Result<usize>;
}

pub trait ChatModel: Send + Sync {
    fn model_id(&self) -> &str;
    fn complete(&self, system_prompt: &str, user_prompt: &str) -> anyhow::Result<String>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct Flaky {
        seen: Mutex<Vec<String>>,
    }

    impl Embedder for Flaky {
        fn dim(&self) -> usize {
            3
        }

        fn model_id(&self) -> &str {
            "flaky"
        }

        fn embed_text(&self, text: &str) -> anyhow::Result<Vec<f32>> {
            self.seen.lock().unwrap().push(text.to_string());
            match text {
                "boom" => anyhow::bail!("service unavailable"),
                "short" => Ok(vec![1.0]),
                _ => Ok(vec![1.0, 2.0, 3.0]),
            }
        }
    }

    #[test]
    fn batch_substitutes_zero_vectors_and_placeholder() {
        let e = Flaky { seen: Mutex::new(Vec::new()) };
        let texts: Vec<String> =
            ["ok", "boom", "  \n", "short"].iter().map(|t| t.to_string()).collect();
        let out = e.embed_batch(&texts);
        assert_eq!(out.len(), 4);
        assert_eq!(out[0], vec![1.0, 2.0, 3.0]);
        assert_eq!(out[1], vec![0.0; 3]);
        assert_eq!(out[2], vec![1.0, 2.0, 3.0]);
        assert_eq!(out[3], vec![0.0; 3]);
        assert_eq!(e.seen.lock().unwrap()[2], " ");
    }
}
