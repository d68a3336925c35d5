//! Embedding providers behind [`ecorec_core::traits::Embedder`].

use anyhow::Result;
use tracing::info;

use ecorec_core::config::Settings;
use ecorec_core::traits::Embedder;

pub mod hash;
pub mod openai;

pub use hash::HashEmbedder;
pub use openai::OpenAiEmbedder;

/// Picks the embedder for the current settings: the hash embedder when
/// `use_fake_embeddings` is set (`APP_USE_FAKE_EMBEDDINGS=1`), otherwise the
/// configured OpenAI-compatible endpoint, which then needs an API key.
pub fn get_default_embedder(settings: &Settings) -> Result<Box<dyn Embedder>> {
    let dim = settings.rag.embedding_dim;
    if settings.use_fake_embeddings {
        info!(dim, "using hash embedder");
        return Ok(Box::new(HashEmbedder::new(dim)));
    }
    let key = settings.rag.resolved_api_key().ok_or_else(|| {
        anyhow::anyhow!("no API key configured (set APP_RAG__API_KEY or OPENAI_API_KEY)")
    })?;
    let rag = &settings.rag;
    info!(model = %rag.embedding_model, dim, "using remote embedder");
    Ok(Box::new(OpenAiEmbedder::new(&rag.api_base, &key, &rag.embedding_model, dim)?))
}
