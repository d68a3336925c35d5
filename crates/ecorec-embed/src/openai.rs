use anyhow::{anyhow, Context};
use async_openai::config::OpenAIConfig;
use async_openai::types::CreateEmbeddingRequestArgs;
use async_openai::Client;
use tokio::runtime::Runtime;
use tracing::debug;

use ecorec_core::traits::Embedder;

/// Embeddings from an OpenAI-compatible `/embeddings` endpoint.
///
/// Calls are blocking; the embedder owns a small runtime and must not be used
/// from inside another tokio runtime.
pub struct OpenAiEmbedder {
    client: Client<OpenAIConfig>,
    model: String,
    dim: usize,
    model_id: String,
    runtime: Runtime,
}

impl OpenAiEmbedder {
    pub fn new(api_base: &str, api_key: &str, model: &str, dim: usize) -> anyhow::Result<Self> {
        let config = OpenAIConfig::new().with_api_key(api_key).with_api_base(api_base);
        let runtime = Runtime::new().context("failed to build embedding runtime")?;
        Ok(Self {
            client: Client::with_config(config),
            model: model.to_string(),
            dim,
            model_id: format!("openai:{model}:d{dim}"),
            runtime,
        })
    }

    async fn request(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        let request = CreateEmbeddingRequestArgs::default()
            .model(self.model.clone())
            .input([text])
            .build()?;
        let response = self.client.embeddings().create(request).await?;
        let embedding = response
            .data
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("no embedding data received"))?
            .embedding;
        debug!(model = %self.model, dim = embedding.len(), "embedding received");
        Ok(embedding)
    }
}

impl Embedder for OpenAiEmbedder {
    fn dim(&self) -> usize {
        self.dim
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn embed_text(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        self.runtime.block_on(self.request(text))
    }
}
