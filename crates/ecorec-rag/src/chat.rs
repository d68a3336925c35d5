use anyhow::{anyhow, Context};
use async_openai::config::OpenAIConfig;
use async_openai::types::{
    ChatCompletionRequestSystemMessage, ChatCompletionRequestUserMessage,
    CreateChatCompletionRequestArgs,
};
use async_openai::Client;
use tokio::runtime::Runtime;
use tracing::debug;

use ecorec_core::config::RagSettings;
use ecorec_core::traits::ChatModel;

/// Chat completions from an OpenAI-compatible endpoint.
pub struct OpenAiChat {
    client: Client<OpenAIConfig>,
    model: String,
    temperature: f32,
    runtime: Runtime,
}

impl OpenAiChat {
    pub fn new(
        api_base: &str,
        api_key: &str,
        model: &str,
        temperature: f32,
    ) -> anyhow::Result<Self> {
        let config = OpenAIConfig::new().with_api_key(api_key).with_api_base(api_base);
        let runtime = Runtime::new().context("failed to build chat runtime")?;
        Ok(Self {
            client: Client::with_config(config),
            model: model.to_string(),
            temperature,
            runtime,
        })
    }

    /// Builds a client from the `rag` settings, with optional per-call
    /// overrides for the model and temperature.
    pub fn from_settings(
        rag: &RagSettings,
        model: Option<&str>,
        temperature: Option<f32>,
    ) -> anyhow::Result<Self> {
        let key = rag.resolved_api_key().ok_or_else(|| {
            anyhow!("no API key configured (set APP_RAG__API_KEY or OPENAI_API_KEY)")
        })?;
        Self::new(
            &rag.api_base,
            &key,
            model.unwrap_or(&rag.chat_model),
            temperature.unwrap_or(rag.temperature),
        )
    }

    async fn request(&self, system_prompt: &str, user_prompt: &str) -> anyhow::Result<String> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .temperature(self.temperature)
            .messages([
                ChatCompletionRequestSystemMessage::from(system_prompt).into(),
                ChatCompletionRequestUserMessage::from(user_prompt).into(),
            ])
            .build()?;
        let response = self.client.chat().create(request).await?;
        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default();
        debug!(model = %self.model, chars = content.len(), "chat completion received");
        Ok(content)
    }
}

impl ChatModel for OpenAiChat {
    fn model_id(&self) -> &str {
        &self.model
    }

    fn complete(&self, system_prompt: &str, user_prompt: &str) -> anyhow::Result<String> {
        self.runtime.block_on(self.request(system_prompt, user_prompt))
    }
}
