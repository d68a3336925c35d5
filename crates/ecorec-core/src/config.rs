use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        let config = Self { figment };
        config.validate()?;
        Ok(config)
    }

    pub fn get<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| anyhow::anyhow!("Failed to get '{}': {}", key, e))
    }

    /// Typed view of the whole configuration, with paths expanded relative to
    /// the current working directory.
    pub fn settings(&self) -> anyhow::Result<Settings> {
        let mut settings: Settings = self
            .figment
            .extract()
            .map_err(|e| anyhow::anyhow!("Failed to read settings: {}", e))?;
        let base = env::current_dir()?;
        settings.resolve_paths(&base);
        Ok(settings)
    }

    fn validate(&self) -> anyhow::Result<()> {
        let rag: RagSettings = self.get("rag")?;
        if rag.chunk_size == 0 || rag.chunk_overlap >= rag.chunk_size {
            anyhow::bail!(
                "rag.chunk_overlap ({}) must be smaller than rag.chunk_size ({})",
                rag.chunk_overlap,
                rag.chunk_size
            );
        }
        if rag.embedding_dim == 0 {
            anyhow::bail!("rag.embedding_dim must be positive");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub artifacts: ArtifactSettings,
    pub recommend: RecommendSettings,
    pub rag: RagSettings,
    /// Swap the network embedder for the deterministic hash embedder.
    #[serde(deserialize_with = "figment::util::bool_from_str_or_int")]
    pub use_fake_embeddings: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactSettings {
    pub cbf_dir: PathBuf,
    pub cf_dir: PathBuf,
    pub fallback_data_dir: PathBuf,
}

impl Default for ArtifactSettings {
    fn default() -> Self {
        Self {
            cbf_dir: PathBuf::from("models/cbf"),
            cf_dir: PathBuf::from("models/cf"),
            fallback_data_dir: PathBuf::from("data"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecommendSettings {
    pub alpha: f64,
    pub k: usize,
}

impl Default for RecommendSettings {
    fn default() -> Self {
        Self { alpha: 0.6, k: 20 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RagSettings {
    pub db_path: PathBuf,
    pub table: String,
    pub api_base: String,
    pub api_key: Option<String>,
    pub embedding_model: String,
    pub embedding_dim: usize,
    pub chat_model: String,
    pub temperature: f32,
    pub top_k: usize,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub bootstrap_csv: Option<PathBuf>,
}

impl Default for RagSettings {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("./lancedb"),
            table: "rag_docs".to_string(),
            api_base: "https://generativelanguage.googleapis.com/v1beta/openai".to_string(),
            api_key: None,
            embedding_model: "text-embedding-004".to_string(),
            embedding_dim: 768,
            chat_model: "gemini-2.5-flash".to_string(),
            temperature: 0.3,
            top_k: 6,
            chunk_size: 1200,
            chunk_overlap: 200,
            bootstrap_csv: None,
        }
    }
}

impl RagSettings {
    /// Configured key, else `OPENAI_API_KEY` from the environment.
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| env::var("OPENAI_API_KEY").ok().filter(|k| !k.trim().is_empty()))
    }
}

impl Settings {
    pub fn resolve_paths(&mut self, base: &Path) {
        let resolve = |p: &Path| resolve_with_base(base, p.to_string_lossy());
        self.artifacts.cbf_dir = resolve(&self.artifacts.cbf_dir);
        self.artifacts.cf_dir = resolve(&self.artifacts.cf_dir);
        self.artifacts.fallback_data_dir = resolve(&self.artifacts.fallback_data_dir);
        self.rag.db_path = resolve(&self.rag.db_path);
        self.rag.bootstrap_csv = self.rag.bootstrap_csv.as_deref().map(resolve);
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after expansion.
/// If `p` is absolute, it's returned as-is; otherwise `base.join(p)` is returned.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() { p } else { base.join(p) }
}
