use std::path::PathBuf;

use anyhow::Context;
use serde::Serialize;
use tracing::info;

use ecorec_core::config::{RagSettings, Settings};
use ecorec_core::traits::{ChatModel, Embedder, VectorStore};
use ecorec_embed::get_default_embedder;
use ecorec_vector::LanceVectorStore;

use crate::answer::Answerer;
use crate::error::Result;
use crate::ingest::Ingestor;

#[derive(Debug, Clone, Serialize)]
pub struct Health {
    pub db_path: PathBuf,
    pub table: String,
    pub vectors: usize,
    pub embedding_model: String,
    pub embedding_dim: usize,
    pub chat_model: String,
}

impl Health {
    /// Reads the store alone. The embedding fields come from settings, or from
    /// the stored table dimension when one exists.
    pub fn collect(store: &LanceVectorStore, rag: &RagSettings) -> anyhow::Result<Self> {
        Ok(Self {
            db_path: store.db_path().to_path_buf(),
            table: store.table_name().to_string(),
            vectors: store.count()?,
            embedding_model: rag.embedding_model.clone(),
            embedding_dim: store.stored_dim()?.unwrap_or(rag.embedding_dim),
            chat_model: rag.chat_model.clone(),
        })
    }
}

/// Opens the configured LanceDB store without building an embedder.
pub fn open_store(rag: &RagSettings) -> anyhow::Result<LanceVectorStore> {
    let store = LanceVectorStore::open(&rag.db_path, &rag.table, rag.embedding_dim)
        .with_context(|| format!("opening vector index at {}", rag.db_path.display()))?;
    Ok(store)
}

/// The embedder and LanceDB store configured by the `rag` settings.
pub struct RagIndex {
    settings: RagSettings,
    embedder: Box<dyn Embedder>,
    store: LanceVectorStore,
}

impl RagIndex {
    pub fn open(settings: &Settings) -> anyhow::Result<Self> {
        let embedder = get_default_embedder(settings)?;
        let rag = settings.rag.clone();
        let store = open_store(&rag)?;
        info!(
            path = %rag.db_path.display(),
            table = %rag.table,
            model = %embedder.model_id(),
            "rag index opened"
        );
        Ok(Self::from_parts(rag, embedder, store))
    }

    pub fn from_parts(
        settings: RagSettings,
        embedder: Box<dyn Embedder>,
        store: LanceVectorStore,
    ) -> Self {
        Self { settings, embedder, store }
    }

    pub fn settings(&self) -> &RagSettings {
        &self.settings
    }

    pub fn embedder(&self) -> &dyn Embedder {
        self.embedder.as_ref()
    }

    pub fn store(&self) -> &LanceVectorStore {
        &self.store
    }

    pub fn ingestor(&self) -> Result<Ingestor<'_>> {
        Ingestor::new(
            self.embedder.as_ref(),
            &self.store,
            self.settings.chunk_size,
            self.settings.chunk_overlap,
        )
    }

    pub fn answerer<'a>(&'a self, chat: &'a dyn ChatModel) -> Answerer<'a> {
        Answerer::new(self.embedder.as_ref(), &self.store, chat)
    }

    pub fn health(&self) -> anyhow::Result<Health> {
        Ok(Health {
            embedding_model: self.embedder.model_id().to_string(),
            embedding_dim: self.embedder.dim(),
            ..Health::collect(&self.store, &self.settings)?
        })
    }

    pub fn reset(&mut self) -> anyhow::Result<()> {
        self.store.reset()
    }
}
