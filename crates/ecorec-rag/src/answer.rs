use serde::Serialize;
use tracing::{debug, info, warn};

use ecorec_core::filter::MetaFilter;
use ecorec_core::traits::{ChatModel, Embedder, VectorStore};
use ecorec_core::types::{ChatTurn, SearchHit};

use crate::error::{RagError, Result};
use crate::prompt::{build_user_prompt, SYSTEM_PROMPT};

/// Distinct sources cited per answer.
pub const MAX_CITATIONS: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Citation {
    pub source: String,
    pub page: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    pub text: String,
    pub citations: Vec<Citation>,
}

/// First hit of each source, in retrieval order, capped at [`MAX_CITATIONS`].
pub fn dedup_citations(hits: &[SearchHit]) -> Vec<Citation> {
    let mut out: Vec<Citation> = Vec::new();
    for hit in hits {
        if out.len() == MAX_CITATIONS {
            break;
        }
        if out.iter().any(|c| c.source == hit.source) {
            continue;
        }
        out.push(Citation { source: hit.source.clone(), page: hit.page });
    }
    out
}

/// Retrieval plus generation over a vector store.
pub struct Answerer<'a> {
    embedder: &'a dyn Embedder,
    store: &'a dyn VectorStore,
    chat: &'a dyn ChatModel,
}

impl<'a> Answerer<'a> {
    pub fn new(
        embedder: &'a dyn Embedder,
        store: &'a dyn VectorStore,
        chat: &'a dyn ChatModel,
    ) -> Self {
        Self { embedder, store, chat }
    }

    /// Top-`k` hits for `query`, nearest first.
    pub fn retrieve(
        &self,
        query: &str,
        k: usize,
        filter: Option<&MetaFilter>,
    ) -> Result<Vec<SearchHit>> {
        retrieve(self.embedder, self.store, query, k, filter)
    }

    pub fn answer(&self, query: &str, k: usize, history: &[ChatTurn]) -> Result<Answer> {
        self.answer_filtered(query, k, history, None)
    }

    pub fn answer_filtered(
        &self,
        query: &str,
        k: usize,
        history: &[ChatTurn],
        filter: Option<&MetaFilter>,
    ) -> Result<Answer> {
        let hits = self.retrieve(query, k, filter)?;
        let citations = dedup_citations(&hits);
        let prompt = build_user_prompt(query, &hits, history);

        let text = self.chat.complete(SYSTEM_PROMPT, &prompt).map_err(|e| {
            warn!(model = %self.chat.model_id(), error = %e, "chat model call failed");
            RagError::GenerationFailed(format!("{e:#}"))
        })?;
        if text.trim().is_empty() {
            let reason = format!("{} returned an empty answer", self.chat.model_id());
            return Err(RagError::GenerationFailed(reason));
        }

        info!(
            hits = hits.len(),
            citations = citations.len(),
            model = %self.chat.model_id(),
            "answer generated"
        );
        Ok(Answer { text: text.trim().to_string(), citations })
    }
}

/// Embeds `query` and searches `store`. Usable without a chat model.
pub fn retrieve(
    embedder: &dyn Embedder,
    store: &dyn VectorStore,
    query: &str,
    k: usize,
    filter: Option<&MetaFilter>,
) -> Result<Vec<SearchHit>> {
    let vector =
        embedder.embed_batch(&[query.to_string()]).into_iter().next().unwrap_or_default();
    let hits = store
        .query(&vector, k, filter)
        .map_err(|e| RagError::Retrieval(format!("{e:#}")))?;
    debug!(k, hits = hits.len(), filtered = filter.is_some(), "retrieved");
    Ok(hits)
}
