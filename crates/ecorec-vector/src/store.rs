use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase, Select};
use lancedb::{Connection, Table};
use tokio::runtime::Runtime;
use tracing::{debug, info, warn};

use ecorec_core::error::Error;
use ecorec_core::filter::MetaFilter;
use ecorec_core::traits::VectorStore;
use ecorec_core::types::{SearchHit, TextUnit};

use crate::pushdown::{source_predicate, to_sql};
use crate::search::{finalize_hits, hits_from_batch};
use crate::table::{append_batch, open_db, open_table, table_dim};
use crate::writer::{rows_to_record_batch, IndexRow};

/// Candidates fetched per requested hit when a filter has to run after the scan.
const POST_FILTER_OVERFETCH: usize = 10;

/// A LanceDB directory holding one table of text units.
///
/// All methods block on an owned runtime.
pub struct LanceVectorStore {
    runtime: Runtime,
    db: Connection,
    db_path: PathBuf,
    table_name: String,
    dim: usize,
}

impl LanceVectorStore {
    /// Opens (creating the directory if needed) the store. `dim` is the
    /// dimension new tables are created with; an existing table keeps its own.
    pub fn open(db_path: &Path, table_name: &str, dim: usize) -> Result<Self> {
        fs::create_dir_all(db_path).with_context(|| format!("creating {}", db_path.display()))?;
        let runtime = Runtime::new().context("failed to build vector store runtime")?;
        let db = runtime.block_on(open_db(&db_path.to_string_lossy()))?;
        let store = Self {
            runtime,
            db,
            db_path: db_path.to_path_buf(),
            table_name: table_name.to_string(),
            dim,
        };
        if let Some(existing) = store.stored_dim()? {
            if existing != dim {
                warn!(
                    table = %table_name,
                    existing,
                    configured = dim,
                    "table dimension differs from configured embedder; adds will be rejected"
                );
            }
        }
        Ok(store)
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Dimension of the stored collection, `None` before the first add.
    pub fn stored_dim(&self) -> Result<Option<usize>> {
        self.runtime.block_on(self.stored_dim_async())
    }

    async fn stored_dim_async(&self) -> Result<Option<usize>> {
        match open_table(&self.db, &self.table_name).await? {
            Some(table) => table_dim(&table).await,
            None => Ok(None),
        }
    }

    /// Deletes the whole store directory and starts over empty.
    pub fn reset(&mut self) -> Result<()> {
        if self.db_path.exists() {
            fs::remove_dir_all(&self.db_path)
                .with_context(|| format!("removing {}", self.db_path.display()))?;
        }
        fs::create_dir_all(&self.db_path)?;
        self.db = self.runtime.block_on(open_db(&self.db_path.to_string_lossy()))?;
        info!(path = %self.db_path.display(), "index reset");
        Ok(())
    }

    async fn query_async(
        &self,
        vector: &[f32],
        k: usize,
        filter: Option<&MetaFilter>,
    ) -> Result<Vec<SearchHit>> {
        let Some(table) = open_table(&self.db, &self.table_name).await? else {
            return Ok(Vec::new());
        };
        if let Some(dim) = table_dim(&table).await? {
            if dim != vector.len() {
                return Err(Error::DimensionMismatch { expected: dim, got: vector.len() }.into());
            }
        }

        let sql = filter.and_then(to_sql);
        let Some(post_filter) = filter.filter(|_| sql.is_none()) else {
            let hits = nearest(&table, vector, k, sql.as_deref()).await?;
            debug!(
                candidates = hits.len(),
                pushed_down = sql.is_some(),
                "vector search finished"
            );
            return Ok(finalize_hits(hits, None, k));
        };

        // Widen the window until k rows match or the table is exhausted.
        let total = table.count_rows(None).await?;
        let mut limit = k.saturating_mul(POST_FILTER_OVERFETCH).min(total.max(1));
        loop {
            let candidates = nearest(&table, vector, limit, None).await?;
            let fetched = candidates.len();
            let hits = finalize_hits(candidates, Some(post_filter), k);
            if hits.len() >= k || fetched < limit || limit >= total {
                debug!(
                    candidates = fetched,
                    matched = hits.len(),
                    "post-filtered vector search finished"
                );
                return Ok(hits);
            }
            limit = limit.saturating_mul(2).min(total);
        }
    }

    async fn has_source_async(&self, name: &str) -> Result<bool> {
        let Some(table) = open_table(&self.db, &self.table_name).await? else {
            return Ok(false);
        };
        Ok(table.count_rows(Some(source_predicate(name))).await? > 0)
    }

    async fn delete_source_async(&self, name: &str) -> Result<()> {
        let Some(table) = open_table(&self.db, &self.table_name).await? else {
            return Ok(());
        };
        table.delete(&source_predicate(name)).await?;
        Ok(())
    }

    async fn count_async(&self) -> Result<usize> {
        let Some(table) = open_table(&self.db, &self.table_name).await? else {
            return Ok(0);
        };
        match table.count_rows(None).await {
            Ok(n) => Ok(n),
            Err(e) => {
                warn!(error = %e, "count_rows failed, counting by scan");
                let mut stream = table.query().select(Select::columns(&["id"])).execute().await?;
                let mut n = 0usize;
                while let Some(batch) = stream.try_next().await? {
                    n += batch.num_rows();
                }
                Ok(n)
            }
        }
    }
}

impl VectorStore for LanceVectorStore {
    fn add(&self, units: &[TextUnit], embeddings: &[Vec<f32>]) -> Result<usize> {
        if units.is_empty() {
            return Ok(0);
        }
        let dim = self.stored_dim()?.unwrap_or(self.dim);
        let rows: Vec<IndexRow> = units.iter().map(IndexRow::from_unit).collect();
        let batch = rows_to_record_batch(&rows, embeddings, dim)?;
        self.runtime.block_on(append_batch(&self.db, &self.table_name, batch))?;
        debug!(table = %self.table_name, rows = rows.len(), "units added");
        Ok(rows.len())
    }

    fn query(
        &self,
        vector: &[f32],
        k: usize,
        filter: Option<&MetaFilter>,
    ) -> Result<Vec<SearchHit>> {
        if k == 0 {
            return Ok(Vec::new());
        }
        self.runtime.block_on(self.query_async(vector, k, filter))
    }

    fn has_source(&self, name: &str) -> Result<bool> {
        self.runtime.block_on(self.has_source_async(name))
    }

    fn delete_source(&self, name: &str) -> Result<()> {
        self.runtime.block_on(self.delete_source_async(name))?;
        info!(table = %self.table_name, source = %name, "source removed");
        Ok(())
    }

    fn count(&self) -> Result<usize> {
        self.runtime.block_on(self.count_async())
    }
}

/// Plain nearest-neighbour scan of `limit` rows, optionally narrowed by SQL.
async fn nearest(
    table: &Table,
    vector: &[f32],
    limit: usize,
    predicate: Option<&str>,
) -> Result<Vec<SearchHit>> {
    let mut query = table.vector_search(vector.to_vec())?.limit(limit);
    if let Some(predicate) = predicate {
        query = query.only_if(predicate);
    }
    let mut stream = query.execute().await?;
    let mut hits = Vec::new();
    while let Some(batch) = stream.try_next().await? {
        hits.extend(hits_from_batch(&batch)?);
    }
    Ok(hits)
}
