//! Parse, chunk, embed and store documents, skipping sources already indexed.

use std::path::{Path, PathBuf};

use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use ecorec_core::traits::{Embedder, VectorStore};
use ecorec_core::types::{RawMeta, TextUnit, UnitKind};
use ecorec_text::{parse, Chunker};

use crate::error::Result;

/// Tag attached to the catalog rows ingested at startup.
pub const BOOTSTRAP_TAG: &str = "bootstrap:places_clean";

/// Units embedded and written per store call.
const EMBED_BATCH: usize = 64;

#[derive(Debug, Clone, Serialize)]
pub struct IngestFailure {
    pub source: String,
    pub reason: String,
}

#[derive(Debug, Default, Serialize)]
pub struct IngestReport {
    pub ingested_chunks: usize,
    pub skipped_sources: Vec<String>,
    pub failures: Vec<IngestFailure>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum BootstrapStatus {
    Ingested { chunks: usize },
    Skipped,
    Missing { path: PathBuf },
    Failed { reason: String },
}

pub struct Ingestor<'a> {
    embedder: &'a dyn Embedder,
    store: &'a dyn VectorStore,
    chunker: Chunker,
    show_progress: bool,
}

impl<'a> Ingestor<'a> {
    pub fn new(
        embedder: &'a dyn Embedder,
        store: &'a dyn VectorStore,
        chunk_size: usize,
        overlap: usize,
    ) -> Result<Self> {
        Ok(Self {
            embedder,
            store,
            chunker: Chunker::new(chunk_size, overlap)?,
            show_progress: false,
        })
    }

    /// Draws a terminal progress bar while embedding.
    pub fn with_progress(mut self, on: bool) -> Self {
        self.show_progress = on;
        self
    }

    pub fn ingest_paths(&self, paths: &[PathBuf], tags: &[String]) -> Result<IngestReport> {
        let outcome = parse(paths);
        let mut report = IngestReport {
            failures: outcome
                .failures
                .into_iter()
                .map(|f| IngestFailure { source: f.source, reason: f.reason })
                .collect(),
            ..IngestReport::default()
        };

        let tags =
            tags.iter().map(|t| t.trim()).filter(|t| !t.is_empty()).collect::<Vec<_>>().join(",");
        for (source, units) in group_by_source(outcome.units) {
            match self.store.has_source(&source) {
                Ok(true) => {
                    debug!(source = %source, "already indexed, skipping");
                    report.skipped_sources.push(source);
                    continue;
                }
                Ok(false) => {}
                Err(e) => {
                    warn!(source = %source, error = %e, "existence check failed");
                    report.failures.push(IngestFailure { source, reason: format!("{e:#}") });
                    continue;
                }
            }

            let prepared = self.prepare(units, &tags);
            match self.store_units(&prepared) {
                Ok(n) => report.ingested_chunks += n,
                Err(e) => {
                    warn!(source = %source, error = %e, "store write failed, rolling back source");
                    // Earlier batches may already be committed.
                    if let Err(cleanup) = self.store.delete_source(&source) {
                        warn!(source = %source, error = %cleanup, "rollback failed");
                    }
                    report.failures.push(IngestFailure { source, reason: format!("{e:#}") });
                }
            }
        }

        info!(
            ingested = report.ingested_chunks,
            skipped = report.skipped_sources.len(),
            failures = report.failures.len(),
            "ingestion finished"
        );
        Ok(report)
    }

    /// Ingests the catalog CSV once; later calls see the source and skip it.
    pub fn bootstrap(&self, csv: &Path) -> Result<BootstrapStatus> {
        if !csv.exists() {
            warn!(path = %csv.display(), "bootstrap catalog not found");
            return Ok(BootstrapStatus::Missing { path: csv.to_path_buf() });
        }
        let report = self.ingest_paths(&[csv.to_path_buf()], &[BOOTSTRAP_TAG.to_string()])?;
        if let Some(failure) = report.failures.into_iter().next() {
            return Ok(BootstrapStatus::Failed { reason: failure.reason });
        }
        if !report.skipped_sources.is_empty() {
            return Ok(BootstrapStatus::Skipped);
        }
        Ok(BootstrapStatus::Ingested { chunks: report.ingested_chunks })
    }

    /// Atomic rows pass through; splittable text becomes chunks.
    fn prepare(&self, units: Vec<TextUnit>, tags: &str) -> Vec<TextUnit> {
        let mut out = Vec::new();
        for unit in units {
            match unit.kind {
                UnitKind::Atomic => {
                    let mut metadata = unit.metadata;
                    stamp(&mut metadata, &unit.source, unit.page, tags, UnitKind::Atomic);
                    out.push(TextUnit { metadata, ..unit });
                }
                UnitKind::Splittable => {
                    for chunk in self.chunker.chunk(&unit.source, &unit.text) {
                        let mut metadata = RawMeta::new();
                        stamp(&mut metadata, &chunk.source, chunk.page, tags, UnitKind::Splittable);
                        out.push(TextUnit {
                            id: chunk.id,
                            source: chunk.source,
                            page: chunk.page,
                            text: chunk.text,
                            kind: UnitKind::Splittable,
                            metadata,
                        });
                    }
                }
            }
        }
        out
    }

    fn store_units(&self, units: &[TextUnit]) -> anyhow::Result<usize> {
        let pb = if self.show_progress {
            ProgressBar::new(units.len() as u64)
        } else {
            ProgressBar::hidden()
        };
        if let Ok(style) = ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] \
             {pos}/{len} chunks ({percent}%) {msg}",
        ) {
            pb.set_style(style.progress_chars("#>-"));
        }

        let mut written = 0;
        for batch in units.chunks(EMBED_BATCH) {
            let texts: Vec<String> = batch.iter().map(|u| u.text.clone()).collect();
            let vectors = self.embedder.embed_batch(&texts);
            written += self.store.add(batch, &vectors)?;
            pb.inc(batch.len() as u64);
            if let Some(last) = batch.last() {
                pb.set_message(last.source.clone());
            }
        }
        pb.finish_and_clear();
        Ok(written)
    }
}

fn stamp(metadata: &mut RawMeta, source: &str, page: i64, tags: &str, kind: UnitKind) {
    metadata.insert("source".to_string(), Value::from(source));
    metadata.insert("page".to_string(), Value::from(page));
    metadata.insert("tags".to_string(), Value::from(tags));
    metadata.insert("kind".to_string(), Value::from(kind.as_str()));
}

/// Groups units by source, keeping first-seen order of sources and units.
fn group_by_source(units: Vec<TextUnit>) -> Vec<(String, Vec<TextUnit>)> {
    let mut groups: Vec<(String, Vec<TextUnit>)> = Vec::new();
    for unit in units {
        match groups.iter_mut().find(|(s, _)| *s == unit.source) {
            Some((_, list)) => list.push(unit),
            None => groups.push((unit.source.clone(), vec![unit])),
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(source: &str, id: &str) -> TextUnit {
        TextUnit {
            id: id.to_string(),
            source: source.to_string(),
            page: 0,
            text: String::new(),
            kind: UnitKind::Atomic,
            metadata: RawMeta::new(),
        }
    }

    #[test]
    fn grouping_keeps_first_seen_order() {
        let groups = group_by_source(vec![unit("b", "1"), unit("a", "2"), unit("b", "3")]);
        let shape: Vec<_> = groups.iter().map(|(s, u)| (s.as_str(), u.len())).collect();
        assert_eq!(shape, vec![("b", 2), ("a", 1)]);
        assert_eq!(groups[0].1[1].id, "3");
    }

    #[test]
    fn stamp_overrides_row_fields() {
        let mut meta = RawMeta::new();
        meta.insert("source".to_string(), Value::from("spoofed"));
        meta.insert("city".to_string(), Value::from("Bogor"));
        stamp(&mut meta, "places.csv", 4, "a,b", UnitKind::Atomic);
        assert_eq!(meta["source"], "places.csv");
        assert_eq!(meta["page"], 4);
        assert_eq!(meta["tags"], "a,b");
        assert_eq!(meta["kind"], "atomic");
        assert_eq!(meta["city"], "Bogor");
    }
}
