use anyhow::Result;
use arrow_array::types::Float32Type;
use arrow_array::{
    FixedSizeListArray, Int64Array, RecordBatch, StringArray, TimestampMillisecondArray,
};
use chrono::Utc;
use std::sync::Arc;

use ecorec_core::error::Error;
use ecorec_core::types::{MetaValue, Metadata, TextUnit};

use crate::sanitize::sanitize;
use crate::schema::{build_units_schema, vector_width};

/// A unit after sanitization, with its promoted columns filled in.
#[derive(Debug, Clone)]
pub struct IndexRow {
    pub id: String,
    pub source: String,
    pub page: i64,
    pub kind: String,
    pub tags: String,
    pub text: String,
    pub metadata: Metadata,
}

impl IndexRow {
    /// Sanitizes the unit's metadata and makes `source`, `page`, `kind` and
    /// `tags` present in it, so pushed-down and post-filtered clauses agree.
    pub fn from_unit(unit: &TextUnit) -> Self {
        let mut metadata = sanitize(&unit.metadata);
        metadata
            .entry("source".to_string())
            .or_insert_with(|| MetaValue::from(unit.source.as_str()));
        metadata.entry("page".to_string()).or_insert(MetaValue::Int(unit.page));
        metadata.entry("kind".to_string()).or_insert_with(|| MetaValue::from(unit.kind.as_str()));
        metadata.entry("tags".to_string()).or_insert_with(|| MetaValue::from(""));

        let text_of = |key: &str| metadata.get(key).map(ToString::to_string).unwrap_or_default();
        let page = metadata.get("page").and_then(MetaValue::as_i64).unwrap_or(unit.page);
        Self {
            id: unit.id.clone(),
            source: text_of("source"),
            page,
            kind: text_of("kind"),
            tags: text_of("tags"),
            text: unit.text.clone(),
            metadata,
        }
    }
}

pub fn rows_to_record_batch(
    rows: &[IndexRow],
    embeddings: &[Vec<f32>],
    dim: usize,
) -> Result<RecordBatch> {
    if rows.len() != embeddings.len() {
        anyhow::bail!("{} units but {} embeddings", rows.len(), embeddings.len());
    }
    if let Some(bad) = embeddings.iter().find(|v| v.len() != dim) {
        return Err(Error::DimensionMismatch { expected: dim, got: bad.len() }.into());
    }

    let now = Utc::now().timestamp_millis();
    let metadata = rows
        .iter()
        .map(|r| serde_json::to_string(&r.metadata))
        .collect::<Result<Vec<_>, _>>()?;
    let vectors =
        embeddings.iter().map(|v| Some(v.iter().copied().map(Some).collect::<Vec<_>>()));

    let batch = RecordBatch::try_new(
        build_units_schema(dim),
        vec![
            Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.id.as_str()))),
            Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.source.as_str()))),
            Arc::new(Int64Array::from_iter_values(rows.iter().map(|r| r.page))),
            Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.kind.as_str()))),
            Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.tags.as_str()))),
            Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.text.as_str()))),
            Arc::new(StringArray::from(metadata)),
            Arc::new(TimestampMillisecondArray::from(vec![now; rows.len()])),
            Arc::new(FixedSizeListArray::from_iter_primitive::<Float32Type, _, _>(
                vectors,
                vector_width(dim),
            )),
        ],
    )?;
    Ok(batch)
}
