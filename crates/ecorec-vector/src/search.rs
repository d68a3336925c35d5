use anyhow::{anyhow, Result};
use arrow_array::{Array, Float32Array, Int64Array, RecordBatch, StringArray};

use ecorec_core::filter::MetaFilter;
use ecorec_core::types::{Metadata, SearchHit};

fn string_col<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<StringArray>())
        .ok_or_else(|| anyhow!("column '{name}' missing or not utf8"))
}

/// Decodes one result batch from a vector search.
pub fn hits_from_batch(batch: &RecordBatch) -> Result<Vec<SearchHit>> {
    let ids = string_col(batch, "id")?;
    let sources = string_col(batch, "source")?;
    let texts = string_col(batch, "text")?;
    let metas = string_col(batch, "metadata")?;
    let pages = batch
        .column_by_name("page")
        .and_then(|c| c.as_any().downcast_ref::<Int64Array>())
        .ok_or_else(|| anyhow!("column 'page' missing or not int64"))?;
    let distances = batch
        .column_by_name("_distance")
        .and_then(|c| c.as_any().downcast_ref::<Float32Array>());

    let mut hits = Vec::with_capacity(batch.num_rows());
    for i in 0..batch.num_rows() {
        let metadata: Metadata = serde_json::from_str(metas.value(i)).unwrap_or_default();
        let distance = match distances {
            Some(d) if !d.is_null(i) => d.value(i),
            _ => f32::INFINITY,
        };
        hits.push(SearchHit {
            id: ids.value(i).to_string(),
            text: texts.value(i).to_string(),
            source: sources.value(i).to_string(),
            page: pages.value(i),
            metadata,
            distance,
        });
    }
    Ok(hits)
}

/// Applies an optional post-filter, orders by distance and keeps `k`.
pub fn finalize_hits(
    mut hits: Vec<SearchHit>,
    filter: Option<&MetaFilter>,
    k: usize,
) -> Vec<SearchHit> {
    if let Some(f) = filter {
        hits.retain(|h| f.matches(&h.metadata));
    }
    hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
    hits.truncate(k);
    hits
}
