use serde_json::json;
use tempfile::TempDir;

use ecorec_core::error::Error;
use ecorec_core::filter::MetaFilter;
use ecorec_core::traits::{Embedder, VectorStore};
use ecorec_core::types::{MetaValue, RawMeta, TextUnit, UnitKind};
use ecorec_embed::HashEmbedder;
use ecorec_vector::LanceVectorStore;

const DIM: usize = 32;

fn unit(source: &str, n: usize, text: &str, city: &str) -> TextUnit {
    let metadata: RawMeta = json!({"source": source, "page": n, "city": city, "note": null})
        .as_object()
        .cloned()
        .unwrap();
    TextUnit {
        id: format!("{source}::row{n}"),
        source: source.to_string(),
        page: n as i64,
        text: text.to_string(),
        kind: UnitKind::Atomic,
        metadata,
    }
}

fn seeded_store(dir: &TempDir) -> (LanceVectorStore, HashEmbedder) {
    let store = LanceVectorStore::open(&dir.path().join("lancedb"), "rag_docs", DIM).unwrap();
    let embedder = HashEmbedder::new(DIM);
    let units = vec![
        unit("places.csv", 1, "curug cilember air terjun bogor", "Bogor"),
        unit("places.csv", 2, "kawah putih danau kawah bandung", "Bandung"),
        unit("guide.txt", 1, "air terjun tersembunyi di bogor selatan", "Bogor"),
    ];
    let texts: Vec<String> = units.iter().map(|u| u.text.clone()).collect();
    let vectors = embedder.embed_batch(&texts);
    assert_eq!(store.add(&units, &vectors).unwrap(), 3);
    (store, embedder)
}

#[test]
fn empty_store_answers_without_a_table() {
    let dir = TempDir::new().unwrap();
    let store = LanceVectorStore::open(&dir.path().join("db"), "rag_docs", DIM).unwrap();
    assert_eq!(store.count().unwrap(), 0);
    assert!(!store.has_source("places.csv").unwrap());
    assert!(store.query(&vec![0.0; DIM], 5, None).unwrap().is_empty());
}

#[test]
fn add_count_and_has_source() {
    let dir = TempDir::new().unwrap();
    let (store, _) = seeded_store(&dir);
    assert_eq!(store.count().unwrap(), 3);
    assert!(store.has_source("places.csv").unwrap());
    assert!(store.has_source("guide.txt").unwrap());
    assert!(!store.has_source("guide").unwrap());
    assert!(!store.has_source("o'brien.pdf").unwrap());
    assert_eq!(store.stored_dim().unwrap(), Some(DIM));
}

#[test]
fn query_returns_nearest_with_sanitized_metadata() {
    let dir = TempDir::new().unwrap();
    let (store, embedder) = seeded_store(&dir);
    let q = embedder.embed_text("kawah putih bandung").unwrap();
    let hits = store.query(&q, 2, None).unwrap();
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].id, "places.csv::row2");
    assert!(hits[0].distance <= hits[1].distance);
    assert_eq!(hits[0].page, 2);
    assert!(!hits[0].metadata.contains_key("note"));
    assert_eq!(hits[0].metadata.get("city"), Some(&MetaValue::from("Bandung")));
}

#[test]
fn filters_on_columns_and_on_metadata() {
    let dir = TempDir::new().unwrap();
    let (store, embedder) = seeded_store(&dir);
    let q = embedder.embed_text("air terjun").unwrap();

    let by_source = MetaFilter::And(vec![MetaFilter::eq("source", "guide.txt")]);
    let hits = store.query(&q, 5, Some(&by_source)).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].source, "guide.txt");

    let by_city = MetaFilter::And(vec![MetaFilter::eq("city", "Bandung")]);
    let hits = store.query(&q, 5, Some(&by_city)).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, "places.csv::row2");
}

#[test]
fn mismatched_dimension_is_rejected() {
    let dir = TempDir::new().unwrap();
    let (store, _) = seeded_store(&dir);
    let err =
        store.add(&[unit("x.txt", 1, "x", "Bogor")], &[vec![0.1; DIM + 1]]).unwrap_err();
    assert!(matches!(err.downcast_ref::<Error>(), Some(Error::DimensionMismatch { .. })));
    assert!(store.query(&[0.0; 4], 3, None).is_err());
    assert_eq!(store.count().unwrap(), 3);
}

#[test]
fn reset_empties_the_store() {
    let dir = TempDir::new().unwrap();
    let (mut store, _) = seeded_store(&dir);
    store.reset().unwrap();
    assert_eq!(store.count().unwrap(), 0);
    assert!(!store.has_source("places.csv").unwrap());
}

/// Unit vector along `axis`, tilted slightly towards the second axis by `tilt`.
fn tilted(axis: usize, tilt: f32) -> Vec<f32> {
    let mut v = vec![0.0; DIM];
    v[axis] = 1.0;
    v[1] += tilt;
    v
}

#[test]
fn metadata_filter_finds_the_farthest_match() {
    let dir = TempDir::new().unwrap();
    let store = LanceVectorStore::open(&dir.path().join("lancedb"), "rag_docs", DIM).unwrap();
    let mut units = Vec::new();
    let mut vectors = Vec::new();
    for n in 1..=29 {
        units.push(unit("places.csv", n, "air terjun bogor", "Bogor"));
        vectors.push(tilted(0, n as f32 * 0.01));
    }
    units.push(unit("places.csv", 30, "kawah putih", "Bandung"));
    let mut opposite = vec![0.0; DIM];
    opposite[0] = -1.0;
    vectors.push(opposite);
    assert_eq!(store.add(&units, &vectors).unwrap(), 30);

    let by_city = MetaFilter::eq("city", "Bandung");
    let hits = store.query(&tilted(0, 0.0), 1, Some(&by_city)).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, "places.csv::row30");

    let by_city = MetaFilter::eq("city", "Bogor");
    let hits = store.query(&tilted(0, 0.0), 3, Some(&by_city)).unwrap();
    let ids: Vec<_> = hits.iter().map(|h| h.id.as_str()).collect();
    assert_eq!(ids, vec!["places.csv::row1", "places.csv::row2", "places.csv::row3"]);

    let nowhere = MetaFilter::eq("city", "Jakarta");
    assert!(store.query(&tilted(0, 0.0), 2, Some(&nowhere)).unwrap().is_empty());
}

#[test]
fn delete_source_removes_only_that_source() {
    let dir = TempDir::new().unwrap();
    let (store, _) = seeded_store(&dir);
    store.delete_source("places.csv").unwrap();
    assert_eq!(store.count().unwrap(), 1);
    assert!(!store.has_source("places.csv").unwrap());
    assert!(store.has_source("guide.txt").unwrap());

    store.delete_source("never-added.txt").unwrap();
    assert_eq!(store.count().unwrap(), 1);
}
