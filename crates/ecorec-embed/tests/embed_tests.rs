use ecorec_core::config::Settings;
use ecorec_core::traits::Embedder;
use ecorec_embed::{get_default_embedder, HashEmbedder};

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

#[test]
fn shared_words_are_closer_than_unrelated_text() {
    let e = HashEmbedder::new(256);
    let q = e.embed_text("curug air terjun bogor").unwrap();
    let near = e.embed_text("air terjun di bogor").unwrap();
    let far = e.embed_text("museum sejarah jakarta kota").unwrap();
    assert!(cosine(&q, &near) > cosine(&q, &far));
}

#[test]
fn batch_keeps_dimension_for_blank_inputs() {
    let e = HashEmbedder::new(16);
    let out = e.embed_batch(&["".to_string(), "pantai".to_string()]);
    assert_eq!(out.len(), 2);
    assert!(out.iter().all(|v| v.len() == 16));
}

#[test]
fn fake_flag_selects_hash_embedder() {
    let mut settings = Settings::default();
    settings.use_fake_embeddings = true;
    settings.rag.embedding_dim = 48;
    let e = get_default_embedder(&settings).unwrap();
    assert_eq!(e.dim(), 48);
    assert!(e.model_id().starts_with("hash:"));
}
