use ecorec_text::{chunk, Chunker};

fn long_text() -> String {
    let mut paras = Vec::new();
    for p in 0..12 {
        let sentence =
            format!("Paragraf {p} menjelaskan jalur pendakian, fasilitas, dan harga tiket masuk. ");
        paras.push(sentence.repeat(4));
    }
    paras.join("\n\n")
}

#[test]
fn chunk_ids_are_one_based_and_increasing() {
    let text = long_text();
    let chunks = chunk("trail.txt", &text, 300, 50).unwrap();
    assert!(chunks.len() > 3);
    for (i, c) in chunks.iter().enumerate() {
        assert_eq!(c.id, format!("trail.txt::chunk{}", i + 1));
        assert_eq!(c.source, "trail.txt");
        assert!(c.text.chars().count() <= 300);
        assert!(!c.text.trim().is_empty());
    }
}

#[test]
fn rechunking_is_idempotent() {
    let text = long_text();
    let chunker = Chunker::new(250, 40).unwrap();
    let first = chunker.chunk("a.md", &text);
    let second = chunker.chunk("a.md", &text);
    assert_eq!(first, second);
}

#[test]
fn paragraph_boundaries_are_preferred() {
    let text = format!("{}\n\n{}", "a".repeat(80), "b".repeat(80));
    let chunks = chunk("p.txt", &text, 100, 0).unwrap();
    assert_eq!(chunks.len(), 2);
    assert_eq!(chunks[0].text, "a".repeat(80));
    assert_eq!(chunks[1].text, "b".repeat(80));
}
