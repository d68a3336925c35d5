//! Turns files on disk into [`TextUnit`]s.
//!
//! Tabular files yield one atomic unit per row; PDFs and everything else yield
//! a single splittable unit holding the whole document text.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{Number, Value};
use thiserror::Error;
use tracing::{debug, info, warn};

use ecorec_core::types::{RawMeta, TextUnit, UnitKind};

/// Columns summarized from tabular rows, in this order, when present.
pub const PREFERRED_COLUMNS: &[&str] = &[
    "id",
    "place_id",
    "place_name",
    "place_description",
    "category",
    "city",
    "address",
    "price",
    "price_str",
    "price_num",
    "rating",
    "rating_avg",
    "image",
    "map_url",
];

/// Column cap used when none of the preferred columns exist.
pub const FALLBACK_COLUMN_LIMIT: usize = 8;

const NUMERIC_COLUMNS: &[&str] = &["price", "price_num", "rating", "rating_avg"];

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("text extraction failed for {path}: {reason}")]
    ExtractionFailed { path: PathBuf, reason: String },
}

/// A file that produced no units, with the reason.
#[derive(Debug, Clone)]
pub struct ParseFailure {
    pub source: String,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct ParseOutcome {
    pub units: Vec<TextUnit>,
    pub failures: Vec<ParseFailure>,
}

/// Parses every path. A file that fails is recorded in `failures` and the rest
/// of the batch continues.
pub fn parse(paths: &[PathBuf]) -> ParseOutcome {
    let mut outcome = ParseOutcome::default();
    for path in paths {
        match parse_file(path) {
            Ok(units) => {
                debug!(path = %path.display(), units = units.len(), "parsed file");
                outcome.units.extend(units);
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "skipping file");
                outcome
                    .failures
                    .push(ParseFailure { source: source_name(path), reason: e.to_string() });
            }
        }
    }
    info!(
        files = paths.len(),
        units = outcome.units.len(),
        failures = outcome.failures.len(),
        "parse finished"
    );
    outcome
}

/// Parses a single file, dispatching on its extension. Splittable units that
/// are whitespace-only are dropped; atomic rows are always kept.
pub fn parse_file(path: &Path) -> Result<Vec<TextUnit>, ParseError> {
    let source = source_name(path);
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    let units = match ext.as_str() {
        "csv" => parse_table(path, &source, b','),
        "tsv" => parse_table(path, &source, b'\t'),
        "pdf" => {
            let text = extract_pdf_text(path)?;
            vec![splittable(&source, text)]
        }
        _ => vec![splittable(&source, read_lossy(path)?)],
    };

    Ok(units
        .into_iter()
        .filter(|u| u.kind == UnitKind::Atomic || !u.text.trim().is_empty())
        .collect())
}

/// Basename used as the `source` of every unit from `path`.
pub fn source_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

fn splittable(source: &str, text: String) -> TextUnit {
    TextUnit {
        id: source.to_string(),
        source: source.to_string(),
        page: 0,
        text,
        kind: UnitKind::Splittable,
        metadata: RawMeta::new(),
    }
}

fn read_lossy(path: &Path) -> Result<String, ParseError> {
    let bytes =
        fs::read(path).map_err(|source| ParseError::Io { path: path.to_path_buf(), source })?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn parse_table(path: &Path, source: &str, delimiter: u8) -> Vec<TextUnit> {
    match read_table_rows(path, source, delimiter) {
        Ok(units) => units,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "table unreadable, indexing raw text");
            match read_lossy(path) {
                Ok(text) => vec![splittable(source, text)],
                Err(_) => Vec::new(),
            }
        }
    }
}

fn read_table_rows(path: &Path, source: &str, delimiter: u8) -> Result<Vec<TextUnit>, csv::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_path(path)?;

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .enumerate()
        .map(|(i, h)| {
            let h = if i == 0 { h.trim_start_matches('\u{feff}') } else { h };
            h.trim().to_string()
        })
        .collect();
    let columns = select_columns(&headers);

    let mut units = Vec::new();
    for (row_idx, record) in reader.records().enumerate() {
        let record = record?;
        let row_no = row_idx + 1;
        let mut parts = Vec::new();
        let mut metadata = RawMeta::new();
        for &(col_idx, name) in &columns {
            let value = record.get(col_idx).map(str::trim).filter(|v| is_present(v));
            if let Some(v) = value {
                parts.push(format!("{name}: {v}"));
            }
            metadata.insert(name.to_string(), field_value(name, value));
        }
        units.push(TextUnit {
            id: format!("{source}::row{row_no}"),
            source: source.to_string(),
            page: i64::try_from(row_no).unwrap_or(i64::MAX),
            text: parts.join(" | "),
            kind: UnitKind::Atomic,
            metadata,
        });
    }
    Ok(units)
}

fn select_columns(headers: &[String]) -> Vec<(usize, &str)> {
    let preferred: Vec<(usize, &str)> = PREFERRED_COLUMNS
        .iter()
        .filter_map(|want| {
            headers.iter().position(|h| h == want).map(|i| (i, headers[i].as_str()))
        })
        .collect();
    if !preferred.is_empty() {
        return preferred;
    }
    headers
        .iter()
        .enumerate()
        .take(FALLBACK_COLUMN_LIMIT)
        .map(|(i, h)| (i, h.as_str()))
        .collect()
}

fn is_present(value: &str) -> bool {
    !value.is_empty() && !value.eq_ignore_ascii_case("nan")
}

fn field_value(name: &str, value: Option<&str>) -> Value {
    let Some(v) = value else { return Value::Null };
    if NUMERIC_COLUMNS.contains(&name) {
        if let Some(n) = v.parse::<f64>().ok().and_then(Number::from_f64) {
            return Value::Number(n);
        }
    }
    Value::String(v.to_string())
}

fn extract_pdf_text(path: &Path) -> Result<String, ParseError> {
    let bytes =
        fs::read(path).map_err(|source| ParseError::Io { path: path.to_path_buf(), source })?;

    let primary = pdf_extract::extract_text_from_mem(&bytes);
    match primary {
        Ok(text) if !text.trim().is_empty() => return Ok(text),
        Ok(_) => debug!(path = %path.display(), "primary extractor returned no text"),
        Err(ref e) => debug!(path = %path.display(), error = %e, "primary extractor failed"),
    }

    extract_pdf_pages(&bytes)
        .map_err(|reason| ParseError::ExtractionFailed { path: path.to_path_buf(), reason })
}

fn extract_pdf_pages(bytes: &[u8]) -> Result<String, String> {
    let doc = lopdf::Document::load_mem(bytes).map_err(|e| e.to_string())?;
    let mut pages = Vec::new();
    for page_no in doc.get_pages().keys() {
        pages.push(doc.extract_text(&[*page_no]).unwrap_or_default());
    }
    let text = pages.join("\n");
    if text.trim().is_empty() {
        return Err("no extractable text".to_string());
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn csv_rows_become_atomic_units() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("places.csv");
        fs::write(
            &path,
            "id,place_name,city,price,rating,extra\n\
             1,Curug Cilember,Bogor,15000,4.5,x\n\
             2,Kebun Raya,nan,,NaN,y\n",
        )
        .unwrap();

        let units = parse_file(&path).unwrap();
        assert_eq!(units.len(), 2);
        assert_eq!(units[0].id, "places.csv::row1");
        assert_eq!(units[0].page, 1);
        assert_eq!(units[0].kind, UnitKind::Atomic);
        assert_eq!(
            units[0].text,
            "id: 1 | place_name: Curug Cilember | city: Bogor | price: 15000 | rating: 4.5"
        );
        assert_eq!(units[0].metadata["price"], serde_json::json!(15000.0));
        assert_eq!(units[0].metadata["city"], serde_json::json!("Bogor"));
        assert!(!units[0].metadata.contains_key("extra"));

        assert_eq!(units[1].text, "id: 2 | place_name: Kebun Raya");
        assert!(units[1].metadata["city"].is_null());
        assert!(units[1].metadata["rating"].is_null());
    }

    #[test]
    fn empty_rows_are_kept_for_row_continuity() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("t.tsv");
        fs::write(&path, "place_name\tcity\n\t\nA\tB\n").unwrap();
        let units = parse_file(&path).unwrap();
        assert_eq!(units.len(), 2);
        assert_eq!(units[0].text, "");
        assert_eq!(units[1].id, "t.tsv::row2");
    }

    #[test]
    fn unknown_columns_fall_back_to_first_eight() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("wide.csv");
        let header: Vec<String> = (0..10).map(|i| format!("c{i}")).collect();
        let row: Vec<String> = (0..10).map(|i| i.to_string()).collect();
        fs::write(&path, format!("{}\n{}\n", header.join(","), row.join(","))).unwrap();
        let units = parse_file(&path).unwrap();
        assert_eq!(units[0].metadata.len(), FALLBACK_COLUMN_LIMIT);
        assert!(units[0].text.ends_with("c7: 7"));
    }

    #[test]
    fn whitespace_text_files_are_dropped() {
        let tmp = TempDir::new().unwrap();
        let blank = tmp.path().join("blank.txt");
        let note = tmp.path().join("note.md");
        fs::write(&blank, "  \n\t\n").unwrap();
        fs::write(&note, "Taman nasional").unwrap();

        let outcome = parse(&[blank, note, tmp.path().join("missing.txt")]);
        assert_eq!(outcome.units.len(), 1);
        assert_eq!(outcome.units[0].source, "note.md");
        assert_eq!(outcome.units[0].kind, UnitKind::Splittable);
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].source, "missing.txt");
    }

    #[test]
    fn broken_pdf_reports_extraction_failure() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("bad.pdf");
        fs::write(&path, b"not a pdf at all").unwrap();
        assert!(matches!(parse_file(&path), Err(ParseError::ExtractionFailed { .. })));
    }

    /// One-page PDF drawing `text` in Courier.
    fn tiny_pdf(text: &str) -> Vec<u8> {
        use lopdf::content::{Content, Operation};
        use lopdf::{dictionary, Document, Object, Stream};

        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
            "Encoding" => "WinAnsiEncoding",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 24.into()]),
                Operation::new("Td", vec![72.into(), 720.into()]),
                Operation::new("Tj", vec![Object::string_literal(text)]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }

    #[test]
    fn page_extractor_reads_simple_pdf() {
        let text = extract_pdf_pages(&tiny_pdf("Hello World")).unwrap();
        assert!(text.contains("Hello"), "got {text:?}");
    }

    #[test]
    fn pdf_becomes_one_splittable_unit() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("brosur.pdf");
        fs::write(&path, tiny_pdf("Hello World")).unwrap();

        let units = parse_file(&path).unwrap();
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].kind, UnitKind::Splittable);
        assert_eq!(units[0].source, "brosur.pdf");
        assert!(units[0].text.contains("Hello"));
    }
}
