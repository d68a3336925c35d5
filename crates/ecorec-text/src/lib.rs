//! ecorec-text
//!
//! Document parsing (CSV/TSV rows, PDF, plain text) and chunking into
//! overlapping windows ready for embedding.

pub mod chunk;
pub mod parser;

pub use chunk::{chunk, Chunk, Chunker};
pub use parser::{parse, parse_file, ParseError, ParseFailure, ParseOutcome};
