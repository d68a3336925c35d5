//! ecorec-rag
//!
//! Ingestion into the vector index and grounded answering over it.

pub mod answer;
pub mod chat;
pub mod error;
pub mod index;
pub mod ingest;
pub mod prompt;

pub use answer::{dedup_citations, retrieve, Answer, Answerer, Citation};
pub use chat::OpenAiChat;
pub use error::{RagError, Result};
pub use index::{open_store, Health, RagIndex};
pub use ingest::{BootstrapStatus, IngestFailure, IngestReport, Ingestor, BOOTSTRAP_TAG};
