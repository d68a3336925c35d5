//! LanceDB-backed vector index for text units.
//!
//! - `schema`: Arrow schema with promoted metadata columns
//! - `sanitize`: scalar-only metadata at the index boundary
//! - `pushdown`: metadata filters rendered as SQL predicates
//! - `writer` / `search`: Arrow encode and decode
//! - `store`: [`LanceVectorStore`], the [`ecorec_core::traits::VectorStore`] impl

pub mod pushdown;
pub mod sanitize;
pub mod schema;
pub mod search;
pub mod store;
pub mod table;
pub mod writer;

pub use sanitize::sanitize;
pub use store::LanceVectorStore;
