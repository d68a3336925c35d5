//! ecorec-hybrid
//!
//! Hybrid place recommendation: loads the content-based (CSR feature matrix)
//! and collaborative (dense item-similarity) artifacts with the place catalog,
//! aligns their id spaces and blends both signals into a ranked top-K.

pub mod artifacts;
pub mod catalog;
pub mod error;
pub mod matrix;
pub mod price;
pub mod scorer;

pub use artifacts::{ArtifactPaths, Artifacts};
pub use catalog::{Catalog, Place};
pub use error::LoadError;
pub use scorer::{HybridRecommender, Recommendation, UserRatings};
