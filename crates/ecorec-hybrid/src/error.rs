use std::path::PathBuf;

use thiserror::Error;

/// Failures that stop the recommender from being built.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("missing artifact: {}", path.display())]
    MissingArtifact { path: PathBuf },

    #[error("failed to load catalog: {0}")]
    CatalogLoad(String),

    #[error(
        "catalog has no id, place_id or index column and ids cannot be inferred from place_id_order"
    )]
    MissingIdentity,

    #[error("invalid artifact {}: {reason}", path.display())]
    InvalidArtifact { path: PathBuf, reason: String },
}
