//! Shared building blocks for the ecorec workspace.
//!
//! - `config`: Figment merge of `config.toml` + `config.<env>.toml` + `APP_*`
//!   env vars, typed [`config::Settings`] and path expansion helpers.
//! - `types`: text units, search hits, the scalar metadata union.
//! - `filter`: metadata filter normalization and evaluation.
//! - `traits`: seams for embedders, vector stores and chat models.
#![deny(unused_variables)]
#![deny(unused_imports)]

pub mod config;
pub mod error;
pub mod filter;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
