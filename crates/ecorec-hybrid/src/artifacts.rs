//! Loading and reconciling the pre-trained recommendation artifacts.
//!
//! Content bundle (`cbf_dir`):
//! - `cbf_item_matrix.npz`: CSR arrays `data`, `indices`, `indptr`, `shape`
//! - `cbf_artifacts.json`: `{"place_id_order": [...]}`
//! - `places_clean.csv` (optional, else `<fallback>/eco_place.csv`)
//!
//! Collaborative bundle (`cf_dir`):
//! - `cf_item_sim.npy`: dense square similarity matrix
//! - `cf_artifacts.json`: `{"item_ids": [...], "item_to_col": {"<id>": col}}`

use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};

use ndarray::{Array1, Array2, Axis};
use ndarray_npy::{read_npy, NpzReader, ReadableElement};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{info, warn};

use ecorec_core::config::ArtifactSettings;
use ecorec_core::types::PlaceId;

use crate::catalog::Catalog;
use crate::error::LoadError;
use crate::matrix::CsrMatrix;

pub const CBF_MATRIX_FILE: &str = "cbf_item_matrix.npz";
pub const CBF_COMPANION_FILE: &str = "cbf_artifacts.json";
pub const CATALOG_FILE: &str = "places_clean.csv";
pub const RAW_CATALOG_FILE: &str = "eco_place.csv";
pub const CF_MATRIX_FILE: &str = "cf_item_sim.npy";
pub const CF_COMPANION_FILE: &str = "cf_artifacts.json";

#[derive(Debug, Clone)]
pub struct ArtifactPaths {
    pub cbf_dir: PathBuf,
    pub cf_dir: PathBuf,
    pub fallback_data_dir: Option<PathBuf>,
}

impl From<&ArtifactSettings> for ArtifactPaths {
    fn from(s: &ArtifactSettings) -> Self {
        Self {
            cbf_dir: s.cbf_dir.clone(),
            cf_dir: s.cf_dir.clone(),
            fallback_data_dir: Some(s.fallback_data_dir.clone()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CbfCompanion {
    #[serde(default)]
    place_id_order: Vec<PlaceId>,
}

#[derive(Debug, Deserialize)]
struct CfCompanion {
    #[serde(default)]
    item_ids: Vec<PlaceId>,
    #[serde(default)]
    item_to_col: HashMap<String, usize>,
}

/// Everything the scorer reads, after alignment.
#[derive(Debug, Clone)]
pub struct Artifacts {
    pub catalog: Catalog,
    /// Identity of each row of `features`.
    pub place_id_order: Vec<PlaceId>,
    pub features: CsrMatrix,
    /// Identity of each row/column of `item_sim`; all present in `catalog`.
    pub item_ids: Vec<PlaceId>,
    pub item_to_col: HashMap<PlaceId, usize>,
    pub item_sim: Array2<f64>,
}

impl Artifacts {
    pub fn load(paths: &ArtifactPaths) -> Result<Self, LoadError> {
        let (catalog, place_id_order, features) = load_content(paths)?;
        let (item_ids, item_to_col, item_sim) = load_collaborative(&paths.cf_dir)?;
        let mut artifacts =
            Self { catalog, place_id_order, features, item_ids, item_to_col, item_sim };
        artifacts.align();
        info!(
            places = artifacts.catalog.len(),
            cbf_rows = artifacts.features.nrows(),
            cf_items = artifacts.item_ids.len(),
            "recommendation artifacts loaded"
        );
        Ok(artifacts)
    }

    /// Drops collaborative items that are not in the catalog, slicing the
    /// similarity matrix on both axes and rebuilding `item_to_col`.
    pub fn align(&mut self) {
        if self.item_ids.is_empty() {
            return;
        }
        let keep: Vec<usize> = self
            .item_ids
            .iter()
            .enumerate()
            .filter(|(_, id)| self.catalog.contains(**id))
            .map(|(i, _)| i)
            .collect();
        if keep.len() == self.item_ids.len() {
            return;
        }
        warn!(
            pruned = self.item_ids.len() - keep.len(),
            "collaborative items missing from catalog were pruned"
        );
        self.item_sim = self.item_sim.select(Axis(0), &keep).select(Axis(1), &keep);
        self.item_ids = keep.iter().map(|&i| self.item_ids[i]).collect();
        self.item_to_col = self.item_ids.iter().enumerate().map(|(j, &id)| (id, j)).collect();
    }
}

fn require(path: PathBuf) -> Result<PathBuf, LoadError> {
    if path.exists() {
        Ok(path)
    } else {
        Err(LoadError::MissingArtifact { path })
    }
}

fn invalid(path: &Path, reason: impl ToString) -> LoadError {
    LoadError::InvalidArtifact { path: path.to_path_buf(), reason: reason.to_string() }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, LoadError> {
    let file = File::open(path).map_err(|e| invalid(path, e))?;
    serde_json::from_reader(file).map_err(|e| invalid(path, e))
}

fn load_content(paths: &ArtifactPaths) -> Result<(Catalog, Vec<PlaceId>, CsrMatrix), LoadError> {
    let matrix_path = require(paths.cbf_dir.join(CBF_MATRIX_FILE))?;
    let companion_path = require(paths.cbf_dir.join(CBF_COMPANION_FILE))?;

    let mut place_id_order = read_json::<CbfCompanion>(&companion_path)?.place_id_order;
    let features = read_csr(&matrix_path)?;

    let clean = paths.cbf_dir.join(CATALOG_FILE);
    let catalog = if clean.exists() {
        Catalog::from_csv(&clean, &place_id_order)?
    } else {
        let fallback =
            paths.fallback_data_dir.as_ref().ok_or(LoadError::MissingArtifact { path: clean })?;
        let raw = require(fallback.join(RAW_CATALOG_FILE))?;
        Catalog::from_raw_csv(&raw, &place_id_order)?
    };

    if features.nrows() != place_id_order.len() {
        warn!(
            rows = features.nrows(),
            order = place_id_order.len(),
            "content matrix and place_id_order disagree"
        );
        place_id_order.truncate(features.nrows());
    }
    Ok((catalog, place_id_order, features))
}

type Collaborative = (Vec<PlaceId>, HashMap<PlaceId, usize>, Array2<f64>);

fn load_collaborative(cf_dir: &Path) -> Result<Collaborative, LoadError> {
    let matrix_path = require(cf_dir.join(CF_MATRIX_FILE))?;
    let companion_path = require(cf_dir.join(CF_COMPANION_FILE))?;

    let item_sim: Array2<f64> = match read_npy::<_, Array2<f64>>(&matrix_path) {
        Ok(m) => m,
        Err(_) => read_npy::<_, Array2<f32>>(&matrix_path)
            .map(|m| m.mapv(f64::from))
            .map_err(|e| invalid(&matrix_path, e))?,
    };
    let (rows, cols) = item_sim.dim();
    if rows != cols {
        let reason = format!("similarity matrix is {rows}x{cols}, expected square");
        return Err(invalid(&matrix_path, reason));
    }

    let companion: CfCompanion = read_json(&companion_path)?;
    if companion.item_ids.len() != rows {
        return Err(invalid(
            &companion_path,
            format!("{} item_ids for a {rows}x{rows} similarity matrix", companion.item_ids.len()),
        ));
    }

    let item_to_col: HashMap<PlaceId, usize> = if companion.item_to_col.is_empty() {
        companion.item_ids.iter().enumerate().map(|(j, &id)| (id, j)).collect()
    } else {
        companion
            .item_to_col
            .iter()
            .filter_map(|(k, &col)| parse_key(k).map(|id| (id, col)))
            .filter(|&(_, col)| col < rows)
            .collect()
    };
    Ok((companion.item_ids, item_to_col, item_sim))
}

fn parse_key(k: &str) -> Option<PlaceId> {
    let k = k.trim();
    k.parse::<i64>()
        .ok()
        .or_else(|| {
            k.parse::<f64>().ok().filter(|f| f.fract() == 0.0 && f.is_finite()).map(|f| f as i64)
        })
}

fn npz_vec<T: ReadableElement + Clone>(npz: &mut NpzReader<File>, key: &str) -> Option<Vec<T>> {
    let a: Array1<T> = npz.by_name(key).or_else(|_| npz.by_name(&format!("{key}.npy"))).ok()?;
    Some(a.to_vec())
}

fn npz_f64(npz: &mut NpzReader<File>, key: &str) -> Option<Vec<f64>> {
    npz_vec::<f64>(npz, key)
        .or_else(|| npz_vec::<f32>(npz, key).map(|v| v.into_iter().map(f64::from).collect()))
}

fn npz_usize(npz: &mut NpzReader<File>, key: &str) -> Option<Vec<usize>> {
    let wide: Vec<i64> = match npz_vec::<i32>(npz, key) {
        Some(v) => v.into_iter().map(i64::from).collect(),
        None => npz_vec::<i64>(npz, key)?,
    };
    wide.into_iter().map(|x| usize::try_from(x).ok()).collect()
}

fn read_csr(path: &Path) -> Result<CsrMatrix, LoadError> {
    let file = File::open(path).map_err(|e| invalid(path, e))?;
    let mut npz = NpzReader::new(file).map_err(|e| invalid(path, e))?;

    let missing = |key: &str| invalid(path, format!("missing or unreadable '{key}' array"));
    let data = npz_f64(&mut npz, "data").ok_or_else(|| missing("data"))?;
    let indices = npz_usize(&mut npz, "indices").ok_or_else(|| missing("indices"))?;
    let indptr = npz_usize(&mut npz, "indptr").ok_or_else(|| missing("indptr"))?;
    let shape = npz_usize(&mut npz, "shape").ok_or_else(|| missing("shape"))?;
    let [nrows, ncols] = shape[..] else {
        return Err(invalid(path, format!("shape has {} dimensions, expected 2", shape.len())));
    };
    CsrMatrix::from_parts((nrows, ncols), data, indices, indptr)
        .map_err(|reason| invalid(path, reason))
}
