use std::cmp::Ordering;
use std::collections::HashMap;

use ndarray::Array1;
use serde::Serialize;
use tracing::debug;

use ecorec_core::types::PlaceId;

use crate::artifacts::{ArtifactPaths, Artifacts};
use crate::catalog::Place;
use crate::error::LoadError;

/// Place id → rating given by the user (1–5).
pub type UserRatings = HashMap<PlaceId, f64>;

const NORM_EPS: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    pub place_id: PlaceId,
    pub name: String,
    pub city: String,
    pub category: String,
    pub price: String,
    pub rating: f64,
    pub image: String,
    /// Blended score rounded to 4 decimals.
    pub score: f64,
}

/// Blends collaborative and content-based signals over the aligned artifacts.
pub struct HybridRecommender {
    artifacts: Artifacts,
    feature_norms: Vec<f64>,
    order_index: HashMap<PlaceId, usize>,
}

impl HybridRecommender {
    pub fn load(paths: &ArtifactPaths) -> Result<Self, LoadError> {
        Ok(Self::new(Artifacts::load(paths)?))
    }

    pub fn new(artifacts: Artifacts) -> Self {
        let feature_norms = artifacts.features.row_norms();
        let mut order_index = HashMap::with_capacity(artifacts.place_id_order.len());
        for (i, &pid) in artifacts.place_id_order.iter().enumerate() {
            order_index.entry(pid).or_insert(i);
        }
        Self { artifacts, feature_norms, order_index }
    }

    pub fn artifacts(&self) -> &Artifacts {
        &self.artifacts
    }

    pub fn top_rated(&self, k: usize) -> Vec<&Place> {
        self.artifacts.catalog.top_rated(k)
    }

    pub fn sample_places(&self, n: usize, seed: u64) -> Vec<&Place> {
        self.artifacts.catalog.sample(n, seed)
    }

    /// Top `k` unrated places for the user, best first. `alpha` weighs the
    /// collaborative signal against the content signal.
    pub fn recommend(&self, ratings: &UserRatings, k: usize, alpha: f64) -> Vec<Recommendation> {
        let n = self.artifacts.item_ids.len();
        if n == 0 {
            return Vec::new();
        }
        let alpha = alpha.clamp(0.0, 1.0);

        let s_cf = self.collaborative_scores(ratings);
        let s_cbf = self.aligned_content_scores(ratings);
        let mut blended = norm01(&s_cf) * alpha + norm01(&s_cbf) * (1.0 - alpha);

        for pid in ratings.keys() {
            if let Some(&j) = self.artifacts.item_to_col.get(pid) {
                blended[j] = f64::NEG_INFINITY;
            }
        }

        let k = if n > 1 { k.clamp(1, n - 1) } else { 1 };
        let picked = top_k(&blended, &self.artifacts.item_ids, k);
        debug!(
            rated = ratings.len(),
            candidates = n,
            returned = picked.len(),
            alpha,
            "hybrid recommendation"
        );
        picked.into_iter().map(|j| self.describe(j, blended[j])).collect()
    }

    /// `item_sim · v` with `v[col(pid)] = rating`.
    fn collaborative_scores(&self, ratings: &UserRatings) -> Array1<f64> {
        let mut v = Array1::<f64>::zeros(self.artifacts.item_ids.len());
        for (pid, &r) in ratings {
            if let Some(&j) = self.artifacts.item_to_col.get(pid) {
                v[j] = r;
            }
        }
        self.artifacts.item_sim.dot(&v)
    }

    /// Rating-weighted cosine similarity over content rows, re-indexed onto
    /// the collaborative item order.
    fn aligned_content_scores(&self, ratings: &UserRatings) -> Array1<f64> {
        let features = &self.artifacts.features;
        let order = &self.artifacts.place_id_order;
        let mut aligned = Array1::<f64>::zeros(self.artifacts.item_ids.len());
        if order.len() != features.nrows() {
            return aligned;
        }

        let mut s_cbf = vec![0.0; features.nrows()];
        for (pid, &r) in ratings {
            if let Some(&i) = self.order_index.get(pid) {
                let sims = features.cosine_row(i, &self.feature_norms);
                for (acc, sim) in s_cbf.iter_mut().zip(sims) {
                    *acc += sim * r;
                }
            }
        }

        for (j, pid) in self.artifacts.item_ids.iter().enumerate() {
            if let Some(&i) = self.order_index.get(pid) {
                aligned[j] = s_cbf[i];
            }
        }
        aligned
    }

    fn describe(&self, j: usize, score: f64) -> Recommendation {
        let place_id = self.artifacts.item_ids[j];
        let place = self.artifacts.catalog.get(place_id);
        let field = |f: fn(&Place) -> &str| place.map(f).unwrap_or_default().to_string();
        Recommendation {
            place_id,
            name: field(|p| &p.place_name),
            city: field(|p| &p.city),
            category: field(|p| &p.category),
            price: field(|p| &p.price_str),
            rating: place.map(|p| p.rating).unwrap_or(0.0),
            image: field(|p| &p.image),
            score: (score * 10_000.0).round() / 10_000.0,
        }
    }
}

/// Min-max scaling to [0, 1]. NaNs are ignored for the range and map to 0; a
/// flat or non-finite range yields all zeros.
pub fn norm01(x: &Array1<f64>) -> Array1<f64> {
    let (mn, mx) = x
        .iter()
        .filter(|v| !v.is_nan())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    if !mn.is_finite() || !mx.is_finite() || mx - mn < NORM_EPS {
        return Array1::zeros(x.len());
    }
    x.mapv(|v| if v.is_nan() { 0.0 } else { (v - mn) / (mx - mn + NORM_EPS) })
}

/// Indices of the `k` best finite scores: score descending, then id ascending.
pub fn top_k(scores: &Array1<f64>, ids: &[PlaceId], k: usize) -> Vec<usize> {
    let cmp = |&a: &usize, &b: &usize| -> Ordering {
        scores[b].total_cmp(&scores[a]).then(ids[a].cmp(&ids[b]))
    };
    let mut candidates: Vec<usize> = (0..scores.len()).filter(|&j| scores[j].is_finite()).collect();
    if candidates.len() > k && k > 0 {
        candidates.select_nth_unstable_by(k - 1, cmp);
        candidates.truncate(k);
    }
    candidates.sort_unstable_by(cmp);
    candidates.truncate(k);
    candidates
}
