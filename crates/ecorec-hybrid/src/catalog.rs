//! Place catalog loaded from CSV.

use std::collections::HashMap;
use std::path::Path;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::Serialize;
use tracing::{debug, warn};

use ecorec_core::types::PlaceId;

use crate::error::LoadError;
use crate::price::{format_price_idr, parse_price_idr};

/// Renames applied to the raw `eco_place.csv` export.
const RAW_RENAMES: &[(&str, &str)] = &[
    ("place_id", "id"),
    ("place_img", "image"),
    ("description_location", "address"),
    ("gallery_photo_img1", "gallery1"),
    ("gallery_photo_img2", "gallery2"),
    ("gallery_photo_img3", "gallery3"),
    ("place_map", "map_url"),
];

const PRICE_STR_CANDIDATES: &[&str] = &["price", "harga", "ticket_price", "price_idr", "price_str"];
const PRICE_NUM_CANDIDATES: &[&str] = &["price_num", "harga_num", "price_int", "price_integer"];

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Place {
    pub id: PlaceId,
    pub place_name: String,
    pub place_description: String,
    pub category: String,
    pub city: String,
    pub address: String,
    /// Numeric price in IDR, 0 when free or unknown.
    pub price_num: f64,
    /// Display price; filled from `price_num` when the source had none.
    pub price_str: String,
    pub rating: f64,
    pub image: String,
    pub gallery1: String,
    pub gallery2: String,
    pub gallery3: String,
    pub map_url: String,
}

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    places: Vec<Place>,
    by_id: HashMap<PlaceId, usize>,
}

impl Catalog {
    pub fn new(places: Vec<Place>) -> Self {
        let mut by_id = HashMap::with_capacity(places.len());
        for (i, p) in places.iter().enumerate() {
            by_id.entry(p.id).or_insert(i);
        }
        Self { places, by_id }
    }

    /// Reads a cleaned catalog CSV. `place_id_order` is only used to infer ids
    /// when the file has no identity column.
    pub fn from_csv(path: &Path, place_id_order: &[PlaceId]) -> Result<Self, LoadError> {
        let table = Table::read(path)?;
        Self::from_table(table, place_id_order)
    }

    /// Reads the raw export, renaming its columns to the catalog's names first.
    pub fn from_raw_csv(path: &Path, place_id_order: &[PlaceId]) -> Result<Self, LoadError> {
        let mut table = Table::read(path)?;
        for (from, to) in RAW_RENAMES {
            table.rename(from, to);
        }
        Self::from_table(table, place_id_order)
    }

    fn from_table(table: Table, place_id_order: &[PlaceId]) -> Result<Self, LoadError> {
        let ids = resolve_ids(&table, place_id_order)?;
        let rating_col = table.column("rating").or_else(|| table.column("rating_avg"));
        let prices = resolve_prices(&table);

        let mut places = Vec::with_capacity(table.rows.len());
        let mut dropped = 0usize;
        for (r, id) in ids.into_iter().enumerate() {
            let Some(id) = id else {
                dropped += 1;
                continue;
            };
            let text = |name: &str| table.cell_by_name(r, name).to_string();
            let (price_str, price_num) = prices[r].clone();
            places.push(Place {
                id,
                place_name: text("place_name"),
                place_description: text("place_description"),
                category: text("category"),
                city: text("city"),
                address: text("address"),
                price_num,
                price_str,
                rating: rating_col.and_then(|c| parse_number(table.cell(r, c))).unwrap_or(0.0),
                image: text("image"),
                gallery1: text("gallery1"),
                gallery2: text("gallery2"),
                gallery3: text("gallery3"),
                map_url: text("map_url"),
            });
        }
        if dropped > 0 {
            warn!(dropped, "catalog rows without a numeric id were dropped");
        }
        debug!(places = places.len(), "catalog loaded");
        Ok(Self::new(places))
    }

    pub fn len(&self) -> usize {
        self.places.len()
    }

    pub fn is_empty(&self) -> bool {
        self.places.is_empty()
    }

    pub fn get(&self, id: PlaceId) -> Option<&Place> {
        self.by_id.get(&id).map(|&i| &self.places[i])
    }

    pub fn contains(&self, id: PlaceId) -> bool {
        self.by_id.contains_key(&id)
    }

    /// Highest rated first; equal ratings keep catalog order.
    pub fn top_rated(&self, k: usize) -> Vec<&Place> {
        let mut sorted: Vec<&Place> = self.places.iter().collect();
        sorted.sort_by(|a, b| b.rating.total_cmp(&a.rating));
        sorted.truncate(k);
        sorted
    }

    /// Reproducible random sample of at most `n` places.
    pub fn sample(&self, n: usize, seed: u64) -> Vec<&Place> {
        let mut rng = StdRng::seed_from_u64(seed);
        self.places.choose_multiple(&mut rng, n.min(self.places.len())).collect()
    }
}

/// A CSV file held as strings.
struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    fn read(path: &Path) -> Result<Self, LoadError> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(path)
            .map_err(|e| LoadError::CatalogLoad(format!("{}: {e}", path.display())))?;
        let headers = reader
            .headers()
            .map_err(|e| LoadError::CatalogLoad(format!("{}: {e}", path.display())))?
            .iter()
            .enumerate()
            .map(|(i, h)| {
                let h = if i == 0 { h.trim_start_matches('\u{feff}') } else { h };
                h.trim().to_string()
            })
            .collect();
        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record
                .map_err(|e| LoadError::CatalogLoad(format!("{}: {e}", path.display())))?;
            rows.push(record.iter().map(|v| v.trim().to_string()).collect());
        }
        Ok(Self { headers, rows })
    }

    fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    fn rename(&mut self, from: &str, to: &str) {
        if self.column(to).is_some() {
            return;
        }
        if let Some(i) = self.column(from) {
            self.headers[i] = to.to_string();
        }
    }

    fn cell(&self, row: usize, col: usize) -> &str {
        let v = self.rows[row].get(col).map(String::as_str).unwrap_or("");
        if v.eq_ignore_ascii_case("nan") { "" } else { v }
    }

    fn cell_by_name(&self, row: usize, name: &str) -> &str {
        self.column(name).map(|c| self.cell(row, c)).unwrap_or("")
    }

    /// Every non-empty cell parses as a number.
    fn is_numeric(&self, col: usize) -> bool {
        (0..self.rows.len()).all(|r| {
            let v = self.cell(r, col);
            v.is_empty() || parse_number(v).is_some()
        })
    }
}

fn parse_number(v: &str) -> Option<f64> {
    v.trim().parse::<f64>().ok().filter(|x| x.is_finite())
}

/// `"3"` and `"3.0"` are both id 3; anything else is no id.
fn parse_id(v: &str) -> Option<PlaceId> {
    let v = v.trim();
    if let Ok(i) = v.parse::<i64>() {
        return Some(i);
    }
    let f = v.parse::<f64>().ok()?;
    (f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64).then_some(f as i64)
}

fn resolve_ids(
    table: &Table,
    place_id_order: &[PlaceId],
) -> Result<Vec<Option<PlaceId>>, LoadError> {
    let id_col = table
        .column("id")
        .or_else(|| table.column("place_id"))
        .or_else(|| table.column("Unnamed: 0"))
        .or_else(|| table.headers.first().filter(|h| h.is_empty()).map(|_| 0));
    if let Some(c) = id_col {
        return Ok((0..table.rows.len()).map(|r| parse_id(table.cell(r, c))).collect());
    }
    if !place_id_order.is_empty() && place_id_order.len() == table.rows.len() {
        debug!(rows = table.rows.len(), "catalog ids inferred from place_id_order");
        return Ok(place_id_order.iter().copied().map(Some).collect());
    }
    Err(LoadError::MissingIdentity)
}

/// Display string and numeric price for every row.
fn resolve_prices(table: &Table) -> Vec<(String, f64)> {
    let n = table.rows.len();
    let eco_price = table.column("price").filter(|&c| !table.is_numeric(c));
    if let Some(c) = eco_price {
        return (0..n)
            .map(|r| {
                let s = table.cell(r, c).to_string();
                let num = parse_price_idr(&s);
                (s, num)
            })
            .collect();
    }

    let find = |names: &[&str], numeric: bool| {
        table
            .headers
            .iter()
            .enumerate()
            .find(|(i, h)| {
                names.contains(&h.to_lowercase().as_str()) && table.is_numeric(*i) == numeric
            })
            .map(|(i, _)| i)
    };
    let num_col = find(PRICE_NUM_CANDIDATES, true).or_else(|| find(PRICE_STR_CANDIDATES, true));
    let str_col = find(PRICE_STR_CANDIDATES, false);

    (0..n)
        .map(|r| {
            let num = num_col.and_then(|c| parse_number(table.cell(r, c))).unwrap_or(0.0);
            let s = str_col.map(|c| table.cell(r, c).to_string()).unwrap_or_default();
            let s = if s.trim().is_empty() && num > 0.0 { format_price_idr(num) } else { s };
            (s, num)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, body: &str) -> std::path::PathBuf {
        let p = dir.path().join(name);
        fs::write(&p, body).unwrap();
        p
    }

    #[test]
    fn text_prices_are_parsed_and_kept_for_display() {
        let dir = TempDir::new().unwrap();
        let p = write(
            &dir,
            "places.csv",
            "id,place_name,price,rating\n\
             1,Curug,Rp 15.000,4.5\n\
             2,Taman,gratis,\n\
             3.0,Kawah,25rb,4.1\n\
             x,Broken,0,1\n",
        );
        let c = Catalog::from_csv(&p, &[]).unwrap();
        assert_eq!(c.len(), 3);
        assert_eq!(c.get(1).unwrap().price_num, 15_000.0);
        assert_eq!(c.get(1).unwrap().price_str, "Rp 15.000");
        assert_eq!(c.get(2).unwrap().price_num, 0.0);
        assert_eq!(c.get(2).unwrap().rating, 0.0);
        assert_eq!(c.get(3).unwrap().price_num, 25_000.0);
    }

    #[test]
    fn numeric_price_column_gets_formatted_display() {
        let dir = TempDir::new().unwrap();
        let p = write(
            &dir,
            "places.csv",
            "place_id,place_name,price_num,rating_avg\n7,Pantai,150000,4.8\n8,Museum,,3.9\n",
        );
        let c = Catalog::from_csv(&p, &[]).unwrap();
        assert_eq!(c.get(7).unwrap().price_str, "Rp150.000");
        assert_eq!(c.get(7).unwrap().rating, 4.8);
        assert_eq!(c.get(8).unwrap().price_str, "");
    }

    #[test]
    fn raw_export_columns_are_renamed() {
        let dir = TempDir::new().unwrap();
        let p = write(
            &dir,
            "eco_place.csv",
            "place_id,place_name,place_img,place_map,price\n4,Goa,img.jpg,https://maps/4,10000\n",
        );
        let c = Catalog::from_raw_csv(&p, &[]).unwrap();
        let place = c.get(4).unwrap();
        assert_eq!(place.image, "img.jpg");
        assert_eq!(place.map_url, "https://maps/4");
        assert_eq!(place.price_num, 10_000.0);
    }

    #[test]
    fn identity_resolution_order() {
        let dir = TempDir::new().unwrap();
        let idx = write(&dir, "a.csv", ",place_name\n10,A\n11,B\n");
        let c = Catalog::from_csv(&idx, &[]).unwrap();
        assert!(c.contains(10) && c.contains(11));

        let none = write(&dir, "b.csv", "place_name\nA\nB\n");
        let c = Catalog::from_csv(&none, &[5, 6]).unwrap();
        assert_eq!(c.get(6).unwrap().place_name, "B");
        assert!(matches!(Catalog::from_csv(&none, &[5]), Err(LoadError::MissingIdentity)));
    }

    #[test]
    fn top_rated_and_sample() {
        let places = (1..=5)
            .map(|i| Place { id: i, rating: f64::from(i as i32 % 3), ..Place::default() })
            .collect();
        let c = Catalog::new(places);
        let top: Vec<_> = c.top_rated(3).iter().map(|p| p.id).collect();
        assert_eq!(top, vec![2, 5, 1]);

        let a: Vec<_> = c.sample(3, 42).iter().map(|p| p.id).collect();
        let b: Vec<_> = c.sample(3, 42).iter().map(|p| p.id).collect();
        assert_eq!(a, b);
        assert_eq!(a.len(), 3);
        assert_eq!(c.sample(10, 1).len(), 5);
    }
}
