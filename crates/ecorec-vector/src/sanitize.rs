//! Metadata cleaning at the index boundary.
//!
//! The store only keeps scalar metadata: nulls are dropped, `page` is forced
//! to an integer and anything that is not a bool/int/float/string is kept as
//! its JSON text.

use serde_json::Value;

use ecorec_core::types::{MetaValue, Metadata, RawMeta};

pub fn sanitize(raw: &RawMeta) -> Metadata {
    let mut clean = Metadata::new();
    for (key, value) in raw {
        if value.is_null() {
            continue;
        }
        let v = if key == "page" {
            MetaValue::Int(coerce_page(value))
        } else {
            MetaValue::from_json_scalar(value).unwrap_or_else(|| MetaValue::Str(value.to_string()))
        };
        clean.insert(key.clone(), v);
    }
    clean
}

/// Integer page number; 0 when the value has no integer reading.
pub fn coerce_page(value: &Value) -> i64 {
    match value {
        Value::Bool(b) => i64::from(*b),
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(truncate)).unwrap_or(0),
        Value::String(s) => s.trim().parse::<i64>().unwrap_or(0),
        _ => 0,
    }
}

fn truncate(x: f64) -> Option<i64> {
    let t = x.trunc();
    if t.is_finite() && t >= i64::MIN as f64 && t < i64::MAX as f64 {
        Some(t as i64)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(v: Value) -> RawMeta {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn nulls_pages_and_nested_values() {
        let m = sanitize(&raw(json!({
            "city": null,
            "page": "not a page",
            "gallery": ["a.jpg", "b.jpg"],
            "geo": {"lat": -6.6},
            "rating": 4.5,
            "open": true,
            "source": "places.csv"
        })));
        assert!(!m.contains_key("city"));
        assert_eq!(m["page"], MetaValue::Int(0));
        assert_eq!(m["gallery"], MetaValue::from(r#"["a.jpg","b.jpg"]"#));
        assert_eq!(m["geo"], MetaValue::from(r#"{"lat":-6.6}"#));
        assert_eq!(m["rating"], MetaValue::Float(4.5));
        assert_eq!(m["open"], MetaValue::Bool(true));
        assert_eq!(m["source"], MetaValue::from("places.csv"));
    }

    #[test]
    fn page_coercion() {
        assert_eq!(coerce_page(&json!(7)), 7);
        assert_eq!(coerce_page(&json!(3.9)), 3);
        assert_eq!(coerce_page(&json!(" 12 ")), 12);
        assert_eq!(coerce_page(&json!(true)), 1);
        assert_eq!(coerce_page(&json!(1e300)), 0);
        assert_eq!(coerce_page(&json!(u64::MAX)), 0);
        assert_eq!(coerce_page(&json!([1])), 0);
    }
}
