//! Metadata filters for similarity queries.
//!
//! Callers usually pass a flat `{field: value}` map. It is normalized into an
//! `$and` of `$eq` clauses; maps already written with `$and`/`$or`/`$eq`
//! operators are parsed as-is. An empty map normalizes to no filter at all.

use crate::error::{Error, Result};
use crate::types::{MetaValue, Metadata, RawMeta};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum MetaFilter {
    Eq { field: String, value: MetaValue },
    And(Vec<MetaFilter>),
    Or(Vec<MetaFilter>),
}

impl MetaFilter {
    pub fn eq(field: impl Into<String>, value: impl Into<MetaValue>) -> Self {
        MetaFilter::Eq { field: field.into(), value: value.into() }
    }

    /// Normalizes a JSON filter map. Returns `Ok(None)` for an empty map.
    pub fn from_json(map: &RawMeta) -> Result<Option<Self>> {
        if map.is_empty() {
            return Ok(None);
        }
        if map.keys().any(|k| k.starts_with('$')) {
            return parse_operator_map(map).map(Some);
        }
        let mut clauses = Vec::with_capacity(map.len());
        for (field, value) in map {
            clauses.push(parse_field_clause(field, value)?);
        }
        Ok(Some(MetaFilter::And(clauses)))
    }

    /// Evaluates the filter against sanitized metadata.
    pub fn matches(&self, meta: &Metadata) -> bool {
        match self {
            MetaFilter::Eq { field, value } => {
                meta.get(field).is_some_and(|v| values_equal(v, value))
            }
            MetaFilter::And(clauses) => clauses.iter().all(|c| c.matches(meta)),
            MetaFilter::Or(clauses) => clauses.iter().any(|c| c.matches(meta)),
        }
    }

    /// Every field name referenced anywhere in the filter.
    pub fn fields(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_fields(&mut out);
        out
    }

    fn collect_fields<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            MetaFilter::Eq { field, .. } => out.push(field),
            MetaFilter::And(clauses) | MetaFilter::Or(clauses) => {
                for c in clauses {
                    c.collect_fields(out);
                }
            }
        }
    }
}

fn values_equal(a: &MetaValue, b: &MetaValue) -> bool {
    match (a, b) {
        (MetaValue::Int(x), MetaValue::Float(y)) | (MetaValue::Float(y), MetaValue::Int(x)) => {
            (*x as f64 - y).abs() < f64::EPSILON
        }
        _ => a == b,
    }
}

fn parse_operator_map(map: &RawMeta) -> Result<MetaFilter> {
    let mut parts = Vec::new();
    for (key, value) in map {
        let part = match key.as_str() {
            "$and" => MetaFilter::And(parse_clause_list(key, value)?),
            "$or" => MetaFilter::Or(parse_clause_list(key, value)?),
            op if op.starts_with('$') => {
                return Err(Error::InvalidConfig(format!("unsupported filter operator '{op}'")));
            }
            field => parse_field_clause(field, value)?,
        };
        parts.push(part);
    }
    if parts.len() == 1 {
        Ok(parts.remove(0))
    } else {
        Ok(MetaFilter::And(parts))
    }
}

fn parse_clause_list(op: &str, value: &Value) -> Result<Vec<MetaFilter>> {
    let items = value
        .as_array()
        .ok_or_else(|| Error::InvalidConfig(format!("'{op}' expects an array of clauses")))?;
    items
        .iter()
        .map(|item| {
            item.as_object()
                .ok_or_else(|| Error::InvalidConfig(format!("'{op}' clauses must be objects")))
                .and_then(parse_operator_map)
        })
        .collect()
}

fn parse_field_clause(field: &str, value: &Value) -> Result<MetaFilter> {
    let scalar = match value {
        Value::Object(inner) => {
            let eq = inner
                .get("$eq")
                .filter(|_| inner.len() == 1)
                .ok_or_else(|| {
                    Error::InvalidConfig(format!("field '{field}' only supports '$eq'"))
                })?;
            MetaValue::from_json_scalar(eq)
        }
        other => MetaValue::from_json_scalar(other),
    };
    let value = scalar.ok_or_else(|| {
        Error::InvalidConfig(format!("field '{field}' must compare against a scalar"))
    })?;
    Ok(MetaFilter::Eq { field: field.to_string(), value })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(v: Value) -> RawMeta {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn empty_filter_is_omitted() {
        assert_eq!(MetaFilter::from_json(&RawMeta::new()).unwrap(), None);
    }

    #[test]
    fn flat_map_becomes_and_of_eq() {
        let f =
            MetaFilter::from_json(&raw(json!({"source": "a.pdf", "page": 2}))).unwrap().unwrap();
        assert_eq!(
            f,
            MetaFilter::And(vec![MetaFilter::eq("page", 2i64), MetaFilter::eq("source", "a.pdf")])
        );
    }

    #[test]
    fn operator_form_is_kept() {
        let f = MetaFilter::from_json(&raw(json!({"$or": [{"tags": {"$eq": "x"}}, {"tags": "y"}]})))
            .unwrap()
            .unwrap();
        assert_eq!(
            f,
            MetaFilter::Or(vec![MetaFilter::eq("tags", "x"), MetaFilter::eq("tags", "y")])
        );
        assert_eq!(f.fields(), vec!["tags", "tags"]);
    }

    #[test]
    fn unsupported_operators_are_rejected() {
        assert!(MetaFilter::from_json(&raw(json!({"$not": []}))).is_err());
        assert!(MetaFilter::from_json(&raw(json!({"rating": {"$gt": 3}}))).is_err());
        assert!(MetaFilter::from_json(&raw(json!({"rating": null}))).is_err());
    }

    #[test]
    fn matches_compares_ints_and_floats() {
        let meta: Metadata = [
            ("rating".to_string(), MetaValue::Float(4.0)),
            ("city".to_string(), MetaValue::from("Bogor")),
        ]
        .into_iter()
        .collect();
        assert!(MetaFilter::eq("rating", 4i64).matches(&meta));
        assert!(MetaFilter::And(vec![MetaFilter::eq("city", "Bogor")]).matches(&meta));
        assert!(!MetaFilter::eq("city", "Bandung").matches(&meta));
        assert!(!MetaFilter::eq("missing", "x").matches(&meta));
    }
}
