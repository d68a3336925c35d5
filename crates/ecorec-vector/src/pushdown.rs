use ecorec_core::filter::MetaFilter;
use ecorec_core::types::MetaValue;

/// Renders the filter as a SQL predicate over the promoted columns. Returns
/// `None` when any clause touches a field that only lives in the metadata
/// JSON, or compares a column against a value of the wrong type.
pub fn to_sql(filter: &MetaFilter) -> Option<String> {
    match filter {
        MetaFilter::Eq { field, value } => eq_sql(field, value),
        MetaFilter::And(clauses) => join(clauses, "AND", "true"),
        MetaFilter::Or(clauses) => join(clauses, "OR", "false"),
    }
}

/// `source = '...'` with quotes escaped.
pub fn source_predicate(name: &str) -> String {
    format!("source = {}", quote(name))
}

fn join(clauses: &[MetaFilter], op: &str, empty: &str) -> Option<String> {
    if clauses.is_empty() {
        return Some(empty.to_string());
    }
    let parts = clauses
        .iter()
        .map(|c| to_sql(c).map(|s| format!("({s})")))
        .collect::<Option<Vec<_>>>()?;
    Some(parts.join(&format!(" {op} ")))
}

fn eq_sql(field: &str, value: &MetaValue) -> Option<String> {
    match (field, value) {
        ("source" | "kind" | "tags", MetaValue::Str(s)) => Some(format!("{field} = {}", quote(s))),
        ("page", MetaValue::Int(i)) => Some(format!("page = {i}")),
        ("page", MetaValue::Float(x)) if x.fract() == 0.0 && x.is_finite() => {
            Some(format!("page = {}", *x as i64))
        }
        _ => None,
    }
}

fn quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn promoted_fields_render_as_sql() {
        let f = MetaFilter::And(vec![
            MetaFilter::eq("source", "O'Hara.pdf"),
            MetaFilter::eq("page", 3i64),
        ]);
        assert_eq!(to_sql(&f).as_deref(), Some("(source = 'O''Hara.pdf') AND (page = 3)"));
        let f = MetaFilter::Or(vec![MetaFilter::eq("tags", "a"), MetaFilter::eq("kind", "atomic")]);
        assert_eq!(to_sql(&f).as_deref(), Some("(tags = 'a') OR (kind = 'atomic')"));
    }

    #[test]
    fn other_fields_are_not_pushed_down() {
        let f = MetaFilter::And(vec![
            MetaFilter::eq("source", "a.csv"),
            MetaFilter::eq("city", "Bogor"),
        ]);
        assert_eq!(to_sql(&f), None);
        assert_eq!(to_sql(&MetaFilter::eq("page", "3")), None);
    }
}
