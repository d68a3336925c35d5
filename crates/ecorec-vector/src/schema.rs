use arrow_schema::{DataType, Field, Schema, TimeUnit};
use std::sync::Arc;

/// Metadata keys stored as their own columns so filters on them can be pushed
/// down to the table scan.
pub const PROMOTED_COLUMNS: &[&str] = &["source", "page", "kind", "tags"];

pub fn build_units_schema(dim: usize) -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("id", DataType::Utf8, false),
        Field::new("source", DataType::Utf8, false),
        Field::new("page", DataType::Int64, false),
        Field::new("kind", DataType::Utf8, false),
        Field::new("tags", DataType::Utf8, false),
        Field::new("text", DataType::Utf8, false),
        Field::new("metadata", DataType::Utf8, false),
        Field::new("ingested_at", DataType::Timestamp(TimeUnit::Millisecond, None), false),
        Field::new(
            "vector",
            DataType::FixedSizeList(
                Arc::new(Field::new("item", DataType::Float32, true)),
                vector_width(dim),
            ),
            true,
        ),
    ]))
}

/// Dimension of the `vector` column, if the schema has one.
pub fn vector_dim(schema: &Schema) -> Option<usize> {
    match schema.field_with_name("vector").ok()?.data_type() {
        DataType::FixedSizeList(_, n) => usize::try_from(*n).ok(),
        _ => None,
    }
}

pub(crate) fn vector_width(dim: usize) -> i32 {
    i32::try_from(dim).unwrap_or(i32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dimension_round_trips_through_schema() {
        assert_eq!(vector_dim(&build_units_schema(768)), Some(768));
        assert!(PROMOTED_COLUMNS.iter().all(|c| build_units_schema(4).field_with_name(c).is_ok()));
    }
}
