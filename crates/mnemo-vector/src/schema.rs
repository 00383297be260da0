//! Arrow schema for the chunk collection.
//!
//! The vector column is a fixed-size list whose length is the collection's
//! established dimensionality; it is a parameter here, never a constant,
//! because different backends produce different widths.

use arrow_schema::{DataType, Field, Schema};
use std::sync::Arc;

pub fn build_chunk_schema(dim: i32) -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("id", DataType::Utf8, false),
        Field::new("text", DataType::Utf8, false),
        Field::new("source", DataType::Utf8, false),
        Field::new("file_type", DataType::Utf8, false),
        Field::new("topic", DataType::Utf8, false),
        Field::new("subtopic", DataType::Utf8, false),
        Field::new("chunk_index", DataType::Int32, false),
        Field::new("total_chunks", DataType::Int32, false),
        // Monotonic insertion sequence; breaks equal-distance ties in
        // query results so ranking stays deterministic across runs.
        Field::new("seq", DataType::Int64, false),
        Field::new(
            "vector",
            DataType::FixedSizeList(Arc::new(Field::new("item", DataType::Float32, true)), dim),
            true,
        ),
    ]))
}
