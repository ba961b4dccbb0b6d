pub mod converter;
pub mod document;
pub mod error;
pub mod operations;
pub mod schema;
pub mod types;

pub use converter::{NamingPolicy, Resolver, pascal_case_policy};
pub use document::SwaggerDocument;
pub use error::{ConversionError, Result};
pub use schema::{DefaultValue, Field, FieldKind, Nested, Schema, SchemaIndex};
pub use types::{TypeMap, TypeMatch};

use serde_json::Value;
use std::sync::Arc;

/// Convert a schema into a JSON-Schema object, outside of any document.
pub fn schema_to_jsonschema(schema: &Arc<Schema>) -> Result<Value> {
    let mut resolver = Resolver::new(TypeMap::new(), SchemaIndex::new());
    resolver.schema_object(schema)
}

/// Convert a schema into a Swagger parameter list for the given location
/// (`"body"` yields a single schema-carrying parameter, anything else one
/// parameter per field).
pub fn schema_to_parameters(schema: &Arc<Schema>, default_in: &str) -> Result<Value> {
    let mut resolver = Resolver::new(TypeMap::new(), SchemaIndex::new());
    resolver.schema_parameters(schema, default_in)
}
