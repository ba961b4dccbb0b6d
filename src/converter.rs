use crate::error::{ConversionError, Result};
use crate::schema::{Field, FieldKind, Nested, Schema, SchemaIndex};
use crate::types::TypeMap;
use indexmap::IndexMap;
use serde_json::{Map, Value, json};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

/// Decides the definition name for a schema met during resolution.
/// Returning `None` means "do not auto-register, inline instead".
pub type NamingPolicy = Box<dyn Fn(&Schema) -> Option<String>>;

/// The stock naming policy: register every schema under the PascalCase
/// form of its own type name.
pub fn pascal_case_policy() -> NamingPolicy {
    use convert_case::{Case, Casing};
    Box::new(|schema: &Schema| Some(schema.name.to_case(Case::Pascal)))
}

/// Converts schemas to JSON-Schema fragments while tracking a registry of
/// named definitions.
///
/// The resolver owns every piece of reference state for one document build:
/// the `definitions` map, the schema-identity-to-name memo that breaks
/// cycles, and the optional naming policy. Independent builds use
/// independent resolvers and never interfere.
pub struct Resolver {
    definitions: IndexMap<String, Value>,
    /// Explicitly registered definitions whose bodies are not generated
    /// yet. Binding every name before generating any body is what lets two
    /// explicitly registered schemas reference each other.
    pending: VecDeque<(String, Arc<Schema>)>,
    /// Arc pointer identity -> registered definition name.
    schema_names: HashMap<usize, String>,
    /// Identities currently being inlined, to fail unnamed cycles instead
    /// of recursing forever.
    in_progress: HashSet<usize>,
    naming: Option<NamingPolicy>,
    types: TypeMap,
    index: SchemaIndex,
}

fn identity(schema: &Arc<Schema>) -> usize {
    Arc::as_ptr(schema) as usize
}

fn reference(name: &str) -> Value {
    json!({ "$ref": format!("#/definitions/{name}") })
}

/// Normalize a vendor-extension key: lowercase, underscores to hyphens,
/// `x-` prefix enforced unless already present.
fn extension_key(key: &str) -> String {
    let key = key.to_ascii_lowercase().replace('_', "-");
    if key.starts_with("x-") {
        key
    } else {
        format!("x-{key}")
    }
}

impl Resolver {
    pub fn new(types: TypeMap, index: SchemaIndex) -> Self {
        Self {
            definitions: IndexMap::new(),
            pending: VecDeque::new(),
            schema_names: HashMap::new(),
            in_progress: HashSet::new(),
            naming: None,
            types,
            index,
        }
    }

    pub fn with_naming_policy(mut self, policy: NamingPolicy) -> Self {
        self.naming = Some(policy);
        self
    }

    pub fn set_naming_policy(&mut self, policy: NamingPolicy) {
        self.naming = Some(policy);
    }

    pub fn types_mut(&mut self) -> &mut TypeMap {
        &mut self.types
    }

    pub fn index_mut(&mut self) -> &mut SchemaIndex {
        &mut self.index
    }

    pub fn definitions(&self) -> &IndexMap<String, Value> {
        &self.definitions
    }

    pub fn index(&self) -> &SchemaIndex {
        &self.index
    }

    /// Register `schema` under `name`. The body is generated lazily, on the
    /// first call to [`ensure_generated`](Self::ensure_generated); the name
    /// is bound to the schema's identity immediately, so any schema
    /// converted afterwards (including this one's own fields) resolves it
    /// to a `$ref` instead of re-entering conversion.
    pub fn add_definition(&mut self, name: &str, schema: &Arc<Schema>) {
        let key = identity(schema);
        if self.definitions.contains_key(name)
            && self.schema_names.get(&key).map(String::as_str) == Some(name)
        {
            // Already registered; the generated body is cached for good.
            return;
        }
        self.schema_names.insert(key, name.to_string());
        self.definitions.insert(name.to_string(), Value::Null);
        self.pending.push_back((name.to_string(), schema.clone()));
    }

    /// Generate the bodies of all pending definitions.
    ///
    /// A failed conversion removes its own reservation (name binding and
    /// placeholder) before the error propagates; definitions still queued
    /// stay pending and are retried on the next call.
    pub fn ensure_generated(&mut self) -> Result<()> {
        while let Some((name, schema)) = self.pending.pop_front() {
            match self.schema_object(&schema) {
                Ok(body) => {
                    self.definitions.insert(name, body);
                }
                Err(err) => {
                    self.definitions.shift_remove(&name);
                    self.schema_names.remove(&identity(&schema));
                    return Err(err);
                }
            }
        }
        Ok(())
    }

    /// Convert a whole schema into a JSON-Schema object. Fields are emitted
    /// in declaration order; write-only fields are excluded. The schema is
    /// never mutated, so repeated conversion is idempotent.
    pub fn schema_object(&mut self, schema: &Arc<Schema>) -> Result<Value> {
        let mut properties = Map::new();
        let mut required = Vec::new();

        for field in &schema.fields {
            if field.write_only {
                continue;
            }
            properties.insert(field.name.clone(), self.field_property(field, schema)?);
            if field.required {
                required.push(Value::String(field.name.clone()));
            }
        }

        let mut object = Map::new();
        object.insert("type".to_string(), json!("object"));
        object.insert("properties".to_string(), Value::Object(properties));
        if !required.is_empty() {
            object.insert("required".to_string(), Value::Array(required));
        }
        Ok(Value::Object(object))
    }

    /// Convert one field into a JSON-Schema property fragment.
    ///
    /// Nested fields yield the resolver's verdict (inline object or `$ref`)
    /// untouched: a reference is an opaque pointer and must not grow
    /// metadata. Plain fields carry description, default and normalized
    /// vendor extensions.
    pub fn field_property(&mut self, field: &Field, current: &Arc<Schema>) -> Result<Value> {
        if let Some(nested) = &field.nested {
            let resolved = match nested {
                Nested::Ref(pointer) => json!({ "$ref": pointer }),
                Nested::Schema(target) => {
                    let target = target.clone();
                    self.resolve_nested(&target)?
                }
                Nested::Name(name) => {
                    let target = self
                        .index
                        .resolve(name)
                        .ok_or_else(|| ConversionError::UnknownSchema(name.clone()))?;
                    self.resolve_nested(&target)?
                }
                Nested::SelfRef => {
                    let target = current.clone();
                    self.resolve_nested(&target)?
                }
            };
            return Ok(if field.many {
                json!({ "type": "array", "items": resolved })
            } else {
                resolved
            });
        }

        let mut fragment = self.plain_property(&field.kind);
        if let Some(description) = &field.description {
            fragment.insert("description".to_string(), json!(description));
        }
        if let Some(default) = &field.default {
            fragment.insert("default".to_string(), default.resolve());
        }
        for (key, value) in &field.metadata {
            fragment.insert(extension_key(key), value.clone());
        }
        Ok(Value::Object(fragment))
    }

    fn plain_property(&self, kind: &FieldKind) -> Map<String, Value> {
        let mut fragment = Map::new();
        if let FieldKind::List(inner) = kind {
            fragment.insert("type".to_string(), json!("array"));
            fragment.insert(
                "items".to_string(),
                Value::Object(self.plain_property(inner)),
            );
            return fragment;
        }
        let (schema_type, format) = self.types.lookup(kind);
        fragment.insert("type".to_string(), json!(schema_type));
        if let Some(format) = format {
            fragment.insert("format".to_string(), json!(format));
        }
        fragment
    }

    /// Decide between a `$ref` and an inline object for a nested schema.
    ///
    /// 1. Already registered (by identity): `$ref`. This is the cycle
    ///    breaker, because names are bound before bodies are converted.
    /// 2. Naming policy yields a name: reserve it, convert the body, fill
    ///    the reservation, return a `$ref`. A failed conversion removes the
    ///    reservation before propagating. A name already held by a
    ///    different schema is a collision error, never an overwrite.
    /// 3. Otherwise inline the full object schema, registering nothing.
    pub fn resolve_nested(&mut self, schema: &Arc<Schema>) -> Result<Value> {
        let key = identity(schema);
        if let Some(name) = self.schema_names.get(&key) {
            return Ok(reference(name));
        }

        let assigned = self.naming.as_ref().and_then(|policy| policy(schema));
        if let Some(name) = assigned {
            // The identity check above already handled this schema's own
            // name; an existing entry here belongs to a different schema,
            // and overwriting it would retarget every ref emitted so far.
            if self.definitions.contains_key(&name) {
                return Err(ConversionError::DuplicateDefinition(name));
            }
            self.schema_names.insert(key, name.clone());
            self.definitions.insert(name.clone(), Value::Null);
            return match self.schema_object(schema) {
                Ok(body) => {
                    self.definitions.insert(name.clone(), body);
                    Ok(reference(&name))
                }
                Err(err) => {
                    self.definitions.shift_remove(&name);
                    self.schema_names.remove(&key);
                    Err(err)
                }
            };
        }

        if !self.in_progress.insert(key) {
            return Err(ConversionError::UnnamedCycle(schema.name.clone()));
        }
        let result = self.schema_object(schema);
        self.in_progress.remove(&key);
        result
    }

    /// Convert a schema into a Swagger parameter list.
    ///
    /// `body` yields one parameter carrying the resolved schema; any other
    /// location yields one parameter per (non-write-only) field.
    pub fn schema_parameters(&mut self, schema: &Arc<Schema>, default_in: &str) -> Result<Value> {
        if default_in == "body" {
            let required = schema.fields.iter().any(|field| field.required);
            let resolved = self.resolve_nested(schema)?;
            return Ok(json!([{
                "in": "body",
                "name": "body",
                "required": required,
                "schema": resolved,
            }]));
        }

        let mut parameters = Vec::new();
        for field in &schema.fields {
            if field.write_only {
                continue;
            }
            let property = self.field_property(field, schema)?;
            let mut parameter = Map::new();
            parameter.insert("in".to_string(), json!(default_in));
            parameter.insert("name".to_string(), json!(field.name));
            parameter.insert("required".to_string(), json!(field.required));
            if let Value::Object(fragment) = property {
                for (key, value) in fragment {
                    parameter.entry(key).or_insert(value);
                }
            }
            parameters.push(Value::Object(parameter));
        }
        Ok(Value::Array(parameters))
    }

    /// Resolve a `schema` value found in an operation object.
    ///
    /// Accepts an inline schema mapping (passed through, `$ref` verbatim),
    /// a dotted identifier string, or `{type: array, items: <identifier>}`.
    /// Identifiers failing index lookup are an error; silently emitting an
    /// unresolved reference would produce an invalid document.
    pub fn resolve_schema_value(&mut self, value: &Value) -> Result<Value> {
        match value {
            Value::String(identifier) => {
                let target = self
                    .index
                    .resolve(identifier)
                    .ok_or_else(|| ConversionError::UnknownSchema(identifier.clone()))?;
                self.resolve_nested(&target)
            }
            Value::Object(object) => {
                if object.contains_key("$ref") {
                    return Ok(value.clone());
                }
                if object.get("type") == Some(&json!("array")) {
                    if let Some(items) = object.get("items") {
                        let mut resolved = object.clone();
                        resolved.insert("items".to_string(), self.resolve_schema_value(items)?);
                        return Ok(Value::Object(resolved));
                    }
                }
                Ok(value.clone())
            }
            other => Ok(other.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Field;

    fn sample_pair() -> (Arc<Schema>, SchemaIndex) {
        let node = Schema::new("Node")
            .field(Field::new("id", FieldKind::Integer))
            .field(Field::nested("next", Nested::Name("Node".to_string())))
            .into_shared();
        let mut index = SchemaIndex::new();
        index.insert(node.clone());
        (node, index)
    }

    #[test]
    fn name_is_bound_before_body_conversion() {
        let (node, index) = sample_pair();
        let mut resolver = Resolver::new(TypeMap::new(), index);
        resolver.add_definition("Node", &node);
        resolver.ensure_generated().unwrap();

        // Re-entering Node mid-conversion found the reserved name.
        let next = &resolver.definitions()["Node"]["properties"]["next"];
        assert_eq!(next, &json!({ "$ref": "#/definitions/Node" }));
    }

    #[test]
    fn failed_definition_leaves_no_placeholder() {
        let broken = Schema::new("Broken")
            .field(Field::nested("ghost", Nested::Name("Missing".to_string())))
            .into_shared();
        let mut resolver = Resolver::new(TypeMap::new(), SchemaIndex::new());

        resolver.add_definition("Broken", &broken);
        let err = resolver.ensure_generated().unwrap_err();
        assert!(matches!(err, ConversionError::UnknownSchema(_)));
        assert!(resolver.definitions().is_empty());

        // The identity binding was rolled back too: a later resolve of the
        // same schema must not emit a ref to a definition that is not there.
        let err = resolver.resolve_nested(&broken).unwrap_err();
        assert!(matches!(err, ConversionError::UnknownSchema(_)));
        assert!(resolver.definitions().is_empty());
    }

    #[test]
    fn explicitly_registered_cycle_resolves_both_ways() {
        let sample = Schema::new("Sample")
            .field(Field::nested("run", Nested::Name("Run".to_string())))
            .into_shared();
        let run = Schema::new("Run")
            .field(Field::nested("sample", Nested::Name("Sample".to_string())))
            .into_shared();
        let mut index = SchemaIndex::new();
        index.insert(sample.clone());
        index.insert(run.clone());

        let mut resolver = Resolver::new(TypeMap::new(), index);
        resolver.add_definition("Sample", &sample);
        resolver.add_definition("Run", &run);
        resolver.ensure_generated().unwrap();

        assert_eq!(
            resolver.definitions()["Sample"]["properties"]["run"],
            json!({ "$ref": "#/definitions/Run" })
        );
        assert_eq!(
            resolver.definitions()["Run"]["properties"]["sample"],
            json!({ "$ref": "#/definitions/Sample" })
        );
    }

    #[test]
    fn policy_name_collision_does_not_overwrite_existing_definition() {
        let first = Schema::new("Widget")
            .field(Field::new("id", FieldKind::Integer))
            .into_shared();
        let second = Schema::new("Widget")
            .field(Field::new("label", FieldKind::String))
            .into_shared();

        let mut resolver = Resolver::new(TypeMap::new(), SchemaIndex::new())
            .with_naming_policy(Box::new(|schema| Some(schema.name.clone())));

        assert_eq!(
            resolver.resolve_nested(&first).unwrap(),
            json!({ "$ref": "#/definitions/Widget" })
        );

        let err = resolver.resolve_nested(&second).unwrap_err();
        assert!(matches!(err, ConversionError::DuplicateDefinition(_)));

        // The first schema's body is intact and its refs still point at it.
        assert!(resolver.definitions()["Widget"]["properties"]
            .as_object()
            .unwrap()
            .contains_key("id"));
        assert_eq!(
            resolver.resolve_nested(&first).unwrap(),
            json!({ "$ref": "#/definitions/Widget" })
        );
    }

    #[test]
    fn unnamed_cycle_is_an_error_not_a_hang() {
        let (node, index) = sample_pair();
        let mut resolver = Resolver::new(TypeMap::new(), index);

        let err = resolver.resolve_nested(&node).unwrap_err();
        assert!(matches!(err, ConversionError::UnnamedCycle(_)));
        assert!(resolver.definitions().is_empty());
    }

    #[test]
    fn extension_keys_are_normalized() {
        assert_eq!(extension_key("count"), "x-count");
        assert_eq!(extension_key("x_count2"), "x-count2");
        assert_eq!(extension_key("X-Rate"), "x-rate");
        assert_eq!(extension_key("Page_Size"), "x-page-size");
    }
}
