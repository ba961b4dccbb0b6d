use crate::converter::{NamingPolicy, Resolver};
use crate::error::Result;
use crate::operations::{deep_merge, extract_operations, is_http_method, resolve_operation};
use crate::schema::{Schema, SchemaIndex};
use crate::types::TypeMap;
use indexmap::IndexMap;
use serde_json::{Map, Value, json};
use std::sync::Arc;

/// A Swagger 2.0 document under construction: metadata, named definitions
/// and path operations. One document owns one resolver, so every `$ref` it
/// emits points into its own `definitions` map.
pub struct SwaggerDocument {
    title: String,
    version: String,
    description: Option<String>,
    resolver: Resolver,
    paths: IndexMap<String, Map<String, Value>>,
}

impl SwaggerDocument {
    pub fn new(title: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            version: version.into(),
            description: None,
            resolver: Resolver::new(TypeMap::new(), SchemaIndex::new()),
            paths: IndexMap::new(),
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Install the naming policy consulted when an unregistered schema is
    /// met during resolution. Supplied once, at construction time.
    pub fn naming_policy(mut self, policy: NamingPolicy) -> Self {
        self.resolver.set_naming_policy(policy);
        self
    }

    /// The type mapping table for this document. Custom field kinds are
    /// registered here, typically once at startup.
    pub fn types_mut(&mut self) -> &mut TypeMap {
        self.resolver.types_mut()
    }

    /// Make a schema resolvable by name (for nested-by-name fields and
    /// dotted identifiers in documentation blocks) without registering a
    /// definition for it.
    pub fn register_schema(&mut self, schema: Arc<Schema>) {
        self.resolver.index_mut().insert(schema);
    }

    /// Register a named definition. The name is bound immediately; the
    /// body is generated lazily on first access, so definitions may be
    /// registered in any order, including mutually-referencing ones. The
    /// schema also becomes resolvable through the index.
    pub fn definition(&mut self, name: &str, schema: &Arc<Schema>) {
        self.resolver.index_mut().insert(schema.clone());
        self.resolver.add_definition(name, schema);
    }

    /// Add a path with caller-supplied operations and/or a handler
    /// documentation block.
    ///
    /// Both sources have their schema identifiers resolved against the
    /// current definitions. Doc-block operations deep-merge over the
    /// caller's with override semantics. Non-method keys are dropped unless
    /// `x-` prefixed. A failed resolution leaves the existing path entry
    /// untouched.
    pub fn add_path(
        &mut self,
        path: &str,
        operations: Option<Value>,
        doc_block: Option<&str>,
    ) -> Result<()> {
        let mut entry = self.paths.get(path).cloned().unwrap_or_default();

        if let Some(Value::Object(supplied)) = operations {
            for (key, value) in supplied {
                if is_http_method(&key) {
                    let resolved = resolve_operation(&mut self.resolver, value)?;
                    match entry.get_mut(&key) {
                        Some(existing) => deep_merge(existing, resolved),
                        None => {
                            entry.insert(key, resolved);
                        }
                    }
                } else if key.starts_with("x-") {
                    entry.insert(key, value);
                }
            }
        }

        if let Some(doc) = doc_block {
            let extracted = extract_operations(doc, &mut self.resolver)?;
            for (key, value) in extracted.operations {
                match entry.get_mut(&key) {
                    Some(existing) => deep_merge(existing, value),
                    None => {
                        entry.insert(key, value);
                    }
                }
            }
            entry.extend(extracted.extensions);
        }

        self.paths.insert(path.to_string(), entry);
        Ok(())
    }

    /// The generated definitions. Pending bodies are computed here, which
    /// is also where transitive auto-registration under a naming policy
    /// takes effect.
    pub fn definitions(&mut self) -> Result<&IndexMap<String, Value>> {
        self.resolver.ensure_generated()?;
        Ok(self.resolver.definitions())
    }

    pub fn paths(&self) -> &IndexMap<String, Map<String, Value>> {
        &self.paths
    }

    /// Assemble the full Swagger 2.0 document.
    pub fn to_value(&mut self) -> Result<Value> {
        self.resolver.ensure_generated()?;
        let mut info = Map::new();
        info.insert("title".to_string(), json!(self.title));
        info.insert("version".to_string(), json!(self.version));
        if let Some(description) = &self.description {
            info.insert("description".to_string(), json!(description));
        }

        let mut definitions = Map::new();
        for (name, body) in self.resolver.definitions() {
            definitions.insert(name.clone(), body.clone());
        }

        let mut paths = Map::new();
        for (path, entry) in &self.paths {
            paths.insert(path.clone(), Value::Object(entry.clone()));
        }

        Ok(json!({
            "swagger": "2.0",
            "info": info,
            "definitions": definitions,
            "paths": paths,
        }))
    }

    pub fn to_json(&mut self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.to_value()?)?)
    }

    pub fn to_yaml(&mut self) -> Result<String> {
        Ok(serde_yaml::to_string(&self.to_value()?)?)
    }
}
