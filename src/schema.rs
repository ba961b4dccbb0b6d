use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Semantic type of a field, before mapping to a Swagger (type, format) pair.
///
/// `Custom` carries the chain of base kinds so lookups can walk the hierarchy
/// most-derived first (see [`crate::types::TypeMap::lookup`]).
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    String,
    Integer,
    Number,
    Boolean,
    Uuid,
    Date,
    DateTime,
    Url,
    Email,
    Dict,
    Raw,
    List(Box<FieldKind>),
    Custom {
        name: String,
        base: Box<FieldKind>,
    },
}

impl FieldKind {
    /// A user-defined kind falling back to `base` when unregistered.
    pub fn custom(name: impl Into<String>, base: FieldKind) -> Self {
        FieldKind::Custom {
            name: name.into(),
            base: Box::new(base),
        }
    }
}

impl Default for FieldKind {
    fn default() -> Self {
        FieldKind::Raw
    }
}

/// A field default: either a literal value or a zero-argument producer
/// invoked at conversion time.
#[derive(Clone)]
pub enum DefaultValue {
    Literal(Value),
    Producer(fn() -> Value),
}

impl DefaultValue {
    pub fn resolve(&self) -> Value {
        match self {
            DefaultValue::Literal(value) => value.clone(),
            DefaultValue::Producer(producer) => producer(),
        }
    }
}

impl fmt::Debug for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefaultValue::Literal(value) => write!(f, "Literal({value})"),
            DefaultValue::Producer(_) => write!(f, "Producer(..)"),
        }
    }
}

// Manifests can only express literal defaults; producers are code-level.
impl<'de> Deserialize<'de> for DefaultValue {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        Ok(DefaultValue::Literal(Value::deserialize(deserializer)?))
    }
}

/// What a nested field points at.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Nested {
    /// A schema held directly.
    Schema(Arc<Schema>),
    /// A schema looked up by name through the [`SchemaIndex`]. Lazy lookup
    /// is what makes mutually-circular schema graphs constructible.
    Name(String),
    /// The enclosing schema itself.
    #[serde(rename = "self")]
    SelfRef,
    /// An explicit reference pointer, passed through verbatim.
    Ref(String),
}

/// One field of a schema: name, semantic type, flags and metadata.
#[derive(Debug, Clone, Deserialize)]
pub struct Field {
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: FieldKind,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub write_only: bool,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub default: Option<DefaultValue>,
    /// Vendor-extension metadata. Keys are normalized to `x-` prefixed
    /// kebab-case on output regardless of the declared naming convention.
    #[serde(default)]
    pub metadata: IndexMap<String, Value>,
    #[serde(default)]
    pub nested: Option<Nested>,
    /// Collection cardinality: wraps the nested result as an array.
    #[serde(default)]
    pub many: bool,
}

impl Field {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            required: false,
            write_only: false,
            description: None,
            default: None,
            metadata: IndexMap::new(),
            nested: None,
            many: false,
        }
    }

    /// A field wrapping another schema.
    pub fn nested(name: impl Into<String>, nested: Nested) -> Self {
        Self {
            nested: Some(nested),
            ..Self::new(name, FieldKind::Raw)
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn write_only(mut self) -> Self {
        self.write_only = true;
        self
    }

    pub fn many(mut self) -> Self {
        self.many = true;
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn default_value(mut self, value: Value) -> Self {
        self.default = Some(DefaultValue::Literal(value));
        self
    }

    pub fn default_producer(mut self, producer: fn() -> Value) -> Self {
        self.default = Some(DefaultValue::Producer(producer));
        self
    }

    pub fn meta(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

/// A declarative data-model schema: a type name plus its fields in
/// declaration order. Shared as `Arc<Schema>`; the `Arc` pointer identity is
/// the memoization key used by the reference resolver, so a schema must be
/// built once and cloned by handle, never rebuilt per use.
#[derive(Debug, Clone, Deserialize)]
pub struct Schema {
    pub name: String,
    pub fields: Vec<Field>,
}

impl Schema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    pub fn field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    pub fn into_shared(self) -> Arc<Schema> {
        Arc::new(self)
    }
}

/// Name-to-schema lookup used for nested-by-name fields and for dotted
/// identifiers found in documentation blocks (`tests.schemas.PetSchema`
/// resolves by its last segment).
#[derive(Debug, Clone, Default)]
pub struct SchemaIndex {
    by_name: HashMap<String, Arc<Schema>>,
}

impl SchemaIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a schema under its own type name.
    pub fn insert(&mut self, schema: Arc<Schema>) {
        self.by_name.insert(schema.name.clone(), schema);
    }

    pub fn resolve(&self, path: &str) -> Option<Arc<Schema>> {
        if let Some(schema) = self.by_name.get(path) {
            return Some(schema.clone());
        }
        let tail = path.rsplit('.').next()?;
        self.by_name.get(tail).cloned()
    }
}
