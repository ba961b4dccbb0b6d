use crate::error::{ConversionError, Result};
use crate::schema::FieldKind;

/// A Swagger `(type, format)` pair.
pub type TypePair = (String, Option<String>);

/// What a custom field kind should be matched against when registering it.
#[derive(Debug, Clone)]
pub enum TypeMatch {
    /// Inherit the mapping of an existing field kind.
    Field(FieldKind),
    /// Map to a literal Swagger type/format pair. The format is mandatory
    /// here: a bare type string is ambiguous and rejected at registration.
    Literal {
        schema_type: String,
        format: Option<String>,
    },
}

/// Maps field kinds to Swagger `(type, format)` pairs.
///
/// Custom registrations are consulted before the built-in table, and a
/// `Custom` kind falls back along its `base` chain, so the most-derived
/// registration wins. The table is plain per-document state; a fresh
/// `TypeMap::default()` is fully isolated from any other.
#[derive(Debug, Clone, Default)]
pub struct TypeMap {
    custom: Vec<(String, TypePair)>,
}

impl TypeMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a mapping for the custom kind named `custom_name`.
    ///
    /// Fails with [`ConversionError::AmbiguousTypeMapping`] when matching by
    /// a literal type without a format. This is a caller configuration
    /// error surfaced at registration time, never at conversion time.
    pub fn register(&mut self, custom_name: &str, target: TypeMatch) -> Result<()> {
        let pair = match target {
            TypeMatch::Field(kind) => self.lookup(&kind),
            TypeMatch::Literal {
                schema_type,
                format: Some(format),
            } => (schema_type, Some(format)),
            TypeMatch::Literal { format: None, .. } => {
                return Err(ConversionError::AmbiguousTypeMapping(
                    custom_name.to_string(),
                ));
            }
        };
        self.custom.push((custom_name.to_string(), pair));
        Ok(())
    }

    /// Resolve a field kind to its `(type, format)` pair. Custom names are
    /// checked latest-registration-first, then the `base` chain, then the
    /// built-in table.
    pub fn lookup(&self, kind: &FieldKind) -> TypePair {
        match kind {
            FieldKind::Custom { name, base } => self
                .custom
                .iter()
                .rev()
                .find(|(registered, _)| registered == name)
                .map(|(_, pair)| pair.clone())
                .unwrap_or_else(|| self.lookup(base)),
            kind => Self::builtin(kind),
        }
    }

    fn builtin(kind: &FieldKind) -> TypePair {
        let (schema_type, format) = match kind {
            FieldKind::String => ("string", None),
            FieldKind::Integer => ("integer", Some("int32")),
            FieldKind::Number => ("number", None),
            FieldKind::Boolean => ("boolean", None),
            FieldKind::Uuid => ("string", Some("uuid")),
            FieldKind::Date => ("string", Some("date")),
            FieldKind::DateTime => ("string", Some("date-time")),
            FieldKind::Url => ("string", Some("url")),
            FieldKind::Email => ("string", Some("email")),
            FieldKind::Dict => ("object", None),
            FieldKind::Raw => ("string", None),
            FieldKind::List(_) => ("array", None),
            FieldKind::Custom { .. } => unreachable!("handled by lookup"),
        };
        (schema_type.to_string(), format.map(str::to_string))
    }
}
