use crate::converter::Resolver;
use crate::error::{ConversionError, Result};
use serde_json::{Map, Value, json};

/// Line that separates free-form handler documentation from the structured
/// operation block.
const DOC_DELIMITER: &str = "---";

const HTTP_METHODS: [&str; 7] = ["get", "put", "post", "delete", "options", "head", "patch"];

pub fn is_http_method(key: &str) -> bool {
    HTTP_METHODS.contains(&key)
}

/// Operations and path-level vendor extensions extracted from one handler's
/// documentation.
#[derive(Debug, Default)]
pub struct ExtractedDoc {
    pub operations: Map<String, Value>,
    pub extensions: Map<String, Value>,
}

/// Parse the structured annotation block out of handler documentation.
///
/// The block is everything after the first line consisting of the literal
/// delimiter, parsed as YAML. No delimiter means no block, which is not an
/// error.
pub fn parse_doc_block(doc: &str) -> Result<Option<Value>> {
    let mut lines = doc.lines();
    let found = lines.any(|line| line.trim() == DOC_DELIMITER);
    if !found {
        return Ok(None);
    }
    let block = dedent(lines.collect::<Vec<_>>());
    if block.trim().is_empty() {
        return Ok(None);
    }
    let yaml: serde_yaml::Value = serde_yaml::from_str(&block)?;
    Ok(Some(yaml_to_json(yaml)?))
}

/// Strip the indentation common to every non-blank line, so a block written
/// inside an indented doc comment parses as top-level YAML.
fn dedent(lines: Vec<&str>) -> String {
    let margin = lines
        .iter()
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.len() - line.trim_start().len())
        .min()
        .unwrap_or(0);
    lines
        .iter()
        .map(|line| line.get(margin..).unwrap_or(""))
        .collect::<Vec<_>>()
        .join("\n")
}

/// YAML to JSON, stringifying non-string mapping keys (`200:` becomes
/// `"200"`) so response codes survive the trip.
fn yaml_to_json(value: serde_yaml::Value) -> Result<Value> {
    Ok(match value {
        serde_yaml::Value::Null => Value::Null,
        serde_yaml::Value::Bool(b) => Value::Bool(b),
        serde_yaml::Value::Number(n) => serde_json::to_value(n)?,
        serde_yaml::Value::String(s) => Value::String(s),
        serde_yaml::Value::Sequence(seq) => {
            Value::Array(seq.into_iter().map(yaml_to_json).collect::<Result<_>>()?)
        }
        serde_yaml::Value::Mapping(mapping) => {
            let mut object = Map::new();
            for (key, value) in mapping {
                let key = match key {
                    serde_yaml::Value::String(s) => s,
                    serde_yaml::Value::Number(n) => n.to_string(),
                    serde_yaml::Value::Bool(b) => b.to_string(),
                    other => {
                        return Err(ConversionError::DocBlock(format!(
                            "unsupported mapping key: {other:?}"
                        )));
                    }
                };
                object.insert(key, yaml_to_json(value)?);
            }
            Value::Object(object)
        }
        serde_yaml::Value::Tagged(tagged) => yaml_to_json(tagged.value)?,
    })
}

/// Extract operations from handler documentation.
///
/// Top-level keys that are HTTP method names become operations with their
/// schema identifiers resolved; `x-` keys are preserved verbatim as
/// path-level extensions; anything else is non-operation annotation and is
/// dropped.
pub fn extract_operations(doc: &str, resolver: &mut Resolver) -> Result<ExtractedDoc> {
    let mut extracted = ExtractedDoc::default();
    let Some(Value::Object(block)) = parse_doc_block(doc)? else {
        return Ok(extracted);
    };

    for (key, value) in block {
        if is_http_method(&key) {
            let operation = resolve_operation(resolver, value)?;
            extracted.operations.insert(key, operation);
        } else if key.starts_with("x-") {
            extracted.extensions.insert(key, value);
        }
    }
    Ok(extracted)
}

/// Resolve every schema reference inside one operation object.
///
/// `responses.<code>.schema` values go through the resolver (registered
/// schemas become `$ref`s, everything else is substituted inline).
/// `parameters[].schema` entries naming a live schema are expanded per
/// their declared location: `body` keeps a single schema-carrying
/// parameter, anything else becomes one parameter per field.
pub fn resolve_operation(resolver: &mut Resolver, mut operation: Value) -> Result<Value> {
    let Some(object) = operation.as_object_mut() else {
        return Ok(operation);
    };

    if let Some(Value::Object(responses)) = object.get_mut("responses") {
        for (_, response) in responses.iter_mut() {
            if let Some(response) = response.as_object_mut() {
                if let Some(schema) = response.get("schema").cloned() {
                    let resolved = resolver.resolve_schema_value(&schema)?;
                    response.insert("schema".to_string(), resolved);
                }
            }
        }
    }

    if let Some(Value::Array(parameters)) = object.get("parameters").cloned() {
        let mut expanded = Vec::new();
        for parameter in parameters {
            match parameter {
                Value::Object(mut entry) if entry.contains_key("schema") => {
                    let schema = entry.remove("schema").unwrap_or(Value::Null);
                    let location = entry
                        .get("in")
                        .and_then(Value::as_str)
                        .unwrap_or("body")
                        .to_string();
                    if let Value::String(identifier) = &schema {
                        let target = resolver
                            .index()
                            .resolve(identifier)
                            .ok_or_else(|| ConversionError::UnknownSchema(identifier.clone()))?;
                        if let Value::Array(generated) =
                            resolver.schema_parameters(&target, &location)?
                        {
                            expanded.extend(generated);
                        }
                    } else {
                        entry.insert(
                            "schema".to_string(),
                            resolver.resolve_schema_value(&schema)?,
                        );
                        expanded.push(Value::Object(entry));
                    }
                }
                other => expanded.push(other),
            }
        }
        object.insert("parameters".to_string(), Value::Array(expanded));
    }

    Ok(operation)
}

/// Recursive merge with override semantics: objects merge key-by-key, any
/// other collision is won by the overlay.
pub fn deep_merge(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => deep_merge(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_delimiter_yields_no_block() {
        assert!(parse_doc_block("Nothing structured here.").unwrap().is_none());
    }

    #[test]
    fn indented_block_is_dedented_and_parsed() {
        let doc = "Summary line.\n\n    ---\n    get:\n        responses:\n            200:\n                description: ok\n";
        let block = parse_doc_block(doc).unwrap().unwrap();
        assert_eq!(block["get"]["responses"]["200"]["description"], json!("ok"));
    }

    #[test]
    fn multibyte_whitespace_line_survives_dedent() {
        // The U+00A0 line is blank after trimming, so it contributes
        // nothing to the margin, and the margin offset falls inside its
        // first character. Dedenting must treat it as empty, not panic.
        let doc = "Summary line.\n\n    ---\n    get:\n\u{a0}\n        responses:\n            200:\n                description: ok\n";
        let block = parse_doc_block(doc).unwrap().unwrap();
        assert_eq!(block["get"]["responses"]["200"]["description"], json!("ok"));
    }

    #[test]
    fn numeric_response_codes_become_string_keys() {
        let block = parse_doc_block("---\nget:\n  responses:\n    201:\n      description: created\n")
            .unwrap()
            .unwrap();
        assert!(block["get"]["responses"].as_object().unwrap().contains_key("201"));
    }

    #[test]
    fn deep_merge_overrides_scalars_and_unions_objects() {
        let mut base = json!({ "get": { "responses": { "200": { "description": "old" } } } });
        deep_merge(
            &mut base,
            json!({ "get": { "responses": { "200": { "description": "new" }, "404": {} } } }),
        );
        assert_eq!(base["get"]["responses"]["200"]["description"], json!("new"));
        assert!(base["get"]["responses"].as_object().unwrap().contains_key("404"));
    }
}
