use thiserror::Error;

pub type Result<T> = std::result::Result<T, ConversionError>;

#[derive(Error, Debug)]
pub enum ConversionError {
    #[error("Failed to parse manifest: {0}")]
    ParseError(String),

    #[error("Ambiguous custom-type registration for `{0}`: format required when matching by literal type")]
    AmbiguousTypeMapping(String),

    #[error("Unknown schema identifier: {0}")]
    UnknownSchema(String),

    #[error("Definition name `{0}` is already bound to a different schema")]
    DuplicateDefinition(String),

    #[error("Cannot inline self-referential schema `{0}` without a naming policy")]
    UnnamedCycle(String),

    #[error("Invalid documentation block: {0}")]
    DocBlock(String),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
