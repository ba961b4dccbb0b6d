use clap::Parser;
use schema_to_swagger::{ConversionError, Schema, SwaggerDocument, pascal_case_policy};
use serde::Deserialize;
use serde_json::Value;
use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::sync::Arc;

/// Declarative input: document metadata plus schemas and paths.
#[derive(Deserialize)]
struct Manifest {
    title: String,
    version: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    schemas: Vec<Schema>,
    /// Schema names to register as named definitions. Defaults to all.
    #[serde(default)]
    definitions: Option<Vec<String>>,
    #[serde(default)]
    paths: Vec<PathEntry>,
}

#[derive(Deserialize)]
struct PathEntry {
    path: String,
    #[serde(default)]
    operations: Option<Value>,
    /// Handler documentation text; the part after a `---` line is parsed
    /// as a structured operation block.
    #[serde(default)]
    doc: Option<String>,
}

#[derive(Parser)]
#[command(name = "schema-to-swagger")]
#[command(about = "Convert a schema manifest into a Swagger 2.0 document", long_about = None)]
struct Cli {
    /// Input manifest file (use '-' for stdin)
    #[arg(value_name = "INPUT")]
    input: String,

    /// Output file (defaults to stdout)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Emit YAML instead of JSON
    #[arg(long)]
    yaml: bool,

    /// Auto-register nested schemas under the PascalCase form of their name
    #[arg(long)]
    auto_name: bool,
}

fn build_document(manifest: Manifest, auto_name: bool) -> Result<SwaggerDocument, ConversionError> {
    let mut document = SwaggerDocument::new(manifest.title, manifest.version);
    if let Some(description) = manifest.description {
        document = document.description(description);
    }
    if auto_name {
        document = document.naming_policy(pascal_case_policy());
    }

    let schemas: Vec<Arc<Schema>> = manifest.schemas.into_iter().map(Arc::new).collect();
    for schema in &schemas {
        document.register_schema(schema.clone());
    }

    let names: Vec<String> = manifest
        .definitions
        .unwrap_or_else(|| schemas.iter().map(|schema| schema.name.clone()).collect());
    for name in &names {
        let schema = schemas
            .iter()
            .find(|schema| &schema.name == name)
            .ok_or_else(|| ConversionError::UnknownSchema(name.clone()))?;
        document.definition(name, schema);
    }

    for entry in manifest.paths {
        document.add_path(&entry.path, entry.operations, entry.doc.as_deref())?;
    }
    Ok(document)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Read input
    let input_content = if cli.input == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        buffer
    } else {
        fs::read_to_string(&cli.input)?
    };

    let manifest: Manifest = serde_json::from_str(&input_content)
        .map_err(|e| ConversionError::ParseError(e.to_string()))?;

    let mut document = build_document(manifest, cli.auto_name)?;
    let rendered = if cli.yaml {
        document.to_yaml()?
    } else {
        document.to_json()?
    };

    // Write output
    if let Some(output_path) = cli.output {
        fs::write(output_path, rendered)?;
    } else {
        println!("{}", rendered);
    }

    Ok(())
}
