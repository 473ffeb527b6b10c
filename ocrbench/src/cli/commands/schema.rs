//! Schema command - Load, validate and show a schema

use clap::Parser;

use super::super::output::{color, to_json, write_output};
use super::super::parser::OutputFormat;
use super::super::utils::{format_error, load_schema};

use crate::Schema;

/// Load and validate a schema, printing resolved weights
#[derive(Parser, Debug)]
pub struct SchemaArgs {
    /// Schema file (YAML, or JSON by extension) [default: built-in medical form]
    #[arg(value_name = "PATH")]
    pub path: Option<String>,

    /// Output format
    #[arg(long, value_enum, default_value = "human")]
    pub format: OutputFormat,
}

/// Run the schema command
pub fn run(args: SchemaArgs) -> Result<(), String> {
    let schema = match &args.path {
        Some(path) => load_schema(path)?,
        None => Schema::medical_form()
            .map_err(|e| format_error("load built-in schema", &e.to_string()))?,
    };

    let content = match args.format {
        OutputFormat::Json => to_json(&schema)?,
        OutputFormat::Human => {
            let mut out = format!("{} {}\n", color("1", schema.name()), schema.version());
            if !schema.description().is_empty() {
                out.push_str(&format!("  {}\n", schema.description()));
            }
            out.push_str(&format!(
                "\n  {:<24} {:<18} {:<12} {}\n",
                "Field", "Type", "Evaluation", "Weight"
            ));
            for field in schema.fields() {
                out.push_str(&format!(
                    "  {:<24} {:<18} {:<12} {:.4}\n",
                    field.name,
                    field.kind.as_str(),
                    field.evaluation.as_str(),
                    field.weight
                ));
            }
            out
        }
    };
    write_output(&content, None)
}
