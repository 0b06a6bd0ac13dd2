//! JSON Schema validation of model output against the embedded schemas.

use anyhow::{Context, Result, anyhow, bail};
use jsonschema::validator_for;
use serde_json::Value;

pub const PLAN_SCHEMA: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/schemas/plan.schema.json"
));
pub const VERDICT_SCHEMA: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/schemas/verdict.schema.json"
));

/// Validate `instance` against the schema text `schema_raw`.
///
/// All violations are joined into one error message.
pub fn validate_schema(schema_raw: &str, instance: &Value) -> Result<()> {
    let schema: Value = serde_json::from_str(schema_raw).context("parse schema json")?;
    let compiled = validator_for(&schema).map_err(|err| anyhow!("invalid schema: {err}"))?;
    if compiled.is_valid(instance) {
        return Ok(());
    }
    let messages: Vec<String> = compiled
        .iter_errors(instance)
        .map(|err| err.to_string())
        .collect();
    bail!("schema validation failed: {}", messages.join("; "))
}
