//! Form state files: JSON objects keyed by field name.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use jsonschema::Draft;
use serde_json::Value;
use tracing::debug;

use crate::core::types::FormState;

pub const FORM_SCHEMA: &str = include_str!("../../schemas/form_state.schema.json");

/// Load a form file, checking it against the form schema before decoding.
pub fn load_form(path: &Path) -> Result<FormState> {
    debug!(path = %path.display(), "loading form");
    let raw = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    parse_form(&raw).with_context(|| format!("load form {}", path.display()))
}

pub fn parse_form(raw: &str) -> Result<FormState> {
    let instance: Value = serde_json::from_str(raw).context("parse form json")?;
    let schema: Value = serde_json::from_str(FORM_SCHEMA).context("parse form schema")?;
    validate_schema(&instance, &schema)?;
    let form: FormState = serde_json::from_value(instance).context("decode form values")?;
    debug!(fields = form.len(), "form loaded");
    Ok(form)
}

/// Validate JSON instance against a JSON Schema (Draft 2020-12).
fn validate_schema(instance: &Value, schema: &Value) -> Result<()> {
    let compiled = jsonschema::options()
        .with_draft(Draft::Draft202012)
        .build(schema)
        .context("compile json schema")?;
    let messages: Vec<String> = compiled
        .iter_errors(instance)
        .map(|err| err.to_string())
        .collect();
    if !messages.is_empty() {
        bail!("schema validation failed:\n- {}", messages.join("\n- "));
    }
    Ok(())
}
