// crates/qlog-normalize/src/pipeline.rs
// ============================================================================
// Module: Canonicalization Pipeline
// Description: Composes the rewriting stages in their fixed order.
// Purpose: Turn one raw query into canonical skeletons and extracted values.
// Dependencies: crate::*, qlog-core, serde_json
// ============================================================================

//! ## Overview
//! Stage order is significant; each stage assumes the normal form the earlier
//! ones produced:
//!
//! 1. fragment substitution, typed against the schema
//! 2. factorization
//! 3. argument pruning
//! 4. canonical sort
//! 5. unknown-argument removal
//! 6. default-value extraction
//! 7. root-query extraction
//! 8. value separation, seeded with the record's variables over the defaults
//! 9. placeholder re-declaration and name removal, then minified printing
//!
//! The pipeline is pure: identical inputs always yield identical output.

// ============================================================================
// SECTION: Imports
// ============================================================================

use qlog_core::NormalizedQuery;
use qlog_core::Schema;
use serde_json::Map;
use serde_json::Value as JsonValue;

use crate::ast::parse_document;
use crate::defaults::VariableDefaults;
use crate::defaults::remove_default_values;
use crate::error::NormalizeError;
use crate::factorize::factorize;
use crate::fragments::substitute_fragments;
use crate::prune::prune_arguments;
use crate::roots::extract_root_queries;
use crate::sort::sort_operations;
use crate::unknown_args::remove_unknown_arguments;
use crate::values::separate_values;
use crate::values::value_to_json;

// ============================================================================
// SECTION: Pipeline
// ============================================================================

/// Normalizes a raw query into one entry per root query.
///
/// # Errors
///
/// Returns [`NormalizeError::SchemaUnavailable`] when no schema is given,
/// [`NormalizeError::Variables`] when bindings are not a mapping, and
/// [`NormalizeError::Parse`] or a fragment error when the query is malformed.
pub fn normalize_query(
    query: &str,
    variables: &JsonValue,
    schema: Option<&Schema>,
) -> Result<Vec<NormalizedQuery>, NormalizeError> {
    let schema = schema.ok_or(NormalizeError::SchemaUnavailable)?;
    let variables = decode_variables(variables)?;
    let mut document = parse_document(query)?;

    substitute_fragments(&mut document, schema)?;
    factorize(&mut document.operations);
    prune_arguments(&mut document.operations);
    sort_operations(&mut document.operations);
    remove_unknown_arguments(&mut document.operations, schema);

    let mut normalized = Vec::new();
    for mut operation in document.operations {
        let defaults = remove_default_values(&mut operation, schema);
        let bindings = merge_bindings(&defaults, &variables);
        for root in extract_root_queries(&operation) {
            normalized.push(separate_values(root, &bindings, schema));
        }
    }
    Ok(normalized)
}

/// Decodes raw variable bindings into a mapping.
///
/// Bindings may arrive structured or as a JSON-encoded string; `null` and the
/// empty string mean no bindings.
///
/// # Errors
///
/// Returns [`NormalizeError::Variables`] when the bindings are not a mapping.
pub fn decode_variables(variables: &JsonValue) -> Result<Map<String, JsonValue>, NormalizeError> {
    match variables {
        JsonValue::Null => Ok(Map::new()),
        JsonValue::Object(map) => Ok(map.clone()),
        JsonValue::String(text) if text.trim().is_empty() => Ok(Map::new()),
        JsonValue::String(text) => {
            let decoded: JsonValue = serde_json::from_str(text)
                .map_err(|err| NormalizeError::Variables(err.to_string()))?;
            match decoded {
                JsonValue::String(_) => {
                    Err(NormalizeError::Variables("doubly encoded bindings".to_string()))
                }
                other => decode_variables(&other),
            }
        }
        other => Err(NormalizeError::Variables(format!("expected an object, got {}", kind(other)))),
    }
}

/// Overlays record bindings on variable defaults.
fn merge_bindings(
    defaults: &VariableDefaults,
    variables: &Map<String, JsonValue>,
) -> Map<String, JsonValue> {
    let mut merged: Map<String, JsonValue> = defaults
        .iter()
        .map(|(name, value)| (name.clone(), value_to_json(value, variables)))
        .collect();
    for (name, value) in variables {
        merged.insert(name.clone(), value.clone());
    }
    merged
}

/// Names the JSON kind of a value.
const fn kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}
