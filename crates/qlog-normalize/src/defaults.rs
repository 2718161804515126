// crates/qlog-normalize/src/defaults.rs
// ============================================================================
// Module: Default Value Extraction
// Description: Separates default values from the query tree.
// Purpose: Keep runs that spell out defaults on the same skeleton as runs that omit them.
// Dependencies: crate::{ast, typed}, qlog-core
// ============================================================================

//! ## Overview
//! Variable-definition defaults move out of the operation into a side table
//! keyed by variable name; they later seed the extracted values of variables
//! the record did not bind. Field arguments whose literal equals the schema's
//! declared default for that argument are removed outright.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use qlog_core::Schema;
use qlog_core::SchemaType;

use crate::ast::Operation;
use crate::ast::Selection;
use crate::ast::Value;
use crate::ast::parse_value_literal;
use crate::typed::FieldScope;
use crate::typed::fragment_type;

// ============================================================================
// SECTION: Extraction
// ============================================================================

/// Variable defaults taken from one operation, keyed by variable name.
pub type VariableDefaults = BTreeMap<String, Value>;

/// Removes default values from an operation and returns its variable defaults.
pub fn remove_default_values(operation: &mut Operation, schema: &Schema) -> VariableDefaults {
    let mut defaults = VariableDefaults::new();
    for definition in &mut operation.variables {
        if let Some(value) = definition.default_value.take() {
            defaults.insert(definition.name.clone(), value);
        }
    }
    let root = schema.root_type(operation.kind);
    remove_schema_defaults(schema, root, &mut operation.selections);
    defaults
}

/// Removes arguments equal to their schema default.
fn remove_schema_defaults(
    schema: &Schema,
    parent: Option<&SchemaType>,
    selections: &mut [Selection],
) {
    for selection in selections {
        match selection {
            Selection::Field(field) => {
                let scope = FieldScope::resolve(parent, &field.name);
                if let FieldScope::Declared(declared) = scope {
                    field.arguments.retain(|argument| {
                        let default = declared
                            .args
                            .get(&argument.name)
                            .and_then(|arg_def| arg_def.default_value.as_deref())
                            .and_then(parse_value_literal);
                        default.as_ref() != Some(&argument.value)
                    });
                }
                remove_schema_defaults(schema, scope.child_type(schema), &mut field.selections);
            }
            Selection::InlineFragment(fragment) => {
                let scope = fragment_type(schema, parent, fragment.type_condition.as_deref());
                remove_schema_defaults(schema, scope, &mut fragment.selections);
            }
            Selection::FragmentSpread(_) => {}
        }
    }
}
