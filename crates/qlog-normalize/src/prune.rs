// crates/qlog-normalize/src/prune.rs
// ============================================================================
// Module: Argument Pruning
// Description: Drops field arguments whose value is semantically absent.
// Purpose: Keep `arg: null` and omitted arguments on the same skeleton.
// Dependencies: crate::ast
// ============================================================================

//! ## Overview
//! Inside input-object literals, entries that are `null`, `[]` or `{}` are
//! dropped bottom-up; a field argument left absent afterwards is removed.
//! List elements are kept as written. Directive arguments are not pruned.

use crate::ast::Operation;
use crate::ast::Selection;
use crate::ast::Value;

// ============================================================================
// SECTION: Pruning
// ============================================================================

/// Prunes absent arguments throughout every operation.
pub fn prune_arguments(operations: &mut [Operation]) {
    for operation in operations {
        prune_selections(&mut operation.selections);
    }
}

/// Prunes one selection list recursively.
fn prune_selections(selections: &mut [Selection]) {
    for selection in selections {
        match selection {
            Selection::Field(field) => {
                for argument in &mut field.arguments {
                    prune_value(&mut argument.value);
                }
                field.arguments.retain(|argument| !argument.value.is_absent());
                prune_selections(&mut field.selections);
            }
            Selection::InlineFragment(fragment) => prune_selections(&mut fragment.selections),
            Selection::FragmentSpread(_) => {}
        }
    }
}

/// Drops absent entries inside input objects, bottom-up.
fn prune_value(value: &mut Value) {
    match value {
        Value::Object(fields) => {
            for field in fields.values_mut() {
                prune_value(field);
            }
            fields.retain(|_, field| !field.is_absent());
        }
        Value::List(items) => {
            for item in items {
                if matches!(item, Value::Object(_)) {
                    prune_value(item);
                }
            }
        }
        _ => {}
    }
}
