// crates/qlog-normalize/src/unknown_args.rs
// ============================================================================
// Module: Unknown Argument Removal
// Description: Strips arguments and input keys the schema does not declare.
// Purpose: Tolerate schema drift between execution and normalization.
// Dependencies: crate::{ast, typed}, qlog-core
// ============================================================================

//! ## Overview
//! On a known enclosing type, arguments missing from the field declaration are
//! removed, and input-object literal keys missing from the input type are
//! removed recursively. A field missing from a known object type loses every
//! argument. Under unknown types, and on introspection fields, nothing changes.

// ============================================================================
// SECTION: Imports
// ============================================================================

use qlog_core::Schema;
use qlog_core::SchemaType;
use qlog_core::TypeRef;

use crate::ast::Operation;
use crate::ast::Selection;
use crate::ast::Value;
use crate::typed::FieldScope;
use crate::typed::fragment_type;
use crate::typed::input_object;

// ============================================================================
// SECTION: Removal
// ============================================================================

/// Removes undeclared arguments throughout every operation.
pub fn remove_unknown_arguments(operations: &mut [Operation], schema: &Schema) {
    for operation in operations {
        let root = schema.root_type(operation.kind);
        strip_selections(schema, root, &mut operation.selections);
    }
}

/// Strips one selection list under its enclosing type.
fn strip_selections(schema: &Schema, parent: Option<&SchemaType>, selections: &mut [Selection]) {
    for selection in selections {
        match selection {
            Selection::Field(field) => {
                let scope = FieldScope::resolve(parent, &field.name);
                match scope {
                    FieldScope::Declared(declared) => {
                        field.arguments.retain(|argument| declared.args.contains_key(&argument.name));
                        for argument in &mut field.arguments {
                            if let Some(arg_def) = declared.args.get(&argument.name) {
                                strip_input_value(schema, &arg_def.type_ref, &mut argument.value);
                            }
                        }
                    }
                    FieldScope::Undeclared => field.arguments.clear(),
                    FieldScope::Introspection | FieldScope::Unknown => {}
                }
                strip_selections(schema, scope.child_type(schema), &mut field.selections);
            }
            Selection::InlineFragment(fragment) => {
                let scope = fragment_type(schema, parent, fragment.type_condition.as_deref());
                strip_selections(schema, scope, &mut fragment.selections);
            }
            Selection::FragmentSpread(_) => {}
        }
    }
}

/// Strips undeclared keys from input-object literals.
fn strip_input_value(schema: &Schema, type_ref: &TypeRef, value: &mut Value) {
    match value {
        Value::Object(fields) => {
            let Some(input) = input_object(schema, type_ref.named_type()) else {
                return;
            };
            fields.retain(|key, _| input.input_fields.contains_key(key));
            for (key, field) in fields.iter_mut() {
                if let Some(field_def) = input.input_fields.get(key) {
                    strip_input_value(schema, &field_def.type_ref, field);
                }
            }
        }
        Value::List(items) => {
            for item in items {
                strip_input_value(schema, type_ref, item);
            }
        }
        _ => {}
    }
}
