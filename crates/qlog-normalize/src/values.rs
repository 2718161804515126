// crates/qlog-normalize/src/values.rs
// ============================================================================
// Module: Value Separation
// Description: Replaces literal and variable values with numbered placeholders.
// Purpose: Split a root query into its structural skeleton and its data.
// Dependencies: crate::{ast, printer, typed}, qlog-core, serde_json
// ============================================================================

//! ## Overview
//! Placeholders are named `_0`, `_1`, ... in traversal order: operation
//! directives, then each field's arguments, its directives, and its
//! sub-selections. Field argument literals (scalars, enums, lists) each take a
//! fresh placeholder; input-object literals are descended so their keys stay
//! in the skeleton. Each distinct original variable maps to exactly one
//! placeholder, valued from the merged bindings or `null` when unbound.
//! Directive arguments keep their literals and only have variables renamed.
//!
//! Placeholders are then re-declared with the schema type of the position they
//! fill, falling back to the original variable declaration; a placeholder
//! without any known type stays undeclared. The operation name is dropped.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use qlog_core::NormalizedQuery;
use qlog_core::Schema;
use qlog_core::SchemaType;
use qlog_core::TypeRef;
use serde_json::Map;
use serde_json::Number;
use serde_json::Value as JsonValue;

use crate::ast::Directive;
use crate::ast::Operation;
use crate::ast::Selection;
use crate::ast::Value;
use crate::ast::VariableDefinition;
use crate::printer::print_operation;
use crate::typed::FieldScope;
use crate::typed::fragment_type;
use crate::typed::input_object;

// ============================================================================
// SECTION: Public API
// ============================================================================

/// Separates values from a root operation and prints its skeleton.
#[must_use]
pub fn separate_values(
    mut operation: Operation,
    bindings: &Map<String, JsonValue>,
    schema: &Schema,
) -> NormalizedQuery {
    let declared = std::mem::take(&mut operation.variables)
        .into_iter()
        .map(|definition| (definition.name, definition.var_type))
        .collect();
    let mut separator = Separator {
        schema,
        bindings,
        declared,
        by_variable: BTreeMap::new(),
        placeholders: Vec::new(),
    };
    separator.directives(&mut operation.directives);
    let root = schema.root_type(operation.kind);
    separator.selections(root, &mut operation.selections);

    operation.name = None;
    let mut variables = Vec::with_capacity(separator.placeholders.len());
    operation.variables = separator
        .placeholders
        .into_iter()
        .enumerate()
        .filter_map(|(index, placeholder)| {
            variables.push(placeholder.value);
            placeholder.var_type.map(|var_type| VariableDefinition {
                name: placeholder_name(index),
                var_type,
                default_value: None,
            })
        })
        .collect();
    NormalizedQuery {
        skeleton: print_operation(&operation),
        variables,
    }
}

/// Converts a value literal to JSON, resolving variables from bindings.
#[must_use]
pub fn value_to_json(value: &Value, bindings: &Map<String, JsonValue>) -> JsonValue {
    match value {
        Value::Variable(name) => bindings.get(name).cloned().unwrap_or(JsonValue::Null),
        Value::Int(number) => JsonValue::from(*number),
        Value::Float(number) => Number::from_f64(*number).map_or(JsonValue::Null, JsonValue::Number),
        Value::String(text) | Value::Enum(text) => JsonValue::String(text.clone()),
        Value::Boolean(flag) => JsonValue::Bool(*flag),
        Value::Null => JsonValue::Null,
        Value::List(items) => {
            JsonValue::Array(items.iter().map(|item| value_to_json(item, bindings)).collect())
        }
        Value::Object(fields) => JsonValue::Object(
            fields.iter().map(|(key, field)| (key.clone(), value_to_json(field, bindings))).collect(),
        ),
    }
}

// ============================================================================
// SECTION: Separator
// ============================================================================

/// One extracted value and the type it is declared with.
struct Placeholder {
    /// Extracted value.
    value: JsonValue,
    /// Declared type, when known.
    var_type: Option<TypeRef>,
}

/// Walk state of one root operation.
struct Separator<'a> {
    /// Dataset schema.
    schema: &'a Schema,
    /// Merged variable bindings.
    bindings: &'a Map<String, JsonValue>,
    /// Original variable declarations.
    declared: BTreeMap<String, TypeRef>,
    /// Placeholder index per original variable.
    by_variable: BTreeMap<String, usize>,
    /// Placeholders in allocation order.
    placeholders: Vec<Placeholder>,
}

impl Separator<'_> {
    /// Separates values in a selection list under its enclosing type.
    fn selections(&mut self, parent: Option<&SchemaType>, selections: &mut [Selection]) {
        let schema = self.schema;
        for selection in selections {
            match selection {
                Selection::Field(field) => {
                    let scope = FieldScope::resolve(parent, &field.name);
                    for argument in &mut field.arguments {
                        let expected = match scope {
                            FieldScope::Declared(declared) => {
                                declared.args.get(&argument.name).map(|arg| &arg.type_ref)
                            }
                            _ => None,
                        };
                        self.argument_value(&mut argument.value, expected);
                    }
                    self.directives(&mut field.directives);
                    self.selections(scope.child_type(schema), &mut field.selections);
                }
                Selection::InlineFragment(fragment) => {
                    self.directives(&mut fragment.directives);
                    let scope = fragment_type(schema, parent, fragment.type_condition.as_deref());
                    self.selections(scope, &mut fragment.selections);
                }
                Selection::FragmentSpread(spread) => self.directives(&mut spread.directives),
            }
        }
    }

    /// Replaces a field argument value with placeholders.
    fn argument_value(&mut self, value: &mut Value, expected: Option<&TypeRef>) {
        match value {
            Value::Variable(name) => {
                let index = self.variable_placeholder(name, expected);
                *name = placeholder_name(index);
            }
            Value::Object(fields) => {
                let input = expected.and_then(|ty| input_object(self.schema, ty.named_type()));
                for (key, field) in fields.iter_mut() {
                    let field_type = input
                        .and_then(|input| input.input_fields.get(key))
                        .map(|field_def| &field_def.type_ref);
                    self.argument_value(field, field_type);
                }
            }
            literal => {
                let index = self.placeholders.len();
                self.placeholders.push(Placeholder {
                    value: value_to_json(literal, self.bindings),
                    var_type: expected.cloned(),
                });
                *literal = Value::Variable(placeholder_name(index));
            }
        }
    }

    /// Renames variables in directive arguments, keeping literals.
    fn directives(&mut self, directives: &mut [Directive]) {
        for directive in directives {
            for argument in &mut directive.arguments {
                let expected = builtin_directive_type(&directive.name, &argument.name);
                self.rename_variables(&mut argument.value, expected.as_ref());
            }
        }
    }

    /// Renames every variable inside a literal.
    fn rename_variables(&mut self, value: &mut Value, expected: Option<&TypeRef>) {
        match value {
            Value::Variable(name) => {
                let index = self.variable_placeholder(name, expected);
                *name = placeholder_name(index);
            }
            Value::List(items) => {
                for item in items {
                    self.rename_variables(item, None);
                }
            }
            Value::Object(fields) => {
                for field in fields.values_mut() {
                    self.rename_variables(field, None);
                }
            }
            _ => {}
        }
    }

    /// Returns the placeholder of an original variable, allocating it once.
    fn variable_placeholder(&mut self, name: &str, expected: Option<&TypeRef>) -> usize {
        if let Some(&index) = self.by_variable.get(name) {
            if let Some(placeholder) = self.placeholders.get_mut(index)
                && placeholder.var_type.is_none()
            {
                placeholder.var_type = expected.cloned();
            }
            return index;
        }
        let index = self.placeholders.len();
        self.placeholders.push(Placeholder {
            value: self.bindings.get(name).cloned().unwrap_or(JsonValue::Null),
            var_type: expected.cloned().or_else(|| self.declared.get(name).cloned()),
        });
        self.by_variable.insert(name.to_string(), index);
        index
    }
}

/// Returns the placeholder variable name for an index.
fn placeholder_name(index: usize) -> String {
    format!("_{index}")
}

/// Returns the argument type of the built-in conditional directives.
fn builtin_directive_type(directive: &str, argument: &str) -> Option<TypeRef> {
    match (directive, argument) {
        ("include" | "skip", "if") => Some(TypeRef::NonNull(Box::new(TypeRef::Named(
            "Boolean".to_string(),
        )))),
        _ => None,
    }
}
