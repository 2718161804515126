// crates/qlog-normalize/src/printer.rs
// ============================================================================
// Module: Minified Printer
// Description: Renders query trees as minimal canonical text.
// Purpose: Produce the byte-exact skeleton text that is hashed and stored.
// Dependencies: qlog-core, serde_json
// ============================================================================

//! ## Overview
//! The printer writes a token stream and inserts a single space only where two
//! word-like tokens (names, numbers, keywords) would otherwise fuse. Commas are
//! never emitted. Anonymous queries without variables or directives use the
//! `{...}` shorthand.
//!
//! # Invariants
//! - Printing is a pure function of the tree; equal trees print equal bytes.

// ============================================================================
// SECTION: Imports
// ============================================================================

use qlog_core::OperationKind;
use qlog_core::TypeRef;

use crate::ast::Argument;
use crate::ast::Directive;
use crate::ast::Operation;
use crate::ast::Selection;
use crate::ast::Value;
use crate::ast::VariableDefinition;

// ============================================================================
// SECTION: Public API
// ============================================================================

/// Prints an operation as minified text.
#[must_use]
pub fn print_operation(operation: &Operation) -> String {
    let mut writer = TokenWriter::default();
    writer.operation(operation);
    writer.finish()
}

/// Prints a value literal as minified text.
#[must_use]
pub fn print_value(value: &Value) -> String {
    let mut writer = TokenWriter::default();
    writer.value(value);
    writer.finish()
}

/// Prints an argument list (without parentheses) as minified text.
#[must_use]
pub fn print_arguments(arguments: &[Argument]) -> String {
    let mut writer = TokenWriter::default();
    for argument in arguments {
        writer.argument(argument);
    }
    writer.finish()
}

/// Prints a directive list as minified text.
#[must_use]
pub fn print_directives(directives: &[Directive]) -> String {
    let mut writer = TokenWriter::default();
    writer.directives(directives);
    writer.finish()
}

// ============================================================================
// SECTION: Token Writer
// ============================================================================

/// Accumulates tokens with minimal separation.
#[derive(Default)]
struct TokenWriter {
    /// Rendered text.
    out: String,
    /// Whether the last token was word-like.
    after_word: bool,
}

impl TokenWriter {
    /// Returns the rendered text.
    fn finish(self) -> String {
        self.out
    }

    /// Writes a word-like token.
    fn word(&mut self, text: &str) {
        if self.after_word {
            self.out.push(' ');
        }
        self.out.push_str(text);
        self.after_word = true;
    }

    /// Writes a punctuator.
    fn punct(&mut self, text: &str) {
        self.out.push_str(text);
        self.after_word = false;
    }

    /// Writes an operation.
    fn operation(&mut self, operation: &Operation) {
        let shorthand = operation.kind == OperationKind::Query
            && operation.name.is_none()
            && operation.variables.is_empty()
            && operation.directives.is_empty();
        if !shorthand {
            self.word(match operation.kind {
                OperationKind::Query => "query",
                OperationKind::Mutation => "mutation",
                OperationKind::Subscription => "subscription",
            });
            if let Some(name) = &operation.name {
                self.word(name);
            }
            if !operation.variables.is_empty() {
                self.punct("(");
                for definition in &operation.variables {
                    self.variable_definition(definition);
                }
                self.punct(")");
            }
            self.directives(&operation.directives);
        }
        self.selection_set(&operation.selections);
    }

    /// Writes a variable definition.
    fn variable_definition(&mut self, definition: &VariableDefinition) {
        self.variable(&definition.name);
        self.punct(":");
        self.type_ref(&definition.var_type);
        if let Some(default) = &definition.default_value {
            self.punct("=");
            self.value(default);
        }
    }

    /// Writes a type reference.
    fn type_ref(&mut self, type_ref: &TypeRef) {
        match type_ref {
            TypeRef::Named(name) => self.word(name),
            TypeRef::List(inner) => {
                self.punct("[");
                self.type_ref(inner);
                self.punct("]");
            }
            TypeRef::NonNull(inner) => {
                self.type_ref(inner);
                self.punct("!");
            }
        }
    }

    /// Writes a selection set; empty sets are omitted.
    fn selection_set(&mut self, selections: &[Selection]) {
        if selections.is_empty() {
            return;
        }
        self.punct("{");
        for selection in selections {
            self.selection(selection);
        }
        self.punct("}");
    }

    /// Writes one selection.
    fn selection(&mut self, selection: &Selection) {
        match selection {
            Selection::Field(field) => {
                if let Some(alias) = &field.alias {
                    self.word(alias);
                    self.punct(":");
                }
                self.word(&field.name);
                if !field.arguments.is_empty() {
                    self.punct("(");
                    for argument in &field.arguments {
                        self.argument(argument);
                    }
                    self.punct(")");
                }
                self.directives(&field.directives);
                self.selection_set(&field.selections);
            }
            Selection::FragmentSpread(spread) => {
                self.punct("...");
                self.word(&spread.name);
                self.directives(&spread.directives);
            }
            Selection::InlineFragment(fragment) => {
                self.punct("...");
                if let Some(type_condition) = &fragment.type_condition {
                    self.word("on");
                    self.word(type_condition);
                }
                self.directives(&fragment.directives);
                self.selection_set(&fragment.selections);
            }
        }
    }

    /// Writes directive applications.
    fn directives(&mut self, directives: &[Directive]) {
        for directive in directives {
            self.punct("@");
            self.word(&directive.name);
            if !directive.arguments.is_empty() {
                self.punct("(");
                for argument in &directive.arguments {
                    self.argument(argument);
                }
                self.punct(")");
            }
        }
    }

    /// Writes one `name:value` argument.
    fn argument(&mut self, argument: &Argument) {
        self.word(&argument.name);
        self.punct(":");
        self.value(&argument.value);
    }

    /// Writes a variable reference.
    fn variable(&mut self, name: &str) {
        self.punct("$");
        self.word(name);
    }

    /// Writes a value literal.
    fn value(&mut self, value: &Value) {
        match value {
            Value::Variable(name) => self.variable(name),
            Value::Int(number) => self.word(&number.to_string()),
            Value::Float(number) => self.word(&format_float(*number)),
            Value::String(text) => {
                self.punct(&serde_json::Value::String(text.clone()).to_string());
            }
            Value::Boolean(flag) => self.word(if *flag { "true" } else { "false" }),
            Value::Null => self.word("null"),
            Value::Enum(name) => self.word(name),
            Value::List(items) => {
                self.punct("[");
                for item in items {
                    self.value(item);
                }
                self.punct("]");
            }
            Value::Object(fields) => {
                self.punct("{");
                for (key, field) in fields {
                    self.word(key);
                    self.punct(":");
                    self.value(field);
                }
                self.punct("}");
            }
        }
    }
}

/// Formats a float so it re-parses as a float literal.
fn format_float(number: f64) -> String {
    let text = number.to_string();
    if text.contains(['.', 'e', 'E']) || !number.is_finite() {
        text
    } else {
        format!("{text}.0")
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
