// crates/qlog-normalize/src/roots.rs
// ============================================================================
// Module: Root Query Extraction
// Description: Splits an operation into one operation per top-level selection.
// Purpose: Normalize each independently billed root selection on its own.
// Dependencies: crate::ast
// ============================================================================

//! ## Overview
//! Every top-level selection becomes its own operation that keeps the parent's
//! kind, name, variable definitions and directives. Later stages drop whatever
//! the single root does not use.

use crate::ast::Operation;

/// Splits an operation into one operation per top-level selection.
#[must_use]
pub fn extract_root_queries(operation: &Operation) -> Vec<Operation> {
    operation
        .selections
        .iter()
        .map(|selection| Operation {
            kind: operation.kind,
            name: operation.name.clone(),
            variables: operation.variables.clone(),
            directives: operation.directives.clone(),
            selections: vec![selection.clone()],
        })
        .collect()
}
