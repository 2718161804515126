// crates/qlog-normalize/src/sort.rs
// ============================================================================
// Module: Canonical Sort
// Description: Imposes a deterministic order on selections and arguments.
// Purpose: Make author-chosen ordering irrelevant to the skeleton text.
// Dependencies: crate::{ast, printer}
// ============================================================================

//! ## Overview
//! Arguments sort by name (input-object keys are already ordered). Selections
//! sort fields first by name, alias and printed arguments, then inline
//! fragments by type condition and printed directives, then any remaining
//! spreads by name. Variable definitions sort by name.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::cmp::Ordering;

use crate::ast::Operation;
use crate::ast::Selection;
use crate::printer::print_arguments;
use crate::printer::print_directives;

// ============================================================================
// SECTION: Sorting
// ============================================================================

/// Sorts every operation in place.
pub fn sort_operations(operations: &mut [Operation]) {
    for operation in operations {
        operation.variables.sort_by(|left, right| left.name.cmp(&right.name));
        sort_selections(&mut operation.selections);
    }
}

/// Sorts one selection list recursively.
fn sort_selections(selections: &mut [Selection]) {
    for selection in selections.iter_mut() {
        match selection {
            Selection::Field(field) => {
                field.arguments.sort_by(|left, right| left.name.cmp(&right.name));
                sort_selections(&mut field.selections);
            }
            Selection::InlineFragment(fragment) => sort_selections(&mut fragment.selections),
            Selection::FragmentSpread(_) => {}
        }
    }
    selections.sort_by(compare_selections);
}

/// Orders two selections canonically.
fn compare_selections(left: &Selection, right: &Selection) -> Ordering {
    match (left, right) {
        (Selection::Field(left), Selection::Field(right)) => left
            .name
            .cmp(&right.name)
            .then_with(|| left.alias.cmp(&right.alias))
            .then_with(|| print_arguments(&left.arguments).cmp(&print_arguments(&right.arguments)))
            .then_with(|| {
                print_directives(&left.directives).cmp(&print_directives(&right.directives))
            }),
        (Selection::InlineFragment(left), Selection::InlineFragment(right)) => left
            .type_condition
            .cmp(&right.type_condition)
            .then_with(|| {
                print_directives(&left.directives).cmp(&print_directives(&right.directives))
            }),
        (Selection::FragmentSpread(left), Selection::FragmentSpread(right)) => {
            left.name.cmp(&right.name)
        }
        _ => rank(left).cmp(&rank(right)),
    }
}

/// Returns the group rank of a selection kind.
const fn rank(selection: &Selection) -> u8 {
    match selection {
        Selection::Field(_) => 0,
        Selection::InlineFragment(_) => 1,
        Selection::FragmentSpread(_) => 2,
    }
}
