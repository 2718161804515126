// crates/qlog-normalize/src/factorize.rs
// ============================================================================
// Module: Field Factorization
// Description: Merges structurally duplicate selections at each level.
// Purpose: Collapse redundancy introduced by fragment inlining or authoring.
// Dependencies: crate::{ast, printer}
// ============================================================================

//! ## Overview
//! Two fields merge when alias, name, argument set (in any order) and
//! directives match; their sub-selections are concatenated and factorized in
//! turn. Inline fragments merge on equal type condition and directives. The
//! first occurrence keeps its position.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use crate::ast::Argument;
use crate::ast::Operation;
use crate::ast::Selection;
use crate::printer::print_arguments;
use crate::printer::print_directives;

// ============================================================================
// SECTION: Factorization
// ============================================================================

/// Factorizes every operation of a document.
pub fn factorize(operations: &mut [Operation]) {
    for operation in operations {
        let selections = std::mem::take(&mut operation.selections);
        operation.selections = factorize_selections(selections);
    }
}

/// Merges duplicates in one selection list, then recurses.
pub(crate) fn factorize_selections(selections: Vec<Selection>) -> Vec<Selection> {
    let mut out: Vec<Selection> = Vec::with_capacity(selections.len());
    let mut index: BTreeMap<String, usize> = BTreeMap::new();
    for selection in selections {
        let Some(key) = merge_key(&selection) else {
            out.push(selection);
            continue;
        };
        if let Some(&position) = index.get(&key) {
            merge_into(&mut out[position], selection);
        } else {
            index.insert(key, out.len());
            out.push(selection);
        }
    }
    for selection in &mut out {
        match selection {
            Selection::Field(field) => {
                field.selections = factorize_selections(std::mem::take(&mut field.selections));
            }
            Selection::InlineFragment(fragment) => {
                fragment.selections =
                    factorize_selections(std::mem::take(&mut fragment.selections));
            }
            Selection::FragmentSpread(_) => {}
        }
    }
    out
}

/// Appends the sub-selections of a duplicate onto its first occurrence.
fn merge_into(existing: &mut Selection, duplicate: Selection) {
    let extra = match duplicate {
        Selection::Field(field) => field.selections,
        Selection::InlineFragment(fragment) => fragment.selections,
        Selection::FragmentSpread(_) => return,
    };
    match existing {
        Selection::Field(field) => field.selections.extend(extra),
        Selection::InlineFragment(fragment) => fragment.selections.extend(extra),
        Selection::FragmentSpread(_) => {}
    }
}

/// Builds the identity under which selections merge.
fn merge_key(selection: &Selection) -> Option<String> {
    match selection {
        Selection::Field(field) => Some(format!(
            "f|{}|{}|{}|{}",
            field.alias.as_deref().unwrap_or_default(),
            field.name,
            print_arguments(&sorted_arguments(&field.arguments)),
            print_directives(&field.directives),
        )),
        Selection::InlineFragment(fragment) => Some(format!(
            "i|{}|{}",
            fragment.type_condition.as_deref().unwrap_or_default(),
            print_directives(&fragment.directives),
        )),
        Selection::FragmentSpread(_) => None,
    }
}

/// Returns arguments ordered by name.
fn sorted_arguments(arguments: &[Argument]) -> Vec<Argument> {
    let mut sorted = arguments.to_vec();
    sorted.sort_by(|left, right| left.name.cmp(&right.name));
    sorted
}
