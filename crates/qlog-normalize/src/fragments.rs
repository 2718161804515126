// crates/qlog-normalize/src/fragments.rs
// ============================================================================
// Module: Fragment Substitution
// Description: Inlines named fragment spreads into the selections using them.
// Purpose: Remove fragment indirection before structural comparison.
// Dependencies: crate::{ast, factorize, typed}, qlog-core
// ============================================================================

//! ## Overview
//! Each spread becomes an inline fragment carrying the fragment's type
//! condition, the spread's directives and the fragment's (recursively
//! substituted) selections. Inline fragments, spread or written, are then
//! placed against the enclosing schema type: a condition naming the enclosing
//! type is dropped, and an untyped fragment without directives is flattened
//! into its parent. Spreads under different type conditions therefore stay
//! apart, and a spread prints exactly like its equivalent inline fragment.
//!
//! Each fragment body is expanded and factorized once per document. Every
//! selection emitted, including copies of memoized bodies, is charged against
//! [`MAX_EXPANDED_SELECTIONS`] so nested spreads cannot blow up the tree.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use qlog_core::Schema;
use qlog_core::SchemaType;

use crate::ast::Document;
use crate::ast::Fragment;
use crate::ast::InlineFragment;
use crate::ast::Selection;
use crate::error::NormalizeError;
use crate::factorize::factorize_selections;
use crate::typed::FieldScope;
use crate::typed::fragment_type;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Maximum number of selections fragment expansion may emit per document.
pub const MAX_EXPANDED_SELECTIONS: usize = 50_000;

// ============================================================================
// SECTION: Substitution
// ============================================================================

/// Inlines every fragment spread and drops the fragment definitions.
///
/// # Errors
///
/// Returns [`NormalizeError::UnknownFragment`] for spreads of undefined
/// fragments, [`NormalizeError::FragmentCycle`] for self-referencing ones and
/// [`NormalizeError::ExpansionLimit`] when expansion exceeds the selection
/// budget.
pub fn substitute_fragments(
    document: &mut Document,
    schema: &Schema,
) -> Result<(), NormalizeError> {
    let fragments = std::mem::take(&mut document.fragments);
    let mut expander = Expander::new(schema, &fragments);
    for operation in &mut document.operations {
        let root = schema.root_type(operation.kind);
        let selections = std::mem::take(&mut operation.selections);
        operation.selections = expander.expand(selections, root)?;
    }
    Ok(())
}

/// Per-document expansion state.
struct Expander<'a> {
    /// Schema used to type the enclosing selections.
    schema: &'a Schema,
    /// Fragment definitions keyed by name.
    fragments: &'a BTreeMap<String, Fragment>,
    /// Expanded and factorized fragment bodies.
    expanded: BTreeMap<String, Vec<Selection>>,
    /// Fragments currently being expanded.
    active: Vec<String>,
    /// Selections emitted so far.
    emitted: usize,
}

impl<'a> Expander<'a> {
    /// Creates an expander with an empty memo.
    const fn new(schema: &'a Schema, fragments: &'a BTreeMap<String, Fragment>) -> Self {
        Self {
            schema,
            fragments,
            expanded: BTreeMap::new(),
            active: Vec::new(),
            emitted: 0,
        }
    }

    /// Substitutes spreads within one selection list under its enclosing type.
    fn expand(
        &mut self,
        selections: Vec<Selection>,
        parent: Option<&'a SchemaType>,
    ) -> Result<Vec<Selection>, NormalizeError> {
        let schema = self.schema;
        let mut out = Vec::with_capacity(selections.len());
        for selection in selections {
            match selection {
                Selection::Field(mut field) => {
                    self.charge(1)?;
                    let child = FieldScope::resolve(parent, &field.name).child_type(schema);
                    field.selections = self.expand(field.selections, child)?;
                    out.push(Selection::Field(field));
                }
                Selection::InlineFragment(mut fragment) => {
                    self.charge(1)?;
                    let scope =
                        fragment_type(schema, parent, fragment.type_condition.as_deref());
                    fragment.selections = self.expand(fragment.selections, scope)?;
                    place(&mut out, parent, fragment);
                }
                Selection::FragmentSpread(spread) => {
                    let (type_condition, selections) = self.fragment_body(&spread.name)?;
                    place(&mut out, parent, InlineFragment {
                        type_condition: Some(type_condition),
                        directives: spread.directives,
                        selections,
                    });
                }
            }
        }
        Ok(out)
    }

    /// Returns a fragment's type condition and a copy of its expanded body.
    fn fragment_body(
        &mut self,
        name: &str,
    ) -> Result<(String, Vec<Selection>), NormalizeError> {
        let (schema, fragments) = (self.schema, self.fragments);
        let fragment =
            fragments.get(name).ok_or_else(|| NormalizeError::UnknownFragment(name.to_string()))?;
        if let Some(body) = self.expanded.get(name) {
            let size = count_selections(body);
            let body = body.clone();
            self.charge(size.saturating_add(1))?;
            return Ok((fragment.type_condition.clone(), body));
        }
        if self.active.iter().any(|active| active == name) {
            return Err(NormalizeError::FragmentCycle(name.to_string()));
        }
        self.charge(1)?;
        self.active.push(name.to_string());
        let scope = schema.type_named(&fragment.type_condition);
        let body = self.expand(fragment.selections.clone(), scope);
        self.active.pop();
        let body = factorize_selections(body?);
        self.expanded.insert(name.to_string(), body.clone());
        Ok((fragment.type_condition.clone(), body))
    }

    /// Charges emitted selections against the expansion budget.
    fn charge(&mut self, count: usize) -> Result<(), NormalizeError> {
        self.emitted = self.emitted.saturating_add(count);
        if self.emitted > MAX_EXPANDED_SELECTIONS {
            return Err(NormalizeError::ExpansionLimit(MAX_EXPANDED_SELECTIONS));
        }
        Ok(())
    }
}

/// Places an inline fragment into its parent selection list.
fn place(out: &mut Vec<Selection>, parent: Option<&SchemaType>, mut fragment: InlineFragment) {
    if parent.is_some_and(|parent| fragment.type_condition.as_deref() == Some(parent.name.as_str()))
    {
        fragment.type_condition = None;
    }
    if fragment.type_condition.is_none() && fragment.directives.is_empty() {
        out.extend(fragment.selections);
    } else {
        out.push(Selection::InlineFragment(fragment));
    }
}

/// Counts selections in a list, nested ones included.
fn count_selections(selections: &[Selection]) -> usize {
    selections
        .iter()
        .map(|selection| match selection {
            Selection::Field(field) => 1 + count_selections(&field.selections),
            Selection::InlineFragment(fragment) => 1 + count_selections(&fragment.selections),
            Selection::FragmentSpread(_) => 1,
        })
        .sum()
}
