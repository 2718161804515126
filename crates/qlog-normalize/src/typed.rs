// crates/qlog-normalize/src/typed.rs
// ============================================================================
// Module: Type Scopes
// Description: Resolves the schema type in effect at each selection.
// Purpose: Share type resolution between the schema-aware stages.
// Dependencies: qlog-core
// ============================================================================

//! ## Overview
//! Schema-aware stages walk selections with the enclosing type, starting from
//! the operation's root type and following field return types and inline
//! fragment type conditions. Once a type is unknown, everything below it is
//! unknown too and the stages leave that subtree untouched.

use qlog_core::FieldDef;
use qlog_core::Schema;
use qlog_core::SchemaType;
use qlog_core::TypeKind;

// ============================================================================
// SECTION: Field Scope
// ============================================================================

/// How a field relates to its enclosing type.
#[derive(Debug, Clone, Copy)]
pub enum FieldScope<'s> {
    /// Introspection meta-field (`__typename`, `__schema`, ...).
    Introspection,
    /// Field declared on a known type.
    Declared(&'s FieldDef),
    /// Field missing from a known object type.
    Undeclared,
    /// Enclosing type is unknown or abstract without the field.
    Unknown,
}

impl<'s> FieldScope<'s> {
    /// Resolves a field name against its enclosing type.
    #[must_use]
    pub fn resolve(parent: Option<&'s SchemaType>, field_name: &str) -> Self {
        if field_name.starts_with("__") {
            return Self::Introspection;
        }
        let Some(parent) = parent else {
            return Self::Unknown;
        };
        match parent.fields.get(field_name) {
            Some(field) => Self::Declared(field),
            None if parent.kind == TypeKind::Object => Self::Undeclared,
            None => Self::Unknown,
        }
    }

    /// Returns the type enclosing the field's sub-selections.
    #[must_use]
    pub fn child_type(self, schema: &'s Schema) -> Option<&'s SchemaType> {
        match self {
            Self::Declared(field) => schema.field_type(field),
            Self::Introspection | Self::Undeclared | Self::Unknown => None,
        }
    }
}

/// Returns the type enclosing an inline fragment's selections.
#[must_use]
pub fn fragment_type<'s>(
    schema: &'s Schema,
    parent: Option<&'s SchemaType>,
    type_condition: Option<&str>,
) -> Option<&'s SchemaType> {
    match type_condition {
        Some(name) => schema.type_named(name),
        None => parent,
    }
}

/// Returns the input-object type named by an argument type, if known.
#[must_use]
pub fn input_object<'s>(schema: &'s Schema, type_name: &str) -> Option<&'s SchemaType> {
    schema.type_named(type_name).filter(|named| named.kind == TypeKind::InputObject)
}
