// crates/qlog-normalize/src/ast.rs
// ============================================================================
// Module: Query Tree
// Description: Owned executable-document tree rewritten by the pipeline.
// Purpose: Decouple the rewriting stages from the parser's borrowed AST.
// Dependencies: graphql-parser, qlog-core
// ============================================================================

//! ## Overview
//! The parser's AST carries source positions and borrowed text that every
//! rewriting stage would have to thread through. The pipeline instead converts
//! the parsed document once into this owned tree; stages mutate it in place and
//! the printer renders it. Positions are dropped since no stage reports them.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use graphql_parser::query as gql;
use qlog_core::OperationKind;
use qlog_core::TypeRef;

use crate::error::NormalizeError;

// ============================================================================
// SECTION: Tree Types
// ============================================================================

/// Parsed executable document.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Document {
    /// Operations in document order.
    pub operations: Vec<Operation>,
    /// Fragment definitions keyed by name.
    pub fragments: BTreeMap<String, Fragment>,
}

/// One operation definition.
#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    /// Operation kind.
    pub kind: OperationKind,
    /// Author-chosen name.
    pub name: Option<String>,
    /// Declared variables.
    pub variables: Vec<VariableDefinition>,
    /// Operation directives.
    pub directives: Vec<Directive>,
    /// Top-level selections.
    pub selections: Vec<Selection>,
}

/// Named fragment definition.
#[derive(Debug, Clone, PartialEq)]
pub struct Fragment {
    /// Fragment name.
    pub name: String,
    /// Type the fragment applies to.
    pub type_condition: String,
    /// Fragment selections.
    pub selections: Vec<Selection>,
}

/// Variable declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableDefinition {
    /// Variable name without `$`.
    pub name: String,
    /// Declared type.
    pub var_type: TypeRef,
    /// Declared default.
    pub default_value: Option<Value>,
}

/// Directive application.
#[derive(Debug, Clone, PartialEq)]
pub struct Directive {
    /// Directive name without `@`.
    pub name: String,
    /// Directive arguments.
    pub arguments: Vec<Argument>,
}

/// Named argument.
#[derive(Debug, Clone, PartialEq)]
pub struct Argument {
    /// Argument name.
    pub name: String,
    /// Argument value.
    pub value: Value,
}

/// Selection within a selection set.
#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    /// Field selection.
    Field(Field),
    /// Named fragment spread.
    FragmentSpread(FragmentSpread),
    /// Inline fragment.
    InlineFragment(InlineFragment),
}

/// Field selection.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    /// Response alias.
    pub alias: Option<String>,
    /// Field name.
    pub name: String,
    /// Field arguments.
    pub arguments: Vec<Argument>,
    /// Field directives.
    pub directives: Vec<Directive>,
    /// Sub-selections.
    pub selections: Vec<Selection>,
}

/// Named fragment spread.
#[derive(Debug, Clone, PartialEq)]
pub struct FragmentSpread {
    /// Referenced fragment name.
    pub name: String,
    /// Spread directives.
    pub directives: Vec<Directive>,
}

/// Inline fragment.
#[derive(Debug, Clone, PartialEq)]
pub struct InlineFragment {
    /// Optional type condition.
    pub type_condition: Option<String>,
    /// Fragment directives.
    pub directives: Vec<Directive>,
    /// Fragment selections.
    pub selections: Vec<Selection>,
}

/// Input value literal.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Variable reference without `$`.
    Variable(String),
    /// Integer literal.
    Int(i64),
    /// Float literal.
    Float(f64),
    /// String literal.
    String(String),
    /// Boolean literal.
    Boolean(bool),
    /// Null literal.
    Null,
    /// Enum literal.
    Enum(String),
    /// List literal.
    List(Vec<Value>),
    /// Input object literal; keys are kept ordered.
    Object(BTreeMap<String, Value>),
}

impl Value {
    /// Returns true for `null`, `[]` and `{}`.
    #[must_use]
    pub fn is_absent(&self) -> bool {
        match self {
            Self::Null => true,
            Self::List(items) => items.is_empty(),
            Self::Object(fields) => fields.is_empty(),
            _ => false,
        }
    }
}

// ============================================================================
// SECTION: Parsing
// ============================================================================

/// Parses query text into an owned document.
///
/// # Errors
///
/// Returns [`NormalizeError::Parse`] when the text is not a valid executable
/// document or defines the same fragment twice.
pub fn parse_document(text: &str) -> Result<Document, NormalizeError> {
    let parsed =
        gql::parse_query::<String>(text).map_err(|err| NormalizeError::Parse(err.to_string()))?;
    let mut document = Document::default();
    for definition in parsed.definitions {
        match definition {
            gql::Definition::Operation(operation) => {
                document.operations.push(convert_operation(operation)?);
            }
            gql::Definition::Fragment(fragment) => {
                let fragment = convert_fragment(fragment)?;
                let name = fragment.name.clone();
                if document.fragments.insert(name.clone(), fragment).is_some() {
                    return Err(NormalizeError::Parse(format!("duplicate fragment {name}")));
                }
            }
        }
    }
    if document.operations.is_empty() {
        return Err(NormalizeError::Parse("document defines no operation".to_string()));
    }
    Ok(document)
}

/// Parses a standalone GraphQL value literal, such as a schema default.
///
/// Returns `None` when the text is not a constant literal.
#[must_use]
pub fn parse_value_literal(text: &str) -> Option<Value> {
    let source = format!("{{f(v:{text})}}");
    let parsed = gql::parse_query::<String>(&source).ok()?;
    let Some(gql::Definition::Operation(gql::OperationDefinition::SelectionSet(set))) =
        parsed.definitions.into_iter().next()
    else {
        return None;
    };
    let Some(gql::Selection::Field(field)) = set.items.into_iter().next() else {
        return None;
    };
    let (_, value) = field.arguments.into_iter().next()?;
    convert_value(value).ok()
}

// ============================================================================
// SECTION: Conversion
// ============================================================================

/// Converts an operation definition.
fn convert_operation(
    operation: gql::OperationDefinition<'_, String>,
) -> Result<Operation, NormalizeError> {
    let (kind, name, variables, directives, set) = match operation {
        gql::OperationDefinition::SelectionSet(set) => {
            (OperationKind::Query, None, Vec::new(), Vec::new(), set)
        }
        gql::OperationDefinition::Query(query) => (
            OperationKind::Query,
            query.name,
            query.variable_definitions,
            query.directives,
            query.selection_set,
        ),
        gql::OperationDefinition::Mutation(mutation) => (
            OperationKind::Mutation,
            mutation.name,
            mutation.variable_definitions,
            mutation.directives,
            mutation.selection_set,
        ),
        gql::OperationDefinition::Subscription(subscription) => (
            OperationKind::Subscription,
            subscription.name,
            subscription.variable_definitions,
            subscription.directives,
            subscription.selection_set,
        ),
    };
    Ok(Operation {
        kind,
        name,
        variables: variables
            .into_iter()
            .map(convert_variable_definition)
            .collect::<Result<_, _>>()?,
        directives: convert_directives(directives)?,
        selections: convert_selection_set(set)?,
    })
}

/// Converts a fragment definition; fragment-level directives are dropped.
fn convert_fragment(
    fragment: gql::FragmentDefinition<'_, String>,
) -> Result<Fragment, NormalizeError> {
    let gql::TypeCondition::On(type_condition) = fragment.type_condition;
    Ok(Fragment {
        name: fragment.name,
        type_condition,
        selections: convert_selection_set(fragment.selection_set)?,
    })
}

/// Converts a variable definition.
fn convert_variable_definition(
    definition: gql::VariableDefinition<'_, String>,
) -> Result<VariableDefinition, NormalizeError> {
    Ok(VariableDefinition {
        name: definition.name,
        var_type: convert_type(definition.var_type),
        default_value: definition.default_value.map(convert_value).transpose()?,
    })
}

/// Converts a type reference.
fn convert_type(var_type: gql::Type<'_, String>) -> TypeRef {
    match var_type {
        gql::Type::NamedType(name) => TypeRef::Named(name),
        gql::Type::ListType(inner) => TypeRef::List(Box::new(convert_type(*inner))),
        gql::Type::NonNullType(inner) => TypeRef::NonNull(Box::new(convert_type(*inner))),
    }
}

/// Converts a selection set.
fn convert_selection_set(
    set: gql::SelectionSet<'_, String>,
) -> Result<Vec<Selection>, NormalizeError> {
    set.items.into_iter().map(convert_selection).collect()
}

/// Converts one selection.
fn convert_selection(selection: gql::Selection<'_, String>) -> Result<Selection, NormalizeError> {
    Ok(match selection {
        gql::Selection::Field(field) => Selection::Field(Field {
            alias: field.alias,
            name: field.name,
            arguments: convert_arguments(field.arguments)?,
            directives: convert_directives(field.directives)?,
            selections: convert_selection_set(field.selection_set)?,
        }),
        gql::Selection::FragmentSpread(spread) => Selection::FragmentSpread(FragmentSpread {
            name: spread.fragment_name,
            directives: convert_directives(spread.directives)?,
        }),
        gql::Selection::InlineFragment(fragment) => Selection::InlineFragment(InlineFragment {
            type_condition: fragment.type_condition.map(|gql::TypeCondition::On(name)| name),
            directives: convert_directives(fragment.directives)?,
            selections: convert_selection_set(fragment.selection_set)?,
        }),
    })
}

/// Converts directive applications.
fn convert_directives(
    directives: Vec<gql::Directive<'_, String>>,
) -> Result<Vec<Directive>, NormalizeError> {
    directives
        .into_iter()
        .map(|directive| {
            Ok(Directive {
                name: directive.name,
                arguments: convert_arguments(directive.arguments)?,
            })
        })
        .collect()
}

/// Converts name/value argument pairs.
fn convert_arguments(
    arguments: Vec<(String, gql::Value<'_, String>)>,
) -> Result<Vec<Argument>, NormalizeError> {
    arguments
        .into_iter()
        .map(|(name, value)| {
            Ok(Argument {
                name,
                value: convert_value(value)?,
            })
        })
        .collect()
}

/// Converts a value literal.
fn convert_value(value: gql::Value<'_, String>) -> Result<Value, NormalizeError> {
    Ok(match value {
        gql::Value::Variable(name) => Value::Variable(name),
        gql::Value::Int(number) => Value::Int(
            number
                .as_i64()
                .ok_or_else(|| NormalizeError::Parse("integer literal out of range".to_string()))?,
        ),
        gql::Value::Float(number) => Value::Float(number),
        gql::Value::String(text) => Value::String(text),
        gql::Value::Boolean(flag) => Value::Boolean(flag),
        gql::Value::Null => Value::Null,
        gql::Value::Enum(name) => Value::Enum(name),
        gql::Value::List(items) => {
            Value::List(items.into_iter().map(convert_value).collect::<Result<_, _>>()?)
        }
        gql::Value::Object(fields) => Value::Object(
            fields
                .into_iter()
                .map(|(key, value)| Ok((key, convert_value(value)?)))
                .collect::<Result<_, NormalizeError>>()?,
        ),
    })
}
