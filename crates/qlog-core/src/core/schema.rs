// crates/qlog-core/src/core/schema.rs
// ============================================================================
// Module: Dataset Schema Model
// Description: Typed query schema built from a standard introspection result.
// Purpose: Answer field, argument and input-field lookups during normalization.
// Dependencies: serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! The schema keeps only what normalization needs: root operation types,
//! object and interface fields with their arguments, input-object fields, and
//! type references. Default values are kept in their GraphQL literal text form
//! exactly as introspection reports them.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Schema construction errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// Introspection payload does not have the standard shape.
    #[error("malformed introspection result: {0}")]
    Malformed(String),
    /// Introspection payload references a type it does not define.
    #[error("introspection root type missing: {0}")]
    MissingRootType(String),
}

// ============================================================================
// SECTION: Schema Types
// ============================================================================

/// Operation kinds with a root type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    /// Query operation.
    Query,
    /// Mutation operation.
    Mutation,
    /// Subscription operation.
    Subscription,
}

/// Introspection type kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    /// Scalar type.
    Scalar,
    /// Object type.
    Object,
    /// Interface type.
    Interface,
    /// Union type.
    Union,
    /// Enum type.
    Enum,
    /// Input object type.
    InputObject,
}

/// Reference to a (possibly wrapped) named type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeRef {
    /// Named type.
    Named(String),
    /// List of the inner type.
    List(Box<TypeRef>),
    /// Non-null inner type.
    NonNull(Box<TypeRef>),
}

impl TypeRef {
    /// Returns the innermost named type.
    #[must_use]
    pub fn named_type(&self) -> &str {
        match self {
            Self::Named(name) => name,
            Self::List(inner) | Self::NonNull(inner) => inner.named_type(),
        }
    }
}

/// Argument or input-object field declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputValueDef {
    /// Declared name.
    pub name: String,
    /// Declared type.
    pub type_ref: TypeRef,
    /// Default value as GraphQL literal text.
    pub default_value: Option<String>,
}

/// Output field declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDef {
    /// Field name.
    pub name: String,
    /// Declared arguments keyed by name.
    pub args: BTreeMap<String, InputValueDef>,
    /// Return type.
    pub type_ref: TypeRef,
}

/// Named type declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaType {
    /// Type name.
    pub name: String,
    /// Type kind.
    pub kind: TypeKind,
    /// Output fields keyed by name (objects and interfaces).
    pub fields: BTreeMap<String, FieldDef>,
    /// Input fields keyed by name (input objects).
    pub input_fields: BTreeMap<String, InputValueDef>,
}

/// Typed query schema of one dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    /// Query root type name.
    query_type: String,
    /// Mutation root type name.
    mutation_type: Option<String>,
    /// Subscription root type name.
    subscription_type: Option<String>,
    /// Named types keyed by name.
    types: BTreeMap<String, SchemaType>,
}

impl Schema {
    /// Builds a schema from the `data` object of an introspection response.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError`] when the payload is not a standard introspection result.
    pub fn from_introspection(data: &Value) -> Result<Self, SchemaError> {
        let raw = RawData::deserialize(data)
            .map_err(|err| SchemaError::Malformed(err.to_string()))?
            .schema;
        let mut types = BTreeMap::new();
        for raw_type in raw.types {
            if let Some(schema_type) = raw_type.into_schema_type()? {
                types.insert(schema_type.name.clone(), schema_type);
            }
        }
        let query_type = raw.query_type.name;
        if !types.contains_key(&query_type) {
            return Err(SchemaError::MissingRootType(query_type));
        }
        Ok(Self {
            query_type,
            mutation_type: raw.mutation_type.map(|root| root.name),
            subscription_type: raw.subscription_type.map(|root| root.name),
            types,
        })
    }

    /// Returns the root type for an operation kind.
    #[must_use]
    pub fn root_type(&self, kind: OperationKind) -> Option<&SchemaType> {
        let name = match kind {
            OperationKind::Query => Some(&self.query_type),
            OperationKind::Mutation => self.mutation_type.as_ref(),
            OperationKind::Subscription => self.subscription_type.as_ref(),
        }?;
        self.types.get(name)
    }

    /// Returns a named type.
    #[must_use]
    pub fn type_named(&self, name: &str) -> Option<&SchemaType> {
        self.types.get(name)
    }

    /// Returns the named type a field returns.
    #[must_use]
    pub fn field_type(&self, field: &FieldDef) -> Option<&SchemaType> {
        self.type_named(field.type_ref.named_type())
    }

    /// Returns the number of named types.
    #[must_use]
    pub fn type_count(&self) -> usize {
        self.types.len()
    }
}

// ============================================================================
// SECTION: Introspection Wire Types
// ============================================================================

/// Introspection `data` object.
#[derive(Debug, Deserialize)]
struct RawData {
    /// The `__schema` field.
    #[serde(rename = "__schema")]
    schema: RawSchema,
}

/// Introspection `__schema` object.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSchema {
    /// Query root reference.
    query_type: RawRootRef,
    /// Mutation root reference.
    #[serde(default)]
    mutation_type: Option<RawRootRef>,
    /// Subscription root reference.
    #[serde(default)]
    subscription_type: Option<RawRootRef>,
    /// All named types.
    types: Vec<RawType>,
}

/// Root operation type reference.
#[derive(Debug, Deserialize)]
struct RawRootRef {
    /// Root type name.
    name: String,
}

/// Introspection `__Type` entry.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawType {
    /// Type kind label.
    kind: String,
    /// Type name.
    #[serde(default)]
    name: Option<String>,
    /// Output fields.
    #[serde(default)]
    fields: Option<Vec<RawField>>,
    /// Input fields.
    #[serde(default)]
    input_fields: Option<Vec<RawInputValue>>,
}

/// Introspection `__Field` entry.
#[derive(Debug, Deserialize)]
struct RawField {
    /// Field name.
    name: String,
    /// Field arguments.
    #[serde(default)]
    args: Vec<RawInputValue>,
    /// Return type reference.
    #[serde(rename = "type")]
    type_ref: RawTypeRef,
}

/// Introspection `__InputValue` entry.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawInputValue {
    /// Value name.
    name: String,
    /// Value type reference.
    #[serde(rename = "type")]
    type_ref: RawTypeRef,
    /// Default value literal.
    #[serde(default)]
    default_value: Option<String>,
}

/// Introspection type reference chain.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTypeRef {
    /// Type kind label.
    kind: String,
    /// Named type (leaf of the chain).
    #[serde(default)]
    name: Option<String>,
    /// Wrapped type.
    #[serde(default)]
    of_type: Option<Box<RawTypeRef>>,
}

impl RawType {
    /// Converts a raw type; unnamed or unknown kinds are skipped.
    fn into_schema_type(self) -> Result<Option<SchemaType>, SchemaError> {
        let Some(name) = self.name else {
            return Ok(None);
        };
        let kind = match self.kind.as_str() {
            "SCALAR" => TypeKind::Scalar,
            "OBJECT" => TypeKind::Object,
            "INTERFACE" => TypeKind::Interface,
            "UNION" => TypeKind::Union,
            "ENUM" => TypeKind::Enum,
            "INPUT_OBJECT" => TypeKind::InputObject,
            _ => return Ok(None),
        };
        let mut fields = BTreeMap::new();
        for raw_field in self.fields.unwrap_or_default() {
            let mut args = BTreeMap::new();
            for raw_arg in raw_field.args {
                let arg = raw_arg.into_input_value()?;
                args.insert(arg.name.clone(), arg);
            }
            fields.insert(
                raw_field.name.clone(),
                FieldDef {
                    name: raw_field.name,
                    args,
                    type_ref: raw_field.type_ref.into_type_ref()?,
                },
            );
        }
        let mut input_fields = BTreeMap::new();
        for raw_input in self.input_fields.unwrap_or_default() {
            let input = raw_input.into_input_value()?;
            input_fields.insert(input.name.clone(), input);
        }
        Ok(Some(SchemaType {
            name,
            kind,
            fields,
            input_fields,
        }))
    }
}

impl RawInputValue {
    /// Converts a raw input value declaration.
    fn into_input_value(self) -> Result<InputValueDef, SchemaError> {
        Ok(InputValueDef {
            name: self.name,
            type_ref: self.type_ref.into_type_ref()?,
            default_value: self.default_value,
        })
    }
}

impl RawTypeRef {
    /// Converts a raw type reference chain.
    fn into_type_ref(self) -> Result<TypeRef, SchemaError> {
        match self.kind.as_str() {
            "NON_NULL" => Ok(TypeRef::NonNull(Box::new(self.wrapped()?))),
            "LIST" => Ok(TypeRef::List(Box::new(self.wrapped()?))),
            _ => self
                .name
                .map(TypeRef::Named)
                .ok_or_else(|| SchemaError::Malformed("named type reference without name".into())),
        }
    }

    /// Converts the wrapped reference of a list or non-null wrapper.
    fn wrapped(self) -> Result<TypeRef, SchemaError> {
        self.of_type
            .ok_or_else(|| SchemaError::Malformed("wrapper type reference without ofType".into()))?
            .into_type_ref()
    }
}
