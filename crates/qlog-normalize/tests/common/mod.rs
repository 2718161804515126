// crates/qlog-normalize/tests/common/mod.rs
// ============================================================================
// Module: Common Test Fixtures
// Description: Schema fixtures shared by normalization tests.
// Purpose: Build introspection payloads without repeating JSON boilerplate.
// Dependencies: qlog-core, serde_json
// ============================================================================

//! ## Overview
//! A small token-style schema used across normalization tests:
//!
//! ```text
//! type Query {
//!   field(arg: Int, other: Int): Int
//!   tokens(first: Int = 100, skip: Int = 0, where: Token_filter, orderBy: Token_orderBy): [Token!]!
//!   token(id: ID!): Token
//! }
//! type Token { id: ID, name: String, owner(block: Int): Account }
//! type Account { id: ID }
//! input Token_filter { id_in: [ID!], name: String, owner_: Account_filter }
//! input Account_filter { id: ID }
//! ```
//!
//! A second schema exercises abstract types:
//!
//! ```text
//! type Query { search(text: String): [SearchResult!]!, node(id: ID!): Node }
//! union SearchResult = User | Post
//! interface Node { id: ID }
//! type User implements Node { id: ID, name: String, posts(first: Int = 10): [Post!]! }
//! type Post implements Node { id: ID, name: String, title(format: String): String }
//! ```

#![allow(dead_code, reason = "Shared test helpers may be unused in some cases.")]
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::unwrap_in_result,
    reason = "Test fixtures favor direct unwraps for setup clarity."
)]

use qlog_core::NormalizedQuery;
use qlog_core::Schema;
use qlog_normalize::normalize_query;
use serde_json::Value;
use serde_json::json;

// ============================================================================
// SECTION: Introspection Builders
// ============================================================================

/// Named type reference.
pub fn named(kind: &str, name: &str) -> Value {
    json!({"kind": kind, "name": name, "ofType": null})
}

/// Non-null wrapper.
pub fn non_null(inner: Value) -> Value {
    json!({"kind": "NON_NULL", "name": null, "ofType": inner})
}

/// List wrapper.
pub fn list(inner: Value) -> Value {
    json!({"kind": "LIST", "name": null, "ofType": inner})
}

/// Argument or input field declaration.
pub fn input_value(name: &str, type_ref: Value, default: Option<&str>) -> Value {
    json!({"name": name, "type": type_ref, "defaultValue": default})
}

/// Output field declaration.
pub fn field(name: &str, args: Vec<Value>, type_ref: Value) -> Value {
    json!({"name": name, "args": args, "type": type_ref})
}

/// Object type declaration.
pub fn object(name: &str, fields: Vec<Value>) -> Value {
    json!({"kind": "OBJECT", "name": name, "fields": fields, "inputFields": null})
}

/// Interface type declaration.
pub fn interface(name: &str, fields: Vec<Value>) -> Value {
    json!({"kind": "INTERFACE", "name": name, "fields": fields, "inputFields": null})
}

/// Input object type declaration.
pub fn input_object(name: &str, fields: Vec<Value>) -> Value {
    json!({"kind": "INPUT_OBJECT", "name": name, "fields": null, "inputFields": fields})
}

/// Leaf type declaration.
pub fn leaf(kind: &str, name: &str) -> Value {
    json!({"kind": kind, "name": name})
}

// ============================================================================
// SECTION: Fixture Schema
// ============================================================================

/// Introspection `data` object of the fixture schema.
pub fn token_introspection() -> Value {
    let int = || named("SCALAR", "Int");
    let id = || named("SCALAR", "ID");
    let types = vec![
        object("Query", vec![
            field(
                "field",
                vec![input_value("arg", int(), None), input_value("other", int(), None)],
                int(),
            ),
            field(
                "tokens",
                vec![
                    input_value("first", int(), Some("100")),
                    input_value("skip", int(), Some("0")),
                    input_value("where", named("INPUT_OBJECT", "Token_filter"), None),
                    input_value("orderBy", named("ENUM", "Token_orderBy"), None),
                ],
                non_null(list(non_null(named("OBJECT", "Token")))),
            ),
            field(
                "token",
                vec![input_value("id", non_null(id()), None)],
                named("OBJECT", "Token"),
            ),
        ]),
        object("Token", vec![
            field("id", Vec::new(), id()),
            field("name", Vec::new(), named("SCALAR", "String")),
            field("owner", vec![input_value("block", int(), None)], named("OBJECT", "Account")),
        ]),
        object("Account", vec![field("id", Vec::new(), id())]),
        input_object("Token_filter", vec![
            input_value("id_in", list(non_null(id())), None),
            input_value("name", named("SCALAR", "String"), None),
            input_value("owner_", named("INPUT_OBJECT", "Account_filter"), None),
        ]),
        input_object("Account_filter", vec![input_value("id", id(), None)]),
        leaf("ENUM", "Token_orderBy"),
        leaf("SCALAR", "Int"),
        leaf("SCALAR", "ID"),
        leaf("SCALAR", "String"),
        leaf("SCALAR", "Boolean"),
    ];
    json!({"__schema": {
        "queryType": {"name": "Query"},
        "mutationType": null,
        "subscriptionType": null,
        "types": types,
    }})
}

/// Fixture schema.
pub fn token_schema() -> Schema {
    Schema::from_introspection(&token_introspection()).unwrap()
}

/// Introspection `data` object of the abstract-type schema.
pub fn search_introspection() -> Value {
    let id = || named("SCALAR", "ID");
    let string = || named("SCALAR", "String");
    let types = vec![
        object("Query", vec![
            field(
                "search",
                vec![input_value("text", string(), None)],
                non_null(list(non_null(named("UNION", "SearchResult")))),
            ),
            field(
                "node",
                vec![input_value("id", non_null(id()), None)],
                named("INTERFACE", "Node"),
            ),
        ]),
        leaf("UNION", "SearchResult"),
        interface("Node", vec![field("id", Vec::new(), id())]),
        object("User", vec![
            field("id", Vec::new(), id()),
            field("name", Vec::new(), string()),
            field(
                "posts",
                vec![input_value("first", named("SCALAR", "Int"), Some("10"))],
                non_null(list(non_null(named("OBJECT", "Post")))),
            ),
        ]),
        object("Post", vec![
            field("id", Vec::new(), id()),
            field("name", Vec::new(), string()),
            field("title", vec![input_value("format", string(), None)], string()),
        ]),
        leaf("SCALAR", "Int"),
        leaf("SCALAR", "ID"),
        leaf("SCALAR", "String"),
        leaf("SCALAR", "Boolean"),
    ];
    json!({"__schema": {
        "queryType": {"name": "Query"},
        "mutationType": null,
        "subscriptionType": null,
        "types": types,
    }})
}

/// Abstract-type fixture schema.
pub fn search_schema() -> Schema {
    Schema::from_introspection(&search_introspection()).unwrap()
}

// ============================================================================
// SECTION: Normalization Helpers
// ============================================================================

/// Normalizes against the fixture schema, panicking on failure.
pub fn normalize(query: &str, variables: &Value) -> Vec<NormalizedQuery> {
    normalize_query(query, variables, Some(&token_schema())).unwrap()
}

/// Normalizes a query expected to have exactly one root.
pub fn normalize_single(query: &str, variables: &Value) -> NormalizedQuery {
    let mut entries = normalize(query, variables);
    assert_eq!(entries.len(), 1, "expected one root query for {query}");
    entries.remove(0)
}

/// Returns the skeleton of a single-root query against the abstract-type schema.
pub fn search_skeleton(query: &str) -> String {
    let mut entries = normalize_query(query, &Value::Null, Some(&search_schema())).unwrap();
    assert_eq!(entries.len(), 1, "expected one root query for {query}");
    entries.remove(0).skeleton
}

/// Builds a chain of fragments `F0 .. F{depth}` on `type_name`; each level
/// expands `template` with `{next}` bound to the next spread, and the last
/// holds `innermost`.
pub fn fragment_chain(type_name: &str, depth: usize, template: &str, innermost: &str) -> String {
    let mut text = String::new();
    for level in 0 .. depth {
        let next = format!("...F{}", level + 1);
        let body = template.replace("{next}", &next);
        text.push_str(&format!("fragment F{level} on {type_name} {{ {body} }} "));
    }
    text.push_str(&format!("fragment F{depth} on {type_name} {{ {innermost} }}"));
    text
}

/// Returns only the skeleton of a single-root query.
pub fn skeleton(query: &str) -> String {
    normalize_single(query, &Value::Null).skeleton
}
