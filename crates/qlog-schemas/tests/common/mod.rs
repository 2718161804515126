// crates/qlog-schemas/tests/common/mod.rs
// ============================================================================
// Module: Common Test Fixtures
// Description: Stub GraphQL endpoints and fixture schemas for schema tests.
// Purpose: Serve canned responses over real HTTP from a background thread.
// Dependencies: qlog-core, serde_json, tiny_http
// ============================================================================

//! ## Overview
//! [`StubServer`] answers a fixed number of requests with a handler and
//! records each request's path and body for later assertions.

#![allow(dead_code, reason = "Shared test helpers may be unused in some cases.")]
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::unwrap_in_result,
    reason = "Test fixtures favor direct unwraps for setup clarity."
)]

use std::io::Read;
use std::thread;
use std::thread::JoinHandle;

use qlog_core::DatasetId;
use serde_json::Value;
use serde_json::json;
use tiny_http::Header;
use tiny_http::Response;
use tiny_http::Server;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

/// First fixture dataset.
pub const DATASET_A: &str = "QmaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaA";
/// Second fixture dataset.
pub const DATASET_B: &str = "QmbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbB";

/// Parses a fixture dataset id.
pub fn dataset(id: &str) -> DatasetId {
    DatasetId::parse(id).unwrap()
}

/// Introspection `data` object of a one-field schema.
pub fn tiny_introspection() -> Value {
    json!({"__schema": {
        "queryType": {"name": "Query"},
        "mutationType": null,
        "subscriptionType": null,
        "types": [
            {"kind": "OBJECT", "name": "Query", "fields": [
                {"name": "field", "args": [
                    {"name": "arg", "type": {"kind": "SCALAR", "name": "Int", "ofType": null}, "defaultValue": null}
                ], "type": {"kind": "SCALAR", "name": "Int", "ofType": null}}
            ], "inputFields": null},
            {"kind": "SCALAR", "name": "Int"}
        ]
    }})
}

// ============================================================================
// SECTION: Stub Server
// ============================================================================

/// Request captured by the stub server.
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    /// Request method.
    pub method: String,
    /// Request path.
    pub path: String,
    /// Request body.
    pub body: String,
}

/// Stub GraphQL endpoint serving a fixed number of requests.
pub struct StubServer {
    /// Base URL, without trailing slash.
    pub base_url: String,
    /// Server thread returning captured requests.
    handle: JoinHandle<Vec<CapturedRequest>>,
}

impl StubServer {
    /// Starts a server answering `requests` requests with `handler`.
    pub fn start<F>(requests: usize, handler: F) -> Self
    where
        F: Fn(&CapturedRequest) -> (u16, String) + Send + 'static,
    {
        let server = Server::http("127.0.0.1:0").unwrap();
        let addr = server.server_addr().to_ip().unwrap();
        let handle = thread::spawn(move || {
            let mut captured = Vec::new();
            for _ in 0 .. requests {
                let Ok(mut request) = server.recv() else {
                    break;
                };
                let mut body = String::new();
                let _ = request.as_reader().read_to_string(&mut body);
                let seen = CapturedRequest {
                    method: request.method().to_string(),
                    path: request.url().to_string(),
                    body,
                };
                let (status, payload) = handler(&seen);
                let header =
                    Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..]).unwrap();
                let response =
                    Response::from_string(payload).with_status_code(status).with_header(header);
                let _ = request.respond(response);
                captured.push(seen);
            }
            captured
        });
        Self {
            base_url: format!("http://{addr}"),
            handle,
        }
    }

    /// Waits for the server to finish and returns the captured requests.
    pub fn finish(self) -> Vec<CapturedRequest> {
        self.handle.join().unwrap()
    }
}

/// Wraps a `data` object in a GraphQL response body.
pub fn data_body(data: &Value) -> String {
    json!({ "data": data }).to_string()
}

/// Builds a GraphQL error response body.
pub fn error_body(message: &str) -> String {
    json!({ "data": null, "errors": [{ "message": message }] }).to_string()
}
