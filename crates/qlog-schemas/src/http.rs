// crates/qlog-schemas/src/http.rs
// ============================================================================
// Module: GraphQL Over HTTP
// Description: Bounded GraphQL POST requests with failure classification.
// Purpose: Share request plumbing between introspection and discovery.
// Dependencies: reqwest, serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! Requests are blocking POSTs with a total timeout, a fixed user agent and
//! redirects disabled. Response bodies are read under a hard byte limit.
//! Failures fall into three classes: the endpoint could not be reached
//! (transport), the endpoint answered with a GraphQL or HTTP client error
//! (rejected), or the endpoint answered with something that is not a GraphQL
//! response (invalid). Server errors (5xx) count as transport failures.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Read;
use std::time::Duration;

use reqwest::Url;
use reqwest::blocking::Client;
use reqwest::blocking::Response;
use reqwest::header::CONTENT_TYPE;
use reqwest::redirect::Policy;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Classified GraphQL request failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphqlFailure {
    /// Endpoint unreachable, timed out, or failing server-side.
    #[error("graphql transport failure: {0}")]
    Transport(String),
    /// Endpoint answered with an error.
    #[error("graphql request rejected: {0}")]
    Rejected(String),
    /// Endpoint answered with a malformed response.
    #[error("graphql response invalid: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Wire Types
// ============================================================================

/// GraphQL response envelope.
#[derive(Debug, Deserialize)]
struct GraphqlEnvelope {
    /// Result data.
    #[serde(default)]
    data: Option<Value>,
    /// Reported errors.
    #[serde(default)]
    errors: Option<Vec<GraphqlErrorEntry>>,
}

/// One reported GraphQL error.
#[derive(Debug, Deserialize)]
struct GraphqlErrorEntry {
    /// Error message.
    #[serde(default)]
    message: String,
}

// ============================================================================
// SECTION: Client
// ============================================================================

/// Builds a blocking client with timeout, user agent and no redirects.
///
/// # Errors
///
/// Returns [`GraphqlFailure::Transport`] when the client cannot be built.
pub fn build_http_client(timeout_ms: u64, user_agent: &str) -> Result<Client, GraphqlFailure> {
    Client::builder()
        .timeout(Duration::from_millis(timeout_ms))
        .user_agent(user_agent.to_string())
        .redirect(Policy::none())
        .build()
        .map_err(|_| GraphqlFailure::Transport("http client build failed".to_string()))
}

/// Posts a GraphQL request and returns its `data` object.
///
/// # Errors
///
/// Returns [`GraphqlFailure`] classified as described in the module overview.
pub fn post_graphql(
    client: &Client,
    url: &Url,
    request: &Value,
    max_response_bytes: usize,
) -> Result<Value, GraphqlFailure> {
    let payload = serde_json::to_vec(request)
        .map_err(|err| GraphqlFailure::Invalid(format!("request encoding failed: {err}")))?;
    let mut response = client
        .post(url.clone())
        .header(CONTENT_TYPE, "application/json")
        .body(payload)
        .send()
        .map_err(|err| GraphqlFailure::Transport(err.to_string()))?;
    let status = response.status();
    if status.is_server_error() {
        return Err(GraphqlFailure::Transport(format!("http status {}", status.as_u16())));
    }
    let body = read_response_limited(&mut response, max_response_bytes)?;
    if !status.is_success() {
        return Err(GraphqlFailure::Rejected(format!("http status {}", status.as_u16())));
    }
    let envelope: GraphqlEnvelope =
        serde_json::from_slice(&body).map_err(|err| GraphqlFailure::Invalid(err.to_string()))?;
    if let Some(errors) = envelope.errors
        && let Some(first) = errors.first()
    {
        return Err(GraphqlFailure::Rejected(first.message.clone()));
    }
    envelope.data.ok_or_else(|| GraphqlFailure::Invalid("response has no data".to_string()))
}

/// Reads the response body while enforcing a byte limit.
fn read_response_limited(
    response: &mut Response,
    max_bytes: usize,
) -> Result<Vec<u8>, GraphqlFailure> {
    let max_bytes_u64 = u64::try_from(max_bytes)
        .map_err(|_| GraphqlFailure::Invalid("response size limit exceeds u64".to_string()))?;
    if let Some(expected) = response.content_length()
        && expected > max_bytes_u64
    {
        return Err(GraphqlFailure::Invalid("response exceeds size limit".to_string()));
    }
    let mut buf = Vec::new();
    response
        .take(max_bytes_u64.saturating_add(1))
        .read_to_end(&mut buf)
        .map_err(|_| GraphqlFailure::Transport("failed to read response".to_string()))?;
    if buf.len() > max_bytes {
        return Err(GraphqlFailure::Invalid("response exceeds size limit".to_string()));
    }
    Ok(buf)
}
