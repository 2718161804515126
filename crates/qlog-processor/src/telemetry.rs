// crates/qlog-processor/src/telemetry.rs
// ============================================================================
// Module: Fee Telemetry
// Description: Per-dataset fee counter and its Prometheus text exporter.
// Purpose: Expose collected query fees without a metrics framework dependency.
// Dependencies: qlog-core, thiserror, tiny_http, tracing
// ============================================================================

//! ## Overview
//! [`FeeCounter`] is the [`FeeMetrics`] sink used by the record processor. It
//! keeps a monotonically increasing total per dataset and renders them in
//! the Prometheus text exposition format. [`MetricsExporter`] serves that text
//! at `/metrics` from a background thread.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;
use std::thread;
use std::thread::JoinHandle;

use qlog_core::DatasetId;
use qlog_core::FeeMetrics;
use thiserror::Error;
use tiny_http::Header;
use tiny_http::Method;
use tiny_http::Response;
use tiny_http::Server;
use tracing::debug;
use tracing::info;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Counter metric name.
pub const FEES_METRIC_NAME: &str = "qlog_dataset_fees_total";
/// Path the exporter serves.
pub const METRICS_PATH: &str = "/metrics";
/// Prometheus text exposition content type.
const EXPOSITION_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

// ============================================================================
// SECTION: Fee Counter
// ============================================================================

/// Monotonic per-dataset fee totals.
///
/// # Invariants
/// - Totals never decrease; additions saturate at `u128::MAX`.
#[derive(Debug, Default)]
pub struct FeeCounter {
    /// Totals keyed by dataset.
    totals: Mutex<BTreeMap<DatasetId, u128>>,
}

impl FeeCounter {
    /// Creates an empty counter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total recorded for a dataset.
    #[must_use]
    pub fn total(&self, dataset: &DatasetId) -> u128 {
        self.lock().get(dataset).copied().unwrap_or(0)
    }

    /// Returns a snapshot of every dataset total.
    #[must_use]
    pub fn snapshot(&self) -> BTreeMap<DatasetId, u128> {
        self.lock().clone()
    }

    /// Renders the totals in Prometheus text exposition format.
    #[must_use]
    pub fn render_prometheus(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "# HELP {FEES_METRIC_NAME} Query fees collected per dataset.");
        let _ = writeln!(out, "# TYPE {FEES_METRIC_NAME} counter");
        // Dataset ids are alphanumeric, so label values need no escaping.
        for (dataset, total) in self.lock().iter() {
            let _ = writeln!(out, "{FEES_METRIC_NAME}{{dataset=\"{dataset}\"}} {total}");
        }
        out
    }

    /// Locks the totals, recovering from poisoning.
    fn lock(&self) -> MutexGuard<'_, BTreeMap<DatasetId, u128>> {
        self.totals.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl FeeMetrics for FeeCounter {
    fn record_fees(&self, dataset: &DatasetId, fees: u128) {
        let mut totals = self.lock();
        let total = totals.entry(dataset.clone()).or_insert(0);
        *total = total.saturating_add(fees);
    }
}

// ============================================================================
// SECTION: Exporter
// ============================================================================

/// Metrics exporter errors.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The listen socket could not be bound.
    #[error("metrics exporter bind failed on {addr}: {message}")]
    Bind {
        /// Requested listen address.
        addr: SocketAddr,
        /// Underlying failure.
        message: String,
    },
}

/// Background HTTP server exposing the fee counter.
pub struct MetricsExporter {
    /// Listening server shared with the serving thread.
    server: Arc<Server>,
    /// Serving thread.
    handle: Option<JoinHandle<()>>,
}

impl MetricsExporter {
    /// Binds the exporter and starts serving on a background thread.
    ///
    /// # Errors
    ///
    /// Returns [`TelemetryError::Bind`] when the address cannot be bound.
    pub fn start(addr: SocketAddr, counter: Arc<FeeCounter>) -> Result<Self, TelemetryError> {
        let server = Server::http(addr).map_err(|err| TelemetryError::Bind {
            addr,
            message: err.to_string(),
        })?;
        let server = Arc::new(server);
        let serving = Arc::clone(&server);
        let handle = thread::spawn(move || serve(&serving, &counter));
        info!(addr = %addr, path = METRICS_PATH, "metrics exporter listening");
        Ok(Self {
            server,
            handle: Some(handle),
        })
    }

    /// Returns the bound address, when listening on IP.
    #[must_use]
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.server.server_addr().to_ip()
    }

    /// Stops serving and joins the background thread.
    pub fn shutdown(mut self) {
        self.stop();
    }

    /// Unblocks the server and joins the serving thread.
    fn stop(&mut self) {
        self.server.unblock();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for MetricsExporter {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Answers requests until the server is unblocked.
fn serve(server: &Server, counter: &FeeCounter) {
    for request in server.incoming_requests() {
        let is_metrics = *request.method() == Method::Get
            && request.url().split('?').next() == Some(METRICS_PATH);
        let result = if is_metrics {
            let mut response = Response::from_data(counter.render_prometheus().into_bytes());
            if let Ok(header) =
                Header::from_bytes(&b"Content-Type"[..], EXPOSITION_CONTENT_TYPE.as_bytes())
            {
                response = response.with_header(header);
            }
            request.respond(response)
        } else {
            request.respond(Response::from_string("not found").with_status_code(404))
        };
        if let Err(err) = result {
            debug!(error = %err, "metrics response failed");
        }
    }
}
