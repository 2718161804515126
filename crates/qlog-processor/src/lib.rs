// crates/qlog-processor/src/lib.rs
// ============================================================================
// Module: Query Log Processor Library
// Description: Per-record processing, ingestion loop and fee telemetry.
// Purpose: Turn transport messages into persisted fingerprints and fee totals.
// Dependencies: qlog-core, qlog-normalize, tiny_http, tracing
// ============================================================================

//! ## Overview
//! [`RecordProcessor`] runs one transport message through decoding, schema
//! resolution, canonicalization and storage. [`IngestLoop`] pulls messages
//! from a [`DropOldestQueue`] one at a time until it is asked to stop, the
//! source is exhausted, or a record fails fatally. [`FeeCounter`] keeps the
//! per-dataset fee totals that [`MetricsExporter`] serves.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod ingest;
pub mod process;
pub mod queue;
pub mod telemetry;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use ingest::IngestError;
pub use ingest::IngestLoop;
pub use ingest::IngestState;
pub use ingest::IngestSummary;
pub use ingest::ShutdownSignal;
pub use process::Disposition;
pub use process::ProcessError;
pub use process::ProcessOutcome;
pub use process::RecordProcessor;
pub use queue::DropOldestQueue;
pub use queue::Pop;
pub use queue::spawn_line_reader;
pub use telemetry::FeeCounter;
pub use telemetry::MetricsExporter;
pub use telemetry::TelemetryError;
