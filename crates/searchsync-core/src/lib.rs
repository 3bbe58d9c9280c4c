#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! searchsync core library
//!
//! Shared types for keeping a full-text search index synchronized with
//! host-managed content records: record and document identities, the error
//! taxonomy, the host schema probe and the logging factory.

pub mod error;
pub mod host;
pub mod logging;
pub mod types;

// Re-exports for convenience
pub use error::{Error, Result, TransportError, TransportErrorKind};
pub use host::{Capability, ClassInfo, HostSchema, StaticHostSchema};
pub use logging::{
    CapturingLogFactory, LogLevel, LogLine, SearchLogFactory, SearchLogger, TracingLogFactory,
};
pub use types::{
    DocumentId, FieldValue, IndexDocument, JobId, PendingOp, Record, RecordClass, RecordEvent,
    RecordKey, VariantKey,
};
