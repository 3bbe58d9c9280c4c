//! Core types for records, documents and jobs.

mod document;
mod ids;
mod proptests;
mod record;

pub use document::{DocumentId, IndexDocument, PendingOp, VariantKey};
pub use ids::{JobId, RecordClass, RecordKey};
pub use record::{FieldValue, Record, RecordEvent};
