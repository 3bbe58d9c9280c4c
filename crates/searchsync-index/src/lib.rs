//! Search index definitions, writers and the engine client for searchsync.
//!
//! - [`SearchIndex`] / [`IndexDefinition`]: what an index covers and how
//!   records become documents
//! - [`IndexWriter`]: where documents go ([`SolrIndex`], [`RecordingIndex`])
//! - [`SearchTransport`] / [`SolrService`]: the engine client, routed
//!   through two raw primitives ([`HttpTransport`], [`RecordingTransport`])

pub mod configured;
pub mod definition;
pub mod failure;
pub mod http;
pub mod memory;
pub mod recording;
pub mod service;
pub mod set;
pub mod transport;
pub mod writer;

pub use configured::{ClassEntry, ConfiguredIndex, FieldConfig, IndexConfig};
pub use definition::{
    FieldKind, FieldRole, FieldSource, FieldSpec, IndexDefinition, IndexedClass, SchemaBuilder,
    SearchIndex,
};
pub use failure::FailurePlan;
pub use http::HttpTransport;
pub use memory::{IndexOp, RecordingIndex};
pub use recording::{Method, RecordedRequest, RecordingTransport};
pub use service::{CommitMode, SolrConfig, SolrService};
pub use set::IndexSet;
pub use transport::{CONTENT_TYPE_JSON, RawResponse, SearchTransport};
pub use writer::{IndexWriter, KeyRange, SolrIndex};
