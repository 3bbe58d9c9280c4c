//! Common test utilities and harness for reindex integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use searchsync_core::{
    Capability, CapturingLogFactory, HostSchema, IndexDocument, Record, StaticHostSchema,
};
use searchsync_index::{
    FieldKind, IndexDefinition, IndexSet, RecordingIndex, SchemaBuilder, SearchIndex,
};
use searchsync_reindex::{
    JobQueue, MemoryJobQueue, MemoryRecordSource, ReindexConfig, ReindexRunner, ReindexScheduler,
    RetryPolicy,
};
use searchsync_updater::DocumentPlanner;
use searchsync_variants::{VariantConfig, VariantRegistry};

/// Pages (via `SiteTree`) and files.
pub struct MainIndex;

impl SearchIndex for MainIndex {
    fn name(&self) -> &str {
        "main"
    }

    fn init(&self, schema: &mut SchemaBuilder) {
        schema
            .add_class("SiteTree", true)
            .add_class("File", false)
            .add_fulltext_field("Title")
            .add_filter_field("Sort", FieldKind::Int);
    }
}

/// Host with versioned pages, optionally multi-site, and plain files.
pub fn host(subsites: bool) -> StaticHostSchema {
    let host = StaticHostSchema::new()
        .with_class("SiteTree")
        .with_subclass("Page", "SiteTree")
        .with_class("File")
        .with_capability("SiteTree", Capability::Versioned);
    if subsites {
        host.with_capability("SiteTree", Capability::Subsites)
    } else {
        host
    }
}

/// Batches of `batch_size`, immediate retries, no slice budget.
pub fn config(batch_size: usize) -> ReindexConfig {
    ReindexConfig::default()
        .with_batch_size(batch_size)
        .with_retry(RetryPolicy::immediate(3))
        .with_slice(0, 0)
}

/// Test harness wiring a scheduler to in-memory records and index.
pub struct TestHarness {
    /// Records the jobs walk
    pub source: Arc<MemoryRecordSource>,
    /// Where documents land
    pub index: Arc<RecordingIndex>,
    /// Job state storage
    pub queue: Arc<dyn JobQueue>,
    /// Captured job logs
    pub logs: CapturingLogFactory,
    /// The scheduler under test
    pub scheduler: Arc<ReindexScheduler>,
}

impl TestHarness {
    /// Single-site host, in-memory queue.
    pub fn new(config: ReindexConfig) -> Self {
        Self::build(config, false, Arc::new(MemoryJobQueue::new()))
    }

    /// Multi-site host, in-memory queue.
    pub fn with_subsites(config: ReindexConfig) -> Self {
        Self::build(config, true, Arc::new(MemoryJobQueue::new()))
    }

    /// Single-site host over a caller-provided queue.
    pub fn with_queue(config: ReindexConfig, queue: Arc<dyn JobQueue>) -> Self {
        Self::build(config, false, queue)
    }

    /// Multi-site host whose subsite variant reads `field`.
    pub fn with_subsite_field(config: ReindexConfig, field: &str) -> Self {
        let variants = VariantConfig {
            subsites: true,
            subsite_field: field.to_string(),
            ..Default::default()
        };
        Self::build_with(config, variants, Arc::new(MemoryJobQueue::new()))
    }

    fn build(config: ReindexConfig, subsites: bool, queue: Arc<dyn JobQueue>) -> Self {
        let variants = VariantConfig {
            subsites,
            ..Default::default()
        };
        Self::build_with(config, variants, queue)
    }

    fn build_with(
        config: ReindexConfig,
        variant_config: VariantConfig,
        queue: Arc<dyn JobQueue>,
    ) -> Self {
        let host: Arc<dyn HostSchema> = Arc::new(host(variant_config.subsites));
        let variants = Arc::new(VariantRegistry::from_config(host.clone(), &variant_config));
        let source = Arc::new(MemoryRecordSource::new(host.clone()));
        let index = Arc::new(RecordingIndex::new(
            IndexDefinition::from_index(&MainIndex).expect("valid index"),
        ));
        let logs = CapturingLogFactory::new();
        let runner = ReindexRunner::new(
            source.clone(),
            IndexSet::new().with(index.clone()).expect("single index"),
            Arc::new(DocumentPlanner::new(host, variants)),
            config,
        )
        .with_logs(Arc::new(logs.clone()));
        let scheduler = Arc::new(ReindexScheduler::new(runner, queue.clone()));
        Self {
            source,
            index,
            queue,
            logs,
            scheduler,
        }
    }

    /// Adds published pages with the given keys.
    pub fn add_pages(&self, keys: impl IntoIterator<Item = u64>) {
        for key in keys {
            self.source.insert(page(key));
        }
    }

    /// Engine keys of every stored document.
    pub fn engine_keys(&self) -> Vec<String> {
        self.index
            .documents()
            .iter()
            .map(|d| d.id.engine_key())
            .collect()
    }

    /// Stored documents of one record.
    pub fn documents_of(&self, key: u64) -> Vec<IndexDocument> {
        self.index
            .documents()
            .into_iter()
            .filter(|d| d.id.key.get() == key)
            .collect()
    }
}

/// A published page.
pub fn page(key: u64) -> Record {
    Record::new("Page", key)
        .with_field("Title", format!("Page {key}"))
        .with_field("Sort", key as i64)
        .with_field("published", true)
}

/// A draft page.
pub fn draft(key: u64) -> Record {
    Record::new("Page", key)
        .with_field("Title", format!("Draft {key}"))
        .with_field("published", false)
}

/// A file record.
pub fn file(key: u64) -> Record {
    Record::new("File", key).with_field("Title", format!("file-{key}.pdf"))
}
