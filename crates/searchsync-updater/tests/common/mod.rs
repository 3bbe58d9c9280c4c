//! Common test utilities and harness for updater integration tests.

use std::sync::Arc;

use searchsync_core::{Capability, HostSchema, Record, StaticHostSchema};
use searchsync_index::{
    CommitMode, FieldKind, IndexDefinition, IndexSet, RecordingTransport, SchemaBuilder,
    SearchIndex, SolrConfig, SolrIndex, SolrService,
};
use searchsync_updater::{DocumentPlanner, SearchUpdater, UpdaterConfig};
use searchsync_variants::{VariantConfig, VariantRegistry};

/// The content index used throughout: pages (via `SiteTree`) and files.
pub struct MainIndex;

impl SearchIndex for MainIndex {
    fn name(&self) -> &str {
        "main"
    }

    fn init(&self, schema: &mut SchemaBuilder) {
        schema
            .add_class("SiteTree", true)
            .add_class("File", true)
            .add_fulltext_field("Title")
            .add_derived_fulltext("Body", ["Summary", "Content"])
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

/// Test harness wiring an updater to a recording transport.
pub struct TestHarness {
    /// Captures every engine request
    pub transport: Arc<RecordingTransport>,
    /// The updater under test
    pub updater: SearchUpdater,
}

impl TestHarness {
    /// Production settings: commit flushes.
    pub fn new() -> Self {
        Self::with_config(UpdaterConfig::default(), false)
    }

    /// Test mode: commit discards.
    pub fn test_mode() -> Self {
        Self::with_config(UpdaterConfig::test_mode(), false)
    }

    /// Production settings on a multi-site host.
    pub fn with_subsites() -> Self {
        Self::with_config(UpdaterConfig::default(), true)
    }

    /// Custom settings.
    pub fn with_config(config: UpdaterConfig, subsites: bool) -> Self {
        let host: Arc<dyn HostSchema> = Arc::new(host(subsites));
        let variants = Arc::new(VariantRegistry::from_config(
            host.clone(),
            &VariantConfig {
                subsites,
                ..Default::default()
            },
        ));
        let transport = Arc::new(RecordingTransport::new());
        let service = Arc::new(SolrService::new(
            transport.clone(),
            SolrConfig {
                base_url: "http://solr.test/solr".to_string(),
                timeout_ms: 1_000,
                commit: CommitMode::Deferred,
            },
        ));
        let definition = IndexDefinition::from_index(&MainIndex).expect("valid index");
        let indexes = IndexSet::new()
            .with(Arc::new(SolrIndex::new(definition, service)))
            .expect("single index");
        let updater = SearchUpdater::new(DocumentPlanner::new(host, variants), indexes, config);
        Self { transport, updater }
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// A published page.
pub fn page(key: u64, title: &str) -> Record {
    Record::new("Page", key)
        .with_field("Title", title)
        .with_field("published", true)
}

/// A file record.
pub fn file(key: u64, title: &str) -> Record {
    Record::new("File", key).with_field("Title", title)
}
