//! Wiring configuration into runnable components.

use std::sync::Arc;

use searchsync_core::{Error, HostSchema, Result, StaticHostSchema};
use searchsync_index::{
    ConfiguredIndex, HttpTransport, IndexDefinition, IndexSet, RecordingIndex, SearchTransport,
    SolrIndex, SolrService,
};
use searchsync_reindex::{
    FileJobQueue, JobQueue, MemoryJobQueue, RecordSource, ReindexRunner, ReindexScheduler,
};
use searchsync_updater::{DocumentPlanner, SearchUpdater};
use searchsync_variants::VariantRegistry;

use crate::config::SearchsyncConfig;

/// Where index writes go.
#[derive(Clone)]
pub enum Target {
    /// The engine, through a transport.
    Engine(Arc<dyn SearchTransport>),
    /// In-memory indexes, inspectable after the run.
    Memory,
}

impl Target {
    /// The engine over HTTP.
    pub fn http() -> Self {
        Target::Engine(Arc::new(HttpTransport::new()))
    }
}

/// Components shared by the commands.
pub struct Context {
    config: SearchsyncConfig,
    planner: DocumentPlanner,
    indexes: IndexSet,
    service: Option<Arc<SolrService>>,
    memory: Vec<Arc<RecordingIndex>>,
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("indexes", &self.indexes)
            .field("memory", &!self.memory.is_empty())
            .finish_non_exhaustive()
    }
}

impl Context {
    /// Builds the planner and one writer per configured index.
    ///
    /// # Errors
    ///
    /// Returns a config error when no index is configured, and a
    /// validation error when an index declaration is invalid.
    pub fn new(config: SearchsyncConfig, host: StaticHostSchema, target: Target) -> Result<Self> {
        let definitions = definitions(&config)?;
        let host: Arc<dyn HostSchema> = Arc::new(host);
        let variants = Arc::new(VariantRegistry::from_config(host.clone(), &config.variants));
        let planner = DocumentPlanner::new(host, variants);

        let mut indexes = IndexSet::new();
        let mut memory = Vec::new();
        let service = match target {
            Target::Engine(transport) => {
                let service = Arc::new(SolrService::new(transport, config.solr.clone()));
                for definition in definitions {
                    indexes.add(Arc::new(SolrIndex::new(definition, service.clone())))?;
                }
                Some(service)
            }
            Target::Memory => {
                for definition in definitions {
                    let index = Arc::new(RecordingIndex::new(definition));
                    indexes.add(index.clone())?;
                    memory.push(index);
                }
                None
            }
        };

        Ok(Self {
            config,
            planner,
            indexes,
            service,
            memory,
        })
    }

    /// The loaded configuration.
    pub fn config(&self) -> &SearchsyncConfig {
        &self.config
    }

    /// The host schema the planner probes.
    pub fn host(&self) -> &Arc<dyn HostSchema> {
        self.planner.host()
    }

    /// Writers, one per configured index.
    pub fn indexes(&self) -> &IndexSet {
        &self.indexes
    }

    /// The engine client, unless writing to memory.
    pub fn service(&self) -> Option<&Arc<SolrService>> {
        self.service.as_ref()
    }

    /// In-memory indexes of a [`Target::Memory`] context.
    pub fn memory(&self) -> &[Arc<RecordingIndex>] {
        &self.memory
    }

    /// A live updater over the configured indexes.
    pub fn updater(&self) -> SearchUpdater {
        SearchUpdater::new(
            self.planner.clone(),
            self.indexes.clone(),
            self.config.updater.clone(),
        )
    }

    /// A reindex scheduler reading `source` and keeping jobs in `queue`.
    pub fn scheduler(
        &self,
        source: Arc<dyn RecordSource>,
        queue: Arc<dyn JobQueue>,
    ) -> ReindexScheduler {
        let runner = ReindexRunner::new(
            source,
            self.indexes.clone(),
            Arc::new(self.planner.clone()),
            self.config.reindex.clone(),
        );
        ReindexScheduler::new(runner, queue)
    }
}

/// Validated definitions of every `[[indexes]]` table.
pub fn definitions(config: &SearchsyncConfig) -> Result<Vec<IndexDefinition>> {
    if config.indexes.is_empty() {
        return Err(Error::config("no [[indexes]] configured"));
    }
    config
        .indexes
        .iter()
        .map(|index| IndexDefinition::from_index(&ConfiguredIndex::new(index.clone())))
        .collect()
}

/// The job queue `[reindex]` asks for.
///
/// File-backed when `state_dir` is set, unless `ephemeral` forces memory.
pub fn open_queue(config: &SearchsyncConfig, ephemeral: bool) -> Result<Arc<dyn JobQueue>> {
    match &config.reindex.state_dir {
        Some(dir) if !ephemeral => Ok(Arc::new(FileJobQueue::open(dir)?)),
        _ => Ok(Arc::new(MemoryJobQueue::new())),
    }
}

/// The file-backed queue, required by the `jobs` commands.
pub fn persistent_queue(config: &SearchsyncConfig) -> Result<FileJobQueue> {
    let dir = config.reindex.state_dir.as_ref().ok_or_else(|| {
        Error::config("[reindex] state_dir is not set; jobs are not kept between runs")
    })?;
    FileJobQueue::open(dir)
}
