//! Turning one record into the document operations one index needs.
//!
//! Shared by the live updater and the reindex runner so both produce the
//! same documents for the same record.

use std::sync::Arc;

use searchsync_core::{DocumentId, Error, HostSchema, PendingOp, Record, RecordEvent, Result};
use searchsync_index::{IndexDefinition, KeyRange};
use searchsync_variants::{Expansion, VariantRegistry};

/// Whether the record still exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanMode {
    /// The record was written: present variants are upserted.
    Write,
    /// The record was deleted: every variant document goes.
    Delete,
}

impl PlanMode {
    /// The mode matching a lifecycle event.
    pub fn of(event: &RecordEvent) -> Self {
        if event.is_delete() {
            PlanMode::Delete
        } else {
            PlanMode::Write
        }
    }
}

/// Operations planned for one record in one index.
#[derive(Debug, Default)]
pub struct DocumentPlan {
    /// One operation per variant scope
    pub ops: Vec<(DocumentId, PendingOp)>,
    /// Schema errors for documents that could not be built
    pub rejected: Vec<Error>,
    /// The record's documents under exclusive variant values it no longer
    /// holds (a page moved to another subsite)
    pub stale: Vec<KeyRange>,
}

impl DocumentPlan {
    /// Number of upserts in the plan.
    pub fn upserts(&self) -> usize {
        self.ops.iter().filter(|(_, op)| !op.is_delete()).count()
    }

    /// Number of deletes in the plan.
    pub fn deletes(&self) -> usize {
        self.ops.iter().filter(|(_, op)| op.is_delete()).count()
    }
}

/// Expands records through the variant registry and maps them to documents.
#[derive(Clone)]
pub struct DocumentPlanner {
    host: Arc<dyn HostSchema>,
    variants: Arc<VariantRegistry>,
}

impl std::fmt::Debug for DocumentPlanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentPlanner")
            .field("variants", &self.variants)
            .finish_non_exhaustive()
    }
}

impl DocumentPlanner {
    /// Creates a planner; `variants` should probe the same `host`.
    pub fn new(host: Arc<dyn HostSchema>, variants: Arc<VariantRegistry>) -> Self {
        Self { host, variants }
    }

    /// The host schema.
    pub fn host(&self) -> &Arc<dyn HostSchema> {
        &self.host
    }

    /// The variant registry.
    pub fn variants(&self) -> &Arc<VariantRegistry> {
        &self.variants
    }

    /// Whether `event` can change any document of `definition`.
    ///
    /// Deletes and writes with unknown changed fields always can. A write
    /// listing its changed fields matters only if one of them is read by
    /// the index or controls a variant.
    pub fn is_relevant(&self, definition: &IndexDefinition, event: &RecordEvent) -> bool {
        match event {
            RecordEvent::Deleted { .. } => true,
            RecordEvent::Written {
                changed_fields: None,
                ..
            } => true,
            RecordEvent::Written {
                record,
                changed_fields: Some(changed),
            } => {
                let indexed = definition.indexed_fields();
                let tracked = self.variants.variants_for(&record.class).tracked_fields();
                changed
                    .iter()
                    .any(|field| indexed.contains(field) || tracked.contains(field))
            }
        }
    }

    /// Plans the operations keeping `definition` in step with `record`.
    ///
    /// Absent variant scopes become deletes. A present scope whose document
    /// fails schema mapping becomes a delete of any stale copy and its error
    /// lands in [`DocumentPlan::rejected`].
    ///
    /// # Errors
    ///
    /// Variant expansion errors are returned as-is; they are not per
    /// document and must surface.
    pub fn plan(
        &self,
        definition: &IndexDefinition,
        record: &Record,
        mode: PlanMode,
    ) -> Result<DocumentPlan> {
        let mut plan = DocumentPlan::default();
        let expansions = self.variants.expand(record)?;
        if mode == PlanMode::Write {
            plan.stale = self.left_scopes(record, &expansions);
        }
        for expansion in expansions {
            let id = DocumentId::new(
                definition.name.clone(),
                record.class.clone(),
                record.key,
                expansion.key,
            );
            let op = match (mode, expansion.view) {
                (PlanMode::Write, Some(view)) => {
                    match definition.build_document(id.clone(), &view, self.host.as_ref()) {
                        Ok(doc) => PendingOp::Upsert(doc),
                        Err(err) if err.is_schema() => {
                            plan.rejected.push(err);
                            PendingOp::Delete
                        }
                        Err(err) => return Err(err),
                    }
                }
                _ => PendingOp::Delete,
            };
            plan.ops.push((id, op));
        }
        Ok(plan)
    }

    /// Plans a lifecycle event.
    ///
    /// Stale-scope deletes are kept only when the event may have moved the
    /// record: the changed fields are unknown or include a field an
    /// exclusive variant reads.
    pub fn plan_event(
        &self,
        definition: &IndexDefinition,
        event: &RecordEvent,
    ) -> Result<DocumentPlan> {
        let mut plan = self.plan(definition, event.record(), PlanMode::of(event))?;
        if let RecordEvent::Written {
            record,
            changed_fields: Some(changed),
        } = event
        {
            let moved = self
                .variants
                .variants_for(&record.class)
                .iter()
                .filter(|v| v.is_exclusive())
                .flat_map(|v| v.tracked_fields())
                .any(|field| changed.contains(&field));
            if !moved {
                plan.stale.clear();
            }
        }
        Ok(plan)
    }

    fn left_scopes(&self, record: &Record, expansions: &[Expansion]) -> Vec<KeyRange> {
        let Some(first) = expansions.first() else {
            return Vec::new();
        };
        self.variants
            .variants_for(&record.class)
            .iter()
            .filter(|v| v.is_exclusive())
            .filter_map(|v| {
                let value = first.key.get(v.name())?;
                Some(
                    KeyRange::record(record.class.clone(), record.key)
                        .excluding_variant(v.name(), value),
                )
            })
            .collect()
    }
}
