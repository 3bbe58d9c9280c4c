//! The registered index writers.

use std::fmt;
use std::sync::Arc;

use searchsync_core::{Error, HostSchema, RecordClass, Result};

use crate::writer::IndexWriter;

/// Every index writer known to the process, in registration order.
#[derive(Clone, Default)]
pub struct IndexSet {
    writers: Vec<Arc<dyn IndexWriter>>,
}

impl IndexSet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a writer.
    ///
    /// # Errors
    ///
    /// Returns a validation error if an index with the same name exists.
    pub fn add(&mut self, writer: Arc<dyn IndexWriter>) -> Result<()> {
        if self.writers.iter().any(|w| w.name() == writer.name()) {
            return Err(Error::validation_field(
                "name",
                format!("index '{}' registered twice", writer.name()),
            ));
        }
        self.writers.push(writer);
        Ok(())
    }

    /// Registers a writer, builder style.
    pub fn with(mut self, writer: Arc<dyn IndexWriter>) -> Result<Self> {
        self.add(writer)?;
        Ok(self)
    }

    /// Looks up a writer by index name.
    pub fn get(&self, name: &str) -> Result<Arc<dyn IndexWriter>> {
        self.writers
            .iter()
            .find(|w| w.name() == name)
            .cloned()
            .ok_or_else(|| Error::unknown_index(name))
    }

    /// Writers whose definition covers `class`.
    pub fn covering(&self, class: &RecordClass, host: &dyn HostSchema) -> Vec<Arc<dyn IndexWriter>> {
        self.writers
            .iter()
            .filter(|w| w.definition().covers(class, host))
            .cloned()
            .collect()
    }

    /// All writers.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn IndexWriter>> {
        self.writers.iter()
    }

    /// Index names, in registration order.
    pub fn names(&self) -> Vec<String> {
        self.writers.iter().map(|w| w.name().to_string()).collect()
    }

    /// Number of writers.
    pub fn len(&self) -> usize {
        self.writers.len()
    }

    /// Returns `true` if no writer is registered.
    pub fn is_empty(&self) -> bool {
        self.writers.is_empty()
    }
}

impl fmt::Debug for IndexSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexSet")
            .field("indexes", &self.names())
            .finish()
    }
}
