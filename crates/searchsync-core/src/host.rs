//! Host schema probe.
//!
//! The host CMS owns the record classes. searchsync only needs two facts
//! about them: where a class sits in the inheritance hierarchy, and which
//! capabilities (versioning, subsites) are active for it. Both are answered
//! through [`HostSchema`]; [`StaticHostSchema`] is a declarative
//! implementation used by the CLI fixtures and tests.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::RecordClass;

/// A per-class capability that variant strategies probe for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum Capability {
    /// Records exist in draft (`Stage`) and published (`Live`) copies.
    Versioned,
    /// Records belong to one subsite of a multi-tenant install.
    Subsites,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capability::Versioned => write!(f, "versioned"),
            Capability::Subsites => write!(f, "subsites"),
        }
    }
}

/// What the host knows about its record classes.
pub trait HostSchema: Send + Sync {
    /// Class ancestry, the class itself first and the root class last.
    ///
    /// Unknown classes return just themselves.
    fn ancestry(&self, class: &RecordClass) -> Vec<RecordClass>;

    /// Whether a capability is active for the class.
    fn has_capability(&self, class: &RecordClass, capability: Capability) -> bool;

    /// Whether `class` is `ancestor` or one of its subclasses.
    fn is_subclass_of(&self, class: &RecordClass, ancestor: &RecordClass) -> bool {
        self.ancestry(class).iter().any(|c| c == ancestor)
    }
}

/// Declaration of one class in a [`StaticHostSchema`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassInfo {
    /// Parent class, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<RecordClass>,

    /// Capabilities declared on this class (inherited by subclasses).
    #[serde(default)]
    pub capabilities: BTreeSet<Capability>,
}

/// A fixed class table.
///
/// Capabilities are inherited: a class has a capability if it or any
/// ancestor declares it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StaticHostSchema {
    classes: BTreeMap<RecordClass, ClassInfo>,
}

impl StaticHostSchema {
    /// Creates an empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a root class.
    pub fn with_class(mut self, class: impl Into<RecordClass>) -> Self {
        self.classes.entry(class.into()).or_default();
        self
    }

    /// Declares a subclass.
    pub fn with_subclass(
        mut self,
        class: impl Into<RecordClass>,
        parent: impl Into<RecordClass>,
    ) -> Self {
        let parent = parent.into();
        self.classes.entry(parent.clone()).or_default();
        self.classes.entry(class.into()).or_default().parent = Some(parent);
        self
    }

    /// Declares a capability on a class.
    pub fn with_capability(mut self, class: impl Into<RecordClass>, capability: Capability) -> Self {
        self.classes
            .entry(class.into())
            .or_default()
            .capabilities
            .insert(capability);
        self
    }

    /// All declared classes.
    pub fn classes(&self) -> impl Iterator<Item = &RecordClass> {
        self.classes.keys()
    }
}

impl HostSchema for StaticHostSchema {
    fn ancestry(&self, class: &RecordClass) -> Vec<RecordClass> {
        let mut chain = vec![class.clone()];
        let mut current = class;
        while let Some(parent) = self.classes.get(current).and_then(|i| i.parent.as_ref()) {
            // Guard against a cyclic declaration
            if chain.contains(parent) {
                tracing::warn!(class = %class, parent = %parent, "cyclic class hierarchy");
                break;
            }
            chain.push(parent.clone());
            current = parent;
        }
        chain
    }

    fn has_capability(&self, class: &RecordClass, capability: Capability) -> bool {
        self.ancestry(class).iter().any(|c| {
            self.classes
                .get(c)
                .is_some_and(|info| info.capabilities.contains(&capability))
        })
    }
}
