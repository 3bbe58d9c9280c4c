//! `searchsync ping`.

use std::fmt;

use searchsync_core::{Error, Result};

use crate::context::Context;

/// Answer of one core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PingResult {
    /// Index name
    pub index: String,
    /// Engine core
    pub core: String,
    /// Failure, if the core did not answer
    pub error: Option<String>,
}

impl fmt::Display for PingResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.error {
            None => write!(f, "{} ({}): ok", self.index, self.core),
            Some(err) => write!(f, "{} ({}): {err}", self.index, self.core),
        }
    }
}

/// Pings the core of every configured index.
///
/// Every core is tried; failures are reported per index rather than
/// stopping at the first one.
pub async fn ping(context: &Context) -> Result<Vec<PingResult>> {
    let service = context
        .service()
        .ok_or_else(|| Error::config("ping needs an engine connection"))?;

    let mut results = Vec::new();
    for writer in context.indexes().iter() {
        let definition = writer.definition();
        let error = match service.ping(&definition.core).await {
            Ok(()) => None,
            Err(err) => {
                tracing::warn!(index = %definition.name, error = %err, "ping failed");
                Some(err.to_string())
            }
        };
        results.push(PingResult {
            index: definition.name.clone(),
            core: definition.core.clone(),
            error,
        });
    }
    Ok(results)
}
