// Fan-out Dispatcher
// One concurrent protocol round per language, merged by engine name

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use futures::future;
use tracing::debug;

use crate::domain::{EngineName, LanguageId};
use crate::error::Result;
use crate::port::{EngineOutputs, WorkerHost};

/// Issues one probe concurrently to every language with at least one
/// active engine and merges the per-engine results.
pub struct Dispatcher {
    host: Arc<dyn WorkerHost>,
}

impl Dispatcher {
    pub fn new(host: Arc<dyn WorkerHost>) -> Self {
        Self { host }
    }

    pub fn host(&self) -> &Arc<dyn WorkerHost> {
        &self.host
    }

    /// Fan one probe out across languages. Languages contributing zero
    /// active engines are skipped; each response is restricted to that
    /// language's active subset. Waits for every branch before
    /// returning; the merged map is sorted by engine name.
    pub async fn dispatch(
        &self,
        probe: &str,
        active: &BTreeMap<LanguageId, Vec<EngineName>>,
    ) -> Result<EngineOutputs> {
        let calls = active
            .iter()
            .filter(|(_, engines)| !engines.is_empty())
            .map(|(language, engines)| {
                let host = Arc::clone(&self.host);
                async move {
                    let outputs = host.request(language, probe).await?;
                    let allowed: HashSet<String> =
                        engines.iter().map(|e| e.as_str().to_string()).collect();
                    let filtered: EngineOutputs = outputs
                        .into_iter()
                        .filter_map(|(name, value)| {
                            let name = EngineName::new(&name);
                            allowed
                                .contains(name.as_str())
                                .then(|| (name.to_string(), value))
                        })
                        .collect();
                    Ok::<_, crate::port::WorkerError>((language.clone(), filtered))
                }
            });

        // Every branch runs to completion; a stalled worker only holds
        // up the final merge, not its siblings.
        let mut merged = EngineOutputs::new();
        for result in future::join_all(calls).await {
            let (language, outputs) = result?;
            debug!(language = %language, engines = outputs.len(), "fan-out branch complete");
            merged.extend(outputs);
        }
        Ok(merged)
    }
}
