// Worker Host Port
// Abstraction over process-per-language render workers

use async_trait::async_trait;
use std::collections::BTreeMap;
use thiserror::Error;

use crate::domain::LanguageId;

/// One protocol round's parsed result: engine name -> rendered value.
/// Values may be plain strings or structured JSON.
pub type EngineOutputs = BTreeMap<String, serde_json::Value>;

/// Worker errors
#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("Unsupported language: {0}")]
    Unsupported(LanguageId),

    #[error("Spawn failed for {language}: {reason}")]
    SpawnFailed { language: LanguageId, reason: String },

    #[error("Worker for {0} exited before signalling readiness")]
    StartupFailed(LanguageId),

    #[error("Worker for {0} is not running")]
    NotRunning(LanguageId),

    #[error("IO error talking to {language} worker: {reason}")]
    Io { language: LanguageId, reason: String },
}

/// Worker Host trait
///
/// One long-lived worker process per language, each serving requests
/// strictly sequentially. Implementations:
/// - ProcessSupervisor (infra-worker): OS processes over stdio pipes
/// - MockWorkerHost: canned outputs for tests
#[async_trait]
pub trait WorkerHost: Send + Sync {
    /// Start the worker for a language. Idempotent: a repeat call for
    /// an already-started language is a no-op. If `engine_subset` is
    /// given on first start, the worker hosts only those engines for
    /// its lifetime.
    ///
    /// # Errors
    /// - WorkerError::Unsupported if no launch recipe exists
    /// - WorkerError::SpawnFailed if the process cannot be started
    /// - WorkerError::StartupFailed if the diagnostic stream closes
    ///   before the readiness marker
    async fn start(
        &self,
        language: &str,
        engine_subset: Option<&[String]>,
    ) -> Result<(), WorkerError>;

    /// Send one probe line to a started worker and return the parsed
    /// response map. An empty probe is the reserved "enumerate hosted
    /// engines" query. Blocks until the sentinel line is read; an
    /// unparseable response yields an empty map, not an error.
    async fn request(&self, language: &str, probe: &str) -> Result<EngineOutputs, WorkerError>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Mutex;

    /// Mock worker host serving canned per-language outputs.
    ///
    /// `outputs` maps (language, probe) -> response map; unknown probes
    /// yield an empty map, mirroring a parse failure round.
    pub struct MockWorkerHost {
        outputs: BTreeMap<(String, String), EngineOutputs>,
        started: Mutex<HashSet<String>>,
        requests: Mutex<Vec<(String, String)>>,
    }

    impl MockWorkerHost {
        pub fn new() -> Self {
            Self {
                outputs: BTreeMap::new(),
                started: Mutex::new(HashSet::new()),
                requests: Mutex::new(Vec::new()),
            }
        }

        pub fn with_output(
            mut self,
            language: &str,
            probe: &str,
            outputs: EngineOutputs,
        ) -> Self {
            self.outputs
                .insert((language.to_string(), probe.to_string()), outputs);
            self
        }

        /// Every (language, probe) pair requested, in call order.
        pub fn requests(&self) -> Vec<(String, String)> {
            self.requests.lock().unwrap().clone()
        }

        pub fn started_languages(&self) -> Vec<String> {
            let mut langs: Vec<_> = self.started.lock().unwrap().iter().cloned().collect();
            langs.sort();
            langs
        }
    }

    impl Default for MockWorkerHost {
        fn default() -> Self {
            Self::new()
        }
    }

    #[async_trait]
    impl WorkerHost for MockWorkerHost {
        async fn start(
            &self,
            language: &str,
            _engine_subset: Option<&[String]>,
        ) -> Result<(), WorkerError> {
            self.started.lock().unwrap().insert(language.to_string());
            Ok(())
        }

        async fn request(&self, language: &str, probe: &str) -> Result<EngineOutputs, WorkerError> {
            if !self.started.lock().unwrap().contains(language) {
                return Err(WorkerError::NotRunning(language.to_string()));
            }
            self.requests
                .lock()
                .unwrap()
                .push((language.to_string(), probe.to_string()));
            Ok(self
                .outputs
                .get(&(language.to_string(), probe.to_string()))
                .cloned()
                .unwrap_or_default())
        }
    }
}
