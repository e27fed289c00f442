// Worker Supervisor
// One long-lived process per target language over stdio pipes

use std::collections::HashMap;
use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::Mutex;
use tracing::{debug, info};

use tplprobe_core::port::{EngineOutputs, WorkerError, WorkerHost};

use crate::protocol::{self, READY_MARKER};

/// Fixed launch recipe for one language's worker program.
#[derive(Debug, Clone)]
pub struct LaunchRecipe {
    pub program: String,
    pub args: Vec<String>,
}

impl LaunchRecipe {
    pub fn new(program: impl Into<String>, args: &[&str]) -> Self {
        Self {
            program: program.into(),
            args: args.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Launch recipes for the stock worker programs.
pub fn default_recipes() -> HashMap<String, LaunchRecipe> {
    HashMap::from([
        ("node".into(), LaunchRecipe::new("node", &["engines/node/worker.js"])),
        ("php".into(), LaunchRecipe::new("php", &["engines/php/worker.php"])),
        ("ruby".into(), LaunchRecipe::new("ruby", &["engines/ruby/worker.rb"])),
        ("python".into(), LaunchRecipe::new("python3", &["engines/python/worker.py"])),
        (
            "java".into(),
            LaunchRecipe::new("java", &["-jar", "engines/java/target/java-worker-1.0-all.jar"]),
        ),
        ("go".into(), LaunchRecipe::new("./engines/go/worker", &[])),
    ])
}

// stdin/stdout pair guarded together: exactly one in-flight request
// per worker.
struct WorkerIo {
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
    // Held so the child dies with the supervisor (kill_on_drop).
    _child: Child,
}

struct WorkerHandle {
    language: String,
    io: Mutex<WorkerIo>,
}

/// Owns one worker process per started language.
///
/// The registry lock is held across the whole startup handshake, so
/// concurrent `start` calls for the same language are serialized and
/// the second caller observes the idempotent no-op path.
pub struct ProcessSupervisor {
    recipes: HashMap<String, LaunchRecipe>,
    workers: Mutex<HashMap<String, Arc<WorkerHandle>>>,
}

impl ProcessSupervisor {
    pub fn new(recipes: HashMap<String, LaunchRecipe>) -> Self {
        Self {
            recipes,
            workers: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_default_recipes() -> Self {
        Self::new(default_recipes())
    }

    async fn spawn_worker(
        &self,
        language: &str,
        engine_subset: Option<&[String]>,
    ) -> Result<Arc<WorkerHandle>, WorkerError> {
        let recipe = self
            .recipes
            .get(language)
            .ok_or_else(|| WorkerError::Unsupported(language.to_string()))?;

        let mut command = Command::new(&recipe.program);
        command
            .args(&recipe.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(subset) = engine_subset.filter(|s| !s.is_empty()) {
            command.arg(subset.join(","));
        }

        let mut child = command.spawn().map_err(|e| WorkerError::SpawnFailed {
            language: language.to_string(),
            reason: e.to_string(),
        })?;

        let stdin = child.stdin.take().ok_or_else(|| WorkerError::SpawnFailed {
            language: language.to_string(),
            reason: "stdin not captured".into(),
        })?;
        let stdout = child.stdout.take().ok_or_else(|| WorkerError::SpawnFailed {
            language: language.to_string(),
            reason: "stdout not captured".into(),
        })?;
        let stderr = child.stderr.take().ok_or_else(|| WorkerError::SpawnFailed {
            language: language.to_string(),
            reason: "stderr not captured".into(),
        })?;

        // Block on the diagnostic stream until the readiness marker;
        // EOF first means the worker died during startup.
        let mut stderr = BufReader::new(stderr).lines();
        loop {
            match stderr.next_line().await.map_err(|e| WorkerError::Io {
                language: language.to_string(),
                reason: e.to_string(),
            })? {
                None => return Err(WorkerError::StartupFailed(language.to_string())),
                Some(line) => {
                    debug!(language = %language, line = %line.trim(), "worker stderr");
                    if line.trim_start().starts_with(READY_MARKER) {
                        break;
                    }
                }
            }
        }

        // Keep draining stderr so a chatty worker never blocks on a
        // full pipe.
        let drain_language = language.to_string();
        tokio::spawn(async move {
            while let Ok(Some(line)) = stderr.next_line().await {
                debug!(language = %drain_language, line = %line.trim(), "worker stderr");
            }
        });

        info!(language = %language, "worker ready");
        Ok(Arc::new(WorkerHandle {
            language: language.to_string(),
            io: Mutex::new(WorkerIo {
                stdin,
                stdout: BufReader::new(stdout),
                _child: child,
            }),
        }))
    }
}

#[async_trait]
impl WorkerHost for ProcessSupervisor {
    async fn start(
        &self,
        language: &str,
        engine_subset: Option<&[String]>,
    ) -> Result<(), WorkerError> {
        let mut workers = self.workers.lock().await;
        if workers.contains_key(language) {
            return Ok(());
        }
        let handle = self.spawn_worker(language, engine_subset).await?;
        workers.insert(language.to_string(), handle);
        Ok(())
    }

    async fn request(&self, language: &str, probe: &str) -> Result<EngineOutputs, WorkerError> {
        let handle = {
            let workers = self.workers.lock().await;
            workers
                .get(language)
                .cloned()
                .ok_or_else(|| WorkerError::NotRunning(language.to_string()))?
        };

        // Serializes requests per worker; the registry lock is already
        // released, so other languages proceed concurrently.
        let mut io = handle.io.lock().await;
        let io_err = |e: std::io::Error| WorkerError::Io {
            language: handle.language.clone(),
            reason: e.to_string(),
        };
        protocol::send_request(&mut io.stdin, probe).await.map_err(io_err)?;
        protocol::read_response(&handle.language, &mut io.stdout)
            .await
            .map_err(io_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Stub worker speaking the readiness/sentinel protocol.
    fn stub_recipe() -> LaunchRecipe {
        LaunchRecipe::new(
            "sh",
            &[
                "-c",
                r#"printf '%s 1 engine(s) ready: stub\n' '✅' >&2
while IFS= read -r line; do
  if [ -z "$line" ]; then
    printf '{"stub": "hosted"}\n'
  else
    printf '{"stub": "echo:%s"}\n' "$line"
  fi
  printf '__END__\n'
done"#,
            ],
        )
    }

    fn stub_supervisor() -> ProcessSupervisor {
        ProcessSupervisor::new(HashMap::from([("stub".to_string(), stub_recipe())]))
    }

    #[tokio::test]
    async fn start_then_request_round_trips() {
        let sup = stub_supervisor();
        sup.start("stub", None).await.unwrap();
        let outputs = sup.request("stub", "{{7*7}}").await.unwrap();
        assert_eq!(outputs["stub"], serde_json::json!("echo:{{7*7}}"));
    }

    #[tokio::test]
    async fn empty_line_enumerates_hosted_engines() {
        let sup = stub_supervisor();
        sup.start("stub", None).await.unwrap();
        let outputs = sup.request("stub", "").await.unwrap();
        assert_eq!(outputs["stub"], serde_json::json!("hosted"));
    }

    #[tokio::test]
    async fn repeat_start_is_a_no_op() {
        let sup = stub_supervisor();
        sup.start("stub", None).await.unwrap();
        let subset = vec!["other".to_string()];
        sup.start("stub", Some(subset.as_slice())).await.unwrap();
        // Still the first worker: sequential requests keep working.
        let first = sup.request("stub", "a").await.unwrap();
        let second = sup.request("stub", "b").await.unwrap();
        assert_eq!(first["stub"], serde_json::json!("echo:a"));
        assert_eq!(second["stub"], serde_json::json!("echo:b"));
    }

    #[tokio::test]
    async fn startup_death_before_readiness_is_fatal() {
        let recipe = LaunchRecipe::new("sh", &["-c", "echo 'loading engines...' >&2; exit 3"]);
        let sup = ProcessSupervisor::new(HashMap::from([("ruby".to_string(), recipe)]));
        let err = sup.start("ruby", None).await.unwrap_err();
        assert!(matches!(err, WorkerError::StartupFailed(ref l) if l == "ruby"));
    }

    #[tokio::test]
    async fn unknown_language_is_unsupported() {
        let sup = stub_supervisor();
        let err = sup.start("cobol", None).await.unwrap_err();
        assert!(matches!(err, WorkerError::Unsupported(_)));
    }

    #[tokio::test]
    async fn request_before_start_is_rejected() {
        let sup = stub_supervisor();
        let err = sup.request("stub", "x").await.unwrap_err();
        assert!(matches!(err, WorkerError::NotRunning(_)));
    }

    #[tokio::test]
    async fn garbage_response_degrades_to_empty_map() {
        let recipe = LaunchRecipe::new(
            "sh",
            &[
                "-c",
                r#"printf '%s ready\n' '✅' >&2
while IFS= read -r line; do printf '{broken json\n__END__\n'; done"#,
            ],
        );
        let sup = ProcessSupervisor::new(HashMap::from([("stub".to_string(), recipe)]));
        sup.start("stub", None).await.unwrap();
        let outputs = sup.request("stub", "x").await.unwrap();
        assert!(outputs.is_empty());
    }
}
