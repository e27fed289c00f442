// End-to-end fan-out over real subprocess workers (sh stubs speaking
// the readiness/sentinel protocol).

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tplprobe_core::application::Dispatcher;
use tplprobe_core::domain::EngineName;
use tplprobe_core::port::WorkerHost;
use tplprobe_infra_worker::{LaunchRecipe, ProcessSupervisor};

fn echo_recipe(engine: &str) -> LaunchRecipe {
    let script = format!(
        r#"printf '%s ready\n' '✅' >&2
while IFS= read -r line; do
  printf '{{"{engine}": "out:%s"}}\n' "$line"
  printf '__END__\n'
done"#
    );
    LaunchRecipe::new("sh", &["-c", &script])
}

fn two_language_supervisor() -> ProcessSupervisor {
    ProcessSupervisor::new(HashMap::from([
        ("node".to_string(), echo_recipe("ejs")),
        ("python".to_string(), echo_recipe("jinja2")),
    ]))
}

#[tokio::test]
async fn fan_out_merges_two_real_workers() {
    let host: Arc<dyn WorkerHost> = Arc::new(two_language_supervisor());
    host.start("node", None).await.unwrap();
    host.start("python", None).await.unwrap();

    let dispatcher = Dispatcher::new(Arc::clone(&host));
    let active = BTreeMap::from([
        ("node".to_string(), vec![EngineName::new("ejs")]),
        ("python".to_string(), vec![EngineName::new("jinja2")]),
    ]);

    let merged = dispatcher.dispatch("{{7*7}}", &active).await.unwrap();
    assert_eq!(merged.len(), 2);
    assert_eq!(merged["ejs"], serde_json::json!("out:{{7*7}}"));
    assert_eq!(merged["jinja2"], serde_json::json!("out:{{7*7}}"));
    // Merged presentation is sorted by engine name.
    let names: Vec<_> = merged.keys().cloned().collect();
    assert_eq!(names, vec!["ejs", "jinja2"]);
}

#[tokio::test]
async fn language_without_active_engines_is_never_contacted() {
    let host: Arc<dyn WorkerHost> = Arc::new(two_language_supervisor());
    host.start("node", None).await.unwrap();
    // python is intentionally not started; an empty active set for it
    // must keep the dispatcher away from that branch entirely.

    let dispatcher = Dispatcher::new(Arc::clone(&host));
    let active = BTreeMap::from([
        ("node".to_string(), vec![EngineName::new("ejs")]),
        ("python".to_string(), Vec::new()),
    ]);

    let merged = dispatcher.dispatch("x", &active).await.unwrap();
    assert_eq!(merged.len(), 1);
    assert!(merged.contains_key("ejs"));
}

#[tokio::test]
async fn sequential_rounds_reuse_the_same_worker() {
    let host: Arc<dyn WorkerHost> = Arc::new(two_language_supervisor());
    host.start("node", None).await.unwrap();
    host.start("node", None).await.unwrap(); // idempotent

    let dispatcher = Dispatcher::new(Arc::clone(&host));
    let active = BTreeMap::from([("node".to_string(), vec![EngineName::new("ejs")])]);

    for probe in ["a", "b", "c"] {
        let merged = dispatcher.dispatch(probe, &active).await.unwrap();
        assert_eq!(merged["ejs"], serde_json::json!(format!("out:{probe}")));
    }
}

#[tokio::test]
async fn concurrent_fanout_rounds_are_serialized_per_worker() {
    let host: Arc<dyn WorkerHost> = Arc::new(two_language_supervisor());
    host.start("node", None).await.unwrap();

    let dispatcher = Arc::new(Dispatcher::new(Arc::clone(&host)));
    let active = Arc::new(BTreeMap::from([(
        "node".to_string(),
        vec![EngineName::new("ejs")],
    )]));

    // Several dispatches racing on one worker: each response must still
    // line up with its own request line.
    let rounds = (0..8).map(|i| {
        let dispatcher = Arc::clone(&dispatcher);
        let active = Arc::clone(&active);
        tokio::spawn(async move {
            let probe = format!("probe-{i}");
            let merged = dispatcher.dispatch(&probe, &active).await.unwrap();
            assert_eq!(merged["ejs"], serde_json::json!(format!("out:{probe}")));
        })
    });
    for handle in futures::future::join_all(rounds).await {
        handle.unwrap();
    }
}
