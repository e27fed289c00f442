// Discrimination over a payload database parsed from its JSON form.

use std::collections::{BTreeMap, BTreeSet};

use tplprobe_core::application::{discriminate, Outcome};
use tplprobe_core::domain::{EngineDatabase, EngineName, EngineSpec};
use tplprobe_core::port::operator::ScriptedOperator;

const PYTHON_DB: &str = r#"{
    "jinja2": {
        "payloads": {"{{7*7}}": "49", "{{7*'7'}}": "7777777"},
        "discriminators": {"{{7*'7'}}": "7777777"},
        "exploit": "{{cycler.__init__.__globals__.os.popen('id').read()}}"
    },
    "mako": {
        "payloads": {"${7*7}": "49", "{{7*'7'}}": "{{7*'7'}}"},
        "discriminators": {"{{7*'7'}}": "{{7*'7'}}"}
    },
    "tornado": {
        "payloads": {"{{7*7}}": "49"}
    }
}"#;

fn load() -> EngineDatabase {
    let raw: BTreeMap<String, EngineSpec> = serde_json::from_str(PYTHON_DB).unwrap();
    let mut db = EngineDatabase::new();
    db.merge_language("python", raw).unwrap();
    db
}

fn seed(names: &[&str]) -> BTreeSet<EngineName> {
    names.iter().map(EngineName::new).collect()
}

#[test]
fn narrows_to_single_engine_from_json_database() {
    let db = load();
    // Round 1 view over discrimination tables:
    //   jinja2 -> "7777777", mako -> "{{7*'7'}}" on the quoted probe,
    //   tornado (payload fallback) has "{{7*7}}" -> "49".
    let mut op = ScriptedOperator::new(["7777777"]);

    let outcome = discriminate(&db, seed(&["jinja2", "mako", "tornado"]), &mut op).unwrap();
    assert_eq!(outcome, Outcome::Identified(EngineName::new("jinja2")));
}

#[test]
fn empty_answer_narrows_to_fallback_engine() {
    let db = load();
    let mut op = ScriptedOperator::new([""]);

    // The quoted probe is the best split; tornado has no entry for it,
    // so an empty observation leaves only tornado.
    let outcome = discriminate(&db, seed(&["jinja2", "mako", "tornado"]), &mut op).unwrap();
    assert_eq!(outcome, Outcome::Identified(EngineName::new("tornado")));
    assert_eq!(op.probes_seen, vec!["{{7*'7'}}"]);
}

#[test]
fn replayed_answers_reproduce_the_same_session() {
    let run = |answers: &[&str]| {
        let mut op = ScriptedOperator::new(answers.iter().map(|s| s.to_string()));
        let outcome = discriminate(&load(), seed(&["jinja2", "mako", "tornado"]), &mut op).unwrap();
        (op.probes_seen, outcome)
    };

    let (probes_a, outcome_a) = run(&["{{7*'7'}}"]);
    let (probes_b, outcome_b) = run(&["{{7*'7'}}"]);
    assert_eq!(probes_a, probes_b);
    assert_eq!(outcome_a, outcome_b);
    assert_eq!(outcome_a, Outcome::Identified(EngineName::new("mako")));
}
