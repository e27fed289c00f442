// Cross-Validation Harness
// Audits that every payload triggers only on its assigned engine(s)

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{info, warn};

use crate::application::Dispatcher;
use crate::domain::{EngineDatabase, EngineName, LanguageId, ProbeTable};
use crate::error::Result;

/// Expected-match check that failed: the assigned engine did not
/// reproduce its recorded output.
#[derive(Debug, Clone, Serialize)]
pub struct FalseNegative {
    pub probe: String,
    pub engine: EngineName,
    pub expected: String,
    pub actual: String,
}

/// Specificity check that failed: an unassigned engine reproduced an
/// output recorded for another engine on the same payload.
#[derive(Debug, Clone, Serialize)]
pub struct FalsePositive {
    pub probe: String,
    pub engine: EngineName,
    pub value: String,
}

/// Diagnostic summary for one language. Purely informational: the
/// harness reports, it never fails the run.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    pub language: LanguageId,
    pub expected_checks: usize,
    pub passed: usize,
    pub false_negatives: Vec<FalseNegative>,
    pub false_positives: Vec<FalsePositive>,
}

impl ValidationReport {
    pub fn is_clean(&self) -> bool {
        self.false_negatives.is_empty() && self.false_positives.is_empty()
    }
}

/// Render a worker output value for comparison and display: strings
/// verbatim, structured values as compact JSON.
pub fn value_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Cross-validate one language's full payload database.
///
/// Starts a worker scoped to the language's complete declared engine
/// set, then issues exactly one fan-out round per distinct payload;
/// the combined probe view is unscoped across all of the language's
/// engines, so this checks global payload specificity rather than
/// narrowing.
pub async fn validate_language(
    dispatcher: &Dispatcher,
    db: &EngineDatabase,
    language: &str,
) -> Result<ValidationReport> {
    let engines = db.engines_of(language);
    let engine_args: Vec<String> = engines.iter().map(|e| e.as_str().to_string()).collect();
    dispatcher.host().start(language, Some(engine_args.as_slice())).await?;

    let engine_set = engines.iter().cloned().collect();
    let view = db.probe_view(&engine_set, ProbeTable::Payloads);
    let active = BTreeMap::from([(language.to_string(), engines.clone())]);

    info!(language = %language, engines = engines.len(), payloads = view.len(), "cross-validation starting");

    let mut report = ValidationReport {
        language: language.to_string(),
        expected_checks: 0,
        passed: 0,
        false_negatives: Vec::new(),
        false_positives: Vec::new(),
    };

    for entry in &view {
        let outputs = dispatcher.dispatch(&entry.probe, &active).await?;

        for engine in &engines {
            let actual = outputs
                .get(engine.as_str())
                .map(value_text)
                .unwrap_or_default()
                .trim()
                .to_string();

            if let Some(expected) = entry.expected.get(engine) {
                report.expected_checks += 1;
                if actual == expected.trim() {
                    report.passed += 1;
                } else {
                    report.false_negatives.push(FalseNegative {
                        probe: entry.probe.clone(),
                        engine: engine.clone(),
                        expected: expected.clone(),
                        actual,
                    });
                }
            } else if entry.expected.values().any(|v| v.trim() == actual) {
                report.false_positives.push(FalsePositive {
                    probe: entry.probe.clone(),
                    engine: engine.clone(),
                    value: actual,
                });
            }
        }
    }

    if report.is_clean() {
        info!(language = %language, passed = report.passed, "all payloads correctly scoped");
    } else {
        warn!(
            language = %language,
            false_negatives = report.false_negatives.len(),
            false_positives = report.false_positives.len(),
            "payload specificity violations found"
        );
    }
    Ok(report)
}
