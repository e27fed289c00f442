// Console rendering: result tables, engine listings, validation reports

use std::collections::BTreeMap;

use colored::{Color, Colorize};
use tabled::settings::Style;
use tabled::{Table, Tabled};

use tplprobe_core::application::validate::{value_text, ValidationReport};
use tplprobe_core::domain::{EngineDatabase, EngineName, Exploit, LanguageId};
use tplprobe_core::port::EngineOutputs;

const MAX_OUTPUT_LINES: usize = 10;

// Per-language accent colors, matching the worker programs' own banners.
fn language_color(language: &str) -> Color {
    match language {
        "node" => Color::Yellow,
        "php" => Color::Magenta,
        "ruby" => Color::Red,
        "python" => Color::Blue,
        "java" => Color::Green,
        _ => Color::Cyan,
    }
}

fn truncate_text(text: &str, max_lines: usize) -> String {
    let lines: Vec<&str> = text.lines().collect();
    if lines.len() <= max_lines {
        return text.to_string();
    }
    let mut kept: Vec<&str> = lines[..max_lines].to_vec();
    kept.push("...");
    kept.join("\n")
}

#[derive(Tabled)]
struct ResultRow {
    #[tabled(rename = "Engine")]
    engine: String,
    #[tabled(rename = "Output")]
    output: String,
}

/// One table per language for a merged fan-out result.
pub fn print_result_tables(db: &EngineDatabase, outputs: &EngineOutputs) {
    let mut by_language: BTreeMap<LanguageId, Vec<ResultRow>> = BTreeMap::new();
    for (name, value) in outputs {
        let engine = EngineName::new(name);
        let language = db
            .get(&engine)
            .map(|rec| rec.language.clone())
            .unwrap_or_else(|| "unknown".to_string());
        let text = truncate_text(&value_text(value), MAX_OUTPUT_LINES);
        let output = if text.contains('❌') {
            text.red().to_string()
        } else {
            text.green().to_string()
        };
        by_language.entry(language).or_default().push(ResultRow {
            engine: engine.as_str().to_uppercase(),
            output,
        });
    }

    for (language, rows) in by_language {
        let color = language_color(&language);
        println!(
            "\n{}",
            format!("Results ({})", language.to_uppercase()).bold().color(color)
        );
        println!("{}", Table::new(rows).with(Style::rounded()));
    }
}

#[derive(Tabled)]
struct EngineRow {
    #[tabled(rename = "ENGINE")]
    engine: String,
}

/// Styled listing of engines per language, no workers involved.
pub fn print_engine_lists(db: &EngineDatabase, languages: &[String]) {
    for language in languages {
        let engines = db.engines_of(language);
        if engines.is_empty() {
            continue;
        }
        let rows: Vec<EngineRow> = engines
            .iter()
            .map(|e| EngineRow {
                engine: e.as_str().to_string(),
            })
            .collect();
        let color = language_color(language);
        println!(
            "\n{}",
            format!("Engines ({})", language.to_uppercase()).bold().color(color)
        );
        println!("{}", Table::new(rows).with(Style::rounded()));
    }
}

/// Exploit metadata for the selected engines.
pub fn print_exploits(db: &EngineDatabase, selected: impl Iterator<Item = EngineName>) {
    println!("\n{}\n", "Available exploits:".bold());
    for engine in selected {
        let exploit = db.get(&engine).and_then(|rec| rec.spec.exploit.as_ref());
        match exploit {
            Some(Exploit::Single(payload)) => {
                println!("- {}: {}", engine.as_str().cyan(), payload);
            }
            Some(Exploit::Variants(variants)) => {
                println!("- {}:", engine.as_str().cyan());
                for (name, payload) in variants {
                    println!("    * {name} -> {payload}");
                }
            }
            None => {
                println!("- {}: {}", engine.as_str().cyan(), "No PoC available".yellow());
            }
        }
    }
}

/// Full payload and exploit dump for the selected engines.
pub fn print_payload_dump(db: &EngineDatabase, selected: impl Iterator<Item = EngineName>) {
    println!("{}", "All payloads and exploits:".bold());
    for engine in selected {
        let Some(rec) = db.get(&engine) else { continue };
        println!("\n{}:", engine.as_str().cyan());
        for probe in rec.spec.payloads.keys() {
            println!("  * {probe}");
        }
        match &rec.spec.exploit {
            Some(Exploit::Single(payload)) => {
                println!("\n  {}\n    - {payload}", "Exploit:".yellow());
            }
            Some(Exploit::Variants(variants)) => {
                println!("\n  {}", "Exploit:".yellow());
                for (name, payload) in variants {
                    println!("    - {name} -> {payload}");
                }
            }
            None => {}
        }
    }
}

#[derive(Tabled)]
struct FalseNegativeRow {
    #[tabled(rename = "Payload")]
    probe: String,
    #[tabled(rename = "Engine")]
    engine: String,
    #[tabled(rename = "Expected")]
    expected: String,
    #[tabled(rename = "Actual")]
    actual: String,
}

#[derive(Tabled)]
struct FalsePositiveRow {
    #[tabled(rename = "Payload")]
    probe: String,
    #[tabled(rename = "Engine")]
    engine: String,
    #[tabled(rename = "Unexpected Value")]
    value: String,
}

/// Summary counts plus itemized failure tables. Diagnostic only.
pub fn print_validation_report(report: &ValidationReport) {
    println!(
        "\n{}",
        format!("Cross-validation ({})", report.language.to_uppercase())
            .bold()
            .underline()
    );
    println!(
        "  * Success: {} out of {} expected checks",
        report.passed.to_string().green(),
        report.expected_checks
    );

    if !report.false_negatives.is_empty() {
        println!(
            "  * False negatives (expected match failed): {}",
            report.false_negatives.len().to_string().red()
        );
        let rows: Vec<FalseNegativeRow> = report
            .false_negatives
            .iter()
            .map(|f| FalseNegativeRow {
                probe: f.probe.clone(),
                engine: f.engine.as_str().to_string(),
                expected: f.expected.clone(),
                actual: f.actual.clone(),
            })
            .collect();
        println!("{}", Table::new(rows).with(Style::rounded()));
    }

    if !report.false_positives.is_empty() {
        println!(
            "  * False positives (unexpected match): {}",
            report.false_positives.len().to_string().red()
        );
        let rows: Vec<FalsePositiveRow> = report
            .false_positives
            .iter()
            .map(|f| FalsePositiveRow {
                probe: f.probe.clone(),
                engine: f.engine.as_str().to_string(),
                value: f.value.clone(),
            })
            .collect();
        println!("{}", Table::new(rows).with(Style::rounded()));
    }

    if report.is_clean() {
        println!("{}", "  All payloads are unique and correctly scoped".green());
    }
}
