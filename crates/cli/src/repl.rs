// Interactive surface: worker startup, optional discrimination, REPL

use std::collections::BTreeSet;
use std::io::{BufRead, Write};
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Result};
use colored::Colorize;
use futures::future;
use tracing::info;

use tplprobe_core::application::{discriminate, Dispatcher, Outcome};
use tplprobe_core::domain::EngineName;
use tplprobe_core::error::AppError;
use tplprobe_core::port::{Operator, WorkerError, WorkerHost};

use crate::db;
use crate::tables;

/// Real operator port: shows the probe on the terminal and reads one
/// line of observed output.
pub struct StdinOperator;

impl Operator for StdinOperator {
    fn observe(&mut self, probe: &str) -> tplprobe_core::Result<String> {
        println!("\nDiscriminator payload: {probe}\n");
        print!("> ");
        std::io::stdout().flush()?;
        let mut line = String::new();
        let n = std::io::stdin().lock().read_line(&mut line)?;
        if n == 0 {
            return Err(AppError::OperatorClosed);
        }
        Ok(line)
    }
}

fn prompt(text: &str) -> Result<Option<String>> {
    print!("{text}");
    std::io::stdout().flush()?;
    let mut line = String::new();
    if std::io::stdin().lock().read_line(&mut line)? == 0 {
        return Ok(None); // EOF
    }
    Ok(Some(line.trim().to_string()))
}

const HELP: &str = "\
Available commands:

 help / ?         -> Show this help message
 ?engines         -> List active engines
 ?payloads        -> Show all payloads and exploits
 <template>       -> Send a template to all engines
 exit             -> Exit the program";

pub async fn run(
    host: Arc<dyn WorkerHost>,
    payload_dir: &Path,
    languages: &[String],
    engines_arg: Option<Vec<String>>,
    guess: bool,
) -> Result<()> {
    let restriction: Option<Vec<String>> = engines_arg
        .as_ref()
        .map(|list| list.iter().map(|e| e.trim().to_lowercase()).collect());

    // Start every language worker in parallel and enumerate what each
    // one actually hosts.
    let startups = languages.iter().map(|language| {
        let host = Arc::clone(&host);
        let restriction = restriction.clone();
        async move {
            host.start(language, restriction.as_deref()).await?;
            let hosted = host.request(language, "").await?;
            Ok::<_, WorkerError>((language.clone(), hosted))
        }
    });

    let mut db = db::load_databases(payload_dir, languages)?;
    let mut initial: BTreeSet<EngineName> = BTreeSet::new();
    for result in future::join_all(startups).await {
        let (language, hosted) = result?;
        for name in hosted.keys() {
            let engine = EngineName::new(name);
            if let Some(restriction) = &restriction {
                if !restriction.contains(&engine.as_str().to_string()) {
                    continue;
                }
            }
            // Hosted engines without a database entry get an empty record.
            db.ensure_engine(&language, &engine);
            initial.insert(engine);
        }
        info!(language = %language, "worker enumerated");
    }

    if initial.is_empty() {
        bail!("No engines available for the requested languages");
    }

    let selected = if guess {
        match discriminate(&db, initial, &mut StdinOperator) {
            Ok(Outcome::Identified(engine)) => {
                println!(
                    "\nAfter discrimination: {}\n",
                    engine.as_str().green().bold()
                );
                BTreeSet::from([engine])
            }
            Ok(Outcome::Ambiguous(set)) => {
                let names: Vec<&str> = set.iter().map(|e| e.as_str()).collect();
                println!(
                    "\nAfter discrimination (ambiguous): {}\n",
                    names.join(", ").green()
                );
                set
            }
            Err(e @ AppError::Contradiction { .. }) => {
                println!("{}", format!("No matching engine: {e}").red());
                bail!("discrimination failed");
            }
            Err(e) => return Err(e.into()),
        }
    } else {
        initial
    };

    if restriction.is_some() || guess {
        tables::print_exploits(&db, selected.iter().cloned());
    }

    let active = db.group_by_language(&selected);
    let dispatcher = Dispatcher::new(host);

    println!("\n{}\n", "Type 'exit' to quit.".bold());

    loop {
        let Some(cmd) = prompt("\nTemplate > ")? else {
            break;
        };
        match cmd.as_str() {
            "" => continue,
            "exit" => break,
            "?" | "help" => println!("{HELP}"),
            "?engines" => {
                println!("{}\n", "Active engines:".bold());
                for engine in &selected {
                    println!(" * {}", engine.as_str());
                }
            }
            "?payloads" => tables::print_payload_dump(&db, selected.iter().cloned()),
            template => {
                let outputs = dispatcher.dispatch(template, &active).await?;
                tables::print_result_tables(&db, &outputs);
            }
        }
    }
    Ok(())
}
