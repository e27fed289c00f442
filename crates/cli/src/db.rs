// Payload database loading
// One payloads_<lang>.json per language, merged into a single database

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::warn;

use tplprobe_core::domain::{EngineDatabase, EngineSpec};

pub fn database_path(payload_dir: &Path, language: &str) -> PathBuf {
    payload_dir.join(format!("payloads_{language}.json"))
}

fn parse_file(path: &Path) -> Result<BTreeMap<String, EngineSpec>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Payload database not found: {}", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("Malformed payload database: {}", path.display()))
}

/// Load and merge the databases for the given languages. A missing or
/// malformed file is fatal.
pub fn load_databases(payload_dir: &Path, languages: &[String]) -> Result<EngineDatabase> {
    let mut db = EngineDatabase::new();
    for language in languages {
        let raw = parse_file(&database_path(payload_dir, language))?;
        db.merge_language(language, raw)
            .with_context(|| format!("while merging {language} database"))?;
    }
    Ok(db)
}

/// Lenient variant for listings: languages without a database file are
/// skipped with a warning instead of aborting.
pub fn load_available_databases(payload_dir: &Path, languages: &[String]) -> Result<EngineDatabase> {
    let mut db = EngineDatabase::new();
    for language in languages {
        let path = database_path(payload_dir, language);
        if !path.is_file() {
            warn!(path = %path.display(), "payload database missing, skipped");
            continue;
        }
        let raw = parse_file(&path)?;
        db.merge_language(language, raw)
            .with_context(|| format!("while merging {language} database"))?;
    }
    Ok(db)
}
