// Merged Engine Database and derived probe views

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::domain::engine::{EngineName, EngineSpec, LanguageId};
use crate::error::{AppError, Result};

/// Which per-engine table a derived view is built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeTable {
    /// Full payload table (validation, REPL dumps).
    Payloads,
    /// Narrowing table: discriminators with payload fallback.
    Discrimination,
}

/// One engine merged into the global database.
#[derive(Debug, Clone)]
pub struct EngineRecord {
    pub language: LanguageId,
    pub spec: EngineSpec,
}

/// One probe and the expected output per engine that records it.
///
/// Elements of a derived view, in deterministic first-seen merge order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeExpectations {
    pub probe: String,
    pub expected: BTreeMap<EngineName, String>,
}

/// All engines across every loaded language, keyed by lowercased name.
///
/// Immutable once loading is complete; derived probe views are built
/// on demand for the engine subset under consideration.
#[derive(Debug, Default)]
pub struct EngineDatabase {
    engines: BTreeMap<EngineName, EngineRecord>,
}

impl EngineDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge one language's database. Engine names collide after
    /// lowercasing at most within the raw file (serde map keys), so the
    /// only conflict checked here is across languages.
    pub fn merge_language(
        &mut self,
        language: &str,
        raw: BTreeMap<String, EngineSpec>,
    ) -> Result<()> {
        for (name, spec) in raw {
            let name = EngineName::new(&name);
            if self.engines.contains_key(&name) {
                return Err(AppError::DuplicateEngine(name.to_string()));
            }
            self.engines.insert(
                name,
                EngineRecord {
                    language: language.to_string(),
                    spec,
                },
            );
        }
        Ok(())
    }

    /// Register an engine a worker hosts but no database file declares.
    /// Such engines have empty tables and no exploit metadata.
    pub fn ensure_engine(&mut self, language: &str, name: &EngineName) {
        self.engines.entry(name.clone()).or_insert_with(|| EngineRecord {
            language: language.to_string(),
            spec: EngineSpec::default(),
        });
    }

    pub fn get(&self, name: &EngineName) -> Option<&EngineRecord> {
        self.engines.get(name)
    }

    pub fn engine_names(&self) -> impl Iterator<Item = &EngineName> {
        self.engines.keys()
    }

    pub fn len(&self) -> usize {
        self.engines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.engines.is_empty()
    }

    /// Engines of one language, sorted by name.
    pub fn engines_of(&self, language: &str) -> Vec<EngineName> {
        self.engines
            .iter()
            .filter(|(_, rec)| rec.language == language)
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Group the given engines by owning language. Engines unknown to
    /// the database are skipped.
    pub fn group_by_language(
        &self,
        engines: &BTreeSet<EngineName>,
    ) -> BTreeMap<LanguageId, Vec<EngineName>> {
        let mut grouped: BTreeMap<LanguageId, Vec<EngineName>> = BTreeMap::new();
        for name in engines {
            if let Some(rec) = self.engines.get(name) {
                grouped.entry(rec.language.clone()).or_default().push(name.clone());
            }
        }
        grouped
    }

    /// Build the probe -> {engine -> expected} view for a subset of
    /// engines. Returned in first-seen merge order: engines are walked
    /// in name order and each engine's table in its own key order, so
    /// the sequence is a pure function of the database contents.
    pub fn probe_view(
        &self,
        engines: &BTreeSet<EngineName>,
        table: ProbeTable,
    ) -> Vec<ProbeExpectations> {
        let mut view: Vec<ProbeExpectations> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();

        for name in engines {
            let Some(rec) = self.engines.get(name) else {
                continue;
            };
            let entries = match table {
                ProbeTable::Payloads => &rec.spec.payloads,
                ProbeTable::Discrimination => rec.spec.discrimination_table(),
            };
            for (probe, expected) in entries {
                let slot = *index.entry(probe.clone()).or_insert_with(|| {
                    view.push(ProbeExpectations {
                        probe: probe.clone(),
                        expected: BTreeMap::new(),
                    });
                    view.len() - 1
                });
                view[slot].expected.insert(name.clone(), expected.clone());
            }
        }
        view
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(payloads: &[(&str, &str)]) -> EngineSpec {
        EngineSpec {
            payloads: payloads
                .iter()
                .map(|(p, e)| (p.to_string(), e.to_string()))
                .collect(),
            ..Default::default()
        }
    }

    #[test]
    fn duplicate_engine_across_languages_is_rejected() {
        let mut db = EngineDatabase::new();
        db.merge_language("node", BTreeMap::from([("EJS".into(), spec(&[]))]))
            .unwrap();
        let err = db
            .merge_language("python", BTreeMap::from([("ejs".into(), spec(&[]))]))
            .unwrap_err();
        assert!(matches!(err, AppError::DuplicateEngine(ref n) if n == "ejs"));
    }

    #[test]
    fn probe_view_merges_expected_per_engine() {
        let mut db = EngineDatabase::new();
        db.merge_language(
            "python",
            BTreeMap::from([
                ("jinja2".into(), spec(&[("{{7*7}}", "49")])),
                ("mako".into(), spec(&[("{{7*7}}", "{{7*7}}"), ("${7*7}", "49")])),
            ]),
        )
        .unwrap();

        let engines: BTreeSet<_> = db.engine_names().cloned().collect();
        let view = db.probe_view(&engines, ProbeTable::Payloads);

        assert_eq!(view.len(), 2);
        let entry = view.iter().find(|p| p.probe == "{{7*7}}").unwrap();
        assert_eq!(entry.expected.len(), 2);
        assert_eq!(entry.expected[&EngineName::new("jinja2")], "49");
    }

    #[test]
    fn probe_view_order_is_deterministic() {
        let mut db = EngineDatabase::new();
        db.merge_language(
            "node",
            BTreeMap::from([
                ("b-engine".into(), spec(&[("p2", "x"), ("p3", "y")])),
                ("a-engine".into(), spec(&[("p1", "x"), ("p2", "y")])),
            ]),
        )
        .unwrap();

        let engines: BTreeSet<_> = db.engine_names().cloned().collect();
        let probes: Vec<_> = db
            .probe_view(&engines, ProbeTable::Payloads)
            .into_iter()
            .map(|p| p.probe)
            .collect();

        // a-engine merges first (name order), then b-engine adds p3.
        assert_eq!(probes, vec!["p1", "p2", "p3"]);
    }

    #[test]
    fn ensure_engine_keeps_existing_record() {
        let mut db = EngineDatabase::new();
        db.merge_language("node", BTreeMap::from([("pug".into(), spec(&[("#{7*7}", "49")]))]))
            .unwrap();
        db.ensure_engine("node", &EngineName::new("pug"));
        db.ensure_engine("node", &EngineName::new("dot"));

        assert_eq!(db.len(), 2);
        assert_eq!(db.get(&EngineName::new("pug")).unwrap().spec.payloads.len(), 1);
        assert!(db.get(&EngineName::new("dot")).unwrap().spec.payloads.is_empty());
    }
}
