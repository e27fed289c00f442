// Engine Domain Model

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Language identifier ("node", "php", "ruby", "python", "java", "go")
pub type LanguageId = String;

/// Engine name, lowercased on construction.
///
/// Names are case-insensitive and globally unique across all merged
/// language databases; `Ord` keeps merged views sorted by name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EngineName(String);

impl EngineName {
    pub fn new(s: impl AsRef<str>) -> Self {
        Self(s.as_ref().trim().to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EngineName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Exploit metadata: a single proof-of-concept payload or a set of
/// named variants.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Exploit {
    Single(String),
    Variants(BTreeMap<String, String>),
}

/// One engine's entry in a payload database.
///
/// `payloads` maps probe templates to the output this engine is
/// expected to render; `discriminators` is an optional curated subset
/// used for narrowing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineSpec {
    #[serde(default)]
    pub payloads: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discriminators: Option<BTreeMap<String, String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exploit: Option<Exploit>,
}

impl EngineSpec {
    /// Table used for discrimination: curated discriminators when the
    /// engine has them, full payload table otherwise.
    pub fn discrimination_table(&self) -> &BTreeMap<String, String> {
        self.discriminators.as_ref().unwrap_or(&self.payloads)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn engine_name_lowercases() {
        assert_eq!(EngineName::new(" Jinja2 ").as_str(), "jinja2");
        assert_eq!(EngineName::new("EJS"), EngineName::new("ejs"));
    }

    #[test]
    fn exploit_deserializes_single_and_variants() {
        let single: Exploit = serde_json::from_value(json!("{{7*7}}")).unwrap();
        assert!(matches!(single, Exploit::Single(ref s) if s == "{{7*7}}"));

        let variants: Exploit =
            serde_json::from_value(json!({"rce": "{{cmd}}", "read": "{{file}}"})).unwrap();
        match variants {
            Exploit::Variants(map) => assert_eq!(map.len(), 2),
            _ => panic!("expected variants"),
        }
    }

    #[test]
    fn discrimination_table_falls_back_to_payloads() {
        let mut spec = EngineSpec::default();
        spec.payloads.insert("{{7*7}}".into(), "49".into());
        assert_eq!(spec.discrimination_table().len(), 1);

        spec.discriminators = Some(BTreeMap::from([("{{7*'7'}}".into(), "7777777".into())]));
        assert!(spec.discrimination_table().contains_key("{{7*'7'}}"));
        assert!(!spec.discrimination_table().contains_key("{{7*7}}"));
    }
}
