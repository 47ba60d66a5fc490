//! Canned-shader fallback table.
//!
//! When the generation service is unreachable the provider scans the
//! lowercased description for rule keywords and serves a hand-authored
//! shader instead. The table is plain data so deployments can extend the
//! built-in set from a TOML rules file without touching the matching logic.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

const BLUE_FILL: &str = r"#version 450
layout(location = 0) out vec4 out_color;

void main() {
    out_color = vec4(0.0, 0.0, 1.0, 1.0);
}
";

const GRADIENT: &str = r"#version 450
layout(location = 0) out vec4 out_color;

void main() {
    vec2 uv = gl_FragCoord.xy / 400.0;
    out_color = vec4(uv.x, uv.y, 0.5, 1.0);
}
";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FallbackRule {
    pub name: String,
    pub keywords: Vec<String>,
    pub source: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FallbackTable {
    #[serde(default)]
    pub rules: Vec<FallbackRule>,
}

impl FallbackTable {
    /// The hand-authored rules shipped with the playground.
    pub fn builtin() -> Self {
        Self {
            rules: vec![
                FallbackRule {
                    name: "blue-fill".into(),
                    keywords: vec!["blue".into()],
                    source: BLUE_FILL.into(),
                },
                FallbackRule {
                    name: "gradient".into(),
                    keywords: vec!["gradient".into()],
                    source: GRADIENT.into(),
                },
            ],
        }
    }

    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let table: Self = toml::from_str(raw).context("failed to parse fallback rules")?;
        table.validate()?;
        Ok(table)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read fallback rules at {}", path.display()))?;
        Self::from_toml_str(&raw)
            .with_context(|| format!("invalid fallback rules at {}", path.display()))
    }

    /// Returns the first rule with a keyword occurring in the description.
    ///
    /// Matching is case-insensitive on the description side; keywords are
    /// expected to be stored lowercase.
    pub fn select(&self, description: &str) -> Option<&FallbackRule> {
        let needle = description.to_lowercase();
        self.rules.iter().find(|rule| {
            rule.keywords
                .iter()
                .any(|keyword| !keyword.is_empty() && needle.contains(keyword.as_str()))
        })
    }

    fn validate(&self) -> Result<()> {
        for rule in &self.rules {
            if rule.name.trim().is_empty() {
                bail!("fallback rule with empty name");
            }
            if rule.keywords.iter().all(|keyword| keyword.trim().is_empty()) {
                bail!("fallback rule '{}' has no usable keywords", rule.name);
            }
            if rule.source.trim().is_empty() {
                bail!("fallback rule '{}' has an empty shader source", rule.name);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selects_blue_rule_by_keyword() {
        let table = FallbackTable::builtin();
        let rule = table.select("a blue background").expect("blue rule");
        assert_eq!(rule.name, "blue-fill");
        assert!(rule.source.contains("vec4(0.0, 0.0, 1.0, 1.0)"));
    }

    #[test]
    fn selects_gradient_rule_by_keyword() {
        let table = FallbackTable::builtin();
        let rule = table.select("a gradient backdrop").expect("gradient rule");
        assert_eq!(rule.name, "gradient");
        assert!(rule.source.contains("gl_FragCoord"));
    }

    #[test]
    fn matching_ignores_description_case() {
        let table = FallbackTable::builtin();
        assert!(table.select("A BLUE Background").is_some());
    }

    #[test]
    fn unmatched_descriptions_select_nothing() {
        let table = FallbackTable::builtin();
        assert!(table.select("a shiny metal sphere").is_none());
        assert!(table.select("").is_none());
    }

    #[test]
    fn loads_rules_from_toml() {
        let raw = r#"
            [[rules]]
            name = "red-fill"
            keywords = ["red", "crimson"]
            source = "void main() {}"
        "#;
        let table = FallbackTable::from_toml_str(raw).unwrap();
        assert_eq!(table.rules.len(), 1);
        assert_eq!(table.select("something crimson").unwrap().name, "red-fill");
    }

    #[test]
    fn loads_rules_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.toml");
        fs::write(
            &path,
            "[[rules]]\nname = \"noise\"\nkeywords = [\"noise\"]\nsource = \"void main() {}\"\n",
        )
        .unwrap();
        let table = FallbackTable::load(&path).unwrap();
        assert!(table.select("some noise please").is_some());
    }

    #[test]
    fn rejects_rule_without_keywords() {
        let raw = r#"
            [[rules]]
            name = "broken"
            keywords = [""]
            source = "void main() {}"
        "#;
        assert!(FallbackTable::from_toml_str(raw).is_err());
    }
}
