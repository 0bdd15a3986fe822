use std::collections::{BTreeSet, HashMap};

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

use crate::ontology::{HARDHAT, HEAD, NO_HARDHAT, NO_HELMET, NO_SAFETY_VEST, SAFETY_VEST};

/// Outcome a rule assigns to a detected class.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Compliant,
    Violation,
    /// Recognised but never drawn.
    Ignored,
}

/// Overlay colors available to rules.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    Green,
    Red,
    Amber,
    White,
}

impl Color {
    pub fn rgb(self) -> [u8; 3] {
        match self {
            Color::Green => [0, 255, 0],
            Color::Red => [255, 0, 0],
            Color::Amber => [255, 191, 0],
            Color::White => [255, 255, 255],
        }
    }
}

/// Maps a set of trigger class names to a verdict and its overlay.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ComplianceRule {
    pub classes: BTreeSet<String>,
    pub verdict: Verdict,
    #[serde(default)]
    pub color: Option<Color>,
    #[serde(default)]
    pub text: Option<String>,
}

impl ComplianceRule {
    pub fn new<I, S>(classes: I, verdict: Verdict, color: Color, text: &str) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            classes: classes.into_iter().map(Into::into).collect(),
            verdict,
            color: Some(color),
            text: Some(text.to_string()),
        }
    }

    pub fn ignored<I, S>(classes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            classes: classes.into_iter().map(Into::into).collect(),
            verdict: Verdict::Ignored,
            color: None,
            text: None,
        }
    }
}

/// Helmet and vest rules used when the configuration does not supply its own.
///
/// A bare `Head` counts as a missing helmet.
pub fn default_rules() -> Vec<ComplianceRule> {
    vec![
        ComplianceRule::new([HARDHAT], Verdict::Compliant, Color::Green, "SAFE: HELMET"),
        ComplianceRule::new(
            [NO_HARDHAT, NO_HELMET, HEAD],
            Verdict::Violation,
            Color::Red,
            "DANGER: NO HELMET",
        ),
        ComplianceRule::new([SAFETY_VEST], Verdict::Compliant, Color::Green, "SAFE: VEST"),
        ComplianceRule::new(
            [NO_SAFETY_VEST],
            Verdict::Violation,
            Color::Red,
            "DANGER: NO VEST",
        ),
    ]
}

/// Immutable lookup from class name to its rule.
#[derive(Clone, Debug)]
pub struct RuleTable {
    rules: Vec<ComplianceRule>,
    by_class: HashMap<String, usize>,
}

impl RuleTable {
    pub fn new(rules: Vec<ComplianceRule>) -> Result<Self> {
        let mut by_class = HashMap::new();
        for (idx, rule) in rules.iter().enumerate() {
            if rule.classes.is_empty() {
                return Err(anyhow!("rule {} has no trigger classes", idx));
            }
            if rule.verdict != Verdict::Ignored {
                if rule.color.is_none() {
                    return Err(anyhow!("rule {} ({:?}) needs a color", idx, rule.verdict));
                }
                if rule.text.as_deref().map_or(true, |t| t.trim().is_empty()) {
                    return Err(anyhow!("rule {} ({:?}) needs a text", idx, rule.verdict));
                }
            }
            for class in &rule.classes {
                if by_class.insert(class.clone(), idx).is_some() {
                    return Err(anyhow!("class '{}' is claimed by more than one rule", class));
                }
            }
        }
        Ok(Self { rules, by_class })
    }

    pub fn lookup(&self, class_name: &str) -> Option<&ComplianceRule> {
        self.by_class.get(class_name).map(|&idx| &self.rules[idx])
    }

    pub fn rules(&self) -> &[ComplianceRule] {
        &self.rules
    }
}

impl Default for RuleTable {
    fn default() -> Self {
        let rules = default_rules();
        let by_class = rules
            .iter()
            .enumerate()
            .flat_map(|(idx, rule)| rule.classes.iter().map(move |c| (c.clone(), idx)))
            .collect();
        Self { rules, by_class }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_table_matches_explicit_construction() {
        let built = RuleTable::new(default_rules()).unwrap();
        let default = RuleTable::default();
        for class in [HARDHAT, HEAD, NO_HELMET, NO_HARDHAT, SAFETY_VEST, NO_SAFETY_VEST] {
            assert_eq!(built.lookup(class), default.lookup(class));
        }
        assert!(default.lookup("Person").is_none());
    }

    #[test]
    fn duplicate_trigger_is_rejected() {
        let rules = vec![
            ComplianceRule::new(["Hardhat"], Verdict::Compliant, Color::Green, "SAFE"),
            ComplianceRule::new(["Hardhat"], Verdict::Violation, Color::Red, "DANGER"),
        ];
        let err = RuleTable::new(rules).unwrap_err();
        assert!(err.to_string().contains("more than one rule"));
    }

    #[test]
    fn drawn_rule_requires_text() {
        let rule = ComplianceRule {
            classes: ["Hardhat".to_string()].into_iter().collect(),
            verdict: Verdict::Compliant,
            color: Some(Color::Green),
            text: None,
        };
        assert!(RuleTable::new(vec![rule]).is_err());
        assert!(RuleTable::new(vec![ComplianceRule::ignored(["Person"])]).is_ok());
    }

    #[test]
    fn rules_deserialize_from_toml() {
        #[derive(Deserialize)]
        struct Doc {
            rules: Vec<ComplianceRule>,
        }
        let doc: Doc = toml::from_str(
            r#"
            [[rules]]
            classes = ["Gloves"]
            verdict = "compliant"
            color = "green"
            text = "SAFE: GLOVES"

            [[rules]]
            classes = ["Person"]
            verdict = "ignored"
            "#,
        )
        .unwrap();
        let table = RuleTable::new(doc.rules).unwrap();
        assert_eq!(table.lookup("Gloves").unwrap().color, Some(Color::Green));
        assert_eq!(table.lookup("Person").unwrap().verdict, Verdict::Ignored);
    }
}
