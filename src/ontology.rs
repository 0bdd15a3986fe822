//! Project label ontology.
//!
//! Class IDs in annotation files are indices into this list. The default
//! ordering reserves index 5 for `NO-Hardhat`, which is where foreign
//! "cap"/"bare head" classes are folded during remapping.

use anyhow::{anyhow, Result};

pub const HARDHAT: &str = "Hardhat";
pub const HEAD: &str = "Head";
pub const NO_HELMET: &str = "No-Helmet";
pub const SAFETY_VEST: &str = "Safety Vest";
pub const NO_SAFETY_VEST: &str = "NO-Safety Vest";
pub const NO_HARDHAT: &str = "NO-Hardhat";
pub const PERSON: &str = "Person";

/// Index reserved for `NO-Hardhat` in the default ontology.
pub const NO_HARDHAT_ID: usize = 5;

const DEFAULT_CLASSES: [&str; 7] = [
    HARDHAT,
    HEAD,
    NO_HELMET,
    SAFETY_VEST,
    NO_SAFETY_VEST,
    NO_HARDHAT,
    PERSON,
];

/// Ordered class list. Index = class ID.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ontology {
    names: Vec<String>,
}

impl Ontology {
    pub fn new(names: Vec<String>) -> Result<Self> {
        if names.is_empty() {
            return Err(anyhow!("ontology must contain at least one class"));
        }
        for (idx, name) in names.iter().enumerate() {
            if name.trim().is_empty() {
                return Err(anyhow!("ontology class {} has an empty name", idx));
            }
            if names[..idx].contains(name) {
                return Err(anyhow!("ontology class '{}' is listed twice", name));
            }
        }
        if names.get(NO_HARDHAT_ID).map(String::as_str) != Some(NO_HARDHAT) {
            log::warn!(
                "ontology does not place {} at index {}; remapping tables may target the wrong class",
                NO_HARDHAT,
                NO_HARDHAT_ID
            );
        }
        Ok(Self { names })
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn name(&self, id: usize) -> Option<&str> {
        self.names.get(id).map(String::as_str)
    }

    pub fn id_of(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    /// True when `class_id` is a decimal index inside the ontology.
    pub fn contains_id(&self, class_id: &str) -> bool {
        class_id
            .parse::<usize>()
            .map(|id| id < self.names.len())
            .unwrap_or(false)
    }
}

impl Default for Ontology {
    fn default() -> Self {
        Self {
            names: DEFAULT_CLASSES.iter().map(|n| n.to_string()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_ontology_reserves_no_hardhat_index() {
        let ontology = Ontology::default();
        assert_eq!(ontology.name(NO_HARDHAT_ID), Some(NO_HARDHAT));
        assert_eq!(ontology.id_of(HARDHAT), Some(0));
        assert!(ontology.contains_id("5"));
        assert!(!ontology.contains_id("7"));
        assert!(!ontology.contains_id("cap"));
    }

    #[test]
    fn rejects_duplicate_names() {
        let err = Ontology::new(vec!["Hardhat".into(), "Hardhat".into()]).unwrap_err();
        assert!(err.to_string().contains("listed twice"));
    }
}
