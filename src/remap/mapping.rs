use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;

use crate::ontology::Ontology;

#[derive(Debug, Deserialize)]
struct MappingFile {
    #[serde(default)]
    classes: BTreeMap<String, String>,
}

/// Translation table from foreign class IDs to project class IDs.
///
/// IDs stay strings on both sides: they are copied into label files verbatim.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ClassMapping {
    table: BTreeMap<String, String>,
}

impl ClassMapping {
    pub fn new<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            table: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Load a `[classes]` table from TOML, or JSON when the extension is `.json`.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read class mapping {}", path.display()))?;
        let file: MappingFile = if path.extension().is_some_and(|ext| ext == "json") {
            serde_json::from_str(&raw)
                .map_err(|e| anyhow!("invalid class mapping {}: {}", path.display(), e))?
        } else {
            toml::from_str(&raw)
                .map_err(|e| anyhow!("invalid class mapping {}: {}", path.display(), e))?
        };
        let mapping = Self { table: file.classes };
        for (from, to) in &mapping.table {
            if from.trim().is_empty() || to.trim().is_empty() || to.split_whitespace().count() != 1
            {
                return Err(anyhow!(
                    "class mapping {} has an invalid entry '{}' -> '{}'",
                    path.display(),
                    from,
                    to
                ));
            }
        }
        Ok(mapping)
    }

    /// Fail unless every destination ID names a class of `ontology`.
    pub fn validate_against(&self, ontology: &Ontology) -> Result<()> {
        for (from, to) in &self.table {
            if !ontology.contains_id(to) {
                return Err(anyhow!(
                    "class mapping sends '{}' to '{}', which is not a class index (0..{})",
                    from,
                    to,
                    ontology.len()
                ));
            }
        }
        Ok(())
    }

    pub fn translate(&self, class_id: &str) -> Option<&str> {
        self.table.get(class_id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.table.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}
