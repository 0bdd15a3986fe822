//! Training dataset descriptor (`data.yaml`).
//!
//! The descriptor names the class list and the image directories of each
//! split. Label directories sit next to image directories, with the last
//! `images` path component replaced by `labels`.

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;

use crate::ontology::Ontology;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ClassNames {
    List(Vec<String>),
    Map(BTreeMap<usize, String>),
}

#[derive(Debug, Deserialize)]
struct DescriptorFile {
    path: Option<PathBuf>,
    train: PathBuf,
    val: Option<PathBuf>,
    test: Option<PathBuf>,
    nc: Option<usize>,
    names: ClassNames,
}

/// Image and label directories of one dataset split.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SplitDirs {
    pub images: PathBuf,
    pub labels: PathBuf,
}

impl SplitDirs {
    /// `<root>/<split>/images` and `<root>/<split>/labels`.
    pub fn under(root: &Path, split: &str) -> Self {
        Self {
            images: root.join(split).join("images"),
            labels: root.join(split).join("labels"),
        }
    }
}

/// Parsed dataset descriptor.
#[derive(Clone, Debug)]
pub struct DatasetDescriptor {
    /// Location of the descriptor file itself.
    pub source: PathBuf,
    pub root: PathBuf,
    pub train: PathBuf,
    pub val: Option<PathBuf>,
    pub test: Option<PathBuf>,
    names: Vec<String>,
}

impl DatasetDescriptor {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(anyhow!("dataset descriptor not found at {}", path.display()));
        }
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read dataset descriptor {}", path.display()))?;
        Self::parse(&raw, path)
    }

    pub fn parse(raw: &str, source: &Path) -> Result<Self> {
        let file: DescriptorFile = serde_yaml::from_str(raw)
            .map_err(|e| anyhow!("invalid dataset descriptor {}: {}", source.display(), e))?;

        let names = match file.names {
            ClassNames::List(names) => names,
            ClassNames::Map(map) => {
                let names: Vec<String> = map.values().cloned().collect();
                if map.keys().copied().ne(0..names.len()) {
                    return Err(anyhow!(
                        "dataset descriptor {} has non-contiguous class indices",
                        source.display()
                    ));
                }
                names
            }
        };
        if let Some(nc) = file.nc {
            if nc != names.len() {
                return Err(anyhow!(
                    "dataset descriptor {} declares nc={} but lists {} names",
                    source.display(),
                    nc,
                    names.len()
                ));
            }
        }

        let base = source.parent().unwrap_or_else(|| Path::new("."));
        let root = match file.path {
            Some(p) if p.is_absolute() => p,
            Some(p) => base.join(p),
            None => base.to_path_buf(),
        };

        Ok(Self {
            source: source.to_path_buf(),
            root,
            train: file.train,
            val: file.val,
            test: file.test,
            names,
        })
    }

    pub fn class_names(&self) -> &[String] {
        &self.names
    }

    pub fn ontology(&self) -> Result<Ontology> {
        Ontology::new(self.names.clone())
    }

    /// Directories of the training split.
    pub fn train_dirs(&self) -> SplitDirs {
        self.split_dirs(&self.train)
    }

    /// Directories of the validation split, if declared.
    pub fn val_dirs(&self) -> Option<SplitDirs> {
        self.val.as_ref().map(|v| self.split_dirs(v))
    }

    fn split_dirs(&self, split: &Path) -> SplitDirs {
        let images = if split.is_absolute() {
            split.to_path_buf()
        } else {
            self.root.join(split)
        };
        SplitDirs {
            labels: labels_dir_for(&images),
            images,
        }
    }
}

fn labels_dir_for(images: &Path) -> PathBuf {
    let components: Vec<Component<'_>> = images.components().collect();
    match components
        .iter()
        .rposition(|c| c.as_os_str() == "images")
    {
        Some(idx) => {
            let mut labels = PathBuf::new();
            for (i, c) in components.iter().enumerate() {
                if i == idx {
                    labels.push("labels");
                } else {
                    labels.push(c.as_os_str());
                }
            }
            labels
        }
        None => images.join("labels"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_list_names_and_resolves_relative_root() {
        let raw = r#"
path: ../datasets/ppe
train: train/images
val: valid/images
names: ['Hardhat', 'Head', 'No-Helmet', 'Safety Vest', 'NO-Safety Vest', 'NO-Hardhat', 'Person']
"#;
        let desc = DatasetDescriptor::parse(raw, Path::new("data/data.yaml")).unwrap();
        assert_eq!(desc.root, PathBuf::from("data/../datasets/ppe"));
        assert_eq!(desc.class_names()[5], "NO-Hardhat");
        let train = desc.train_dirs();
        assert_eq!(train.images, PathBuf::from("data/../datasets/ppe/train/images"));
        assert_eq!(train.labels, PathBuf::from("data/../datasets/ppe/train/labels"));
        assert!(desc.val_dirs().is_some());
    }

    #[test]
    fn parses_index_map_names() {
        let raw = "train: train/images\nnc: 2\nnames:\n  0: Hardhat\n  1: Head\n";
        let desc = DatasetDescriptor::parse(raw, Path::new("data.yaml")).unwrap();
        assert_eq!(desc.class_names(), &["Hardhat".to_string(), "Head".to_string()]);
    }

    #[test]
    fn rejects_nc_mismatch() {
        let raw = "train: train/images\nnc: 3\nnames: ['Hardhat']\n";
        assert!(DatasetDescriptor::parse(raw, Path::new("data.yaml")).is_err());
    }

    #[test]
    fn split_dirs_under_root() {
        let dirs = SplitDirs::under(Path::new("data"), "train");
        assert_eq!(dirs.images, PathBuf::from("data/train/images"));
        assert_eq!(dirs.labels, PathBuf::from("data/train/labels"));
    }
}
