//! Label remapping.
//!
//! Folds a foreign dataset into the project ontology: every label file is
//! filtered and re-keyed through a [`ClassMapping`], and the paired image is
//! copied only when at least one record survives. Images and label files in
//! the destination therefore always come in pairs.
//!
//! Output is a pure function of the inputs and the mapping, so re-running a
//! job rewrites identical bytes.

mod mapping;
mod record;

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};

use crate::dataset::SplitDirs;
use crate::ontology::Ontology;

pub use mapping::ClassMapping;
pub use record::{remap_label_text, AnnotationRecord, MIN_FIELDS};

/// Image extensions probed for each label file, in order.
pub const IMAGE_EXTENSIONS: [&str; 2] = ["jpg", "png"];

const LABEL_EXTENSION: &str = "txt";

/// Source and destination trees plus the mapping to apply.
///
/// Every mapping target must be a class index of `ontology`.
#[derive(Clone, Debug)]
pub struct RemapJob {
    pub source: SplitDirs,
    pub dest: SplitDirs,
    pub mapping: ClassMapping,
    pub ontology: Ontology,
}

/// What happened to one label file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FileOutcome {
    Imported(String),
    /// Neither a `.jpg` nor a `.png` sits next to the label file.
    MissingImage(String),
    /// No record survived filtering; nothing was written.
    Empty(String),
}

/// Aggregate result of a remap run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RemapReport {
    pub scanned: usize,
    pub imported: usize,
    pub skipped: Vec<String>,
    pub empty: usize,
}

pub struct Remapper {
    job: RemapJob,
}

impl Remapper {
    pub fn new(job: RemapJob) -> Self {
        Self { job }
    }

    pub fn job(&self) -> &RemapJob {
        &self.job
    }

    /// Label files in the source labels directory, sorted by name.
    pub fn label_files(&self) -> Result<Vec<PathBuf>> {
        let dir = &self.job.source.labels;
        if !dir.is_dir() {
            return Err(anyhow!("source labels directory not found: {}", dir.display()));
        }
        let mut files = Vec::new();
        for entry in std::fs::read_dir(dir)
            .with_context(|| format!("failed to list {}", dir.display()))?
        {
            let path = entry?.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == LABEL_EXTENSION) {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    pub fn run(&self) -> Result<RemapReport> {
        self.run_with(|_| {})
    }

    /// Run the job, reporting each file's outcome to `on_file`.
    pub fn run_with<F: FnMut(&FileOutcome)>(&self, mut on_file: F) -> Result<RemapReport> {
        self.job.mapping.validate_against(&self.job.ontology)?;
        let files = self.label_files()?;
        for dir in [&self.job.dest.labels, &self.job.dest.images] {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("failed to create {}", dir.display()))?;
        }
        log::info!(
            "remapping {} label files from {} ({} class mappings)",
            files.len(),
            self.job.source.labels.display(),
            self.job.mapping.len()
        );

        let mut report = RemapReport {
            scanned: files.len(),
            ..RemapReport::default()
        };
        for label_path in files {
            let outcome = self.process_file(&label_path)?;
            match &outcome {
                FileOutcome::Imported(_) => report.imported += 1,
                FileOutcome::MissingImage(name) => {
                    log::warn!("no image found for {}", name);
                    report.skipped.push(name.clone());
                }
                FileOutcome::Empty(_) => report.empty += 1,
            }
            on_file(&outcome);
        }

        log::info!(
            "imported {} image/label pairs into {}",
            report.imported,
            self.job.dest.labels.display()
        );
        Ok(report)
    }

    fn process_file(&self, label_path: &Path) -> Result<FileOutcome> {
        // Destination files keep the raw OS names so label and image stay paired.
        let file_name: OsString = label_path
            .file_name()
            .map(|n| n.to_os_string())
            .ok_or_else(|| anyhow!("label path has no file name: {}", label_path.display()))?;
        let display_name = file_name.to_string_lossy().into_owned();

        let Some(image_path) = self.paired_image(label_path) else {
            return Ok(FileOutcome::MissingImage(display_name));
        };

        let text = std::fs::read_to_string(label_path)
            .with_context(|| format!("failed to read {}", label_path.display()))?;
        let Some(body) = remap_label_text(&text, &self.job.mapping) else {
            return Ok(FileOutcome::Empty(display_name));
        };

        let dest_label = self.job.dest.labels.join(&file_name);
        std::fs::write(&dest_label, body)
            .with_context(|| format!("failed to write {}", dest_label.display()))?;

        let image_name = image_path
            .file_name()
            .ok_or_else(|| anyhow!("image path has no file name: {}", image_path.display()))?;
        let dest_image = self.job.dest.images.join(image_name);
        std::fs::copy(&image_path, &dest_image).with_context(|| {
            format!(
                "failed to copy {} to {}",
                image_path.display(),
                dest_image.display()
            )
        })?;

        Ok(FileOutcome::Imported(display_name))
    }

    fn paired_image(&self, label_path: &Path) -> Option<PathBuf> {
        let stem = label_path.file_stem()?;
        IMAGE_EXTENSIONS
            .iter()
            .map(|ext| {
                let mut name = stem.to_os_string();
                name.push(".");
                name.push(ext);
                self.job.source.images.join(name)
            })
            .find(|candidate| candidate.is_file())
    }
}
