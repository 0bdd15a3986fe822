//! remap_labels - fold an external YOLO dataset into the project ontology

use anyhow::{anyhow, Result};
use clap::Parser;
use std::io::IsTerminal;
use std::path::PathBuf;

use ppe_monitor::ui::Ui;
use ppe_monitor::{ClassMapping, DatasetDescriptor, Ontology, RemapJob, Remapper, SplitDirs};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Root of the external dataset (contains <split>/images and <split>/labels).
    #[arg(long)]
    source_root: Option<PathBuf>,
    /// Explicit source labels directory (overrides --source-root).
    #[arg(long)]
    source_labels: Option<PathBuf>,
    /// Explicit source images directory (overrides --source-root).
    #[arg(long)]
    source_images: Option<PathBuf>,
    /// Root of the project dataset.
    #[arg(long, default_value = "data")]
    dest_root: PathBuf,
    /// Explicit destination labels directory.
    #[arg(long)]
    dest_labels: Option<PathBuf>,
    /// Explicit destination images directory.
    #[arg(long)]
    dest_images: Option<PathBuf>,
    /// Split to read and write.
    #[arg(long, default_value = "train")]
    split: String,
    /// Class mapping file (`[classes]` table, TOML or JSON).
    #[arg(long)]
    mapping: PathBuf,
    /// Project data.yaml; its class list bounds the mapping targets.
    #[arg(long)]
    dataset: Option<PathBuf>,
    /// UI mode for stderr progress (auto|plain|pretty)
    #[arg(long, default_value = "auto", value_name = "MODE")]
    ui: String,
}

fn resolve_dirs(
    root: Option<&PathBuf>,
    split: &str,
    labels: Option<PathBuf>,
    images: Option<PathBuf>,
    side: &str,
) -> Result<SplitDirs> {
    let base = root.map(|root| SplitDirs::under(root, split));
    let labels = labels
        .or_else(|| base.as_ref().map(|b| b.labels.clone()))
        .ok_or_else(|| anyhow!("{side} labels directory not given (use --{side}-root or --{side}-labels)"))?;
    let images = images
        .or_else(|| base.as_ref().map(|b| b.images.clone()))
        .ok_or_else(|| anyhow!("{side} images directory not given (use --{side}-root or --{side}-images)"))?;
    Ok(SplitDirs { images, labels })
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let ui = Ui::from_args(Some(&args.ui), std::io::stderr().is_terminal());

    let source = resolve_dirs(
        args.source_root.as_ref(),
        &args.split,
        args.source_labels,
        args.source_images,
        "source",
    )?;
    let dest = resolve_dirs(
        Some(&args.dest_root),
        &args.split,
        args.dest_labels,
        args.dest_images,
        "dest",
    )?;

    let (mapping, ontology) = {
        let _stage = ui.stage("Load class mapping");
        let ontology = match &args.dataset {
            Some(path) => DatasetDescriptor::load(path)?.ontology()?,
            None => Ontology::default(),
        };
        let mapping = ClassMapping::load(&args.mapping)?;
        mapping.validate_against(&ontology)?;
        for (from, to) in mapping.iter() {
            log::info!(
                "class {} -> {} ({})",
                from,
                to,
                to.parse::<usize>()
                    .ok()
                    .and_then(|id| ontology.name(id))
                    .unwrap_or("?")
            );
        }
        (mapping, ontology)
    };

    let remapper = Remapper::new(RemapJob {
        source,
        dest,
        mapping,
        ontology,
    });
    let total = remapper.label_files()?.len() as u64;
    let bar = ui.progress(total);
    // Skips are reported by the remapper's own warning log.
    let report = remapper.run_with(|_| bar.inc(1))?;
    bar.finish_and_clear();

    println!(
        "imported {} of {} label files ({} skipped without image, {} filtered empty)",
        report.imported,
        report.scanned,
        report.skipped.len(),
        report.empty
    );
    Ok(())
}
