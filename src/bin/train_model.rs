//! train_model - run the external YOLO trainer with the project hyperparameters

use anyhow::Result;
use clap::Parser;
use std::io::IsTerminal;
use std::path::PathBuf;

use ppe_monitor::ui::Ui;
use ppe_monitor::TrainingPlan;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Dataset descriptor.
    #[arg(long, default_value = "data/data.yaml")]
    data: PathBuf,
    /// Directory that receives run artifacts.
    #[arg(long, default_value = "models")]
    project: PathBuf,
    /// Trainer executable.
    #[arg(long, env = "PPE_TRAINER", default_value = "yolo")]
    trainer: PathBuf,
    /// Export best.pt to ONNX after training.
    #[arg(long)]
    export_onnx: bool,
    /// Print the trainer command and exit.
    #[arg(long)]
    dry_run: bool,
    /// UI mode for stderr progress (auto|plain|pretty)
    #[arg(long, default_value = "auto", value_name = "MODE")]
    ui: String,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let ui = Ui::from_args(Some(&args.ui), std::io::stderr().is_terminal());

    let mut plan = TrainingPlan::new(args.data);
    plan.project = args.project;
    plan.trainer = args.trainer;

    {
        let _stage = ui.stage("Check dataset descriptor");
        plan.check_prerequisites()?;
    }
    if args.dry_run {
        println!("{} {}", plan.trainer.display(), plan.arguments().join(" "));
        return Ok(());
    }

    // The trainer draws its own progress; no spinner while it runs.
    let weights = plan.run()?;
    println!("weights: {}", weights.display());

    if args.export_onnx {
        let onnx = {
            let _stage = ui.stage("Export ONNX");
            plan.export_onnx(&weights)?
        };
        println!("onnx: {}", onnx.display());
    }
    Ok(())
}
