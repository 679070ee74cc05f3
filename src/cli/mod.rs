// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// This is the entry point for all user interaction.
// It uses the `clap` crate to parse command line arguments.
// All business logic is delegated to Layer 2 (application).
//
// Three commands are supported:
//   1. `train`   — fits bundles on a CSV file and publishes them
//   2. `serve`   — loads bundles and answers HTTP predictions
//   3. `predict` — loads bundles and answers one prediction
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, PredictArgs, ServeArgs, TrainArgs};

/// The main CLI struct, parsed by clap's Parser derive.
#[derive(Parser, Debug)]
#[command(
    name = "crop-price",
    version,
    about = "Train categorical-feature price regressors on CSV data, then serve predictions."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Dispatch to the matching use case. The CLI only routes.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args)   => run_train(args),
            Commands::Serve(args)   => run_serve(args),
            Commands::Predict(args) => run_predict(args),
        }
    }
}

fn run_train(args: TrainArgs) -> Result<()> {
    use crate::application::train_use_case::TrainUseCase;

    tracing::info!("Starting training on: {}", args.data);
    let artifacts_dir = args.artifacts_dir.clone();

    let ids = TrainUseCase::new(args.into()).execute()?;

    println!("Training complete. Published {} bundle(s) to '{}':", ids.len(), artifacts_dir);
    for id in ids {
        println!("  {id}");
    }
    Ok(())
}

fn run_serve(args: ServeArgs) -> Result<()> {
    use crate::application::serve_use_case::ServeUseCase;

    ServeUseCase::new(args.into()).execute()
}

fn run_predict(args: PredictArgs) -> Result<()> {
    use crate::application::predict_use_case::PredictUseCase;

    let use_case   = PredictUseCase::new(&args.artifacts_dir, args.bundle, args.decimals)?;
    let prediction = use_case.predict_json(&args.input)?;

    println!("{}", serde_json::json!({ "predicted_price": prediction.price }));
    tracing::info!("Predicted with bundle '{}'", prediction.bundle_id);
    Ok(())
}
