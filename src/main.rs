use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use classify_lib::batch::{run_batch_classification, BatchOptions};
use classify_lib::ruleset::builtin::compiled_builtin;
use classify_lib::ruleset::RuleSet;
use classify_lib::utils::env::load_env;
use classify_lib::utils::progress_bars::progress_config::ProgressConfig;

/// Batch nationality classification over a JSONL file of entity records.
#[derive(Parser, Debug)]
#[command(name = "classify_batch")]
struct Args {
    /// Input JSONL file: one entity record object per line.
    input: PathBuf,

    /// Output file for verdict lines (JSONL).
    #[arg(short, long, default_value = "verdicts.jsonl")]
    output: PathBuf,

    /// Ruleset JSON file. Uses the built-in China ruleset when omitted.
    #[arg(short, long)]
    ruleset: Option<PathBuf>,

    /// Concurrent classification tasks.
    #[arg(short, long)]
    jobs: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    load_env();

    let args = Args::parse();

    let ruleset = match &args.ruleset {
        Some(path) => {
            let ruleset = RuleSet::load_from_path(path)?;
            Arc::new(
                ruleset
                    .compile()
                    .with_context(|| format!("Ruleset failed validation: {}", path.display()))?,
            )
        }
        None => {
            info!("No ruleset supplied; using the built-in China ruleset");
            Arc::new(compiled_builtin().clone())
        }
    };

    let options = BatchOptions {
        jobs: args.jobs.unwrap_or_else(num_cpus::get),
        progress: ProgressConfig::from_env(),
    };

    let report = run_batch_classification(&args.input, &args.output, ruleset, &options).await?;

    info!(
        "📄 Verdicts written to {} (run {})",
        args.output.display(),
        report.run_id
    );
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}
