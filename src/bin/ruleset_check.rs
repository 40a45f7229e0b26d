// src/bin/ruleset_check.rs - Validate and summarize a ruleset file
//
// Lint step for ruleset authors: fails fast on structural problems and prints
// the tier/exclusion/registry breakdown plus the fingerprint a batch run
// would record.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use classify_lib::models::verdict::SignalTier;
use classify_lib::ruleset::builtin::builtin_china_ruleset;
use classify_lib::ruleset::RuleSet;

#[derive(Parser, Debug)]
#[command(name = "ruleset_check")]
struct Args {
    /// Ruleset JSON file to check. Checks the built-in ruleset when omitted.
    ruleset: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let (label, ruleset) = match &args.ruleset {
        Some(path) => (path.display().to_string(), RuleSet::load_from_path(path)?),
        None => ("built-in".to_string(), builtin_china_ruleset()),
    };

    let compiled = ruleset.compile()?;

    println!("Ruleset:      {} (version {})", label, compiled.version);
    println!("Fingerprint:  {}", compiled.fingerprint);
    println!("Signals:      {}", compiled.signals.len());
    for tier in SignalTier::ordered() {
        let count = compiled.signals_in_tier(tier).count();
        if count > 0 {
            println!("  {:<14} {}", tier.as_str(), count);
        }
    }
    println!("Exclusions:   {}", compiled.exclusions.len());
    println!("Registry:     {} entries", compiled.registry.len());
    println!("OK");

    Ok(())
}
