use std::path::PathBuf;

use clap::Parser;

use penney_sim::config::{ResolvedOutputs, SimulationConfig};
use penney_sim::logging::init_logging;
use penney_sim::runner::SimulationRunner;

/// Deck-simulation harness for Penney's Game.
#[derive(Debug, Parser)]
#[command(
    name = "penney-sim",
    author,
    version,
    about = "Deterministic Penney's Game simulation harness"
)]
struct Cli {
    /// YAML configuration file for the simulation.
    #[arg(short, long, value_name = "FILE", default_value = "sim/penney.yaml")]
    config: PathBuf,

    /// Use a different run identifier; replaces `{run_id}` in output paths.
    #[arg(long, value_name = "RUN_ID")]
    run_id: Option<String>,

    /// Play this many decks instead of the configured count.
    #[arg(long, value_name = "DECKS")]
    decks: Option<usize>,

    /// Seed the deck shuffler explicitly.
    #[arg(long, value_name = "SEED")]
    seed: Option<u64>,

    /// Decks per persisted batch record; 0 saves each deck on its own.
    #[arg(long, value_name = "SIZE")]
    batch_size: Option<usize>,

    /// Report raw sums instead of per-game averages.
    #[arg(long)]
    totals: bool,

    /// Stop once the configuration has been checked.
    #[arg(long)]
    validate_only: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = SimulationConfig::from_path(&cli.config)?;

    if let Some(run_id) = cli.run_id {
        config.run_id = run_id;
    }

    if let Some(decks) = cli.decks {
        config.decks.count = decks;
    }

    if let Some(seed) = cli.seed {
        config.decks.seed = Some(seed);
    }

    if let Some(batch_size) = cli.batch_size {
        config.decks.batch_size = batch_size;
    }

    if cli.totals {
        config.aggregation.average = false;
    }

    config.validate()?;

    let outputs: ResolvedOutputs = config.resolved_outputs();
    let run_id = config.run_id.clone();
    let decks = config.decks.count;
    let batch_size = config.decks.batch_size;

    println!(
        "Loaded configuration '{run_id}' ({decks} deck{}, batch size {batch_size})",
        if decks == 1 { "" } else { "s" }
    );

    let _logging_guard = init_logging(&config.logging, &outputs)?;
    let runner = SimulationRunner::new(config, outputs);

    if cli.validate_only {
        println!("Validation-only mode: simulation execution skipped.");
        return Ok(());
    }

    let summary = runner.run()?;
    println!(
        "Simulation complete for '{run_id}': {} decks → {} rows at {}",
        summary.decks_played,
        summary.rows_written,
        summary.jsonl_path.display()
    );
    if summary.batches_written > 0 {
        println!(
            "Aggregated {} games across {} batch file{}",
            summary.games_aggregated,
            summary.batches_written,
            if summary.batches_written == 1 { "" } else { "s" }
        );
    } else {
        println!("Aggregated {} games", summary.games_aggregated);
    }
    println!("Summary table: {}", summary.summary_path.display());
    if let Some(plot_path) = summary.plot_path.as_ref() {
        println!("Win-rate heatmap: {}", plot_path.display());
    }
    if let Some(telemetry_path) = summary.telemetry_path.as_ref() {
        println!("Telemetry log: {}", telemetry_path.display());
    }

    Ok(())
}
