use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use penney_core::game::matrix::DeckResults;
use penney_core::model::deck::Deck;
use rand::{RngCore, SeedableRng, rngs::StdRng};
use serde::Serialize;
use thiserror::Error;
use tracing::{Level, event};

use crate::aggregate::{AggregateOutcome, AggregationError, aggregate_category};
use crate::analytics::{AnalyticsError, SummaryReport};
use crate::config::{ResolvedOutputs, SimulationConfig};
use crate::storage::{GameStore, ResultCategory, StorageError};

/// Primary entry point for orchestrating simulation runs.
pub struct SimulationRunner {
    config: SimulationConfig,
    outputs: ResolvedOutputs,
    store: GameStore,
    logging_enabled: bool,
}

/// Summary details returned after a run.
pub struct RunSummary {
    pub decks_played: usize,
    pub rows_written: usize,
    pub batches_written: usize,
    pub games_aggregated: u32,
    pub jsonl_path: PathBuf,
    pub summary_path: PathBuf,
    pub plot_path: Option<PathBuf>,
    pub telemetry_path: Option<PathBuf>,
}

impl SimulationRunner {
    /// Build a runner from a validated configuration.
    pub fn new(config: SimulationConfig, outputs: ResolvedOutputs) -> Self {
        let store = GameStore::new(outputs.data_dir.clone());
        Self {
            logging_enabled: config.logging.enable_structured,
            config,
            outputs,
            store,
        }
    }

    pub fn store(&self) -> &GameStore {
        &self.store
    }

    /// Play every configured deck, persist the result grids, and aggregate
    /// them into the run summary.
    pub fn run(&self) -> Result<RunSummary, RunnerError> {
        ensure_parent(self.outputs.jsonl.parent())?;
        ensure_parent(self.outputs.summary_md.parent())?;
        if !self.outputs.plots_dir.as_os_str().is_empty() {
            fs::create_dir_all(&self.outputs.plots_dir)?;
        }
        self.store.ensure_layout()?;

        let mut writer = BufWriter::new(File::create(&self.outputs.jsonl)?);
        let mut rng = StdRng::seed_from_u64(self.config.decks.seed.unwrap_or(0));
        let mut rows_written = 0usize;
        let mut batches_written = 0usize;

        let batch_size = self.config.decks.batch_size;
        let mut batch = DeckResults::empty();
        let mut batch_games = 0u32;

        for deck_index in 0..self.config.decks.count {
            // Each deck consumes one seed draw so runs replay deck-for-deck.
            let deck_seed = rng.next_u64();
            let deck = Deck::shuffled_with_seed(deck_seed);
            let results = DeckResults::compute(&deck);

            if batch_size > 0 {
                batch.add_assign(&results);
                batch_games += 1;
                if batch_games as usize == batch_size {
                    self.store
                        .save_batch(&batches_written.to_string(), &batch, batch_games)?;
                    batches_written += 1;
                    batch = DeckResults::empty();
                    batch_games = 0;
                }
            } else {
                self.store.save_deck(deck.id(), &results)?;
            }

            rows_written += self.write_deck_row(&mut writer, deck_index, deck_seed, &deck, &results)?;

            if self.logging_enabled && tracing::enabled!(Level::INFO) {
                event!(
                    target: "penney_sim::deck",
                    Level::INFO,
                    run_id = %self.config.run_id,
                    deck_index = deck_index as u64,
                    deck_id = %deck.id(),
                    card_wins = results.cards_wins.total() as u32,
                    trick_wins = results.tricks_wins.total() as u32
                );
            }
        }

        if batch_games > 0 {
            self.store
                .save_batch(&batches_written.to_string(), &batch, batch_games)?;
            batches_written += 1;
        }

        writer.flush()?;

        let average = self.config.aggregation.average;
        let cards = aggregate_category(&self.store, ResultCategory::Cards, average)?;
        let tricks = aggregate_category(&self.store, ResultCategory::Tricks, average)?;
        let cards_ties = aggregate_category(&self.store, ResultCategory::CardsTies, average)?;
        let tricks_ties = aggregate_category(&self.store, ResultCategory::TricksTies, average)?;
        let games_aggregated = cards.games;

        let report = self.build_report(cards, tricks, cards_ties, tricks_ties);
        report.write_markdown(&self.outputs.summary_md)?;
        let plot_path = match report.render_heatmap(&self.outputs.plots_dir) {
            Ok(path) => Some(path),
            Err(err) => {
                eprintln!("WARN: {}", err);
                None
            }
        };

        let telemetry_path = self
            .logging_enabled
            .then(|| crate::logging::telemetry_path(&self.outputs));

        Ok(RunSummary {
            decks_played: self.config.decks.count,
            rows_written,
            batches_written,
            games_aggregated,
            jsonl_path: self.outputs.jsonl.clone(),
            summary_path: self.outputs.summary_md.clone(),
            plot_path,
            telemetry_path,
        })
    }

    fn build_report(
        &self,
        cards: AggregateOutcome,
        tricks: AggregateOutcome,
        cards_ties: AggregateOutcome,
        tricks_ties: AggregateOutcome,
    ) -> SummaryReport {
        SummaryReport::from_aggregates(
            cards,
            tricks,
            cards_ties,
            tricks_ties,
            self.config.aggregation.average,
        )
    }

    fn write_deck_row(
        &self,
        writer: &mut BufWriter<File>,
        deck_index: usize,
        deck_seed: u64,
        deck: &Deck,
        results: &DeckResults,
    ) -> Result<usize, RunnerError> {
        let row = DeckLogRow {
            run_id: self.config.run_id.clone(),
            deck_index,
            deck_seed,
            deck_id: deck.id().to_string(),
            deck_bits: deck.bits(),
            card_wins: results.cards_wins.total() as u32,
            trick_wins: results.tricks_wins.total() as u32,
            card_ties: results.cards_draws.total() as u32,
            trick_ties: results.tricks_draws.total() as u32,
        };

        serde_json::to_writer(&mut *writer, &row)?;
        writer.write_all(b"\n")?;
        Ok(1)
    }
}

fn ensure_parent(path: Option<&Path>) -> Result<(), RunnerError> {
    if let Some(dir) = path.filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    Ok(())
}

/// One JSONL row per deck: pairing-level cell counts out of the 64 pairings.
#[derive(Serialize)]
struct DeckLogRow {
    run_id: String,
    deck_index: usize,
    deck_seed: u64,
    deck_id: String,
    deck_bits: String,
    card_wins: u32,
    trick_wins: u32,
    card_ties: u32,
    trick_ties: u32,
}

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
    #[error("failed to serialize log row: {source}")]
    Serialize {
        #[from]
        source: serde_json::Error,
    },
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Aggregation(#[from] AggregationError),
    #[error("analytics error: {0}")]
    Analytics(#[from] AnalyticsError),
}

#[cfg(test)]
mod tests {
    use super::SimulationRunner;
    use crate::config::SimulationConfig;
    use tempfile::tempdir;

    fn config_for(dir: &std::path::Path, count: usize, batch_size: usize) -> SimulationConfig {
        let yaml = format!(
            r#"
run_id: "runner_test"
decks:
  seed: 99
  count: {count}
  batch_size: {batch_size}
outputs:
  jsonl: "{jsonl}"
  data_dir: "{data}"
  summary_md: "{summary}"
  plots_dir: "{plots}"
aggregation:
  average: false
logging:
  enable_structured: false
"#,
            jsonl = dir.join("decks.jsonl").display(),
            data = dir.join("data").display(),
            summary = dir.join("summary.md").display(),
            plots = dir.join("plots").display()
        );
        let mut cfg: SimulationConfig = serde_yaml::from_str(&yaml).expect("valid yaml");
        cfg.validate().expect("config validates");
        cfg
    }

    #[test]
    fn individual_saves_write_one_file_per_deck() {
        let dir = tempdir().expect("temp dir");
        let config = config_for(dir.path(), 3, 0);
        let outputs = config.resolved_outputs();
        let runner = SimulationRunner::new(config, outputs);

        let summary = runner.run().expect("run completes");
        assert_eq!(summary.decks_played, 3);
        assert_eq!(summary.rows_written, 3);
        assert_eq!(summary.batches_written, 0);
        assert_eq!(summary.games_aggregated, 3);
    }

    #[test]
    fn trailing_partial_batch_is_flushed() {
        let dir = tempdir().expect("temp dir");
        let config = config_for(dir.path(), 5, 2);
        let outputs = config.resolved_outputs();
        let runner = SimulationRunner::new(config, outputs);

        let summary = runner.run().expect("run completes");
        // Two full batches plus one partial batch of a single deck.
        assert_eq!(summary.batches_written, 3);
        assert_eq!(summary.games_aggregated, 5);
    }
}
