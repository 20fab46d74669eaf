use std::fs;
use std::path::{Path, PathBuf};

use penney_core::game::matrix::SequenceGrid;
use penney_core::model::sequence::Sequence;
use plotters::prelude::*;
use statrs::distribution::{ContinuousCDF, Normal};
use thiserror::Error;

use crate::aggregate::AggregateOutcome;

#[derive(Debug, Error)]
pub enum AnalyticsError {
    #[error("{context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to render plot: {0}")]
    Plot(String),
}

/// Win- and tie-rate summary across every aggregated game.
pub struct SummaryReport {
    pub games: u32,
    pub cards: SequenceGrid,
    pub tricks: SequenceGrid,
    pub cards_ties: SequenceGrid,
    pub tricks_ties: SequenceGrid,
    pub best_responses: Vec<BestResponse>,
}

/// The strongest reply to one opponent sequence, judged by card win rate.
pub struct BestResponse {
    pub opponent: Sequence,
    pub response: Sequence,
    pub card_win_rate: f64,
    pub trick_win_rate: f64,
    pub card_tie_rate: f64,
    pub p_value: f64,
}

impl SummaryReport {
    /// Build the report from aggregated category outcomes. Raw sums are
    /// normalized to per-game rates; averaged outcomes pass through.
    pub fn from_aggregates(
        cards: AggregateOutcome,
        tricks: AggregateOutcome,
        cards_ties: AggregateOutcome,
        tricks_ties: AggregateOutcome,
        averaged: bool,
    ) -> Self {
        let games = cards.games;
        let mut grids = [
            cards.grid,
            tricks.grid,
            cards_ties.grid,
            tricks_ties.grid,
        ];
        if !averaged {
            for grid in grids.iter_mut() {
                grid.divide(f64::from(games));
            }
        }
        let [cards, tricks, cards_ties, tricks_ties] = grids;

        let best_responses = Sequence::ALL
            .iter()
            .map(|opponent| best_response_for(*opponent, &cards, &tricks, &cards_ties, games))
            .collect();

        Self {
            games,
            cards,
            tricks,
            cards_ties,
            tricks_ties,
            best_responses,
        }
    }

    pub fn write_markdown(&self, path: impl AsRef<Path>) -> Result<(), AnalyticsError> {
        let mut rows = String::new();
        rows.push_str("# Penney's Game Summary\n\n");
        rows.push_str(&format!("Games aggregated: {}\n\n", self.games));

        rows.push_str("## Best responses by card win rate\n\n");
        rows.push_str("| Opponent | Response | Card win % | Trick win % | Card tie % | p-value |\n");
        rows.push_str("|----------|----------|------------|-------------|------------|---------|\n");
        for best in &self.best_responses {
            rows.push_str(&format!(
                "| {opponent} | {response} | {cards:.1}% | {tricks:.1}% | {ties:.1}% | {pval:.4} |\n",
                opponent = best.opponent,
                response = best.response,
                cards = best.card_win_rate * 100.0,
                tricks = best.trick_win_rate * 100.0,
                ties = best.card_tie_rate * 100.0,
                pval = best.p_value,
            ));
        }
        rows.push('\n');

        rows.push_str("## Card win rates (row: opponent, column: mine)\n\n");
        rows.push_str(&grid_table(&self.cards));
        rows.push('\n');
        rows.push_str("## Trick win rates (row: opponent, column: mine)\n\n");
        rows.push_str(&grid_table(&self.tricks));

        fs::write(path.as_ref(), rows).map_err(|e| AnalyticsError::Io {
            context: "writing summary markdown",
            source: e,
        })?;
        Ok(())
    }

    pub fn render_heatmap(&self, dir: impl AsRef<Path>) -> Result<PathBuf, AnalyticsError> {
        let dir = dir.as_ref();
        if !dir.as_os_str().is_empty() {
            fs::create_dir_all(dir).map_err(|e| AnalyticsError::Io {
                context: "creating plots directory",
                source: e,
            })?;
        }

        let output_path = dir.join("card_win_rates.png");
        let cells = *self.cards.cells();

        let prev_hook = std::panic::take_hook();
        std::panic::set_hook(Box::new(|_| {}));

        let plot_attempt = std::panic::catch_unwind(move || {
            let root = BitMapBackend::new(&output_path, (640, 560)).into_drawing_area();
            root.fill(&WHITE)
                .map_err(|e| AnalyticsError::Plot(e.to_string()))?;

            let row_labels: Vec<String> = SequenceGrid::row_labels()
                .iter()
                .map(Sequence::to_string)
                .collect();
            let column_labels: Vec<String> = SequenceGrid::column_labels()
                .iter()
                .map(Sequence::to_string)
                .collect();

            let mut chart = ChartBuilder::on(&root)
                .margin(20)
                .caption("Player-two card win rate by pairing", ("sans-serif", 22))
                .set_label_area_size(LabelAreaPosition::Left, 50)
                .set_label_area_size(LabelAreaPosition::Bottom, 40)
                .build_cartesian_2d(0..Sequence::COUNT, 0..Sequence::COUNT)
                .map_err(|e| AnalyticsError::Plot(e.to_string()))?;

            chart
                .configure_mesh()
                .disable_mesh()
                .x_desc("my sequence")
                .y_desc("opponent sequence")
                .x_label_formatter(&|idx| {
                    column_labels.get(*idx).cloned().unwrap_or_default()
                })
                .y_label_formatter(&|idx| {
                    // Row 0 of the grid renders at the top of the chart.
                    row_labels
                        .get(Sequence::COUNT.saturating_sub(1 + *idx))
                        .cloned()
                        .unwrap_or_default()
                })
                .draw()
                .map_err(|e| AnalyticsError::Plot(e.to_string()))?;

            chart
                .draw_series((0..Sequence::COUNT).flat_map(|row| {
                    (0..Sequence::COUNT).map(move |column| {
                        let top = Sequence::COUNT - row;
                        Rectangle::new(
                            [(column, top - 1), (column + 1, top)],
                            rate_color(cells[row][column]).filled(),
                        )
                    })
                }))
                .map_err(|e| AnalyticsError::Plot(e.to_string()))?;

            drop(chart);

            root.present()
                .map_err(|e| AnalyticsError::Plot(e.to_string()))?;

            drop(root);

            Ok(output_path)
        });

        std::panic::set_hook(prev_hook);

        match plot_attempt {
            Ok(result) => result,
            Err(_) => Err(AnalyticsError::Plot(
                "plotters panicked while rendering (missing font support?)".into(),
            )),
        }
    }
}

fn best_response_for(
    opponent: Sequence,
    cards: &SequenceGrid,
    tricks: &SequenceGrid,
    cards_ties: &SequenceGrid,
    games: u32,
) -> BestResponse {
    let mut response = Sequence::ALL[0];
    let mut best_rate = f64::MIN;
    for candidate in Sequence::ALL {
        let rate = cards.get(opponent, candidate);
        if rate > best_rate {
            best_rate = rate;
            response = candidate;
        }
    }

    BestResponse {
        opponent,
        response,
        card_win_rate: best_rate,
        trick_win_rate: tricks.get(opponent, response),
        card_tie_rate: cards_ties.get(opponent, response),
        p_value: two_sided_p_value(best_rate, games),
    }
}

// Two-sided z-test of a win rate against the fair-coin 0.5 baseline.
fn two_sided_p_value(rate: f64, games: u32) -> f64 {
    if games == 0 {
        return 1.0;
    }
    let n = f64::from(games);
    let standard_error = 0.5 / n.sqrt();
    let z = ((rate - 0.5) / standard_error).abs();
    let normal = Normal::new(0.0, 1.0).unwrap();
    let p = 2.0 * (1.0 - normal.cdf(z));
    p.clamp(0.0, 1.0)
}

fn grid_table(grid: &SequenceGrid) -> String {
    let mut table = String::from("| opponent \\ mine |");
    for column in SequenceGrid::column_labels() {
        table.push_str(&format!(" {column} |"));
    }
    table.push('\n');
    table.push_str("|---|");
    for _ in SequenceGrid::column_labels() {
        table.push_str("---|");
    }
    table.push('\n');

    for (row_index, row) in SequenceGrid::row_labels().iter().enumerate() {
        table.push_str(&format!("| {row} |"));
        for column_index in 0..Sequence::COUNT {
            table.push_str(&format!(" {:.3} |", grid.cells()[row_index][column_index]));
        }
        table.push('\n');
    }
    table
}

fn rate_color(rate: f64) -> RGBColor {
    let clamped = rate.clamp(0.0, 1.0);
    let intensity = (255.0 * clamped).round() as u8;
    RGBColor(255 - intensity, intensity, 96)
}
