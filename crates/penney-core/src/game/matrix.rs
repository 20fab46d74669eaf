use crate::game::outcome::GameOutcome;
use crate::game::scoring::score_deck;
use crate::model::deck::Deck;
use crate::model::sequence::Sequence;
use serde::{Deserialize, Serialize};

/// An 8x8 table keyed by (opponent sequence, my sequence). Rows are kept in
/// reversed lexicographic order so `000` sits in the bottom-left corner of a
/// rendered table; columns stay in lexicographic order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequenceGrid {
    cells: [[f64; Sequence::COUNT]; Sequence::COUNT],
}

impl SequenceGrid {
    pub fn zeros() -> Self {
        Self {
            cells: [[0.0; Sequence::COUNT]; Sequence::COUNT],
        }
    }

    pub fn row_labels() -> [Sequence; Sequence::COUNT] {
        let mut labels = Sequence::ALL;
        labels.reverse();
        labels
    }

    pub fn column_labels() -> [Sequence; Sequence::COUNT] {
        Sequence::ALL
    }

    const fn row_of(opponent: Sequence) -> usize {
        Sequence::COUNT - 1 - opponent.index()
    }

    pub fn get(&self, opponent: Sequence, mine: Sequence) -> f64 {
        self.cells[Self::row_of(opponent)][mine.index()]
    }

    pub fn set(&mut self, opponent: Sequence, mine: Sequence, value: f64) {
        self.cells[Self::row_of(opponent)][mine.index()] = value;
    }

    pub fn cells(&self) -> &[[f64; Sequence::COUNT]; Sequence::COUNT] {
        &self.cells
    }

    pub fn add_assign(&mut self, other: &SequenceGrid) {
        for (row, other_row) in self.cells.iter_mut().zip(other.cells.iter()) {
            for (cell, other_cell) in row.iter_mut().zip(other_row.iter()) {
                *cell += *other_cell;
            }
        }
    }

    pub fn divide(&mut self, divisor: f64) {
        for row in self.cells.iter_mut() {
            for cell in row.iter_mut() {
                *cell /= divisor;
            }
        }
    }

    pub fn total(&self) -> f64 {
        self.cells.iter().flatten().sum()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        let snapshot = GridSnapshot::capture(self);
        serde_json::to_string_pretty(&snapshot)
    }
}

impl Default for SequenceGrid {
    fn default() -> Self {
        Self::zeros()
    }
}

/// Labelled form of a grid for inspection and export.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GridSnapshot {
    pub rows: Vec<String>,
    pub columns: Vec<String>,
    pub cells: [[f64; Sequence::COUNT]; Sequence::COUNT],
}

impl GridSnapshot {
    pub fn capture(grid: &SequenceGrid) -> Self {
        Self {
            rows: SequenceGrid::row_labels()
                .iter()
                .map(Sequence::to_string)
                .collect(),
            columns: SequenceGrid::column_labels()
                .iter()
                .map(Sequence::to_string)
                .collect(),
            cells: *grid.cells(),
        }
    }
}

/// The four result grids produced by playing every sequence pairing against
/// one deck.
#[derive(Debug, Clone, PartialEq)]
pub struct DeckResults {
    pub cards_wins: SequenceGrid,
    pub tricks_wins: SequenceGrid,
    pub cards_draws: SequenceGrid,
    pub tricks_draws: SequenceGrid,
}

impl DeckResults {
    pub fn empty() -> Self {
        Self {
            cards_wins: SequenceGrid::zeros(),
            tricks_wins: SequenceGrid::zeros(),
            cards_draws: SequenceGrid::zeros(),
            tricks_draws: SequenceGrid::zeros(),
        }
    }

    /// Score every ordered pairing of player sequences against `deck` and
    /// record the win and draw flags for each.
    pub fn compute(deck: &Deck) -> Self {
        let mut results = Self::empty();
        for seq1 in Sequence::ALL {
            for seq2 in Sequence::ALL {
                let scores = score_deck(deck, seq1, seq2);
                let outcome = GameOutcome::classify(&scores);
                results
                    .cards_wins
                    .set(seq1, seq2, f64::from(outcome.cards.win_flag()));
                results
                    .tricks_wins
                    .set(seq1, seq2, f64::from(outcome.tricks.win_flag()));
                results
                    .cards_draws
                    .set(seq1, seq2, f64::from(outcome.cards.draw_flag()));
                results
                    .tricks_draws
                    .set(seq1, seq2, f64::from(outcome.tricks.draw_flag()));
            }
        }
        results
    }

    pub fn add_assign(&mut self, other: &DeckResults) {
        self.cards_wins.add_assign(&other.cards_wins);
        self.tricks_wins.add_assign(&other.tricks_wins);
        self.cards_draws.add_assign(&other.cards_draws);
        self.tricks_draws.add_assign(&other.tricks_draws);
    }
}

#[cfg(test)]
mod tests {
    use super::{DeckResults, GridSnapshot, SequenceGrid};
    use crate::model::deck::Deck;
    use crate::model::sequence::Sequence;

    fn seq(text: &str) -> Sequence {
        text.parse().unwrap()
    }

    #[test]
    fn rows_are_reversed_and_columns_lexicographic() {
        let rows = SequenceGrid::row_labels();
        let columns = SequenceGrid::column_labels();
        assert_eq!(rows[0].to_string(), "111");
        assert_eq!(rows[7].to_string(), "000");
        assert_eq!(columns[0].to_string(), "000");
        assert_eq!(columns[7].to_string(), "111");
    }

    #[test]
    fn set_and_get_round_trip_through_row_reversal() {
        let mut grid = SequenceGrid::zeros();
        grid.set(seq("000"), seq("101"), 1.0);
        assert_eq!(grid.get(seq("000"), seq("101")), 1.0);
        // "000" is the last row in the reversed presentation.
        assert_eq!(grid.cells()[7][5], 1.0);
    }

    #[test]
    fn add_assign_and_divide_are_element_wise() {
        let mut left = SequenceGrid::zeros();
        left.set(seq("010"), seq("101"), 2.0);
        let mut right = SequenceGrid::zeros();
        right.set(seq("010"), seq("101"), 3.0);
        right.set(seq("111"), seq("000"), 1.0);

        left.add_assign(&right);
        assert_eq!(left.get(seq("010"), seq("101")), 5.0);
        assert_eq!(left.get(seq("111"), seq("000")), 1.0);

        left.divide(2.0);
        assert_eq!(left.get(seq("010"), seq("101")), 2.5);
        assert_eq!(left.total(), 3.0);
    }

    #[test]
    fn every_cell_is_populated_with_a_flag() {
        let deck = Deck::shuffled_with_seed(11);
        let results = DeckResults::compute(&deck);
        for seq1 in Sequence::ALL {
            for seq2 in Sequence::ALL {
                for grid in [
                    &results.cards_wins,
                    &results.tricks_wins,
                    &results.cards_draws,
                    &results.tricks_draws,
                ] {
                    let value = grid.get(seq1, seq2);
                    assert!(value == 0.0 || value == 1.0);
                }
                // A metric cannot report a win and a draw at once.
                assert!(
                    results.cards_wins.get(seq1, seq2) + results.cards_draws.get(seq1, seq2) <= 1.0
                );
                assert!(
                    results.tricks_wins.get(seq1, seq2) + results.tricks_draws.get(seq1, seq2)
                        <= 1.0
                );
            }
        }
    }

    #[test]
    fn equal_sequence_diagonal_never_wins_for_player_two() {
        let deck = Deck::shuffled_with_seed(23);
        let results = DeckResults::compute(&deck);
        for sequence in Sequence::ALL {
            assert_eq!(results.cards_wins.get(sequence, sequence), 0.0);
            assert_eq!(results.tricks_wins.get(sequence, sequence), 0.0);
        }
    }

    #[test]
    fn snapshot_serializes_with_labels() {
        let deck = Deck::shuffled_with_seed(3);
        let results = DeckResults::compute(&deck);
        let json = results.cards_wins.to_json().unwrap();
        assert!(json.contains("\"rows\""));
        assert!(json.contains("\"111\""));

        let snapshot: GridSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(snapshot.rows[0], "111");
        assert_eq!(snapshot.columns[0], "000");
    }
}
