use penney_core::game::matrix::{DeckResults, SequenceGrid};
use penney_core::model::sequence::Sequence;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// The four persisted result categories, one directory each under the data
/// root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResultCategory {
    Cards,
    Tricks,
    CardsTies,
    TricksTies,
}

impl ResultCategory {
    pub const ALL: [ResultCategory; 4] = [
        ResultCategory::Cards,
        ResultCategory::Tricks,
        ResultCategory::CardsTies,
        ResultCategory::TricksTies,
    ];

    pub const fn dir_name(self) -> &'static str {
        match self {
            ResultCategory::Cards => "cards",
            ResultCategory::Tricks => "tricks",
            ResultCategory::CardsTies => "cards_ties",
            ResultCategory::TricksTies => "tricks_ties",
        }
    }
}

/// Persisted form of one grid. Carries its own game count so batch records
/// describe how many games they represent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridRecord {
    pub rows: Vec<String>,
    pub columns: Vec<String>,
    pub games: u32,
    pub values: Vec<f64>,
}

#[derive(Debug, Error)]
#[error("{0}")]
pub struct GridShapeError(String);

impl GridRecord {
    pub fn from_grid(grid: &SequenceGrid, games: u32) -> Self {
        Self {
            rows: SequenceGrid::row_labels()
                .iter()
                .map(Sequence::to_string)
                .collect(),
            columns: SequenceGrid::column_labels()
                .iter()
                .map(Sequence::to_string)
                .collect(),
            games,
            values: grid.cells().iter().flatten().copied().collect(),
        }
    }

    /// Rebuild the grid, rejecting records whose labels or cell count do not
    /// match the 8x8 sequence layout.
    pub fn to_grid(&self) -> Result<SequenceGrid, GridShapeError> {
        let expected_rows: Vec<String> = SequenceGrid::row_labels()
            .iter()
            .map(Sequence::to_string)
            .collect();
        let expected_columns: Vec<String> = SequenceGrid::column_labels()
            .iter()
            .map(Sequence::to_string)
            .collect();

        if self.rows != expected_rows {
            return Err(GridShapeError(format!(
                "row labels {:?} do not match the sequence alphabet",
                self.rows
            )));
        }
        if self.columns != expected_columns {
            return Err(GridShapeError(format!(
                "column labels {:?} do not match the sequence alphabet",
                self.columns
            )));
        }
        let expected_cells = Sequence::COUNT * Sequence::COUNT;
        if self.values.len() != expected_cells {
            return Err(GridShapeError(format!(
                "expected {expected_cells} cells but record holds {}",
                self.values.len()
            )));
        }

        let mut grid = SequenceGrid::zeros();
        for (row_index, row_label) in SequenceGrid::row_labels().iter().enumerate() {
            for (column_index, column_label) in SequenceGrid::column_labels().iter().enumerate() {
                grid.set(
                    *row_label,
                    *column_label,
                    self.values[row_index * Sequence::COUNT + column_index],
                );
            }
        }
        Ok(grid)
    }
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("{context} {path:?}: {source}")]
    Io {
        context: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to encode grid record for {path:?}: {source}")]
    Encode {
        path: PathBuf,
        #[source]
        source: bincode::Error,
    },
    #[error("failed to decode grid record from {path:?}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: bincode::Error,
    },
}

/// Filesystem store for per-deck and per-batch result grids.
pub struct GameStore {
    root: PathBuf,
}

impl GameStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn category_dir(&self, category: ResultCategory) -> PathBuf {
        self.root.join(category.dir_name())
    }

    pub fn ensure_layout(&self) -> Result<(), StorageError> {
        for category in ResultCategory::ALL {
            let dir = self.category_dir(category);
            fs::create_dir_all(&dir).map_err(|source| StorageError::Io {
                context: "creating results directory",
                path: dir.clone(),
                source,
            })?;
        }
        Ok(())
    }

    /// Persist one deck's four grids, named by the deck's binary value.
    pub fn save_deck(&self, deck_id: u128, results: &DeckResults) -> Result<(), StorageError> {
        self.save_group(&format!("{deck_id}.bin"), results, 1)
    }

    /// Persist a batch of accumulated grids with its embedded game count.
    pub fn save_batch(
        &self,
        name: &str,
        results: &DeckResults,
        games: u32,
    ) -> Result<(), StorageError> {
        self.save_group(&format!("batch_{name}.bin"), results, games)
    }

    // The four category files are written as a group: encode everything
    // first, stage to temp files, then rename. A failure at any point
    // removes the staged temps so no partial result survives.
    fn save_group(
        &self,
        file_name: &str,
        results: &DeckResults,
        games: u32,
    ) -> Result<(), StorageError> {
        let entries = [
            (ResultCategory::Cards, &results.cards_wins),
            (ResultCategory::Tricks, &results.tricks_wins),
            (ResultCategory::CardsTies, &results.cards_draws),
            (ResultCategory::TricksTies, &results.tricks_draws),
        ];

        let mut staged: Vec<(PathBuf, PathBuf, Vec<u8>)> = Vec::with_capacity(entries.len());
        for (category, grid) in entries {
            let record = GridRecord::from_grid(grid, games);
            let target = self.category_dir(category).join(file_name);
            let bytes = bincode::serialize(&record).map_err(|source| StorageError::Encode {
                path: target.clone(),
                source,
            })?;
            let temp = target.with_extension("bin.tmp");
            staged.push((target, temp, bytes));
        }

        for (_, temp, bytes) in &staged {
            if let Err(source) = fs::write(temp, bytes) {
                remove_temps(&staged);
                return Err(StorageError::Io {
                    context: "staging grid record",
                    path: temp.clone(),
                    source,
                });
            }
        }

        for (target, temp, _) in &staged {
            if let Err(source) = fs::rename(temp, target) {
                remove_temps(&staged);
                return Err(StorageError::Io {
                    context: "committing grid record",
                    path: target.clone(),
                    source,
                });
            }
        }

        Ok(())
    }

    /// Load every record in one category directory, in path order.
    pub fn load_category(
        &self,
        category: ResultCategory,
    ) -> Result<Vec<(PathBuf, GridRecord)>, StorageError> {
        let dir = self.category_dir(category);
        let entries = fs::read_dir(&dir).map_err(|source| StorageError::Io {
            context: "reading results directory",
            path: dir.clone(),
            source,
        })?;

        let mut records = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| StorageError::Io {
                context: "reading results directory",
                path: dir.clone(),
                source,
            })?;
            let path = entry.path();
            let file_type = entry.file_type().map_err(|source| StorageError::Io {
                context: "inspecting results entry",
                path: path.clone(),
                source,
            })?;
            if !file_type.is_file() {
                continue;
            }

            let bytes = fs::read(&path).map_err(|source| StorageError::Io {
                context: "reading grid record",
                path: path.clone(),
                source,
            })?;
            let record =
                bincode::deserialize(&bytes).map_err(|source| StorageError::Decode {
                    path: path.clone(),
                    source,
                })?;
            records.push((path, record));
        }

        records.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(records)
    }
}

fn remove_temps(staged: &[(PathBuf, PathBuf, Vec<u8>)]) {
    for (_, temp, _) in staged {
        let _ = fs::remove_file(temp);
    }
}

#[cfg(test)]
mod tests {
    use super::{GameStore, GridRecord, ResultCategory};
    use penney_core::game::matrix::DeckResults;
    use penney_core::model::deck::Deck;
    use tempfile::tempdir;

    #[test]
    fn saved_deck_round_trips_through_every_category() {
        let dir = tempdir().expect("temp dir");
        let store = GameStore::new(dir.path());
        store.ensure_layout().expect("layout");

        let deck = Deck::shuffled_with_seed(9);
        let results = DeckResults::compute(&deck);
        store.save_deck(deck.id(), &results).expect("save");

        for category in ResultCategory::ALL {
            let records = store.load_category(category).expect("load");
            assert_eq!(records.len(), 1);
            let (path, record) = &records[0];
            assert_eq!(
                path.file_name().unwrap().to_string_lossy(),
                format!("{}.bin", deck.id())
            );
            assert_eq!(record.games, 1);
            let grid = record.to_grid().expect("shape");
            let expected = match category {
                ResultCategory::Cards => &results.cards_wins,
                ResultCategory::Tricks => &results.tricks_wins,
                ResultCategory::CardsTies => &results.cards_draws,
                ResultCategory::TricksTies => &results.tricks_draws,
            };
            assert_eq!(&grid, expected);
        }
    }

    #[test]
    fn batch_records_embed_their_game_count() {
        let dir = tempdir().expect("temp dir");
        let store = GameStore::new(dir.path());
        store.ensure_layout().expect("layout");

        let mut batch = DeckResults::empty();
        batch.add_assign(&DeckResults::compute(&Deck::shuffled_with_seed(1)));
        batch.add_assign(&DeckResults::compute(&Deck::shuffled_with_seed(2)));
        store.save_batch("0", &batch, 2).expect("save batch");

        let records = store.load_category(ResultCategory::Cards).expect("load");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].0.file_name().unwrap(), "batch_0.bin");
        assert_eq!(records[0].1.games, 2);
    }

    #[test]
    fn no_temp_files_survive_a_save() {
        let dir = tempdir().expect("temp dir");
        let store = GameStore::new(dir.path());
        store.ensure_layout().expect("layout");

        let deck = Deck::shuffled_with_seed(5);
        store
            .save_deck(deck.id(), &DeckResults::compute(&deck))
            .expect("save");

        for category in ResultCategory::ALL {
            for entry in std::fs::read_dir(store.category_dir(category)).expect("read dir") {
                let name = entry.expect("entry").file_name();
                assert!(!name.to_string_lossy().ends_with(".tmp"));
            }
        }
    }

    #[test]
    fn foreign_records_fail_shape_validation() {
        let record = GridRecord {
            rows: vec!["a".into(), "b".into()],
            columns: vec!["a".into(), "b".into()],
            games: 1,
            values: vec![0.0; 4],
        };
        assert!(record.to_grid().is_err());

        let mut truncated = GridRecord::from_grid(
            &DeckResults::compute(&Deck::shuffled_with_seed(4)).cards_wins,
            1,
        );
        truncated.values.pop();
        assert!(truncated.to_grid().is_err());
    }

    #[test]
    fn missing_category_directory_is_an_error() {
        let dir = tempdir().expect("temp dir");
        let store = GameStore::new(dir.path().join("nowhere"));
        assert!(store.load_category(ResultCategory::Cards).is_err());
    }
}
