use crate::storage::{GameStore, GridShapeError, ResultCategory, StorageError};
use penney_core::game::matrix::SequenceGrid;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AggregationError {
    #[error("no game results to aggregate")]
    Empty,
    #[error("grid record {path:?} does not match the sequence grid layout: {source}")]
    ShapeMismatch {
        path: PathBuf,
        #[source]
        source: GridShapeError,
    },
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// An element-wise total (or per-game mean) plus the number of games that
/// contributed to it.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateOutcome {
    pub grid: SequenceGrid,
    pub games: u32,
}

/// Element-wise sum of in-memory grids.
pub fn sum_grids(grids: &[SequenceGrid]) -> Result<SequenceGrid, AggregationError> {
    let mut iter = grids.iter();
    let first = iter.next().ok_or(AggregationError::Empty)?;
    let mut total = first.clone();
    for grid in iter {
        total.add_assign(grid);
    }
    Ok(total)
}

/// Sum every persisted record in one category, averaging per game when
/// requested. The game count comes from the records themselves, so per-deck
/// files and batch files mix freely.
pub fn aggregate_category(
    store: &GameStore,
    category: ResultCategory,
    average: bool,
) -> Result<AggregateOutcome, AggregationError> {
    let records = store.load_category(category)?;

    let mut total: Option<SequenceGrid> = None;
    let mut games = 0u32;
    for (path, record) in records {
        let grid = record
            .to_grid()
            .map_err(|source| AggregationError::ShapeMismatch { path, source })?;
        games += record.games;
        match total.as_mut() {
            Some(sum) => sum.add_assign(&grid),
            None => total = Some(grid),
        }
    }

    let mut grid = total.ok_or(AggregationError::Empty)?;
    if games == 0 {
        return Err(AggregationError::Empty);
    }
    if average {
        grid.divide(f64::from(games));
    }
    Ok(AggregateOutcome { grid, games })
}
