#![deny(warnings)]
//! Penney's Game model: binary-colored decks, three-card player sequences,
//! the single-pass scoring kernel and the pairwise result grids.

pub mod game;
pub mod model;
