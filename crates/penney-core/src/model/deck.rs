use crate::model::color::CardColor;
use core::fmt;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

pub const DECK_SIZE: usize = 52;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deck {
    cards: Vec<CardColor>,
}

impl Deck {
    pub fn standard() -> Self {
        let mut cards = Vec::with_capacity(DECK_SIZE);
        for color in CardColor::ALL.iter().copied() {
            for _ in 0..DECK_SIZE / 2 {
                cards.push(color);
            }
        }
        Self { cards }
    }

    pub fn shuffled<R: rand::Rng + ?Sized>(rng: &mut R) -> Self {
        let mut deck = Self::standard();
        deck.shuffle_in_place(rng);
        deck
    }

    pub fn shuffled_with_seed(seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        Self::shuffled(&mut rng)
    }

    pub fn shuffle_in_place<R: rand::Rng + ?Sized>(&mut self, rng: &mut R) {
        self.cards.shuffle(rng);
    }

    pub fn from_bits(bits: &str) -> Result<Self, DeckParseError> {
        let mut cards = Vec::with_capacity(bits.len());
        for (index, symbol) in bits.chars().enumerate() {
            let color = CardColor::from_bit_char(symbol)
                .ok_or(DeckParseError::InvalidSymbol { index, found: symbol })?;
            cards.push(color);
        }
        Ok(Self { cards })
    }

    pub fn cards(&self) -> &[CardColor] {
        &self.cards
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// The deck's binary value, used to name persisted results. Decks longer
    /// than 128 cards keep only the low 128 bits.
    pub fn id(&self) -> u128 {
        self.cards
            .iter()
            .fold(0u128, |acc, card| (acc << 1) | u128::from(card.bit()))
    }

    pub fn bits(&self) -> String {
        self.cards.iter().map(|card| card.bit_char()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeckParseError {
    InvalidSymbol { index: usize, found: char },
}

impl fmt::Display for DeckParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeckParseError::InvalidSymbol { index, found } => {
                write!(f, "deck symbol at position {index} must be '0' or '1' but got '{found}'")
            }
        }
    }
}

impl std::error::Error for DeckParseError {}

#[cfg(test)]
mod tests {
    use super::{DECK_SIZE, Deck, DeckParseError};
    use crate::model::color::CardColor;

    #[test]
    fn standard_deck_is_half_red_half_black() {
        let deck = Deck::standard();
        assert_eq!(deck.len(), DECK_SIZE);
        let reds = deck
            .cards()
            .iter()
            .filter(|card| **card == CardColor::Red)
            .count();
        assert_eq!(reds, DECK_SIZE / 2);
    }

    #[test]
    fn shuffle_with_seed_is_deterministic() {
        let deck_a = Deck::shuffled_with_seed(42);
        let deck_b = Deck::shuffled_with_seed(42);
        assert_eq!(deck_a.cards(), deck_b.cards());
    }

    #[test]
    fn shuffle_with_different_seeds_differs() {
        let deck_a = Deck::shuffled_with_seed(1);
        let deck_b = Deck::shuffled_with_seed(2);
        assert_ne!(deck_a.cards(), deck_b.cards());
    }

    #[test]
    fn bits_round_trip() {
        let deck = Deck::from_bits("0101010101").unwrap();
        assert_eq!(deck.bits(), "0101010101");
        assert_eq!(deck.len(), 10);
    }

    #[test]
    fn id_is_binary_value() {
        let deck = Deck::from_bits("0101010101").unwrap();
        assert_eq!(deck.id(), 341);
        assert_eq!(Deck::from_bits("111").unwrap().id(), 7);
    }

    #[test]
    fn rejects_foreign_symbols() {
        assert!(matches!(
            Deck::from_bits("01x"),
            Err(DeckParseError::InvalidSymbol { index: 2, found: 'x' })
        ));
    }
}
