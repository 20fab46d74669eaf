use crate::model::deck::Deck;
use crate::model::sequence::{SEQUENCE_LENGTH, Sequence};

/// Card and trick totals for one pass over a deck. Player 1 is the opponent,
/// player 2 is the player whose win rates the result grids report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Scores {
    pub p1_cards: u32,
    pub p2_cards: u32,
    pub p1_tricks: u32,
    pub p2_tricks: u32,
}

impl Scores {
    pub const fn total_cards(&self) -> u32 {
        self.p1_cards + self.p2_cards
    }

    pub const fn total_tricks(&self) -> u32 {
        self.p1_tricks + self.p2_tricks
    }
}

/// Scan `deck` once and award cards and tricks to whichever sequence matches
/// first at each position.
///
/// The pile starts at 2 because the first window already spans three cards.
/// A match claims the pile plus a trick and resumes scanning after the
/// matched window; otherwise the scan advances one card. Player 1's branch
/// is checked first, so when both players chose the same sequence every
/// match is credited to player 1. Decks shorter than one window score zero
/// everywhere.
pub fn score_deck(deck: &Deck, seq1: Sequence, seq2: Sequence) -> Scores {
    let cards = deck.cards();
    let mut scores = Scores::default();
    let mut pile = 2u32;
    let mut i = 0usize;

    while i + SEQUENCE_LENGTH <= cards.len() {
        pile += 1;
        let window = &cards[i..i + SEQUENCE_LENGTH];
        if window == seq1.cards() {
            scores.p1_cards += pile;
            scores.p1_tricks += 1;
            pile = 2;
            i += SEQUENCE_LENGTH;
        } else if window == seq2.cards() {
            scores.p2_cards += pile;
            scores.p2_tricks += 1;
            pile = 2;
            i += SEQUENCE_LENGTH;
        } else {
            i += 1;
        }
    }

    scores
}

#[cfg(test)]
mod tests {
    use super::{Scores, score_deck};
    use crate::model::deck::Deck;
    use crate::model::sequence::Sequence;

    fn seq(text: &str) -> Sequence {
        text.parse().unwrap()
    }

    #[test]
    fn alternating_deck_matches_manual_trace() {
        // 0101010101: "010" hits at 0 (pile 3), "101" at 3 (pile 3),
        // "010" again at 6 (pile 3), then the tail is too short.
        let deck = Deck::from_bits("0101010101").unwrap();
        let scores = score_deck(&deck, seq("010"), seq("101"));
        assert_eq!(
            scores,
            Scores {
                p1_cards: 6,
                p2_cards: 3,
                p1_tricks: 2,
                p2_tricks: 1,
            }
        );
    }

    #[test]
    fn equal_sequences_always_credit_player_one() {
        let deck = Deck::from_bits("000100010001000").unwrap();
        let scores = score_deck(&deck, seq("000"), seq("000"));
        assert_eq!(scores.p2_cards, 0);
        assert_eq!(scores.p2_tricks, 0);
        assert!(scores.p1_tricks > 0);
    }

    #[test]
    fn deck_shorter_than_window_scores_zero() {
        let deck = Deck::from_bits("01").unwrap();
        let scores = score_deck(&deck, seq("010"), seq("101"));
        assert_eq!(scores, Scores::default());
    }

    #[test]
    fn three_card_deck_matching_neither_scores_zero() {
        let deck = Deck::from_bits("011").unwrap();
        let scores = score_deck(&deck, seq("000"), seq("111"));
        assert_eq!(scores, Scores::default());
    }

    #[test]
    fn empty_deck_scores_zero() {
        let deck = Deck::from_bits("").unwrap();
        let scores = score_deck(&deck, seq("010"), seq("101"));
        assert_eq!(scores, Scores::default());
    }

    #[test]
    fn pile_carries_contested_cards_to_the_next_match() {
        // No match until "110" at position 4: pile has grown to 2 + 5.
        let deck = Deck::from_bits("0000110").unwrap();
        let scores = score_deck(&deck, seq("110"), seq("101"));
        assert_eq!(scores.p1_cards, 7);
        assert_eq!(scores.p1_tricks, 1);
        assert_eq!(scores.p2_cards, 0);
    }

    #[test]
    fn matches_do_not_overlap() {
        // "111111" holds only two non-overlapping "111" windows.
        let deck = Deck::from_bits("111111").unwrap();
        let scores = score_deck(&deck, seq("111"), seq("000"));
        assert_eq!(scores.p1_tricks, 2);
        assert_eq!(scores.p1_cards, 6);
    }

    #[test]
    fn scoring_is_deterministic() {
        let deck = Deck::shuffled_with_seed(7);
        let first = score_deck(&deck, seq("100"), seq("011"));
        let second = score_deck(&deck, seq("100"), seq("011"));
        assert_eq!(first, second);
    }
}
