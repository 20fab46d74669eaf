use crate::game::scoring::Scores;

/// Who came out ahead on a single metric. A draw keeps the winner flag at
/// zero, so the two flags must be read together.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricOutcome {
    Player1,
    Draw,
    Player2,
}

impl MetricOutcome {
    pub fn from_counts(p1: u32, p2: u32) -> Self {
        if p1 < p2 {
            MetricOutcome::Player2
        } else if p1 == p2 {
            MetricOutcome::Draw
        } else {
            MetricOutcome::Player1
        }
    }

    pub const fn win_flag(self) -> u8 {
        match self {
            MetricOutcome::Player2 => 1,
            MetricOutcome::Player1 | MetricOutcome::Draw => 0,
        }
    }

    pub const fn draw_flag(self) -> u8 {
        match self {
            MetricOutcome::Draw => 1,
            MetricOutcome::Player1 | MetricOutcome::Player2 => 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameOutcome {
    pub cards: MetricOutcome,
    pub tricks: MetricOutcome,
}

impl GameOutcome {
    pub fn classify(scores: &Scores) -> Self {
        Self {
            cards: MetricOutcome::from_counts(scores.p1_cards, scores.p2_cards),
            tricks: MetricOutcome::from_counts(scores.p1_tricks, scores.p2_tricks),
        }
    }
}
