use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    White,
    Black,
}

impl Side {
    pub fn other(self) -> Side {
        match self {
            Side::White => Side::Black,
            Side::Black => Side::White,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Side::White => "White",
            Side::Black => "Black",
        }
    }
}

/// Board orientation for rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    #[default]
    White,
    Black,
}

impl Orientation {
    pub fn flip(self) -> Orientation {
        match self {
            Orientation::White => Orientation::Black,
            Orientation::Black => Orientation::White,
        }
    }
}

/// Facts about a single position, reported by the rules engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionStatus {
    pub turn: Side,
    pub is_check: bool,
    pub is_checkmate: bool,
    pub is_stalemate: bool,
    pub is_insufficient_material: bool,
    pub is_fifty_move_rule: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrawReason {
    Stalemate,
    ThreefoldRepetition,
    InsufficientMaterial,
    FiftyMoveRule,
}

impl DrawReason {
    pub fn label(self) -> &'static str {
        match self {
            DrawReason::Stalemate => "Stalemate",
            DrawReason::ThreefoldRepetition => "Threefold repetition",
            DrawReason::InsufficientMaterial => "Insufficient material",
            DrawReason::FiftyMoveRule => "Fifty-move rule",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GameStatus {
    Ongoing { turn: Side },
    Check { turn: Side },
    Checkmate { winner: Side },
    Draw { reason: DrawReason },
}

impl GameStatus {
    /// Combine per-position facts with the repetition count of the replayed prefix.
    /// Checkmate wins over every draw rule; stalemate is the first draw reason checked.
    pub fn classify(status: &PositionStatus, threefold: bool) -> GameStatus {
        if status.is_checkmate {
            return GameStatus::Checkmate {
                winner: status.turn.other(),
            };
        }
        let reason = if status.is_stalemate {
            Some(DrawReason::Stalemate)
        } else if threefold {
            Some(DrawReason::ThreefoldRepetition)
        } else if status.is_insufficient_material {
            Some(DrawReason::InsufficientMaterial)
        } else if status.is_fifty_move_rule {
            Some(DrawReason::FiftyMoveRule)
        } else {
            None
        };
        match reason {
            Some(reason) => GameStatus::Draw { reason },
            None if status.is_check => GameStatus::Check { turn: status.turn },
            None => GameStatus::Ongoing { turn: status.turn },
        }
    }

    pub fn is_game_over(&self) -> bool {
        matches!(self, GameStatus::Checkmate { .. } | GameStatus::Draw { .. })
    }

    /// Short status line: "Checkmate!", "Draw", "Check" or "Ongoing".
    pub fn headline(&self) -> &'static str {
        match self {
            GameStatus::Checkmate { .. } => "Checkmate!",
            GameStatus::Draw { .. } => "Draw",
            GameStatus::Check { .. } => "Check",
            GameStatus::Ongoing { .. } => "Ongoing",
        }
    }

    /// Result sentence, only for finished games.
    pub fn summary(&self) -> Option<String> {
        match self {
            GameStatus::Checkmate { winner } => Some(format!("{} wins by checkmate!", winner.name())),
            GameStatus::Draw { reason } => Some(format!("Game ended in a draw: {}", reason.label())),
            _ => None,
        }
    }

    /// PGN result token.
    pub fn result_token(&self) -> &'static str {
        match self {
            GameStatus::Checkmate { winner: Side::White } => "1-0",
            GameStatus::Checkmate { winner: Side::Black } => "0-1",
            GameStatus::Draw { .. } => "1/2-1/2",
            _ => "*",
        }
    }
}
