//! Rules-engine seam: legality, notation and termination checks.
//!
//! The replay controller never touches board internals directly. Everything
//! it needs from a chess implementation goes through [`RulesEngine`], and
//! [`ShakmatyEngine`] provides it on top of `shakmaty`.

use serde::{Deserialize, Serialize};
use shakmaty::{
    fen::Fen, san::San, san::SanPlus, uci::UciMove, CastlingMode, Chess, Color, EnPassantMode,
    Move, Position, Rank, Role, Square,
};

use crate::error::EngineError;
use crate::game_data::{PositionStatus, Side};
use crate::pgn::{self, MovetextStart};

/// A move proposed by the board widget: "piece dropped from A to B".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveCandidate {
    pub from: String,
    pub to: String,
    /// One of `q`, `r`, `b`, `n`. Only consulted for pawn moves to the last rank.
    #[serde(default)]
    pub promotion: Option<char>,
}

impl MoveCandidate {
    pub fn new(from: &str, to: &str) -> Self {
        Self {
            from: from.to_string(),
            to: to.to_string(),
            promotion: None,
        }
    }

    pub fn with_promotion(mut self, promotion: char) -> Self {
        self.promotion = Some(promotion);
        self
    }
}

/// Result of applying one move to a copy of a position.
#[derive(Debug, Clone)]
pub struct AppliedMove<P> {
    pub position: P,
    pub san: String,
}

/// A fully validated game.
#[derive(Debug, Clone)]
pub struct LoadedGame<P> {
    pub initial: P,
    pub final_position: P,
    /// Canonical SAN as produced by the engine, not as written in the input.
    pub moves: Vec<String>,
    pub headers: Vec<(String, String)>,
}

pub trait RulesEngine {
    type Position: Clone + Send + 'static;

    fn new_position(&self) -> Self::Position;

    fn position_from_fen(&self, fen: &str) -> Result<Self::Position, EngineError>;

    /// Apply a board-widget move. The input position is left untouched.
    fn apply_candidate(
        &self,
        position: &Self::Position,
        candidate: &MoveCandidate,
    ) -> Result<AppliedMove<Self::Position>, EngineError>;

    /// Apply one SAN token. The input position is left untouched.
    fn apply_san(
        &self,
        position: &Self::Position,
        san: &str,
    ) -> Result<AppliedMove<Self::Position>, EngineError>;

    fn fen(&self, position: &Self::Position) -> String;

    /// Identity of a position for repetition counting (no move clocks).
    fn position_key(&self, position: &Self::Position) -> String;

    fn status(&self, position: &Self::Position) -> PositionStatus;

    fn movetext_start(&self, position: &Self::Position) -> MovetextStart;

    /// Parse and validate a PGN game, or a bare FEN giving an empty game.
    fn load_game(&self, text: &str) -> Result<LoadedGame<Self::Position>, EngineError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(EngineError::MalformedPgn("empty input".into()));
        }

        if looks_like_fen(text) {
            let position = self.position_from_fen(text)?;
            return Ok(LoadedGame {
                initial: position.clone(),
                final_position: position,
                moves: Vec::new(),
                headers: vec![
                    ("SetUp".to_string(), "1".to_string()),
                    ("FEN".to_string(), text.to_string()),
                ],
            });
        }

        let parsed = pgn::parse_pgn(text).map_err(EngineError::MalformedPgn)?;
        if parsed.moves.is_empty() && parsed.headers.is_empty() && parsed.result.is_none() {
            return Err(EngineError::MalformedPgn("no moves found".into()));
        }

        let initial = match parsed.setup_fen() {
            Some(fen) => self.position_from_fen(fen)?,
            None => self.new_position(),
        };

        let mut position = initial.clone();
        let mut moves = Vec::with_capacity(parsed.moves.len());
        for (ply, san) in parsed.moves.iter().enumerate() {
            let applied = self.apply_san(&position, san).map_err(|e| {
                EngineError::MalformedPgn(format!("ply {}: {e}", ply + 1))
            })?;
            position = applied.position;
            moves.push(applied.san);
        }

        Ok(LoadedGame {
            initial,
            final_position: position,
            moves,
            headers: parsed.headers,
        })
    }
}

fn looks_like_fen(text: &str) -> bool {
    !text.contains('[') && !text.contains('.') && text.matches('/').count() == 7
}

/// Standard chess through `shakmaty`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShakmatyEngine;

impl ShakmatyEngine {
    fn play(&self, position: &Chess, mv: Move) -> Result<AppliedMove<Chess>, EngineError> {
        let san = San::from_move(position, mv.clone()).to_string();
        let next = position
            .clone()
            .play(mv)
            .map_err(|_| EngineError::IllegalMove(san.clone()))?;

        let suffix = if next.is_checkmate() {
            "#"
        } else if next.is_check() {
            "+"
        } else {
            ""
        };

        Ok(AppliedMove {
            san: format!("{san}{suffix}"),
            position: next,
        })
    }
}

fn parse_square(s: &str) -> Result<Square, EngineError> {
    s.trim()
        .to_ascii_lowercase()
        .parse::<Square>()
        .map_err(|_| EngineError::InvalidSquare(s.to_string()))
}

fn promotion_role(c: char) -> Result<Role, EngineError> {
    match c.to_ascii_lowercase() {
        'q' => Ok(Role::Queen),
        'r' => Ok(Role::Rook),
        'b' => Ok(Role::Bishop),
        'n' => Ok(Role::Knight),
        other => Err(EngineError::IllegalMove(format!("invalid promotion piece '{other}'"))),
    }
}

fn side(color: Color) -> Side {
    match color {
        Color::White => Side::White,
        Color::Black => Side::Black,
    }
}

impl RulesEngine for ShakmatyEngine {
    type Position = Chess;

    fn new_position(&self) -> Chess {
        Chess::default()
    }

    fn position_from_fen(&self, fen: &str) -> Result<Chess, EngineError> {
        let parsed = Fen::from_ascii(fen.trim().as_bytes())
            .map_err(|e| EngineError::InvalidFen(e.to_string()))?;
        let position: Chess = parsed
            .into_position(CastlingMode::Standard)
            .map_err(|_| EngineError::InvalidFen(fen.to_string()))?;
        Ok(position)
    }

    fn apply_candidate(
        &self,
        position: &Chess,
        candidate: &MoveCandidate,
    ) -> Result<AppliedMove<Chess>, EngineError> {
        let from = parse_square(&candidate.from)?;
        let to = parse_square(&candidate.to)?;

        let promotes = matches!(
            position.board().piece_at(from),
            Some(piece) if piece.role == Role::Pawn && (to.rank() == Rank::First || to.rank() == Rank::Eighth)
        );
        let promotion = if promotes {
            Some(match candidate.promotion {
                Some(c) => promotion_role(c)?,
                None => Role::Queen,
            })
        } else {
            None
        };

        // King-two-squares castling is accepted by UciMove::to_move
        let uci = UciMove::Normal {
            from,
            to,
            promotion,
        };
        let mv = uci
            .to_move(position)
            .map_err(|_| EngineError::IllegalMove(format!("{}{}", candidate.from, candidate.to)))?;

        self.play(position, mv)
    }

    fn apply_san(&self, position: &Chess, san: &str) -> Result<AppliedMove<Chess>, EngineError> {
        let san_plus = san.trim().parse::<SanPlus>().map_err(|e| EngineError::InvalidSan {
            san: san.to_string(),
            reason: e.to_string(),
        })?;
        let mv = san_plus
            .san
            .to_move(position)
            .map_err(|_| EngineError::IllegalMove(san.to_string()))?;

        self.play(position, mv)
    }

    fn fen(&self, position: &Chess) -> String {
        Fen::from_position(position, EnPassantMode::Legal).to_string()
    }

    fn position_key(&self, position: &Chess) -> String {
        let fen = self.fen(position);
        fen.split(' ').take(4).collect::<Vec<_>>().join(" ")
    }

    fn status(&self, position: &Chess) -> PositionStatus {
        PositionStatus {
            turn: side(position.turn()),
            is_check: position.is_check(),
            is_checkmate: position.is_checkmate(),
            is_stalemate: position.is_stalemate(),
            is_insufficient_material: position.is_insufficient_material(),
            is_fifty_move_rule: position.halfmoves() >= 100,
        }
    }

    fn movetext_start(&self, position: &Chess) -> MovetextStart {
        MovetextStart {
            fullmove: position.fullmoves().get(),
            white_to_move: position.turn() == Color::White,
        }
    }
}
