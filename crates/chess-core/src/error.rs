//! Error types for the rules-engine adapter and the replay controller.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("Invalid square: {0}")]
    InvalidSquare(String),

    #[error("Invalid SAN '{san}': {reason}")]
    InvalidSan { san: String, reason: String },

    #[error("Illegal move: {0}")]
    IllegalMove(String),

    #[error("Invalid FEN: {0}")]
    InvalidFen(String),

    #[error("Malformed PGN: {0}")]
    MalformedPgn(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReplayError {
    /// Candidate rejected; controller state untouched.
    #[error("Illegal move: {0}")]
    IllegalMove(String),

    /// Load failed; controller state untouched.
    #[error("Malformed notation: {0}")]
    MalformedNotation(String),

    /// A move already in the history failed to reapply.
    #[error("Move {index} ('{san}') could not be replayed")]
    ReplayInconsistency { index: usize, san: String },
}
