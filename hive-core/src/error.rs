//! Error types for the engine

use crate::hex::Hex;

/// Errors surfaced by checked board operations and configuration loading
#[derive(Debug, thiserror::Error)]
pub enum HiveError {
    #[error("illegal move: {0}")]
    IllegalMove(String),

    #[error("unknown piece: {0}")]
    UnknownPiece(String),

    #[error("no piece can serve as reference at ({}, {})", .0.x, .0.y)]
    InvalidReference(Hex),

    #[error("invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, HiveError>;
