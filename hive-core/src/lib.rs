//! Hive Core - Rules engine and search
//!
//! This crate provides the core game logic for Hive:
//! - Hex topology with stacking and the sliding gate rule
//! - Piece catalog for the standard and extended rule sets
//! - Board state, one-hive connectivity and move generation
//! - Reference-piece move notation
//! - Queen-pressure evaluation and move ordering
//! - Alpha-beta search with a root-parallel orchestrator

pub mod hex;
pub mod pieces;
pub mod error;
pub mod ruleset;
pub mod board;
pub mod movegen;
pub mod notation;
pub mod eval;
pub mod config;
pub mod search;
pub mod orchestrator;

// Re-exports for convenient access
pub use hex::{Hex, Position, DIRECTIONS, ORIGIN};
pub use pieces::{Color, Piece, PieceId, PieceKind, CATALOG};
pub use error::{HiveError, Result};
pub use ruleset::{Layout, RuleSet};
pub use board::{Board, Effect, GameResult, Move};
pub use notation::Notation;
pub use eval::{Evaluator, Heuristics, QueenEvaluator};
pub use config::{EngineConfig, SearchConfig, MAX_EVALUATION};
pub use search::{minimax, perft, AlphaBeta};
pub use orchestrator::{RootMove, SearchEvent, SearchHandle, SearchOrchestrator, SearchOutcome, SearchProgress};
