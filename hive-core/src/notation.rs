//! Reference-piece move notation
//!
//! A destination is written relative to a piece already on the board: on top
//! of it, or on one of its six sides. `wA1 -bQ` places the first white ant
//! west of the black queen; `wB1 bQ` climbs on top of it.

use serde::{Deserialize, Serialize};

use crate::board::{Board, Move};
use crate::error::{HiveError, Result};
use crate::hex::Position;
use crate::pieces::{PieceId, PieceKind};

/// Where the destination sits relative to the reference piece
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    /// On top of the reference
    Above,
    /// Adjacent, in direction index 0-5 from the reference
    Beside(usize),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    pub piece: PieceId,
    pub side: Side,
}

/// A move in human-readable form
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notation {
    pub mover: String,
    pub reference: Option<(String, Side)>,
}

impl std::fmt::Display for Notation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.mover)?;
        let Some((label, side)) = &self.reference else {
            return Ok(());
        };
        match side {
            Side::Above => write!(f, " {}", label),
            Side::Beside(0) => write!(f, " {}-", label),
            Side::Beside(1) => write!(f, " {}/", label),
            Side::Beside(2) => write!(f, " \\{}", label),
            Side::Beside(3) => write!(f, " -{}", label),
            Side::Beside(4) => write!(f, " /{}", label),
            Side::Beside(_) => write!(f, " {}\\", label),
        }
    }
}

/// Pick the reference for a destination. Climbs reference the piece being
/// climbed; ground moves prefer the queen, then single-copy pieces, then
/// unstacked ones. The mover never references itself.
pub fn reference_for(board: &Board, mover: PieceId, to: Position) -> Option<Reference> {
    if to.z > 0 {
        let below = board.top_at(to.hex)?;
        return Some(Reference { piece: below.id, side: Side::Above });
    }
    let mut best: Option<(u8, Reference)> = None;
    for (d, n) in to.hex.neighbors().into_iter().enumerate() {
        let Some(p) = board.top_at(n) else { continue };
        if p.id == mover {
            continue;
        }
        let mut preference = 1;
        if p.kind == PieceKind::Queen {
            preference += 8;
        }
        if p.number == 0 {
            preference += 4;
        }
        if p.position.is_some_and(|pos| pos.z == 0) {
            preference += 2;
        }
        if best.map_or(true, |(b, _)| preference > b) {
            // `to` lies in direction d from the reference's point of view
            let side = Side::Beside((d + 3) % 6);
            best = Some((preference, Reference { piece: p.id, side }));
        }
    }
    best.map(|(_, r)| r)
}

/// Describe a move before it is played. None for a pass.
pub fn describe(board: &Board, mv: &Move) -> Option<Notation> {
    let id = mv.piece()?;
    let to = mv.destination()?;
    let mover = board.piece(id).label();
    // The very first piece has nothing to refer to
    if board.in_play().next().is_none() {
        return Some(Notation { mover, reference: None });
    }
    let reference = reference_for(board, id, to).map(|r| (board.piece(r.piece).label(), r.side));
    Some(Notation { mover, reference })
}

/// Turn a reference back into a destination
pub fn resolve(board: &Board, reference: Reference) -> Result<Position> {
    let anchor = board.piece(reference.piece);
    let pos = anchor
        .position
        .ok_or_else(|| HiveError::UnknownPiece(format!("{} is not on the board", anchor.label())))?;
    match reference.side {
        Side::Above => {
            if board.height(pos.hex) != pos.z + 1 {
                return Err(HiveError::InvalidReference(pos.hex));
            }
            Ok(Position::new(pos.hex, pos.z + 1))
        }
        Side::Beside(d) if d < 6 => {
            let hex = pos.hex.neighbor(d);
            Ok(Position::new(hex, board.height(hex)))
        }
        Side::Beside(_) => Err(HiveError::InvalidReference(pos.hex)),
    }
}

/// Find the legal move of `piece` to the referenced destination
pub fn find_move(board: &Board, piece: PieceId, reference: Option<Reference>) -> Result<Move> {
    let label = board.piece(piece).label();
    let hex = match reference {
        Some(r) => resolve(board, r)?.hex,
        None => crate::hex::ORIGIN,
    };
    board
        .find_move(piece, hex)
        .ok_or_else(|| HiveError::IllegalMove(format!("{} cannot reach ({}, {})", label, hex.x, hex.y)))
}

/// Parse a piece label such as `wQ` or `bA2`
pub fn parse_label(board: &Board, label: &str) -> Result<PieceId> {
    board
        .pieces()
        .iter()
        .find(|p| p.label() == label)
        .map(|p| p.id)
        .ok_or_else(|| HiveError::UnknownPiece(label.to_string()))
}

/// Parse full notation (`wA1 -bQ`, `bB1 wQ`, `wQ`) against the position
pub fn parse(board: &Board, text: &str) -> Result<Move> {
    let mut parts = text.split_whitespace();
    let mover = parts
        .next()
        .ok_or_else(|| HiveError::IllegalMove("empty notation".to_string()))?;
    if mover.eq_ignore_ascii_case("pass") {
        return Ok(Move::Pass);
    }
    let piece = parse_label(board, mover)?;
    let Some(target) = parts.next() else {
        return find_move(board, piece, None);
    };
    let (side, label) = if let Some(rest) = target.strip_prefix('-') {
        (Side::Beside(3), rest)
    } else if let Some(rest) = target.strip_prefix('\\') {
        (Side::Beside(2), rest)
    } else if let Some(rest) = target.strip_prefix('/') {
        (Side::Beside(4), rest)
    } else if let Some(rest) = target.strip_suffix('-') {
        (Side::Beside(0), rest)
    } else if let Some(rest) = target.strip_suffix('/') {
        (Side::Beside(1), rest)
    } else if let Some(rest) = target.strip_suffix('\\') {
        (Side::Beside(5), rest)
    } else {
        (Side::Above, target)
    };
    let anchor = parse_label(board, label)?;
    find_move(board, piece, Some(Reference { piece: anchor, side }))
}
