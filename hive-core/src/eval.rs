//! Position evaluation and move ordering

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use crate::board::{Board, Move};
use crate::hex::Hex;
use crate::pieces::{Color, PieceKind};

/// Static evaluation seam used by search. Implementations must be pure
/// functions of the board: search calls them from many threads at once.
pub trait Evaluator: Send + Sync {
    /// Score from white's point of view (positive favors white)
    fn evaluate(&self, board: &Board) -> i32;

    /// Cheap best-first ordering for the side to move. Must be a stable
    /// total order so searches are reproducible.
    fn sort_moves(&self, board: &Board, moves: Vec<Move>) -> Vec<Move>;
}

/// Weights of the queen-pressure evaluation
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Heuristics {
    /// Scale of the pressure term (pieces around the enemy queen)
    pub pressure_weight: i32,
    /// Scale of the defense term (defenders next to the enemy queen)
    pub defense_weight: i32,
    /// Scale of the mobility term (own pieces free to lift)
    pub mobility_weight: i32,

    pub own_piece_around: i32,
    pub enemy_piece_around: i32,
    pub own_piece_on_top: i32,
    pub queen_pinned: i32,
    pub tempo: i32,

    pub pill_bug_defense: i32,
    pub mosquito_defense: i32,
    pub scorpion_defense: i32,
}

impl Default for Heuristics {
    fn default() -> Self {
        Self {
            pressure_weight: 100,
            defense_weight: 25,
            mobility_weight: 1,
            own_piece_around: 2,
            enemy_piece_around: 1,
            own_piece_on_top: 2,
            queen_pinned: 2,
            tempo: 1,
            pill_bug_defense: -2,
            mosquito_defense: -1,
            scorpion_defense: -1,
        }
    }
}

/// Queen-safety evaluation: how tightly each side has the other's queen
/// boxed in, with defenders and free pieces as tie-breakers
#[derive(Clone, Debug, Default)]
pub struct QueenEvaluator {
    pub heuristics: Heuristics,
}

impl QueenEvaluator {
    pub fn new(heuristics: Heuristics) -> Self {
        Self { heuristics }
    }

    /// Value of `color`'s attack on the opposing queen
    pub fn queen_pressure(&self, board: &Board, color: Color) -> i32 {
        let h = &self.heuristics;
        let Some(queen) = board.queen(color.opponent()) else {
            return 0;
        };
        let Some(qpos) = queen.position else { return 0 };

        let mut mine = 0;
        let mut theirs = 0;
        let mut pill_bug = false;
        let mut mosquito = false;
        let mut scorpion = false;
        for n in qpos.hex.neighbors() {
            let Some(cell) = board.cell(n) else { continue };
            if cell.color == color {
                mine += 1;
                continue;
            }
            theirs += 1;
            match cell.kind {
                PieceKind::PillBug => pill_bug = true,
                PieceKind::Scorpion => scorpion = true,
                PieceKind::Mosquito if board.is_standard() && cell.height == 1 => {
                    mosquito |= touches_kind(board, n, PieceKind::PillBug);
                }
                _ => {}
            }
        }
        let on_top = board
            .cell(qpos.hex)
            .is_some_and(|c| c.height > 1 && c.color == color);
        let pinned = !board.still_one_hive_after_remove(queen.id);

        let mut pressure = theirs * h.enemy_piece_around + mine * h.own_piece_around;
        if on_top {
            pressure += h.own_piece_on_top;
        }
        if pinned {
            pressure += h.queen_pinned;
        }
        if board.color_to_move() == color {
            pressure += h.tempo;
        }

        let mut defense = 0;
        if pill_bug {
            defense += h.pill_bug_defense;
        }
        if mosquito {
            defense += h.mosquito_defense;
        }
        if scorpion {
            defense += h.scorpion_defense;
        }

        let mobility = board
            .top_pieces()
            .filter(|p| p.color == color && board.still_one_hive_after_remove(p.id))
            .count() as i32;

        pressure * h.pressure_weight + defense * h.defense_weight + mobility * h.mobility_weight
    }
}

fn touches_kind(board: &Board, hex: Hex, kind: PieceKind) -> bool {
    hex.neighbors()
        .iter()
        .any(|&n| board.cell(n).is_some_and(|c| c.kind == kind))
}

impl Evaluator for QueenEvaluator {
    fn evaluate(&self, board: &Board) -> i32 {
        self.queen_pressure(board, Color::White) - self.queen_pressure(board, Color::Black)
    }

    fn sort_moves(&self, board: &Board, moves: Vec<Move>) -> Vec<Move> {
        let color = board.color_to_move();
        let enemy = color.opponent();

        let mut queen_zone: FxHashSet<Hex> = FxHashSet::default();
        if let Some(pos) = board.queen(enemy).and_then(|q| q.position) {
            queen_zone.insert(pos.hex);
            queen_zone.extend(pos.hex.neighbors());
        }
        let mut enemy_zone: FxHashSet<Hex> = FxHashSet::default();
        for p in board.top_pieces().filter(|p| p.color == enemy) {
            if let Some(pos) = p.position {
                enemy_zone.insert(pos.hex);
                enemy_zone.extend(pos.hex.neighbors());
            }
        }

        let mut scored: Vec<(u32, Move)> = moves
            .into_iter()
            .map(|mv| (order_score(board, &mv, &queen_zone, &enemy_zone), mv))
            .collect();
        scored.sort_by(|a, b| b.0.cmp(&a.0));
        scored.into_iter().map(|(_, mv)| mv).collect()
    }
}

/// Packed ordering key, most significant first: approach to the enemy
/// queen, placement, approach to enemy pieces, climbing, kind rank
fn order_score(board: &Board, mv: &Move, queen_zone: &FxHashSet<Hex>, enemy_zone: &FxHashSet<Hex>) -> u32 {
    let (Some(id), Some(to)) = (mv.piece(), mv.destination()) else {
        return 0;
    };
    let from = mv.origin().map(|p| p.hex);
    let approach = |zone: &FxHashSet<Hex>| -> u32 {
        let entering = zone.contains(&to.hex);
        let leaving = from.is_some_and(|f| zone.contains(&f));
        match (entering, leaving) {
            (true, false) => 2,
            (false, true) => 0,
            _ => 1,
        }
    };

    let mut score = approach(queen_zone);
    score = (score << 1) | u32::from(mv.is_placement());
    score = (score << 2) | approach(enemy_zone);
    score = (score << 1) | u32::from(to.z > 0);
    score = (score << 6) | u32::from(board.piece(id).kind.info().order);
    score
}
