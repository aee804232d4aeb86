//! Per-kind move generation
//!
//! Every kind maps to a generator through its [`Movement`] category. The
//! mosquito re-enters the table with the kinds it touches, so the lookup is
//! keyed by the kind a piece is currently moving as, not its own kind.

use rustc_hash::FxHashSet;

use crate::board::{Board, Effect, Move};
use crate::hex::{can_slide, Hex, Position};
use crate::pieces::{Color, Movement, Piece, PieceId, PieceKind, FLIGHT_Z};

/// Deduplicating move collector: one move per (piece, destination cell),
/// first insertion wins
#[derive(Debug, Default)]
pub struct Targets {
    moves: Vec<Move>,
    seen: FxHashSet<(PieceId, Hex)>,
}

impl Targets {
    pub fn place(&mut self, piece: PieceId, to: Hex) -> bool {
        if !self.seen.insert((piece, to)) {
            return false;
        }
        self.moves.push(Move::Place { piece, to });
        true
    }

    pub fn shift(&mut self, piece: &Piece, to: Position, path: Vec<Position>, effect: Effect) -> bool {
        let Some(from) = piece.position else { return false };
        if !self.seen.insert((piece.id, to.hex)) {
            return false;
        }
        self.moves.push(Move::Shift { piece: piece.id, from, to, path, effect });
        true
    }

    pub fn len(&self) -> usize {
        self.moves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }

    pub fn into_moves(self) -> Vec<Move> {
        self.moves
    }
}

/// Generator signature; returns how many targets it proposed
pub type Generator = fn(&Board, &Piece, &mut Targets) -> usize;

/// Movement category to generator
pub fn generator(movement: Movement) -> Generator {
    match movement {
        Movement::SingleStep => single_step,
        Movement::Climber => climber,
        Movement::LineJump => line_jump,
        Movement::FixedWalk => fixed_walk,
        Movement::UnboundedWalk => unbounded_walk,
        Movement::OverAndDown => over_and_down,
        Movement::Mimic => mimic,
        Movement::Carrier => carrier,
        Movement::Ambush => ambush,
        Movement::Hopper => hopper,
        Movement::Immobile => immobile,
        Movement::Aerial => aerial,
        Movement::OwnSurface => own_surface,
        Movement::Leaper => leaper,
        Movement::SegmentedSwap => segmented_swap,
    }
}

/// Add the moves of `piece` when moving as `kind`
pub fn piece_moves(board: &Board, piece: &Piece, kind: PieceKind, targets: &mut Targets) -> usize {
    let standard = board.is_standard();
    // Pieces moved last turn rest, except where a carrier ability is in play
    let exempt = kind == PieceKind::PillBug || (standard && kind == PieceKind::Mosquito);
    if !exempt && board.was_moved_last(piece.id) {
        return 0;
    }
    if piece.position.is_none() {
        return 0;
    }
    generator(kind.movement())(board, piece, targets)
}

// ============================================================================
// GENERATORS
// ============================================================================

fn position(piece: &Piece) -> Position {
    piece.position.expect("generators only run for pieces in play")
}

fn liftable(board: &Board, piece: &Piece) -> bool {
    board.still_one_hive_after_remove(piece.id)
}

fn is_scorpion(board: &Board, hex: Hex) -> bool {
    board.cell(hex).is_some_and(|c| c.kind == PieceKind::Scorpion)
}

fn single_step(board: &Board, piece: &Piece, targets: &mut Targets) -> usize {
    if !liftable(board, piece) {
        return 0;
    }
    step_around(board, piece, targets)
}

fn climber(board: &Board, piece: &Piece, targets: &mut Targets) -> usize {
    if !liftable(board, piece) {
        return 0;
    }
    climb_step(board, piece, targets)
}

fn line_jump(board: &Board, piece: &Piece, targets: &mut Targets) -> usize {
    if !liftable(board, piece) {
        return 0;
    }
    jump_over(board, piece, None, targets)
}

fn fixed_walk(board: &Board, piece: &Piece, targets: &mut Targets) -> usize {
    if !liftable(board, piece) {
        return 0;
    }
    let mut count = walk(board, piece, Some(3), None, targets);
    if !board.is_standard() {
        count += jump_over(board, piece, Some(1), targets);
    }
    count
}

fn unbounded_walk(board: &Board, piece: &Piece, targets: &mut Targets) -> usize {
    if !liftable(board, piece) {
        return 0;
    }
    // Extended rules: the ant has to end next to an enemy piece
    let near = (!board.is_standard()).then(|| piece.color.opponent());
    walk(board, piece, None, near, targets)
}

fn over_and_down(board: &Board, piece: &Piece, targets: &mut Targets) -> usize {
    if !liftable(board, piece) {
        return 0;
    }
    crawl_over(board, piece, Some(3), None, targets)
}

fn mimic(board: &Board, piece: &Piece, targets: &mut Targets) -> usize {
    let pos = position(piece);
    if pos.z > 0 {
        if !liftable(board, piece) {
            return 0;
        }
        return climb_step(board, piece, targets);
    }
    let mut kinds: Vec<PieceKind> = Vec::with_capacity(6);
    for n in pos.hex.neighbors() {
        if let Some(cell) = board.cell(n) {
            if cell.kind != PieceKind::Mosquito && !kinds.contains(&cell.kind) {
                kinds.push(cell.kind);
            }
        }
    }
    kinds
        .into_iter()
        .map(|kind| piece_moves(board, piece, kind, targets))
        .sum()
}

fn carrier(board: &Board, piece: &Piece, targets: &mut Targets) -> usize {
    let pos = position(piece);
    let standard = board.is_standard();
    let mut count = 0;
    if !board.was_moved_last(piece.id) && liftable(board, piece) {
        count += step_around(board, piece, targets);
    }
    // Extended rules: a mosquito does not borrow the carrying ability
    if !standard && piece.kind == PieceKind::Mosquito {
        return count;
    }

    let lifted = pos.z as i8 + 1;
    let mut free: Vec<Hex> = Vec::new();
    let mut prey: Vec<Hex> = Vec::new();
    for a in board.around(pos.hex, None) {
        if a.z < 0 && can_slide(lifted, a.z, a.left, a.right) {
            free.push(a.hex);
        } else if a.z == 0 && can_slide(a.z, pos.z as i8, a.left, a.right) {
            prey.push(a.hex);
        }
    }
    let over = Position::new(pos.hex, pos.z + 1);
    for hex in prey {
        let Some(victim) = board.top_at(hex) else { continue };
        let allowed = standard
            || !matches!(
                victim.kind,
                PieceKind::PillBug | PieceKind::Centipede | PieceKind::Scorpion
            );
        if allowed && !board.was_moved_last(victim.id) && liftable(board, victim) {
            for &to in &free {
                targets.shift(victim, Position::ground(to), vec![over], Effect::Carried { by: piece.id });
                count += 1;
            }
        }
    }
    count
}

fn ambush(board: &Board, piece: &Piece, targets: &mut Targets) -> usize {
    let pos = position(piece);
    if pos.z > 0 {
        if !liftable(board, piece) {
            return 0;
        }
        return climb_step(board, piece, targets);
    }
    if piece.kind == PieceKind::Mosquito {
        return 0;
    }
    let mut count = 0;
    for a in board.around(pos.hex, None) {
        if a.z != 0 || !a.has_open_flank() {
            continue;
        }
        let Some(victim) = board.top_at(a.hex) else { continue };
        if victim.kind == PieceKind::Scorpion || board.was_moved_last(victim.id) {
            continue;
        }
        if liftable(board, victim) {
            targets.shift(piece, Position::new(a.hex, 1), Vec::new(), Effect::Devour { victim: victim.id });
            count += 1;
        }
    }
    count
}

fn hopper(board: &Board, piece: &Piece, targets: &mut Targets) -> usize {
    if !liftable(board, piece) {
        return 0;
    }
    match step_around(board, piece, targets) {
        0 => fly(board, piece, None, targets),
        steps => steps,
    }
}

fn immobile(_board: &Board, _piece: &Piece, _targets: &mut Targets) -> usize {
    0
}

fn aerial(board: &Board, piece: &Piece, targets: &mut Targets) -> usize {
    if !liftable(board, piece) {
        return 0;
    }
    fly(board, piece, Some(piece.color.opponent()), targets)
}

fn own_surface(board: &Board, piece: &Piece, targets: &mut Targets) -> usize {
    if !liftable(board, piece) {
        return 0;
    }
    crawl_over(board, piece, None, Some(piece.color), targets)
}

fn leaper(board: &Board, piece: &Piece, targets: &mut Targets) -> usize {
    if !liftable(board, piece) {
        return 0;
    }
    let pos = position(piece);
    let mut count = 0;
    let around = board.around(pos.hex, None);
    for (d, mid) in around.iter().enumerate() {
        if is_scorpion(board, mid.hex) || !can_slide(pos.z as i8, mid.z, mid.left, mid.right) {
            continue;
        }
        let step = Position::new(mid.hex, (mid.z + 1) as u8);
        let beyond = board.around(mid.hex, None);
        for side in [(d + 5) % 6, (d + 1) % 6] {
            let a = beyond[side];
            if is_scorpion(board, a.hex) || !can_slide(mid.z + 1, a.z, a.left, a.right) {
                continue;
            }
            if pos.z == 0 || a.z >= 0 {
                targets.shift(piece, Position::new(a.hex, (a.z + 1) as u8), vec![step], Effect::None);
                count += 1;
                continue;
            }
            // Leaving a stack for the ground drags the piece below along
            let Some(passenger) = board.piece_at(Position::new(pos.hex, pos.z - 1)) else {
                continue;
            };
            if passenger.kind != PieceKind::Dragonfly && board.still_one_hive_after_lift(piece.id, 2) {
                targets.shift(
                    piece,
                    Position::ground(a.hex),
                    vec![step],
                    Effect::Airlift { passenger: passenger.id },
                );
                count += 1;
            }
        }
    }
    count
}

fn segmented_swap(board: &Board, piece: &Piece, targets: &mut Targets) -> usize {
    if !liftable(board, piece) {
        return 0;
    }
    let mut count = step_around(board, piece, targets);
    if piece.kind == PieceKind::Mosquito {
        return count;
    }
    let pos = position(piece);
    for a in board.around(pos.hex, None) {
        if a.z != 0 || !a.has_open_flank() {
            continue;
        }
        let Some(victim) = board.top_at(a.hex) else { continue };
        let swappable = !matches!(
            victim.kind,
            PieceKind::PillBug | PieceKind::Centipede | PieceKind::Scorpion
        );
        if swappable && !board.was_moved_last(victim.id) {
            targets.shift(piece, Position::new(a.hex, pos.z + 1), Vec::new(), Effect::Lunge { victim: victim.id });
            count += 1;
        }
    }
    count
}

// ============================================================================
// PATH PRIMITIVES
// ============================================================================

/// One crawl step into an empty neighbour
fn step_around(board: &Board, piece: &Piece, targets: &mut Targets) -> usize {
    let pos = position(piece);
    let mut count = 0;
    for a in board.around(pos.hex, None) {
        if a.z < 0 && can_slide(pos.z as i8, a.z, a.left, a.right) {
            targets.shift(piece, Position::ground(a.hex), Vec::new(), Effect::None);
            count += 1;
        }
    }
    count
}

/// One step to any neighbour, climbing onto occupied cells
fn climb_step(board: &Board, piece: &Piece, targets: &mut Targets) -> usize {
    let pos = position(piece);
    let mut count = 0;
    for a in board.around(pos.hex, None) {
        if is_scorpion(board, a.hex) {
            continue;
        }
        if can_slide(pos.z as i8, a.z, a.left, a.right) {
            targets.shift(piece, Position::new(a.hex, (a.z + 1) as u8), Vec::new(), Effect::None);
            count += 1;
        }
    }
    count
}

/// Straight jumps over contiguous occupied cells, landing on the first gap.
/// `max_over` caps how many pieces may be jumped.
fn jump_over(board: &Board, piece: &Piece, max_over: Option<usize>, targets: &mut Targets) -> usize {
    let pos = position(piece);
    let mut count = 0;
    for d in 0..6 {
        let mut hex = pos.hex.neighbor(d);
        let mut steps = Vec::new();
        loop {
            let Some(cell) = board.cell(hex) else { break };
            if cell.kind == PieceKind::Scorpion {
                break;
            }
            steps.push(Position::new(hex, cell.height));
            hex = hex.neighbor(d);
            if !board.is_occupied(hex) {
                targets.shift(piece, Position::ground(hex), steps, Effect::None);
                count += 1;
                break;
            }
            if max_over.is_some_and(|m| steps.len() >= m) {
                break;
            }
        }
    }
    count
}

/// Breadth-first crawl around the hive with the mover lifted. `steps`
/// fixes the exact path length and keeps every non-repeating path of that
/// length; without it only reachability matters. `near` requires the
/// destination to touch a piece of that color.
fn walk(
    board: &Board,
    piece: &Piece,
    steps: Option<usize>,
    near: Option<Color>,
    targets: &mut Targets,
) -> usize {
    let origin = position(piece).hex;
    let mut count = 0;
    let mut reached: FxHashSet<Hex> = FxHashSet::default();
    let mut paths: Vec<Vec<Hex>> = vec![vec![origin]];
    while !paths.is_empty() {
        let mut next = Vec::new();
        for path in &paths {
            let Some(&from) = path.last() else { continue };
            for a in board.around(from, Some(origin)) {
                if path.contains(&a.hex) {
                    continue;
                }
                if a.z >= 0 || !can_slide(0, a.z, a.left, a.right) {
                    continue;
                }
                // Two paths of a fixed length may share a cell and still
                // branch differently afterwards
                if steps.is_none() && !reached.insert(a.hex) {
                    continue;
                }
                if steps.map_or(true, |n| path.len() < n) {
                    let mut longer = path.clone();
                    longer.push(a.hex);
                    next.push(longer);
                }
                let near_ok = near.map_or(true, |c| {
                    a.hex
                        .neighbors()
                        .iter()
                        .any(|&m| board.cell(m).is_some_and(|cell| cell.color == c))
                });
                let length_ok = steps.map_or(true, |n| path.len() == n);
                if near_ok && length_ok {
                    let waypoints = path[1..].iter().map(|&h| Position::ground(h)).collect();
                    if targets.shift(piece, Position::ground(a.hex), waypoints, Effect::None) {
                        count += 1;
                    }
                }
            }
        }
        paths = next;
    }
    count
}

/// Crawl on top of the hive and step down. `steps` fixes the path length
/// (ups plus the final down); `own` restricts climbing to that color.
fn crawl_over(
    board: &Board,
    piece: &Piece,
    steps: Option<usize>,
    own: Option<Color>,
    targets: &mut Targets,
) -> usize {
    let pos = position(piece);
    let origin = pos.hex;
    let mut count = 0;
    let mut paths: Vec<Vec<Position>> = vec![vec![pos]];
    let mut visited_ever: FxHashSet<Hex> = FxHashSet::default();
    while !paths.is_empty() {
        let mut next = Vec::new();
        let mut visited: FxHashSet<Hex> = FxHashSet::default();
        for path in &paths {
            let Some(&last) = path.last() else { continue };
            for a in board.around(last.hex, Some(origin)) {
                if visited_ever.contains(&a.hex)
                    || visited.contains(&a.hex)
                    || path.iter().any(|s| s.hex == a.hex)
                {
                    continue;
                }
                let up = a.z >= 0
                    && steps.map_or(true, |n| path.len() < n)
                    && board.cell(a.hex).is_some_and(|c| {
                        c.kind != PieceKind::Scorpion && own.map_or(true, |color| c.color == color)
                    });
                let down = a.z < 0 && path.len() > 1 && steps.map_or(true, |n| path.len() == n);
                if !(up || down) || !can_slide(last.z as i8, a.z, a.left, a.right) {
                    continue;
                }
                if steps.is_some() {
                    visited.insert(a.hex);
                } else if path.len() > 1 {
                    visited_ever.insert(a.hex);
                }
                if up {
                    let mut longer = path.clone();
                    longer.push(Position::new(a.hex, (a.z + 1) as u8));
                    next.push(longer);
                } else {
                    targets.shift(piece, Position::new(a.hex, pos.z), path[1..].to_vec(), Effect::None);
                    count += 1;
                }
            }
        }
        paths = next;
    }
    count
}

/// Flight to any placement-style cell; `near` as in [`Board::placement_cells`]
fn fly(board: &Board, piece: &Piece, near: Option<Color>, targets: &mut Targets) -> usize {
    let pos = position(piece);
    let over = Position::new(pos.hex, FLIGHT_Z);
    let mut count = 0;
    for hex in board.placement_cells(near, Some(pos.hex)) {
        targets.shift(piece, Position::ground(hex), vec![over], Effect::None);
        count += 1;
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pieces::PieceKind as K;
    use crate::ruleset::RuleSet;
    use Color::{Black as B, White as W};

    fn h(x: i16, y: i16) -> Hex {
        Hex::new(x, y)
    }

    /// Queens side by side with one extra white piece west of them
    fn line_with(ruleset: RuleSet, kind: PieceKind) -> Board {
        Board::from_layout(
            ruleset,
            5,
            &[(W, K::Queen, h(0, 0)), (B, K::Queen, h(2, 0)), (W, kind, h(-2, 0))],
        )
        .unwrap()
    }

    fn moves_of(board: &Board, at: Hex) -> Vec<Move> {
        let id = board.top_at(at).unwrap().id;
        board
            .legal_moves()
            .into_iter()
            .filter(|m| m.piece() == Some(id) && !m.is_placement())
            .collect()
    }

    fn cells_of(board: &Board, at: Hex) -> Vec<Hex> {
        let mut cells: Vec<Hex> = moves_of(board, at)
            .iter()
            .map(|m| m.destination().unwrap().hex)
            .collect();
        cells.sort();
        cells
    }

    fn sorted(mut cells: Vec<Hex>) -> Vec<Hex> {
        cells.sort();
        cells
    }

    #[test]
    fn test_queen_steps() {
        let board = Board::from_layout(
            RuleSet::Standard,
            3,
            &[(W, K::Queen, h(0, 0)), (B, K::Queen, h(2, 0))],
        )
        .unwrap();
        assert_eq!(cells_of(&board, h(0, 0)), sorted(vec![h(1, 1), h(1, -1)]));
    }

    #[test]
    fn test_pinned_piece_stays() {
        let board = line_with(RuleSet::Standard, K::Ant);
        assert!(cells_of(&board, h(0, 0)).is_empty());
    }

    #[test]
    fn test_beetle_climbs() {
        let board = line_with(RuleSet::Standard, K::Beetle);
        let moves = moves_of(&board, h(-2, 0));
        assert_eq!(moves.len(), 3);
        assert!(moves
            .iter()
            .any(|m| m.destination() == Some(Position::new(h(0, 0), 1))));
    }

    #[test]
    fn test_grasshopper_jumps_line() {
        let board = line_with(RuleSet::Standard, K::Grasshopper);
        let moves = moves_of(&board, h(-2, 0));
        assert_eq!(moves.len(), 1);
        match &moves[0] {
            Move::Shift { to, path, .. } => {
                assert_eq!(*to, Position::ground(h(4, 0)));
                assert_eq!(path, &vec![Position::new(h(0, 0), 1), Position::new(h(2, 0), 1)]);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_spider_walks_exactly_three() {
        let board = line_with(RuleSet::Standard, K::Spider);
        assert_eq!(cells_of(&board, h(-2, 0)), sorted(vec![h(3, 1), h(3, -1)]));
    }

    #[test]
    fn test_ant_reaches_whole_perimeter() {
        let board = line_with(RuleSet::Standard, K::Ant);
        let expected = vec![h(-1, 1), h(1, 1), h(3, 1), h(4, 0), h(3, -1), h(1, -1), h(-1, -1)];
        assert_eq!(cells_of(&board, h(-2, 0)), sorted(expected));
    }

    #[test]
    fn test_extended_ant_ends_near_enemy() {
        let board = line_with(RuleSet::Extended, K::Ant);
        let expected = vec![h(1, 1), h(3, 1), h(4, 0), h(3, -1), h(1, -1)];
        assert_eq!(cells_of(&board, h(-2, 0)), sorted(expected));
    }

    #[test]
    fn test_ladybug_two_up_one_down() {
        let board = line_with(RuleSet::Standard, K::Ladybug);
        let expected = vec![h(1, 1), h(1, -1), h(3, 1), h(3, -1), h(4, 0)];
        assert_eq!(cells_of(&board, h(-2, 0)), sorted(expected));
        for m in moves_of(&board, h(-2, 0)) {
            if let Move::Shift { path, .. } = m {
                assert_eq!(path.len(), 2);
                assert!(path.iter().all(|p| p.z == 1));
            }
        }
    }

    #[test]
    fn test_mosquito_copies_neighbours() {
        let board = line_with(RuleSet::Standard, K::Mosquito);
        // Next to the queen only: queen steps
        assert_eq!(cells_of(&board, h(-2, 0)), sorted(vec![h(-1, 1), h(-1, -1)]));

        let board = Board::from_layout(
            RuleSet::Standard,
            5,
            &[
                (W, K::Beetle, h(0, 0)),
                (B, K::Queen, h(2, 0)),
                (W, K::Queen, h(4, 0)),
                (W, K::Mosquito, h(-2, 0)),
            ],
        )
        .unwrap();
        let moves = moves_of(&board, h(-2, 0));
        assert!(moves
            .iter()
            .any(|m| m.destination() == Some(Position::new(h(0, 0), 1))));
    }

    #[test]
    fn test_pill_bug_carries_neighbours() {
        let board = Board::from_layout(
            RuleSet::Standard,
            5,
            &[
                (W, K::Queen, h(-2, 0)),
                (W, K::PillBug, h(0, 0)),
                (B, K::Queen, h(2, 0)),
            ],
        )
        .unwrap();
        let pill_bug = board.top_at(h(0, 0)).unwrap().id;
        let carried = moves_of(&board, h(2, 0));
        assert_eq!(carried.len(), 4);
        for m in &carried {
            match m {
                Move::Shift { path, effect, to, .. } => {
                    assert_eq!(*effect, Effect::Carried { by: pill_bug });
                    assert_eq!(path, &vec![Position::new(h(0, 0), 1)]);
                    assert_eq!(to.z, 0);
                    assert!(to.hex.is_adjacent(h(0, 0)));
                }
                other => panic!("unexpected {:?}", other),
            }
        }
        // The pill bug itself is pinned
        assert!(moves_of(&board, h(0, 0)).is_empty());
    }

    #[test]
    fn test_scorpion_blocks() {
        let board = line_with(RuleSet::Extended, K::Scorpion);
        assert!(cells_of(&board, h(-2, 0)).is_empty());

        let board = Board::from_layout(
            RuleSet::Extended,
            5,
            &[
                (W, K::Queen, h(0, 0)),
                (B, K::Scorpion, h(2, 0)),
                (W, K::Beetle, h(4, 0)),
            ],
        )
        .unwrap();
        assert_eq!(cells_of(&board, h(4, 0)), sorted(vec![h(3, 1), h(3, -1)]));

        let board = Board::from_layout(
            RuleSet::Extended,
            5,
            &[
                (W, K::Grasshopper, h(-2, 0)),
                (B, K::Scorpion, h(0, 0)),
                (W, K::Queen, h(2, 0)),
            ],
        )
        .unwrap();
        assert!(cells_of(&board, h(-2, 0)).is_empty());
    }

    #[test]
    fn test_mantis_devours() {
        let board = Board::from_layout(
            RuleSet::Extended,
            5,
            &[
                (W, K::Queen, h(-2, 0)),
                (W, K::Mantis, h(0, 0)),
                (B, K::Queen, h(2, 0)),
            ],
        )
        .unwrap();
        let moves = moves_of(&board, h(0, 0));
        assert_eq!(moves.len(), 2);
        assert!(moves.iter().all(|m| matches!(
            m,
            Move::Shift { effect: Effect::Devour { .. }, to, .. } if to.z == 1
        )));
    }

    #[test]
    fn test_centipede_lunges() {
        let board = line_with(RuleSet::Extended, K::Centipede);
        let moves = moves_of(&board, h(-2, 0));
        let queen = board.queen(W).unwrap().id;
        assert!(moves.iter().any(|m| matches!(
            m,
            Move::Shift { effect: Effect::Lunge { victim }, to, .. }
                if *victim == queen && *to == Position::new(h(0, 0), 1)
        )));
        assert_eq!(cells_of(&board, h(-2, 0)), sorted(vec![h(-1, 1), h(-1, -1), h(0, 0)]));
    }

    #[test]
    fn test_dragonfly_leaps() {
        let board = line_with(RuleSet::Extended, K::Dragonfly);
        let cells = cells_of(&board, h(-2, 0));
        assert!(cells.contains(&h(1, 1)));
        assert!(cells.contains(&h(1, -1)));
        assert!(!cells.contains(&h(-2, 0)));
    }

    #[test]
    fn test_dragonfly_airlift() {
        let board = Board::from_layout(
            RuleSet::Extended,
            5,
            &[
                (W, K::Queen, h(0, 0)),
                (B, K::Queen, h(2, 0)),
                (W, K::Dragonfly, h(2, 0)),
            ],
        )
        .unwrap();
        let passenger = board.queen(B).unwrap().id;
        let moves = moves_of(&board, h(2, 0));
        assert!(moves.iter().any(|m| matches!(
            m,
            Move::Shift { effect: Effect::Airlift { passenger: p }, to, .. }
                if *p == passenger && to.z == 0
        )));
    }

    #[test]
    fn test_wasp_lands_by_enemies() {
        let board = line_with(RuleSet::Extended, K::Wasp);
        assert_eq!(cells_of(&board, h(-2, 0)), sorted(vec![h(4, 0), h(3, 1), h(3, -1)]));
        for m in moves_of(&board, h(-2, 0)) {
            if let Move::Shift { path, .. } = m {
                assert_eq!(path, vec![Position::new(h(-2, 0), FLIGHT_Z)]);
            }
        }
    }

    #[test]
    fn test_fly_steps_when_free() {
        let board = line_with(RuleSet::Extended, K::Fly);
        assert_eq!(cells_of(&board, h(-2, 0)), sorted(vec![h(-1, 1), h(-1, -1)]));
    }

    #[test]
    fn test_cockroach_walks_over_own() {
        let board = line_with(RuleSet::Extended, K::Cockroach);
        let expected = vec![h(1, 1), h(1, -1), h(-1, 1), h(-1, -1)];
        assert_eq!(cells_of(&board, h(-2, 0)), sorted(expected));
    }

    #[test]
    fn test_targets_dedup() {
        let mut targets = Targets::default();
        assert!(targets.place(3, h(0, 0)));
        assert!(!targets.place(3, h(0, 0)));
        assert!(targets.place(4, h(0, 0)));
        assert_eq!(targets.len(), 2);
    }
}
