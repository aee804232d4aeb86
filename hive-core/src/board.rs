//! Board state, occupancy index, hive connectivity, and move application

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

use crate::error::{HiveError, Result};
use crate::hex::{can_slide, Hex, Position, ORIGIN};
use crate::movegen::{self, Targets};
use crate::pieces::{create_pieces, Color, Piece, PieceId, PieceKind};
use crate::ruleset::RuleSet;

// ============================================================================
// CORE TYPES
// ============================================================================

/// Game result
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameResult {
    Ongoing,
    WhiteWins,
    BlackWins,
    /// Both queens surrounded by the same move
    Draw,
}

/// What a relocation does to a second piece
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Effect {
    None,
    /// The moving piece is lifted over the adjacent carrier `by`
    Carried { by: PieceId },
    /// Mantis pulls `victim` onto its own cell and sits on top of it
    Devour { victim: PieceId },
    /// Dragonfly leaves the stack taking the piece below along
    Airlift { passenger: PieceId },
    /// Centipede trades places with `victim`
    Lunge { victim: PieceId },
}

impl Effect {
    /// The piece relocated alongside the mover, if any
    pub fn second_piece(&self) -> Option<PieceId> {
        match *self {
            Effect::Devour { victim } | Effect::Lunge { victim } => Some(victim),
            Effect::Airlift { passenger } => Some(passenger),
            Effect::None | Effect::Carried { .. } => None,
        }
    }
}

/// A move. Shift destinations are the cell the player selects: for `Devour`
/// and `Lunge` that is on top of the victim, for `Airlift` the ground cell.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Move {
    Pass,
    Place {
        piece: PieceId,
        to: Hex,
    },
    Shift {
        piece: PieceId,
        from: Position,
        to: Position,
        /// Intermediate waypoints, endpoints excluded
        path: Vec<Position>,
        effect: Effect,
    },
}

impl Move {
    pub fn piece(&self) -> Option<PieceId> {
        match *self {
            Move::Pass => None,
            Move::Place { piece, .. } | Move::Shift { piece, .. } => Some(piece),
        }
    }

    pub fn origin(&self) -> Option<Position> {
        match *self {
            Move::Shift { from, .. } => Some(from),
            _ => None,
        }
    }

    pub fn destination(&self) -> Option<Position> {
        match *self {
            Move::Pass => None,
            Move::Place { to, .. } => Some(Position::ground(to)),
            Move::Shift { to, .. } => Some(to),
        }
    }

    pub fn is_placement(&self) -> bool {
        matches!(self, Move::Place { .. })
    }
}

/// Top of an occupied column
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Cell {
    /// Number of stacked pieces (>= 1)
    pub height: u8,
    pub top: PieceId,
    pub kind: PieceKind,
    pub color: Color,
}

impl Cell {
    /// Level of the top piece
    pub fn z(&self) -> u8 {
        self.height - 1
    }
}

/// A neighbouring column seen from a center cell: its top level and the top
/// levels of the two columns flanking the step into it (-1 = empty)
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Around {
    pub hex: Hex,
    pub z: i8,
    pub left: i8,
    pub right: i8,
}

impl Around {
    /// One of the flanking columns is empty
    pub fn has_open_flank(&self) -> bool {
        self.left < 0 || self.right < 0
    }
}

#[derive(Clone, Debug)]
struct Undo {
    moved: Vec<(PieceId, Option<Position>, Vec<Position>)>,
    last_moved: Vec<PieceId>,
}

// ============================================================================
// BOARD
// ============================================================================

#[derive(Clone, Debug)]
pub struct Board {
    ruleset: RuleSet,
    /// Starts at 1; white plays odd rounds
    round: u32,
    pieces: Vec<Piece>,
    last_moved: Vec<PieceId>,
    history: Vec<Undo>,

    // Derived, rebuilt after every mutation
    cells: FxHashMap<Hex, Cell>,
    top: Vec<PieceId>,
    cached: Vec<Move>,
}

impl Default for Board {
    fn default() -> Self {
        Self::new(RuleSet::Standard)
    }
}

impl Board {
    // ========================================================================
    // CONSTRUCTION
    // ========================================================================

    pub fn new(ruleset: RuleSet) -> Self {
        let mut board = Self {
            ruleset,
            round: 1,
            pieces: create_pieces(),
            last_moved: Vec::new(),
            history: Vec::new(),
            cells: FxHashMap::default(),
            top: Vec::new(),
            cached: Vec::new(),
        };
        board.refresh();
        board
    }

    /// Back to round 1 with every piece in the reserve
    pub fn reset(&mut self, ruleset: RuleSet) {
        self.ruleset = ruleset;
        self.round = 1;
        self.last_moved.clear();
        self.history.clear();
        for p in &mut self.pieces {
            p.position = None;
            p.last_path.clear();
        }
        self.refresh();
    }

    /// Build a position directly. Pieces are taken from the reserve in
    /// order and stacked on whatever already occupies their cell.
    pub fn from_layout(
        ruleset: RuleSet,
        round: u32,
        placements: &[(Color, PieceKind, Hex)],
    ) -> Result<Self> {
        if round == 0 {
            return Err(HiveError::Config("rounds are numbered from 1".to_string()));
        }
        let mut board = Self::new(ruleset);
        board.round = round;
        for &(color, kind, hex) in placements {
            if !hex.is_valid() {
                return Err(HiveError::IllegalMove(format!(
                    "({}, {}) is not a grid cell",
                    hex.x, hex.y
                )));
            }
            let id = board
                .pieces
                .iter()
                .filter(|p| p.color == color && p.kind == kind && !p.in_play() && board.is_usable(p))
                .min_by_key(|p| p.number)
                .map(|p| p.id)
                .ok_or_else(|| {
                    HiveError::UnknownPiece(format!("no {} {} left", color, kind.info().name))
                })?;
            let pos = Position::new(hex, board.height(hex));
            let piece = &mut board.pieces[id as usize];
            piece.position = Some(pos);
            piece.last_path = vec![pos];
            board.refresh();
        }
        Ok(board)
    }

    // ========================================================================
    // QUERIES
    // ========================================================================

    pub fn ruleset(&self) -> RuleSet {
        self.ruleset
    }

    pub fn is_standard(&self) -> bool {
        self.ruleset.is_standard()
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn color_to_move(&self) -> Color {
        if self.round & 1 == 1 {
            Color::White
        } else {
            Color::Black
        }
    }

    pub fn pieces(&self) -> &[Piece] {
        &self.pieces
    }

    pub fn piece(&self, id: PieceId) -> &Piece {
        &self.pieces[id as usize]
    }

    pub fn last_moved(&self) -> &[PieceId] {
        &self.last_moved
    }

    pub fn was_moved_last(&self, id: PieceId) -> bool {
        self.last_moved.contains(&id)
    }

    /// Top of the column at `hex`, None when empty
    pub fn cell(&self, hex: Hex) -> Option<Cell> {
        self.cells.get(&hex).copied()
    }

    /// Number of pieces stacked at `hex`
    pub fn height(&self, hex: Hex) -> u8 {
        self.cells.get(&hex).map_or(0, |c| c.height)
    }

    pub fn is_occupied(&self, hex: Hex) -> bool {
        self.cells.contains_key(&hex)
    }

    /// Top piece of the column at `hex`
    pub fn top_at(&self, hex: Hex) -> Option<&Piece> {
        self.cell(hex).map(|c| self.piece(c.top))
    }

    /// Piece at an exact level
    pub fn piece_at(&self, pos: Position) -> Option<&Piece> {
        if !self.is_occupied(pos.hex) {
            return None;
        }
        self.pieces.iter().find(|p| p.position == Some(pos))
    }

    /// In-play pieces with nothing on top, in id order
    pub fn top_pieces(&self) -> impl Iterator<Item = &Piece> + '_ {
        self.top.iter().map(move |&id| self.piece(id))
    }

    pub fn in_play(&self) -> impl Iterator<Item = &Piece> + '_ {
        self.pieces.iter().filter(|p| p.in_play())
    }

    /// Neighbour levels around `center`. The column at `ignore` reads one
    /// level lower, as if the piece moving from there were lifted.
    pub fn around(&self, center: Hex, ignore: Option<Hex>) -> [Around; 6] {
        let levels: [i8; 6] = std::array::from_fn(|d| {
            let hex = center.neighbor(d);
            let lift = if Some(hex) == ignore { 2 } else { 1 };
            (self.height(hex) as i8 - lift).max(-1)
        });
        std::array::from_fn(|d| Around {
            hex: center.neighbor(d),
            z: levels[d],
            left: levels[(d + 5) % 6],
            right: levels[(d + 1) % 6],
        })
    }

    /// The queen of `color`, if placed
    pub fn queen(&self, color: Color) -> Option<&Piece> {
        self.pieces
            .iter()
            .find(|p| p.kind == PieceKind::Queen && p.color == color && p.in_play())
    }

    pub fn is_queen_surrounded(&self, color: Color) -> bool {
        match self.queen(color).and_then(|q| q.position) {
            Some(pos) => pos.hex.neighbors().iter().all(|&n| self.is_occupied(n)),
            None => false,
        }
    }

    pub fn is_game_over(&self) -> bool {
        self.is_queen_surrounded(Color::White) || self.is_queen_surrounded(Color::Black)
    }

    pub fn game_result(&self) -> GameResult {
        match (
            self.is_queen_surrounded(Color::White),
            self.is_queen_surrounded(Color::Black),
        ) {
            (true, true) => GameResult::Draw,
            (true, false) => GameResult::BlackWins,
            (false, true) => GameResult::WhiteWins,
            (false, false) => GameResult::Ongoing,
        }
    }

    /// A piece is usable when its kind is in the rule set and, for linked
    /// kinds, its twin with the same number has not been played instead
    pub fn is_usable(&self, piece: &Piece) -> bool {
        if self.ruleset.is_standard() {
            return piece.kind.is_standard();
        }
        match piece.kind.link() {
            None => true,
            Some(link) => {
                piece.in_play()
                    || !self.pieces.iter().any(|l| {
                        l.kind == link && l.in_play() && l.number == piece.number && l.color == piece.color
                    })
            }
        }
    }

    /// The next placeable piece of each kind for `color`
    pub fn reserve(&self, color: Color) -> Vec<&Piece> {
        PieceKind::ALL
            .iter()
            .filter_map(|&kind| {
                self.pieces
                    .iter()
                    .filter(|p| p.kind == kind && p.color == color && !p.in_play() && self.is_usable(p))
                    .min_by_key(|p| p.number)
            })
            .collect()
    }

    // ========================================================================
    // CONNECTIVITY
    // ========================================================================

    /// The hive stays connected when this piece is lifted
    pub fn still_one_hive_after_remove(&self, id: PieceId) -> bool {
        self.still_one_hive_after_lift(id, 1)
    }

    /// Like [`Board::still_one_hive_after_remove`], lifting `levels` pieces
    /// from the top of the column (the piece and those below it)
    pub fn still_one_hive_after_lift(&self, id: PieceId, levels: u8) -> bool {
        let Some(pos) = self.piece(id).position else {
            return true;
        };
        // Covered pieces cannot be lifted
        if self.height(pos.hex) > pos.z + 1 {
            return false;
        }
        // Something stays below
        if pos.z >= levels {
            return true;
        }

        let occupied: [bool; 6] = std::array::from_fn(|d| self.is_occupied(pos.hex.neighbor(d)));
        let groups = (0..6).filter(|&d| !occupied[(d + 5) % 6] && occupied[d]).count();
        if groups <= 1 {
            return true;
        }

        let around: Vec<Hex> = pos
            .hex
            .neighbors()
            .into_iter()
            .zip(occupied)
            .filter_map(|(h, o)| o.then_some(h))
            .collect();
        let mut marked: FxHashSet<Hex> = FxHashSet::default();
        marked.insert(pos.hex);
        marked.insert(around[0]);
        let mut edges = vec![around[0]];
        while let Some(edge) = edges.pop() {
            for n in edge.neighbors() {
                if self.is_occupied(n) && marked.insert(n) {
                    edges.push(n);
                }
            }
        }
        around.iter().all(|h| marked.contains(h))
    }

    // ========================================================================
    // MOVE GENERATION
    // ========================================================================

    /// Empty cells bordering the top pieces of `color` (any color when None),
    /// skipping cells next to the opposing color. The column at `ignore`
    /// is treated as vacated.
    pub fn placement_cells(&self, color: Option<Color>, ignore: Option<Hex>) -> Vec<Hex> {
        let mut visited: FxHashSet<Hex> = FxHashSet::default();
        let mut cells = Vec::new();
        for p in self.top_pieces() {
            let Some(pos) = p.position else { continue };
            if color.is_some_and(|c| c != p.color) || Some(pos.hex) == ignore {
                continue;
            }
            for n in pos.hex.neighbors() {
                if !visited.insert(n) || self.is_occupied(n) {
                    continue;
                }
                let touches_enemy = color.is_some_and(|c| {
                    n.neighbors().iter().any(|&m| {
                        Some(m) != ignore && self.cell(m).is_some_and(|cell| cell.color == c.opponent())
                    })
                });
                if !touches_enemy {
                    cells.push(n);
                }
            }
        }
        cells
    }

    fn generate(&self) -> Vec<Move> {
        if self.is_game_over() {
            return Vec::new();
        }
        let mut targets = Targets::default();
        self.placement_moves(&mut targets);

        let color = self.color_to_move();
        if self.queen(color).is_some() {
            for p in self.top_pieces().filter(|p| p.color == color) {
                movegen::piece_moves(self, p, p.kind, &mut targets);
            }
        }
        let mut moves = targets.into_moves();
        moves.sort_by_key(|m| m.piece());
        moves
    }

    fn placement_moves(&self, targets: &mut Targets) {
        let color = self.color_to_move();
        let mut reserve = self.reserve(color);
        if reserve.is_empty() {
            return;
        }
        let cells = match self.round {
            1 => vec![ORIGIN],
            2 => ORIGIN.neighbors().to_vec(),
            _ => {
                if (self.round == 7 || self.round == 8) && self.queen(color).is_none() {
                    reserve.retain(|p| p.kind == PieceKind::Queen);
                }
                self.placement_cells(Some(color), None)
            }
        };
        for hex in cells {
            for p in &reserve {
                targets.place(p.id, hex);
            }
        }
    }

    /// All legal moves for the side to move. Empty when the game is over,
    /// a lone `Pass` when nothing else is possible.
    pub fn legal_moves(&self) -> Vec<Move> {
        if self.is_game_over() {
            return Vec::new();
        }
        let moves = self.generate();
        if moves.is_empty() {
            vec![Move::Pass]
        } else {
            moves
        }
    }

    /// Refresh the per-piece target cache used by interactive front ends.
    /// With `can_move` false (e.g. a spectator) the cache is cleared.
    pub fn compute_legal_moves(&mut self, can_move: bool) -> usize {
        self.cached = if can_move { self.generate() } else { Vec::new() };
        self.cached.len()
    }

    pub fn cached_moves(&self) -> &[Move] {
        &self.cached
    }

    /// Cached targets of one piece
    pub fn targets_of(&self, id: PieceId) -> impl Iterator<Item = &Move> + '_ {
        self.cached.iter().filter(move |m| m.piece() == Some(id))
    }

    /// The legal move taking `id` to `hex`
    pub fn find_move(&self, id: PieceId, hex: Hex) -> Option<Move> {
        self.legal_moves()
            .into_iter()
            .find(|m| m.piece() == Some(id) && m.destination().is_some_and(|d| d.hex == hex))
    }

    // ========================================================================
    // MOVE APPLICATION
    // ========================================================================

    /// Apply a move. Panics if it does not fit the position; use
    /// [`Board::try_play`] for untrusted input.
    pub fn play(&mut self, mv: &Move) {
        self.play_observed(mv, |_, _| {});
    }

    /// Apply a move, reporting each relocated piece (second argument is true
    /// for the piece dragged along by a two-piece move)
    pub fn play_observed<F: FnMut(&Piece, bool)>(&mut self, mv: &Move, mut observer: F) {
        let mut undo = Undo {
            moved: Vec::with_capacity(2),
            last_moved: std::mem::take(&mut self.last_moved),
        };

        match mv {
            Move::Pass => {}
            &Move::Place { piece, to } => {
                assert!(
                    !self.piece(piece).in_play(),
                    "{} is already on the board",
                    self.piece(piece).label()
                );
                let target = Position::ground(to);
                self.relocate(piece, target, vec![target], &mut undo);
                self.last_moved = vec![piece];
            }
            Move::Shift { piece, from, to, path, effect } => {
                let (piece, from, to) = (*piece, *from, *to);
                assert_eq!(
                    self.piece(piece).position,
                    Some(from),
                    "{} is not at the move origin",
                    self.piece(piece).label()
                );
                match *effect {
                    Effect::None | Effect::Carried { .. } => {
                        let mut steps = Vec::with_capacity(path.len() + 2);
                        steps.push(from);
                        steps.extend_from_slice(path);
                        steps.push(to);
                        self.relocate(piece, to, steps, &mut undo);
                        self.last_moved = vec![piece];
                    }
                    Effect::Devour { victim } => {
                        let prey = self.position_of(victim);
                        let below = Position::ground(from.hex);
                        let above = Position::new(from.hex, 1);
                        self.relocate(victim, below, vec![prey, below], &mut undo);
                        self.relocate(piece, above, vec![from, above], &mut undo);
                        self.last_moved = vec![piece, victim];
                    }
                    Effect::Airlift { passenger } => {
                        let carried = self.position_of(passenger);
                        let below = Position::ground(to.hex);
                        let above = Position::new(to.hex, 1);
                        let mut steps = Vec::with_capacity(path.len() + 2);
                        steps.push(from);
                        steps.extend_from_slice(path);
                        steps.push(above);
                        self.relocate(passenger, below, vec![carried, below], &mut undo);
                        self.relocate(piece, above, steps, &mut undo);
                        self.last_moved = vec![piece, passenger];
                    }
                    Effect::Lunge { victim } => {
                        let prey = self.position_of(victim);
                        let vacated = Position::ground(from.hex);
                        let taken = Position::ground(to.hex);
                        self.relocate(victim, vacated, vec![prey, vacated], &mut undo);
                        self.relocate(piece, taken, vec![from, to, taken], &mut undo);
                        self.last_moved = vec![piece, victim];
                    }
                }
            }
        }

        self.round += 1;
        let moved: Vec<PieceId> = undo.moved.iter().map(|(id, _, _)| *id).collect();
        self.history.push(undo);
        self.refresh();
        for (i, id) in moved.into_iter().enumerate() {
            observer(self.piece(id), moved_is_second(mv, i));
        }
    }

    /// Apply a move after checking it against the legal move list
    pub fn try_play(&mut self, mv: &Move) -> Result<()> {
        if !self.legal_moves().contains(mv) {
            return Err(HiveError::IllegalMove(format!("{:?}", mv)));
        }
        self.play(mv);
        Ok(())
    }

    /// Undo the most recent move; `mv` must be the move that was played
    pub fn play_back(&mut self, mv: &Move) {
        let undo = self
            .history
            .pop()
            .expect("play_back called without a matching play");
        debug_assert!(
            mv.piece().map_or(undo.moved.is_empty(), |id| undo.moved.iter().any(|(m, _, _)| *m == id)),
            "play_back called with a different move"
        );
        for (id, position, path) in undo.moved.into_iter().rev() {
            let piece = &mut self.pieces[id as usize];
            piece.position = position;
            piece.last_path = path;
        }
        self.last_moved = undo.last_moved;
        self.round -= 1;
        self.refresh();
    }

    fn position_of(&self, id: PieceId) -> Position {
        self.piece(id)
            .position
            .unwrap_or_else(|| panic!("{} is not on the board", self.piece(id).label()))
    }

    fn relocate(&mut self, id: PieceId, to: Position, path: Vec<Position>, undo: &mut Undo) {
        let piece = &mut self.pieces[id as usize];
        undo.moved.push((id, piece.position, std::mem::replace(&mut piece.last_path, path)));
        piece.position = Some(to);
    }

    fn refresh(&mut self) {
        self.cells.clear();
        self.cached.clear();
        for p in &self.pieces {
            let Some(pos) = p.position else { continue };
            let height = pos.z + 1;
            let entry = self.cells.entry(pos.hex).or_insert(Cell {
                height: 0,
                top: p.id,
                kind: p.kind,
                color: p.color,
            });
            if height > entry.height {
                *entry = Cell { height, top: p.id, kind: p.kind, color: p.color };
            }
        }
        let cells = &self.cells;
        self.top = self
            .pieces
            .iter()
            .filter(|p| p.position.is_some_and(|pos| cells.get(&pos.hex).is_some_and(|c| c.top == p.id)))
            .map(|p| p.id)
            .collect();
    }

    // ========================================================================
    // CANONICAL STRING
    // ========================================================================

    /// Translation-invariant position key. Pieces are listed by row, column
    /// and level with relative column offsets; `_` flags a last-moved piece
    /// only where that changes what the side to move may do.
    pub fn canonical_string(&self) -> String {
        let mut pieces: Vec<(Position, &Piece)> = self
            .pieces
            .iter()
            .filter_map(|p| p.position.map(|pos| (pos, p)))
            .collect();
        pieces.sort_by_key(|(pos, _)| (pos.hex.y, pos.hex.x, pos.z));

        let playing = self.color_to_move();
        let mut out = String::with_capacity(pieces.len() * 3 + 1);
        if playing == Color::Black {
            out.push('!');
        }
        let mut last_x: Option<i16> = None;
        for (pos, p) in pieces {
            if let Some(x) = last_x {
                match pos.hex.x - x {
                    0 => out.push('+'),
                    2 => {}
                    diff => out.push_str(&diff.to_string()),
                }
            }
            if self.was_moved_last(p.id) && self.last_move_matters(p, pos, playing) {
                out.push('_');
            }
            out.push(p.kind.code(p.color));
            last_x = Some(pos.hex.x);
        }
        out
    }

    fn last_move_matters(&self, p: &Piece, pos: Position, playing: Color) -> bool {
        if pos.z != 0
            || self.height(pos.hex) != 1
            || p.kind == PieceKind::Scorpion
            || self.queen(playing).is_none()
        {
            return false;
        }
        // A friendly piece moved by the opponent is frozen this turn
        if p.color == playing {
            return true;
        }
        let standard = self.is_standard();
        for n in pos.hex.neighbors() {
            let Some(cell) = self.cell(n) else { continue };
            if cell.height > 1 || cell.color != playing {
                continue;
            }
            let mut matters = false;
            let carrier = cell.kind == PieceKind::PillBug
                || (standard
                    && cell.kind == PieceKind::Mosquito
                    && n.neighbors()
                        .iter()
                        .any(|&m| self.cell(m).is_some_and(|c| c.kind == PieceKind::PillBug)));
            let carriable = standard || !matches!(p.kind, PieceKind::PillBug | PieceKind::Centipede);
            if carrier && carriable {
                let carrier_z = cell.height as i8;
                let mut free = false;
                let mut reachable = false;
                for a in self.around(n, None) {
                    free |= a.z < 0 && can_slide(carrier_z, a.z, a.left, a.right);
                    reachable |= a.hex == pos.hex && can_slide(a.z, carrier_z - 1, a.left, a.right);
                }
                matters = free && reachable && self.still_one_hive_after_remove(p.id);
            }
            if matches!(cell.kind, PieceKind::Mantis | PieceKind::Centipede) {
                let open = self
                    .around(n, None)
                    .iter()
                    .any(|a| a.hex == pos.hex && a.has_open_flank());
                if open {
                    matters = if cell.kind == PieceKind::Mantis {
                        self.still_one_hive_after_remove(p.id)
                    } else {
                        self.still_one_hive_after_remove(cell.top)
                    };
                }
            }
            if matters {
                return true;
            }
        }
        false
    }
}

fn moved_is_second(mv: &Move, index: usize) -> bool {
    match mv {
        Move::Shift { effect, .. } if effect.second_piece().is_some() => index == 0,
        _ => false,
    }
}

impl std::fmt::Display for Board {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.canonical_string())
    }
}

// ============================================================================
// TESTS
// ============================================================================
