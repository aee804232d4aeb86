//! Piece kinds, the static catalog, and piece instances

use serde::{Deserialize, Serialize};

use crate::hex::Position;

/// Piece instance identifier (index into the board's piece list)
pub type PieceId = u8;

/// Highest stack level reachable in play. Each color fields at most three
/// pieces that can end a move on top of the hive (the two beetle-slot pieces
/// and the mosquito-slot piece), so a column holds its ground piece and at
/// most six climbers above it.
pub const MAX_Z: u8 = 2 * 3;

/// Waypoint level used to mark a flight over the hive
pub const FLIGHT_Z: u8 = MAX_Z + 1;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Color {
    White,
    Black,
}

impl Color {
    pub const ALL: [Color; 2] = [Color::White, Color::Black];

    pub fn opponent(self) -> Color {
        match self {
            Color::White => Color::Black,
            Color::Black => Color::White,
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn letter(self) -> char {
        match self {
            Color::White => 'w',
            Color::Black => 'b',
        }
    }

    /// +1 for white, -1 for black: evaluations are from white's side
    pub fn sign(self) -> i32 {
        match self {
            Color::White => 1,
            Color::Black => -1,
        }
    }
}

impl std::fmt::Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Color::White => write!(f, "white"),
            Color::Black => write!(f, "black"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PieceKind {
    Queen,
    Beetle,
    Grasshopper,
    Spider,
    Ant,
    Ladybug,
    Mosquito,
    PillBug,
    Mantis,
    Fly,
    Scorpion,
    Wasp,
    Cockroach,
    Dragonfly,
    Centipede,
}

/// How a kind moves once on the board
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Movement {
    SingleStep,      // one crawl step around the hive
    Climber,         // one step, may climb onto stacks
    LineJump,        // straight jump over a contiguous line
    FixedWalk,       // exactly three crawl steps
    UnboundedWalk,   // any number of crawl steps
    OverAndDown,     // two steps on top of the hive, one down
    Mimic,           // copies adjacent kinds
    Carrier,         // single step, or relocates a neighbour
    Ambush,          // eats an adjacent piece from below
    Hopper,          // single step, or flight if boxed in
    Immobile,        // never moves; blocks climbs and jumps
    Aerial,          // flies next to enemies only
    OwnSurface,      // walks over friendly pieces, then down
    Leaper,          // bent two-cell leap, may carry a passenger
    SegmentedSwap,   // single step, or swaps with a neighbour
}

/// Catalog entry for a piece kind
#[derive(Clone, Debug)]
pub struct KindInfo {
    pub kind: PieceKind,
    pub name: &'static str,
    /// Upper case letter; lower case for black pieces
    pub letter: char,
    pub movement: Movement,
    /// Copies per color
    pub quantity: u8,
    /// Part of the standard (non-extended) rule set
    pub standard: bool,
    /// Extended kinds are paired with a standard kind; a player fields
    /// only one of each pair per copy number
    pub link: Option<PieceKind>,
    /// Tie-break rank used by move ordering (higher sorts first)
    pub order: u8,
}

impl KindInfo {
    const fn new(
        kind: PieceKind,
        name: &'static str,
        letter: char,
        movement: Movement,
        quantity: u8,
        standard: bool,
        link: Option<PieceKind>,
        order: u8,
    ) -> Self {
        Self { kind, name, letter, movement, quantity, standard, link, order }
    }
}

use Movement as M;
use PieceKind as K;

/// All 15 kinds, indexed by `PieceKind as usize`
pub static CATALOG: [KindInfo; 15] = [
    KindInfo::new(K::Queen, "Queen Bee", 'Q', M::SingleStep, 1, true, None, 0),
    KindInfo::new(K::Beetle, "Beetle", 'B', M::Climber, 2, true, Some(K::Mantis), 4),
    KindInfo::new(K::Grasshopper, "Grasshopper", 'G', M::LineJump, 3, true, Some(K::Fly), 11),
    KindInfo::new(K::Spider, "Spider", 'S', M::FixedWalk, 2, true, Some(K::Scorpion), 14),
    KindInfo::new(K::Ant, "Soldier Ant", 'A', M::UnboundedWalk, 3, true, Some(K::Wasp), 2),
    KindInfo::new(K::Ladybug, "Ladybug", 'L', M::OverAndDown, 1, true, Some(K::Cockroach), 7),
    KindInfo::new(K::Mosquito, "Mosquito", 'M', M::Mimic, 1, true, Some(K::Dragonfly), 5),
    KindInfo::new(K::PillBug, "Pill Bug", 'P', M::Carrier, 1, true, Some(K::Centipede), 1),
    KindInfo::new(K::Mantis, "Praying Mantis", 'T', M::Ambush, 2, false, Some(K::Beetle), 13),
    KindInfo::new(K::Fly, "Fly", 'F', M::Hopper, 3, false, Some(K::Grasshopper), 9),
    KindInfo::new(K::Scorpion, "Scorpion", 'N', M::Immobile, 2, false, Some(K::Spider), 8),
    KindInfo::new(K::Wasp, "Wasp", 'W', M::Aerial, 3, false, Some(K::Ant), 10),
    KindInfo::new(K::Cockroach, "Cockroach", 'R', M::OwnSurface, 1, false, Some(K::Ladybug), 6),
    KindInfo::new(K::Dragonfly, "Dragonfly", 'D', M::Leaper, 1, false, Some(K::Mosquito), 3),
    KindInfo::new(K::Centipede, "Centipede", 'C', M::SegmentedSwap, 1, false, Some(K::PillBug), 12),
];

impl PieceKind {
    pub const ALL: [PieceKind; 15] = [
        K::Queen,
        K::Beetle,
        K::Grasshopper,
        K::Spider,
        K::Ant,
        K::Ladybug,
        K::Mosquito,
        K::PillBug,
        K::Mantis,
        K::Fly,
        K::Scorpion,
        K::Wasp,
        K::Cockroach,
        K::Dragonfly,
        K::Centipede,
    ];

    pub fn info(self) -> &'static KindInfo {
        &CATALOG[self as usize]
    }

    pub fn quantity(self) -> u8 {
        self.info().quantity
    }

    pub fn is_standard(self) -> bool {
        self.info().standard
    }

    pub fn link(self) -> Option<PieceKind> {
        self.info().link
    }

    pub fn movement(self) -> Movement {
        self.info().movement
    }

    /// Text code: upper case for white, lower case for black
    pub fn code(self, color: Color) -> char {
        let letter = self.info().letter;
        match color {
            Color::White => letter,
            Color::Black => letter.to_ascii_lowercase(),
        }
    }

    /// Parse a text code back into color and kind
    pub fn from_code(code: char) -> Option<(Color, PieceKind)> {
        let color = if code.is_ascii_uppercase() { Color::White } else { Color::Black };
        let letter = code.to_ascii_uppercase();
        CATALOG
            .iter()
            .find(|info| info.letter == letter)
            .map(|info| (color, info.kind))
    }
}

/// A physical piece: one copy of a kind for one color
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Piece {
    pub id: PieceId,
    pub color: Color,
    pub kind: PieceKind,
    /// Copy number, 0 for single-copy kinds
    pub number: u8,
    /// None while in the reserve
    pub position: Option<Position>,
    /// Waypoints of the last relocation, origin and destination included
    pub last_path: Vec<Position>,
}

impl Piece {
    pub fn new(id: PieceId, color: Color, kind: PieceKind, number: u8) -> Self {
        Self { id, color, kind, number, position: None, last_path: Vec::new() }
    }

    pub fn in_play(&self) -> bool {
        self.position.is_some()
    }

    /// Label like `wQ`, `bA2`
    pub fn label(&self) -> String {
        if self.number > 0 {
            format!("{}{}{}", self.color.letter(), self.kind.info().letter, self.number)
        } else {
            format!("{}{}", self.color.letter(), self.kind.info().letter)
        }
    }
}

/// Build the full piece set in canonical order: kind, then color, then number
pub fn create_pieces() -> Vec<Piece> {
    let mut pieces = Vec::new();
    for kind in PieceKind::ALL {
        let quantity = kind.quantity();
        for color in Color::ALL {
            for i in 1..=quantity {
                let number = if quantity == 1 { 0 } else { i };
                let id = pieces.len() as PieceId;
                pieces.push(Piece::new(id, color, kind, number));
            }
        }
    }
    pieces
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_indexed_by_kind() {
        for kind in PieceKind::ALL {
            assert_eq!(kind.info().kind, kind);
        }
    }

    #[test]
    fn test_links_are_symmetric() {
        for kind in PieceKind::ALL {
            if let Some(other) = kind.link() {
                assert_eq!(other.link(), Some(kind));
                assert_ne!(other.is_standard(), kind.is_standard());
            }
        }
        assert_eq!(PieceKind::Queen.link(), None);
    }

    #[test]
    fn test_max_z_covers_every_climber() {
        let climbs = |k: PieceKind| {
            matches!(k.movement(), Movement::Climber | Movement::Mimic | Movement::Ambush | Movement::Leaper)
        };
        // One slot per standard kind, filled by it or by its linked kind
        let per_color: u8 = PieceKind::ALL
            .iter()
            .filter(|k| k.is_standard())
            .map(|&k| {
                let own = if climbs(k) { k.quantity() } else { 0 };
                let linked = k.link().filter(|&l| climbs(l)).map_or(0, |l| l.quantity());
                own.max(linked)
            })
            .sum();
        assert_eq!(per_color, 3);
        assert_eq!(MAX_Z, 2 * per_color);
        assert!(FLIGHT_Z > MAX_Z);
    }

    #[test]
    fn test_standard_set() {
        let standard: Vec<_> = PieceKind::ALL.iter().filter(|k| k.is_standard()).collect();
        assert_eq!(standard.len(), 8);
        let per_color: u8 = PieceKind::ALL
            .iter()
            .filter(|k| k.is_standard())
            .map(|k| k.quantity())
            .sum();
        assert_eq!(per_color, 14);
    }

    #[test]
    fn test_codes_round_trip() {
        for kind in PieceKind::ALL {
            for color in Color::ALL {
                assert_eq!(PieceKind::from_code(kind.code(color)), Some((color, kind)));
            }
        }
        assert_eq!(PieceKind::from_code('x'), None);
    }

    #[test]
    fn test_order_ranks_are_distinct() {
        let mut ranks: Vec<u8> = CATALOG.iter().map(|i| i.order).collect();
        ranks.sort();
        ranks.dedup();
        assert_eq!(ranks.len(), 15);
    }

    #[test]
    fn test_create_pieces() {
        let pieces = create_pieces();
        assert_eq!(pieces.len(), 54);
        assert_eq!(pieces[0].label(), "wQ");
        assert_eq!(pieces[1].label(), "bQ");
        assert_eq!(pieces[2].label(), "wB1");
        assert_eq!(pieces[3].label(), "wB2");
        assert_eq!(pieces[4].label(), "bB1");
        for (i, p) in pieces.iter().enumerate() {
            assert_eq!(p.id as usize, i);
        }
    }
}
