//! Rule set selection and board layouts

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

use crate::board::Board;
use crate::error::HiveError;
use crate::hex::Hex;
use crate::pieces::PieceKind;

/// Which piece kinds are in the game
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleSet {
    /// Queen, beetle, grasshopper, spider, ant, ladybug, mosquito, pill bug
    #[default]
    Standard,
    /// Standard kinds plus their linked alternatives
    Extended,
}

impl RuleSet {
    pub fn is_standard(self) -> bool {
        self == RuleSet::Standard
    }

    /// Kind may appear at all under this rule set
    pub fn allows(self, kind: PieceKind) -> bool {
        !self.is_standard() || kind.is_standard()
    }
}

impl FromStr for RuleSet {
    type Err = HiveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "standard" | "std" => Ok(RuleSet::Standard),
            "extended" | "ext" => Ok(RuleSet::Extended),
            other => Err(HiveError::Config(format!("unknown rule set '{}'", other))),
        }
    }
}

impl std::fmt::Display for RuleSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RuleSet::Standard => write!(f, "standard"),
            RuleSet::Extended => write!(f, "extended"),
        }
    }
}

/// One stacked piece of a layout, named by its text code (`Q`, `a`, ...)
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutPiece {
    pub code: char,
    pub x: i16,
    pub y: i16,
}

/// A position described piece by piece, bottom of each stack first
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layout {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub ruleset: RuleSet,
    /// Next round number; odd rounds are white's
    pub round: u32,
    pub pieces: Vec<LayoutPiece>,
}

impl Layout {
    /// Convert to a board
    pub fn to_board(&self) -> crate::error::Result<Board> {
        let mut placements = Vec::with_capacity(self.pieces.len());
        for p in &self.pieces {
            let (color, kind) = PieceKind::from_code(p.code)
                .ok_or_else(|| HiveError::UnknownPiece(p.code.to_string()))?;
            placements.push((color, kind, Hex::new(p.x, p.y)));
        }
        Board::from_layout(self.ruleset, self.round, &placements)
    }

    /// Capture a board's pieces (reserve and last-moved markers are not kept)
    pub fn from_board(board: &Board) -> Self {
        let mut in_play: Vec<_> = board
            .pieces()
            .iter()
            .filter_map(|p| p.position.map(|pos| (pos, p)))
            .collect();
        in_play.sort_by_key(|(pos, _)| (pos.z, pos.hex.y, pos.hex.x));
        Self {
            name: None,
            ruleset: board.ruleset(),
            round: board.round(),
            pieces: in_play
                .into_iter()
                .map(|(pos, p)| LayoutPiece { code: p.kind.code(p.color), x: pos.hex.x, y: pos.hex.y })
                .collect(),
        }
    }

    /// Load from JSON file
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let layout: Layout = serde_json::from_str(&content)?;
        Ok(layout)
    }

    /// Save to JSON file
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allows() {
        assert!(RuleSet::Standard.allows(PieceKind::PillBug));
        assert!(!RuleSet::Standard.allows(PieceKind::Wasp));
        assert!(RuleSet::Extended.allows(PieceKind::Wasp));
    }

    #[test]
    fn test_parse() {
        assert_eq!("Extended".parse::<RuleSet>().unwrap(), RuleSet::Extended);
        assert_eq!("std".parse::<RuleSet>().unwrap(), RuleSet::Standard);
        assert!("chess".parse::<RuleSet>().is_err());
    }

    #[test]
    fn test_layout_json() {
        let json = r#"{
            "ruleset": "standard",
            "round": 5,
            "pieces": [
                {"code": "Q", "x": 0, "y": 0},
                {"code": "q", "x": 2, "y": 0},
                {"code": "B", "x": -2, "y": 0},
                {"code": "b", "x": 4, "y": 0}
            ]
        }"#;
        let layout: Layout = serde_json::from_str(json).unwrap();
        let board = layout.to_board().unwrap();
        assert_eq!(board.round(), 5);
        assert_eq!(board.pieces().iter().filter(|p| p.in_play()).count(), 4);

        let back = Layout::from_board(&board);
        assert_eq!(back.pieces.len(), 4);
        assert_eq!(back.to_board().unwrap().canonical_string(), board.canonical_string());
    }

    #[test]
    fn test_layout_unknown_code() {
        let layout = Layout {
            name: None,
            ruleset: RuleSet::Standard,
            round: 3,
            pieces: vec![LayoutPiece { code: 'z', x: 0, y: 0 }],
        };
        assert!(matches!(layout.to_board(), Err(HiveError::UnknownPiece(_))));
    }
}
