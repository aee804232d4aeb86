//! Sequential alpha-beta search
//!
//! Values are always from white's point of view: white maximizes, black
//! minimizes. A surrounded queen scores the full `max_evaluation`, heuristic
//! scores stay strictly inside it.

use std::sync::atomic::{AtomicBool, Ordering};

use rustc_hash::FxHashMap;

use crate::board::{Board, Move};
use crate::config::SearchConfig;
use crate::eval::Evaluator;
use crate::pieces::Color;

// ============================================================================
// LEAF VALUES
// ============================================================================

/// Decided positions: 0 when both queens fall, otherwise the full extreme
/// for the side that surrounded the other's queen
pub fn terminal_value(board: &Board, max_evaluation: i32) -> Option<i32> {
    match (
        board.is_queen_surrounded(Color::White),
        board.is_queen_surrounded(Color::Black),
    ) {
        (true, true) => Some(0),
        (true, false) => Some(-max_evaluation),
        (false, true) => Some(max_evaluation),
        (false, false) => None,
    }
}

/// Keep a heuristic score from being mistaken for a forced result
pub fn clamp_evaluation(value: i32, max_evaluation: i32) -> i32 {
    value.clamp(-max_evaluation + 1, max_evaluation - 1)
}

pub fn leaf_value(board: &Board, evaluator: &dyn Evaluator, max_evaluation: i32) -> i32 {
    terminal_value(board, max_evaluation)
        .unwrap_or_else(|| clamp_evaluation(evaluator.evaluate(board), max_evaluation))
}

/// Order moves by the value of the position each one leads to, best first
/// for the side to move. Ties keep their incoming order.
pub fn sort_by_peeking(
    board: &mut Board,
    evaluator: &dyn Evaluator,
    moves: Vec<Move>,
    max_evaluation: i32,
) -> Vec<Move> {
    let maximizing = board.color_to_move() == Color::White;
    let mut scored: Vec<(i32, Move)> = moves
        .into_iter()
        .map(|mv| {
            board.play(&mv);
            let value = leaf_value(board, evaluator, max_evaluation);
            board.play_back(&mv);
            (value, mv)
        })
        .collect();
    if maximizing {
        scored.sort_by(|a, b| b.0.cmp(&a.0));
    } else {
        scored.sort_by(|a, b| a.0.cmp(&b.0));
    }
    scored.into_iter().map(|(_, mv)| mv).collect()
}

// ============================================================================
// ALPHA-BETA
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Bound {
    Exact,
    /// True value is at least the stored one
    Lower,
    /// True value is at most the stored one
    Upper,
}

#[derive(Clone, Copy, Debug)]
struct MemoEntry {
    value: i32,
    bound: Bound,
}

impl MemoEntry {
    fn usable(&self, alpha: i32, beta: i32) -> bool {
        match self.bound {
            Bound::Exact => true,
            Bound::Lower => self.value >= beta,
            Bound::Upper => self.value <= alpha,
        }
    }
}

/// One search job on a private copy of the board. The memo only lives as
/// long as the job and is cleared whenever the horizon changes.
pub struct AlphaBeta<'a> {
    board: Board,
    evaluator: &'a dyn Evaluator,
    config: &'a SearchConfig,
    memo: FxHashMap<(u32, String), MemoEntry>,
    memo_horizon: u32,
    iterations: u64,
    stop: Option<&'a AtomicBool>,
    progress: Option<Box<dyn FnMut(u64) + Send + 'a>>,
}

impl<'a> AlphaBeta<'a> {
    pub fn new(board: Board, evaluator: &'a dyn Evaluator, config: &'a SearchConfig) -> Self {
        Self {
            board,
            evaluator,
            config,
            memo: FxHashMap::default(),
            memo_horizon: 0,
            iterations: 0,
            stop: None,
            progress: None,
        }
    }

    /// Abandon the search as soon as `stop` is raised. Values returned after
    /// that are meaningless.
    pub fn with_stop(mut self, stop: &'a AtomicBool) -> Self {
        self.stop = Some(stop);
        self
    }

    /// Called with the running iteration count every `report_every` nodes
    pub fn with_progress<F: FnMut(u64) + Send + 'a>(mut self, progress: F) -> Self {
        self.progress = Some(Box::new(progress));
        self
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn iterations(&self) -> u64 {
        self.iterations
    }

    pub fn is_stopped(&self) -> bool {
        self.stop.is_some_and(|s| s.load(Ordering::Relaxed))
    }

    /// Value of playing `mv` from the current position, looking `max_depth`
    /// plies deep in total (the move itself included)
    pub fn search_move(&mut self, mv: &Move, max_depth: u32, alpha: i32, beta: i32) -> i32 {
        self.reset_memo(max_depth);
        self.board.play(mv);
        let value = self.node(1, max_depth, alpha, beta);
        self.board.play_back(mv);
        value
    }

    /// Value of the current position searched `max_depth` plies deep
    pub fn search(&mut self, max_depth: u32, alpha: i32, beta: i32) -> i32 {
        self.reset_memo(max_depth);
        self.node(0, max_depth, alpha, beta)
    }

    /// Best root move and its value, None when the game is already over
    pub fn best_move(&mut self, max_depth: u32) -> Option<(Move, i32)> {
        let max = self.config.max_evaluation;
        let maximizing = self.board.color_to_move() == Color::White;
        let mut alpha = -max;
        let mut beta = max;
        let mut best: Option<(Move, i32)> = None;
        for mv in self.ordered_moves(0, max_depth) {
            let value = self.search_move(&mv, max_depth, alpha, beta);
            let better = best.as_ref().map_or(true, |(_, b)| {
                if maximizing {
                    value > *b
                } else {
                    value < *b
                }
            });
            if better {
                if maximizing {
                    alpha = alpha.max(value);
                } else {
                    beta = beta.min(value);
                }
                best = Some((mv, value));
            }
            if alpha >= beta {
                break;
            }
        }
        best
    }

    fn reset_memo(&mut self, max_depth: u32) {
        if self.memo_horizon != max_depth {
            self.memo.clear();
            self.memo_horizon = max_depth;
        }
    }

    fn tick(&mut self) {
        self.iterations += 1;
        if self.iterations % self.config.report_every.max(1) == 0 {
            let iterations = self.iterations;
            if let Some(progress) = self.progress.as_mut() {
                progress(iterations);
            }
        }
    }

    /// Legal moves (or a lone pass) ordered for pruning. The first plies
    /// peek at each child's evaluation, deeper ones use the cheap ordering.
    fn ordered_moves(&mut self, depth: u32, max_depth: u32) -> Vec<Move> {
        let moves = self.board.legal_moves();
        if moves.len() < 2 {
            return moves;
        }
        if depth <= self.config.peek_depth && depth + 2 <= max_depth {
            sort_by_peeking(&mut self.board, self.evaluator, moves, self.config.max_evaluation)
        } else {
            self.evaluator.sort_moves(&self.board, moves)
        }
    }

    fn node(&mut self, depth: u32, max_depth: u32, mut alpha: i32, mut beta: i32) -> i32 {
        self.tick();
        if self.is_stopped() {
            return 0;
        }
        let max = self.config.max_evaluation;
        if let Some(value) = terminal_value(&self.board, max) {
            return value;
        }
        if depth >= max_depth {
            return clamp_evaluation(self.evaluator.evaluate(&self.board), max);
        }

        let key = (depth, self.board.canonical_string());
        if let Some(entry) = self.memo.get(&key) {
            if entry.usable(alpha, beta) {
                return entry.value;
            }
        }

        let (alpha_in, beta_in) = (alpha, beta);
        let maximizing = self.board.color_to_move() == Color::White;
        let mut best = if maximizing { i32::MIN } else { i32::MAX };
        for mv in self.ordered_moves(depth, max_depth) {
            self.board.play(&mv);
            let value = self.node(depth + 1, max_depth, alpha, beta);
            self.board.play_back(&mv);
            if maximizing {
                if value > best {
                    best = value;
                    alpha = alpha.max(value);
                }
                if best >= beta {
                    break;
                }
            } else {
                if value < best {
                    best = value;
                    beta = beta.min(value);
                }
                if best <= alpha {
                    break;
                }
            }
        }

        if self.is_stopped() {
            return 0;
        }
        let bound = if best <= alpha_in {
            Bound::Upper
        } else if best >= beta_in {
            Bound::Lower
        } else {
            Bound::Exact
        };
        self.memo.insert(key, MemoEntry { value: best, bound });
        best
    }
}

// ============================================================================
// REFERENCE SEARCHES
// ============================================================================

/// Unpruned minimax to `depth` plies, same leaf rules as [`AlphaBeta`]
pub fn minimax(board: &mut Board, evaluator: &dyn Evaluator, depth: u32, max_evaluation: i32) -> i32 {
    if let Some(value) = terminal_value(board, max_evaluation) {
        return value;
    }
    if depth == 0 {
        return clamp_evaluation(evaluator.evaluate(board), max_evaluation);
    }
    let maximizing = board.color_to_move() == Color::White;
    let values = board.legal_moves().into_iter().map(|mv| {
        board.play(&mv);
        let value = minimax(board, evaluator, depth - 1, max_evaluation);
        board.play_back(&mv);
        value
    });
    let values: Vec<i32> = values.collect();
    if maximizing {
        values.into_iter().max().unwrap_or(0)
    } else {
        values.into_iter().min().unwrap_or(0)
    }
}

/// Number of move sequences `depth` plies long. Passes count as moves,
/// finished games end a sequence early and contribute nothing.
pub fn perft(board: &mut Board, depth: u32) -> u64 {
    if depth == 0 {
        return 1;
    }
    let moves = board.legal_moves();
    if depth == 1 {
        return moves.len() as u64;
    }
    moves
        .iter()
        .map(|mv| {
            board.play(mv);
            let count = perft(board, depth - 1);
            board.play_back(mv);
            count
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::QueenEvaluator;
    use crate::hex::Hex;
    use crate::pieces::PieceKind as K;
    use crate::ruleset::RuleSet;
    use Color::{Black as B, White as W};

    fn h(x: i16, y: i16) -> Hex {
        Hex::new(x, y)
    }

    /// White can close the black queen's last gap with the ant
    fn mate_in_one() -> Board {
        Board::from_layout(
            RuleSet::Standard,
            11,
            &[
                (B, K::Queen, h(0, 0)),
                (W, K::Queen, h(-2, 0)),
                (W, K::Beetle, h(-1, -1)),
                (W, K::Grasshopper, h(1, -1)),
                (W, K::Spider, h(2, 0)),
                (B, K::Beetle, h(-1, 1)),
                (W, K::Ant, h(-4, 0)),
                (B, K::Ant, h(3, -1)),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_clamp() {
        assert_eq!(clamp_evaluation(5_000_000, 1000), 999);
        assert_eq!(clamp_evaluation(-5_000_000, 1000), -999);
        assert_eq!(clamp_evaluation(12, 1000), 12);
    }

    #[test]
    fn test_terminal_values() {
        let board = mate_in_one();
        assert_eq!(terminal_value(&board, 100), None);
        let mut won = board.clone();
        let mv = won
            .legal_moves()
            .into_iter()
            .find(|m| m.destination().is_some_and(|d| d.hex == h(1, 1)))
            .unwrap();
        won.play(&mv);
        assert_eq!(terminal_value(&won, 100), Some(100));
    }

    #[test]
    fn test_finds_forced_win() {
        let evaluator = QueenEvaluator::default();
        let config = SearchConfig::default();
        let mut search = AlphaBeta::new(mate_in_one(), &evaluator, &config);
        let (mv, value) = search.best_move(2).unwrap();
        assert_eq!(value, config.max_evaluation);
        assert_eq!(mv.destination().unwrap().hex, h(1, 1));
    }

    #[test]
    fn test_matches_minimax() {
        let evaluator = QueenEvaluator::default();
        let config = SearchConfig::default();
        let board = mate_in_one();
        for depth in 1..=2 {
            let expected = minimax(&mut board.clone(), &evaluator, depth, config.max_evaluation);
            let mut search = AlphaBeta::new(board.clone(), &evaluator, &config);
            let max = config.max_evaluation;
            assert_eq!(search.search(depth, -max, max), expected, "depth {}", depth);
        }
    }

    #[test]
    fn test_board_restored_after_search() {
        let evaluator = QueenEvaluator::default();
        let config = SearchConfig::default();
        let board = mate_in_one();
        let before = board.canonical_string();
        let mut search = AlphaBeta::new(board, &evaluator, &config);
        search.search(3, -config.max_evaluation, config.max_evaluation);
        assert_eq!(search.board().canonical_string(), before);
        assert!(search.iterations() > 1);
    }

    #[test]
    fn test_stop_flag_aborts() {
        let evaluator = QueenEvaluator::default();
        let config = SearchConfig::default();
        let stop = AtomicBool::new(true);
        let mut search = AlphaBeta::new(mate_in_one(), &evaluator, &config).with_stop(&stop);
        assert_eq!(search.search(4, -config.max_evaluation, config.max_evaluation), 0);
        assert_eq!(search.iterations(), 1);
    }

    #[test]
    fn test_progress_reports() {
        let evaluator = QueenEvaluator::default();
        let config = SearchConfig { report_every: 10, ..SearchConfig::default() };
        let mut reports = Vec::new();
        let mut search =
            AlphaBeta::new(mate_in_one(), &evaluator, &config).with_progress(|n| reports.push(n));
        search.search(2, -config.max_evaluation, config.max_evaluation);
        let total = search.iterations();
        drop(search);
        assert_eq!(reports.len() as u64, total / 10);
        assert!(reports.iter().all(|n| n % 10 == 0));
    }

    #[test]
    fn test_perft_opening() {
        let mut board = Board::new(RuleSet::Standard);
        // Any kind on the origin, then any kind beside it
        let first = perft(&mut board, 1);
        assert_eq!(first, 8);
        assert_eq!(perft(&mut board, 2), first * first * 6);
    }
}
