//! Root-parallel search
//!
//! Each root move is an independent alpha-beta job on its own copy of the
//! board, run on a fixed pool of workers. A coordinator thread seeds the
//! bounds with the first few moves, hands the rest out as workers free up
//! and deepens iteratively, re-ranking the root moves after every pass.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use tracing::{debug, trace};

use crate::board::{Board, Move};
use crate::config::SearchConfig;
use crate::error::{HiveError, Result};
use crate::eval::Evaluator;
use crate::pieces::Color;
use crate::search::{leaf_value, sort_by_peeking, terminal_value, AlphaBeta};

// ============================================================================
// RESULTS
// ============================================================================

/// A candidate move at the root and what is known about it
#[derive(Clone, Debug)]
pub struct RootMove {
    pub mv: Move,
    /// Value at the last pass that reached this move. Moves that could not
    /// beat the best one carry a bound rather than an exact value.
    pub value: Option<i32>,
    pub iterations: u64,
    pub elapsed: Duration,
}

impl RootMove {
    fn new(mv: Move) -> Self {
        Self { mv, value: None, iterations: 0, elapsed: Duration::ZERO }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SearchProgress {
    pub depth: u32,
    pub evaluated: usize,
    pub total: usize,
    pub iterations: u64,
}

#[derive(Clone, Debug)]
pub enum SearchEvent {
    Progress(SearchProgress),
    DepthCompleted { depth: u32, best: Move, value: i32 },
}

#[derive(Clone, Debug)]
pub struct SearchOutcome {
    /// Side the search was run for
    pub color: Color,
    /// None only when the game was already over
    pub best: Option<Move>,
    /// From white's point of view
    pub value: i32,
    /// Deepest completed pass, 0 when no search was needed
    pub depth: u32,
    pub iterations: u64,
    pub elapsed: Duration,
    pub root_moves: Vec<RootMove>,
    pub cancelled: bool,
    max_evaluation: i32,
}

impl SearchOutcome {
    /// Five-level verdict for the searching side: -2 lost, -1 worse,
    /// 0 even, 1 better, 2 won
    pub fn outlook(&self) -> i8 {
        let value = self.value * self.color.sign();
        if value <= -self.max_evaluation {
            -2
        } else if value < -1 {
            -1
        } else if value <= 1 {
            0
        } else if value < self.max_evaluation {
            1
        } else {
            2
        }
    }

    /// The search proved a win or a loss
    pub fn is_decided(&self) -> bool {
        self.value.abs() >= self.max_evaluation
    }
}

// ============================================================================
// ORCHESTRATOR
// ============================================================================

pub struct SearchOrchestrator {
    pool: Arc<rayon::ThreadPool>,
    evaluator: Arc<dyn Evaluator>,
    config: SearchConfig,
}

impl SearchOrchestrator {
    pub fn new(evaluator: Arc<dyn Evaluator>, config: SearchConfig) -> Result<Self> {
        config.validate()?;
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.workers)
            .thread_name(|i| format!("hive-search-{}", i))
            .build()
            .map_err(|e| HiveError::Config(format!("cannot start search workers: {}", e)))?;
        Ok(Self { pool: Arc::new(pool), evaluator, config })
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Search `board` in the background. The board is copied, so the
    /// caller may keep playing on its own.
    pub fn start(&self, board: &Board) -> SearchHandle {
        let (events, receiver) = mpsc::channel();
        let stop = Arc::new(AtomicBool::new(false));
        let coordinator = Coordinator {
            board: board.clone(),
            pool: Arc::clone(&self.pool),
            evaluator: Arc::clone(&self.evaluator),
            config: self.config.clone(),
            stop: Arc::clone(&stop),
            events,
            iterations: 0,
        };
        let thread = std::thread::Builder::new()
            .name("hive-search".to_string())
            .spawn(move || coordinator.run())
            .expect("failed to spawn search coordinator");
        SearchHandle { events: receiver, stop, thread: Some(thread) }
    }

    /// Search to completion on the calling thread
    pub fn search(&self, board: &Board) -> SearchOutcome {
        self.start(board).wait()
    }
}

/// A running search. Dropping it cancels the search.
pub struct SearchHandle {
    events: Receiver<SearchEvent>,
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<SearchOutcome>>,
}

impl SearchHandle {
    /// Next pending event, without blocking
    pub fn poll(&self) -> Option<SearchEvent> {
        self.events.try_recv().ok()
    }

    /// Next event, blocking up to `timeout`
    pub fn poll_timeout(&self, timeout: Duration) -> Option<SearchEvent> {
        self.events.recv_timeout(timeout).ok()
    }

    pub fn is_finished(&self) -> bool {
        self.thread.as_ref().map_or(true, |t| t.is_finished())
    }

    /// Abandon the search. The outcome keeps the last completed pass.
    pub fn cancel(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }

    /// Discard events until the search ends, returning how many were
    /// dropped. Keeps the queue from growing while nobody polls.
    pub fn drain(&self) -> usize {
        self.events.iter().count()
    }

    pub fn wait(mut self) -> SearchOutcome {
        self.drain();
        let thread = self.thread.take().expect("search already joined");
        thread.join().expect("search coordinator panicked")
    }
}

impl Drop for SearchHandle {
    fn drop(&mut self) {
        if let Some(thread) = self.thread.take() {
            self.cancel();
            let _ = thread.join();
        }
    }
}

// ============================================================================
// COORDINATOR
// ============================================================================

enum WorkerMessage {
    Progress { index: usize, iterations: u64 },
    Done { index: usize, value: i32, iterations: u64, elapsed: Duration },
}

struct Coordinator {
    board: Board,
    pool: Arc<rayon::ThreadPool>,
    evaluator: Arc<dyn Evaluator>,
    config: SearchConfig,
    stop: Arc<AtomicBool>,
    events: Sender<SearchEvent>,
    iterations: u64,
}

/// Outcome of one pass over the root moves
struct Pass {
    best: Option<(usize, i32)>,
    forced: bool,
}

impl Coordinator {
    fn run(mut self) -> SearchOutcome {
        let started = Instant::now();
        let color = self.board.color_to_move();
        let max = self.config.max_evaluation;
        let moves = self.board.legal_moves();

        let mut outcome = SearchOutcome {
            color,
            best: None,
            value: terminal_value(&self.board, max).unwrap_or(0),
            depth: 0,
            iterations: 0,
            elapsed: Duration::ZERO,
            root_moves: Vec::new(),
            cancelled: false,
            max_evaluation: max,
        };

        if moves.len() == 1 {
            let mv = moves[0].clone();
            self.board.play(&mv);
            outcome.value = leaf_value(&self.board, self.evaluator.as_ref(), max);
            self.board.play_back(&mv);
            debug!(%color, "single legal move, no search");
            outcome.best = Some(mv.clone());
            outcome.root_moves = vec![RootMove::new(mv)];
            outcome.elapsed = started.elapsed();
            return outcome;
        }
        if moves.is_empty() {
            outcome.elapsed = started.elapsed();
            return outcome;
        }

        let ordered = sort_by_peeking(&mut self.board, self.evaluator.as_ref(), moves, max);
        let mut root: Vec<RootMove> = ordered.into_iter().map(RootMove::new).collect();

        for depth in self.config.initial_depth..=self.config.max_depth {
            debug!(depth, moves = root.len(), "search pass started");
            let pass = self.run_pass(depth, &mut root);
            if self.stop.load(Ordering::Relaxed) && !pass.forced {
                debug!(depth, "search cancelled");
                outcome.cancelled = true;
                break;
            }
            let Some((index, value)) = pass.best else { break };
            let best = root[index].mv.clone();
            outcome.best = Some(best.clone());
            outcome.value = value;
            outcome.depth = depth;
            let _ = self.events.send(SearchEvent::DepthCompleted { depth, best, value });
            debug!(depth, value, "search pass completed");

            if pass.forced || value.abs() >= max {
                debug!(depth, value, "forced result");
                break;
            }
            rank(&mut root, color);
        }

        // A cancelled first pass still leaves a playable move
        if outcome.best.is_none() {
            outcome.best = root.first().map(|r| r.mv.clone());
        }
        outcome.iterations = self.iterations;
        outcome.elapsed = started.elapsed();
        outcome.root_moves = root;
        outcome
    }

    fn run_pass(&mut self, depth: u32, root: &mut [RootMove]) -> Pass {
        let max = self.config.max_evaluation;
        let maximizing = self.board.color_to_move() == Color::White;
        let total = root.len();
        let (tx, rx) = mpsc::channel();
        let mut alpha = -max;
        let mut beta = max;
        let mut best: Option<(usize, i32)> = None;
        let mut forced = false;
        let mut running = vec![0u64; total];
        let mut windows = vec![(-max, max); total];
        let mut evaluated = 0;
        let mut next = 0;
        let mut in_flight = 0;

        for r in root.iter_mut() {
            r.value = None;
        }

        let seeds = self.config.seed_moves.clamp(1, self.config.workers).min(total);
        while next < seeds {
            windows[next] = (alpha, beta);
            self.dispatch(next, &root[next].mv, depth, alpha, beta, &tx);
            next += 1;
            in_flight += 1;
        }

        while in_flight > 0 {
            let Ok(message) = rx.recv() else { break };
            match message {
                WorkerMessage::Progress { index, iterations } => {
                    running[index] = iterations;
                    self.report(depth, evaluated, total, running.iter().sum());
                }
                WorkerMessage::Done { index, value, iterations, elapsed } => {
                    in_flight -= 1;
                    evaluated += 1;
                    running[index] = iterations;
                    root[index].iterations = iterations;
                    root[index].elapsed = elapsed;
                    if self.stop.load(Ordering::Relaxed) {
                        continue;
                    }
                    trace!(index, value, iterations, "root move searched");
                    root[index].value = Some(value);

                    // Equal values go to the earlier move when it was searched exactly
                    let (lo, hi) = windows[index];
                    let exact = (value > lo && value < hi) || value.abs() >= max;
                    let better = best.map_or(true, |(i, b)| {
                        let improves = if maximizing { value > b } else { value < b };
                        improves || (value == b && index < i && exact)
                    });
                    if better {
                        best = Some((index, value));
                        if maximizing {
                            alpha = alpha.max(value);
                        } else {
                            beta = beta.min(value);
                        }
                    }
                    if alpha >= beta {
                        forced = true;
                        self.stop.store(true, Ordering::Relaxed);
                        continue;
                    }
                    self.report(depth, evaluated, total, running.iter().sum());

                    // Seeds run first; the rest reuse their bounds
                    if evaluated >= seeds {
                        while next < total && in_flight < self.config.workers {
                            windows[next] = (alpha, beta);
                            self.dispatch(next, &root[next].mv, depth, alpha, beta, &tx);
                            next += 1;
                            in_flight += 1;
                        }
                    }
                }
            }
        }
        self.iterations += running.iter().sum::<u64>();
        Pass { best, forced }
    }

    fn report(&self, depth: u32, evaluated: usize, total: usize, iterations: u64) {
        let progress = SearchProgress { depth, evaluated, total, iterations: self.iterations + iterations };
        let _ = self.events.send(SearchEvent::Progress(progress));
    }

    fn dispatch(
        &self,
        index: usize,
        mv: &Move,
        depth: u32,
        alpha: i32,
        beta: i32,
        tx: &Sender<WorkerMessage>,
    ) {
        let board = self.board.clone();
        let mv = mv.clone();
        let evaluator = Arc::clone(&self.evaluator);
        let config = self.config.clone();
        let stop = Arc::clone(&self.stop);
        let tx = tx.clone();
        self.pool.spawn(move || {
            let started = Instant::now();
            let progress_tx = tx.clone();
            let mut search = AlphaBeta::new(board, evaluator.as_ref(), &config)
                .with_stop(&stop)
                .with_progress(move |iterations| {
                    let _ = progress_tx.send(WorkerMessage::Progress { index, iterations });
                });
            let value = search.search_move(&mv, depth, alpha, beta);
            let iterations = search.iterations();
            let _ = tx.send(WorkerMessage::Done { index, value, iterations, elapsed: started.elapsed() });
        });
    }
}

/// Best moves of the last pass first; unsearched moves keep their order
fn rank(root: &mut [RootMove], color: Color) {
    let sign = color.sign();
    root.sort_by_key(|r| match r.value {
        Some(v) => (0, -(v * sign)),
        None => (1, 0),
    });
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

    fn orchestrator(depth: u32, workers: usize) -> SearchOrchestrator {
        let config = SearchConfig::default().with_depth(depth).with_workers(workers);
        SearchOrchestrator::new(Arc::new(QueenEvaluator::default()), config).unwrap()
    }

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
    fn test_rejects_bad_config() {
        let config = SearchConfig::default().with_workers(0);
        assert!(SearchOrchestrator::new(Arc::new(QueenEvaluator::default()), config).is_err());
    }

    #[test]
    fn test_single_move_is_returned_without_search() {
        // The pinned black queen is the only black piece and every free
        // cell beside it touches white, so black must pass
        let board = Board::from_layout(
            RuleSet::Standard,
            4,
            &[
                (B, K::Queen, h(0, 0)),
                (W, K::Queen, h(-2, 0)),
                (W, K::Ant, h(2, 0)),
            ],
        )
        .unwrap();
        let outcome = orchestrator(3, 2).search(&board);
        assert_eq!(outcome.best, Some(Move::Pass));
        assert_eq!(outcome.depth, 0);
        assert_eq!(outcome.iterations, 0);
    }

    #[test]
    fn test_finds_forced_win() {
        let outcome = orchestrator(3, 3).search(&mate_in_one());
        assert_eq!(outcome.best.as_ref().unwrap().destination().unwrap().hex, h(1, 1));
        assert!(outcome.is_decided());
        assert_eq!(outcome.outlook(), 2);
        assert_eq!(outcome.depth, 2);
    }

    #[test]
    fn test_game_over_has_no_move() {
        let mut board = mate_in_one();
        let mv = board.find_move(board.top_at(h(-4, 0)).unwrap().id, h(1, 1)).unwrap();
        board.play(&mv);
        let outcome = orchestrator(3, 2).search(&board);
        assert!(outcome.best.is_none());
        assert_eq!(outcome.value, SearchConfig::default().max_evaluation);
    }

    #[test]
    fn test_agrees_with_sequential_search() {
        let board = Board::from_layout(
            RuleSet::Standard,
            5,
            &[
                (W, K::Queen, h(0, 0)),
                (B, K::Queen, h(2, 0)),
                (W, K::Ant, h(-2, 0)),
                (B, K::Spider, h(4, 0)),
            ],
        )
        .unwrap();
        let config = SearchConfig::default().with_depth(2);
        let evaluator = QueenEvaluator::default();
        let expected = AlphaBeta::new(board.clone(), &evaluator, &config)
            .search(2, -config.max_evaluation, config.max_evaluation);
        let outcome = orchestrator(2, 4).search(&board);
        assert_eq!(outcome.value, expected);
        assert_eq!(outcome.depth, 2);
        assert!(!outcome.cancelled);
    }

    #[test]
    fn test_events_stream() {
        let handle = orchestrator(3, 2).start(&mate_in_one());
        let mut completed = Vec::new();
        while let Some(event) = handle.poll_timeout(Duration::from_secs(30)) {
            if let SearchEvent::DepthCompleted { depth, value, .. } = event {
                completed.push((depth, value));
            }
        }
        let outcome = handle.wait();
        assert_eq!(completed, vec![(2, outcome.value)]);
    }

    #[test]
    fn test_drain_empties_event_queue() {
        let config = SearchConfig { report_every: 1, ..SearchConfig::default().with_depth(2).with_workers(2) };
        let orchestrator = SearchOrchestrator::new(Arc::new(QueenEvaluator::default()), config).unwrap();
        let handle = orchestrator.start(&mate_in_one());
        assert!(handle.drain() > 0);
        assert!(handle.poll().is_none());
        let outcome = handle.wait();
        assert!(outcome.best.is_some());
        assert_eq!(outcome.depth, 2);
    }

    #[test]
    fn test_cancel_keeps_a_move() {
        let board = Board::from_layout(
            RuleSet::Standard,
            7,
            &[
                (W, K::Queen, h(0, 0)),
                (B, K::Queen, h(2, 0)),
                (W, K::Ant, h(-2, 0)),
                (B, K::Ant, h(4, 0)),
                (W, K::Beetle, h(-1, -1)),
                (B, K::Beetle, h(3, 1)),
            ],
        )
        .unwrap();
        let handle = orchestrator(5, 2).start(&board);
        handle.cancel();
        let outcome = handle.wait();
        assert!(outcome.best.is_some());
        assert!(outcome.cancelled || outcome.depth >= 2);
    }

    #[test]
    fn test_rank_orders_by_side() {
        let mv = |i: u8| Move::Place { piece: i, to: h(0, 0) };
        let mut root: Vec<RootMove> = (0..3).map(|i| RootMove::new(mv(i))).collect();
        root[0].value = Some(5);
        root[2].value = Some(9);
        rank(&mut root, W);
        assert_eq!(root.iter().map(|r| r.mv.piece()).collect::<Vec<_>>(), vec![Some(2), Some(0), Some(1)]);
        rank(&mut root, B);
        assert_eq!(root.iter().map(|r| r.mv.piece()).collect::<Vec<_>>(), vec![Some(0), Some(2), Some(1)]);
    }
}
