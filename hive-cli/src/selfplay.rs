//! Selfplay command - the engine plays both sides of a game
//!
//! - run(): orchestration
//! - setup(): configuration, starting position and orchestrator
//! - play_game(): random opening plies, then searched moves
//! - report(): transcript and result

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use hive_core::notation;
use hive_core::{
    Board, EngineConfig, GameResult, Layout, Move, QueenEvaluator, RuleSet, SearchEvent,
    SearchOrchestrator, SearchOutcome,
};

// ============================================================================
// COMMAND ARGUMENTS
// ============================================================================

#[derive(Args)]
pub struct SelfplayArgs {
    /// Engine configuration JSON file
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Starting position JSON file
    #[arg(long, value_name = "FILE")]
    pub layout: Option<PathBuf>,

    /// Rule set (overrides the configuration file)
    #[arg(long)]
    pub ruleset: Option<RuleSet>,

    /// Maximum search depth (overrides the configuration file)
    #[arg(long)]
    pub depth: Option<u32>,

    /// Worker threads (overrides the configuration file)
    #[arg(long)]
    pub workers: Option<usize>,

    /// Opening plies played at random for variety
    #[arg(long, default_value = "2")]
    pub random_plies: u32,

    /// Stop the game after this many rounds
    #[arg(long, default_value = "80")]
    pub max_rounds: u32,

    /// Output the game as JSON
    #[arg(long)]
    pub json: bool,
}

/// How a selfplay game ended
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
enum Ending {
    WhiteWins,
    BlackWins,
    Draw,
    Repetition,
    RoundLimit,
}

#[derive(Clone, Debug, serde::Serialize)]
struct PlyRecord {
    round: u32,
    notation: String,
    value: Option<i32>,
    depth: u32,
}

#[derive(Debug, serde::Serialize)]
struct GameRecord {
    ruleset: RuleSet,
    ending: Ending,
    plies: Vec<PlyRecord>,
    final_position: String,
}

// ============================================================================
// ORCHESTRATION
// ============================================================================

pub fn run(args: SelfplayArgs, seed: Option<u64>) -> Result<()> {
    let (config, board) = setup(&args)?;
    let evaluator = Arc::new(QueenEvaluator::new(config.heuristics.clone()));
    let orchestrator = SearchOrchestrator::new(evaluator, config.search.clone())
        .context("Invalid search configuration")?;

    tracing::info!(
        "Starting selfplay: {} rules, depth={}, workers={}",
        board.ruleset(),
        config.search.max_depth,
        config.search.workers
    );

    let mut rng = create_rng(seed);
    let record = play_game(board, &orchestrator, &args, &mut rng);
    report(&record, args.json)
}

fn setup(args: &SelfplayArgs) -> Result<(EngineConfig, Board)> {
    let mut config = match &args.config {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("Failed to load config: {}", path.display()))?,
        None => EngineConfig::default(),
    };
    if let Some(ruleset) = args.ruleset {
        config.ruleset = ruleset;
    }
    if let Some(depth) = args.depth {
        config.search = config.search.with_depth(depth);
    }
    if let Some(workers) = args.workers {
        config.search = config.search.with_workers(workers);
    }

    let board = match &args.layout {
        Some(path) => {
            let layout = Layout::load(path)
                .with_context(|| format!("Failed to load layout: {}", path.display()))?;
            layout
                .to_board()
                .with_context(|| format!("Invalid layout: {}", path.display()))?
        }
        None => Board::new(config.ruleset),
    };
    Ok((config, board))
}

fn play_game(
    mut board: Board,
    orchestrator: &SearchOrchestrator,
    args: &SelfplayArgs,
    rng: &mut ChaCha8Rng,
) -> GameRecord {
    let mut plies = Vec::new();
    let mut seen: HashMap<String, u32> = HashMap::new();
    let mut ply = 0;

    let ending = loop {
        match board.game_result() {
            GameResult::WhiteWins => break Ending::WhiteWins,
            GameResult::BlackWins => break Ending::BlackWins,
            GameResult::Draw => break Ending::Draw,
            GameResult::Ongoing => {}
        }
        if board.round() > args.max_rounds * 2 {
            break Ending::RoundLimit;
        }
        let count = seen.entry(board.canonical_string()).or_insert(0);
        *count += 1;
        if *count >= 3 {
            break Ending::Repetition;
        }

        let (mv, value, depth) = if ply < args.random_plies {
            (random_move(&board, rng), None, 0)
        } else {
            let outcome = search_with_spinner(orchestrator, &board);
            let Some(mv) = outcome.best.clone() else { break Ending::Draw };
            (mv, Some(outcome.value), outcome.depth)
        };

        let text = describe(&board, &mv);
        tracing::info!("{:>3}. {} {:?}", board.round(), text, value);
        plies.push(PlyRecord { round: board.round(), notation: text, value, depth });
        board.play(&mv);
        ply += 1;
    };

    GameRecord {
        ruleset: board.ruleset(),
        ending,
        plies,
        final_position: board.canonical_string(),
    }
}

fn report(record: &GameRecord, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(record)?);
        return Ok(());
    }
    println!("=== Selfplay ({}) ===", record.ruleset);
    for p in &record.plies {
        match p.value {
            Some(v) => println!("{:>3}. {:<16} {:>8} (depth {})", p.round, p.notation, v, p.depth),
            None => println!("{:>3}. {:<16} {:>8}", p.round, p.notation, "random"),
        }
    }
    println!("Result: {:?}", record.ending);
    println!("Final position: {}", record.final_position);
    Ok(())
}

// ============================================================================
// STEPS
// ============================================================================

fn search_with_spinner(orchestrator: &SearchOrchestrator, board: &Board) -> SearchOutcome {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
        spinner.set_style(style);
    }
    spinner.enable_steady_tick(Duration::from_millis(120));

    let handle = orchestrator.start(board);
    while !handle.is_finished() {
        match handle.poll_timeout(Duration::from_millis(100)) {
            Some(SearchEvent::Progress(p)) => spinner.set_message(format!(
                "depth {}: {}/{} moves, {} positions",
                p.depth, p.evaluated, p.total, p.iterations
            )),
            Some(SearchEvent::DepthCompleted { depth, value, .. }) => {
                tracing::debug!("depth {} completed: {}", depth, value)
            }
            None => {}
        }
    }
    spinner.finish_and_clear();
    handle.wait()
}

fn random_move(board: &Board, rng: &mut ChaCha8Rng) -> Move {
    board
        .legal_moves()
        .choose(rng)
        .cloned()
        .unwrap_or(Move::Pass)
}

fn describe(board: &Board, mv: &Move) -> String {
    notation::describe(board, mv).map_or_else(|| "pass".to_string(), |n| n.to_string())
}

fn create_rng(seed: Option<u64>) -> ChaCha8Rng {
    match seed {
        Some(s) => ChaCha8Rng::seed_from_u64(s),
        None => ChaCha8Rng::from_entropy(),
    }
}
