//! Perft command - count move sequences for move-generator regressions

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Args;

use hive_core::notation;
use hive_core::{perft, Board, Layout, RuleSet};

#[derive(Args)]
pub struct PerftArgs {
    /// Plies to count
    #[arg(long, default_value = "3")]
    pub depth: u32,

    /// Rule set for the empty starting board
    #[arg(long, default_value = "standard")]
    pub ruleset: RuleSet,

    /// Starting position JSON file (overrides --ruleset)
    #[arg(long, value_name = "FILE")]
    pub layout: Option<PathBuf>,

    /// Also print the count below each root move
    #[arg(long)]
    pub divide: bool,
}

pub fn run(args: PerftArgs) -> Result<()> {
    let mut board = match &args.layout {
        Some(path) => Layout::load(path)
            .with_context(|| format!("Failed to load layout: {}", path.display()))?
            .to_board()
            .with_context(|| format!("Invalid layout: {}", path.display()))?,
        None => Board::new(args.ruleset),
    };

    tracing::info!("Perft from {} to depth {}", board, args.depth);

    for depth in 1..=args.depth {
        let started = Instant::now();
        let count = perft(&mut board, depth);
        println!("depth {:>2}: {:>12} ({:.2?})", depth, count, started.elapsed());
    }

    if args.divide && args.depth > 0 {
        for (text, count) in divide(&mut board, args.depth) {
            println!("{:<16} {}", text, count);
        }
    }
    Ok(())
}

/// Per-root-move counts, in legal-move order
fn divide(board: &mut Board, depth: u32) -> Vec<(String, u64)> {
    board
        .legal_moves()
        .into_iter()
        .map(|mv| {
            let text = notation::describe(board, &mv).map_or_else(|| "pass".to_string(), |n| n.to_string());
            board.play(&mv);
            let count = perft(board, depth - 1);
            board.play_back(&mv);
            (text, count)
        })
        .collect()
}
