//! Search and engine configuration

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{HiveError, Result};
use crate::eval::Heuristics;
use crate::ruleset::RuleSet;

/// Win/loss extreme. Heuristic scores are clamped strictly inside it.
pub const MAX_EVALUATION: i32 = 999_999;

/// Tunables of the alpha-beta search and its root orchestrator
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Deepest iterative-deepening pass
    pub max_depth: u32,
    /// Depth of the first, move-ranking pass
    pub initial_depth: u32,
    /// Plies up to which children are ordered by their static evaluation
    pub peek_depth: u32,
    /// Fixed size of the worker pool
    pub workers: usize,
    /// Root moves searched before fanning out
    pub seed_moves: usize,
    /// Iterations between progress reports
    pub report_every: u64,
    pub max_evaluation: i32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_depth: 5,
            initial_depth: 2,
            peek_depth: 3,
            workers: 7,
            seed_moves: 4,
            report_every: 1000,
            max_evaluation: MAX_EVALUATION,
        }
    }
}

impl SearchConfig {
    pub fn with_depth(mut self, max_depth: u32) -> Self {
        self.max_depth = max_depth;
        self.initial_depth = self.initial_depth.min(max_depth);
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_depth == 0 || self.initial_depth == 0 {
            return Err(HiveError::Config("search depths must be at least 1".to_string()));
        }
        if self.initial_depth > self.max_depth {
            return Err(HiveError::Config(format!(
                "initial depth {} exceeds max depth {}",
                self.initial_depth, self.max_depth
            )));
        }
        if self.workers == 0 {
            return Err(HiveError::Config("at least one worker is required".to_string()));
        }
        if self.report_every == 0 {
            return Err(HiveError::Config("report interval must be positive".to_string()));
        }
        if self.max_evaluation <= 1 {
            return Err(HiveError::Config(format!(
                "max evaluation {} leaves no room for heuristic scores",
                self.max_evaluation
            )));
        }
        Ok(())
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: SearchConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

/// Everything a front end needs to set up a game against the engine
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub ruleset: RuleSet,
    pub search: SearchConfig,
    pub heuristics: Heuristics,
}

impl EngineConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: EngineConfig = serde_json::from_str(&content)?;
        config.search.validate()?;
        Ok(config)
    }

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
    fn test_defaults_are_valid() {
        let config = SearchConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_depth, 5);
        assert_eq!(config.workers, 7);
    }

    #[test]
    fn test_validate_rejects() {
        let bad = SearchConfig { initial_depth: 6, ..SearchConfig::default() };
        assert!(matches!(bad.validate(), Err(HiveError::Config(_))));
        let bad = SearchConfig::default().with_workers(0);
        assert!(bad.validate().is_err());
        let bad = SearchConfig { max_evaluation: 1, ..SearchConfig::default() };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_with_depth_keeps_initial_in_range() {
        let config = SearchConfig::default().with_depth(1);
        assert_eq!(config.initial_depth, 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: EngineConfig =
            serde_json::from_str(r#"{"ruleset": "extended", "search": {"max_depth": 3}}"#).unwrap();
        assert_eq!(config.ruleset, RuleSet::Extended);
        assert_eq!(config.search.max_depth, 3);
        assert_eq!(config.search.peek_depth, 3);
        assert_eq!(config.heuristics, Heuristics::default());
    }

    #[test]
    fn test_save_and_load() {
        let path = std::env::temp_dir().join(format!("hive-engine-{}.json", std::process::id()));
        let config = EngineConfig {
            search: SearchConfig::default().with_depth(4),
            ..EngineConfig::default()
        };
        config.save(&path).unwrap();
        let loaded = EngineConfig::load(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(loaded, config);
    }
}
