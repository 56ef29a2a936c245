use serde::{Deserialize, Serialize};

use crate::error::SluiceError;

/// Which cost model prices the arcs of the scheduling flow network.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum CostModelKind {
    Trivial,
    Random,
    Sjf,
    Quincy,
    Whare,
    Coco,
}

impl CostModelKind {
    /// Resolves the numeric selector used by deployment configuration.
    /// Selectors outside 0..=5 are rejected.
    pub fn from_selector(value: i64) -> Result<Self, SluiceError> {
        match value {
            0 => Ok(CostModelKind::Trivial),
            1 => Ok(CostModelKind::Random),
            2 => Ok(CostModelKind::Sjf),
            3 => Ok(CostModelKind::Quincy),
            4 => Ok(CostModelKind::Whare),
            5 => Ok(CostModelKind::Coco),
            _ => Err(SluiceError::UnknownCostModel(value)),
        }
    }

    pub fn selector(self) -> i64 {
        match self {
            CostModelKind::Trivial => 0,
            CostModelKind::Random => 1,
            CostModelKind::Sjf => 2,
            CostModelKind::Quincy => 3,
            CostModelKind::Whare => 4,
            CostModelKind::Coco => 5,
        }
    }
}

impl Default for CostModelKind {
    fn default() -> Self {
        CostModelKind::Trivial
    }
}

/// External min-cost-flow solver invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolverConfig {
    /// Solver executable spawned once per scheduling round.
    pub binary: String,
    #[serde(default)]
    pub args: Vec<String>,
    /// Send only graph deltas after the first round instead of the full
    /// graph. Requires a solver that keeps state between rounds.
    #[serde(default)]
    pub incremental: bool,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            binary: "cs2".to_string(),
            args: Vec::new(),
            incremental: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulingConfig {
    #[serde(default)]
    pub cost_model: CostModelKind,
    /// Seed for cost models that randomize; fixed so a graph state always
    /// maps to the same flow problem.
    #[serde(default = "default_random_seed")]
    pub random_seed: u64,
    /// External solver; `None` selects the built-in solver.
    #[serde(default)]
    pub solver: Option<SolverConfig>,
}

fn default_random_seed() -> u64 {
    42
}

impl Default for SchedulingConfig {
    fn default() -> Self {
        Self {
            cost_model: CostModelKind::default(),
            random_seed: default_random_seed(),
            solver: None,
        }
    }
}

/// Top-level configuration aggregating all sub-configs.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SluiceConfig {
    #[serde(default)]
    pub scheduling: SchedulingConfig,
}

/// Load configuration from a TOML file.
/// Falls back to defaults if the file doesn't exist or fails to parse.
pub fn load_config(path: &str) -> SluiceConfig {
    match std::fs::read_to_string(path) {
        Ok(contents) => match toml::from_str(&contents) {
            Ok(config) => {
                tracing::info!("Loaded config from {}", path);
                config
            }
            Err(e) => {
                tracing::warn!("Failed to parse config {}: {}, using defaults", path, e);
                SluiceConfig::default()
            }
        },
        Err(_) => {
            tracing::debug!("Config file {} not found, using defaults", path);
            SluiceConfig::default()
        }
    }
}

/// Save configuration to a TOML file.
/// Creates parent directories if they don't exist.
pub fn save_config(config: &SluiceConfig, path: &str) -> Result<(), SluiceError> {
    let path = std::path::Path::new(path);

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let contents =
        toml::to_string_pretty(config).map_err(|e| SluiceError::Config(e.to_string()))?;
    std::fs::write(path, contents)?;
    tracing::info!("Config saved to {:?}", path);
    Ok(())
}
