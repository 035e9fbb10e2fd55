use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ForecastMode {
    #[default]
    Deterministic,
    MonteCarlo,
}

/// Which Monte Carlo band the ledger merges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Quantile {
    P50,
    #[default]
    P80,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MonteCarloConfig {
    #[serde(default = "default_paths")]
    pub paths: usize,
    /// `None` seeds from OS entropy; a ledger session draws one seed up front.
    #[serde(default)]
    pub seed: Option<u64>,
    /// Gap standard deviation as a fraction of the average gap.
    #[serde(default = "default_gap_cv")]
    pub gap_cv: f64,
    /// Relative noise applied to the median when no log-normal fit exists.
    #[serde(default = "default_amount_cv")]
    pub amount_cv: f64,
}

fn default_paths() -> usize {
    500
}

fn default_gap_cv() -> f64 {
    0.35
}

fn default_amount_cv() -> f64 {
    0.1
}

impl Default for MonteCarloConfig {
    fn default() -> Self {
        Self {
            paths: default_paths(),
            seed: None,
            gap_cv: default_gap_cv(),
            amount_cv: default_amount_cv(),
        }
    }
}

/// Everything a forecast or projection call reads from the environment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProjectionConfig {
    #[serde(default)]
    pub forecast_mode: ForecastMode,
    #[serde(default)]
    pub quantile: Quantile,
    #[serde(default = "default_initial_months")]
    pub initial_months: i32,
    #[serde(default = "default_extension_months")]
    pub extension_months: i32,
    #[serde(default = "default_trigger_days")]
    pub trigger_days: i64,
    #[serde(default)]
    pub monte_carlo: MonteCarloConfig,
}

fn default_initial_months() -> i32 {
    18
}

fn default_extension_months() -> i32 {
    6
}

fn default_trigger_days() -> i64 {
    14
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            forecast_mode: ForecastMode::default(),
            quantile: Quantile::default(),
            initial_months: default_initial_months(),
            extension_months: default_extension_months(),
            trigger_days: default_trigger_days(),
            monte_carlo: MonteCarloConfig::default(),
        }
    }
}

impl ProjectionConfig {
    pub fn with_mode(mut self, mode: ForecastMode) -> Self {
        self.forecast_mode = mode;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.monte_carlo.seed = Some(seed);
        self
    }
}
