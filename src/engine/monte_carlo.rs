//! Monte Carlo risk simulation
//!
//! Trials are produced in fixed-size chunks. Every chunk owns an RNG stream
//! derived from the run seed and the chunk index, so a run is a pure
//! function of `(parameters, seed)` whether chunks execute on one thread or
//! on the rayon pool.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::engine::cancel::RunControl;
use crate::engine::error::{require_finite, require_unit_interval, EngineError, EngineResult};
use crate::engine::record::Interval;
use crate::engine::sampler::{self, CorrelatedPairSampler, Distribution, DistributionKind};
use crate::engine::stats;

/// Upper bound on trials per run
pub const MAX_ITERATIONS: u32 = 1_000_000;

/// Trials per RNG stream / unit of parallel work
pub const CHUNK_SIZE: usize = 4096;

/// Maximum number of simulated values kept for plotting
pub const DISTRIBUTION_SAMPLE_LIMIT: usize = 1000;

/// Tail cut-off used for expected shortfall
const SHORTFALL_CONFIDENCE: f64 = 0.95;

fn default_iterations() -> u32 {
    10_000
}

fn default_confidence_levels() -> Vec<f64> {
    vec![0.90, 0.95, 0.99]
}

fn default_time_horizon() -> f64 {
    1.0
}

/// Inputs for a Monte Carlo run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonteCarloParameters {
    /// Number of trials
    #[serde(default = "default_iterations")]
    pub iterations: u32,

    /// Distribution used for the probability draw
    #[serde(default)]
    pub distribution: DistributionKind,

    pub probability_min: f64,
    pub probability_max: f64,
    pub probability_mean: f64,
    pub probability_std: f64,

    pub impact_min: f64,
    pub impact_max: f64,
    pub impact_mean: f64,
    pub impact_std: f64,

    /// Correlation between probability and impact, in [-1, 1]
    #[serde(default)]
    pub correlation_factor: f64,

    /// Percentiles to report, each in (0, 1)
    #[serde(default = "default_confidence_levels")]
    pub confidence_levels: Vec<f64>,

    /// Horizon in periods; risk scales with its square root
    #[serde(default = "default_time_horizon")]
    pub time_horizon: f64,
}

impl Default for MonteCarloParameters {
    fn default() -> Self {
        Self {
            iterations: default_iterations(),
            distribution: DistributionKind::Normal,
            probability_min: 0.0,
            probability_max: 1.0,
            probability_mean: 0.3,
            probability_std: 0.1,
            impact_min: 0.0,
            impact_max: 1_000_000.0,
            impact_mean: 100_000.0,
            impact_std: 25_000.0,
            correlation_factor: 0.0,
            confidence_levels: default_confidence_levels(),
            time_horizon: default_time_horizon(),
        }
    }
}

impl MonteCarloParameters {
    /// Check ranges and invariants before any sampling
    pub fn validate(&self) -> EngineResult<()> {
        self.probability_distribution().map(|_| ())
    }

    /// Validated parameters resolved to the probability distribution they describe
    pub fn probability_distribution(&self) -> EngineResult<Distribution> {
        if self.iterations == 0 {
            return Err(EngineError::invalid("iterations", "must be at least 1"));
        }
        if self.iterations > MAX_ITERATIONS {
            return Err(EngineError::invalid(
                "iterations",
                format!("must not exceed {}, got {}", MAX_ITERATIONS, self.iterations),
            ));
        }

        require_unit_interval("probability_min", self.probability_min)?;
        require_unit_interval("probability_max", self.probability_max)?;
        if self.probability_min > self.probability_max {
            return Err(EngineError::invalid(
                "probability_min",
                format!(
                    "probability_min ({}) is greater than probability_max ({})",
                    self.probability_min, self.probability_max
                ),
            ));
        }
        require_finite("probability_mean", self.probability_mean)?;
        require_finite("probability_std", self.probability_std)?;
        if self.probability_std < 0.0 {
            return Err(EngineError::invalid("probability_std", "must not be negative"));
        }

        for (field, value) in [
            ("impact_min", self.impact_min),
            ("impact_max", self.impact_max),
            ("impact_mean", self.impact_mean),
            ("impact_std", self.impact_std),
        ] {
            require_finite(field, value)?;
        }
        if self.impact_min > self.impact_max {
            return Err(EngineError::invalid(
                "impact_min",
                format!(
                    "impact_min ({}) is greater than impact_max ({})",
                    self.impact_min, self.impact_max
                ),
            ));
        }
        if self.impact_std <= 0.0 {
            return Err(EngineError::invalid("impact_std", "must be positive"));
        }

        require_finite("correlation_factor", self.correlation_factor)?;
        if !(-1.0..=1.0).contains(&self.correlation_factor) {
            return Err(EngineError::invalid(
                "correlation_factor",
                format!("must be between -1 and 1, got {}", self.correlation_factor),
            ));
        }

        for &level in &self.confidence_levels {
            if !(level > 0.0 && level < 1.0) {
                return Err(EngineError::invalid(
                    "confidence_levels",
                    format!("each level must lie strictly between 0 and 1, got {}", level),
                ));
            }
        }

        require_finite("time_horizon", self.time_horizon)?;
        if self.time_horizon <= 0.0 {
            return Err(EngineError::invalid("time_horizon", "must be positive"));
        }

        sampler::probability_distribution(self)
    }
}

/// A reported percentile
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PercentileValue {
    pub confidence: f64,
    pub value: f64,
}

/// Input factor used in sensitivity analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputFactor {
    Probability,
    Impact,
}

impl std::fmt::Display for InputFactor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InputFactor::Probability => write!(f, "probability"),
            InputFactor::Impact => write!(f, "impact"),
        }
    }
}

/// Correlation of one input factor with the simulated risk value
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sensitivity {
    pub factor: InputFactor,
    /// `None` when either series has zero variance
    pub correlation: Option<f64>,
}

/// Summary of one simulation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    /// Number of trials
    pub iterations: u32,

    /// Seed that reproduces this run
    pub seed: u64,

    /// Distribution used for the probability draw
    pub distribution: DistributionKind,

    pub mean: f64,
    pub median: f64,

    /// Sample standard deviation (undefined for a single trial)
    pub std_dev: Option<f64>,

    /// Sample variance (undefined for a single trial)
    pub variance: Option<f64>,

    /// Bias-corrected skewness (undefined below 3 trials or with zero spread)
    pub skewness: Option<f64>,

    /// Bias-corrected excess kurtosis (undefined below 4 trials or with zero spread)
    pub kurtosis: Option<f64>,

    pub min: f64,
    pub max: f64,

    /// Requested percentiles
    pub percentiles: Vec<PercentileValue>,

    /// Mean of the worst 5% of outcomes
    pub expected_shortfall: f64,

    /// 2.5th to 97.5th percentile
    pub confidence_interval_95: Interval,

    /// 5th to 95th percentile
    pub percentile_band_90: Interval,

    /// Simulated risk values in trial order (bounded)
    pub distribution_sample: Vec<f64>,

    /// Input factor correlations with the risk value
    pub sensitivity: Vec<Sensitivity>,
}

impl SimulationResult {
    /// Value reported for a requested confidence level
    pub fn percentile(&self, confidence: f64) -> Option<f64> {
        self.percentiles
            .iter()
            .find(|p| (p.confidence - confidence).abs() < 1e-9)
            .map(|p| p.value)
    }
}

/// Runs simulations for validated parameter sets
#[derive(Debug, Clone)]
pub struct MonteCarloEngine {
    parallel: bool,
}

impl Default for MonteCarloEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MonteCarloEngine {
    /// Engine with parallel chunk execution enabled
    pub fn new() -> Self {
        Self { parallel: true }
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Run a simulation.
    ///
    /// With `seed = None` a fresh seed is drawn and recorded in the result.
    pub fn run(
        &self,
        params: &MonteCarloParameters,
        seed: Option<u64>,
        control: &RunControl,
    ) -> EngineResult<SimulationResult> {
        let sampler = CorrelatedPairSampler::new(params)?;
        let seed = seed.unwrap_or_else(|| rand::rng().random());

        let total = params.iterations as usize;
        let chunk_count = total.div_ceil(CHUNK_SIZE);
        tracing::debug!(
            iterations = total,
            chunks = chunk_count,
            parallel = self.parallel,
            seed,
            distribution = %params.distribution,
            "starting Monte Carlo run"
        );

        // Chunk k writes its own slice of each series
        let fill_chunk = |k: usize, p: &mut [f64], i: &mut [f64], r: &mut [f64]| -> EngineResult<()> {
            control.check()?;
            let mut rng = StdRng::seed_from_u64(chunk_seed(seed, k as u64));
            for ((probability, impact), risk) in p.iter_mut().zip(i.iter_mut()).zip(r.iter_mut()) {
                let trial = sampler.sample(&mut rng);
                *probability = trial.probability;
                *impact = trial.impact;
                *risk = trial.risk;
            }
            Ok(())
        };

        let mut series = Series::zeroed(total);
        let Series {
            probabilities,
            impacts,
            risks,
        } = &mut series;
        if self.parallel && chunk_count > 1 {
            probabilities
                .par_chunks_mut(CHUNK_SIZE)
                .zip(impacts.par_chunks_mut(CHUNK_SIZE))
                .zip(risks.par_chunks_mut(CHUNK_SIZE))
                .enumerate()
                .try_for_each(|(k, ((p, i), r))| fill_chunk(k, p, i, r))?;
        } else {
            probabilities
                .chunks_mut(CHUNK_SIZE)
                .zip(impacts.chunks_mut(CHUNK_SIZE))
                .zip(risks.chunks_mut(CHUNK_SIZE))
                .enumerate()
                .try_for_each(|(k, ((p, i), r))| fill_chunk(k, p, i, r))?;
        }
        control.check()?;

        let result = summarize(params, seed, series);
        tracing::debug!(mean = result.mean, p95 = ?result.percentile(0.95), "Monte Carlo run finished");
        Ok(result)
    }
}

/// SplitMix64 finalizer; decorrelates neighbouring chunk seeds
fn chunk_seed(seed: u64, chunk: u64) -> u64 {
    let mut z = seed.wrapping_add(chunk.wrapping_add(1).wrapping_mul(0x9E37_79B9_7F4A_7C15));
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Per-trial values in chunk order
struct Series {
    probabilities: Vec<f64>,
    impacts: Vec<f64>,
    risks: Vec<f64>,
}

impl Series {
    fn zeroed(n: usize) -> Self {
        Self {
            probabilities: vec![0.0; n],
            impacts: vec![0.0; n],
            risks: vec![0.0; n],
        }
    }
}

/// Reduce the trial series to summary statistics
fn summarize(params: &MonteCarloParameters, seed: u64, series: Series) -> SimulationResult {
    let Series {
        probabilities,
        impacts,
        risks,
    } = series;

    let mut sorted = risks.clone();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let n = sorted.len();
    let mean = stats::mean(&sorted).unwrap_or(0.0);
    let variance = stats::sample_variance(&sorted, mean);
    let std_dev = variance.map(f64::sqrt);
    let at = |c: f64| stats::percentile(&sorted, c).unwrap_or(0.0);

    let percentiles = params
        .confidence_levels
        .iter()
        .map(|&confidence| PercentileValue {
            confidence,
            value: at(confidence),
        })
        .collect();

    let tail = &sorted[stats::percentile_index(n, SHORTFALL_CONFIDENCE)..];
    let expected_shortfall = stats::mean(tail).unwrap_or(0.0);

    SimulationResult {
        iterations: params.iterations,
        seed,
        distribution: params.distribution,
        mean,
        median: stats::median(&sorted).unwrap_or(0.0),
        std_dev,
        variance,
        skewness: stats::skewness(&sorted, mean, std_dev),
        kurtosis: stats::kurtosis(&sorted, mean, std_dev),
        min: sorted.first().copied().unwrap_or(0.0),
        max: sorted.last().copied().unwrap_or(0.0),
        percentiles,
        expected_shortfall,
        confidence_interval_95: Interval::new(at(0.025), at(0.975)),
        percentile_band_90: Interval::new(at(0.05), at(0.95)),
        distribution_sample: risks.iter().take(DISTRIBUTION_SAMPLE_LIMIT).copied().collect(),
        sensitivity: vec![
            Sensitivity {
                factor: InputFactor::Probability,
                correlation: stats::pearson(&probabilities, &risks),
            },
            Sensitivity {
                factor: InputFactor::Impact,
                correlation: stats::pearson(&impacts, &risks),
            },
        ],
    }
}
