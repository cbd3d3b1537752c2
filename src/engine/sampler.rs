//! Distribution sampling and correlated probability/impact pairs
//!
//! All draws take an explicit RNG so runs are reproducible from a seed and
//! can be sharded across independent streams.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::engine::error::{require_finite, EngineError, EngineResult};
use crate::engine::monte_carlo::MonteCarloParameters;

/// Distribution family selected for the probability draw
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistributionKind {
    /// Normal (Gaussian) distribution
    #[default]
    Normal,
    /// Uniform distribution
    Uniform,
    /// Triangular distribution
    Triangular,
    /// Log-normal distribution
    #[serde(alias = "log_normal")]
    LogNormal,
    /// Beta distribution
    Beta,
}

impl std::fmt::Display for DistributionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DistributionKind::Normal => write!(f, "normal"),
            DistributionKind::Uniform => write!(f, "uniform"),
            DistributionKind::Triangular => write!(f, "triangular"),
            DistributionKind::LogNormal => write!(f, "lognormal"),
            DistributionKind::Beta => write!(f, "beta"),
        }
    }
}

impl std::str::FromStr for DistributionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "normal" => Ok(DistributionKind::Normal),
            "uniform" => Ok(DistributionKind::Uniform),
            "triangular" => Ok(DistributionKind::Triangular),
            "lognormal" | "log_normal" => Ok(DistributionKind::LogNormal),
            "beta" => Ok(DistributionKind::Beta),
            _ => Err(format!(
                "Unknown distribution: {}. Use normal, uniform, triangular, lognormal or beta",
                s
            )),
        }
    }
}

impl DistributionKind {
    pub fn all() -> &'static [DistributionKind] {
        &[
            DistributionKind::Normal,
            DistributionKind::Uniform,
            DistributionKind::Triangular,
            DistributionKind::LogNormal,
            DistributionKind::Beta,
        ]
    }
}

/// A fully parameterised distribution
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Distribution {
    Normal { mean: f64, std: f64 },
    Uniform { min: f64, max: f64 },
    Triangular { min: f64, max: f64, mode: f64 },
    LogNormal { mu: f64, sigma: f64 },
    Beta { alpha: f64, beta: f64 },
}

impl Distribution {
    /// Check the parameters without drawing
    pub fn validate(&self) -> EngineResult<()> {
        match *self {
            Distribution::Normal { mean, std } => {
                require_finite("mean", mean)?;
                require_finite("std", std)?;
                if std <= 0.0 {
                    return Err(EngineError::invalid("std", "normal std must be positive"));
                }
            }
            Distribution::Uniform { min, max } => {
                require_finite("min", min)?;
                require_finite("max", max)?;
                if min > max {
                    return Err(EngineError::invalid(
                        "min",
                        format!("min ({}) is greater than max ({})", min, max),
                    ));
                }
            }
            Distribution::Triangular { min, max, mode } => {
                require_finite("min", min)?;
                require_finite("max", max)?;
                require_finite("mode", mode)?;
                if min > max {
                    return Err(EngineError::invalid(
                        "min",
                        format!("min ({}) is greater than max ({})", min, max),
                    ));
                }
                if mode < min || mode > max {
                    return Err(EngineError::invalid(
                        "mode",
                        format!("mode ({}) must lie within [{}, {}]", mode, min, max),
                    ));
                }
            }
            Distribution::LogNormal { mu, sigma } => {
                require_finite("mu", mu)?;
                require_finite("sigma", sigma)?;
                if sigma <= 0.0 {
                    return Err(EngineError::invalid("sigma", "lognormal sigma must be positive"));
                }
            }
            Distribution::Beta { alpha, beta } => {
                require_finite("alpha", alpha)?;
                require_finite("beta", beta)?;
                if alpha <= 0.0 || beta <= 0.0 {
                    return Err(EngineError::invalid(
                        "alpha/beta",
                        format!("beta shapes must be positive, got ({}, {})", alpha, beta),
                    ));
                }
            }
        }
        Ok(())
    }

    /// Validate and draw one value
    pub fn sample<R: Rng>(&self, rng: &mut R) -> EngineResult<f64> {
        self.validate()?;
        Ok(self.draw(rng))
    }

    /// Draw one value; parameters must already be validated
    pub(crate) fn draw<R: Rng>(&self, rng: &mut R) -> f64 {
        match *self {
            Distribution::Normal { mean, std } => mean + std * standard_normal(rng),
            Distribution::Uniform { min, max } => {
                let u: f64 = rng.random();
                min + u * (max - min)
            }
            Distribution::Triangular { min, max, mode } => {
                if max == min {
                    return min;
                }
                // Inverse transform
                let u: f64 = rng.random();
                let fc = (mode - min) / (max - min);
                if u < fc {
                    min + (u * (max - min) * (mode - min)).sqrt()
                } else {
                    max - ((1.0 - u) * (max - min) * (max - mode)).sqrt()
                }
            }
            Distribution::LogNormal { mu, sigma } => (mu + sigma * standard_normal(rng)).exp(),
            Distribution::Beta { alpha, beta } => {
                let x = gamma(alpha, rng);
                let y = gamma(beta, rng);
                let total = x + y;
                if total > 0.0 {
                    x / total
                } else {
                    alpha / (alpha + beta)
                }
            }
        }
    }
}

/// Standard normal draw via the Box-Muller transform
fn standard_normal<R: Rng>(rng: &mut R) -> f64 {
    // Shift to (0, 1] so ln() never sees zero
    let u1: f64 = 1.0 - rng.random::<f64>();
    let u2: f64 = rng.random();
    (-2.0_f64 * u1.ln()).sqrt() * (2.0_f64 * std::f64::consts::PI * u2).cos()
}

/// Gamma(shape, 1) draw using the Marsaglia-Tsang squeeze method.
///
/// The rejection loop has no hard bound; acceptance probability is above
/// 0.95 for every shape >= 1, so the expected number of rounds is O(1).
fn gamma<R: Rng>(shape: f64, rng: &mut R) -> f64 {
    if shape < 1.0 {
        let u: f64 = 1.0 - rng.random::<f64>();
        return gamma(shape + 1.0, rng) * u.powf(1.0 / shape);
    }

    let d = shape - 1.0 / 3.0;
    let c = 1.0 / (9.0 * d).sqrt();
    loop {
        let (x, v) = loop {
            let x = standard_normal(rng);
            let v = 1.0 + c * x;
            if v > 0.0 {
                break (x, v * v * v);
            }
        };

        let u: f64 = rng.random();
        if u < 1.0 - 0.0331 * x.powi(4) {
            return d * v;
        }
        if u > 0.0 && u.ln() < 0.5 * x * x + d * (1.0 - v + v.ln()) {
            return d * v;
        }
    }
}

/// Derive the probability distribution from Monte Carlo parameters
pub fn probability_distribution(params: &MonteCarloParameters) -> EngineResult<Distribution> {
    let mean = params.probability_mean;
    let std = params.probability_std;

    let dist = match params.distribution {
        DistributionKind::Normal => Distribution::Normal { mean, std },
        DistributionKind::Uniform => Distribution::Uniform {
            min: params.probability_min,
            max: params.probability_max,
        },
        DistributionKind::Triangular => Distribution::Triangular {
            min: params.probability_min,
            max: params.probability_max,
            mode: mean,
        },
        DistributionKind::LogNormal => {
            if mean <= 0.0 {
                return Err(EngineError::invalid(
                    "probability_mean",
                    "lognormal requires a positive mean",
                ));
            }
            if std <= 0.0 {
                return Err(EngineError::invalid(
                    "probability_std",
                    "lognormal requires a positive std",
                ));
            }
            // Moment matching so the draws keep the configured mean and std
            let sigma_sq = (1.0 + (std * std) / (mean * mean)).ln();
            Distribution::LogNormal {
                mu: mean.ln() - sigma_sq / 2.0,
                sigma: sigma_sq.sqrt(),
            }
        }
        DistributionKind::Beta => {
            if mean <= 0.0 || mean >= 1.0 {
                return Err(EngineError::invalid(
                    "probability_mean",
                    format!("beta requires 0 < mean < 1, got {}", mean),
                ));
            }
            let variance = std * std;
            let ceiling = mean * (1.0 - mean);
            if variance <= 0.0 || variance >= ceiling {
                return Err(EngineError::invalid(
                    "probability_std",
                    format!(
                        "beta requires 0 < std^2 < mean*(1-mean) = {:.6}, got {:.6}",
                        ceiling, variance
                    ),
                ));
            }
            let k = ceiling / variance - 1.0;
            Distribution::Beta {
                alpha: mean * k,
                beta: (1.0 - mean) * k,
            }
        }
    };

    dist.validate().map_err(|e| match e {
        EngineError::InvalidParameter { field, reason } => {
            EngineError::invalid(format!("probability_{}", field), reason)
        }
        other => other,
    })?;
    Ok(dist)
}

/// One simulated trial
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Trial {
    pub probability: f64,
    pub impact: f64,
    pub risk: f64,
}

/// Draws correlated (probability, impact) pairs for a validated parameter set
#[derive(Debug, Clone)]
pub struct CorrelatedPairSampler {
    probability: Distribution,
    impact: Distribution,
    probability_min: f64,
    probability_max: f64,
    probability_mean: f64,
    probability_std: f64,
    impact_min: f64,
    impact_max: f64,
    correlation_factor: f64,
    horizon_scale: f64,
}

impl CorrelatedPairSampler {
    /// Validate the parameters and prepare the sampler
    pub fn new(params: &MonteCarloParameters) -> EngineResult<Self> {
        let probability = params.probability_distribution()?;

        Ok(Self {
            probability,
            impact: Distribution::Normal {
                mean: params.impact_mean,
                std: params.impact_std,
            },
            probability_min: params.probability_min,
            probability_max: params.probability_max,
            probability_mean: params.probability_mean,
            probability_std: params.probability_std,
            impact_min: params.impact_min,
            impact_max: params.impact_max,
            correlation_factor: params.correlation_factor,
            horizon_scale: params.time_horizon.sqrt(),
        })
    }

    /// Draw one trial
    pub fn sample<R: Rng>(&self, rng: &mut R) -> Trial {
        let probability = self
            .probability
            .draw(rng)
            .clamp(self.probability_min, self.probability_max);

        let adjustment = if self.probability_std > 0.0 {
            self.correlation_factor * (probability - self.probability_mean) / self.probability_std
        } else {
            0.0
        };
        let impact = (self.impact.draw(rng) + adjustment).clamp(self.impact_min, self.impact_max);

        Trial {
            probability,
            impact,
            risk: probability * impact * self.horizon_scale,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn params(kind: DistributionKind) -> MonteCarloParameters {
        MonteCarloParameters {
            distribution: kind,
            probability_min: 0.1,
            probability_max: 0.6,
            probability_mean: 0.3,
            probability_std: 0.1,
            ..MonteCarloParameters::default()
        }
    }

    #[test]
    fn test_normal_rejects_non_positive_std() {
        let mut rng = StdRng::seed_from_u64(1);
        let err = Distribution::Normal { mean: 0.0, std: 0.0 }
            .sample(&mut rng)
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidParameter { .. }));
        assert!(Distribution::LogNormal { mu: 0.0, sigma: -1.0 }
            .sample(&mut rng)
            .is_err());
    }

    #[test]
    fn test_range_rejects_inverted_bounds() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(Distribution::Uniform { min: 2.0, max: 1.0 }.sample(&mut rng).is_err());
        assert!(Distribution::Triangular { min: 2.0, max: 1.0, mode: 1.5 }
            .sample(&mut rng)
            .is_err());
        assert!(Distribution::Triangular { min: 0.0, max: 1.0, mode: 2.0 }
            .sample(&mut rng)
            .is_err());
    }

    #[test]
    fn test_uniform_stays_in_range() {
        let mut rng = StdRng::seed_from_u64(7);
        let dist = Distribution::Uniform { min: 3.0, max: 5.0 };
        for _ in 0..1000 {
            let v = dist.sample(&mut rng).unwrap();
            assert!((3.0..=5.0).contains(&v));
        }
    }

    #[test]
    fn test_triangular_degenerate_range() {
        let mut rng = StdRng::seed_from_u64(7);
        let dist = Distribution::Triangular { min: 2.0, max: 2.0, mode: 2.0 };
        assert_eq!(dist.sample(&mut rng).unwrap(), 2.0);
    }

    #[test]
    fn test_normal_sample_mean() {
        let mut rng = StdRng::seed_from_u64(42);
        let dist = Distribution::Normal { mean: 10.0, std: 2.0 };
        let n = 20_000;
        let mean: f64 = (0..n).map(|_| dist.draw(&mut rng)).sum::<f64>() / n as f64;
        assert!((mean - 10.0).abs() < 0.1, "mean was {}", mean);
    }

    #[test]
    fn test_beta_sample_in_unit_interval_with_expected_mean() {
        let mut rng = StdRng::seed_from_u64(42);
        let dist = Distribution::Beta { alpha: 2.0, beta: 5.0 };
        let n = 20_000;
        let mut total = 0.0;
        for _ in 0..n {
            let v = dist.draw(&mut rng);
            assert!((0.0..=1.0).contains(&v));
            total += v;
        }
        // E[X] = alpha / (alpha + beta)
        assert!((total / n as f64 - 2.0 / 7.0).abs() < 0.01);
    }

    #[test]
    fn test_beta_small_shapes() {
        let mut rng = StdRng::seed_from_u64(3);
        let dist = Distribution::Beta { alpha: 0.5, beta: 0.5 };
        for _ in 0..1000 {
            let v = dist.draw(&mut rng);
            assert!((0.0..=1.0).contains(&v));
        }
    }

    #[test]
    fn test_lognormal_moment_matching() {
        let p = params(DistributionKind::LogNormal);
        match probability_distribution(&p).unwrap() {
            Distribution::LogNormal { mu, sigma } => {
                let mean = (mu + sigma * sigma / 2.0).exp();
                assert!((mean - 0.3).abs() < 1e-12);
            }
            other => panic!("unexpected distribution {:?}", other),
        }
    }

    #[test]
    fn test_beta_method_of_moments_rejects_wide_std() {
        let mut p = params(DistributionKind::Beta);
        p.probability_std = 0.5;
        let err = probability_distribution(&p).unwrap_err();
        assert!(matches!(err, EngineError::InvalidParameter { ref field, .. } if field == "probability_std"));
    }

    #[test]
    fn test_zero_probability_std_skips_correlation() {
        let mut p = params(DistributionKind::Uniform);
        p.probability_std = 0.0;
        p.correlation_factor = 1.0;
        let sampler = CorrelatedPairSampler::new(&p).unwrap();
        let mut rng = StdRng::seed_from_u64(9);
        for _ in 0..100 {
            let trial = sampler.sample(&mut rng);
            assert!(trial.impact.is_finite());
            assert!(trial.risk.is_finite());
        }
    }

    #[test]
    fn test_risk_scales_with_sqrt_horizon() {
        let mut p = params(DistributionKind::Uniform);
        p.time_horizon = 4.0;
        let sampler = CorrelatedPairSampler::new(&p).unwrap();
        let mut rng = StdRng::seed_from_u64(11);
        let trial = sampler.sample(&mut rng);
        assert!((trial.risk - trial.probability * trial.impact * 2.0).abs() < 1e-9);
    }

    fn any_kind() -> impl Strategy<Value = DistributionKind> {
        prop_oneof![
            Just(DistributionKind::Normal),
            Just(DistributionKind::Uniform),
            Just(DistributionKind::Triangular),
            Just(DistributionKind::LogNormal),
            Just(DistributionKind::Beta),
        ]
    }

    proptest! {
        #[test]
        fn prop_probability_clamped_for_every_distribution(
            kind in any_kind(),
            seed in any::<u64>(),
            low in 0.05f64..0.4,
            width in 0.05f64..0.5,
            correlation in -1.0f64..=1.0,
        ) {
            let high = (low + width).min(0.95);
            let mean = (low + high) / 2.0;
            let p = MonteCarloParameters {
                distribution: kind,
                probability_min: low,
                probability_max: high,
                probability_mean: mean,
                probability_std: (high - low) / 6.0,
                correlation_factor: correlation,
                ..MonteCarloParameters::default()
            };
            let sampler = CorrelatedPairSampler::new(&p).unwrap();
            let mut rng = StdRng::seed_from_u64(seed);
            for _ in 0..200 {
                let trial = sampler.sample(&mut rng);
                prop_assert!(trial.probability >= low && trial.probability <= high);
                prop_assert!(trial.impact >= p.impact_min && trial.impact <= p.impact_max);
            }
        }
    }
}
