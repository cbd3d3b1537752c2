//! Overall confidence and uncertainty across evaluator results

use crate::engine::record::{AnalysisResult, Interval};

pub const BASE_CONFIDENCE: f64 = 0.80;
pub const MAX_CONFIDENCE: f64 = 0.99;

/// Simulations at or above this many trials earn the iteration bonus
pub const HIGH_ITERATION_COUNT: u32 = 100_000;

const ITERATION_BONUS: f64 = 0.10;
const SCENARIO_BONUS: f64 = 0.05;
const FAILURE_MODE_BONUS: f64 = 0.05;

/// Base 0.80 plus fixed bonuses, capped at 0.99
pub fn confidence_level<'a>(results: impl IntoIterator<Item = &'a AnalysisResult>) -> f64 {
    let mut confidence = BASE_CONFIDENCE;

    for result in results {
        match result {
            AnalysisResult::MonteCarlo(sim) if sim.iterations >= HIGH_ITERATION_COUNT => {
                confidence += ITERATION_BONUS
            }
            AnalysisResult::Scenario(sc) if sc.scenarios.len() >= 4 => {
                confidence += SCENARIO_BONUS
            }
            AnalysisResult::Fmea(fmea) if fmea.results.len() >= 3 => {
                confidence += FAILURE_MODE_BONUS
            }
            _ => {}
        }
    }

    confidence.min(MAX_CONFIDENCE)
}

/// Monte Carlo 5th/95th percentile band, else the scenario range
pub fn uncertainty_range<'a>(
    results: impl IntoIterator<Item = &'a AnalysisResult>,
) -> Option<Interval> {
    let mut scenario_range = None;

    for result in results {
        match result {
            AnalysisResult::MonteCarlo(sim) => return Some(sim.percentile_band_90),
            AnalysisResult::Scenario(sc) if scenario_range.is_none() => {
                scenario_range = Some(sc.range)
            }
            _ => {}
        }
    }

    scenario_range
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::cancel::RunControl;
    use crate::engine::fmea::{self, FailureMode};
    use crate::engine::monte_carlo::{MonteCarloEngine, MonteCarloParameters};
    use crate::engine::scenario::{self, Scenario, ScenarioKind};

    fn scenarios() -> AnalysisResult {
        let input: Vec<Scenario> = ScenarioKind::all()
            .iter()
            .enumerate()
            .map(|(i, k)| Scenario::new(*k, 0.1 * (i + 1) as f64, 1000.0 * (i + 1) as f64))
            .collect();
        AnalysisResult::Scenario(scenario::evaluate(&input).unwrap())
    }

    fn fmea_with(count: usize) -> AnalysisResult {
        let modes: Vec<FailureMode> = (0..count)
            .map(|i| FailureMode::new(format!("mode {}", i), 5, 5, 5))
            .collect();
        AnalysisResult::Fmea(fmea::evaluate(&modes).unwrap())
    }

    fn simulation(iterations: u32) -> AnalysisResult {
        let params = MonteCarloParameters {
            iterations,
            ..MonteCarloParameters::default()
        };
        let sim = MonteCarloEngine::new()
            .run(&params, Some(1), &RunControl::new())
            .unwrap();
        AnalysisResult::MonteCarlo(sim)
    }

    #[test]
    fn test_base_confidence() {
        assert!((confidence_level(std::iter::empty()) - 0.80).abs() < 1e-12);
        assert!((confidence_level(&[fmea_with(2)]) - 0.80).abs() < 1e-12);
    }

    #[test]
    fn test_bonuses_accumulate() {
        assert!((confidence_level(&[fmea_with(3)]) - 0.85).abs() < 1e-12);
        assert!((confidence_level(&[fmea_with(3), scenarios()]) - 0.90).abs() < 1e-12);
    }

    #[test]
    fn test_confidence_is_capped() {
        let results = [simulation(HIGH_ITERATION_COUNT), scenarios(), fmea_with(5)];
        assert!((confidence_level(&results) - MAX_CONFIDENCE).abs() < 1e-12);
    }

    #[test]
    fn test_uncertainty_prefers_simulation() {
        let sim = simulation(2000);
        let expected = match &sim {
            AnalysisResult::MonteCarlo(s) => s.percentile_band_90,
            _ => unreachable!(),
        };
        assert_eq!(uncertainty_range(&[scenarios(), sim]), Some(expected));
    }

    #[test]
    fn test_uncertainty_falls_back_to_scenarios() {
        let range = uncertainty_range(&[fmea_with(1), scenarios()]).unwrap();
        assert!((range.min - 100.0).abs() < 1e-9);
        assert!((range.max - 1600.0).abs() < 1e-9);
        assert_eq!(uncertainty_range(&[fmea_with(1)]), None);
    }
}
