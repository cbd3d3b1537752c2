//! Scenario-based expected-value analysis

use serde::{Deserialize, Serialize};

use crate::engine::error::{require_finite, require_unit_interval, EngineError, EngineResult};
use crate::engine::record::Interval;
use crate::engine::stats;

/// The four fixed scenarios
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioKind {
    #[serde(alias = "best")]
    BestCase,
    #[serde(alias = "base")]
    BaseCase,
    #[serde(alias = "worst")]
    WorstCase,
    #[serde(alias = "stress")]
    StressTest,
}

impl ScenarioKind {
    pub fn all() -> &'static [ScenarioKind] {
        &[
            ScenarioKind::BestCase,
            ScenarioKind::BaseCase,
            ScenarioKind::WorstCase,
            ScenarioKind::StressTest,
        ]
    }
}

impl std::fmt::Display for ScenarioKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScenarioKind::BestCase => write!(f, "best_case"),
            ScenarioKind::BaseCase => write!(f, "base_case"),
            ScenarioKind::WorstCase => write!(f, "worst_case"),
            ScenarioKind::StressTest => write!(f, "stress_test"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub name: ScenarioKind,
    /// Likelihood in [0, 1]
    pub probability: f64,
    /// Monetary impact, non-negative
    pub impact: f64,
    #[serde(default)]
    pub description: String,
}

impl Scenario {
    pub fn new(name: ScenarioKind, probability: f64, impact: f64) -> Self {
        Self {
            name,
            probability,
            impact,
            description: String::new(),
        }
    }
}

/// Expected value of one scenario
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioOutcome {
    pub name: ScenarioKind,
    pub probability: f64,
    pub impact: f64,
    pub expected_value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioResult {
    /// Outcomes in input order
    pub scenarios: Vec<ScenarioOutcome>,
    /// Simple mean of the expected values
    pub weighted_average: f64,
    /// sum(p * ev) / sum(p); `None` when every probability is zero
    pub probability_weighted_average: Option<f64>,
    pub range: Interval,
    /// Population variance of the expected values
    pub variance: f64,
    /// Scenario with the largest expected value
    pub priority_focus: ScenarioKind,
}

/// Evaluate the four named scenarios
pub fn evaluate(scenarios: &[Scenario]) -> EngineResult<ScenarioResult> {
    validate(scenarios)?;

    let outcomes: Vec<ScenarioOutcome> = scenarios
        .iter()
        .map(|s| ScenarioOutcome {
            name: s.name,
            probability: s.probability,
            impact: s.impact,
            expected_value: s.probability * s.impact,
        })
        .collect();
    let values: Vec<f64> = outcomes.iter().map(|o| o.expected_value).collect();

    let weighted_average = stats::mean(&values).unwrap_or(0.0);
    let variance = stats::population_variance(&values).unwrap_or(0.0);

    let total_probability: f64 = outcomes.iter().map(|o| o.probability).sum();
    let probability_weighted_average = (total_probability > 0.0).then(|| {
        outcomes
            .iter()
            .map(|o| o.probability * o.expected_value)
            .sum::<f64>()
            / total_probability
    });

    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    let mut focus = &outcomes[0];
    for o in &outcomes[1..] {
        if o.expected_value > focus.expected_value {
            focus = o;
        }
    }

    Ok(ScenarioResult {
        priority_focus: focus.name,
        scenarios: outcomes,
        weighted_average,
        probability_weighted_average,
        range: Interval::new(min, max),
        variance,
    })
}

/// Each of the four kinds exactly once, with valid ranges
pub fn validate(scenarios: &[Scenario]) -> EngineResult<()> {
    if scenarios.is_empty() {
        return Err(EngineError::empty("scenario list is empty"));
    }

    for kind in ScenarioKind::all() {
        let count = scenarios.iter().filter(|s| s.name == *kind).count();
        if count != 1 {
            return Err(EngineError::invalid(
                "scenarios",
                format!(
                    "expected exactly one '{}' scenario, found {}",
                    kind, count
                ),
            ));
        }
    }
    for (i, s) in scenarios.iter().enumerate() {
        require_unit_interval(&format!("scenarios[{}].probability", i), s.probability)?;
        let field = format!("scenarios[{}].impact", i);
        require_finite(&field, s.impact)?;
        if s.impact < 0.0 {
            return Err(EngineError::invalid(field, "must not be negative"));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn standard() -> Vec<Scenario> {
        vec![
            Scenario::new(ScenarioKind::BestCase, 0.05, 50_000.0),
            Scenario::new(ScenarioKind::BaseCase, 0.15, 500_000.0),
            Scenario::new(ScenarioKind::WorstCase, 0.35, 2_500_000.0),
            Scenario::new(ScenarioKind::StressTest, 0.6, 10_000_000.0),
        ]
    }

    #[test]
    fn test_expected_values() {
        let result = evaluate(&standard()).unwrap();
        let evs: Vec<f64> = result.scenarios.iter().map(|s| s.expected_value).collect();
        let expected = [2_500.0, 75_000.0, 875_000.0, 6_000_000.0];
        for (ev, want) in evs.iter().zip(expected) {
            assert!((ev - want).abs() < 1e-6, "{} != {}", ev, want);
        }
    }

    #[test]
    fn test_aggregates() {
        let result = evaluate(&standard()).unwrap();
        assert!((result.weighted_average - 1_738_125.0).abs() < 1e-6);

        // (0.05*2500 + 0.15*75000 + 0.35*875000 + 0.6*6e6) / 1.15
        let pwa = (125.0 + 11_250.0 + 306_250.0 + 3_600_000.0) / 1.15;
        assert!((result.probability_weighted_average.unwrap() - pwa).abs() < 1e-6);

        assert!((result.range.min - 2_500.0).abs() < 1e-9);
        assert!((result.range.max - 6_000_000.0).abs() < 1e-6);
        assert_eq!(result.priority_focus, ScenarioKind::StressTest);

        let mean = 1_738_125.0;
        let var = [2_500.0, 75_000.0, 875_000.0, 6_000_000.0]
            .iter()
            .map(|x: &f64| (x - mean).powi(2))
            .sum::<f64>()
            / 4.0;
        assert!((result.variance - var).abs() / var < 1e-12);
    }

    #[test]
    fn test_zero_probabilities_leave_weighted_average_undefined() {
        let scenarios: Vec<Scenario> = ScenarioKind::all()
            .iter()
            .map(|k| Scenario::new(*k, 0.0, 1000.0))
            .collect();
        let result = evaluate(&scenarios).unwrap();
        assert_eq!(result.probability_weighted_average, None);
        assert_eq!(result.weighted_average, 0.0);
    }

    #[test]
    fn test_input_order_is_free() {
        let mut scenarios = standard();
        scenarios.reverse();
        let result = evaluate(&scenarios).unwrap();
        assert_eq!(result.scenarios[0].name, ScenarioKind::StressTest);
        assert_eq!(result.priority_focus, ScenarioKind::StressTest);
    }

    #[test]
    fn test_scenario_set_must_be_complete() {
        assert!(matches!(evaluate(&[]), Err(EngineError::EmptyInput { .. })));

        let mut missing = standard();
        missing.pop();
        assert!(matches!(evaluate(&missing), Err(EngineError::InvalidParameter { .. })));

        let mut duplicate = standard();
        duplicate.push(Scenario::new(ScenarioKind::BaseCase, 0.1, 1.0));
        assert!(evaluate(&duplicate).is_err());
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut s = standard();
        s[1].probability = -0.1;
        assert!(evaluate(&s).is_err());

        let mut s = standard();
        s[2].impact = -5.0;
        assert!(evaluate(&s).is_err());
    }

    #[test]
    fn test_evaluation_is_idempotent() {
        let s = standard();
        assert_eq!(evaluate(&s).unwrap(), evaluate(&s).unwrap());
    }

    #[test]
    fn test_scenario_aliases() {
        let yaml = r#"
- name: best
  probability: 0.1
  impact: 10
- name: base_case
  probability: 0.5
  impact: 100
  description: Expected conditions
"#;
        let parsed: Vec<Scenario> = serde_yml::from_str(yaml).unwrap();
        assert_eq!(parsed[0].name, ScenarioKind::BestCase);
        assert_eq!(parsed[1].description, "Expected conditions");
    }
}
