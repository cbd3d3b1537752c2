//! Assumptions, limitations and recommendations attached to a record

use serde::{Deserialize, Serialize};

use crate::engine::fmea::Criticality;
use crate::engine::methodology::EvaluatorKind;
use crate::engine::record::{AnalysisResult, EvaluatorOutcome};

/// 95th percentile loss above which a simulation is flagged
pub const VAR_ALERT_THRESHOLD: f64 = 1_000_000.0;

/// Risk reduction (percent) below which a bow-tie is considered weak
pub const WEAK_REDUCTION_PERCENT: f64 = 50.0;

const TOLERANCE_LINE: &str = "Risk within tolerance: maintain current controls and monitor periodically";

fn assumption_bank(kind: EvaluatorKind) -> &'static [&'static str] {
    match kind {
        EvaluatorKind::MonteCarlo => &[
            "Input distributions accurately represent the underlying uncertainty",
            "Trials are independent apart from the configured probability/impact correlation",
            "Risk scales with the square root of the time horizon",
        ],
        EvaluatorKind::Fmea => &[
            "Severity, occurrence and detection ratings reflect expert consensus",
            "Failure modes are independent of one another",
        ],
        EvaluatorKind::BowTie => &[
            "Barrier effectiveness values are accurate and stable over time",
            "Barriers on the same path fail independently",
            "Threat paths contribute additively to the central event",
        ],
        EvaluatorKind::Scenario => &[
            "The four scenarios span the plausible range of outcomes",
            "Scenario probabilities and impacts are estimated consistently",
        ],
        EvaluatorKind::ValueAtRisk => &[
            "Period returns follow a normal distribution",
            "Return mean and volatility are stable over the horizon",
        ],
    }
}

fn limitation_bank(kind: EvaluatorKind) -> &'static [&'static str] {
    match kind {
        EvaluatorKind::MonteCarlo => &[
            "Results depend on the quality of the input parameters",
            "Sampling error decreases only with the square root of the iteration count",
        ],
        EvaluatorKind::Fmea => &[
            "RPN is an ordinal ranking, not a probability of loss",
            "Interactions between failure modes are not captured",
        ],
        EvaluatorKind::BowTie => &[
            "Common-cause barrier failures are not modelled",
            "Aggregated threat probability is a sum and may exceed 1.0",
        ],
        EvaluatorKind::Scenario => &[
            "Only four discrete scenarios are considered",
            "Outcomes between the named scenarios are not represented",
        ],
        EvaluatorKind::ValueAtRisk => &[
            "Simplified parametric estimate from 1,000 simulated returns, not historical simulation",
            "Fat tails beyond the normal assumption are not captured",
        ],
    }
}

/// Generated text for one analysis record
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Narrative {
    pub assumptions: Vec<String>,
    pub limitations: Vec<String>,
    pub recommendations: Vec<String>,
}

/// Build the narrative for a set of evaluator outcomes.
///
/// Text banks are taken for every evaluator that was selected (completed or
/// failed), in outcome order.
pub fn generate(outcomes: &[EvaluatorOutcome]) -> Narrative {
    let mut narrative = Narrative::default();
    let mut seen: Vec<EvaluatorKind> = Vec::new();

    for outcome in outcomes {
        let kind = outcome.evaluator();
        if !seen.contains(&kind) {
            seen.push(kind);
            narrative
                .assumptions
                .extend(assumption_bank(kind).iter().map(|s| s.to_string()));
            narrative
                .limitations
                .extend(limitation_bank(kind).iter().map(|s| s.to_string()));
        }

        match outcome {
            EvaluatorOutcome::Completed(result) => {
                recommend(result, &mut narrative.recommendations)
            }
            EvaluatorOutcome::Failed(failure) => narrative.recommendations.push(format!(
                "Re-run the {} analysis after correcting its input ({})",
                failure.evaluator, failure.message
            )),
        }
    }

    if narrative.recommendations.is_empty() {
        narrative.recommendations.push(TOLERANCE_LINE.to_string());
    }
    narrative
}

fn recommend(result: &AnalysisResult, out: &mut Vec<String>) {
    match result {
        AnalysisResult::MonteCarlo(sim) => {
            let p95 = sim.percentile_band_90.max;
            if p95 > VAR_ALERT_THRESHOLD {
                out.push(format!(
                    "VaR 95% elevated: 95th percentile loss of {:.0} exceeds {:.0}; consider additional mitigation",
                    p95, VAR_ALERT_THRESHOLD
                ));
            }
            if sim.mean > 0.0 && sim.expected_shortfall > 2.0 * sim.mean {
                out.push(format!(
                    "Heavy tail: expected shortfall ({:.0}) is more than twice the mean loss ({:.0}); plan for extreme outcomes",
                    sim.expected_shortfall, sim.mean
                ));
            }
            if let Some(skew) = sim.skewness.filter(|s| *s > 1.0) {
                out.push(format!(
                    "Strongly right-skewed loss distribution (skewness {:.2}); averages understate the downside",
                    skew
                ));
            }
        }
        AnalysisResult::Fmea(fmea) => {
            let critical = fmea.summary.by_criticality.critical;
            if critical > 0 {
                out.push(format!(
                    "{} failure mode(s) rated Critical require immediate corrective action",
                    critical
                ));
            }
            if Criticality::from_rpn(fmea.summary.max_rpn) >= Criticality::High {
                out.push(format!(
                    "Prioritise '{}' (RPN {})",
                    fmea.summary.highest_risk_mode, fmea.summary.max_rpn
                ));
            }
        }
        AnalysisResult::BowTie(bt) => {
            for barrier in bt.critical_single_points() {
                out.push(format!(
                    "Add redundancy for {} barrier '{}': single point of failure rated {}",
                    barrier.side, barrier.name, barrier.criticality
                ));
            }
            if let Some(reduction) = bt.risk_reduction_percent {
                if reduction < WEAK_REDUCTION_PERCENT {
                    out.push(format!(
                        "Barriers reduce risk by only {:.1}%; strengthen or add barriers",
                        reduction
                    ));
                }
            }
            if bt.aggregated_threat_probability > 1.0 {
                out.push(format!(
                    "Aggregated threat probability {:.3} exceeds 1.0 because threat paths are summed; review for overlapping threats",
                    bt.aggregated_threat_probability
                ));
            }
        }
        AnalysisResult::Scenario(sc) => {
            let ev = sc
                .scenarios
                .iter()
                .find(|s| s.name == sc.priority_focus)
                .map(|s| s.expected_value)
                .unwrap_or(sc.range.max);
            out.push(format!(
                "Focus mitigation planning on the {} scenario (expected value {:.0})",
                sc.priority_focus, ev
            ));
        }
        AnalysisResult::ValueAtRisk(var) => {
            if var.var_99 > 0.0 {
                out.push(format!(
                    "Hold a capital buffer of at least {:.0} to cover the 99% VaR",
                    var.var_99
                ));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::bowtie::{self, Barrier, BowTieModel, Threat};
    use crate::engine::error::EngineError;
    use crate::engine::fmea::{self, FailureMode};
    use crate::engine::record::EvaluatorFailure;
    use crate::engine::var::VarResult;

    fn completed(result: AnalysisResult) -> EvaluatorOutcome {
        EvaluatorOutcome::Completed(result)
    }

    #[test]
    fn test_tolerance_line_when_nothing_triggers() {
        let analysis = fmea::evaluate(&[FailureMode::new("Minor", 2, 2, 2)]).unwrap();
        let narrative = generate(&[completed(AnalysisResult::Fmea(analysis))]);
        assert_eq!(narrative.recommendations, vec![TOLERANCE_LINE.to_string()]);
        assert_eq!(narrative.assumptions.len(), 2);
        assert_eq!(narrative.limitations.len(), 2);
    }

    #[test]
    fn test_fmea_recommendations() {
        let analysis = fmea::evaluate(&[
            FailureMode::new("Seal leak", 8, 5, 5),
            FailureMode::new("Pump seizure", 9, 6, 5),
        ])
        .unwrap();
        let narrative = generate(&[completed(AnalysisResult::Fmea(analysis))]);
        assert_eq!(
            narrative.recommendations,
            vec![
                "2 failure mode(s) rated Critical require immediate corrective action".to_string(),
                "Prioritise 'Pump seizure' (RPN 270)".to_string(),
            ]
        );
    }

    #[test]
    fn test_bow_tie_recommendations() {
        let model = BowTieModel {
            central_event: "Fire".to_string(),
            threats: vec![
                Threat {
                    name: "Spark".to_string(),
                    probability: 0.9,
                    barriers: vec!["Grounding".to_string()],
                },
                Threat {
                    name: "Hot work".to_string(),
                    probability: 0.9,
                    barriers: vec![],
                },
            ],
            consequences: vec![],
            preventive_barriers: vec![Barrier {
                name: "Grounding".to_string(),
                effectiveness: 0.95,
                dependencies: vec![],
            }],
            protective_barriers: vec![],
        };
        let result = bowtie::evaluate(&model).unwrap();
        let narrative = generate(&[completed(AnalysisResult::BowTie(result))]);
        assert!(narrative.recommendations[0].contains("'Grounding'"));
        assert!(narrative.recommendations[0].contains("Critical"));
        // 0.9 * 0.05 + 0.9 = 0.945, not above 1.0
        assert_eq!(narrative.recommendations.len(), 1);
    }

    #[test]
    fn test_value_at_risk_buffer() {
        let var = VarResult {
            draws: 1000,
            var_95: 150_000.0,
            var_99: 230_000.0,
            expected_shortfall: 200_000.0,
        };
        let narrative = generate(&[completed(AnalysisResult::ValueAtRisk(var))]);
        assert_eq!(
            narrative.recommendations,
            vec!["Hold a capital buffer of at least 230000 to cover the 99% VaR".to_string()]
        );
    }

    #[test]
    fn test_failure_gets_rerun_hint_and_banks() {
        let failure = EvaluatorOutcome::Failed(EvaluatorFailure::new(
            EvaluatorKind::Scenario,
            &EngineError::empty("scenario list is empty"),
        ));
        let narrative = generate(&[failure]);
        assert_eq!(narrative.recommendations.len(), 1);
        assert!(narrative.recommendations[0].starts_with("Re-run the scenario analysis"));
        assert_eq!(narrative.assumptions.len(), assumption_bank(EvaluatorKind::Scenario).len());
    }

    #[test]
    fn test_banks_are_concatenated_once_per_evaluator() {
        let a = fmea::evaluate(&[FailureMode::new("A", 1, 1, 1)]).unwrap();
        let var = VarResult {
            draws: 1000,
            var_95: -1.0,
            var_99: -1.0,
            expected_shortfall: -1.0,
        };
        let narrative = generate(&[
            completed(AnalysisResult::Fmea(a.clone())),
            completed(AnalysisResult::ValueAtRisk(var)),
            completed(AnalysisResult::Fmea(a)),
        ]);
        let expected = assumption_bank(EvaluatorKind::Fmea).len()
            + assumption_bank(EvaluatorKind::ValueAtRisk).len();
        assert_eq!(narrative.assumptions.len(), expected);
        assert_eq!(narrative.assumptions[0], assumption_bank(EvaluatorKind::Fmea)[0]);
    }
}
