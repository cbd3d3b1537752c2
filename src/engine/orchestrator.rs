//! Runs the evaluators a methodology selects and assembles the record

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::core::identity::RecordId;
use crate::engine::bowtie::{self, BowTieModel};
use crate::engine::cancel::RunControl;
use crate::engine::confidence;
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::fmea::{self, FailureMode};
use crate::engine::methodology::{EvaluatorKind, Methodology, Requirement};
use crate::engine::monte_carlo::{MonteCarloEngine, MonteCarloParameters};
use crate::engine::narrative;
use crate::engine::record::{AnalysisRecord, AnalysisResult, EvaluatorFailure, EvaluatorOutcome};
use crate::engine::scenario::{self, Scenario};
use crate::engine::var::{self, VarParameters};

/// Offset separating the VaR RNG stream from the simulation streams
const VAR_STREAM: u64 = 0x5641_525F_5354_524D;

/// Everything needed for one analysis run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    /// Identifier of the risk being analysed (owned by the host system)
    pub risk_id: String,

    pub methodology: Methodology,

    /// Seed for every random draw in the run; drawn fresh when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monte_carlo: Option<MonteCarloParameters>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_modes: Option<Vec<FailureMode>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bow_tie: Option<BowTieModel>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scenarios: Option<Vec<Scenario>>,

    #[serde(default, alias = "var", skip_serializing_if = "Option::is_none")]
    pub value_at_risk: Option<VarParameters>,
}

impl AnalysisRequest {
    /// Request with no evaluator inputs
    pub fn new(risk_id: impl Into<String>, methodology: Methodology) -> Self {
        Self {
            risk_id: risk_id.into(),
            methodology,
            seed: None,
            monte_carlo: None,
            failure_modes: None,
            bow_tie: None,
            scenarios: None,
            value_at_risk: None,
        }
    }

    /// Whether input for `kind` was supplied
    pub fn has_input(&self, kind: EvaluatorKind) -> bool {
        match kind {
            EvaluatorKind::MonteCarlo => self.monte_carlo.is_some(),
            EvaluatorKind::Fmea => self.failure_modes.is_some(),
            EvaluatorKind::BowTie => self.bow_tie.is_some(),
            EvaluatorKind::Scenario => self.scenarios.is_some(),
            EvaluatorKind::ValueAtRisk => self.value_at_risk.is_some(),
        }
    }

    /// Input checks for every supplied section, without sampling or evaluating
    pub fn check_inputs(&self) -> Vec<EvaluatorFailure> {
        let mut failures = Vec::new();
        let mut record = |kind: EvaluatorKind, checked: EngineResult<()>| {
            if let Err(e) = checked {
                failures.push(EvaluatorFailure::new(kind, &e));
            }
        };

        if let Some(params) = &self.monte_carlo {
            record(EvaluatorKind::MonteCarlo, params.validate());
        }
        if let Some(modes) = &self.failure_modes {
            record(EvaluatorKind::Fmea, fmea::validate(modes));
        }
        if let Some(model) = &self.bow_tie {
            record(EvaluatorKind::BowTie, bowtie::validate(model));
        }
        if let Some(scenarios) = &self.scenarios {
            record(EvaluatorKind::Scenario, scenario::validate(scenarios));
        }
        if let Some(params) = &self.value_at_risk {
            record(EvaluatorKind::ValueAtRisk, params.validate());
        }
        failures
    }
}

/// Single-shot analysis runner; holds no state between runs
#[derive(Debug, Clone, Default)]
pub struct AnalysisOrchestrator {
    engine: MonteCarloEngine,
}

impl AnalysisOrchestrator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_engine(mut self, engine: MonteCarloEngine) -> Self {
        self.engine = engine;
        self
    }

    /// Run every evaluator the methodology selects.
    ///
    /// A failing evaluator is recorded as a failure marker next to its
    /// siblings. An error is returned only when nothing could be selected or
    /// the run was cancelled or timed out.
    pub fn run(&self, request: &AnalysisRequest, control: &RunControl) -> EngineResult<AnalysisRecord> {
        let seed = request.seed.unwrap_or_else(|| rand::rng().random());
        let selected: Vec<(EvaluatorKind, Requirement)> = request
            .methodology
            .evaluators()
            .iter()
            .copied()
            .filter(|(kind, requirement)| {
                *requirement == Requirement::Required || request.has_input(*kind)
            })
            .collect();

        if selected.is_empty() {
            return Err(EngineError::empty(format!(
                "no input supplied for any {} evaluator",
                request.methodology
            )));
        }

        tracing::info!(
            risk_id = %request.risk_id,
            methodology = %request.methodology,
            seed,
            evaluators = selected.len(),
            "starting analysis"
        );

        let mut calculation_results = Vec::with_capacity(selected.len());
        for (kind, _) in selected {
            control.check()?;
            let outcome = match self.evaluate(kind, request, seed, control) {
                Ok(result) => {
                    tracing::debug!(evaluator = %kind, "evaluator completed");
                    EvaluatorOutcome::Completed(result)
                }
                Err(e) if e.is_interruption() => return Err(e),
                Err(e) => {
                    tracing::warn!(evaluator = %kind, error = %e, "evaluator failed");
                    EvaluatorOutcome::Failed(EvaluatorFailure::new(kind, &e))
                }
            };
            calculation_results.push(outcome);
        }

        let results: Vec<&AnalysisResult> =
            calculation_results.iter().filter_map(|o| o.result()).collect();
        let confidence_level = confidence::confidence_level(results.iter().copied());
        let uncertainty_range = confidence::uncertainty_range(results.iter().copied());
        let text = narrative::generate(&calculation_results);

        let id = RecordId::new();
        let record = AnalysisRecord {
            id,
            risk_id: request.risk_id.clone(),
            methodology: request.methodology,
            created: id.timestamp(),
            seed,
            calculation_results,
            confidence_level,
            uncertainty_range,
            assumptions: text.assumptions,
            limitations: text.limitations,
            recommendations: text.recommendations,
        };

        tracing::info!(
            id = %record.id,
            failed = record.failures().count(),
            confidence = record.confidence_level,
            "analysis finished"
        );
        Ok(record)
    }

    fn evaluate(
        &self,
        kind: EvaluatorKind,
        request: &AnalysisRequest,
        seed: u64,
        control: &RunControl,
    ) -> EngineResult<AnalysisResult> {
        let missing = || EngineError::empty(format!("no {} input supplied", kind));

        match kind {
            EvaluatorKind::MonteCarlo => {
                let params = request.monte_carlo.as_ref().ok_or_else(missing)?;
                self.engine
                    .run(params, Some(seed), control)
                    .map(AnalysisResult::MonteCarlo)
            }
            EvaluatorKind::Fmea => {
                let modes = request.failure_modes.as_ref().ok_or_else(missing)?;
                fmea::evaluate(modes).map(AnalysisResult::Fmea)
            }
            EvaluatorKind::BowTie => {
                let model = request.bow_tie.as_ref().ok_or_else(missing)?;
                bowtie::evaluate(model).map(AnalysisResult::BowTie)
            }
            EvaluatorKind::Scenario => {
                let scenarios = request.scenarios.as_ref().ok_or_else(missing)?;
                scenario::evaluate(scenarios).map(AnalysisResult::Scenario)
            }
            EvaluatorKind::ValueAtRisk => {
                let params = request.value_at_risk.as_ref().ok_or_else(missing)?;
                let mut rng = StdRng::seed_from_u64(seed ^ VAR_STREAM);
                var::estimate(params, &mut rng).map(AnalysisResult::ValueAtRisk)
            }
        }
    }
}
