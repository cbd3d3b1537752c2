//! Analysis record - the immutable output of one analysis run

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::identity::RecordId;
use crate::engine::bowtie::BowTieResult;
use crate::engine::error::{EngineError, ErrorKind};
use crate::engine::fmea::FmeaAnalysis;
use crate::engine::methodology::{EvaluatorKind, Methodology};
use crate::engine::monte_carlo::SimulationResult;
use crate::engine::scenario::ScenarioResult;
use crate::engine::var::VarResult;

/// Closed numeric interval
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Interval {
    pub min: f64,
    pub max: f64,
}

impl Interval {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }
}

impl std::fmt::Display for Interval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:.2}, {:.2}]", self.min, self.max)
    }
}

/// Result of one evaluator, one case per methodology
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "result", rename_all = "snake_case")]
pub enum AnalysisResult {
    MonteCarlo(SimulationResult),
    Fmea(FmeaAnalysis),
    BowTie(BowTieResult),
    Scenario(ScenarioResult),
    ValueAtRisk(VarResult),
}

impl AnalysisResult {
    pub fn kind(&self) -> EvaluatorKind {
        match self {
            AnalysisResult::MonteCarlo(_) => EvaluatorKind::MonteCarlo,
            AnalysisResult::Fmea(_) => EvaluatorKind::Fmea,
            AnalysisResult::BowTie(_) => EvaluatorKind::BowTie,
            AnalysisResult::Scenario(_) => EvaluatorKind::Scenario,
            AnalysisResult::ValueAtRisk(_) => EvaluatorKind::ValueAtRisk,
        }
    }
}

/// Marker recorded in place of a result when an evaluator failed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluatorFailure {
    pub evaluator: EvaluatorKind,
    pub error_kind: ErrorKind,
    pub message: String,
}

impl EvaluatorFailure {
    pub fn new(evaluator: EvaluatorKind, error: &EngineError) -> Self {
        Self {
            evaluator,
            error_kind: error.kind(),
            message: error.to_string(),
        }
    }
}

/// Outcome of one selected evaluator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EvaluatorOutcome {
    Completed(AnalysisResult),
    Failed(EvaluatorFailure),
}

impl EvaluatorOutcome {
    pub fn evaluator(&self) -> EvaluatorKind {
        match self {
            EvaluatorOutcome::Completed(result) => result.kind(),
            EvaluatorOutcome::Failed(failure) => failure.evaluator,
        }
    }

    pub fn result(&self) -> Option<&AnalysisResult> {
        match self {
            EvaluatorOutcome::Completed(result) => Some(result),
            EvaluatorOutcome::Failed(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&EvaluatorFailure> {
        match self {
            EvaluatorOutcome::Completed(_) => None,
            EvaluatorOutcome::Failed(failure) => Some(failure),
        }
    }
}

/// The aggregate produced by one "run analysis" request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    /// Unique identifier (ANL-<ULID>)
    pub id: RecordId,

    /// Identifier of the risk this analysis belongs to
    pub risk_id: String,

    pub methodology: Methodology,

    pub created: DateTime<Utc>,

    /// Seed every random draw in the run was derived from
    pub seed: u64,

    /// One outcome per selected evaluator, in lookup-table order
    pub calculation_results: Vec<EvaluatorOutcome>,

    /// Overall confidence in [0, 0.99]
    pub confidence_level: f64,

    pub uncertainty_range: Option<Interval>,

    pub assumptions: Vec<String>,
    pub limitations: Vec<String>,
    pub recommendations: Vec<String>,
}

impl AnalysisRecord {
    /// Completed results in record order
    pub fn results(&self) -> impl Iterator<Item = &AnalysisResult> {
        self.calculation_results.iter().filter_map(|o| o.result())
    }

    /// Failure markers in record order
    pub fn failures(&self) -> impl Iterator<Item = &EvaluatorFailure> {
        self.calculation_results.iter().filter_map(|o| o.failure())
    }

    pub fn simulation(&self) -> Option<&SimulationResult> {
        self.results().find_map(|r| match r {
            AnalysisResult::MonteCarlo(sim) => Some(sim),
            _ => None,
        })
    }

    pub fn fmea(&self) -> Option<&FmeaAnalysis> {
        self.results().find_map(|r| match r {
            AnalysisResult::Fmea(fmea) => Some(fmea),
            _ => None,
        })
    }

    pub fn bow_tie(&self) -> Option<&BowTieResult> {
        self.results().find_map(|r| match r {
            AnalysisResult::BowTie(bt) => Some(bt),
            _ => None,
        })
    }

    pub fn scenarios(&self) -> Option<&ScenarioResult> {
        self.results().find_map(|r| match r {
            AnalysisResult::Scenario(sc) => Some(sc),
            _ => None,
        })
    }

    pub fn value_at_risk(&self) -> Option<&VarResult> {
        self.results().find_map(|r| match r {
            AnalysisResult::ValueAtRisk(var) => Some(var),
            _ => None,
        })
    }
}
