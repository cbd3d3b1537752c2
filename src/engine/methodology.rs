//! Analysis methodologies and the evaluators each one selects

use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Requested analysis methodology
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Methodology {
    #[serde(alias = "montecarlo", alias = "monte-carlo")]
    MonteCarlo,
    #[serde(alias = "failure_mode", alias = "failure_modes")]
    Fmea,
    #[serde(alias = "bowtie", alias = "bow-tie")]
    BowTie,
    #[serde(alias = "scenario_analysis", alias = "scenarios")]
    Scenario,
    #[serde(alias = "var", alias = "value-at-risk")]
    ValueAtRisk,
    #[serde(alias = "quantitative", alias = "all")]
    Comprehensive,
}

/// One of the five evaluators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluatorKind {
    MonteCarlo,
    Fmea,
    BowTie,
    Scenario,
    ValueAtRisk,
}

/// Whether missing input for a selected evaluator is a failure or a skip
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    Required,
    Optional,
}

use EvaluatorKind as E;
use Requirement::{Optional, Required};

const MONTE_CARLO: &[(EvaluatorKind, Requirement)] =
    &[(E::MonteCarlo, Required), (E::ValueAtRisk, Optional)];
const FMEA: &[(EvaluatorKind, Requirement)] = &[(E::Fmea, Required)];
const BOW_TIE: &[(EvaluatorKind, Requirement)] = &[(E::BowTie, Required)];
const SCENARIO: &[(EvaluatorKind, Requirement)] = &[(E::Scenario, Required)];
const VALUE_AT_RISK: &[(EvaluatorKind, Requirement)] = &[(E::ValueAtRisk, Required)];
const COMPREHENSIVE: &[(EvaluatorKind, Requirement)] = &[
    (E::MonteCarlo, Optional),
    (E::Fmea, Optional),
    (E::BowTie, Optional),
    (E::Scenario, Optional),
    (E::ValueAtRisk, Optional),
];

impl Methodology {
    /// Evaluators run for this methodology, in execution order
    pub fn evaluators(&self) -> &'static [(EvaluatorKind, Requirement)] {
        match self {
            Methodology::MonteCarlo => MONTE_CARLO,
            Methodology::Fmea => FMEA,
            Methodology::BowTie => BOW_TIE,
            Methodology::Scenario => SCENARIO,
            Methodology::ValueAtRisk => VALUE_AT_RISK,
            Methodology::Comprehensive => COMPREHENSIVE,
        }
    }

    pub fn all() -> &'static [Methodology] {
        &[
            Methodology::MonteCarlo,
            Methodology::Fmea,
            Methodology::BowTie,
            Methodology::Scenario,
            Methodology::ValueAtRisk,
            Methodology::Comprehensive,
        ]
    }

    /// Canonical identifier, also the template name
    pub fn as_str(&self) -> &'static str {
        match self {
            Methodology::MonteCarlo => "monte_carlo",
            Methodology::Fmea => "fmea",
            Methodology::BowTie => "bow_tie",
            Methodology::Scenario => "scenario",
            Methodology::ValueAtRisk => "value_at_risk",
            Methodology::Comprehensive => "comprehensive",
        }
    }

    /// Human-readable name
    pub fn title(&self) -> &'static str {
        match self {
            Methodology::MonteCarlo => "Monte Carlo Simulation",
            Methodology::Fmea => "Failure Mode and Effects Analysis",
            Methodology::BowTie => "Bow-Tie Analysis",
            Methodology::Scenario => "Scenario Analysis",
            Methodology::ValueAtRisk => "Value at Risk",
            Methodology::Comprehensive => "Comprehensive Analysis",
        }
    }
}

impl std::fmt::Display for Methodology {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Methodology {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "monte_carlo" | "montecarlo" | "monte-carlo" => Ok(Methodology::MonteCarlo),
            "fmea" | "failure_mode" | "failure_modes" => Ok(Methodology::Fmea),
            "bow_tie" | "bowtie" | "bow-tie" => Ok(Methodology::BowTie),
            "scenario" | "scenario_analysis" | "scenarios" => Ok(Methodology::Scenario),
            "value_at_risk" | "var" | "value-at-risk" => Ok(Methodology::ValueAtRisk),
            "comprehensive" | "quantitative" | "all" => Ok(Methodology::Comprehensive),
            _ => Err(format!(
                "Unknown methodology: {}. Use monte_carlo, fmea, bow_tie, scenario, value_at_risk or comprehensive",
                s
            )),
        }
    }
}

impl EvaluatorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            E::MonteCarlo => "monte_carlo",
            E::Fmea => "fmea",
            E::BowTie => "bow_tie",
            E::Scenario => "scenario",
            E::ValueAtRisk => "value_at_risk",
        }
    }

    /// Methodology that runs only this evaluator
    pub fn methodology(&self) -> Methodology {
        match self {
            E::MonteCarlo => Methodology::MonteCarlo,
            E::Fmea => Methodology::Fmea,
            E::BowTie => Methodology::BowTie,
            E::Scenario => Methodology::Scenario,
            E::ValueAtRisk => Methodology::ValueAtRisk,
        }
    }
}

impl std::fmt::Display for EvaluatorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
