//! Bow-Tie causal risk model
//!
//! Threats reach the central event through preventive barriers; the central
//! event reaches its consequences through protective barriers. Each path is
//! reduced by the combined effectiveness `1 - prod(1 - e)` of the barriers
//! it names.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::engine::error::{require_finite, require_unit_interval, EngineError, EngineResult};

/// An event that can trigger the central event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Threat {
    pub name: String,
    /// Base probability in [0, 1]
    pub probability: f64,
    /// Names of preventive barriers on this path
    #[serde(default)]
    pub barriers: Vec<String>,
}

/// An outcome of the central event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Consequence {
    pub name: String,
    /// Base impact (monetary, non-negative)
    pub impact: f64,
    /// Names of protective barriers on this path
    #[serde(default)]
    pub barriers: Vec<String>,
}

/// A control on either side of the bow-tie
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Barrier {
    pub name: String,
    /// Effectiveness in [0, 1]
    pub effectiveness: f64,
    /// Other barriers or systems this one relies on
    #[serde(default)]
    pub dependencies: Vec<String>,
}

/// Full bow-tie diagram
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BowTieModel {
    pub central_event: String,
    #[serde(default)]
    pub threats: Vec<Threat>,
    #[serde(default)]
    pub consequences: Vec<Consequence>,
    #[serde(default)]
    pub preventive_barriers: Vec<Barrier>,
    #[serde(default)]
    pub protective_barriers: Vec<Barrier>,
}

/// Side of the central event a barrier sits on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BarrierSide {
    Preventive,
    Protective,
}

impl std::fmt::Display for BarrierSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BarrierSide::Preventive => write!(f, "preventive"),
            BarrierSide::Protective => write!(f, "protective"),
        }
    }
}

/// Criticality tier of a barrier, from its effectiveness
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BarrierCriticality {
    Medium,
    High,
    Critical,
}

impl BarrierCriticality {
    /// `> 0.9` Critical, `> 0.7` High, else Medium
    pub fn from_effectiveness(effectiveness: f64) -> Self {
        if effectiveness > 0.9 {
            BarrierCriticality::Critical
        } else if effectiveness > 0.7 {
            BarrierCriticality::High
        } else {
            BarrierCriticality::Medium
        }
    }
}

impl std::fmt::Display for BarrierCriticality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BarrierCriticality::Critical => write!(f, "Critical"),
            BarrierCriticality::High => write!(f, "High"),
            BarrierCriticality::Medium => write!(f, "Medium"),
        }
    }
}

/// Criticality assessment of one barrier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarrierAssessment {
    pub name: String,
    pub side: BarrierSide,
    pub effectiveness: f64,
    pub criticality: BarrierCriticality,
    /// True when the barrier has no dependencies
    pub single_point_of_failure: bool,
}

/// Residual value along one threat or consequence path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathResidual {
    pub name: String,
    /// Base probability (threats) or impact (consequences)
    pub initial: f64,
    pub combined_effectiveness: f64,
    pub residual: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BowTieResult {
    pub central_event: String,
    pub threat_paths: Vec<PathResidual>,
    pub consequence_paths: Vec<PathResidual>,
    /// Sum of residual threat probabilities (not capped at 1)
    pub aggregated_threat_probability: f64,
    pub aggregated_consequence_impact: f64,
    pub initial_risk: f64,
    pub residual_risk: f64,
    /// `None` when the initial risk is zero
    pub risk_reduction_percent: Option<f64>,
    pub barrier_criticality: Vec<BarrierAssessment>,
}

impl BowTieResult {
    /// Barriers with no dependencies rated High or Critical
    pub fn critical_single_points(&self) -> impl Iterator<Item = &BarrierAssessment> {
        self.barrier_criticality.iter().filter(|b| {
            b.single_point_of_failure && b.criticality >= BarrierCriticality::High
        })
    }
}

/// Evaluate a bow-tie model
pub fn evaluate(model: &BowTieModel) -> EngineResult<BowTieResult> {
    validate(model)?;

    let preventive = index(&model.preventive_barriers);
    let protective = index(&model.protective_barriers);

    let threat_paths: Vec<PathResidual> = model
        .threats
        .iter()
        .map(|t| path(&t.name, t.probability, &t.barriers, &preventive, BarrierSide::Preventive))
        .collect();
    let consequence_paths: Vec<PathResidual> = model
        .consequences
        .iter()
        .map(|c| path(&c.name, c.impact, &c.barriers, &protective, BarrierSide::Protective))
        .collect();

    let aggregated_threat_probability: f64 = threat_paths.iter().map(|p| p.residual).sum();
    let aggregated_consequence_impact: f64 = consequence_paths.iter().map(|p| p.residual).sum();

    let total_probability: f64 = model.threats.iter().map(|t| t.probability).sum();
    let total_impact: f64 = model.consequences.iter().map(|c| c.impact).sum();
    let initial_risk = total_probability * total_impact;
    let residual_risk = aggregated_threat_probability * aggregated_consequence_impact;
    let risk_reduction_percent =
        (initial_risk > 0.0).then(|| (initial_risk - residual_risk) / initial_risk * 100.0);

    let barrier_criticality = model
        .preventive_barriers
        .iter()
        .map(|b| assess(b, BarrierSide::Preventive))
        .chain(
            model
                .protective_barriers
                .iter()
                .map(|b| assess(b, BarrierSide::Protective)),
        )
        .collect();

    Ok(BowTieResult {
        central_event: model.central_event.clone(),
        threat_paths,
        consequence_paths,
        aggregated_threat_probability,
        aggregated_consequence_impact,
        initial_risk,
        residual_risk,
        risk_reduction_percent,
        barrier_criticality,
    })
}

/// Structural and range checks on a model
pub fn validate(model: &BowTieModel) -> EngineResult<()> {
    if model.threats.is_empty() {
        return Err(EngineError::empty("bow-tie model has no threats"));
    }
    if model.preventive_barriers.is_empty() && model.protective_barriers.is_empty() {
        return Err(EngineError::empty("bow-tie model has no barriers"));
    }

    for (i, t) in model.threats.iter().enumerate() {
        require_unit_interval(&format!("threats[{}].probability", i), t.probability)?;
    }
    for (i, c) in model.consequences.iter().enumerate() {
        let field = format!("consequences[{}].impact", i);
        require_finite(&field, c.impact)?;
        if c.impact < 0.0 {
            return Err(EngineError::invalid(field, "must not be negative"));
        }
    }
    for (label, barriers) in [
        ("preventive_barriers", &model.preventive_barriers),
        ("protective_barriers", &model.protective_barriers),
    ] {
        for (i, b) in barriers.iter().enumerate() {
            require_unit_interval(&format!("{}[{}].effectiveness", label, i), b.effectiveness)?;
        }
    }
    Ok(())
}

fn index(barriers: &[Barrier]) -> HashMap<&str, f64> {
    barriers
        .iter()
        .map(|b| (b.name.as_str(), b.effectiveness))
        .collect()
}

fn path(
    name: &str,
    initial: f64,
    barrier_names: &[String],
    barriers: &HashMap<&str, f64>,
    side: BarrierSide,
) -> PathResidual {
    let mut pass_through = 1.0;
    let mut seen: HashSet<&str> = HashSet::new();
    for barrier in barrier_names {
        // A barrier listed twice on one path still acts once
        if !seen.insert(barrier.as_str()) {
            tracing::warn!(
                path = name,
                barrier = barrier.as_str(),
                side = ?side,
                "path lists a barrier more than once; counting it once"
            );
            continue;
        }
        match barriers.get(barrier.as_str()) {
            Some(effectiveness) => pass_through *= 1.0 - effectiveness,
            None => tracing::warn!(
                path = name,
                barrier = barrier.as_str(),
                side = ?side,
                "path references an unknown barrier; ignoring it"
            ),
        }
    }
    let combined_effectiveness = 1.0 - pass_through;

    PathResidual {
        name: name.to_string(),
        initial,
        combined_effectiveness,
        residual: initial * pass_through,
    }
}

fn assess(barrier: &Barrier, side: BarrierSide) -> BarrierAssessment {
    BarrierAssessment {
        name: barrier.name.clone(),
        side,
        effectiveness: barrier.effectiveness,
        criticality: BarrierCriticality::from_effectiveness(barrier.effectiveness),
        single_point_of_failure: barrier.dependencies.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn barrier(name: &str, effectiveness: f64, dependencies: &[&str]) -> Barrier {
        Barrier {
            name: name.to_string(),
            effectiveness,
            dependencies: dependencies.iter().map(|d| d.to_string()).collect(),
        }
    }

    fn threat(name: &str, probability: f64, barriers: &[&str]) -> Threat {
        Threat {
            name: name.to_string(),
            probability,
            barriers: barriers.iter().map(|b| b.to_string()).collect(),
        }
    }

    fn consequence(name: &str, impact: f64, barriers: &[&str]) -> Consequence {
        Consequence {
            name: name.to_string(),
            impact,
            barriers: barriers.iter().map(|b| b.to_string()).collect(),
        }
    }

    fn model() -> BowTieModel {
        BowTieModel {
            central_event: "Loss of containment".to_string(),
            threats: vec![
                threat("Corrosion", 0.5, &["Inspection"]),
                threat("Overpressure", 0.2, &["Relief valve", "Inspection"]),
            ],
            consequences: vec![
                consequence("Fire", 1_000_000.0, &["Deluge"]),
                consequence("Spill", 200_000.0, &[]),
            ],
            preventive_barriers: vec![
                barrier("Inspection", 0.8, &["Inspection schedule"]),
                barrier("Relief valve", 0.95, &[]),
            ],
            protective_barriers: vec![barrier("Deluge", 0.75, &[])],
        }
    }

    #[test]
    fn test_single_barrier_residual() {
        let m = BowTieModel {
            central_event: "Event".to_string(),
            threats: vec![threat("T", 0.5, &["B"])],
            consequences: vec![],
            preventive_barriers: vec![barrier("B", 0.8, &[])],
            protective_barriers: vec![],
        };
        let result = evaluate(&m).unwrap();
        assert!((result.threat_paths[0].residual - 0.1).abs() < 1e-12);
        assert!((result.aggregated_threat_probability - 0.1).abs() < 1e-12);
        assert_eq!(result.initial_risk, 0.0);
        assert_eq!(result.risk_reduction_percent, None);
    }

    #[test]
    fn test_combined_effectiveness_and_aggregates() {
        let result = evaluate(&model()).unwrap();

        // 1 - (1 - 0.95)(1 - 0.8) = 0.99
        let overpressure = &result.threat_paths[1];
        assert!((overpressure.combined_effectiveness - 0.99).abs() < 1e-12);
        assert!((overpressure.residual - 0.002).abs() < 1e-12);

        assert!((result.aggregated_threat_probability - 0.102).abs() < 1e-12);
        assert!((result.aggregated_consequence_impact - 450_000.0).abs() < 1e-6);
        assert!((result.initial_risk - 0.7 * 1_200_000.0).abs() < 1e-6);
        assert!((result.residual_risk - 0.102 * 450_000.0).abs() < 1e-6);

        let expected = (840_000.0 - 45_900.0) / 840_000.0 * 100.0;
        assert!((result.risk_reduction_percent.unwrap() - expected).abs() < 1e-9);
    }

    #[test]
    fn test_barrier_criticality() {
        let result = evaluate(&model()).unwrap();
        let by_name: HashMap<&str, &BarrierAssessment> = result
            .barrier_criticality
            .iter()
            .map(|b| (b.name.as_str(), b))
            .collect();

        assert_eq!(by_name["Inspection"].criticality, BarrierCriticality::High);
        assert!(!by_name["Inspection"].single_point_of_failure);
        assert_eq!(by_name["Relief valve"].criticality, BarrierCriticality::Critical);
        assert!(by_name["Relief valve"].single_point_of_failure);
        assert_eq!(by_name["Deluge"].side, BarrierSide::Protective);

        let spofs: Vec<&str> = result.critical_single_points().map(|b| b.name.as_str()).collect();
        assert_eq!(spofs, vec!["Relief valve", "Deluge"]);

        assert_eq!(BarrierCriticality::from_effectiveness(0.9), BarrierCriticality::High);
        assert_eq!(BarrierCriticality::from_effectiveness(0.7), BarrierCriticality::Medium);
    }

    #[test]
    fn test_unknown_barrier_is_ignored() {
        let mut m = model();
        m.threats[0].barriers.push("Does not exist".to_string());
        let result = evaluate(&m).unwrap();
        assert!((result.threat_paths[0].residual - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_repeated_barrier_counts_once() {
        let m = BowTieModel {
            central_event: "Event".to_string(),
            threats: vec![threat("T", 0.5, &["B", "B"])],
            consequences: vec![consequence("C", 1000.0, &["P", "P", "P"])],
            preventive_barriers: vec![barrier("B", 0.8, &[])],
            protective_barriers: vec![barrier("P", 0.5, &[])],
        };
        let result = evaluate(&m).unwrap();
        assert!((result.threat_paths[0].residual - 0.1).abs() < 1e-12);
        assert!((result.threat_paths[0].combined_effectiveness - 0.8).abs() < 1e-12);
        assert!((result.consequence_paths[0].residual - 500.0).abs() < 1e-9);
    }

    #[test]
    fn test_aggregate_is_not_capped() {
        let m = BowTieModel {
            central_event: "Outage".to_string(),
            threats: vec![
                threat("A", 0.9, &[]),
                threat("B", 0.8, &[]),
            ],
            consequences: vec![consequence("Downtime", 10.0, &[])],
            preventive_barriers: vec![barrier("Unused", 0.5, &[])],
            protective_barriers: vec![],
        };
        let result = evaluate(&m).unwrap();
        assert!((result.aggregated_threat_probability - 1.7).abs() < 1e-12);
    }

    #[test]
    fn test_empty_inputs_rejected() {
        let mut m = model();
        m.threats.clear();
        assert!(matches!(evaluate(&m), Err(EngineError::EmptyInput { .. })));

        let mut m = model();
        m.preventive_barriers.clear();
        m.protective_barriers.clear();
        assert!(matches!(evaluate(&m), Err(EngineError::EmptyInput { .. })));
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut m = model();
        m.threats[0].probability = 1.2;
        assert!(matches!(evaluate(&m), Err(EngineError::InvalidParameter { .. })));

        let mut m = model();
        m.consequences[0].impact = -1.0;
        assert!(evaluate(&m).is_err());

        let mut m = model();
        m.protective_barriers[0].effectiveness = f64::NAN;
        assert!(evaluate(&m).is_err());
    }

    #[test]
    fn test_evaluation_is_idempotent() {
        let m = model();
        assert_eq!(evaluate(&m).unwrap(), evaluate(&m).unwrap());
    }

    #[test]
    fn test_model_from_yaml() {
        let yaml = r#"
central_event: Data breach
threats:
  - name: Phishing
    probability: 0.3
    barriers: [Awareness training]
consequences:
  - name: Regulatory fine
    impact: 250000
preventive_barriers:
  - name: Awareness training
    effectiveness: 0.6
"#;
        let m: BowTieModel = serde_yml::from_str(yaml).unwrap();
        assert!(m.protective_barriers.is_empty());
        let result = evaluate(&m).unwrap();
        assert!((result.aggregated_threat_probability - 0.12).abs() < 1e-12);
    }
}
