//! FMEA (Failure Mode and Effects Analysis) evaluation

use serde::{Deserialize, Serialize};

use crate::engine::error::{EngineError, EngineResult};

/// A failure mode rated on severity, occurrence and detection (1-10 each)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureMode {
    /// How the failure manifests
    pub name: String,

    /// Root causes or mechanisms
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub causes: Vec<String>,

    /// Consequences of the failure
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub effects: Vec<String>,

    /// Severity rating 1-10 (S)
    pub severity: u8,

    /// Occurrence rating 1-10 (O)
    pub occurrence: u8,

    /// Detection difficulty rating 1-10 (D)
    pub detection: u8,

    /// Controls already in place
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub current_controls: Vec<String>,

    /// Actions already proposed by the analyst
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub recommended_actions: Vec<String>,
}

impl FailureMode {
    /// Create a failure mode with the given ratings
    pub fn new(name: impl Into<String>, severity: u8, occurrence: u8, detection: u8) -> Self {
        Self {
            name: name.into(),
            causes: Vec::new(),
            effects: Vec::new(),
            severity,
            occurrence,
            detection,
            current_controls: Vec::new(),
            recommended_actions: Vec::new(),
        }
    }

    /// Risk Priority Number = S x O x D
    pub fn rpn(&self) -> u16 {
        self.severity as u16 * self.occurrence as u16 * self.detection as u16
    }

    fn validate(&self, index: usize) -> EngineResult<()> {
        for (label, value) in [
            ("severity", self.severity),
            ("occurrence", self.occurrence),
            ("detection", self.detection),
        ] {
            if !(1..=10).contains(&value) {
                return Err(EngineError::invalid(
                    format!("failure_modes[{}].{}", index, label),
                    format!("must be between 1 and 10, got {}", value),
                ));
            }
        }
        Ok(())
    }
}

/// Criticality tier derived from the RPN
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Criticality {
    #[serde(rename = "Very Low")]
    VeryLow,
    Low,
    Medium,
    High,
    Critical,
}

impl Criticality {
    /// Fixed thresholds: 200 / 100 / 50 / 20
    pub fn from_rpn(rpn: u16) -> Self {
        match rpn {
            200.. => Criticality::Critical,
            100..=199 => Criticality::High,
            50..=99 => Criticality::Medium,
            20..=49 => Criticality::Low,
            _ => Criticality::VeryLow,
        }
    }

    /// Action urgency for this tier
    pub fn action(&self) -> &'static str {
        match self {
            Criticality::Critical => "Immediate action required",
            Criticality::High => "Action required",
            Criticality::Medium => "Action recommended",
            Criticality::Low => "Monitor",
            Criticality::VeryLow => "No action required",
        }
    }

    pub fn all() -> &'static [Criticality] {
        &[
            Criticality::Critical,
            Criticality::High,
            Criticality::Medium,
            Criticality::Low,
            Criticality::VeryLow,
        ]
    }
}

impl std::fmt::Display for Criticality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Criticality::Critical => write!(f, "Critical"),
            Criticality::High => write!(f, "High"),
            Criticality::Medium => write!(f, "Medium"),
            Criticality::Low => write!(f, "Low"),
            Criticality::VeryLow => write!(f, "Very Low"),
        }
    }
}

/// Evaluation of one failure mode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FmeaResult {
    pub failure_mode: FailureMode,
    pub rpn: u16,
    pub criticality: Criticality,
    pub action: String,
    /// min(100, RPN / 10)
    pub risk_score: f64,
    pub recommendations: Vec<String>,
}

/// Count of failure modes per criticality tier
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CriticalityCounts {
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub very_low: usize,
}

impl CriticalityCounts {
    fn record(&mut self, criticality: Criticality) {
        match criticality {
            Criticality::Critical => self.critical += 1,
            Criticality::High => self.high += 1,
            Criticality::Medium => self.medium += 1,
            Criticality::Low => self.low += 1,
            Criticality::VeryLow => self.very_low += 1,
        }
    }

    pub fn get(&self, criticality: Criticality) -> usize {
        match criticality {
            Criticality::Critical => self.critical,
            Criticality::High => self.high,
            Criticality::Medium => self.medium,
            Criticality::Low => self.low,
            Criticality::VeryLow => self.very_low,
        }
    }
}

/// Portfolio-level summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FmeaSummary {
    pub total_modes: usize,
    pub total_rpn: u32,
    pub average_rpn: f64,
    pub max_rpn: u16,
    /// Name of the first mode with the highest RPN
    pub highest_risk_mode: String,
    pub by_criticality: CriticalityCounts,
}

/// Results for every mode (input order) plus the summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FmeaAnalysis {
    pub results: Vec<FmeaResult>,
    pub summary: FmeaSummary,
}

impl FmeaAnalysis {
    /// Results ordered by RPN, highest first (stable for ties)
    pub fn ranked(&self) -> Vec<&FmeaResult> {
        let mut ranked: Vec<&FmeaResult> = self.results.iter().collect();
        ranked.sort_by(|a, b| b.rpn.cmp(&a.rpn));
        ranked
    }
}

/// Check ratings and names without evaluating
pub fn validate(modes: &[FailureMode]) -> EngineResult<()> {
    if modes.is_empty() {
        return Err(EngineError::empty("failure mode list is empty"));
    }
    for (i, mode) in modes.iter().enumerate() {
        mode.validate(i)?;
    }
    Ok(())
}

/// Evaluate a list of failure modes
pub fn evaluate(modes: &[FailureMode]) -> EngineResult<FmeaAnalysis> {
    validate(modes)?;

    let results: Vec<FmeaResult> = modes.iter().map(evaluate_mode).collect();

    let mut by_criticality = CriticalityCounts::default();
    let mut total_rpn: u32 = 0;
    let mut top = &results[0];
    for result in &results {
        by_criticality.record(result.criticality);
        total_rpn += result.rpn as u32;
        if result.rpn > top.rpn {
            top = result;
        }
    }

    let summary = FmeaSummary {
        total_modes: results.len(),
        total_rpn,
        average_rpn: total_rpn as f64 / results.len() as f64,
        max_rpn: top.rpn,
        highest_risk_mode: top.failure_mode.name.clone(),
        by_criticality,
    };

    Ok(FmeaAnalysis { results, summary })
}

fn evaluate_mode(mode: &FailureMode) -> FmeaResult {
    let rpn = mode.rpn();
    let criticality = Criticality::from_rpn(rpn);

    FmeaResult {
        failure_mode: mode.clone(),
        rpn,
        criticality,
        action: criticality.action().to_string(),
        risk_score: (rpn as f64 / 10.0).min(100.0),
        recommendations: recommendations_for(mode, rpn),
    }
}

fn recommendations_for(mode: &FailureMode, rpn: u16) -> Vec<String> {
    let mut out = Vec::new();

    if mode.severity >= 8 {
        out.push(format!(
            "Implement critical safety controls to limit the severity of '{}'",
            mode.name
        ));
    }
    if mode.occurrence >= 7 {
        out.push(format!(
            "Strengthen preventive controls to reduce the occurrence of '{}'",
            mode.name
        ));
    }
    if mode.detection >= 7 {
        out.push(format!(
            "Improve detection systems so '{}' is caught before it reaches the customer",
            mode.name
        ));
    }
    if rpn >= 200 {
        out.push(format!(
            "Mandatory immediate corrective action: RPN {} is at or above the critical threshold",
            rpn
        ));
    }
    if out.is_empty() {
        out.push("Maintain current controls and review periodically".to_string());
    }

    out
}
