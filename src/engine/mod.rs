//! Quantitative risk analysis engine
//!
//! Evaluators are pure functions of their inputs (plus an explicit seed for
//! the sampling ones). The orchestrator picks the evaluators a methodology
//! needs and folds their outcomes into one immutable [`AnalysisRecord`].

pub mod bowtie;
pub mod cancel;
pub mod confidence;
pub mod error;
pub mod fmea;
pub mod methodology;
pub mod monte_carlo;
pub mod narrative;
pub mod orchestrator;
pub mod record;
pub mod sampler;
pub mod scenario;
pub mod stats;
pub mod var;

pub use cancel::{CancellationToken, RunControl};
pub use error::{EngineError, EngineResult, ErrorKind};
pub use methodology::{EvaluatorKind, Methodology, Requirement};
pub use monte_carlo::{MonteCarloEngine, MonteCarloParameters, SimulationResult};
pub use orchestrator::{AnalysisOrchestrator, AnalysisRequest};
pub use record::{AnalysisRecord, AnalysisResult, EvaluatorFailure, EvaluatorOutcome, Interval};
