//! TRA: Tessera Risk Analysis
//!
//! Quantitative risk metrics (Monte Carlo simulation, FMEA, Bow-Tie,
//! scenario analysis and Value-at-Risk) computed from plain-text parameter
//! files.

pub mod cli;
pub mod core;
pub mod engine;
pub mod schema;
pub mod yaml;
