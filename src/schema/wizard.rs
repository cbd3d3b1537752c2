//! Interactive wizard for new parameter files
//!
//! Prompts are bounded by the analysis schema so the wizard can never
//! produce a starter file that fails validation.

use console::style;
use dialoguer::{theme::ColorfulTheme, Input, Select};
use miette::{IntoDiagnostic, Result};
use serde_json::Value;

use crate::engine::sampler::DistributionKind;
use crate::engine::{EvaluatorKind, Methodology};
use crate::schema::registry::SchemaRegistry;
use crate::schema::template::TemplateContext;

/// Fallback bounds when the schema does not state them
const MIN_ITERATIONS: u64 = 1;
const MAX_ITERATIONS: u64 = 1_000_000;

/// Prompts for the values of a [`TemplateContext`]
pub struct SchemaWizard {
    schema: Value,
    theme: ColorfulTheme,
}

/// Values collected by the wizard
#[derive(Debug, Clone)]
pub struct WizardResult {
    pub risk_id: String,
    pub methodology: Methodology,
    pub seed: Option<u64>,
    pub iterations: Option<u32>,
    pub distribution: Option<DistributionKind>,
}

impl WizardResult {
    /// Build the template context, stamped with `author`
    pub fn into_context(self, author: impl Into<String>) -> TemplateContext {
        let mut ctx = TemplateContext::new(self.methodology, self.risk_id, author);
        if let Some(seed) = self.seed {
            ctx = ctx.with_seed(seed);
        }
        if let Some(iterations) = self.iterations {
            ctx = ctx.with_iterations(iterations);
        }
        if let Some(distribution) = self.distribution {
            ctx = ctx.with_distribution(distribution);
        }
        ctx
    }
}

impl SchemaWizard {
    pub fn new() -> Result<Self> {
        let registry = SchemaRegistry::default();
        let schema_str = registry
            .analysis()
            .ok_or_else(|| miette::miette!("analysis schema is not embedded"))?;
        let schema: Value = serde_json::from_str(&schema_str).into_diagnostic()?;
        Ok(Self {
            schema,
            theme: ColorfulTheme::default(),
        })
    }

    /// Run the wizard; `methodology` skips the methodology prompt when given
    pub fn run(&self, methodology: Option<Methodology>) -> Result<WizardResult> {
        println!();
        println!(
            "{} Creating new {} parameter file",
            style("◆").cyan(),
            style("analysis").bold()
        );
        println!("{}", style("─".repeat(50)).dim());
        println!();

        let risk_id: String = Input::with_theme(&self.theme)
            .with_prompt(self.prompt("Risk ID", "/properties/risk_id"))
            .interact_text()
            .into_diagnostic()?;

        let methodology = match methodology {
            Some(m) => m,
            None => {
                let items: Vec<String> = Methodology::all()
                    .iter()
                    .map(|m| format!("{} ({})", m.as_str(), m.title()))
                    .collect();
                let selection = Select::with_theme(&self.theme)
                    .with_prompt("Methodology")
                    .items(&items)
                    .default(0)
                    .interact()
                    .into_diagnostic()?;
                Methodology::all()[selection]
            }
        };

        let seed: String = Input::with_theme(&self.theme)
            .with_prompt(format!("Seed {}", style("(blank for a fresh seed per run)").dim()))
            .allow_empty(true)
            .validate_with(|input: &String| -> std::result::Result<(), String> {
                if input.trim().is_empty() || input.trim().parse::<u64>().is_ok() {
                    Ok(())
                } else {
                    Err("Seed must be a non-negative integer".to_string())
                }
            })
            .interact_text()
            .into_diagnostic()?;
        let seed = seed.trim().parse::<u64>().ok();

        let simulates = methodology
            .evaluators()
            .iter()
            .any(|(kind, _)| *kind == EvaluatorKind::MonteCarlo);

        let (iterations, distribution) = if simulates {
            (Some(self.prompt_iterations()?), Some(self.prompt_distribution()?))
        } else {
            (None, None)
        };

        println!();
        println!("{} Values collected!", style("✓").green());

        Ok(WizardResult {
            risk_id: risk_id.trim().to_string(),
            methodology,
            seed,
            iterations,
            distribution,
        })
    }

    fn prompt_iterations(&self) -> Result<u32> {
        let bounds = self.schema.pointer("/$defs/monte_carlo/properties/iterations");
        let minimum = bounds
            .and_then(|b| b.get("minimum"))
            .and_then(Value::as_u64)
            .unwrap_or(MIN_ITERATIONS);
        let maximum = bounds
            .and_then(|b| b.get("maximum"))
            .and_then(Value::as_u64)
            .unwrap_or(MAX_ITERATIONS);

        let value: String = Input::with_theme(&self.theme)
            .with_prompt(format!("Iterations ({}..={})", minimum, maximum))
            .default("10000".to_string())
            .validate_with(move |input: &String| -> std::result::Result<(), String> {
                match input.trim().parse::<u64>() {
                    Ok(n) if (minimum..=maximum).contains(&n) => Ok(()),
                    _ => Err(format!("Enter a whole number between {} and {}", minimum, maximum)),
                }
            })
            .interact_text()
            .into_diagnostic()?;

        value.trim().parse::<u32>().into_diagnostic()
    }

    fn prompt_distribution(&self) -> Result<DistributionKind> {
        let kinds = DistributionKind::all();
        let items: Vec<String> = kinds.iter().map(|k| k.to_string()).collect();
        let selection = Select::with_theme(&self.theme)
            .with_prompt("Probability distribution")
            .items(&items)
            .default(0)
            .interact()
            .into_diagnostic()?;
        Ok(kinds[selection])
    }

    /// Label with the schema's description, if any
    fn prompt(&self, label: &str, pointer: &str) -> String {
        match self
            .schema
            .pointer(pointer)
            .and_then(|p| p.get("description"))
            .and_then(Value::as_str)
        {
            Some(desc) => format!("{} ({})", label, style(desc).dim()),
            None => label.to_string(),
        }
    }
}
