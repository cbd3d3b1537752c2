//! Starter parameter files rendered from embedded templates

use chrono::{DateTime, Utc};
use rust_embed::Embed;
use tera::Tera;
use thiserror::Error;

use crate::engine::sampler::DistributionKind;
use crate::engine::Methodology;

#[derive(Embed)]
#[folder = "templates/"]
struct EmbeddedTemplates;

/// Context for template generation
#[derive(Debug, Clone)]
pub struct TemplateContext {
    pub methodology: Methodology,
    pub risk_id: String,
    pub author: String,
    pub created: DateTime<Utc>,
    pub seed: Option<u64>,
    pub iterations: u32,
    pub distribution: DistributionKind,
}

impl TemplateContext {
    pub fn new(methodology: Methodology, risk_id: impl Into<String>, author: impl Into<String>) -> Self {
        Self {
            methodology,
            risk_id: risk_id.into(),
            author: author.into(),
            created: Utc::now(),
            seed: None,
            iterations: 10_000,
            distribution: DistributionKind::Normal,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_iterations(mut self, iterations: u32) -> Self {
        self.iterations = iterations;
        self
    }

    pub fn with_distribution(mut self, distribution: DistributionKind) -> Self {
        self.distribution = distribution;
        self
    }

    fn to_tera(&self) -> tera::Context {
        let mut context = tera::Context::new();
        context.insert("methodology", self.methodology.as_str());
        context.insert("title", self.methodology.title());
        context.insert("risk_id", &self.risk_id);
        context.insert("author", &self.author);
        context.insert("created", &self.created.to_rfc3339());
        context.insert("created_date", &self.created.format("%Y-%m-%d").to_string());
        context.insert("iterations", &self.iterations);
        context.insert("distribution", &self.distribution.to_string());
        context.insert("seed", &self.seed);
        context
    }
}

/// Template generator for parameter files
pub struct TemplateGenerator {
    tera: Tera,
}

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("Template not found: {0}")]
    NotFound(String),

    #[error("Template rendering error: {0}")]
    RenderError(String),
}

impl TemplateGenerator {
    /// Create a new template generator with embedded templates
    pub fn new() -> Result<Self, TemplateError> {
        let mut tera = Tera::default();

        let templates: Vec<(String, String)> = EmbeddedTemplates::iter()
            .filter_map(|name| {
                let file = EmbeddedTemplates::get(&name)?;
                let body = std::str::from_utf8(&file.data).ok()?.to_string();
                Some((name.into_owned(), body))
            })
            .collect();

        // Partials are included by name, so register everything at once
        tera.add_raw_templates(templates)
            .map_err(|e| TemplateError::RenderError(e.to_string()))?;

        Ok(Self { tera })
    }

    /// Render the starter file for the context's methodology
    pub fn generate(&self, ctx: &TemplateContext) -> Result<String, TemplateError> {
        let name = template_name(ctx.methodology);
        if !self.tera.get_template_names().any(|n| n == name) {
            return Err(TemplateError::NotFound(name));
        }
        self.tera
            .render(&name, &ctx.to_tera())
            .map_err(|e| TemplateError::RenderError(e.to_string()))
    }
}

fn template_name(methodology: Methodology) -> String {
    format!("{}.yaml.tera", methodology.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{AnalysisOrchestrator, AnalysisRequest, RunControl};
    use crate::schema::{SchemaRegistry, Validator};

    #[test]
    fn test_every_methodology_has_a_template() {
        let generator = TemplateGenerator::new().unwrap();
        for methodology in Methodology::all() {
            let ctx = TemplateContext::new(*methodology, "RISK-001", "test");
            assert!(generator.generate(&ctx).is_ok(), "{} template", methodology);
        }
    }

    #[test]
    fn test_rendered_templates_validate_and_run() {
        let generator = TemplateGenerator::new().unwrap();
        let validator = Validator::new(&SchemaRegistry::default()).unwrap();
        let orchestrator = AnalysisOrchestrator::new();

        for methodology in Methodology::all() {
            let ctx = TemplateContext::new(*methodology, "RISK-001", "test")
                .with_seed(7)
                .with_iterations(500);
            let yaml = generator.generate(&ctx).unwrap();

            validator.validate(&yaml, "starter.tra.yaml").unwrap();
            let request: AnalysisRequest = serde_yml::from_str(&yaml).unwrap();
            assert_eq!(request.methodology, *methodology);
            assert_eq!(request.seed, Some(7));

            let record = orchestrator.run(&request, &RunControl::new()).unwrap();
            assert!(record.failures().next().is_none(), "{} template failed", methodology);
        }
    }

    #[test]
    fn test_seed_left_commented_when_absent() {
        let generator = TemplateGenerator::new().unwrap();
        let ctx = TemplateContext::new(Methodology::ValueAtRisk, "RISK-002", "test");
        let yaml = generator.generate(&ctx).unwrap();
        let request: AnalysisRequest = serde_yml::from_str(&yaml).unwrap();
        assert_eq!(request.seed, None);
        assert!(yaml.contains("# seed:"));
    }

    #[test]
    fn test_distribution_is_rendered() {
        let generator = TemplateGenerator::new().unwrap();
        let ctx = TemplateContext::new(Methodology::MonteCarlo, "RISK-003", "test")
            .with_distribution(DistributionKind::Beta);
        let yaml = generator.generate(&ctx).unwrap();
        let request: AnalysisRequest = serde_yml::from_str(&yaml).unwrap();
        let params = request.monte_carlo.unwrap();
        assert_eq!(params.distribution, DistributionKind::Beta);
        assert_eq!(params.iterations, 10_000);
    }
}
