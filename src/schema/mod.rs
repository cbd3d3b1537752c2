//! Schema system - validation and template generation

pub mod registry;
pub mod template;
pub mod validator;
pub mod wizard;

pub use registry::SchemaRegistry;
pub use template::{TemplateContext, TemplateError, TemplateGenerator};
pub use validator::{SchemaError, SchemaViolation, ValidationError, Validator};
pub use wizard::{SchemaWizard, WizardResult};
