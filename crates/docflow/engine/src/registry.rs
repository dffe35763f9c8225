//! Definition registry: publishes and serves workflow definitions
//!
//! Definitions are immutable once published. Publishing validates the
//! whole definition (structure and every guard expression), assigns
//! the next version for the document type, and compiles each guard
//! source to its AST exactly once. Instances bind to the version that
//! was active at submission and are served that version for life.

use docflow_guard::{parse, Expr};
use docflow_types::{
    DocumentType, ValidationIssue, WorkflowDefinition, WorkflowError, WorkflowResult,
};
use std::collections::HashMap;
use std::sync::Arc;

/// A published definition with its guards compiled to ASTs
#[derive(Clone, Debug)]
pub struct CompiledDefinition {
    /// The frozen definition
    pub definition: WorkflowDefinition,
    /// Guard ASTs keyed by their source text
    guards: HashMap<String, Expr>,
}

impl CompiledDefinition {
    /// Look up the compiled AST for a guard source
    pub fn guard(&self, source: &str) -> Option<&Expr> {
        self.guards.get(source)
    }
}

/// Registry of published workflow definitions
#[derive(Debug, Default)]
pub struct DefinitionRegistry {
    published: HashMap<DocumentType, Vec<Arc<CompiledDefinition>>>,
}

impl DefinitionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate a definition without publishing it
    ///
    /// Collects every problem rather than stopping at the first, so an
    /// administrator fixes a definition in one round trip.
    pub fn validate(definition: &WorkflowDefinition) -> Vec<ValidationIssue> {
        let mut issues = definition.validate();

        for source in guard_sources(definition) {
            if let Err(error) = parse(source) {
                issues.push(ValidationIssue::InvalidGuard {
                    guard: source.to_string(),
                    message: error.to_string(),
                });
            }
        }

        issues
    }

    /// Validate, version, compile, and store a definition
    ///
    /// Returns the assigned version. The definition's own `version`
    /// field is overwritten; versions count up from 1 per document
    /// type.
    pub fn publish(&mut self, mut definition: WorkflowDefinition) -> WorkflowResult<u32> {
        let issues = Self::validate(&definition);
        if !issues.is_empty() {
            return Err(WorkflowError::ValidationFailed(issues));
        }

        let versions = self
            .published
            .entry(definition.document_type.clone())
            .or_default();
        let version = versions.len() as u32 + 1;
        definition.version = version;

        let guards = compile_guards(&definition);
        let document_type = definition.document_type.clone();
        versions.push(Arc::new(CompiledDefinition { definition, guards }));

        tracing::info!(
            document_type = %document_type,
            version = version,
            "Workflow definition published"
        );
        Ok(version)
    }

    /// The latest published version for a document type
    pub fn active(&self, document_type: &DocumentType) -> WorkflowResult<Arc<CompiledDefinition>> {
        self.published
            .get(document_type)
            .and_then(|versions| versions.last())
            .cloned()
            .ok_or_else(|| WorkflowError::DefinitionNotFound(document_type.clone()))
    }

    /// A specific published version, serving instances bound to it
    pub fn get(
        &self,
        document_type: &DocumentType,
        version: u32,
    ) -> WorkflowResult<Arc<CompiledDefinition>> {
        self.published
            .get(document_type)
            .and_then(|versions| versions.get(version.checked_sub(1)? as usize))
            .cloned()
            .ok_or_else(|| WorkflowError::VersionNotFound {
                document_type: document_type.clone(),
                version,
            })
    }

    /// Number of published versions for a document type
    pub fn version_count(&self, document_type: &DocumentType) -> usize {
        self.published
            .get(document_type)
            .map(|versions| versions.len())
            .unwrap_or(0)
    }

    /// Document types with at least one published version
    pub fn document_types(&self) -> Vec<&DocumentType> {
        self.published.keys().collect()
    }
}

/// Every guard source a definition carries
fn guard_sources(definition: &WorkflowDefinition) -> impl Iterator<Item = &str> {
    let transition_guards = definition
        .transitions
        .iter()
        .flat_map(|t| t.candidates.iter())
        .filter_map(|c| c.guard.as_deref());
    let escalation_guards = definition
        .escalation_rules
        .iter()
        .filter_map(|r| r.guard.as_deref());
    let delegation_triggers = definition
        .delegation_rules
        .iter()
        .map(|r| r.trigger.as_str());

    transition_guards
        .chain(escalation_guards)
        .chain(delegation_triggers)
}

fn compile_guards(definition: &WorkflowDefinition) -> HashMap<String, Expr> {
    let mut guards = HashMap::new();
    for source in guard_sources(definition) {
        if guards.contains_key(source) {
            continue;
        }
        // Validation already accepted every source
        if let Ok(expr) = parse(source) {
            guards.insert(source.to_string(), expr);
        }
    }
    guards
}
