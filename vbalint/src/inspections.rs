//! Inspection capability contract and the finding model.
//!
//! A concrete rule body lives outside this crate; it plugs in by
//! implementing [`Inspection`] and is consumed through that trait by the
//! [`Inspector`](crate::inspector::Inspector). Rules must be deterministic
//! for a given snapshot and carry no state across passes.

use compact_str::CompactString;
use serde::{Deserialize, Serialize};

use crate::snapshot::{ParseSnapshot, QualifiedSelection, Span};
use crate::CancelToken;

/// How prominently a finding should be surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// The rule is disabled; it is never scheduled in a standard pass.
    DoNotShow,
    /// Barely-visible nudge.
    Hint,
    /// Improvement opportunity.
    Suggestion,
    /// Likely defect.
    Warning,
    /// Definite defect.
    Error,
}

impl Severity {
    /// Canonical display form for this severity.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Severity::DoNotShow => "DoNotShow",
            Severity::Hint => "Hint",
            Severity::Suggestion => "Suggestion",
            Severity::Warning => "Warning",
            Severity::Error => "Error",
        }
    }
}

/// Canonical high-level category for an inspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InspectionCategory {
    /// Probable bugs and correctness hazards.
    CodeQuality,
    /// Newer or clearer language constructs available.
    LanguageOpportunities,
    /// Structure and readability issues.
    MaintainabilityIssues,
    /// Identifier and declaration conventions.
    NamingConventions,
    /// Avoidable run-time cost.
    Performance,
}

impl InspectionCategory {
    /// Canonical display form for this category.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            InspectionCategory::CodeQuality => "CodeQuality",
            InspectionCategory::LanguageOpportunities => "LanguageOpportunities",
            InspectionCategory::MaintainabilityIssues => "MaintainabilityIssues",
            InspectionCategory::NamingConventions => "NamingConventions",
            InspectionCategory::Performance => "Performance",
        }
    }
}

/// A single issue reported by an inspection.
///
/// Immutable once produced; owned by the aggregation collection until the
/// caller consumes it. The optional `context` span is the rewrite anchor a
/// quick fix edits, when it differs from the highlighted target.
#[derive(Debug, Clone, Serialize)]
pub struct InspectionResult {
    /// Name of the inspection that produced the finding.
    pub inspection: CompactString,
    /// Effective severity at the time of the pass.
    pub severity: Severity,
    /// Category of the owning inspection.
    pub category: InspectionCategory,
    /// Where the issue was found.
    pub target: QualifiedSelection,
    /// Human-readable description of the issue.
    pub description: String,
    /// Span of the source context a fix should rewrite, if any.
    pub context: Option<Span>,
}

impl InspectionResult {
    /// Attaches a rewrite-context span to the finding.
    #[must_use]
    pub fn with_context(mut self, context: Span) -> Self {
        self.context = Some(context);
        self
    }

    /// The span a quick fix should edit: the explicit context when present,
    /// otherwise the finding's target span.
    #[must_use]
    pub fn rewrite_anchor(&self) -> Span {
        self.context.unwrap_or(self.target.span)
    }
}

/// A rule evaluation that failed rather than producing findings.
///
/// Recovered locally by the inspector; never fatal to the batch.
#[derive(Debug, Clone, Serialize)]
pub struct InspectionFailure {
    /// Name of the inspection that failed.
    pub inspection: CompactString,
    /// Rendered failure cause.
    pub error: String,
}

/// Read-only context handed to each inspection unit.
///
/// The snapshot is shared across all concurrently running units; the
/// cancellation token should be checked at iteration boundaries by
/// long-running rules.
pub struct AnalysisContext<'a> {
    /// The immutable parse snapshot under analysis.
    pub snapshot: &'a ParseSnapshot,
    /// Cooperative cancellation token for this pass.
    pub cancel: &'a CancelToken,
}

/// Capability contract for a pluggable analysis rule.
///
/// Implementations must be deterministic (same snapshot, same findings),
/// must not mutate the snapshot, and must not observe other inspections'
/// partial results. A failed evaluation returns `Err`; the engine reports
/// it per-inspection and keeps the batch alive.
pub trait Inspection: Send + Sync {
    /// Unique, stable name of the inspection.
    fn name(&self) -> &'static str;

    /// Declared severity. [`Severity::DoNotShow`] excludes the rule from
    /// standard passes.
    fn severity(&self) -> Severity;

    /// Category the inspection belongs to.
    fn category(&self) -> InspectionCategory;

    /// Evaluates the rule against the snapshot, producing zero or more
    /// findings. The returned sequence is finite and produced once per
    /// invocation.
    fn evaluate(&self, ctx: &AnalysisContext<'_>) -> anyhow::Result<Vec<InspectionResult>>;

    /// Builds a finding owned by this inspection.
    fn finding(&self, target: QualifiedSelection, description: impl Into<String>) -> InspectionResult
    where
        Self: Sized,
    {
        InspectionResult {
            inspection: CompactString::new(self.name()),
            severity: self.severity(),
            category: self.category(),
            target,
            description: description.into(),
            context: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::Span;

    struct NamedOnly;

    impl Inspection for NamedOnly {
        fn name(&self) -> &'static str {
            "NamedOnly"
        }

        fn severity(&self) -> Severity {
            Severity::Warning
        }

        fn category(&self) -> InspectionCategory {
            InspectionCategory::CodeQuality
        }

        fn evaluate(&self, _ctx: &AnalysisContext<'_>) -> anyhow::Result<Vec<InspectionResult>> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn test_finding_inherits_inspection_attributes() {
        let inspection = NamedOnly;
        let target = QualifiedSelection::new("Project1.Module1", Span::new(4, 9));
        let result = inspection.finding(target, "unused variable");
        assert_eq!(result.inspection, "NamedOnly");
        assert_eq!(result.severity, Severity::Warning);
        assert_eq!(result.category, InspectionCategory::CodeQuality);
        assert!(result.context.is_none());
        assert_eq!(result.rewrite_anchor(), Span::new(4, 9));
    }

    #[test]
    fn test_rewrite_anchor_prefers_explicit_context() {
        let inspection = NamedOnly;
        let target = QualifiedSelection::new("Project1.Module1", Span::new(4, 9));
        let result = inspection
            .finding(target, "redundant step")
            .with_context(Span::new(0, 17));
        assert_eq!(result.rewrite_anchor(), Span::new(0, 17));
    }

    #[test]
    fn test_severity_ordering_puts_do_not_show_lowest() {
        assert!(Severity::DoNotShow < Severity::Hint);
        assert!(Severity::Warning < Severity::Error);
    }
}
