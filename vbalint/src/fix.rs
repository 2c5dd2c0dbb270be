//! Quick-fix contract and the fix-application workflow.
//!
//! A quick fix converts a finding into edits against a [`RewriteSession`];
//! it records, it never commits. Fix application runs strictly after the
//! analysis phase, with single-writer discipline per session: each `apply`
//! call finishes before the next starts, so edits against one module's
//! buffer are always recorded sequentially.

use serde::Serialize;

use crate::inspections::InspectionResult;
use crate::rewrite::RewriteSession;
use crate::snapshot::QualifiedModuleName;

/// Granularities a quick fix can be applied at.
///
/// A fix must declare at least one true flag to be offered at all;
/// [`FixScope::is_offerable`] is enforced by the default
/// [`QuickFix::can_fix`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FixScope {
    /// Fixable for a single occurrence within a procedure.
    pub procedure: bool,
    /// Fixable across a whole module.
    pub module: bool,
    /// Fixable across the whole project.
    pub project: bool,
}

impl FixScope {
    /// Returns whether any granularity is declared.
    #[must_use]
    pub const fn is_offerable(self) -> bool {
        self.procedure || self.module || self.project
    }
}

/// Capability contract for an automated source transformation.
///
/// Implementations record edits referencing the *original* snapshot
/// coordinates; the session reconciles them at commit even though earlier
/// edits may have altered effective text length.
pub trait QuickFix: Send + Sync {
    /// Names of the inspections this fix can remediate.
    fn targets(&self) -> &[&'static str];

    /// Declared application granularities.
    fn scope(&self) -> FixScope;

    /// Human-readable description of what the fix does to this finding.
    fn describe(&self, result: &InspectionResult) -> String;

    /// Records the edits remediating `result` into the session.
    /// Must not commit the session.
    fn apply(&self, result: &InspectionResult, session: &mut RewriteSession<'_>)
        -> anyhow::Result<()>;

    /// Returns whether this fix is offered for the finding, based on the
    /// declared bound inspections and scope flags.
    fn can_fix(&self, result: &InspectionResult) -> bool {
        self.scope().is_offerable()
            && self
                .targets()
                .iter()
                .any(|name| *name == result.inspection.as_str())
    }
}

/// What happened to one fix/finding pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum FixDisposition {
    /// Edits were recorded into the session.
    Applied,
    /// The fix was not offered or its target was stale; nothing recorded.
    NotApplicable {
        /// Why the fix was skipped.
        reason: String,
    },
    /// The fix attempted to apply and errored; the session may hold a
    /// partial recording for this module and should not be committed
    /// without review.
    Failed {
        /// Rendered failure cause.
        error: String,
    },
}

/// Per-fix outcome reported to the caller. Fix application never silently
/// corrupts source text: every pair gets a disposition.
#[derive(Debug, Clone, Serialize)]
pub struct FixReport {
    /// Description of the attempted fix.
    pub fix: String,
    /// Module the finding targets.
    pub module: QualifiedModuleName,
    /// What happened.
    pub disposition: FixDisposition,
}

/// Applies one quick fix to one finding, recording edits into the session.
///
/// Inapplicability is surfaced, never silently applied: a finding the fix
/// is not bound to, a fix with no declared scope, or a target whose anchor
/// was already rewritten in this session all report
/// [`FixDisposition::NotApplicable`].
pub fn apply_fix(
    fix: &dyn QuickFix,
    result: &InspectionResult,
    session: &mut RewriteSession<'_>,
) -> FixReport {
    let report = |disposition| FixReport {
        fix: fix.describe(result),
        module: result.target.module.clone(),
        disposition,
    };

    if !fix.can_fix(result) {
        return report(FixDisposition::NotApplicable {
            reason: format!("not offered for {}", result.inspection),
        });
    }

    // Stale target: a prior fix in this session already rewrote the anchor.
    let anchor = result.rewrite_anchor();
    if session
        .rewriter_for(&result.target.module)
        .is_some_and(|buffer| buffer.touches(anchor))
    {
        return report(FixDisposition::NotApplicable {
            reason: "target was already rewritten in this session".to_owned(),
        });
    }

    match fix.apply(result, session) {
        Ok(()) => report(FixDisposition::Applied),
        Err(error) => {
            tracing::warn!(module = %result.target.module, %error, "quick fix failed");
            report(FixDisposition::Failed {
                error: format!("{error:#}"),
            })
        }
    }
}

/// Applies one quick fix across many findings (module- or project-scope
/// application), returning a report per finding.
pub fn apply_fix_to_all(
    fix: &dyn QuickFix,
    results: &[InspectionResult],
    session: &mut RewriteSession<'_>,
) -> Vec<FixReport> {
    results
        .iter()
        .map(|result| apply_fix(fix, result, session))
        .collect()
}
