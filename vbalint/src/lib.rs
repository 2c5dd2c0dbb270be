//! Concurrent code-inspection engine and rewrite subsystem for VBA-style
//! modules.
//!
//! The crate sits between an external parser and a host editor. The parser
//! hands it an immutable [`ParseSnapshot`]; the [`Inspector`] runs every
//! enabled [`Inspection`] concurrently over that snapshot and aggregates
//! the findings; the caller selects findings and applies [`QuickFix`]es,
//! which record source edits into a [`RewriteSession`] that reconciles them
//! into final per-module text on commit.
//!
//! The grammar, the host integration, and the concrete rule catalog are
//! external collaborators consumed through the traits defined here.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Configuration loading and severity overrides.
pub mod config;
/// Quick-fix contract and the fix-application workflow.
pub mod fix;
/// Inspection contract and the finding model.
pub mod inspections;
/// Concurrent inspection execution and aggregation.
pub mod inspector;
/// Normalized ordering over heterogeneous literals.
pub mod literal;
/// Edit model, reconciliation, and the rewrite session.
pub mod rewrite;
/// Immutable parse snapshot and symbol table.
pub mod snapshot;
/// Line mapping and inline suppression annotations.
pub mod utils;

pub use config::Config;
pub use fix::{apply_fix, apply_fix_to_all, FixDisposition, FixReport, FixScope, QuickFix};
pub use inspections::{
    AnalysisContext, Inspection, InspectionCategory, InspectionFailure, InspectionResult, Severity,
};
pub use inspector::{AnalysisHandle, AnalysisOutcome, FindingCount, Inspector};
pub use literal::{ComparableLiteral, Incomparable, LiteralKind};
pub use rewrite::{
    apply_edits, CommitOutcome, EditOp, ModuleConflict, ModuleRewriter, RewriteError,
    RewriteSession,
};
pub use snapshot::{
    Declaration, DeclarationKind, ModuleSource, ParseSnapshot, QualifiedModuleName,
    QualifiedSelection, SnapshotBuilder, Span, SymbolTable,
};
pub use utils::{LineIndex, ModuleSuppressions};

/// Cooperative cancellation token for an analysis pass.
///
/// Cancellation is never preemptive: in-flight inspection units are not
/// forcibly terminated. The inspector checks the token before starting each
/// unit, and long-running rules are expected to check it at iteration
/// boundaries through [`AnalysisContext`].
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// Creates a fresh, un-cancelled token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation. Idempotent.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    /// Returns whether cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_token_is_shared_between_clones() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }
}
