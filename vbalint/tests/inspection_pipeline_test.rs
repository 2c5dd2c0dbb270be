//! End-to-end test: an inspection pass over a two-module snapshot, quick-fix
//! application, and session commit, all through the public API.
#![allow(clippy::unwrap_used)]

use std::sync::mpsc;

use vbalint::config::Config;
use vbalint::{
    apply_fix_to_all, AnalysisContext, Declaration, DeclarationKind, FixDisposition, FixScope,
    Inspection, InspectionCategory, InspectionResult, Inspector, ParseSnapshot,
    QualifiedModuleName, QualifiedSelection, QuickFix, RewriteSession, Severity, Span,
};

const MODULE1: &str = "Sub DoWork()\n    Let value = 42\n    Let other = value\nEnd Sub\n";
const MODULE2: &str = "Dim ghost As Long\nSub Clean()\n    total = 1\nEnd Sub\n";

fn snapshot() -> ParseSnapshot {
    ParseSnapshot::builder()
        .module("Project1.Module1", MODULE1)
        .module("Project1.Module2", MODULE2)
        .declaration(Declaration::new(
            "value",
            "Project1.Module1",
            DeclarationKind::Variable,
            Span::new(21, 26),
        ))
        .declaration(Declaration::new(
            "ghost",
            "Project1.Module2",
            DeclarationKind::Variable,
            Span::new(4, 9),
        ))
        .build()
}

/// Flags every `Let` assignment, anchoring the finding on the keyword.
struct ObsoleteLetStatement;

impl Inspection for ObsoleteLetStatement {
    fn name(&self) -> &'static str {
        "ObsoleteLetStatement"
    }

    fn severity(&self) -> Severity {
        Severity::Suggestion
    }

    fn category(&self) -> InspectionCategory {
        InspectionCategory::LanguageOpportunities
    }

    fn evaluate(&self, ctx: &AnalysisContext<'_>) -> anyhow::Result<Vec<InspectionResult>> {
        let mut findings = Vec::new();
        for module in ctx.snapshot.modules() {
            let mut offset = 0;
            for line in module.source().split_inclusive('\n') {
                let trimmed = line.trim_start();
                if trimmed.starts_with("Let ") {
                    let start = offset + (line.len() - trimmed.len());
                    findings.push(self.finding(
                        QualifiedSelection::new(
                            module.name().clone(),
                            Span::new(start, start + 4),
                        ),
                        "explicit Let assignment is obsolete",
                    ));
                }
                offset += line.len();
            }
        }
        Ok(findings)
    }
}

/// Flags variable declarations whose name never appears again in the module.
struct UnusedVariable;

impl Inspection for UnusedVariable {
    fn name(&self) -> &'static str {
        "UnusedVariable"
    }

    fn severity(&self) -> Severity {
        Severity::Warning
    }

    fn category(&self) -> InspectionCategory {
        InspectionCategory::CodeQuality
    }

    fn evaluate(&self, ctx: &AnalysisContext<'_>) -> anyhow::Result<Vec<InspectionResult>> {
        let mut findings = Vec::new();
        for decl in ctx.snapshot.symbols().iter() {
            if decl.kind != DeclarationKind::Variable {
                continue;
            }
            let Some(source) = ctx.snapshot.source(&decl.module) else {
                continue;
            };
            if source.matches(decl.name.as_str()).count() <= 1 {
                findings.push(self.finding(
                    QualifiedSelection::new(decl.module.clone(), decl.span),
                    format!("variable '{}' is never used", decl.name),
                ));
            }
        }
        Ok(findings)
    }
}

struct RemoveLetStatementFix;

impl QuickFix for RemoveLetStatementFix {
    fn targets(&self) -> &[&'static str] {
        &["ObsoleteLetStatement"]
    }

    fn scope(&self) -> FixScope {
        FixScope {
            procedure: true,
            module: true,
            project: true,
        }
    }

    fn describe(&self, _result: &InspectionResult) -> String {
        "Remove obsolete Let keyword".to_owned()
    }

    fn apply(
        &self,
        result: &InspectionResult,
        session: &mut RewriteSession<'_>,
    ) -> anyhow::Result<()> {
        let buffer = session.checkout_module(&result.target.module)?;
        buffer.remove(result.rewrite_anchor());
        Ok(())
    }
}

#[test]
fn test_pass_fix_commit_pipeline() {
    let snapshot = snapshot();
    let mut config = Config::default();
    config
        .vbalint
        .severity_overrides
        .insert("ObsoleteLetStatement".to_owned(), Severity::Error);

    let inspections: Vec<Box<dyn Inspection>> =
        vec![Box::new(ObsoleteLetStatement), Box::new(UnusedVariable)];
    let (tx, rx) = mpsc::channel();
    let outcome = Inspector::with_config(config)
        .notify_on(tx)
        .run(&snapshot, &inspections);

    assert!(outcome.failures.is_empty());
    assert_eq!(outcome.findings.len(), 3);

    // Both producing inspections notified once, with their own counts.
    let mut counts: Vec<_> = rx
        .try_iter()
        .map(|n| (n.inspection.to_string(), n.count))
        .collect();
    counts.sort();
    assert_eq!(
        counts,
        vec![
            ("ObsoleteLetStatement".to_owned(), 2),
            ("UnusedVariable".to_owned(), 1),
        ]
    );

    // The override is stamped onto the findings it governs, and only those.
    for finding in &outcome.findings {
        if finding.inspection == "ObsoleteLetStatement" {
            assert_eq!(finding.severity, Severity::Error);
        } else {
            assert_eq!(finding.severity, Severity::Warning);
        }
    }

    // Fix only the Let findings; the unused-variable finding stays reported.
    let selected: Vec<InspectionResult> = outcome
        .findings
        .iter()
        .filter(|f| f.inspection == "ObsoleteLetStatement")
        .cloned()
        .collect();

    let mut session = RewriteSession::new(&snapshot);
    let reports = apply_fix_to_all(&RemoveLetStatementFix, &selected, &mut session);
    assert_eq!(reports.len(), 2);
    assert!(reports
        .iter()
        .all(|r| r.disposition == FixDisposition::Applied));

    let committed = session.commit();
    assert!(committed.is_clean());
    let module1 = QualifiedModuleName::new("Project1.Module1");
    assert_eq!(
        committed.modules.get(&module1).map(String::as_str),
        Some("Sub DoWork()\n    value = 42\n    other = value\nEnd Sub\n")
    );
    // Module2 was never checked out, so commit leaves it alone.
    assert_eq!(committed.modules.len(), 1);
}

#[test]
fn test_module_wide_suppression_silences_a_rule() {
    let snapshot = ParseSnapshot::builder()
        .module(
            "Project1.Module1",
            "'@IgnoreModule ObsoleteLetStatement\nSub DoWork()\n    Let value = 42\nEnd Sub\n",
        )
        .build();

    let inspections: Vec<Box<dyn Inspection>> = vec![Box::new(ObsoleteLetStatement)];
    let (tx, rx) = mpsc::channel();
    let outcome = Inspector::new().notify_on(tx).run(&snapshot, &inspections);

    assert!(outcome.findings.is_empty());
    assert!(rx.try_iter().next().is_none());
}
