//! Concurrent inspection execution and result aggregation.
//!
//! Each enabled inspection runs as an independent unit of work on the
//! rayon pool, all units reading the same immutable snapshot. Findings are
//! merged into one append-only collection with no ordering guarantee; a
//! unit that produces findings emits a best-effort count notification on
//! the session's channel as it contributes them. A unit that fails, by
//! returning an error or by panicking, is captured as a per-inspection
//! failure and never aborts its siblings.


use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread::JoinHandle;

use compact_str::CompactString;
use rayon::prelude::*;
use serde::Serialize;

use crate::config::Config;
use crate::inspections::{
    AnalysisContext, Inspection, InspectionFailure, InspectionResult, Severity,
};
use crate::snapshot::ParseSnapshot;
use crate::utils::Suppressions;
use crate::CancelToken;

/// Progress notification: one inspection contributed `count` findings.
///
/// Delivered best-effort on the channel handed to
/// [`Inspector::notify_on`]; no delivery order is guaranteed across
/// inspections, and a dropped receiver is ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FindingCount {
    /// Name of the inspection that produced findings.
    pub inspection: CompactString,
    /// Number of findings it contributed.
    pub count: usize,
}

/// Aggregated result of one analysis pass.
#[derive(Debug, Default, Serialize)]
pub struct AnalysisOutcome {
    /// Findings from every inspection that completed successfully.
    /// Order across inspections is unspecified.
    pub findings: Vec<InspectionResult>,
    /// Inspections that failed; their errors, not their findings.
    pub failures: Vec<InspectionFailure>,
    /// Whether the pass observed a cancellation request.
    pub cancelled: bool,
}

impl AnalysisOutcome {
    /// Serializes the outcome as pretty-printed JSON for host consumption.
    pub fn to_json(&self) -> anyhow::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

enum UnitOutcome {
    Findings(Vec<InspectionResult>),
    Failure(InspectionFailure),
    Skipped,
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "inspection panicked".to_owned()
    }
}

/// Orchestrates concurrent execution of enabled inspections over one
/// snapshot.
///
/// ```
/// use std::sync::mpsc;
/// use vbalint::{Inspector, ParseSnapshot};
///
/// let snapshot = ParseSnapshot::builder()
///     .module("Project1.Module1", "Dim value As Long")
///     .build();
/// let (tx, rx) = mpsc::channel();
/// let outcome = Inspector::new().notify_on(tx).run(&snapshot, &[]);
/// assert!(outcome.findings.is_empty());
/// assert!(rx.try_recv().is_err());
/// ```
#[derive(Debug, Default)]
pub struct Inspector {
    config: Config,
    notifications: Option<Sender<FindingCount>>,
}

impl Inspector {
    /// Creates an inspector with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an inspector applying the given configuration's severity
    /// overrides, disabled list, and worker-pool hint.
    #[must_use]
    pub fn with_config(config: Config) -> Self {
        Self {
            config,
            notifications: None,
        }
    }

    /// Attaches a channel that receives a [`FindingCount`] for every
    /// inspection contributing at least one finding.
    #[must_use]
    pub fn notify_on(mut self, sender: Sender<FindingCount>) -> Self {
        self.notifications = Some(sender);
        self
    }

    /// Runs every enabled inspection to completion and returns the merged
    /// findings. Blocks until all scheduled units have finished.
    #[must_use]
    pub fn run(&self, snapshot: &ParseSnapshot, inspections: &[Box<dyn Inspection>]) -> AnalysisOutcome {
        self.run_cancellable(snapshot, inspections, &CancelToken::new())
    }

    /// Like [`run`](Self::run), but observes a cooperative cancellation
    /// token: units not yet started are skipped once the token is set, and
    /// in-flight units may stop early at their own safe points. In-flight
    /// units are never forcibly terminated.
    #[must_use]
    pub fn run_cancellable(
        &self,
        snapshot: &ParseSnapshot,
        inspections: &[Box<dyn Inspection>],
        cancel: &CancelToken,
    ) -> AnalysisOutcome {
        match self.config.worker_pool() {
            Some(pool) => pool.install(|| self.run_units(snapshot, inspections, cancel)),
            None => self.run_units(snapshot, inspections, cancel),
        }
    }

    /// Moves the inspector onto a worker thread and returns a handle that
    /// can cancel the pass and join its outcome.
    pub fn spawn(
        self,
        snapshot: Arc<ParseSnapshot>,
        inspections: Vec<Box<dyn Inspection>>,
        cancel: CancelToken,
    ) -> anyhow::Result<AnalysisHandle> {
        let token = cancel.clone();
        let worker = std::thread::Builder::new()
            .name("vbalint-inspector".to_owned())
            .spawn(move || self.run_cancellable(&snapshot, &inspections, &cancel))?;
        Ok(AnalysisHandle { worker, token })
    }

    fn run_units(
        &self,
        snapshot: &ParseSnapshot,
        inspections: &[Box<dyn Inspection>],
        cancel: &CancelToken,
    ) -> AnalysisOutcome {
        let enabled: Vec<(&dyn Inspection, Severity)> = inspections
            .iter()
            .map(|inspection| {
                let severity = self.config.effective_severity(inspection.as_ref());
                (inspection.as_ref(), severity)
            })
            .filter(|(_, severity)| *severity != Severity::DoNotShow)
            .collect();

        tracing::debug!(
            scheduled = enabled.len(),
            modules = snapshot.module_count(),
            "starting inspection pass"
        );

        let suppressions = Suppressions::scan(snapshot);
        let ctx = AnalysisContext { snapshot, cancel };

        let outcomes: Vec<UnitOutcome> = enabled
            .par_iter()
            .map_with(
                self.notifications.clone(),
                |notifications, &(inspection, severity)| {
                    Self::run_unit(inspection, severity, &ctx, &suppressions, notifications)
                },
            )
            .collect();

        let mut outcome = AnalysisOutcome::default();
        for unit in outcomes {
            match unit {
                UnitOutcome::Findings(findings) => outcome.findings.extend(findings),
                UnitOutcome::Failure(failure) => outcome.failures.push(failure),
                UnitOutcome::Skipped => {}
            }
        }
        outcome.cancelled = cancel.is_cancelled();

        tracing::debug!(
            findings = outcome.findings.len(),
            failures = outcome.failures.len(),
            cancelled = outcome.cancelled,
            "inspection pass finished"
        );
        outcome
    }

    fn run_unit(
        inspection: &dyn Inspection,
        severity: Severity,
        ctx: &AnalysisContext<'_>,
        suppressions: &Suppressions,
        notifications: &Option<Sender<FindingCount>>,
    ) -> UnitOutcome {
        if ctx.cancel.is_cancelled() {
            return UnitOutcome::Skipped;
        }

        let evaluated = catch_unwind(AssertUnwindSafe(|| inspection.evaluate(ctx)));
        let mut findings = match evaluated {
            Ok(Ok(findings)) => findings,
            Ok(Err(error)) => {
                tracing::warn!(inspection = inspection.name(), %error, "inspection failed");
                return UnitOutcome::Failure(InspectionFailure {
                    inspection: CompactString::new(inspection.name()),
                    error: format!("{error:#}"),
                });
            }
            Err(payload) => {
                let error = panic_message(payload.as_ref());
                tracing::warn!(inspection = inspection.name(), error = %error, "inspection panicked");
                return UnitOutcome::Failure(InspectionFailure {
                    inspection: CompactString::new(inspection.name()),
                    error,
                });
            }
        };

        findings.retain(|finding| !suppressions.is_suppressed(finding));
        for finding in &mut findings {
            finding.severity = severity;
        }

        if !findings.is_empty() {
            if let Some(sender) = notifications {
                // Best-effort: a dropped receiver never fails the unit.
                let _ = sender.send(FindingCount {
                    inspection: CompactString::new(inspection.name()),
                    count: findings.len(),
                });
            }
            tracing::debug!(
                inspection = inspection.name(),
                count = findings.len(),
                "findings contributed"
            );
        }

        UnitOutcome::Findings(findings)
    }
}

/// Handle to an analysis pass running on a worker thread.
///
/// Produced by [`Inspector::spawn`]. Cancellation is cooperative; `join`
/// always waits for in-flight units to reach a safe stopping point.
#[derive(Debug)]
pub struct AnalysisHandle {
    worker: JoinHandle<AnalysisOutcome>,
    token: CancelToken,
}

impl AnalysisHandle {
    /// Requests cooperative cancellation of the running pass.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Returns whether the worker has finished.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.worker.is_finished()
    }

    /// Waits for the pass to complete and returns its outcome.
    pub fn join(self) -> anyhow::Result<AnalysisOutcome> {
        self.worker
            .join()
            .map_err(|_| anyhow::anyhow!("inspection worker panicked"))
    }
}
