//! Token-level rewriting: edit operations, position-based reconciliation,
//! and the per-pass rewrite session.
//!
//! Edits are recorded against the *original* source coordinates of the
//! snapshot, as an immutable list of operations per module. Reconciliation
//! happens in one pure pass over the original text ([`apply_edits`]), so
//! there is no hidden cursor state and non-overlapping edits compose
//! correctly regardless of submission order.
//!
//! Conflict policy: two edits whose consumed spans overlap fail the whole
//! module's commit with [`RewriteError::Conflict`]. Overlaps are never
//! resolved by truncation or by dropping the later edit, so committed text
//! can never interleave character ranges from conflicting edits.


use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::snapshot::{ParseSnapshot, QualifiedModuleName, Span};

/// One recorded source edit, expressed in original snapshot coordinates.
///
/// Insertions are anchored to a span: `InsertBefore` applies at the span's
/// start, `InsertAfter` at its end. An insert whose anchor lands exactly on
/// the boundary of a removed or replaced span is applied adjacent to, not
/// inside, that span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditOp {
    /// Replaces the span with new text.
    Replace {
        /// The span to replace.
        span: Span,
        /// The replacement text.
        text: String,
    },
    /// Removes the span.
    Remove {
        /// The span to remove.
        span: Span,
    },
    /// Inserts text immediately before the anchor span.
    InsertBefore {
        /// The anchor span; text lands at its start.
        span: Span,
        /// The text to insert.
        text: String,
    },
    /// Inserts text immediately after the anchor span.
    InsertAfter {
        /// The anchor span; text lands at its end.
        span: Span,
        /// The text to insert.
        text: String,
    },
}

impl EditOp {
    /// The source position the edit applies at.
    #[must_use]
    pub const fn position(&self) -> usize {
        match self {
            EditOp::Replace { span, .. } | EditOp::Remove { span } => span.start,
            EditOp::InsertBefore { span, .. } => span.start,
            EditOp::InsertAfter { span, .. } => span.end,
        }
    }

    /// The span of original text the edit consumes; `None` for insertions.
    #[must_use]
    pub const fn consumed(&self) -> Option<Span> {
        match self {
            EditOp::Replace { span, .. } | EditOp::Remove { span } => Some(*span),
            EditOp::InsertBefore { .. } | EditOp::InsertAfter { .. } => None,
        }
    }

    /// Tie-break rank for edits at the same position: text inserted after a
    /// preceding token comes first, then text inserted before the following
    /// token, then the span-consuming edit starting there.
    const fn rank(&self) -> u8 {
        match self {
            EditOp::InsertAfter { .. } => 0,
            EditOp::InsertBefore { .. } => 1,
            EditOp::Replace { .. } | EditOp::Remove { .. } => 2,
        }
    }

    fn inserted_text(&self) -> Option<&str> {
        match self {
            EditOp::Replace { text, .. }
            | EditOp::InsertBefore { text, .. }
            | EditOp::InsertAfter { text, .. } => Some(text),
            EditOp::Remove { .. } => None,
        }
    }
}

/// Structural error raised while reconciling a module's edits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RewriteError {
    /// Two edits cover overlapping character ranges.
    Conflict {
        /// Consumed span of the earlier-positioned edit.
        first: Span,
        /// Span (or insert anchor) of the edit that collided with it.
        second: Span,
    },
    /// An edit references coordinates outside the module source, or a
    /// position that is not a character boundary.
    OutOfBounds {
        /// The offending span.
        span: Span,
        /// Length of the module source in bytes.
        len: usize,
    },
    /// A module identity not present in the session's snapshot.
    UnknownModule {
        /// The unresolved module name.
        module: QualifiedModuleName,
    },
}

impl std::fmt::Display for RewriteError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Conflict { first, second } => write!(
                f,
                "conflicting edits: [{}, {}) overlaps [{}, {})",
                first.start, first.end, second.start, second.end
            ),
            Self::OutOfBounds { span, len } => write!(
                f,
                "edit span [{}, {}) is outside the {len}-byte module source",
                span.start, span.end
            ),
            Self::UnknownModule { module } => {
                write!(f, "module {module} is not part of the snapshot")
            }
        }
    }
}

impl std::error::Error for RewriteError {}

fn validate(original: &str, op: &EditOp) -> Result<(), RewriteError> {
    let span = match op.consumed() {
        Some(span) => span,
        None => Span::new(op.position(), op.position()),
    };
    let valid = span.start <= span.end
        && span.end <= original.len()
        && original.is_char_boundary(span.start)
        && original.is_char_boundary(span.end);
    if valid {
        Ok(())
    } else {
        Err(RewriteError::OutOfBounds {
            span,
            len: original.len(),
        })
    }
}

/// Applies a list of edits to the original text in one pure pass.
///
/// Edits are processed in ascending source position; slice order only
/// breaks ties between insertions at the same position. Overlapping
/// consumed spans, and insert anchors strictly inside a consumed span,
/// fail with [`RewriteError::Conflict`].
pub fn apply_edits(original: &str, edits: &[EditOp]) -> Result<String, RewriteError> {
    for op in edits {
        validate(original, op)?;
    }

    let mut ordered: Vec<(usize, &EditOp)> = edits.iter().enumerate().collect();
    ordered.sort_by_key(|(seq, op)| (op.position(), op.rank(), *seq));

    let mut out = String::with_capacity(original.len());
    let mut cursor = 0usize;
    let mut last_consumed = Span::new(0, 0);

    for (_, op) in ordered {
        match op.consumed() {
            Some(span) => {
                if span.start < cursor {
                    return Err(RewriteError::Conflict {
                        first: last_consumed,
                        second: span,
                    });
                }
                out.push_str(&original[cursor..span.start]);
                if let Some(text) = op.inserted_text() {
                    out.push_str(text);
                }
                cursor = span.end;
                last_consumed = span;
            }
            None => {
                let at = op.position();
                if at < cursor {
                    return Err(RewriteError::Conflict {
                        first: last_consumed,
                        second: Span::new(at, at),
                    });
                }
                out.push_str(&original[cursor..at]);
                if let Some(text) = op.inserted_text() {
                    out.push_str(text);
                }
                cursor = at;
            }
        }
    }

    out.push_str(&original[cursor..]);
    Ok(out)
}

/// A checked-out edit buffer for one module.
///
/// Records edits against the module's original snapshot text; nothing is
/// materialized until the owning session commits.
#[derive(Debug)]
pub struct ModuleRewriter {
    module: QualifiedModuleName,
    original: String,
    edits: SmallVec<[EditOp; 4]>,
}

impl ModuleRewriter {
    fn new(module: QualifiedModuleName, original: String) -> Self {
        Self {
            module,
            original,
            edits: SmallVec::new(),
        }
    }

    /// The module this buffer edits.
    #[must_use]
    pub fn module(&self) -> &QualifiedModuleName {
        &self.module
    }

    /// Records a replacement of `span` with `text`.
    pub fn replace(&mut self, span: Span, text: impl Into<String>) {
        self.edits.push(EditOp::Replace {
            span,
            text: text.into(),
        });
    }

    /// Records removal of `span`.
    pub fn remove(&mut self, span: Span) {
        self.edits.push(EditOp::Remove { span });
    }

    /// Records an insertion immediately before the anchor span.
    pub fn insert_before(&mut self, span: Span, text: impl Into<String>) {
        self.edits.push(EditOp::InsertBefore {
            span,
            text: text.into(),
        });
    }

    /// Records an insertion immediately after the anchor span.
    pub fn insert_after(&mut self, span: Span, text: impl Into<String>) {
        self.edits.push(EditOp::InsertAfter {
            span,
            text: text.into(),
        });
    }

    /// Returns whether any edits have been recorded.
    #[must_use]
    pub fn has_edits(&self) -> bool {
        !self.edits.is_empty()
    }

    /// Returns whether any recorded edit consumes text overlapping `span`.
    ///
    /// Used by the fix workflow to detect stale targets before applying a
    /// second fix to the same region.
    #[must_use]
    pub fn touches(&self, span: Span) -> bool {
        self.edits
            .iter()
            .filter_map(EditOp::consumed)
            .any(|consumed| consumed.overlaps(&span))
    }

    fn rewritten(&self) -> Result<String, RewriteError> {
        apply_edits(&self.original, &self.edits)
    }
}

/// A module whose commit failed, and why.
#[derive(Debug)]
pub struct ModuleConflict {
    /// The module that failed to commit.
    pub module: QualifiedModuleName,
    /// The structural error that failed it.
    pub error: RewriteError,
}

/// Result of committing a session: final text per module, plus the modules
/// whose reconciliation failed. Failed modules produce no text at all.
#[derive(Debug, Default)]
pub struct CommitOutcome {
    /// Final text for every module that committed cleanly, including
    /// checked-out modules with no edits (original text).
    pub modules: FxHashMap<QualifiedModuleName, String>,
    /// Modules whose edits could not be reconciled.
    pub conflicts: Vec<ModuleConflict>,
}

impl CommitOutcome {
    /// Returns whether every module committed without conflict.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.conflicts.is_empty()
    }
}

/// The per-analysis-pass container of pending edits across modules.
///
/// Buffers live in an arena indexed by checkout order; a map from module
/// identity to arena slot makes checkout idempotent, so edits from multiple
/// fixes against the same module accumulate in one buffer.
#[derive(Debug)]
pub struct RewriteSession<'a> {
    snapshot: &'a ParseSnapshot,
    arena: Vec<ModuleRewriter>,
    index: FxHashMap<QualifiedModuleName, usize>,
}

impl<'a> RewriteSession<'a> {
    /// Opens a session over the snapshot the findings were produced from.
    #[must_use]
    pub fn new(snapshot: &'a ParseSnapshot) -> Self {
        Self {
            snapshot,
            arena: Vec::new(),
            index: FxHashMap::default(),
        }
    }

    /// Checks out the edit buffer for a module.
    ///
    /// Idempotent per session: repeated checkout of the same module returns
    /// the same buffer, never a fresh one.
    pub fn checkout_module(
        &mut self,
        module: &QualifiedModuleName,
    ) -> Result<&mut ModuleRewriter, RewriteError> {
        if let Some(&slot) = self.index.get(module) {
            return Ok(&mut self.arena[slot]);
        }
        let Some(source) = self.snapshot.source(module) else {
            return Err(RewriteError::UnknownModule {
                module: module.clone(),
            });
        };
        let slot = self.arena.len();
        self.arena
            .push(ModuleRewriter::new(module.clone(), source.to_owned()));
        self.index.insert(module.clone(), slot);
        Ok(&mut self.arena[slot])
    }

    /// Read-only view of a module's buffer, if it has been checked out.
    #[must_use]
    pub fn rewriter_for(&self, module: &QualifiedModuleName) -> Option<&ModuleRewriter> {
        self.index.get(module).map(|&slot| &self.arena[slot])
    }

    /// Materializes final text for every checked-out module.
    ///
    /// Commit is all-or-nothing per module and idempotent: calling it again
    /// without new edits yields the same text. The session is left intact.
    #[must_use]
    pub fn commit(&self) -> CommitOutcome {
        let mut outcome = CommitOutcome::default();
        for rewriter in &self.arena {
            match rewriter.rewritten() {
                Ok(text) => {
                    outcome.modules.insert(rewriter.module.clone(), text);
                }
                Err(error) => {
                    tracing::warn!(
                        module = %rewriter.module,
                        %error,
                        "module commit failed, no text produced"
                    );
                    outcome.conflicts.push(ModuleConflict {
                        module: rewriter.module.clone(),
                        error,
                    });
                }
            }
        }
        outcome
    }
}
