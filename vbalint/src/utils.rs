//! Shared helpers: offset-to-line mapping and inline suppression
//! annotations.

use compact_str::CompactString;
use regex::Regex;
use rustc_hash::{FxHashMap, FxHashSet};
use std::sync::OnceLock;

use crate::inspections::InspectionResult;
use crate::snapshot::{ParseSnapshot, QualifiedModuleName};

/// A utility struct to convert byte offsets to line numbers.
///
/// Findings carry byte spans because that is what the parser emits, but
/// suppression annotations and human-readable reports work in lines.
#[derive(Debug, Clone)]
pub struct LineIndex {
    /// Stores the byte index of the start of each line.
    line_starts: Vec<usize>,
}

impl LineIndex {
    /// Creates a new `LineIndex` by scanning the source code for newlines.
    #[must_use]
    pub fn new(source: &str) -> Self {
        let mut line_starts = vec![0];
        // Newlines are always single bytes in UTF-8, so byte iteration is safe.
        for (i, byte) in source.as_bytes().iter().enumerate() {
            if *byte == b'\n' {
                line_starts.push(i + 1);
            }
        }
        Self { line_starts }
    }

    /// Converts a byte offset to a 1-indexed line number.
    #[must_use]
    pub fn line_of(&self, offset: usize) -> usize {
        match self.line_starts.binary_search(&offset) {
            Ok(line) => line + 1,
            Err(line) => line,
        }
    }

    /// Converts a byte offset to 1-indexed (line, column). The column is a
    /// byte column within the line.
    #[must_use]
    pub fn line_col(&self, offset: usize) -> (usize, usize) {
        let line = self.line_of(offset);
        let start = self.line_starts[line - 1];
        (line, offset - start + 1)
    }
}

/// Returns the compiled annotation-comment regex.
///
/// Matches `'@Ignore Name1, Name2` and `'@IgnoreModule [Name1, Name2]`,
/// case-insensitively, anywhere in a line.
fn annotation_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    #[allow(clippy::expect_used)]
    RE.get_or_init(|| {
        Regex::new(r"(?i)'\s*@ignore(module)?\b[ \t]*([^\r\n]*)")
            .expect("Invalid annotation regex pattern")
    })
}

/// Inline suppression annotations scanned from one module's source.
///
/// `'@Ignore Name` suppresses matching findings on the line that follows
/// the annotation; a bare `'@Ignore` suppresses every finding there.
/// `'@IgnoreModule` works the same way for the whole module.
#[derive(Debug, Default)]
pub struct ModuleSuppressions {
    module_all: bool,
    module_names: FxHashSet<CompactString>,
    /// Line (1-indexed) -> suppressed inspection names; an empty set means
    /// everything on that line is suppressed.
    by_line: FxHashMap<usize, FxHashSet<CompactString>>,
}

impl ModuleSuppressions {
    /// Scans a module's source text for suppression annotations.
    #[must_use]
    pub fn scan(source: &str) -> Self {
        let mut suppressions = Self::default();
        for (i, line) in source.lines().enumerate() {
            let Some(captures) = annotation_re().captures(line) else {
                continue;
            };
            let names: FxHashSet<CompactString> = captures
                .get(2)
                .map(|m| m.as_str())
                .unwrap_or_default()
                .split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(CompactString::new)
                .collect();

            if captures.get(1).is_some() {
                if names.is_empty() {
                    suppressions.module_all = true;
                } else {
                    suppressions.module_names.extend(names);
                }
            } else {
                // The annotation governs the next line.
                suppressions
                    .by_line
                    .entry(i + 2)
                    .or_default()
                    .extend(names);
            }
        }
        suppressions
    }

    /// Returns whether a finding from `inspection` on `line` is suppressed.
    #[must_use]
    pub fn is_suppressed(&self, line: usize, inspection: &str) -> bool {
        if self.module_all || self.module_names.contains(inspection) {
            return true;
        }
        match self.by_line.get(&line) {
            Some(names) => names.is_empty() || names.contains(inspection),
            None => false,
        }
    }

    fn is_trivial(&self) -> bool {
        !self.module_all && self.module_names.is_empty() && self.by_line.is_empty()
    }
}

/// Snapshot-wide suppression state, built once per pass and shared
/// read-only across inspection workers.
#[derive(Debug, Default)]
pub(crate) struct Suppressions {
    by_module: FxHashMap<QualifiedModuleName, (LineIndex, ModuleSuppressions)>,
}

impl Suppressions {
    pub(crate) fn scan(snapshot: &ParseSnapshot) -> Self {
        let mut by_module = FxHashMap::default();
        for module in snapshot.modules() {
            let scanned = ModuleSuppressions::scan(module.source());
            if scanned.is_trivial() {
                continue;
            }
            by_module.insert(
                module.name().clone(),
                (LineIndex::new(module.source()), scanned),
            );
        }
        Self { by_module }
    }

    pub(crate) fn is_suppressed(&self, finding: &InspectionResult) -> bool {
        let Some((line_index, suppressions)) = self.by_module.get(&finding.target.module) else {
            return false;
        };
        let line = line_index.line_of(finding.target.span.start);
        suppressions.is_suppressed(line, finding.inspection.as_str())
    }
}
