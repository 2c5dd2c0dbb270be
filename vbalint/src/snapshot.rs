//! Immutable parse snapshot shared by all inspections.
//!
//! A [`ParseSnapshot`] is produced once per analysis pass by the external
//! parser and consumed read-only for the lifetime of the pass. Nothing in
//! this crate mutates a snapshot after [`SnapshotBuilder::build`] returns,
//! which is what makes lock-free concurrent reads safe.

use compact_str::CompactString;
use rustc_hash::FxHashMap;
use serde::Serialize;

/// A half-open byte range `[start, end)` within a module's source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Span {
    /// Byte offset of the first character in the range.
    pub start: usize,
    /// Byte offset one past the last character in the range.
    pub end: usize,
}

impl Span {
    /// Creates a span covering `[start, end)`.
    #[must_use]
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Length of the range in bytes.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// Returns whether the range covers no characters.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// Returns whether the given byte offset falls inside the range.
    #[must_use]
    pub const fn contains(&self, offset: usize) -> bool {
        offset >= self.start && offset < self.end
    }

    /// Returns whether two ranges share at least one byte.
    #[must_use]
    pub const fn overlaps(&self, other: &Self) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// Identity of a module within the analyzed project.
///
/// The naming scheme (e.g. `Project1.Module1`) is assigned by the external
/// parser; the engine only requires that names are unique per snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct QualifiedModuleName(CompactString);

impl QualifiedModuleName {
    /// Creates a module name from its qualified string form.
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(CompactString::new(name.as_ref()))
    }

    /// Returns the qualified name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl std::fmt::Display for QualifiedModuleName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.0.as_str())
    }
}

impl From<&str> for QualifiedModuleName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// A module location: the module plus a span within its source text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct QualifiedSelection {
    /// The module containing the selection.
    pub module: QualifiedModuleName,
    /// The selected byte range within the module source.
    pub span: Span,
}

impl QualifiedSelection {
    /// Creates a selection for a span within the named module.
    pub fn new(module: impl Into<QualifiedModuleName>, span: Span) -> Self {
        Self {
            module: module.into(),
            span,
        }
    }
}

/// The kind of symbol a declaration introduces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DeclarationKind {
    /// A `Sub` procedure.
    Procedure,
    /// A `Function` procedure.
    Function,
    /// A property accessor.
    Property,
    /// A module-level or local variable.
    Variable,
    /// A named constant.
    Constant,
    /// A procedure parameter.
    Parameter,
}

/// One entry in the symbol table: a named declaration and where it lives.
#[derive(Debug, Clone, Serialize)]
pub struct Declaration {
    /// The declared identifier.
    pub name: CompactString,
    /// The module the declaration belongs to.
    pub module: QualifiedModuleName,
    /// What kind of symbol this is.
    pub kind: DeclarationKind,
    /// The span of the identifier within the module source.
    pub span: Span,
}

impl Declaration {
    /// Creates a declaration entry.
    pub fn new(
        name: impl AsRef<str>,
        module: impl Into<QualifiedModuleName>,
        kind: DeclarationKind,
        span: Span,
    ) -> Self {
        Self {
            name: CompactString::new(name.as_ref()),
            module: module.into(),
            kind,
            span,
        }
    }
}

/// Project-wide symbol table, populated by the external parser.
#[derive(Debug, Default)]
pub struct SymbolTable {
    declarations: Vec<Declaration>,
}

impl SymbolTable {
    /// Iterates over every declaration in the project.
    pub fn iter(&self) -> impl Iterator<Item = &Declaration> {
        self.declarations.iter()
    }

    /// Iterates over the declarations belonging to one module.
    pub fn in_module<'a>(
        &'a self,
        module: &'a QualifiedModuleName,
    ) -> impl Iterator<Item = &'a Declaration> + 'a {
        self.declarations.iter().filter(move |d| &d.module == module)
    }

    /// Looks up declarations by identifier, across all modules.
    pub fn named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Declaration> + 'a {
        self.declarations.iter().filter(move |d| d.name.as_str() == name)
    }

    /// Number of declarations in the table.
    #[must_use]
    pub fn len(&self) -> usize {
        self.declarations.len()
    }

    /// Returns whether the table holds no declarations.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }
}

/// One parsed module: its identity and source text.
#[derive(Debug)]
pub struct ModuleSource {
    name: QualifiedModuleName,
    source: String,
}

impl ModuleSource {
    /// The module's qualified name.
    #[must_use]
    pub fn name(&self) -> &QualifiedModuleName {
        &self.name
    }

    /// The module's full source text.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }
}

/// Immutable representation of a parsed project.
///
/// Owns the per-module source text and the symbol table. Created through
/// [`SnapshotBuilder`], then shared read-only across inspection workers; a
/// new pass supersedes the old snapshot wholesale rather than mutating it.
#[derive(Debug, Default)]
pub struct ParseSnapshot {
    modules: Vec<ModuleSource>,
    index: FxHashMap<QualifiedModuleName, usize>,
    symbols: SymbolTable,
}

impl ParseSnapshot {
    /// Starts building a snapshot.
    #[must_use]
    pub fn builder() -> SnapshotBuilder {
        SnapshotBuilder::default()
    }

    /// Iterates over the modules in the snapshot.
    pub fn modules(&self) -> impl Iterator<Item = &ModuleSource> {
        self.modules.iter()
    }

    /// Looks up a module by its qualified name.
    #[must_use]
    pub fn module(&self, name: &QualifiedModuleName) -> Option<&ModuleSource> {
        self.index.get(name).map(|&i| &self.modules[i])
    }

    /// Convenience accessor for a module's source text.
    #[must_use]
    pub fn source(&self, name: &QualifiedModuleName) -> Option<&str> {
        self.module(name).map(ModuleSource::source)
    }

    /// The project-wide symbol table.
    #[must_use]
    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    /// Number of modules in the snapshot.
    #[must_use]
    pub fn module_count(&self) -> usize {
        self.modules.len()
    }
}

/// Assembles an immutable [`ParseSnapshot`].
///
/// The external parser (or a test) feeds modules and declarations in any
/// order; `build` freezes the result. Re-adding a module name replaces the
/// earlier source, so incremental parsers can overwrite stale text before
/// freezing.
#[derive(Debug, Default)]
pub struct SnapshotBuilder {
    modules: Vec<ModuleSource>,
    index: FxHashMap<QualifiedModuleName, usize>,
    declarations: Vec<Declaration>,
}

impl SnapshotBuilder {
    /// Adds (or replaces) a module and its source text.
    #[must_use]
    pub fn module(mut self, name: impl Into<QualifiedModuleName>, source: impl Into<String>) -> Self {
        let name = name.into();
        let source = source.into();
        if let Some(&slot) = self.index.get(&name) {
            self.modules[slot].source = source;
        } else {
            self.index.insert(name.clone(), self.modules.len());
            self.modules.push(ModuleSource { name, source });
        }
        self
    }

    /// Adds a symbol-table declaration.
    #[must_use]
    pub fn declaration(mut self, declaration: Declaration) -> Self {
        self.declarations.push(declaration);
        self
    }

    /// Freezes the builder into an immutable snapshot.
    #[must_use]
    pub fn build(self) -> ParseSnapshot {
        ParseSnapshot {
            modules: self.modules,
            index: self.index,
            symbols: SymbolTable {
                declarations: self.declarations,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_overlap_and_containment() {
        let a = Span::new(4, 9);
        let b = Span::new(8, 12);
        let c = Span::new(9, 12);
        assert!(a.overlaps(&b));
        assert!(!a.overlaps(&c));
        assert!(a.contains(4));
        assert!(!a.contains(9));
        assert_eq!(a.len(), 5);
        assert!(Span::new(3, 3).is_empty());
    }

    #[test]
    fn test_builder_replaces_module_on_duplicate_name() {
        let snapshot = ParseSnapshot::builder()
            .module("Project1.Module1", "old text")
            .module("Project1.Module1", "new text")
            .build();
        assert_eq!(snapshot.module_count(), 1);
        let name = QualifiedModuleName::new("Project1.Module1");
        assert_eq!(snapshot.source(&name), Some("new text"));
    }

    #[test]
    fn test_symbol_table_queries() {
        let module = QualifiedModuleName::new("Project1.Module1");
        let snapshot = ParseSnapshot::builder()
            .module("Project1.Module1", "Dim value As Long")
            .declaration(Declaration::new(
                "value",
                "Project1.Module1",
                DeclarationKind::Variable,
                Span::new(4, 9),
            ))
            .declaration(Declaration::new(
                "DoWork",
                "Project1.Module1",
                DeclarationKind::Procedure,
                Span::new(0, 0),
            ))
            .build();

        assert_eq!(snapshot.symbols().len(), 2);
        assert_eq!(snapshot.symbols().in_module(&module).count(), 2);
        let found: Vec<_> = snapshot.symbols().named("value").collect();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].kind, DeclarationKind::Variable);
    }
}
