use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::ops::Range;
use std::path::PathBuf;

// ═══════════════════════════════════════════════════════════════════════════════
// ANCHORS
// ═══════════════════════════════════════════════════════════════════════════════

/// A half-open byte range into the original (unedited) text of a source file.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct TextRange {
    pub start: u32,
    pub end: u32,
}

impl TextRange {
    pub fn new(start: u32, end: u32) -> Self {
        debug_assert!(start <= end, "inverted range {}..{}", start, end);
        TextRange { start, end }
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    pub fn len(&self) -> u32 {
        self.end.saturating_sub(self.start)
    }

    pub fn contains(&self, other: TextRange) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    pub fn as_range(&self) -> Range<usize> {
        self.start as usize..self.end as usize
    }

    pub fn slice<'s>(&self, text: &'s str) -> &'s str {
        text.get(self.as_range()).unwrap_or("")
    }
}

impl From<oxc_span::Span> for TextRange {
    fn from(span: oxc_span::Span) -> Self {
        TextRange {
            start: span.start,
            end: span.end,
        }
    }
}

impl fmt::Display for TextRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// IMPORT / EXPORT DESCRIPTORS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportDescriptor {
    pub specifier: String,
    pub qualifier: String,
}

impl ImportDescriptor {
    pub fn new(specifier: impl Into<String>, qualifier: impl Into<String>) -> Self {
        ImportDescriptor {
            specifier: specifier.into(),
            qualifier: qualifier.into(),
        }
    }
}

/// A symbol to re-export from the entry point.
///
/// `from` is the path of the file that declares the symbol. When it is the
/// entry point itself, `local_name` (or `identifier`) is assigned directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDescriptor {
    pub from: PathBuf,
    pub identifier: String,
    #[serde(default)]
    pub local_name: Option<String>,
}

impl ExportDescriptor {
    pub fn new(from: impl Into<PathBuf>, identifier: impl Into<String>) -> Self {
        ExportDescriptor {
            from: from.into(),
            identifier: identifier.into(),
            local_name: None,
        }
    }
}

/// `exports.<as_alias> = <qualifier>.<symbol_name>;`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectExport {
    pub symbol_name: String,
    pub as_alias: String,
    pub from_module: String,
}

// ═══════════════════════════════════════════════════════════════════════════════
// COMPILED CLASSES
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecoratorEntry {
    pub node: TextRange,
    pub container: TextRange,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterEntry {
    pub node: TextRange,
    pub type_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompiledClass {
    pub name: String,
    /// Range of the declarator (`A = (function () {...}())`) or declaration.
    pub declaration: TextRange,
    pub decorators: Vec<DecoratorEntry>,
    pub constructor_parameters: Vec<ParameterEntry>,
}

impl CompiledClass {
    pub fn decorator(&self, name: &str) -> Option<&DecoratorEntry> {
        self.decorators.iter().find(|d| d.name == name)
    }
}

/// Decorator nodes to strip, keyed by the list that contains them.
pub type DecoratorRemovals = BTreeMap<TextRange, Vec<TextRange>>;

pub fn removals_for<'d>(entries: impl IntoIterator<Item = &'d DecoratorEntry>) -> DecoratorRemovals {
    let mut removals = DecoratorRemovals::new();
    for entry in entries {
        removals.entry(entry.container).or_default().push(entry.node);
    }
    removals
}
