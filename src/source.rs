//! Parsed source files.
//!
//! A [`SourceFile`] is parsed exactly once. Everything later stages need
//! (wrapper anchors, class closures, decorator lists) is extracted into an
//! owned index of byte offsets, so the oxc arena does not outlive `parse`.

use oxc_allocator::Allocator;
use oxc_ast::ast::Statement;
use oxc_parser::Parser;
use oxc_span::SourceType;
use std::path::{Path, PathBuf};

use crate::closure::{collect_declarations, Declaration, DeclarationShape, SynthesizedClosure};
use crate::decorators::DecoratorContainer;
use crate::error::RenderError;
use crate::ir::TextRange;
use crate::wrapper::{recognize, WrapperDescriptor};

#[derive(Debug, Clone)]
struct ModuleIndex {
    wrapper: Result<WrapperDescriptor, RenderError>,
    declarations: Vec<Declaration>,
}

#[derive(Debug, Clone)]
pub struct SourceFile {
    path: PathBuf,
    text: String,
    index: ModuleIndex,
}

impl SourceFile {
    /// Parses `text` as a classic script and indexes it.
    ///
    /// Fails only on syntax errors. A file whose wrapper is not recognised
    /// still parses; operations that need the wrapper report it.
    pub fn parse(path: impl Into<PathBuf>, text: impl Into<String>) -> Result<Self, RenderError> {
        let path = path.into();
        let text = text.into();
        let file_name = path.display().to_string();

        let allocator = Allocator::default();
        let source_type = SourceType::default().with_module(false);
        let ret = Parser::new(&allocator, &text, source_type).parse();

        if !ret.errors.is_empty() {
            let message = ret
                .errors
                .iter()
                .map(|e| e.to_string())
                .collect::<Vec<_>>()
                .join("; ");
            return Err(RenderError::Parse {
                file: file_name,
                message,
            });
        }

        let index = match recognize(&ret.program, &text, &file_name) {
            Ok(recognized) => ModuleIndex {
                declarations: collect_declarations(&recognized.factory_body.statements, &text),
                wrapper: Ok(recognized.descriptor),
            },
            Err(err) => {
                let statements: &[Statement] = &ret.program.body;
                ModuleIndex {
                    declarations: collect_declarations(statements, &text),
                    wrapper: Err(err),
                }
            }
        };

        tracing::debug!(
            file = %file_name,
            umd = index.wrapper.is_ok(),
            declarations = index.declarations.len(),
            "indexed source file"
        );

        Ok(SourceFile { path, text, index })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file_name(&self) -> String {
        self.path.display().to_string()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn slice(&self, range: TextRange) -> &str {
        range.slice(&self.text)
    }

    pub fn wrapper(&self) -> Result<&WrapperDescriptor, RenderError> {
        self.index.wrapper.as_ref().map_err(Clone::clone)
    }

    pub fn is_umd(&self) -> bool {
        self.index.wrapper.is_ok()
    }

    pub fn declarations(&self) -> &[Declaration] {
        &self.index.declarations
    }

    pub fn declaration_at(&self, range: TextRange) -> Option<&Declaration> {
        self.index.declarations.iter().find(|d| d.range == range)
    }

    pub fn declaration_named(&self, name: &str) -> Option<&Declaration> {
        self.index.declarations.iter().find(|d| d.name == name)
    }

    pub fn closures(&self) -> impl Iterator<Item = &SynthesizedClosure> {
        self.index.declarations.iter().filter_map(|d| match &d.shape {
            DeclarationShape::Closure(closure) => Some(closure),
            DeclarationShape::Other => None,
        })
    }

    /// Every container whose list literal spans exactly `list`.
    pub fn decorator_containers_at(&self, list: TextRange) -> Vec<&DecoratorContainer> {
        self.closures()
            .flat_map(|closure| closure.decorator_containers.iter())
            .filter(|container| container.list == list)
            .collect()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TRIVIA
// ═══════════════════════════════════════════════════════════════════════════════

/// Skips whitespace and comments starting at `pos`.
pub(crate) fn skip_trivia(text: &str, mut pos: usize) -> usize {
    let bytes = text.as_bytes();
    while pos < bytes.len() {
        match bytes[pos] {
            b' ' | b'\t' | b'\n' | b'\r' | 0x0b | 0x0c => pos += 1,
            b'/' if bytes.get(pos + 1) == Some(&b'/') => {
                pos = text[pos..].find('\n').map_or(bytes.len(), |n| pos + n + 1);
            }
            b'/' if bytes.get(pos + 1) == Some(&b'*') => {
                pos = text[pos + 2..].find("*/").map_or(bytes.len(), |n| pos + 2 + n + 2);
            }
            _ => {
                // Non-ASCII whitespace (NBSP, BOM, line separators).
                match text[pos..].chars().next() {
                    Some(c) if c.is_whitespace() || c == '\u{feff}' => pos += c.len_utf8(),
                    _ => break,
                }
            }
        }
    }
    pos
}

/// Offset just past `expected` when it is the next token after `from`.
pub(crate) fn offset_after_token(text: &str, from: u32, expected: u8) -> Option<u32> {
    let pos = skip_trivia(text, from as usize);
    (text.as_bytes().get(pos) == Some(&expected)).then(|| pos as u32 + 1)
}

/// Offset just past the first `expected` byte in `from..to`.
pub(crate) fn offset_after_byte(text: &str, from: u32, to: u32, expected: u8) -> Option<u32> {
    let window = text.get(from as usize..to as usize)?;
    window
        .bytes()
        .position(|b| b == expected)
        .map(|n| from + n as u32 + 1)
}
