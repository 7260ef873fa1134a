//! UMD Rendering Formatter.
//!
//! Each operation records edits on an [`EditBuffer`] using anchors taken from
//! the immutable [`SourceFile`] index, so operations compose in any order the
//! caller picks. An operation that fails returns before recording any edit.

use std::collections::BTreeMap;
use std::path::{Component, Path};

use crate::closure::{DeclarationShape, StatementAnchor, SynthesizedClosure};
use crate::config::RenderOptions;
use crate::decorators::DecoratorContainer;
use crate::edit_buffer::EditBuffer;
use crate::error::RenderError;
use crate::globals::global_path;
use crate::imports::{ImportGenerator, NamedImport};
use crate::ir::{CompiledClass, DecoratorRemovals, DirectExport, ExportDescriptor, ImportDescriptor};
use crate::printer::{self, OutputStatement};
use crate::source::SourceFile;
use crate::wrapper::{BranchKind, BranchSlot, DependencyArray, WrapperBranch};

const BRANCH_KINDS: [BranchKind; 5] = [
    BranchKind::CommonJs2,
    BranchKind::CommonJs,
    BranchKind::Amd,
    BranchKind::Global,
    BranchKind::GlobalWithInitializer,
];

#[derive(Debug, Clone)]
pub struct UmdRenderingFormatter {
    scope_aliases: BTreeMap<String, String>,
}

impl Default for UmdRenderingFormatter {
    fn default() -> Self {
        UmdRenderingFormatter::new(&RenderOptions::default())
    }
}

impl UmdRenderingFormatter {
    pub fn new(options: &RenderOptions) -> Self {
        UmdRenderingFormatter {
            scope_aliases: options.scope_aliases.clone(),
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // IMPORTS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Puts every import in front of each loader's dependency list and the
    /// matching qualifiers in front of the factory parameters.
    pub fn add_imports(
        &self,
        buffer: &mut EditBuffer<'_>,
        imports: &[ImportDescriptor],
        file: &SourceFile,
    ) -> Result<(), RenderError> {
        if imports.is_empty() {
            return Ok(());
        }
        let wrapper = file.wrapper()?;

        for kind in BRANCH_KINDS {
            let branch = match wrapper.branch(kind) {
                BranchSlot::Present(branch) => branch,
                BranchSlot::Absent => continue,
            };
            match branch {
                WrapperBranch::CommonJs2(call) | WrapperBranch::CommonJs(call) => {
                    let requires: Vec<String> = imports
                        .iter()
                        .map(|i| format!("require('{}')", i.specifier))
                        .collect();
                    prepend_to_list(buffer, call.arguments_start, &requires, call.argument_count > 0);
                }
                WrapperBranch::Amd(amd) => {
                    let specifiers: Vec<String> =
                        imports.iter().map(|i| format!("'{}'", i.specifier)).collect();
                    match amd.dependencies {
                        DependencyArray::Literal {
                            insert_at,
                            element_count,
                            ..
                        } => prepend_to_list(buffer, insert_at, &specifiers, element_count > 0),
                        DependencyArray::Missing { insert_at } => {
                            buffer.append_left(insert_at, format!("[{}],", specifiers.join(",")));
                        }
                    }
                }
                WrapperBranch::Global(call) | WrapperBranch::GlobalWithInitializer { call, .. } => {
                    let globals: Vec<String> = imports
                        .iter()
                        .map(|i| global_path(&i.specifier, &self.scope_aliases))
                        .collect();
                    prepend_to_list(buffer, call.arguments_start, &globals, call.argument_count > 0);
                }
            }
        }

        let qualifiers: Vec<String> = imports.iter().map(|i| i.qualifier.clone()).collect();
        prepend_to_list(
            buffer,
            wrapper.factory.parameters_start,
            &qualifiers,
            !wrapper.factory.parameters.is_empty(),
        );

        tracing::debug!(
            file = %file.file_name(),
            imports = imports.len(),
            branches = wrapper.branches.len(),
            "added UMD imports"
        );
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // EXPORTS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Appends `exports.X = ...;` for each descriptor at the end of the factory body.
    ///
    /// `entry_point_base_path` is the entry point's path without extension.
    /// Symbols declared elsewhere are reached through a generated import.
    pub fn add_exports(
        &self,
        buffer: &mut EditBuffer<'_>,
        entry_point_base_path: &Path,
        exports: &[ExportDescriptor],
        imports: &mut dyn ImportGenerator,
        file: &SourceFile,
    ) -> Result<(), RenderError> {
        if exports.is_empty() {
            return Ok(());
        }
        let insertion_point = file.wrapper()?.exports_insertion_point();
        let entry_dir = entry_point_base_path.parent().unwrap_or_else(|| Path::new(""));

        for export in exports {
            let base_path = export.from.with_extension("");
            let named = if base_path == entry_point_base_path {
                NamedImport {
                    module_import: None,
                    symbol: export
                        .local_name
                        .clone()
                        .unwrap_or_else(|| export.identifier.clone()),
                }
            } else {
                let module = relative_module(entry_dir, &base_path);
                imports.generate_named_import(&module, &export.identifier)
            };
            buffer.append_right(
                insertion_point,
                format!("\nexports.{} = {};", export.identifier, named.expression()),
            );
        }

        tracing::debug!(file = %file.file_name(), exports = exports.len(), "added UMD exports");
        Ok(())
    }

    /// `exports.<alias> = <qualifier>.<symbol>;` for symbols re-exported from other modules.
    pub fn add_direct_exports(
        &self,
        buffer: &mut EditBuffer<'_>,
        exports: &[DirectExport],
        imports: &mut dyn ImportGenerator,
        file: &SourceFile,
    ) -> Result<(), RenderError> {
        if exports.is_empty() {
            return Ok(());
        }
        let insertion_point = file.wrapper()?.exports_insertion_point();
        for export in exports {
            let named = imports.generate_named_import(&export.from_module, &export.symbol_name);
            buffer.append_right(
                insertion_point,
                format!("\nexports.{} = {};", export.as_alias, named.expression()),
            );
        }
        tracing::debug!(file = %file.file_name(), exports = exports.len(), "added direct exports");
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // CONSTANTS / DEFINITIONS / STATEMENTS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Constants live inside the factory, ahead of its `'use strict'` prologue.
    pub fn add_constants(
        &self,
        buffer: &mut EditBuffer<'_>,
        constants: &str,
        file: &SourceFile,
    ) -> Result<(), RenderError> {
        if constants.is_empty() {
            return Ok(());
        }
        let insertion_point = file.wrapper()?.constants_insertion_point();
        buffer.append_left(insertion_point, format!("\n{}\n", constants));
        tracing::debug!(file = %file.file_name(), "added constants");
        Ok(())
    }

    /// Inserts `definitions` right before the closure's `return <Class>;`.
    pub fn add_definitions(
        &self,
        buffer: &mut EditBuffer<'_>,
        class: &CompiledClass,
        definitions: &str,
        file: &SourceFile,
    ) -> Result<(), RenderError> {
        let ret = return_anchor(class, file)?;
        buffer.append_left(ret.full_start, format!("\n{}", definitions));
        tracing::debug!(file = %file.file_name(), class = %class.name, "added definitions");
        Ok(())
    }

    /// Inserts `statements` after the class's static members and any
    /// definitions, still ahead of the `return`.
    pub fn add_adjacent_statements(
        &self,
        buffer: &mut EditBuffer<'_>,
        class: &CompiledClass,
        statements: &str,
        file: &SourceFile,
    ) -> Result<(), RenderError> {
        let ret = return_anchor(class, file)?;
        buffer.append_right(ret.full_start, format!("\n{}", statements));
        tracing::debug!(file = %file.file_name(), class = %class.name, "added adjacent statements");
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // DECORATORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Removes decorator entries, keyed by the list that holds them.
    ///
    /// A list left without entries goes as a whole: the assignment statement,
    /// or the `= __decorate(...)` part of a `return X = __decorate(...)`.
    pub fn remove_decorators(
        &self,
        buffer: &mut EditBuffer<'_>,
        removals: &DecoratorRemovals,
        file: &SourceFile,
    ) -> Result<(), RenderError> {
        let mut resolved: Vec<(&DecoratorContainer, Vec<usize>)> = Vec::with_capacity(removals.len());
        for (&list, nodes) in removals {
            let ambiguous = |reason: String| RenderError::AmbiguousDecoratorContainer {
                file: file.file_name(),
                container: list,
                reason,
            };
            let container = match file.decorator_containers_at(list).as_slice() {
                [container] => *container,
                [] => return Err(ambiguous("no decorator list starts and ends here".into())),
                many => {
                    return Err(ambiguous(format!(
                        "{} decorator lists share this range",
                        many.len()
                    )))
                }
            };
            let mut indices = Vec::with_capacity(nodes.len());
            for &node in nodes {
                let index = container
                    .entry_index(node)
                    .ok_or_else(|| ambiguous(format!("{} is not an entry of the list", node)))?;
                if !indices.contains(&index) {
                    indices.push(index);
                }
            }
            resolved.push((container, indices));
        }

        let mut removed_entries = 0;
        for (container, indices) in resolved {
            if indices.is_empty() {
                continue;
            }
            removed_entries += indices.len();
            let emptied = container
                .entries
                .iter()
                .enumerate()
                .all(|(i, entry)| indices.contains(&i) || buffer.is_removed(entry.range));
            if emptied {
                buffer.remove(container.removal.range());
                continue;
            }
            for index in indices {
                if let Some(range) = container.entry_removal_range(index, file.text()) {
                    buffer.remove(range);
                }
            }
        }

        tracing::debug!(
            file = %file.file_name(),
            containers = removals.len(),
            entries = removed_entries,
            "removed decorators"
        );
        Ok(())
    }

    pub fn print_statement(
        &self,
        stmt: &OutputStatement,
        file: &SourceFile,
        imports: &mut dyn ImportGenerator,
    ) -> Result<String, RenderError> {
        printer::print_statement(stmt, file, imports)
    }
}

/// `items` joined by `,` at `offset`, plus a separator when the list already
/// had entries.
fn prepend_to_list(buffer: &mut EditBuffer<'_>, offset: u32, items: &[String], non_empty: bool) {
    let mut text = items.join(",");
    if non_empty {
        text.push(',');
    }
    buffer.append_left(offset, text);
}

/// Definitions and adjacent statements both hang off the `return <Class>;`.
fn return_anchor(class: &CompiledClass, file: &SourceFile) -> Result<StatementAnchor, RenderError> {
    class_closure(class, file)?
        .return_statement
        .ok_or_else(|| RenderError::MissingReturnStatement {
            class_name: class.name.clone(),
            file: file.file_name(),
        })
}

fn class_closure<'f>(class: &CompiledClass, file: &'f SourceFile) -> Result<&'f SynthesizedClosure, RenderError> {
    let declaration = file
        .declaration_at(class.declaration)
        .or_else(|| file.declaration_named(&class.name))
        .ok_or_else(|| RenderError::ClassNotFound {
            class_name: class.name.clone(),
            file: file.file_name(),
        })?;
    match &declaration.shape {
        DeclarationShape::Closure(closure) => Ok(closure),
        DeclarationShape::Other => Err(RenderError::InvalidClassDeclaration {
            class_name: class.name.clone(),
            file: file.file_name(),
            text: file.slice(declaration.range).to_string(),
        }),
    }
}

/// `./foo/b` style specifier for `target` as seen from `from_dir`.
fn relative_module(from_dir: &Path, target: &Path) -> String {
    let from: Vec<Component> = from_dir.components().collect();
    let to: Vec<Component> = target.components().collect();
    let common = from.iter().zip(&to).take_while(|(a, b)| a == b).count();

    let mut parts: Vec<String> = vec!["..".to_string(); from.len() - common];
    parts.extend(
        to[common..]
            .iter()
            .map(|c| c.as_os_str().to_string_lossy().into_owned()),
    );
    let relative = parts.join("/");
    if relative.starts_with("..") {
        relative
    } else {
        format!("./{}", relative)
    }
}
