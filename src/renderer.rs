//! Per-file render pipeline.
//!
//! A [`FileRenderPlan`] is what the upstream analysis decided for one file.
//! [`Renderer::render_file`] applies it through the formatter in a fixed
//! order and flushes the buffer once, at the end.

#[cfg(feature = "napi")]
use napi_derive::napi;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::config::RenderOptions;
use crate::decorators::compiled_class;
use crate::edit_buffer::EditBuffer;
use crate::error::{RenderDiagnostic, RenderError};
use crate::formatter::UmdRenderingFormatter;
use crate::imports::ImportManager;
use crate::ir::{removals_for, DirectExport, ExportDescriptor};
use crate::printer::OutputStatement;
use crate::source::SourceFile;
use crate::source_map::SourceMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClassRenderPlan {
    pub name: String,
    pub definitions: Vec<OutputStatement>,
    pub adjacent_statements: Vec<OutputStatement>,
    /// Names of decorators to strip from the class.
    pub remove_decorators: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EntryPointExports {
    /// Entry-point path without extension.
    pub base_path: PathBuf,
    pub exports: Vec<ExportDescriptor>,
    pub direct_exports: Vec<DirectExport>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FileRenderPlan {
    pub classes: Vec<ClassRenderPlan>,
    pub constants: Vec<OutputStatement>,
    pub entry_point: Option<EntryPointExports>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedFile {
    pub path: PathBuf,
    pub code: String,
    pub map: Option<SourceMap>,
    /// Classes that were skipped, one entry each.
    pub diagnostics: Vec<RenderDiagnostic>,
}

pub struct Renderer {
    formatter: UmdRenderingFormatter,
    options: RenderOptions,
}

impl Renderer {
    pub fn new(options: RenderOptions) -> Self {
        Renderer {
            formatter: UmdRenderingFormatter::new(&options),
            options,
        }
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    pub fn render_file(&self, file: &SourceFile, plan: &FileRenderPlan) -> Result<RenderedFile, RenderError> {
        // Anything the file cannot be rendered without is checked up front.
        file.wrapper()?;

        let mut buffer = EditBuffer::new(file.text());
        let mut imports = ImportManager::new(self.options.import_prefix.clone());
        let mut diagnostics = Vec::new();

        let skip = |err: RenderError, diagnostics: &mut Vec<RenderDiagnostic>| -> Result<(), RenderError> {
            if !err.is_class_scoped() {
                return Err(err);
            }
            tracing::warn!(file = %file.file_name(), code = err.code(), "{}", err);
            diagnostics.push(RenderDiagnostic::from(&err));
            Ok(())
        };

        // 1. Decorators.
        for class_plan in plan.classes.iter().filter(|c| !c.remove_decorators.is_empty()) {
            let class = match compiled_class(file, &class_plan.name) {
                Ok(class) => class,
                Err(err) => {
                    skip(err, &mut diagnostics)?;
                    continue;
                }
            };
            let entries = class
                .decorators
                .iter()
                .filter(|d| class_plan.remove_decorators.contains(&d.name));
            self.formatter
                .remove_decorators(&mut buffer, &removals_for(entries), file)?;
        }

        // 2. Definitions, then adjacent statements.
        for class_plan in &plan.classes {
            if class_plan.definitions.is_empty() && class_plan.adjacent_statements.is_empty() {
                continue;
            }
            let class = match compiled_class(file, &class_plan.name) {
                Ok(class) => class,
                Err(err) => {
                    if !diagnostics
                        .iter()
                        .any(|d| d.class_name.as_deref() == Some(class_plan.name.as_str()))
                    {
                        skip(err, &mut diagnostics)?;
                    }
                    continue;
                }
            };

            let definitions = self.print_all(&class_plan.definitions, file, &mut imports)?;
            if !definitions.is_empty() {
                if let Err(err) = self
                    .formatter
                    .add_definitions(&mut buffer, &class, &definitions, file)
                {
                    skip(err, &mut diagnostics)?;
                    continue;
                }
            }
            let statements = self.print_all(&class_plan.adjacent_statements, file, &mut imports)?;
            if !statements.is_empty() {
                if let Err(err) = self
                    .formatter
                    .add_adjacent_statements(&mut buffer, &class, &statements, file)
                {
                    skip(err, &mut diagnostics)?;
                }
            }
        }

        // 3. Constants.
        let constants = self.print_all(&plan.constants, file, &mut imports)?;
        self.formatter.add_constants(&mut buffer, &constants, file)?;

        // 4. Exports.
        if let Some(entry_point) = &plan.entry_point {
            self.formatter.add_exports(
                &mut buffer,
                &entry_point.base_path,
                &entry_point.exports,
                &mut imports,
                file,
            )?;
            self.formatter
                .add_direct_exports(&mut buffer, &entry_point.direct_exports, &mut imports, file)?;
        }

        // 5. Everything the steps above imported.
        self.formatter
            .add_imports(&mut buffer, &imports.all_imports(), file)?;

        // 6. Flush.
        let file_name = file
            .path()
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let (code, map) = if self.options.source_map {
            let map_name = format!("{}.map", file_name);
            let map = buffer.generate_map(&file_name, &file_name);
            let mut code = buffer.to_string();
            if !code.ends_with('\n') {
                code.push('\n');
            }
            code.push_str(&SourceMap::url_comment(&map_name));
            (code, Some(map))
        } else {
            (buffer.to_string(), None)
        };

        tracing::debug!(
            file = %file.file_name(),
            classes = plan.classes.len(),
            imports = imports.all_imports().len(),
            skipped = diagnostics.len(),
            "rendered file"
        );

        Ok(RenderedFile {
            path: file.path().to_path_buf(),
            code,
            map,
            diagnostics,
        })
    }

    fn print_all(
        &self,
        statements: &[OutputStatement],
        file: &SourceFile,
        imports: &mut ImportManager,
    ) -> Result<String, RenderError> {
        let mut printed = Vec::with_capacity(statements.len());
        for stmt in statements {
            printed.push(self.formatter.print_statement(stmt, file, imports)?);
        }
        Ok(printed.join("\n"))
    }
}

impl Default for Renderer {
    fn default() -> Self {
        Renderer::new(RenderOptions::default())
    }
}

/// Renders one file held in memory. Returns the [`RenderedFile`] as JSON.
#[cfg(feature = "napi")]
#[napi]
pub fn render_umd_file_native(
    path: String,
    source: String,
    plan_json: String,
    options_json: String,
) -> napi::Result<serde_json::Value> {
    let plan: FileRenderPlan = serde_json::from_str(&plan_json)
        .map_err(|e| napi::Error::from_reason(format!("Invalid render plan: {}", e)))?;
    let options =
        RenderOptions::from_json(&options_json).map_err(|e| napi::Error::from_reason(e.to_string()))?;
    let file = SourceFile::parse(&path, source).map_err(|e| napi::Error::from_reason(e.to_string()))?;
    let rendered = Renderer::new(options)
        .render_file(&file, &plan)
        .map_err(|e| napi::Error::from_reason(e.to_string()))?;
    serde_json::to_value(rendered).map_err(|e| napi::Error::from_reason(e.to_string()))
}
