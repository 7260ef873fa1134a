//! Statement Printer.
//!
//! Generated definitions arrive as a small language-neutral tree. It is
//! rendered to modern JavaScript, reparsed with oxc, lowered so that every
//! declaration is a plain `var`, and printed back with `oxc_codegen`. Going
//! through codegen gives canonical literals (`true`, `"qux"`, `42`) for free.

use oxc_allocator::Allocator;
use oxc_ast::ast::{VariableDeclaration, VariableDeclarationKind};
use oxc_ast_visit::VisitMut;
use oxc_codegen::Codegen;
use oxc_parser::{ParseOptions, Parser};
use oxc_span::SourceType;
use serde::{Deserialize, Serialize};

use crate::error::RenderError;
use crate::imports::ImportGenerator;
use crate::source::SourceFile;

// ═══════════════════════════════════════════════════════════════════════════════
// OUTPUT AST
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StmtModifier {
    Final,
    Private,
    Exported,
    Static,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LiteralValue {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapEntry {
    pub key: String,
    pub value: OutputExpression,
    #[serde(default)]
    pub quoted: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum OutputExpression {
    Literal {
        value: LiteralValue,
    },
    ReadVar {
        name: String,
    },
    /// A symbol exported by another module; printed through the import manager.
    External {
        module: String,
        name: String,
    },
    ReadProp {
        receiver: Box<OutputExpression>,
        name: String,
    },
    WriteProp {
        receiver: Box<OutputExpression>,
        name: String,
        value: Box<OutputExpression>,
    },
    Invoke {
        callee: Box<OutputExpression>,
        #[serde(default)]
        args: Vec<OutputExpression>,
    },
    Instantiate {
        target: Box<OutputExpression>,
        #[serde(default)]
        args: Vec<OutputExpression>,
    },
    LiteralArray {
        #[serde(default)]
        entries: Vec<OutputExpression>,
    },
    LiteralMap {
        #[serde(default)]
        entries: Vec<MapEntry>,
    },
    /// Pre-rendered JavaScript expression text.
    Raw {
        code: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum OutputStatement {
    DeclareVar {
        name: String,
        #[serde(default)]
        value: Option<OutputExpression>,
        #[serde(default)]
        modifiers: Vec<StmtModifier>,
    },
    Expression {
        expr: OutputExpression,
    },
    Return {
        value: OutputExpression,
    },
}

impl OutputStatement {
    pub fn declare_var(name: impl Into<String>, value: OutputExpression) -> Self {
        OutputStatement::DeclareVar {
            name: name.into(),
            value: Some(value),
            modifiers: Vec::new(),
        }
    }
}

impl OutputExpression {
    pub fn literal(value: impl Into<LiteralValue>) -> Self {
        OutputExpression::Literal {
            value: value.into(),
        }
    }

    pub fn read_var(name: impl Into<String>) -> Self {
        OutputExpression::ReadVar { name: name.into() }
    }

    pub fn external(module: impl Into<String>, name: impl Into<String>) -> Self {
        OutputExpression::External {
            module: module.into(),
            name: name.into(),
        }
    }
}

impl From<bool> for LiteralValue {
    fn from(value: bool) -> Self {
        LiteralValue::Bool(value)
    }
}

impl From<f64> for LiteralValue {
    fn from(value: f64) -> Self {
        LiteralValue::Number(value)
    }
}

impl From<i32> for LiteralValue {
    fn from(value: i32) -> Self {
        LiteralValue::Number(value.into())
    }
}

impl From<&str> for LiteralValue {
    fn from(value: &str) -> Self {
        LiteralValue::String(value.to_string())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// PRINTING
// ═══════════════════════════════════════════════════════════════════════════════

/// Prints `stmt` in the ES5 dialect of `file`.
///
/// Cross-module references register imports on `imports`; nothing else is
/// mutated.
pub fn print_statement(
    stmt: &OutputStatement,
    file: &SourceFile,
    imports: &mut dyn ImportGenerator,
) -> Result<String, RenderError> {
    let print_error = |message: String| RenderError::Print {
        file: file.file_name(),
        message,
    };

    let modern = emit_statement(stmt, imports).map_err(print_error)?;
    downlevel(&modern).map_err(print_error)
}

fn emit_statement(stmt: &OutputStatement, imports: &mut dyn ImportGenerator) -> Result<String, String> {
    Ok(match stmt {
        OutputStatement::DeclareVar {
            name,
            value,
            modifiers,
        } => {
            let keyword = if value.is_some() && modifiers.contains(&StmtModifier::Final) {
                "const"
            } else {
                "let"
            };
            match value {
                Some(value) => format!("{} {} = {};", keyword, name, emit_expression(value, imports)?),
                None => format!("{} {};", keyword, name),
            }
        }
        OutputStatement::Expression { expr } => format!("({});", emit_expression(expr, imports)?),
        OutputStatement::Return { value } => format!("return {};", emit_expression(value, imports)?),
    })
}

fn emit_expression(expr: &OutputExpression, imports: &mut dyn ImportGenerator) -> Result<String, String> {
    Ok(match expr {
        OutputExpression::Literal { value } => emit_literal(value)?,
        OutputExpression::ReadVar { name } => name.clone(),
        OutputExpression::External { module, name } => {
            imports.generate_named_import(module, name).expression()
        }
        OutputExpression::ReadProp { receiver, name } => {
            format!("({}).{}", emit_expression(receiver, imports)?, name)
        }
        OutputExpression::WriteProp {
            receiver,
            name,
            value,
        } => format!(
            "({}).{} = ({})",
            emit_expression(receiver, imports)?,
            name,
            emit_expression(value, imports)?
        ),
        OutputExpression::Invoke { callee, args } => format!(
            "({})({})",
            emit_expression(callee, imports)?,
            emit_list(args, imports)?
        ),
        OutputExpression::Instantiate { target, args } => format!(
            "new ({})({})",
            emit_expression(target, imports)?,
            emit_list(args, imports)?
        ),
        OutputExpression::LiteralArray { entries } => format!("[{}]", emit_list(entries, imports)?),
        OutputExpression::LiteralMap { entries } => {
            let mut props = Vec::with_capacity(entries.len());
            for entry in entries {
                let key = if entry.quoted {
                    serde_json::to_string(&entry.key).map_err(|e| e.to_string())?
                } else {
                    entry.key.clone()
                };
                props.push(format!("{}: ({})", key, emit_expression(&entry.value, imports)?));
            }
            format!("({{{}}})", props.join(", "))
        }
        OutputExpression::Raw { code } => format!("({})", code),
    })
}

fn emit_list(exprs: &[OutputExpression], imports: &mut dyn ImportGenerator) -> Result<String, String> {
    let mut out = Vec::with_capacity(exprs.len());
    for expr in exprs {
        out.push(format!("({})", emit_expression(expr, imports)?));
    }
    Ok(out.join(", "))
}

fn emit_literal(value: &LiteralValue) -> Result<String, String> {
    Ok(match value {
        LiteralValue::Null => "null".to_string(),
        LiteralValue::Bool(b) => b.to_string(),
        LiteralValue::Number(n) if n.is_nan() => "NaN".to_string(),
        LiteralValue::Number(n) if n.is_infinite() => {
            if n.is_sign_negative() { "(-Infinity)" } else { "Infinity" }.to_string()
        }
        LiteralValue::Number(n) if *n < 0.0 => format!("({})", n),
        LiteralValue::Number(n) => n.to_string(),
        LiteralValue::String(s) => serde_json::to_string(s).map_err(|e| e.to_string())?,
    })
}

/// Reparses `modern` and prints it back with every declaration as `var`.
fn downlevel(modern: &str) -> Result<String, String> {
    let allocator = Allocator::default();
    let options = ParseOptions {
        preserve_parens: false,
        allow_return_outside_function: true,
        ..ParseOptions::default()
    };
    let ret = Parser::new(&allocator, modern, SourceType::default().with_module(false))
        .with_options(options)
        .parse();
    if !ret.errors.is_empty() {
        let messages: Vec<String> = ret.errors.iter().map(|e| e.to_string()).collect();
        return Err(format!("{}: {}", messages.join("; "), modern));
    }

    let mut program = ret.program;
    VarDownleveler.visit_program(&mut program);
    Ok(Codegen::new().build(&program).code.trim().to_string())
}

struct VarDownleveler;

impl<'a> VisitMut<'a> for VarDownleveler {
    fn visit_variable_declaration(&mut self, decl: &mut VariableDeclaration<'a>) {
        decl.kind = VariableDeclarationKind::Var;
        oxc_ast_visit::walk_mut::walk_variable_declaration(self, decl);
    }
}
