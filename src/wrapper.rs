//! Wrapper Shape Recognizer.
//!
//! Matches the top-level IIFE of a UMD bundle and extracts, per loader branch,
//! the offsets where dependencies and factory parameters are inserted.
//!
//! Two layouts are supported:
//!
//! ```text
//! (function (global, factory) {                 (function (root, factory) {
//!   typeof exports === 'object' && ... ?          if (typeof exports === 'object' && ...)
//!     factory(exports, require('a')) :              module.exports = factory(require('a'));
//!   typeof define === 'function' && ... ?         else if (typeof define === 'function' && ...)
//!     define('m', ['exports', 'a'], factory) :      define(['a'], factory);
//!   (global = global || self,                     else if (typeof exports === 'object')
//!     factory(global.m = {}, global.a));            exports['m'] = factory(require('a'));
//! }(this, (function (exports, a) { ... })));      else root['m'] = factory(root['a']);
//!                                               })(this, function (a) { ... });
//! ```

use oxc_ast::ast::{
    AssignmentTarget, BindingPattern, CallExpression, ConditionalExpression, Expression, Function,
    FunctionBody, IfStatement, Program, Statement,
};
use oxc_span::GetSpan;
use oxc_syntax::operator::{BinaryOperator, LogicalOperator, UnaryOperator};
use serde::{Deserialize, Serialize};

use crate::error::RenderError;
use crate::ir::TextRange;
use crate::source::{offset_after_byte, offset_after_token};

// ═══════════════════════════════════════════════════════════════════════════════
// DESCRIPTOR TYPES
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WrapperStyle {
    /// `cond ? a : cond ? b : c` (Rollup, TypeScript UMD output).
    Conditional,
    /// `if (...) ... else if (...) ... else ...` (webpack `libraryTarget: 'umd'`).
    IfChain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BranchKind {
    CommonJs2,
    CommonJs,
    Amd,
    Global,
    GlobalWithInitializer,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallAnchor {
    pub call: TextRange,
    /// Just after the call's opening parenthesis.
    pub arguments_start: u32,
    pub argument_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum DependencyArray {
    Literal {
        array: TextRange,
        insert_at: u32,
        element_count: usize,
    },
    /// `define(factory)` or `define('name', factory)`: the array is created
    /// in front of the factory argument.
    Missing { insert_at: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AmdAnchor {
    pub call: CallAnchor,
    pub dependencies: DependencyArray,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum WrapperBranch {
    CommonJs2(CallAnchor),
    CommonJs(CallAnchor),
    Amd(AmdAnchor),
    Global(CallAnchor),
    GlobalWithInitializer {
        call: CallAnchor,
        initializer: TextRange,
    },
}

impl WrapperBranch {
    pub fn kind(&self) -> BranchKind {
        match self {
            WrapperBranch::CommonJs2(_) => BranchKind::CommonJs2,
            WrapperBranch::CommonJs(_) => BranchKind::CommonJs,
            WrapperBranch::Amd(_) => BranchKind::Amd,
            WrapperBranch::Global(_) => BranchKind::Global,
            WrapperBranch::GlobalWithInitializer { .. } => BranchKind::GlobalWithInitializer,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchSlot<'d> {
    Present(&'d WrapperBranch),
    Absent,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FactoryAnchor {
    pub function: TextRange,
    /// Just after the parameter list's opening parenthesis.
    pub parameters_start: u32,
    pub parameters: Vec<String>,
    /// The body including its braces.
    pub body: TextRange,
    /// Start of the first directive or statement.
    pub first_statement_start: Option<u32>,
    /// End of the last directive or statement.
    pub last_statement_end: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WrapperDescriptor {
    pub style: WrapperStyle,
    pub wrapper_function: TextRange,
    pub factory: FactoryAnchor,
    /// Present branches in source order.
    pub branches: Vec<WrapperBranch>,
    pub exports_param_index: Option<usize>,
}

impl WrapperDescriptor {
    pub fn branch(&self, kind: BranchKind) -> BranchSlot<'_> {
        match self.branches.iter().find(|b| b.kind() == kind) {
            Some(branch) => BranchSlot::Present(branch),
            None => BranchSlot::Absent,
        }
    }

    pub fn has_branch(&self, kind: BranchKind) -> bool {
        matches!(self.branch(kind), BranchSlot::Present(_))
    }

    /// Where export assignments go: after the last factory statement.
    pub fn exports_insertion_point(&self) -> u32 {
        self.factory
            .last_statement_end
            .unwrap_or(self.factory.body.end.saturating_sub(1))
    }

    /// Where constants go: before the first factory statement or prologue.
    pub fn constants_insertion_point(&self) -> u32 {
        self.factory
            .first_statement_start
            .unwrap_or(self.factory.body.start + 1)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// RECOGNITION
// ═══════════════════════════════════════════════════════════════════════════════

pub(crate) struct RecognizedWrapper<'b, 'a> {
    pub descriptor: WrapperDescriptor,
    pub factory_body: &'b FunctionBody<'a>,
}

struct BranchCall<'b, 'a> {
    condition: Option<&'b Expression<'a>>,
    call: &'b CallExpression<'a>,
    initializer: Option<TextRange>,
}

pub(crate) fn recognize<'b, 'a>(
    program: &'b Program<'a>,
    source: &str,
    file: &str,
) -> Result<RecognizedWrapper<'b, 'a>, RenderError> {
    let unrecognized = |reason: String| RenderError::UnrecognizedWrapper {
        file: file.to_string(),
        reason,
    };

    let (wrapper_call, wrapper_fn) = program
        .body
        .iter()
        .find_map(umd_wrapper_call)
        .ok_or_else(|| unrecognized("expected a top-level IIFE wrapping the module".into()))?;

    let factory_param_index = wrapper_fn
        .params
        .items
        .iter()
        .position(|param| binding_name(&param.pattern) == Some("factory"))
        .ok_or_else(|| unrecognized("the wrapper function has no `factory` parameter".into()))?;

    let factory_fn = wrapper_call
        .arguments
        .get(factory_param_index)
        .and_then(|arg| arg.as_expression())
        .and_then(|expr| match unwrap_parens(expr) {
            Expression::FunctionExpression(func) => Some(&**func),
            _ => None,
        })
        .ok_or_else(|| unrecognized("the factory argument is not a function expression".into()))?;
    let factory_body = factory_fn
        .body
        .as_deref()
        .ok_or_else(|| unrecognized("the factory function has no body".into()))?;

    let wrapper_body = wrapper_fn
        .body
        .as_deref()
        .ok_or_else(|| unrecognized("the wrapper function has no body".into()))?;
    let (style, calls) = match wrapper_body.statements.first() {
        Some(Statement::ExpressionStatement(stmt)) => match unwrap_parens(&stmt.expression) {
            Expression::ConditionalExpression(cond) => (
                WrapperStyle::Conditional,
                conditional_branches(cond, source).map_err(unrecognized)?,
            ),
            _ => {
                return Err(unrecognized(
                    "the wrapper body does not start with a conditional expression".into(),
                ))
            }
        },
        Some(Statement::IfStatement(stmt)) => (
            WrapperStyle::IfChain,
            if_chain_branches(stmt, source).map_err(unrecognized)?,
        ),
        _ => {
            return Err(unrecognized(
                "the wrapper body must start with a conditional expression or an if statement"
                    .into(),
            ))
        }
    };

    let mut branches = Vec::with_capacity(calls.len());
    let mut exports_param_index = None;
    for branch_call in &calls {
        let Some(branch) = classify(branch_call, source) else {
            continue;
        };
        if exports_param_index.is_none()
            && matches!(branch, WrapperBranch::CommonJs(_) | WrapperBranch::CommonJs2(_))
        {
            exports_param_index = exports_argument_index(branch_call.call);
        }
        branches.push(branch);
    }
    if !branches
        .iter()
        .any(|b| matches!(b, WrapperBranch::CommonJs(_) | WrapperBranch::CommonJs2(_)))
    {
        return Err(unrecognized(
            "the wrapper has neither a CommonJS nor a CommonJS2 branch".into(),
        ));
    }

    let factory = factory_anchor(factory_fn, factory_body, source)
        .ok_or_else(|| unrecognized("cannot locate the factory parameter list".into()))?;

    Ok(RecognizedWrapper {
        descriptor: WrapperDescriptor {
            style,
            wrapper_function: wrapper_fn.span.into(),
            factory,
            branches,
            exports_param_index,
        },
        factory_body,
    })
}

/// `(function () {...}(...))` or `(function () {...})(...)`.
fn umd_wrapper_call<'b, 'a>(
    stmt: &'b Statement<'a>,
) -> Option<(&'b CallExpression<'a>, &'b Function<'a>)> {
    let Statement::ExpressionStatement(stmt) = stmt else {
        return None;
    };
    let Expression::CallExpression(call) = unwrap_parens(&stmt.expression) else {
        return None;
    };
    let Expression::FunctionExpression(func) = unwrap_parens(&call.callee) else {
        return None;
    };
    Some((&**call, &**func))
}

fn conditional_branches<'b, 'a>(
    root: &'b ConditionalExpression<'a>,
    source: &str,
) -> Result<Vec<BranchCall<'b, 'a>>, String> {
    let mut calls = Vec::new();
    let mut current = root;
    loop {
        if !is_condition(&current.test) {
            return Err(format!(
                "condition `{}` is not a binary expression",
                TextRange::from(current.test.span()).slice(source)
            ));
        }
        calls.push(branch_call(Some(&current.test), &current.consequent, source)?);
        match unwrap_parens(&current.alternate) {
            Expression::ConditionalExpression(next) => current = &**next,
            last => {
                calls.push(branch_call(None, last, source)?);
                return Ok(calls);
            }
        }
    }
}

fn if_chain_branches<'b, 'a>(
    root: &'b IfStatement<'a>,
    source: &str,
) -> Result<Vec<BranchCall<'b, 'a>>, String> {
    let mut calls = Vec::new();
    let mut current = root;
    loop {
        if !is_condition(&current.test) {
            return Err(format!(
                "condition `{}` is not a binary expression",
                TextRange::from(current.test.span()).slice(source)
            ));
        }
        calls.push(branch_call(
            Some(&current.test),
            statement_expression(&current.consequent, source)?,
            source,
        )?);
        match &current.alternate {
            None => return Ok(calls),
            Some(Statement::IfStatement(next)) => current = &**next,
            Some(last) => {
                calls.push(branch_call(None, statement_expression(last, source)?, source)?);
                return Ok(calls);
            }
        }
    }
}

fn statement_expression<'b, 'a>(
    stmt: &'b Statement<'a>,
    source: &str,
) -> Result<&'b Expression<'a>, String> {
    match stmt {
        Statement::ExpressionStatement(stmt) => Ok(&stmt.expression),
        other => Err(format!(
            "UMD wrapper branch is not an expression statement:\n{}",
            TextRange::from(other.span()).slice(source)
        )),
    }
}

/// Digs the loader call out of `(a = b, c = factory(...))`-like expressions.
fn branch_call<'b, 'a>(
    condition: Option<&'b Expression<'a>>,
    expr: &'b Expression<'a>,
    source: &str,
) -> Result<BranchCall<'b, 'a>, String> {
    match expr {
        Expression::ParenthesizedExpression(paren) => {
            branch_call(condition, &paren.expression, source)
        }
        Expression::SequenceExpression(seq) => {
            let last = seq
                .expressions
                .last()
                .ok_or_else(|| "empty sequence expression in UMD wrapper".to_string())?;
            let mut found = branch_call(condition, last, source)?;
            if found.initializer.is_none() && seq.expressions.len() > 1 {
                found.initializer = seq.expressions.first().and_then(global_initializer);
            }
            Ok(found)
        }
        Expression::AssignmentExpression(assign) => branch_call(condition, &assign.right, source),
        Expression::CallExpression(call) => Ok(BranchCall {
            condition,
            call,
            initializer: None,
        }),
        other => Err(format!(
            "Expression inside UMD wrapper is not a call expression:\n{}",
            TextRange::from(other.span()).slice(source)
        )),
    }
}

/// `global = global || self` and friends.
fn global_initializer(expr: &Expression<'_>) -> Option<TextRange> {
    match unwrap_parens(expr) {
        Expression::AssignmentExpression(assign)
            if matches!(assign.left, AssignmentTarget::AssignmentTargetIdentifier(_)) =>
        {
            Some(assign.span.into())
        }
        _ => None,
    }
}

fn classify(branch: &BranchCall<'_, '_>, source: &str) -> Option<WrapperBranch> {
    let callee = match unwrap_parens(&branch.call.callee) {
        Expression::Identifier(ident) => ident.name.as_str(),
        _ => return None,
    };

    let Some(condition) = branch.condition else {
        if callee != "factory" {
            return None;
        }
        let call = call_anchor(branch.call, source)?;
        return Some(match branch.initializer {
            Some(initializer) => WrapperBranch::GlobalWithInitializer { call, initializer },
            None => WrapperBranch::Global(call),
        });
    };

    match callee {
        "define" if is_amd_condition(condition) => {
            Some(WrapperBranch::Amd(amd_anchor(branch.call, source)?))
        }
        "factory" if is_common_js_condition(condition) => {
            Some(WrapperBranch::CommonJs(call_anchor(branch.call, source)?))
        }
        "factory" if is_common_js2_condition(condition) => {
            Some(WrapperBranch::CommonJs2(call_anchor(branch.call, source)?))
        }
        _ => None,
    }
}

/// Position of the bare `exports` argument in a CommonJS loader call.
///
/// The factory receives its exports object at the same position, whatever
/// the parameter is called.
fn exports_argument_index(call: &CallExpression<'_>) -> Option<usize> {
    call.arguments.iter().position(|arg| {
        matches!(
            arg.as_expression().map(unwrap_parens),
            Some(Expression::Identifier(ident)) if ident.name == "exports"
        )
    })
}

// ═══════════════════════════════════════════════════════════════════════════════
// CONDITIONS
// ═══════════════════════════════════════════════════════════════════════════════

fn is_condition(expr: &Expression<'_>) -> bool {
    matches!(
        unwrap_parens(expr),
        Expression::BinaryExpression(_) | Expression::LogicalExpression(_)
    )
}

/// `typeof define === 'function' && define.amd`
fn is_amd_condition(expr: &Expression<'_>) -> bool {
    match unwrap_parens(expr) {
        Expression::LogicalExpression(logical) if logical.operator == LogicalOperator::And => {
            is_typeof_check(&logical.left, &["define"]) || is_typeof_check(&logical.right, &["define"])
        }
        _ => false,
    }
}

/// `typeof exports === 'object'`
fn is_common_js_condition(expr: &Expression<'_>) -> bool {
    match unwrap_parens(expr) {
        Expression::BinaryExpression(binary) => {
            binary.operator == BinaryOperator::StrictEquality && is_typeof_check(expr, &["exports"])
        }
        _ => false,
    }
}

/// `typeof exports === 'object' && typeof module !== 'undefined'`
fn is_common_js2_condition(expr: &Expression<'_>) -> bool {
    const NAMES: &[&str] = &["exports", "module"];
    match unwrap_parens(expr) {
        Expression::LogicalExpression(logical) if logical.operator == LogicalOperator::And => {
            is_typeof_check(&logical.left, NAMES) || is_typeof_check(&logical.right, NAMES)
        }
        _ => false,
    }
}

/// `typeof <name> <op> ...` for one of `names`.
fn is_typeof_check(expr: &Expression<'_>, names: &[&str]) -> bool {
    let Expression::BinaryExpression(binary) = unwrap_parens(expr) else {
        return false;
    };
    let Expression::UnaryExpression(unary) = unwrap_parens(&binary.left) else {
        return false;
    };
    if unary.operator != UnaryOperator::Typeof {
        return false;
    }
    matches!(unwrap_parens(&unary.argument), Expression::Identifier(ident) if names.contains(&ident.name.as_str()))
}

// ═══════════════════════════════════════════════════════════════════════════════
// ANCHORS
// ═══════════════════════════════════════════════════════════════════════════════

fn call_anchor(call: &CallExpression<'_>, source: &str) -> Option<CallAnchor> {
    let arguments_start = offset_after_token(source, call.callee.span().end, b'(')?;
    Some(CallAnchor {
        call: call.span.into(),
        arguments_start,
        argument_count: call.arguments.len(),
    })
}

fn amd_anchor(call: &CallExpression<'_>, source: &str) -> Option<AmdAnchor> {
    let anchor = call_anchor(call, source)?;
    let factory_index = call.arguments.len().checked_sub(1)?;

    let array = factory_index
        .checked_sub(1)
        .and_then(|i| call.arguments.get(i))
        .and_then(|arg| arg.as_expression())
        .and_then(|expr| match unwrap_parens(expr) {
            Expression::ArrayExpression(array) => Some(array),
            _ => None,
        });

    let dependencies = match array {
        Some(array) => DependencyArray::Literal {
            array: array.span.into(),
            insert_at: if array.elements.is_empty() {
                array.span.end - 1
            } else {
                array.span.start + 1
            },
            element_count: array.elements.len(),
        },
        None => DependencyArray::Missing {
            insert_at: argument_full_start(call, factory_index, anchor.arguments_start, source)?,
        },
    };

    Some(AmdAnchor {
        call: anchor,
        dependencies,
    })
}

/// Position right after the token preceding argument `index`.
pub(crate) fn argument_full_start(
    call: &CallExpression<'_>,
    index: usize,
    arguments_start: u32,
    source: &str,
) -> Option<u32> {
    match index.checked_sub(1) {
        None => Some(arguments_start),
        Some(previous) => {
            let previous_end = call.arguments.get(previous)?.span().end;
            offset_after_token(source, previous_end, b',')
        }
    }
}

fn factory_anchor(
    func: &Function<'_>,
    body: &FunctionBody<'_>,
    source: &str,
) -> Option<FactoryAnchor> {
    let search_from = func.id.as_ref().map_or(func.span.start, |id| id.span.end);
    let parameters_start = offset_after_byte(source, search_from, body.span.start, b'(')?;
    let parameters = func
        .params
        .items
        .iter()
        .map(|param| binding_name(&param.pattern).unwrap_or_default().to_string())
        .collect();

    let first_statement_start = body
        .directives
        .first()
        .map(|d| d.span.start)
        .or_else(|| body.statements.first().map(|s| s.span().start));
    let last_statement_end = body
        .statements
        .last()
        .map(|s| s.span().end)
        .or_else(|| body.directives.last().map(|d| d.span.end));

    Some(FactoryAnchor {
        function: func.span.into(),
        parameters_start,
        parameters,
        body: body.span.into(),
        first_statement_start,
        last_statement_end,
    })
}

// ═══════════════════════════════════════════════════════════════════════════════
// HELPERS
// ═══════════════════════════════════════════════════════════════════════════════

pub(crate) fn unwrap_parens<'b, 'a>(mut expr: &'b Expression<'a>) -> &'b Expression<'a> {
    while let Expression::ParenthesizedExpression(paren) = expr {
        expr = &paren.expression;
    }
    expr
}

pub(crate) fn binding_name<'b>(pattern: &'b BindingPattern<'_>) -> Option<&'b str> {
    match pattern {
        BindingPattern::BindingIdentifier(ident) => Some(ident.name.as_str()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{
        create_umd_module, UmdModuleOptions, UmdStyle, DEFAULT_DEPENDENCIES, PROGRAM_BODY,
    };
    use crate::source::SourceFile;

    fn descriptor_for(source: &str) -> WrapperDescriptor {
        SourceFile::parse("/test/file.js", source)
            .unwrap()
            .wrapper()
            .unwrap()
            .clone()
    }

    #[test]
    fn conditional_wrapper_has_all_branches() {
        let source = create_umd_module(
            UmdStyle::Conditional,
            &UmdModuleOptions::default(),
            PROGRAM_BODY,
        );
        let descriptor = descriptor_for(&source);

        assert_eq!(descriptor.style, WrapperStyle::Conditional);
        assert!(descriptor.has_branch(BranchKind::CommonJs2));
        assert!(descriptor.has_branch(BranchKind::Amd));
        assert!(descriptor.has_branch(BranchKind::Global));
        assert_eq!(descriptor.branch(BranchKind::CommonJs), BranchSlot::Absent);
        assert_eq!(descriptor.exports_param_index, Some(0));
        assert_eq!(
            descriptor.factory.parameters,
            vec!["exports", "someSideEffect", "localDep", "core"]
        );
    }

    #[test]
    fn global_initializer_is_recognized() {
        let options = UmdModuleOptions {
            global_initializer: true,
            ..UmdModuleOptions::default()
        };
        let source = create_umd_module(UmdStyle::Conditional, &options, PROGRAM_BODY);
        let descriptor = descriptor_for(&source);

        assert!(descriptor.has_branch(BranchKind::GlobalWithInitializer));
        assert!(!descriptor.has_branch(BranchKind::Global));
        let BranchSlot::Present(WrapperBranch::GlobalWithInitializer { initializer, .. }) =
            descriptor.branch(BranchKind::GlobalWithInitializer)
        else {
            panic!("expected an initializer branch");
        };
        assert_eq!(initializer.slice(&source), "global = global || self");
    }

    #[test]
    fn if_chain_wrapper_has_all_branches() {
        let source = create_umd_module(UmdStyle::IfChain, &UmdModuleOptions::default(), PROGRAM_BODY);
        let descriptor = descriptor_for(&source);

        assert_eq!(descriptor.style, WrapperStyle::IfChain);
        let kinds: Vec<_> = descriptor.branches.iter().map(WrapperBranch::kind).collect();
        assert_eq!(
            kinds,
            vec![
                BranchKind::CommonJs2,
                BranchKind::Amd,
                BranchKind::CommonJs,
                BranchKind::Global
            ]
        );
        assert_eq!(descriptor.exports_param_index, None);
    }

    #[test]
    fn anchors_point_inside_lists() {
        let source = create_umd_module(
            UmdStyle::Conditional,
            &UmdModuleOptions::default(),
            PROGRAM_BODY,
        );
        let descriptor = descriptor_for(&source);

        let BranchSlot::Present(WrapperBranch::CommonJs2(call)) =
            descriptor.branch(BranchKind::CommonJs2)
        else {
            panic!("expected a CommonJS2 branch");
        };
        assert!(source[call.arguments_start as usize..].starts_with("exports, require("));
        assert_eq!(call.argument_count, DEFAULT_DEPENDENCIES.len() + 1);

        let BranchSlot::Present(WrapperBranch::Amd(amd)) = descriptor.branch(BranchKind::Amd)
        else {
            panic!("expected an AMD branch");
        };
        let DependencyArray::Literal { insert_at, element_count, .. } = amd.dependencies else {
            panic!("expected a dependency array");
        };
        assert!(source[insert_at as usize..].starts_with("'exports', 'some-side-effect'"));
        assert_eq!(element_count, DEFAULT_DEPENDENCIES.len() + 1);

        assert!(source[descriptor.factory.parameters_start as usize..].starts_with("exports, "));
        let constants_at = descriptor.constants_insertion_point() as usize;
        assert!(source[constants_at..].starts_with("'use strict';"));
    }

    #[test]
    fn amd_without_dependency_array_inserts_before_factory() {
        let options = UmdModuleOptions {
            dependencies: vec![],
            exports_param: false,
            ..UmdModuleOptions::default()
        };
        let source = create_umd_module(UmdStyle::Conditional, &options, PROGRAM_BODY);
        let descriptor = descriptor_for(&source);

        let BranchSlot::Present(WrapperBranch::Amd(amd)) = descriptor.branch(BranchKind::Amd)
        else {
            panic!("expected an AMD branch");
        };
        let DependencyArray::Missing { insert_at } = amd.dependencies else {
            panic!("expected no dependency array");
        };
        assert!(source[insert_at as usize..].starts_with(" factory)"));
        assert_eq!(descriptor.exports_param_index, None);
    }

    #[test]
    fn exports_index_comes_from_the_loader_call() {
        let source = "(function (global, factory) {\n  typeof exports === 'object' && typeof module !== 'undefined' ? factory(require('a'), exports) :\n  typeof define === 'function' && define.amd ? define(['a', 'exports'], factory) :\n  (global = global || self, factory(global.a, global.m = {}));\n}(this, (function (a, e) {\n  'use strict';\n  e.x = a;\n})));\n";
        let descriptor = descriptor_for(source);
        assert_eq!(descriptor.factory.parameters, vec!["a", "e"]);
        assert_eq!(descriptor.exports_param_index, Some(1));
    }

    #[test]
    fn rejects_files_without_a_wrapper() {
        let file = SourceFile::parse("/test/plain.js", "var x = 1;\nexports.x = x;\n").unwrap();
        let err = file.wrapper().unwrap_err();
        assert!(matches!(err, RenderError::UnrecognizedWrapper { ref file, .. } if file == "/test/plain.js"));
    }

    #[test]
    fn rejects_wrappers_without_common_js() {
        let source = "(function (root, factory) {\n  if (typeof define === 'function' && define.amd) define([], factory);\n  else root.x = factory();\n})(this, function () {\n  'use strict';\n});\n";
        let file = SourceFile::parse("/test/amd-only.js", source).unwrap();
        let err = file.wrapper().unwrap_err();
        assert!(err.to_string().contains("neither a CommonJS nor a CommonJS2 branch"));
    }

    #[test]
    fn rejects_wrappers_with_a_non_call_branch() {
        let source = "(function (global, factory) {\n  typeof exports === 'object' ? factory(exports) : global.x;\n}(this, (function (exports) {})));\n";
        let file = SourceFile::parse("/test/odd.js", source).unwrap();
        let err = file.wrapper().unwrap_err();
        assert!(err.to_string().contains("is not a call expression"));
    }
}
