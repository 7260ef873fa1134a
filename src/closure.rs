//! Synthesized Closure Anchors.
//!
//! ES5 output has no class syntax; a class is an IIFE that declares a
//! constructor function, attaches static members and returns it:
//!
//! ```text
//! var A = (function() {
//!   function A() {}
//!   A.decorators = [...];
//!   return A;
//! }());
//! ```
//!
//! Each such declaration is reduced to the offsets later edits need.

use oxc_ast::ast::{AssignmentTarget, Expression, FunctionBody, Statement};
use oxc_span::GetSpan;
use serde::{Deserialize, Serialize};

use crate::decorators::{
    expression_name, is_class_reference, object_property, return_container, statement_container,
    DecoratorContainer,
};
use crate::ir::{ParameterEntry, TextRange};
use crate::wrapper::{binding_name, unwrap_parens};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatementAnchor {
    /// End of the previous statement (or just inside the body's `{`).
    pub full_start: u32,
    pub range: TextRange,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SynthesizedClosure {
    pub name: String,
    pub body: TextRange,
    /// The inner constructor function declaration.
    pub implementation: TextRange,
    pub return_statement: Option<StatementAnchor>,
    pub decorator_containers: Vec<DecoratorContainer>,
    pub constructor_parameters: Vec<ParameterEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum DeclarationShape {
    Closure(SynthesizedClosure),
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Declaration {
    pub name: String,
    pub range: TextRange,
    pub shape: DeclarationShape,
}

pub(crate) fn collect_declarations(statements: &[Statement<'_>], source: &str) -> Vec<Declaration> {
    let mut declarations = Vec::new();
    for stmt in statements {
        match stmt {
            Statement::VariableDeclaration(var) => {
                for declarator in &var.declarations {
                    let Some(name) = binding_name(&declarator.id) else {
                        continue;
                    };
                    let shape = declarator
                        .init
                        .as_ref()
                        .and_then(|init| synthesized_closure(init, name, source))
                        .map_or(DeclarationShape::Other, DeclarationShape::Closure);
                    declarations.push(Declaration {
                        name: name.to_string(),
                        range: declarator.span.into(),
                        shape,
                    });
                }
            }
            Statement::FunctionDeclaration(func) => {
                if let Some(id) = &func.id {
                    declarations.push(Declaration {
                        name: id.name.to_string(),
                        range: func.span.into(),
                        shape: DeclarationShape::Other,
                    });
                }
            }
            _ => {}
        }
    }
    declarations
}

fn synthesized_closure(init: &Expression<'_>, name: &str, source: &str) -> Option<SynthesizedClosure> {
    let Expression::CallExpression(call) = unwrap_parens(init) else {
        return None;
    };
    let Expression::FunctionExpression(iife) = unwrap_parens(&call.callee) else {
        return None;
    };
    let body = iife.body.as_deref()?;
    let implementation = body.statements.iter().find_map(|stmt| match stmt {
        Statement::FunctionDeclaration(func) => Some(func),
        _ => None,
    })?;
    let inner_name = implementation
        .id
        .as_ref()
        .map_or(name, |id| id.name.as_str());
    let class_names = [name, inner_name];

    Some(index_closure_body(
        name,
        body,
        implementation.span.into(),
        &class_names,
        source,
    ))
}

fn index_closure_body(
    name: &str,
    body: &FunctionBody<'_>,
    implementation: TextRange,
    class_names: &[&str],
    source: &str,
) -> SynthesizedClosure {
    let mut previous_end = body
        .directives
        .last()
        .map_or(body.span.start + 1, |directive| directive.span.end);
    let mut return_statement = None;
    let mut decorator_containers = Vec::new();
    let mut constructor_parameters = Vec::new();

    for stmt in &body.statements {
        let range: TextRange = stmt.span().into();
        let full_start = previous_end;
        previous_end = range.end;

        match stmt {
            Statement::ReturnStatement(ret) => {
                if return_statement.is_none() {
                    return_statement = Some(StatementAnchor { full_start, range });
                }
                if let Some(container) = return_container(ret, source, class_names) {
                    decorator_containers.push(container);
                }
            }
            Statement::ExpressionStatement(expr_stmt) => {
                let expr = &expr_stmt.expression;
                let statement = TextRange::new(full_start, range.end);
                if let Some(container) = statement_container(expr, statement, source, class_names) {
                    decorator_containers.push(container);
                }
                if let Some(params) = ctor_parameters(expr, class_names) {
                    constructor_parameters = params;
                }
            }
            _ => {}
        }
    }

    SynthesizedClosure {
        name: name.to_string(),
        body: body.span.into(),
        implementation,
        return_statement,
        decorator_containers,
        constructor_parameters,
    }
}

/// `X.prop = ...` where `X` is the class; prototype members do not count.
fn static_member_name<'b>(expr: &'b Expression<'_>, class_names: &[&str]) -> Option<&'b str> {
    let Expression::AssignmentExpression(assign) = unwrap_parens(expr) else {
        return None;
    };
    match &assign.left {
        AssignmentTarget::StaticMemberExpression(member)
            if is_class_reference(&member.object, class_names) =>
        {
            Some(member.property.name.as_str())
        }
        _ => None,
    }
}

/// `X.ctorParameters = function () { return [{ type: Foo }, ...]; };`
fn ctor_parameters(expr: &Expression<'_>, class_names: &[&str]) -> Option<Vec<ParameterEntry>> {
    if static_member_name(expr, class_names)? != "ctorParameters" {
        return None;
    }
    let Expression::AssignmentExpression(assign) = unwrap_parens(expr) else {
        return None;
    };

    let array = match unwrap_parens(&assign.right) {
        Expression::ArrayExpression(array) => array,
        Expression::FunctionExpression(func) => {
            let body = func.body.as_deref()?;
            body.statements.iter().find_map(|stmt| match stmt {
                Statement::ReturnStatement(ret) => match unwrap_parens(ret.argument.as_ref()?) {
                    Expression::ArrayExpression(array) => Some(array),
                    _ => None,
                },
                _ => None,
            })?
        }
        _ => return None,
    };

    Some(
        array
            .elements
            .iter()
            .map(|element| ParameterEntry {
                node: element.span().into(),
                type_name: element.as_expression().and_then(|expr| match unwrap_parens(expr) {
                    Expression::ObjectExpression(object) => object_property(object, "type")
                        .map(expression_name)
                        .filter(|name| !name.is_empty()),
                    _ => None,
                }),
            })
            .collect(),
    )
}
