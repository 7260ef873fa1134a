//! Decorator Metadata Locator.
//!
//! Finds the lists that carry class decorators inside a synthesized closure:
//!
//! ```text
//! A.decorators = [ { type: core.Directive, args: [...] }, { type: OtherA } ];
//! A = tslib_1.__decorate([ core.Directive({...}), OtherA() ], A);
//! return A = tslib_1.__decorate([ core.Directive({...}) ], A);
//! ```

use oxc_ast::ast::{
    ArrayExpression, AssignmentTarget, CallExpression, Expression, ObjectExpression,
    ObjectPropertyKind, PropertyKey, ReturnStatement,
};
use oxc_span::GetSpan;
use serde::{Deserialize, Serialize};

use crate::closure::DeclarationShape;
use crate::error::RenderError;
use crate::ir::{CompiledClass, DecoratorEntry, TextRange};
use crate::source::{offset_after_token, SourceFile};
use crate::wrapper::unwrap_parens;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DecoratorEncoding {
    /// `X.decorators = [...]`
    StaticProperty,
    /// `X = __decorate([...], X)`
    HelperCall,
}

/// What goes when every entry of a container is removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind", content = "range")]
pub enum ContainerRemoval {
    /// The whole statement, from the end of the previous one.
    Statement(TextRange),
    /// ` = __decorate([...], X)` out of `return X = __decorate([...], X);`.
    ReturnAssignment(TextRange),
}

impl ContainerRemoval {
    pub fn range(&self) -> TextRange {
        match self {
            ContainerRemoval::Statement(range) | ContainerRemoval::ReturnAssignment(range) => *range,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListEntry {
    pub range: TextRange,
    /// Just after `[` or after the comma that precedes the entry.
    pub full_start: u32,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecoratorContainer {
    pub list: TextRange,
    pub encoding: DecoratorEncoding,
    pub entries: Vec<ListEntry>,
    pub removal: ContainerRemoval,
}

impl DecoratorContainer {
    pub fn entry_index(&self, node: TextRange) -> Option<usize> {
        self.entries.iter().position(|entry| entry.range == node)
    }

    /// Range that removes entry `index` together with one separator.
    ///
    /// With a next sibling the range runs up to the sibling's start, taking
    /// the comma between them. The last entry takes a trailing comma when
    /// one follows it, and nothing else.
    pub fn entry_removal_range(&self, index: usize, source: &str) -> Option<TextRange> {
        let entry = self.entries.get(index)?;
        let end = match self.entries.get(index + 1) {
            Some(next) => next.range.start,
            None => offset_after_token(source, entry.range.end, b',').unwrap_or(entry.range.end),
        };
        Some(TextRange::new(entry.full_start, end))
    }

    pub fn decorator_entries(&self) -> impl Iterator<Item = DecoratorEntry> + '_ {
        self.entries.iter().map(move |entry| DecoratorEntry {
            node: entry.range,
            container: self.list,
            name: entry.name.clone(),
        })
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// LOCATOR
// ═══════════════════════════════════════════════════════════════════════════════

/// Builds the compiled-class record for the declaration called `name`.
///
/// Declarations that are not synthesized closures yield a record without
/// decorators; `add_definitions` reports them when they are used.
pub fn compiled_class(file: &SourceFile, name: &str) -> Result<CompiledClass, RenderError> {
    let declaration = file
        .declaration_named(name)
        .ok_or_else(|| RenderError::ClassNotFound {
            class_name: name.to_string(),
            file: file.file_name(),
        })?;

    let (decorators, constructor_parameters) = match &declaration.shape {
        DeclarationShape::Closure(closure) => (
            closure
                .decorator_containers
                .iter()
                .flat_map(DecoratorContainer::decorator_entries)
                .collect(),
            closure.constructor_parameters.clone(),
        ),
        DeclarationShape::Other => (Vec::new(), Vec::new()),
    };

    Ok(CompiledClass {
        name: declaration.name.clone(),
        declaration: declaration.range,
        decorators,
        constructor_parameters,
    })
}

/// Decorator entries of `class` in declaration order.
pub fn locate_decorators(
    file: &SourceFile,
    class: &CompiledClass,
) -> Result<Vec<DecoratorEntry>, RenderError> {
    let declaration = file
        .declaration_at(class.declaration)
        .ok_or_else(|| RenderError::ClassNotFound {
            class_name: class.name.clone(),
            file: file.file_name(),
        })?;
    Ok(match &declaration.shape {
        DeclarationShape::Closure(closure) => closure
            .decorator_containers
            .iter()
            .flat_map(DecoratorContainer::decorator_entries)
            .collect(),
        DeclarationShape::Other => Vec::new(),
    })
}

// ═══════════════════════════════════════════════════════════════════════════════
// CONTAINER EXTRACTION
// ═══════════════════════════════════════════════════════════════════════════════

/// Container carried by an expression statement spanning `statement`.
pub(crate) fn statement_container(
    expr: &Expression<'_>,
    statement: TextRange,
    source: &str,
    class_names: &[&str],
) -> Option<DecoratorContainer> {
    let Expression::AssignmentExpression(assign) = unwrap_parens(expr) else {
        return None;
    };
    match &assign.left {
        AssignmentTarget::StaticMemberExpression(member)
            if member.property.name == "decorators"
                && is_class_reference(&member.object, class_names) =>
        {
            let Expression::ArrayExpression(array) = unwrap_parens(&assign.right) else {
                return None;
            };
            Some(DecoratorContainer {
                list: array.span.into(),
                encoding: DecoratorEncoding::StaticProperty,
                entries: list_entries(array, source, static_entry_name),
                removal: ContainerRemoval::Statement(statement),
            })
        }
        AssignmentTarget::AssignmentTargetIdentifier(ident)
            if class_names.contains(&ident.name.as_str()) =>
        {
            let call = decorate_call(&assign.right)?;
            let array = decorator_array(call)?;
            Some(DecoratorContainer {
                list: array.span.into(),
                encoding: DecoratorEncoding::HelperCall,
                entries: list_entries(array, source, expression_name),
                removal: ContainerRemoval::Statement(statement),
            })
        }
        _ => None,
    }
}

/// `return X = __decorate([...], X);`
pub(crate) fn return_container(
    ret: &ReturnStatement<'_>,
    source: &str,
    class_names: &[&str],
) -> Option<DecoratorContainer> {
    let Expression::AssignmentExpression(assign) = unwrap_parens(ret.argument.as_ref()?) else {
        return None;
    };
    let AssignmentTarget::AssignmentTargetIdentifier(ident) = &assign.left else {
        return None;
    };
    if !class_names.contains(&ident.name.as_str()) {
        return None;
    }
    let call = decorate_call(&assign.right)?;
    let array = decorator_array(call)?;

    let end = if source.as_bytes().get(ret.span.end as usize - 1) == Some(&b';') {
        ret.span.end - 1
    } else {
        ret.span.end
    };
    Some(DecoratorContainer {
        list: array.span.into(),
        encoding: DecoratorEncoding::HelperCall,
        entries: list_entries(array, source, expression_name),
        removal: ContainerRemoval::ReturnAssignment(TextRange::new(ident.span.end, end)),
    })
}

fn decorate_call<'b, 'a>(expr: &'b Expression<'a>) -> Option<&'b CallExpression<'a>> {
    match unwrap_parens(expr) {
        Expression::AssignmentExpression(assign) => decorate_call(&assign.right),
        Expression::CallExpression(call) if is_decorate_helper(&call.callee) => Some(&**call),
        _ => None,
    }
}

fn decorator_array<'b, 'a>(call: &'b CallExpression<'a>) -> Option<&'b ArrayExpression<'a>> {
    match unwrap_parens(call.arguments.first()?.as_expression()?) {
        Expression::ArrayExpression(array) => Some(&**array),
        _ => None,
    }
}

/// `__decorate`, `tslib.__decorate`, `tslib_1.__decorate`.
fn is_decorate_helper(callee: &Expression<'_>) -> bool {
    match unwrap_parens(callee) {
        Expression::Identifier(ident) => ident.name == "__decorate",
        Expression::StaticMemberExpression(member) => member.property.name == "__decorate",
        _ => false,
    }
}

pub(crate) fn is_class_reference(expr: &Expression<'_>, class_names: &[&str]) -> bool {
    matches!(unwrap_parens(expr), Expression::Identifier(ident) if class_names.contains(&ident.name.as_str()))
}

fn list_entries(
    array: &ArrayExpression<'_>,
    source: &str,
    name_of: fn(&Expression<'_>) -> String,
) -> Vec<ListEntry> {
    let mut entries = Vec::with_capacity(array.elements.len());
    let mut full_start = array.span.start + 1;
    for element in &array.elements {
        let range: TextRange = element.span().into();
        entries.push(ListEntry {
            range,
            full_start,
            name: element.as_expression().map(name_of).unwrap_or_default(),
        });
        full_start = offset_after_token(source, range.end, b',').unwrap_or(range.end);
    }
    entries
}

/// `{ type: core.Directive, args: [...] }` names `Directive`.
fn static_entry_name(expr: &Expression<'_>) -> String {
    match unwrap_parens(expr) {
        Expression::ObjectExpression(object) => object_property(object, "type")
            .map(expression_name)
            .unwrap_or_default(),
        _ => String::new(),
    }
}

/// `core.Directive({...})`, `OtherA()`, `Foo` and `ns.Foo` name the callee.
pub(crate) fn expression_name(expr: &Expression<'_>) -> String {
    match unwrap_parens(expr) {
        Expression::Identifier(ident) => ident.name.to_string(),
        Expression::StaticMemberExpression(member) => member.property.name.to_string(),
        Expression::CallExpression(call) => expression_name(&call.callee),
        _ => String::new(),
    }
}

pub(crate) fn object_property<'b, 'a>(
    object: &'b ObjectExpression<'a>,
    key: &str,
) -> Option<&'b Expression<'a>> {
    object.properties.iter().find_map(|property| match property {
        ObjectPropertyKind::ObjectProperty(prop) => {
            let matches = match &prop.key {
                PropertyKey::StaticIdentifier(ident) => ident.name == key,
                PropertyKey::StringLiteral(literal) => literal.value == key,
                _ => false,
            };
            matches.then_some(&prop.value)
        }
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{
        create_umd_module, some_directive_options, UmdModuleOptions, UmdStyle,
        DECORATE_PROGRAM_BODY, PROGRAM_BODY, SOME_DIRECTIVE_BODY,
    };
    use pretty_assertions::assert_eq;

    fn parse(body: &str) -> SourceFile {
        let source = create_umd_module(UmdStyle::Conditional, &UmdModuleOptions::default(), body);
        SourceFile::parse("/node_modules/test-package/some/file.js", source).unwrap()
    }

    fn names(class: &CompiledClass) -> Vec<&str> {
        class.decorators.iter().map(|d| d.name.as_str()).collect()
    }

    #[test]
    fn static_property_decorators_in_declaration_order() {
        let file = parse(PROGRAM_BODY);
        let a = compiled_class(&file, "A").unwrap();
        assert_eq!(names(&a), vec!["Directive", "OtherA"]);
        let b = compiled_class(&file, "B").unwrap();
        assert_eq!(names(&b), vec!["OtherB", "Directive"]);
        let c = compiled_class(&file, "C").unwrap();
        assert_eq!(names(&c), vec!["Directive"]);

        let directive = a.decorator("Directive").unwrap();
        assert!(file.slice(directive.node).starts_with("{ type: core.Directive"));
        assert!(file.slice(directive.container).starts_with('['));
    }

    #[test]
    fn helper_call_decorators_in_declaration_order() {
        let file = parse(DECORATE_PROGRAM_BODY);
        let a = compiled_class(&file, "A").unwrap();
        assert_eq!(names(&a), vec!["Directive", "OtherA"]);
        let d = compiled_class(&file, "D").unwrap();
        assert_eq!(names(&d), vec!["Directive"]);
        let e = compiled_class(&file, "E").unwrap();
        assert_eq!(names(&e), vec!["Directive"]);
        assert_eq!(
            file.slice(a.decorator("OtherA").unwrap().node),
            "OtherA()"
        );
    }

    #[test]
    fn locate_decorators_matches_compiled_class() {
        let file = parse(PROGRAM_BODY);
        let a = compiled_class(&file, "A").unwrap();
        assert_eq!(locate_decorators(&file, &a).unwrap(), a.decorators);
    }

    #[test]
    fn constructor_parameters_are_collected() {
        let source = create_umd_module(
            UmdStyle::Conditional,
            &some_directive_options(),
            SOME_DIRECTIVE_BODY,
        );
        let file = SourceFile::parse("/node_modules/test-package/some/file.js", source).unwrap();
        let directive = compiled_class(&file, "SomeDirective").unwrap();
        assert_eq!(names(&directive), vec!["Directive", "OtherA"]);
        let types: Vec<_> = directive
            .constructor_parameters
            .iter()
            .map(|p| p.type_name.as_deref())
            .collect();
        assert_eq!(types, vec![Some("NgZone"), Some("Console")]);
    }

    #[test]
    fn unknown_class_is_reported() {
        let file = parse(PROGRAM_BODY);
        let err = compiled_class(&file, "Missing").unwrap_err();
        assert!(matches!(err, RenderError::ClassNotFound { ref class_name, .. } if class_name == "Missing"));
    }

    #[test]
    fn removal_range_takes_one_separator() {
        let file = parse(PROGRAM_BODY);
        let a = compiled_class(&file, "A").unwrap();
        let container = file.decorator_containers_at(a.decorators[0].container)[0];

        let first = container.entry_removal_range(0, file.text()).unwrap();
        assert!(file.slice(first).trim_end().ends_with("] },"));
        assert_eq!(first.end, container.entries[1].range.start);

        let last = container.entry_removal_range(1, file.text()).unwrap();
        assert_eq!(file.slice(last).trim(), "{ type: OtherA }");
    }

    #[test]
    fn trailing_comma_is_taken_by_the_last_entry() {
        let file = parse(
            "\nvar T = (function() {\n  function T() {}\n  T.decorators = [\n    { type: Foo },\n  ];\n  return T;\n}());\n",
        );
        let t = compiled_class(&file, "T").unwrap();
        let container = file.decorator_containers_at(t.decorators[0].container)[0];
        let range = container.entry_removal_range(0, file.text()).unwrap();
        assert_eq!(file.slice(range), "\n    { type: Foo },");
    }

    #[test]
    fn return_assignment_removal_keeps_the_return() {
        let file = parse(DECORATE_PROGRAM_BODY);
        let e = compiled_class(&file, "E").unwrap();
        let container = file.decorator_containers_at(e.decorators[0].container)[0];
        let ContainerRemoval::ReturnAssignment(range) = container.removal else {
            panic!("expected a return assignment");
        };
        assert!(file.slice(range).starts_with(" = tslib_1.__decorate(["));
        assert!(file.slice(range).ends_with("], E)"));
    }
}
