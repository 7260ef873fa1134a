//! Browser-global names for module specifiers.
//!
//! The global branch of a UMD wrapper reads dependencies off the global
//! object, so `@angular/common/testing` has to become
//! `global.ng.common.testing`.

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::BTreeMap;

lazy_static! {
    /// A run of `-`/`_` and the character after it (camel-case boundary).
    static ref SEPARATOR_RE: Regex = Regex::new(r"[-_]+(.?)").expect("valid separator regex");
}

/// `@scope/pkg/sub` → `global.<alias or scope>.pkg.sub`, camel-cased per segment.
pub fn global_path(specifier: &str, scope_aliases: &BTreeMap<String, String>) -> String {
    let mut segments: Vec<String> = Vec::new();
    let mut rest = specifier;

    if let Some(scoped) = specifier.strip_prefix('@') {
        let (scope, tail) = scoped.split_once('/').unwrap_or((scoped, ""));
        let scope = scope_aliases.get(scope).map_or(scope, String::as_str);
        segments.push(scope.to_string());
        rest = tail;
    }
    segments.extend(
        rest.split('/')
            .filter(|segment| !segment.is_empty())
            .map(str::to_string),
    );

    let mut path = segments
        .iter()
        .map(|segment| camel_case(segment))
        .collect::<Vec<_>>()
        .join(".");
    if let Some(first) = path.chars().next() {
        let lower: String = first.to_lowercase().collect();
        path.replace_range(..first.len_utf8(), &lower);
    }
    format!("global.{}", path)
}

fn camel_case(segment: &str) -> String {
    SEPARATOR_RE
        .replace_all(segment, |caps: &regex::Captures| caps[1].to_uppercase())
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn aliases() -> BTreeMap<String, String> {
        BTreeMap::from([("angular".to_string(), "ng".to_string())])
    }

    #[test]
    fn maps_scoped_packages() {
        let aliases = aliases();
        assert_eq!(global_path("@ngrx/store", &aliases), "global.ngrx.store");
        assert_eq!(
            global_path("@angular/platform-browser-dynamic", &aliases),
            "global.ng.platformBrowserDynamic"
        );
        assert_eq!(
            global_path("@angular/common/testing", &aliases),
            "global.ng.common.testing"
        );
        assert_eq!(
            global_path("@angular-foo/package", &aliases),
            "global.angularFoo.package"
        );
    }

    #[test]
    fn maps_plain_and_local_specifiers() {
        let aliases = aliases();
        assert_eq!(global_path("some-side-effect", &aliases), "global.someSideEffect");
        assert_eq!(global_path("/local-dep", &aliases), "global.localDep");
        assert_eq!(global_path("Foo_bar", &aliases), "global.fooBar");
    }

    #[test]
    fn without_aliases_the_scope_is_kept() {
        assert_eq!(
            global_path("@angular/core", &BTreeMap::new()),
            "global.angular.core"
        );
    }
}
