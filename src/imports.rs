//! Namespace imports collected while printing statements.

use crate::ir::ImportDescriptor;

/// How a printed reference to another module's symbol is spelled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedImport {
    /// Qualifier to put in front of `symbol`; `None` for the current file.
    pub module_import: Option<String>,
    pub symbol: String,
}

impl NamedImport {
    pub fn expression(&self) -> String {
        match &self.module_import {
            Some(qualifier) => format!("{}.{}", qualifier, self.symbol),
            None => self.symbol.clone(),
        }
    }
}

pub trait ImportGenerator {
    fn generate_named_import(&mut self, module: &str, symbol: &str) -> NamedImport;
    fn generate_namespace_import(&mut self, module: &str) -> String;
}

/// Hands out `i0`, `i1`, … per distinct module in first-use order.
#[derive(Debug, Clone)]
pub struct ImportManager {
    prefix: String,
    /// (specifier, qualifier), insertion ordered.
    modules: Vec<(String, String)>,
}

impl ImportManager {
    pub fn new(prefix: impl Into<String>) -> Self {
        ImportManager {
            prefix: prefix.into(),
            modules: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    pub fn all_imports(&self) -> Vec<ImportDescriptor> {
        self.modules
            .iter()
            .map(|(specifier, qualifier)| ImportDescriptor::new(specifier, qualifier))
            .collect()
    }
}

impl Default for ImportManager {
    fn default() -> Self {
        ImportManager::new("i")
    }
}

impl ImportGenerator for ImportManager {
    fn generate_named_import(&mut self, module: &str, symbol: &str) -> NamedImport {
        NamedImport {
            module_import: Some(self.generate_namespace_import(module)),
            symbol: symbol.to_string(),
        }
    }

    fn generate_namespace_import(&mut self, module: &str) -> String {
        if let Some((_, qualifier)) = self.modules.iter().find(|(s, _)| s == module) {
            return qualifier.clone();
        }
        let qualifier = format!("{}{}", self.prefix, self.modules.len());
        self.modules.push((module.to_string(), qualifier.clone()));
        qualifier
    }
}
