#[cfg(feature = "napi")]
use napi_derive::napi;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ir::TextRange;

// ═══════════════════════════════════════════════════════════════════════════════
// DIAGNOSTIC CODES
// ═══════════════════════════════════════════════════════════════════════════════

pub const ERR_UNRECOGNIZED_WRAPPER: &str = "UMD001";
pub const ERR_INVALID_CLASS_DECLARATION: &str = "UMD002";
pub const ERR_MISSING_RETURN_STATEMENT: &str = "UMD003";
pub const ERR_AMBIGUOUS_DECORATOR_CONTAINER: &str = "UMD004";
pub const ERR_CLASS_NOT_FOUND: &str = "UMD005";
pub const ERR_PARSE: &str = "UMD006";
pub const ERR_PRINT: &str = "UMD007";
pub const ERR_IO: &str = "UMD008";
pub const ERR_CONFIG: &str = "UMD009";

// ═══════════════════════════════════════════════════════════════════════════════
// GUARANTEES
// ═══════════════════════════════════════════════════════════════════════════════

fn get_guarantee(code: &str) -> &'static str {
    match code {
        ERR_UNRECOGNIZED_WRAPPER => {
            "Only files wrapped in a recognised UMD shape are rewritten; others are left untouched."
        }
        ERR_INVALID_CLASS_DECLARATION => {
            "Definitions are only injected into ES5 classes emitted as an IIFE around a constructor function."
        }
        ERR_MISSING_RETURN_STATEMENT => {
            "Definitions are always placed before the closure's `return <Class>;` statement."
        }
        ERR_AMBIGUOUS_DECORATOR_CONTAINER => {
            "Decorator entries are only removed from a list that resolves to exactly one container."
        }
        ERR_CLASS_NOT_FOUND => "Every planned class names a declaration of the rendered file.",
        ERR_PARSE => "Rendering starts from syntactically valid source text.",
        ERR_PRINT => "Printed statements are valid code in the target dialect.",
        ERR_IO => "Sources are read once and outputs are written to new paths only.",
        ERR_CONFIG => "Render options are validated before any file is processed.",
        _ => "Unknown rendering guarantee.",
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// RENDER ERROR
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    #[error("Source file \"{file}\" is not a supported UMD module: {reason}")]
    UnrecognizedWrapper { file: String, reason: String },

    #[error(
        "Compiled class \"{class_name}\" in \"{file}\" does not have a valid syntax.\nExpected an ES5 IIFE wrapped function. But got:\n{text}"
    )]
    InvalidClassDeclaration {
        class_name: String,
        file: String,
        text: String,
    },

    #[error("Compiled class wrapper IIFE does not have a return statement: {class_name} in {file}")]
    MissingReturnStatement { class_name: String, file: String },

    #[error("Decorator container {container} in \"{file}\" cannot be resolved: {reason}")]
    AmbiguousDecoratorContainer {
        file: String,
        container: TextRange,
        reason: String,
    },

    #[error("No declaration named \"{class_name}\" in \"{file}\"")]
    ClassNotFound { class_name: String, file: String },

    #[error("Failed to parse \"{file}\": {message}")]
    Parse { file: String, message: String },

    #[error("Failed to print statement for \"{file}\": {message}")]
    Print { file: String, message: String },

    #[error("I/O error on \"{file}\": {message}")]
    Io { file: String, message: String },

    #[error("Invalid render options: {message}")]
    Config { message: String },
}

impl RenderError {
    pub fn io(file: impl Into<String>, err: std::io::Error) -> Self {
        RenderError::Io {
            file: file.into(),
            message: err.to_string(),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            RenderError::UnrecognizedWrapper { .. } => ERR_UNRECOGNIZED_WRAPPER,
            RenderError::InvalidClassDeclaration { .. } => ERR_INVALID_CLASS_DECLARATION,
            RenderError::MissingReturnStatement { .. } => ERR_MISSING_RETURN_STATEMENT,
            RenderError::AmbiguousDecoratorContainer { .. } => ERR_AMBIGUOUS_DECORATOR_CONTAINER,
            RenderError::ClassNotFound { .. } => ERR_CLASS_NOT_FOUND,
            RenderError::Parse { .. } => ERR_PARSE,
            RenderError::Print { .. } => ERR_PRINT,
            RenderError::Io { .. } => ERR_IO,
            RenderError::Config { .. } => ERR_CONFIG,
        }
    }

    pub fn guarantee(&self) -> &'static str {
        get_guarantee(self.code())
    }

    pub fn file(&self) -> Option<&str> {
        match self {
            RenderError::UnrecognizedWrapper { file, .. }
            | RenderError::InvalidClassDeclaration { file, .. }
            | RenderError::MissingReturnStatement { file, .. }
            | RenderError::AmbiguousDecoratorContainer { file, .. }
            | RenderError::ClassNotFound { file, .. }
            | RenderError::Parse { file, .. }
            | RenderError::Print { file, .. }
            | RenderError::Io { file, .. } => Some(file),
            RenderError::Config { .. } => None,
        }
    }

    /// Class-scoped failures skip one class; everything else aborts the file.
    pub fn is_class_scoped(&self) -> bool {
        matches!(
            self,
            RenderError::InvalidClassDeclaration { .. }
                | RenderError::MissingReturnStatement { .. }
                | RenderError::ClassNotFound { .. }
        )
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// DIAGNOSTICS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "napi", napi(object))]
#[serde(rename_all = "camelCase")]
pub struct RenderDiagnostic {
    pub code: String,
    pub message: String,
    pub guarantee: String,
    pub file: String,
    pub class_name: Option<String>,
}

impl From<&RenderError> for RenderDiagnostic {
    fn from(err: &RenderError) -> Self {
        let class_name = match err {
            RenderError::InvalidClassDeclaration { class_name, .. }
            | RenderError::MissingReturnStatement { class_name, .. }
            | RenderError::ClassNotFound { class_name, .. } => Some(class_name.clone()),
            _ => None,
        };
        RenderDiagnostic {
            code: err.code().to_string(),
            message: err.to_string(),
            guarantee: err.guarantee().to_string(),
            file: err.file().unwrap_or_default().to_string(),
            class_name,
        }
    }
}
