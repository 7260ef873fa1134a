//! # UMD Rendering (Ground Truth)
//!
//! Rewrites an already-parsed UMD bundle in place: imports are threaded
//! through every loader branch, compiled definitions are injected into ES5
//! class closures and decorator metadata is stripped. Every rewrite is a
//! text edit against the original source, so untouched code is preserved
//! byte for byte and a source map can be produced at the end.
//!
//! ## Rendering Invariants
//!
//! 1. **Branch Agreement**: An import is added to every loader branch that
//!    exists and to the factory's parameter list, all in the same order.
//!    The n-th new dependency is always bound to the n-th new parameter.
//!
//! 2. **Prepend Order**: New dependencies and parameters go in front of the
//!    existing ones. Existing entries are never reordered.
//!
//! 3. **Absent Branches**: A branch the wrapper does not have is skipped,
//!    never synthesised.
//!
//! 4. **Definition Placement**: Definitions land immediately before the
//!    closure's `return <Class>;` statement. Adjacent statements land after
//!    the definitions and before the return.
//!
//! 5. **Container Removal**: When every entry of a decorator container is
//!    removed, the whole container statement goes with it.
//!
//! 6. **Atomic Failure**: An operation that fails leaves the edit buffer as
//!    it found it.
//!
//! 7. **Sources Are Read-Only**: Rendered output is always written to a new
//!    path. The input file is never overwritten.

mod batch;
mod cache;
mod closure;
mod config;
mod decorators;
mod edit_buffer;
mod error;
mod formatter;
mod globals;
mod imports;
mod ir;
mod printer;
mod renderer;
mod source;
mod source_map;
mod wrapper;

#[cfg(test)]
mod fixtures;

pub use batch::{discover_umd_files, render_bundle, BatchReport, BundlePlan, FileJob};
pub use cache::RenderCache;
pub use closure::{Declaration, DeclarationShape, StatementAnchor, SynthesizedClosure};
pub use config::RenderOptions;
pub use decorators::{compiled_class, locate_decorators, DecoratorContainer, DecoratorEncoding};
pub use edit_buffer::EditBuffer;
pub use error::*;
pub use formatter::UmdRenderingFormatter;
pub use globals::global_path;
pub use imports::{ImportGenerator, ImportManager, NamedImport};
pub use ir::{
    removals_for, CompiledClass, DecoratorEntry, DecoratorRemovals, DirectExport, ExportDescriptor,
    ImportDescriptor, ParameterEntry, TextRange,
};
pub use printer::{
    print_statement, LiteralValue, MapEntry, OutputExpression, OutputStatement, StmtModifier,
};
pub use renderer::{ClassRenderPlan, EntryPointExports, FileRenderPlan, RenderedFile, Renderer};
pub use source::SourceFile;
pub use source_map::{MappedSegment, SourceMap};
pub use wrapper::{
    AmdAnchor, BranchKind, BranchSlot, CallAnchor, DependencyArray, FactoryAnchor, WrapperBranch,
    WrapperDescriptor, WrapperStyle,
};

#[cfg(feature = "napi")]
pub use batch::render_bundle_native;
#[cfg(feature = "napi")]
pub use renderer::render_umd_file_native;
