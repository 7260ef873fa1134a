//! Bundle rendering: discovery, parallel rendering and output writing.

#[cfg(feature = "napi")]
use napi_derive::napi;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::cache::RenderCache;
use crate::config::RenderOptions;
use crate::error::{RenderDiagnostic, RenderError};
use crate::renderer::{FileRenderPlan, RenderedFile, Renderer};
use crate::source::SourceFile;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileJob {
    pub path: PathBuf,
    #[serde(flatten)]
    pub plan: FileRenderPlan,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BundlePlan {
    pub files: Vec<FileJob>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    /// Every file written, code and maps alike.
    pub written: Vec<PathBuf>,
    /// Files that could not be rendered at all.
    pub failures: Vec<RenderDiagnostic>,
    /// Classes skipped inside files that were rendered.
    pub diagnostics: Vec<RenderDiagnostic>,
    /// Files served from the render cache.
    pub cached: usize,
}

struct JobOutput {
    written: Vec<PathBuf>,
    diagnostics: Vec<RenderDiagnostic>,
    cached: bool,
}

// ═══════════════════════════════════════════════════════════════════════════════
// DISCOVERY
// ═══════════════════════════════════════════════════════════════════════════════

/// `.js` files under `root` wrapped in a recognised UMD shape, sorted by path.
///
/// Directories named after `options.output_dir_name` hold earlier output and
/// are not descended into.
pub fn discover_umd_files(root: &Path, options: &RenderOptions) -> Vec<PathBuf> {
    let mut files = Vec::new();

    let walker = WalkDir::new(root)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            !(entry.file_type().is_dir() && entry.file_name() == options.output_dir_name.as_str())
        });

    for entry in walker.flatten() {
        let path = entry.path();
        if !path.is_file() || path.extension().map_or(true, |ext| ext != "js") {
            continue;
        }
        let Ok(text) = fs::read_to_string(path) else {
            continue;
        };
        match SourceFile::parse(path, text) {
            Ok(file) if file.is_umd() => files.push(path.to_path_buf()),
            Ok(_) => {}
            Err(err) => tracing::debug!(file = %path.display(), error = %err, "skipping unparsable file"),
        }
    }

    tracing::info!(root = %root.display(), found = files.len(), "discovered UMD files");
    files
}

// ═══════════════════════════════════════════════════════════════════════════════
// RENDERING
// ═══════════════════════════════════════════════════════════════════════════════

/// Renders every job of `plan` and writes the results next to their sources.
///
/// A failing file is reported and does not stop the others.
pub fn render_bundle(plan: &BundlePlan, options: &RenderOptions) -> Result<BatchReport, RenderError> {
    options.validate()?;
    let renderer = Renderer::new(options.clone());
    let cache = options.cache_dir.as_ref().map(RenderCache::new);
    let options_json = serde_json::to_string(options).unwrap_or_default();

    let run = |job: &FileJob| render_job(job, &renderer, cache.as_ref(), &options_json);
    let outcomes: Vec<(&FileJob, Result<JobOutput, RenderError>)> = if options.parallel {
        plan.files.par_iter().map(|job| (job, run(job))).collect()
    } else {
        plan.files.iter().map(|job| (job, run(job))).collect()
    };

    let mut report = BatchReport::default();
    for (job, outcome) in outcomes {
        match outcome {
            Ok(output) => {
                report.written.extend(output.written);
                report.diagnostics.extend(output.diagnostics);
                report.cached += usize::from(output.cached);
            }
            Err(err) => {
                tracing::warn!(file = %job.path.display(), code = err.code(), "{}", err);
                report.failures.push(RenderDiagnostic::from(&err));
            }
        }
    }

    tracing::info!(
        files = plan.files.len(),
        written = report.written.len(),
        failed = report.failures.len(),
        cached = report.cached,
        "rendered bundle"
    );
    Ok(report)
}

fn render_job(
    job: &FileJob,
    renderer: &Renderer,
    cache: Option<&RenderCache>,
    options_json: &str,
) -> Result<JobOutput, RenderError> {
    let display = job.path.display().to_string();
    let source = fs::read_to_string(&job.path).map_err(|e| RenderError::io(&display, e))?;
    let plan_json = serde_json::to_string(&job.plan).unwrap_or_default();
    let hash = RenderCache::compute_hash(&source, &plan_json, options_json);

    let (rendered, cached) = match cache.and_then(|c| c.get(&job.path, &hash)) {
        Some(rendered) => (rendered, true),
        None => {
            let file = SourceFile::parse(&job.path, source)?;
            let rendered = renderer.render_file(&file, &job.plan)?;
            if let Some(cache) = cache {
                cache.set(&job.path, &hash, &rendered);
            }
            (rendered, false)
        }
    };

    let written = write_outputs(&job.path, &rendered, renderer.options())?;
    Ok(JobOutput {
        written,
        diagnostics: rendered.diagnostics,
        cached,
    })
}

fn write_outputs(
    source: &Path,
    rendered: &RenderedFile,
    options: &RenderOptions,
) -> Result<Vec<PathBuf>, RenderError> {
    let output = options.output_path_for(source);
    let display = output.display().to_string();
    if output == source {
        return Err(RenderError::Io {
            file: display,
            message: "refusing to overwrite the source file".into(),
        });
    }
    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent).map_err(|e| RenderError::io(&display, e))?;
    }

    fs::write(&output, &rendered.code).map_err(|e| RenderError::io(&display, e))?;
    let mut written = vec![output.clone()];

    if let Some(map) = &rendered.map {
        let mut map_path = output.into_os_string();
        map_path.push(".map");
        let map_path = PathBuf::from(map_path);
        let json = map.to_json().map_err(|e| RenderError::Io {
            file: map_path.display().to_string(),
            message: e.to_string(),
        })?;
        fs::write(&map_path, json).map_err(|e| RenderError::io(map_path.display().to_string(), e))?;
        written.push(map_path);
    }
    Ok(written)
}

// ═══════════════════════════════════════════════════════════════════════════════
// N-API
// ═══════════════════════════════════════════════════════════════════════════════

/// Renders a JSON [`BundlePlan`] and returns the [`BatchReport`] as JSON.
#[cfg(feature = "napi")]
#[napi]
pub fn render_bundle_native(plan_json: String, options_json: String) -> napi::Result<serde_json::Value> {
    let plan: BundlePlan = serde_json::from_str(&plan_json)
        .map_err(|e| napi::Error::from_reason(format!("Invalid bundle plan: {}", e)))?;
    let options =
        RenderOptions::from_json(&options_json).map_err(|e| napi::Error::from_reason(e.to_string()))?;
    let report = render_bundle(&plan, &options).map_err(|e| napi::Error::from_reason(e.to_string()))?;
    serde_json::to_value(report).map_err(|e| napi::Error::from_reason(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{create_umd_module, UmdModuleOptions, UmdStyle, PROGRAM_BODY};
    use crate::renderer::ClassRenderPlan;
    use pretty_assertions::assert_eq;

    fn write_package(root: &Path) -> (PathBuf, PathBuf) {
        let bundles = root.join("bundles");
        fs::create_dir_all(&bundles).unwrap();
        let umd = bundles.join("pkg.umd.js");
        fs::write(
            &umd,
            create_umd_module(UmdStyle::Conditional, &UmdModuleOptions::default(), PROGRAM_BODY),
        )
        .unwrap();
        let plain = bundles.join("plain.js");
        fs::write(&plain, "var x = 1;\n").unwrap();
        (umd, plain)
    }

    fn strip_directive(path: &Path) -> FileJob {
        FileJob {
            path: path.to_path_buf(),
            plan: FileRenderPlan {
                classes: vec![ClassRenderPlan {
                    name: "A".into(),
                    remove_decorators: vec!["Directive".into()],
                    ..ClassRenderPlan::default()
                }],
                ..FileRenderPlan::default()
            },
        }
    }

    #[test]
    fn discovers_only_umd_files_outside_output_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let (umd, _plain) = write_package(dir.path());
        let output_dir = dir.path().join("bundles").join("__ivy_ngcc__");
        fs::create_dir_all(&output_dir).unwrap();
        fs::copy(&umd, output_dir.join("pkg.umd.js")).unwrap();

        let found = discover_umd_files(dir.path(), &RenderOptions::default());
        assert_eq!(found, vec![umd]);
    }

    #[test]
    fn renders_to_new_paths_and_isolates_failures() {
        let dir = tempfile::tempdir().unwrap();
        let (umd, plain) = write_package(dir.path());
        let original = fs::read_to_string(&umd).unwrap();

        let plan = BundlePlan {
            files: vec![strip_directive(&plain), strip_directive(&umd)],
        };
        let report = render_bundle(&plan, &RenderOptions::default()).unwrap();

        let output = dir.path().join("bundles/__ivy_ngcc__/pkg.umd.js");
        assert_eq!(
            report.written,
            vec![output.clone(), dir.path().join("bundles/__ivy_ngcc__/pkg.umd.js.map")]
        );
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].code, "UMD001");

        assert_eq!(fs::read_to_string(&umd).unwrap(), original);
        let rendered = fs::read_to_string(&output).unwrap();
        assert!(!rendered.contains("selector: '[a]' }] },"));
        assert!(rendered.ends_with("//# sourceMappingURL=pkg.umd.js.map"));
    }

    #[test]
    fn second_run_is_served_from_the_cache() {
        let dir = tempfile::tempdir().unwrap();
        let (umd, _plain) = write_package(dir.path());
        let options = RenderOptions {
            cache_dir: Some(dir.path().join(".cache")),
            parallel: false,
            source_map: false,
            ..RenderOptions::default()
        };
        let plan = BundlePlan {
            files: vec![strip_directive(&umd)],
        };

        let first = render_bundle(&plan, &options).unwrap();
        assert_eq!(first.cached, 0);
        let second = render_bundle(&plan, &options).unwrap();
        assert_eq!(second.cached, 1);
        assert_eq!(first.written, second.written);
    }

    #[test]
    fn bundle_plans_flatten_file_plans() {
        let plan: BundlePlan = serde_json::from_str(
            r#"{"files":[{"path":"/pkg/a.js","classes":[{"name":"A","removeDecorators":["Directive"]}]}]}"#,
        )
        .unwrap();
        assert_eq!(plan.files[0].path, PathBuf::from("/pkg/a.js"));
        assert_eq!(plan.files[0].plan.classes[0].name, "A");
    }
}
