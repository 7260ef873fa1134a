//! Render options.
//!
//! Every field has a default, so `{}` is a valid configuration.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::RenderError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RenderOptions {
    /// Prefix of generated namespace qualifiers (`i0`, `i1`, ...).
    pub import_prefix: String,
    /// npm scope → global namespace, e.g. `angular` → `ng`.
    pub scope_aliases: BTreeMap<String, String>,
    pub source_map: bool,
    /// Rendered files are written to `<dir>/<output_dir_name>/<file>`.
    pub output_dir_name: String,
    pub cache_dir: Option<PathBuf>,
    pub parallel: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        RenderOptions {
            import_prefix: "i".to_string(),
            scope_aliases: BTreeMap::from([("angular".to_string(), "ng".to_string())]),
            source_map: true,
            output_dir_name: "__ivy_ngcc__".to_string(),
            cache_dir: None,
            parallel: true,
        }
    }
}

impl RenderOptions {
    pub fn from_json(json: &str) -> Result<Self, RenderError> {
        let options: RenderOptions = serde_json::from_str(json).map_err(|e| RenderError::Config {
            message: format!("invalid render options: {}", e),
        })?;
        options.validate()?;
        Ok(options)
    }

    pub fn load(path: &Path) -> Result<Self, RenderError> {
        let json = fs::read_to_string(path).map_err(|e| RenderError::io(path.display().to_string(), e))?;
        Self::from_json(&json)
    }

    pub fn validate(&self) -> Result<(), RenderError> {
        if !is_identifier(&self.import_prefix) {
            return Err(RenderError::Config {
                message: format!(
                    "importPrefix \"{}\" is not a valid JavaScript identifier",
                    self.import_prefix
                ),
            });
        }
        let dir = self.output_dir_name.as_str();
        if dir.is_empty() || dir == "." || dir == ".." || dir.contains(['/', '\\']) {
            return Err(RenderError::Config {
                message: format!("outputDirName \"{}\" must be a single directory name", dir),
            });
        }
        if let Some((scope, alias)) = self
            .scope_aliases
            .iter()
            .find(|(scope, alias)| scope.is_empty() || !is_identifier(alias))
        {
            return Err(RenderError::Config {
                message: format!("scope alias \"{}\" → \"{}\" is not usable", scope, alias),
            });
        }
        Ok(())
    }

    /// Where the rendered form of `source` is written. Never `source` itself.
    pub fn output_path_for(&self, source: &Path) -> PathBuf {
        let parent = source.parent().unwrap_or_else(|| Path::new(""));
        let file_name = source.file_name().map_or_else(|| "index.js".into(), |n| n.to_os_string());
        parent.join(&self.output_dir_name).join(file_name)
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}
