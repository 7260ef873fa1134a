use crate::renderer::RenderedFile;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Serialize, Deserialize)]
pub struct CacheEntry {
    pub hash: String,
    pub rendered: RenderedFile,
}

/// Rendered files keyed by everything that can change the output.
pub struct RenderCache {
    cache_dir: PathBuf,
}

impl RenderCache {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        let cache_dir = cache_dir.into();
        if !cache_dir.exists() {
            fs::create_dir_all(&cache_dir).ok();
        }
        Self { cache_dir }
    }

    /// SHA-256 over the crate version, the source and the JSON of plan and options.
    pub fn compute_hash(source: &str, plan_json: &str, options_json: &str) -> String {
        let mut hasher = Sha256::new();
        for part in [env!("CARGO_PKG_VERSION"), source, plan_json, options_json] {
            hasher.update((part.len() as u64).to_le_bytes());
            hasher.update(part.as_bytes());
        }
        format!("{:x}", hasher.finalize())
    }

    fn get_cache_path(&self, file_path: &Path) -> PathBuf {
        let safe_name = file_path
            .to_string_lossy()
            .replace('/', "_")
            .replace('\\', "_")
            .replace(':', "_");
        self.cache_dir.join(format!("{}.json", safe_name))
    }

    pub fn get(&self, file_path: &Path, hash: &str) -> Option<RenderedFile> {
        let cache_path = self.get_cache_path(file_path);
        if !cache_path.exists() {
            return None;
        }

        let data = fs::read_to_string(&cache_path).ok()?;
        let entry: CacheEntry = match serde_json::from_str(&data) {
            Ok(e) => e,
            Err(e) => {
                tracing::warn!(
                    file = %file_path.display(),
                    error = %e,
                    "discarding corrupt render cache entry"
                );
                fs::remove_file(cache_path).ok();
                return None;
            }
        };

        (entry.hash == hash).then_some(entry.rendered)
    }

    pub fn set(&self, file_path: &Path, hash: &str, rendered: &RenderedFile) {
        let cache_path = self.get_cache_path(file_path);
        let entry = CacheEntry {
            hash: hash.to_string(),
            rendered: rendered.clone(),
        };
        if let Ok(data) = serde_json::to_string(&entry) {
            fs::write(cache_path, data).ok();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rendered(code: &str) -> RenderedFile {
        RenderedFile {
            path: PathBuf::from("/pkg/file.js"),
            code: code.to_string(),
            map: None,
            diagnostics: Vec::new(),
        }
    }

    #[test]
    fn hits_only_on_matching_hash() {
        let dir = tempfile::tempdir().unwrap();
        let cache = RenderCache::new(dir.path());
        let path = Path::new("/pkg/file.js");
        let hash = RenderCache::compute_hash("src", "{}", "{}");

        assert!(cache.get(path, &hash).is_none());
        cache.set(path, &hash, &rendered("out"));
        assert_eq!(cache.get(path, &hash).unwrap().code, "out");

        let other = RenderCache::compute_hash("src", "{\"classes\":[]}", "{}");
        assert_ne!(hash, other);
        assert!(cache.get(path, &other).is_none());
    }

    #[test]
    fn corrupt_entries_are_removed() {
        let dir = tempfile::tempdir().unwrap();
        let cache = RenderCache::new(dir.path());
        let path = Path::new("/pkg/file.js");
        let entry_path = cache.get_cache_path(path);
        fs::write(&entry_path, "{not json").unwrap();

        assert!(cache.get(path, "whatever").is_none());
        assert!(!entry_path.exists());
    }
}
