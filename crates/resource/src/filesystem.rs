//! Filesystem-based template provider.
//!
//! Templates are loaded relative to a base directory. Every resolved path is
//! checked to remain within that directory, so template expressions such as
//! `container/../../secret` cannot reach outside it.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use zpt_traits::{ResourceError, ResourceProvider, SharedResourceData};

/// A resource provider that loads templates from the local filesystem.
#[derive(Debug)]
pub struct FilesystemResourceProvider {
    base_path: PathBuf,
    /// Canonicalized base path for containment checks
    canonical_base: Option<PathBuf>,
}

impl FilesystemResourceProvider {
    /// Creates a provider rooted at `base_path`.
    pub fn new<P: AsRef<Path>>(base_path: P) -> Self {
        let base = base_path.as_ref().to_path_buf();
        // May fail if the directory doesn't exist yet
        let canonical = base.canonicalize().ok();
        Self {
            base_path: base,
            canonical_base: canonical,
        }
    }

    /// Returns the base path for this provider.
    pub fn base(&self) -> &Path {
        &self.base_path
    }

    /// Resolves a relative path against the base directory.
    ///
    /// Returns `None` for absolute paths and for paths escaping the base.
    fn resolve_path_safe(&self, path: &str) -> Option<PathBuf> {
        if Path::new(path).is_absolute() {
            return None;
        }

        let full_path = self.base_path.join(path);

        if let Ok(canonical) = full_path.canonicalize()
            && let Some(ref base) = self.canonical_base
        {
            if canonical.starts_with(base) {
                return Some(canonical);
            }
            log::warn!("Blocked template path escaping {:?}: {}", self.base_path, path);
            return None;
        }

        // Not canonicalizable (usually missing): reject any parent component
        if Path::new(path)
            .components()
            .any(|component| matches!(component, Component::ParentDir))
        {
            return None;
        }

        Some(full_path)
    }
}

impl ResourceProvider for FilesystemResourceProvider {
    fn load(&self, path: &str) -> Result<SharedResourceData, ResourceError> {
        let full_path = self
            .resolve_path_safe(path)
            .ok_or_else(|| ResourceError::NotFound(format!("{} (path traversal blocked)", path)))?;

        std::fs::read(&full_path).map(Arc::new).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ResourceError::NotFound(path.to_string())
            } else {
                ResourceError::LoadFailed {
                    path: path.to_string(),
                    message: e.to_string(),
                }
            }
        })
    }

    fn exists(&self, path: &str) -> bool {
        self.resolve_path_safe(path)
            .map(|p| p.is_file())
            .unwrap_or(false)
    }

    fn is_directory(&self, path: &str) -> bool {
        if path.is_empty() {
            return self.base_path.is_dir();
        }
        self.resolve_path_safe(path)
            .map(|p| p.is_dir())
            .unwrap_or(false)
    }

    fn base_path(&self) -> Option<&str> {
        self.base_path.to_str()
    }

    fn name(&self) -> &'static str {
        "FilesystemResourceProvider"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_filesystem_provider_load_existing_file() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("page.pt"), b"<html/>").unwrap();

        let provider = FilesystemResourceProvider::new(dir.path());
        let data = provider.load("page.pt").unwrap();
        assert_eq!(&*data, b"<html/>");
        assert_eq!(provider.load_text("page.pt").unwrap(), "<html/>");
    }

    #[test]
    fn test_filesystem_provider_not_found() {
        let dir = tempdir().unwrap();
        let provider = FilesystemResourceProvider::new(dir.path());

        let result = provider.load("nonexistent.pt");
        assert!(matches!(result, Err(ResourceError::NotFound(_))));
    }

    #[test]
    fn test_filesystem_provider_files_and_directories() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("macros")).unwrap();
        fs::write(dir.path().join("macros").join("layout.pt"), b"<html/>").unwrap();

        let provider = FilesystemResourceProvider::new(dir.path());
        assert!(provider.is_directory(""));
        assert!(provider.is_directory("macros"));
        assert!(!provider.is_directory("macros/layout.pt"));
        assert!(provider.exists("macros/layout.pt"));
        assert!(!provider.exists("macros"));
    }

    #[test]
    fn test_filesystem_provider_blocks_path_traversal() {
        let dir = tempdir().unwrap();
        let provider = FilesystemResourceProvider::new(dir.path());

        assert!(provider.load("../../../etc/passwd").is_err());
        assert!(!provider.exists("../../../etc/passwd"));
        assert!(!provider.is_directory(".."));
        assert!(!provider.exists("foo/../../../bar"));
    }

    #[test]
    fn test_filesystem_provider_blocks_absolute_paths() {
        let dir = tempdir().unwrap();
        let provider = FilesystemResourceProvider::new(dir.path());

        assert!(provider.load("/etc/passwd").is_err());
        assert!(!provider.exists("/etc/passwd"));
    }

    #[test]
    fn test_filesystem_provider_base_path() {
        let dir = tempdir().unwrap();
        let provider = FilesystemResourceProvider::new(dir.path());
        assert!(provider.base_path().is_some());
        assert_eq!(provider.base(), dir.path());
    }
}
