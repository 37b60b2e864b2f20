//! Module source backed by a directory of dump files

use std::path::{Path, PathBuf};

use kona_engine::{ModuleSource, VmError, VmResult};
use tracing::debug;

/// Extension appended to module ids that do not already carry it
pub const DUMP_EXTENSION: &str = ".dump";

/// Resolves module id `a/b` to `<base_dir>/a/b.dump`
#[derive(Debug, Clone)]
pub struct FileSystemSource {
    base_dir: PathBuf,
}

impl FileSystemSource {
    /// Source rooted at `base_dir`
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Root directory
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// File a module id maps to
    pub fn path(&self, id: &str) -> PathBuf {
        if id.ends_with(DUMP_EXTENSION) {
            return self.base_dir.join(id);
        }
        let mut file = self.base_dir.join(id).into_os_string();
        file.push(DUMP_EXTENSION);
        PathBuf::from(file)
    }
}

impl ModuleSource for FileSystemSource {
    fn exists(&self, id: &str) -> bool {
        self.path(id).is_file()
    }

    fn load(&self, id: &str) -> VmResult<String> {
        let path = self.path(id);
        debug!(module = id, path = %path.display(), "reading module");
        std::fs::read_to_string(&path).map_err(|err| VmError::Io {
            id: id.to_string(),
            message: err.to_string(),
        })
    }

    fn filename(&self, id: &str) -> String {
        self.path(id).display().to_string()
    }

    fn dirname(&self, id: &str) -> String {
        self.path(id)
            .parent()
            .map(|dir| dir.display().to_string())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_mapping() {
        let source = FileSystemSource::new("/srv/app");
        assert_eq!(source.path("lib/math"), PathBuf::from("/srv/app/lib/math.dump"));
        assert_eq!(source.path("main.dump"), PathBuf::from("/srv/app/main.dump"));
        assert_eq!(source.path("v1.2"), PathBuf::from("/srv/app/v1.2.dump"));
        assert_eq!(source.dirname("lib/math"), "/srv/app/lib");
    }

    #[test]
    fn test_missing_file() {
        let source = FileSystemSource::new("/nonexistent/kona");
        assert!(!source.exists("main"));
        assert!(matches!(source.load("main"), Err(VmError::Io { id, .. }) if id == "main"));
    }
}
