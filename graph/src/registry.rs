use std::{
    fs,
    path::{Path, PathBuf},
};

/// Paths marked for removal by the clean task.
///
/// One registry exists per configuration session and is handed to every
/// rule generator; there is no ambient global list.
#[derive(Debug, Default)]
pub struct CleanupRegistry {
    paths: Vec<PathBuf>,
}

impl CleanupRegistry {
    pub fn new() -> CleanupRegistry {
        CleanupRegistry::default()
    }

    /// Registering the same path again is a no-op, so every path shows up
    /// at most once at clean time.
    pub fn register<P: Into<PathBuf>>(&mut self, path: P) {
        let path = path.into();
        if !self.paths.contains(&path) {
            self.paths.push(path);
        }
    }

    pub fn contains<P: AsRef<Path>>(&self, path: P) -> bool {
        self.paths.iter().any(|p| p == path.as_ref())
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Remove every registered path. Clean is best-effort and never fails:
    /// a path that is already gone, or one the process cannot remove, is
    /// skipped.
    pub fn clean_all(&self) {
        remove_paths(&self.paths);
    }
}

pub fn remove_paths(paths: &[PathBuf]) {
    for path in paths {
        let removed = if path.is_dir() {
            fs::remove_dir_all(path)
        } else {
            fs::remove_file(path)
        };
        if let Err(err) = removed {
            tracing::debug!("clean: skipping {}: {}", path.display(), err);
        }
    }
}
