//! Filesystem path normalization.

use std::path::{Component, Path, PathBuf};

/// Normalize a file system path to absolute form.
///
/// Existing paths are canonicalized (symlinks resolved). Paths that do not
/// exist yet, such as a storage root before `init`, are made absolute
/// against the current directory and cleaned lexically.
pub fn normalize_path(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| {
        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir().map_or_else(|_| path.to_path_buf(), |cwd| cwd.join(path))
        };
        clean(&absolute)
    })
}

/// Drop `.` components and fold `..` into its parent without touching disk.
fn clean(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_normalize_path_relative() {
        let normalized = normalize_path(Path::new("relative/path/file.txt"));
        assert!(normalized.is_absolute());
        assert!(normalized.ends_with("relative/path/file.txt"));
    }

    #[test]
    fn test_normalize_missing_path_lexically() {
        let normalized = normalize_path(Path::new("/srv/ldpd/./conf/../data"));
        assert_eq!(normalized, PathBuf::from("/srv/ldpd/data"));
    }

    #[test]
    fn test_normalize_existing_path() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir(temp.path().join("data")).unwrap();
        std::fs::create_dir(temp.path().join("x")).unwrap();
        let normalized = normalize_path(&temp.path().join("x/../data"));
        assert_eq!(normalized, temp.path().canonicalize().unwrap().join("data"));
    }
}
