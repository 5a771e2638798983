//! Resource fingerprints for `ETag`, `If-Match` and `If-None-Match`.
//!
//! A file is fingerprinted by its modification time and size, a container
//! by those of its immediate children (sorted by name). An empty container
//! falls back to its own modification time. Tags are computed on every
//! request and never cached.

use std::fs::{self, Metadata};
use std::io;
use std::path::Path;
use std::time::UNIX_EPOCH;

/// Quoted, strong entity tag for `path`.
pub fn compute(path: &Path) -> io::Result<String> {
    let meta = fs::metadata(path)?;
    let mut hasher = blake3::Hasher::new();

    if meta.is_dir() {
        let mut children: Vec<_> = fs::read_dir(path)?.collect::<Result<_, _>>()?;
        children.sort_by_key(|entry| entry.file_name());

        if children.is_empty() {
            hasher.update(&mtime_nanos(&meta)?.to_le_bytes());
        }
        for child in children {
            let child_meta = child.metadata()?;
            hasher.update(&mtime_nanos(&child_meta)?.to_le_bytes());
            hasher.update(&child_meta.len().to_le_bytes());
        }
    } else {
        hasher.update(&mtime_nanos(&meta)?.to_le_bytes());
        hasher.update(&meta.len().to_le_bytes());
    }

    Ok(format!("\"{}\"", hex::encode(hasher.finalize().as_bytes())))
}

fn mtime_nanos(meta: &Metadata) -> io::Result<u128> {
    let modified = meta.modified()?;
    let since = modified.duration_since(UNIX_EPOCH).map_err(io::Error::other)?;
    Ok(since.as_nanos())
}

/// Does an `If-Match`/`If-None-Match` value name `etag`?
///
/// `*` matches any tag; weak tags compare by their opaque part.
pub fn matches(header: &str, etag: &str) -> bool {
    let wanted = etag.trim_start_matches("W/");
    header.split(',').map(str::trim).any(|candidate| {
        candidate == "*" || candidate.trim_start_matches("W/") == wanted
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_file_tag_is_quoted_hex() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("card");
        fs::write(&file, "<a> <b> <c> .").unwrap();

        let tag = compute(&file).unwrap();
        assert!(tag.starts_with('"') && tag.ends_with('"'));
        assert_eq!(tag.len(), 66);
        assert_eq!(tag, compute(&file).unwrap());
    }

    #[test]
    fn test_file_tag_follows_size() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("card");
        fs::write(&file, "a").unwrap();
        let before = compute(&file).unwrap();
        fs::write(&file, "ab").unwrap();
        assert_ne!(before, compute(&file).unwrap());
    }

    #[test]
    fn test_container_tag_follows_children() {
        let temp = TempDir::new().unwrap();
        let empty = compute(temp.path()).unwrap();

        fs::write(temp.path().join("a"), "1").unwrap();
        let one = compute(temp.path()).unwrap();
        assert_ne!(empty, one);

        fs::write(temp.path().join("b"), "22").unwrap();
        assert_ne!(one, compute(temp.path()).unwrap());
    }

    #[test]
    fn test_missing_resource() {
        let temp = TempDir::new().unwrap();
        assert!(compute(&temp.path().join("nope")).is_err());
    }

    #[test]
    fn test_matches() {
        assert!(matches("\"abc\"", "\"abc\""));
        assert!(matches("\"x\", \"abc\"", "\"abc\""));
        assert!(matches("W/\"abc\"", "\"abc\""));
        assert!(matches("*", "\"abc\""));
        assert!(!matches("\"abd\"", "\"abc\""));
    }
}
