//! On-disk resource helpers.

use super::LdpError;
use crate::graph::Graph;
use rand::RngCore;
use std::fs;
use std::io;
use std::path::Path;

/// Replace `path` with `data`, creating missing parent directories.
///
/// Data goes to a sibling temp file first and is renamed over the target,
/// so readers see either the old or the new content.
pub fn write_atomic(path: &Path, data: &[u8]) -> io::Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| io::Error::other(format!("{} has no parent", path.display())))?;
    fs::create_dir_all(parent)?;

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let temp = parent.join(format!(".{name}.{}.tmp", random_hex(4)));
    if let Err(e) = fs::write(&temp, data) {
        fs::remove_file(&temp).ok();
        return Err(e);
    }
    fs::rename(&temp, path).inspect_err(|_| {
        fs::remove_file(&temp).ok();
    })
}

/// Load the graph stored at `path`; a missing file is an empty graph.
pub fn load_graph(path: &Path, content_type: &str, base: &str) -> Result<Graph, LdpError> {
    match fs::read(path) {
        Ok(data) => Graph::parse(&data, content_type, base).map_err(LdpError::internal),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Graph::new()),
        Err(e) => Err(e.into()),
    }
}

/// Serialize `graph` as `content_type` and store it at `path`.
pub fn store_graph(path: &Path, graph: &Graph, content_type: &str) -> Result<(), LdpError> {
    let data = graph.serialize(content_type).map_err(LdpError::internal)?;
    write_atomic(path, &data)?;
    Ok(())
}

/// `bytes` random bytes as lowercase hex.
pub fn random_hex(bytes: usize) -> String {
    let mut buf = vec![0u8; bytes];
    rand::thread_rng().fill_bytes(&mut buf);
    hex::encode(buf)
}

/// Turn a `Slug` header into a safe path segment: ASCII letters, digits,
/// `.`, `_` and `-` only.
pub fn slugify(slug: &str) -> String {
    let ascii = deunicode::deunicode(slug);
    let mut out = String::with_capacity(ascii.len());
    for c in ascii.chars() {
        if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
            out.push(c.to_ascii_lowercase());
        } else if !out.ends_with('-') {
            out.push('-');
        }
    }
    out.trim_matches(|c| c == '-' || c == '.').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_atomic_creates_parents() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("a/b/card");
        write_atomic(&path, b"one").unwrap();
        write_atomic(&path, b"two").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"two");

        let leftovers: Vec<_> = fs::read_dir(temp.path().join("a/b")).unwrap().collect();
        assert_eq!(leftovers.len(), 1);
    }

    #[test]
    fn test_load_missing_graph_is_empty() {
        let temp = TempDir::new().unwrap();
        let graph = load_graph(&temp.path().join("nope"), "text/turtle", "http://h/").unwrap();
        assert!(graph.is_empty());
    }

    #[test]
    fn test_load_broken_graph_fails() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("bad");
        fs::write(&path, "<a> <b> .").unwrap();
        let err = load_graph(&path, "text/turtle", "http://h/").unwrap_err();
        assert_eq!(err.status(), 500);
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Hello World!"), "hello-world");
        assert_eq!(slugify("Crème brûlée"), "creme-brulee");
        assert_eq!(slugify("../etc/passwd"), "etc-passwd");
        assert_eq!(slugify("///"), "");
    }

    #[test]
    fn test_random_hex() {
        assert_eq!(random_hex(3).len(), 6);
        assert_ne!(random_hex(8), random_hex(8));
    }
}
