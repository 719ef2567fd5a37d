//! Atomic image writes.

use anyhow::{Context, Result};
use std::io::Write;
use std::path::Path;

/// Result of [`write_image`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageWrite {
    /// Bytes were persisted at the target path.
    Written(u64),
    /// Another writer got there first; the existing file was kept.
    AlreadyPresent,
}

/// Write `bytes` to `save_path` through a temp file in the same directory.
///
/// Never overwrites: if the file appears while we write, ours is discarded.
/// The parent directory must already exist.
pub fn write_image(save_path: &Path, bytes: &[u8]) -> Result<ImageWrite> {
    let dir = save_path
        .parent()
        .with_context(|| format!("no parent directory for {}", save_path.display()))?;
    let mut tmp = tempfile::Builder::new()
        .prefix(".hoover-")
        .suffix(".part")
        .tempfile_in(dir)
        .with_context(|| format!("create temp file in {}", dir.display()))?;
    tmp.write_all(bytes)
        .with_context(|| format!("write temp file for {}", save_path.display()))?;
    tmp.as_file()
        .sync_all()
        .with_context(|| format!("sync temp file for {}", save_path.display()))?;

    match tmp.persist_noclobber(save_path) {
        Ok(_) => Ok(ImageWrite::Written(bytes.len() as u64)),
        Err(e) if e.error.kind() == std::io::ErrorKind::AlreadyExists => Ok(ImageWrite::AlreadyPresent),
        Err(e) => Err(e.error).with_context(|| format!("persist image {}", save_path.display())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_bytes_and_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logo.png");
        assert_eq!(write_image(&path, b"PNGDATA").unwrap(), ImageWrite::Written(7));
        assert_eq!(std::fs::read(&path).unwrap(), b"PNGDATA");
        let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn existing_file_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logo.png");
        std::fs::write(&path, b"first").unwrap();
        assert_eq!(write_image(&path, b"second").unwrap(), ImageWrite::AlreadyPresent);
        assert_eq!(std::fs::read(&path).unwrap(), b"first");
    }

    #[test]
    fn missing_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(write_image(&dir.path().join("nope/logo.png"), b"x").is_err());
    }
}
