//! Disk I/O for saved pages and images.
//!
//! Pages are created once per crawl under a unique, timestamp-qualified
//! name. Images are written to a temp file in the target directory and
//! persisted atomically, so a half-written image never sits at its final
//! path (where it would short-circuit every later delivery).

mod image;
mod page;

pub use image::{write_image, ImageWrite};
pub use page::{save_page, saved_page_name, UTF8_BOM};

use anyhow::{Context, Result};
use std::path::Path;

/// Create `dir` and any missing ancestors with `mode` (unix permission bits).
/// An existing directory, including one created concurrently, is success.
pub fn ensure_dir(dir: &Path, mode: u32) -> Result<()> {
    if dir.is_dir() {
        return Ok(());
    }
    let mut builder = std::fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(mode);
    }
    #[cfg(not(unix))]
    let _ = mode;
    builder
        .create(dir)
        .with_context(|| format!("create directory {}", dir.display()))?;
    tracing::debug!(dir = %dir.display(), mode = %format!("{:o}", mode), "created directory");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ensure_dir_creates_ancestors_and_tolerates_existing() {
        let root = tempfile::tempdir().unwrap();
        let nested = root.path().join("a/b/c");
        ensure_dir(&nested, 0o755).unwrap();
        assert!(nested.is_dir());
        ensure_dir(&nested, 0o755).unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn ensure_dir_applies_mode() {
        use std::os::unix::fs::PermissionsExt;
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("private");
        ensure_dir(&dir, 0o700).unwrap();
        let mode = std::fs::metadata(&dir).unwrap().permissions().mode() & 0o777;
        // umask can only clear bits.
        assert_eq!(mode & !0o700, 0);
    }

    #[test]
    fn ensure_dir_concurrent_callers() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("shared/images");
        std::thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| ensure_dir(&dir, 0o755).unwrap());
            }
        });
        assert!(dir.is_dir());
    }
}
