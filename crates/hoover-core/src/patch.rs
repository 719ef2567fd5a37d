//! Saved-page patching: swap an image URL for its local path.
//!
//! Several workers can finish images of the same page at once. Patches to
//! one file are serialized twice over: [`PatchLocks`] orders them inside a
//! process, and an exclusive `flock` on the file orders them across worker
//! processes. The rewrite happens in place on the locked handle.

use anyhow::{Context, Result};
use memchr::memmem;
use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
#[cfg(unix)]
use std::os::unix::io::AsRawFd;

/// Registry of per-file async mutexes, keyed by saved-page path.
#[derive(Default)]
pub struct PatchLocks {
    files: Mutex<HashMap<PathBuf, Arc<tokio::sync::Mutex<()>>>>,
}

impl PatchLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive patch access to `path` within this process.
    pub async fn lock(&self, path: &Path) -> tokio::sync::OwnedMutexGuard<()> {
        let file_lock = {
            let mut files = self.files.lock().unwrap_or_else(|e| e.into_inner());
            // Drop entries nobody holds or waits on.
            files.retain(|_, m| Arc::strong_count(m) > 1);
            Arc::clone(files.entry(path.to_path_buf()).or_default())
        };
        file_lock.lock_owned().await
    }

    /// Number of paths currently tracked (held or awaited).
    pub fn tracked(&self) -> usize {
        let files = self.files.lock().unwrap_or_else(|e| e.into_inner());
        files.values().filter(|m| Arc::strong_count(m) > 1).count()
    }
}

/// Replace every occurrence of `needle` in `haystack`. Returns the new bytes
/// and the number of replacements. Works on bytes so pages that are not
/// valid UTF-8 survive untouched outside the replaced spans.
pub fn replace_all_bytes(haystack: &[u8], needle: &[u8], replacement: &[u8]) -> (Vec<u8>, usize) {
    if needle.is_empty() || haystack.len() < needle.len() {
        return (haystack.to_vec(), 0);
    }
    let mut out = Vec::with_capacity(haystack.len());
    let mut count = 0;
    let mut copied = 0;
    for start in memmem::find_iter(haystack, needle) {
        out.extend_from_slice(&haystack[copied..start]);
        out.extend_from_slice(replacement);
        copied = start + needle.len();
        count += 1;
    }
    out.extend_from_slice(&haystack[copied..]);
    (out, count)
}

/// Apply the URL → local path substitution to page text.
///
/// Every literal occurrence of `url` is replaced. When the page referenced
/// the image by a different raw `src` (e.g. relative), `src="raw"` and
/// `src='raw'` attribute occurrences are replaced as well.
pub fn substitute(content: &[u8], url: &str, save_path: &str, src_ref: Option<&str>) -> (Vec<u8>, usize) {
    let (mut out, mut count) = replace_all_bytes(content, url.as_bytes(), save_path.as_bytes());
    if let Some(raw) = src_ref.filter(|raw| !raw.is_empty() && *raw != url) {
        for quote in ['"', '\''] {
            let needle = format!("src={quote}{raw}{quote}");
            let replacement = format!("src={quote}{save_path}{quote}");
            let (next, n) = replace_all_bytes(&out, needle.as_bytes(), replacement.as_bytes());
            out = next;
            count += n;
        }
    }
    (out, count)
}

#[cfg(unix)]
fn lock_exclusive(file: &File) -> std::io::Result<()> {
    loop {
        let r = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX) };
        if r == 0 {
            return Ok(());
        }
        let err = std::io::Error::last_os_error();
        if err.kind() != std::io::ErrorKind::Interrupted {
            return Err(err);
        }
    }
}

#[cfg(not(unix))]
fn lock_exclusive(_file: &File) -> std::io::Result<()> {
    Ok(())
}

/// Rewrite the saved page at `html_path` in place. Blocking; the lock is
/// released when the file handle closes. Returns the number of replacements.
pub fn patch_saved_page(
    html_path: &Path,
    url: &str,
    save_path: &str,
    src_ref: Option<&str>,
) -> Result<usize> {
    let mut file = File::options()
        .read(true)
        .write(true)
        .open(html_path)
        .with_context(|| format!("open saved page {}", html_path.display()))?;
    lock_exclusive(&file).with_context(|| format!("lock saved page {}", html_path.display()))?;

    let mut content = Vec::new();
    file.read_to_end(&mut content)
        .with_context(|| format!("read saved page {}", html_path.display()))?;

    let (patched, count) = substitute(&content, url, save_path, src_ref);
    if count == 0 {
        return Ok(0);
    }

    file.seek(SeekFrom::Start(0))?;
    file.set_len(0)
        .with_context(|| format!("truncate saved page {}", html_path.display()))?;
    file.write_all(&patched)
        .with_context(|| format!("write saved page {}", html_path.display()))?;
    file.sync_all()
        .with_context(|| format!("sync saved page {}", html_path.display()))?;
    Ok(count)
}
