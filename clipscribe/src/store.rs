//! Scratch-directory lifecycle for uploaded videos and derived audio.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::types::VideoAsset;

/// Writes uploads to request-unique paths under a scratch directory and
/// deletes them again.
#[derive(Debug)]
pub struct TempStore {
    dir: PathBuf,
    counter: AtomicU64,
}

impl TempStore {
    /// Open (and create, if absent) the scratch directory.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|e| {
            Error::Io(std::io::Error::new(
                e.kind(),
                format!("failed to create scratch dir {}: {e}", dir.display()),
            ))
        })?;
        Ok(Self {
            dir,
            counter: AtomicU64::new(0),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write `bytes` to a fresh file whose name is derived from `suggested_name`.
    ///
    /// Two calls with the same name never share a path: the name gets a
    /// pid/timestamp/counter prefix and the file is opened with `create_new`.
    pub fn store(&self, bytes: &[u8], suggested_name: &str) -> Result<VideoAsset> {
        let path = self.unique_path(suggested_name);

        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)?;
        if let Err(e) = file.write_all(bytes).and_then(|_| file.flush()) {
            drop(file);
            self.release(&path);
            return Err(e.into());
        }

        debug!(path = %path.display(), bytes = bytes.len(), "stored upload");
        Ok(VideoAsset {
            path,
            original_name: suggested_name.to_string(),
        })
    }

    /// Delete a stored file. A file that is already gone counts as released.
    ///
    /// Returns false only when the file exists and could not be removed.
    pub fn release(&self, path: &Path) -> bool {
        match std::fs::remove_file(path) {
            Ok(()) => {
                debug!(path = %path.display(), "released asset");
                true
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => true,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to release asset");
                false
            }
        }
    }

    /// Tie a path's lifetime to the returned guard.
    pub fn guard<'a>(&'a self, path: impl Into<PathBuf>) -> AssetGuard<'a> {
        AssetGuard {
            store: self,
            path: path.into(),
        }
    }

    fn unique_path(&self, suggested_name: &str) -> PathBuf {
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        self.dir.join(format!(
            "{}-{nanos}-{n}-{}",
            std::process::id(),
            sanitize_filename(suggested_name)
        ))
    }
}

/// RAII guard that releases an asset when dropped.
pub struct AssetGuard<'a> {
    store: &'a TempStore,
    path: PathBuf,
}

impl AssetGuard<'_> {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for AssetGuard<'_> {
    fn drop(&mut self) {
        self.store.release(&self.path);
    }
}

/// Longest sanitized name kept, in bytes. Leaves room under NAME_MAX (255)
/// for the uniqueness prefix and the derived `.mp3` suffix.
const MAX_NAME_BYTES: usize = 100;

/// Longest extension preserved when a name is shortened.
const MAX_EXT_BYTES: usize = 16;

/// Reduce an uploader-supplied name to a safe single path component of at
/// most 100 bytes.
pub fn sanitize_filename(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();

    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();

    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        truncate_name(cleaned, MAX_NAME_BYTES)
    }
}

/// Shorten `name` to `budget` bytes, keeping a short extension intact.
fn truncate_name(name: &str, budget: usize) -> String {
    if name.len() <= budget {
        return name.to_string();
    }
    let (stem, ext) = match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && ext.len() < MAX_EXT_BYTES => (stem, ext),
        _ => (name, ""),
    };
    let stem_budget = if ext.is_empty() {
        budget
    } else {
        budget - ext.len() - 1
    };
    let mut cut = stem_budget.min(stem.len());
    while !stem.is_char_boundary(cut) {
        cut -= 1;
    }
    if ext.is_empty() {
        stem[..cut].to_string()
    } else {
        format!("{}.{ext}", &stem[..cut])
    }
}
