//! Path containment for vault file operations.
//!
//! Every path-accepting operation resolves its target to an absolute path and
//! checks it sits under the vault root. Directory walks skip the vault's own
//! index directory.
use std::path::{Component, Path, PathBuf};

use tracing::warn;
use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::traits::Extractor;

/// Lowercased extension without the dot.
pub fn file_extension(path: &Path) -> Option<String> {
    path.extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .filter(|e| !e.is_empty())
}

pub fn ensure_has_extension(path: &Path) -> Result<()> {
    match file_extension(path) {
        Some(_) => Ok(()),
        None => Err(Error::MissingFileType(path.to_path_buf())),
    }
}

pub fn ensure_supported(path: &Path, extractor: &dyn Extractor) -> Result<()> {
    if extractor.supports(path) {
        return Ok(());
    }
    let ext = file_extension(path).map_or_else(|| "<none>".to_string(), |e| format!(".{e}"));
    Err(Error::UnsupportedFileType(ext))
}

fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for comp in path.components() {
        match comp {
            Component::ParentDir => { out.pop(); }
            Component::CurDir => {}
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Make `path` absolute, fold `.`/`..` and resolve symlinks on the longest
/// existing prefix. The target itself does not need to exist.
pub fn resolve(path: &Path) -> Result<PathBuf> {
    let absolute = if path.is_absolute() { path.to_path_buf() } else { std::env::current_dir()?.join(path) };
    let normalized = normalize(&absolute);

    let mut existing = normalized.as_path();
    let mut tail = Vec::new();
    loop {
        if let Ok(canonical) = existing.canonicalize() {
            let mut out = canonical;
            for name in tail.iter().rev() { out.push(name); }
            return Ok(out);
        }
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                tail.push(name.to_os_string());
                existing = parent;
            }
            _ => return Ok(normalized),
        }
    }
}

/// Resolve `path` and fail with `FileOutsideVault` unless it lies under `root`.
pub fn ensure_within(path: &Path, root: &Path) -> Result<PathBuf> {
    let resolved = resolve(path)?;
    let root = resolve(root)?;
    if resolved.starts_with(&root) {
        Ok(resolved)
    } else {
        Err(Error::FileOutsideVault(path.to_path_buf()))
    }
}

/// `root / relative`, contained in `root`. Absolute `relative` paths replace the
/// root entirely and are only accepted if they still land inside it.
pub fn resolve_in_vault(root: &Path, relative: &Path) -> Result<PathBuf> {
    ensure_within(&root.join(relative), root)
}

fn is_excluded(path: &Path, exclude: &[PathBuf]) -> bool {
    match resolve(path) {
        Ok(resolved) => exclude.iter().any(|ex| resolved.starts_with(ex)),
        Err(_) => false,
    }
}

/// All regular files under `base` (or `base` itself when it is a file), sorted,
/// skipping anything under one of the `exclude` directories. A missing `base`
/// yields no files.
pub fn walk_files(base: &Path, exclude: &[PathBuf]) -> Result<Vec<PathBuf>> {
    if !base.exists() {
        warn!("nothing to walk, {} does not exist", base.display());
        return Ok(Vec::new());
    }
    let exclude: Vec<PathBuf> = exclude.iter().map(|p| resolve(p)).collect::<Result<_>>()?;
    if base.is_file() {
        return Ok(if is_excluded(base, &exclude) { vec![] } else { vec![base.to_path_buf()] });
    }
    let mut files = Vec::new();
    let walker = WalkDir::new(base)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_excluded(e.path(), &exclude));
    for entry in walker {
        match entry {
            Ok(entry) if entry.file_type().is_file() => files.push(entry.into_path()),
            Ok(_) => {}
            Err(err) => warn!("skipping unreadable entry under {}: {}", base.display(), err),
        }
    }
    Ok(files)
}
