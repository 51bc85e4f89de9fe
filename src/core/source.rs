//! File containers contributed by modules.
//!
//! Migration directories and locale directories are both "containers": a
//! named, read-only tree of files. Containers can be compiled into the binary
//! (`EmbeddedAssets`), read from disk (`DirAssets`) or built in memory
//! (`MemoryAssets`, used by tests and by programmatic modules).

use crate::core::error::{ErpkitError, Result};
use rust_embed::RustEmbed;
use std::fs;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

/// A single file read from a container. `path` is container-relative and
/// always uses `/` separators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetFile {
    pub path: String,
    pub contents: String,
}

pub trait AssetSource: Send + Sync {
    /// Label used in diagnostics (e.g. `embedded:migrations/core`).
    fn label(&self) -> String;

    /// All files in the container, sorted lexicographically by path.
    fn files(&self) -> Result<Vec<AssetFile>>;
}

fn sort_files(mut files: Vec<AssetFile>) -> Vec<AssetFile> {
    files.sort_by(|a, b| a.path.cmp(&b.path));
    files
}

/// Container compiled into the binary with `rust-embed`.
pub struct EmbeddedAssets<E: RustEmbed> {
    label: &'static str,
    _embed: PhantomData<fn() -> E>,
}

impl<E: RustEmbed> EmbeddedAssets<E> {
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            _embed: PhantomData,
        }
    }
}

impl<E: RustEmbed> AssetSource for EmbeddedAssets<E> {
    fn label(&self) -> String {
        format!("embedded:{}", self.label)
    }

    fn files(&self) -> Result<Vec<AssetFile>> {
        let mut files = Vec::new();
        for path in E::iter() {
            let file = E::get(&path)
                .ok_or_else(|| ErpkitError::NotFound(format!("{}/{}", self.label, path)))?;
            let contents = String::from_utf8(file.data.into_owned()).map_err(|e| {
                ErpkitError::ParseError {
                    file: format!("{}/{}", self.label, path),
                    line: 0,
                    reason: format!("not valid UTF-8: {}", e),
                }
            })?;
            files.push(AssetFile {
                path: path.replace('\\', "/"),
                contents,
            });
        }
        Ok(sort_files(files))
    }
}

/// Container backed by a directory on disk, walked recursively.
pub struct DirAssets {
    root: PathBuf,
}

impl DirAssets {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn walk(&self, dir: &Path, out: &mut Vec<AssetFile>) -> Result<()> {
        let entries = fs::read_dir(dir).map_err(|e| {
            ErpkitError::IoError(std::io::Error::new(
                e.kind(),
                format!("error reading directory {}: {}", dir.display(), e),
            ))
        })?;
        for entry in entries {
            let entry = entry?;
            let path = entry.path();
            if entry.file_type()?.is_dir() {
                self.walk(&path, out)?;
                continue;
            }
            let rel = path
                .strip_prefix(&self.root)
                .map_err(|_| ErpkitError::ValidationError(format!("{} escapes container", path.display())))?;
            let rel = rel
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join("/");
            let contents = fs::read_to_string(&path)?;
            out.push(AssetFile { path: rel, contents });
        }
        Ok(())
    }
}

impl AssetSource for DirAssets {
    fn label(&self) -> String {
        format!("dir:{}", self.root.display())
    }

    fn files(&self) -> Result<Vec<AssetFile>> {
        let mut files = Vec::new();
        self.walk(&self.root, &mut files)?;
        Ok(sort_files(files))
    }
}

/// In-memory container.
#[derive(Debug, Clone, Default)]
pub struct MemoryAssets {
    label: String,
    files: Vec<AssetFile>,
}

impl MemoryAssets {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            files: Vec::new(),
        }
    }

    pub fn with_file(mut self, path: impl Into<String>, contents: impl Into<String>) -> Self {
        self.files.push(AssetFile {
            path: path.into(),
            contents: contents.into(),
        });
        self
    }
}

impl AssetSource for MemoryAssets {
    fn label(&self) -> String {
        format!("memory:{}", self.label)
    }

    fn files(&self) -> Result<Vec<AssetFile>> {
        Ok(sort_files(self.files.clone()))
    }
}
