//! Workspace file and folder entities.
//!
//! # Responsibility
//! - Define `File` and `Folder` records owned by the workspace manager.
//! - Provide path normalization shared by every path-keyed operation.
//!
//! # Invariants
//! - Paths are absolute, `/`-separated, without trailing `/` or empty,
//!   `.` or `..` segments. The root folder is `/`.
//! - `File::size` always equals the UTF-8 byte length of `content`.
//! - `saved_content` is the content as of creation or the last save;
//!   it equals `content` whenever `dirty` is false.

use crate::error::{KernelError, KernelResult};
use crate::model::language::language_for_path;
use serde::Serialize;
use std::time::{SystemTime, UNIX_EPOCH};

/// Path of the always-present workspace root folder.
pub const ROOT_PATH: &str = "/";
/// Encoding recorded for every in-memory file.
pub const DEFAULT_ENCODING: &str = "utf-8";

/// One workspace file. Sole source of truth for file content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct File {
    pub path: String,
    pub name: String,
    pub content: String,
    pub language: &'static str,
    pub size: usize,
    /// Unix epoch milliseconds of the last content change.
    pub modified_at_ms: i64,
    /// Content changed since the last save.
    pub dirty: bool,
    pub encoding: &'static str,
    #[serde(skip)]
    saved_content: String,
}

impl File {
    pub(crate) fn new(path: String, content: String) -> Self {
        let name = file_name(&path).to_string();
        let language = language_for_path(&path);
        let saved_content = content.clone();
        Self {
            size: content.len(),
            path,
            name,
            content,
            language,
            modified_at_ms: now_epoch_ms(),
            dirty: false,
            encoding: DEFAULT_ENCODING,
            saved_content,
        }
    }

    /// Content as of creation or the last save.
    pub fn saved_content(&self) -> &str {
        &self.saved_content
    }

    pub(crate) fn set_content(&mut self, content: String, dirty: bool) {
        if !dirty {
            self.saved_content = content.clone();
        }
        self.size = content.len();
        self.content = content;
        self.dirty = dirty;
        self.modified_at_ms = now_epoch_ms();
    }

    pub(crate) fn move_to(&mut self, new_path: String) {
        self.name = file_name(&new_path).to_string();
        self.language = language_for_path(&new_path);
        self.path = new_path;
    }
}

/// One workspace folder with ordered child paths.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Folder {
    pub path: String,
    pub name: String,
    /// Child file and folder paths in insertion order.
    pub children: Vec<String>,
    pub expanded: bool,
}

impl Folder {
    pub(crate) fn new(path: String) -> Self {
        let name = if path == ROOT_PATH {
            ROOT_PATH.to_string()
        } else {
            file_name(&path).to_string()
        };
        Self {
            path,
            name,
            children: Vec::new(),
            expanded: false,
        }
    }
}

/// Normalizes a user-supplied path.
///
/// Accepts a missing leading `/` and trailing `/`; rejects empty input and
/// `.`/`..`/empty segments.
pub fn normalize_path(raw: &str) -> KernelResult<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(KernelError::validation("path must not be empty"));
    }
    if trimmed == ROOT_PATH {
        return Ok(ROOT_PATH.to_string());
    }

    let inner = trimmed.trim_start_matches('/').trim_end_matches('/');
    let mut normalized = String::with_capacity(inner.len() + 1);
    for segment in inner.split('/') {
        if segment.is_empty() || segment == "." || segment == ".." {
            return Err(KernelError::validation(format!(
                "path contains an invalid segment: {trimmed}"
            )));
        }
        normalized.push('/');
        normalized.push_str(segment);
    }
    Ok(normalized)
}

/// Returns the parent folder path of a normalized path.
pub fn parent_path(path: &str) -> &str {
    match path.rfind('/') {
        Some(0) | None => ROOT_PATH,
        Some(index) => &path[..index],
    }
}

/// Returns the last segment of a normalized path.
pub fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Returns whether `path` lies strictly inside folder `ancestor`.
pub fn is_descendant(path: &str, ancestor: &str) -> bool {
    if ancestor == ROOT_PATH {
        return path != ROOT_PATH;
    }
    path.len() > ancestor.len()
        && path.starts_with(ancestor)
        && path.as_bytes()[ancestor.len()] == b'/'
}

pub(crate) fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as i64)
        .unwrap_or_default()
}
