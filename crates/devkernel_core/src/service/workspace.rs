//! Workspace file/folder manager.
//!
//! # Responsibility
//! - Own every `File` and `Folder` and the ordered list of open files.
//! - Provide create, rename, delete, save, open and close operations.
//!
//! # Invariants
//! - Every operation validates before mutating; a failed call changes nothing.
//! - Parent folder must exist for every created or renamed entry.
//! - A path is held by at most one file or folder.
//! - The root folder `/` always exists and cannot be deleted.

use crate::error::{KernelError, KernelResult};
use crate::event::{EventBus, KernelEvent};
use crate::model::file::{is_descendant, normalize_path, parent_path, File, Folder, ROOT_PATH};
use log::debug;
use std::collections::BTreeMap;

/// One content replacement applied by [`WorkspaceManager::apply_edits`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEdit {
    pub path: String,
    pub content: String,
}

/// Owner of workspace files and folders.
pub struct WorkspaceManager {
    files: BTreeMap<String, File>,
    folders: BTreeMap<String, Folder>,
    open_files: Vec<String>,
    active_file: Option<String>,
    bus: EventBus,
}

impl WorkspaceManager {
    pub fn new(bus: EventBus) -> Self {
        let mut root = Folder::new(ROOT_PATH.to_string());
        root.expanded = true;
        let mut folders = BTreeMap::new();
        folders.insert(ROOT_PATH.to_string(), root);
        Self {
            files: BTreeMap::new(),
            folders,
            open_files: Vec::new(),
            active_file: None,
            bus,
        }
    }

    /// Creates an empty folder under an existing parent.
    pub fn create_folder(&mut self, path: &str) -> KernelResult<Folder> {
        let path = normalize_path(path)?;
        self.ensure_free(&path)?;
        let parent = self.ensure_parent_folder(&path)?;

        let folder = Folder::new(path.clone());
        self.attach_child(&parent, &path);
        self.folders.insert(path.clone(), folder.clone());
        debug!("event=folder_create module=workspace status=ok path={}", path);
        self.bus.emit(KernelEvent::FolderCreated { path });
        Ok(folder)
    }

    /// Creates a file with initial content under an existing parent folder.
    pub fn create_file(&mut self, path: &str, content: impl Into<String>) -> KernelResult<File> {
        let path = normalize_path(path)?;
        self.ensure_free(&path)?;
        let parent = self.ensure_parent_folder(&path)?;

        let file = File::new(path.clone(), content.into());
        self.attach_child(&parent, &path);
        self.files.insert(path.clone(), file.clone());
        debug!(
            "event=file_create module=workspace status=ok path={} language={}",
            path, file.language
        );
        self.bus.emit(KernelEvent::FileCreated {
            path,
            language: file.language.to_string(),
        });
        Ok(file)
    }

    pub fn delete_file(&mut self, path: &str) -> KernelResult<()> {
        let path = normalize_path(path)?;
        if !self.files.contains_key(&path) {
            return Err(KernelError::validation(format!("file not found: {path}")));
        }

        self.files.remove(&path);
        self.detach_child(parent_path(&path), &path);
        self.forget_open(&path);
        debug!("event=file_delete module=workspace status=ok path={}", path);
        self.bus.emit(KernelEvent::FileDeleted { path });
        Ok(())
    }

    /// Deletes a folder and its whole subtree. Returns removed file paths.
    pub fn delete_folder(&mut self, path: &str) -> KernelResult<Vec<String>> {
        let path = normalize_path(path)?;
        if path == ROOT_PATH {
            return Err(KernelError::validation("workspace root cannot be deleted"));
        }
        if !self.folders.contains_key(&path) {
            return Err(KernelError::validation(format!("folder not found: {path}")));
        }

        let removed_files: Vec<String> = self
            .files
            .keys()
            .filter(|candidate| is_descendant(candidate, &path))
            .cloned()
            .collect();
        self.files.retain(|candidate, _| !is_descendant(candidate, &path));
        self.folders
            .retain(|candidate, _| candidate != &path && !is_descendant(candidate, &path));
        self.detach_child(parent_path(&path), &path);
        for file in &removed_files {
            self.forget_open(file);
        }

        debug!(
            "event=folder_delete module=workspace status=ok path={} removed_files={}",
            path,
            removed_files.len()
        );
        self.bus.emit(KernelEvent::FolderDeleted {
            path,
            removed_files: removed_files.clone(),
        });
        Ok(removed_files)
    }

    /// Moves a file to a new path, keeping content, size and dirty state.
    pub fn rename_file(&mut self, old_path: &str, new_path: &str) -> KernelResult<File> {
        let old_path = normalize_path(old_path)?;
        let new_path = normalize_path(new_path)?;
        if !self.files.contains_key(&old_path) {
            return Err(KernelError::validation(format!("file not found: {old_path}")));
        }
        if old_path == new_path {
            return Err(KernelError::conflict(format!(
                "rename target equals source: {new_path}"
            )));
        }
        self.ensure_free(&new_path)?;
        let new_parent = self.ensure_parent_folder(&new_path)?;
        let old_parent = parent_path(&old_path).to_string();

        let Some(mut file) = self.files.remove(&old_path) else {
            return Err(KernelError::validation(format!("file not found: {old_path}")));
        };
        file.move_to(new_path.clone());
        self.files.insert(new_path.clone(), file.clone());

        if old_parent == new_parent {
            if let Some(folder) = self.folders.get_mut(&old_parent) {
                for child in folder.children.iter_mut().filter(|child| **child == old_path) {
                    *child = new_path.clone();
                }
            }
        } else {
            self.detach_child(&old_parent, &old_path);
            self.attach_child(&new_parent, &new_path);
        }
        for open in self.open_files.iter_mut().filter(|open| **open == old_path) {
            *open = new_path.clone();
        }
        if self.active_file.as_deref() == Some(old_path.as_str()) {
            self.active_file = Some(new_path.clone());
        }

        debug!(
            "event=file_rename module=workspace status=ok old_path={} new_path={}",
            old_path, new_path
        );
        self.bus.emit(KernelEvent::FileRenamed { old_path, new_path });
        Ok(file)
    }

    /// Persists new content and clears the dirty flag.
    pub fn save_file(&mut self, path: &str, content: impl Into<String>) -> KernelResult<File> {
        let path = normalize_path(path)?;
        let file = self
            .files
            .get_mut(&path)
            .ok_or_else(|| KernelError::validation(format!("file not found: {path}")))?;
        file.set_content(content.into(), false);
        let saved = file.clone();

        debug!(
            "event=file_save module=workspace status=ok path={} size={}",
            path, saved.size
        );
        self.bus.emit(KernelEvent::FileSaved {
            path,
            size: saved.size,
        });
        Ok(saved)
    }

    /// Changes content without saving; marks the file dirty.
    pub fn update_content(&mut self, path: &str, content: impl Into<String>) -> KernelResult<()> {
        self.apply_edits(vec![FileEdit {
            path: path.to_string(),
            content: content.into(),
        }])
    }

    /// Applies several content changes as one step; all paths must exist.
    pub fn apply_edits(&mut self, edits: Vec<FileEdit>) -> KernelResult<()> {
        let mut normalized = Vec::with_capacity(edits.len());
        for edit in edits {
            let path = normalize_path(&edit.path)?;
            if !self.files.contains_key(&path) {
                return Err(KernelError::validation(format!("file not found: {path}")));
            }
            normalized.push((path, edit.content));
        }

        for (path, content) in normalized {
            if let Some(file) = self.files.get_mut(&path) {
                file.set_content(content, true);
            }
            self.bus.emit(KernelEvent::FileModified { path });
        }
        Ok(())
    }

    /// Adds the file to the open list (if absent) and makes it active.
    pub fn open_file(&mut self, path: &str) -> KernelResult<File> {
        let path = normalize_path(path)?;
        let file = self
            .files
            .get(&path)
            .cloned()
            .ok_or_else(|| KernelError::validation(format!("file not found: {path}")))?;

        if !self.open_files.contains(&path) {
            self.open_files.push(path.clone());
        }
        self.active_file = Some(path.clone());
        self.bus.emit(KernelEvent::FileOpened { path });
        Ok(file)
    }

    pub fn close_file(&mut self, path: &str) -> KernelResult<()> {
        let path = normalize_path(path)?;
        if !self.open_files.contains(&path) {
            return Err(KernelError::validation(format!("file is not open: {path}")));
        }

        self.forget_open(&path);
        self.bus.emit(KernelEvent::FileClosed { path });
        Ok(())
    }

    /// Flips a folder's expanded flag; returns the new value.
    pub fn toggle_folder(&mut self, path: &str) -> KernelResult<bool> {
        let path = normalize_path(path)?;
        let folder = self
            .folders
            .get_mut(&path)
            .ok_or_else(|| KernelError::validation(format!("folder not found: {path}")))?;
        folder.expanded = !folder.expanded;
        let expanded = folder.expanded;
        self.bus.emit(KernelEvent::FolderToggled { path, expanded });
        Ok(expanded)
    }

    pub fn file(&self, path: &str) -> Option<&File> {
        let path = normalize_path(path).ok()?;
        self.files.get(&path)
    }

    pub fn folder(&self, path: &str) -> Option<&Folder> {
        let path = normalize_path(path).ok()?;
        self.folders.get(&path)
    }

    /// Files in path order.
    pub fn files(&self) -> impl Iterator<Item = &File> {
        self.files.values()
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    pub fn open_files(&self) -> &[String] {
        &self.open_files
    }

    pub fn active_file(&self) -> Option<&str> {
        self.active_file.as_deref()
    }

    /// Indented tree rendering following each folder's child order.
    pub fn tree_listing(&self) -> Vec<String> {
        let mut lines = Vec::new();
        self.walk_listing(ROOT_PATH, 0, &mut lines);
        lines
    }

    /// Drops everything except an empty root, without emitting events.
    pub(crate) fn clear(&mut self) {
        *self = Self::new(self.bus.clone());
    }

    fn walk_listing(&self, folder_path: &str, depth: usize, lines: &mut Vec<String>) {
        let Some(folder) = self.folders.get(folder_path) else {
            return;
        };
        for child in &folder.children {
            let indent = "  ".repeat(depth);
            if self.folders.contains_key(child) {
                lines.push(format!("{indent}{}/", crate::model::file::file_name(child)));
                self.walk_listing(child, depth + 1, lines);
            } else if let Some(file) = self.files.get(child) {
                let marker = if file.dirty { " *" } else { "" };
                lines.push(format!("{indent}{}{marker}", file.name));
            }
        }
    }

    fn ensure_free(&self, path: &str) -> KernelResult<()> {
        if self.files.contains_key(path) || self.folders.contains_key(path) {
            return Err(KernelError::conflict(format!("path already exists: {path}")));
        }
        Ok(())
    }

    fn ensure_parent_folder(&self, path: &str) -> KernelResult<String> {
        let parent = parent_path(path);
        if !self.folders.contains_key(parent) {
            return Err(KernelError::validation(format!(
                "parent folder not found: {parent}"
            )));
        }
        Ok(parent.to_string())
    }

    fn attach_child(&mut self, parent: &str, child: &str) {
        if let Some(folder) = self.folders.get_mut(parent) {
            folder.children.push(child.to_string());
        }
    }

    fn detach_child(&mut self, parent: &str, child: &str) {
        if let Some(folder) = self.folders.get_mut(parent) {
            folder.children.retain(|existing| existing != child);
        }
    }

    fn forget_open(&mut self, path: &str) {
        self.open_files.retain(|open| open != path);
        if self.active_file.as_deref() == Some(path) {
            self.active_file = self.open_files.last().cloned();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{FileEdit, WorkspaceManager};
    use crate::error::KernelError;
    use crate::event::EventBus;

    fn workspace() -> WorkspaceManager {
        WorkspaceManager::new(EventBus::new())
    }

    #[test]
    fn create_requires_existing_parent_and_free_path() {
        let mut ws = workspace();
        let err = ws
            .create_file("/src/a.js", "x")
            .expect_err("missing parent must fail");
        assert!(matches!(err, KernelError::Validation(_)));

        ws.create_folder("/src").expect("folder");
        ws.create_file("/src/a.js", "x").expect("file");
        let err = ws
            .create_file("/src/a.js", "y")
            .expect_err("duplicate must fail");
        assert!(matches!(err, KernelError::Conflict(_)));
        assert_eq!(ws.file("/src/a.js").expect("kept").content, "x");
    }

    #[test]
    fn folder_children_keep_insertion_order() {
        let mut ws = workspace();
        ws.create_folder("/src").expect("src");
        ws.create_file("/src/b.rs", "").expect("b");
        ws.create_file("/src/a.rs", "").expect("a");
        let folder = ws.folder("/src").expect("folder");
        assert_eq!(folder.children, vec!["/src/b.rs", "/src/a.rs"]);
    }

    #[test]
    fn delete_folder_removes_subtree() {
        let mut ws = workspace();
        ws.create_folder("/src").expect("src");
        ws.create_folder("/src/util").expect("util");
        ws.create_file("/src/util/x.rs", "").expect("x");
        ws.create_file("/top.rs", "").expect("top");
        ws.open_file("/src/util/x.rs").expect("open");

        let removed = ws.delete_folder("/src").expect("delete");
        assert_eq!(removed, vec!["/src/util/x.rs".to_string()]);
        assert!(ws.folder("/src/util").is_none());
        assert!(ws.file("/top.rs").is_some());
        assert!(ws.open_files().is_empty());
        assert!(ws.delete_folder("/").is_err());
    }

    #[test]
    fn rename_moves_between_folders_and_keeps_state() {
        let mut ws = workspace();
        ws.create_folder("/a").expect("a");
        ws.create_folder("/b").expect("b");
        ws.create_file("/a/x.txt", "hello").expect("x");
        ws.update_content("/a/x.txt", "hello!").expect("edit");
        ws.open_file("/a/x.txt").expect("open");

        let renamed = ws.rename_file("/a/x.txt", "/b/y.js").expect("rename");
        assert_eq!(renamed.content, "hello!");
        assert!(renamed.dirty);
        assert_eq!(renamed.language, "javascript");
        assert!(ws.folder("/a").expect("a").children.is_empty());
        assert_eq!(ws.folder("/b").expect("b").children, vec!["/b/y.js"]);
        assert_eq!(ws.active_file(), Some("/b/y.js"));
    }

    #[test]
    fn rename_to_occupied_path_changes_nothing() {
        let mut ws = workspace();
        ws.create_file("/x", "1").expect("x");
        ws.create_file("/y", "2").expect("y");
        let err = ws.rename_file("/x", "/y").expect_err("occupied");
        assert!(matches!(err, KernelError::Conflict(_)));
        assert_eq!(ws.file("/x").expect("x").content, "1");
        assert_eq!(ws.file("/y").expect("y").content, "2");
    }

    #[test]
    fn apply_edits_is_all_or_nothing() {
        let mut ws = workspace();
        ws.create_file("/x", "1").expect("x");
        let err = ws.apply_edits(vec![
            FileEdit {
                path: "/x".to_string(),
                content: "changed".to_string(),
            },
            FileEdit {
                path: "/missing".to_string(),
                content: "?".to_string(),
            },
        ]);
        assert!(err.is_err());
        let file = ws.file("/x").expect("x");
        assert_eq!(file.content, "1");
        assert!(!file.dirty);
    }

    #[test]
    fn close_moves_active_to_last_open() {
        let mut ws = workspace();
        ws.create_file("/a", "").expect("a");
        ws.create_file("/b", "").expect("b");
        ws.open_file("/a").expect("open a");
        ws.open_file("/b").expect("open b");
        ws.close_file("/b").expect("close b");
        assert_eq!(ws.active_file(), Some("/a"));
        assert!(ws.close_file("/b").is_err());
    }

    #[test]
    fn tree_listing_marks_dirty_files() {
        let mut ws = workspace();
        ws.create_folder("/src").expect("src");
        ws.create_file("/src/a.js", "").expect("a");
        ws.update_content("/src/a.js", "x").expect("edit");
        assert_eq!(ws.tree_listing(), vec!["src/".to_string(), "  a.js *".to_string()]);
    }
}
