//! Editor instance manager.
//!
//! # Responsibility
//! - Own open editor instances, their layout groups and the active instance.
//! - Keep instances consistent with workspace changes routed from the bus.
//!
//! # Invariants
//! - Every instance is bound to exactly one file path.
//! - Two instances of the same file keep independent cursor/selection state.
//! - `dirty` is true exactly when the snapshot differs from the last saved content.
//! - Every instance id appears in exactly one layout group.

use crate::error::{KernelError, KernelResult};
use crate::event::{EventBus, KernelEvent};
use crate::model::file::File;
use crate::model::ids::EditorId;
use crate::service::search::{self, FileReplacement, SearchHit, SearchOptions};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// 1-based cursor position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CursorPosition {
    pub line: u32,
    pub column: u32,
}

impl Default for CursorPosition {
    fn default() -> Self {
        Self { line: 1, column: 1 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub start: CursorPosition,
    pub end: CursorPosition,
}

/// Inline annotation rendered by the host (diagnostics, highlights).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decoration {
    pub line: u32,
    pub kind: String,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitDirection {
    Horizontal,
    Vertical,
}

/// One open, stateful view onto a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EditorInstance {
    pub id: EditorId,
    pub path: String,
    pub language: &'static str,
    pub content: String,
    pub cursor: CursorPosition,
    pub selection: Option<Selection>,
    pub dirty: bool,
    /// Breakpoint gutter markers (1-based lines).
    pub breakpoints: BTreeSet<u32>,
    pub decorations: Vec<Decoration>,
    #[serde(skip)]
    saved_content: String,
}

impl EditorInstance {
    fn from_file(file: &File) -> Self {
        Self {
            id: EditorId::new(),
            path: file.path.clone(),
            language: file.language,
            content: file.content.clone(),
            cursor: CursorPosition::default(),
            selection: None,
            dirty: file.content != file.saved_content(),
            breakpoints: BTreeSet::new(),
            decorations: Vec::new(),
            saved_content: file.saved_content().to_string(),
        }
    }

    fn line_count(&self) -> u32 {
        (self.content.split('\n').count() as u32).max(1)
    }

    fn line_len(&self, line: u32) -> Option<u32> {
        self.content
            .split('\n')
            .nth(line.checked_sub(1)? as usize)
            .map(|text| text.chars().count() as u32)
    }

    fn contains(&self, position: CursorPosition) -> bool {
        match self.line_len(position.line) {
            Some(len) => position.column >= 1 && position.column <= len + 1,
            None => false,
        }
    }

    fn recompute_dirty(&mut self) {
        self.dirty = self.content != self.saved_content;
    }
}

/// Owner of editor instances and layout groups.
pub struct EditorManager {
    editors: BTreeMap<EditorId, EditorInstance>,
    groups: Vec<Vec<EditorId>>,
    active: Option<EditorId>,
    last_search: Vec<SearchHit>,
    bus: EventBus,
}

impl EditorManager {
    pub fn new(bus: EventBus) -> Self {
        Self {
            editors: BTreeMap::new(),
            groups: Vec::new(),
            active: None,
            last_search: Vec::new(),
            bus,
        }
    }

    /// Opens a new instance seeded from the file's current content and activates it.
    pub fn create_editor(&mut self, file: &File) -> EditorId {
        let editor = EditorInstance::from_file(file);
        let id = editor.id;
        let group = self.active_group_index().unwrap_or(0);
        if self.groups.is_empty() {
            self.groups.push(Vec::new());
        }
        self.groups[group].push(id);
        self.editors.insert(id, editor);
        self.active = Some(id);

        debug!(
            "event=editor_create module=editor status=ok editor_id={} path={}",
            id, file.path
        );
        self.bus.emit(KernelEvent::EditorCreated {
            editor_id: id,
            path: file.path.clone(),
        });
        id
    }

    pub fn close_editor(&mut self, id: EditorId) -> KernelResult<()> {
        let editor = self.editors.remove(&id).ok_or_else(|| unknown_editor(id))?;
        for group in &mut self.groups {
            group.retain(|existing| *existing != id);
        }
        self.groups.retain(|group| !group.is_empty());
        if self.active == Some(id) {
            self.active = self.groups.iter().flatten().last().copied();
        }

        self.bus.emit(KernelEvent::EditorClosed {
            editor_id: id,
            path: editor.path,
        });
        Ok(())
    }

    pub fn switch_editor(&mut self, id: EditorId) -> KernelResult<()> {
        if !self.editors.contains_key(&id) {
            return Err(unknown_editor(id));
        }
        self.active = Some(id);
        self.bus.emit(KernelEvent::EditorSwitched { editor_id: id });
        Ok(())
    }

    /// Replaces the instance snapshot; the file itself is untouched until saved.
    pub fn update_content(&mut self, id: EditorId, content: impl Into<String>) -> KernelResult<()> {
        let editor = self.editor_mut(id)?;
        editor.content = content.into();
        editor.recompute_dirty();
        let line_count = editor.line_count();
        if editor.cursor.line > line_count {
            editor.cursor = CursorPosition {
                line: line_count,
                column: 1,
            };
        }
        editor.selection = None;
        Ok(())
    }

    pub fn set_cursor(&mut self, id: EditorId, position: CursorPosition) -> KernelResult<()> {
        let editor = self.editor_mut(id)?;
        if !editor.contains(position) {
            return Err(KernelError::validation(format!(
                "cursor {}:{} is outside {}",
                position.line, position.column, editor.path
            )));
        }
        editor.cursor = position;
        Ok(())
    }

    pub fn set_selection(&mut self, id: EditorId, selection: Option<Selection>) -> KernelResult<()> {
        let editor = self.editor_mut(id)?;
        if let Some(selection) = selection {
            if !editor.contains(selection.start) || !editor.contains(selection.end) {
                return Err(KernelError::validation(format!(
                    "selection is outside {}",
                    editor.path
                )));
            }
        }
        editor.selection = selection;
        Ok(())
    }

    pub fn add_decoration(&mut self, id: EditorId, decoration: Decoration) -> KernelResult<()> {
        self.editor_mut(id)?.decorations.push(decoration);
        Ok(())
    }

    pub fn clear_decorations(&mut self, id: EditorId) -> KernelResult<()> {
        self.editor_mut(id)?.decorations.clear();
        Ok(())
    }

    /// Opens an independent instance of the same file in a new group after the source's group.
    pub fn split_editor(&mut self, id: EditorId, direction: SplitDirection) -> KernelResult<EditorId> {
        let source = self.editors.get(&id).ok_or_else(|| unknown_editor(id))?;
        let mut copy = source.clone();
        copy.id = EditorId::new();
        copy.cursor = CursorPosition::default();
        copy.selection = None;
        let new_id = copy.id;

        let source_group = self
            .groups
            .iter()
            .position(|group| group.contains(&id))
            .unwrap_or(0);
        let insert_at = (source_group + 1).min(self.groups.len());
        self.groups.insert(insert_at, vec![new_id]);
        self.editors.insert(new_id, copy);
        self.active = Some(new_id);

        self.bus.emit(KernelEvent::EditorSplit {
            source_id: id,
            editor_id: new_id,
            direction,
        });
        Ok(new_id)
    }

    /// Folds every group into the first, keeping instance order.
    pub fn merge_editors(&mut self) -> KernelResult<usize> {
        if self.groups.len() < 2 {
            return Err(KernelError::state("mergeEditors", "only one editor group"));
        }
        let merged_groups = self.groups.len() - 1;
        let merged: Vec<EditorId> = self.groups.drain(..).flatten().collect();
        self.groups.push(merged);

        self.bus.emit(KernelEvent::EditorMerged { merged_groups });
        Ok(merged_groups)
    }

    pub fn find_in_files<'a>(
        &self,
        files: impl IntoIterator<Item = &'a File>,
        query: &str,
        options: &SearchOptions,
    ) -> KernelResult<Vec<SearchHit>> {
        search::find_in_files(files, query, options)
    }

    /// Computes replacements; the workspace applies them (dirty, not saved).
    pub fn replace_in_files<'a>(
        &self,
        files: impl IntoIterator<Item = &'a File>,
        query: &str,
        replacement: &str,
        options: &SearchOptions,
    ) -> KernelResult<Vec<FileReplacement>> {
        search::replace_in_files(files, query, replacement, options)
    }

    /// Hits of the most recent palette search.
    pub fn last_search(&self) -> &[SearchHit] {
        &self.last_search
    }

    pub(crate) fn remember_search(&mut self, hits: Vec<SearchHit>) {
        self.last_search = hits;
    }

    pub fn get(&self, id: EditorId) -> Option<&EditorInstance> {
        self.editors.get(&id)
    }

    pub fn active_id(&self) -> Option<EditorId> {
        self.active
    }

    pub fn active(&self) -> Option<&EditorInstance> {
        self.active.and_then(|id| self.editors.get(&id))
    }

    pub fn editors_for_path(&self, path: &str) -> Vec<EditorId> {
        self.editors
            .values()
            .filter(|editor| editor.path == path)
            .map(|editor| editor.id)
            .collect()
    }

    pub fn groups(&self) -> &[Vec<EditorId>] {
        &self.groups
    }

    pub fn len(&self) -> usize {
        self.editors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.editors.is_empty()
    }

    /// Rebinds instances after a rename.
    pub(crate) fn retarget(&mut self, old_path: &str, new_path: &str, language: &'static str) {
        for editor in self.editors.values_mut().filter(|e| e.path == old_path) {
            editor.path = new_path.to_string();
            editor.language = language;
        }
    }

    /// Closes every instance bound to `path`.
    pub(crate) fn close_for_path(&mut self, path: &str) {
        for id in self.editors_for_path(path) {
            let _ = self.close_editor(id);
        }
    }

    /// Adopts freshly saved content as the new baseline.
    pub(crate) fn file_saved(&mut self, file: &File) {
        for editor in self.editors.values_mut().filter(|e| e.path == file.path) {
            editor.content = file.content.clone();
            editor.saved_content = file.content.clone();
            editor.dirty = false;
        }
    }

    /// Adopts content changed outside the editor (e.g. replace-in-files).
    pub(crate) fn file_modified(&mut self, file: &File) {
        for editor in self.editors.values_mut().filter(|e| e.path == file.path) {
            editor.content = file.content.clone();
            editor.recompute_dirty();
        }
    }

    pub(crate) fn set_breakpoint_marker(&mut self, path: &str, line: u32, present: bool) {
        for editor in self.editors.values_mut().filter(|e| e.path == path) {
            if present {
                editor.breakpoints.insert(line);
            } else {
                editor.breakpoints.remove(&line);
            }
        }
    }

    /// Closes everything without emitting events.
    pub(crate) fn clear(&mut self) {
        self.editors.clear();
        self.groups.clear();
        self.active = None;
        self.last_search.clear();
    }

    fn editor_mut(&mut self, id: EditorId) -> KernelResult<&mut EditorInstance> {
        self.editors.get_mut(&id).ok_or_else(|| unknown_editor(id))
    }

    fn active_group_index(&self) -> Option<usize> {
        let active = self.active?;
        self.groups.iter().position(|group| group.contains(&active))
    }
}

fn unknown_editor(id: EditorId) -> KernelError {
    KernelError::validation(format!("editor not found: {id}"))
}

#[cfg(test)]
mod tests {
    use super::{CursorPosition, EditorManager, Selection, SplitDirection};
    use crate::event::EventBus;
    use crate::model::file::File;

    fn file(path: &str, content: &str) -> File {
        File::new(path.to_string(), content.to_string())
    }

    #[test]
    fn instances_of_same_file_have_independent_cursors() {
        let mut editors = EditorManager::new(EventBus::new());
        let source = file("/a.txt", "one\ntwo");
        let first = editors.create_editor(&source);
        let second = editors.create_editor(&source);

        editors
            .set_cursor(first, CursorPosition { line: 2, column: 3 })
            .expect("cursor");
        assert_eq!(
            editors.get(second).expect("second").cursor,
            CursorPosition::default()
        );
        assert_eq!(editors.active_id(), Some(second));
    }

    #[test]
    fn dirty_tracks_difference_from_saved_content() {
        let mut editors = EditorManager::new(EventBus::new());
        let id = editors.create_editor(&file("/a.txt", "abc"));
        editors.update_content(id, "abcd").expect("edit");
        assert!(editors.get(id).expect("editor").dirty);
        editors.update_content(id, "abc").expect("revert");
        assert!(!editors.get(id).expect("editor").dirty);

        let saved = file("/a.txt", "xyz");
        editors.file_saved(&saved);
        let editor = editors.get(id).expect("editor");
        assert_eq!(editor.content, "xyz");
        assert!(!editor.dirty);
    }

    #[test]
    fn editor_on_modified_file_compares_against_saved_content() {
        let mut editors = EditorManager::new(EventBus::new());
        let mut source = file("/a.txt", "foo");
        source.set_content("bar".to_string(), true);
        let id = editors.create_editor(&source);
        assert!(editors.get(id).expect("editor").dirty);

        editors.update_content(id, "").expect("clear");
        assert!(editors.get(id).expect("editor").dirty);

        editors.update_content(id, "foo").expect("revert to saved");
        assert!(!editors.get(id).expect("editor").dirty);
    }

    #[test]
    fn cursor_and_selection_are_bounds_checked() {
        let mut editors = EditorManager::new(EventBus::new());
        let id = editors.create_editor(&file("/a.txt", "ab\nc"));
        assert!(editors
            .set_cursor(id, CursorPosition { line: 1, column: 3 })
            .is_ok());
        assert!(editors
            .set_cursor(id, CursorPosition { line: 3, column: 1 })
            .is_err());
        assert!(editors
            .set_selection(
                id,
                Some(Selection {
                    start: CursorPosition { line: 1, column: 1 },
                    end: CursorPosition { line: 2, column: 5 },
                })
            )
            .is_err());
        assert_eq!(
            editors.get(id).expect("editor").cursor,
            CursorPosition { line: 1, column: 3 }
        );
    }

    #[test]
    fn split_and_merge_only_change_layout() {
        let mut editors = EditorManager::new(EventBus::new());
        let first = editors.create_editor(&file("/a.txt", "x"));
        let split = editors
            .split_editor(first, SplitDirection::Vertical)
            .expect("split");
        assert_eq!(editors.groups().len(), 2);
        assert_eq!(editors.get(split).expect("split").path, "/a.txt");

        assert_eq!(editors.merge_editors().expect("merge"), 1);
        assert_eq!(editors.groups(), &[vec![first, split]]);
        assert_eq!(editors.len(), 2);
        assert!(editors.merge_editors().is_err());
    }

    #[test]
    fn closing_last_in_group_drops_group_and_moves_active() {
        let mut editors = EditorManager::new(EventBus::new());
        let first = editors.create_editor(&file("/a.txt", "x"));
        let split = editors
            .split_editor(first, SplitDirection::Horizontal)
            .expect("split");
        editors.close_editor(split).expect("close");
        assert_eq!(editors.groups().len(), 1);
        assert_eq!(editors.active_id(), Some(first));
        assert!(editors.close_editor(split).is_err());
    }

    #[test]
    fn retarget_and_breakpoint_markers() {
        let mut editors = EditorManager::new(EventBus::new());
        let id = editors.create_editor(&file("/a.txt", "x"));
        editors.retarget("/a.txt", "/b.rs", "rust");
        editors.set_breakpoint_marker("/b.rs", 1, true);
        let editor = editors.get(id).expect("editor");
        assert_eq!(editor.path, "/b.rs");
        assert_eq!(editor.language, "rust");
        assert!(editor.breakpoints.contains(&1));
    }
}
