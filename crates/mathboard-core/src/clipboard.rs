//! Board clipboard: copies keep layout relative to the copied set, never
//! absolute positions.

use crate::canvas::Canvas;
use crate::groups::{Group, GroupContent, GroupId, GroupKind};
use kurbo::{Point, Vec2};

/// One copied group.
#[derive(Debug, Clone, PartialEq)]
pub struct ClipboardEntry {
    pub content: GroupContent,
    /// Offset from the minimum corner of the copied set.
    pub offset: Vec2,
}

impl ClipboardEntry {
    pub fn kind(&self) -> GroupKind {
        self.content.kind()
    }
}

/// Holds the last copied snapshot.
#[derive(Debug, Clone, Default)]
pub struct ClipboardController {
    entries: Vec<ClipboardEntry>,
}

impl ClipboardController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[ClipboardEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Snapshot the selected groups, replacing any previous snapshot.
    ///
    /// Copying an empty selection clears the clipboard. Returns the number
    /// of copied groups.
    pub fn copy(&mut self, canvas: &Canvas) -> usize {
        let selected = canvas.all_selected();
        self.entries = snapshot(&selected);
        log::debug!("copied {} groups", self.entries.len());
        self.entries.len()
    }

    /// Copy, then remove the selected groups.
    pub fn cut(&mut self, canvas: &mut Canvas) -> usize {
        let count = self.copy(canvas);
        if count > 0 {
            canvas.delete_selected();
        }
        count
    }

    /// Create copies at `anchor + offset` and select them.
    ///
    /// The snapshot is kept so pasting can repeat. Empty clipboard: no-op.
    pub fn paste(&self, canvas: &mut Canvas, anchor: Point) -> Vec<GroupId> {
        if self.entries.is_empty() {
            return Vec::new();
        }
        let groups = self
            .entries
            .iter()
            .map(|entry| Group::new(anchor + entry.offset, entry.content.clone()))
            .collect();
        let ids = canvas.insert_groups(groups);
        canvas.selection.set(ids.iter().copied());
        log::debug!("pasted {} groups", ids.len());
        ids
    }

    /// Paste at a screen point, converted through the camera.
    pub fn paste_at_screen(&self, canvas: &mut Canvas, screen: Point) -> Vec<GroupId> {
        let anchor = canvas.camera.screen_to_canvas(screen);
        self.paste(canvas, anchor)
    }
}

fn snapshot(groups: &[&Group]) -> Vec<ClipboardEntry> {
    let Some(min) = groups
        .iter()
        .map(|g| g.position)
        .reduce(|a, b| Point::new(a.x.min(b.x), a.y.min(b.y)))
    else {
        return Vec::new();
    };
    groups
        .iter()
        .map(|g| ClipboardEntry {
            content: g.content.clone(),
            offset: g.position - min,
        })
        .collect()
}
