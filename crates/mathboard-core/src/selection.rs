//! Selection state: click semantics and rubber-band box selection.

use crate::groups::GroupId;
use kurbo::{Point, Rect};
use std::collections::HashSet;

/// Strict overlap test between two rectangles. Touching edges do not overlap.
pub fn rects_overlap(a: Rect, b: Rect) -> bool {
    a.x0 < b.x1 && a.x1 > b.x0 && a.y0 < b.y1 && a.y1 > b.y0
}

/// What a click landed on, from the selection's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickTarget {
    /// Inside the field currently being edited.
    EditingField,
    Group(GroupId),
    /// Empty canvas.
    Canvas,
}

/// An in-progress box selection, in screen coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoxSelect {
    pub start: Point,
    pub current: Point,
}

impl BoxSelect {
    pub fn rect(&self) -> Rect {
        Rect::from_points(self.start, self.current)
    }
}

/// Owns the set of selected groups.
#[derive(Debug, Clone, Default)]
pub struct SelectionController {
    selected: HashSet<GroupId>,
    box_select: Option<BoxSelect>,
    /// Set when a box selection ends so the click that follows is ignored.
    suppress_next_click: bool,
}

impl SelectionController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_selected(&self, id: GroupId) -> bool {
        self.selected.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    /// Selected ids in no particular order.
    pub fn ids(&self) -> impl Iterator<Item = GroupId> + '_ {
        self.selected.iter().copied()
    }

    /// Replace the selection with exactly `id`.
    pub fn select_only(&mut self, id: GroupId) {
        self.selected.clear();
        self.selected.insert(id);
    }

    pub fn select(&mut self, id: GroupId) {
        self.selected.insert(id);
    }

    pub fn deselect(&mut self, id: GroupId) {
        self.selected.remove(&id);
    }

    /// Flip membership of `id`. Returns whether it is now selected.
    pub fn toggle(&mut self, id: GroupId) -> bool {
        if self.selected.remove(&id) {
            false
        } else {
            self.selected.insert(id);
            true
        }
    }

    pub fn clear(&mut self) {
        self.selected.clear();
    }

    /// Replace the selection with a set of ids.
    pub fn set<I: IntoIterator<Item = GroupId>>(&mut self, ids: I) {
        self.selected = ids.into_iter().collect();
    }

    /// Drop ids that no longer exist.
    pub fn retain(&mut self, mut exists: impl FnMut(GroupId) -> bool) {
        self.selected.retain(|&id| exists(id));
    }

    /// Apply click semantics. Returns true if the selection changed.
    ///
    /// Clicks inside an edited field are left to the editor. A group click
    /// replaces the selection, or toggles membership with shift. An empty
    /// canvas click clears it, unless it closes a box selection.
    pub fn click(&mut self, target: ClickTarget, shift: bool) -> bool {
        match target {
            ClickTarget::EditingField => false,
            ClickTarget::Group(id) => {
                self.suppress_next_click = false;
                if shift {
                    self.toggle(id);
                    true
                } else if self.selected.len() == 1 && self.is_selected(id) {
                    false
                } else {
                    self.select_only(id);
                    true
                }
            }
            ClickTarget::Canvas => {
                if std::mem::take(&mut self.suppress_next_click) {
                    return false;
                }
                let changed = !self.selected.is_empty();
                self.clear();
                changed
            }
        }
    }

    /// Ignore the next empty-canvas click.
    pub fn suppress_next_click(&mut self) {
        self.suppress_next_click = true;
    }

    pub fn is_click_suppressed(&self) -> bool {
        self.suppress_next_click
    }

    /// Open a selection rectangle at a screen point.
    pub fn begin_box(&mut self, screen: Point) {
        self.box_select = Some(BoxSelect { start: screen, current: screen });
    }

    pub fn is_box_selecting(&self) -> bool {
        self.box_select.is_some()
    }

    /// Current selection rectangle in screen coordinates.
    pub fn box_rect(&self) -> Option<Rect> {
        self.box_select.map(|b| b.rect())
    }

    /// Extend the rectangle and recompute the selection from scratch.
    ///
    /// `groups` yields every group's screen-space bounds.
    pub fn update_box<I>(&mut self, screen: Point, groups: I)
    where
        I: IntoIterator<Item = (GroupId, Rect)>,
    {
        let Some(state) = self.box_select.as_mut() else {
            return;
        };
        state.current = screen;
        let rect = state.rect();
        self.selected = groups
            .into_iter()
            .filter(|&(_, bounds)| rects_overlap(rect, bounds))
            .map(|(id, _)| id)
            .collect();
    }

    /// Finish the box selection. The click that follows is swallowed.
    pub fn end_box(&mut self) -> bool {
        if self.box_select.take().is_none() {
            return false;
        }
        self.suppress_next_click = true;
        true
    }

    /// Drop the rectangle without arming click suppression.
    pub fn cancel_box(&mut self) {
        self.box_select = None;
    }
}
