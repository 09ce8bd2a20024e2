//! Drag interactions: moving groups, reordering math fields and resizing
//! images.
//!
//! Every update recomputes positions from the state captured at press time
//! and the total pointer delta, so repeated moves never accumulate drift.

use crate::canvas::Canvas;
use crate::groups::{Group, GroupId, ImageCorner, resize};
use crate::snap::apply_drag;
use kurbo::{Point, Size};

/// A group move in progress.
#[derive(Debug, Clone)]
pub struct GroupDrag {
    /// Press position in screen coordinates.
    press: Point,
    /// Groups as they were at press time.
    originals: Vec<Group>,
    moved: bool,
}

impl GroupDrag {
    pub fn ids(&self) -> Vec<GroupId> {
        self.originals.iter().map(Group::id).collect()
    }
}

/// A math field reorder in progress.
#[derive(Debug, Clone)]
pub struct FieldDrag {
    pub group: GroupId,
    /// Slot of the dragged field at press time.
    pub index: usize,
    /// Slot of the placeholder among the other fields.
    pub placeholder: usize,
    /// Vertical displacement of the dragged field, canvas units.
    pub offset_y: f64,
    press_y: f64,
    /// Field tops relative to the stack top, at press time.
    tops: Vec<f64>,
    heights: Vec<f64>,
}

impl FieldDrag {
    /// Pick the placeholder slot for the current displacement.
    ///
    /// Siblings are laid out with the placeholder in its current slot; the
    /// new slot is in front of the first sibling whose midpoint lies below
    /// the dragged field's midpoint.
    fn locate_placeholder(&self) -> usize {
        let height = self.heights[self.index];
        let dragged_mid = self.tops[self.index] + self.offset_y + height / 2.0;
        let siblings: Vec<f64> = self
            .heights
            .iter()
            .enumerate()
            .filter(|&(i, _)| i != self.index)
            .map(|(_, &h)| h)
            .collect();

        let mut top = 0.0;
        for (slot, sibling_height) in siblings.iter().enumerate() {
            if slot == self.placeholder {
                top += height;
            }
            if top + sibling_height / 2.0 > dragged_mid {
                return slot;
            }
            top += sibling_height;
        }
        siblings.len()
    }
}

/// An image corner resize in progress.
#[derive(Debug, Clone)]
pub struct ResizeDrag {
    pub group: GroupId,
    pub corner: ImageCorner,
    press: Point,
    original: Group,
    start_size: Size,
}

/// Active drag state.
#[derive(Debug, Clone)]
pub enum DragState {
    Group(GroupDrag),
    Field(FieldDrag),
    Resize(ResizeDrag),
}

/// What a finished drag did.
#[derive(Debug, Clone, PartialEq)]
pub enum DragOutcome {
    /// Released without effect.
    None,
    Moved(Vec<GroupId>),
    Reordered { group: GroupId, from: usize, to: usize },
    Resized(GroupId),
}

/// Owns the transient state of pointer drags.
#[derive(Debug, Clone, Default)]
pub struct DragController {
    state: Option<DragState>,
}

impl DragController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_dragging(&self) -> bool {
        self.state.is_some()
    }

    pub fn state(&self) -> Option<&DragState> {
        self.state.as_ref()
    }

    /// The field reorder in progress, for drawing the ghost and placeholder.
    pub fn field_drag(&self) -> Option<&FieldDrag> {
        match &self.state {
            Some(DragState::Field(drag)) => Some(drag),
            _ => None,
        }
    }

    /// Start moving groups from a press on `id`.
    ///
    /// A selected group drags the whole selection. An unselected one drags
    /// alone and becomes the selection, unless `shift` is held.
    pub fn begin_group_drag(&mut self, canvas: &mut Canvas, id: GroupId, screen: Point, shift: bool) -> bool {
        if !canvas.document.contains(id) {
            return false;
        }
        let ids = if canvas.is_selected(id) {
            canvas.selected_ids()
        } else {
            if !shift {
                canvas.select(id);
            }
            vec![id]
        };
        let originals = ids.iter().filter_map(|&g| canvas.group(g).cloned()).collect();
        self.state = Some(DragState::Group(GroupDrag { press: screen, originals, moved: false }));
        true
    }

    /// Start reordering a field from a press on its handle.
    pub fn begin_field_drag(&mut self, canvas: &Canvas, group: GroupId, index: usize, screen: Point) -> bool {
        let Some(stack) = canvas.group(group).and_then(Group::as_math) else {
            return false;
        };
        if index >= stack.len() {
            return false;
        }
        self.state = Some(DragState::Field(FieldDrag {
            group,
            index,
            placeholder: index,
            offset_y: 0.0,
            press_y: screen.y,
            tops: stack.field_offsets(),
            heights: stack.field_heights(),
        }));
        true
    }

    /// Start resizing an image from a press on a corner handle.
    pub fn begin_resize(&mut self, canvas: &Canvas, group: GroupId, corner: ImageCorner, screen: Point) -> bool {
        let Some(original) = canvas.group(group).filter(|g| g.as_image().is_some()).cloned() else {
            return false;
        };
        let start_size = original.size();
        self.state = Some(DragState::Resize(ResizeDrag { group, corner, press: screen, original, start_size }));
        true
    }

    /// Apply a pointer move. `snap` rounds moved groups to the grid.
    pub fn update(&mut self, canvas: &mut Canvas, screen: Point, snap: bool) {
        let scale = canvas.camera.scale();
        match &mut self.state {
            None => {}
            Some(DragState::Group(drag)) => {
                let delta = canvas.camera.screen_delta_to_canvas(screen - drag.press);
                let grid = snap.then_some(canvas.config.grid_size);
                for original in &drag.originals {
                    let position = apply_drag(original.position, delta, grid);
                    if let Some(group) = canvas.document.get_mut(original.id()) {
                        if group.position != position {
                            drag.moved = true;
                        }
                        group.set_position(position);
                    }
                }
            }
            Some(DragState::Field(drag)) => {
                drag.offset_y = (screen.y - drag.press_y) / scale;
                drag.placeholder = drag.locate_placeholder();
            }
            Some(DragState::Resize(drag)) => {
                let delta = canvas.camera.screen_delta_to_canvas(screen - drag.press);
                let step = resize(drag.start_size, drag.corner, delta, canvas.config.image_min_size);
                if let Some(group) = canvas.document.get_mut(drag.group) {
                    group.position = drag.original.position + step.offset;
                    if let Some(image) = group.as_image_mut() {
                        image.size = Some(step.size);
                    }
                }
            }
        }
    }

    /// Finish the drag, committing it as one undo step and scheduling a save.
    pub fn end(&mut self, canvas: &mut Canvas) -> DragOutcome {
        match self.state.take() {
            None => DragOutcome::None,
            Some(DragState::Group(drag)) => {
                if !drag.moved {
                    return DragOutcome::None;
                }
                let ids = drag.ids();
                canvas.document.commit_live_edit(drag.originals);
                canvas.request_save();
                DragOutcome::Moved(ids)
            }
            Some(DragState::Field(drag)) => {
                if drag.placeholder == drag.index {
                    return DragOutcome::None;
                }
                let movable = canvas
                    .group(drag.group)
                    .and_then(Group::as_math)
                    .is_some_and(|stack| drag.index < stack.len() && drag.placeholder < stack.len());
                if !movable {
                    return DragOutcome::None;
                }
                canvas.document.push_undo();
                if let Some(stack) = canvas.document.get_mut(drag.group).and_then(Group::as_math_mut) {
                    stack.move_field(drag.index, drag.placeholder);
                }
                canvas.request_save();
                DragOutcome::Reordered { group: drag.group, from: drag.index, to: drag.placeholder }
            }
            Some(DragState::Resize(drag)) => {
                let changed = canvas.group(drag.group).is_some_and(|g| *g != drag.original);
                if !changed {
                    return DragOutcome::None;
                }
                canvas.document.commit_live_edit(vec![drag.original]);
                canvas.request_save();
                DragOutcome::Resized(drag.group)
            }
        }
    }
}
