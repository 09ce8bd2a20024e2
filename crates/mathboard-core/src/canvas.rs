//! Canvas document and state management.

use crate::camera::Camera;
use crate::config::BoardConfig;
use crate::content::{TextContent, rich_to_legacy};
use crate::editors::{EditorCapabilities, EquationEditor, RichTextEditor};
use crate::groups::{Group, GroupContent, GroupId, GroupKind, ImageCorner};
use crate::persistence::{self, CodecError, DocumentEnvelope, FormatVersion};
use crate::selection::{ClickTarget, SelectionController};
use kurbo::{Point, Rect, Size, Vec2};
use std::collections::HashMap;

/// Screen-space radius of an image resize handle.
pub const HANDLE_HIT_RADIUS: f64 = 8.0;

/// A snapshot of document state for undo/redo.
#[derive(Debug, Clone)]
struct DocumentSnapshot {
    groups: HashMap<GroupId, Group>,
    z_order: Vec<GroupId>,
}

/// The group registry: every group keyed by id, plus z-order and history.
#[derive(Debug, Clone)]
pub struct CanvasDocument {
    groups: HashMap<GroupId, Group>,
    /// Back to front.
    z_order: Vec<GroupId>,
    undo_stack: Vec<DocumentSnapshot>,
    redo_stack: Vec<DocumentSnapshot>,
    history_limit: usize,
}

impl Default for CanvasDocument {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_HISTORY_LIMIT)
    }
}

impl CanvasDocument {
    pub fn new(history_limit: usize) -> Self {
        Self {
            groups: HashMap::new(),
            z_order: Vec::new(),
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            history_limit,
        }
    }

    fn snapshot(&self) -> DocumentSnapshot {
        DocumentSnapshot {
            groups: self.groups.clone(),
            z_order: self.z_order.clone(),
        }
    }

    fn restore(&mut self, snapshot: DocumentSnapshot) {
        self.groups = snapshot.groups;
        self.z_order = snapshot.z_order;
    }

    /// Push current state to undo stack (call before making changes).
    pub fn push_undo(&mut self) {
        self.undo_stack.push(self.snapshot());
        self.redo_stack.clear();
        if self.undo_stack.len() > self.history_limit {
            self.undo_stack.remove(0);
        }
    }

    /// Undo the last change. Returns false if there is nothing to undo.
    pub fn undo(&mut self) -> bool {
        let Some(snapshot) = self.undo_stack.pop() else {
            return false;
        };
        self.redo_stack.push(self.snapshot());
        self.restore(snapshot);
        true
    }

    /// Redo the last undone change. Returns false if there is nothing to redo.
    pub fn redo(&mut self) -> bool {
        let Some(snapshot) = self.redo_stack.pop() else {
            return false;
        };
        self.undo_stack.push(self.snapshot());
        self.restore(snapshot);
        true
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Forget all history.
    pub fn clear_history(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }

    /// Add a group on top of the z-order.
    pub fn add_group(&mut self, group: Group) -> GroupId {
        let id = group.id();
        self.z_order.push(id);
        self.groups.insert(id, group);
        id
    }

    pub fn remove_group(&mut self, id: GroupId) -> Option<Group> {
        self.z_order.retain(|&group_id| group_id != id);
        self.groups.remove(&id)
    }

    /// Overwrite a group with a new version of itself.
    pub fn replace_group(&mut self, group: Group) -> bool {
        match self.groups.get_mut(&group.id()) {
            Some(slot) => {
                *slot = group;
                true
            }
            None => false,
        }
    }

    /// Record an edit that was applied live (drags, resizes) as one undo
    /// step: `originals` are the groups as they were before it started.
    pub fn commit_live_edit(&mut self, originals: Vec<Group>) {
        let current: Vec<Group> = originals.iter().filter_map(|g| self.get(g.id()).cloned()).collect();
        for group in originals {
            self.replace_group(group);
        }
        self.push_undo();
        for group in current {
            self.replace_group(group);
        }
    }

    /// Replace every group.
    pub fn replace_all(&mut self, groups: Vec<Group>) {
        self.groups.clear();
        self.z_order.clear();
        for group in groups {
            self.add_group(group);
        }
    }

    pub fn get(&self, id: GroupId) -> Option<&Group> {
        self.groups.get(&id)
    }

    pub fn get_mut(&mut self, id: GroupId) -> Option<&mut Group> {
        self.groups.get_mut(&id)
    }

    pub fn contains(&self, id: GroupId) -> bool {
        self.groups.contains_key(&id)
    }

    /// Groups back to front.
    pub fn groups_ordered(&self) -> impl Iterator<Item = &Group> {
        self.z_order.iter().filter_map(|id| self.groups.get(id))
    }

    /// Ids back to front.
    pub fn z_order(&self) -> &[GroupId] {
        &self.z_order
    }

    /// Groups containing a canvas point, front to back.
    pub fn groups_at_point(&self, point: Point) -> Vec<GroupId> {
        self.z_order
            .iter()
            .rev()
            .filter(|id| self.groups.get(id).is_some_and(|g| g.hit_test(point)))
            .copied()
            .collect()
    }

    /// Bounding box of all groups.
    pub fn bounds(&self) -> Option<Rect> {
        self.groups.values().map(Group::bounds).reduce(|a, b| a.union(b))
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }
}

/// The field (or text block) open in an external editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditingTarget {
    pub group: GroupId,
    /// Math field index; always 0 for text blocks.
    pub field: usize,
}

/// What lies under a screen point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerTarget {
    /// Inside the field being edited.
    EditingField(EditingTarget),
    /// The drag handle of a math field.
    FieldHandle { group: GroupId, field: usize },
    /// A resize handle of a selected image.
    ImageHandle { group: GroupId, corner: ImageCorner },
    Group(GroupId),
    Canvas,
}

impl PointerTarget {
    pub fn click_target(self) -> ClickTarget {
        match self {
            PointerTarget::EditingField(_) => ClickTarget::EditingField,
            PointerTarget::FieldHandle { group, .. }
            | PointerTarget::ImageHandle { group, .. }
            | PointerTarget::Group(group) => ClickTarget::Group(group),
            PointerTarget::Canvas => ClickTarget::Canvas,
        }
    }
}

/// Outcome of closing a math field's editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldFinalize {
    /// The field has content and stays.
    Kept,
    /// The field was blank and was removed.
    FieldRemoved,
    /// The last field was removed, taking the group with it.
    GroupRemoved,
}

/// Runtime board state: the services every controller works through.
#[derive(Debug, Clone)]
pub struct Canvas {
    /// The group registry.
    pub document: CanvasDocument,
    /// Camera for view transform.
    pub camera: Camera,
    /// The selection set.
    pub selection: SelectionController,
    pub config: BoardConfig,
    pub capabilities: EditorCapabilities,
    /// Viewport size.
    pub viewport_size: Size,
    editing: Option<EditingTarget>,
    /// Bumped by every persisted mutation.
    revision: u64,
    save_requested: bool,
}

impl Default for Canvas {
    fn default() -> Self {
        Self::new()
    }
}

impl Canvas {
    /// Create a new canvas with an empty document.
    pub fn new() -> Self {
        Self::with_config(BoardConfig::default())
    }

    /// Create a canvas whose editor capabilities follow `config`.
    pub fn with_config(config: BoardConfig) -> Self {
        Self {
            document: CanvasDocument::new(config.history_limit),
            camera: Camera::with_config(&config),
            selection: SelectionController::new(),
            capabilities: EditorCapabilities::from_config(&config),
            config,
            viewport_size: Size::new(800.0, 600.0),
            editing: None,
            revision: 0,
            save_requested: false,
        }
    }

    /// Set the viewport size.
    pub fn set_viewport_size(&mut self, width: f64, height: f64) {
        self.viewport_size = Size::new(width, height);
    }

    /// Format documents are saved in.
    pub fn save_version(&self) -> FormatVersion {
        self.capabilities.save_version()
    }

    // --- saving ---

    /// Schedule a save of the whole document.
    pub fn request_save(&mut self) {
        self.revision += 1;
        self.save_requested = true;
    }

    /// Take the pending save request, if any. The host forwards it to the
    /// autosave manager.
    pub fn take_save_request(&mut self) -> bool {
        std::mem::take(&mut self.save_requested)
    }

    /// Number of persisted mutations so far.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    // --- group lifecycle ---

    /// Create a group. Without content, math and text groups get one empty
    /// field that is opened for editing.
    pub fn create_group(&mut self, kind: GroupKind, position: Point, content: Option<GroupContent>) -> GroupId {
        self.document.push_undo();
        let editable = content.is_none() && kind != GroupKind::Image;
        let content = content.unwrap_or_else(|| GroupContent::empty(kind, self.save_version()));
        let id = self.document.add_group(Group::new(position, content));
        if editable {
            self.editing = Some(EditingTarget { group: id, field: 0 });
        }
        log::debug!("created {} group {id}", kind.as_str());
        self.request_save();
        id
    }

    /// Insert prepared groups, e.g. from the clipboard.
    pub fn insert_groups(&mut self, groups: Vec<Group>) -> Vec<GroupId> {
        if groups.is_empty() {
            return Vec::new();
        }
        self.document.push_undo();
        let ids = groups.into_iter().map(|g| self.document.add_group(g)).collect();
        self.request_save();
        ids
    }

    /// Remove a group and persist the change.
    pub fn remove_group(&mut self, id: GroupId) -> Option<Group> {
        if !self.document.contains(id) {
            return None;
        }
        self.document.push_undo();
        let removed = self.detach(id);
        self.request_save();
        removed
    }

    /// Remove several groups as one undo step.
    pub fn remove_groups(&mut self, ids: &[GroupId]) -> usize {
        let present: Vec<GroupId> = ids.iter().copied().filter(|&id| self.document.contains(id)).collect();
        if present.is_empty() {
            return 0;
        }
        self.document.push_undo();
        for &id in &present {
            self.detach(id);
        }
        self.request_save();
        present.len()
    }

    fn detach(&mut self, id: GroupId) -> Option<Group> {
        self.selection.deselect(id);
        if self.editing.is_some_and(|e| e.group == id) {
            self.editing = None;
        }
        self.document.remove_group(id)
    }

    /// Delete the selected groups.
    pub fn delete_selected(&mut self) -> usize {
        let ids = self.selected_ids();
        self.remove_groups(&ids)
    }

    pub fn group(&self, id: GroupId) -> Option<&Group> {
        self.document.get(id)
    }

    pub fn position(&self, id: GroupId) -> Option<Point> {
        self.document.get(id).map(Group::position)
    }

    /// Move a group and persist the change.
    pub fn set_position(&mut self, id: GroupId, position: Point) -> bool {
        match self.document.get_mut(id) {
            Some(group) => {
                group.set_position(position);
                self.request_save();
                true
            }
            None => false,
        }
    }

    // --- selection ---

    /// Select a group (clears previous selection).
    pub fn select(&mut self, id: GroupId) {
        if self.document.contains(id) {
            self.selection.select_only(id);
        }
    }

    /// Add to selection.
    pub fn add_to_selection(&mut self, id: GroupId) {
        if self.document.contains(id) {
            self.selection.select(id);
        }
    }

    pub fn deselect(&mut self, id: GroupId) {
        self.selection.deselect(id);
    }

    pub fn toggle_select(&mut self, id: GroupId) -> bool {
        self.document.contains(id) && self.selection.toggle(id)
    }

    pub fn is_selected(&self, id: GroupId) -> bool {
        self.selection.is_selected(id)
    }

    /// Selected ids in z-order.
    pub fn selected_ids(&self) -> Vec<GroupId> {
        self.document
            .z_order()
            .iter()
            .copied()
            .filter(|&id| self.selection.is_selected(id))
            .collect()
    }

    /// Selected groups in z-order.
    pub fn all_selected(&self) -> Vec<&Group> {
        self.document
            .groups_ordered()
            .filter(|g| self.selection.is_selected(g.id()))
            .collect()
    }

    pub fn clear_all_selections(&mut self) {
        self.selection.clear();
    }

    pub fn select_all(&mut self) {
        self.selection.set(self.document.z_order().iter().copied());
    }

    /// Screen-space bounds of every group.
    pub fn screen_bounds(&self) -> Vec<(GroupId, Rect)> {
        self.document
            .groups_ordered()
            .map(|g| (g.id(), self.camera.canvas_rect_to_screen(g.bounds())))
            .collect()
    }

    // --- hit testing ---

    /// Resolve what lies under a screen point, topmost first.
    pub fn target_at(&self, screen: Point) -> PointerTarget {
        let point = self.camera.screen_to_canvas(screen);
        let handle_radius = HANDLE_HIT_RADIUS / self.camera.scale();

        for &id in self.document.z_order().iter().rev() {
            let Some(group) = self.document.get(id) else {
                continue;
            };
            if group.kind() == GroupKind::Image && self.is_selected(id) {
                let bounds = group.bounds();
                for corner in ImageCorner::ALL {
                    let handle = corner.point(bounds);
                    if (handle - point).hypot() <= handle_radius {
                        return PointerTarget::ImageHandle { group: id, corner };
                    }
                }
            }
            if !group.hit_test(point) {
                continue;
            }
            if let Some(editing) = self.editing.filter(|e| e.group == id) {
                match group.kind() {
                    GroupKind::Text => return PointerTarget::EditingField(editing),
                    GroupKind::Math if group.field_at(point) == Some(editing.field) => {
                        return PointerTarget::EditingField(editing);
                    }
                    _ => {}
                }
            }
            if let Some(field) = group.field_handle_at(point) {
                return PointerTarget::FieldHandle { group: id, field };
            }
            return PointerTarget::Group(id);
        }
        PointerTarget::Canvas
    }

    // --- editing ---

    pub fn editing(&self) -> Option<EditingTarget> {
        self.editing
    }

    pub fn is_editing(&self) -> bool {
        self.editing.is_some()
    }

    /// Open a field (or text block, field 0) for editing.
    pub fn begin_editing(&mut self, group: GroupId, field: usize) -> bool {
        let valid = match self.document.get(group).map(|g| &g.content) {
            Some(GroupContent::Math(stack)) => field < stack.len(),
            Some(GroupContent::Text(_)) => field == 0,
            _ => false,
        };
        if valid {
            self.editing = Some(EditingTarget { group, field });
        }
        valid
    }

    pub fn stop_editing(&mut self) -> Option<EditingTarget> {
        self.editing.take()
    }

    /// Edit callback of an equation editor.
    pub fn set_field_latex(&mut self, group: GroupId, field: usize, latex: &str) -> bool {
        let updated = self
            .document
            .get_mut(group)
            .and_then(Group::as_math_mut)
            .is_some_and(|stack| stack.set_latex(field, latex));
        if updated {
            self.request_save();
        }
        updated
    }

    /// Store the current source of an equation editor.
    pub fn commit_equation(&mut self, group: GroupId, field: usize, editor: &dyn EquationEditor) -> bool {
        self.set_field_latex(group, field, &editor.latex())
    }

    /// Add an empty field below `field` and open it for editing.
    pub fn insert_field_after(&mut self, group: GroupId, field: usize) -> Option<usize> {
        if self.document.get(group).and_then(Group::as_math).is_none() {
            return None;
        }
        self.document.push_undo();
        let index = self.document.get_mut(group)?.as_math_mut()?.insert_field_after(field);
        self.editing = Some(EditingTarget { group, field: index });
        self.request_save();
        Some(index)
    }

    /// Close a math field's editor, removing it when blank.
    ///
    /// When the last field goes, the group goes too.
    pub fn finalize_field(&mut self, group: GroupId, field: usize) -> FieldFinalize {
        if self.editing == Some(EditingTarget { group, field }) {
            self.editing = None;
        }
        let blank = self
            .group(group)
            .and_then(Group::as_math)
            .and_then(|stack| stack.field(field))
            .is_some_and(|f| f.is_blank());
        if !blank {
            return FieldFinalize::Kept;
        }
        self.document.push_undo();
        let Some(stack) = self.document.get_mut(group).and_then(Group::as_math_mut) else {
            return FieldFinalize::Kept;
        };
        stack.remove_field(field);
        if stack.is_empty() {
            self.detach(group);
            log::debug!("removed empty math group {group}");
            self.request_save();
            FieldFinalize::GroupRemoved
        } else {
            self.request_save();
            FieldFinalize::FieldRemoved
        }
    }

    /// Store the serialized document of a rich-text editor, in the
    /// runtime's save encoding.
    pub fn commit_text(&mut self, group: GroupId, editor: &dyn RichTextEditor) -> bool {
        let doc = editor.serialize();
        let content = match self.save_version() {
            FormatVersion::V3 => TextContent::Rich(doc),
            FormatVersion::V2 => TextContent::Legacy(rich_to_legacy(&doc)),
        };
        let Some(block) = self.document.get_mut(group).and_then(Group::as_text_mut) else {
            return false;
        };
        block.content = content;
        self.request_save();
        true
    }

    // --- images and layout ---

    pub fn set_image_url(&mut self, group: GroupId, url: &str) -> bool {
        let Some(image) = self.document.get_mut(group).and_then(Group::as_image_mut) else {
            return false;
        };
        image.set_url(url);
        self.request_save();
        true
    }

    /// Report the natural size of a loaded image.
    pub fn set_image_natural_size(&mut self, group: GroupId, natural: Size) {
        if let Some(image) = self.document.get_mut(group).and_then(Group::as_image_mut) {
            if image.size.is_none() {
                image.set_natural_size(natural);
                self.request_save();
            }
        }
    }

    /// Report the rendered size of a group.
    pub fn set_measured_size(&mut self, group: GroupId, size: Size) {
        if let Some(g) = self.document.get_mut(group) {
            g.set_measured_size(size);
        }
    }

    /// Report the rendered height of a math field.
    pub fn set_field_height(&mut self, group: GroupId, field: usize, height: f64) {
        if let Some(stack) = self.document.get_mut(group).and_then(Group::as_math_mut) {
            stack.set_field_height(field, height);
        }
    }

    // --- history ---

    pub fn undo(&mut self) -> bool {
        if !self.document.undo() {
            return false;
        }
        self.after_history_change();
        true
    }

    pub fn redo(&mut self) -> bool {
        if !self.document.redo() {
            return false;
        }
        self.after_history_change();
        true
    }

    fn after_history_change(&mut self) {
        let document = &self.document;
        self.selection.retain(|id| document.contains(id));
        if self.editing.is_some_and(|e| !self.document.contains(e.group)) {
            self.editing = None;
        }
        self.request_save();
    }

    // --- documents ---

    /// Envelope of the whole scene in the runtime's save format.
    pub fn envelope(&self) -> DocumentEnvelope {
        persistence::envelope_from_groups(self.document.groups_ordered(), self.save_version())
    }

    /// Replace the scene with loaded groups. History is reset and no save is
    /// scheduled.
    pub fn load_groups(&mut self, groups: Vec<Group>) {
        self.document.replace_all(groups);
        self.document.clear_history();
        self.selection.clear();
        self.editing = None;
    }

    /// Replace the scene from document text.
    ///
    /// On error the scene is left untouched.
    pub fn import_json(&mut self, json: &str) -> Result<usize, CodecError> {
        let groups = persistence::decode(json, self.save_version())?;
        let count = groups.len();
        self.document.push_undo();
        self.document.replace_all(groups);
        self.selection.clear();
        self.editing = None;
        self.request_save();
        Ok(count)
    }

    /// Serialize the scene to document text.
    pub fn export_json(&self) -> Result<String, CodecError> {
        persistence::encode_envelope(&self.envelope())
    }

    // --- view ---

    /// Screen-space pan.
    pub fn pan(&mut self, delta: Vec2) {
        self.camera.pan(delta);
    }

    pub fn zoom_in(&mut self) {
        self.camera.zoom_in(self.viewport_size);
    }

    pub fn zoom_out(&mut self) {
        self.camera.zoom_out(self.viewport_size);
    }

    pub fn reset_zoom(&mut self) {
        self.camera.reset_zoom(self.viewport_size);
    }

    pub fn set_zoom_level(&mut self, scale: f64) {
        self.camera.set_zoom_level(scale, self.viewport_size);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{LegacyText, RichDoc, RichNode};
    use crate::editors::mock::{MockEquationEditor, MockTextEditor};
    use crate::groups::{ImageContent, MathStack};

    fn math(canvas: &mut Canvas, x: f64, y: f64, sources: &[&str]) -> GroupId {
        let content = GroupContent::Math(MathStack::from_latex(sources.iter().copied()));
        canvas.create_group(GroupKind::Math, Point::new(x, y), Some(content))
    }

    /// A canvas whose screen and canvas coordinates coincide.
    fn flat_canvas() -> Canvas {
        let mut canvas = Canvas::new();
        canvas.camera.initial_offset = Vec2::ZERO;
        canvas
    }

    #[test]
    fn test_document_creation() {
        let doc = CanvasDocument::default();
        assert!(doc.is_empty());
        assert!(!doc.can_undo());
    }

    #[test]
    fn test_z_order_and_hits() {
        let mut doc = CanvasDocument::default();
        let a = doc.add_group(Group::new(Point::ZERO, GroupContent::Math(MathStack::new())));
        let b = doc.add_group(Group::new(Point::new(50.0, 10.0), GroupContent::Math(MathStack::new())));
        assert_eq!(doc.z_order(), &[a, b]);
        assert_eq!(doc.groups_at_point(Point::new(60.0, 20.0)), vec![b, a]);
        assert_eq!(doc.groups_at_point(Point::new(10.0, 20.0)), vec![a]);
    }

    #[test]
    fn test_create_without_content_is_editable() {
        let mut canvas = Canvas::new();
        let id = canvas.create_group(GroupKind::Math, Point::new(5.0, 5.0), None);
        assert_eq!(canvas.editing(), Some(EditingTarget { group: id, field: 0 }));
        assert_eq!(canvas.group(id).unwrap().as_math().unwrap().len(), 1);
        assert!(canvas.take_save_request());
        assert!(!canvas.take_save_request());
    }

    #[test]
    fn test_text_group_uses_save_encoding() {
        let config = BoardConfig { structured_text_editor: false, ..BoardConfig::default() };
        let mut canvas = Canvas::with_config(config);
        assert_eq!(canvas.save_version(), FormatVersion::V2);
        let id = canvas.create_group(GroupKind::Text, Point::ZERO, None);
        let block = canvas.group(id).unwrap().as_text().unwrap();
        assert_eq!(block.content.version(), FormatVersion::V2);
        assert_eq!(canvas.envelope().version, FormatVersion::V2);

        assert_eq!(Canvas::with_config(BoardConfig::default()).save_version(), FormatVersion::V3);
    }

    #[test]
    fn test_remove_triggers_save_and_deselects() {
        let mut canvas = Canvas::new();
        let id = math(&mut canvas, 0.0, 0.0, &["x"]);
        canvas.select(id);
        canvas.take_save_request();

        assert!(canvas.remove_group(id).is_some());
        assert!(canvas.take_save_request());
        assert!(!canvas.is_selected(id));
        assert!(canvas.remove_group(id).is_none());
    }

    #[test]
    fn test_selection_ops() {
        let mut canvas = Canvas::new();
        let a = math(&mut canvas, 0.0, 0.0, &["a"]);
        let b = math(&mut canvas, 100.0, 0.0, &["b"]);

        canvas.select(a);
        canvas.add_to_selection(b);
        assert_eq!(canvas.selected_ids(), vec![a, b]);
        assert!(!canvas.toggle_select(a));
        assert_eq!(canvas.all_selected().len(), 1);
        canvas.clear_all_selections();
        assert!(canvas.selected_ids().is_empty());
        canvas.select_all();
        assert_eq!(canvas.selected_ids().len(), 2);
        assert_eq!(canvas.delete_selected(), 2);
        assert!(canvas.document.is_empty());
    }

    #[test]
    fn test_finalize_blank_fields() {
        let mut canvas = Canvas::new();
        let id = math(&mut canvas, 0.0, 0.0, &["x", "  "]);
        assert_eq!(canvas.finalize_field(id, 0), FieldFinalize::Kept);
        assert_eq!(canvas.finalize_field(id, 1), FieldFinalize::FieldRemoved);

        canvas.set_field_latex(id, 0, PLACEHOLDER);
        canvas.take_save_request();
        assert_eq!(canvas.finalize_field(id, 0), FieldFinalize::GroupRemoved);
        assert!(canvas.group(id).is_none());
        assert!(canvas.take_save_request());
    }

    #[test]
    fn test_undo_restores_cleaned_up_group() {
        let mut canvas = Canvas::new();
        let id = canvas.create_group(GroupKind::Math, Point::ZERO, None);
        assert_eq!(canvas.finalize_field(id, 0), FieldFinalize::GroupRemoved);

        assert!(canvas.undo());
        let stack = canvas.group(id).and_then(Group::as_math).unwrap();
        assert_eq!(stack.len(), 1);

        // The create step is still there underneath.
        assert!(canvas.undo());
        assert!(canvas.group(id).is_none());
    }

    const PLACEHOLDER: &str = crate::groups::PLACEHOLDER_LATEX;

    #[test]
    fn test_insert_field_after_opens_editor() {
        let mut canvas = Canvas::new();
        let id = math(&mut canvas, 0.0, 0.0, &["a", "b"]);
        assert_eq!(canvas.insert_field_after(id, 0), Some(1));
        assert_eq!(canvas.editing(), Some(EditingTarget { group: id, field: 1 }));
        assert_eq!(canvas.group(id).unwrap().as_math().unwrap().latex_sources(), vec!["a", "", "b"]);
    }

    #[test]
    fn test_commit_editors() {
        let mut canvas = Canvas::new();
        let id = math(&mut canvas, 0.0, 0.0, &["a"]);
        let editor = MockEquationEditor { latex: "e^{i\\pi}".into(), focused: true };
        assert!(canvas.commit_equation(id, 0, &editor));
        assert_eq!(canvas.group(id).unwrap().as_math().unwrap().latex_sources(), vec!["e^{i\\pi}"]);

        let text = canvas.create_group(GroupKind::Text, Point::ZERO, None);
        let editor = MockTextEditor {
            doc: RichDoc::new(vec![RichNode::paragraph(vec![RichNode::text("hello")])]),
            ..Default::default()
        };
        assert!(canvas.commit_text(text, &editor));
        let block = canvas.group(text).unwrap().as_text().unwrap();
        assert_eq!(block.content.to_legacy(), LegacyText::plain("hello"));
        assert!(!canvas.commit_text(id, &editor));
    }

    #[test]
    fn test_undo_redo() {
        let mut canvas = Canvas::new();
        let id = math(&mut canvas, 0.0, 0.0, &["a"]);
        canvas.select(id);
        assert!(canvas.undo());
        assert!(canvas.document.is_empty());
        assert!(!canvas.is_selected(id));
        assert!(canvas.redo());
        assert!(canvas.group(id).is_some());
        assert!(!canvas.redo());
    }

    #[test]
    fn test_history_limit() {
        let config = BoardConfig { history_limit: 2, ..BoardConfig::default() };
        let mut canvas = Canvas::with_config(config);
        for i in 0..5 {
            math(&mut canvas, i as f64 * 10.0, 0.0, &["x"]);
        }
        assert!(canvas.undo());
        assert!(canvas.undo());
        assert!(!canvas.undo());
        assert_eq!(canvas.document.len(), 3);
    }

    #[test]
    fn test_target_at() {
        let mut canvas = flat_canvas();
        let id = math(&mut canvas, 100.0, 100.0, &["a", "b"]);

        assert_eq!(canvas.target_at(Point::new(10.0, 10.0)), PointerTarget::Canvas);
        assert_eq!(canvas.target_at(Point::new(150.0, 110.0)), PointerTarget::Group(id));
        assert_eq!(
            canvas.target_at(Point::new(105.0, 150.0)),
            PointerTarget::FieldHandle { group: id, field: 1 }
        );

        canvas.begin_editing(id, 1);
        assert_eq!(
            canvas.target_at(Point::new(150.0, 150.0)),
            PointerTarget::EditingField(EditingTarget { group: id, field: 1 })
        );
        assert_eq!(canvas.target_at(Point::new(150.0, 110.0)), PointerTarget::Group(id));
    }

    #[test]
    fn test_image_handles_only_when_selected() {
        let mut canvas = flat_canvas();
        let content = GroupContent::Image(ImageContent::new("a.png", Some(Size::new(100.0, 50.0))));
        let id = canvas.create_group(GroupKind::Image, Point::new(0.0, 0.0), Some(content));
        assert_eq!(canvas.target_at(Point::new(99.0, 49.0)), PointerTarget::Group(id));
        canvas.select(id);
        assert_eq!(
            canvas.target_at(Point::new(99.0, 49.0)),
            PointerTarget::ImageHandle { group: id, corner: ImageCorner::Se }
        );
        assert_eq!(
            canvas.target_at(Point::new(-3.0, 2.0)),
            PointerTarget::ImageHandle { group: id, corner: ImageCorner::Nw }
        );
    }

    #[test]
    fn test_import_export() {
        let mut canvas = Canvas::new();
        math(&mut canvas, 10.0, 20.0, &["x"]);
        let json = canvas.export_json().unwrap();

        let mut other = Canvas::new();
        let existing = math(&mut other, 0.0, 0.0, &["keep"]);
        assert!(other.import_json("{ not json").is_err());
        assert!(other.group(existing).is_some());

        assert_eq!(other.import_json(&json).unwrap(), 1);
        assert!(other.group(existing).is_none());
        let group = other.document.groups_ordered().next().unwrap();
        assert_eq!(group.position, Point::new(10.0, 20.0));
    }

    #[test]
    fn test_load_groups_resets_history() {
        let mut canvas = Canvas::new();
        math(&mut canvas, 0.0, 0.0, &["x"]);
        canvas.take_save_request();
        canvas.load_groups(vec![Group::new(Point::ZERO, GroupContent::Math(MathStack::new()))]);
        assert!(!canvas.document.can_undo());
        assert!(!canvas.take_save_request());
        assert_eq!(canvas.document.len(), 1);
    }

    #[test]
    fn test_image_updates() {
        let mut canvas = Canvas::new();
        let id = canvas.create_group(GroupKind::Image, Point::ZERO, None);
        assert!(canvas.editing().is_none());
        assert!(canvas.set_image_url(id, "https://example.com/i.png"));
        canvas.set_image_natural_size(id, Size::new(1600.0, 1200.0));
        assert_eq!(canvas.group(id).unwrap().size(), Size::new(800.0, 600.0));
    }
}
