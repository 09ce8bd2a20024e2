//! Translates host input into canvas operations.

use crate::canvas::{Canvas, FieldFinalize, PointerTarget};
use crate::camera::WheelAction;
use crate::clipboard::ClipboardController;
use crate::drag::{DragController, DragOutcome};
use crate::groups::{GroupContent, GroupKind};
use crate::input::{InputState, Key, KeyEvent, Modifiers, MouseButton, PointerEvent};
use kurbo::{Point, Vec2};

/// An active view pan.
#[derive(Debug, Clone, Copy)]
struct PanState {
    press: Point,
    start_offset: Vec2,
    button: MouseButton,
}

/// Handles pointer and keyboard events for one board.
#[derive(Debug, Clone, Default)]
pub struct EventHandler {
    /// Tracked pointer, button and key state.
    pub input: InputState,
    pub drag: DragController,
    pub clipboard: ClipboardController,
    pan: Option<PanState>,
    /// Swallow the click that the host emits after a drag.
    suppress_click: bool,
}

impl EventHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_panning(&self) -> bool {
        self.pan.is_some()
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_dragging()
    }

    /// Process a pointer event. Returns true if the scene or view changed.
    pub fn handle_pointer(&mut self, canvas: &mut Canvas, event: &PointerEvent) -> bool {
        self.input.handle_pointer_event(event);
        match *event {
            PointerEvent::Down { position, button, modifiers } => self.handle_press(canvas, position, button, modifiers),
            PointerEvent::Move { position, modifiers } => self.handle_move(canvas, position, modifiers),
            PointerEvent::Up { button, .. } => self.handle_release(canvas, button),
            PointerEvent::Leave => self.handle_leave(canvas),
            PointerEvent::Click { position, modifiers } => self.handle_click(canvas, position, modifiers),
            PointerEvent::DoubleClick { position, modifiers } => self.handle_double_click(canvas, position, modifiers),
            PointerEvent::Wheel(wheel) => canvas.camera.handle_wheel(&wheel) != WheelAction::Ignored,
        }
    }

    fn handle_press(&mut self, canvas: &mut Canvas, position: Point, button: MouseButton, modifiers: Modifiers) -> bool {
        if self.input.starts_pan(button) {
            self.pan = Some(PanState {
                press: position,
                start_offset: canvas.camera.offset,
                button,
            });
            return false;
        }
        if button != MouseButton::Left {
            return false;
        }
        self.suppress_click = false;

        match canvas.target_at(position) {
            PointerTarget::EditingField(_) => false,
            PointerTarget::FieldHandle { group, field } => {
                self.close_editing(canvas);
                self.drag.begin_field_drag(canvas, group, field, position)
            }
            PointerTarget::ImageHandle { group, corner } => {
                self.close_editing(canvas);
                self.drag.begin_resize(canvas, group, corner, position)
            }
            PointerTarget::Group(id) => {
                let closed = self.close_editing(canvas).is_some();
                self.drag.begin_group_drag(canvas, id, position, modifiers.shift) || closed
            }
            PointerTarget::Canvas => {
                let closed = self.close_editing(canvas).is_some();
                canvas.selection.begin_box(position);
                closed
            }
        }
    }

    fn handle_move(&mut self, canvas: &mut Canvas, position: Point, modifiers: Modifiers) -> bool {
        if let Some(pan) = self.pan {
            canvas.camera.offset = pan.start_offset + (position - pan.press);
            return true;
        }
        if self.drag.is_dragging() {
            self.drag.update(canvas, position, modifiers.command());
            return true;
        }
        if canvas.selection.is_box_selecting() {
            let bounds = canvas.screen_bounds();
            canvas.selection.update_box(position, bounds);
            return true;
        }
        false
    }

    fn handle_release(&mut self, canvas: &mut Canvas, button: MouseButton) -> bool {
        if self.pan.is_some_and(|pan| pan.button == button) {
            self.pan = None;
            return false;
        }
        if button != MouseButton::Left {
            return false;
        }
        if self.drag.is_dragging() {
            let outcome = self.drag.end(canvas);
            if outcome != DragOutcome::None {
                self.suppress_click = true;
            }
            return outcome != DragOutcome::None;
        }
        canvas.selection.end_box()
    }

    /// Leaving the canvas drops pan and box selection. Group drags continue
    /// until the button is released.
    fn handle_leave(&mut self, canvas: &mut Canvas) -> bool {
        let changed = self.pan.take().is_some() || canvas.selection.is_box_selecting();
        canvas.selection.cancel_box();
        changed
    }

    fn handle_click(&mut self, canvas: &mut Canvas, position: Point, modifiers: Modifiers) -> bool {
        if std::mem::take(&mut self.suppress_click) {
            return false;
        }
        let target = canvas.target_at(position).click_target();
        canvas.selection.click(target, modifiers.shift)
    }

    /// Empty canvas: new math stack (shift: text block) in editing mode.
    /// On a group: open the field under the pointer.
    fn handle_double_click(&mut self, canvas: &mut Canvas, position: Point, modifiers: Modifiers) -> bool {
        match canvas.target_at(position) {
            PointerTarget::EditingField(_) => false,
            PointerTarget::Canvas => {
                self.close_editing(canvas);
                let kind = if modifiers.shift { GroupKind::Text } else { GroupKind::Math };
                let point = canvas.camera.screen_to_canvas(position);
                let id = canvas.create_group(kind, point, None);
                canvas.select(id);
                true
            }
            PointerTarget::Group(id) | PointerTarget::FieldHandle { group: id, .. } => {
                let point = canvas.camera.screen_to_canvas(position);
                let field = match canvas.group(id).map(|g| (&g.content, g.field_at(point))) {
                    Some((GroupContent::Math(_), Some(field))) => field,
                    Some((GroupContent::Text(_), _)) => 0,
                    _ => return false,
                };
                self.close_editing(canvas);
                canvas.begin_editing(id, field)
            }
            PointerTarget::ImageHandle { .. } => false,
        }
    }

    /// Close the open editor. Blank math fields are removed.
    pub fn close_editing(&mut self, canvas: &mut Canvas) -> Option<FieldFinalize> {
        let editing = canvas.editing()?;
        match canvas.group(editing.group).map(|g| g.kind()) {
            Some(GroupKind::Math) => Some(canvas.finalize_field(editing.group, editing.field)),
            _ => {
                canvas.stop_editing();
                Some(FieldFinalize::Kept)
            }
        }
    }

    /// Process a key event. Returns true if the scene or view changed.
    ///
    /// While an editor is open only Escape is handled; other keys belong
    /// to the editor.
    pub fn handle_key(&mut self, canvas: &mut Canvas, event: &KeyEvent) -> bool {
        self.input.handle_key_event(event);
        let KeyEvent::Pressed { key, modifiers } = event else {
            return false;
        };

        if *key == Key::Escape {
            return self.handle_escape(canvas);
        }
        if canvas.is_editing() {
            return false;
        }

        if modifiers.command() {
            let Key::Character(c) = key else {
                return false;
            };
            return match (c.to_ascii_lowercase(), modifiers.shift) {
                ('c', false) => {
                    self.clipboard.copy(canvas);
                    false
                }
                ('x', false) => self.clipboard.cut(canvas) > 0,
                ('v', false) => {
                    let anchor = self.input.pointer_position;
                    !self.clipboard.paste_at_screen(canvas, anchor).is_empty()
                }
                ('z', false) => canvas.undo(),
                ('z', true) | ('y', false) => canvas.redo(),
                ('a', false) => {
                    canvas.select_all();
                    true
                }
                _ => false,
            };
        }

        let deletes = matches!(key, Key::Delete | Key::Backspace | Key::Character('x'));
        if deletes && modifiers.is_empty() {
            return canvas.delete_selected() > 0;
        }
        false
    }

    fn handle_escape(&mut self, canvas: &mut Canvas) -> bool {
        if canvas.is_editing() {
            self.close_editing(canvas);
            return true;
        }
        if canvas.selection.is_box_selecting() {
            canvas.selection.cancel_box();
            return true;
        }
        if !canvas.selection.is_empty() {
            canvas.clear_all_selections();
            return true;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::groups::{GroupId, MathStack};
    use crate::input::{WheelDeltaMode, WheelEvent};

    /// Canvas point at screen (0, 0) with the default camera.
    const ORIGIN: f64 = 10000.0;

    fn stack_at(canvas: &mut Canvas, sx: f64, sy: f64) -> GroupId {
        let content = GroupContent::Math(MathStack::from_latex(["x"]));
        canvas.create_group(GroupKind::Math, Point::new(ORIGIN + sx, ORIGIN + sy), Some(content))
    }

    fn down(x: f64, y: f64) -> PointerEvent {
        PointerEvent::Down {
            position: Point::new(x, y),
            button: MouseButton::Left,
            modifiers: Modifiers::default(),
        }
    }

    fn move_to(x: f64, y: f64, modifiers: Modifiers) -> PointerEvent {
        PointerEvent::Move { position: Point::new(x, y), modifiers }
    }

    fn up(x: f64, y: f64) -> PointerEvent {
        PointerEvent::Up { position: Point::new(x, y), button: MouseButton::Left }
    }

    fn click(x: f64, y: f64) -> PointerEvent {
        PointerEvent::Click { position: Point::new(x, y), modifiers: Modifiers::default() }
    }

    fn press_key(key: Key, modifiers: Modifiers) -> KeyEvent {
        KeyEvent::Pressed { key, modifiers }
    }

    fn ctrl() -> Modifiers {
        Modifiers { ctrl: true, ..Default::default() }
    }

    #[test]
    fn test_double_click_creates_stack_in_editing_mode() {
        let mut canvas = Canvas::new();
        let mut handler = EventHandler::new();
        canvas.take_save_request();

        let event = PointerEvent::DoubleClick { position: Point::new(200.0, 150.0), modifiers: Modifiers::default() };
        assert!(handler.handle_pointer(&mut canvas, &event));

        let group = canvas.document.groups_ordered().next().unwrap();
        assert_eq!(group.kind(), GroupKind::Math);
        assert_eq!(group.position, Point::new(ORIGIN + 200.0, ORIGIN + 150.0));
        assert_eq!(canvas.editing().map(|e| (e.group, e.field)), Some((group.id(), 0)));
        assert!(canvas.take_save_request());
    }

    #[test]
    fn test_shift_double_click_creates_text() {
        let mut canvas = Canvas::new();
        let mut handler = EventHandler::new();
        let modifiers = Modifiers { shift: true, ..Default::default() };
        handler.handle_pointer(&mut canvas, &PointerEvent::DoubleClick { position: Point::new(10.0, 10.0), modifiers });
        let group = canvas.document.groups_ordered().next().unwrap();
        assert_eq!(group.kind(), GroupKind::Text);
        assert!(canvas.is_editing());
    }

    #[test]
    fn test_escape_on_blank_new_stack_removes_it() {
        let mut canvas = Canvas::new();
        let mut handler = EventHandler::new();
        let event = PointerEvent::DoubleClick { position: Point::new(200.0, 150.0), modifiers: Modifiers::default() };
        handler.handle_pointer(&mut canvas, &event);
        assert_eq!(canvas.document.len(), 1);

        assert!(handler.handle_key(&mut canvas, &press_key(Key::Escape, Modifiers::default())));
        assert!(canvas.document.is_empty());
        assert!(!canvas.is_editing());
    }

    #[test]
    fn test_group_drag_moves_and_swallows_click() {
        let mut canvas = Canvas::new();
        let mut handler = EventHandler::new();
        let id = stack_at(&mut canvas, 0.0, 0.0);

        handler.handle_pointer(&mut canvas, &down(50.0, 20.0));
        handler.handle_pointer(&mut canvas, &move_to(70.0, 45.0, Modifiers::default()));
        assert!(handler.handle_pointer(&mut canvas, &up(70.0, 45.0)));
        assert!(!handler.handle_pointer(&mut canvas, &click(70.0, 45.0)));

        assert_eq!(canvas.position(id), Some(Point::new(ORIGIN + 20.0, ORIGIN + 25.0)));
        assert_eq!(canvas.selected_ids(), vec![id]);
        assert!(canvas.document.can_undo());
    }

    #[test]
    fn test_group_drag_snaps_with_command() {
        let mut canvas = Canvas::new();
        let mut handler = EventHandler::new();
        let id = stack_at(&mut canvas, 0.0, 0.0);

        handler.handle_pointer(&mut canvas, &down(50.0, 20.0));
        handler.handle_pointer(&mut canvas, &move_to(57.0, 33.0, ctrl()));
        handler.handle_pointer(&mut canvas, &up(57.0, 33.0));
        assert_eq!(canvas.position(id), Some(Point::new(ORIGIN, ORIGIN + 20.0)));
    }

    #[test]
    fn test_drag_survives_leave() {
        let mut canvas = Canvas::new();
        let mut handler = EventHandler::new();
        let id = stack_at(&mut canvas, 0.0, 0.0);

        handler.handle_pointer(&mut canvas, &down(50.0, 20.0));
        handler.handle_pointer(&mut canvas, &move_to(60.0, 20.0, Modifiers::default()));
        handler.handle_pointer(&mut canvas, &PointerEvent::Leave);
        assert!(handler.is_dragging());
        handler.handle_pointer(&mut canvas, &up(90.0, 20.0));
        assert!(!handler.is_dragging());
        assert_eq!(canvas.position(id), Some(Point::new(ORIGIN + 10.0, ORIGIN)));
    }

    #[test]
    fn test_box_select_then_click_keeps_selection() {
        let mut canvas = Canvas::new();
        let mut handler = EventHandler::new();
        let a = stack_at(&mut canvas, 0.0, 0.0);
        let b = stack_at(&mut canvas, 200.0, 0.0);

        handler.handle_pointer(&mut canvas, &down(-10.0, -10.0));
        handler.handle_pointer(&mut canvas, &move_to(130.0, 50.0, Modifiers::default()));
        assert!(canvas.is_selected(a) && !canvas.is_selected(b));

        handler.handle_pointer(&mut canvas, &up(130.0, 50.0));
        assert!(!handler.handle_pointer(&mut canvas, &click(130.0, 50.0)));
        assert_eq!(canvas.selected_ids(), vec![a]);

        // Press and release in place still closes a box, so the click is
        // swallowed too.
        handler.handle_pointer(&mut canvas, &down(500.0, 500.0));
        handler.handle_pointer(&mut canvas, &up(500.0, 500.0));
        assert!(!handler.handle_pointer(&mut canvas, &click(500.0, 500.0)));
        assert_eq!(canvas.selected_ids(), vec![a]);
    }

    #[test]
    fn test_escape_does_not_cancel_group_drag() {
        let mut canvas = Canvas::new();
        let mut handler = EventHandler::new();
        let id = stack_at(&mut canvas, 0.0, 0.0);

        handler.handle_pointer(&mut canvas, &down(50.0, 20.0));
        handler.handle_pointer(&mut canvas, &move_to(150.0, 70.0, Modifiers::default()));
        handler.handle_key(&mut canvas, &press_key(Key::Escape, Modifiers::default()));
        assert!(handler.is_dragging());

        assert!(handler.handle_pointer(&mut canvas, &up(150.0, 70.0)));
        assert_eq!(canvas.position(id), Some(Point::new(ORIGIN + 100.0, ORIGIN + 50.0)));
        assert!(canvas.document.can_undo());
    }

    #[test]
    fn test_leave_cancels_box_select() {
        let mut canvas = Canvas::new();
        let mut handler = EventHandler::new();
        handler.handle_pointer(&mut canvas, &down(-10.0, -10.0));
        assert!(canvas.selection.is_box_selecting());
        assert!(handler.handle_pointer(&mut canvas, &PointerEvent::Leave));
        assert!(!canvas.selection.is_box_selecting());
        assert!(!canvas.selection.is_click_suppressed());
    }

    #[test]
    fn test_middle_button_pans() {
        let mut canvas = Canvas::new();
        let mut handler = EventHandler::new();
        let press = PointerEvent::Down {
            position: Point::new(100.0, 100.0),
            button: MouseButton::Middle,
            modifiers: Modifiers::default(),
        };
        handler.handle_pointer(&mut canvas, &press);
        assert!(handler.is_panning());
        handler.handle_pointer(&mut canvas, &move_to(130.0, 140.0, Modifiers::default()));
        handler.handle_pointer(&mut canvas, &move_to(110.0, 90.0, Modifiers::default()));
        assert_eq!(canvas.camera.offset, Vec2::new(10.0, -10.0));

        handler.handle_pointer(&mut canvas, &PointerEvent::Up { position: Point::new(110.0, 90.0), button: MouseButton::Middle });
        assert!(!handler.is_panning());
    }

    #[test]
    fn test_space_left_pans_and_leave_ends_it() {
        let mut canvas = Canvas::new();
        let mut handler = EventHandler::new();
        let id = stack_at(&mut canvas, 0.0, 0.0);
        handler.handle_key(&mut canvas, &press_key(Key::Space, Modifiers::default()));

        handler.handle_pointer(&mut canvas, &down(50.0, 20.0));
        assert!(handler.is_panning());
        assert!(!handler.is_dragging());
        handler.handle_pointer(&mut canvas, &move_to(80.0, 20.0, Modifiers::default()));
        handler.handle_pointer(&mut canvas, &PointerEvent::Leave);
        assert!(!handler.is_panning());
        assert_eq!(canvas.camera.offset, Vec2::new(30.0, 0.0));
        assert_eq!(canvas.position(id), Some(Point::new(ORIGIN, ORIGIN)));
    }

    #[test]
    fn test_delete_keys() {
        let mut canvas = Canvas::new();
        let mut handler = EventHandler::new();
        let a = stack_at(&mut canvas, 0.0, 0.0);
        let b = stack_at(&mut canvas, 200.0, 0.0);
        canvas.select(a);

        // Modified x is not a delete.
        let shift = Modifiers { shift: true, ..Default::default() };
        assert!(!handler.handle_key(&mut canvas, &press_key(Key::Character('x'), shift)));
        assert!(handler.handle_key(&mut canvas, &press_key(Key::Character('x'), Modifiers::default())));
        assert!(!canvas.document.contains(a));

        canvas.select(b);
        canvas.begin_editing(b, 0);
        assert!(!handler.handle_key(&mut canvas, &press_key(Key::Delete, Modifiers::default())));
        assert!(canvas.document.contains(b));
        canvas.stop_editing();
        assert!(handler.handle_key(&mut canvas, &press_key(Key::Backspace, Modifiers::default())));
        assert!(canvas.document.is_empty());
    }

    #[test]
    fn test_copy_paste_at_pointer() {
        let mut canvas = Canvas::new();
        let mut handler = EventHandler::new();
        let a = stack_at(&mut canvas, 0.0, 0.0);
        canvas.select(a);

        handler.handle_key(&mut canvas, &press_key(Key::Character('c'), ctrl()));
        handler.handle_pointer(&mut canvas, &move_to(300.0, 200.0, Modifiers::default()));
        assert!(handler.handle_key(&mut canvas, &press_key(Key::Character('v'), ctrl())));

        assert_eq!(canvas.document.len(), 2);
        let pasted = canvas.selected_ids();
        assert_eq!(pasted.len(), 1);
        assert_ne!(pasted[0], a);
        assert_eq!(canvas.position(pasted[0]), Some(Point::new(ORIGIN + 300.0, ORIGIN + 200.0)));
    }

    #[test]
    fn test_undo_redo_keys() {
        let mut canvas = Canvas::new();
        let mut handler = EventHandler::new();
        stack_at(&mut canvas, 0.0, 0.0);

        assert!(handler.handle_key(&mut canvas, &press_key(Key::Character('z'), ctrl())));
        assert!(canvas.document.is_empty());
        let redo = Modifiers { ctrl: true, shift: true, ..Default::default() };
        assert!(handler.handle_key(&mut canvas, &press_key(Key::Character('z'), redo)));
        assert_eq!(canvas.document.len(), 1);
    }

    #[test]
    fn test_ctrl_wheel_zooms_around_pointer() {
        let mut canvas = Canvas::new();
        let mut handler = EventHandler::new();
        let pointer = Point::new(400.0, 300.0);
        let before = canvas.camera.screen_to_canvas(pointer);
        let wheel = WheelEvent {
            position: pointer,
            delta: Vec2::new(0.0, -30.0),
            mode: WheelDeltaMode::Pixel,
            modifiers: ctrl(),
        };
        assert!(handler.handle_pointer(&mut canvas, &PointerEvent::Wheel(wheel)));
        assert!(canvas.camera.scale() > 1.0);
        let after = canvas.camera.screen_to_canvas(pointer);
        assert!((before - after).hypot() < 1e-6);
    }

    #[test]
    fn test_double_click_opens_field() {
        let mut canvas = Canvas::new();
        let mut handler = EventHandler::new();
        let id = stack_at(&mut canvas, 0.0, 0.0);
        let event = PointerEvent::DoubleClick { position: Point::new(60.0, 20.0), modifiers: Modifiers::default() };
        assert!(handler.handle_pointer(&mut canvas, &event));
        assert_eq!(canvas.editing().map(|e| (e.group, e.field)), Some((id, 0)));

        // Presses inside the open field are left to the editor.
        assert!(!handler.handle_pointer(&mut canvas, &down(60.0, 20.0)));
        assert!(canvas.is_editing());
        assert!(!handler.is_dragging());
    }
}
