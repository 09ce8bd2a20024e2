//! Input state management for pointer, wheel and keyboard events.

use kurbo::{Point, Vec2};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Mouse button identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

/// Modifier keys state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    /// Ctrl on most platforms, Cmd on macOS.
    pub fn command(&self) -> bool {
        self.ctrl || self.meta
    }

    /// True when no modifier is held.
    pub fn is_empty(&self) -> bool {
        !(self.shift || self.ctrl || self.alt || self.meta)
    }
}

/// Granularity of a wheel delta.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum WheelDeltaMode {
    /// Pixel-precise deltas (trackpads, smooth wheels).
    #[default]
    Pixel,
    /// Deltas counted in lines.
    Line,
    /// Deltas counted in pages.
    Page,
}

/// A wheel or trackpad scroll event.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WheelEvent {
    pub position: Point,
    pub delta: Vec2,
    pub mode: WheelDeltaMode,
    pub modifiers: Modifiers,
}

/// Pointer event type for unified mouse/touch handling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PointerEvent {
    Down {
        position: Point,
        button: MouseButton,
        modifiers: Modifiers,
    },
    Up {
        position: Point,
        button: MouseButton,
    },
    Move {
        position: Point,
        modifiers: Modifiers,
    },
    /// The pointer left the canvas element.
    Leave,
    Click {
        position: Point,
        modifiers: Modifiers,
    },
    DoubleClick {
        position: Point,
        modifiers: Modifiers,
    },
    Wheel(WheelEvent),
}

/// Keys the board reacts to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Key {
    Space,
    Delete,
    Backspace,
    Escape,
    /// A printable character, lower-cased by the host.
    Character(char),
    Other(String),
}

/// Keyboard event type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum KeyEvent {
    Pressed { key: Key, modifiers: Modifiers },
    Released { key: Key },
}

/// Tracks the current input state across events.
#[derive(Debug, Clone, Default)]
pub struct InputState {
    /// Last known pointer position in screen coordinates.
    pub pointer_position: Point,
    /// Whether the pointer is over the canvas.
    pub pointer_inside: bool,
    /// Currently pressed mouse buttons.
    pressed_buttons: HashSet<MouseButton>,
    /// Currently pressed keys.
    pressed_keys: HashSet<Key>,
    /// Current modifier keys state.
    pub modifiers: Modifiers,
}

impl InputState {
    /// Create a new input state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Process a pointer event.
    pub fn handle_pointer_event(&mut self, event: &PointerEvent) {
        match *event {
            PointerEvent::Down { position, button, modifiers } => {
                self.pointer_position = position;
                self.pointer_inside = true;
                self.modifiers = modifiers;
                self.pressed_buttons.insert(button);
            }
            PointerEvent::Up { position, button } => {
                self.pointer_position = position;
                self.pressed_buttons.remove(&button);
            }
            PointerEvent::Move { position, modifiers } => {
                self.pointer_position = position;
                self.pointer_inside = true;
                self.modifiers = modifiers;
            }
            PointerEvent::Leave => {
                self.pointer_inside = false;
            }
            PointerEvent::Click { position, modifiers }
            | PointerEvent::DoubleClick { position, modifiers } => {
                self.pointer_position = position;
                self.modifiers = modifiers;
            }
            PointerEvent::Wheel(wheel) => {
                self.pointer_position = wheel.position;
                self.modifiers = wheel.modifiers;
            }
        }
    }

    /// Process a key event.
    pub fn handle_key_event(&mut self, event: &KeyEvent) {
        match event {
            KeyEvent::Pressed { key, modifiers } => {
                self.modifiers = *modifiers;
                self.pressed_keys.insert(key.clone());
            }
            KeyEvent::Released { key } => {
                self.pressed_keys.remove(key);
            }
        }
    }

    /// Check if a button is currently pressed.
    pub fn is_button_pressed(&self, button: MouseButton) -> bool {
        self.pressed_buttons.contains(&button)
    }

    /// Check if a key is currently pressed.
    pub fn is_key_pressed(&self, key: &Key) -> bool {
        self.pressed_keys.contains(key)
    }

    /// Whether the space bar pan modifier is held.
    pub fn space_held(&self) -> bool {
        self.is_key_pressed(&Key::Space)
    }

    /// Whether a press with `button` should start panning.
    pub fn starts_pan(&self, button: MouseButton) -> bool {
        button == MouseButton::Middle || (button == MouseButton::Left && self.space_held())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn down(x: f64, y: f64, button: MouseButton) -> PointerEvent {
        PointerEvent::Down {
            position: Point::new(x, y),
            button,
            modifiers: Modifiers::default(),
        }
    }

    #[test]
    fn test_button_press_and_release() {
        let mut input = InputState::new();
        input.handle_pointer_event(&down(100.0, 100.0, MouseButton::Left));
        assert!(input.is_button_pressed(MouseButton::Left));
        assert!(!input.is_button_pressed(MouseButton::Right));

        input.handle_pointer_event(&PointerEvent::Up {
            position: Point::new(110.0, 100.0),
            button: MouseButton::Left,
        });
        assert!(!input.is_button_pressed(MouseButton::Left));
        assert_eq!(input.pointer_position, Point::new(110.0, 100.0));
    }

    #[test]
    fn test_space_held() {
        let mut input = InputState::new();
        assert!(!input.starts_pan(MouseButton::Left));

        input.handle_key_event(&KeyEvent::Pressed {
            key: Key::Space,
            modifiers: Modifiers::default(),
        });
        assert!(input.space_held());
        assert!(input.starts_pan(MouseButton::Left));

        input.handle_key_event(&KeyEvent::Released { key: Key::Space });
        assert!(!input.space_held());
    }

    #[test]
    fn test_middle_button_always_pans() {
        let input = InputState::new();
        assert!(input.starts_pan(MouseButton::Middle));
        assert!(!input.starts_pan(MouseButton::Right));
    }

    #[test]
    fn test_leave_clears_inside() {
        let mut input = InputState::new();
        input.handle_pointer_event(&PointerEvent::Move {
            position: Point::new(5.0, 5.0),
            modifiers: Modifiers::default(),
        });
        assert!(input.pointer_inside);
        input.handle_pointer_event(&PointerEvent::Leave);
        assert!(!input.pointer_inside);
        assert_eq!(input.pointer_position, Point::new(5.0, 5.0));
    }

    #[test]
    fn test_command_modifier() {
        assert!(Modifiers { meta: true, ..Default::default() }.command());
        assert!(Modifiers { ctrl: true, ..Default::default() }.command());
        assert!(!Modifiers { shift: true, ..Default::default() }.command());
        assert!(Modifiers::default().is_empty());
    }
}
