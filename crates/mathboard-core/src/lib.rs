//! MathBoard Core Library
//!
//! Platform-agnostic core of the MathBoard infinite canvas: the group model,
//! view transform, selection, drag and clipboard controllers, the versioned
//! document codec and storage orchestration.

pub mod camera;
pub mod canvas;
pub mod clipboard;
pub mod config;
pub mod content;
pub mod drag;
pub mod editors;
pub mod event_handler;
pub mod groups;
pub mod input;
pub mod persistence;
pub mod selection;
pub mod snap;
pub mod storage;

pub use camera::{Camera, WheelAction};
pub use canvas::{Canvas, CanvasDocument, EditingTarget, FieldFinalize, PointerTarget};
pub use clipboard::ClipboardController;
pub use config::{BoardConfig, ConfigError};
pub use content::{ContentFormat, Segment, TextContent};
pub use drag::{DragController, DragOutcome};
pub use editors::{EditorCapabilities, EquationEditor, RichTextEditor};
pub use event_handler::EventHandler;
pub use groups::{Group, GroupContent, GroupId, GroupKind};
pub use input::InputState;
pub use persistence::{CodecError, DocumentEnvelope, DocumentRef, FormatVersion};
pub use selection::SelectionController;
pub use snap::{GRID_SIZE, snap_to_grid};
pub use storage::{AutoSaveManager, DocumentLibrary, FileRecord, StorageError, StorageGateway, StorageResult};
