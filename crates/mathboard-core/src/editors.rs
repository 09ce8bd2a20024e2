//! Interfaces of the external editing components.
//!
//! The board never renders or edits content itself. Equation fields and text
//! blocks are handed to host-provided editors through these traits, and their
//! results flow back through [`Canvas`](crate::Canvas) commit methods.

use crate::config::BoardConfig;
use crate::content::RichDoc;
use crate::groups::{MathStack, TextBlock};
use crate::persistence::FormatVersion;

/// An equation editing component bound to one math field.
pub trait EquationEditor {
    fn focus(&mut self);
    /// Current equation source.
    fn latex(&self) -> String;
    fn set_latex(&mut self, latex: &str);
    fn blur(&mut self);
}

/// A structured rich-text editing component bound to one text block.
pub trait RichTextEditor {
    /// Replace the edited document.
    fn load(&mut self, doc: &RichDoc);
    fn focus(&mut self);
    fn destroy(&mut self);
    /// Current document.
    fn serialize(&self) -> RichDoc;
}

/// What the host's editors support.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditorCapabilities {
    /// Whether a structured rich-text editor is available.
    pub structured_text: bool,
}

impl Default for EditorCapabilities {
    fn default() -> Self {
        Self { structured_text: true }
    }
}

impl EditorCapabilities {
    /// Capabilities declared by a board configuration.
    pub fn from_config(config: &BoardConfig) -> Self {
        Self { structured_text: config.structured_text_editor }
    }

    /// Format documents are saved in.
    pub fn save_version(&self) -> FormatVersion {
        FormatVersion::for_editor(self.structured_text)
    }
}

/// Bind an equation editor to a field of a stack and focus it.
///
/// Returns false when the field does not exist.
pub fn open_equation(stack: &MathStack, index: usize, editor: &mut dyn EquationEditor) -> bool {
    let Some(field) = stack.field(index) else {
        return false;
    };
    editor.set_latex(&field.latex);
    editor.focus();
    true
}

/// Bind a rich-text editor to a block and focus it.
pub fn open_text(block: &TextBlock, editor: &mut dyn RichTextEditor) {
    editor.load(&block.content.to_rich());
    editor.focus();
}
