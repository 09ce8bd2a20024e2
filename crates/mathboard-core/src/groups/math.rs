//! Math stacks: a vertical sequence of equation fields.

use kurbo::Size;

/// Source a freshly inserted field shows before the user types.
pub const PLACEHOLDER_LATEX: &str = "\\placeholder";
/// Field height used until the host reports a measured one.
pub const DEFAULT_FIELD_HEIGHT: f64 = 40.0;
/// Minimum estimated stack width.
const MIN_STACK_WIDTH: f64 = 120.0;
/// Estimated width per source character.
const CHAR_WIDTH: f64 = 9.0;

/// One equation field of a stack.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MathField {
    pub latex: String,
    /// Measured rendered height, in canvas units.
    pub height: Option<f64>,
}

impl MathField {
    pub fn new(latex: impl Into<String>) -> Self {
        Self { latex: latex.into(), height: None }
    }

    /// Empty after trimming, or still the insertion placeholder.
    pub fn is_blank(&self) -> bool {
        let source = self.latex.trim();
        source.is_empty() || source == PLACEHOLDER_LATEX
    }

    pub fn height(&self) -> f64 {
        self.height.unwrap_or(DEFAULT_FIELD_HEIGHT)
    }
}

/// Ordered equation fields of a math group.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MathStack {
    fields: Vec<MathField>,
}

impl MathStack {
    /// A stack with one empty field, ready for editing.
    pub fn new() -> Self {
        Self { fields: vec![MathField::default()] }
    }

    /// A stack holding the given sources in order.
    pub fn from_latex<I, S>(sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: sources.into_iter().map(MathField::new).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn fields(&self) -> &[MathField] {
        &self.fields
    }

    pub fn field(&self, index: usize) -> Option<&MathField> {
        self.fields.get(index)
    }

    /// Sources in stack order.
    pub fn latex_sources(&self) -> Vec<String> {
        self.fields.iter().map(|f| f.latex.clone()).collect()
    }

    /// Replace the source of a field. Returns false for a bad index.
    pub fn set_latex(&mut self, index: usize, latex: impl Into<String>) -> bool {
        match self.fields.get_mut(index) {
            Some(field) => {
                field.latex = latex.into();
                true
            }
            None => false,
        }
    }

    /// Insert an empty field below `index` and return its index.
    ///
    /// An out-of-range index appends.
    pub fn insert_field_after(&mut self, index: usize) -> usize {
        let at = index.saturating_add(1).min(self.fields.len());
        self.fields.insert(at, MathField::default());
        at
    }

    pub fn remove_field(&mut self, index: usize) -> Option<MathField> {
        (index < self.fields.len()).then(|| self.fields.remove(index))
    }

    /// Move a field to a new slot, shifting the others.
    pub fn move_field(&mut self, from: usize, to: usize) -> bool {
        if from >= self.fields.len() || to >= self.fields.len() {
            return false;
        }
        let field = self.fields.remove(from);
        self.fields.insert(to, field);
        true
    }

    /// Record the measured height of a field.
    pub fn set_field_height(&mut self, index: usize, height: f64) {
        if let Some(field) = self.fields.get_mut(index) {
            field.height = Some(height);
        }
    }

    pub fn field_heights(&self) -> Vec<f64> {
        self.fields.iter().map(MathField::height).collect()
    }

    /// Top edge of every field relative to the stack top.
    pub fn field_offsets(&self) -> Vec<f64> {
        self.fields
            .iter()
            .scan(0.0, |top, field| {
                let current = *top;
                *top += field.height();
                Some(current)
            })
            .collect()
    }

    /// Index of the field covering a vertical offset from the stack top.
    pub fn field_at_offset(&self, y: f64) -> Option<usize> {
        if y < 0.0 {
            return None;
        }
        let mut top = 0.0;
        for (index, field) in self.fields.iter().enumerate() {
            let bottom = top + field.height();
            if y < bottom {
                return Some(index);
            }
            top = bottom;
        }
        None
    }

    /// Layout size estimate used before the host measures the stack.
    pub fn estimated_size(&self) -> Size {
        let longest = self.fields.iter().map(|f| f.latex.chars().count()).max().unwrap_or(0);
        let width = (longest as f64 * CHAR_WIDTH).max(MIN_STACK_WIDTH);
        let height = self.fields.iter().map(MathField::height).sum::<f64>();
        Size::new(width, height.max(DEFAULT_FIELD_HEIGHT))
    }
}
