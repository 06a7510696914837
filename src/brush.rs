use crate::mask::MaskValue;

pub const BRUSH_SIZE_MIN: f32 = 1.0;
pub const BRUSH_SIZE_MAX: f32 = 200.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum BrushMode {
    #[default]
    Add,
    Erase,
    /// Single touches pan the view instead of painting.
    Move,
}

impl BrushMode {
    pub fn paint_value(self) -> Option<MaskValue> {
        match self {
            BrushMode::Add => Some(MaskValue::Masked),
            BrushMode::Erase => Some(MaskValue::Unmasked),
            BrushMode::Move => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            BrushMode::Add => "add",
            BrushMode::Erase => "erase",
            BrushMode::Move => "move",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BrushSettings {
    /// Diameter in device pixels.
    pub size: f32,
    pub mode: BrushMode,
}

impl BrushSettings {
    pub fn new(size: f32) -> Self {
        Self {
            size: size.clamp(BRUSH_SIZE_MIN, BRUSH_SIZE_MAX),
            mode: BrushMode::Add,
        }
    }

    pub fn radius(&self) -> f32 {
        self.size / 2.0
    }

    pub fn set_size(&mut self, size: f32) {
        self.size = size.clamp(BRUSH_SIZE_MIN, BRUSH_SIZE_MAX);
    }

    pub fn adjust_size(&mut self, delta: f32) {
        self.set_size(self.size + delta);
    }
}
