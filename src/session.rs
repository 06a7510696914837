use crate::brush::BrushSettings;
use crate::error::EditError;
use crate::gesture::{GestureCommand, GestureController, TouchEvent};
use crate::history::HistoryStack;
use crate::ingest::ImageDocument;
use crate::mask::MaskBuffer;
use crate::transform::ViewTransform;

/// Everything that belongs to one loaded image. Replaced wholesale on the next load.
pub struct Session {
    document: ImageDocument,
    mask: MaskBuffer,
    history: HistoryStack,
    view: ViewTransform,
    gesture: GestureController,
    mask_revision: u64,
    uploaded_mask_revision: u64,
    image_uploaded: bool,
}

impl Session {
    pub fn new(document: ImageDocument, history_capacity: usize) -> Self {
        let (width, height) = document.display_size();
        Self {
            mask: MaskBuffer::new(width, height),
            document,
            history: HistoryStack::new(history_capacity),
            view: ViewTransform::default(),
            gesture: GestureController::new(),
            mask_revision: 0,
            uploaded_mask_revision: 0,
            image_uploaded: false,
        }
    }

    /// Restores a task fetched back from the service. An absent or unreadable
    /// mask yields a blank one; both halves count as already uploaded.
    pub fn from_remote(
        document: ImageDocument,
        mask_png: Option<&[u8]>,
        history_capacity: usize,
    ) -> Self {
        let mut session = Self::new(document, history_capacity);
        if let Some(bytes) = mask_png {
            let (width, height) = session.document.display_size();
            match MaskBuffer::from_png(bytes, width, height) {
                Ok(mask) => session.mask = mask,
                Err(e) => log::warn!(
                    "Ignoring unreadable mask for {}: {}",
                    session.fingerprint(),
                    e
                ),
            }
        }
        session.image_uploaded = true;
        session
    }

    pub fn document(&self) -> &ImageDocument {
        &self.document
    }

    pub fn fingerprint(&self) -> &str {
        self.document.fingerprint()
    }

    pub fn mask(&self) -> &MaskBuffer {
        &self.mask
    }

    pub fn history(&self) -> &HistoryStack {
        &self.history
    }

    pub fn view(&self) -> &ViewTransform {
        &self.view
    }

    /// Runs a touch event through the gesture machine and applies its commands.
    /// Returns whether the mask or the view changed.
    pub fn handle_touch(&mut self, event: &TouchEvent, brush: &BrushSettings) -> bool {
        let commands = self.gesture.handle(event, brush.mode, &self.view);
        let radius = brush.radius();
        let value = brush.mode.paint_value();
        let mut changed = false;

        for command in commands {
            match command {
                GestureCommand::BeginStroke { at } => {
                    let Some(value) = value else { continue };
                    self.history.push(self.mask.snapshot());
                    self.mask.stamp_circle(at.x, at.y, radius, value);
                    self.touch_mask();
                    log::debug!("stroke started at ({:.1}, {:.1})", at.x, at.y);
                }
                GestureCommand::StrokeTo { from, to } => {
                    let Some(value) = value else { continue };
                    self.mask.stamp_segment(from.x, from.y, to.x, to.y, radius, value);
                    self.touch_mask();
                }
                GestureCommand::PanBy { dx, dy } => self.view.pan_by(dx, dy),
                GestureCommand::ZoomAround { factor, pivot } => {
                    self.view.zoom_around_point(factor, pivot.x, pivot.y)
                }
            }
            changed = true;
        }
        changed
    }

    pub fn undo(&mut self) -> Result<(), EditError> {
        let snapshot = self.history.pop().ok_or(EditError::HistoryUnderflow)?;
        self.mask.restore_from(snapshot)?;
        self.touch_mask();
        Ok(())
    }

    /// Unmasks everything; undoable like a stroke.
    pub fn clear_mask(&mut self) {
        self.history.push(self.mask.snapshot());
        self.mask.clear();
        self.touch_mask();
    }

    pub fn fit(&mut self, container_w: f32, container_h: f32) {
        let (w, h) = self.document.display_size();
        self.view.fit_to_container(container_w, container_h, w as f32, h as f32);
    }

    pub fn zoom_around_point(&mut self, factor: f32, pivot_x: f32, pivot_y: f32) {
        self.view.zoom_around_point(factor, pivot_x, pivot_y);
    }

    pub fn reset_view(&mut self) {
        self.view.reset();
    }

    /// Drops an unfinished gesture, e.g. when the pointer leaves the window.
    pub fn cancel_gesture(&mut self) {
        self.gesture.cancel();
    }

    pub fn mask_revision(&self) -> u64 {
        self.mask_revision
    }

    /// The mask changed since it was last uploaded.
    pub fn mask_dirty(&self) -> bool {
        self.mask_revision != self.uploaded_mask_revision
    }

    pub fn mark_mask_uploaded(&mut self, revision: u64) {
        self.uploaded_mask_revision = self.uploaded_mask_revision.max(revision);
    }

    pub fn needs_image_upload(&self) -> bool {
        !self.image_uploaded
    }

    pub fn mark_image_uploaded(&mut self) {
        self.image_uploaded = true;
    }

    fn touch_mask(&mut self) {
        self.mask_revision += 1;
    }
}
