pub const MIN_SCALE: f32 = 0.1;
pub const MAX_SCALE: f32 = 10.0;

/// Maps image point `(ix, iy)` to device point `(ix * scale + offset_x, iy * scale + offset_y)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewTransform {
    pub scale: f32,
    pub offset_x: f32,
    pub offset_y: f32,
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self {
            scale: 1.0,
            offset_x: 0.0,
            offset_y: 0.0,
        }
    }
}

impl ViewTransform {
    pub fn to_image_space(&self, device_x: f32, device_y: f32) -> (f32, f32) {
        (
            (device_x - self.offset_x) / self.scale,
            (device_y - self.offset_y) / self.scale,
        )
    }

    pub fn to_device_space(&self, image_x: f32, image_y: f32) -> (f32, f32) {
        (
            image_x * self.scale + self.offset_x,
            image_y * self.scale + self.offset_y,
        )
    }

    /// Rescales by `factor` keeping the image point under `(pivot_x, pivot_y)` in place.
    pub fn zoom_around_point(&mut self, factor: f32, pivot_x: f32, pivot_y: f32) {
        if !(factor > 0.0) || !factor.is_finite() {
            return;
        }
        let old_scale = self.scale;
        let new_scale = (old_scale * factor).clamp(MIN_SCALE, MAX_SCALE);
        let ratio = new_scale / old_scale;
        self.offset_x = pivot_x - (pivot_x - self.offset_x) * ratio;
        self.offset_y = pivot_y - (pivot_y - self.offset_y) * ratio;
        self.scale = new_scale;
    }

    pub fn pan_by(&mut self, dx: f32, dy: f32) {
        self.offset_x += dx;
        self.offset_y += dy;
    }

    /// Largest scale showing the whole image, centred in the container.
    pub fn fit_to_container(
        &mut self,
        container_w: f32,
        container_h: f32,
        image_w: f32,
        image_h: f32,
    ) {
        if image_w <= 0.0 || image_h <= 0.0 || container_w <= 0.0 || container_h <= 0.0 {
            return;
        }
        let scale = (container_w / image_w)
            .min(container_h / image_h)
            .clamp(MIN_SCALE, MAX_SCALE);
        self.scale = scale;
        self.offset_x = (container_w - image_w * scale) / 2.0;
        self.offset_y = (container_h - image_h * scale) / 2.0;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
