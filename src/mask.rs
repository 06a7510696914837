use std::io::Cursor;

use image::codecs::png::PngEncoder;
use image::imageops::{self, FilterType};
use image::{ExtendedColorType, ImageEncoder, ImageReader};

use crate::error::EditError;

/// The only two values a mask pixel may hold.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum MaskValue {
    Unmasked = 0,
    Masked = 255,
}

impl MaskValue {
    // Service binarization threshold.
    const THRESHOLD: u8 = 127;

    pub fn from_luma(luma: u8) -> Self {
        if luma < Self::THRESHOLD {
            MaskValue::Unmasked
        } else {
            MaskValue::Masked
        }
    }

    fn rgba(self) -> [u8; 4] {
        let v = self as u8;
        [v, v, v, 255]
    }
}

/// Binary inpainting mask stored as tight-packed RGBA8, one entry per display pixel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MaskBuffer {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

/// Independent copy of a mask, used by the undo history.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MaskSnapshot {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl MaskSnapshot {
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

impl MaskBuffer {
    /// A fully unmasked buffer (black, opaque).
    pub fn new(width: u32, height: u32) -> Self {
        let mut pixels = vec![0u8; width as usize * height as usize * 4];
        for px in pixels.chunks_exact_mut(4) {
            px[3] = 255;
        }
        Self {
            width,
            height,
            pixels,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.pixels
    }

    pub fn value_at(&self, x: u32, y: u32) -> Option<MaskValue> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = self.index(x, y);
        Some(if self.pixels[idx] == 255 { MaskValue::Masked } else { MaskValue::Unmasked })
    }

    pub fn masked_pixels(&self) -> usize {
        self.pixels.chunks_exact(4).filter(|px| px[0] == 255).count()
    }

    pub fn is_blank(&self) -> bool {
        self.masked_pixels() == 0
    }

    fn index(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * 4
    }

    fn put(&mut self, x: u32, y: u32, value: MaskValue) {
        let idx = self.index(x, y);
        self.pixels[idx..idx + 4].copy_from_slice(&value.rgba());
    }

    /// Sets every pixel whose integer coordinate lies within `radius` of `(cx, cy)`.
    pub fn stamp_circle(&mut self, cx: f32, cy: f32, radius: f32, value: MaskValue) {
        if !(radius > 0.0) || !radius.is_finite() || !cx.is_finite() || !cy.is_finite() {
            return;
        }
        if self.width == 0 || self.height == 0 {
            return;
        }
        let r2 = radius * radius;
        let min_x = (cx - radius).floor().max(0.0) as i64;
        let max_x = (cx + radius).ceil().min((self.width - 1) as f32) as i64;
        let min_y = (cy - radius).floor().max(0.0) as i64;
        let max_y = (cy + radius).ceil().min((self.height - 1) as f32) as i64;

        for y in min_y..=max_y {
            for x in min_x..=max_x {
                let dx = x as f32 - cx;
                let dy = y as f32 - cy;
                if dx * dx + dy * dy <= r2 {
                    self.put(x as u32, y as u32, value);
                }
            }
        }
    }

    /// Stamps circles along the segment no more than one pixel apart, endpoints included.
    pub fn stamp_segment(
        &mut self,
        x1: f32,
        y1: f32,
        x2: f32,
        y2: f32,
        radius: f32,
        value: MaskValue,
    ) {
        let dx = x2 - x1;
        let dy = y2 - y1;
        let dist = (dx * dx + dy * dy).sqrt();
        if dist == 0.0 || !dist.is_finite() {
            self.stamp_circle(x1, y1, radius, value);
            return;
        }
        let steps = dist.ceil();
        for k in 0..=steps as u32 {
            let k = k as f32;
            self.stamp_circle(x1 + dx * k / steps, y1 + dy * k / steps, radius, value);
        }
    }

    pub fn clear(&mut self) {
        for px in self.pixels.chunks_exact_mut(4) {
            px.copy_from_slice(&MaskValue::Unmasked.rgba());
        }
    }

    pub fn snapshot(&self) -> MaskSnapshot {
        MaskSnapshot {
            width: self.width,
            height: self.height,
            pixels: self.pixels.clone(),
        }
    }

    /// Installs a copy of `snapshot` as the live buffer.
    pub fn restore(&mut self, snapshot: &MaskSnapshot) -> Result<(), EditError> {
        self.check_size(snapshot)?;
        self.pixels.copy_from_slice(&snapshot.pixels);
        Ok(())
    }

    /// Installs `snapshot` as the live buffer, taking its storage.
    pub fn restore_from(&mut self, snapshot: MaskSnapshot) -> Result<(), EditError> {
        self.check_size(&snapshot)?;
        self.pixels = snapshot.pixels;
        Ok(())
    }

    fn check_size(&self, snapshot: &MaskSnapshot) -> Result<(), EditError> {
        if snapshot.dimensions() != (self.width, self.height) {
            return Err(EditError::MaskSize {
                expected: (self.width, self.height),
                actual: snapshot.dimensions(),
            });
        }
        Ok(())
    }

    /// Encodes the buffer unchanged as an RGBA8 PNG.
    pub fn to_png(&self) -> Result<Vec<u8>, image::ImageError> {
        let mut out = Vec::new();
        PngEncoder::new(&mut out).write_image(
            &self.pixels,
            self.width,
            self.height,
            ExtendedColorType::Rgba8,
        )?;
        Ok(out)
    }

    /// Decodes a stored mask, resizing it to `width`×`height` and re-binarizing.
    pub fn from_png(bytes: &[u8], width: u32, height: u32) -> Result<Self, image::ImageError> {
        let decoded = ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()?
            .decode()?
            .to_luma8();
        let luma = if decoded.dimensions() != (width, height) {
            log::debug!(
                "Resizing stored mask {:?} -> {}x{}",
                decoded.dimensions(),
                width,
                height
            );
            imageops::resize(&decoded, width, height, FilterType::Nearest)
        } else {
            decoded
        };

        let mut mask = MaskBuffer::new(width, height);
        for (x, y, px) in luma.enumerate_pixels() {
            mask.put(x, y, MaskValue::from_luma(px.0[0]));
        }
        Ok(mask)
    }
}
