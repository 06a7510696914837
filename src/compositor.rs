use rayon::prelude::*;
use wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;

use crate::ingest::ImageDocument;
use crate::mask::MaskBuffer;
use crate::transform::ViewTransform;

/// Output raster the view is rendered into. Rows are padded to the GPU copy alignment.
pub struct Surface {
    pub width: u32,
    pub height: u32,
    pub stride: usize,
    pub pixels: Vec<u8>,
    pub dirty: bool,
}

impl Surface {
    pub fn new(width: u32, height: u32) -> Self {
        let stride = aligned_stride(width);
        Self {
            width,
            height,
            stride,
            pixels: vec![0; stride * height as usize],
            dirty: true,
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if (width, height) == (self.width, self.height) {
            return;
        }
        *self = Surface::new(width, height);
    }

    pub fn clear(&mut self) {
        self.pixels.fill(0);
        self.dirty = true;
    }

    pub fn get_pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = y as usize * self.stride + x as usize * 4;
        let mut color = [0u8; 4];
        color.copy_from_slice(&self.pixels[idx..idx + 4]);
        Some(color)
    }
}

/// Draws the base image, then the mask at `mask_opacity`, both through `view`.
///
/// Every surface pixel is overwritten, so the result depends only on the inputs.
pub fn render(
    document: &ImageDocument,
    mask: &MaskBuffer,
    view: &ViewTransform,
    mask_opacity: f32,
    surface: &mut Surface,
) {
    let overlay = mask.as_bytes();
    if overlay.len() != document.pixels().as_raw().len() {
        log::warn!("Mask does not match the image, drawing the image only");
    }
    draw(document, Some(overlay), view, mask_opacity, surface);
}

/// Draws `document` alone, as for an inpainting result.
pub fn render_image(document: &ImageDocument, view: &ViewTransform, surface: &mut Surface) {
    draw(document, None, view, 0.0, surface);
}

fn draw(
    document: &ImageDocument,
    overlay: Option<&[u8]>,
    view: &ViewTransform,
    mask_opacity: f32,
    surface: &mut Surface,
) {
    surface.dirty = true;
    if surface.width == 0 || surface.height == 0 {
        return;
    }
    let (img_w, img_h) = document.display_size();
    let base = document.pixels().as_raw();
    let opacity = mask_opacity.clamp(0.0, 1.0);
    let width = surface.width as usize;
    let view = *view;

    surface
        .pixels
        .par_chunks_mut(surface.stride)
        .enumerate()
        .for_each(|(y, row)| {
            row.fill(0);
            // Sample at the device pixel centre.
            let img_y = ((y as f32 + 0.5 - view.offset_y) / view.scale).floor();
            if img_y < 0.0 || img_y >= img_h as f32 {
                return;
            }
            let img_row = img_y as usize * img_w as usize;

            for x in 0..width {
                let img_x = ((x as f32 + 0.5 - view.offset_x) / view.scale).floor();
                if img_x < 0.0 || img_x >= img_w as f32 {
                    continue;
                }
                let src = (img_row + img_x as usize) * 4;
                let dst = &mut row[x * 4..x * 4 + 4];
                let px = &base[src..src + 4];

                let Some(m) = overlay.and_then(|o| o.get(src..src + 4)) else {
                    dst.copy_from_slice(px);
                    continue;
                };
                let a = opacity * m[3] as f32 / 255.0;
                for c in 0..3 {
                    dst[c] = (m[c] as f32 * a + px[c] as f32 * (1.0 - a)).round() as u8;
                }
                let base_a = px[3] as f32;
                dst[3] = (base_a + (255.0 - base_a) * a).round() as u8;
            }
        });
}

fn aligned_stride(width: u32) -> usize {
    let row = width as usize * 4;
    let align = COPY_BYTES_PER_ROW_ALIGNMENT as usize;
    row.div_ceil(align) * align
}
