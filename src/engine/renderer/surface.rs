// Drawing surface backed by an RGBA image buffer

use super::Color;
use crate::engine::assets::Sprite;
use anyhow::Result;
use image::{Rgba, RgbaImage};
use std::path::Path;

/// The game's drawing surface
///
/// Coordinates are in surface pixels with the origin at the top-left.
/// Shapes are clipped to the surface bounds.
#[derive(Debug, Clone)]
pub struct Surface {
    id: String,
    buffer: RgbaImage,
    background: Color,
    smoothing: bool,
}

impl Surface {
    pub fn new(id: &str, width: u32, height: u32) -> Self {
        let background = Color::BLACK;
        Self {
            id: id.to_string(),
            buffer: RgbaImage::from_pixel(width, height, Rgba(background.to_array())),
            background,
            smoothing: false,
        }
    }

    /// Identifier the host attaches this surface under
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn width(&self) -> u32 {
        self.buffer.width()
    }

    pub fn height(&self) -> u32 {
        self.buffer.height()
    }

    /// Resize the surface. Contents are discarded.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width != self.width() || height != self.height() {
            log::debug!("Surface resized to {}x{}", width, height);
        }
        self.buffer = RgbaImage::from_pixel(width, height, Rgba(self.background.to_array()));
    }

    pub fn background(&self) -> Color {
        self.background
    }

    pub fn set_background(&mut self, color: Color) {
        self.background = color;
    }

    pub fn smoothing(&self) -> bool {
        self.smoothing
    }

    /// Bilinear filtering for scaled sprites; nearest-neighbour when off
    pub fn set_smoothing(&mut self, smoothing: bool) {
        self.smoothing = smoothing;
    }

    /// Fill the whole surface with the background color
    pub fn clear(&mut self) {
        let pixel = Rgba(self.background.to_array());
        for p in self.buffer.pixels_mut() {
            *p = pixel;
        }
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Color> {
        if x < self.width() && y < self.height() {
            let [r, g, b, a] = self.buffer.get_pixel(x, y).0;
            Some(Color::rgba(r, g, b, a))
        } else {
            None
        }
    }

    /// Fill a rectangle, blending by the color's alpha
    pub fn fill_rect(&mut self, x: f64, y: f64, w: f64, h: f64, color: Color) {
        let Some((x0, y0, x1, y1)) = self.clip(x, y, w, h) else {
            return;
        };
        for py in y0..y1 {
            for px in x0..x1 {
                blend(self.buffer.get_pixel_mut(px, py), color.to_array());
            }
        }
    }

    /// Draw a sprite scaled into the rectangle `(x, y, w, h)`
    pub fn draw_sprite(&mut self, sprite: &Sprite, x: f64, y: f64, w: f64, h: f64) {
        if sprite.width() == 0 || sprite.height() == 0 {
            return;
        }
        let Some((x0, y0, x1, y1)) = self.clip(x, y, w, h) else {
            return;
        };

        let source = sprite.image();
        let scale_x = sprite.width() as f64 / w;
        let scale_y = sprite.height() as f64 / h;

        for py in y0..y1 {
            for px in x0..x1 {
                // Sample at the pixel centre, in sprite space
                let u = (px as f64 + 0.5 - x) * scale_x;
                let v = (py as f64 + 0.5 - y) * scale_y;
                let texel = if self.smoothing {
                    sample_bilinear(source, u - 0.5, v - 0.5)
                } else {
                    sample_nearest(source, u, v)
                };
                blend(self.buffer.get_pixel_mut(px, py), texel);
            }
        }
    }

    pub fn image(&self) -> &RgbaImage {
        &self.buffer
    }

    /// Write the surface to a PNG file
    pub fn save_png(&self, path: &Path) -> Result<()> {
        self.buffer
            .save_with_format(path, image::ImageFormat::Png)?;
        log::info!("Saved surface to {}", path.display());
        Ok(())
    }

    /// Pixel bounds of a rectangle after clipping, or `None` if nothing is visible
    fn clip(&self, x: f64, y: f64, w: f64, h: f64) -> Option<(u32, u32, u32, u32)> {
        if !(w > 0.0 && h > 0.0) || !x.is_finite() || !y.is_finite() {
            return None;
        }
        let x0 = x.round().max(0.0);
        let y0 = y.round().max(0.0);
        let x1 = (x + w).round().min(self.width() as f64);
        let y1 = (y + h).round().min(self.height() as f64);
        if x0 >= x1 || y0 >= y1 {
            return None;
        }
        Some((x0 as u32, y0 as u32, x1 as u32, y1 as u32))
    }
}

fn sample_nearest(source: &RgbaImage, u: f64, v: f64) -> [u8; 4] {
    let sx = (u.floor().max(0.0) as u32).min(source.width() - 1);
    let sy = (v.floor().max(0.0) as u32).min(source.height() - 1);
    source.get_pixel(sx, sy).0
}

fn sample_bilinear(source: &RgbaImage, u: f64, v: f64) -> [u8; 4] {
    let max_x = (source.width() - 1) as f64;
    let max_y = (source.height() - 1) as f64;
    let u = u.clamp(0.0, max_x);
    let v = v.clamp(0.0, max_y);

    let (x0, y0) = (u.floor(), v.floor());
    let (x1, y1) = ((x0 + 1.0).min(max_x), (y0 + 1.0).min(max_y));
    let (tx, ty) = (u - x0, v - y0);

    let at = |x: f64, y: f64| source.get_pixel(x as u32, y as u32).0;
    let (p00, p10, p01, p11) = (at(x0, y0), at(x1, y0), at(x0, y1), at(x1, y1));

    let mut out = [0u8; 4];
    for c in 0..4 {
        let top = p00[c] as f64 * (1.0 - tx) + p10[c] as f64 * tx;
        let bottom = p01[c] as f64 * (1.0 - tx) + p11[c] as f64 * tx;
        out[c] = (top * (1.0 - ty) + bottom * ty).round() as u8;
    }
    out
}

/// Source-over alpha blend of `src` onto `dst`
fn blend(dst: &mut Rgba<u8>, src: [u8; 4]) {
    match src[3] {
        0 => {}
        255 => dst.0 = src,
        alpha => {
            let a = alpha as f64 / 255.0;
            let dst_a = dst.0[3] as f64 / 255.0;
            let out_a = a + dst_a * (1.0 - a);
            for c in 0..3 {
                let mixed = (src[c] as f64 * a + dst.0[c] as f64 * dst_a * (1.0 - a)) / out_a;
                dst.0[c] = mixed.round() as u8;
            }
            dst.0[3] = (out_a * 255.0).round() as u8;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_surface_is_background() {
        let surface = Surface::new("game-canvas", 4, 3);
        assert_eq!((surface.width(), surface.height()), (4, 3));
        assert_eq!(surface.pixel(3, 2), Some(Color::BLACK));
        assert_eq!(surface.pixel(4, 0), None);
        assert!(!surface.smoothing());
    }

    #[test]
    fn test_fill_rect_is_clipped() {
        let mut surface = Surface::new("s", 10, 10);
        surface.fill_rect(-5.0, 8.0, 7.0, 10.0, Color::WHITE);

        assert_eq!(surface.pixel(0, 9), Some(Color::WHITE));
        assert_eq!(surface.pixel(1, 8), Some(Color::WHITE));
        assert_eq!(surface.pixel(2, 8), Some(Color::BLACK));
        assert_eq!(surface.pixel(0, 7), Some(Color::BLACK));
    }

    #[test]
    fn test_fill_rect_ignores_empty_sizes() {
        let mut surface = Surface::new("s", 4, 4);
        surface.fill_rect(0.0, 0.0, 0.0, 4.0, Color::WHITE);
        surface.fill_rect(0.0, 0.0, f64::NAN, 4.0, Color::WHITE);
        assert!(surface.image().pixels().all(|p| p.0 == [0, 0, 0, 255]));
    }

    #[test]
    fn test_clear_uses_background() {
        let mut surface = Surface::new("s", 2, 2);
        surface.fill_rect(0.0, 0.0, 2.0, 2.0, Color::WHITE);
        surface.set_background(Color::rgb(10, 20, 30));
        surface.clear();
        assert_eq!(surface.pixel(1, 1), Some(Color::rgb(10, 20, 30)));
    }

    #[test]
    fn test_resize() {
        let mut surface = Surface::new("s", 2, 2);
        surface.resize(5, 1);
        assert_eq!((surface.width(), surface.height()), (5, 1));
    }

    #[test]
    fn test_half_transparent_fill_blends() {
        let mut surface = Surface::new("s", 1, 1);
        surface.fill_rect(0.0, 0.0, 1.0, 1.0, Color::rgba(255, 255, 255, 128));
        let Color { r, a, .. } = surface.pixel(0, 0).unwrap();
        assert!((126..=130).contains(&r));
        assert_eq!(a, 255);
    }

    #[test]
    fn test_draw_sprite_nearest_scaling() {
        // 2x1 sprite: red then blue, drawn 4 pixels wide
        let mut image = RgbaImage::new(2, 1);
        image.put_pixel(0, 0, Rgba([255, 0, 0, 255]));
        image.put_pixel(1, 0, Rgba([0, 0, 255, 255]));
        let sprite = Sprite::from_image("pair", image);

        let mut surface = Surface::new("s", 4, 1);
        surface.draw_sprite(&sprite, 0.0, 0.0, 4.0, 1.0);

        assert_eq!(surface.pixel(0, 0), Some(Color::rgb(255, 0, 0)));
        assert_eq!(surface.pixel(1, 0), Some(Color::rgb(255, 0, 0)));
        assert_eq!(surface.pixel(2, 0), Some(Color::rgb(0, 0, 255)));
        assert_eq!(surface.pixel(3, 0), Some(Color::rgb(0, 0, 255)));
    }

    #[test]
    fn test_draw_sprite_smoothing_mixes_texels() {
        let mut image = RgbaImage::new(2, 1);
        image.put_pixel(0, 0, Rgba([0, 0, 0, 255]));
        image.put_pixel(1, 0, Rgba([200, 200, 200, 255]));
        let sprite = Sprite::from_image("ramp", image);

        let mut surface = Surface::new("s", 4, 1);
        surface.set_smoothing(true);
        surface.draw_sprite(&sprite, 0.0, 0.0, 4.0, 1.0);

        let inner = surface.pixel(1, 0).unwrap().r;
        assert!(inner > 0 && inner < 200);
    }

    #[test]
    fn test_transparent_sprite_pixels_are_skipped() {
        let sprite = Sprite::from_color("ghost", 1, 1, [255, 255, 255, 0]);
        let mut surface = Surface::new("s", 2, 2);
        surface.draw_sprite(&sprite, 0.0, 0.0, 2.0, 2.0);
        assert_eq!(surface.pixel(0, 0), Some(Color::BLACK));
    }

    #[test]
    fn test_save_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.png");
        let mut surface = Surface::new("s", 3, 3);
        surface.fill_rect(1.0, 1.0, 1.0, 1.0, Color::WHITE);
        surface.save_png(&path).unwrap();

        let loaded = image::open(&path).unwrap().to_rgba8();
        assert_eq!(loaded.get_pixel(1, 1).0, [255, 255, 255, 255]);
    }
}
