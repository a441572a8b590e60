//! Digit image obfuscation.
//!
//! A generation call renders the digits onto a fresh [`Canvas`], applies the
//! geometric stages in [`distort`], then the corruption stages in
//! [`compose`], and hands the result to the [`Forge`] for encoding and
//! persistence. Every stage takes the canvas by value and returns it, and
//! draws randomness only from the generator passed in by the caller.

pub mod compose;
pub mod distort;
mod font;
mod pipeline;
mod recipe;
mod render;

pub use font::{FontFace, GlyphMask};
pub use pipeline::{EnsuredArtifact, Forge};
pub use recipe::{BUILTIN_TIERS, RecipeBook, ResolvedRecipe};
pub use render::{GlyphRenderer, contrasting_color, random_background};

use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage};

/// Pixel buffer threaded through the pipeline
#[derive(Debug, Clone, PartialEq)]
pub struct Canvas {
    pub image: RgbImage,
    /// Color the renderer filled the canvas with
    pub background: Rgb<u8>,
}

impl Canvas {
    /// Create a canvas filled with `background`
    pub fn blank(width: u32, height: u32, background: Rgb<u8>) -> Self {
        Self {
            image: RgbImage::from_pixel(width, height, background),
            background,
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Scale uniformly to fit inside `width`x`height` and letterbox the rest with `fill`.
    ///
    /// No-op if already that size. Glyph proportions survive the resize.
    pub fn fit(self, width: u32, height: u32, fill: Rgb<u8>) -> Self {
        let (src_w, src_h) = self.image.dimensions();
        if (src_w, src_h) == (width, height) {
            return self;
        }

        let scale = (width as f32 / src_w as f32).min(height as f32 / src_h as f32);
        let content_w = ((src_w as f32 * scale).round() as u32).clamp(1, width);
        let content_h = ((src_h as f32 * scale).round() as u32).clamp(1, height);
        let resized = imageops::resize(&self.image, content_w, content_h, FilterType::Triangle);

        let mut image = RgbImage::from_pixel(width, height, fill);
        let offset_x = (width - content_w) / 2;
        let offset_y = (height - content_h) / 2;
        imageops::overlay(&mut image, &resized, offset_x as i64, offset_y as i64);

        Self {
            image,
            background: self.background,
        }
    }

    pub fn into_image(self) -> RgbImage {
        self.image
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FILL: Rgb<u8> = Rgb([255, 255, 255]);

    #[test]
    fn test_fit_resamples_expanded_canvas() {
        let canvas = Canvas::blank(431, 247, Rgb([200, 210, 220]));
        let fitted = canvas.fit(400, 200, FILL);
        assert_eq!(fitted.image.dimensions(), (400, 200));
        assert_eq!(*fitted.image.get_pixel(200, 100), Rgb([200, 210, 220]));
        // 431x247 scales to 349x200, leaving side bars
        assert_eq!(*fitted.image.get_pixel(10, 100), FILL);
        assert_eq!(fitted.background, Rgb([200, 210, 220]));
    }

    #[test]
    fn test_fit_preserves_aspect_ratio() {
        // A centered 100x100 square on a 400x400 canvas stays square at 400x200
        let mut canvas = Canvas::blank(400, 400, Rgb([220, 220, 220]));
        for y in 150..250 {
            for x in 150..250 {
                canvas.image.put_pixel(x, y, Rgb([0, 0, 0]));
            }
        }

        let fitted = canvas.fit(400, 200, FILL);
        let dark: Vec<(u32, u32)> = fitted
            .image
            .enumerate_pixels()
            .filter(|(_, _, p)| p.0[0] < 110)
            .map(|(x, y, _)| (x, y))
            .collect();
        let span = |coord: fn(&(u32, u32)) -> u32| {
            let min = dark.iter().map(coord).min().unwrap();
            let max = dark.iter().map(coord).max().unwrap();
            max - min + 1
        };
        let (w, h) = (span(|p| p.0), span(|p| p.1));
        assert!(w.abs_diff(h) <= 1, "square became {}x{}", w, h);
        assert!(w.abs_diff(50) <= 2, "square width {}", w);

        // Letterbox bars on both sides
        assert_eq!(*fitted.image.get_pixel(50, 100), FILL);
        assert_eq!(*fitted.image.get_pixel(350, 100), FILL);
    }

    #[test]
    fn test_fit_same_size_is_identity() {
        let mut canvas = Canvas::blank(40, 20, Rgb([1, 2, 3]));
        canvas.image.put_pixel(5, 5, Rgb([9, 9, 9]));
        let fitted = canvas.clone().fit(40, 20, FILL);
        assert_eq!(fitted, canvas);
    }
}
