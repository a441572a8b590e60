//! Glyph rendering onto a fresh canvas.

use image::Rgb;
use rand::Rng;

use digits_common::constants::{BACKGROUND_CHANNEL_MAX, BACKGROUND_CHANNEL_MIN, CONTRAST_CUTOFF};
use digits_common::{DigitString, Span};

use super::Canvas;
use super::font::{FontFace, GlyphMask};

/// Draws digit strings centered on a randomly tinted canvas
#[derive(Debug)]
pub struct GlyphRenderer {
    face: FontFace,
    width: u32,
    height: u32,
    font_size: Span<u32>,
}

impl GlyphRenderer {
    pub fn new(face: FontFace, width: u32, height: u32, font_size: Span<u32>) -> Self {
        Self {
            face,
            width,
            height,
            font_size,
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Render `digits` with a sampled background, contrasting ink, and font size.
    ///
    /// The rendered glyphs' bounding box is centered on the canvas.
    pub fn render<R: Rng + ?Sized>(&self, digits: &DigitString, rng: &mut R) -> Canvas {
        let background = random_background(rng);
        let ink = contrasting_color(background);
        let size = self.font_size.sample(rng).max(1);

        let mask = self.face.rasterize(digits.as_str(), size as f32, self.width);
        let mut canvas = Canvas::blank(self.width, self.height, background);
        stamp_centered(&mut canvas, &mask, ink);
        canvas
    }
}

/// Background with every channel drawn independently from the light range
pub fn random_background<R: Rng + ?Sized>(rng: &mut R) -> Rgb<u8> {
    let channel = Span::new(BACKGROUND_CHANNEL_MIN, BACKGROUND_CHANNEL_MAX);
    Rgb([channel.sample(rng), channel.sample(rng), channel.sample(rng)])
}

/// Black ink on bright backgrounds, white ink otherwise
pub fn contrasting_color(background: Rgb<u8>) -> Rgb<u8> {
    let [r, g, b] = background.0;
    let brightness = (r as f32 + g as f32 + b as f32) / 3.0;
    if brightness > CONTRAST_CUTOFF {
        Rgb([0, 0, 0])
    } else {
        Rgb([255, 255, 255])
    }
}

fn stamp_centered(canvas: &mut Canvas, mask: &GlyphMask, ink: Rgb<u8>) {
    if mask.is_empty() {
        return;
    }

    let left = (canvas.width() as i64 - mask.width as i64) / 2;
    let top = (canvas.height() as i64 - mask.height as i64) / 2;

    for my in 0..mask.height {
        let y = top + my as i64;
        if y < 0 || y >= canvas.height() as i64 {
            continue;
        }
        for mx in 0..mask.width {
            let x = left + mx as i64;
            if x < 0 || x >= canvas.width() as i64 {
                continue;
            }
            let alpha = mask.coverage(mx, my);
            if alpha <= 0.0 {
                continue;
            }
            let pixel = canvas.image.get_pixel_mut(x as u32, y as u32);
            for (channel, ink) in pixel.0.iter_mut().zip(ink.0) {
                *channel = (*channel as f32 * (1.0 - alpha) + ink as f32 * alpha).round() as u8;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn renderer() -> GlyphRenderer {
        GlyphRenderer::new(FontFace::Builtin, 400, 200, Span::new(70, 70))
    }

    /// Bounding box of pixels differing from the background
    fn ink_bounds(canvas: &Canvas) -> (u32, u32, u32, u32) {
        let mut bounds = (u32::MAX, u32::MAX, 0, 0);
        for (x, y, pixel) in canvas.image.enumerate_pixels() {
            if *pixel != canvas.background {
                bounds.0 = bounds.0.min(x);
                bounds.1 = bounds.1.min(y);
                bounds.2 = bounds.2.max(x);
                bounds.3 = bounds.3.max(y);
            }
        }
        bounds
    }

    #[test]
    fn test_background_in_light_range() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..100 {
            let bg = random_background(&mut rng);
            assert!(bg.0.iter().all(|c| *c >= BACKGROUND_CHANNEL_MIN));
        }
    }

    #[test]
    fn test_contrasting_color_threshold() {
        assert_eq!(contrasting_color(Rgb([250, 240, 230])), Rgb([0, 0, 0]));
        assert_eq!(contrasting_color(Rgb([181, 181, 181])), Rgb([0, 0, 0]));
        assert_eq!(contrasting_color(Rgb([180, 180, 180])), Rgb([255, 255, 255]));
        assert_eq!(contrasting_color(Rgb([160, 170, 175])), Rgb([255, 255, 255]));
    }

    #[test]
    fn test_render_centers_glyph_box() {
        let mut rng = StdRng::seed_from_u64(11);
        let digits = DigitString::new("4096").unwrap();
        let canvas = renderer().render(&digits, &mut rng);
        assert_eq!(canvas.image.dimensions(), (400, 200));

        let (x0, y0, x1, y1) = ink_bounds(&canvas);
        assert!(x0 <= x1 && y0 <= y1, "nothing was drawn");

        // Box center within a pixel of the canvas center
        let cx = (x0 + x1 + 1) as f32 / 2.0;
        let cy = (y0 + y1 + 1) as f32 / 2.0;
        assert!((cx - 200.0).abs() <= 1.0, "horizontal center {}", cx);
        assert!((cy - 100.0).abs() <= 1.0, "vertical center {}", cy);
    }

    #[test]
    fn test_render_uses_contrasting_ink() {
        let mut rng = StdRng::seed_from_u64(5);
        let digits = DigitString::new("8").unwrap();
        let canvas = renderer().render(&digits, &mut rng);
        let ink = contrasting_color(canvas.background);
        assert!(canvas.image.pixels().any(|p| *p == ink));
    }

    #[test]
    fn test_overlong_text_is_clipped() {
        let mut rng = StdRng::seed_from_u64(9);
        let digits = DigitString::new("1234567890123456").unwrap();
        let canvas = renderer().render(&digits, &mut rng);
        assert_eq!(canvas.image.dimensions(), (400, 200));
    }
}
