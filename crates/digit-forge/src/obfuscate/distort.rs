//! Geometric distortion stages.
//!
//! Each stage is a pixel remap: for every destination pixel a source
//! coordinate is computed and sampled nearest-neighbor. Out-of-range sources
//! are handled per stage: rotation fills with white, wave clamps to the
//! nearest edge, swirl leaves the canvas background.

use std::f32::consts::TAU;

use image::{Rgb, RgbImage};
use imageproc::geometric_transformations::{Interpolation, warp_into_with, warp_with};
use rand::Rng;

use digits_common::{CorruptionRecipe, Span};

use super::Canvas;

/// Horizontal wave offset at distortion 1.0, in pixels
pub const WAVE_AMPLITUDE_X: f32 = 15.0;
/// Vertical wave offset at distortion 1.0, in pixels
pub const WAVE_AMPLITUDE_Y: f32 = 10.0;
/// Period (in rows) of the horizontal offset
pub const WAVE_PERIOD_Y: f32 = 40.0;
/// Period (in columns) of the vertical offset
pub const WAVE_PERIOD_X: f32 = 50.0;

/// Fill for the corners exposed by rotation
pub const ROTATION_FILL: Rgb<u8> = Rgb([255, 255, 255]);

/// Apply the enabled geometric stages in order: rotation, wave, swirl
pub fn apply<R: Rng + ?Sized>(canvas: Canvas, recipe: &CorruptionRecipe, rng: &mut R) -> Canvas {
    let mut canvas = canvas;

    if recipe.rotation_deg > 0.0 {
        let bound = recipe.rotation_deg;
        canvas = rotate(canvas, Span::new(-bound, bound).sample(rng));
    }
    if recipe.wave {
        canvas = wave(canvas, recipe.distortion);
    }
    if let Some(strength) = recipe.swirl {
        canvas = swirl(canvas, strength.sample(rng));
    }

    canvas
}

/// Rotate by `degrees` about the center, growing the canvas to fit
pub fn rotate(canvas: Canvas, degrees: f32) -> Canvas {
    if degrees == 0.0 {
        return canvas;
    }

    let (width, height) = canvas.image.dimensions();
    let (sin, cos) = degrees.to_radians().sin_cos();
    let (w, h) = (width as f32, height as f32);

    // Small epsilon keeps float noise from adding a spurious row/column
    let new_width = ((w * cos.abs() + h * sin.abs()) - 1e-3).ceil().max(1.0) as u32;
    let new_height = ((w * sin.abs() + h * cos.abs()) - 1e-3).ceil().max(1.0) as u32;

    let (cx, cy) = (w / 2.0, h / 2.0);
    let (ncx, ncy) = (new_width as f32 / 2.0, new_height as f32 / 2.0);

    let mut image = RgbImage::new(new_width, new_height);
    warp_into_with(
        &canvas.image,
        |x, y| {
            let dx = x + 0.5 - ncx;
            let dy = y + 0.5 - ncy;
            // Inverse rotation back into the source frame
            let sx = cos * dx + sin * dy + cx;
            let sy = -sin * dx + cos * dy + cy;
            to_nearest(sx, sy)
        },
        Interpolation::Nearest,
        ROTATION_FILL,
        &mut image,
    );

    Canvas {
        image,
        background: canvas.background,
    }
}

/// Sinusoidal warp; sources outside the canvas clamp to the edge
pub fn wave(canvas: Canvas, amplitude: f32) -> Canvas {
    if amplitude == 0.0 {
        return canvas;
    }

    let (width, height) = canvas.image.dimensions();
    let ax = amplitude * WAVE_AMPLITUDE_X;
    let ay = amplitude * WAVE_AMPLITUDE_Y;
    let src = &canvas.image;

    let image = RgbImage::from_fn(width, height, |x, y| {
        let offset_x = (ax * (TAU * y as f32 / WAVE_PERIOD_Y).sin()).round() as i64;
        let offset_y = (ay * (TAU * x as f32 / WAVE_PERIOD_X).cos()).round() as i64;
        let sx = (x as i64 + offset_x).clamp(0, width as i64 - 1);
        let sy = (y as i64 + offset_y).clamp(0, height as i64 - 1);
        *src.get_pixel(sx as u32, sy as u32)
    });

    Canvas {
        image,
        background: canvas.background,
    }
}

/// Twist around the center by `strength * r / width` radians.
///
/// Destination pixels whose source falls outside the canvas keep the
/// background color rather than clamping.
pub fn swirl(canvas: Canvas, strength: f32) -> Canvas {
    if strength == 0.0 {
        return canvas;
    }

    let (width, height) = canvas.image.dimensions();
    let (w, h) = (width as f32, height as f32);
    let (cx, cy) = (w / 2.0, h / 2.0);
    let background = canvas.background;

    let image = warp_with(
        &canvas.image,
        |x, y| {
            let dx = x - cx;
            let dy = y - cy;
            let radius = dx.hypot(dy);
            let theta = dy.atan2(dx) + strength * radius / w;
            to_nearest(cx + radius * theta.cos(), cy + radius * theta.sin())
        },
        Interpolation::Nearest,
        background,
    );

    Canvas { image, background }
}

/// Nearest interpolation rounds; shift so it picks the pixel containing `(x, y)`
fn to_nearest(x: f32, y: f32) -> (f32, f32) {
    (x - 0.5, y - 0.5)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn striped(width: u32, height: u32) -> Canvas {
        let mut canvas = Canvas::blank(width, height, Rgb([230, 220, 210]));
        for (x, y, pixel) in canvas.image.enumerate_pixels_mut() {
            if (x / 7 + y / 5) % 2 == 0 {
                *pixel = Rgb([(x % 256) as u8, (y % 256) as u8, 40]);
            }
        }
        canvas
    }

    #[test]
    fn test_wave_zero_amplitude_is_identity() {
        let canvas = striped(400, 200);
        assert_eq!(wave(canvas.clone(), 0.0), canvas);
    }

    #[test]
    fn test_wave_subpixel_amplitude_is_identity() {
        // Offsets round to zero, so the clamped copy is exact
        let canvas = striped(120, 80);
        assert_eq!(wave(canvas.clone(), 0.01), canvas);
    }

    #[test]
    fn test_wave_moves_pixels() {
        let canvas = striped(120, 80);
        let warped = wave(canvas.clone(), 0.8);
        assert_eq!(warped.image.dimensions(), (120, 80));
        assert_ne!(warped, canvas);
    }

    #[test]
    fn test_rotate_expands_and_fills_white() {
        let canvas = Canvas::blank(400, 200, Rgb([200, 200, 200]));
        let rotated = rotate(canvas, 20.0);
        let (w, h) = rotated.image.dimensions();
        assert!(w > 400 && h > 200, "rotated to {}x{}", w, h);
        assert_eq!(*rotated.image.get_pixel(0, 0), ROTATION_FILL);
        assert_eq!(*rotated.image.get_pixel(w / 2, h / 2), Rgb([200, 200, 200]));
        assert_eq!(rotated.background, Rgb([200, 200, 200]));
    }

    #[test]
    fn test_rotate_quarter_turn_is_exact() {
        let mut canvas = Canvas::blank(4, 2, Rgb([0, 0, 0]));
        for (x, y, pixel) in canvas.image.enumerate_pixels_mut() {
            *pixel = Rgb([x as u8 * 10, y as u8 * 10, 1]);
        }

        let rotated = rotate(canvas.clone(), 90.0);
        assert_eq!(rotated.image.dimensions(), (2, 4));
        for y in 0..4 {
            assert_eq!(rotated.image.get_pixel(0, y), canvas.image.get_pixel(y, 1));
            assert_eq!(rotated.image.get_pixel(1, y), canvas.image.get_pixel(y, 0));
        }
    }

    #[test]
    fn test_rotate_zero_keeps_size() {
        let canvas = striped(50, 30);
        assert_eq!(rotate(canvas.clone(), 0.0), canvas);
    }

    #[test]
    fn test_swirl_corners_keep_background() {
        let background = Rgb([180, 190, 200]);
        let mut canvas = Canvas::blank(200, 100, background);
        for pixel in canvas.image.pixels_mut() {
            *pixel = Rgb([0, 0, 0]);
        }

        let swirled = swirl(canvas, 3.0);
        let (w, h) = swirled.image.dimensions();
        // Corners rotate to sources outside the short axis
        let corners = [(0, 0), (w - 1, 0), (0, h - 1), (w - 1, h - 1)];
        assert!(
            corners
                .iter()
                .any(|&(x, y)| *swirled.image.get_pixel(x, y) == background)
        );
        // The center never moves
        assert_eq!(*swirled.image.get_pixel(w / 2, h / 2), Rgb([0, 0, 0]));
    }

    #[test]
    fn test_apply_identity_recipe() {
        let mut rng = StdRng::seed_from_u64(2);
        let canvas = striped(80, 40);
        let out = apply(canvas.clone(), &CorruptionRecipe::identity(), &mut rng);
        assert_eq!(out, canvas);
    }

    #[test]
    fn test_apply_tolerates_wave_and_swirl() {
        let mut rng = StdRng::seed_from_u64(4);
        let mut recipe = CorruptionRecipe::identity();
        recipe.rotation_deg = 10.0;
        recipe.wave = true;
        recipe.distortion = 0.5;
        recipe.swirl = Some(Span::new(1.0, 2.0));

        let out = apply(striped(100, 50), &recipe, &mut rng);
        assert!(out.width() >= 100 && out.height() >= 50);
    }
}
