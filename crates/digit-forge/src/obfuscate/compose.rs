//! Corruption stages applied after geometric distortion.
//!
//! Order is fixed: contrast/brightness jitter, noise, pixelation, inversion,
//! occlusion lines, blur. A zero intensity, count, radius, or chance (or an
//! absent range) makes the corresponding stage an identity.

use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_line_segment_mut, draw_polygon_mut};
use imageproc::point::Point;
use rand::Rng;

use digits_common::{CorruptionRecipe, NoiseModel, Span};

use super::Canvas;

/// Apply every corruption stage the recipe enables
pub fn apply<R: Rng + ?Sized>(canvas: Canvas, recipe: &CorruptionRecipe, rng: &mut R) -> Canvas {
    let mut canvas = canvas;

    if let Some(contrast) = recipe.contrast {
        canvas = adjust_contrast(canvas, contrast.sample(rng));
    }
    if let Some(brightness) = recipe.brightness {
        canvas = adjust_brightness(canvas, brightness.sample(rng));
    }

    canvas = inject_noise(canvas, recipe.noise_model, recipe.noise, rng);

    if let Some(factor) = recipe.pixelate {
        canvas = pixelate(canvas, factor.sample(rng));
    }

    // Inversions fire probabilistically even when enabled
    if recipe.invert_chance > 0.0 && rng.random_bool(recipe.invert_chance as f64) {
        canvas = invert(canvas);
    }
    if recipe.channel_invert_chance > 0.0 && rng.random_bool(recipe.channel_invert_chance as f64) {
        let channel = rng.random_range(0..3);
        canvas = invert_channel(canvas, channel);
    }

    canvas = draw_lines(canvas, recipe.lines, recipe.line_width, rng);
    blur(canvas, recipe.blur_radius)
}

/// Scale each channel's distance from the mean luminance by `factor`
pub fn adjust_contrast(canvas: Canvas, factor: f32) -> Canvas {
    if factor == 1.0 {
        return canvas;
    }

    let mut canvas = canvas;
    let pixels = (canvas.width() as u64 * canvas.height() as u64).max(1);
    let luma_sum: u64 = canvas
        .image
        .pixels()
        .map(|p| {
            let [r, g, b] = p.0;
            (r as u64 * 299 + g as u64 * 587 + b as u64 * 114) / 1000
        })
        .sum();
    let mean = (luma_sum as f32 / pixels as f32).round();

    for pixel in canvas.image.pixels_mut() {
        for channel in pixel.0.iter_mut() {
            *channel = clamp_channel(mean + factor * (*channel as f32 - mean));
        }
    }
    canvas
}

/// Multiply every channel by `factor`
pub fn adjust_brightness(canvas: Canvas, factor: f32) -> Canvas {
    if factor == 1.0 {
        return canvas;
    }

    let mut canvas = canvas;
    for pixel in canvas.image.pixels_mut() {
        for channel in pixel.0.iter_mut() {
            *channel = clamp_channel(*channel as f32 * factor);
        }
    }
    canvas
}

/// Mix random color into the canvas with the given model and intensity
pub fn inject_noise<R: Rng + ?Sized>(
    canvas: Canvas,
    model: NoiseModel,
    intensity: f32,
    rng: &mut R,
) -> Canvas {
    if intensity <= 0.0 {
        return canvas;
    }

    let mut canvas = canvas;
    let intensity = intensity.min(1.0);

    match model {
        NoiseModel::FullBlend => {
            for pixel in canvas.image.pixels_mut() {
                for channel in pixel.0.iter_mut() {
                    let noise = rng.random::<u8>() as f32;
                    *channel = clamp_channel(*channel as f32 * (1.0 - intensity) + noise * intensity);
                }
            }
        }
        NoiseModel::SparseReplace => {
            let chance = intensity as f64;
            for pixel in canvas.image.pixels_mut() {
                if rng.random_bool(chance) {
                    *pixel = random_color(rng);
                }
            }
        }
    }
    canvas
}

/// Mosaic: downsample by `factor`, then scale back up with nearest-neighbor
pub fn pixelate(canvas: Canvas, factor: u32) -> Canvas {
    if factor <= 1 {
        return canvas;
    }

    let (width, height) = canvas.image.dimensions();
    let small = imageops::resize(
        &canvas.image,
        (width / factor).max(1),
        (height / factor).max(1),
        FilterType::Nearest,
    );
    Canvas {
        image: imageops::resize(&small, width, height, FilterType::Nearest),
        background: canvas.background,
    }
}

/// Full RGB inversion
pub fn invert(canvas: Canvas) -> Canvas {
    let mut canvas = canvas;
    imageops::invert(&mut canvas.image);
    canvas
}

/// Invert a single channel (0 = red, 1 = green, 2 = blue)
pub fn invert_channel(canvas: Canvas, channel: usize) -> Canvas {
    if channel > 2 {
        return canvas;
    }

    let mut canvas = canvas;
    for pixel in canvas.image.pixels_mut() {
        pixel.0[channel] = 255 - pixel.0[channel];
    }
    canvas
}

/// Draw `count` random-color, random-width segments between random points
pub fn draw_lines<R: Rng + ?Sized>(
    canvas: Canvas,
    count: u32,
    width: Span<u32>,
    rng: &mut R,
) -> Canvas {
    let mut canvas = canvas;
    let (w, h) = canvas.image.dimensions();

    for _ in 0..count {
        let color = random_color(rng);
        let start = (rng.random_range(0..=w) as f32, rng.random_range(0..=h) as f32);
        let end = (rng.random_range(0..=w) as f32, rng.random_range(0..=h) as f32);
        let stroke = width.sample(rng).max(1);
        draw_thick_line(&mut canvas.image, start, end, stroke, color);
    }
    canvas
}

/// Gaussian blur with standard deviation `sigma`
pub fn blur(canvas: Canvas, sigma: f32) -> Canvas {
    if sigma <= 0.0 {
        return canvas;
    }
    Canvas {
        image: imageops::blur(&canvas.image, sigma),
        background: canvas.background,
    }
}

fn draw_thick_line(image: &mut RgbImage, start: (f32, f32), end: (f32, f32), stroke: u32, color: Rgb<u8>) {
    let (dx, dy) = (end.0 - start.0, end.1 - start.1);
    let length = dx.hypot(dy);
    if stroke <= 1 || length < 1.0 {
        draw_line_segment_mut(image, start, end, color);
        return;
    }

    // Quad around the segment; a half-width >= 1 never rounds to zero
    let half = stroke as f32 / 2.0;
    let (nx, ny) = (-dy / length * half, dx / length * half);
    let corner = |x: f32, y: f32| Point::new(x.round() as i32, y.round() as i32);
    let quad = [
        corner(start.0 + nx, start.1 + ny),
        corner(end.0 + nx, end.1 + ny),
        corner(end.0 - nx, end.1 - ny),
        corner(start.0 - nx, start.1 - ny),
    ];
    draw_polygon_mut(image, &quad, color);
}

fn random_color<R: Rng + ?Sized>(rng: &mut R) -> Rgb<u8> {
    Rgb([rng.random(), rng.random(), rng.random()])
}

fn clamp_channel(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}
