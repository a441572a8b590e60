//! Font resolution and glyph rasterization.
//!
//! TrueType fonts are tried in configured order; when none loads the forge
//! keeps working with a built-in 5x7 bitmap digit font.

use std::path::{Path, PathBuf};

use rusttype::{Font, Scale, point};

/// Rows of the built-in digit glyphs, 5 bits per row (MSB = leftmost column)
const BUILTIN_DIGITS: [[u8; 7]; 10] = [
    [0b01110, 0b10001, 0b10011, 0b10101, 0b11001, 0b10001, 0b01110],
    [0b00100, 0b01100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110],
    [0b01110, 0b10001, 0b00001, 0b00010, 0b00100, 0b01000, 0b11111],
    [0b11111, 0b00010, 0b00100, 0b00010, 0b00001, 0b10001, 0b01110],
    [0b00010, 0b00110, 0b01010, 0b10010, 0b11111, 0b00010, 0b00010],
    [0b11111, 0b10000, 0b11110, 0b00001, 0b00001, 0b10001, 0b01110],
    [0b00110, 0b01000, 0b10000, 0b11110, 0b10001, 0b10001, 0b01110],
    [0b11111, 0b00001, 0b00010, 0b00100, 0b01000, 0b01000, 0b01000],
    [0b01110, 0b10001, 0b10001, 0b01110, 0b10001, 0b10001, 0b01110],
    [0b01110, 0b10001, 0b10001, 0b01111, 0b00001, 0b00010, 0b01100],
];

const BUILTIN_COLUMNS: u32 = 5;
const BUILTIN_ROWS: u32 = 7;

/// A resolved font
pub enum FontFace {
    TrueType {
        font: Font<'static>,
        source: PathBuf,
    },
    Builtin,
}

impl std::fmt::Debug for FontFace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TrueType { source, .. } => f.debug_tuple("TrueType").field(source).finish(),
            Self::Builtin => f.write_str("Builtin"),
        }
    }
}

impl FontFace {
    /// Load the first usable font in `paths`, or fall back to the built-in font
    pub fn load(paths: &[PathBuf]) -> Self {
        for path in paths {
            match Self::load_file(path) {
                Some(face) => {
                    tracing::info!(font = %path.display(), "Loaded glyph font");
                    return face;
                }
                None => tracing::debug!(font = %path.display(), "Font unavailable"),
            }
        }

        tracing::warn!(
            tried = paths.len(),
            "No font resource available, using built-in digit font"
        );
        Self::Builtin
    }

    fn load_file(path: &Path) -> Option<Self> {
        let bytes = std::fs::read(path).ok()?;
        let font = Font::try_from_vec(bytes)?;
        Some(Self::TrueType {
            font,
            source: path.to_path_buf(),
        })
    }

    pub fn is_builtin(&self) -> bool {
        matches!(self, Self::Builtin)
    }

    /// Rasterize `text` into a coverage mask cropped to the inked pixels.
    ///
    /// Layout stops at the first glyph that starts at or beyond `max_width`,
    /// so the mask never grows with text that could not be shown anyway. The
    /// first glyph is always laid out.
    pub fn rasterize(&self, text: &str, size: f32, max_width: u32) -> GlyphMask {
        match self {
            Self::TrueType { font, .. } => rasterize_truetype(font, text, size, max_width),
            Self::Builtin => rasterize_builtin(text, size, max_width),
        }
    }
}

/// Glyph coverage (0.0..=1.0) over the tight bounding box of the rendered text
#[derive(Debug, Clone, PartialEq)]
pub struct GlyphMask {
    pub width: u32,
    pub height: u32,
    coverage: Vec<f32>,
}

impl GlyphMask {
    fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            coverage: vec![0.0; (width as usize) * (height as usize)],
        }
    }

    pub fn coverage(&self, x: u32, y: u32) -> f32 {
        self.coverage[(y * self.width + x) as usize]
    }

    fn cover(&mut self, x: u32, y: u32, value: f32) {
        if x < self.width && y < self.height {
            let cell = &mut self.coverage[(y * self.width + x) as usize];
            *cell = cell.max(value.clamp(0.0, 1.0));
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

fn rasterize_truetype(font: &Font<'static>, text: &str, size: f32, max_width: u32) -> GlyphMask {
    let scale = Scale::uniform(size);
    let v_metrics = font.v_metrics(scale);
    let glyphs: Vec<_> = font
        .layout(text, scale, point(0.0, v_metrics.ascent))
        .enumerate()
        .take_while(|(i, g)| *i == 0 || g.position().x < max_width as f32)
        .map(|(_, g)| g)
        .collect();

    // Pixel boxes are relative to the layout origin and may start at
    // negative or non-zero offsets, so crop to their union
    let bounds = glyphs
        .iter()
        .filter_map(|g| g.pixel_bounding_box())
        .fold(None, |acc: Option<(i32, i32, i32, i32)>, bb| {
            Some(match acc {
                None => (bb.min.x, bb.min.y, bb.max.x, bb.max.y),
                Some((x0, y0, x1, y1)) => (
                    x0.min(bb.min.x),
                    y0.min(bb.min.y),
                    x1.max(bb.max.x),
                    y1.max(bb.max.y),
                ),
            })
        });

    let Some((min_x, min_y, max_x, max_y)) = bounds else {
        return GlyphMask::new(0, 0);
    };

    let mut mask = GlyphMask::new((max_x - min_x) as u32, (max_y - min_y) as u32);
    for glyph in &glyphs {
        if let Some(bb) = glyph.pixel_bounding_box() {
            let ox = (bb.min.x - min_x) as u32;
            let oy = (bb.min.y - min_y) as u32;
            glyph.draw(|x, y, v| mask.cover(ox + x, oy + y, v));
        }
    }
    mask
}

fn rasterize_builtin(text: &str, size: f32, max_width: u32) -> GlyphMask {
    let cell = ((size / BUILTIN_ROWS as f32).round() as u32).max(1);
    // One blank column between glyphs
    let advance = (BUILTIN_COLUMNS + 1) * cell;

    let fits = (max_width.saturating_add(cell) / advance).max(1) as usize;
    let count = text.chars().count().min(fits) as u32;
    if count == 0 {
        return GlyphMask::new(0, 0);
    }

    let width = count * advance - cell;
    let height = BUILTIN_ROWS * cell;
    let mut mask = GlyphMask::new(width, height);

    for (i, ch) in text.chars().take(count as usize).enumerate() {
        let Some(digit) = ch.to_digit(10) else {
            continue;
        };
        let rows = &BUILTIN_DIGITS[digit as usize];
        let left = i as u32 * advance;
        for (row, bits) in rows.iter().enumerate() {
            for col in 0..BUILTIN_COLUMNS {
                if bits & (1 << (BUILTIN_COLUMNS - 1 - col)) == 0 {
                    continue;
                }
                for dy in 0..cell {
                    for dx in 0..cell {
                        mask.cover(left + col * cell + dx, row as u32 * cell + dy, 1.0);
                    }
                }
            }
        }
    }
    mask
}
