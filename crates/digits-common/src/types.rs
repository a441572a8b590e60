//! Core types shared across Mystery Digits components.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, Utc};
use rand::Rng;
use rand::distr::uniform::SampleUniform;
use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_TIER, MAX_DIGITS, MAX_TIER_LABEL_LEN, artifact};
use crate::error::DigitsError;

/// The ground truth a player must read back: one or more ASCII decimal digits.
///
/// Construction validates, so a `DigitString` in hand is always renderable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DigitString(String);

impl DigitString {
    /// Validate a pre-formatted digit string
    pub fn new(value: impl Into<String>) -> Result<Self, DigitsError> {
        let value = value.into();
        if value.is_empty() {
            return Err(DigitsError::InvalidInput("digit string is empty".to_string()));
        }
        if value.len() > MAX_DIGITS {
            return Err(DigitsError::InvalidInput(format!(
                "digit string is {} digits long, at most {} are supported",
                value.len(),
                MAX_DIGITS
            )));
        }
        if !value.bytes().all(|b| b.is_ascii_digit()) {
            return Err(DigitsError::InvalidInput(format!(
                "digit string contains non-digit characters: {:?}",
                value
            )));
        }
        Ok(Self(value))
    }

    /// Pick the digit source from a text/number pair.
    ///
    /// A numeric value takes precedence when both are present.
    pub fn resolve(text: Option<&str>, number: Option<u64>) -> Result<Self, DigitsError> {
        match (text, number) {
            (_, Some(number)) => Ok(Self::from(number)),
            (Some(text), None) => Self::new(text),
            (None, None) => Err(DigitsError::InvalidInput(
                "either a digit string or a number must be provided".to_string(),
            )),
        }
    }

    /// Random digit string of `len` digits, clamped to `1..=MAX_DIGITS`.
    ///
    /// No leading zero unless single-digit.
    pub fn random<R: Rng + ?Sized>(rng: &mut R, len: usize) -> Self {
        let len = len.clamp(1, MAX_DIGITS);
        let mut value = String::with_capacity(len);
        if len == 1 {
            value.push(char::from(b'0' + rng.random_range(0..10u8)));
        } else {
            value.push(char::from(b'1' + rng.random_range(0..9u8)));
            for _ in 1..len {
                value.push(char::from(b'0' + rng.random_range(0..10u8)));
            }
        }
        Self(value)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<u64> for DigitString {
    fn from(value: u64) -> Self {
        Self(value.to_string())
    }
}

impl TryFrom<String> for DigitString {
    type Error = DigitsError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<DigitString> for String {
    fn from(value: DigitString) -> Self {
        value.0
    }
}

impl fmt::Display for DigitString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Difficulty tag selecting a corruption recipe.
///
/// Labels are lowercase `[a-z0-9-]`, 1 to 32 characters, so they can be
/// embedded in (and recovered from) artifact names.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DifficultyTier(String);

impl DifficultyTier {
    /// Normalize a label; `None` if it cannot appear in an artifact name
    pub fn parse(label: &str) -> Option<Self> {
        let label = label.trim().to_ascii_lowercase();
        let valid = !label.is_empty()
            && label.len() <= MAX_TIER_LABEL_LEN
            && label
                .bytes()
                .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-');
        valid.then_some(Self(label))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for DifficultyTier {
    fn default() -> Self {
        Self(DEFAULT_TIER.to_string())
    }
}

impl TryFrom<String> for DifficultyTier {
    type Error = DigitsError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
            .ok_or_else(|| DigitsError::InvalidInput(format!("invalid tier label: {:?}", value)))
    }
}

impl From<DifficultyTier> for String {
    fn from(value: DifficultyTier) -> Self {
        value.0
    }
}

impl fmt::Display for DifficultyTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Inclusive sampling range
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Span<T> {
    pub min: T,
    pub max: T,
}

impl<T> Span<T> {
    pub const fn new(min: T, max: T) -> Self {
        Self { min, max }
    }
}

impl<T: SampleUniform + PartialOrd + Copy> Span<T> {
    /// Draw a value uniformly from `[min, max]`
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> T {
        if self.min < self.max {
            rng.random_range(self.min..=self.max)
        } else {
            self.min
        }
    }

    pub fn is_ordered(&self) -> bool {
        self.min <= self.max
    }
}

/// How noise is mixed into the canvas
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoiseModel {
    /// Every pixel becomes `original * (1 - i) + random * i`
    #[default]
    FullBlend,
    /// Each pixel is replaced by a random color with probability `i`
    SparseReplace,
}

/// Parameters of one difficulty tier.
///
/// Optional stages are `None` (or a zero count/intensity/chance) when the tier
/// does not use them; every field at its zero value is an identity stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorruptionRecipe {
    /// Rotation angle is sampled from `±rotation_deg`
    pub rotation_deg: f32,

    /// Wave warp amplitude scale (0 disables the warp)
    pub distortion: f32,

    /// Apply the wave warp at all
    #[serde(default = "default_true")]
    pub wave: bool,

    /// Swirl strength range
    #[serde(default)]
    pub swirl: Option<Span<f32>>,

    /// Contrast enhancement factor range (1.0 = unchanged)
    #[serde(default)]
    pub contrast: Option<Span<f32>>,

    /// Brightness enhancement factor range (1.0 = unchanged)
    #[serde(default)]
    pub brightness: Option<Span<f32>>,

    /// Noise intensity in the unit interval
    pub noise: f32,

    #[serde(default)]
    pub noise_model: NoiseModel,

    /// Mosaic block size range
    #[serde(default)]
    pub pixelate: Option<Span<u32>>,

    /// Probability of a full RGB inversion
    #[serde(default)]
    pub invert_chance: f32,

    /// Probability of inverting one random channel
    #[serde(default)]
    pub channel_invert_chance: f32,

    /// Number of occlusion lines
    pub lines: u32,

    /// Occlusion line width range in pixels
    #[serde(default = "default_line_width")]
    pub line_width: Span<u32>,

    /// Final gaussian blur sigma (0 disables)
    pub blur_radius: f32,
}

fn default_true() -> bool {
    true
}

fn default_line_width() -> Span<u32> {
    Span::new(1, 3)
}

impl CorruptionRecipe {
    /// A recipe that leaves the rendered canvas untouched
    pub fn identity() -> Self {
        Self {
            rotation_deg: 0.0,
            distortion: 0.0,
            wave: false,
            swirl: None,
            contrast: None,
            brightness: None,
            noise: 0.0,
            noise_model: NoiseModel::FullBlend,
            pixelate: None,
            invert_chance: 0.0,
            channel_invert_chance: 0.0,
            lines: 0,
            line_width: default_line_width(),
            blur_radius: 0.0,
        }
    }

    /// Check that every parameter is usable by the pipeline
    pub fn validate(&self) -> Result<(), DigitsError> {
        check_range("rotation_deg", self.rotation_deg, 0.0, 180.0)?;
        check_range("distortion", self.distortion, 0.0, f32::MAX)?;
        check_unit("noise", self.noise)?;
        check_unit("invert_chance", self.invert_chance)?;
        check_unit("channel_invert_chance", self.channel_invert_chance)?;
        check_range("blur_radius", self.blur_radius, 0.0, f32::MAX)?;

        for (name, span) in [
            ("swirl", self.swirl),
            ("contrast", self.contrast),
            ("brightness", self.brightness),
        ] {
            if let Some(span) = span {
                check_range(name, span.min, 0.0, f32::MAX)?;
                check_range(name, span.max, 0.0, f32::MAX)?;
                check_ordered(name, span)?;
            }
        }

        if let Some(pixelate) = self.pixelate {
            if pixelate.min < 2 {
                return Err(DigitsError::Config("pixelate factor must be at least 2".to_string()));
            }
            check_ordered("pixelate", pixelate)?;
        }

        if self.line_width.min < 1 {
            return Err(DigitsError::Config("line_width must be at least 1".to_string()));
        }
        check_ordered("line_width", self.line_width)
    }
}

fn check_range(name: &str, value: f32, min: f32, max: f32) -> Result<(), DigitsError> {
    if value.is_finite() && (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(DigitsError::Config(format!(
            "{} = {} is outside [{}, {}]",
            name, value, min, max
        )))
    }
}

fn check_unit(name: &str, value: f32) -> Result<(), DigitsError> {
    check_range(name, value, 0.0, 1.0)
}

fn check_ordered<T: SampleUniform + PartialOrd + Copy>(
    name: &str,
    span: Span<T>,
) -> Result<(), DigitsError> {
    if span.is_ordered() {
        Ok(())
    } else {
        Err(DigitsError::Config(format!("{} span has min > max", name)))
    }
}

/// Parsed form of `digits_<value>_<tier>_<YYYYMMDD>_<HHMMSS>_<micros>.png`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactName {
    pub digits: DigitString,
    pub tier: DifficultyTier,
    pub created_at: DateTime<Utc>,
}

impl ArtifactName {
    pub fn new(digits: DigitString, tier: DifficultyTier, created_at: DateTime<Utc>) -> Self {
        Self {
            digits,
            tier,
            created_at,
        }
    }

    pub fn filename(&self) -> String {
        format!(
            "{}{}_{}_{}{}",
            artifact::PREFIX,
            self.digits,
            self.tier,
            self.created_at.format(artifact::TIMESTAMP_FORMAT),
            artifact::EXTENSION
        )
    }

    /// Recover digits, tier, and timestamp from a file name
    pub fn parse(filename: &str) -> Result<Self, DigitsError> {
        let invalid = || DigitsError::InvalidInput(format!("not an artifact name: {:?}", filename));

        let stem = filename
            .strip_prefix(artifact::PREFIX)
            .and_then(|s| s.strip_suffix(artifact::EXTENSION))
            .ok_or_else(invalid)?;

        let parts: Vec<&str> = stem.split('_').collect();
        let [digits, tier, date, time, micros] = parts.as_slice() else {
            return Err(invalid());
        };

        let digits = DigitString::new(*digits)?;
        let tier = DifficultyTier::parse(tier).ok_or_else(invalid)?;
        let stamp = format!("{}_{}_{}", date, time, micros);
        let created_at = NaiveDateTime::parse_from_str(&stamp, artifact::TIMESTAMP_FORMAT)
            .map_err(|_| invalid())?
            .and_utc();

        Ok(Self {
            digits,
            tier,
            created_at,
        })
    }
}

impl FromStr for ArtifactName {
    type Err = DigitsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for ArtifactName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.filename())
    }
}

/// A persisted, encoded image
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedArtifact {
    /// Opaque reference handed to callers
    pub filename: String,

    /// The digit string the image encodes (server-side only)
    pub digits: DigitString,

    /// Tier label embedded in the filename
    pub tier: DifficultyTier,

    /// Tier whose recipe was actually applied (differs on fallback)
    pub recipe_tier: DifficultyTier,

    pub created_at: DateTime<Utc>,
}

/// Outcome of one retention scan
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupReport {
    /// Artifact files examined
    pub scanned: usize,
    /// Files deleted for exceeding the age threshold
    pub removed: usize,
    /// Files that could not be inspected or deleted
    pub failed: usize,
}
