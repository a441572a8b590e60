//! Shared constants for Mystery Digits components.

/// Default forge HTTP listen address
pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:8890";

/// Default directory for generated artifacts
pub const DEFAULT_ARTIFACT_DIR: &str = "static/images/generated";

/// URL path under which artifacts are served
pub const DEFAULT_PUBLIC_PREFIX: &str = "/images";

/// Canvas width in pixels
pub const DEFAULT_CANVAS_WIDTH: u32 = 400;

/// Canvas height in pixels
pub const DEFAULT_CANVAS_HEIGHT: u32 = 200;

/// Smallest sampled font size
pub const DEFAULT_FONT_SIZE_MIN: u32 = 60;

/// Largest sampled font size
pub const DEFAULT_FONT_SIZE_MAX: u32 = 90;

/// Artifacts older than this are purged (60 minutes)
pub const DEFAULT_MAX_AGE_MINUTES: u64 = 60;

/// Fraction of generation requests that also run retention
pub const DEFAULT_CLEANUP_PROBABILITY: f64 = 0.1;

/// Tier used when a requested tier has no recipe
pub const DEFAULT_TIER: &str = "medium";

/// Longest tier label kept in artifact names
pub const MAX_TIER_LABEL_LEN: usize = 32;

/// Background channels are sampled from this inclusive range
pub const BACKGROUND_CHANNEL_MIN: u8 = 160;
pub const BACKGROUND_CHANNEL_MAX: u8 = 255;

/// Mean background channel above which text is drawn dark
pub const CONTRAST_CUTOFF: f32 = 180.0;

/// Artifact file naming
pub mod artifact {
    /// Every generated file starts with this marker
    pub const PREFIX: &str = "digits_";

    /// Encoded image extension
    pub const EXTENSION: &str = ".png";

    /// Suffix of files still being written
    pub const PARTIAL_SUFFIX: &str = ".partial";

    /// chrono format of the timestamp embedded in names (microsecond resolution)
    pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S_%6f";

    /// Rendered length of `TIMESTAMP_FORMAT`
    pub const TIMESTAMP_LEN: usize = 22;

    /// Random `.{:016x}` tag between a name and `PARTIAL_SUFFIX`
    pub const PARTIAL_TAG_LEN: usize = 17;

    /// Longest file name most filesystems accept, in bytes
    pub const MAX_FILENAME_LEN: usize = 255;
}

/// Longest digit string whose artifact name, with the longest tier label,
/// still fits a file name while being written as a partial file
pub const MAX_DIGITS: usize = artifact::MAX_FILENAME_LEN
    - artifact::PREFIX.len()
    - 1
    - MAX_TIER_LABEL_LEN
    - 1
    - artifact::TIMESTAMP_LEN
    - artifact::EXTENSION.len()
    - artifact::PARTIAL_TAG_LEN
    - artifact::PARTIAL_SUFFIX.len();

/// Font resources tried in order before the built-in font
pub const DEFAULT_FONT_PATHS: &[&str] = &[
    "assets/fonts/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/truetype/freefont/FreeSans.ttf",
];
