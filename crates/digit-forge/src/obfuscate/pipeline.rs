//! End-to-end generation: render, distort, compose, encode, persist.

use std::io::Cursor;

use chrono::{SubsecRound, Utc};
use image::{DynamicImage, ImageFormat, RgbImage};
use rand::Rng;

use digits_common::{
    ArtifactName, CleanupReport, CorruptionRecipe, DifficultyTier, DigitString, DigitsError,
    GeneratedArtifact,
};

use super::font::FontFace;
use super::recipe::RecipeBook;
use super::render::GlyphRenderer;
use super::{Canvas, compose, distort};
use crate::config::AppConfig;
use crate::store::ArtifactStore;

/// Obfuscation pipeline bound to a recipe book and an artifact directory.
///
/// Holds no per-call state; share it behind an `Arc` and call from any
/// number of threads.
#[derive(Debug)]
pub struct Forge {
    renderer: GlyphRenderer,
    recipes: RecipeBook,
    store: ArtifactStore,
}

/// Result of [`Forge::ensure`]
#[derive(Debug, Clone)]
pub struct EnsuredArtifact {
    pub artifact: GeneratedArtifact,
    /// The referenced file was missing and a new one was produced
    pub regenerated: bool,
}

impl Forge {
    pub fn new(renderer: GlyphRenderer, recipes: RecipeBook, store: ArtifactStore) -> Self {
        Self {
            renderer,
            recipes,
            store,
        }
    }

    /// Build a forge from validated application config
    pub fn from_config(config: &AppConfig) -> Result<Self, DigitsError> {
        let recipes = RecipeBook::from_config(&config.default_tier, &config.recipes)?;
        let face = FontFace::load(&config.image.font_paths);
        let renderer = GlyphRenderer::new(
            face,
            config.image.width,
            config.image.height,
            config.image.font_size,
        );
        let store = ArtifactStore::new(&config.artifact_dir);

        Ok(Self::new(renderer, recipes, store))
    }

    pub fn recipes(&self) -> &RecipeBook {
        &self.recipes
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    /// Generate an artifact for raw text input.
    ///
    /// Fails with `InvalidInput` before any work if `digits` is empty, longer
    /// than `MAX_DIGITS`, or contains anything other than ASCII digits.
    pub fn generate(&self, digits: &str, tier: &str) -> Result<GeneratedArtifact, DigitsError> {
        let digits = DigitString::new(digits)?;
        self.generate_digits(&digits, tier)
    }

    pub fn generate_digits(
        &self,
        digits: &DigitString,
        tier: &str,
    ) -> Result<GeneratedArtifact, DigitsError> {
        self.generate_with_rng(digits, tier, &mut rand::rng())
    }

    /// Generate with a caller-supplied random source
    pub fn generate_with_rng<R: Rng + ?Sized>(
        &self,
        digits: &DigitString,
        tier: &str,
        rng: &mut R,
    ) -> Result<GeneratedArtifact, DigitsError> {
        let requested = DifficultyTier::parse(tier).unwrap_or_else(|| {
            tracing::debug!(tier = %tier, "Unusable tier label, using default");
            self.recipes.default_tier().clone()
        });

        let resolved = self.recipes.resolve(&requested);
        if resolved.fallback {
            tracing::debug!(
                tier = %requested,
                recipe_tier = %resolved.tier,
                "Unknown tier, applying default recipe"
            );
        }

        let canvas = self.obfuscate(digits, resolved.recipe, rng);
        let bytes = encode_png(canvas.into_image())?;

        let created_at = Utc::now().trunc_subsecs(6);
        let filename = ArtifactName::new(digits.clone(), requested.clone(), created_at).filename();
        self.store.persist(&filename, &bytes)?;

        tracing::debug!(
            filename = %filename,
            tier = %requested,
            recipe_tier = %resolved.tier,
            bytes = bytes.len(),
            "Generated artifact"
        );

        Ok(GeneratedArtifact {
            filename,
            digits: digits.clone(),
            tier: requested,
            recipe_tier: resolved.tier.clone(),
            created_at,
        })
    }

    /// Run the image stages without touching the store
    pub fn obfuscate<R: Rng + ?Sized>(
        &self,
        digits: &DigitString,
        recipe: &CorruptionRecipe,
        rng: &mut R,
    ) -> Canvas {
        let (width, height) = self.renderer.dimensions();
        let canvas = self.renderer.render(digits, rng);
        let canvas =
            distort::apply(canvas, recipe, rng).fit(width, height, distort::ROTATION_FILL);
        compose::apply(canvas, recipe, rng)
    }

    /// Return the referenced artifact, regenerating it if the file is gone
    pub fn ensure(&self, filename: &str) -> Result<EnsuredArtifact, DigitsError> {
        let name = ArtifactName::parse(filename)?;

        if self.store.exists(filename) {
            let recipe_tier = self.recipes.resolve(&name.tier).tier.clone();
            return Ok(EnsuredArtifact {
                artifact: GeneratedArtifact {
                    filename: filename.to_string(),
                    digits: name.digits,
                    tier: name.tier,
                    recipe_tier,
                    created_at: name.created_at,
                },
                regenerated: false,
            });
        }

        tracing::info!(filename = %filename, "Artifact missing, regenerating");
        let artifact = self.generate_digits(&name.digits, name.tier.as_str())?;
        Ok(EnsuredArtifact {
            artifact,
            regenerated: true,
        })
    }

    /// Purge artifacts older than `max_age_minutes`; never fails
    pub fn cleanup(&self, max_age_minutes: u64) -> CleanupReport {
        self.store.cleanup(max_age_minutes)
    }
}

fn encode_png(image: RgbImage) -> Result<Vec<u8>, DigitsError> {
    let mut bytes = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(image)
        .write_to(&mut bytes, ImageFormat::Png)
        .map_err(|e| DigitsError::Encode(e.to_string()))?;
    Ok(bytes.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::path::Path;

    use digits_common::Span;
    use digits_common::constants::{MAX_DIGITS, MAX_TIER_LABEL_LEN};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use crate::obfuscate::BUILTIN_TIERS;

    fn forge(dir: &Path) -> Forge {
        let renderer = GlyphRenderer::new(FontFace::Builtin, 400, 200, Span::new(60, 90));
        Forge::new(renderer, RecipeBook::builtin(), ArtifactStore::new(dir))
    }

    fn decode(dir: &Path, filename: &str) -> RgbImage {
        image::open(dir.join(filename)).unwrap().to_rgb8()
    }

    fn is_well_formed(filename: &str, digits: &str, tier: &str) -> bool {
        let Some(rest) = filename.strip_prefix(&format!("digits_{}_{}_", digits, tier)) else {
            return false;
        };
        let Some(stamp) = rest.strip_suffix(".png") else {
            return false;
        };
        let parts: Vec<&str> = stamp.split('_').collect();
        parts.len() == 3
            && [8, 6, 6]
                .iter()
                .zip(&parts)
                .all(|(len, part)| part.len() == *len && part.bytes().all(|b| b.is_ascii_digit()))
    }

    #[test]
    fn test_generate_every_tier_and_length() {
        let dir = tempfile::tempdir().unwrap();
        let forge = forge(dir.path());
        let mut rng = StdRng::seed_from_u64(17);

        for tier in BUILTIN_TIERS {
            for len in 1..=6 {
                let digits = DigitString::random(&mut rng, len);
                let artifact = forge.generate_with_rng(&digits, tier, &mut rng).unwrap();

                assert!(
                    is_well_formed(&artifact.filename, digits.as_str(), tier),
                    "bad name {}",
                    artifact.filename
                );
                assert_eq!(artifact.recipe_tier.as_str(), tier);
                assert_eq!(decode(dir.path(), &artifact.filename).dimensions(), (400, 200));
            }
        }
    }

    #[test]
    fn test_unknown_tier_uses_default_recipe() {
        let dir = tempfile::tempdir().unwrap();
        let forge = forge(dir.path());

        let artifact = forge.generate("314", "legendary").unwrap();
        assert!(is_well_formed(&artifact.filename, "314", "legendary"));
        assert_eq!(artifact.recipe_tier.as_str(), "medium");

        // Labels that cannot appear in a file name collapse to the default tier
        let artifact = forge.generate("314", "../../x").unwrap();
        assert!(is_well_formed(&artifact.filename, "314", "medium"));
    }

    #[test]
    fn test_invalid_input_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let forge = forge(dir.path());

        for input in ["", "12a4", "-5", "1 2", "٣"] {
            assert!(
                matches!(forge.generate(input, "easy"), Err(DigitsError::InvalidInput(_))),
                "accepted {:?}",
                input
            );
        }
        assert_eq!(std::fs::read_dir(dir.path()).map_or(0, |d| d.count()), 0);
    }

    #[test]
    fn test_overlong_digits_rejected_before_rendering() {
        let dir = tempfile::tempdir().unwrap();
        let forge = forge(dir.path());

        for len in [MAX_DIGITS + 1, 300, 2_000_000] {
            let err = forge.generate(&"8".repeat(len), "easy").unwrap_err();
            assert!(matches!(err, DigitsError::InvalidInput(_)), "{} digits: {}", len, err);
            assert!(!err.is_retryable());
        }
        assert_eq!(std::fs::read_dir(dir.path()).map_or(0, |d| d.count()), 0);
    }

    #[test]
    fn test_longest_digits_and_tier_persist() {
        let dir = tempfile::tempdir().unwrap();
        let forge = forge(dir.path());
        let digits = "8".repeat(MAX_DIGITS);
        let tier = "t".repeat(MAX_TIER_LABEL_LEN);

        let artifact = forge.generate(&digits, &tier).unwrap();
        assert!(is_well_formed(&artifact.filename, &digits, &tier));
        assert_eq!(decode(dir.path(), &artifact.filename).dimensions(), (400, 200));

        let ensured = forge.ensure(&artifact.filename).unwrap();
        assert!(!ensured.regenerated);
    }

    #[test]
    fn test_repeated_calls_differ() {
        let dir = tempfile::tempdir().unwrap();
        let forge = forge(dir.path());

        let first = forge.generate("4242", "hard").unwrap();
        let second = forge.generate("4242", "hard").unwrap();
        assert_ne!(first.filename, second.filename);
        assert_ne!(
            decode(dir.path(), &first.filename),
            decode(dir.path(), &second.filename)
        );
    }

    #[test]
    fn test_concurrent_generation() {
        let dir = tempfile::tempdir().unwrap();
        let forge = forge(dir.path());

        let names: Vec<String> = std::thread::scope(|scope| {
            let workers: Vec<_> = (0..8)
                .map(|_| {
                    scope.spawn(|| {
                        (0..3)
                            .map(|_| forge.generate("8675309", "expert").unwrap().filename)
                            .collect::<Vec<_>>()
                    })
                })
                .collect();
            workers
                .into_iter()
                .flat_map(|w| w.join().unwrap())
                .collect()
        });

        assert_eq!(names.len(), 24);
        for name in &names {
            assert_eq!(decode(dir.path(), name).dimensions(), (400, 200));
        }
        // Same-microsecond collisions overwrite; every surviving name is distinct
        let unique: HashSet<_> = names.iter().collect();
        let on_disk = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(on_disk, unique.len());
    }

    #[test]
    fn test_ensure_regenerates_missing_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let forge = forge(dir.path());

        let artifact = forge.generate("2718", "easy").unwrap();
        let kept = forge.ensure(&artifact.filename).unwrap();
        assert!(!kept.regenerated);
        assert_eq!(kept.artifact.filename, artifact.filename);

        std::fs::remove_file(dir.path().join(&artifact.filename)).unwrap();
        let fresh = forge.ensure(&artifact.filename).unwrap();
        assert!(fresh.regenerated);
        assert_eq!(fresh.artifact.digits.as_str(), "2718");
        assert_eq!(fresh.artifact.tier.as_str(), "easy");
        assert!(dir.path().join(&fresh.artifact.filename).is_file());

        assert!(matches!(
            forge.ensure("passwd"),
            Err(DigitsError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_obfuscate_identity_recipe_keeps_rendering() {
        let dir = tempfile::tempdir().unwrap();
        let forge = forge(dir.path());
        let digits = DigitString::new("7").unwrap();

        let mut a = StdRng::seed_from_u64(99);
        let mut b = StdRng::seed_from_u64(99);
        let obfuscated = forge.obfuscate(&digits, &CorruptionRecipe::identity(), &mut a);
        let rendered = forge.renderer.render(&digits, &mut b);
        assert_eq!(obfuscated, rendered);
    }
}
