//! Difficulty tier → corruption recipe mapping.

use std::collections::BTreeMap;

use serde::Serialize;

use digits_common::{CorruptionRecipe, DifficultyTier, DigitsError, NoiseModel, Span};

/// Built-in tiers, easiest first
pub const BUILTIN_TIERS: [&str; 5] = ["easy", "medium", "hard", "expert", "insane"];

/// Every known tier and the one used for anything else
#[derive(Debug, Clone, Serialize)]
pub struct RecipeBook {
    recipes: BTreeMap<DifficultyTier, CorruptionRecipe>,
    default_tier: DifficultyTier,
}

/// Result of looking up a tier
#[derive(Debug, Clone, Copy)]
pub struct ResolvedRecipe<'a> {
    /// Tier whose recipe is returned
    pub tier: &'a DifficultyTier,
    pub recipe: &'a CorruptionRecipe,
    /// The requested tier was unknown
    pub fallback: bool,
}

impl RecipeBook {
    /// The five built-in tiers with `medium` as default
    pub fn builtin() -> Self {
        let recipes = BUILTIN_TIERS
            .iter()
            .filter_map(|label| {
                let tier = DifficultyTier::parse(label)?;
                let recipe = builtin_recipe(label)?;
                Some((tier, recipe))
            })
            .collect();

        Self {
            recipes,
            default_tier: DifficultyTier::default(),
        }
    }

    /// Built-in recipes merged with configured ones.
    ///
    /// Configured recipes replace built-ins of the same name. Fails if a
    /// label or recipe is invalid or if `default_tier` names no recipe.
    pub fn from_config(
        default_tier: &str,
        overrides: &BTreeMap<String, CorruptionRecipe>,
    ) -> Result<Self, DigitsError> {
        let mut book = Self::builtin();

        for (label, recipe) in overrides {
            let tier = DifficultyTier::parse(label)
                .ok_or_else(|| DigitsError::Config(format!("invalid tier label {:?}", label)))?;
            recipe
                .validate()
                .map_err(|e| DigitsError::Config(format!("recipe {:?}: {}", label, e)))?;
            book.recipes.insert(tier, recipe.clone());
        }

        let default_tier = DifficultyTier::parse(default_tier)
            .filter(|tier| book.recipes.contains_key(tier))
            .ok_or_else(|| {
                DigitsError::Config(format!("default tier {:?} has no recipe", default_tier))
            })?;
        book.default_tier = default_tier;

        Ok(book)
    }

    /// Look up a tier, falling back to the default recipe for unknown tiers
    pub fn resolve(&self, tier: &DifficultyTier) -> ResolvedRecipe<'_> {
        match self.recipes.get_key_value(tier) {
            Some((tier, recipe)) => ResolvedRecipe {
                tier,
                recipe,
                fallback: false,
            },
            None => ResolvedRecipe {
                tier: &self.default_tier,
                recipe: self.default_recipe(),
                fallback: true,
            },
        }
    }

    pub fn get(&self, tier: &str) -> Option<&CorruptionRecipe> {
        DifficultyTier::parse(tier).and_then(|tier| self.recipes.get(&tier))
    }

    pub fn default_tier(&self) -> &DifficultyTier {
        &self.default_tier
    }

    fn default_recipe(&self) -> &CorruptionRecipe {
        // from_config and builtin guarantee the default tier is present
        &self.recipes[&self.default_tier]
    }

    pub fn tiers(&self) -> impl Iterator<Item = (&DifficultyTier, &CorruptionRecipe)> {
        self.recipes.iter()
    }

    pub fn len(&self) -> usize {
        self.recipes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recipes.is_empty()
    }
}

fn builtin_recipe(tier: &str) -> Option<CorruptionRecipe> {
    let recipe = match tier {
        "easy" => CorruptionRecipe {
            rotation_deg: 2.0,
            distortion: 0.05,
            wave: true,
            swirl: None,
            contrast: Some(Span::new(0.7, 1.3)),
            brightness: Some(Span::new(0.8, 1.2)),
            noise: 0.05,
            noise_model: NoiseModel::FullBlend,
            pixelate: None,
            invert_chance: 0.0,
            channel_invert_chance: 0.0,
            lines: 1,
            line_width: Span::new(1, 2),
            blur_radius: 0.2,
        },
        "medium" => CorruptionRecipe {
            rotation_deg: 5.0,
            distortion: 0.15,
            wave: true,
            swirl: None,
            contrast: Some(Span::new(0.7, 1.3)),
            brightness: Some(Span::new(0.8, 1.2)),
            noise: 0.10,
            noise_model: NoiseModel::FullBlend,
            pixelate: None,
            invert_chance: 0.0,
            channel_invert_chance: 0.0,
            lines: 2,
            line_width: Span::new(1, 3),
            blur_radius: 0.5,
        },
        "hard" => CorruptionRecipe {
            rotation_deg: 10.0,
            distortion: 0.3,
            wave: true,
            swirl: Some(Span::new(0.5, 1.5)),
            contrast: Some(Span::new(0.6, 1.4)),
            brightness: Some(Span::new(0.75, 1.25)),
            noise: 0.18,
            noise_model: NoiseModel::FullBlend,
            pixelate: None,
            invert_chance: 0.0,
            channel_invert_chance: 0.10,
            lines: 3,
            line_width: Span::new(1, 3),
            blur_radius: 0.8,
        },
        "expert" => CorruptionRecipe {
            rotation_deg: 15.0,
            distortion: 0.5,
            wave: true,
            swirl: Some(Span::new(1.0, 2.5)),
            contrast: Some(Span::new(0.5, 1.6)),
            brightness: Some(Span::new(0.7, 1.3)),
            noise: 0.25,
            noise_model: NoiseModel::FullBlend,
            pixelate: Some(Span::new(6, 10)),
            invert_chance: 0.15,
            channel_invert_chance: 0.20,
            lines: 5,
            line_width: Span::new(2, 4),
            blur_radius: 1.2,
        },
        "insane" => CorruptionRecipe {
            rotation_deg: 20.0,
            distortion: 0.8,
            wave: true,
            swirl: Some(Span::new(2.0, 4.0)),
            contrast: Some(Span::new(0.4, 1.8)),
            brightness: Some(Span::new(0.6, 1.4)),
            noise: 0.35,
            noise_model: NoiseModel::SparseReplace,
            pixelate: Some(Span::new(10, 18)),
            invert_chance: 0.35,
            channel_invert_chance: 0.30,
            lines: 6,
            line_width: Span::new(2, 5),
            blur_radius: 2.0,
        },
        _ => return None,
    };
    Some(recipe)
}
