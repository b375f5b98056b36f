//! Generator - Token batch creation
//!
//! Draws unique labels without replacement, classifies them as prime or not,
//! and assigns a color from a contiguous band partition of the label range.

use std::collections::HashSet;

use rand::seq::index;
use rand::Rng;

use crate::race_engine::error::RaceError;
use crate::race_engine::token::{ColorClass, Token};

/// Number of whole labels in `[min_label, max_label]`; zero when inverted.
pub fn range_size(min_label: i64, max_label: i64) -> u128 {
    if max_label < min_label {
        0
    } else {
        (max_label as i128 - min_label as i128 + 1) as u128
    }
}

/// True iff `n >= 2` and nothing in `[2, n-1]` divides it.
pub fn is_prime(n: i64) -> bool {
    if n < 2 {
        return false;
    }
    if n < 4 {
        return true;
    }
    if n % 2 == 0 {
        return false;
    }

    let mut divisor = 3;
    while divisor <= n / divisor {
        if n % divisor == 0 {
            return false;
        }
        divisor += 2;
    }
    true
}

/// Contiguous partition of a label range into one band per color
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorBands {
    min_label: i64,
    max_label: i64,
    colors: Vec<ColorClass>,
}

impl ColorBands {
    pub fn new(min_label: i64, max_label: i64, colors: Vec<ColorClass>) -> Result<Self, RaceError> {
        if colors.is_empty() {
            return Err(RaceError::EmptyPalette);
        }
        Ok(Self {
            min_label,
            max_label,
            colors,
        })
    }

    /// Bands over the default six-color palette
    pub fn with_default_palette(min_label: i64, max_label: i64) -> Self {
        Self {
            min_label,
            max_label,
            colors: ColorClass::DEFAULT_PALETTE.to_vec(),
        }
    }

    pub fn colors(&self) -> &[ColorClass] {
        &self.colors
    }

    /// Index of the band holding `label`, clamped to the first and last band
    pub fn band_index(&self, label: i64) -> usize {
        let span = range_size(self.min_label, self.max_label) as i128;
        let bands = self.colors.len() as i128;
        if span == 0 {
            return 0;
        }

        let offset = (label as i128 - self.min_label as i128).clamp(0, span - 1);
        ((offset * bands / span) as usize).min(self.colors.len() - 1)
    }

    pub fn color_for(&self, label: i64) -> ColorClass {
        self.colors[self.band_index(label)]
    }
}

/// Default cosmetic lane offset bounds
pub const DEFAULT_LANE_OFFSET_MIN: f64 = 4.0;
pub const DEFAULT_LANE_OFFSET_MAX: f64 = 96.0;

/// Produces fresh token batches
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenGenerator {
    /// Whole-number offset bounds, inclusive
    lane_offset_min: i64,
    lane_offset_max: i64,
}

impl TokenGenerator {
    /// Create a generator placing tokens at whole-number lane offsets in the given bounds
    pub fn new(lane_offset_min: f64, lane_offset_max: f64) -> Result<Self, RaceError> {
        let lowest = lane_offset_min.ceil();
        let highest = lane_offset_max.floor();
        if !lowest.is_finite()
            || !highest.is_finite()
            || lowest > highest
            || lowest < i64::MIN as f64
            || highest > i64::MAX as f64
        {
            return Err(RaceError::invalid(format!(
                "lane offset bounds [{lane_offset_min}, {lane_offset_max}] hold no whole number"
            )));
        }
        Ok(Self {
            lane_offset_min: lowest as i64,
            lane_offset_max: highest as i64,
        })
    }

    /// Uniform whole-number offset across the lane
    fn lane_offset<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        rng.gen_range(self.lane_offset_min..=self.lane_offset_max) as f64
    }

    /// Generate `count` tokens with unique labels from `[min_label, max_label]`.
    ///
    /// Every call starts with an empty uniqueness set, so labels may repeat
    /// across batches but never within one.
    pub fn generate<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        count: usize,
        min_label: i64,
        max_label: i64,
        bands: &ColorBands,
    ) -> Result<Vec<Token>, RaceError> {
        if u32::try_from(count).is_err() {
            return Err(RaceError::invalid(format!("{count} tokens exceed the id space")));
        }

        let labels = Self::sample_labels(rng, count, min_label, max_label)?;

        let tokens = labels
            .into_iter()
            .enumerate()
            .map(|(i, label)| {
                let lane_offset = self.lane_offset(rng);
                Token::new(
                    i as u32,
                    label,
                    is_prime(label),
                    bands.color_for(label),
                    lane_offset,
                )
            })
            .collect();

        Ok(tokens)
    }

    /// Sample without replacement.
    ///
    /// Ranges that fit a `usize` index use rand's index sampling, which never
    /// retries unboundedly. Wider ranges (only the full `i64` span) fall back
    /// to rejection against a per-batch set.
    fn sample_labels<R: Rng + ?Sized>(
        rng: &mut R,
        count: usize,
        min_label: i64,
        max_label: i64,
    ) -> Result<Vec<i64>, RaceError> {
        let available = range_size(min_label, max_label);
        if count as u128 > available {
            return Err(RaceError::ExhaustedRange {
                requested: count,
                available,
            });
        }

        match usize::try_from(available) {
            Ok(length) => Ok(index::sample(rng, length, count)
                .into_iter()
                .map(|offset| (min_label as i128 + offset as i128) as i64)
                .collect()),
            Err(_) => {
                let mut seen = HashSet::with_capacity(count);
                let mut labels = Vec::with_capacity(count);
                while labels.len() < count {
                    let label = rng.gen_range(min_label..=max_label);
                    if seen.insert(label) {
                        labels.push(label);
                    }
                }
                Ok(labels)
            }
        }
    }
}

impl Default for TokenGenerator {
    fn default() -> Self {
        Self {
            lane_offset_min: DEFAULT_LANE_OFFSET_MIN as i64,
            lane_offset_max: DEFAULT_LANE_OFFSET_MAX as i64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn prime_table() {
        let table = [
            (-7, false),
            (-2, false),
            (-1, false),
            (0, false),
            (1, false),
            (2, true),
            (3, true),
            (4, false),
            (9, false),
            (25, false),
            (49, false),
            (59, true),
            (60, false),
            (7919, true),
            (7921, false),
        ];
        for (n, expected) in table {
            assert_eq!(is_prime(n), expected, "is_prime({n})");
        }
    }

    #[test]
    fn prime_handles_large_values() {
        assert!(is_prime(2_147_483_647));
        assert!(!is_prime(i64::MAX));
    }

    #[test]
    fn default_bands_follow_decades() {
        let bands = ColorBands::with_default_palette(1, 60);
        assert_eq!(bands.color_for(1), ColorClass::Blue);
        assert_eq!(bands.color_for(10), ColorClass::Blue);
        assert_eq!(bands.color_for(11), ColorClass::Green);
        assert_eq!(bands.color_for(30), ColorClass::Gray);
        assert_eq!(bands.color_for(31), ColorClass::LightBlue);
        assert_eq!(bands.color_for(50), ColorClass::Orange);
        assert_eq!(bands.color_for(51), ColorClass::Pink);
        assert_eq!(bands.color_for(60), ColorClass::Pink);
    }

    #[test]
    fn bands_clamp_out_of_range_labels() {
        let bands = ColorBands::with_default_palette(1, 60);
        assert_eq!(bands.color_for(-100), ColorClass::Blue);
        assert_eq!(bands.color_for(1_000), ColorClass::Pink);
    }

    #[test]
    fn uneven_bands_exhaust_palette_at_max() {
        let bands =
            ColorBands::new(0, 6, vec![ColorClass::Blue, ColorClass::Green, ColorClass::Pink])
                .unwrap();
        assert_eq!(bands.color_for(0), ColorClass::Blue);
        assert_eq!(bands.color_for(6), ColorClass::Pink);

        let mut last = 0;
        for label in 0..=6 {
            let idx = bands.band_index(label);
            assert!(idx >= last, "bands must be monotonic");
            last = idx;
        }
    }

    #[test]
    fn empty_palette_is_rejected() {
        assert_eq!(ColorBands::new(1, 60, vec![]), Err(RaceError::EmptyPalette));
    }

    #[test]
    fn exhausted_range_fails() {
        let mut rng = StdRng::seed_from_u64(1);
        let bands = ColorBands::with_default_palette(1, 60);
        let err = TokenGenerator::default()
            .generate(&mut rng, 100, 1, 60, &bands)
            .unwrap_err();
        assert_eq!(
            err,
            RaceError::ExhaustedRange {
                requested: 100,
                available: 60
            }
        );
    }

    #[test]
    fn inverted_range_holds_nothing() {
        let mut rng = StdRng::seed_from_u64(1);
        let bands = ColorBands::with_default_palette(10, 1);
        assert!(TokenGenerator::default()
            .generate(&mut rng, 1, 10, 1, &bands)
            .is_err());
        assert!(TokenGenerator::default()
            .generate(&mut rng, 0, 10, 1, &bands)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn full_range_is_a_permutation() {
        let mut rng = StdRng::seed_from_u64(7);
        let bands = ColorBands::with_default_palette(1, 60);
        let tokens = TokenGenerator::default()
            .generate(&mut rng, 60, 1, 60, &bands)
            .unwrap();
        let mut labels: Vec<_> = tokens.iter().map(|t| t.label).collect();
        labels.sort_unstable();
        assert_eq!(labels, (1..=60).collect::<Vec<_>>());
    }

    #[test]
    fn full_i64_span_uses_rejection_path() {
        let mut rng = StdRng::seed_from_u64(3);
        let bands = ColorBands::with_default_palette(i64::MIN, i64::MAX);
        let tokens = TokenGenerator::default()
            .generate(&mut rng, 16, i64::MIN, i64::MAX, &bands)
            .unwrap();
        let unique: HashSet<_> = tokens.iter().map(|t| t.label).collect();
        assert_eq!(unique.len(), 16);
    }

    #[test]
    fn tokens_start_fresh() {
        let mut rng = StdRng::seed_from_u64(11);
        let bands = ColorBands::with_default_palette(1, 60);
        let tokens = TokenGenerator::default()
            .generate(&mut rng, 30, 1, 60, &bands)
            .unwrap();

        for (i, token) in tokens.iter().enumerate() {
            assert_eq!(token.id, i as u32);
            assert_eq!(token.position, 0.0);
            assert!(!token.is_started());
            assert!(!token.is_finished());
            assert_eq!(token.is_prime, is_prime(token.label));
            assert_eq!(token.color, bands.color_for(token.label));
            assert!((4.0..=96.0).contains(&token.lane_offset));
            assert_eq!(token.lane_offset.fract(), 0.0);
        }
    }

    #[test]
    fn bad_lane_offsets_are_rejected() {
        assert!(TokenGenerator::new(96.0, 4.0).is_err());
        assert!(TokenGenerator::new(f64::NAN, 4.0).is_err());
        assert!(TokenGenerator::new(50.0, 50.0).is_ok());
        assert!(TokenGenerator::new(4.2, 4.8).is_err());
    }

    #[test]
    fn lane_offsets_are_uniform_whole_numbers() {
        let mut rng = StdRng::seed_from_u64(21);
        let generator = TokenGenerator::default();
        let mut hits = [0u32; 97];
        for _ in 0..93_000 {
            let offset = generator.lane_offset(&mut rng);
            assert_eq!(offset.fract(), 0.0);
            assert!((4.0..=96.0).contains(&offset));
            hits[offset as usize] += 1;
        }

        // 1000 expected per value, edges included.
        for value in 4..=96 {
            assert!(
                (800..=1200).contains(&hits[value]),
                "offset {value} drawn {} times",
                hits[value]
            );
        }
    }

    #[test]
    fn default_generator_matches_default_config() {
        let config = crate::race_engine::race::RaceConfig::default();
        assert_eq!(
            TokenGenerator::new(config.lane_offset_min, config.lane_offset_max).unwrap(),
            TokenGenerator::default()
        );
        assert_eq!(config.lane_offset_min, DEFAULT_LANE_OFFSET_MIN);
        assert_eq!(config.lane_offset_max, DEFAULT_LANE_OFFSET_MAX);
    }

    #[test]
    fn fractional_bounds_round_inward() {
        let mut rng = StdRng::seed_from_u64(22);
        let generator = TokenGenerator::new(3.5, 5.5).unwrap();
        for _ in 0..200 {
            let offset = generator.lane_offset(&mut rng);
            assert!(offset == 4.0 || offset == 5.0);
        }
    }

    proptest! {
        #[test]
        fn labels_unique_and_in_range(
            seed in any::<u64>(),
            min in -1_000i64..1_000,
            width in 1i64..200,
            fill in 0.0f64..=1.0,
        ) {
            let max = min + width - 1;
            let count = ((width as f64) * fill) as usize;
            let mut rng = StdRng::seed_from_u64(seed);
            let bands = ColorBands::with_default_palette(min, max);
            let tokens = TokenGenerator::default()
                .generate(&mut rng, count, min, max, &bands)
                .unwrap();

            prop_assert_eq!(tokens.len(), count);
            let unique: HashSet<_> = tokens.iter().map(|t| t.label).collect();
            prop_assert_eq!(unique.len(), count);
            for token in &tokens {
                prop_assert!(token.label >= min && token.label <= max);
            }
        }

        #[test]
        fn color_is_pure_and_in_palette(min in -500i64..500, width in 1i64..500, pick in 0.0f64..1.0) {
            let max = min + width - 1;
            let label = min + ((width as f64) * pick) as i64;
            let bands = ColorBands::with_default_palette(min, max);
            let first = bands.color_for(label);
            prop_assert_eq!(first, bands.color_for(label));
            prop_assert!(bands.colors().contains(&first));
        }
    }
}
