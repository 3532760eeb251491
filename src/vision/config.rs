use serde::Deserialize;

/// Configuration for template matching with tunable parameters
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    /// Minimum correlation accepted as a match (0.0 to 1.0)
    pub threshold: f64,
    /// Upper bound on coarse-to-fine downscaling steps (each halves both axes).
    /// 0 searches every position at full resolution.
    pub max_pyramid_levels: u32,
    /// A coarse level is only used while the template's shorter side stays at least this long
    pub min_coarse_side: u32,
    /// Coarse candidates refined at full resolution
    pub coarse_candidates: usize,
    /// Searches cheaper than this many multiply-adds always run exhaustively
    pub exhaustive_budget: u64,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            threshold: 0.8,
            max_pyramid_levels: 0,
            min_coarse_side: 8,
            coarse_candidates: 5,
            exhaustive_budget: 4_000_000,
        }
    }
}

impl MatchConfig {
    /// Configuration that always searches every position at full resolution
    pub fn exhaustive() -> Self {
        Self {
            max_pyramid_levels: 0,
            ..Self::default()
        }
    }

    /// Opt-in coarse-to-fine search for large frames. A coarse pass that
    /// finds nothing acceptable still falls back to the full search.
    pub fn coarse_to_fine() -> Self {
        Self {
            max_pyramid_levels: 2,
            ..Self::default()
        }
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err("Match threshold must be between 0.0 and 1.0".to_string());
        }

        if self.max_pyramid_levels > 0 && self.min_coarse_side == 0 {
            return Err("Minimum coarse side must be greater than 0".to_string());
        }

        if self.max_pyramid_levels > 0 && self.coarse_candidates == 0 {
            return Err("At least one coarse candidate must be refined".to_string());
        }

        Ok(())
    }
}
