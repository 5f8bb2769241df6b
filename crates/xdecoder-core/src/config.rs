use serde::Deserialize;
use std::path::Path;

use crate::error::DecoderError;

/// Pruning knobs for [`crate::FasterDecoder`].
///
/// Every field has a default, so a TOML file only needs the keys it changes:
///
/// ```toml
/// beam = 12.0
/// max_active = 7000
/// ```
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct DecoderOptions {
    /// Cost range kept around the best token of a frame.
    pub beam: f32,
    /// Upper bound on tokens expanded per frame.
    pub max_active: usize,
    /// Lower bound on tokens expanded per frame; widens the beam when hit.
    pub min_active: usize,
    /// Slack added to the adaptive beam when an active-count bound binds.
    pub beam_delta: f32,
    /// Bucket-to-token ratio maintained for the active set.
    pub hash_ratio: f32,
}

impl Default for DecoderOptions {
    fn default() -> Self {
        Self {
            beam: 16.0,
            max_active: usize::MAX,
            // Mostly used for alignment, so keep the floor small.
            min_active: 20,
            beam_delta: 0.5,
            hash_ratio: 2.0,
        }
    }
}

impl DecoderOptions {
    /// Rejects combinations the search cannot honor.
    pub fn validate(&self) -> Result<(), DecoderError> {
        if !self.beam.is_finite() || self.beam <= 0.0 {
            return Err(DecoderError::InvalidOptions(format!("beam must be positive and finite, got {}", self.beam)));
        }
        if !self.beam_delta.is_finite() || self.beam_delta < 0.0 {
            return Err(DecoderError::InvalidOptions(format!("beam_delta must be >= 0, got {}", self.beam_delta)));
        }
        if !self.hash_ratio.is_finite() || self.hash_ratio < 1.0 {
            return Err(DecoderError::InvalidOptions(format!("hash_ratio must be >= 1.0, got {}", self.hash_ratio)));
        }
        if self.max_active == 0 {
            return Err(DecoderError::InvalidOptions("max_active must be at least 1".to_string()));
        }
        if self.min_active > self.max_active {
            return Err(DecoderError::InvalidOptions(format!(
                "min_active ({}) exceeds max_active ({})",
                self.min_active, self.max_active
            )));
        }
        Ok(())
    }

    /// Parses and validates options from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, DecoderError> {
        let options: DecoderOptions = toml::from_str(text).map_err(|e| DecoderError::Config(e.to_string()))?;
        options.validate()?;
        Ok(options)
    }

    /// Reads options from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, DecoderError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        tracing::debug!("DecoderOptions: loaded {}", path.display());
        Self::from_toml_str(&text)
    }
}
