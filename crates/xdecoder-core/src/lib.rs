pub mod config;
pub mod decodable;
pub mod decoder;
pub mod error;
pub mod fst;
pub mod token;

pub use config::DecoderOptions;
pub use decodable::{Decodable, DecodableMatrix};
pub use decoder::{Cutoff, DecoderState, FasterDecoder, Traceback};
pub use error::DecoderError;
pub use fst::{Arc, Fst, Label, StateId, VectorFst, EPSILON, NO_STATE};
pub use token::{Token, TokenArena, TokenId};

/// A fluent builder for [`FasterDecoder`].
///
/// Options are checked once, in `build`, so individual setters can be
/// chained in any order.
#[derive(Debug, Clone, Default)]
pub struct DecoderBuilder {
    pub options: DecoderOptions,
}

impl DecoderBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides every option at once, e.g. with values read from TOML.
    pub fn with_options(mut self, options: DecoderOptions) -> Self {
        self.options = options;
        self
    }

    pub fn beam(mut self, beam: f32) -> Self {
        self.options.beam = beam;
        self
    }

    pub fn max_active(mut self, max_active: usize) -> Self {
        self.options.max_active = max_active;
        self
    }

    pub fn min_active(mut self, min_active: usize) -> Self {
        self.options.min_active = min_active;
        self
    }

    pub fn beam_delta(mut self, beam_delta: f32) -> Self {
        self.options.beam_delta = beam_delta;
        self
    }

    pub fn hash_ratio(mut self, hash_ratio: f32) -> Self {
        self.options.hash_ratio = hash_ratio;
        self
    }

    /// Validates the options and binds a decoder to `fst`.
    pub fn build<F: Fst + ?Sized>(self, fst: &F) -> Result<FasterDecoder<'_, F>, DecoderError> {
        FasterDecoder::new(fst, self.options)
    }
}
