use crate::error::DecoderError;
use crate::fst::Label;

/// Per-frame score source consulted by the emitting pass.
pub trait Decodable {
    /// Cost (negated scaled log-likelihood) of `index` at `frame`.
    /// `index` is the 1-based `ilabel` of an emitting arc.
    fn acoustic_cost(&mut self, frame: usize, index: Label) -> f32;

    /// Frames currently available. Never decreases between calls.
    fn num_frames_ready(&self) -> usize;

    /// Number of distinct score indices.
    fn num_indices(&self) -> usize;

    /// True if `frame` is the final frame of the utterance.
    fn is_last_frame(&self, frame: usize) -> bool {
        frame + 1 >= self.num_frames_ready()
    }
}

/// Scores held in a frame-major matrix of log-likelihoods.
///
/// Frames can be appended while a decode is in progress, which together with
/// `FasterDecoder::advance_decoding` gives streaming decoding.
#[derive(Debug, Clone)]
pub struct DecodableMatrix {
    data: Vec<f32>,
    num_indices: usize,
    num_frames: usize,
    acoustic_scale: f32,
    finished: bool,
}

impl DecodableMatrix {
    /// An empty, open-ended source.
    pub fn new(num_indices: usize, acoustic_scale: f32) -> Self {
        Self {
            data: Vec::new(),
            num_indices,
            num_frames: 0,
            acoustic_scale,
            finished: false,
        }
    }

    /// A complete source from rows of log-likelihoods.
    pub fn from_log_likelihoods(rows: &[Vec<f32>], acoustic_scale: f32) -> Result<Self, DecoderError> {
        let num_indices = rows.first().map_or(0, |r| r.len());
        let mut matrix = Self::new(num_indices, acoustic_scale);
        for row in rows {
            matrix.accept_frame(row)?;
        }
        matrix.input_finished();
        Ok(matrix)
    }

    /// A complete source whose rows are already costs.
    pub fn from_costs(rows: &[Vec<f32>]) -> Result<Self, DecoderError> {
        let negated: Vec<Vec<f32>> = rows.iter().map(|r| r.iter().map(|c| -c).collect()).collect();
        Self::from_log_likelihoods(&negated, 1.0)
    }

    /// Appends one frame of log-likelihoods.
    pub fn accept_frame(&mut self, row: &[f32]) -> Result<(), DecoderError> {
        if row.len() != self.num_indices {
            return Err(DecoderError::DimensionMismatch { expected: self.num_indices, got: row.len() });
        }
        self.data.extend_from_slice(row);
        self.num_frames += 1;
        Ok(())
    }

    /// Marks the utterance as complete.
    pub fn input_finished(&mut self) {
        self.finished = true;
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn acoustic_scale(&self) -> f32 {
        self.acoustic_scale
    }
}

impl Decodable for DecodableMatrix {
    #[inline]
    fn acoustic_cost(&mut self, frame: usize, index: Label) -> f32 {
        assert!(
            index != 0 && (index as usize) <= self.num_indices,
            "DecodableMatrix: score index {} outside 1..={}",
            index,
            self.num_indices
        );
        assert!(frame < self.num_frames, "DecodableMatrix: frame {} not ready ({} frames)", frame, self.num_frames);
        -self.acoustic_scale * self.data[frame * self.num_indices + index as usize - 1]
    }

    fn num_frames_ready(&self) -> usize {
        self.num_frames
    }

    fn num_indices(&self) -> usize {
        self.num_indices
    }

    fn is_last_frame(&self, frame: usize) -> bool {
        self.finished && frame + 1 >= self.num_frames
    }
}
