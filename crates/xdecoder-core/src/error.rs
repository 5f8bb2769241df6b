use std::fmt;

#[derive(Debug)]
pub enum DecoderError {
    /// Options rejected by `DecoderOptions::validate`.
    InvalidOptions(String),
    /// `advance_decoding` was called before `init_decoding`.
    NotInitialized,
    /// The score source reported fewer ready frames than were already decoded.
    FramesNotMonotonic { decoded: usize, ready: usize },
    /// A score row did not match the source's index count.
    DimensionMismatch { expected: usize, got: usize },
    Config(String),
    Io(std::io::Error),
}

impl fmt::Display for DecoderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecoderError::InvalidOptions(msg) => write!(f, "invalid decoder options: {}", msg),
            DecoderError::NotInitialized => write!(f, "init_decoding must be called before advance_decoding"),
            DecoderError::FramesNotMonotonic { decoded, ready } => write!(
                f,
                "score source went backwards: {} frames decoded but only {} ready",
                decoded, ready
            ),
            DecoderError::DimensionMismatch { expected, got } => {
                write!(f, "score row has {} entries, expected {}", got, expected)
            }
            DecoderError::Config(msg) => write!(f, "config error: {}", msg),
            DecoderError::Io(e) => write!(f, "io error: {}", e),
        }
    }
}

impl std::error::Error for DecoderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DecoderError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for DecoderError {
    fn from(e: std::io::Error) -> Self {
        DecoderError::Io(e)
    }
}
