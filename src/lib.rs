//! # xdecoder
//!
//! Frame-synchronous Viterbi beam search over a weighted graph, driven by a
//! per-frame score source. The search lives in `xdecoder-core`; the pooled
//! storage under it lives in `xdecoder-dsa`.

pub use xdecoder_core::*;
pub use xdecoder_dsa as dsa;

/// Installs a formatting subscriber at `level` for binaries and demos.
///
/// Library code only emits events; it never installs a subscriber itself.
/// Calling this twice is harmless.
pub fn init_tracing(level: tracing::Level) {
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .try_init();
}
