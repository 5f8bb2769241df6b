//! Streams a synthetic utterance through a three-word loop graph and prints
//! the best word sequence and its frame alignment.
//!
//! Run with `cargo run --example align_demo`.

use xdecoder::{Arc, DecodableMatrix, DecoderBuilder, DecoderOptions, Fst, VectorFst, EPSILON};

const NUM_WORDS: u32 = 3;

/// Word loop: from the start state, word `w` enters a state that repeats
/// score index `w` and falls back to the start over an epsilon arc.
fn word_loop() -> VectorFst {
    let mut fst = VectorFst::new();
    let start = fst.add_state();
    fst.set_start(start);
    fst.set_final(start, 0.0);
    for word in 1..=NUM_WORDS {
        let s = fst.add_state();
        fst.add_arc(start, Arc::new(word, word, 1.0, s));
        fst.add_arc(s, Arc::new(word, EPSILON, 0.5, s));
        fst.add_arc(s, Arc::new(EPSILON, EPSILON, 0.0, start));
    }
    fst
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    xdecoder::init_tracing(tracing::Level::DEBUG);

    let options = DecoderOptions::from_toml_str("beam = 10.0\nmax_active = 200\nmin_active = 2\n")?;
    let fst = word_loop();
    let num_arcs: usize = (0..fst.num_states() as u32).map(|s| fst.num_arcs(s)).sum();
    tracing::info!("graph: {} states, {} arcs", fst.num_states(), num_arcs);
    let mut decoder = DecoderBuilder::new().with_options(options).build(&fst)?;

    let spoken = [2u32, 2, 2, 1, 1, 3, 3, 3];
    let mut scores = DecodableMatrix::new(NUM_WORDS as usize, 1.0);
    decoder.init_decoding();
    for &index in &spoken {
        let row: Vec<f32> = (1..=NUM_WORDS).map(|i| if i == index { -0.1 } else { -6.0 }).collect();
        scores.accept_frame(&row)?;
        decoder.advance_decoding(&mut scores, None)?;
    }
    scores.input_finished();
    tracing::debug!("input finished={} acoustic_scale={}", scores.is_finished(), scores.acoustic_scale());

    match decoder.get_best_traceback(true) {
        Some(tb) => {
            tracing::info!("words={:?} alignment={:?} cost={:.3}", tb.olabels, tb.alignment, tb.cost);
            tracing::info!("reached_final={} frames={}", decoder.reached_final(), decoder.num_frames_decoded());
        }
        None => tracing::warn!("no surviving hypothesis"),
    }
    Ok(())
}
