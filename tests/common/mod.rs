#![allow(dead_code)]

use xdecoder::{Arc, Label, VectorFst, EPSILON};

/// Start state with one emitting arc per entry of `olabels`, arc `i` reading
/// score index `i + 1` into its own state, which loops on the same index and
/// is final with cost 0.
pub fn fan_out(olabels: &[Label]) -> VectorFst {
    let mut fst = VectorFst::new();
    let start = fst.add_state();
    fst.set_start(start);
    for (i, &olabel) in olabels.iter().enumerate() {
        let s = fst.add_state();
        let index = i as Label + 1;
        fst.add_arc(start, Arc::new(index, olabel, 0.0, s));
        fst.add_arc(s, Arc::new(index, EPSILON, 0.0, s));
        fst.set_final(s, 0.0);
    }
    fst
}

/// Word loop over `num_words` words; word `w` reads score index `w`.
pub fn word_loop(num_words: u32) -> VectorFst {
    let mut fst = VectorFst::new();
    let start = fst.add_state();
    fst.set_start(start);
    fst.set_final(start, 0.0);
    for word in 1..=num_words {
        let s = fst.add_state();
        fst.add_arc(start, Arc::new(word, word, 1.0, s));
        fst.add_arc(s, Arc::new(word, EPSILON, 0.5, s));
        fst.add_arc(s, Arc::new(EPSILON, EPSILON, 0.0, start));
    }
    fst
}

/// One cost row per spoken index: 0.1 for the spoken index, 6.0 elsewhere.
pub fn utterance_costs(num_words: u32, spoken: &[u32]) -> Vec<Vec<f32>> {
    spoken
        .iter()
        .map(|&w| (1..=num_words).map(|i| if i == w { 0.1 } else { 6.0 }).collect())
        .collect()
}
