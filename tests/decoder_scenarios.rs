//! # Decoder Engine Tests: End-to-End Search Scenarios
//!
//! Drives `FasterDecoder` over small hand-built graphs and checks pruning,
//! relaxation, final-state selection and incremental decoding.

mod common;

use std::time::Instant;
use xdecoder::{
    Arc, DecodableMatrix, DecoderBuilder, DecoderError, DecoderOptions, DecoderState, FasterDecoder, Fst,
    VectorFst, EPSILON,
};

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-4
}

/// start -> A on an emitting arc with weight 0, A final with cost 0, one
/// frame scoring A at 2.0.
#[test]
fn test_single_arc_reaches_final() {
    let t = Instant::now();

    let mut fst = VectorFst::new();
    let start = fst.add_state();
    let a = fst.add_state();
    fst.set_start(start);
    fst.add_arc(start, Arc::new(1, 7, 0.0, a));
    fst.set_final(a, 0.0);

    let mut scores = DecodableMatrix::from_costs(&[vec![2.0]]).unwrap();
    let mut decoder = FasterDecoder::new(&fst, DecoderOptions::default()).unwrap();
    decoder.decode(&mut scores).unwrap();

    assert!(decoder.reached_final());
    assert_eq!(decoder.num_frames_decoded(), 1);
    assert_eq!(decoder.get_best_path(true), Some(vec![7]));

    let tb = decoder.get_best_traceback(true).unwrap();
    assert_eq!(tb.cost, 2.0);
    assert_eq!(tb.final_cost, Some(0.0));
    assert_eq!(tb.end_state, a);
    assert_eq!(tb.alignment, vec![1]);

    println!("test_single_arc_reaches_final: Testing Overhead = {:?}", t.elapsed());
}

/// Two emitting arcs into the same state, the costlier one first: only the
/// cheaper hypothesis may survive.
#[test]
fn test_cheaper_emitting_hypothesis_replaces_earlier_one() {
    let t = Instant::now();

    let mut fst = VectorFst::new();
    let start = fst.add_state();
    let x = fst.add_state();
    fst.set_start(start);
    fst.add_arc(start, Arc::new(1, 5, 5.0, x));
    fst.add_arc(start, Arc::new(2, 3, 3.0, x));
    fst.set_final(x, 0.0);

    let mut scores = DecodableMatrix::from_costs(&[vec![0.0, 0.0]]).unwrap();
    let mut decoder = FasterDecoder::new(&fst, DecoderOptions::default()).unwrap();
    decoder.decode(&mut scores).unwrap();

    let active: Vec<_> = decoder.active().collect();
    assert_eq!(active, vec![(x, 3.0)]);
    assert_eq!(decoder.get_best_path(true), Some(vec![3]));

    println!("test_cheaper_emitting_hypothesis_replaces_earlier_one: Testing Overhead = {:?}", t.elapsed());
}

/// Same race over non-emitting arcs, resolved by the closure that follows
/// `init_decoding`.
#[test]
fn test_cheaper_nonemitting_hypothesis_replaces_earlier_one() {
    let t = Instant::now();

    let mut fst = VectorFst::new();
    let start = fst.add_state();
    let x = fst.add_state();
    fst.set_start(start);
    fst.add_arc(start, Arc::new(EPSILON, 5, 5.0, x));
    fst.add_arc(start, Arc::new(EPSILON, 3, 3.0, x));
    fst.set_final(x, 0.0);

    let mut decoder = FasterDecoder::new(&fst, DecoderOptions::default()).unwrap();
    decoder.init_decoding();

    let active: Vec<_> = decoder.active().collect();
    assert_eq!(active, vec![(start, 0.0), (x, 3.0)]);
    assert_eq!(decoder.get_best_path(true), Some(vec![3]));
    // Replaced candidates were released; only the two winners remain.
    assert_eq!(decoder.pool_stats().live, 2);

    println!("test_cheaper_nonemitting_hypothesis_replaces_earlier_one: Testing Overhead = {:?}", t.elapsed());
}

/// `max_active = 1` with three live states: only the cheapest one is expanded
/// even though the beam alone would keep all three.
#[test]
fn test_max_active_prunes_to_cheapest() {
    let t = Instant::now();

    let fst = common::fan_out(&[10, 11, 12]);
    let rows = vec![vec![2.0, 1.0, 3.0], vec![0.0, 0.0, 0.0]];

    let mut wide = DecoderBuilder::new().beam(1000.0).min_active(0).build(&fst).unwrap();
    wide.decode(&mut DecodableMatrix::from_costs(&rows).unwrap()).unwrap();
    assert_eq!(wide.num_active(), 3);

    let mut narrow = DecoderBuilder::new().beam(1000.0).max_active(1).min_active(0).build(&fst).unwrap();
    narrow.decode(&mut DecodableMatrix::from_costs(&rows).unwrap()).unwrap();
    assert_eq!(narrow.num_active(), 1);
    assert_eq!(narrow.get_best_path(false), Some(vec![11]));
    assert_eq!(narrow.get_best_traceback(false).unwrap().cost, 1.0);

    println!("test_max_active_prunes_to_cheapest: Testing Overhead = {:?}", t.elapsed());
}

/// Two one-frame advances must land exactly where one full decode lands.
#[test]
fn test_incremental_advance_matches_full_decode() {
    let t = Instant::now();

    let fst = common::word_loop(3);
    let rows = common::utterance_costs(3, &[2, 1]);

    let mut full = FasterDecoder::new(&fst, DecoderOptions::default()).unwrap();
    full.decode(&mut DecodableMatrix::from_costs(&rows).unwrap()).unwrap();

    let mut scores = DecodableMatrix::from_costs(&rows).unwrap();
    let mut stepped = FasterDecoder::new(&fst, DecoderOptions::default()).unwrap();
    stepped.init_decoding();
    assert_eq!(stepped.advance_decoding(&mut scores, Some(1)).unwrap(), 1);
    assert_eq!(stepped.num_frames_decoded(), 1);
    assert_eq!(stepped.advance_decoding(&mut scores, Some(1)).unwrap(), 1);
    assert_eq!(stepped.advance_decoding(&mut scores, Some(1)).unwrap(), 0);

    assert_eq!(stepped.num_frames_decoded(), full.num_frames_decoded());
    assert_eq!(stepped.get_best_traceback(true), full.get_best_traceback(true));
    assert_eq!(full.get_best_path(true), Some(vec![2, 1]));

    println!("test_incremental_advance_matches_full_decode: Testing Overhead = {:?}", t.elapsed());
}

/// Frames arriving one at a time decode to the same result as a batch.
#[test]
fn test_streaming_source() {
    let t = Instant::now();

    let fst = common::word_loop(3);
    let spoken = [2u32, 2, 2, 1, 1, 3, 3, 3];
    let rows = common::utterance_costs(3, &spoken);

    let mut batch = FasterDecoder::new(&fst, DecoderOptions::default()).unwrap();
    batch.decode(&mut DecodableMatrix::from_costs(&rows).unwrap()).unwrap();

    let mut stream = DecodableMatrix::new(3, 1.0);
    let mut online = FasterDecoder::new(&fst, DecoderOptions::default()).unwrap();
    online.init_decoding();
    for row in &rows {
        let loglikes: Vec<f32> = row.iter().map(|c| -c).collect();
        stream.accept_frame(&loglikes).unwrap();
        assert_eq!(online.advance_decoding(&mut stream, None).unwrap(), 1);
    }
    stream.input_finished();

    let tb = online.get_best_traceback(true).unwrap();
    assert_eq!(tb.olabels, vec![2, 1, 3]);
    assert_eq!(tb.alignment, spoken.to_vec());
    assert_eq!(tb.alignment.len(), online.num_frames_decoded());
    assert!(approx(tb.cost, 6.3), "cost {}", tb.cost);
    assert_eq!(Some(tb), batch.get_best_traceback(true));

    println!("test_streaming_source: Testing Overhead = {:?}", t.elapsed());
}

/// A cheaper non-final state must lose to a final one when final costs count.
#[test]
fn test_final_probs_prefer_final_states() {
    let t = Instant::now();

    let mut fst = VectorFst::new();
    let start = fst.add_state();
    let cheap = fst.add_state();
    let fin = fst.add_state();
    fst.set_start(start);
    fst.add_arc(start, Arc::new(1, 100, 0.0, cheap));
    fst.add_arc(start, Arc::new(1, 200, 4.0, fin));
    fst.set_final(fin, 1.0);

    let mut decoder = FasterDecoder::new(&fst, DecoderOptions::default()).unwrap();
    decoder.decode(&mut DecodableMatrix::from_costs(&[vec![0.5]]).unwrap()).unwrap();

    assert!(decoder.reached_final());
    assert_eq!(decoder.get_best_path(true), Some(vec![200]));
    assert_eq!(decoder.get_best_path(false), Some(vec![100]));
    let tb = decoder.get_best_traceback(true).unwrap();
    assert!(fst.is_final(tb.end_state));
    assert_eq!(tb.final_cost, Some(1.0));

    println!("test_final_probs_prefer_final_states: Testing Overhead = {:?}", t.elapsed());
}

#[test]
fn test_best_path_is_idempotent() {
    let fst = common::word_loop(4);
    let rows = common::utterance_costs(4, &[4, 4, 2, 3, 3, 1]);
    let mut decoder = FasterDecoder::new(&fst, DecoderOptions::default()).unwrap();
    decoder.decode(&mut DecodableMatrix::from_costs(&rows).unwrap()).unwrap();

    let first = decoder.get_best_path(true);
    let second = decoder.get_best_path(true);
    assert_eq!(first, second);
    assert_eq!(first, Some(vec![4, 2, 3, 1]));
}

/// A graph with no way to consume a frame empties the active set; traceback
/// reports failure instead of panicking.
#[test]
fn test_empty_active_set_reports_no_path() {
    let mut fst = VectorFst::new();
    let start = fst.add_state();
    fst.set_start(start);
    fst.set_final(start, 0.0);

    let mut decoder = FasterDecoder::new(&fst, DecoderOptions::default()).unwrap();
    decoder.init_decoding();
    assert_eq!(decoder.get_best_path(true), Some(vec![]));

    decoder.advance_decoding(&mut DecodableMatrix::from_costs(&[vec![0.0]]).unwrap(), None).unwrap();
    assert_eq!(decoder.num_active(), 0);
    assert!(!decoder.reached_final());
    assert_eq!(decoder.get_best_path(true), None);
    assert_eq!(decoder.get_best_traceback(false), None);
}

/// After closure no non-emitting arc can still improve an active state.
#[test]
fn test_nonemitting_closure_is_a_fixed_point() {
    let mut fst = VectorFst::new();
    let states: Vec<_> = (0..6).map(|_| fst.add_state()).collect();
    fst.set_start(states[0]);
    fst.add_arc(states[0], Arc::new(1, 1, 1.0, states[1]));
    fst.add_arc(states[0], Arc::new(2, 2, 0.0, states[2]));
    // A diamond of epsilon arcs whose cheaper branch is discovered later.
    fst.add_arc(states[1], Arc::new(EPSILON, EPSILON, 4.0, states[3]));
    fst.add_arc(states[1], Arc::new(EPSILON, EPSILON, 0.5, states[4]));
    fst.add_arc(states[2], Arc::new(EPSILON, EPSILON, 3.0, states[4]));
    fst.add_arc(states[4], Arc::new(EPSILON, EPSILON, 0.25, states[3]));
    fst.add_arc(states[3], Arc::new(EPSILON, 9, 0.0, states[5]));
    fst.set_final(states[5], 0.0);

    let mut decoder = DecoderBuilder::new().beam(50.0).build(&fst).unwrap();
    decoder.decode(&mut DecodableMatrix::from_costs(&[vec![0.0, 0.0]]).unwrap()).unwrap();

    let active: std::collections::HashMap<_, _> = decoder.active().collect();
    for (&state, &cost) in &active {
        for arc in fst.nonemitting_arcs(state) {
            let dest = active.get(&arc.nextstate).expect("closure left a destination inactive");
            assert!(*dest <= cost + arc.weight as f64, "arc {:?} still improves state {}", arc, arc.nextstate);
        }
    }
    assert_eq!(active[&states[3]], 1.75);
    assert_eq!(decoder.get_best_path(true), Some(vec![1, 9]));
}

#[test]
fn test_state_machine_and_frame_errors() {
    let fst = common::word_loop(2);
    let mut decoder = FasterDecoder::new(&fst, DecoderOptions::default()).unwrap();
    assert_eq!(decoder.state(), DecoderState::Idle);

    let mut scores = DecodableMatrix::from_costs(&common::utterance_costs(2, &[1, 2])).unwrap();
    decoder.init_decoding();
    assert_eq!(decoder.state(), DecoderState::Idle);
    decoder.advance_decoding(&mut scores, None).unwrap();
    assert_eq!(decoder.state(), DecoderState::Finished);

    // A source with fewer frames than already decoded is rejected.
    let mut shorter = DecodableMatrix::from_costs(&common::utterance_costs(2, &[1])).unwrap();
    let err = decoder.advance_decoding(&mut shorter, None).unwrap_err();
    assert!(matches!(err, DecoderError::FramesNotMonotonic { decoded: 2, ready: 1 }), "{}", err);

    // Re-initializing starts over.
    decoder.init_decoding();
    assert_eq!(decoder.num_frames_decoded(), 0);
    assert_eq!(decoder.advance_decoding(&mut shorter, None).unwrap(), 1);
}

#[test]
fn test_set_options_between_decodes() {
    let fst = common::word_loop(2);
    let mut decoder = FasterDecoder::new(&fst, DecoderOptions::default()).unwrap();

    let bad = DecoderOptions { min_active: 10, max_active: 5, ..Default::default() };
    assert!(decoder.set_options(bad).is_err());
    assert_eq!(decoder.options(), &DecoderOptions::default());

    let tight = DecoderOptions { beam: 2.0, max_active: 5, min_active: 1, ..Default::default() };
    decoder.set_options(tight.clone()).unwrap();
    assert_eq!(decoder.options(), &tight);

    let rows = common::utterance_costs(2, &[1, 1, 2]);
    decoder.decode(&mut DecodableMatrix::from_costs(&rows).unwrap()).unwrap();
    assert_eq!(decoder.get_best_path(true), Some(vec![1, 2]));
}
