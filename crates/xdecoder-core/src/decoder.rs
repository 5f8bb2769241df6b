use xdecoder_dsa::{ElemId, HashList, PoolStats, NULL_ELEM};

use crate::config::DecoderOptions;
use crate::decodable::Decodable;
use crate::error::DecoderError;
use crate::fst::{Arc, Fst, Label, StateId, EPSILON, NO_STATE};
use crate::token::{TokenArena, TokenId};

/// Bucket count of a fresh active set.
const INITIAL_HASH_SIZE: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecoderState {
    /// Initialized (or never started); no frame expanded yet.
    Idle,
    /// Frames are being expanded.
    Decoding,
    /// The last `advance_decoding` call ran out of frames or budget.
    Finished,
}

/// Result of scanning one frame's active list.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cutoff {
    /// Highest cost kept; tokens above it are not expanded.
    pub cutoff: f64,
    /// Number of tokens scanned.
    pub tok_count: usize,
    /// Beam actually applied, wider or narrower than the configured one
    /// when an active-count bound binds.
    pub adaptive_beam: f32,
    /// First cheapest entry of the list.
    pub best_elem: Option<ElemId>,
}

/// Best path recovered from the active set.
#[derive(Debug, Clone, PartialEq)]
pub struct Traceback {
    /// Output labels, epsilons removed.
    pub olabels: Vec<Label>,
    /// Score index consumed on each frame.
    pub alignment: Vec<Label>,
    /// Accumulated path cost, excluding the final cost.
    pub cost: f64,
    /// Final cost of `end_state` when final costs were used for selection.
    pub final_cost: Option<f32>,
    pub end_state: StateId,
}

/// Frame-synchronous Viterbi beam search over an [`Fst`].
///
/// ## Frame Loop
/// Each frame detaches the previous active list, prunes it with a cutoff that
/// bounds both the cost range and the number of survivors, expands emitting
/// arcs of the survivors into a fresh list, and then closes that list over
/// non-emitting arcs. Tokens are pooled and share their path prefixes.
pub struct FasterDecoder<'a, F: Fst + ?Sized> {
    fst: &'a F,
    config: DecoderOptions,
    /// Current frame's tokens keyed by state.
    toks: HashList<TokenId>,
    tokens: TokenArena,
    /// Scratch for `process_nonemitting`.
    queue: Vec<StateId>,
    /// Scratch for `get_cutoff`.
    tmp_array: Vec<f64>,
    /// `None` until `init_decoding`.
    num_frames_decoded: Option<usize>,
    state: DecoderState,
}

impl<'a, F: Fst + ?Sized> FasterDecoder<'a, F> {
    pub fn new(fst: &'a F, config: DecoderOptions) -> Result<Self, DecoderError> {
        config.validate()?;
        Ok(Self {
            fst,
            config,
            toks: HashList::with_buckets(INITIAL_HASH_SIZE),
            tokens: TokenArena::new(),
            queue: Vec::new(),
            tmp_array: Vec::new(),
            num_frames_decoded: None,
            state: DecoderState::Idle,
        })
    }

    /// Replaces the pruning options. Takes effect from the next frame.
    pub fn set_options(&mut self, config: DecoderOptions) -> Result<(), DecoderError> {
        config.validate()?;
        tracing::debug!("FasterDecoder: options updated {:?}", config);
        self.config = config;
        Ok(())
    }

    pub fn options(&self) -> &DecoderOptions {
        &self.config
    }

    pub fn state(&self) -> DecoderState {
        self.state
    }

    /// Frames decoded since the last `init_decoding`.
    pub fn num_frames_decoded(&self) -> usize {
        self.num_frames_decoded.unwrap_or(0)
    }

    /// Tokens in the current frame's active set.
    pub fn num_active(&self) -> usize {
        self.toks.len()
    }

    /// `(state, cost)` of every active token, in insertion order.
    pub fn active(&self) -> impl Iterator<Item = (StateId, f64)> + '_ {
        self.toks
            .iter()
            .map(move |e| (self.toks.key(e), self.tokens.cost(self.toks.val(e))))
    }

    /// Token pool counters; balanced after `reset`.
    pub fn pool_stats(&self) -> PoolStats {
        self.tokens.stats()
    }

    /// Decodes every frame the source has ready, from scratch.
    pub fn decode<D: Decodable + ?Sized>(&mut self, decodable: &mut D) -> Result<(), DecoderError> {
        self.init_decoding();
        self.advance_decoding(decodable, None)?;
        Ok(())
    }

    /// Drops any previous search and seeds the start state.
    pub fn init_decoding(&mut self) {
        self.clear_toks();
        self.num_frames_decoded = Some(0);
        self.state = DecoderState::Idle;

        let start = self.fst.start();
        if start == NO_STATE {
            tracing::warn!("FasterDecoder: graph has no start state");
            return;
        }
        let dummy_arc = Arc::new(EPSILON, EPSILON, 0.0, start);
        let tok = self.tokens.new_token(dummy_arc, 0.0, None);
        self.toks.insert(start, tok);
        self.process_nonemitting(f64::INFINITY);
        tracing::debug!("FasterDecoder: initialized at state {} ({} tokens after closure)", start, self.toks.len());
    }

    /// Decodes until the source has no more frames ready, or until
    /// `max_num_frames` further frames are done. Returns frames decoded.
    pub fn advance_decoding<D: Decodable + ?Sized>(
        &mut self,
        decodable: &mut D,
        max_num_frames: Option<usize>,
    ) -> Result<usize, DecoderError> {
        let decoded = self.num_frames_decoded.ok_or(DecoderError::NotInitialized)?;
        let ready = decodable.num_frames_ready();
        if ready < decoded {
            return Err(DecoderError::FramesNotMonotonic { decoded, ready });
        }
        let target = match max_num_frames {
            Some(max) => ready.min(decoded.saturating_add(max)),
            None => ready,
        };

        while self.num_frames_decoded() < target {
            let weight_cutoff = self.process_emitting(decodable);
            self.process_nonemitting(weight_cutoff);
            if self.toks.is_empty() {
                tracing::warn!("FasterDecoder: every token pruned at frame {}", self.num_frames_decoded() - 1);
            }
        }

        if self.state == DecoderState::Decoding {
            self.state = DecoderState::Finished;
        }
        if target > 0 && decodable.is_last_frame(target - 1) {
            tracing::debug!("FasterDecoder: reached last frame ({} decoded)", target);
        }
        Ok(target - decoded)
    }

    /// True if some active token sits on a final state.
    pub fn reached_final(&self) -> bool {
        self.toks.iter().any(|e| {
            self.tokens.cost(self.toks.val(e)) != f64::INFINITY && self.fst.is_final(self.toks.key(e))
        })
    }

    /// Output labels of the best path, or `None` if nothing is active.
    ///
    /// With `use_final_probs` and a final state reached, only final states
    /// compete and their final cost counts; otherwise the cheapest token wins.
    pub fn get_best_path(&self, use_final_probs: bool) -> Option<Vec<Label>> {
        self.get_best_traceback(use_final_probs).map(|tb| tb.olabels)
    }

    /// Like [`FasterDecoder::get_best_path`], with the frame alignment and costs.
    pub fn get_best_traceback(&self, use_final_probs: bool) -> Option<Traceback> {
        let (best_elem, final_cost) = self.best_elem(use_final_probs)?;
        let best_tok = self.toks.val(best_elem);

        let mut olabels = Vec::new();
        let mut alignment = Vec::new();
        let mut cur = Some(best_tok);
        while let Some(id) = cur {
            let tok = self.tokens.get(id);
            if let Some(label) = tok.arc.output() {
                olabels.push(label);
            }
            if tok.arc.is_emitting() {
                alignment.push(tok.arc.ilabel);
            }
            cur = tok.prev;
        }
        olabels.reverse();
        alignment.reverse();

        Some(Traceback {
            olabels,
            alignment,
            cost: self.tokens.cost(best_tok),
            final_cost,
            end_state: self.toks.key(best_elem),
        })
    }

    /// Releases every token and returns to `Idle`. Afterwards the pool stats
    /// are balanced.
    pub fn reset(&mut self) {
        self.clear_toks();
        self.num_frames_decoded = None;
        self.state = DecoderState::Idle;
    }

    fn best_elem(&self, use_final_probs: bool) -> Option<(ElemId, Option<f32>)> {
        if use_final_probs && self.reached_final() {
            let mut best: Option<(ElemId, f32)> = None;
            let mut best_cost = f64::INFINITY;
            for e in self.toks.iter() {
                let final_cost = self.fst.final_cost(self.toks.key(e));
                let this_cost = self.tokens.cost(self.toks.val(e)) + final_cost as f64;
                if this_cost < best_cost {
                    best_cost = this_cost;
                    best = Some((e, final_cost));
                }
            }
            best.map(|(e, final_cost)| (e, Some(final_cost)))
        } else {
            let mut best: Option<ElemId> = None;
            let mut best_cost = f64::INFINITY;
            for e in self.toks.iter() {
                let cost = self.tokens.cost(self.toks.val(e));
                if best.is_none() || cost < best_cost {
                    best_cost = cost;
                    best = Some(e);
                }
            }
            best.map(|e| (e, None))
        }
    }

    /// Scans the list starting at `list_head` and picks the pruning cutoff.
    ///
    /// The beam cutoff (`best + beam`) is used unless the list holds more than
    /// `max_active` tokens. In that case the cost of rank `max_active` caps
    /// it, and if the beam would then keep fewer than `min_active` tokens, the
    /// cost of rank `min_active` widens it. Tokens at exactly the cutoff
    /// are kept.
    pub(crate) fn get_cutoff(&mut self, list_head: ElemId) -> Cutoff {
        let max_active = self.config.max_active;
        let min_active = self.config.min_active;
        let beam = self.config.beam;
        let collect = max_active != usize::MAX;

        let mut best_cost = f64::INFINITY;
        let mut best_elem = None;
        let mut count = 0usize;
        self.tmp_array.clear();
        for e in self.toks.iter_from(list_head) {
            let cost = self.tokens.cost(self.toks.val(e));
            if collect {
                self.tmp_array.push(cost);
            }
            if best_elem.is_none() || cost < best_cost {
                best_cost = cost;
                best_elem = Some(e);
            }
            count += 1;
        }

        let beam_cutoff = best_cost + beam as f64;
        if count <= max_active {
            return Cutoff { cutoff: beam_cutoff, tok_count: count, adaptive_beam: beam, best_elem };
        }

        let (_, &mut max_active_cutoff, _) =
            self.tmp_array.select_nth_unstable_by(max_active - 1, |a, b| a.total_cmp(b));
        if max_active_cutoff < beam_cutoff {
            // Count bound is tighter than the beam.
            let adaptive_beam = (max_active_cutoff - best_cost) as f32 + self.config.beam_delta;
            return Cutoff { cutoff: max_active_cutoff, tok_count: count, adaptive_beam, best_elem };
        }

        if min_active > 0 {
            // The `max_active` cheapest costs now sit in the front of the buffer.
            let (_, &mut min_active_cutoff, _) =
                self.tmp_array[..max_active].select_nth_unstable_by(min_active - 1, |a, b| a.total_cmp(b));
            if min_active_cutoff > beam_cutoff {
                let adaptive_beam = (min_active_cutoff - best_cost) as f32 + self.config.beam_delta;
                return Cutoff { cutoff: min_active_cutoff, tok_count: count, adaptive_beam, best_elem };
            }
        }

        Cutoff { cutoff: beam_cutoff, tok_count: count, adaptive_beam: beam, best_elem }
    }

    fn possibly_resize_hash(&mut self, num_toks: usize) {
        let new_size = (num_toks as f32 * self.config.hash_ratio) as usize;
        if new_size > self.toks.size() {
            self.toks.set_size(new_size);
        }
    }

    /// Expands emitting arcs of the previous frame into a new active list and
    /// advances the frame counter. Returns the cutoff for the non-emitting pass.
    pub(crate) fn process_emitting<D: Decodable + ?Sized>(&mut self, decodable: &mut D) -> f64 {
        let fst = self.fst;
        let frame = self.num_frames_decoded();
        self.state = DecoderState::Decoding;
        let last_toks = self.toks.clear();
        let Cutoff { cutoff: weight_cutoff, tok_count, adaptive_beam, best_elem } = self.get_cutoff(last_toks);
        tracing::trace!(
            "FasterDecoder: frame {} active={} cutoff={:.3} adaptive_beam={:.3}",
            frame,
            tok_count,
            weight_cutoff,
            adaptive_beam
        );
        self.possibly_resize_hash(tok_count);
        let adaptive_beam = adaptive_beam as f64;

        // Bound for the new frame, seeded from the best token so pruning is
        // tight from the first expansion on.
        let mut next_weight_cutoff = f64::INFINITY;
        if let Some(best) = best_elem {
            let tok_cost = self.tokens.cost(self.toks.val(best));
            for arc in fst.emitting_arcs(self.toks.key(best)) {
                let ac_cost = decodable.acoustic_cost(frame, arc.ilabel);
                let new_weight = tok_cost + arc.weight as f64 + ac_cost as f64;
                next_weight_cutoff = next_weight_cutoff.min(new_weight + adaptive_beam);
            }
        }

        let mut e = last_toks;
        while e != NULL_ELEM {
            let state = self.toks.key(e);
            let tok = self.toks.val(e);
            let tok_cost = self.tokens.cost(tok);
            if tok_cost <= weight_cutoff {
                for arc in fst.emitting_arcs(state) {
                    let ac_cost = decodable.acoustic_cost(frame, arc.ilabel);
                    let new_weight = tok_cost + arc.weight as f64 + ac_cost as f64;
                    if new_weight <= next_weight_cutoff {
                        next_weight_cutoff = next_weight_cutoff.min(new_weight + adaptive_beam);
                        self.relax(arc, ac_cost, tok, new_weight);
                    }
                }
            }
            let next = self.toks.tail(e);
            self.tokens.delete(tok);
            self.toks.delete(e);
            e = next;
        }

        self.num_frames_decoded = Some(frame + 1);
        next_weight_cutoff
    }

    /// Closes the current list over non-emitting arcs, keeping only
    /// candidates at or below `cutoff`.
    pub(crate) fn process_nonemitting(&mut self, cutoff: f64) {
        debug_assert!(self.queue.is_empty());
        let fst = self.fst;
        let toks = &self.toks;
        self.queue.extend(toks.iter().map(|e| toks.key(e)));

        while let Some(state) = self.queue.pop() {
            let Some(e) = self.toks.find(state) else {
                continue;
            };
            let tok = self.toks.val(e);
            let tok_cost = self.tokens.cost(tok);
            if tok_cost > cutoff {
                continue;
            }
            for arc in fst.nonemitting_arcs(state) {
                let new_cost = tok_cost + arc.weight as f64;
                if new_cost > cutoff {
                    continue;
                }
                if self.relax(arc, 0.0, tok, new_cost) {
                    self.queue.push(arc.nextstate);
                }
            }
        }
    }

    /// Offers a successor of `prev` over `arc` costing `new_cost`. It is kept
    /// if the destination is empty or holds a strictly costlier token.
    /// Returns true if the active set changed.
    #[inline]
    fn relax(&mut self, arc: &Arc, ac_cost: f32, prev: TokenId, new_cost: f64) -> bool {
        match self.toks.find(arc.nextstate) {
            None => {
                let new_tok = self.tokens.new_token(*arc, ac_cost, Some(prev));
                self.toks.insert(arc.nextstate, new_tok);
                true
            }
            Some(e) => {
                let old_tok = self.toks.val(e);
                if new_cost < self.tokens.cost(old_tok) {
                    // Take the new reference before dropping the old one:
                    // `prev` may only be alive through `old_tok`.
                    let new_tok = self.tokens.new_token(*arc, ac_cost, Some(prev));
                    self.tokens.delete(old_tok);
                    self.toks.set_val(e, new_tok);
                    true
                } else {
                    false
                }
            }
        }
    }

    /// Detaches the active list and drops its tokens.
    fn clear_toks(&mut self) {
        let mut e = self.toks.clear();
        while e != NULL_ELEM {
            let next = self.toks.tail(e);
            self.tokens.delete(self.toks.val(e));
            self.toks.delete(e);
            e = next;
        }
    }
}

impl<'a, F: Fst + ?Sized> Drop for FasterDecoder<'a, F> {
    fn drop(&mut self) {
        self.clear_toks();
    }
}
