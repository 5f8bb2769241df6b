/// Dense state index into a decoding graph.
pub type StateId = u32;
/// Input (score index) or output (word) symbol.
pub type Label = u32;

/// The empty label: no output on `olabel`, no score on `ilabel`.
pub const EPSILON: Label = 0;
/// Start state of a graph that has none.
pub const NO_STATE: StateId = u32::MAX;

/// A weighted transition.
///
/// `ilabel` selects the score consumed when the arc is taken (1-based, `0`
/// for arcs that consume no frame). `weight` is a cost, i.e. a negated log
/// probability.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Arc {
    pub ilabel: Label,
    pub olabel: Label,
    pub weight: f32,
    pub nextstate: StateId,
}

impl Arc {
    pub fn new(ilabel: Label, olabel: Label, weight: f32, nextstate: StateId) -> Self {
        Self { ilabel, olabel, weight, nextstate }
    }

    #[inline(always)]
    pub fn is_emitting(&self) -> bool {
        self.ilabel != EPSILON
    }

    /// The output label, if any.
    #[inline(always)]
    pub fn output(&self) -> Option<Label> {
        if self.olabel == EPSILON {
            None
        } else {
            Some(self.olabel)
        }
    }
}

/// Read-only view of a decoding graph.
///
/// Arcs are pre-split by class so the emitting and non-emitting passes each
/// walk only the arcs they need.
pub trait Fst {
    fn start(&self) -> StateId;

    /// Cost of ending at `state`; `f32::INFINITY` if it is not final.
    fn final_cost(&self, state: StateId) -> f32;

    /// Arcs out of `state` that consume one frame of scores.
    fn emitting_arcs(&self, state: StateId) -> &[Arc];

    /// Arcs out of `state` that are traversed within a frame.
    fn nonemitting_arcs(&self, state: StateId) -> &[Arc];

    fn num_states(&self) -> usize;

    fn is_final(&self, state: StateId) -> bool {
        self.final_cost(state).is_finite()
    }
}

#[derive(Debug, Clone)]
struct VectorState {
    final_cost: f32,
    emitting: Vec<Arc>,
    nonemitting: Vec<Arc>,
}

/// A mutable in-memory graph.
#[derive(Debug, Clone)]
pub struct VectorFst {
    start: StateId,
    states: Vec<VectorState>,
}

impl VectorFst {
    pub fn new() -> Self {
        Self { start: NO_STATE, states: Vec::new() }
    }

    /// Adds a non-final state with no arcs.
    pub fn add_state(&mut self) -> StateId {
        let id = self.states.len() as StateId;
        self.states.push(VectorState {
            final_cost: f32::INFINITY,
            emitting: Vec::new(),
            nonemitting: Vec::new(),
        });
        id
    }

    pub fn set_start(&mut self, state: StateId) {
        assert!((state as usize) < self.states.len(), "VectorFst: unknown start state {}", state);
        self.start = state;
    }

    pub fn set_final(&mut self, state: StateId, cost: f32) {
        self.states[state as usize].final_cost = cost;
    }

    /// Adds `arc` leaving `src`, filed by whether it consumes a frame.
    pub fn add_arc(&mut self, src: StateId, arc: Arc) {
        assert!(
            (arc.nextstate as usize) < self.states.len(),
            "VectorFst: arc to unknown state {}",
            arc.nextstate
        );
        let state = &mut self.states[src as usize];
        if arc.is_emitting() {
            state.emitting.push(arc);
        } else {
            state.nonemitting.push(arc);
        }
    }

    pub fn num_arcs(&self, state: StateId) -> usize {
        let s = &self.states[state as usize];
        s.emitting.len() + s.nonemitting.len()
    }
}

impl Default for VectorFst {
    fn default() -> Self {
        Self::new()
    }
}

impl Fst for VectorFst {
    fn start(&self) -> StateId {
        self.start
    }

    fn final_cost(&self, state: StateId) -> f32 {
        self.states[state as usize].final_cost
    }

    #[inline]
    fn emitting_arcs(&self, state: StateId) -> &[Arc] {
        &self.states[state as usize].emitting
    }

    #[inline]
    fn nonemitting_arcs(&self, state: StateId) -> &[Arc] {
        &self.states[state as usize].nonemitting
    }

    fn num_states(&self) -> usize {
        self.states.len()
    }
}
