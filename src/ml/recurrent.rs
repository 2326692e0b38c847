// ============================================================
// Layer 5 — Analog Recurrent Layer
// ============================================================
// Recurrent cells whose input-to-hidden and hidden-to-hidden
// projections are AnalogLinear tiles. Gates are fused: one tile
// computes all gates for the input, one for the hidden state.
//
//   Vanilla: h' = tanh(W_ih x + W_hh h)
//
//   LSTM:    [i, f, g, o] = W_ih x + W_hh h
//            c' = σ(f) ⊙ c + σ(i) ⊙ tanh(g)
//            h' = σ(o) ⊙ tanh(c')
//
//   GRU:     r  = σ(x_r + h_r)
//            z  = σ(x_z + h_z)
//            n  = tanh(x_n + r ⊙ h_n)
//            h' = n + z ⊙ (h - n)
//
// Tensors are time-major: [time, batch, features].

use burn::{
    nn::{Dropout, DropoutConfig},
    prelude::*,
    tensor::activation::sigmoid,
};
use serde::{Deserialize, Serialize};

use crate::ml::analog::{AnalogContext, AnalogInference, AnalogLinear, AnalogLinearConfig, NoiseSource};

/// Which recurrent cell the layer is built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CellKind {
    Vanilla,
    Lstm,
    Gru,
}

impl CellKind {
    /// Number of fused gate blocks in the projections
    pub fn gates(self) -> usize {
        match self {
            CellKind::Vanilla => 1,
            CellKind::Gru => 3,
            CellKind::Lstm => 4,
        }
    }

    pub fn from_gates(gates: usize) -> Option<Self> {
        match gates {
            1 => Some(CellKind::Vanilla),
            3 => Some(CellKind::Gru),
            4 => Some(CellKind::Lstm),
            _ => None,
        }
    }
}

/// Hidden state of one cell; `cell` is only used by LSTM.
#[derive(Debug, Clone)]
pub struct CellState<B: Backend> {
    pub hidden: Tensor<B, 2>,
    pub cell:   Option<Tensor<B, 2>>,
}

impl<B: Backend> CellState<B> {
    pub fn new(hidden: Tensor<B, 2>) -> Self {
        Self { hidden, cell: None }
    }
}

/// Final states of every cell, indexed `layer * directions + direction`.
#[derive(Debug, Clone)]
pub struct RnnState<B: Backend> {
    pub cells: Vec<CellState<B>>,
}

// ─── Cell ─────────────────────────────────────────────────────────────────────

#[derive(Module, Debug)]
pub struct AnalogCell<B: Backend> {
    /// `d_input → gates * hidden`
    pub input:       AnalogLinear<B>,
    /// `hidden → gates * hidden`
    pub hidden:      AnalogLinear<B>,
    pub hidden_size: usize,
    pub gates:       usize,
}

impl<B: Backend> AnalogCell<B> {
    pub fn new(
        kind:        CellKind,
        d_input:     usize,
        hidden_size: usize,
        device:      &B::Device,
        noise:       &mut NoiseSource,
    ) -> Self {
        let gates = kind.gates();
        let bound = 1.0 / (hidden_size as f64).sqrt();
        let input  = AnalogLinearConfig::new(d_input, gates * hidden_size)
            .init_with_bound(bound, device, noise);
        let hidden = AnalogLinearConfig::new(hidden_size, gates * hidden_size)
            .init_with_bound(bound, device, noise);
        Self { input, hidden, hidden_size, gates }
    }

    pub fn kind(&self) -> CellKind {
        CellKind::from_gates(self.gates).unwrap_or(CellKind::Vanilla)
    }

    pub fn zero_state(&self, batch: usize, device: &B::Device) -> CellState<B> {
        let hidden = Tensor::zeros([batch, self.hidden_size], device);
        let cell = (self.kind() == CellKind::Lstm).then(|| hidden.clone());
        CellState { hidden, cell }
    }

    /// Run the cell over `input` (`[time, batch, d_input]`), walking
    /// time backwards when `reverse` is set. Outputs are returned in
    /// forward time order either way.
    pub fn forward(
        &self,
        input:   Tensor<B, 3>,
        state:   Option<CellState<B>>,
        reverse: bool,
        ctx:     &mut AnalogContext,
    ) -> (Tensor<B, 3>, CellState<B>) {
        let [steps, batch, d_input] = input.dims();
        let width  = self.gates * self.hidden_size;
        let device = input.device();

        // one draw of tile noise per sequence
        let w_ih = self.input.effective_weight(ctx);
        let w_hh = self.hidden.effective_weight(ctx);

        // input projections for all steps at once
        let projected = self
            .input
            .project(input.reshape([steps * batch, d_input]), &w_ih)
            .reshape([steps, batch, width]);

        let mut state = state.unwrap_or_else(|| self.zero_state(batch, &device));
        let order: Vec<usize> = if reverse {
            (0..steps).rev().collect()
        } else {
            (0..steps).collect()
        };

        let mut outputs = Vec::with_capacity(steps);
        for t in order {
            let x_t = projected
                .clone()
                .slice([t..t + 1, 0..batch, 0..width])
                .reshape([batch, width]);
            let h_t = self.hidden.project(state.hidden.clone(), &w_hh);
            state = self.step(x_t, h_t, state);
            outputs.push(state.hidden.clone());
        }
        if reverse {
            outputs.reverse();
        }

        (Tensor::stack(outputs, 0), state)
    }

    fn step(&self, x: Tensor<B, 2>, h: Tensor<B, 2>, state: CellState<B>) -> CellState<B> {
        let n = self.hidden_size;
        match self.kind() {
            CellKind::Vanilla => CellState::new((x + h).tanh()),
            CellKind::Lstm => {
                let gates = x + h;
                let i = sigmoid(gates.clone().narrow(1, 0, n));
                let f = sigmoid(gates.clone().narrow(1, n, n));
                let g = gates.clone().narrow(1, 2 * n, n).tanh();
                let o = sigmoid(gates.narrow(1, 3 * n, n));

                let c_prev = state.cell.unwrap_or_else(|| state.hidden.zeros_like());
                let c = f * c_prev + i * g;
                let hidden = o * c.clone().tanh();
                CellState { hidden, cell: Some(c) }
            }
            CellKind::Gru => {
                let r = sigmoid(x.clone().narrow(1, 0, n) + h.clone().narrow(1, 0, n));
                let z = sigmoid(x.clone().narrow(1, n, n) + h.clone().narrow(1, n, n));
                let candidate = (x.narrow(1, 2 * n, n) + r * h.narrow(1, 2 * n, n)).tanh();
                let hidden = candidate.clone() + z * (state.hidden - candidate);
                CellState::new(hidden)
            }
        }
    }

    fn tiles_mut(&mut self) -> [&mut AnalogLinear<B>; 2] {
        [&mut self.input, &mut self.hidden]
    }
}

// ─── Layer (one or two directions) ────────────────────────────────────────────

#[derive(Module, Debug)]
pub struct AnalogRnnLayer<B: Backend> {
    pub forward_cell:  AnalogCell<B>,
    pub backward_cell: Option<AnalogCell<B>>,
}

impl<B: Backend> AnalogRnnLayer<B> {
    pub fn directions(&self) -> usize {
        if self.backward_cell.is_some() { 2 } else { 1 }
    }

    /// Output is `[time, batch, hidden * directions]`, the forward
    /// direction first along the feature axis.
    pub fn forward(
        &self,
        input:     Tensor<B, 3>,
        fwd_state: Option<CellState<B>>,
        bwd_state: Option<CellState<B>>,
        ctx:       &mut AnalogContext,
    ) -> (Tensor<B, 3>, Vec<CellState<B>>) {
        match &self.backward_cell {
            None => {
                let (out, state) = self.forward_cell.forward(input, fwd_state, false, ctx);
                (out, vec![state])
            }
            Some(backward) => {
                let (out_f, state_f) = self.forward_cell.forward(input.clone(), fwd_state, false, ctx);
                let (out_b, state_b) = backward.forward(input, bwd_state, true, ctx);
                (Tensor::cat(vec![out_f, out_b], 2), vec![state_f, state_b])
            }
        }
    }

    fn tiles_mut(&mut self) -> Vec<&mut AnalogLinear<B>> {
        let mut tiles: Vec<&mut AnalogLinear<B>> = self.forward_cell.tiles_mut().into_iter().collect();
        if let Some(backward) = self.backward_cell.as_mut() {
            tiles.extend(backward.tiles_mut());
        }
        tiles
    }
}

// ─── Stacked recurrent layer ──────────────────────────────────────────────────

#[derive(Config, Debug)]
pub struct AnalogRnnConfig {
    pub d_input:  usize,
    pub d_hidden: usize,
    pub cell:     CellKind,
    #[config(default = 1)]
    pub num_layers: usize,
    #[config(default = false)]
    pub bidirectional: bool,
    /// Applied between stacked layers, not after the last one
    #[config(default = 0.0)]
    pub dropout: f64,
}

impl AnalogRnnConfig {
    pub fn init<B: Backend>(&self, device: &B::Device, noise: &mut NoiseSource) -> AnalogRnn<B> {
        let directions = if self.bidirectional { 2 } else { 1 };
        let layers = (0..self.num_layers)
            .map(|i| {
                let d_input = if i == 0 { self.d_input } else { self.d_hidden * directions };
                let forward_cell = AnalogCell::new(self.cell, d_input, self.d_hidden, device, noise);
                let backward_cell = self
                    .bidirectional
                    .then(|| AnalogCell::new(self.cell, d_input, self.d_hidden, device, noise));
                AnalogRnnLayer { forward_cell, backward_cell }
            })
            .collect();
        AnalogRnn {
            layers,
            dropout: DropoutConfig::new(self.dropout).init(),
        }
    }
}

#[derive(Module, Debug)]
pub struct AnalogRnn<B: Backend> {
    pub layers:  Vec<AnalogRnnLayer<B>>,
    pub dropout: Dropout,
}

impl<B: Backend> AnalogRnn<B> {
    pub fn directions(&self) -> usize {
        self.layers.first().map_or(1, AnalogRnnLayer::directions)
    }

    /// `input` is `[time, batch, d_input]`; returns
    /// `[time, batch, d_hidden * directions]` and the final states.
    /// Missing entries of `state` start from zero.
    pub fn forward(
        &self,
        input: Tensor<B, 3>,
        state: Option<RnnState<B>>,
        ctx:   &mut AnalogContext,
    ) -> (Tensor<B, 3>, RnnState<B>) {
        let directions = self.directions();
        let mut incoming: Vec<Option<CellState<B>>> = state
            .map(|s| s.cells.into_iter().map(Some).collect())
            .unwrap_or_default();
        let mut take = |i: usize| incoming.get_mut(i).and_then(Option::take);

        let mut x = input;
        let mut cells = Vec::with_capacity(self.layers.len() * directions);
        for (i, layer) in self.layers.iter().enumerate() {
            let fwd_state = take(i * directions);
            let bwd_state = if directions == 2 { take(i * directions + 1) } else { None };

            let (out, states) = layer.forward(x, fwd_state, bwd_state, ctx);
            cells.extend(states);
            x = if i + 1 < self.layers.len() { self.dropout.forward(out) } else { out };
        }

        (x, RnnState { cells })
    }

    pub(crate) fn tiles_mut(&mut self) -> Vec<&mut AnalogLinear<B>> {
        self.layers.iter_mut().flat_map(AnalogRnnLayer::tiles_mut).collect()
    }
}

impl<B: Backend> AnalogInference for AnalogRnn<B> {
    fn program_analog_weights(&mut self, ctx: &mut AnalogContext) {
        for tile in self.tiles_mut() {
            tile.program_analog_weights(ctx);
        }
    }

    fn drift_analog_weights(&mut self, t_inference: f64, ctx: &mut AnalogContext) {
        for tile in self.tiles_mut() {
            tile.drift_analog_weights(t_inference, ctx);
        }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::analog::AnalogTileConfig;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    fn ctx() -> AnalogContext {
        AnalogContext::new(AnalogTileConfig::ideal(), NoiseSource::seeded(42))
    }

    fn input(steps: usize, batch: usize, features: usize) -> Tensor<TestBackend, 3> {
        NoiseSource::seeded(1).uniform([steps, batch, features], 0.0, 1.0, &Default::default())
    }

    fn build(cell: CellKind, layers: usize, bidirectional: bool) -> AnalogRnn<TestBackend> {
        AnalogRnnConfig::new(3, 8, cell)
            .with_num_layers(layers)
            .with_bidirectional(bidirectional)
            .init(&Default::default(), &mut NoiseSource::seeded(0))
    }

    #[test]
    fn test_gate_counts_round_trip() {
        for kind in [CellKind::Vanilla, CellKind::Lstm, CellKind::Gru] {
            assert_eq!(CellKind::from_gates(kind.gates()), Some(kind));
        }
        assert_eq!(CellKind::from_gates(2), None);
    }

    #[test]
    fn test_output_shapes_for_every_cell() {
        for kind in [CellKind::Vanilla, CellKind::Lstm, CellKind::Gru] {
            let rnn = build(kind, 1, false);
            let (out, state) = rnn.forward(input(6, 2, 3), None, &mut ctx());
            assert_eq!(out.dims(), [6, 2, 8]);
            assert_eq!(state.cells.len(), 1);
            assert_eq!(state.cells[0].hidden.dims(), [2, 8]);
            assert_eq!(state.cells[0].cell.is_some(), kind == CellKind::Lstm);
        }
    }

    #[test]
    fn test_bidirectional_concatenates_features() {
        let rnn = build(CellKind::Gru, 2, true);
        assert_eq!(rnn.directions(), 2);
        let (out, state) = rnn.forward(input(5, 3, 3), None, &mut ctx());
        assert_eq!(out.dims(), [5, 3, 16]);
        assert_eq!(state.cells.len(), 4);
    }

    #[test]
    fn test_last_output_equals_final_state() {
        let rnn = build(CellKind::Vanilla, 1, false);
        let (out, state) = rnn.forward(input(4, 2, 3), None, &mut ctx());
        let last = out.slice([3..4, 0..2, 0..8]).reshape([2, 8]);
        let diff: f32 = (last - state.cells[0].hidden.clone())
            .abs()
            .max()
            .into_scalar()
            .elem();
        assert!(diff < 1e-6);
    }

    #[test]
    fn test_backward_direction_ends_at_first_step() {
        let rnn = build(CellKind::Vanilla, 1, true);
        let (out, state) = rnn.forward(input(4, 1, 3), None, &mut ctx());
        // backward half of the output at t = 0 is the backward cell's final state
        let first_bwd = out.slice([0..1, 0..1, 8..16]).reshape([1, 8]);
        let diff: f32 = (first_bwd - state.cells[1].hidden.clone())
            .abs()
            .max()
            .into_scalar()
            .elem();
        assert!(diff < 1e-6);
    }

    #[test]
    fn test_initial_state_changes_output() {
        let rnn = build(CellKind::Lstm, 1, false);
        let x = input(3, 2, 3);
        let (out_zero, state) = rnn.forward(x.clone(), None, &mut ctx());
        let (out_carry, _) = rnn.forward(x, Some(state), &mut ctx());
        let diff: f32 = (out_zero - out_carry).abs().max().into_scalar().elem();
        assert!(diff > 0.0);
    }

    #[test]
    fn test_tile_count() {
        // two tiles per cell
        assert_eq!(build(CellKind::Vanilla, 1, false).tiles_mut().len(), 2);
        assert_eq!(build(CellKind::Lstm, 2, true).tiles_mut().len(), 8);
    }
}
