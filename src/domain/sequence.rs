use serde::{Deserialize, Serialize};

/// Dense row-major array indexed by `[time, batch, channel]`.
///
/// This is the layout the recurrent layers consume: time is the
/// outermost dimension, so one time step for the whole batch is a
/// contiguous block of `batch * channels` values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequenceArray {
    shape:  [usize; 3],
    values: Vec<f32>,
}

impl SequenceArray {
    /// Wrap a flat buffer. Returns `None` if the buffer length does
    /// not match the product of the shape.
    pub fn new(shape: [usize; 3], values: Vec<f32>) -> Option<Self> {
        (shape.iter().product::<usize>() == values.len()).then_some(Self { shape, values })
    }

    pub fn zeros(shape: [usize; 3]) -> Self {
        Self { shape, values: vec![0.0; shape.iter().product()] }
    }

    pub fn shape(&self) -> [usize; 3] { self.shape }

    pub fn steps(&self) -> usize { self.shape[0] }

    pub fn batch_size(&self) -> usize { self.shape[1] }

    pub fn channels(&self) -> usize { self.shape[2] }

    pub fn values(&self) -> &[f32] { &self.values }

    pub fn into_values(self) -> Vec<f32> { self.values }

    fn offset(&self, t: usize, b: usize, c: usize) -> usize {
        (t * self.shape[1] + b) * self.shape[2] + c
    }

    pub fn get(&self, t: usize, b: usize, c: usize) -> f32 {
        self.values[self.offset(t, b, c)]
    }

    pub fn set(&mut self, t: usize, b: usize, c: usize, value: f32) {
        let i = self.offset(t, b, c);
        self.values[i] = value;
    }

    /// The time series of one batch element / channel, e.g. for plotting.
    pub fn series(&self, b: usize, c: usize) -> Vec<f32> {
        (0..self.steps()).map(|t| self.get(t, b, c)).collect()
    }
}

/// One next-step prediction example: `target` is `input` advanced by
/// one time step. Both have shape `(L - 1, B, 1)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SequenceSample {
    pub input:  SequenceArray,
    pub target: SequenceArray,
}

impl SequenceSample {
    pub fn shape(&self) -> [usize; 3] { self.input.shape() }
}
