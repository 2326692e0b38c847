// ============================================================
// Layer 4 — Sequence Batcher
// ============================================================
// Turns a framework-free SequenceSample into Burn tensors on a
// device, and turns model output tensors back into
// SequenceArrays for the domain layer.
//
// The whole dataset is one batch: the training loop feeds the
// full [time, batch, 1] input at every epoch, so there is no
// DataLoader or shuffling here.
//
// Reference: Burn Book §4 (Batcher)

use anyhow::{anyhow, Result};
use burn::{prelude::*, tensor::TensorData};

use crate::domain::sequence::{SequenceArray, SequenceSample};

/// Input and target tensors, shape `[time, batch, 1]`.
#[derive(Debug, Clone)]
pub struct SequenceBatch<B: Backend> {
    pub input:  Tensor<B, 3>,
    pub target: Tensor<B, 3>,
}

/// Holds the target device so tensors are created where the
/// model lives.
#[derive(Clone, Debug)]
pub struct SequenceBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> SequenceBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }

    pub fn batch(&self, sample: &SequenceSample) -> SequenceBatch<B> {
        SequenceBatch {
            input:  to_tensor(&sample.input, &self.device),
            target: to_tensor(&sample.target, &self.device),
        }
    }
}

/// Copy a SequenceArray onto `device` keeping its `[time, batch, channel]` shape.
pub fn to_tensor<B: Backend>(array: &SequenceArray, device: &B::Device) -> Tensor<B, 3> {
    let data = TensorData::new(array.values().to_vec(), array.shape());
    Tensor::from_data(data, device)
}

/// Read a `[time, batch, channel]` tensor back into host memory.
pub fn to_array<B: Backend>(tensor: Tensor<B, 3>) -> Result<SequenceArray> {
    let shape  = tensor.dims();
    let values = tensor
        .into_data()
        .to_vec::<f32>()
        .map_err(|e| anyhow!("Cannot read tensor data: {e:?}"))?;
    SequenceArray::new(shape, values)
        .ok_or_else(|| anyhow!("Tensor data does not match shape {shape:?}"))
}
