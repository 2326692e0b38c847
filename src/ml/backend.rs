// Backend selection. ndarray on the CPU by default; the `wgpu`
// feature moves training to the GPU.

#[cfg(not(feature = "wgpu"))]
pub type InnerBackend = burn::backend::NdArray;

#[cfg(feature = "wgpu")]
pub type InnerBackend = burn::backend::Wgpu;

/// Backend used for training, with gradients
pub type TrainBackend = burn::backend::Autodiff<InnerBackend>;

pub type Device = <InnerBackend as burn::tensor::backend::Backend>::Device;

pub fn default_device() -> Device {
    let device = Device::default();
    tracing::info!("Using device: {:?}", device);
    device
}
