pub mod adam;
pub mod sgd;

pub use adam::Adam;
pub use sgd::Sgd;

/// Parameter update rule applied after each mini-batch.
///
/// A training step calls `begin_step` once, then `step` for every parameter
/// tensor. `slot` identifies the tensor and is stable across steps, which
/// lets stateful optimizers keep per-tensor buffers.
pub trait Optimizer {
    fn name(&self) -> &'static str;

    fn begin_step(&mut self) {}

    fn step(&mut self, slot: usize, params: &mut [f64], grads: &[f64]);
}
