use parking_lot::{Mutex, RwLock};

use crate::optimization::{Optimizer, SizeMismatchErr};

/// One server's shard of the flat parameter vector, shared across the
/// per-worker connection tasks.
///
/// Gradient pushes apply immediately through the optimizer; weight pulls
/// snapshot whatever the parameters are at that moment. That is the
/// asynchronous-training contract: workers may compute on slightly stale
/// weights.
pub struct ShardState {
    params: RwLock<Box<[f32]>>,
    optimizer: Mutex<Box<dyn Optimizer + Send>>,
}

impl ShardState {
    /// Creates a new `ShardState`.
    ///
    /// # Arguments
    /// * `params` - The shard's initial parameter values.
    /// * `optimizer` - The optimization algorithm, state sized to `params`.
    pub fn new(params: Vec<f32>, optimizer: Box<dyn Optimizer + Send>) -> Self {
        Self {
            params: RwLock::new(params.into_boxed_slice()),
            optimizer: Mutex::new(optimizer),
        }
    }

    /// The amount of parameters this shard holds.
    pub fn len(&self) -> usize {
        self.params.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copies the current weights into `out`, resizing it to fit.
    pub fn pull_into(&self, out: &mut Vec<f32>) {
        let params = self.params.read();
        out.clear();
        out.extend_from_slice(&params);
    }

    /// Applies one pushed gradient through the optimizer.
    pub fn apply(&self, grad: &[f32]) -> Result<(), SizeMismatchErr> {
        let mut optimizer = self.optimizer.lock();
        let mut params = self.params.write();
        optimizer.update_params(grad, &mut params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimization::GradientDescent;

    fn shard(values: &[f32]) -> ShardState {
        ShardState::new(values.to_vec(), Box::new(GradientDescent::new(1.0)))
    }

    #[test]
    fn pulls_see_applied_gradients() {
        let state = shard(&[1.0, 2.0, 3.0]);

        state.apply(&[1.0, 1.0, 1.0]).unwrap();
        state.apply(&[0.0, 1.0, 2.0]).unwrap();

        let mut out = Vec::new();
        state.pull_into(&mut out);
        assert_eq!(out, [0.0, 0.0, -1.0]);
    }

    #[test]
    fn rejects_mismatched_gradient() {
        let state = shard(&[1.0, 2.0]);
        assert!(state.apply(&[1.0]).is_err());
    }

    #[test]
    fn concurrent_pushes_all_land() {
        use std::sync::Arc;

        let state = Arc::new(shard(&[0.0; 8]));
        let mut handles = Vec::new();

        for _ in 0..4 {
            let state = Arc::clone(&state);
            handles.push(std::thread::spawn(move || {
                for _ in 0..100 {
                    state.apply(&[1.0; 8]).unwrap();
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        let mut out = Vec::new();
        state.pull_into(&mut out);
        assert_eq!(out, [-400.0; 8]);
    }
}
