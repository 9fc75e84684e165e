use rayon::prelude::*;

use super::{Optimizer, SizeMismatchErr};

// Shards hold tens of thousands of parameters; chunked updates keep the work
// parallel without per-element task overhead.
const CHUNK: usize = 4096;

/// RMSprop with a running second-moment accumulator per parameter.
#[derive(Debug)]
pub struct RmsProp {
    learning_rate: f32,
    rho: f32,
    epsilon: f32,
    s: Box<[f32]>,
}

impl RmsProp {
    /// Creates a new `RmsProp` optimizer.
    ///
    /// # Arguments
    /// * `len` - The amount of parameters this instance should hold state for.
    /// * `learning_rate` - The small coefficient that modulates the amount of
    ///   training per update.
    /// * `rho`, `epsilon` - Hyperparameters to the optimization algorithm.
    pub fn new(len: usize, learning_rate: f32, rho: f32, epsilon: f32) -> Self {
        Self {
            learning_rate,
            rho,
            epsilon,
            s: vec![0.; len].into_boxed_slice(),
        }
    }
}

impl Optimizer for RmsProp {
    fn update_params(&mut self, grad: &[f32], params: &mut [f32]) -> Result<(), SizeMismatchErr> {
        if grad.len() != params.len() || params.len() != self.s.len() {
            return Err(SizeMismatchErr);
        }

        let Self {
            learning_rate: lr,
            rho,
            epsilon: eps,
            ..
        } = *self;

        params
            .par_chunks_mut(CHUNK)
            .zip(grad.par_chunks(CHUNK))
            .zip(self.s.par_chunks_mut(CHUNK))
            .for_each(|((params, grad), s)| {
                params
                    .iter_mut()
                    .zip(grad)
                    .zip(s.iter_mut())
                    .for_each(|((p, g), s)| {
                        *s = rho * *s + (1. - rho) * g.powi(2);
                        *p -= lr * g / (s.sqrt() + eps);
                    });
            });

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_the_update_recurrence() {
        let (lr, rho, eps) = (0.1, 0.9, 1e-7);
        let mut rms = RmsProp::new(1, lr, rho, eps);
        let mut params = [1.0_f32];

        let mut s = 0.0_f32;
        let mut expected = 1.0_f32;
        for g in [0.5_f32, -0.25, 0.125] {
            rms.update_params(&[g], &mut params).unwrap();

            s = rho * s + (1. - rho) * g * g;
            expected -= lr * g / (s.sqrt() + eps);
            assert!((params[0] - expected).abs() < 1e-6);
        }
    }

    #[test]
    fn first_step_is_near_sign_sgd() {
        // With s starting at zero the first update divides the gradient by
        // roughly its own magnitude.
        let mut rms = RmsProp::new(1, 0.1, 0.9, 1e-7);
        let mut params = [0.0_f32];

        rms.update_params(&[4.0], &mut params).unwrap();
        let expected = -0.1 * 4.0 / (0.1_f32 * 16.0).sqrt();
        assert!((params[0] - expected).abs() < 1e-4);
    }

    #[test]
    fn rejects_state_length_mismatch() {
        let mut rms = RmsProp::new(2, 0.1, 0.9, 1e-7);
        assert_eq!(rms.update_params(&[1.0], &mut [1.0]), Err(SizeMismatchErr));
    }
}
