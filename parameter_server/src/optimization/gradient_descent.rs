use super::{Optimizer, SizeMismatchErr};

/// Plain stochastic gradient descent.
#[derive(Debug)]
pub struct GradientDescent {
    learning_rate: f32,
}

impl GradientDescent {
    /// Creates a new `GradientDescent` optimizer.
    ///
    /// # Arguments
    /// * `learning_rate` - The small coefficient that modulates the amount of
    ///   training per update.
    pub fn new(learning_rate: f32) -> Self {
        Self { learning_rate }
    }
}

impl Optimizer for GradientDescent {
    fn update_params(&mut self, grad: &[f32], params: &mut [f32]) -> Result<(), SizeMismatchErr> {
        if grad.len() != params.len() {
            return Err(SizeMismatchErr);
        }

        params
            .iter_mut()
            .zip(grad)
            .for_each(|(p, g)| *p -= self.learning_rate * g);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn steps_against_the_gradient() {
        let mut sgd = GradientDescent::new(0.5);
        let mut params = [1.0, -1.0];

        sgd.update_params(&[2.0, -2.0], &mut params).unwrap();
        assert_eq!(params, [0.0, 0.0]);
    }

    #[test]
    fn rejects_length_mismatch() {
        let mut sgd = GradientDescent::new(0.5);
        assert_eq!(
            sgd.update_params(&[1.0], &mut [1.0, 2.0]),
            Err(SizeMismatchErr)
        );
    }
}
