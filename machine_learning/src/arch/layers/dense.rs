use ndarray::{linalg, prelude::*};

use super::ensure_shape;
use crate::{MlErr, Result, arch::activations::ActFn};

/// A fully connected layer over flat features.
///
/// Parameters are laid out as the row-major `(in, out)` weight block followed
/// by one bias per unit.
pub struct Dense {
    dim: (usize, usize),
    act_fn: Option<ActFn>,
    size: usize,

    // Forward metadata
    x: Array2<f32>,
    z: Array2<f32>,
    a: Array2<f32>,

    // Backward metadata
    d: Array2<f32>,
}

impl Dense {
    /// Creates a new `Dense`.
    ///
    /// # Arguments
    /// * `dim` - The `(input, output)` dimensions of the layer.
    /// * `act_fn` - An optional activation applied on the pre-activations.
    pub fn new(dim: (usize, usize), act_fn: Option<ActFn>) -> Self {
        let zeros = Array2::zeros((1, 1));

        Self {
            dim,
            size: (dim.0 + 1) * dim.1,
            act_fn,
            x: zeros.clone(),
            z: zeros.clone(),
            a: zeros.clone(),
            d: zeros,
        }
    }

    /// Returns the amount of parameters this layer has.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Makes a forward pass, keeping the pre-activations for `backward`.
    pub fn forward<'a>(
        &'a mut self,
        params: &'a [f32],
        x: ArrayView2<'a, f32>,
    ) -> Result<ArrayView2<'a, f32>> {
        if x.ncols() != self.dim.0 {
            return Err(MlErr::SizeMismatch {
                a: "input",
                b: "dense",
                got: x.ncols(),
                expected: self.dim.0,
            });
        }

        let (w, b) = self.view_params(params);
        let shape = (x.nrows(), self.dim.1);

        ensure_shape(&mut self.z, shape);
        linalg::general_mat_mul(1.0, &x, &w, 0.0, &mut self.z);
        self.z += &b;

        self.x = x.to_owned();

        let Some(act_fn) = self.act_fn else {
            return Ok(self.z.view());
        };

        ensure_shape(&mut self.a, shape);
        self.a.zip_mut_with(&self.z, |a, &z| *a = act_fn.f(z));
        Ok(self.a.view())
    }

    /// Propagates `d` backward, writing this layer's gradient into `grad`.
    pub fn backward<'a>(
        &'a mut self,
        params: &'a [f32],
        grad: &'a mut [f32],
        mut d: ArrayViewMut2<'a, f32>,
    ) -> Result<ArrayViewMut2<'a, f32>> {
        if d.ncols() != self.dim.1 {
            return Err(MlErr::SizeMismatch {
                a: "delta",
                b: "dense",
                got: d.ncols(),
                expected: self.dim.1,
            });
        }

        if let Some(act_fn) = self.act_fn {
            d.zip_mut_with(&self.z, |d, &z| *d *= act_fn.df(z));
        }

        let (mut dw, mut db) = self.view_grad(grad);
        linalg::general_mat_mul(1.0, &self.x.t(), &d, 0.0, &mut dw);
        db.assign(&d.sum_axis(Axis(0)));

        let (w, _) = Self::param_views(self.dim, self.size, params);
        ensure_shape(&mut self.d, (d.nrows(), self.dim.0));
        linalg::general_mat_mul(1.0, &d, &w.t(), 0.0, &mut self.d);

        Ok(self.d.view_mut())
    }

    /// Gives a view of the raw gradient slice as the delta weights and delta biases of this layer.
    fn view_grad<'g>(&self, grad: &'g mut [f32]) -> (ArrayViewMut2<'g, f32>, ArrayViewMut1<'g, f32>) {
        let w_size = self.size - self.dim.1;
        let (dw_raw, db_raw) = grad.split_at_mut(w_size);

        // SAFETY: The caller hands a slice of exactly `size` elements.
        let dw = ArrayViewMut2::from_shape(self.dim, dw_raw).unwrap();
        let db = ArrayViewMut1::from_shape(self.dim.1, db_raw).unwrap();
        (dw, db)
    }

    /// Gives a view of the raw parameter slice as the weights and biases of this layer.
    fn view_params<'p>(&self, params: &'p [f32]) -> (ArrayView2<'p, f32>, ArrayView1<'p, f32>) {
        Self::param_views(self.dim, self.size, params)
    }

    fn param_views(
        dim: (usize, usize),
        size: usize,
        params: &[f32],
    ) -> (ArrayView2<'_, f32>, ArrayView1<'_, f32>) {
        let w_size = size - dim.1;

        // SAFETY: The caller hands a slice of exactly `size` elements.
        let weights = ArrayView2::from_shape(dim, &params[..w_size]).unwrap();
        let biases = ArrayView1::from_shape(dim.1, &params[w_size..]).unwrap();
        (weights, biases)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_applies_weights_and_bias() {
        let mut dense = Dense::new((2, 2), None);

        // w = [[1, 2], [3, 4]], b = [10, 20]
        let params = [1., 2., 3., 4., 10., 20.];
        let x = ndarray::array![[1., 1.], [2., 0.]];

        let out = dense.forward(&params, x.view()).unwrap();
        assert_eq!(out, ndarray::array![[14., 26.], [12., 24.]]);
    }

    #[test]
    fn backward_computes_gradients() {
        let mut dense = Dense::new((2, 1), None);

        // w = [[2], [3]], b = [0]
        let params = [2., 3., 0.];
        let x = ndarray::array![[1., 2.]];
        let mut grad = [0.; 3];

        dense.forward(&params, x.view()).unwrap();

        let mut d = ndarray::array![[1.]];
        let dx = dense.backward(&params, &mut grad, d.view_mut()).unwrap().to_owned();

        // dw = x^T * d, db = sum(d), dx = d * w^T
        assert_eq!(grad, [1., 2., 1.]);
        assert_eq!(dx, ndarray::array![[2., 3.]]);
    }

    #[test]
    fn rejects_wrong_input_width() {
        let mut dense = Dense::new((3, 1), None);
        let params = [0.; 4];
        let x = ndarray::array![[1., 2.]];
        assert!(dense.forward(&params, x.view()).is_err());
    }
}
