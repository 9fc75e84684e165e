use ndarray::{linalg, parallel::prelude::*, prelude::*};

use super::ensure_shape;
use crate::{MlErr, Result, arch::activations::ActFn};

/// A two-dimensional convolution over channels-last feature maps.
///
/// Valid padding, stride 1. Parameters are laid out as the row-major
/// `(ky, kx, in_c, out_c)` kernel block followed by one bias per filter,
/// matching the column order of the im2col lowering used below.
pub struct Conv2d {
    in_shape: (usize, usize, usize),
    out_shape: (usize, usize, usize),
    kernel: usize,
    act_fn: Option<ActFn>,
    size: usize,

    // Forward metadata
    cols: Array2<f32>,
    z: Array2<f32>,
    out: Array2<f32>,

    // Backward metadata
    dcols: Array2<f32>,
    dx: Array2<f32>,
}

impl Conv2d {
    /// Creates a new `Conv2d`.
    ///
    /// # Arguments
    /// * `in_shape` - The `(height, width, channels)` shape of one input sample.
    /// * `filters` - The amount of output channels.
    /// * `kernel` - The side of the square kernel window, must fit `in_shape`.
    /// * `act_fn` - An optional activation applied on the pre-activations.
    pub fn new(
        in_shape: (usize, usize, usize),
        filters: usize,
        kernel: usize,
        act_fn: Option<ActFn>,
    ) -> Self {
        let (h, w, c) = in_shape;
        let out_shape = (h - kernel + 1, w - kernel + 1, filters);
        let zeros = Array2::zeros((1, 1));

        Self {
            in_shape,
            out_shape,
            kernel,
            act_fn,
            size: kernel * kernel * c * filters + filters,
            cols: zeros.clone(),
            z: zeros.clone(),
            out: zeros.clone(),
            dcols: zeros.clone(),
            dx: zeros,
        }
    }

    /// Returns the amount of parameters this layer has.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn out_shape(&self) -> (usize, usize, usize) {
        self.out_shape
    }

    /// Makes a forward pass, keeping the lowered windows and pre-activations
    /// for `backward`.
    pub fn forward<'a>(
        &'a mut self,
        params: &'a [f32],
        x: ArrayView2<'a, f32>,
    ) -> Result<ArrayView2<'a, f32>> {
        let (h, w, c) = self.in_shape;
        let (oh, ow, oc) = self.out_shape;
        let (k, batch) = (self.kernel, x.nrows());

        if x.ncols() != h * w * c {
            return Err(MlErr::SizeMismatch {
                a: "input",
                b: "conv2d",
                got: x.ncols(),
                expected: h * w * c,
            });
        }

        let x4 = x
            .into_shape_with_order((batch, h, w, c))
            .map_err(|_| MlErr::NotContiguous { what: "conv2d input" })?;

        let patch = k * k * c;
        ensure_shape(&mut self.cols, (batch * oh * ow, patch));

        // SAFETY: Freshly ensured buffers are standard layout.
        let mut cols3 = self
            .cols
            .view_mut()
            .into_shape_with_order((batch, oh * ow, patch))
            .unwrap();

        // One row per output position; samples are independent.
        cols3
            .outer_iter_mut()
            .into_par_iter()
            .zip(x4.outer_iter().into_par_iter())
            .for_each(|(mut cols_b, x_b)| {
                for oy in 0..oh {
                    for ox in 0..ow {
                        let mut row = cols_b.row_mut(oy * ow + ox);
                        for ky in 0..k {
                            for kx in 0..k {
                                for ic in 0..c {
                                    row[(ky * k + kx) * c + ic] = x_b[[oy + ky, ox + kx, ic]];
                                }
                            }
                        }
                    }
                }
            });

        let (weights, bias) = Self::param_views(patch, oc, params);

        ensure_shape(&mut self.z, (batch * oh * ow, oc));
        linalg::general_mat_mul(1.0, &self.cols, &weights, 0.0, &mut self.z);
        self.z += &bias;

        ensure_shape(&mut self.out, (batch, oh * ow * oc));
        {
            // SAFETY: Freshly ensured buffers are standard layout.
            let mut flat = self
                .out
                .view_mut()
                .into_shape_with_order((batch * oh * ow, oc))
                .unwrap();

            match self.act_fn {
                Some(act_fn) => flat.zip_mut_with(&self.z, |o, &z| *o = act_fn.f(z)),
                None => flat.assign(&self.z),
            }
        }

        Ok(self.out.view())
    }

    /// Propagates `d` backward, writing this layer's gradient into `grad`.
    pub fn backward<'a>(
        &'a mut self,
        params: &'a [f32],
        grad: &'a mut [f32],
        d: ArrayViewMut2<'a, f32>,
    ) -> Result<ArrayViewMut2<'a, f32>> {
        let (h, w, c) = self.in_shape;
        let (oh, ow, oc) = self.out_shape;
        let (k, batch) = (self.kernel, d.nrows());

        if d.ncols() != oh * ow * oc {
            return Err(MlErr::SizeMismatch {
                a: "delta",
                b: "conv2d",
                got: d.ncols(),
                expected: oh * ow * oc,
            });
        }

        let mut d2 = d
            .into_shape_with_order((batch * oh * ow, oc))
            .map_err(|_| MlErr::NotContiguous { what: "conv2d delta" })?;

        if let Some(act_fn) = self.act_fn {
            d2.zip_mut_with(&self.z, |d, &z| *d *= act_fn.df(z));
        }

        let patch = k * k * c;
        let w_size = patch * oc;
        let (dw_raw, db_raw) = grad.split_at_mut(w_size);

        // SAFETY: The caller hands a slice of exactly `size` elements.
        let mut dw = ArrayViewMut2::from_shape((patch, oc), dw_raw).unwrap();
        let mut db = ArrayViewMut1::from_shape(oc, db_raw).unwrap();

        linalg::general_mat_mul(1.0, &self.cols.t(), &d2, 0.0, &mut dw);
        db.assign(&d2.sum_axis(Axis(0)));

        let (weights, _) = Self::param_views(patch, oc, params);
        ensure_shape(&mut self.dcols, (batch * oh * ow, patch));
        linalg::general_mat_mul(1.0, &d2, &weights.t(), 0.0, &mut self.dcols);

        ensure_shape(&mut self.dx, (batch, h * w * c));
        self.dx.fill(0.);

        // SAFETY: Freshly ensured buffers are standard layout.
        let dcols3 = self
            .dcols
            .view()
            .into_shape_with_order((batch, oh * ow, patch))
            .unwrap();
        let mut dx4 = self
            .dx
            .view_mut()
            .into_shape_with_order((batch, h, w, c))
            .unwrap();

        // Scatter the lowered gradient back onto overlapping input windows.
        dx4.outer_iter_mut()
            .into_par_iter()
            .zip(dcols3.outer_iter().into_par_iter())
            .for_each(|(mut dx_b, dcols_b)| {
                for oy in 0..oh {
                    for ox in 0..ow {
                        let row = dcols_b.row(oy * ow + ox);
                        for ky in 0..k {
                            for kx in 0..k {
                                for ic in 0..c {
                                    dx_b[[oy + ky, ox + kx, ic]] += row[(ky * k + kx) * c + ic];
                                }
                            }
                        }
                    }
                }
            });

        Ok(self.dx.view_mut())
    }

    fn param_views(
        patch: usize,
        filters: usize,
        params: &[f32],
    ) -> (ArrayView2<'_, f32>, ArrayView1<'_, f32>) {
        let w_size = patch * filters;

        // SAFETY: The caller hands a slice of exactly `size` elements.
        let weights = ArrayView2::from_shape((patch, filters), &params[..w_size]).unwrap();
        let bias = ArrayView1::from_shape(filters, &params[w_size..]).unwrap();
        (weights, bias)
    }
}
