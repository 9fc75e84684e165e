use ndarray::{parallel::prelude::*, prelude::*};

use super::ensure_shape;
use crate::{MlErr, Result};

/// Square max pooling over channels-last feature maps, stride = window size.
///
/// Incomplete border windows are dropped, matching valid pooling.
pub struct MaxPool2d {
    in_shape: (usize, usize, usize),
    out_shape: (usize, usize, usize),
    pool: usize,

    // Forward metadata: per sample, the flat input index each output took
    // its maximum from.
    out: Array2<f32>,
    switches: Array2<u32>,

    // Backward metadata
    dx: Array2<f32>,
}

impl MaxPool2d {
    /// Creates a new `MaxPool2d`.
    ///
    /// # Arguments
    /// * `in_shape` - The `(height, width, channels)` shape of one input sample.
    /// * `pool` - The pooling window side, must fit `in_shape`.
    pub fn new(in_shape: (usize, usize, usize), pool: usize) -> Self {
        let (h, w, c) = in_shape;
        let out_shape = (h / pool, w / pool, c);
        let zeros = Array2::zeros((1, 1));

        Self {
            in_shape,
            out_shape,
            pool,
            out: zeros.clone(),
            switches: Array2::zeros((1, 1)),
            dx: zeros,
        }
    }

    /// Max pooling holds no parameters.
    pub fn size(&self) -> usize {
        0
    }

    pub fn out_shape(&self) -> (usize, usize, usize) {
        self.out_shape
    }

    /// Makes a forward pass, keeping the argmax switches for `backward`.
    pub fn forward<'a>(
        &'a mut self,
        _params: &'a [f32],
        x: ArrayView2<'a, f32>,
    ) -> Result<ArrayView2<'a, f32>> {
        let (h, w, c) = self.in_shape;
        let (oh, ow, oc) = self.out_shape;
        let (p, batch) = (self.pool, x.nrows());

        if x.ncols() != h * w * c {
            return Err(MlErr::SizeMismatch {
                a: "input",
                b: "max_pool2d",
                got: x.ncols(),
                expected: h * w * c,
            });
        }

        let x4 = x
            .into_shape_with_order((batch, h, w, c))
            .map_err(|_| MlErr::NotContiguous {
                what: "max_pool2d input",
            })?;

        ensure_shape(&mut self.out, (batch, oh * ow * oc));
        ensure_shape(&mut self.switches, (batch, oh * ow * oc));

        self.out
            .outer_iter_mut()
            .into_par_iter()
            .zip(self.switches.outer_iter_mut().into_par_iter())
            .zip(x4.outer_iter().into_par_iter())
            .for_each(|((mut out_b, mut sw_b), x_b)| {
                for oy in 0..oh {
                    for ox in 0..ow {
                        for ic in 0..oc {
                            let mut best = f32::NEG_INFINITY;
                            let mut best_idx = 0;

                            for ky in 0..p {
                                for kx in 0..p {
                                    let (y, x) = (oy * p + ky, ox * p + kx);
                                    let v = x_b[[y, x, ic]];

                                    if v > best {
                                        best = v;
                                        best_idx = (y * w + x) * c + ic;
                                    }
                                }
                            }

                            let j = (oy * ow + ox) * oc + ic;
                            out_b[j] = best;
                            sw_b[j] = best_idx as u32;
                        }
                    }
                }
            });

        Ok(self.out.view())
    }

    /// Routes `d` back to the inputs that won their pooling windows.
    pub fn backward<'a>(
        &'a mut self,
        _params: &'a [f32],
        _grad: &'a mut [f32],
        d: ArrayViewMut2<'a, f32>,
    ) -> Result<ArrayViewMut2<'a, f32>> {
        let (h, w, c) = self.in_shape;
        let (oh, ow, oc) = self.out_shape;
        let batch = d.nrows();

        if d.ncols() != oh * ow * oc {
            return Err(MlErr::SizeMismatch {
                a: "delta",
                b: "max_pool2d",
                got: d.ncols(),
                expected: oh * ow * oc,
            });
        }

        ensure_shape(&mut self.dx, (batch, h * w * c));
        self.dx.fill(0.);

        self.dx
            .outer_iter_mut()
            .into_par_iter()
            .zip(self.switches.outer_iter().into_par_iter())
            .zip(d.outer_iter().into_par_iter())
            .for_each(|((mut dx_b, sw_b), d_b)| {
                for (j, &idx) in sw_b.iter().enumerate() {
                    dx_b[idx as usize] += d_b[j];
                }
            });

        Ok(self.dx.view_mut())
    }
}
