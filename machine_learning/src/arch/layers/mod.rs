mod conv2d;
mod dense;
mod flatten;
mod layer;
mod max_pool2d;

pub use conv2d::Conv2d;
pub use dense::Dense;
pub use flatten::Flatten;
pub use layer::Layer;
pub use max_pool2d::MaxPool2d;

use ndarray::Array2;

/// Reallocates `buf` only when the wanted shape changed.
///
/// Layer buffers are reused across steps; the batch size is constant during
/// training so this allocates once on the first pass.
pub(crate) fn ensure_shape<A: Copy + Default>(buf: &mut Array2<A>, shape: (usize, usize)) {
    if buf.dim() != shape {
        *buf = Array2::from_elem(shape, A::default());
    }
}
