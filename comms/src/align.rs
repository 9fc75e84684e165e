// Trait to generalize over primitive number types that are 4 bytes aligned.
// Receive buffers are backed by one of these so that `f32` payloads can be
// reinterpreted in place without copying.
pub trait Align4: bytemuck::Pod {}

impl Align4 for u32 {}
impl Align4 for i32 {}
impl Align4 for u64 {}
impl Align4 for i64 {}
impl Align4 for f32 {}
impl Align4 for f64 {}
