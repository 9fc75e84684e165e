use std::io;

pub trait Deserialize<'a>: Sized {
    /// Reconstructs a value from a received frame.
    ///
    /// The returned value may borrow from `buf`. Callers must keep the buffer
    /// 4-byte aligned so numeric payloads can be viewed in place.
    fn deserialize(buf: &'a [u8]) -> io::Result<Self>;
}
