use std::io;

use bytemuck::Zeroable;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::{Align4, Deserialize, LEN_TYPE_SIZE, LenType};

/// The receiving end handle of the communication.
pub struct WireReceiver<R: AsyncRead + Unpin> {
    rx: R,
    buf: Vec<u32>,
}

impl<R: AsyncRead + Unpin> WireReceiver<R> {
    /// Creates a new `WireReceiver` instance.
    ///
    /// # Arguments
    /// * `rx` - The underlying reader.
    pub(super) fn new(rx: R) -> Self {
        Self {
            rx,
            buf: Vec::new(),
        }
    }

    /// Waits to receive a new message, deserializing it from an internal buffer.
    ///
    /// The returned `T`'s lifetime is tied to that buffer, so it only lives
    /// until the next `recv` call.
    ///
    /// # Returns
    /// A result object that returns `T` on success or `io::Error` on failure.
    pub async fn recv<'buf, T>(&'buf mut self) -> io::Result<T>
    where
        T: Deserialize<'buf>,
    {
        let Self { rx, buf } = self;
        let len = Self::fill(rx, buf).await?;
        T::deserialize(&bytemuck::cast_slice(buf)[..len])
    }

    /// Waits to receive a new message from the inner receiver.
    ///
    /// # Arguments
    /// * `buf` - The buffer to use for deserialization, the returned
    ///           `T`'s lifetimes will be tied to this buffer.
    ///
    /// # Returns
    /// A result object that returns `T` on success or `io::Error` on failure.
    pub async fn recv_into<'buf, T, B>(&mut self, buf: &'buf mut Vec<B>) -> io::Result<T>
    where
        T: Deserialize<'buf>,
        B: Align4,
    {
        let len = Self::fill(&mut self.rx, buf).await?;
        T::deserialize(&bytemuck::cast_slice(buf)[..len])
    }

    /// Reads one length-prefixed frame into `buf`, returning the frame length
    /// in bytes. The buffer is grown to whole `B` items so the frame stays
    /// 4-byte aligned.
    async fn fill<B: Align4>(rx: &mut R, buf: &mut Vec<B>) -> io::Result<usize> {
        let mut size_buf = [0; LEN_TYPE_SIZE];
        rx.read_exact(&mut size_buf).await?;
        let len = LenType::from_be_bytes(size_buf) as usize;

        let b_size = size_of::<B>();
        buf.resize(len.div_ceil(b_size), B::zeroed());

        let view = bytemuck::cast_slice_mut(buf);
        rx.read_exact(&mut view[..len]).await?;

        Ok(len)
    }
}
