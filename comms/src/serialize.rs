pub trait Serialize<'a> {
    /// Writes the serialized representation of `self` into `buf`.
    ///
    /// Large numeric payloads may be returned as a borrowed tail slice instead
    /// of being copied into `buf`; the sender writes it after the buffered part.
    fn serialize(&'a self, buf: &mut Vec<u8>) -> Option<&'a [u8]>;
}
