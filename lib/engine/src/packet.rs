//! Single-ownership payload container.

/// One value travelling between two nodes.
///
/// A packet is never `Clone`: every handoff is a move, so whoever holds
/// one has sole access to its payload.
#[derive(Debug, PartialEq, Eq)]
pub struct Packet<T> {
    data: T,
}

impl<T> Packet<T> {
    /// Wraps a value.
    #[must_use]
    pub fn new(data: T) -> Self {
        Self { data }
    }

    /// Read-only access to the payload.
    #[must_use]
    pub fn data(&self) -> &T {
        &self.data
    }

    /// Consumes the packet, yielding its payload.
    #[must_use]
    pub fn into_inner(self) -> T {
        self.data
    }
}

impl<T> From<T> for Packet<T> {
    fn from(data: T) -> Self {
        Self::new(data)
    }
}
