use bytes::Bytes;

/// An immutable snapshot of cached bytes.
///
/// Cloning is cheap (reference counted) and nothing reachable through a view
/// can mutate the cached storage, so callers may hold one for as long as
/// they like. Callers that need ownership go through [`ByteView::to_vec`],
/// which copies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ByteView {
    data: Bytes,
}

impl ByteView {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self { data: data.into() }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Copies the contents out, so mutations on the result never reach the
    /// cache.
    pub fn to_vec(&self) -> Vec<u8> {
        self.data.to_vec()
    }
}

impl From<Vec<u8>> for ByteView {
    fn from(data: Vec<u8>) -> Self {
        Self::new(data)
    }
}

impl AsRef<[u8]> for ByteView {
    fn as_ref(&self) -> &[u8] {
        self.as_slice()
    }
}
