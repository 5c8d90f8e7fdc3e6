//! Where segments open.
//!
//! A position opens a segment when it is the first position or when its key is
//! not equivalent to the key right before it. Only adjacent keys are ever
//! compared, so the predicate need not be transitive.

/// Random-access view of the head flags of a sequence.
pub trait Segments: Sync {
    fn len(&self) -> usize;

    /// Whether position `i` opens a segment. `i` must be below `len()`.
    fn is_head(&self, i: usize) -> bool;

    /// Writes the head flags of `start..start + heads.len()` into `heads`.
    fn heads(&self, start: usize, heads: &mut [bool]) {
        for (offset, head) in heads.iter_mut().enumerate() {
            *head = self.is_head(start + offset);
        }
    }
}

/// Segments of a key sequence under an equivalence predicate.
pub struct KeyedSegments<'a, K, E> {
    keys: &'a [K],
    equiv: &'a E,
}

impl<'a, K, E> KeyedSegments<'a, K, E> {
    pub fn new(keys: &'a [K], equiv: &'a E) -> Self {
        Self { keys, equiv }
    }
}

impl<K, E> Segments for KeyedSegments<'_, K, E>
where
    K: Sync,
    E: Fn(&K, &K) -> bool + Sync,
{
    fn len(&self) -> usize {
        self.keys.len()
    }

    fn is_head(&self, i: usize) -> bool {
        i == 0 || !(self.equiv)(&self.keys[i - 1], &self.keys[i])
    }
}

/// A sequence that is one segment end to end.
pub struct SingleSegment(pub usize);

impl Segments for SingleSegment {
    fn len(&self) -> usize {
        self.0
    }

    fn is_head(&self, i: usize) -> bool {
        i == 0
    }
}

/// Head flags stored explicitly, as the carry levels keep them.
pub struct FlaggedSegments<'a>(pub &'a [bool]);

impl Segments for FlaggedSegments<'_> {
    fn len(&self) -> usize {
        self.0.len()
    }

    fn is_head(&self, i: usize) -> bool {
        self.0[i]
    }

    fn heads(&self, start: usize, heads: &mut [bool]) {
        heads.copy_from_slice(&self.0[start..start + heads.len()]);
    }
}
