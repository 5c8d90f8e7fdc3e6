//! Destinations a scan can write to.

/// A writable range starting at the output position.
///
/// `advance` plays the role of `output_begin + n`: it consumes the range and
/// yields whatever lies past the first `n` positions.
pub trait OutputRange<T> {
    type End;

    /// Writable positions, or `None` when the range stores nothing.
    fn slots(&mut self) -> Option<&mut [T]>;

    fn advance(self, n: usize) -> Self::End;
}

impl<'a, T> OutputRange<T> for &'a mut [T] {
    type End = &'a mut [T];

    fn slots(&mut self) -> Option<&mut [T]> {
        Some(&mut **self)
    }

    fn advance(self, n: usize) -> Self::End {
        self.split_at_mut(n).1
    }
}

impl<'a, T> OutputRange<T> for &'a mut Vec<T> {
    type End = &'a mut [T];

    fn slots(&mut self) -> Option<&mut [T]> {
        Some(self.as_mut_slice())
    }

    fn advance(self, n: usize) -> Self::End {
        self.as_mut_slice().split_at_mut(n).1
    }
}

/// An output sink that accepts any number of writes and keeps none of them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Discard {
    position: usize,
}

impl Discard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn at(position: usize) -> Self {
        Self { position }
    }

    pub fn position(&self) -> usize {
        self.position
    }
}

impl<T> OutputRange<T> for Discard {
    type End = Discard;

    fn slots(&mut self) -> Option<&mut [T]> {
        None
    }

    fn advance(self, n: usize) -> Self::End {
        Discard::at(self.position + n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slice_advance_returns_tail_test() {
        let mut data = [1, 2, 3, 4, 5];
        let end = OutputRange::<i32>::advance(&mut data[..], 3);
        assert_eq!(end, &mut [4, 5]);
    }

    #[test]
    fn discard_advances_position_test() {
        let end = OutputRange::<u8>::advance(Discard::at(2), 5);
        assert_eq!(end, Discard::at(7));
        assert!(OutputRange::<u8>::slots(&mut Discard::new()).is_none());
    }
}
