/// Kogge-Stone strides across `width` lanes: 1, 2, 4, ... while below `width`.
pub struct Strides {
    next: usize,
    width: usize,
}

impl Iterator for Strides {
    type Item = usize;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.width {
            return None;
        }
        let stride = self.next;
        self.next *= 2;
        Some(stride)
    }
}

pub fn strides(width: usize) -> Strides {
    Strides { next: 1, width }
}

/// Rounds `x` up to the next multiple of `granularity`.
pub fn align_up(x: usize, granularity: usize) -> usize {
    (x + granularity - 1) / granularity * granularity
}

/// Number of `size`-wide sections needed to cover `len` elements.
pub fn div_ceil(len: usize, size: usize) -> usize {
    (len + size - 1) / size
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strides_double_below_width_test() {
        assert_eq!(strides(20).collect::<Vec<_>>(), vec![1, 2, 4, 8, 16]);
        assert_eq!(strides(16).collect::<Vec<_>>(), vec![1, 2, 4, 8]);
        assert_eq!(strides(1).count(), 0);
    }

    #[test]
    fn align_up_test() {
        assert_eq!(align_up(0, 256), 0);
        assert_eq!(align_up(1, 256), 256);
        assert_eq!(align_up(256, 256), 256);
        assert_eq!(align_up(257, 256), 512);
    }

    #[test]
    fn div_ceil_test() {
        assert_eq!(div_ceil(0, 4), 0);
        assert_eq!(div_ceil(1, 4), 1);
        assert_eq!(div_ceil(8, 4), 2);
        assert_eq!(div_ceil(9, 4), 3);
    }
}
