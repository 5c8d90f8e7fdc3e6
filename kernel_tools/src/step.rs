/// Kogge-Stone strides of a block: 1, 2, 4, ... while below the block width.
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
