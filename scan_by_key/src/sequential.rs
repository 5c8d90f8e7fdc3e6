//! The host-serial fallback.
//!
//! A plain left fold over positions, written straight from the definition of
//! the inclusive and exclusive results. The device engine is checked against
//! it.

use crate::engine::ScanMode;
use crate::segments::Segments;

/// Segmented scan of the first `segments.len()` positions of `out`, reading
/// values from `src` or, when `src` is `None`, from `out` itself.
pub fn scan<S, V, F>(segments: &S, src: Option<&[V]>, out: &mut [V], mode: ScanMode<V>, op: &F)
where
    S: Segments,
    V: Copy,
    F: Fn(&V, &V) -> V,
{
    // Output and input at the previous position.
    let mut previous: Option<(V, V)> = None;

    for i in 0..segments.len() {
        let x = match src {
            Some(src) => src[i],
            None => out[i],
        };
        let continues = !segments.is_head(i);
        let y = match (mode, previous) {
            (ScanMode::Inclusive, Some((acc, _))) if continues => op(&acc, &x),
            (ScanMode::Inclusive, _) => x,
            (ScanMode::Exclusive(_), Some((acc, prev))) if continues => op(&acc, &prev),
            (ScanMode::Exclusive(init), _) => init,
        };
        out[i] = y;
        previous = Some((y, x));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::{equal_to, maximum, plus};
    use crate::segments::KeyedSegments;

    #[test]
    fn inclusive_fold_test() {
        let keys = [1, 1, 2, 2, 2, 3];
        let values = [1, 2, 3, 4, 5, 6];
        let mut out = [0; 6];
        let segments = KeyedSegments::new(&keys, &equal_to::<i32>);
        scan(&segments, Some(&values), &mut out, ScanMode::Inclusive, &plus);
        assert_eq!(out, [1, 3, 3, 7, 12, 6]);
    }

    #[test]
    fn exclusive_fold_test() {
        let keys = [1, 1, 2, 2, 2, 3];
        let values = [1, 2, 3, 4, 5, 6];
        let mut out = [0; 6];
        let segments = KeyedSegments::new(&keys, &equal_to::<i32>);
        scan(&segments, Some(&values), &mut out, ScanMode::Exclusive(10), &plus);
        assert_eq!(out, [10, 11, 10, 13, 17, 10]);
    }

    #[test]
    fn exclusive_in_place_reads_original_values_test() {
        let keys = [7, 7, 7, 7];
        let mut values = [1, 2, 3, 4];
        let segments = KeyedSegments::new(&keys, &equal_to::<i32>);
        scan(&segments, None, &mut values, ScanMode::Exclusive(0), &plus);
        assert_eq!(values, [0, 1, 3, 6]);
    }

    #[test]
    fn max_scan_test() {
        let keys = [1, 1, 1, 2, 2];
        let mut values = [3, 1, 4, 1, 5];
        let segments = KeyedSegments::new(&keys, &equal_to::<i32>);
        scan(&segments, None, &mut values, ScanMode::Inclusive, &maximum);
        assert_eq!(values, [3, 3, 4, 1, 5]);
    }
}
