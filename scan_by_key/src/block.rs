//! Block-wide segmented scan, the building block of both engine passes.
//!
//! A thread block owns one tile. Each of its lanes owns a contiguous
//! sub-section of the tile, scans that sub-section sequentially, and then the
//! lanes run a Kogge-Stone scan over their partials. The lanes advance in
//! lockstep: every stride is one barrier-separated step in which each lane
//! reads its partner's partial before anyone writes.
//!
//! Segments are described by head flags. `heads[i]` is set when position `i`
//! opens a segment, in which case nothing before `i` is folded into it.

use crate::step::{div_ceil, strides};
use itertools::Itertools;

/// A segmented partial over some contiguous span.
///
/// `head` is set when a segment opens somewhere inside the span, and `value` is
/// the fold of the span's trailing segment. Exported by a tile, this is the
/// tile's carry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Carry<V> {
    pub head: bool,
    pub value: V,
}

impl<V: Copy> Carry<V> {
    /// Folds `self` with the partial of the span immediately after it.
    ///
    /// The earlier partial always sits on the left of `op`.
    pub fn then<F>(self, next: Self, op: &F) -> Self
    where
        F: Fn(&V, &V) -> V,
    {
        if next.head {
            next
        } else {
            Carry {
                head: self.head,
                value: op(&self.value, &next.value),
            }
        }
    }
}

/// In-place inclusive segmented scan of one tile.
///
/// Returns the tile's carry. `tile` and `heads` must have the same non-zero
/// length. Segments that started before the tile are treated as if they
/// started at its first element; the carry-in pass fixes them up.
pub fn scan_tile<V, F>(tile: &mut [V], heads: &[bool], lanes: usize, op: &F) -> Carry<V>
where
    V: Copy,
    F: Fn(&V, &V) -> V,
{
    debug_assert_eq!(tile.len(), heads.len());
    debug_assert!(!tile.is_empty());
    let items = div_ceil(tile.len(), lanes.max(1));

    // Each lane scans its own sub-section.
    let mut partials = tile
        .chunks_mut(items)
        .zip(heads.chunks(items))
        .map(|(section, heads)| scan_section(section, heads, op))
        .collect_vec();

    // Kogge-Stone across the lane partials. Walking lanes from the top down lets
    // each one read a partner that has not yet been overwritten in this step.
    for stride in strides(partials.len()) {
        for lane in (stride..partials.len()).rev() {
            partials[lane] = partials[lane - stride].then(partials[lane], op);
        }
    }

    // Every lane but the first folds the partial of the lanes before it into
    // the positions that continue the segment open at its start.
    for ((section, heads), prefix) in tile
        .chunks_mut(items)
        .zip(heads.chunks(items))
        .skip(1)
        .zip(&partials)
    {
        apply_prefix(section, heads, &prefix.value, op);
    }

    partials[partials.len() - 1]
}

/// Folds `prefix` on the left of every position before the first head.
pub fn apply_prefix<V, F>(section: &mut [V], heads: &[bool], prefix: &V, op: &F)
where
    V: Copy,
    F: Fn(&V, &V) -> V,
{
    for (x, _) in section
        .iter_mut()
        .zip(heads)
        .take_while(|(_, head)| !**head)
    {
        *x = op(prefix, &*x);
    }
}

/// Sequential segmented scan of one lane's sub-section.
fn scan_section<V, F>(section: &mut [V], heads: &[bool], op: &F) -> Carry<V>
where
    V: Copy,
    F: Fn(&V, &V) -> V,
{
    let mut head = heads[0];
    let mut accumulator = section[0];

    for i in 1..section.len() {
        if heads[i] {
            head = true;
            accumulator = section[i];
        } else {
            accumulator = op(&accumulator, &section[i]);
            section[i] = accumulator;
        }
    }

    Carry {
        head,
        value: accumulator,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::plus;

    fn heads_of(keys: &[u32]) -> Vec<bool> {
        (0..keys.len())
            .map(|i| i == 0 || keys[i - 1] != keys[i])
            .collect_vec()
    }

    #[test]
    fn scan_tile_segments_test() {
        let keys = [1, 1, 2, 2, 2, 3, 3, 3, 3, 4];
        let mut tile = [1u32, 2, 3, 4, 5, 6, 7, 8, 9, 10];
        let carry = scan_tile(&mut tile, &heads_of(&keys), 4, &plus);
        assert_eq!(tile, [1, 3, 3, 7, 12, 6, 13, 21, 30, 10]);
        assert_eq!(
            carry,
            Carry {
                head: true,
                value: 10
            }
        );
    }

    #[test]
    fn lane_count_does_not_change_result_test() {
        let keys = [5, 5, 5, 5, 5, 6, 6, 7, 7, 7, 7, 7, 8];
        let values = (1..=13u32).collect_vec();
        let heads = heads_of(&keys);

        let mut expected = values.clone();
        let expected_carry = scan_tile(&mut expected, &heads, 1, &plus);
        for lanes in [2, 3, 4, 7, 13, 16] {
            let mut tile = values.clone();
            let carry = scan_tile(&mut tile, &heads, lanes, &plus);
            assert_eq!(tile, expected, "lanes = {}", lanes);
            assert_eq!(carry, expected_carry, "lanes = {}", lanes);
        }
    }

    #[test]
    fn carry_without_head_continues_segment_test() {
        let mut tile = [2u32, 3, 4];
        let heads = [false, false, false];
        let carry = scan_tile(&mut tile, &heads, 2, &plus);
        assert_eq!(tile, [2, 5, 9]);
        assert_eq!(
            carry,
            Carry {
                head: false,
                value: 9
            }
        );
    }

    #[test]
    fn order_is_preserved_for_non_commutative_op_test() {
        let concat = |a: &(u64, u32), b: &(u64, u32)| (a.0 * 10u64.pow(b.1) + b.0, a.1 + b.1);
        let mut tile = (1..=9u64).map(|d| (d, 1u32)).collect_vec();
        let heads = [true, false, false, false, false, false, false, false, false];
        scan_tile(&mut tile, &heads, 4, &concat);
        assert_eq!(tile[8].0, 123456789);
        assert_eq!(tile[3].0, 1234);
    }

    #[test]
    fn apply_prefix_stops_at_head_test() {
        let mut section = [1u32, 2, 3, 4];
        apply_prefix(&mut section, &[false, false, true, false], &10, &plus);
        assert_eq!(section, [11, 12, 3, 4]);
    }
}
