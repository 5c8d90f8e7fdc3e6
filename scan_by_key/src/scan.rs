//! The caller-facing scan family.
//!
//! Keyed scans come in two families. The inclusive family folds each value
//! into its own output position; the exclusive family opens every segment with
//! an initial value and folds each value into the position after it. Shorter
//! entry points fill in `==` for the key predicate, `+` for the operator and
//! zero for the initial value.
//!
//! Every entry point returns the output range advanced past the `keys.len()`
//! positions it wrote.

use crate::dispatch;
use crate::engine::ScanMode;
use crate::error::Result;
use crate::ops::{equal_to, plus};
use crate::output::OutputRange;
use crate::policy::ExecutionPolicy;
use crate::segments::{KeyedSegments, SingleSegment};
use std::ops::Add;

/// Inclusive scan by key with `==` keys and `+`.
pub fn inclusive_scan_by_key<P, K, V, O>(
    policy: &P,
    keys: &[K],
    values: &[V],
    out: O,
) -> Result<O::End>
where
    P: ExecutionPolicy,
    K: PartialEq + Sync,
    V: Add<Output = V> + Copy + Send + Sync,
    O: OutputRange<V>,
{
    inclusive_scan_by_key_with(policy, keys, values, out, equal_to::<K>, plus::<V>)
}

/// Inclusive scan by key with a caller-supplied key predicate and `+`.
pub fn inclusive_scan_by_key_pred<P, K, V, O, E>(
    policy: &P,
    keys: &[K],
    values: &[V],
    out: O,
    equiv: E,
) -> Result<O::End>
where
    P: ExecutionPolicy,
    K: Sync,
    V: Add<Output = V> + Copy + Send + Sync,
    O: OutputRange<V>,
    E: Fn(&K, &K) -> bool + Sync,
{
    inclusive_scan_by_key_with(policy, keys, values, out, equiv, plus::<V>)
}

/// Inclusive scan by key.
///
/// For every segment `[i, j)` of `keys`, `out[i] = values[i]` and
/// `out[p] = op(out[p - 1], values[p])` for `i < p < j`.
pub fn inclusive_scan_by_key_with<P, K, V, O, E, F>(
    policy: &P,
    keys: &[K],
    values: &[V],
    out: O,
    equiv: E,
    op: F,
) -> Result<O::End>
where
    P: ExecutionPolicy,
    K: Sync,
    V: Copy + Send + Sync,
    O: OutputRange<V>,
    E: Fn(&K, &K) -> bool + Sync,
    F: Fn(&V, &V) -> V + Sync,
{
    let segments = KeyedSegments::new(keys, &equiv);
    dispatch::scan(policy, &segments, Some(values), out, ScanMode::Inclusive, &op)
}

/// Exclusive scan by key starting every segment from zero, with `==` keys and
/// `+`.
pub fn exclusive_scan_by_key<P, K, V, O>(
    policy: &P,
    keys: &[K],
    values: &[V],
    out: O,
) -> Result<O::End>
where
    P: ExecutionPolicy,
    K: PartialEq + Sync,
    V: Add<Output = V> + Copy + Default + Send + Sync,
    O: OutputRange<V>,
{
    exclusive_scan_by_key_init(policy, keys, values, out, V::default())
}

/// Exclusive scan by key with `==` keys and `+`.
pub fn exclusive_scan_by_key_init<P, K, V, O, I>(
    policy: &P,
    keys: &[K],
    values: &[V],
    out: O,
    init: I,
) -> Result<O::End>
where
    P: ExecutionPolicy,
    K: PartialEq + Sync,
    V: Add<Output = V> + Copy + Send + Sync,
    O: OutputRange<V>,
    I: Into<V>,
{
    exclusive_scan_by_key_with(policy, keys, values, out, init, equal_to::<K>, plus::<V>)
}

/// Exclusive scan by key with a caller-supplied key predicate and `+`.
pub fn exclusive_scan_by_key_pred<P, K, V, O, I, E>(
    policy: &P,
    keys: &[K],
    values: &[V],
    out: O,
    init: I,
    equiv: E,
) -> Result<O::End>
where
    P: ExecutionPolicy,
    K: Sync,
    V: Add<Output = V> + Copy + Send + Sync,
    O: OutputRange<V>,
    I: Into<V>,
    E: Fn(&K, &K) -> bool + Sync,
{
    exclusive_scan_by_key_with(policy, keys, values, out, init, equiv, plus::<V>)
}

/// Exclusive scan by key.
///
/// For every segment `[i, j)` of `keys`, `out[i] = init` and
/// `out[p] = op(out[p - 1], values[p - 1])` for `i < p < j`. Every segment
/// opens with `init`, not just the first.
pub fn exclusive_scan_by_key_with<P, K, V, O, I, E, F>(
    policy: &P,
    keys: &[K],
    values: &[V],
    out: O,
    init: I,
    equiv: E,
    op: F,
) -> Result<O::End>
where
    P: ExecutionPolicy,
    K: Sync,
    V: Copy + Send + Sync,
    O: OutputRange<V>,
    I: Into<V>,
    E: Fn(&K, &K) -> bool + Sync,
    F: Fn(&V, &V) -> V + Sync,
{
    let segments = KeyedSegments::new(keys, &equiv);
    let mode = ScanMode::Exclusive(init.into());
    dispatch::scan(policy, &segments, Some(values), out, mode, &op)
}

/// Inclusive scan by key that overwrites `values` with the result.
pub fn inclusive_scan_by_key_in_place<'v, P, K, V, E, F>(
    policy: &P,
    keys: &[K],
    values: &'v mut [V],
    equiv: E,
    op: F,
) -> Result<&'v mut [V]>
where
    P: ExecutionPolicy,
    K: Sync,
    V: Copy + Send + Sync,
    E: Fn(&K, &K) -> bool + Sync,
    F: Fn(&V, &V) -> V + Sync,
{
    let segments = KeyedSegments::new(keys, &equiv);
    dispatch::scan(policy, &segments, None, values, ScanMode::Inclusive, &op)
}

/// Exclusive scan by key that overwrites `values` with the result.
pub fn exclusive_scan_by_key_in_place<'v, P, K, V, I, E, F>(
    policy: &P,
    keys: &[K],
    values: &'v mut [V],
    init: I,
    equiv: E,
    op: F,
) -> Result<&'v mut [V]>
where
    P: ExecutionPolicy,
    K: Sync,
    V: Copy + Send + Sync,
    I: Into<V>,
    E: Fn(&K, &K) -> bool + Sync,
    F: Fn(&V, &V) -> V + Sync,
{
    let segments = KeyedSegments::new(keys, &equiv);
    let mode = ScanMode::Exclusive(init.into());
    dispatch::scan(policy, &segments, None, values, mode, &op)
}

/// Inclusive prefix sum of `values` as a single segment.
pub fn inclusive_scan<P, V, O>(policy: &P, values: &[V], out: O) -> Result<O::End>
where
    P: ExecutionPolicy,
    V: Add<Output = V> + Copy + Send + Sync,
    O: OutputRange<V>,
{
    inclusive_scan_with(policy, values, out, plus::<V>)
}

/// Inclusive prefix scan of `values` as a single segment.
pub fn inclusive_scan_with<P, V, O, F>(policy: &P, values: &[V], out: O, op: F) -> Result<O::End>
where
    P: ExecutionPolicy,
    V: Copy + Send + Sync,
    O: OutputRange<V>,
    F: Fn(&V, &V) -> V + Sync,
{
    let segments = SingleSegment(values.len());
    dispatch::scan(policy, &segments, Some(values), out, ScanMode::Inclusive, &op)
}

/// Exclusive prefix sum of `values` starting from zero.
pub fn exclusive_scan<P, V, O>(policy: &P, values: &[V], out: O) -> Result<O::End>
where
    P: ExecutionPolicy,
    V: Add<Output = V> + Copy + Default + Send + Sync,
    O: OutputRange<V>,
{
    exclusive_scan_with(policy, values, out, V::default(), plus::<V>)
}

/// Exclusive prefix sum of `values` starting from `init`.
pub fn exclusive_scan_init<P, V, O, I>(policy: &P, values: &[V], out: O, init: I) -> Result<O::End>
where
    P: ExecutionPolicy,
    V: Add<Output = V> + Copy + Send + Sync,
    O: OutputRange<V>,
    I: Into<V>,
{
    exclusive_scan_with(policy, values, out, init, plus::<V>)
}

/// Exclusive prefix scan of `values` as a single segment.
pub fn exclusive_scan_with<P, V, O, I, F>(
    policy: &P,
    values: &[V],
    out: O,
    init: I,
    op: F,
) -> Result<O::End>
where
    P: ExecutionPolicy,
    V: Copy + Send + Sync,
    O: OutputRange<V>,
    I: Into<V>,
    F: Fn(&V, &V) -> V + Sync,
{
    let segments = SingleSegment(values.len());
    let mode = ScanMode::Exclusive(init.into());
    dispatch::scan(policy, &segments, Some(values), out, mode, &op)
}
