//! Stock binary operators and key predicates.

use std::ops::Add;

pub fn plus<V>(a: &V, b: &V) -> V
where
    V: Add<Output = V> + Copy,
{
    *a + *b
}

pub fn maximum<V>(a: &V, b: &V) -> V
where
    V: PartialOrd + Copy,
{
    if *b > *a {
        *b
    } else {
        *a
    }
}

pub fn minimum<V>(a: &V, b: &V) -> V
where
    V: PartialOrd + Copy,
{
    if *b < *a {
        *b
    } else {
        *a
    }
}

pub fn equal_to<K>(a: &K, b: &K) -> bool
where
    K: PartialEq,
{
    a == b
}
