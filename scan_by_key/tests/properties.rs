//! Tile-engine results against a naive reference over random keys, values
//! and tile geometries.

use proptest::prelude::*;
use scan_by_key::*;

/// Keys drawn from a small alphabet so that runs of equal keys are common.
fn keys_and_values() -> impl Strategy<Value = (Vec<u8>, Vec<u32>)> {
    (0usize..300).prop_flat_map(|len| {
        (
            proptest::collection::vec(0u8..3, len),
            proptest::collection::vec(0u32..1000, len),
        )
    })
}

fn geometry() -> impl Strategy<Value = ScanConfig> {
    (1usize..5, 1usize..4).prop_map(|(lanes, items)| {
        let items = if lanes * items < 2 { 2 } else { items };
        ScanConfig::new(lanes * items, lanes).unwrap()
    })
}

const PRIME: u64 = 65_521;

/// Composition of affine maps mod a prime, applying the left map first.
fn then_affine(f: &(u64, u64), g: &(u64, u64)) -> (u64, u64) {
    ((g.0 * f.0) % PRIME, (g.0 * f.1 + g.1) % PRIME)
}

fn reference(keys: &[u8], values: &[u32], init: Option<u32>) -> Vec<u32> {
    let mut out = Vec::with_capacity(values.len());
    let mut running = 0u32;
    for i in 0..values.len() {
        let head = i == 0 || keys[i - 1] != keys[i];
        match init {
            None => {
                running = if head { values[i] } else { running + values[i] };
                out.push(running);
            }
            Some(init) => {
                if head {
                    running = init;
                }
                out.push(running);
                running += values[i];
            }
        }
    }
    out
}

proptest! {
    #[test]
    fn inclusive_matches_reference((keys, values) in keys_and_values(), config in geometry()) {
        let policy = par().with_config(config);
        let mut out = vec![0u32; keys.len()];
        inclusive_scan_by_key(&policy, &keys, &values, &mut out[..]).unwrap();
        prop_assert_eq!(out, reference(&keys, &values, None));
    }

    #[test]
    fn exclusive_matches_reference(
        (keys, values) in keys_and_values(),
        config in geometry(),
        init in 0u32..100,
    ) {
        let policy = par().with_config(config);
        let mut out = vec![0u32; keys.len()];
        exclusive_scan_by_key_init(&policy, &keys, &values, &mut out[..], init).unwrap();
        prop_assert_eq!(out, reference(&keys, &values, Some(init)));
    }

    #[test]
    fn device_and_sequential_agree((keys, values) in keys_and_values(), config in geometry()) {
        let policy = par().with_config(config);
        let mut device = vec![0u32; keys.len()];
        let mut serial = vec![0u32; keys.len()];
        inclusive_scan_by_key(&policy, &keys, &values, &mut device[..]).unwrap();
        inclusive_scan_by_key(&Seq::from(&policy), &keys, &values, &mut serial[..]).unwrap();
        prop_assert_eq!(device, serial);
    }

    #[test]
    fn segments_are_independent(
        (keys, values) in keys_and_values(),
        config in geometry(),
        bump in 1u32..50,
    ) {
        // Changing a value only changes results inside its own segment.
        prop_assume!(!keys.is_empty());
        let policy = par().with_config(config);
        let target = keys.len() / 2;
        let mut bumped = values.clone();
        bumped[target] += bump;

        let mut before = vec![0u32; keys.len()];
        let mut after = vec![0u32; keys.len()];
        inclusive_scan_by_key(&policy, &keys, &values, &mut before[..]).unwrap();
        inclusive_scan_by_key(&policy, &keys, &bumped, &mut after[..]).unwrap();

        let start = (0..=target).rev().find(|&i| i == 0 || keys[i - 1] != keys[i]).unwrap_or(0);
        let end = (target + 1..keys.len()).find(|&i| keys[i - 1] != keys[i]).unwrap_or(keys.len());
        for i in 0..keys.len() {
            if (target..end).contains(&i) {
                prop_assert_eq!(after[i], before[i] + bump);
            } else {
                prop_assert_eq!(after[i], before[i], "position {} outside [{}, {})", i, start, end);
            }
        }
    }

    #[test]
    fn in_place_exclusive_matches_out_of_place(
        (keys, values) in keys_and_values(),
        config in geometry(),
    ) {
        let policy = par().with_config(config);
        let mut expected = vec![0u32; keys.len()];
        exclusive_scan_by_key(&policy, &keys, &values, &mut expected[..]).unwrap();

        let mut in_place = values.clone();
        exclusive_scan_by_key_in_place(&policy, &keys, &mut in_place, 0u32, |a: &u8, b: &u8| a == b, ops::plus)
            .unwrap();
        prop_assert_eq!(in_place, expected);
    }

    #[test]
    fn single_segment_is_a_plain_prefix_sum(
        values in proptest::collection::vec(0u32..1000, 0..300),
        config in geometry(),
    ) {
        let policy = par().with_config(config);
        let keys = vec![4u16; values.len()];
        let mut keyed = vec![0u32; values.len()];
        let mut unkeyed = vec![0u32; values.len()];
        inclusive_scan_by_key(&policy, &keys, &values, &mut keyed[..]).unwrap();
        inclusive_scan(&policy, &values, &mut unkeyed[..]).unwrap();

        let expected = values
            .iter()
            .scan(0u32, |sum, x| {
                *sum += x;
                Some(*sum)
            })
            .collect::<Vec<_>>();
        prop_assert_eq!(&keyed, &expected);
        prop_assert_eq!(&unkeyed, &expected);
    }

    #[test]
    fn all_singletons(
        values in proptest::collection::vec(0u32..1000, 0..300),
        config in geometry(),
        init in 0u32..100,
    ) {
        let policy = par().with_config(config);
        let keys = (0..values.len()).collect::<Vec<_>>();
        let mut inclusive = vec![0u32; values.len()];
        let mut exclusive = vec![0u32; values.len()];
        inclusive_scan_by_key(&policy, &keys, &values, &mut inclusive[..]).unwrap();
        exclusive_scan_by_key_init(&policy, &keys, &values, &mut exclusive[..], init).unwrap();
        prop_assert_eq!(inclusive, values);
        prop_assert!(exclusive.iter().all(|&x| x == init));
    }

    #[test]
    fn non_commutative_op_agrees_with_sequential(
        (keys, values) in keys_and_values(),
        config in geometry(),
        init in (1u64..PRIME, 0u64..PRIME),
    ) {
        let maps = values.iter().map(|&v| (u64::from(v) + 1, u64::from(v) / 3)).collect::<Vec<_>>();
        let policy = par().with_config(config);
        let equiv = |a: &u8, b: &u8| a == b;

        let mut device = vec![(0u64, 0u64); keys.len()];
        let mut serial = vec![(0u64, 0u64); keys.len()];
        inclusive_scan_by_key_with(&policy, &keys, &maps, &mut device[..], equiv, then_affine).unwrap();
        inclusive_scan_by_key_with(&seq(), &keys, &maps, &mut serial[..], equiv, then_affine).unwrap();
        prop_assert_eq!(&device, &serial);

        exclusive_scan_by_key_with(&policy, &keys, &maps, &mut device[..], init, equiv, then_affine).unwrap();
        exclusive_scan_by_key_with(&seq(), &keys, &maps, &mut serial[..], init, equiv, then_affine).unwrap();
        prop_assert_eq!(&device, &serial);
    }
}
