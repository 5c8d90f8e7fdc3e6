use crate::segmented::{self, TILE_SIZE};
use cuda_std::{kernel, shared_array, thread};

/// Marks the positions that open a segment: the first one, and every one whose
/// key differs from the key before it.
#[kernel]
#[allow(improper_ctypes_definitions, clippy::missing_safety_doc)]
pub unsafe fn mark_heads_u32(keys: &[u32], heads: *mut u8) {
    let i = (thread::block_idx_x() * thread::block_dim_x() + thread::thread_idx_x()) as usize;

    if i < keys.len() {
        let head = i == 0 || keys[i - 1] != keys[i];
        *(&mut *heads.add(i)) = head as u8;
    }
}

fn add<T: core::ops::Add<Output = T>>(a: T, b: T) -> T {
    a + b
}

// Kernels cannot be generic, so each value type gets its own copy of the three
// passes.
macro_rules! add_scan_kernels {
    ($t:ty, $scan_tiles:ident, $apply_carries:ident, $shift_exclusive:ident) => {
        #[kernel]
        #[allow(improper_ctypes_definitions, clippy::missing_safety_doc)]
        pub unsafe fn $scan_tiles(
            values: &[$t],
            heads: &[u8],
            seed: $t,
            seeded: u32,
            out: *mut $t,
            covered: *mut u8,
            carry_values: *mut $t,
            carry_heads: *mut u8,
        ) {
            let tile_values = shared_array![$t; TILE_SIZE];
            let tile_heads = shared_array![u8; TILE_SIZE];
            segmented::scan_tile(
                values,
                heads,
                seed,
                seeded != 0,
                out,
                covered,
                carry_values,
                carry_heads,
                tile_values,
                tile_heads,
                add,
            );
        }

        #[kernel]
        #[allow(improper_ctypes_definitions, clippy::missing_safety_doc)]
        pub unsafe fn $apply_carries(covered: &[u8], carries: &[$t], out: *mut $t) {
            segmented::apply_carries(covered, carries, out, add);
        }

        #[kernel]
        #[allow(improper_ctypes_definitions, clippy::missing_safety_doc)]
        pub unsafe fn $shift_exclusive(heads: &[u8], inclusive: &[$t], init: $t, out: *mut $t) {
            segmented::shift_exclusive(heads, inclusive, init, out);
        }
    };
}

add_scan_kernels!(u32, scan_tiles_add_u32, apply_carries_add_u32, shift_exclusive_add_u32);
add_scan_kernels!(f32, scan_tiles_add_f32, apply_carries_add_f32, shift_exclusive_add_f32);
