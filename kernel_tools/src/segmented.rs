use crate::step::strides;
use cuda_std::thread;

/// Elements per tile. The kernel launch should use this as the block size so
/// that every thread owns exactly one element of its tile.
pub const TILE_SIZE: usize = 1024;

/// Block-wide inclusive segmented scan over a tile held in shared memory.
///
/// `heads[t]` is non-zero when element `t` opens a segment. On return it is
/// non-zero when any element in `0..=t` opens one, which tells the carry pass
/// which elements still belong to a segment that began before the tile.
///
/// Uses the Kogge-Stone algorithm. Each step reads the partner element into
/// registers and waits for the whole block before writing, so no thread sees a
/// partner that has already moved on to the next stride.
pub unsafe fn segmented_scan_block<T, F>(values: *mut T, heads: *mut u8, op: &F)
where
    T: Copy,
    F: Fn(T, T) -> T,
{
    let t_idx = thread::thread_idx_x() as usize;
    let b_dim = thread::block_dim_x() as usize;

    for stride in strides(b_dim) {
        thread::sync_threads();
        let partner = if t_idx >= stride {
            Some((*values.add(t_idx - stride), *heads.add(t_idx - stride)))
        } else {
            None
        };

        thread::sync_threads();
        if let Some((value, head)) = partner {
            if *heads.add(t_idx) == 0 {
                *(&mut *values.add(t_idx)) = op(value, *values.add(t_idx));
            }
            *(&mut *heads.add(t_idx)) |= head;
        }
    }

    thread::sync_threads();
}

/// Pass A for one tile: load, scan in shared memory, write the tile back and
/// export its carry.
///
/// Positions past the end of the input are loaded as heads so they never fold
/// into real elements. With `seeded` set, every head is combined with `seed`
/// on load, which is how the exclusive scan gets its initial value.
#[allow(clippy::too_many_arguments)]
pub unsafe fn scan_tile<T, F>(
    values: &[T],
    heads: &[u8],
    seed: T,
    seeded: bool,
    out: *mut T,
    covered: *mut u8,
    carry_values: *mut T,
    carry_heads: *mut u8,
    tile_values: *mut T,
    tile_heads: *mut u8,
    op: F,
) where
    T: Copy,
    F: Fn(T, T) -> T,
{
    let t_idx = thread::thread_idx_x() as usize;
    let b_idx = thread::block_idx_x() as usize;
    let b_dim = thread::block_dim_x() as usize;
    let i = b_idx * b_dim + t_idx;
    let len = values.len();

    if i < len {
        let head = heads[i];
        let value = values[i];
        *(&mut *tile_values.add(t_idx)) = if seeded && head != 0 {
            op(seed, value)
        } else {
            value
        };
        *(&mut *tile_heads.add(t_idx)) = head;
    } else {
        *(&mut *tile_heads.add(t_idx)) = 1;
    }

    segmented_scan_block(tile_values, tile_heads, &op);

    if i < len {
        *(&mut *out.add(i)) = *tile_values.add(t_idx);
        *(&mut *covered.add(i)) = *tile_heads.add(t_idx);
    }

    let last = b_dim.min(len - b_idx * b_dim) - 1;
    if t_idx == last {
        *(&mut *carry_values.add(b_idx)) = *tile_values.add(t_idx);
        *(&mut *carry_heads.add(b_idx)) = *tile_heads.add(t_idx);
    }
}

/// Pass B: folds the scanned carry of the preceding tiles into every element
/// that continues a segment opened before its tile.
pub unsafe fn apply_carries<T, F>(covered: &[u8], carries: &[T], out: *mut T, op: F)
where
    T: Copy,
    F: Fn(T, T) -> T,
{
    let t_idx = thread::thread_idx_x() as usize;
    let b_idx = thread::block_idx_x() as usize;
    let b_dim = thread::block_dim_x() as usize;
    let i = b_idx * b_dim + t_idx;

    if b_idx > 0 && i < covered.len() && covered[i] == 0 {
        *(&mut *out.add(i)) = op(carries[b_idx - 1], *out.add(i));
    }
}

/// Turns a seeded inclusive result into the exclusive one.
pub unsafe fn shift_exclusive<T: Copy>(heads: &[u8], inclusive: &[T], init: T, out: *mut T) {
    let i = (thread::block_idx_x() * thread::block_dim_x() + thread::thread_idx_x()) as usize;

    if i < heads.len() {
        *(&mut *out.add(i)) = if heads[i] != 0 { init } else { inclusive[i - 1] };
    }
}
