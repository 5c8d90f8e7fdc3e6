//! The device engine: a two-pass segmented scan over tiles.
//!
//! Pass A hands each tile to one thread block, which loads the tile, runs the
//! block-wide segmented scan in place and exports the tile's carry into the
//! workspace. The carries are then scanned as a segmented sequence of their own,
//! one level up, by the same engine. Pass B gives each tile the carry of the
//! tiles before it and folds it into the positions that continue a segment
//! opened before the tile started.
//!
//! Each level of carries takes `tiles` values and `tiles` head flags out of the
//! workspace, and recursion stops once a level fits in a single tile, so the
//! workspace size is a function of the input length and the tile size alone.

use crate::block::{apply_prefix, scan_tile};
use crate::config::ScanConfig;
use crate::error::{Result, ScanError};
use crate::policy::Stream;
use crate::segments::{FlaggedSegments, Segments};
use crate::step::div_ceil;
use crate::workspace::{carve, carved_bytes, Workspace, WorkspaceAllocator};
use rayon::prelude::*;
use std::any::Any;
use std::mem::MaybeUninit;
use std::panic::{self, AssertUnwindSafe};
use tracing::{debug, trace, warn};

/// Whether each output position folds in its own value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanMode<V> {
    Inclusive,
    /// Every segment opens with the given value.
    Exclusive(V),
}

/// Carry counts of every level a scan of `len` elements propagates through,
/// bottom level first. Empty when the input fits in one tile.
pub fn carry_levels(len: usize, tile_size: usize) -> Vec<usize> {
    let mut levels = Vec::new();
    let mut tiles = div_ceil(len, tile_size);
    while tiles > 1 {
        levels.push(tiles);
        tiles = div_ceil(tiles, tile_size);
    }
    levels
}

/// Workspace bytes a scan of `len` elements of `V` needs.
pub fn temp_storage_bytes<V>(len: usize, config: &ScanConfig) -> usize {
    carry_levels(len, config.tile_size)
        .into_iter()
        .map(|tiles| carved_bytes::<V>(tiles) + carved_bytes::<bool>(tiles))
        .sum()
}

/// Segmented scan of the first `segments.len()` positions of `out`.
///
/// Values are read from `src` when given, otherwise from `out` itself. The
/// workspace is held for the duration of the call and released on every exit
/// path.
#[allow(clippy::too_many_arguments)]
pub fn scan<S, V, F>(
    stream: &Stream,
    allocator: &dyn WorkspaceAllocator,
    config: &ScanConfig,
    segments: &S,
    src: Option<&[V]>,
    out: &mut [V],
    mode: ScanMode<V>,
    op: &F,
) -> Result<()>
where
    S: Segments,
    V: Copy + Send + Sync,
    F: Fn(&V, &V) -> V + Sync,
{
    let len = segments.len();
    if len == 0 {
        return Ok(());
    }
    config.validate()?;
    let out = &mut out[..len];

    let mut workspace = Workspace::acquire(allocator, temp_storage_bytes::<V>(len, config))?;
    debug!(
        len,
        tiles = div_ceil(len, config.tile_size),
        workspace = workspace.len(),
        "segmented scan"
    );
    let region = workspace.bytes_mut();

    let launched = stream.install(|| {
        panic::catch_unwind(AssertUnwindSafe(|| {
            scan_level(config, segments, src, out, mode, region, op, 0)
        }))
    });

    match launched {
        Ok(result) => result,
        Err(payload) => {
            let message = panic_message(&*payload);
            warn!(%message, "tile task faulted");
            Err(ScanError::DeviceFault(message))
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn scan_level<S, V, F>(
    config: &ScanConfig,
    segments: &S,
    src: Option<&[V]>,
    out: &mut [V],
    mode: ScanMode<V>,
    region: &mut [MaybeUninit<u8>],
    op: &F,
    level: usize,
) -> Result<()>
where
    S: Segments,
    V: Copy + Send + Sync,
    F: Fn(&V, &V) -> V + Sync,
{
    let tile_size = config.tile_size;
    let lanes = config.block_size;
    let tiles = div_ceil(out.len(), tile_size);
    trace!(level, len = out.len(), tiles, "scan level");

    let seed = match mode {
        ScanMode::Exclusive(init) => Some(init),
        ScanMode::Inclusive => None,
    };

    if tiles == 1 {
        let mut heads = vec![false; out.len()];
        segments.heads(0, &mut heads);
        load_tile(src, 0, out, &heads, seed.as_ref(), op);
        scan_tile(out, &heads, lanes, op);
        if let ScanMode::Exclusive(init) = mode {
            shift_tile(out, &heads, None, init);
        }
        return Ok(());
    }

    let (carry_values, region) = carve::<V>(region, tiles)?;
    let (carry_heads, region) = carve::<bool>(region, tiles)?;

    // Pass A: per-tile scan, exporting one carry per tile.
    out.par_chunks_mut(tile_size)
        .zip(carry_values.par_iter_mut())
        .zip(carry_heads.par_iter_mut())
        .enumerate()
        .for_each(|(t, ((tile, value), head))| {
            let start = t * tile_size;
            let mut heads = vec![false; tile.len()];
            segments.heads(start, &mut heads);
            load_tile(src, start, tile, &heads, seed.as_ref(), op);
            let carry = scan_tile(tile, &heads, lanes, op);
            value.write(carry.value);
            head.write(carry.head);
        });
    // Pass A wrote every slot.
    let carry_values = unsafe { assume_init(carry_values) };
    let carry_heads = unsafe { assume_init(carry_heads) };

    // Carry propagation: after this, `carry_values[t]` is the fold of the
    // segment open at the end of tile `t`, from its head onwards.
    scan_level(
        config,
        &FlaggedSegments(carry_heads),
        None,
        carry_values,
        ScanMode::Inclusive,
        region,
        op,
        level + 1,
    )?;
    let carry_values = &*carry_values;

    // Pass B: carry application.
    out.par_chunks_mut(tile_size)
        .enumerate()
        .for_each(|(t, tile)| {
            let start = t * tile_size;
            let mut heads = vec![false; tile.len()];
            segments.heads(start, &mut heads);
            let carry_in = if t > 0 && !heads[0] {
                Some(carry_values[t - 1])
            } else {
                None
            };
            if let Some(carry_in) = &carry_in {
                apply_prefix(tile, &heads, carry_in, op);
            }
            if let ScanMode::Exclusive(init) = mode {
                shift_tile(tile, &heads, carry_in, init);
            }
        });

    Ok(())
}

/// Brings a tile's values into place. In exclusive mode every head is seeded
/// with the initial value so the inclusive scan that follows starts each
/// segment from it.
fn load_tile<V, F>(
    src: Option<&[V]>,
    start: usize,
    tile: &mut [V],
    heads: &[bool],
    seed: Option<&V>,
    op: &F,
) where
    V: Copy,
    F: Fn(&V, &V) -> V,
{
    if let Some(src) = src {
        tile.copy_from_slice(&src[start..start + tile.len()]);
    }
    if let Some(seed) = seed {
        for (x, _) in tile.iter_mut().zip(heads).filter(|(_, head)| **head) {
            *x = op(seed, &*x);
        }
    }
}

/// Turns a seeded inclusive tile into the exclusive result: heads take the
/// initial value and every other position takes its predecessor's inclusive
/// value. `carry_in` stands in for the position before the tile.
fn shift_tile<V: Copy>(tile: &mut [V], heads: &[bool], carry_in: Option<V>, init: V) {
    for i in (1..tile.len()).rev() {
        tile[i] = if heads[i] { init } else { tile[i - 1] };
    }
    tile[0] = match carry_in {
        Some(carry) if !heads[0] => carry,
        _ => init,
    };
}

/// # Safety
///
/// Every element of `slots` must have been written.
unsafe fn assume_init<T>(slots: &mut [MaybeUninit<T>]) -> &mut [T] {
    &mut *(slots as *mut [MaybeUninit<T>] as *mut [T])
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "tile task panicked".to_string()
    }
}
