//! Scan by key on a CUDA device.
//!
//! Runs the same two-pass tile scheme as the portable engine with the kernels
//! from `kernel_tools`: one thread block per tile, one thread per element. The
//! kernels are instantiated for `u32` keys compared by equality and for `u32`
//! or `f32` values folded with addition.

use crate::engine::carry_levels;
use crate::error::{Result, ScanError};
use crate::step::div_ceil;
use cust::context::Context;
use cust::memory::DeviceCopy;
use cust::prelude::*;
use kernel_tools::segmented::TILE_SIZE;
use std::mem;
use tracing::{debug, trace};

static PTX: &str = include_str!("../../resources/kernel_tools.ptx");

/// Value types the PTX module has kernels for.
pub trait DeviceValue: DeviceCopy + Default {
    const SCAN_TILES: &'static str;
    const APPLY_CARRIES: &'static str;
    const SHIFT_EXCLUSIVE: &'static str;
}

impl DeviceValue for u32 {
    const SCAN_TILES: &'static str = "scan_tiles_add_u32";
    const APPLY_CARRIES: &'static str = "apply_carries_add_u32";
    const SHIFT_EXCLUSIVE: &'static str = "shift_exclusive_add_u32";
}

impl DeviceValue for f32 {
    const SCAN_TILES: &'static str = "scan_tiles_add_f32";
    const APPLY_CARRIES: &'static str = "apply_carries_add_f32";
    const SHIFT_EXCLUSIVE: &'static str = "shift_exclusive_add_f32";
}

/// A loaded kernel module and the stream its launches are queued on.
pub struct CudaScan {
    module: Module,
    stream: Stream,
    _context: Context,
}

impl CudaScan {
    /// Initializes the first device and loads the scan kernels.
    pub fn new() -> Result<Self> {
        let context = cust::quick_init()?;
        let module = Module::from_ptx(PTX, &[])?;
        let stream = Stream::new(StreamFlags::NON_BLOCKING, None)?;
        Ok(Self {
            module,
            stream,
            _context: context,
        })
    }

    /// Inclusive sum of `values` within each run of equal `keys`.
    pub fn inclusive_scan_by_key<V: DeviceValue>(&self, keys: &[u32], values: &[V]) -> Result<Vec<V>> {
        self.scan_by_key(keys, values, None)
    }

    /// Exclusive sum of `values` within each run of equal `keys`, with every run
    /// starting from `init`.
    pub fn exclusive_scan_by_key<V: DeviceValue>(
        &self,
        keys: &[u32],
        values: &[V],
        init: V,
    ) -> Result<Vec<V>> {
        self.scan_by_key(keys, values, Some(init))
    }

    fn scan_by_key<V: DeviceValue>(&self, keys: &[u32], values: &[V], init: Option<V>) -> Result<Vec<V>> {
        crate::dispatch::check_range(keys.len(), values.len())?;
        let len = keys.len();
        if len == 0 {
            return Ok(Vec::new());
        }

        let stream = &self.stream;
        let dev_keys = upload(keys)?;
        let dev_values = upload(&values[..len])?;
        let dev_heads = uninitialized::<u8>(len)?;
        let dev_scanned = uninitialized::<V>(len)?;
        let dev_out = match init {
            Some(_) => Some(uninitialized::<V>(len)?),
            None => None,
        };

        // Every level is allocated before the first launch.
        let inputs = std::iter::once(len).chain(carry_levels(len, TILE_SIZE));
        let levels = inputs.map(Level::new).collect::<Result<Vec<Level<V>>>>()?;
        debug!(len, levels = levels.len(), exclusive = init.is_some(), "cuda scan by key");

        let mark_heads = self.module.get_function("mark_heads_u32")?;
        unsafe {
            launch!(
                mark_heads<<<div_ceil(len, TILE_SIZE) as u32, TILE_SIZE as u32, 0, stream>>>(
                    dev_keys.as_device_ptr(),
                    dev_keys.len(),
                    dev_heads.as_device_ptr()
                )
            )?;
        }

        self.scan_level(&levels, &dev_heads, &dev_values, init, &dev_scanned)?;

        let result = match (init, dev_out) {
            (Some(init), Some(dev_out)) => {
                let shift = self.module.get_function(V::SHIFT_EXCLUSIVE)?;
                unsafe {
                    launch!(
                        shift<<<div_ceil(len, TILE_SIZE) as u32, TILE_SIZE as u32, 0, stream>>>(
                            dev_heads.as_device_ptr(),
                            dev_heads.len(),
                            dev_scanned.as_device_ptr(),
                            dev_scanned.len(),
                            init,
                            dev_out.as_device_ptr()
                        )
                    )?;
                }
                dev_out
            }
            _ => dev_scanned,
        };
        stream.synchronize()?;

        let mut ys = vec![V::default(); len];
        result.copy_to(&mut ys)?;
        Ok(ys)
    }

    /// Inclusive segmented scan of `values` into `out` using `levels[0]`,
    /// recursing over the tile carries with the levels above it.
    fn scan_level<V: DeviceValue>(
        &self,
        levels: &[Level<V>],
        heads: &DeviceBuffer<u8>,
        values: &DeviceBuffer<V>,
        seed: Option<V>,
        out: &DeviceBuffer<V>,
    ) -> Result<()> {
        let (level, upper) = levels
            .split_first()
            .ok_or_else(|| ScanError::DeviceFault("carry level missing".to_string()))?;
        let stream = &self.stream;
        let tiles = level.carry_values.len();
        trace!(len = values.len(), tiles, "cuda scan level");

        let scan_tiles = self.module.get_function(V::SCAN_TILES)?;
        unsafe {
            launch!(
                scan_tiles<<<tiles as u32, TILE_SIZE as u32, 0, stream>>>(
                    values.as_device_ptr(),
                    values.len(),
                    heads.as_device_ptr(),
                    heads.len(),
                    seed.unwrap_or_default(),
                    seed.is_some() as u32,
                    out.as_device_ptr(),
                    level.covered.as_device_ptr(),
                    level.carry_values.as_device_ptr(),
                    level.carry_heads.as_device_ptr()
                )
            )?;
        }

        if tiles > 1 {
            self.scan_level(upper, &level.carry_heads, &level.carry_values, None, &level.carries)?;

            let apply_carries = self.module.get_function(V::APPLY_CARRIES)?;
            unsafe {
                launch!(
                    apply_carries<<<tiles as u32, TILE_SIZE as u32, 0, stream>>>(
                        level.covered.as_device_ptr(),
                        level.covered.len(),
                        level.carries.as_device_ptr(),
                        level.carries.len(),
                        out.as_device_ptr()
                    )
                )?;
            }
        }

        Ok(())
    }
}

/// Device buffers one scan level writes: per-element coverage flags, the raw
/// tile carries and their scanned form.
struct Level<V: DeviceCopy> {
    covered: DeviceBuffer<u8>,
    carry_values: DeviceBuffer<V>,
    carry_heads: DeviceBuffer<u8>,
    carries: DeviceBuffer<V>,
}

impl<V: DeviceCopy> Level<V> {
    fn new(len: usize) -> Result<Self> {
        let tiles = div_ceil(len, TILE_SIZE);
        Ok(Self {
            covered: uninitialized(len)?,
            carry_values: uninitialized(tiles)?,
            carry_heads: uninitialized(tiles)?,
            carries: uninitialized(tiles)?,
        })
    }
}

/// Allocates `len` slots that a kernel writes before anything reads them.
fn uninitialized<T: DeviceCopy>(len: usize) -> Result<DeviceBuffer<T>> {
    unsafe { DeviceBuffer::uninitialized(len) }
        .map_err(|err| ScanError::from_allocation(err, len * mem::size_of::<T>()))
}

fn upload<T: DeviceCopy>(xs: &[T]) -> Result<DeviceBuffer<T>> {
    DeviceBuffer::from_slice(xs).map_err(|err| ScanError::from_allocation(err, mem::size_of_val(xs)))
}
