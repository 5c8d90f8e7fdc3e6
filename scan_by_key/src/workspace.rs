//! Scratch memory borrowed by the engine for the duration of one invocation.
//!
//! The engine asks for a byte count, the allocator hands back a region aligned
//! to [`WORKSPACE_ALIGNMENT`], and the [`Workspace`] guard returns it when it
//! goes out of scope. Release runs from `Drop`, so it happens on success, on an
//! error return and while unwinding from a faulted tile.

use crate::error::{Result, ScanError};
use crate::step::align_up;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::alloc::{self, Layout};
use std::collections::HashMap;
use std::mem::MaybeUninit;
use std::ptr::NonNull;
use std::sync::Arc;
use tracing::{trace, warn};

/// Every workspace region starts on, and every carved sub-region is sized to, a
/// multiple of this many bytes.
pub const WORKSPACE_ALIGNMENT: usize = 256;

#[repr(C, align(256))]
struct Aligned;

/// Source of device-visible scratch memory.
///
/// Implementations must tolerate concurrent `acquire`/`release` calls from
/// independent invocations.
pub trait WorkspaceAllocator: Send + Sync {
    /// Returns a region of at least `bytes` bytes aligned to
    /// [`WORKSPACE_ALIGNMENT`]. A zero-byte request returns a dangling sentinel.
    fn acquire(&self, bytes: usize) -> Result<NonNull<u8>>;

    /// Returns a region obtained from `acquire`.
    ///
    /// # Safety
    ///
    /// `ptr` must have come from `acquire` on this allocator and must not be
    /// used afterwards.
    unsafe fn release(&self, ptr: NonNull<u8>);
}

/// The pointer `acquire(0)` hands out. `release` accepts it as a no-op.
pub fn empty_sentinel() -> NonNull<u8> {
    NonNull::<Aligned>::dangling().cast()
}

struct Block {
    ptr: NonNull<u8>,
    bytes: usize,
}

#[derive(Default)]
struct PoolState {
    free: Vec<Block>,
    in_use: HashMap<usize, usize>,
    outstanding: usize,
    cached: usize,
}

// The pool owns every block it hands out; the raw pointers are only
// dereferenced by the borrower that acquired them.
unsafe impl Send for PoolState {}

/// A caching allocator that recycles released regions.
///
/// Requests are served best-fit from the free list before falling back to the
/// system allocator. An optional limit bounds the bytes in use plus the bytes
/// cached.
pub struct MemoryPool {
    state: Mutex<PoolState>,
    limit: Option<usize>,
}

impl MemoryPool {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(PoolState::default()),
            limit: None,
        }
    }

    /// A pool that refuses to hold more than `limit` bytes.
    pub fn with_limit(limit: usize) -> Self {
        Self {
            state: Mutex::new(PoolState::default()),
            limit: Some(limit),
        }
    }

    /// Bytes currently lent out.
    pub fn outstanding(&self) -> usize {
        self.state.lock().outstanding
    }

    /// Bytes sitting in the free list.
    pub fn cached(&self) -> usize {
        self.state.lock().cached
    }

    /// Returns every cached block to the system allocator.
    pub fn trim(&self) {
        let mut state = self.state.lock();
        for block in state.free.drain(..) {
            unsafe { alloc::dealloc(block.ptr.as_ptr(), layout(block.bytes)) };
        }
        state.cached = 0;
    }
}

impl Default for MemoryPool {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkspaceAllocator for MemoryPool {
    fn acquire(&self, bytes: usize) -> Result<NonNull<u8>> {
        if bytes == 0 {
            return Ok(empty_sentinel());
        }
        let bytes = align_up(bytes, WORKSPACE_ALIGNMENT);
        let mut state = self.state.lock();

        let best_fit = state
            .free
            .iter()
            .enumerate()
            .filter(|(_, block)| block.bytes >= bytes)
            .min_by_key(|(_, block)| block.bytes)
            .map(|(i, _)| i);

        let block = match best_fit {
            Some(i) => {
                let block = state.free.swap_remove(i);
                state.cached -= block.bytes;
                block
            }
            None => {
                // No cached block fits, so none of them is kept.
                let stale = std::mem::take(&mut state.free);
                for block in stale {
                    state.cached -= block.bytes;
                    unsafe { alloc::dealloc(block.ptr.as_ptr(), layout(block.bytes)) };
                }
                let held = state.outstanding;
                if self.limit.map_or(false, |limit| held + bytes > limit) {
                    warn!(bytes, held, "workspace pool limit reached");
                    return Err(ScanError::OutOfResources { requested: bytes });
                }
                let ptr = unsafe { alloc::alloc(layout(bytes)) };
                let ptr = NonNull::new(ptr).ok_or_else(|| {
                    warn!(bytes, "system allocator refused workspace");
                    ScanError::OutOfResources { requested: bytes }
                })?;
                Block { ptr, bytes }
            }
        };

        trace!(bytes = block.bytes, "workspace acquired");
        state.outstanding += block.bytes;
        state.in_use.insert(block.ptr.as_ptr() as usize, block.bytes);
        Ok(block.ptr)
    }

    unsafe fn release(&self, ptr: NonNull<u8>) {
        if ptr == empty_sentinel() {
            return;
        }
        let mut state = self.state.lock();
        match state.in_use.remove(&(ptr.as_ptr() as usize)) {
            Some(bytes) => {
                trace!(bytes, "workspace released");
                state.outstanding -= bytes;
                state.cached += bytes;
                state.free.push(Block { ptr, bytes });
            }
            None => debug_assert!(false, "released a pointer this pool never lent"),
        }
    }
}

impl Drop for MemoryPool {
    fn drop(&mut self) {
        let state = self.state.get_mut();
        for block in state.free.drain(..) {
            unsafe { alloc::dealloc(block.ptr.as_ptr(), layout(block.bytes)) };
        }
        // Blocks still lent out are leaked rather than freed under a borrower.
        if state.outstanding > 0 {
            warn!(outstanding = state.outstanding, "pool dropped with live workspace");
        }
    }
}

fn layout(bytes: usize) -> Layout {
    // `bytes` is a non-zero multiple of a power-of-two alignment.
    unsafe { Layout::from_size_align_unchecked(bytes, WORKSPACE_ALIGNMENT) }
}

pub(crate) static DEFAULT_POOL: Lazy<Arc<MemoryPool>> = Lazy::new(|| Arc::new(MemoryPool::new()));

/// The process-wide pool used by policies that do not name their own.
///
/// It keeps at most the blocks that fit the largest recent request. Long-running
/// callers that shrink their inputs can hand the memory back with
/// [`MemoryPool::trim`].
pub fn default_pool() -> Arc<MemoryPool> {
    DEFAULT_POOL.clone()
}

/// A scoped workspace region. Dropping it returns the region to its allocator.
pub struct Workspace<'a> {
    allocator: &'a dyn WorkspaceAllocator,
    ptr: NonNull<u8>,
    bytes: usize,
}

impl<'a> Workspace<'a> {
    /// Acquires `bytes` (rounded up to the alignment granularity).
    pub fn acquire(allocator: &'a dyn WorkspaceAllocator, bytes: usize) -> Result<Self> {
        let bytes = align_up(bytes, WORKSPACE_ALIGNMENT);
        let ptr = allocator.acquire(bytes)?;
        Ok(Self {
            allocator,
            ptr,
            bytes,
        })
    }

    pub fn len(&self) -> usize {
        self.bytes
    }

    pub fn is_empty(&self) -> bool {
        self.bytes == 0
    }

    /// The whole region as uninitialized bytes.
    pub fn bytes_mut(&mut self) -> &mut [MaybeUninit<u8>] {
        if self.bytes == 0 {
            return &mut [];
        }
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr().cast(), self.bytes) }
    }
}

impl Drop for Workspace<'_> {
    fn drop(&mut self) {
        unsafe { self.allocator.release(self.ptr) };
    }
}

/// Splits `len` elements of `T` off the front of `region`, consuming a
/// granularity-rounded number of bytes.
pub fn carve<'r, T>(
    region: &'r mut [MaybeUninit<u8>],
    len: usize,
) -> Result<(&'r mut [MaybeUninit<T>], &'r mut [MaybeUninit<u8>])> {
    if std::mem::align_of::<T>() > WORKSPACE_ALIGNMENT {
        return Err(ScanError::UnsupportedType(
            "element alignment exceeds the workspace granularity",
        ));
    }
    if len == 0 {
        return Ok((&mut [], region));
    }
    let bytes = carved_bytes::<T>(len);
    if bytes > region.len() {
        return Err(ScanError::OutOfResources { requested: bytes });
    }
    let (head, rest) = region.split_at_mut(bytes);
    debug_assert_eq!(head.as_ptr() as usize % std::mem::align_of::<T>(), 0);
    let typed = unsafe { std::slice::from_raw_parts_mut(head.as_mut_ptr().cast(), len) };
    Ok((typed, rest))
}

/// Bytes `carve` takes for `len` elements of `T`.
pub fn carved_bytes<T>(len: usize) -> usize {
    align_up(len * std::mem::size_of::<T>(), WORKSPACE_ALIGNMENT)
}
