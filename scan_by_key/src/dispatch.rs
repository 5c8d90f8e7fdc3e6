//! Chooses between the device engine and the sequential fold.
//!
//! The choice is made from the policy's compile-time capability tag. A build
//! without the `device` feature has no device context, so every policy lands
//! on the sequential path.

use crate::engine::{self, ScanMode};
use crate::error::{Result, ScanError};
use crate::output::OutputRange;
use crate::policy::{ExecutionPolicy, System};
use crate::segments::Segments;
use crate::sequential;
use tracing::debug;

/// Whether this build can run the device engine at all.
pub const DEVICE_CONTEXT: bool = cfg!(feature = "device");

/// The system `P` resolves to in this build.
pub fn resolve<P: ExecutionPolicy>() -> System {
    match P::SYSTEM {
        System::Device if DEVICE_CONTEXT => System::Device,
        _ => System::Sequential,
    }
}

/// Checks that a range of `available` positions can hold `len` elements.
pub fn check_range(len: usize, available: usize) -> Result<()> {
    if available < len {
        return Err(ScanError::InvalidRange {
            keys: len,
            available,
        });
    }
    Ok(())
}

/// Runs a segmented scan on the system `policy` resolves to.
///
/// With `src` set, values come from it and land in `out`; with `src` unset the
/// scan runs in place over `out`.
pub fn scan<P, S, V, F, O>(
    policy: &P,
    segments: &S,
    src: Option<&[V]>,
    mut out: O,
    mode: ScanMode<V>,
    op: &F,
) -> Result<O::End>
where
    P: ExecutionPolicy,
    S: Segments,
    V: Copy + Send + Sync,
    F: Fn(&V, &V) -> V + Sync,
    O: OutputRange<V>,
{
    let len = segments.len();
    if let Some(src) = src {
        check_range(len, src.len())?;
    }
    if len == 0 {
        return Ok(out.advance(0));
    }

    if let Some(slots) = out.slots() {
        check_range(len, slots.len())?;
        let slots = &mut slots[..len];
        let system = resolve::<P>();
        debug!(len, ?system, "scan dispatch");
        match system {
            System::Device => engine::scan(
                policy.stream(),
                policy.allocator(),
                &policy.config(),
                segments,
                src,
                slots,
                mode,
                op,
            )?,
            System::Sequential => sequential::scan(segments, src, slots, mode, op),
        }
    }

    Ok(out.advance(len))
}
