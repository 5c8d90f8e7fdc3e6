//! Generator fill, the companion algorithm scan tests lean on.

use crate::dispatch::{check_range, resolve};
use crate::error::Result;
use crate::output::OutputRange;
use crate::policy::{ExecutionPolicy, System};
use rayon::prelude::*;

/// Assigns `gen()` to every position of `out`.
pub fn generate<P, T, G>(policy: &P, out: &mut [T], gen: G)
where
    P: ExecutionPolicy,
    T: Send,
    G: Fn() -> T + Sync,
{
    match resolve::<P>() {
        System::Device => policy
            .stream()
            .install(|| out.par_iter_mut().for_each(|x| *x = gen())),
        System::Sequential => out.iter_mut().for_each(|x| *x = gen()),
    }
}

/// Assigns `gen()` to the first `n` positions of `out` and returns the range
/// past them.
pub fn generate_n<P, T, O, G>(policy: &P, mut out: O, n: usize, gen: G) -> Result<O::End>
where
    P: ExecutionPolicy,
    T: Send,
    O: OutputRange<T>,
    G: Fn() -> T + Sync,
{
    if let Some(slots) = out.slots() {
        check_range(n, slots.len())?;
        generate(policy, &mut slots[..n], gen);
    }
    Ok(out.advance(n))
}
