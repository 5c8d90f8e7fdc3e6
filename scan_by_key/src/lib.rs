//! Segmented prefix scans ("scan by key") over device-resident sequences.
//!
//! A key sequence splits a parallel value sequence into segments: maximal runs
//! of adjacent positions whose keys are equivalent. Each scan folds values
//! with an associative operator inside every segment independently.
//!
//! ```
//! use scan_by_key::{inclusive_scan_by_key, par};
//!
//! let keys = [1, 1, 2, 2, 2, 3];
//! let values = [1, 2, 3, 4, 5, 6];
//! let mut out = [0; 6];
//! inclusive_scan_by_key(&par(), &keys, &values, &mut out[..]).unwrap();
//! assert_eq!(out, [1, 3, 3, 7, 12, 6]);
//! ```
//!
//! [`Par`] runs the tiled two-pass engine on a [`Stream`]; [`Seq`] runs a
//! host-serial fold. Any policy converts into [`Seq`].

mod block;
pub mod config;
#[cfg(feature = "cuda")]
pub mod cuda;
mod dispatch;
mod engine;
mod error;
mod generate;
pub mod ops;
mod output;
mod policy;
mod scan;
mod segments;
mod sequential;
mod step;
pub mod workspace;

pub use config::ScanConfig;
pub use dispatch::DEVICE_CONTEXT;
pub use engine::{temp_storage_bytes, ScanMode};
pub use error::{Result, ScanError};
pub use generate::{generate, generate_n};
pub use output::{Discard, OutputRange};
pub use policy::{par, seq, ExecutionPolicy, Par, Seq, Stream, System};
pub use scan::{
    exclusive_scan, exclusive_scan_by_key, exclusive_scan_by_key_in_place,
    exclusive_scan_by_key_init, exclusive_scan_by_key_pred, exclusive_scan_by_key_with,
    exclusive_scan_init, exclusive_scan_with, inclusive_scan, inclusive_scan_by_key,
    inclusive_scan_by_key_in_place, inclusive_scan_by_key_pred, inclusive_scan_by_key_with,
    inclusive_scan_with,
};
pub use workspace::{MemoryPool, WorkspaceAllocator};
