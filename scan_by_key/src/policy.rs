//! Execution policies and the streams they run on.
//!
//! A policy carries a capability tag ([`System`]), the stream work is enqueued
//! on, the workspace allocator and the tile geometry. [`Par`] targets the
//! device engine; [`Seq`] forces the sequential fold and can be built from any
//! other policy.

use crate::config::ScanConfig;
use crate::error::{Result, ScanError};
use crate::workspace::{default_pool, WorkspaceAllocator, DEFAULT_POOL};
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::fmt;
use std::sync::Arc;

/// Where an invocation executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum System {
    Device,
    Sequential,
}

/// An ordered queue of device work.
///
/// The default stream runs on the global `rayon` pool. A stream built with
/// [`Stream::new`] owns a dedicated pool, so invocations on different streams
/// never share workers.
#[derive(Clone, Default)]
pub struct Stream {
    pool: Option<Arc<ThreadPool>>,
}

static DEFAULT_STREAM: Stream = Stream { pool: None };

impl Stream {
    pub fn new(threads: usize) -> Result<Self> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("scan-stream-{}", i))
            .build()
            .map_err(|err| ScanError::DeviceFault(format!("stream creation failed: {}", err)))?;
        Ok(Self {
            pool: Some(Arc::new(pool)),
        })
    }

    /// Number of workers available to thread blocks launched on this stream.
    pub fn workers(&self) -> usize {
        match &self.pool {
            Some(pool) => pool.current_num_threads(),
            None => rayon::current_num_threads(),
        }
    }

    /// Runs `work` with this stream's workers, returning once it completes.
    pub fn install<R, W>(&self, work: W) -> R
    where
        R: Send,
        W: FnOnce() -> R + Send,
    {
        match &self.pool {
            Some(pool) => pool.install(work),
            None => work(),
        }
    }
}

impl fmt::Debug for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stream")
            .field("dedicated", &self.pool.is_some())
            .field("workers", &self.workers())
            .finish()
    }
}

/// The surface every algorithm consumes from its policy argument.
pub trait ExecutionPolicy: Send + Sync {
    const SYSTEM: System;

    fn stream(&self) -> &Stream {
        &DEFAULT_STREAM
    }

    fn allocator(&self) -> &dyn WorkspaceAllocator {
        &**DEFAULT_POOL
    }

    fn config(&self) -> ScanConfig {
        ScanConfig::default()
    }
}

/// The device policy.
#[derive(Clone)]
pub struct Par {
    stream: Stream,
    allocator: Arc<dyn WorkspaceAllocator>,
    config: ScanConfig,
}

/// The device policy on the default stream with the process-wide pool.
pub fn par() -> Par {
    Par::default()
}

impl Par {
    /// The same policy, enqueuing on `stream`.
    pub fn on(&self, stream: Stream) -> Self {
        Self {
            stream,
            ..self.clone()
        }
    }

    pub fn with_allocator(&self, allocator: Arc<dyn WorkspaceAllocator>) -> Self {
        Self {
            allocator,
            ..self.clone()
        }
    }

    pub fn with_config(&self, config: ScanConfig) -> Self {
        Self {
            config,
            ..self.clone()
        }
    }
}

impl Default for Par {
    fn default() -> Self {
        Self {
            stream: Stream::default(),
            allocator: default_pool(),
            config: ScanConfig::default(),
        }
    }
}

impl fmt::Debug for Par {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Par")
            .field("stream", &self.stream)
            .field("config", &self.config)
            .finish()
    }
}

impl ExecutionPolicy for Par {
    const SYSTEM: System = System::Device;

    fn stream(&self) -> &Stream {
        &self.stream
    }

    fn allocator(&self) -> &dyn WorkspaceAllocator {
        &*self.allocator
    }

    fn config(&self) -> ScanConfig {
        self.config
    }
}

/// The sequential tag. Every policy converts into it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Seq;

pub fn seq() -> Seq {
    Seq
}

impl ExecutionPolicy for Seq {
    const SYSTEM: System = System::Sequential;
}

impl<P: ExecutionPolicy> From<&P> for Seq {
    fn from(_: &P) -> Self {
        Seq
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workspace::MemoryPool;

    fn system_of<P: ExecutionPolicy>(_: &P) -> System {
        P::SYSTEM
    }

    #[test]
    fn any_policy_converts_to_seq_test() {
        let policy = par();
        let tag = Seq::from(&policy);
        assert_eq!(system_of(&tag), System::Sequential);
        assert_eq!(Seq::from(&tag), Seq);
    }

    #[test]
    fn par_builders_keep_other_fields_test() {
        let config = ScanConfig::new(64, 8).unwrap();
        let pool: Arc<dyn WorkspaceAllocator> = Arc::new(MemoryPool::new());
        let policy = par().with_config(config).with_allocator(pool);
        let stream = Stream::new(2).unwrap();
        let policy = policy.on(stream);
        assert_eq!(policy.config(), config);
        assert_eq!(policy.stream().workers(), 2);
        assert_eq!(system_of(&policy), System::Device);
    }

    #[test]
    fn dedicated_stream_runs_on_its_pool_test() {
        let stream = Stream::new(3).unwrap();
        let workers = stream.install(rayon::current_num_threads);
        assert_eq!(workers, 3);
    }
}
