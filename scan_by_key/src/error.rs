use thiserror::Error;

/// Failure modes of a scan invocation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScanError {
    /// The value or output range is shorter than the key range.
    #[error("invalid range: {keys} keys but only {available} positions")]
    InvalidRange { keys: usize, available: usize },

    /// The workspace allocator refused the request.
    #[error("out of resources: could not acquire {requested} workspace bytes")]
    OutOfResources { requested: usize },

    /// A tile task panicked, or the CUDA driver reported an error.
    #[error("device fault: {0}")]
    DeviceFault(String),

    /// The element type cannot be packed into the workspace.
    #[error("unsupported type: {0}")]
    UnsupportedType(&'static str),

    /// The tile geometry is unusable.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, ScanError>;

#[cfg(feature = "cuda")]
impl From<cust::error::CudaError> for ScanError {
    fn from(err: cust::error::CudaError) -> Self {
        ScanError::DeviceFault(err.to_string())
    }
}

#[cfg(feature = "cuda")]
impl ScanError {
    /// Maps the failure of a device allocation of `bytes`.
    pub(crate) fn from_allocation(err: cust::error::CudaError, bytes: usize) -> Self {
        match err {
            cust::error::CudaError::OutOfMemory => ScanError::OutOfResources { requested: bytes },
            other => other.into(),
        }
    }
}
