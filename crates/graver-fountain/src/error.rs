use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FountainError {
    #[error("failed to decode fragment: {0}")]
    InvalidFragment(String),

    #[error("fragment header disagrees with previously received fragments")]
    InconsistentFragment,

    #[error("reassembled message checksum mismatch: expected {expected:08x}, got {actual:08x}")]
    ChecksumMismatch { expected: u32, actual: u32 },

    #[error("too many unresolved fragments pending (limit {0})")]
    TooManyFragments(usize),
}

pub type Result<T> = std::result::Result<T, FountainError>;

/// Helper trait to convert CBOR errors into fragment errors
pub(crate) trait ToFountainError<T> {
    fn map_err_fragment(self) -> Result<T>;
}

impl<T, E: std::fmt::Display> ToFountainError<T> for std::result::Result<T, E> {
    fn map_err_fragment(self) -> Result<T> {
        self.map_err(|e| FountainError::InvalidFragment(e.to_string()))
    }
}
