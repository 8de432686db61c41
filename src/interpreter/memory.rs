use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{reason}")]
pub struct MemoryError {
    pub reason: String,
}

impl MemoryError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Reads the value stored at an address in the inspected address space.
pub trait MemoryReader {
    fn read_at(&self, address: u64) -> Result<u64, MemoryError>;
}

impl<F: Fn(u64) -> Result<u64, MemoryError>> MemoryReader for F {
    fn read_at(&self, address: u64) -> Result<u64, MemoryError> {
        self(address)
    }
}

/// Stands in for real process memory access: every read yields `0xCE`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaceholderReader;

impl PlaceholderReader {
    pub const VALUE: u64 = 0xCE;
}

impl MemoryReader for PlaceholderReader {
    fn read_at(&self, _address: u64) -> Result<u64, MemoryError> {
        Ok(Self::VALUE)
    }
}
