use crate::{SourceReference, SourceSpan};
use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum RuntimeError {
    #[error("undefined symbol '{name}'")]
    UndefinedSymbol {
        name: String,
        #[label("not a symbol, hex number or export")]
        found_at: SourceSpan,
        #[source_code]
        source_code: SourceReference,
    },
    #[error("'{path}' not found")]
    NotFound {
        path: String,
        #[label("no such module export or module")]
        found_at: SourceSpan,
        #[source_code]
        source_code: SourceReference,
    },
    #[error("division by zero")]
    DivisionByZero {
        #[label("this is zero")]
        divisor_at: SourceSpan,
        operator: String,
        #[label("in this '{operator}'")]
        operator_at: SourceSpan,
        #[source_code]
        source_code: SourceReference,
    },
    #[error("arithmetic overflow")]
    Overflow {
        operator: String,
        #[label("'{operator}' overflowed")]
        operator_at: SourceSpan,
        #[source_code]
        source_code: SourceReference,
    },
    #[error("hex literal '{text}' is out of range")]
    LiteralOutOfRange {
        text: String,
        #[label("too many digits")]
        found_at: SourceSpan,
        #[source_code]
        source_code: SourceReference,
    },
    #[error("address must not be negative")]
    NegativeAddress {
        value: i128,
        #[label("evaluates to -0x{:X}", .value.unsigned_abs())]
        found_at: SourceSpan,
        #[source_code]
        source_code: SourceReference,
    },
    #[error("address 0x{value:X} is out of range")]
    AddressOutOfRange {
        value: i128,
        #[label("does not fit in 64 bits")]
        found_at: SourceSpan,
        #[source_code]
        source_code: SourceReference,
    },
    #[error("failed to read memory at 0x{address:X}: {reason}")]
    MemoryRead {
        address: u64,
        reason: String,
        #[label("dereferenced here")]
        found_at: SourceSpan,
        #[source_code]
        source_code: SourceReference,
    },
}

impl RuntimeError {
    pub fn span(&self) -> SourceSpan {
        match self {
            Self::UndefinedSymbol { found_at, .. }
            | Self::NotFound { found_at, .. }
            | Self::LiteralOutOfRange { found_at, .. }
            | Self::NegativeAddress { found_at, .. }
            | Self::AddressOutOfRange { found_at, .. }
            | Self::MemoryRead { found_at, .. } => *found_at,
            Self::DivisionByZero { divisor_at, .. } => *divisor_at,
            Self::Overflow { operator_at, .. } => *operator_at,
        }
    }
}
