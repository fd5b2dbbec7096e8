use thiserror::Error;

use crate::state::RawReg;

/// Rejected hart configurations, reported by [`crate::Hart::new`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Error)]
pub enum ConfigError {
    /// General register width is neither 32 nor 64.
    #[error("unsupported XLEN {0} (expected 32 or 64)")]
    UnsupportedXlen(u32),
    /// Floating-point register width is not 0, 32 or 64.
    #[error("unsupported FLEN {0} (expected 0, 32 or 64)")]
    UnsupportedFlen(u32),
    /// Vector register width is not a power of two in `32..=65536`.
    #[error("unsupported VLEN {0} (expected a power of two between 32 and 65536)")]
    UnsupportedVlen(u32),
    /// F or D is enabled but FLEN cannot hold the widest enabled format.
    #[error("FLEN {flen} is too narrow for the enabled floating-point extensions (need {needed})")]
    FlenTooNarrow {
        /// Configured floating-point width.
        flen: u32,
        /// Minimum width required by the enabled extensions.
        needed: u32,
    },
    /// Extension letter not recognised by [`crate::Extensions::from_letters`].
    #[error("unknown ISA extension letter '{0}'")]
    UnknownExtension(char),
    /// Debug-mode name not recognised by [`crate::DebugMode`]'s parser.
    #[error("unknown debug mode '{0}'")]
    UnknownDebugMode(String),
}

/// Failures of register-table lookups.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Error)]
pub enum RegisterError {
    /// The instance is an SMP or cluster container and owns no registers.
    #[error("container instances do not expose registers")]
    Container,
    /// No register with this name exists in the requested table.
    #[error("no register named '{0}'")]
    UnknownRegister(String),
    /// The register was found but the access failed.
    #[error(transparent)]
    Access(#[from] AccessError),
}

/// Failed register reads and writes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Error)]
pub enum AccessError {
    /// Write attempted on a read-only register.
    #[error("register '{register}' is read-only")]
    ReadOnly {
        /// Register display name.
        register: &'static str,
    },
    /// Caller buffer is shorter than the register width.
    #[error("buffer of {got} bytes is too small for {needed}-byte register")]
    BufferTooSmall {
        /// Bytes the register transfers.
        needed: usize,
        /// Bytes supplied by the caller.
        got: usize,
    },
    /// Raw storage handle does not resolve to storage on this hart.
    #[error("no backing storage for {0:?}")]
    NoStorage(RawReg),
    /// Register width does not fit its backing storage.
    #[error("{bits}-bit access does not fit the storage of {raw:?}")]
    WidthMismatch {
        /// Storage handle that was accessed.
        raw: RawReg,
        /// Requested access width.
        bits: u32,
    },
    /// A read or write accessor reported failure.
    #[error("accessor for register '{register}' failed")]
    AccessorFailed {
        /// Register display name.
        register: &'static str,
    },
}
