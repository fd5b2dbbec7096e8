//! Register description and debugger access layer for configurable RISC-V harts.

/// Error types for configuration, lookup and register access.
pub mod error;
pub use error::{AccessError, ConfigError, RegisterError};

/// Hart configuration: extensions, register widths, debug-mode level.
pub mod config;
pub use config::{DebugMode, Extensions, HartConfig, DEFAULT_VLEN};

/// Raw register storage and storage handles.
pub mod state;
pub use state::{
    byte_len, HartState, RawReg, StorageField, FPR_COUNT, GPR_COUNT, GPR_COUNT_REDUCED,
    VREG_COUNT,
};

/// Register groups and visibility views.
pub mod view;
pub use view::{is_visible, next_visible, RegisterGroup, RegisterView};

/// CSR enumeration contract and the standard CSR set.
pub mod csr;
pub use csr::{CsrAttrs, CsrCursor, CsrDetails, CsrIter, CsrUnit, Privilege, StandardCsrs};

/// Integration support register catalog and enumerator.
pub mod integration;
pub use integration::{
    integration_registers, next_integration_register, DebugControl, IntegrationRegister,
    INTEGRATION_INDEX_BASE, INTEGRATION_REGISTERS,
};

/// Register descriptors and table construction.
pub mod catalog;
pub use catalog::{
    Accessor, CsrBinding, RegisterAccess, RegisterDescriptor, RegisterTable, RegisterUsage,
    TableDiagnostic, TableMode, TablePlan, CSR_INDEX_BASE, FPR_INDEX_BASE, VREG_INDEX_BASE,
};

/// Accessor dispatch and the artifact-access scope guard.
pub mod access;
pub use access::ArtifactAccess;

/// Storage field aliases resolved against a register table.
pub mod fields;
pub use fields::{AliasTarget, FieldAlias, FieldBinding, FieldMap, STANDARD_FIELD_ALIASES};

/// Hart instances, topology and lazily-built tables.
pub mod hart;
pub use hart::{Hart, Topology};

#[cfg(test)]
use proptest as _;
#[cfg(test)]
use rstest as _;
