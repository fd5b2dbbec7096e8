//! Register catalog: builds the ordered descriptor table of a hart.
//!
//! A [`TablePlan`] is resolved once from the configuration and the CSR
//! enumeration, then consumed by a single populate pass. External indices are
//! assigned in fixed bands so a register keeps its identity across rebuilds:
//!
//! | kind | index |
//! |------|-------|
//! | integer `x<n>` | `n` |
//! | `pc` | integer count |
//! | floating point `f<n>` | `33 + n` |
//! | CSR | `65 + number` |
//! | integration | `0x1100 + sub-index` |
//! | vector `v<n>` | `0x2000 + n` |

use thiserror::Error;

use crate::csr::{CsrAttrs, CsrDetails, CsrIter, CsrUnit};
use crate::integration::{integration_registers, DebugControl, IntegrationRegister};
use crate::state::{byte_len, FPR_COUNT, GPR_COUNT, GPR_COUNT_REDUCED, VREG_COUNT};
use crate::{Extensions, HartConfig, RawReg, RegisterGroup};

/// External index of the first floating-point register.
pub const FPR_INDEX_BASE: u32 = 33;
/// External index of CSR number 0.
pub const CSR_INDEX_BASE: u32 = 65;
/// External index of the first vector register.
pub const VREG_INDEX_BASE: u32 = 0x2000;

const GPR_NAMES: [&str; GPR_COUNT] = [
    "zero", "ra", "sp", "gp", "tp", "t0", "t1", "t2", "s0", "s1", "a0", "a1", "a2", "a3", "a4",
    "a5", "a6", "a7", "s2", "s3", "s4", "s5", "s6", "s7", "s8", "s9", "s10", "s11", "t3", "t4",
    "t5", "t6",
];

const FPR_NAMES: [&str; FPR_COUNT] = [
    "ft0", "ft1", "ft2", "ft3", "ft4", "ft5", "ft6", "ft7", "fs0", "fs1", "fa0", "fa1", "fa2",
    "fa3", "fa4", "fa5", "fa6", "fa7", "fs2", "fs3", "fs4", "fs5", "fs6", "fs7", "fs8", "fs9",
    "fs10", "fs11", "ft8", "ft9", "ft10", "ft11",
];

const VREG_NAMES: [&str; VREG_COUNT] = [
    "v0", "v1", "v2", "v3", "v4", "v5", "v6", "v7", "v8", "v9", "v10", "v11", "v12", "v13",
    "v14", "v15", "v16", "v17", "v18", "v19", "v20", "v21", "v22", "v23", "v24", "v25", "v26",
    "v27", "v28", "v29", "v30", "v31",
];

const RA: u8 = 1;
const SP: u8 = 2;

/// Shape of a register table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum TableMode {
    /// Every register the configuration implements.
    #[default]
    Full,
    /// Reduced table for consumers that cannot represent the full model.
    Restricted,
}

/// Access policy of a register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum RegisterAccess {
    /// Reads only; writes are rejected.
    ReadOnly,
    /// Reads and writes.
    ReadWrite,
}

/// Special purpose of a register, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum RegisterUsage {
    /// No special purpose.
    #[default]
    None,
    /// Holds return addresses.
    LinkRegister,
    /// Stack pointer.
    StackPointer,
    /// Program counter.
    ProgramCounter,
}

/// How a CSR descriptor reaches its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct CsrBinding {
    /// Static CSR attributes handed back to the CSR unit on access.
    pub attrs: CsrAttrs,
    /// Plain storage cell, when one exists.
    pub raw: Option<RawReg>,
    /// Reads use `raw` directly.
    pub raw_read: bool,
    /// Writes use `raw` directly.
    pub raw_write: bool,
}

impl CsrBinding {
    const fn from_details(details: &CsrDetails) -> Self {
        Self {
            attrs: details.attrs,
            raw: details.raw,
            raw_read: details.raw_read && details.raw.is_some(),
            raw_write: details.raw_write && details.raw.is_some(),
        }
    }
}

/// Accessor mediating a register's reads and writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum Accessor {
    /// Direct access to raw storage.
    Raw(RawReg),
    /// Program counter accessors (architectural-width read, mode-width write).
    ProgramCounter,
    /// CSR, through raw storage or the CSR unit.
    Csr(CsrBinding),
    /// Raw read with a side-effecting debug-control write.
    DebugControl {
        /// Storage read back by the debugger.
        raw: RawReg,
        /// Control bit driven by writes.
        control: DebugControl,
    },
}

/// One register exposed to debugger clients.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct RegisterDescriptor {
    /// Display name.
    pub name: &'static str,
    /// Optional human-readable description.
    pub description: Option<&'static str>,
    /// Presentation group.
    pub group: RegisterGroup,
    /// Width in bits (positive multiple of 8).
    pub bits: u32,
    /// Stable external (debugger protocol) index.
    pub index: u32,
    /// Access policy.
    pub access: RegisterAccess,
    /// Special purpose.
    pub usage: RegisterUsage,
    /// Accessor mediating reads and writes.
    pub accessor: Accessor,
    /// Excluded from save/restore of register state.
    pub no_save_restore: bool,
    /// Excluded from change tracing.
    pub no_trace_change: bool,
    /// Extension tag of a CSR; empty for other registers.
    pub extension: Extensions,
    #[cfg_attr(feature = "serde", serde(skip))]
    slot: usize,
}

impl RegisterDescriptor {
    const fn new(
        name: &'static str,
        group: RegisterGroup,
        bits: u32,
        index: u32,
        accessor: Accessor,
    ) -> Self {
        Self {
            name,
            description: None,
            group,
            bits,
            index,
            access: RegisterAccess::ReadWrite,
            usage: RegisterUsage::None,
            accessor,
            no_save_restore: false,
            no_trace_change: false,
            extension: Extensions::empty(),
            slot: 0,
        }
    }

    /// Position of this descriptor within its table.
    #[must_use]
    pub const fn slot(&self) -> usize {
        self.slot
    }

    /// Bytes transferred by one read or write.
    #[must_use]
    pub const fn bytes(&self) -> usize {
        byte_len(self.bits)
    }

    /// Raw storage backing the register, if any.
    #[must_use]
    pub const fn raw(&self) -> Option<RawReg> {
        match self.accessor {
            Accessor::Raw(raw) | Accessor::DebugControl { raw, .. } => Some(raw),
            Accessor::Csr(binding) => binding.raw,
            Accessor::ProgramCounter => None,
        }
    }

    /// Returns `true` when reads go through an accessor instead of raw storage.
    #[must_use]
    pub const fn has_read_callback(&self) -> bool {
        match self.accessor {
            Accessor::Raw(_) | Accessor::DebugControl { .. } => false,
            Accessor::ProgramCounter => true,
            Accessor::Csr(binding) => !binding.raw_read,
        }
    }

    /// Returns `true` when writes go through an accessor instead of raw storage.
    #[must_use]
    pub const fn has_write_callback(&self) -> bool {
        match self.accessor {
            Accessor::Raw(_) => false,
            Accessor::ProgramCounter | Accessor::DebugControl { .. } => true,
            Accessor::Csr(binding) => !binding.raw_write,
        }
    }

    /// Returns `true` for registers in a CSR group.
    #[must_use]
    pub const fn is_csr(&self) -> bool {
        self.group.is_csr()
    }

    /// Returns `true` when writes are rejected.
    #[must_use]
    pub const fn is_read_only(&self) -> bool {
        matches!(self.access, RegisterAccess::ReadOnly)
    }
}

/// Non-fatal conditions noticed while building a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum TableDiagnostic {
    /// FPR width forced to XLEN because the consumer cannot mix widths.
    #[error(
        "this processor implements {xlen}-bit GPRs but {flen}-bit FPRs, which the \
         restricted register view cannot represent - forcing apparent FPR width to \
         {xlen} bits (matching GPRs)"
    )]
    FprWidthCoerced {
        /// General register width.
        xlen: u32,
        /// Configured floating-point width.
        flen: u32,
    },
}

/// Register counts and widths for one table, resolved before population.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct TablePlan {
    /// Table shape.
    pub mode: TableMode,
    /// Integer register width.
    pub xlen: u32,
    /// Floating-point register width used by this table.
    pub flen: u32,
    /// Vector register width.
    pub vlen: u32,
    /// Number of integer registers.
    pub gpr_count: usize,
    /// Number of floating-point registers.
    pub fpr_count: usize,
    /// Number of vector registers.
    pub vreg_count: usize,
    /// Number of visible CSRs.
    pub csr_count: usize,
    /// Number of visible integration registers.
    pub integration_count: usize,
    /// Set when the FPR width was coerced to XLEN.
    pub coerced_flen: Option<u32>,
}

impl TablePlan {
    /// Resolves the plan for `config` in `mode`, draining `csrs` once to count.
    #[must_use]
    pub fn resolve(config: &HartConfig, csrs: &dyn CsrUnit, mode: TableMode) -> Self {
        let full = mode == TableMode::Full;
        let gpr_count = if !full && config.has(Extensions::I) {
            GPR_COUNT_REDUCED
        } else {
            GPR_COUNT
        };
        let fpr_count = if config.extensions.has_floating_point() {
            FPR_COUNT
        } else {
            0
        };
        let vreg_count = if full && config.has(Extensions::V) {
            VREG_COUNT
        } else {
            0
        };

        let configured_flen = config.effective_flen();
        let (flen, coerced_flen) = if !full && configured_flen != config.xlen {
            (config.xlen, Some(configured_flen))
        } else {
            (configured_flen, None)
        };

        Self {
            mode,
            xlen: config.xlen,
            flen,
            vlen: config.vlen,
            gpr_count,
            fpr_count,
            vreg_count,
            csr_count: CsrIter::new(csrs, config, mode).count(),
            integration_count: integration_registers(config, mode).count(),
            coerced_flen,
        }
    }

    /// Total number of descriptors the table holds.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.gpr_count + 1 + self.fpr_count + self.vreg_count + self.csr_count + self.integration_count
    }

    /// External index assigned to the program counter.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn pc_index(&self) -> u32 {
        self.gpr_count as u32
    }
}

/// Ordered register descriptors of one hart in one [`TableMode`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterTable {
    plan: TablePlan,
    entries: Vec<RegisterDescriptor>,
    diagnostics: Vec<TableDiagnostic>,
}

impl RegisterTable {
    /// Builds the table for `config` in `mode`.
    #[must_use]
    pub fn build(config: &HartConfig, csrs: &dyn CsrUnit, mode: TableMode) -> Self {
        let plan = TablePlan::resolve(config, csrs, mode);
        let mut diagnostics = Vec::new();
        if let Some(flen) = plan.coerced_flen {
            let diagnostic = TableDiagnostic::FprWidthCoerced {
                xlen: plan.xlen,
                flen,
            };
            tracing::warn!(target: "debug_regs::catalog", "{diagnostic}");
            diagnostics.push(diagnostic);
        }

        let mut entries = Vec::with_capacity(plan.total());
        push_gprs(&mut entries, &plan);
        push_pc(&mut entries, &plan);
        push_fprs(&mut entries, &plan);
        push_vregs(&mut entries, &plan);
        entries.extend(
            CsrIter::new(csrs, config, mode).map(|details| csr_descriptor(&details, &plan)),
        );
        entries.extend(
            integration_registers(config, mode).map(|entry| integration_descriptor(entry, &plan)),
        );
        for (slot, entry) in entries.iter_mut().enumerate() {
            entry.slot = slot;
        }
        debug_assert_eq!(entries.len(), plan.total());

        tracing::debug!(
            target: "debug_regs::catalog",
            ?mode,
            registers = entries.len(),
            csrs = plan.csr_count,
            "built register table"
        );

        Self {
            plan,
            entries,
            diagnostics,
        }
    }

    /// Table shape.
    #[must_use]
    pub const fn mode(&self) -> TableMode {
        self.plan.mode
    }

    /// Plan the table was built from.
    #[must_use]
    pub const fn plan(&self) -> &TablePlan {
        &self.plan
    }

    /// Descriptors in table order.
    #[must_use]
    pub fn entries(&self) -> &[RegisterDescriptor] {
        &self.entries
    }

    /// Number of descriptors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when the table holds no descriptors.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates descriptors in table order.
    pub fn iter(&self) -> std::slice::Iter<'_, RegisterDescriptor> {
        self.entries.iter()
    }

    /// Descriptor at `slot`.
    #[must_use]
    pub fn get(&self, slot: usize) -> Option<&RegisterDescriptor> {
        self.entries.get(slot)
    }

    /// Descriptor with display name `name`.
    #[must_use]
    pub fn by_name(&self, name: &str) -> Option<&RegisterDescriptor> {
        self.entries.iter().find(|reg| reg.name == name)
    }

    /// Descriptor with external index `index`.
    #[must_use]
    pub fn by_index(&self, index: u32) -> Option<&RegisterDescriptor> {
        self.entries.iter().find(|reg| reg.index == index)
    }

    /// Warnings raised while building this table.
    #[must_use]
    pub fn diagnostics(&self) -> &[TableDiagnostic] {
        &self.diagnostics
    }
}

impl<'a> IntoIterator for &'a RegisterTable {
    type Item = &'a RegisterDescriptor;
    type IntoIter = std::slice::Iter<'a, RegisterDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

fn push_gprs(entries: &mut Vec<RegisterDescriptor>, plan: &TablePlan) {
    for (n, name) in (0_u8..).zip(GPR_NAMES).take(plan.gpr_count) {
        let mut reg = RegisterDescriptor::new(
            name,
            RegisterGroup::Core,
            plan.xlen,
            u32::from(n),
            Accessor::Raw(RawReg::Gpr(n)),
        );
        if n == 0 {
            reg.access = RegisterAccess::ReadOnly;
        }
        reg.usage = match n {
            RA => RegisterUsage::LinkRegister,
            SP => RegisterUsage::StackPointer,
            _ => RegisterUsage::None,
        };
        entries.push(reg);
    }
}

fn push_pc(entries: &mut Vec<RegisterDescriptor>, plan: &TablePlan) {
    let mut reg = RegisterDescriptor::new(
        "pc",
        RegisterGroup::Core,
        plan.xlen,
        plan.pc_index(),
        Accessor::ProgramCounter,
    );
    reg.usage = RegisterUsage::ProgramCounter;
    entries.push(reg);
}

fn push_fprs(entries: &mut Vec<RegisterDescriptor>, plan: &TablePlan) {
    for (n, name) in (0_u8..).zip(FPR_NAMES).take(plan.fpr_count) {
        entries.push(RegisterDescriptor::new(
            name,
            RegisterGroup::FloatingPoint,
            plan.flen,
            FPR_INDEX_BASE + u32::from(n),
            Accessor::Raw(RawReg::Fpr(n)),
        ));
    }
}

fn push_vregs(entries: &mut Vec<RegisterDescriptor>, plan: &TablePlan) {
    for (n, name) in (0_u8..).zip(VREG_NAMES).take(plan.vreg_count) {
        entries.push(RegisterDescriptor::new(
            name,
            RegisterGroup::Vector,
            plan.vlen,
            VREG_INDEX_BASE + u32::from(n),
            Accessor::Raw(RawReg::Vreg(n)),
        ));
    }
}

fn csr_descriptor(details: &CsrDetails, plan: &TablePlan) -> RegisterDescriptor {
    let attrs = details.attrs;
    let mut reg = RegisterDescriptor::new(
        attrs.name,
        attrs.privilege.group(),
        plan.xlen,
        CSR_INDEX_BASE + u32::from(attrs.number),
        Accessor::Csr(CsrBinding::from_details(details)),
    );
    reg.description = Some(attrs.description);
    reg.access = details.access;
    reg.no_save_restore = attrs.no_save_restore;
    reg.no_trace_change = attrs.no_trace_change;
    reg.extension = details.extension;
    reg
}

fn integration_descriptor(entry: &IntegrationRegister, plan: &TablePlan) -> RegisterDescriptor {
    let accessor = match entry.write {
        Some(control) => Accessor::DebugControl {
            raw: entry.raw,
            control,
        },
        None => Accessor::Raw(entry.raw),
    };
    let mut reg = RegisterDescriptor::new(
        entry.name,
        RegisterGroup::Integration,
        entry.width(plan.xlen),
        entry.index(),
        accessor,
    );
    reg.description = Some(entry.description);
    reg.access = entry.access;
    reg.no_trace_change = entry.no_trace_change;
    reg
}
