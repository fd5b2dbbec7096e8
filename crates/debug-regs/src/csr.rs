//! Control/status register enumeration contract and a reference CSR unit.
//!
//! The register catalog never interprets CSR values. It asks a [`CsrUnit`]
//! which CSRs are visible for a configuration and table mode, and routes
//! accessor-backed reads and writes back to the same unit.

use crate::fields::{FieldAlias, STANDARD_FIELD_ALIASES};
use crate::state::byte_len;
use crate::{Extensions, HartConfig, HartState, RawReg, RegisterAccess, RegisterGroup, TableMode};

/// Privilege level encoded in bits `[9:8]` of a CSR number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum Privilege {
    /// Unprivileged (user) CSRs.
    User,
    /// Supervisor CSRs.
    Supervisor,
    /// Hypervisor CSRs.
    Hypervisor,
    /// Machine CSRs.
    Machine,
}

impl Privilege {
    /// Decodes the privilege field of a 12-bit CSR number.
    #[must_use]
    pub const fn from_csr_number(number: u16) -> Self {
        match (number >> 8) & 0b11 {
            0 => Self::User,
            1 => Self::Supervisor,
            2 => Self::Hypervisor,
            _ => Self::Machine,
        }
    }

    /// Register group presenting CSRs of this privilege.
    #[must_use]
    pub const fn group(self) -> RegisterGroup {
        match self {
            Self::User => RegisterGroup::UserCsr,
            Self::Supervisor => RegisterGroup::SupervisorCsr,
            Self::Hypervisor => RegisterGroup::ReservedCsr,
            Self::Machine => RegisterGroup::MachineCsr,
        }
    }
}

/// Static attributes of one CSR.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct CsrAttrs {
    /// Register name, e.g. `mstatus`.
    pub name: &'static str,
    /// Human-readable description.
    pub description: &'static str,
    /// 12-bit CSR number.
    pub number: u16,
    /// Privilege level owning the CSR.
    pub privilege: Privilege,
    /// Excluded from save/restore of register state.
    pub no_save_restore: bool,
    /// Excluded from change tracing.
    pub no_trace_change: bool,
}

impl CsrAttrs {
    /// Creates attributes whose privilege is decoded from `number`.
    #[must_use]
    pub const fn new(name: &'static str, description: &'static str, number: u16) -> Self {
        Self {
            name,
            description,
            number,
            privilege: Privilege::from_csr_number(number),
            no_save_restore: false,
            no_trace_change: false,
        }
    }

    /// Access policy encoded in bits `[11:10]` of the CSR number.
    #[must_use]
    pub const fn access(&self) -> RegisterAccess {
        if (self.number >> 10) & 0b11 == 0b11 {
            RegisterAccess::ReadOnly
        } else {
            RegisterAccess::ReadWrite
        }
    }
}

/// One visible CSR as reported by [`CsrUnit::next_csr`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CsrDetails {
    /// Static attributes.
    pub attrs: CsrAttrs,
    /// Access policy presented to the debugger.
    pub access: RegisterAccess,
    /// Plain storage cell, when one exists.
    pub raw: Option<RawReg>,
    /// Reads go straight to `raw` instead of [`CsrUnit::read`].
    pub raw_read: bool,
    /// Writes go straight to `raw` instead of [`CsrUnit::write`].
    pub raw_write: bool,
    /// Extension tag controlling conditional visibility.
    pub extension: Extensions,
}

/// Opaque, forward-only position within a [`CsrUnit`]'s enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CsrCursor(usize);

impl CsrCursor {
    /// Cursor positioned before the first CSR.
    #[must_use]
    pub const fn new() -> Self {
        Self(0)
    }

    /// Current position, meaningful only to the unit that advanced it.
    #[must_use]
    pub const fn position(self) -> usize {
        self.0
    }

    /// Moves the cursor to `position`.
    pub const fn seek(&mut self, position: usize) {
        self.0 = position;
    }
}

/// Control/status register subsystem consumed by the register catalog.
pub trait CsrUnit {
    /// Returns the next CSR visible for `config` in `mode`, advancing `cursor`;
    /// `None` once exhausted.
    fn next_csr(
        &self,
        config: &HartConfig,
        cursor: &mut CsrCursor,
        mode: TableMode,
    ) -> Option<CsrDetails>;

    /// Reads the CSR value into `out` as XLEN little-endian bytes.
    ///
    /// Returns `false` when the read cannot be performed.
    fn read(&mut self, attrs: &CsrAttrs, state: &mut HartState, out: &mut [u8]) -> bool;

    /// Writes XLEN little-endian bytes from `input` to the CSR.
    ///
    /// Returns `false` when the write cannot be performed.
    fn write(&mut self, attrs: &CsrAttrs, state: &mut HartState, input: &[u8]) -> bool;

    /// Storage fields that live inside (or are hidden behind) CSRs.
    fn field_aliases(&self) -> &[FieldAlias] {
        &STANDARD_FIELD_ALIASES
    }
}

/// Iterator draining a [`CsrUnit`] from a fresh cursor.
pub struct CsrIter<'a> {
    unit: &'a dyn CsrUnit,
    config: &'a HartConfig,
    mode: TableMode,
    cursor: CsrCursor,
}

impl<'a> CsrIter<'a> {
    /// Starts a new traversal.
    #[must_use]
    pub fn new(unit: &'a dyn CsrUnit, config: &'a HartConfig, mode: TableMode) -> Self {
        Self {
            unit,
            config,
            mode,
            cursor: CsrCursor::new(),
        }
    }
}

impl Iterator for CsrIter<'_> {
    type Item = CsrDetails;

    fn next(&mut self) -> Option<Self::Item> {
        self.unit.next_csr(self.config, &mut self.cursor, self.mode)
    }
}

/// Decodes an XLEN-wide little-endian value.
#[must_use]
pub fn read_xlen_value(input: &[u8], xlen: u32) -> Option<u64> {
    let len = byte_len(xlen);
    let src = input.get(..len)?;
    let mut bytes = [0_u8; 8];
    bytes.get_mut(..len)?.copy_from_slice(src);
    Some(u64::from_le_bytes(bytes))
}

/// Encodes `value` as XLEN little-endian bytes; `false` if `out` is short.
#[must_use]
pub fn write_xlen_value(out: &mut [u8], xlen: u32, value: u64) -> bool {
    let len = byte_len(xlen);
    let bytes = value.to_le_bytes();
    match (out.get_mut(..len), bytes.get(..len)) {
        (Some(dst), Some(src)) => {
            dst.copy_from_slice(src);
            true
        }
        _ => false,
    }
}

const FCSR: u16 = 0x003;
const VXSAT: u16 = 0x009;
const VXRM: u16 = 0x00A;
const FFLAGS_MASK: u64 = 0x1F;
const FRM_SHIFT: u64 = 5;
const FRM_MASK: u64 = 0x7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Backing {
    Storage,
    Fflags,
    Frm,
    Fcsr,
    Misa,
    Vlenb,
    Vcsr,
}

#[derive(Debug, Clone, Copy)]
struct StandardCsr {
    attrs: CsrAttrs,
    requires: Extensions,
    backing: Backing,
    debug_only: bool,
    rv32_only: bool,
}

impl StandardCsr {
    const fn new(number: u16, name: &'static str, description: &'static str) -> Self {
        Self {
            attrs: CsrAttrs::new(name, description, number),
            requires: Extensions::empty(),
            backing: Backing::Storage,
            debug_only: false,
            rv32_only: false,
        }
    }

    const fn requires(mut self, extensions: Extensions) -> Self {
        self.requires = extensions;
        self
    }

    const fn backed_by(mut self, backing: Backing) -> Self {
        self.backing = backing;
        self
    }

    const fn counter(mut self) -> Self {
        self.attrs.no_trace_change = true;
        self
    }

    const fn volatile(mut self) -> Self {
        self.attrs.no_save_restore = true;
        self.attrs.no_trace_change = true;
        self
    }

    const fn debug_only(mut self) -> Self {
        self.debug_only = true;
        self
    }

    const fn rv32_only(mut self) -> Self {
        self.rv32_only = true;
        self
    }

    fn is_visible(&self, config: &HartConfig, mode: TableMode) -> bool {
        if !config.has(self.requires) {
            return false;
        }
        if self.debug_only && config.debug_mode == crate::DebugMode::None {
            return false;
        }
        if self.rv32_only && config.xlen != 32 {
            return false;
        }
        // The compatibility view has no vector registers to pair these with.
        !(mode == TableMode::Restricted && self.requires.contains(Extensions::V))
    }

    fn details(&self) -> CsrDetails {
        let raw = (self.backing == Backing::Storage).then_some(RawReg::Csr(self.attrs.number));
        CsrDetails {
            attrs: self.attrs,
            access: self.attrs.access(),
            raw,
            raw_read: raw.is_some(),
            raw_write: raw.is_some(),
            extension: self.requires,
        }
    }
}

const F: Extensions = Extensions::F;
const V: Extensions = Extensions::V;
const S: Extensions = Extensions::S;
const H: Extensions = Extensions::H;
const U: Extensions = Extensions::U;
const N: Extensions = Extensions::N;

static STANDARD_CSRS: [StandardCsr; 58] = [
    StandardCsr::new(0x000, "ustatus", "User Status").requires(N),
    StandardCsr::new(0x001, "fflags", "Floating-Point Accrued Exceptions")
        .requires(F)
        .backed_by(Backing::Fflags),
    StandardCsr::new(0x002, "frm", "Floating-Point Dynamic Rounding Mode")
        .requires(F)
        .backed_by(Backing::Frm),
    StandardCsr::new(0x003, "fcsr", "Floating-Point Control and Status")
        .requires(F)
        .backed_by(Backing::Fcsr),
    StandardCsr::new(0x008, "vstart", "Vector Start Index").requires(V),
    StandardCsr::new(0x009, "vxsat", "Fixed-Point Saturate Flag").requires(V),
    StandardCsr::new(0x00A, "vxrm", "Fixed-Point Rounding Mode").requires(V),
    StandardCsr::new(0x00F, "vcsr", "Vector Control and Status")
        .requires(V)
        .backed_by(Backing::Vcsr),
    StandardCsr::new(0xC00, "cycle", "Cycle Counter").counter(),
    StandardCsr::new(0xC01, "time", "Timer").volatile(),
    StandardCsr::new(0xC02, "instret", "Instructions Retired").counter(),
    StandardCsr::new(0xC20, "vl", "Vector Length").requires(V),
    StandardCsr::new(0xC21, "vtype", "Vector Data Type").requires(V),
    StandardCsr::new(0xC22, "vlenb", "Vector Register Length in Bytes")
        .requires(V)
        .backed_by(Backing::Vlenb),
    StandardCsr::new(0xC80, "cycleh", "Cycle Counter High")
        .counter()
        .rv32_only(),
    StandardCsr::new(0xC81, "timeh", "Timer High").volatile().rv32_only(),
    StandardCsr::new(0xC82, "instreth", "Instructions Retired High")
        .counter()
        .rv32_only(),
    StandardCsr::new(0x100, "sstatus", "Supervisor Status").requires(S),
    StandardCsr::new(0x104, "sie", "Supervisor Interrupt Enable").requires(S),
    StandardCsr::new(0x105, "stvec", "Supervisor Trap-Vector Base-Address").requires(S),
    StandardCsr::new(0x106, "scounteren", "Supervisor Counter Enable").requires(S),
    StandardCsr::new(0x140, "sscratch", "Supervisor Scratch").requires(S),
    StandardCsr::new(0x141, "sepc", "Supervisor Exception Program Counter").requires(S),
    StandardCsr::new(0x142, "scause", "Supervisor Cause").requires(S),
    StandardCsr::new(0x143, "stval", "Supervisor Trap Value").requires(S),
    StandardCsr::new(0x144, "sip", "Supervisor Interrupt Pending").requires(S),
    StandardCsr::new(0x180, "satp", "Supervisor Address Translation and Protection")
        .requires(S),
    StandardCsr::new(0x600, "hstatus", "Hypervisor Status").requires(H),
    StandardCsr::new(0x602, "hedeleg", "Hypervisor Exception Delegation").requires(H),
    StandardCsr::new(0x603, "hideleg", "Hypervisor Interrupt Delegation").requires(H),
    StandardCsr::new(0x604, "hie", "Hypervisor Interrupt Enable").requires(H),
    StandardCsr::new(0x643, "htval", "Hypervisor Trap Value").requires(H),
    StandardCsr::new(0x644, "hip", "Hypervisor Interrupt Pending").requires(H),
    StandardCsr::new(0x680, "hgatp", "Hypervisor Guest Address Translation").requires(H),
    StandardCsr::new(0x300, "mstatus", "Machine Status"),
    StandardCsr::new(0x301, "misa", "ISA and Extensions").backed_by(Backing::Misa),
    StandardCsr::new(0x302, "medeleg", "Machine Exception Delegation").requires(S),
    StandardCsr::new(0x303, "mideleg", "Machine Interrupt Delegation").requires(S),
    StandardCsr::new(0x304, "mie", "Machine Interrupt Enable"),
    StandardCsr::new(0x305, "mtvec", "Machine Trap-Vector Base-Address"),
    StandardCsr::new(0x306, "mcounteren", "Machine Counter Enable").requires(U),
    StandardCsr::new(0x310, "mstatush", "Machine Status High").rv32_only(),
    StandardCsr::new(0x340, "mscratch", "Machine Scratch"),
    StandardCsr::new(0x341, "mepc", "Machine Exception Program Counter"),
    StandardCsr::new(0x342, "mcause", "Machine Cause"),
    StandardCsr::new(0x343, "mtval", "Machine Trap Value"),
    StandardCsr::new(0x344, "mip", "Machine Interrupt Pending"),
    StandardCsr::new(0x7B0, "dcsr", "Debug Control and Status").debug_only(),
    StandardCsr::new(0x7B1, "dpc", "Debug PC").debug_only(),
    StandardCsr::new(0x7B2, "dscratch0", "Debug Scratch 0").debug_only(),
    StandardCsr::new(0x7B3, "dscratch1", "Debug Scratch 1").debug_only(),
    StandardCsr::new(0xB00, "mcycle", "Machine Cycle Counter").counter(),
    StandardCsr::new(0xB02, "minstret", "Machine Instructions Retired").counter(),
    StandardCsr::new(0xB80, "mcycleh", "Machine Cycle Counter High")
        .counter()
        .rv32_only(),
    StandardCsr::new(0xB82, "minstreth", "Machine Instructions Retired High")
        .counter()
        .rv32_only(),
    StandardCsr::new(0xF11, "mvendorid", "Vendor ID"),
    StandardCsr::new(0xF12, "marchid", "Architecture ID"),
    StandardCsr::new(0xF14, "mhartid", "Hardware Thread ID"),
];

/// Reference [`CsrUnit`] covering the standard user, supervisor, hypervisor,
/// machine, debug and vector CSRs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StandardCsrs {
    misa: u64,
    vlenb: u64,
}

impl StandardCsrs {
    /// Creates the unit for a hart configured by `config`.
    #[must_use]
    pub fn for_config(config: &HartConfig) -> Self {
        let mxl: u64 = if config.xlen == 32 { 1 } else { 2 };
        let vlenb = if config.has(Extensions::V) {
            u64::from(config.vlen / 8)
        } else {
            0
        };
        Self {
            misa: mxl.checked_shl(config.xlen.saturating_sub(2)).unwrap_or(0)
                | u64::from(config.extensions.bits()),
            vlenb,
        }
    }

    fn lookup(number: u16) -> Option<&'static StandardCsr> {
        STANDARD_CSRS.iter().find(|csr| csr.attrs.number == number)
    }

    fn value(&self, backing: Backing, number: u16, state: &HartState) -> u64 {
        let fcsr = state.csr(FCSR);
        match backing {
            Backing::Storage => state.csr(number),
            Backing::Fflags => fcsr & FFLAGS_MASK,
            Backing::Frm => (fcsr >> FRM_SHIFT) & FRM_MASK,
            Backing::Fcsr => fcsr & 0xFF,
            Backing::Misa => self.misa,
            Backing::Vlenb => self.vlenb,
            Backing::Vcsr => ((state.csr(VXRM) & 0b11) << 1) | (state.csr(VXSAT) & 1),
        }
    }
}

impl CsrUnit for StandardCsrs {
    fn next_csr(
        &self,
        config: &HartConfig,
        cursor: &mut CsrCursor,
        mode: TableMode,
    ) -> Option<CsrDetails> {
        let start = cursor.position();
        let (offset, csr) = STANDARD_CSRS
            .iter()
            .enumerate()
            .skip(start)
            .find(|(_, csr)| csr.is_visible(config, mode))?;
        cursor.seek(offset + 1);
        Some(csr.details())
    }

    fn read(&mut self, attrs: &CsrAttrs, state: &mut HartState, out: &mut [u8]) -> bool {
        let Some(csr) = Self::lookup(attrs.number) else {
            return false;
        };
        let value = self.value(csr.backing, attrs.number, state);
        write_xlen_value(out, state.xlen(), value)
    }

    fn write(&mut self, attrs: &CsrAttrs, state: &mut HartState, input: &[u8]) -> bool {
        let Some(csr) = Self::lookup(attrs.number) else {
            return false;
        };
        let Some(value) = read_xlen_value(input, state.xlen()) else {
            return false;
        };
        let fcsr = state.csr(FCSR);
        match csr.backing {
            Backing::Storage => state.set_csr(attrs.number, value),
            Backing::Fflags => state.set_csr(FCSR, (fcsr & !FFLAGS_MASK) | (value & FFLAGS_MASK)),
            Backing::Frm => state.set_csr(
                FCSR,
                (fcsr & !(FRM_MASK << FRM_SHIFT)) | ((value & FRM_MASK) << FRM_SHIFT),
            ),
            Backing::Fcsr => state.set_csr(FCSR, value & 0xFF),
            // WARL: the extension set is fixed by configuration.
            Backing::Misa => {}
            Backing::Vlenb => return false,
            Backing::Vcsr => {
                state.set_csr(VXSAT, value & 1);
                state.set_csr(VXRM, (value >> 1) & 0b11);
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::{CsrAttrs, CsrIter, CsrUnit, Privilege, StandardCsrs, STANDARD_CSRS};
    use crate::{
        DebugMode, Extensions, HartConfig, HartState, RawReg, RegisterAccess, RegisterGroup,
        TableMode,
    };

    fn names(config: &HartConfig, mode: TableMode) -> Vec<&'static str> {
        let unit = StandardCsrs::for_config(config);
        CsrIter::new(&unit, config, mode)
            .map(|details| details.attrs.name)
            .collect()
    }

    fn attrs(name: &str) -> CsrAttrs {
        STANDARD_CSRS
            .iter()
            .find(|csr| csr.attrs.name == name)
            .map(|csr| csr.attrs)
            .expect("csr present in the standard table")
    }

    #[test]
    fn privilege_and_access_decode_from_number() {
        assert_eq!(Privilege::from_csr_number(0x001), Privilege::User);
        assert_eq!(Privilege::from_csr_number(0x100), Privilege::Supervisor);
        assert_eq!(Privilege::from_csr_number(0x600), Privilege::Hypervisor);
        assert_eq!(Privilege::from_csr_number(0x7B0), Privilege::Machine);
        assert_eq!(Privilege::Hypervisor.group(), RegisterGroup::ReservedCsr);
        assert_eq!(attrs("cycle").access(), RegisterAccess::ReadOnly);
        assert_eq!(attrs("mstatus").access(), RegisterAccess::ReadWrite);
    }

    #[test]
    fn standard_table_numbers_are_unique() {
        for (i, a) in STANDARD_CSRS.iter().enumerate() {
            for b in &STANDARD_CSRS[i + 1..] {
                assert_ne!(a.attrs.number, b.attrs.number, "{}", a.attrs.name);
            }
        }
    }

    #[test]
    fn visibility_follows_extensions_debug_mode_and_xlen() {
        let rv64 = HartConfig::default();
        let listed = names(&rv64, TableMode::Full);
        assert!(listed.contains(&"fflags"));
        assert!(listed.contains(&"satp"));
        assert!(!listed.contains(&"hstatus"));
        assert!(!listed.contains(&"dcsr"));
        assert!(!listed.contains(&"cycleh"));
        assert!(!listed.contains(&"vl"));

        let rv32 = HartConfig {
            extensions: Extensions::I | Extensions::V,
            xlen: 32,
            flen: 0,
            debug_mode: DebugMode::Halt,
            ..HartConfig::default()
        };
        let listed = names(&rv32, TableMode::Full);
        assert!(listed.contains(&"cycleh"));
        assert!(listed.contains(&"dcsr"));
        assert!(listed.contains(&"vlenb"));
        assert!(!listed.contains(&"fflags"));

        let restricted = names(&rv32, TableMode::Restricted);
        assert!(!restricted.contains(&"vlenb"));
        assert!(restricted.contains(&"mstatus"));
    }

    #[test]
    fn plain_csrs_report_raw_storage() {
        let config = HartConfig::default();
        let unit = StandardCsrs::for_config(&config);
        let mstatus = CsrIter::new(&unit, &config, TableMode::Full)
            .find(|details| details.attrs.name == "mstatus")
            .expect("mstatus visible");
        assert_eq!(mstatus.raw, Some(RawReg::Csr(0x300)));
        assert!(mstatus.raw_read && mstatus.raw_write);

        let fcsr = CsrIter::new(&unit, &config, TableMode::Full)
            .find(|details| details.attrs.name == "fcsr")
            .expect("fcsr visible");
        assert_eq!(fcsr.raw, None);
        assert!(!fcsr.raw_read && !fcsr.raw_write);
    }

    #[test]
    fn floating_point_views_share_fcsr_storage() {
        let config = HartConfig::default();
        let mut unit = StandardCsrs::for_config(&config);
        let mut state = HartState::new(&config);

        assert!(unit.write(&attrs("fcsr"), &mut state, &0xE5_u64.to_le_bytes()));

        let mut out = [0_u8; 8];
        assert!(unit.read(&attrs("fflags"), &mut state, &mut out));
        assert_eq!(u64::from_le_bytes(out), 0x05);
        assert!(unit.read(&attrs("frm"), &mut state, &mut out));
        assert_eq!(u64::from_le_bytes(out), 0x07);

        assert!(unit.write(&attrs("frm"), &mut state, &1_u64.to_le_bytes()));
        assert!(unit.read(&attrs("fcsr"), &mut state, &mut out));
        assert_eq!(u64::from_le_bytes(out), 0x25);
    }

    #[test]
    fn misa_reports_mxl_and_extensions() {
        let config = HartConfig {
            extensions: Extensions::I | Extensions::M,
            xlen: 32,
            flen: 0,
            ..HartConfig::default()
        };
        let mut unit = StandardCsrs::for_config(&config);
        let mut state = HartState::new(&config);
        let mut out = [0_u8; 4];

        assert!(unit.read(&attrs("misa"), &mut state, &mut out));
        assert_eq!(u32::from_le_bytes(out), 0x4000_1100);

        assert!(unit.write(&attrs("misa"), &mut state, &[0; 4]));
        assert!(unit.read(&attrs("misa"), &mut state, &mut out));
        assert_eq!(u32::from_le_bytes(out), 0x4000_1100);
    }

    #[test]
    fn reads_fail_for_short_buffers_and_unknown_csrs() {
        let config = HartConfig::default();
        let mut unit = StandardCsrs::for_config(&config);
        let mut state = HartState::new(&config);
        let mut short = [0_u8; 4];
        assert!(!unit.read(&attrs("mstatus"), &mut state, &mut short));

        let custom = CsrAttrs::new("custom", "Vendor CSR", 0x7C0);
        let mut out = [0_u8; 8];
        assert!(!unit.read(&custom, &mut state, &mut out));
    }
}
