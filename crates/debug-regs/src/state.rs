//! Raw register storage owned by a hart and the handles that address it.

use std::collections::BTreeMap;

use crate::{AccessError, Extensions, HartConfig};

/// Number of integer registers (`x0..x31`).
pub const GPR_COUNT: usize = 32;
/// Number of integer registers in the reduced register view.
pub const GPR_COUNT_REDUCED: usize = 16;
/// Number of floating-point registers (`f0..f31`).
pub const FPR_COUNT: usize = 32;
/// Number of vector registers (`v0..v31`).
pub const VREG_COUNT: usize = 32;

/// Opaque handle to a register's backing storage on a hart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum RawReg {
    /// Integer register `x<n>`.
    Gpr(u8),
    /// Floating-point register `f<n>`.
    Fpr(u8),
    /// Vector register `v<n>`.
    Vreg(u8),
    /// Plain storage cell of the CSR with this number.
    Csr(u16),
    /// Active LR/SC reservation address.
    LrScAddress,
    /// Debug-mode active flag.
    DebugMode,
    /// Stalled-in-debug-mode flag.
    DebugStall,
    /// Commercial-feature-in-use flag.
    Commercial,
    /// Internal storage field with no register of its own.
    Field(StorageField),
}

/// Internal storage fields that can alias bits of another register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum StorageField {
    /// Shadow copy of the accrued floating-point exception flags.
    FpFlagsShadow,
    /// Shadow copy of the vector fixed-point saturation flag.
    SaturationShadow,
    /// Physical memory protection lookup key.
    PmKey,
    /// Vector fault-only-first element index.
    VectorFirstFault,
    /// Base address of the vector register file.
    VectorBase,
    /// Base address for jump target translation.
    JumpBase,
}

impl StorageField {
    /// All storage fields in declaration order.
    pub const ALL: [Self; 6] = [
        Self::FpFlagsShadow,
        Self::SaturationShadow,
        Self::PmKey,
        Self::VectorFirstFault,
        Self::VectorBase,
        Self::JumpBase,
    ];

    /// Width of the field's storage in bits.
    #[must_use]
    pub const fn bits(self) -> u32 {
        match self {
            Self::FpFlagsShadow | Self::SaturationShadow => 8,
            Self::PmKey | Self::VectorFirstFault => 32,
            Self::VectorBase | Self::JumpBase => 64,
        }
    }

    /// Storage field name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::FpFlagsShadow => "fpFlagsShadow",
            Self::SaturationShadow => "saturationShadow",
            Self::PmKey => "pmKey",
            Self::VectorFirstFault => "vFirstFault",
            Self::VectorBase => "vBase",
            Self::JumpBase => "jumpBase",
        }
    }

    const fn mask(self) -> u64 {
        match self.bits() {
            64 => u64::MAX,
            bits => (1 << bits) - 1,
        }
    }
}

/// Architectural and integration storage of one hart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HartState {
    xlen: u32,
    exec_xlen: u32,
    pc: u64,
    gpr: [u64; GPR_COUNT],
    fpr: [u64; FPR_COUNT],
    vreg: Vec<Box<[u8]>>,
    csr: BTreeMap<u16, u64>,
    lr_sc_address: u64,
    debug_mode: bool,
    debug_stall: bool,
    commercial: bool,
    artifact_access: bool,
    fields: [u64; StorageField::ALL.len()],
}

impl HartState {
    /// Creates zeroed storage shaped by `config`.
    #[must_use]
    pub fn new(config: &HartConfig) -> Self {
        let vreg_bytes = if config.has(Extensions::V) {
            config.vlen as usize / 8
        } else {
            0
        };
        Self {
            xlen: config.xlen,
            exec_xlen: config.xlen,
            pc: 0,
            gpr: [0; GPR_COUNT],
            fpr: [0; FPR_COUNT],
            vreg: (0..VREG_COUNT)
                .map(|_| vec![0; vreg_bytes].into_boxed_slice())
                .filter(|reg| !reg.is_empty())
                .collect(),
            csr: BTreeMap::new(),
            lr_sc_address: 0,
            debug_mode: false,
            debug_stall: false,
            commercial: false,
            artifact_access: false,
            fields: [0; StorageField::ALL.len()],
        }
    }

    /// Architectural XLEN.
    #[must_use]
    pub const fn xlen(&self) -> u32 {
        self.xlen
    }

    /// XLEN of the current execution mode (may be narrower than [`Self::xlen`]).
    #[must_use]
    pub const fn exec_xlen(&self) -> u32 {
        self.exec_xlen
    }

    /// Switches the execution-mode XLEN, clamped to the architectural width.
    pub fn set_exec_xlen(&mut self, bits: u32) {
        self.exec_xlen = bits.min(self.xlen);
    }

    /// Reads the program counter.
    #[must_use]
    pub const fn pc(&self) -> u64 {
        self.pc
    }

    /// Writes the program counter.
    pub const fn set_pc(&mut self, value: u64) {
        self.pc = value;
    }

    /// Reads integer register `x<index>`; `x0` always reads zero.
    #[must_use]
    pub fn gpr(&self, index: usize) -> u64 {
        self.gpr.get(index).copied().unwrap_or(0)
    }

    /// Writes integer register `x<index>`. Writes to `x0` are discarded.
    pub fn set_gpr(&mut self, index: usize, value: u64) {
        if index != 0 {
            if let Some(slot) = self.gpr.get_mut(index) {
                *slot = value;
            }
        }
    }

    /// Reads floating-point register `f<index>`.
    #[must_use]
    pub fn fpr(&self, index: usize) -> u64 {
        self.fpr.get(index).copied().unwrap_or(0)
    }

    /// Writes floating-point register `f<index>`.
    pub fn set_fpr(&mut self, index: usize, value: u64) {
        if let Some(slot) = self.fpr.get_mut(index) {
            *slot = value;
        }
    }

    /// Raw bytes of vector register `v<index>`, if the hart has vectors.
    #[must_use]
    pub fn vreg(&self, index: usize) -> Option<&[u8]> {
        self.vreg.get(index).map(AsRef::as_ref)
    }

    /// Reads the plain storage cell of CSR `number` (zero when never written).
    #[must_use]
    pub fn csr(&self, number: u16) -> u64 {
        self.csr.get(&number).copied().unwrap_or(0)
    }

    /// Writes the plain storage cell of CSR `number`.
    pub fn set_csr(&mut self, number: u16, value: u64) {
        self.csr.insert(number, value);
    }

    /// Active LR/SC reservation address.
    #[must_use]
    pub const fn lr_sc_address(&self) -> u64 {
        self.lr_sc_address
    }

    /// Sets the active LR/SC reservation address.
    pub const fn set_lr_sc_address(&mut self, value: u64) {
        self.lr_sc_address = value;
    }

    /// Returns `true` while the hart is in debug mode.
    #[must_use]
    pub const fn debug_mode(&self) -> bool {
        self.debug_mode
    }

    /// Enters (`true`) or leaves (`false`) debug mode.
    pub const fn set_debug_mode(&mut self, active: bool) {
        self.debug_mode = active;
    }

    /// Returns `true` while the hart is stalled in debug mode.
    #[must_use]
    pub const fn debug_stall(&self) -> bool {
        self.debug_stall
    }

    /// Sets or clears the stalled-in-debug-mode flag.
    pub const fn set_debug_stall(&mut self, stalled: bool) {
        self.debug_stall = stalled;
    }

    /// Returns `true` once a commercial feature has been used.
    #[must_use]
    pub const fn commercial(&self) -> bool {
        self.commercial
    }

    /// Records that a commercial feature is in use.
    pub const fn set_commercial(&mut self, in_use: bool) {
        self.commercial = in_use;
    }

    /// Returns `true` while an artifact (tool-initiated) access is in progress.
    #[must_use]
    pub const fn artifact_access(&self) -> bool {
        self.artifact_access
    }

    pub(crate) const fn replace_artifact_access(&mut self, active: bool) -> bool {
        let prior = self.artifact_access;
        self.artifact_access = active;
        prior
    }

    /// Reads an internal storage field.
    #[must_use]
    pub const fn field(&self, field: StorageField) -> u64 {
        self.fields[field as usize]
    }

    /// Writes an internal storage field, truncated to its width.
    pub const fn set_field(&mut self, field: StorageField, value: u64) {
        self.fields[field as usize] = value & field.mask();
    }

    fn scalar(&self, raw: RawReg) -> Option<u64> {
        match raw {
            RawReg::Gpr(n) => (usize::from(n) < GPR_COUNT).then(|| self.gpr(usize::from(n))),
            RawReg::Fpr(n) => (usize::from(n) < FPR_COUNT).then(|| self.fpr(usize::from(n))),
            RawReg::Csr(number) => Some(self.csr(number)),
            RawReg::LrScAddress => Some(self.lr_sc_address),
            RawReg::DebugMode => Some(u64::from(self.debug_mode)),
            RawReg::DebugStall => Some(u64::from(self.debug_stall)),
            RawReg::Commercial => Some(u64::from(self.commercial)),
            RawReg::Field(field) => Some(self.field(field)),
            RawReg::Vreg(_) => None,
        }
    }

    fn set_scalar(&mut self, raw: RawReg, value: u64) -> Result<(), AccessError> {
        match raw {
            RawReg::Gpr(n) if usize::from(n) < GPR_COUNT => self.set_gpr(usize::from(n), value),
            RawReg::Fpr(n) if usize::from(n) < FPR_COUNT => self.set_fpr(usize::from(n), value),
            RawReg::Csr(number) => self.set_csr(number, value),
            RawReg::LrScAddress => self.lr_sc_address = value,
            RawReg::DebugMode => self.debug_mode = value & 1 != 0,
            RawReg::DebugStall => self.debug_stall = value & 1 != 0,
            RawReg::Commercial => self.commercial = value & 1 != 0,
            RawReg::Field(field) => self.set_field(field, value),
            RawReg::Gpr(_) | RawReg::Fpr(_) | RawReg::Vreg(_) => {
                return Err(AccessError::NoStorage(raw));
            }
        }
        Ok(())
    }

    /// Copies the low `bits` of `raw`'s storage into `out` (little-endian).
    ///
    /// # Errors
    ///
    /// Fails when `out` is too short, the handle has no storage on this
    /// hart, or `bits` exceeds the storage width.
    pub fn read_raw(&self, raw: RawReg, bits: u32, out: &mut [u8]) -> Result<usize, AccessError> {
        let len = byte_len(bits);
        let got = out.len();
        let dst = out
            .get_mut(..len)
            .ok_or(AccessError::BufferTooSmall { needed: len, got })?;

        if let RawReg::Vreg(n) = raw {
            let src = self
                .vreg(usize::from(n))
                .ok_or(AccessError::NoStorage(raw))?;
            let src = src
                .get(..len)
                .ok_or(AccessError::WidthMismatch { raw, bits })?;
            dst.copy_from_slice(src);
            return Ok(len);
        }

        let value = self.scalar(raw).ok_or(AccessError::NoStorage(raw))?;
        let src = value.to_le_bytes();
        let src = src
            .get(..len)
            .ok_or(AccessError::WidthMismatch { raw, bits })?;
        dst.copy_from_slice(src);
        Ok(len)
    }

    /// Stores the low `bits` of `input` (little-endian) into `raw`'s storage,
    /// zero-extending to the storage width.
    ///
    /// # Errors
    ///
    /// Fails under the same conditions as [`Self::read_raw`].
    pub fn write_raw(&mut self, raw: RawReg, bits: u32, input: &[u8]) -> Result<usize, AccessError> {
        let len = byte_len(bits);
        let src = input.get(..len).ok_or(AccessError::BufferTooSmall {
            needed: len,
            got: input.len(),
        })?;

        if let RawReg::Vreg(n) = raw {
            let dst = self
                .vreg
                .get_mut(usize::from(n))
                .ok_or(AccessError::NoStorage(raw))?;
            let dst = dst
                .get_mut(..len)
                .ok_or(AccessError::WidthMismatch { raw, bits })?;
            dst.copy_from_slice(src);
            return Ok(len);
        }

        if len > 8 {
            return Err(AccessError::WidthMismatch { raw, bits });
        }
        let mut bytes = [0_u8; 8];
        bytes[..len].copy_from_slice(src);
        self.set_scalar(raw, u64::from_le_bytes(bytes))?;
        Ok(len)
    }
}

/// Number of whole bytes transferred for a `bits`-wide access.
#[must_use]
pub const fn byte_len(bits: u32) -> usize {
    bits.div_ceil(8) as usize
}

#[cfg(test)]
mod tests {
    use super::{HartState, RawReg, StorageField};
    use crate::{AccessError, Extensions, HartConfig};

    fn rv32_vector() -> HartConfig {
        HartConfig {
            extensions: Extensions::I | Extensions::V,
            xlen: 32,
            flen: 0,
            vlen: 64,
            ..HartConfig::default()
        }
    }

    #[test]
    fn x0_discards_writes_through_every_path() {
        let mut state = HartState::new(&HartConfig::default());
        state.set_gpr(0, 0xDEAD);
        state
            .write_raw(RawReg::Gpr(0), 64, &0xBEEF_u64.to_le_bytes())
            .expect("raw write to x0 is accepted");
        assert_eq!(state.gpr(0), 0);
    }

    #[test]
    fn raw_reads_truncate_to_the_requested_width() {
        let mut state = HartState::new(&HartConfig::default());
        state.set_gpr(5, 0x1122_3344_5566_7788);

        let mut out = [0_u8; 8];
        let len = state
            .read_raw(RawReg::Gpr(5), 32, &mut out)
            .expect("32-bit read fits");
        assert_eq!(len, 4);
        assert_eq!(&out[..4], &[0x88, 0x77, 0x66, 0x55]);
    }

    #[test]
    fn raw_access_rejects_short_buffers_and_oversized_widths() {
        let mut state = HartState::new(&HartConfig::default());
        let mut short = [0_u8; 2];
        assert_eq!(
            state.read_raw(RawReg::Fpr(1), 64, &mut short),
            Err(AccessError::BufferTooSmall { needed: 8, got: 2 })
        );
        assert_eq!(
            state.write_raw(RawReg::LrScAddress, 128, &[0; 16]),
            Err(AccessError::WidthMismatch {
                raw: RawReg::LrScAddress,
                bits: 128
            })
        );
    }

    #[test]
    fn vector_storage_exists_only_with_the_extension() {
        let mut state = HartState::new(&rv32_vector());
        let pattern = [1_u8, 2, 3, 4, 5, 6, 7, 8];
        state
            .write_raw(RawReg::Vreg(31), 64, &pattern)
            .expect("vector write");
        assert_eq!(state.vreg(31), Some(&pattern[..]));

        let scalar_only = HartState::new(&HartConfig::default());
        let mut out = [0_u8; 8];
        assert_eq!(
            scalar_only.read_raw(RawReg::Vreg(0), 64, &mut out),
            Err(AccessError::NoStorage(RawReg::Vreg(0)))
        );
    }

    #[test]
    fn storage_fields_truncate_to_their_width() {
        let mut state = HartState::new(&HartConfig::default());
        state.set_field(StorageField::FpFlagsShadow, 0x1FF);
        assert_eq!(state.field(StorageField::FpFlagsShadow), 0xFF);
        state.set_field(StorageField::JumpBase, u64::MAX);
        assert_eq!(state.field(StorageField::JumpBase), u64::MAX);
    }

    #[test]
    fn exec_xlen_never_exceeds_architectural_width() {
        let mut state = HartState::new(&rv32_vector());
        state.set_exec_xlen(64);
        assert_eq!(state.exec_xlen(), 32);
    }

    #[test]
    fn flag_storage_keeps_only_the_low_bit() {
        let mut state = HartState::new(&HartConfig::default());
        state
            .write_raw(RawReg::DebugStall, 8, &[0xFF])
            .expect("flag write");
        assert!(state.debug_stall());
        state
            .write_raw(RawReg::DebugStall, 8, &[0xFE])
            .expect("flag write");
        assert!(!state.debug_stall());
    }
}
