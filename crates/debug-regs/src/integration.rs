//! Integration support registers: simulator state exposed next to the
//! architectural registers (lock address, debug-mode flags, feature usage).

use std::iter;
use std::ptr;

use crate::{DebugMode, Extensions, HartConfig, RawReg, RegisterAccess, TableMode};

/// Base of the external index band used by integration registers.
pub const INTEGRATION_INDEX_BASE: u32 = 0x1100;

/// Debug-control bit written through an accessor with side effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum DebugControl {
    /// Enters or leaves debug mode.
    DebugMode,
    /// Sets or clears the stalled-in-debug-mode flag.
    DebugStall,
}

/// One entry of the fixed integration register catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IntegrationRegister {
    /// Register name.
    pub name: &'static str,
    /// Human-readable description.
    pub description: &'static str,
    /// Extensions that must all be enabled for the register to exist.
    pub requires: Extensions,
    /// Offset within the integration index band.
    pub sub_index: u32,
    /// Width in bits; 0 inherits XLEN.
    pub bits: u32,
    /// Backing storage.
    pub raw: RawReg,
    /// Write accessor used instead of a raw store, if any.
    pub write: Option<DebugControl>,
    /// Access policy.
    pub access: RegisterAccess,
    /// Excluded from change tracing.
    pub no_trace_change: bool,
    /// Minimum debug-mode level for the register to be visible.
    pub min_debug_mode: DebugMode,
}

impl IntegrationRegister {
    /// Width in bits for a hart of the given XLEN.
    #[must_use]
    pub const fn width(&self, xlen: u32) -> u32 {
        if self.bits == 0 {
            xlen
        } else {
            self.bits
        }
    }

    /// Stable external index.
    #[must_use]
    pub const fn index(&self) -> u32 {
        INTEGRATION_INDEX_BASE + self.sub_index
    }

    /// Returns `true` when this register exists on a hart configured by `config`.
    #[must_use]
    pub fn is_applicable(&self, config: &HartConfig) -> bool {
        config.has(self.requires) && config.debug_mode >= self.min_debug_mode
    }
}

/// The fixed integration register catalog, in presentation order.
pub static INTEGRATION_REGISTERS: [IntegrationRegister; 4] = [
    IntegrationRegister {
        name: "LRSCAddress",
        description: "LR/SC active lock address",
        requires: Extensions::A,
        sub_index: 0,
        bits: 0,
        raw: RawReg::LrScAddress,
        write: None,
        access: RegisterAccess::ReadWrite,
        no_trace_change: false,
        min_debug_mode: DebugMode::None,
    },
    IntegrationRegister {
        name: "DM",
        description: "Debug mode active",
        requires: Extensions::empty(),
        sub_index: 1,
        bits: 8,
        raw: RawReg::DebugMode,
        write: Some(DebugControl::DebugMode),
        access: RegisterAccess::ReadWrite,
        no_trace_change: false,
        min_debug_mode: DebugMode::Vector,
    },
    IntegrationRegister {
        name: "DMStall",
        description: "Debug mode stalled",
        requires: Extensions::empty(),
        sub_index: 2,
        bits: 8,
        raw: RawReg::DebugStall,
        write: Some(DebugControl::DebugStall),
        access: RegisterAccess::ReadWrite,
        no_trace_change: false,
        min_debug_mode: DebugMode::Halt,
    },
    IntegrationRegister {
        name: "commercial",
        description: "Commercial feature in use",
        requires: Extensions::empty(),
        sub_index: 3,
        bits: 8,
        raw: RawReg::Commercial,
        write: None,
        access: RegisterAccess::ReadOnly,
        no_trace_change: false,
        min_debug_mode: DebugMode::None,
    },
];

/// Returns the integration register following `prev` that applies to
/// `config`; `prev = None` restarts from the beginning.
///
/// The restricted table never carries integration registers.
#[must_use]
pub fn next_integration_register(
    config: &HartConfig,
    prev: Option<&'static IntegrationRegister>,
    mode: TableMode,
) -> Option<&'static IntegrationRegister> {
    if mode == TableMode::Restricted {
        return None;
    }
    let start = match prev {
        None => 0,
        Some(prev) => {
            INTEGRATION_REGISTERS
                .iter()
                .position(|entry| ptr::eq(entry, prev))?
                + 1
        }
    };
    INTEGRATION_REGISTERS
        .get(start..)?
        .iter()
        .find(|entry| entry.is_applicable(config))
}

/// Iterates the integration registers applicable to `config` in `mode`.
pub fn integration_registers(
    config: &HartConfig,
    mode: TableMode,
) -> impl Iterator<Item = &'static IntegrationRegister> + '_ {
    iter::successors(next_integration_register(config, None, mode), move |prev| {
        next_integration_register(config, Some(*prev), mode)
    })
}

#[cfg(test)]
mod tests {
    use super::{integration_registers, next_integration_register, INTEGRATION_REGISTERS};
    use crate::{DebugMode, Extensions, HartConfig, TableMode};

    fn visible(config: &HartConfig, mode: TableMode) -> Vec<&'static str> {
        integration_registers(config, mode)
            .map(|entry| entry.name)
            .collect()
    }

    #[test]
    fn sub_indices_match_catalog_positions() {
        for (position, entry) in INTEGRATION_REGISTERS.iter().enumerate() {
            assert_eq!(entry.sub_index as usize, position);
        }
    }

    #[test]
    fn lock_address_requires_atomics() {
        let with_a = HartConfig::default();
        assert_eq!(visible(&with_a, TableMode::Full), ["LRSCAddress", "commercial"]);

        let without_a = HartConfig {
            extensions: Extensions::I | Extensions::D | Extensions::F,
            ..HartConfig::default()
        };
        assert_eq!(visible(&without_a, TableMode::Full), ["commercial"]);
    }

    #[test]
    fn debug_registers_follow_debug_mode_level() {
        let halt = HartConfig {
            debug_mode: DebugMode::Halt,
            ..HartConfig::default()
        };
        assert_eq!(
            visible(&halt, TableMode::Full),
            ["LRSCAddress", "DMStall", "commercial"]
        );

        let vector = HartConfig {
            debug_mode: DebugMode::Vector,
            ..HartConfig::default()
        };
        assert_eq!(
            visible(&vector, TableMode::Full),
            ["LRSCAddress", "DM", "DMStall", "commercial"]
        );

        let interrupt = HartConfig {
            debug_mode: DebugMode::Interrupt,
            ..HartConfig::default()
        };
        assert_eq!(
            visible(&interrupt, TableMode::Full),
            ["LRSCAddress", "commercial"]
        );
    }

    #[test]
    fn restricted_mode_yields_nothing() {
        let config = HartConfig {
            debug_mode: DebugMode::Vector,
            ..HartConfig::default()
        };
        assert!(next_integration_register(&config, None, TableMode::Restricted).is_none());
    }

    #[test]
    fn traversal_restarts_from_none() {
        let config = HartConfig::default();
        let first = next_integration_register(&config, None, TableMode::Full);
        let second = next_integration_register(&config, first, TableMode::Full);
        assert_eq!(first.map(|e| e.name), Some("LRSCAddress"));
        assert_eq!(second.map(|e| e.name), Some("commercial"));
        assert!(next_integration_register(&config, second, TableMode::Full).is_none());
        assert_eq!(
            next_integration_register(&config, None, TableMode::Full).map(|e| e.name),
            Some("LRSCAddress")
        );
    }

    #[test]
    fn zero_width_inherits_xlen() {
        assert_eq!(INTEGRATION_REGISTERS[0].width(32), 32);
        assert_eq!(INTEGRATION_REGISTERS[0].width(64), 64);
        assert_eq!(INTEGRATION_REGISTERS[1].width(64), 8);
        assert_eq!(INTEGRATION_REGISTERS[3].index(), 0x1103);
    }
}
