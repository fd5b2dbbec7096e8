//! Immutable hart configuration consumed when the register tables are built.

use std::fmt;
use std::str::FromStr;

use bitflags::bitflags;

use crate::ConfigError;

/// Default vector register width used when none is configured.
pub const DEFAULT_VLEN: u32 = 128;

bitflags! {
    /// Enabled ISA extensions, laid out like the `misa` extension field.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
    pub struct Extensions: u32 {
        /// Atomic instructions (LR/SC and AMOs).
        const A = 1 << 0;
        /// Compressed instructions.
        const C = 1 << 2;
        /// Double-precision floating point.
        const D = 1 << 3;
        /// Reduced (16-register) base integer ISA.
        const E = 1 << 4;
        /// Single-precision floating point.
        const F = 1 << 5;
        /// Hypervisor extension.
        const H = 1 << 7;
        /// Base integer ISA.
        const I = 1 << 8;
        /// Integer multiply/divide.
        const M = 1 << 12;
        /// User-level interrupts.
        const N = 1 << 13;
        /// Supervisor mode.
        const S = 1 << 18;
        /// User mode.
        const U = 1 << 20;
        /// Vector extension.
        const V = 1 << 21;
        /// Non-standard (commercial) extensions present.
        const X = 1 << 23;
    }
}

/// Canonical ISA-string ordering used for display.
const CANONICAL_ORDER: [(char, Extensions); 13] = [
    ('i', Extensions::I),
    ('e', Extensions::E),
    ('m', Extensions::M),
    ('a', Extensions::A),
    ('f', Extensions::F),
    ('d', Extensions::D),
    ('c', Extensions::C),
    ('v', Extensions::V),
    ('n', Extensions::N),
    ('s', Extensions::S),
    ('u', Extensions::U),
    ('h', Extensions::H),
    ('x', Extensions::X),
];

impl Extensions {
    /// Parses a letter string such as `"imafdc"`. `g` expands to `imafd`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownExtension`] for a letter with no
    /// corresponding extension.
    pub fn from_letters(letters: &str) -> Result<Self, ConfigError> {
        let mut extensions = Self::empty();
        for letter in letters.chars() {
            let lower = letter.to_ascii_lowercase();
            if lower == 'g' {
                extensions |= Self::I | Self::M | Self::A | Self::F | Self::D;
                continue;
            }
            let (_, flag) = CANONICAL_ORDER
                .iter()
                .find(|(candidate, _)| *candidate == lower)
                .ok_or(ConfigError::UnknownExtension(letter))?;
            extensions |= *flag;
        }
        Ok(extensions)
    }

    /// Returns `true` when either floating-point extension is enabled.
    #[must_use]
    pub const fn has_floating_point(self) -> bool {
        self.intersects(Self::F.union(Self::D))
    }
}

impl fmt::Display for Extensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (letter, flag) in CANONICAL_ORDER {
            if self.contains(flag) {
                write!(f, "{letter}")?;
            }
        }
        Ok(())
    }
}

/// Level of debug-mode support implemented by the hart.
///
/// Levels are ordered: a register requiring `Halt` is visible on harts
/// configured with `Halt` or `Vector`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum DebugMode {
    /// Debug mode is not implemented.
    #[default]
    None,
    /// Debug mode entered through an interrupt.
    Interrupt,
    /// Debug mode halts the hart.
    Halt,
    /// Debug mode jumps to a debug vector.
    Vector,
}

impl DebugMode {
    /// Lowercase name accepted by the [`FromStr`] implementation.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Interrupt => "interrupt",
            Self::Halt => "halt",
            Self::Vector => "vector",
        }
    }
}

impl FromStr for DebugMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "interrupt" => Ok(Self::Interrupt),
            "halt" => Ok(Self::Halt),
            "vector" => Ok(Self::Vector),
            _ => Err(ConfigError::UnknownDebugMode(s.to_string())),
        }
    }
}

/// Top-level immutable configuration for a hart instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct HartConfig {
    /// Enabled ISA extensions.
    pub extensions: Extensions,
    /// Architectural general register width in bits.
    pub xlen: u32,
    /// Floating-point register width in bits; 0 when no FP unit exists.
    pub flen: u32,
    /// Vector register width in bits, consulted only with `V` enabled.
    pub vlen: u32,
    /// Implemented debug-mode level.
    pub debug_mode: DebugMode,
}

impl Default for HartConfig {
    fn default() -> Self {
        Self {
            extensions: Extensions::I
                | Extensions::M
                | Extensions::A
                | Extensions::F
                | Extensions::D
                | Extensions::C
                | Extensions::S
                | Extensions::U,
            xlen: 64,
            flen: 64,
            vlen: DEFAULT_VLEN,
            debug_mode: DebugMode::None,
        }
    }
}

impl HartConfig {
    /// Checks widths against the enabled extensions.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !matches!(self.xlen, 32 | 64) {
            return Err(ConfigError::UnsupportedXlen(self.xlen));
        }
        if !matches!(self.flen, 0 | 32 | 64) {
            return Err(ConfigError::UnsupportedFlen(self.flen));
        }
        let needed = if self.has(Extensions::D) {
            64
        } else if self.has(Extensions::F) {
            32
        } else {
            0
        };
        if self.flen < needed {
            return Err(ConfigError::FlenTooNarrow {
                flen: self.flen,
                needed,
            });
        }
        if self.has(Extensions::V)
            && (!self.vlen.is_power_of_two() || !(32..=65_536).contains(&self.vlen))
        {
            return Err(ConfigError::UnsupportedVlen(self.vlen));
        }
        Ok(())
    }

    /// Returns `true` when all of `extensions` are enabled.
    #[must_use]
    pub const fn has(&self, extensions: Extensions) -> bool {
        self.extensions.contains(extensions)
    }

    /// Floating-point width used for table entries; FLEN 0 inherits XLEN.
    #[must_use]
    pub const fn effective_flen(&self) -> u32 {
        if self.flen == 0 {
            self.xlen
        } else {
            self.flen
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{DebugMode, Extensions, HartConfig};
    use crate::ConfigError;

    #[test]
    fn letters_parse_case_insensitively_and_expand_g() {
        let parsed = Extensions::from_letters("GCv").expect("valid letters");
        assert_eq!(
            parsed,
            Extensions::I
                | Extensions::M
                | Extensions::A
                | Extensions::F
                | Extensions::D
                | Extensions::C
                | Extensions::V
        );
        assert_eq!(parsed.to_string(), "imafdcv");
    }

    #[test]
    fn unknown_letter_is_rejected() {
        assert_eq!(
            Extensions::from_letters("imq"),
            Err(ConfigError::UnknownExtension('q'))
        );
    }

    #[test]
    fn debug_modes_are_ordered() {
        assert!(DebugMode::None < DebugMode::Interrupt);
        assert!(DebugMode::Interrupt < DebugMode::Halt);
        assert!(DebugMode::Halt < DebugMode::Vector);
        assert_eq!("HALT".parse::<DebugMode>(), Ok(DebugMode::Halt));
        assert!("sometimes".parse::<DebugMode>().is_err());
    }

    #[test]
    fn default_config_is_valid_rv64gc() {
        let config = HartConfig::default();
        assert_eq!(config.validate(), Ok(()));
        assert_eq!(config.extensions.to_string(), "imafdcsu");
    }

    #[test]
    fn validation_rejects_inconsistent_widths() {
        let bad_xlen = HartConfig {
            xlen: 128,
            ..HartConfig::default()
        };
        assert_eq!(bad_xlen.validate(), Err(ConfigError::UnsupportedXlen(128)));

        let narrow = HartConfig {
            flen: 32,
            ..HartConfig::default()
        };
        assert_eq!(
            narrow.validate(),
            Err(ConfigError::FlenTooNarrow {
                flen: 32,
                needed: 64
            })
        );

        let vector = HartConfig {
            extensions: Extensions::I | Extensions::V,
            flen: 0,
            vlen: 96,
            ..HartConfig::default()
        };
        assert_eq!(vector.validate(), Err(ConfigError::UnsupportedVlen(96)));
    }

    #[test]
    fn zero_flen_inherits_xlen() {
        let config = HartConfig {
            extensions: Extensions::I,
            xlen: 32,
            flen: 0,
            ..HartConfig::default()
        };
        assert_eq!(config.effective_flen(), 32);
    }
}
