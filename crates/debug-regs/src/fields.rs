//! Sub-field remapping: internal storage fields that live inside (or are
//! hidden behind) architectural registers.
//!
//! Alias declarations are data owned by the CSR subsystem, see
//! [`crate::CsrUnit::field_aliases`]. Resolving them against a register table
//! never adds or removes descriptors.

use crate::state::StorageField;
use crate::RegisterTable;

/// Where an internal storage field is presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum AliasTarget {
    /// Inside the named register.
    Register(&'static str),
    /// Not presented to debuggers.
    Ignored,
}

/// Declaration mapping one storage field to its presentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct FieldAlias {
    /// Storage field being described.
    pub field: StorageField,
    /// Presentation target.
    pub target: AliasTarget,
}

impl FieldAlias {
    const fn inside(field: StorageField, register: &'static str) -> Self {
        Self {
            field,
            target: AliasTarget::Register(register),
        }
    }

    const fn ignored(field: StorageField) -> Self {
        Self {
            field,
            target: AliasTarget::Ignored,
        }
    }
}

/// Alias declarations of the standard CSR set.
pub static STANDARD_FIELD_ALIASES: [FieldAlias; 6] = [
    FieldAlias::inside(StorageField::FpFlagsShadow, "fflags"),
    FieldAlias::inside(StorageField::SaturationShadow, "vxsat"),
    FieldAlias::ignored(StorageField::PmKey),
    FieldAlias::ignored(StorageField::VectorFirstFault),
    FieldAlias::ignored(StorageField::VectorBase),
    FieldAlias::ignored(StorageField::JumpBase),
];

/// Resolved presentation of one storage field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct FieldBinding {
    /// Storage field.
    pub field: StorageField,
    /// Storage width in bits.
    pub bits: u32,
    /// External index of the containing register; `None` when ignored.
    pub register_index: Option<u32>,
    /// Name of the containing register; `None` when ignored.
    pub register_name: Option<&'static str>,
}

impl FieldBinding {
    /// Returns `true` when the field is not presented to debuggers.
    #[must_use]
    pub const fn is_ignored(&self) -> bool {
        self.register_index.is_none()
    }
}

/// Resolved field aliases of one hart.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FieldMap {
    bindings: Vec<FieldBinding>,
}

impl FieldMap {
    /// Resolves `aliases` against `table`.
    ///
    /// A declaration naming a register absent from `table` resolves to
    /// ignored. Later declarations for the same field replace earlier ones.
    #[must_use]
    pub fn resolve(table: &RegisterTable, aliases: &[FieldAlias]) -> Self {
        let mut bindings: Vec<FieldBinding> = Vec::with_capacity(aliases.len());
        for alias in aliases {
            let register = match alias.target {
                AliasTarget::Register(name) => table.by_name(name),
                AliasTarget::Ignored => None,
            };
            let binding = FieldBinding {
                field: alias.field,
                bits: alias.field.bits(),
                register_index: register.map(|reg| reg.index),
                register_name: register.map(|reg| reg.name),
            };
            match bindings.iter_mut().find(|b| b.field == alias.field) {
                Some(existing) => *existing = binding,
                None => bindings.push(binding),
            }
        }

        tracing::debug!(
            target: "debug_regs::fields",
            declared = aliases.len(),
            presented = bindings.iter().filter(|b| !b.is_ignored()).count(),
            "resolved storage field aliases"
        );
        Self { bindings }
    }

    /// Binding of `field`, if it was declared.
    #[must_use]
    pub fn binding(&self, field: StorageField) -> Option<&FieldBinding> {
        self.bindings.iter().find(|b| b.field == field)
    }

    /// All bindings in declaration order.
    #[must_use]
    pub fn bindings(&self) -> &[FieldBinding] {
        &self.bindings
    }

    /// Returns `true` when `field` is undeclared or not presented.
    #[must_use]
    pub fn is_ignored(&self, field: StorageField) -> bool {
        self.binding(field).is_none_or(FieldBinding::is_ignored)
    }
}

#[cfg(test)]
mod tests {
    use super::{AliasTarget, FieldAlias, FieldMap, STANDARD_FIELD_ALIASES};
    use crate::csr::StandardCsrs;
    use crate::state::StorageField;
    use crate::{Extensions, HartConfig, RegisterTable, TableMode};

    fn table(config: &HartConfig) -> RegisterTable {
        RegisterTable::build(config, &StandardCsrs::for_config(config), TableMode::Full)
    }

    #[test]
    fn standard_aliases_cover_every_storage_field() {
        for field in StorageField::ALL {
            assert!(
                STANDARD_FIELD_ALIASES.iter().any(|a| a.field == field),
                "{}",
                field.name()
            );
        }
    }

    #[test]
    fn flag_shadow_lands_inside_fflags() {
        let table = table(&HartConfig::default());
        let map = FieldMap::resolve(&table, &STANDARD_FIELD_ALIASES);
        let binding = map
            .binding(StorageField::FpFlagsShadow)
            .expect("declared field");
        assert_eq!(binding.register_name, Some("fflags"));
        assert_eq!(binding.register_index, Some(65 + 0x001));
        assert_eq!(binding.bits, 8);
        assert!(map.is_ignored(StorageField::PmKey));
    }

    #[test]
    fn absent_target_register_resolves_to_ignored() {
        let table = table(&HartConfig::default());
        let map = FieldMap::resolve(&table, &STANDARD_FIELD_ALIASES);
        assert!(map.is_ignored(StorageField::SaturationShadow));

        let vector = HartConfig {
            extensions: Extensions::I | Extensions::V,
            flen: 0,
            ..HartConfig::default()
        };
        let map = FieldMap::resolve(&self::table(&vector), &STANDARD_FIELD_ALIASES);
        assert!(!map.is_ignored(StorageField::SaturationShadow));
        assert!(map.is_ignored(StorageField::FpFlagsShadow));
    }

    #[test]
    fn resolution_never_changes_the_table() {
        let table = table(&HartConfig::default());
        let before = table.clone();
        let _ = FieldMap::resolve(&table, &STANDARD_FIELD_ALIASES);
        assert_eq!(table, before);
    }

    #[test]
    fn later_declarations_replace_earlier_ones() {
        let table = table(&HartConfig::default());
        let aliases = [
            FieldAlias {
                field: StorageField::JumpBase,
                target: AliasTarget::Ignored,
            },
            FieldAlias {
                field: StorageField::JumpBase,
                target: AliasTarget::Register("mtvec"),
            },
        ];
        let map = FieldMap::resolve(&table, &aliases);
        assert_eq!(map.bindings().len(), 1);
        assert_eq!(
            map.binding(StorageField::JumpBase)
                .and_then(|b| b.register_name),
            Some("mtvec")
        );
        assert!(map.is_ignored(StorageField::VectorBase));
    }
}
