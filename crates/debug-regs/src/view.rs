//! Register groups and the visibility views filtered over a register table.

use crate::{RegisterDescriptor, RegisterTable};

/// Presentation group of a register. The set is fixed and ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum RegisterGroup {
    /// Integer registers and the program counter.
    Core,
    /// Floating-point registers.
    FloatingPoint,
    /// Vector registers.
    Vector,
    /// User-level CSRs.
    UserCsr,
    /// Supervisor-level CSRs.
    SupervisorCsr,
    /// Hypervisor-level CSRs, presented under the reserved privilege slot.
    ReservedCsr,
    /// Machine-level CSRs.
    MachineCsr,
    /// Simulator integration support registers.
    Integration,
}

impl RegisterGroup {
    /// All groups in presentation order.
    pub const ALL: [Self; 8] = [
        Self::Core,
        Self::FloatingPoint,
        Self::Vector,
        Self::UserCsr,
        Self::SupervisorCsr,
        Self::ReservedCsr,
        Self::MachineCsr,
        Self::Integration,
    ];

    /// Display name reported to debuggers.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Core => "Core",
            Self::FloatingPoint => "Floating_point",
            Self::Vector => "Vector",
            Self::UserCsr => "User_Control_and_Status",
            Self::SupervisorCsr => "Supervisor_Control_and_Status",
            Self::ReservedCsr => "Reserved",
            Self::MachineCsr => "Machine_Control_and_Status",
            Self::Integration => "Integration_support",
        }
    }

    /// Position of this group in [`Self::ALL`].
    #[must_use]
    pub const fn position(self) -> usize {
        self as usize
    }

    /// Returns `true` for the four control/status register groups.
    #[must_use]
    pub const fn is_csr(self) -> bool {
        matches!(
            self,
            Self::UserCsr | Self::SupervisorCsr | Self::ReservedCsr | Self::MachineCsr
        )
    }
}

/// Visibility partition requested by a register consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum RegisterView {
    /// Every register.
    #[default]
    All,
    /// Every register outside the CSR groups.
    NonCsr,
    /// Only registers in the CSR groups.
    CsrOnly,
}

/// Returns `true` when `register` belongs to `view`.
#[must_use]
pub const fn is_visible(register: &RegisterDescriptor, view: RegisterView) -> bool {
    match view {
        RegisterView::All => true,
        RegisterView::NonCsr => !register.group.is_csr(),
        RegisterView::CsrOnly => register.group.is_csr(),
    }
}

/// Next descriptor of `table` after `prev` that is visible in `view`.
///
/// `prev = None` starts from the head of the table.
#[must_use]
pub fn next_visible<'a>(
    table: &'a RegisterTable,
    prev: Option<&RegisterDescriptor>,
    view: RegisterView,
) -> Option<&'a RegisterDescriptor> {
    let start = prev.map_or(0, |reg| reg.slot() + 1);
    table
        .entries()
        .get(start..)?
        .iter()
        .find(|reg| is_visible(reg, view))
}
