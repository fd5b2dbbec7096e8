//! Accessor indirection: every debugger read and write of a register goes
//! through the descriptor's [`Accessor`].

use std::ops::{Deref, DerefMut};

use crate::catalog::CsrBinding;
use crate::csr::{read_xlen_value, write_xlen_value, CsrUnit};
use crate::integration::DebugControl;
use crate::state::byte_len;
use crate::{AccessError, Accessor, HartState, RegisterDescriptor};

/// Scope guard marking tool-initiated access to a hart's state.
///
/// Entering sets the artifact-access flag; dropping the guard restores the
/// value it had on entry, so nested scopes unwind correctly.
#[derive(Debug)]
pub struct ArtifactAccess<'a> {
    state: &'a mut HartState,
    prior: bool,
}

impl<'a> ArtifactAccess<'a> {
    /// Sets the artifact-access flag until the guard is dropped.
    #[must_use]
    pub const fn enter(state: &'a mut HartState) -> Self {
        let prior = state.replace_artifact_access(true);
        Self { state, prior }
    }
}

impl Deref for ArtifactAccess<'_> {
    type Target = HartState;

    fn deref(&self) -> &HartState {
        self.state
    }
}

impl DerefMut for ArtifactAccess<'_> {
    fn deref_mut(&mut self) -> &mut HartState {
        self.state
    }
}

impl Drop for ArtifactAccess<'_> {
    fn drop(&mut self) {
        self.state.replace_artifact_access(self.prior);
    }
}

/// Writes the program counter truncated to the architectural XLEN.
#[must_use]
pub fn read_pc(state: &HartState, out: &mut [u8]) -> bool {
    write_xlen_value(out, state.xlen(), state.pc())
}

/// Installs a program counter of the current execution-mode width.
#[must_use]
pub fn write_pc(state: &mut HartState, input: &[u8]) -> bool {
    match read_xlen_value(input, state.exec_xlen()) {
        Some(value) => {
            state.set_pc(value);
            true
        }
        None => false,
    }
}

/// Enters or leaves debug mode from the low bit of `input[0]`.
#[must_use]
pub fn write_debug_mode(state: &mut HartState, input: &[u8]) -> bool {
    match input.first() {
        Some(byte) => {
            state.set_debug_mode(byte & 1 != 0);
            true
        }
        None => false,
    }
}

/// Sets or clears the debug stall flag from the low bit of `input[0]`.
#[must_use]
pub fn write_debug_stall(state: &mut HartState, input: &[u8]) -> bool {
    match input.first() {
        Some(byte) => {
            state.set_debug_stall(byte & 1 != 0);
            true
        }
        None => false,
    }
}

/// Reads a CSR through its unit with the artifact-access flag raised.
#[must_use]
pub fn read_csr(
    unit: &mut dyn CsrUnit,
    binding: &CsrBinding,
    state: &mut HartState,
    out: &mut [u8],
) -> bool {
    let mut scope = ArtifactAccess::enter(state);
    unit.read(&binding.attrs, &mut scope, out)
}

/// Writes a CSR through its unit with the artifact-access flag raised.
#[must_use]
pub fn write_csr(
    unit: &mut dyn CsrUnit,
    binding: &CsrBinding,
    state: &mut HartState,
    input: &[u8],
) -> bool {
    let mut scope = ArtifactAccess::enter(state);
    unit.write(&binding.attrs, &mut scope, input)
}

fn accessor_result(register: &RegisterDescriptor, ok: bool, op: &str) -> Result<usize, AccessError> {
    if ok {
        Ok(register.bytes())
    } else {
        tracing::trace!(
            target: "debug_regs::access",
            register = register.name,
            op,
            "register accessor failed"
        );
        Err(AccessError::AccessorFailed {
            register: register.name,
        })
    }
}

/// Reads `register` into `out`, returning the number of bytes produced.
///
/// # Errors
///
/// Fails when `out` is shorter than the register, when raw storage is
/// missing, or when the read accessor reports failure.
pub fn read_register(
    state: &mut HartState,
    csrs: &mut dyn CsrUnit,
    register: &RegisterDescriptor,
    out: &mut [u8],
) -> Result<usize, AccessError> {
    let needed = byte_len(register.bits);
    if out.len() < needed {
        return Err(AccessError::BufferTooSmall {
            needed,
            got: out.len(),
        });
    }
    match register.accessor {
        Accessor::Raw(raw) | Accessor::DebugControl { raw, .. } => {
            state.read_raw(raw, register.bits, out)
        }
        Accessor::ProgramCounter => accessor_result(register, read_pc(state, out), "read"),
        Accessor::Csr(binding) => match binding.raw {
            Some(raw) if binding.raw_read => state.read_raw(raw, register.bits, out),
            _ => accessor_result(register, read_csr(csrs, &binding, state, out), "read"),
        },
    }
}

/// Writes `input` to `register`, returning the number of bytes consumed.
///
/// # Errors
///
/// Fails for read-only registers, when `input` is shorter than the register
/// (the execution-mode width for the PC), when raw storage is missing, or
/// when the write accessor reports failure.
pub fn write_register(
    state: &mut HartState,
    csrs: &mut dyn CsrUnit,
    register: &RegisterDescriptor,
    input: &[u8],
) -> Result<usize, AccessError> {
    if register.is_read_only() {
        return Err(AccessError::ReadOnly {
            register: register.name,
        });
    }
    // The PC accepts a value of the current execution-mode width.
    let needed = match register.accessor {
        Accessor::ProgramCounter => byte_len(state.exec_xlen()),
        _ => byte_len(register.bits),
    };
    if input.len() < needed {
        return Err(AccessError::BufferTooSmall {
            needed,
            got: input.len(),
        });
    }
    match register.accessor {
        Accessor::Raw(raw) => state.write_raw(raw, register.bits, input),
        Accessor::ProgramCounter => {
            accessor_result(register, write_pc(state, input), "write").map(|_| needed)
        }
        Accessor::DebugControl { control, .. } => {
            let ok = match control {
                DebugControl::DebugMode => write_debug_mode(state, input),
                DebugControl::DebugStall => write_debug_stall(state, input),
            };
            accessor_result(register, ok, "write")
        }
        Accessor::Csr(binding) => match binding.raw {
            Some(raw) if binding.raw_write => state.write_raw(raw, register.bits, input),
            _ => accessor_result(register, write_csr(csrs, &binding, state, input), "write"),
        },
    }
}
