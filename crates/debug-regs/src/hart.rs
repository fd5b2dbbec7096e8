//! Processor instances: a hart (or a container of harts) together with its
//! lazily-built register tables and field map.

use std::cell::OnceCell;
use std::fmt;

use crate::access;
use crate::csr::{CsrUnit, StandardCsrs};
use crate::state::RawReg;
use crate::view::next_visible;
use crate::{
    ConfigError, FieldBinding, FieldMap, HartConfig, HartState, RegisterDescriptor, RegisterError,
    RegisterGroup, RegisterTable, RegisterView, TableMode,
};

/// Position of an instance in the processor hierarchy.
#[derive(Debug, Default)]
pub enum Topology {
    /// A leaf hart that owns registers.
    #[default]
    Single,
    /// A symmetric multiprocessing container of identical harts.
    Smp(Vec<Hart>),
    /// A cluster container of possibly heterogeneous members.
    Cluster(Vec<Hart>),
}

impl Topology {
    /// Child instances of a container; empty for a leaf hart.
    #[must_use]
    pub fn children(&self) -> &[Hart] {
        match self {
            Self::Single => &[],
            Self::Smp(children) | Self::Cluster(children) => children,
        }
    }
}

#[derive(Default)]
struct TableCache {
    full: OnceCell<RegisterTable>,
    restricted: OnceCell<RegisterTable>,
}

impl TableCache {
    const fn slot(&self, mode: TableMode) -> &OnceCell<RegisterTable> {
        match mode {
            TableMode::Full => &self.full,
            TableMode::Restricted => &self.restricted,
        }
    }
}

/// A configured hart exposing its registers to a debugger.
pub struct Hart {
    config: HartConfig,
    state: HartState,
    csrs: Box<dyn CsrUnit>,
    topology: Topology,
    tables: TableCache,
    fields: OnceCell<FieldMap>,
}

impl fmt::Debug for Hart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hart")
            .field("config", &self.config)
            .field("topology", &self.topology)
            .field("full_table_built", &self.tables_built(TableMode::Full))
            .field("restricted_table_built", &self.tables_built(TableMode::Restricted))
            .finish_non_exhaustive()
    }
}

impl Hart {
    /// Creates a leaf hart backed by the standard CSR set.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when `config` fails validation.
    pub fn new(config: HartConfig) -> Result<Self, ConfigError> {
        let csrs = StandardCsrs::for_config(&config);
        Self::with_csr_unit(config, Box::new(csrs))
    }

    /// Creates a leaf hart backed by a caller-supplied CSR unit.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when `config` fails validation.
    pub fn with_csr_unit(config: HartConfig, csrs: Box<dyn CsrUnit>) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            state: HartState::new(&config),
            config,
            csrs,
            topology: Topology::Single,
            tables: TableCache::default(),
            fields: OnceCell::new(),
        })
    }

    /// Turns this instance into a container holding `topology`'s children.
    #[must_use]
    pub fn with_topology(mut self, topology: Topology) -> Self {
        self.topology = topology;
        self
    }

    /// Configuration the instance was built from.
    #[must_use]
    pub const fn config(&self) -> &HartConfig {
        &self.config
    }

    /// Architectural storage.
    #[must_use]
    pub const fn state(&self) -> &HartState {
        &self.state
    }

    /// Mutable architectural storage, as driven by the instruction engine.
    pub const fn state_mut(&mut self) -> &mut HartState {
        &mut self.state
    }

    /// Position in the processor hierarchy.
    #[must_use]
    pub const fn topology(&self) -> &Topology {
        &self.topology
    }

    /// Returns `true` for SMP and cluster containers.
    #[must_use]
    pub const fn has_child(&self) -> bool {
        !matches!(self.topology, Topology::Single)
    }

    /// Returns `true` for cluster containers.
    #[must_use]
    pub const fn is_cluster(&self) -> bool {
        matches!(self.topology, Topology::Cluster(_))
    }

    /// Instance kind reported to debuggers.
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self.topology {
            Topology::Cluster(_) => "Cluster",
            Topology::Smp(_) => "SMP",
            Topology::Single => "Hart",
        }
    }

    /// Register table for `mode`, built on first use.
    ///
    /// # Errors
    ///
    /// Containers own no registers and return [`RegisterError::Container`].
    pub fn register_table(&self, mode: TableMode) -> Result<&RegisterTable, RegisterError> {
        if self.has_child() {
            return Err(RegisterError::Container);
        }
        Ok(self
            .tables
            .slot(mode)
            .get_or_init(|| RegisterTable::build(&self.config, self.csrs.as_ref(), mode)))
    }

    /// Returns `true` once the table for `mode` has been built and not freed.
    #[must_use]
    pub fn tables_built(&self, mode: TableMode) -> bool {
        self.tables.slot(mode).get().is_some()
    }

    /// Next register of the full table after `prev` that is visible in `view`.
    #[must_use]
    pub fn next_register(
        &self,
        prev: Option<&RegisterDescriptor>,
        view: RegisterView,
    ) -> Option<&RegisterDescriptor> {
        self.next_register_in(TableMode::Full, prev, view)
    }

    /// Next register of the `mode` table after `prev` that is visible in `view`.
    ///
    /// Yields `None` at the end of the table and always for containers.
    #[must_use]
    pub fn next_register_in(
        &self,
        mode: TableMode,
        prev: Option<&RegisterDescriptor>,
        view: RegisterView,
    ) -> Option<&RegisterDescriptor> {
        let table = self.register_table(mode).ok()?;
        next_visible(table, prev, view)
    }

    /// Iterates the registers of the `mode` table visible in `view`.
    pub fn registers(
        &self,
        mode: TableMode,
        view: RegisterView,
    ) -> impl Iterator<Item = &RegisterDescriptor> + '_ {
        let mut prev = None;
        std::iter::from_fn(move || {
            let next = self.next_register_in(mode, prev, view)?;
            prev = Some(next);
            Some(next)
        })
    }

    /// Register of the full table named `name`.
    #[must_use]
    pub fn register_by_name(&self, name: &str) -> Option<&RegisterDescriptor> {
        self.register_table(TableMode::Full).ok()?.by_name(name)
    }

    /// Register of the full table with external index `index`.
    #[must_use]
    pub fn register_by_index(&self, index: u32) -> Option<&RegisterDescriptor> {
        self.register_table(TableMode::Full).ok()?.by_index(index)
    }

    /// Returns `true` when the full table holds a register in `group`.
    #[must_use]
    pub fn is_group_supported(&self, group: RegisterGroup) -> bool {
        self.registers(TableMode::Full, RegisterView::All)
            .any(|reg| reg.group == group)
    }

    /// Next supported group after `prev` in catalog order; `None` restarts.
    #[must_use]
    pub fn next_group(&self, prev: Option<RegisterGroup>) -> Option<RegisterGroup> {
        let start = prev.map_or(0, |group| group.position() + 1);
        RegisterGroup::ALL
            .get(start..)?
            .iter()
            .copied()
            .find(|group| self.is_group_supported(*group))
    }

    /// Reads `register` into `out`, returning the bytes produced.
    ///
    /// # Errors
    ///
    /// See [`access::read_register`].
    pub fn read_register(
        &mut self,
        register: &RegisterDescriptor,
        out: &mut [u8],
    ) -> Result<usize, crate::AccessError> {
        access::read_register(&mut self.state, self.csrs.as_mut(), register, out)
    }

    /// Writes `input` to `register`, returning the bytes consumed.
    ///
    /// # Errors
    ///
    /// See [`access::write_register`].
    pub fn write_register(
        &mut self,
        register: &RegisterDescriptor,
        input: &[u8],
    ) -> Result<usize, crate::AccessError> {
        access::write_register(&mut self.state, self.csrs.as_mut(), register, input)
    }

    fn lookup_owned(&self, name: &str) -> Result<RegisterDescriptor, RegisterError> {
        self.register_table(TableMode::Full)?
            .by_name(name)
            .cloned()
            .ok_or_else(|| RegisterError::UnknownRegister(name.to_owned()))
    }

    /// Reads the full-table register named `name`.
    ///
    /// # Errors
    ///
    /// Fails for containers, unknown names and failed accesses.
    pub fn read_by_name(&mut self, name: &str, out: &mut [u8]) -> Result<usize, RegisterError> {
        let register = self.lookup_owned(name)?;
        Ok(self.read_register(&register, out)?)
    }

    /// Writes the full-table register named `name`.
    ///
    /// # Errors
    ///
    /// Fails for containers, unknown names and failed accesses.
    pub fn write_by_name(&mut self, name: &str, input: &[u8]) -> Result<usize, RegisterError> {
        let register = self.lookup_owned(name)?;
        Ok(self.write_register(&register, input)?)
    }

    /// Storage field aliases resolved against the full table, once per
    /// instance.
    ///
    /// # Errors
    ///
    /// Containers return [`RegisterError::Container`].
    pub fn field_map(&self) -> Result<&FieldMap, RegisterError> {
        if let Some(map) = self.fields.get() {
            return Ok(map);
        }
        let table = self.register_table(TableMode::Full)?;
        Ok(self
            .fields
            .get_or_init(|| FieldMap::resolve(table, self.csrs.field_aliases())))
    }

    /// Presentation of the storage behind `raw` when it is an aliased field.
    #[must_use]
    pub fn register_for_storage(&self, raw: RawReg) -> Option<&FieldBinding> {
        let RawReg::Field(field) = raw else {
            return None;
        };
        self.field_map()
            .ok()?
            .binding(field)
            .filter(|binding| !binding.is_ignored())
    }

    /// Releases both register tables. Safe to call repeatedly; tables are
    /// rebuilt on next use.
    pub fn free_register_info(&mut self) {
        let full = self.tables.full.take().is_some();
        let restricted = self.tables.restricted.take().is_some();
        if full || restricted {
            tracing::debug!(
                target: "debug_regs::hart",
                full,
                restricted,
                "released register tables"
            );
        }
    }
}
