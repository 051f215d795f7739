//! VM configuration (spec.md §6): constructed once by the CLI boundary and
//! threaded down into `Vm::new`, mirroring the teacher's
//! `Environment::inherit` pattern of deciding inheritance once, up front.

#[derive(Debug, Clone)]
pub struct VmConfig {
    /// Whether `EnvRegistry` starts seeded from the host process environment.
    pub inherit_env: bool,
    /// Emit a `TRACE` line per executed instruction via the `log` facade.
    pub trace: bool,
}

impl Default for VmConfig {
    fn default() -> Self {
        Self { inherit_env: true, trace: false }
    }
}
