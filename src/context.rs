use std::sync::Arc;

use log::info;

use crate::logger::{Logger, LoggingLevel};
use crate::predefined::Registries;

/// Everything a compilation needs besides the source: the predefined
/// registries and one diagnostics session.
///
/// The registries are populated once and shared read-only through an `Arc`;
/// `fork` hands out a context for another file with its own `Logger`.
#[derive(Debug, Clone, Default)]
pub struct CompilerContext {
    registries: Arc<Registries>,
    pub logger: Logger,
}

impl CompilerContext {
    /// an uninitialized context; register the registries and initialize the
    /// logger before parsing
    pub fn new() -> Self {
        Self::default()
    }

    /// registries populated and logger initialized at `level`
    pub fn initialized(level: LoggingLevel) -> Self {
        let mut context = Self::new();
        context.register_units();
        context.register_types();
        context.register_functions();
        context.register_variables();
        context.init_logger(level);
        context
    }

    pub fn with_registries(registries: Arc<Registries>, level: LoggingLevel) -> Self {
        let mut logger = Logger::new();
        logger.init(level);
        Self { registries, logger }
    }

    // registration happens before the registries are shared, so
    // `make_mut` does not clone in practice
    pub fn register_units(&mut self) {
        Arc::make_mut(&mut self.registries).register_units();
    }

    pub fn register_types(&mut self) {
        Arc::make_mut(&mut self.registries).register_types();
    }

    pub fn register_functions(&mut self) {
        Arc::make_mut(&mut self.registries).register_functions();
    }

    pub fn register_variables(&mut self) {
        Arc::make_mut(&mut self.registries).register_variables();
    }

    /// starts a new diagnostics session
    pub fn init_logger(&mut self, level: LoggingLevel) {
        self.logger.init(level);
        info!("logger initialized at level {}", level);
    }

    pub fn is_initialized(&self) -> bool {
        self.registries.is_initialized() && self.logger.is_initialized()
    }

    pub fn registries(&self) -> &Registries {
        &self.registries
    }

    pub fn shared_registries(&self) -> Arc<Registries> {
        Arc::clone(&self.registries)
    }

    /// A context sharing these registries with a fresh logger at the same
    /// minimum level.
    pub fn fork(&self) -> Self {
        Self::with_registries(self.shared_registries(), self.logger.minimum_level())
    }
}
