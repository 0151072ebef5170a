//! Built-in units, types, functions and variables that seed name
//! resolution. Each registry must be populated before it is queried;
//! lookups on an empty registry fail with `FrontendError::NotInitialized`.

pub mod functions;
pub mod types;
pub mod units;
pub mod variables;

pub use functions::{FunctionRegistry, FunctionSignature, ParamType, SignatureMismatch};
pub use types::TypeRegistry;
pub use units::{millisecond, UnitRegistry};
pub use variables::VariableRegistry;

use crate::error::FrontendError;
use crate::units::{TypeSymbol, UnitType};

#[derive(Debug, Clone, Default)]
pub struct Registries {
    pub units: UnitRegistry,
    pub types: TypeRegistry,
    pub functions: FunctionRegistry,
    pub variables: VariableRegistry,
}

impl Registries {
    pub fn new() -> Self {
        Self::default()
    }

    /// all four registries, populated
    pub fn populated() -> Self {
        let mut registries = Self::new();
        registries.register_all();
        registries
    }

    pub fn register_all(&mut self) {
        self.register_units();
        self.register_types();
        self.register_functions();
        self.register_variables();
    }

    pub fn register_units(&mut self) {
        self.units.register_units();
    }

    pub fn register_types(&mut self) {
        self.types.register_types();
    }

    pub fn register_functions(&mut self) {
        self.functions.register_functions();
    }

    pub fn register_variables(&mut self) {
        self.variables.register_variables();
    }

    pub fn is_initialized(&self) -> bool {
        self.units.is_initialized()
            && self.types.is_initialized()
            && self.functions.is_initialized()
            && self.variables.is_initialized()
    }

    /// the first registry that has not been populated yet
    pub fn check_initialized(&self) -> Result<(), FrontendError> {
        if !self.units.is_initialized() {
            Err(FrontendError::NotInitialized("unit registry"))
        } else if !self.types.is_initialized() {
            Err(FrontendError::NotInitialized("type registry"))
        } else if !self.functions.is_initialized() {
            Err(FrontendError::NotInitialized("function registry"))
        } else if !self.variables.is_initialized() {
            Err(FrontendError::NotInitialized("variable registry"))
        } else {
            Ok(())
        }
    }

    pub fn resolve_unit(&self, name: &str) -> Result<Option<&UnitType>, FrontendError> {
        self.units.resolve_unit(name)
    }

    pub fn resolve_type(&self, name: &str) -> Result<Option<&TypeSymbol>, FrontendError> {
        self.types.resolve_type(name)
    }

    pub fn resolve_function(&self, name: &str) -> Result<Option<&FunctionSignature>, FrontendError> {
        self.functions.resolve_function(name)
    }

    pub fn resolve_variable(&self, name: &str) -> Result<Option<&TypeSymbol>, FrontendError> {
        self.variables.resolve_variable(name)
    }

    /// Resolves a name used in a type position: a primitive type or a unit.
    pub fn resolve_type_name(&self, name: &str) -> Result<Option<TypeSymbol>, FrontendError> {
        if let Some(ty) = self.resolve_type(name)? {
            return Ok(Some(ty.clone()));
        }
        Ok(self
            .resolve_unit(name)?
            .map(|unit| TypeSymbol::Unit(unit.clone())))
    }
}

#[cfg(test)]
mod tests {
    use super::Registries;
    use crate::error::FrontendError;
    use crate::units::TypeSymbol;

    #[test]
    fn initialization_order() {
        let mut registries = Registries::new();
        assert!(!registries.is_initialized());
        assert_eq!(
            registries.check_initialized(),
            Err(FrontendError::NotInitialized("unit registry"))
        );
        registries.register_units();
        registries.register_types();
        assert_eq!(
            registries.check_initialized(),
            Err(FrontendError::NotInitialized("function registry"))
        );
        registries.register_functions();
        registries.register_variables();
        assert!(registries.is_initialized());
        assert_eq!(registries.check_initialized(), Ok(()));
    }

    #[test]
    fn type_names() {
        let registries = Registries::populated();
        assert_eq!(registries.resolve_type_name("real"), Ok(Some(TypeSymbol::Real)));
        assert!(registries.resolve_type_name("mV").unwrap().unwrap().is_unit());
        assert_eq!(registries.resolve_type_name("V_m"), Ok(None));
    }

    #[test]
    fn registries_are_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Registries>();
    }
}
