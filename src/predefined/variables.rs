use indexmap::IndexMap;

use super::units::millisecond;
use crate::error::FrontendError;
use crate::units::TypeSymbol;

/// Built-in variables: the simulation time `t` and the constants `e`, `pi`
/// and `inf`.
#[derive(Debug, Clone, Default)]
pub struct VariableRegistry {
    variables: Option<IndexMap<String, TypeSymbol>>,
}

impl VariableRegistry {
    pub fn new() -> Self {
        Self { variables: None }
    }

    pub fn register_variables(&mut self) {
        let mut variables = IndexMap::new();
        variables.insert("t".to_string(), TypeSymbol::Unit(millisecond()));
        for name in ["e", "pi", "inf"] {
            variables.insert(name.to_string(), TypeSymbol::Real);
        }
        self.variables = Some(variables);
    }

    pub fn is_initialized(&self) -> bool {
        self.variables.is_some()
    }

    pub fn resolve_variable(&self, name: &str) -> Result<Option<&TypeSymbol>, FrontendError> {
        let variables = self
            .variables
            .as_ref()
            .ok_or(FrontendError::NotInitialized("variable registry"))?;
        Ok(variables.get(name))
    }
}
