use indexmap::IndexMap;

use crate::error::FrontendError;
use crate::units::TypeSymbol;

#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    types: Option<IndexMap<String, TypeSymbol>>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self { types: None }
    }

    pub fn register_types(&mut self) {
        let types = [
            TypeSymbol::Real,
            TypeSymbol::Integer,
            TypeSymbol::Boolean,
            TypeSymbol::String,
            TypeSymbol::Void,
        ]
        .into_iter()
        .map(|ty| (ty.to_string(), ty))
        .collect();
        self.types = Some(types);
    }

    pub fn is_initialized(&self) -> bool {
        self.types.is_some()
    }

    pub fn resolve_type(&self, name: &str) -> Result<Option<&TypeSymbol>, FrontendError> {
        let types = self
            .types
            .as_ref()
            .ok_or(FrontendError::NotInitialized("type registry"))?;
        Ok(types.get(name))
    }
}
