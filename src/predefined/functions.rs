use std::fmt;

use indexmap::IndexMap;
use itertools::Itertools;

use super::units::millisecond;
use crate::error::FrontendError;
use crate::units::TypeSymbol;

/// Parameter or return type of a function signature. `Generic` stands for
/// a numeric type that is fixed by the first generic argument of a call.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamType {
    Exact(TypeSymbol),
    Generic,
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ParamType::Exact(ty) => write!(f, "{ty}"),
            ParamType::Generic => write!(f, "T"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SignatureMismatch {
    Arity { expected: usize, found: usize },
    Argument {
        position: usize,
        expected: String,
        found: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionSignature {
    pub name: String,
    pub params: Vec<ParamType>,
    pub ret: ParamType,
}

impl FunctionSignature {
    pub fn new(name: &str, params: Vec<ParamType>, ret: ParamType) -> Self {
        Self {
            name: name.to_string(),
            params,
            ret,
        }
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }

    /// Checks the argument types of a call, positionally, and returns the
    /// type of the call. Stops at the first argument that does not fit.
    pub fn check_args(&self, args: &[TypeSymbol]) -> Result<TypeSymbol, SignatureMismatch> {
        if args.len() != self.params.len() {
            return Err(SignatureMismatch::Arity {
                expected: self.params.len(),
                found: args.len(),
            });
        }
        let mut bound: Option<TypeSymbol> = None;
        for (position, (param, arg)) in self.params.iter().zip(args).enumerate() {
            let mismatch = |expected: String| SignatureMismatch::Argument {
                position: position + 1,
                expected,
                found: arg.to_string(),
            };
            match param {
                ParamType::Exact(expected) => {
                    if !expected.is_assignable_from(arg) {
                        return Err(mismatch(expected.to_string()));
                    }
                }
                ParamType::Generic => {
                    let widened = match &bound {
                        None if arg.is_numeric() => true,
                        None => return Err(mismatch("a numeric type".to_string())),
                        Some(ty) if ty.is_assignable_from(arg) => false,
                        // integer first, real later widens to real
                        Some(ty) if arg.is_assignable_from(ty) => true,
                        Some(ty) => return Err(mismatch(ty.to_string())),
                    };
                    if widened {
                        bound = Some(arg.clone().normalized());
                    }
                }
            }
        }
        Ok(match &self.ret {
            ParamType::Exact(ty) => ty.clone(),
            ParamType::Generic => bound.unwrap_or(TypeSymbol::Real),
        })
    }
}

impl fmt::Display for FunctionSignature {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}({}) -> {}",
            self.name,
            self.params.iter().join(", "),
            self.ret
        )
    }
}

#[derive(Debug, Clone, Default)]
pub struct FunctionRegistry {
    functions: Option<IndexMap<String, FunctionSignature>>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self { functions: None }
    }

    pub fn register_functions(&mut self) {
        use ParamType::{Exact, Generic};
        let real = || Exact(TypeSymbol::Real);
        let integer = || Exact(TypeSymbol::Integer);
        let void = || Exact(TypeSymbol::Void);
        let ms = || Exact(TypeSymbol::Unit(millisecond()));

        let mut signatures = Vec::new();
        for name in [
            "exp", "ln", "log10", "expm1", "sinh", "cosh", "tanh", "erf", "erfc", "sqrt",
        ] {
            signatures.push(FunctionSignature::new(name, vec![real()], real()));
        }
        signatures.extend([
            FunctionSignature::new("pow", vec![real(), real()], real()),
            FunctionSignature::new("abs", vec![Generic], Generic),
            FunctionSignature::new("max", vec![Generic, Generic], Generic),
            FunctionSignature::new("min", vec![Generic, Generic], Generic),
            FunctionSignature::new("clip", vec![Generic, Generic, Generic], Generic),
            FunctionSignature::new("resolution", vec![], ms()),
            FunctionSignature::new("steps", vec![ms()], integer()),
            FunctionSignature::new("emit_spike", vec![], void()),
            FunctionSignature::new("integrate_odes", vec![], void()),
            FunctionSignature::new("random_normal", vec![real(), real()], real()),
            FunctionSignature::new("random_uniform", vec![real(), real()], real()),
            FunctionSignature::new("random_int", vec![integer(), integer()], integer()),
            FunctionSignature::new("print", vec![Exact(TypeSymbol::String)], void()),
            FunctionSignature::new("println", vec![], void()),
            FunctionSignature::new("delta", vec![ms()], real()),
        ]);
        self.functions = Some(
            signatures
                .into_iter()
                .map(|s| (s.name.clone(), s))
                .collect(),
        );
    }

    pub fn is_initialized(&self) -> bool {
        self.functions.is_some()
    }

    pub fn resolve_function(&self, name: &str) -> Result<Option<&FunctionSignature>, FrontendError> {
        let functions = self
            .functions
            .as_ref()
            .ok_or(FrontendError::NotInitialized("function registry"))?;
        Ok(functions.get(name))
    }
}

#[cfg(test)]
mod tests {
    use super::{FunctionRegistry, SignatureMismatch};
    use crate::predefined::units::millisecond;
    use crate::units::TypeSymbol;

    fn registry() -> FunctionRegistry {
        let mut registry = FunctionRegistry::new();
        registry.register_functions();
        registry
    }

    #[test]
    fn exact_signatures() {
        let registry = registry();
        let exp = registry.resolve_function("exp").unwrap().unwrap();
        assert_eq!(exp.to_string(), "exp(real) -> real");
        assert_eq!(exp.check_args(&[TypeSymbol::Integer]), Ok(TypeSymbol::Real));
        let ms = TypeSymbol::Unit(millisecond());
        assert_eq!(
            exp.check_args(&[ms.clone()]),
            Err(SignatureMismatch::Argument {
                position: 1,
                expected: "real".to_string(),
                found: "ms".to_string()
            })
        );
        let resolution = registry.resolve_function("resolution").unwrap().unwrap();
        assert_eq!(resolution.check_args(&[]), Ok(ms));
        assert_eq!(
            resolution.check_args(&[TypeSymbol::Real]),
            Err(SignatureMismatch::Arity {
                expected: 0,
                found: 1
            })
        );
    }

    #[test]
    fn generic_signatures_bind_to_first_argument() {
        let registry = registry();
        let ms = TypeSymbol::Unit(millisecond());
        let max = registry.resolve_function("max").unwrap().unwrap();
        assert_eq!(max.check_args(&[ms.clone(), ms.clone()]), Ok(ms.clone()));
        assert_eq!(
            max.check_args(&[TypeSymbol::Integer, TypeSymbol::Real]),
            Ok(TypeSymbol::Real)
        );
        assert!(matches!(
            max.check_args(&[ms.clone(), TypeSymbol::Real]),
            Err(SignatureMismatch::Argument { position: 2, .. })
        ));
        let clip = registry.resolve_function("clip").unwrap().unwrap();
        assert!(matches!(
            clip.check_args(&[TypeSymbol::Boolean, TypeSymbol::Real, TypeSymbol::Real]),
            Err(SignatureMismatch::Argument { position: 1, .. })
        ));
    }

    #[test]
    fn unknown_and_uninitialized() {
        assert!(FunctionRegistry::new().resolve_function("exp").is_err());
        assert_eq!(registry().resolve_function("foo").unwrap(), None);
    }
}
