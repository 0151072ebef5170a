use std::fmt;

use thiserror::Error;

use super::{Dimensions, UnitError, UnitType};

/// Type assigned to declarations and expressions: a primitive or a
/// physical unit.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeSymbol {
    Real,
    Integer,
    Boolean,
    String,
    Void,
    Unit(UnitType),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TypeError {
    #[error(transparent)]
    Unit(#[from] UnitError),
    #[error("operator '{op}' is not defined for {ty}")]
    Operand { op: String, ty: String },
}

impl TypeSymbol {
    /// wraps a unit, collapsing dimensionless units to `real`
    pub fn from_unit(unit: UnitType) -> Self {
        if unit.is_dimensionless() {
            TypeSymbol::Real
        } else {
            TypeSymbol::Unit(unit)
        }
    }

    pub fn normalized(self) -> Self {
        match self {
            TypeSymbol::Unit(u) => Self::from_unit(u),
            other => other,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            TypeSymbol::Real | TypeSymbol::Integer | TypeSymbol::Unit(_)
        )
    }

    pub fn is_unit(&self) -> bool {
        matches!(self, TypeSymbol::Unit(_))
    }

    pub fn is_boolean(&self) -> bool {
        matches!(self, TypeSymbol::Boolean)
    }

    /// the unit of a numeric type; `real` and `integer` are dimensionless
    pub fn unit(&self) -> Option<UnitType> {
        match self {
            TypeSymbol::Real | TypeSymbol::Integer => Some(UnitType::dimensionless()),
            TypeSymbol::Unit(u) => Some(u.clone()),
            _ => None,
        }
    }

    /// true if a value of type `from` may be stored in a slot of this type
    pub fn is_assignable_from(&self, from: &TypeSymbol) -> bool {
        let (to, from) = (self.clone().normalized(), from.clone().normalized());
        to == from || (to == TypeSymbol::Real && from == TypeSymbol::Integer)
    }

    fn numeric_unit(&self, op: &str) -> Result<UnitType, TypeError> {
        self.unit().ok_or_else(|| TypeError::Operand {
            op: op.to_string(),
            ty: self.to_string(),
        })
    }

    /// result type of `self + other` or `self - other`
    pub fn additive(&self, other: &TypeSymbol, op: &str) -> Result<TypeSymbol, TypeError> {
        let left = self.numeric_unit(op)?;
        let right = other.numeric_unit(op)?;
        if *self == TypeSymbol::Integer && *other == TypeSymbol::Integer {
            return Ok(TypeSymbol::Integer);
        }
        let unit = match op {
            "-" => left.subtract(&right),
            _ => left.add(&right),
        }
        .map_err(|_| UnitError::Mismatch {
            left: self.to_string(),
            right: other.to_string(),
        })?;
        Ok(Self::from_unit(unit))
    }

    /// result type of `self * other` or `self / other`
    pub fn multiplicative(&self, other: &TypeSymbol, op: &str) -> Result<TypeSymbol, TypeError> {
        let left = self.numeric_unit(op)?;
        let right = other.numeric_unit(op)?;
        if *self == TypeSymbol::Integer && *other == TypeSymbol::Integer {
            return Ok(TypeSymbol::Integer);
        }
        let unit = match op {
            "/" => left.divide(&right)?,
            _ => left.multiply(&right)?,
        };
        Ok(Self::from_unit(unit))
    }

    /// result type of `self ** exponent` for an integer exponent; only a
    /// physical unit has its dimensions raised
    pub fn power(&self, exponent: i32) -> Result<TypeSymbol, TypeError> {
        match self {
            TypeSymbol::Integer if exponent >= 0 => Ok(TypeSymbol::Integer),
            TypeSymbol::Integer | TypeSymbol::Real => Ok(TypeSymbol::Real),
            TypeSymbol::Unit(unit) => Ok(Self::from_unit(unit.powi(exponent)?)),
            _ => Err(TypeError::Operand {
                op: "**".to_string(),
                ty: self.to_string(),
            }),
        }
    }

    /// type of the `order`-th time derivative of a value of this type,
    /// measured per millisecond
    pub fn derivative(&self, order: u32) -> Result<TypeSymbol, TypeError> {
        if order == 0 {
            return Ok(self.clone());
        }
        let millisecond = UnitType::named("ms", Dimensions::TIME, 1e-3);
        let per_time = millisecond.powi(order as i32)?;
        Ok(Self::from_unit(
            self.numeric_unit("'")?.divide(&per_time)?,
        ))
    }
}

impl fmt::Display for TypeSymbol {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TypeSymbol::Real => write!(f, "real"),
            TypeSymbol::Integer => write!(f, "integer"),
            TypeSymbol::Boolean => write!(f, "boolean"),
            TypeSymbol::String => write!(f, "string"),
            TypeSymbol::Void => write!(f, "void"),
            TypeSymbol::Unit(u) => write!(f, "{u}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{TypeError, TypeSymbol};
    use crate::units::{Dimensions, UnitError, UnitType};

    fn mv() -> TypeSymbol {
        TypeSymbol::Unit(UnitType::named(
            "mV",
            Dimensions::from_exponents([2, 1, -3, -1, 0, 0, 0]),
            1e-3,
        ))
    }

    fn ms() -> TypeSymbol {
        TypeSymbol::Unit(UnitType::named("ms", Dimensions::TIME, 1e-3))
    }

    #[test]
    fn additive_rules() {
        assert_eq!(mv().additive(&mv(), "+").unwrap(), mv());
        assert_eq!(
            TypeSymbol::Integer.additive(&TypeSymbol::Integer, "+").unwrap(),
            TypeSymbol::Integer
        );
        assert_eq!(
            TypeSymbol::Integer.additive(&TypeSymbol::Real, "-").unwrap(),
            TypeSymbol::Real
        );
        let err = mv().additive(&ms(), "+").unwrap_err();
        assert_eq!(
            err,
            TypeError::Unit(UnitError::Mismatch {
                left: "mV".to_string(),
                right: "ms".to_string()
            })
        );
        assert!(matches!(
            TypeSymbol::Boolean.additive(&TypeSymbol::Real, "+"),
            Err(TypeError::Operand { .. })
        ));
    }

    #[test]
    fn multiplicative_rules() {
        let ratio = mv().multiplicative(&ms(), "/").unwrap();
        assert!(ratio.is_unit());
        assert_eq!(ratio.to_string(), "mV/ms");
        assert_eq!(ms().multiplicative(&ms(), "/").unwrap(), TypeSymbol::Real);
        assert_eq!(
            TypeSymbol::Real.multiplicative(&mv(), "*").unwrap(),
            mv()
        );
    }

    #[test]
    fn powers_raise_only_unit_dimensions() {
        assert_eq!(TypeSymbol::Real.power(200).unwrap(), TypeSymbol::Real);
        assert_eq!(TypeSymbol::Integer.power(300).unwrap(), TypeSymbol::Integer);
        assert_eq!(TypeSymbol::Integer.power(-300).unwrap(), TypeSymbol::Real);
        assert_eq!(
            mv().power(2).unwrap(),
            mv().multiplicative(&mv(), "*").unwrap()
        );
        assert!(matches!(mv().power(200), Err(TypeError::Unit(UnitError::ExponentOverflow))));
        assert!(matches!(TypeSymbol::Boolean.power(2), Err(TypeError::Operand { .. })));
    }

    #[test]
    fn derivative_divides_by_milliseconds() {
        let d = mv().derivative(1).unwrap();
        assert_eq!(d, mv().multiplicative(&ms(), "/").unwrap());
        assert_eq!(mv().derivative(0).unwrap(), mv());
        assert_eq!(
            TypeSymbol::Real.derivative(1).unwrap(),
            TypeSymbol::Real.multiplicative(&ms(), "/").unwrap()
        );
    }

    #[test]
    fn assignability() {
        assert!(TypeSymbol::Real.is_assignable_from(&TypeSymbol::Integer));
        assert!(!TypeSymbol::Integer.is_assignable_from(&TypeSymbol::Real));
        assert!(mv().is_assignable_from(&mv()));
        assert!(!mv().is_assignable_from(&TypeSymbol::Real));
        assert!(TypeSymbol::Real.is_assignable_from(&TypeSymbol::Unit(UnitType::dimensionless())));
    }
}
