//! Physical units and the types built on them.
//!
//! A [`UnitType`] is an SI exponent vector with a scale (and, for affine
//! units such as `degC`, an offset). [`TypeSymbol`] is what the checker
//! attaches to expressions: either a primitive or a unit.

pub mod type_symbol;
pub mod unit_type;

pub use type_symbol::{TypeError, TypeSymbol};
pub use unit_type::{Dimensions, UnitError, UnitType};
