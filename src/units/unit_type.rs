use std::fmt;

use approx::relative_eq;
use thiserror::Error;

/// Exponents of the seven SI base dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Dimensions {
    pub length: i8,
    pub mass: i8,
    pub time: i8,
    pub current: i8,
    pub temperature: i8,
    pub amount: i8,
    pub luminosity: i8,
}

const SYMBOLS: [&str; 7] = ["m", "kg", "s", "A", "K", "mol", "cd"];

impl Dimensions {
    pub const DIMENSIONLESS: Dimensions = Dimensions::from_exponents([0, 0, 0, 0, 0, 0, 0]);
    pub const LENGTH: Dimensions = Dimensions::from_exponents([1, 0, 0, 0, 0, 0, 0]);
    pub const MASS: Dimensions = Dimensions::from_exponents([0, 1, 0, 0, 0, 0, 0]);
    pub const TIME: Dimensions = Dimensions::from_exponents([0, 0, 1, 0, 0, 0, 0]);
    pub const CURRENT: Dimensions = Dimensions::from_exponents([0, 0, 0, 1, 0, 0, 0]);
    pub const TEMPERATURE: Dimensions = Dimensions::from_exponents([0, 0, 0, 0, 1, 0, 0]);
    pub const AMOUNT: Dimensions = Dimensions::from_exponents([0, 0, 0, 0, 0, 1, 0]);
    pub const LUMINOSITY: Dimensions = Dimensions::from_exponents([0, 0, 0, 0, 0, 0, 1]);

    pub const fn from_exponents(e: [i8; 7]) -> Self {
        Self {
            length: e[0],
            mass: e[1],
            time: e[2],
            current: e[3],
            temperature: e[4],
            amount: e[5],
            luminosity: e[6],
        }
    }

    pub fn exponents(&self) -> [i8; 7] {
        [
            self.length,
            self.mass,
            self.time,
            self.current,
            self.temperature,
            self.amount,
            self.luminosity,
        ]
    }

    pub fn is_dimensionless(&self) -> bool {
        *self == Self::DIMENSIONLESS
    }

    fn zip_with(
        &self,
        other: &Dimensions,
        f: impl Fn(i8, i8) -> Option<i8>,
    ) -> Result<Dimensions, UnitError> {
        let (a, b) = (self.exponents(), other.exponents());
        let mut out = [0i8; 7];
        for i in 0..7 {
            out[i] = f(a[i], b[i]).ok_or(UnitError::ExponentOverflow)?;
        }
        Ok(Dimensions::from_exponents(out))
    }

    pub fn multiply(&self, other: &Dimensions) -> Result<Dimensions, UnitError> {
        self.zip_with(other, i8::checked_add)
    }

    pub fn divide(&self, other: &Dimensions) -> Result<Dimensions, UnitError> {
        self.zip_with(other, i8::checked_sub)
    }

    pub fn pow(&self, exponent: i32) -> Result<Dimensions, UnitError> {
        let exponent = i8::try_from(exponent).map_err(|_| UnitError::ExponentOverflow)?;
        self.zip_with(&Dimensions::DIMENSIONLESS, |a, _| a.checked_mul(exponent))
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.is_dimensionless() {
            return write!(f, "1");
        }
        let parts = self
            .exponents()
            .iter()
            .zip(SYMBOLS)
            .filter(|(e, _)| **e != 0)
            .map(|(e, s)| if *e == 1 { s.to_string() } else { format!("{s}**{e}") })
            .collect::<Vec<_>>();
        write!(f, "{}", parts.join("*"))
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum UnitError {
    #[error("units {left} and {right} are not compatible")]
    Mismatch { left: String, right: String },
    #[error("unit {unit} has an offset and only supports addition and subtraction")]
    Affine { unit: String },
    #[error("unit exponent out of range")]
    ExponentOverflow,
}

/// A physical unit: SI exponents plus the scale relative to the coherent SI
/// unit (mV has scale 1e-3) and an optional offset for affine units (degC).
///
/// The display name takes no part in equality.
#[derive(Debug, Clone)]
pub struct UnitType {
    name: Option<String>,
    dims: Dimensions,
    scale: f64,
    offset: f64,
}

impl PartialEq for UnitType {
    fn eq(&self, other: &Self) -> bool {
        self.dims == other.dims
            && relative_eq!(self.scale, other.scale, epsilon = 0.0, max_relative = 1e-9)
            && relative_eq!(self.offset, other.offset, epsilon = 1e-12, max_relative = 1e-9)
    }
}

impl UnitType {
    pub fn new(dims: Dimensions, scale: f64) -> Self {
        Self {
            name: None,
            dims,
            scale,
            offset: 0.0,
        }
    }

    pub fn named(name: &str, dims: Dimensions, scale: f64) -> Self {
        Self {
            name: Some(name.to_string()),
            dims,
            scale,
            offset: 0.0,
        }
    }

    pub fn dimensionless() -> Self {
        Self::new(Dimensions::DIMENSIONLESS, 1.0)
    }

    pub fn with_offset(mut self, offset: f64) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    /// the same unit scaled by a prefix, e.g. ("m", 1e-3) turns V into mV
    pub fn prefixed(&self, prefix: &str, factor: f64) -> Self {
        Self {
            name: self.name.as_ref().map(|n| format!("{prefix}{n}")),
            dims: self.dims,
            scale: self.scale * factor,
            offset: self.offset,
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn dims(&self) -> &Dimensions {
        &self.dims
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn offset(&self) -> f64 {
        self.offset
    }

    pub fn is_affine(&self) -> bool {
        self.offset != 0.0
    }

    /// no dimensions, unit scale and no offset
    pub fn is_dimensionless(&self) -> bool {
        *self == Self::dimensionless()
    }

    fn check_same(&self, other: &UnitType) -> Result<UnitType, UnitError> {
        if self == other {
            Ok(self.clone())
        } else {
            Err(UnitError::Mismatch {
                left: self.to_string(),
                right: other.to_string(),
            })
        }
    }

    pub fn add(&self, other: &UnitType) -> Result<UnitType, UnitError> {
        self.check_same(other)
    }

    pub fn subtract(&self, other: &UnitType) -> Result<UnitType, UnitError> {
        self.check_same(other)
    }

    fn check_multiplicative(&self) -> Result<(), UnitError> {
        if self.is_affine() {
            Err(UnitError::Affine {
                unit: self.to_string(),
            })
        } else {
            Ok(())
        }
    }

    pub fn multiply(&self, other: &UnitType) -> Result<UnitType, UnitError> {
        self.check_multiplicative()?;
        other.check_multiplicative()?;
        let name = match (self.compound_name(), other.compound_name()) {
            (Some(a), Some(b)) => Some(format!("{a}*{b}")),
            (Some(a), None) if other.is_dimensionless() => Some(a.to_string()),
            (None, Some(b)) if self.is_dimensionless() => Some(b.to_string()),
            _ => None,
        };
        Ok(UnitType {
            name,
            dims: self.dims.multiply(&other.dims)?,
            scale: self.scale * other.scale,
            offset: 0.0,
        }
        .drop_dimensionless_name())
    }

    pub fn divide(&self, other: &UnitType) -> Result<UnitType, UnitError> {
        self.check_multiplicative()?;
        other.check_multiplicative()?;
        let name = match (self.compound_name(), other.compound_name()) {
            (Some(a), Some(b)) => Some(format!("{a}/{}", parenthesise(b))),
            (Some(a), None) if other.is_dimensionless() => Some(a.to_string()),
            (None, Some(b)) if self.is_dimensionless() => Some(format!("1/{}", parenthesise(b))),
            _ => None,
        };
        Ok(UnitType {
            name,
            dims: self.dims.divide(&other.dims)?,
            scale: self.scale / other.scale,
            offset: 0.0,
        }
        .drop_dimensionless_name())
    }

    pub fn powi(&self, exponent: i32) -> Result<UnitType, UnitError> {
        self.check_multiplicative()?;
        Ok(UnitType {
            name: self
                .compound_name()
                .map(|n| format!("{}**{exponent}", parenthesise(n))),
            dims: self.dims.pow(exponent)?,
            scale: self.scale.powi(exponent),
            offset: 0.0,
        }
        .drop_dimensionless_name())
    }

    fn drop_dimensionless_name(mut self) -> Self {
        if self.is_dimensionless() {
            self.name = None;
        }
        self
    }

    // names of dimensionless intermediates are dropped so that e.g. ms/ms
    // prints as "1" rather than "ms/ms"
    fn compound_name(&self) -> Option<&str> {
        if self.is_dimensionless() {
            None
        } else {
            self.name.as_deref()
        }
    }
}

fn parenthesise(name: &str) -> String {
    if name.contains(['*', '/']) {
        format!("({name})")
    } else {
        name.to_string()
    }
}

impl fmt::Display for UnitType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if let Some(name) = &self.name {
            return write!(f, "{name}");
        }
        if relative_eq!(self.scale, 1.0, epsilon = 0.0, max_relative = 1e-9) {
            write!(f, "{}", self.dims)?;
        } else {
            write!(f, "{:e} {}", self.scale, self.dims)?;
        }
        if self.is_affine() {
            write!(f, " (offset {})", self.offset)?;
        }
        Ok(())
    }
}
