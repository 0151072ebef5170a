use indexmap::IndexMap;
use log::debug;

use crate::error::FrontendError;
use crate::units::{Dimensions, UnitType};

const fn dims(e: [i8; 7]) -> Dimensions {
    Dimensions::from_exponents(e)
}

// name, exponents over (m, kg, s, A, K, mol, cd), scale to coherent SI
const BASE_UNITS: [(&str, Dimensions, f64); 7] = [
    ("m", Dimensions::LENGTH, 1.0),
    ("g", Dimensions::MASS, 1e-3),
    ("s", Dimensions::TIME, 1.0),
    ("A", Dimensions::CURRENT, 1.0),
    ("K", Dimensions::TEMPERATURE, 1.0),
    ("mol", Dimensions::AMOUNT, 1.0),
    ("cd", Dimensions::LUMINOSITY, 1.0),
];

const DERIVED_UNITS: [(&str, Dimensions, f64); 14] = [
    ("Hz", dims([0, 0, -1, 0, 0, 0, 0]), 1.0),
    ("N", dims([1, 1, -2, 0, 0, 0, 0]), 1.0),
    ("Pa", dims([-1, 1, -2, 0, 0, 0, 0]), 1.0),
    ("J", dims([2, 1, -2, 0, 0, 0, 0]), 1.0),
    ("W", dims([2, 1, -3, 0, 0, 0, 0]), 1.0),
    ("C", dims([0, 0, 1, 1, 0, 0, 0]), 1.0),
    ("V", dims([2, 1, -3, -1, 0, 0, 0]), 1.0),
    ("F", dims([-2, -1, 4, 2, 0, 0, 0]), 1.0),
    ("Ohm", dims([2, 1, -3, -2, 0, 0, 0]), 1.0),
    ("S", dims([-2, -1, 3, 2, 0, 0, 0]), 1.0),
    ("Wb", dims([2, 1, -2, -1, 0, 0, 0]), 1.0),
    ("T", dims([0, 1, -2, -1, 0, 0, 0]), 1.0),
    ("H", dims([2, 1, -2, -2, 0, 0, 0]), 1.0),
    ("L", dims([3, 0, 0, 0, 0, 0, 0]), 1e-3),
];

const PREFIXES: [(&str, f64); 20] = [
    ("Y", 1e24),
    ("Z", 1e21),
    ("E", 1e18),
    ("P", 1e15),
    ("T", 1e12),
    ("G", 1e9),
    ("M", 1e6),
    ("k", 1e3),
    ("h", 1e2),
    ("da", 1e1),
    ("d", 1e-1),
    ("c", 1e-2),
    ("m", 1e-3),
    ("u", 1e-6),
    ("n", 1e-9),
    ("p", 1e-12),
    ("f", 1e-15),
    ("a", 1e-18),
    ("z", 1e-21),
    ("y", 1e-24),
];

/// the unit every time derivative and the simulation clock are measured in
pub fn millisecond() -> UnitType {
    UnitType::named("ms", Dimensions::TIME, 1e-3)
}

/// Catalog of the physical units usable in type positions and as literal
/// suffixes.
#[derive(Debug, Clone, Default)]
pub struct UnitRegistry {
    units: Option<IndexMap<String, UnitType>>,
}

impl UnitRegistry {
    pub fn new() -> Self {
        Self { units: None }
    }

    /// Fills the catalog. Calling it again rebuilds the same catalog.
    ///
    /// Every base and derived unit is registered with every prefix. When two
    /// spellings collide the first registered unit keeps the name.
    pub fn register_units(&mut self) {
        let mut units = IndexMap::new();
        for (name, dims, scale) in BASE_UNITS.iter().chain(DERIVED_UNITS.iter()) {
            let unit = UnitType::named(name, *dims, *scale);
            insert_first(&mut units, unit.clone());
            for (prefix, factor) in PREFIXES {
                insert_first(&mut units, unit.prefixed(prefix, factor));
            }
        }
        insert_first(&mut units, UnitType::named("min", Dimensions::TIME, 60.0));
        insert_first(
            &mut units,
            UnitType::named("degC", Dimensions::TEMPERATURE, 1.0).with_offset(273.15),
        );
        debug!("registered {} units", units.len());
        self.units = Some(units);
    }

    pub fn is_initialized(&self) -> bool {
        self.units.is_some()
    }

    pub fn resolve_unit(&self, name: &str) -> Result<Option<&UnitType>, FrontendError> {
        let units = self
            .units
            .as_ref()
            .ok_or(FrontendError::NotInitialized("unit registry"))?;
        Ok(units.get(name))
    }

    pub fn len(&self) -> usize {
        self.units.as_ref().map_or(0, IndexMap::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn insert_first(units: &mut IndexMap<String, UnitType>, unit: UnitType) {
    if let Some(name) = unit.name() {
        units.entry(name.to_string()).or_insert_with(|| unit.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::{millisecond, UnitRegistry};
    use crate::error::FrontendError;
    use crate::units::Dimensions;

    #[test]
    fn lookup_before_registration_fails() {
        let registry = UnitRegistry::new();
        assert_eq!(
            registry.resolve_unit("mV"),
            Err(FrontendError::NotInitialized("unit registry"))
        );
    }

    #[test]
    fn catalog() {
        let mut registry = UnitRegistry::new();
        registry.register_units();
        let mv = registry.resolve_unit("mV").unwrap().unwrap();
        assert_eq!(mv.dims(), &Dimensions::from_exponents([2, 1, -3, -1, 0, 0, 0]));
        assert!((mv.scale() - 1e-3).abs() < 1e-15);
        assert_eq!(registry.resolve_unit("ms").unwrap().unwrap(), &millisecond());
        let kg = registry.resolve_unit("kg").unwrap().unwrap();
        assert!((kg.scale() - 1.0).abs() < 1e-12);
        assert!(registry.resolve_unit("pA").unwrap().is_some());
        assert!(registry.resolve_unit("nS").unwrap().is_some());
        assert!(registry.resolve_unit("GOhm").unwrap().is_some());
        assert!(registry.resolve_unit("mL").unwrap().is_some());
        assert!(registry.resolve_unit("degC").unwrap().unwrap().is_affine());
        assert!(registry.resolve_unit("furlong").unwrap().is_none());
    }

    #[test]
    fn first_registration_wins() {
        let mut registry = UnitRegistry::new();
        registry.register_units();
        // "T" is tesla, never the bare tera prefix
        let t = registry.resolve_unit("T").unwrap().unwrap();
        assert_eq!(t.dims(), &Dimensions::from_exponents([0, 1, -2, -1, 0, 0, 0]));
        // "m" is the metre, "min" is minutes
        assert_eq!(registry.resolve_unit("m").unwrap().unwrap().dims(), &Dimensions::LENGTH);
        assert!((registry.resolve_unit("min").unwrap().unwrap().scale() - 60.0).abs() < 1e-12);
    }

    #[test]
    fn registration_is_idempotent() {
        let mut registry = UnitRegistry::new();
        registry.register_units();
        let first = registry.len();
        registry.register_units();
        assert_eq!(registry.len(), first);
        assert!(!registry.is_empty());
    }
}
