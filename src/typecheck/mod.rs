//! Bottom-up unit and type checking of a resolved compilation unit.

pub mod checker;

pub use checker::TypeChecker;
