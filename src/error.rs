use std::fmt;

use thiserror::Error;

use crate::ast::SourceLocation;

/// Category of a reported problem, one per stage-specific error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Syntax,
    DuplicateDeclaration,
    UndeclaredIdentifier,
    UnitMismatch,
    TypeUsedAsValue,
    TypeMismatch,
    NotInitialized,
    Io,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FrontendError {
    #[error("syntax error: {0}")]
    Syntax(String),

    #[error("'{name}' is already declared in this scope (previous declaration at {previous})")]
    DuplicateDeclaration {
        name: String,
        previous: SourceLocation,
    },

    #[error("undeclared identifier '{name}'")]
    UndeclaredIdentifier { name: String },

    #[error("unknown unit '{name}'")]
    UnknownUnit { name: String },

    #[error("variable '{name}' not defined yet, it is defined at line {line}")]
    UsedBeforeDeclaration { name: String, line: u32 },

    #[error("cannot use variable '{name}' in the assignment of its own declaration")]
    SelfReference { name: String },

    #[error("unit mismatch: {0}")]
    UnitMismatch(String),

    #[error("argument unit mismatch in call to '{function}': argument {position} is {found}, expected {expected}")]
    ArgumentUnitMismatch {
        function: String,
        position: usize,
        expected: String,
        found: String,
    },

    #[error("'{name}' is a type and cannot be used as a value")]
    TypeUsedAsValue { name: String },

    #[error("type mismatch: {0}")]
    TypeMismatch(String),

    #[error("the {0} has not been initialized")]
    NotInitialized(&'static str),

    #[error("cannot read {path}: {message}")]
    Io { path: String, message: String },
}

impl FrontendError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FrontendError::Syntax(_) => ErrorKind::Syntax,
            FrontendError::DuplicateDeclaration { .. } => ErrorKind::DuplicateDeclaration,
            FrontendError::UndeclaredIdentifier { .. }
            | FrontendError::UnknownUnit { .. }
            | FrontendError::UsedBeforeDeclaration { .. }
            | FrontendError::SelfReference { .. } => ErrorKind::UndeclaredIdentifier,
            FrontendError::UnitMismatch(_) | FrontendError::ArgumentUnitMismatch { .. } => {
                ErrorKind::UnitMismatch
            }
            FrontendError::TypeUsedAsValue { .. } => ErrorKind::TypeUsedAsValue,
            FrontendError::TypeMismatch(_) => ErrorKind::TypeMismatch,
            FrontendError::NotInitialized(_) => ErrorKind::NotInitialized,
            FrontendError::Io { .. } => ErrorKind::Io,
        }
    }
}

/// Stage of the front end pipeline, used to say where a model was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Initialization,
    Parsing,
    SymbolTable,
    TypeChecking,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Stage::Initialization => write!(f, "initialization"),
            Stage::Parsing => write!(f, "parsing"),
            Stage::SymbolTable => write!(f, "symbol table construction"),
            Stage::TypeChecking => write!(f, "type checking"),
        }
    }
}

/// Returned by the model parser when a stage reported errors. The
/// diagnostics themselves stay in the logger.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("model rejected during {stage} with {errors} error(s)")]
pub struct Rejected {
    pub stage: Stage,
    pub errors: usize,
}

#[cfg(test)]
mod tests {
    use super::{ErrorKind, FrontendError, Rejected, Stage};
    use crate::ast::SourceLocation;

    #[test]
    fn kinds() {
        let dup = FrontendError::DuplicateDeclaration {
            name: "V_m".to_string(),
            previous: SourceLocation::new(2, 9, 2, 25),
        };
        assert_eq!(dup.kind(), ErrorKind::DuplicateDeclaration);
        assert!(dup.to_string().contains("[2:9;2:25]"));
        let before = FrontendError::UsedBeforeDeclaration {
            name: "x".to_string(),
            line: 4,
        };
        assert_eq!(before.kind(), ErrorKind::UndeclaredIdentifier);
        assert_eq!(
            before.to_string(),
            "variable 'x' not defined yet, it is defined at line 4"
        );
        assert_eq!(
            FrontendError::NotInitialized("unit registry").to_string(),
            "the unit registry has not been initialized"
        );
    }

    #[test]
    fn rejected_message() {
        let rejected = Rejected {
            stage: Stage::TypeChecking,
            errors: 2,
        };
        assert_eq!(
            rejected.to_string(),
            "model rejected during type checking with 2 error(s)"
        );
    }
}
