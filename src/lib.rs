extern crate pest;
#[macro_use]
extern crate pest_derive;

pub mod ast;
pub mod context;
pub mod error;
pub mod logger;
pub mod model_parser;
pub mod parser;
pub mod predefined;
pub mod symbol_table;
pub mod typecheck;
pub mod units;

pub use ast::{CompilationState, CompilationUnit, SourceLocation};
pub use context::CompilerContext;
pub use error::{ErrorKind, FrontendError, Rejected, Stage};
pub use logger::{Diagnostic, Logger, LoggingLevel};
pub use model_parser::ModelParser;
pub use predefined::Registries;
pub use symbol_table::{SymbolTable, SymbolTableBuilder};
pub use typecheck::TypeChecker;
pub use units::{TypeSymbol, UnitType};
