use std::path::Path;

use log::info;

use crate::ast::{CompilationState, CompilationUnit, SourceLocation};
use crate::context::CompilerContext;
use crate::error::{FrontendError, Rejected, Stage};
use crate::logger::LoggingLevel;
use crate::parser::{parse_file, parse_text};
use crate::symbol_table::SymbolTableBuilder;
use crate::typecheck::TypeChecker;

/// Runs parsing, symbol table construction and type checking on one model
/// file, stopping after the first stage that reports an error.
///
/// Diagnostics go to the context's logger. A failing stage runs to the end
/// so that all its problems are reported, then the unit is `Rejected`.
pub struct ModelParser<'c> {
    context: &'c mut CompilerContext,
}

impl<'c> ModelParser<'c> {
    pub fn new(context: &'c mut CompilerContext) -> Self {
        Self { context }
    }

    pub fn parse_model(&mut self, path: &Path) -> Result<CompilationUnit, Rejected> {
        let before = self.check_initialized()?;
        info!("parsing {}", path.display());
        let unit = parse_file(path, SourceLocation::UNKNOWN, &mut self.context.logger);
        self.run_stages(unit, before)
    }

    pub fn parse_model_str(&mut self, text: &str) -> Result<CompilationUnit, Rejected> {
        let before = self.check_initialized()?;
        let unit = parse_text(text, SourceLocation::UNKNOWN, &mut self.context.logger);
        self.run_stages(unit, before)
    }

    /// Fails with a fatal diagnostic if the context is not ready; otherwise
    /// returns the number of errors already in the session.
    fn check_initialized(&mut self) -> Result<usize, Rejected> {
        let ready = if self.context.logger.is_initialized() {
            self.context.registries().check_initialized()
        } else {
            Err(FrontendError::NotInitialized("logger"))
        };
        let before = self.context.logger.error_count();
        match ready {
            Ok(()) => Ok(before),
            Err(err) => {
                self.context
                    .logger
                    .report_error_at(LoggingLevel::Fatal, err, SourceLocation::UNKNOWN);
                Err(self.rejected(Stage::Initialization, before))
            }
        }
    }

    fn rejected(&self, stage: Stage, before: usize) -> Rejected {
        let rejected = Rejected {
            stage,
            errors: self.context.logger.error_count() - before,
        };
        info!("{}", rejected);
        rejected
    }

    fn failed(&self, before: usize) -> bool {
        self.context.logger.error_count() > before
    }

    fn run_stages(&mut self, unit: Option<CompilationUnit>, before: usize) -> Result<CompilationUnit, Rejected> {
        let Some(mut unit) = unit else {
            return Err(self.rejected(Stage::Parsing, before));
        };
        let registries = self.context.shared_registries();

        let mut table = SymbolTableBuilder::new(&registries, &mut self.context.logger).build(&mut unit);
        unit.state = CompilationState::ScopesBuilt;
        if self.failed(before) {
            unit.state = CompilationState::Rejected;
            return Err(self.rejected(Stage::SymbolTable, before));
        }

        TypeChecker::new(&registries, &mut table, &mut self.context.logger).check(&mut unit);
        unit.symbols = Some(table);
        unit.state = CompilationState::TypeChecked;
        if self.failed(before) {
            unit.state = CompilationState::Rejected;
            return Err(self.rejected(Stage::TypeChecking, before));
        }

        unit.state = CompilationState::Validated;
        info!(
            "validated {} model(s) with {} warning(s)",
            unit.models.len(),
            self.context.logger.warning_count()
        );
        Ok(unit)
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::ModelParser;
    use crate::ast::CompilationState;
    use crate::context::CompilerContext;
    use crate::error::{ErrorKind, Stage};
    use crate::logger::LoggingLevel;

    fn context() -> CompilerContext {
        let _ = env_logger::builder().is_test(true).try_init();
        CompilerContext::initialized(LoggingLevel::Info)
    }

    #[test]
    fn valid_text_is_validated() {
        let mut context = context();
        let unit = ModelParser::new(&mut context)
            .parse_model_str("neuron n { state { V_m mV = -70 mV } }")
            .unwrap();
        assert_eq!(unit.state, CompilationState::Validated);
        assert!(unit.symbols.is_some());
        assert!(!context.logger.has_errors());
    }

    #[test]
    fn stages_stop_at_the_first_failure() {
        let mut context = context();
        let rejected = ModelParser::new(&mut context)
            .parse_model_str("neuron n { state { x mV = y + 1 ms } }")
            .unwrap_err();
        assert_eq!(rejected.stage, Stage::SymbolTable);
        assert_eq!(rejected.errors, 1);
        // the checker never ran, so no unit error on top
        assert_eq!(context.logger.count_kind(ErrorKind::UnitMismatch), 0);
    }

    #[test]
    fn syntax_errors_reject_at_parsing() {
        let mut context = context();
        let rejected = ModelParser::new(&mut context)
            .parse_model_str("neuron { }")
            .unwrap_err();
        assert_eq!(rejected.stage, Stage::Parsing);
        assert_eq!(context.logger.count_kind(ErrorKind::Syntax), 1);
    }

    #[test]
    fn uninitialized_context_fails_fast() {
        let mut context = CompilerContext::new();
        context.init_logger(LoggingLevel::Info);
        let rejected = ModelParser::new(&mut context)
            .parse_model_str("neuron n { }")
            .unwrap_err();
        assert_eq!(rejected.stage, Stage::Initialization);
        let diagnostic = context.logger.diagnostics().next().unwrap();
        assert_eq!(diagnostic.level, LoggingLevel::Fatal);
        assert_eq!(diagnostic.kind, Some(ErrorKind::NotInitialized));
        assert!(diagnostic.message.contains("unit registry"));

        let mut context = CompilerContext::new();
        context.register_units();
        context.register_types();
        context.register_functions();
        context.register_variables();
        let rejected = ModelParser::new(&mut context)
            .parse_model_str("neuron n { }")
            .unwrap_err();
        assert_eq!(rejected.stage, Stage::Initialization);
        assert!(context.logger.has_error_contains("the logger has not been initialized"));
    }

    #[test]
    fn missing_file_is_rejected_at_parsing() {
        let mut context = context();
        let rejected = ModelParser::new(&mut context)
            .parse_model(Path::new("models/missing.nestml"))
            .unwrap_err();
        assert_eq!(rejected.stage, Stage::Parsing);
        assert_eq!(context.logger.count_kind(ErrorKind::Io), 1);
    }

    #[test]
    fn earlier_errors_in_the_session_do_not_reject_a_later_file() {
        let mut context = context();
        let mut parser = ModelParser::new(&mut context);
        assert!(parser.parse_model_str("neuron n { state { x mV = 1 ms } }").is_err());
        assert!(parser.parse_model_str("neuron m { state { x ms = 1 ms } }").is_ok());
    }
}
