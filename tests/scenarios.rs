use nestml::ast::{BlockRole, ExprKind};
use nestml::{
    CompilationState, CompilerContext, ErrorKind, LoggingLevel, ModelParser, Stage, TypeSymbol,
};

fn context() -> CompilerContext {
    let _ = env_logger::builder().is_test(true).try_init();
    CompilerContext::initialized(LoggingLevel::Info)
}

fn millivolt(context: &CompilerContext) -> TypeSymbol {
    TypeSymbol::Unit(context.registries().resolve_unit("mV").unwrap().unwrap().clone())
}

#[test]
fn declaration_and_reference_share_the_millivolt_type() {
    let mut context = context();
    let unit = ModelParser::new(&mut context)
        .parse_model_str(
            "neuron n {
                state {
                    V_m mV = -70 mV
                }
                equations {
                    V_m' = -V_m / (10 ms)
                }
            }",
        )
        .unwrap();
    assert_eq!(unit.state, CompilationState::Validated);
    let table = unit.symbols.as_ref().unwrap();
    let mv = millivolt(&context);

    let decl = unit.models[0].declarations(BlockRole::State).next().unwrap();
    let declared = table.symbol(decl.symbol.unwrap());
    assert_eq!(declared.ty.as_ref(), Some(&mv));

    let references: Vec<_> = unit
        .expressions()
        .into_iter()
        .filter(|e| matches!(&e.kind, ExprKind::Variable(v) if v.name == "V_m"))
        .collect();
    assert_eq!(references.len(), 1);
    assert_eq!(references[0].ty.as_ref(), Some(&mv));
    let ExprKind::Variable(reference) = &references[0].kind else {
        unreachable!()
    };
    assert_eq!(reference.symbol, decl.symbol);
}

#[test]
fn duplicate_name_in_one_scope_is_rejected() {
    let mut context = context();
    let rejected = ModelParser::new(&mut context)
        .parse_model_str(
            "neuron n {
                parameters {
                    tau ms = 1 ms
                    tau ms = 2 ms
                }
            }",
        )
        .unwrap_err();
    assert_eq!(rejected.stage, Stage::SymbolTable);
    assert_eq!(context.logger.count_kind(ErrorKind::DuplicateDeclaration), 1);
    assert_eq!(context.logger.error_count(), 1);
}

#[test]
fn adding_millivolts_to_milliseconds_is_rejected() {
    let mut context = context();
    let rejected = ModelParser::new(&mut context)
        .parse_model_str(
            "neuron n {
                parameters {
                    E_L mV = -70 mV
                    tau ms = 10 ms
                }
                update {
                    x real = E_L + tau
                }
            }",
        )
        .unwrap_err();
    assert_eq!(rejected.stage, Stage::TypeChecking);
    assert_eq!(context.logger.count_kind(ErrorKind::UnitMismatch), 1);
    assert_eq!(context.logger.error_count(), 1);
    let diagnostic = context.logger.diagnostics().next().unwrap();
    assert_eq!(diagnostic.location.start_line, 7);
}

#[test]
fn warnings_alone_still_validate() {
    let mut context = context();
    let unit = ModelParser::new(&mut context)
        .parse_model_str("neuron n { state { V_m mV = -70 } }")
        .unwrap();
    assert_eq!(unit.state, CompilationState::Validated);
    assert!(context.logger.has_warnings());
    assert!(!context.logger.has_errors());
}

#[test]
fn names_from_a_sibling_scope_do_not_resolve() {
    let mut context = context();
    let rejected = ModelParser::new(&mut context)
        .parse_model_str(
            "neuron n {
                function f() real {
                    hidden real = 1
                    return hidden
                }
                update {
                    y real = hidden
                }
            }",
        )
        .unwrap_err();
    assert_eq!(rejected.stage, Stage::SymbolTable);
    assert_eq!(context.logger.count_kind(ErrorKind::UndeclaredIdentifier), 1);
}

#[test]
fn diagnostics_below_the_minimum_level_still_count() {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut context = CompilerContext::initialized(LoggingLevel::Fatal);
    let rejected = ModelParser::new(&mut context)
        .parse_model_str("neuron n { state { x mV = 1 ms } }")
        .unwrap_err();
    assert_eq!(rejected.stage, Stage::TypeChecking);
    assert!(context.logger.has_errors());
    assert_eq!(context.logger.diagnostics().count(), 0);
}

#[test]
fn several_models_in_one_file() {
    let mut context = context();
    let unit = ModelParser::new(&mut context)
        .parse_model_str(
            "neuron a { state { x mV = 0 mV } }
             synapse b { state { x real = 0 } }",
        )
        .unwrap();
    assert_eq!(unit.models.len(), 2);
    let table = unit.symbols.unwrap();
    let x_a = unit.models[0].declarations(BlockRole::State).next().unwrap().symbol;
    let x_b = unit.models[1].declarations(BlockRole::State).next().unwrap().symbol;
    assert_ne!(x_a, x_b);
    assert_eq!(table.symbol(x_b.unwrap()).ty, Some(TypeSymbol::Real));
}

#[test]
fn assigning_a_state_variable_before_its_declaration_is_rejected() {
    let mut context = context();
    let rejected = ModelParser::new(&mut context)
        .parse_model_str("neuron n {\n update {\n V_m = 1 mV\n }\n state {\n V_m mV = 0 mV\n }\n}")
        .unwrap_err();
    assert_eq!(rejected.stage, Stage::SymbolTable);
    assert_eq!(context.logger.count_kind(ErrorKind::UndeclaredIdentifier), 1);
    assert!(context
        .logger
        .has_error_contains("variable 'V_m' not defined yet, it is defined at line 6"));
    let diagnostic = context.logger.diagnostics().next().unwrap();
    assert_eq!(diagnostic.location.start_line, 3);
}
