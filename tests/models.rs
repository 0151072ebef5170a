use std::fs;
use std::path::{Path, PathBuf};
use std::thread;

use nestml::{CompilationState, CompilerContext, ErrorKind, LoggingLevel, ModelParser, Stage};

fn context() -> CompilerContext {
    let _ = env_logger::builder().is_test(true).try_init();
    CompilerContext::initialized(LoggingLevel::Info)
}

fn nestml_files(dir: &str) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = fs::read_dir(Path::new(env!("CARGO_MANIFEST_DIR")).join(dir))
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "nestml"))
        .collect();
    files.sort();
    files
}

fn invalid(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("models/invalid")
        .join(name)
}

#[test]
fn every_sample_model_is_valid() {
    let files = nestml_files("models");
    assert_eq!(files.len(), 4);
    let context = context();
    for file in files {
        let mut context = context.fork();
        let result = ModelParser::new(&mut context).parse_model(&file);
        assert!(
            !context.logger.has_errors(),
            "{}:\n{}",
            file.display(),
            context.logger.as_error_message()
        );
        let unit = result.unwrap();
        assert_eq!(unit.state, CompilationState::Validated);
        assert_eq!(unit.source_path.as_deref(), Some(file.as_path()));
        assert!(!unit.models.is_empty());
        assert!(unit.expressions().iter().all(|e| e.ty.is_some()));
    }
}

#[test]
fn sample_models_contain_neurons_and_synapses() {
    let mut context = context();
    let mut parser = ModelParser::new(&mut context);
    let stdp = parser
        .parse_model(&Path::new(env!("CARGO_MANIFEST_DIR")).join("models/stdp_synapse.nestml"))
        .unwrap();
    assert_eq!(stdp.models[0].kind.to_string(), "synapse");
    let iaf = parser
        .parse_model(&Path::new(env!("CARGO_MANIFEST_DIR")).join("models/iaf_psc_exp.nestml"))
        .unwrap();
    assert!(iaf.model("iaf_psc_exp").is_some());
}

#[test]
fn duplicate_declaration_file_is_rejected() {
    let mut context = context();
    let rejected = ModelParser::new(&mut context)
        .parse_model(&invalid("duplicate_declaration.nestml"))
        .unwrap_err();
    assert_eq!(rejected.stage, Stage::SymbolTable);
    assert_eq!(rejected.errors, 1);
    assert_eq!(context.logger.count_kind(ErrorKind::DuplicateDeclaration), 1);
    let diagnostic = context.logger.diagnostics().next().unwrap();
    assert_eq!(diagnostic.location.start_line, 4);
    assert!(diagnostic.message.contains("V_m"));
}

#[test]
fn unit_mismatch_file_is_rejected() {
    let mut context = context();
    let rejected = ModelParser::new(&mut context)
        .parse_model(&invalid("unit_mismatch.nestml"))
        .unwrap_err();
    assert_eq!(rejected.stage, Stage::TypeChecking);
    assert_eq!(context.logger.count_kind(ErrorKind::UnitMismatch), 1);
    assert_eq!(context.logger.error_count(), 1);
}

#[test]
fn independent_syntax_errors_are_all_reported() {
    let mut context = context();
    let rejected = ModelParser::new(&mut context)
        .parse_model(&invalid("syntax_errors.nestml"))
        .unwrap_err();
    assert_eq!(rejected.stage, Stage::Parsing);
    assert_eq!(context.logger.count_kind(ErrorKind::Syntax), 2);
    let lines: Vec<u32> = context
        .logger
        .sorted_diagnostics()
        .iter()
        .map(|d| d.location.start_line)
        .collect();
    assert_eq!(lines, vec![3, 7]);
}

#[test]
fn checking_is_deterministic() {
    let context = context();
    for file in nestml_files("models") {
        let mut first = context.fork();
        let mut second = context.fork();
        let a = ModelParser::new(&mut first).parse_model(&file).unwrap();
        let b = ModelParser::new(&mut second).parse_model(&file).unwrap();
        assert_eq!(a.symbols, b.symbols, "{}", file.display());
        assert_eq!(
            first.logger.sorted_diagnostics(),
            second.logger.sorted_diagnostics()
        );
    }
}

#[test]
fn forked_contexts_check_files_concurrently() {
    let context = context();
    let files = nestml_files("models");
    let sequential: Vec<_> = files
        .iter()
        .map(|file| {
            let mut context = context.fork();
            ModelParser::new(&mut context).parse_model(file).unwrap().symbols
        })
        .collect();

    let concurrent: Vec<_> = thread::scope(|s| {
        let handles: Vec<_> = files
            .iter()
            .map(|file| {
                let mut context = context.fork();
                s.spawn(move || {
                    let unit = ModelParser::new(&mut context).parse_model(file);
                    (unit.map(|u| u.symbols), context.logger.has_errors())
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    for (expected, (result, has_errors)) in sequential.into_iter().zip(concurrent) {
        assert!(!has_errors);
        assert_eq!(result.unwrap(), expected);
    }
}
