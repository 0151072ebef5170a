use std::collections::HashSet;
use std::fs;
use std::path::Path;

use itertools::Itertools;
use log::{debug, info};
use pest::error::{ErrorVariant, LineColLocation};

pub mod nestml_parser;
pub use nestml_parser::{parse_string, parse_with_bias, NestmlParser, Rule};

use crate::ast::{CompilationUnit, LineIndex, SourceLocation};
use crate::error::FrontendError;
use crate::logger::{Logger, LoggingLevel};

fn describe_rule(rule: &Rule) -> &'static str {
    match rule {
        Rule::ident => "identifier",
        Rule::keyword => "keyword",
        Rule::signed_int | Rule::integer => "integer",
        Rule::literal | Rule::float => "number",
        Rule::main | Rule::model => "model",
        Rule::model_kind => "`neuron` or `synapse`",
        Rule::block_role => "block name",
        Rule::variable_block
        | Rule::equations_block
        | Rule::update_block
        | Rule::input_block
        | Rule::output_block => "model block",
        Rule::function_decl => "function",
        Rule::param => "parameter",
        Rule::declaration => "declaration",
        Rule::inline_decl => "inline expression",
        Rule::kernel_decl => "kernel",
        Rule::ode => "equation",
        Rule::input_port => "input port",
        Rule::signal_kind => "`spike` or `continuous`",
        Rule::block => "block",
        Rule::target | Rule::variable => "variable",
        Rule::prime => "`'`",
        Rule::assignment => "assignment",
        Rule::assign_op => "`=`",
        Rule::call_stmt | Rule::call => "function call",
        Rule::return_stmt => "`return`",
        Rule::if_stmt => "`if`",
        Rule::elif_clause => "`elif`",
        Rule::else_clause => "`else`",
        Rule::while_stmt => "`while`",
        Rule::for_stmt => "`for`",
        Rule::data_type | Rule::type_term | Rule::type_factor | Rule::type_one => "data type",
        Rule::type_op => "`*` or `/`",
        Rule::expression
        | Rule::logic_or
        | Rule::logic_and
        | Rule::logic_not
        | Rule::comparison
        | Rule::sum
        | Rule::term
        | Rule::unary
        | Rule::power => "expression",
        Rule::or_op
        | Rule::and_op
        | Rule::not_op
        | Rule::cmp_op
        | Rule::sum_op
        | Rule::term_op
        | Rule::sign => "operator",
        Rule::boolean => "`true` or `false`",
        Rule::string | Rule::string_inner => "string",
        Rule::unit_suffix => "unit",
        Rule::EOI => "end of input",
        _ => "valid input",
    }
}

/// "a", "a or b", "a, b or c"
fn enumerate(terms: &[&str]) -> String {
    match terms {
        [] => String::new(),
        [only] => only.to_string(),
        [init @ .., last] => format!("{} or {last}", init.iter().join(", ")),
    }
}

fn syntax_message(err: &pest::error::Error<Rule>) -> String {
    match &err.variant {
        ErrorVariant::ParsingError { positives, negatives } => {
            let expected: Vec<&str> = positives.iter().map(describe_rule).unique().collect();
            let unexpected: Vec<&str> = negatives.iter().map(describe_rule).unique().collect();
            match (expected.is_empty(), unexpected.is_empty()) {
                (false, _) => format!("expected {}", enumerate(&expected)),
                (true, false) => format!("unexpected {}", enumerate(&unexpected)),
                (true, true) => "unexpected input".to_string(),
            }
        }
        ErrorVariant::CustomError { message } => message.clone(),
    }
}

/// byte offsets of the braces that delimit blocks, skipping strings and
/// comments
fn block_braces(text: &str) -> Vec<(usize, char)> {
    let mut braces = Vec::new();
    let mut chars = text.char_indices().peekable();
    while let Some((at, c)) = chars.next() {
        match c {
            '{' | '}' => braces.push((at, c)),
            '"' => {
                for (_, c) in chars.by_ref() {
                    if c == '"' {
                        break;
                    }
                }
            }
            '#' => {
                for (_, c) in chars.by_ref() {
                    if c == '\n' {
                        break;
                    }
                }
            }
            '/' if chars.peek().is_some_and(|&(_, next)| next == '*') => {
                chars.next();
                let mut star = false;
                for (_, c) in chars.by_ref() {
                    if star && c == '/' {
                        break;
                    }
                    star = c == '*';
                }
            }
            _ => (),
        }
    }
    braces
}

/// Blanks `line` so the text can be parsed again without it, keeping the
/// newline. Brace balance is kept: a `}` closing a block opened on an
/// earlier line stays, and a block opened on this line loses its closer
/// too. Returns false if nothing changed.
fn blank_line(source: &mut String, line: usize) -> bool {
    let range = LineIndex::new(source).line_range(line as u32);
    let Some((start, end)) = range else {
        return false;
    };
    if source[start..end].trim().is_empty() {
        return false;
    }
    let mut outer = 0usize;
    let mut opened = 0usize;
    let mut inner = 0usize;
    let mut kept = Vec::new();
    let mut orphaned = Vec::new();
    for (at, brace) in block_braces(source) {
        if at < start {
            match brace {
                '{' => outer += 1,
                _ => outer = outer.saturating_sub(1),
            }
        } else if at < end {
            match brace {
                '{' => opened += 1,
                _ if opened > 0 => opened -= 1,
                _ if outer > 0 => {
                    outer -= 1;
                    kept.push(at);
                }
                _ => (),
            }
        } else if opened == 0 {
            break;
        } else {
            match brace {
                '{' => inner += 1,
                _ if inner > 0 => inner -= 1,
                _ => {
                    opened -= 1;
                    orphaned.push(at);
                }
            }
        }
    }
    let blanked: String = source[start..end]
        .char_indices()
        .map(|(i, c)| if kept.contains(&(start + i)) { c } else { ' ' })
        .collect();
    if blanked == source[start..end] && orphaned.is_empty() {
        return false;
    }
    for at in orphaned.into_iter().rev() {
        source.replace_range(at..at + 1, " ");
    }
    source.replace_range(start..end, &blanked);
    true
}

/// Parses `text`, reporting every syntax error to `logger`.
///
/// After an error the offending line is blanked and the text parsed again,
/// at most once per line, so independent errors on different lines are
/// all reported in one pass. Returns `None` if any syntax error was found.
pub fn parse_text(text: &str, bias: SourceLocation, logger: &mut Logger) -> Option<CompilationUnit> {
    let mut source = text.to_string();
    let mut blanked = HashSet::new();
    let mut errors = 0;
    let line_count = LineIndex::new(text).line_count();
    for _ in 0..=line_count {
        let err = match parse_with_bias(&source, bias) {
            Ok(unit) if errors == 0 => {
                info!("parsed {} model(s)", unit.models.len());
                return Some(unit);
            }
            Ok(_) => break,
            Err(err) => err,
        };
        errors += 1;
        let (line, col) = match err.line_col {
            LineColLocation::Pos(pos) => pos,
            LineColLocation::Span(start, _) => start,
        };
        let loc = SourceLocation::new(line as u32, col as u32, line as u32, col as u32)
            .offset_by(&bias);
        logger.report_error(FrontendError::Syntax(syntax_message(&err)), loc);
        if !blanked.insert(line) || !blank_line(&mut source, line) {
            break;
        }
        debug!("retrying parse with line {} blanked", line);
    }
    None
}

/// Reads and parses a model file. A file that cannot be read is reported as
/// a fatal diagnostic.
pub fn parse_file(path: &Path, bias: SourceLocation, logger: &mut Logger) -> Option<CompilationUnit> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) => {
            logger.report_error_at(
                LoggingLevel::Fatal,
                FrontendError::Io {
                    path: path.display().to_string(),
                    message: err.to_string(),
                },
                SourceLocation::UNKNOWN,
            );
            return None;
        }
    };
    let mut unit = parse_text(&text, bias, logger)?;
    unit.source_path = Some(path.to_path_buf());
    Some(unit)
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::{blank_line, parse_file, parse_text};
    use crate::ast::SourceLocation;
    use crate::error::ErrorKind;
    use crate::logger::{Logger, LoggingLevel};

    fn logger() -> Logger {
        let _ = env_logger::builder().is_test(true).try_init();
        let mut logger = Logger::new();
        logger.init(LoggingLevel::Info);
        logger
    }

    #[test]
    fn valid_text_yields_a_unit() {
        let mut logger = logger();
        let unit = parse_text("neuron a {}\nsynapse b {}", SourceLocation::UNKNOWN, &mut logger);
        assert_eq!(unit.unwrap().models.len(), 2);
        assert!(!logger.has_errors());
    }

    #[test]
    fn independent_errors_are_all_reported() {
        let text = "neuron n {\n  state {\n    x real = @\n    y real = 2\n    z real = @\n  }\n}\n";
        let mut logger = logger();
        let unit = parse_text(text, SourceLocation::UNKNOWN, &mut logger);
        assert!(unit.is_none());
        assert_eq!(logger.count_kind(ErrorKind::Syntax), 2);
        let lines: Vec<u32> = logger
            .diagnostics()
            .map(|d| d.location.start_line)
            .collect();
        assert_eq!(lines, vec![3, 5]);
    }

    #[test]
    fn recovery_terminates_on_unbalanced_braces() {
        let mut logger = logger();
        let unit = parse_text("neuron n {\n  state {\n", SourceLocation::UNKNOWN, &mut logger);
        assert!(unit.is_none());
        assert!(logger.has_errors());
        assert!(logger.error_count() <= 3);
    }

    #[test]
    fn syntax_errors_are_shifted_by_the_bias() {
        let mut logger = logger();
        let bias = SourceLocation::new(20, 0, 20, 0);
        parse_text("neuron {}", bias, &mut logger);
        let first = logger.diagnostics().next().unwrap();
        assert_eq!(first.location.start_line, 21);
        assert!(first.message.contains("identifier"));
    }

    #[test]
    fn error_in_a_block_header_is_reported_once() {
        let text = "neuron n {\n  state {\n    x real = 0\n  }\n  update {\n    if x > @ {\n      x = 1\n    }\n  }\n}\n";
        let mut logger = logger();
        let unit = parse_text(text, SourceLocation::UNKNOWN, &mut logger);
        assert!(unit.is_none());
        assert_eq!(logger.count_kind(ErrorKind::Syntax), 1);
        assert_eq!(logger.error_count(), 1);
        let diagnostic = logger.diagnostics().next().unwrap();
        assert_eq!(diagnostic.location.start_line, 6);
        assert!(diagnostic.message.contains("expected expression"), "{}", diagnostic.message);
    }

    #[test]
    fn messages_name_constructs_not_grammar_rules() {
        let mut first = logger();
        parse_text("neuron n {}\nfoo", SourceLocation::UNKNOWN, &mut first);
        let message = &first.diagnostics().next().unwrap().message;
        assert!(message.contains("`neuron` or `synapse`"), "{message}");
        assert!(!message.contains("model kind"), "{message}");

        let mut second = logger();
        parse_text("neuron n { update { x = 1 + } }", SourceLocation::UNKNOWN, &mut second);
        let message = &second.diagnostics().next().unwrap().message;
        assert!(message.contains("expression"), "{message}");
        assert!(!message.contains("unary"), "{message}");
    }

    #[test]
    fn blanking_keeps_braces_balanced() {
        let mut source = "a {\n b = @ {\n c\n }\n}".to_string();
        assert!(blank_line(&mut source, 2));
        assert_eq!(source, "a {\n        \n c\n  \n}");

        let mut source = "a {\n x @ }\n\"}\" # }\n".to_string();
        assert!(blank_line(&mut source, 2));
        assert_eq!(source, "a {\n     }\n\"}\" # }\n");
        // a lone closer of an earlier block is all that is left
        assert!(!blank_line(&mut source, 2));
    }

    #[test]
    fn blanking_keeps_newlines() {
        let mut source = "a\nbcé\nd".to_string();
        assert!(blank_line(&mut source, 2));
        assert_eq!(source, "a\n   \nd");
        assert!(!blank_line(&mut source, 2));
        assert!(!blank_line(&mut source, 9));
    }

    #[test]
    fn missing_file_is_fatal() {
        let mut logger = logger();
        let unit = parse_file(Path::new("models/does_not_exist.nestml"), SourceLocation::UNKNOWN, &mut logger);
        assert!(unit.is_none());
        assert_eq!(logger.count_kind(ErrorKind::Io), 1);
        assert_eq!(logger.diagnostics().next().unwrap().level, LoggingLevel::Fatal);
    }
}
