#[derive(Parser)]
#[grammar = "parser/nestml_grammar.pest"] // relative to src
pub struct NestmlParser;

use pest::error::Error;
use pest::iterators::Pair;
use pest::Parser;

use crate::ast::{
    AssignOp, Assignment, BinaryOp, BlockRole, Call, CompilationUnit, Declaration, EquationBlock,
    EquationItem, Expr, ExprKind, ForStmt, FunctionDecl, Ident, IfStmt, InlineExpr, InputBlock,
    InputPort, KernelDecl, LineIndex, Model, ModelItem, ModelKind, OdeEquation, OutputBlock,
    Param, SignalKind, SourceLocation, Stmt, StmtBlock, StmtKind, Target, TypeOp, TypeRef,
    TypeRefKind, UnaryOp, UnitSuffix, VariableBlock, VariableRef,
};

/// Length of `text` up to the end of its last token. Pest spans of rules
/// that end in an optional part include the whitespace and comments that
/// were skipped before the optional part failed to match.
fn significant_len(text: &str) -> usize {
    let bytes = text.as_bytes();
    let mut end = 0;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b' ' | b'\t' | b'\r' | b'\n' => i += 1,
            b'#' => {
                while i < bytes.len() && bytes[i] != b'\n' {
                    i += 1;
                }
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                i = text[i + 2..]
                    .find("*/")
                    .map_or(bytes.len(), |p| i + 2 + p + 2);
            }
            b'"' => {
                i = text[i + 1..]
                    .find('"')
                    .map_or(bytes.len(), |p| i + 1 + p + 1);
                end = i;
            }
            _ => {
                i += 1;
                end = i;
            }
        }
    }
    end
}

fn parse_exponent(text: &str) -> i32 {
    text.parse().unwrap_or(if text.starts_with('-') {
        i32::MIN
    } else {
        i32::MAX
    })
}

struct AstBuilder<'s> {
    index: LineIndex<'s>,
    bias: SourceLocation,
}

impl<'s> AstBuilder<'s> {
    fn loc(&self, pair: &Pair<Rule>) -> SourceLocation {
        let span = pair.as_span();
        let end = span.start() + significant_len(span.as_str());
        self.index.location(span.start(), end).offset_by(&self.bias)
    }

    // ident      = @{ !keyword ~ (ASCII_ALPHA | "_") ~ ident_char* }
    fn ident(&self, pair: Pair<Rule>) -> Ident {
        Ident::new(pair.as_str(), self.loc(&pair))
    }

    // model      = { model_kind ~ ident ~ "{" ~ model_item* ~ "}" }
    fn model(&self, pair: Pair<Rule>) -> Model {
        let loc = self.loc(&pair);
        let mut inner = pair.into_inner();
        let kind = match inner.next().unwrap().as_str() {
            "synapse" => ModelKind::Synapse,
            _ => ModelKind::Neuron,
        };
        let name = self.ident(inner.next().unwrap());
        let items = inner.map(|item| self.model_item(item)).collect();
        Model {
            kind,
            name,
            items,
            loc,
            scope: None,
            symbol: None,
        }
    }

    fn model_item(&self, pair: Pair<Rule>) -> ModelItem {
        let loc = self.loc(&pair);
        match pair.as_rule() {
            // variable_block = { block_role ~ "{" ~ declaration* ~ "}" }
            Rule::variable_block => {
                let mut inner = pair.into_inner();
                let role = match inner.next().unwrap().as_str() {
                    "state" => BlockRole::State,
                    "parameters" => BlockRole::Parameters,
                    _ => BlockRole::Internals,
                };
                let decls = inner.flat_map(|decl| self.declarations(decl)).collect();
                ModelItem::Variables(VariableBlock { role, decls, loc })
            }

            // equations_block = { "equations" ~ "{" ~ (inline_decl | kernel_decl | ode)* ~ "}" }
            Rule::equations_block => {
                let items = pair
                    .into_inner()
                    .map(|item| self.equation_item(item))
                    .collect();
                ModelItem::Equations(EquationBlock {
                    items,
                    loc,
                    scope: None,
                })
            }

            // update_block = { "update" ~ block }
            Rule::update_block => {
                let mut block = self.block(pair.into_inner().next().unwrap());
                block.loc = loc;
                ModelItem::Update(block)
            }

            // input_block = { "input" ~ "{" ~ input_port* ~ "}" }
            Rule::input_block => {
                let ports = pair.into_inner().map(|port| self.input_port(port)).collect();
                ModelItem::Input(InputBlock { ports, loc })
            }

            // output_block = { "output" ~ "{" ~ signal_kind ~ "}" }
            Rule::output_block => ModelItem::Output(OutputBlock {
                signal: signal_kind(pair.into_inner().next().unwrap()),
                loc,
            }),

            Rule::function_decl => ModelItem::Function(self.function(pair)),

            _ => unreachable!("{:?}", pair.as_rule()),
        }
    }

    // declaration = { ident ~ ("," ~ ident)* ~ data_type ~ ("=" ~ expression)? }
    fn declarations(&self, pair: Pair<Rule>) -> Vec<Declaration> {
        let loc = self.loc(&pair);
        let mut inner = pair.into_inner();
        let mut names = Vec::new();
        while inner.peek().map(|p| p.as_rule()) == Some(Rule::ident) {
            names.push(self.ident(inner.next().unwrap()));
        }
        let data_type = self.data_type(inner.next().unwrap());
        let initializer = inner.next().map(|init| self.expr(init));
        names
            .into_iter()
            .map(|name| Declaration {
                name,
                data_type: data_type.clone(),
                initializer: initializer.clone(),
                loc,
                symbol: None,
            })
            .collect()
    }

    fn equation_item(&self, pair: Pair<Rule>) -> EquationItem {
        let loc = self.loc(&pair);
        let mut inner = pair.clone().into_inner();
        match pair.as_rule() {
            // inline_decl = { "inline" ~ ident ~ data_type ~ "=" ~ expression }
            Rule::inline_decl => EquationItem::Inline(InlineExpr {
                name: self.ident(inner.next().unwrap()),
                data_type: self.data_type(inner.next().unwrap()),
                expr: self.expr(inner.next().unwrap()),
                loc,
                symbol: None,
            }),
            // kernel_decl = { "kernel" ~ ident ~ "=" ~ expression }
            Rule::kernel_decl => EquationItem::Kernel(KernelDecl {
                name: self.ident(inner.next().unwrap()),
                expr: self.expr(inner.next().unwrap()),
                loc,
                symbol: None,
            }),
            // ode = { target ~ "=" ~ expression }
            Rule::ode => EquationItem::Ode(OdeEquation {
                lhs: self.target(inner.next().unwrap()),
                rhs: self.expr(inner.next().unwrap()),
                loc,
            }),
            _ => unreachable!("{:?}", pair.as_rule()),
        }
    }

    // input_port = { ident ~ data_type? ~ "<-" ~ signal_kind }
    fn input_port(&self, pair: Pair<Rule>) -> InputPort {
        let loc = self.loc(&pair);
        let mut inner = pair.into_inner();
        let name = self.ident(inner.next().unwrap());
        let data_type = if inner.peek().map(|p| p.as_rule()) == Some(Rule::data_type) {
            Some(self.data_type(inner.next().unwrap()))
        } else {
            None
        };
        InputPort {
            name,
            data_type,
            signal: signal_kind(inner.next().unwrap()),
            loc,
            symbol: None,
        }
    }

    // function_decl = { "function" ~ ident ~ "(" ~ (param ~ ("," ~ param)*)? ~ ")" ~ data_type? ~ block }
    // param         = { ident ~ data_type }
    fn function(&self, pair: Pair<Rule>) -> FunctionDecl {
        let loc = self.loc(&pair);
        let mut inner = pair.into_inner();
        let name = self.ident(inner.next().unwrap());
        let mut params = Vec::new();
        while inner.peek().map(|p| p.as_rule()) == Some(Rule::param) {
            let mut param = inner.next().unwrap().into_inner();
            params.push(Param {
                name: self.ident(param.next().unwrap()),
                data_type: self.data_type(param.next().unwrap()),
                symbol: None,
            });
        }
        let return_type = if inner.peek().map(|p| p.as_rule()) == Some(Rule::data_type) {
            Some(self.data_type(inner.next().unwrap()))
        } else {
            None
        };
        FunctionDecl {
            name,
            params,
            return_type,
            body: self.block(inner.next().unwrap()),
            loc,
            scope: None,
            symbol: None,
        }
    }

    // block     = { "{" ~ statement* ~ "}" }
    fn block(&self, pair: Pair<Rule>) -> StmtBlock {
        let loc = self.loc(&pair);
        let mut stmts = Vec::new();
        for stmt in pair.into_inner() {
            let stmt_loc = self.loc(&stmt);
            if stmt.as_rule() == Rule::declaration {
                stmts.extend(self.declarations(stmt).into_iter().map(|decl| Stmt {
                    kind: StmtKind::Declaration(decl),
                    loc: stmt_loc,
                }));
            } else {
                stmts.push(Stmt {
                    kind: self.statement(stmt),
                    loc: stmt_loc,
                });
            }
        }
        StmtBlock::new(stmts, loc)
    }

    fn statement(&self, pair: Pair<Rule>) -> StmtKind {
        let rule = pair.as_rule();
        let mut inner = pair.into_inner();
        match rule {
            // assignment  = { target ~ assign_op ~ expression }
            Rule::assignment => {
                let target = self.target(inner.next().unwrap());
                let op = match inner.next().unwrap().as_str() {
                    "+=" => AssignOp::Add,
                    "-=" => AssignOp::Sub,
                    "*=" => AssignOp::Mul,
                    "/=" => AssignOp::Div,
                    _ => AssignOp::Assign,
                };
                let value = self.expr(inner.next().unwrap());
                StmtKind::Assignment(Assignment { target, op, value })
            }

            // call_stmt   = { call ~ !"=" }
            Rule::call_stmt => StmtKind::Call(self.expr(inner.next().unwrap())),

            // return_stmt = { "return" ~ expression? }
            Rule::return_stmt => StmtKind::Return(inner.next().map(|value| self.expr(value))),

            // if_stmt     = { "if" ~ expression ~ block ~ elif_clause* ~ else_clause? }
            // elif_clause = { "elif" ~ expression ~ block }
            // else_clause = { "else" ~ block }
            Rule::if_stmt => {
                let condition = self.expr(inner.next().unwrap());
                let mut branches = vec![(condition, self.block(inner.next().unwrap()))];
                let mut otherwise = None;
                for clause in inner {
                    let rule = clause.as_rule();
                    let mut clause = clause.into_inner();
                    if rule == Rule::elif_clause {
                        let condition = self.expr(clause.next().unwrap());
                        branches.push((condition, self.block(clause.next().unwrap())));
                    } else {
                        otherwise = Some(self.block(clause.next().unwrap()));
                    }
                }
                StmtKind::If(IfStmt {
                    branches,
                    otherwise,
                })
            }

            // while_stmt  = { "while" ~ expression ~ block }
            Rule::while_stmt => StmtKind::While {
                condition: self.expr(inner.next().unwrap()),
                body: self.block(inner.next().unwrap()),
            },

            // for_stmt    = { "for" ~ ident ~ "in" ~ expression ~ "..." ~ expression ~ ("step" ~ expression)? ~ block }
            Rule::for_stmt => {
                let var = self.ident(inner.next().unwrap());
                let from = self.expr(inner.next().unwrap());
                let to = self.expr(inner.next().unwrap());
                let step = if inner.peek().map(|p| p.as_rule()) == Some(Rule::expression) {
                    Some(self.expr(inner.next().unwrap()))
                } else {
                    None
                };
                StmtKind::For(ForStmt {
                    var: Target {
                        name: var.name,
                        order: 0,
                        loc: var.loc,
                        symbol: None,
                    },
                    from,
                    to,
                    step,
                    body: self.block(inner.next().unwrap()),
                })
            }

            _ => unreachable!("{:?}", rule),
        }
    }

    // target      = ${ ident ~ prime* }
    fn target(&self, pair: Pair<Rule>) -> Target {
        let loc = self.loc(&pair);
        let mut inner = pair.into_inner();
        let name = inner.next().unwrap().as_str().to_string();
        Target {
            name,
            order: inner.count() as u32,
            loc,
            symbol: None,
        }
    }

    // data_type   = { type_term }
    fn data_type(&self, pair: Pair<Rule>) -> TypeRef {
        self.type_ref(pair.into_inner().next().unwrap())
    }

    fn type_ref(&self, pair: Pair<Rule>) -> TypeRef {
        let loc = self.loc(&pair);
        match pair.as_rule() {
            // type_term   = { type_factor ~ (type_op ~ type_factor)* }
            Rule::type_term => {
                let mut inner = pair.into_inner();
                let mut head = self.type_ref(inner.next().unwrap());
                while let Some(op) = inner.next() {
                    let op = if op.as_str() == "/" {
                        TypeOp::Div
                    } else {
                        TypeOp::Mul
                    };
                    let rhs = self.type_ref(inner.next().unwrap());
                    let subloc = head.loc.merge(&rhs.loc);
                    head = TypeRef::new(
                        TypeRefKind::Binary {
                            op,
                            left: Box::new(head),
                            right: Box::new(rhs),
                        },
                        subloc,
                    );
                }
                head
            }

            // type_factor = { type_primary ~ ("**" ~ signed_int)? }
            Rule::type_factor => {
                let mut inner = pair.into_inner();
                let base = self.type_ref(inner.next().unwrap());
                match inner.next() {
                    Some(exponent) => TypeRef::new(
                        TypeRefKind::Pow {
                            base: Box::new(base),
                            exponent: parse_exponent(exponent.as_str()),
                        },
                        loc,
                    ),
                    None => base,
                }
            }

            // type_one    = @{ "1" ~ !ASCII_DIGIT }
            Rule::type_one => TypeRef::new(TypeRefKind::One, loc),

            Rule::ident => TypeRef::named(pair.as_str(), loc),

            _ => unreachable!("{:?}", pair.as_rule()),
        }
    }

    // fold `operand (op operand)*` to the left, each node covering both operands
    fn fold_binary(&self, pair: Pair<Rule>) -> Expr {
        let mut inner = pair.into_inner();
        let mut head = self.expr(inner.next().unwrap());
        while let Some(op) = inner.next() {
            let op = BinaryOp::from_symbol(op.as_str()).unwrap();
            let rhs = self.expr(inner.next().unwrap());
            let subloc = head.loc.merge(&rhs.loc);
            head = Expr::new(
                ExprKind::Binary {
                    op,
                    left: Box::new(head),
                    right: Box::new(rhs),
                },
                subloc,
            );
        }
        head
    }

    // prefix operators apply right to left; each node spans from its
    // operator to the end of the operand
    fn fold_prefix(&self, prefixes: Vec<(UnaryOp, SourceLocation)>, operand: Expr) -> Expr {
        prefixes
            .into_iter()
            .rev()
            .fold(operand, |operand, (op, op_loc)| {
                let loc = op_loc.merge(&operand.loc);
                Expr::new(
                    ExprKind::Unary {
                        op,
                        operand: Box::new(operand),
                    },
                    loc,
                )
            })
    }

    fn expr(&self, pair: Pair<Rule>) -> Expr {
        let loc = self.loc(&pair);
        match pair.as_rule() {
            // expression = { logic_or ~ ("?" ~ expression ~ ":" ~ expression)? }
            Rule::expression => {
                let mut inner = pair.into_inner();
                let condition = self.expr(inner.next().unwrap());
                match (inner.next(), inner.next()) {
                    (Some(then), Some(otherwise)) => Expr::new(
                        ExprKind::Ternary {
                            condition: Box::new(condition),
                            then: Box::new(self.expr(then)),
                            otherwise: Box::new(self.expr(otherwise)),
                        },
                        loc,
                    ),
                    _ => condition,
                }
            }

            // logic_or   = { logic_and ~ (or_op ~ logic_and)* }
            // logic_and  = { logic_not ~ (and_op ~ logic_not)* }
            // comparison = { sum ~ (cmp_op ~ sum)* }
            // sum        = { term ~ (sum_op ~ term)* }
            // term       = { unary ~ (term_op ~ unary)* }
            Rule::logic_or | Rule::logic_and | Rule::comparison | Rule::sum | Rule::term => {
                self.fold_binary(pair)
            }

            // logic_not  = { not_op* ~ comparison }
            // unary      = { sign* ~ power }
            Rule::logic_not | Rule::unary => {
                let mut prefixes = Vec::new();
                let mut operand = None;
                for child in pair.into_inner() {
                    match child.as_rule() {
                        Rule::not_op => prefixes.push((UnaryOp::Not, self.loc(&child))),
                        Rule::sign if child.as_str() == "-" => {
                            prefixes.push((UnaryOp::Minus, self.loc(&child)))
                        }
                        Rule::sign => prefixes.push((UnaryOp::Plus, self.loc(&child))),
                        _ => operand = Some(self.expr(child)),
                    }
                }
                self.fold_prefix(prefixes, operand.unwrap())
            }

            // power      = { primary ~ ("**" ~ unary)? }
            Rule::power => {
                let mut inner = pair.into_inner();
                let base = self.expr(inner.next().unwrap());
                match inner.next() {
                    Some(exponent) => {
                        let exponent = self.expr(exponent);
                        let subloc = base.loc.merge(&exponent.loc);
                        Expr::new(
                            ExprKind::Binary {
                                op: BinaryOp::Pow,
                                left: Box::new(base),
                                right: Box::new(exponent),
                            },
                            subloc,
                        )
                    }
                    None => base,
                }
            }

            // literal     = ${ number ~ (inline_ws+ ~ unit_suffix)? }
            // unit_suffix = ${ ident ~ ("**" ~ signed_int)? }
            Rule::literal => {
                let mut inner = pair.into_inner();
                let number = inner.next().unwrap();
                let is_integer = number.as_rule() == Rule::integer;
                let value = number.as_str().parse().unwrap();
                let unit = inner.next().map(|suffix| {
                    let loc = self.loc(&suffix);
                    let mut suffix = suffix.into_inner();
                    UnitSuffix {
                        name: suffix.next().unwrap().as_str().to_string(),
                        exponent: suffix.next().map_or(1, |e| parse_exponent(e.as_str())),
                        loc,
                    }
                });
                Expr::new(
                    ExprKind::Number {
                        value,
                        is_integer,
                        unit,
                    },
                    loc,
                )
            }

            // boolean  = @{ ("true" | "false") ~ !ident_char }
            Rule::boolean => Expr::new(ExprKind::Boolean(pair.as_str() == "true"), loc),

            // string   = ${ "\"" ~ string_inner ~ "\"" }
            Rule::string => {
                let text = pair.into_inner().next().unwrap().as_str().to_string();
                Expr::new(ExprKind::Str(text), loc)
            }

            // variable = ${ ident ~ prime* }
            Rule::variable => {
                let mut inner = pair.into_inner();
                let name = inner.next().unwrap().as_str().to_string();
                Expr::new(
                    ExprKind::Variable(VariableRef {
                        name,
                        order: inner.count() as u32,
                        symbol: None,
                    }),
                    loc,
                )
            }

            // call     = { ident ~ "(" ~ (expression ~ ("," ~ expression)*)? ~ ")" }
            Rule::call => {
                let mut inner = pair.into_inner();
                let name = inner.next().unwrap().as_str().to_string();
                Expr::new(
                    ExprKind::Call(Call {
                        name,
                        args: inner.map(|arg| self.expr(arg)).collect(),
                        symbol: None,
                    }),
                    loc,
                )
            }

            _ => unreachable!("{:?}", pair.as_rule()),
        }
    }
}

fn signal_kind(pair: Pair<Rule>) -> SignalKind {
    if pair.as_str() == "spike" {
        SignalKind::Spike
    } else {
        SignalKind::Continuous
    }
}

/// Parses one source text without recovery. Locations are 1-based and
/// shifted by `bias`.
pub fn parse_with_bias(
    text: &str,
    bias: SourceLocation,
) -> Result<CompilationUnit, Box<Error<Rule>>> {
    let main = NestmlParser::parse(Rule::main, text)
        .map_err(Box::new)?
        .next()
        .unwrap();
    let builder = AstBuilder {
        index: LineIndex::new(text),
        bias,
    };
    let loc = builder.loc(&main);
    let models = main
        .into_inner()
        .take_while(|pair| pair.as_rule() != Rule::EOI)
        .map(|pair| builder.model(pair))
        .collect();
    Ok(CompilationUnit::new(models, loc))
}

pub fn parse_string(text: &str) -> Result<CompilationUnit, Box<Error<Rule>>> {
    parse_with_bias(text, SourceLocation::UNKNOWN)
}

#[cfg(test)]
mod tests {
    use super::{parse_string, parse_with_bias, significant_len};
    use crate::ast::{
        AssignOp, BinaryOp, BlockRole, EquationItem, Expr, ExprKind, ModelItem, ModelKind,
        SignalKind, SourceLocation, StmtKind, TypeRefKind, UnaryOp,
    };

    fn first_initializer(text: &str) -> Expr {
        let unit = parse_string(text).unwrap();
        match &unit.models[0].items[0] {
            ModelItem::Variables(block) => block.decls[0].initializer.clone().unwrap(),
            _ => unreachable!("not a variable block"),
        }
    }

    #[test]
    fn empty_model() {
        let unit = parse_string("neuron empty {}").unwrap();
        assert_eq!(unit.models.len(), 1);
        assert_eq!(unit.models[0].name.name, "empty");
        assert_eq!(unit.models[0].kind, ModelKind::Neuron);
        assert_eq!(unit.models[0].loc, SourceLocation::new(1, 1, 1, 16));
    }

    #[test]
    fn state_block_with_unit_literal() {
        let text = "neuron n {\n    state {\n        V_m mV = -70 mV\n    }\n}\n";
        let unit = parse_string(text).unwrap();
        let model = &unit.models[0];
        assert_eq!(model.loc, SourceLocation::new(1, 1, 5, 2));
        let block = match &model.items[0] {
            ModelItem::Variables(block) => block,
            _ => unreachable!(),
        };
        assert_eq!(block.role, BlockRole::State);
        let decl = &block.decls[0];
        assert_eq!(decl.name.name, "V_m");
        assert_eq!(decl.name.loc, SourceLocation::new(3, 9, 3, 12));
        assert_eq!(decl.loc, SourceLocation::new(3, 9, 3, 24));
        assert!(matches!(&decl.data_type.kind, TypeRefKind::Named(n) if n == "mV"));
        let init = decl.initializer.as_ref().unwrap();
        assert_eq!(init.loc, SourceLocation::new(3, 18, 3, 24));
        match &init.kind {
            ExprKind::Unary {
                op: UnaryOp::Minus,
                operand,
            } => {
                assert!(matches!(
                    &operand.kind,
                    ExprKind::Number { value, is_integer: true, unit: Some(u) } if *value == 70.0 && u.name == "mV"
                ));
            }
            _ => unreachable!("not a negated literal"),
        }
    }

    #[test]
    fn multiple_names_share_type_and_initializer() {
        let unit = parse_string("neuron n { parameters { a, b real = 1.5 } }").unwrap();
        let block = match &unit.models[0].items[0] {
            ModelItem::Variables(block) => block,
            _ => unreachable!(),
        };
        assert_eq!(block.role, BlockRole::Parameters);
        assert_eq!(block.decls.len(), 2);
        assert_eq!(block.decls[1].name.name, "b");
        assert_eq!(block.decls[1].initializer.as_ref().unwrap().to_string(), "1.5");
    }

    #[test]
    fn precedence() {
        let e = first_initializer("neuron n { state { x real = 1 + 2 * 3 ** 2 ** 2 - 4 } }");
        assert_eq!(e.to_string(), "((1 + (2 * (3 ** (2 ** 2)))) - 4)");
        let e = first_initializer("neuron n { state { x real = -y ** 2 } }");
        assert_eq!(e.to_string(), "-(y ** 2)");
        let e = first_initializer("neuron n { state { b boolean = not a and c or d < 1 } }");
        assert_eq!(e.to_string(), "((not a and c) or (d < 1))");
        let e = first_initializer("neuron n { state { x real = c ? 1 : 2 } }");
        assert!(matches!(e.kind, ExprKind::Ternary { .. }));
    }

    #[test]
    fn folded_operators_span_their_operands() {
        let e = first_initializer("neuron n { state { x real = a + b + c } }");
        assert_eq!(e.loc, SourceLocation::new(1, 29, 1, 38));
        if let ExprKind::Binary { op, left, right } = &e.kind {
            assert_eq!(*op, BinaryOp::Add);
            assert_eq!(left.loc, SourceLocation::new(1, 29, 1, 34));
            assert_eq!(right.loc, SourceLocation::new(1, 37, 1, 38));
        } else {
            unreachable!("not a binary expression")
        }
    }

    #[test]
    fn unit_suffix_with_exponent() {
        let e = first_initializer("neuron n { state { r 1/ms = 2.5 ms**-1 } }");
        match &e.kind {
            ExprKind::Number {
                value,
                is_integer,
                unit: Some(unit),
            } => {
                assert_eq!(*value, 2.5);
                assert!(!is_integer);
                assert_eq!(unit.name, "ms");
                assert_eq!(unit.exponent, -1);
            }
            _ => unreachable!("not a literal"),
        }
    }

    #[test]
    fn unit_suffix_stays_on_its_line() {
        let text = "neuron n {\n state {\n  a integer = 1\n  b mV = 2 mV\n }\n}";
        let unit = parse_string(text).unwrap();
        let block = match &unit.models[0].items[0] {
            ModelItem::Variables(block) => block,
            _ => unreachable!(),
        };
        assert_eq!(block.decls.len(), 2);
        assert_eq!(block.decls[0].loc, SourceLocation::new(3, 3, 3, 16));
    }

    #[test]
    fn equations_and_derivatives() {
        let text = "
        neuron n {
            equations {
                kernel g = exp(-t / tau)
                inline I pA = g * 1 pA
                V_m'' = -V_m' / tau
            }
        }";
        let unit = parse_string(text).unwrap();
        let block = match &unit.models[0].items[0] {
            ModelItem::Equations(block) => block,
            _ => unreachable!(),
        };
        assert!(matches!(&block.items[0], EquationItem::Kernel(k) if k.name.name == "g"));
        assert!(matches!(&block.items[1], EquationItem::Inline(i) if i.name.name == "I"));
        match &block.items[2] {
            EquationItem::Ode(ode) => {
                assert_eq!(ode.lhs.name, "V_m");
                assert_eq!(ode.lhs.order, 2);
                assert_eq!(ode.rhs.to_string(), "(-V_m' / tau)");
            }
            _ => unreachable!("not an ode"),
        }
    }

    #[test]
    fn statements() {
        let text = "
        neuron n {
            update {
                x real = 0
                x += 1
                integrate_odes()
                if x > 1 {
                    x = 0
                } elif x < 0 {
                    x = 1
                } else {
                    emit_spike()
                }
                while x < 10 {
                    x *= 2
                }
                for i in 0 ... 10 step 2 {
                    print(\"loop\")
                }
            }
            function f(a mV, b ms) mV {
                return a
            }
        }";
        let unit = parse_string(text).unwrap();
        let update = match &unit.models[0].items[0] {
            ModelItem::Update(block) => block,
            _ => unreachable!(),
        };
        assert_eq!(update.stmts.len(), 6);
        assert!(matches!(&update.stmts[0].kind, StmtKind::Declaration(d) if d.name.name == "x"));
        assert!(
            matches!(&update.stmts[1].kind, StmtKind::Assignment(a) if a.op == AssignOp::Add)
        );
        assert!(matches!(&update.stmts[2].kind, StmtKind::Call(_)));
        match &update.stmts[3].kind {
            StmtKind::If(stmt) => {
                assert_eq!(stmt.branches.len(), 2);
                assert!(stmt.otherwise.is_some());
            }
            _ => unreachable!("not an if"),
        }
        assert!(matches!(&update.stmts[4].kind, StmtKind::While { .. }));
        match &update.stmts[5].kind {
            StmtKind::For(stmt) => {
                assert_eq!(stmt.var.name, "i");
                assert!(stmt.step.is_some());
            }
            _ => unreachable!("not a for loop"),
        }
        match &unit.models[0].items[1] {
            ModelItem::Function(f) => {
                assert_eq!(f.name.name, "f");
                assert_eq!(f.params.len(), 2);
                assert!(f.return_type.is_some());
                assert!(matches!(f.body.stmts[0].kind, StmtKind::Return(Some(_))));
            }
            _ => unreachable!("not a function"),
        }
    }

    #[test]
    fn ports_comments_and_synapses() {
        let text = "
        # leading comment
        synapse stdp {
            /* block
               comment */
            input {
                pre_spikes <- spike   # trailing comment
                I_stim pA <- continuous
            }
            output { spike }
        }";
        let unit = parse_string(text).unwrap();
        let model = &unit.models[0];
        assert_eq!(model.kind, ModelKind::Synapse);
        match &model.items[0] {
            ModelItem::Input(block) => {
                assert_eq!(block.ports.len(), 2);
                assert!(block.ports[0].data_type.is_none());
                assert_eq!(block.ports[1].signal, SignalKind::Continuous);
                assert_eq!(block.ports[0].loc.end_line, block.ports[0].loc.start_line);
            }
            _ => unreachable!(),
        }
        assert!(matches!(&model.items[1], ModelItem::Output(o) if o.signal == SignalKind::Spike));
    }

    #[test]
    fn keywords_are_not_identifiers() {
        assert!(parse_string("neuron n { state { if real = 1 } }").is_err());
        assert!(parse_string("neuron n { update { returned = 1 } }").is_ok());
        assert!(parse_string("neuron n { state { x real = 1 + } }").is_err());
    }

    #[test]
    fn bias_shifts_locations() {
        let bias = SourceLocation::new(10, 4, 10, 4);
        let unit = parse_with_bias("neuron n {\n}", bias).unwrap();
        assert_eq!(unit.models[0].loc, SourceLocation::new(11, 5, 12, 2));
    }

    #[test]
    fn trailing_trivia_is_not_significant() {
        assert_eq!(significant_len("x real  # note\n  "), 6);
        assert_eq!(significant_len("a /* c */ "), 1);
        assert_eq!(significant_len("\"# not a comment\" "), 17);
    }
}
