use std::fmt;
use std::path::PathBuf;

use super::{Expr, Ident, SourceLocation, TypeRef};
use crate::symbol_table::{ScopeId, SymbolId, SymbolTable};

/// Lifecycle of a compilation unit through the front end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompilationState {
    Unparsed,
    Parsed,
    ScopesBuilt,
    TypeChecked,
    Validated,
    Rejected,
}

/// Root of the tree: all models of one source file.
#[derive(Debug, Clone)]
pub struct CompilationUnit {
    pub models: Vec<Model>,
    pub loc: SourceLocation,
    pub state: CompilationState,
    pub symbols: Option<SymbolTable>,
    pub source_path: Option<PathBuf>,
}

impl CompilationUnit {
    pub fn new(models: Vec<Model>, loc: SourceLocation) -> Self {
        Self {
            models,
            loc,
            state: CompilationState::Parsed,
            symbols: None,
            source_path: None,
        }
    }

    pub fn model(&self, name: &str) -> Option<&Model> {
        self.models.iter().find(|m| m.name.name == name)
    }

    /// every expression of the unit, in source order, parents before children
    pub fn expressions(&self) -> Vec<&Expr> {
        let mut out = Vec::new();
        for model in &self.models {
            model.for_each_expr(&mut |e| out.push(e));
        }
        out
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelKind {
    Neuron,
    Synapse,
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ModelKind::Neuron => write!(f, "neuron"),
            ModelKind::Synapse => write!(f, "synapse"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Model {
    pub kind: ModelKind,
    pub name: Ident,
    pub items: Vec<ModelItem>,
    pub loc: SourceLocation,
    pub scope: Option<ScopeId>,
    pub symbol: Option<SymbolId>,
}

impl Model {
    pub fn variable_blocks(&self) -> impl Iterator<Item = &VariableBlock> + '_ {
        self.items.iter().filter_map(|item| match item {
            ModelItem::Variables(block) => Some(block),
            _ => None,
        })
    }

    pub fn declarations(&self, role: BlockRole) -> impl Iterator<Item = &Declaration> + '_ {
        self.variable_blocks()
            .filter(move |b| b.role == role)
            .flat_map(|b| b.decls.iter())
    }

    pub fn equations(&self) -> impl Iterator<Item = &EquationBlock> + '_ {
        self.items.iter().filter_map(|item| match item {
            ModelItem::Equations(block) => Some(block),
            _ => None,
        })
    }

    pub fn functions(&self) -> impl Iterator<Item = &FunctionDecl> + '_ {
        self.items.iter().filter_map(|item| match item {
            ModelItem::Function(function) => Some(function),
            _ => None,
        })
    }

    pub fn for_each_expr<'a>(&'a self, f: &mut impl FnMut(&'a Expr)) {
        for item in &self.items {
            match item {
                ModelItem::Variables(block) => {
                    for decl in &block.decls {
                        decl.for_each_expr(f);
                    }
                }
                ModelItem::Equations(block) => {
                    for eq in &block.items {
                        match eq {
                            EquationItem::Ode(ode) => ode.rhs.walk(f),
                            EquationItem::Inline(inline) => inline.expr.walk(f),
                            EquationItem::Kernel(kernel) => kernel.expr.walk(f),
                        }
                    }
                }
                ModelItem::Update(block) => block.for_each_expr(f),
                ModelItem::Function(function) => function.body.for_each_expr(f),
                ModelItem::Input(_) | ModelItem::Output(_) => (),
            }
        }
    }
}

#[derive(Debug, Clone)]
pub enum ModelItem {
    Variables(VariableBlock),
    Equations(EquationBlock),
    Update(StmtBlock),
    Input(InputBlock),
    Output(OutputBlock),
    Function(FunctionDecl),
}

impl ModelItem {
    pub fn loc(&self) -> SourceLocation {
        match self {
            ModelItem::Variables(b) => b.loc,
            ModelItem::Equations(b) => b.loc,
            ModelItem::Update(b) => b.loc,
            ModelItem::Input(b) => b.loc,
            ModelItem::Output(b) => b.loc,
            ModelItem::Function(f) => f.loc,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockRole {
    State,
    Parameters,
    Internals,
}

impl fmt::Display for BlockRole {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            BlockRole::State => write!(f, "state"),
            BlockRole::Parameters => write!(f, "parameters"),
            BlockRole::Internals => write!(f, "internals"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct VariableBlock {
    pub role: BlockRole,
    pub decls: Vec<Declaration>,
    pub loc: SourceLocation,
}

/// `name type [= initializer]`; `a, b real = 1` becomes one declaration per
/// name, each with its own copy of the initializer.
#[derive(Debug, Clone)]
pub struct Declaration {
    pub name: Ident,
    pub data_type: TypeRef,
    pub initializer: Option<Expr>,
    pub loc: SourceLocation,
    pub symbol: Option<SymbolId>,
}

impl Declaration {
    fn for_each_expr<'a>(&'a self, f: &mut impl FnMut(&'a Expr)) {
        if let Some(init) = &self.initializer {
            init.walk(f);
        }
    }
}

impl fmt::Display for Declaration {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} {}", self.name, self.data_type)?;
        if let Some(init) = &self.initializer {
            write!(f, " = {init}")?;
        }
        Ok(())
    }
}

/// Left-hand side of an assignment or ODE, or a loop variable.
#[derive(Debug, Clone)]
pub struct Target {
    pub name: String,
    pub order: u32,
    pub loc: SourceLocation,
    pub symbol: Option<SymbolId>,
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}{}", self.name, "'".repeat(self.order as usize))
    }
}

#[derive(Debug, Clone)]
pub struct EquationBlock {
    pub items: Vec<EquationItem>,
    pub loc: SourceLocation,
    pub scope: Option<ScopeId>,
}

#[derive(Debug, Clone)]
pub enum EquationItem {
    Ode(OdeEquation),
    Inline(InlineExpr),
    Kernel(KernelDecl),
}

#[derive(Debug, Clone)]
pub struct OdeEquation {
    pub lhs: Target,
    pub rhs: Expr,
    pub loc: SourceLocation,
}

#[derive(Debug, Clone)]
pub struct InlineExpr {
    pub name: Ident,
    pub data_type: TypeRef,
    pub expr: Expr,
    pub loc: SourceLocation,
    pub symbol: Option<SymbolId>,
}

#[derive(Debug, Clone)]
pub struct KernelDecl {
    pub name: Ident,
    pub expr: Expr,
    pub loc: SourceLocation,
    pub symbol: Option<SymbolId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalKind {
    Spike,
    Continuous,
}

#[derive(Debug, Clone)]
pub struct InputBlock {
    pub ports: Vec<InputPort>,
    pub loc: SourceLocation,
}

#[derive(Debug, Clone)]
pub struct InputPort {
    pub name: Ident,
    pub data_type: Option<TypeRef>,
    pub signal: SignalKind,
    pub loc: SourceLocation,
    pub symbol: Option<SymbolId>,
}

#[derive(Debug, Clone)]
pub struct OutputBlock {
    pub signal: SignalKind,
    pub loc: SourceLocation,
}

#[derive(Debug, Clone)]
pub struct Param {
    pub name: Ident,
    pub data_type: TypeRef,
    pub symbol: Option<SymbolId>,
}

#[derive(Debug, Clone)]
pub struct FunctionDecl {
    pub name: Ident,
    pub params: Vec<Param>,
    pub return_type: Option<TypeRef>,
    pub body: StmtBlock,
    pub loc: SourceLocation,
    pub scope: Option<ScopeId>,
    pub symbol: Option<SymbolId>,
}

#[derive(Debug, Clone)]
pub struct StmtBlock {
    pub stmts: Vec<Stmt>,
    pub loc: SourceLocation,
    pub scope: Option<ScopeId>,
}

impl StmtBlock {
    pub fn new(stmts: Vec<Stmt>, loc: SourceLocation) -> Self {
        Self {
            stmts,
            loc,
            scope: None,
        }
    }

    fn for_each_expr<'a>(&'a self, f: &mut impl FnMut(&'a Expr)) {
        for stmt in &self.stmts {
            match &stmt.kind {
                StmtKind::Declaration(decl) => decl.for_each_expr(f),
                StmtKind::Assignment(assign) => assign.value.walk(f),
                StmtKind::Call(call) => call.walk(f),
                StmtKind::Return(value) => {
                    if let Some(value) = value {
                        value.walk(f);
                    }
                }
                StmtKind::If(stmt) => {
                    for (condition, block) in &stmt.branches {
                        condition.walk(f);
                        block.for_each_expr(f);
                    }
                    if let Some(block) = &stmt.otherwise {
                        block.for_each_expr(f);
                    }
                }
                StmtKind::While { condition, body } => {
                    condition.walk(f);
                    body.for_each_expr(f);
                }
                StmtKind::For(stmt) => {
                    stmt.from.walk(f);
                    stmt.to.walk(f);
                    if let Some(step) = &stmt.step {
                        step.walk(f);
                    }
                    stmt.body.for_each_expr(f);
                }
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct Stmt {
    pub kind: StmtKind,
    pub loc: SourceLocation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Assign,
    Add,
    Sub,
    Mul,
    Div,
}

impl fmt::Display for AssignOp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let op = match self {
            AssignOp::Assign => "=",
            AssignOp::Add => "+=",
            AssignOp::Sub => "-=",
            AssignOp::Mul => "*=",
            AssignOp::Div => "/=",
        };
        write!(f, "{op}")
    }
}

#[derive(Debug, Clone)]
pub struct Assignment {
    pub target: Target,
    pub op: AssignOp,
    pub value: Expr,
}

/// `if`, any number of `elif` branches and an optional `else`.
#[derive(Debug, Clone)]
pub struct IfStmt {
    pub branches: Vec<(Expr, StmtBlock)>,
    pub otherwise: Option<StmtBlock>,
}

/// `for i in from ... to step s { }`
#[derive(Debug, Clone)]
pub struct ForStmt {
    pub var: Target,
    pub from: Expr,
    pub to: Expr,
    pub step: Option<Expr>,
    pub body: StmtBlock,
}

#[derive(Debug, Clone)]
pub enum StmtKind {
    Declaration(Declaration),
    Assignment(Assignment),
    /// a call used as a statement, always an `ExprKind::Call`
    Call(Expr),
    Return(Option<Expr>),
    If(IfStmt),
    While { condition: Expr, body: StmtBlock },
    For(ForStmt),
}
