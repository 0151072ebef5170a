pub mod expr;
pub mod location;
pub mod model;

pub use expr::{
    BinaryOp, Call, Expr, ExprKind, Ident, TypeOp, TypeRef, TypeRefKind, UnaryOp, UnitSuffix,
    VariableRef,
};
pub use location::{LineIndex, SourceLocation};
pub use model::{
    AssignOp, Assignment, BlockRole, CompilationState, CompilationUnit, Declaration,
    EquationBlock, EquationItem, ForStmt, FunctionDecl, IfStmt, InlineExpr, InputBlock,
    InputPort, KernelDecl, Model, ModelItem, ModelKind, OdeEquation, OutputBlock, Param,
    SignalKind, Stmt, StmtBlock, StmtKind, Target, VariableBlock,
};
