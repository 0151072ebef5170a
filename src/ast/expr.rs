use std::fmt;

use super::SourceLocation;
use crate::symbol_table::SymbolId;
use crate::units::TypeSymbol;

#[derive(Debug, Clone, PartialEq)]
pub struct Ident {
    pub name: String,
    pub loc: SourceLocation,
}

impl Ident {
    pub fn new(name: &str, loc: SourceLocation) -> Self {
        Self {
            name: name.to_string(),
            loc,
        }
    }
}

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Plus,
    Minus,
    Not,
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            UnaryOp::Plus => write!(f, "+"),
            UnaryOp::Minus => write!(f, "-"),
            UnaryOp::Not => write!(f, "not "),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    And,
    Or,
}

impl BinaryOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Pow => "**",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
        }
    }

    pub fn from_symbol(op: &str) -> Option<Self> {
        let op = match op {
            "+" => BinaryOp::Add,
            "-" => BinaryOp::Sub,
            "*" => BinaryOp::Mul,
            "/" => BinaryOp::Div,
            "%" => BinaryOp::Mod,
            "**" => BinaryOp::Pow,
            "<" => BinaryOp::Lt,
            "<=" => BinaryOp::Le,
            ">" => BinaryOp::Gt,
            ">=" => BinaryOp::Ge,
            "==" => BinaryOp::Eq,
            "!=" | "<>" => BinaryOp::Ne,
            "and" => BinaryOp::And,
            "or" => BinaryOp::Or,
            _ => return None,
        };
        Some(op)
    }

    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge | BinaryOp::Eq | BinaryOp::Ne
        )
    }

    pub fn is_logical(&self) -> bool {
        matches!(self, BinaryOp::And | BinaryOp::Or)
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Unit written directly after a numeric literal, e.g. the `mV` of `-70 mV`
/// or the `ms**-1` of `1 ms**-1`.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitSuffix {
    pub name: String,
    pub exponent: i32,
    pub loc: SourceLocation,
}

impl fmt::Display for UnitSuffix {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.exponent == 1 {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}**{}", self.name, self.exponent)
        }
    }
}

/// A variable use; `order` counts the derivative marks, so `V_m''` has
/// order 2.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableRef {
    pub name: String,
    pub order: u32,
    pub symbol: Option<SymbolId>,
}

impl fmt::Display for VariableRef {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}{}", self.name, "'".repeat(self.order as usize))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub name: String,
    pub args: Vec<Expr>,
    pub symbol: Option<SymbolId>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Number {
        value: f64,
        is_integer: bool,
        unit: Option<UnitSuffix>,
    },
    Boolean(bool),
    Str(String),
    Variable(VariableRef),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Ternary {
        condition: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
    Call(Call),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub loc: SourceLocation,
    pub ty: Option<TypeSymbol>,
}

impl Expr {
    pub fn new(kind: ExprKind, loc: SourceLocation) -> Self {
        Self {
            kind,
            loc,
            ty: None,
        }
    }

    pub fn children(&self) -> Vec<&Expr> {
        match &self.kind {
            ExprKind::Number { .. }
            | ExprKind::Boolean(_)
            | ExprKind::Str(_)
            | ExprKind::Variable(_) => vec![],
            ExprKind::Unary { operand, .. } => vec![operand.as_ref()],
            ExprKind::Binary { left, right, .. } => vec![left.as_ref(), right.as_ref()],
            ExprKind::Ternary {
                condition,
                then,
                otherwise,
            } => vec![condition.as_ref(), then.as_ref(), otherwise.as_ref()],
            ExprKind::Call(call) => call.args.iter().collect(),
        }
    }

    /// visits this expression and all sub-expressions, parents first
    pub fn walk<'a>(&'a self, f: &mut impl FnMut(&'a Expr)) {
        f(self);
        for child in self.children() {
            child.walk(f);
        }
    }

    /// true for a plain numeric literal without a unit, optionally negated
    pub fn is_bare_number(&self) -> bool {
        match &self.kind {
            ExprKind::Number { unit: None, .. } => true,
            ExprKind::Unary {
                op: UnaryOp::Minus | UnaryOp::Plus,
                operand,
            } => operand.is_bare_number(),
            _ => false,
        }
    }

    /// the value of an integer literal, optionally negated
    pub fn as_integer_literal(&self) -> Option<i32> {
        match &self.kind {
            ExprKind::Number {
                value,
                is_integer: true,
                unit: None,
            } => Some(*value as i32),
            ExprKind::Unary {
                op: UnaryOp::Minus,
                operand,
            } => operand.as_integer_literal().map(|v| -v),
            ExprKind::Unary {
                op: UnaryOp::Plus,
                operand,
            } => operand.as_integer_literal(),
            _ => None,
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.kind {
            ExprKind::Number { value, unit, .. } => match unit {
                Some(unit) => write!(f, "{value} {unit}"),
                None => write!(f, "{value}"),
            },
            ExprKind::Boolean(b) => write!(f, "{b}"),
            ExprKind::Str(s) => write!(f, "\"{s}\""),
            ExprKind::Variable(var) => write!(f, "{var}"),
            ExprKind::Unary { op, operand } => write!(f, "{op}{operand}"),
            ExprKind::Binary { op, left, right } => write!(f, "({left} {op} {right})"),
            ExprKind::Ternary {
                condition,
                then,
                otherwise,
            } => write!(f, "({condition} ? {then} : {otherwise})"),
            ExprKind::Call(call) => {
                write!(f, "{}(", call.name)?;
                for (i, arg) in call.args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                write!(f, ")")
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeOp {
    Mul,
    Div,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypeRefKind {
    Named(String),
    /// the `1` of `1/ms`
    One,
    Binary {
        op: TypeOp,
        left: Box<TypeRef>,
        right: Box<TypeRef>,
    },
    Pow {
        base: Box<TypeRef>,
        exponent: i32,
    },
}

/// A type as written in a declaration, resolved to a `TypeSymbol` during
/// symbol table construction.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeRef {
    pub kind: TypeRefKind,
    pub loc: SourceLocation,
    pub resolved: Option<TypeSymbol>,
}

impl TypeRef {
    pub fn new(kind: TypeRefKind, loc: SourceLocation) -> Self {
        Self {
            kind,
            loc,
            resolved: None,
        }
    }

    pub fn named(name: &str, loc: SourceLocation) -> Self {
        Self::new(TypeRefKind::Named(name.to_string()), loc)
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.kind {
            TypeRefKind::Named(name) => write!(f, "{name}"),
            TypeRefKind::One => write!(f, "1"),
            TypeRefKind::Binary { op, left, right } => {
                let op = match op {
                    TypeOp::Mul => "*",
                    TypeOp::Div => "/",
                };
                write!(f, "({left}{op}{right})")
            }
            TypeRefKind::Pow { base, exponent } => write!(f, "{base}**{exponent}"),
        }
    }
}
