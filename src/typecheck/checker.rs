use std::fmt::Display;

use log::{debug, info};

use crate::ast::{
    AssignOp, Assignment, BinaryOp, Call, CompilationUnit, Declaration, EquationItem, Expr,
    ExprKind, Model, ModelItem, SourceLocation, StmtBlock, StmtKind, Target, UnaryOp,
    UnitSuffix, VariableRef,
};
use crate::error::FrontendError;
use crate::logger::{Logger, LoggingLevel};
use crate::predefined::{ParamType, Registries, SignatureMismatch};
use crate::symbol_table::{SymbolKind, SymbolTable};
use crate::units::{TypeError, TypeSymbol};

/// Assigns a `TypeSymbol` to every expression of a unit whose identifiers
/// have been resolved, and checks declarations, assignments, equations and
/// calls against the types they require.
///
/// An expression whose type cannot be determined is left untyped and
/// expressions built on top of it are not checked, so one mistake is
/// reported once.
pub struct TypeChecker<'a> {
    registries: &'a Registries,
    table: &'a mut SymbolTable,
    logger: &'a mut Logger,
    typed: usize,
}

impl<'a> TypeChecker<'a> {
    pub fn new(registries: &'a Registries, table: &'a mut SymbolTable, logger: &'a mut Logger) -> Self {
        Self {
            registries,
            table,
            logger,
            typed: 0,
        }
    }

    pub fn check(mut self, unit: &mut CompilationUnit) {
        for model in unit.models.iter_mut() {
            self.model(model);
        }
        info!("type checked {} expression(s)", self.typed);
    }

    fn model(&mut self, model: &mut Model) {
        // kernels have no declared type, theirs is the type of their expression
        for item in model.items.iter_mut() {
            if let ModelItem::Equations(block) = item {
                for eq in block.items.iter_mut() {
                    if let EquationItem::Kernel(kernel) = eq {
                        let ty = self.expr(&mut kernel.expr).unwrap_or(TypeSymbol::Real);
                        if let Some(id) = kernel.symbol {
                            self.table.symbol_mut(id).ty = Some(ty);
                        }
                    }
                }
            }
        }
        let void = TypeSymbol::Void;
        for item in model.items.iter_mut() {
            match item {
                ModelItem::Variables(block) => {
                    for decl in block.decls.iter_mut() {
                        self.declaration(decl);
                    }
                }
                ModelItem::Equations(block) => {
                    for eq in block.items.iter_mut() {
                        match eq {
                            EquationItem::Ode(ode) => {
                                self.expr(&mut ode.rhs);
                                let expected = self.target_type(&ode.lhs);
                                let what = format!("equation of '{}'", ode.lhs);
                                self.check_assignable(what, expected.as_ref(), &ode.rhs);
                            }
                            EquationItem::Inline(inline) => {
                                self.expr(&mut inline.expr);
                                let what = format!("inline expression '{}'", inline.name);
                                self.check_assignable(what, inline.data_type.resolved.as_ref(), &inline.expr);
                            }
                            EquationItem::Kernel(_) => (),
                        }
                    }
                }
                ModelItem::Update(block) => self.block(block, Some(&void)),
                ModelItem::Function(function) => {
                    let ret = match &function.return_type {
                        Some(data_type) => data_type.resolved.as_ref(),
                        None => Some(&void),
                    };
                    self.block(&mut function.body, ret);
                }
                ModelItem::Input(_) | ModelItem::Output(_) => (),
            }
        }
    }

    fn type_error(&mut self, err: TypeError, loc: SourceLocation) {
        let err = match err {
            TypeError::Unit(_) => FrontendError::UnitMismatch(err.to_string()),
            TypeError::Operand { .. } => FrontendError::TypeMismatch(err.to_string()),
        };
        self.logger.report_error(err, loc);
    }

    /// Checks that `value` may be stored in a slot of type `expected`. A
    /// bare number stored in a slot with a unit only warns.
    fn check_assignable(&mut self, what: impl Display, expected: Option<&TypeSymbol>, value: &Expr) {
        let (Some(expected), Some(found)) = (expected, value.ty.as_ref()) else {
            return;
        };
        if expected.is_assignable_from(found) {
            return;
        }
        if expected.is_unit() && found.is_numeric() && value.is_bare_number() {
            self.logger.report(
                LoggingLevel::Warning,
                value.loc,
                format!("implicit conversion of a dimensionless number to {expected} in {what}"),
            );
            return;
        }
        let message = format!("{what} expects {expected}, found {found}");
        let err = if expected.is_unit() || found.is_unit() {
            FrontendError::UnitMismatch(message)
        } else {
            FrontendError::TypeMismatch(message)
        };
        self.logger.report_error(err, value.loc);
    }

    fn declaration(&mut self, decl: &mut Declaration) {
        if let Some(init) = &mut decl.initializer {
            self.expr(init);
            let what = format!("declaration of '{}'", decl.name);
            self.check_assignable(what, decl.data_type.resolved.as_ref(), init);
        }
    }

    /// type of an assignment or ODE target, derivatives included
    fn target_type(&mut self, target: &Target) -> Option<TypeSymbol> {
        let symbol = self.table.symbol(target.symbol?);
        if matches!(symbol.kind, SymbolKind::Type | SymbolKind::Unit) {
            self.logger.report_error(
                FrontendError::TypeUsedAsValue {
                    name: target.name.clone(),
                },
                target.loc,
            );
            return None;
        }
        let ty = symbol.ty.clone()?;
        match ty.derivative(target.order) {
            Ok(ty) => Some(ty),
            Err(err) => {
                self.type_error(err, target.loc);
                None
            }
        }
    }

    fn block(&mut self, block: &mut StmtBlock, ret: Option<&TypeSymbol>) {
        for stmt in block.stmts.iter_mut() {
            let loc = stmt.loc;
            match &mut stmt.kind {
                StmtKind::Declaration(decl) => self.declaration(decl),
                StmtKind::Assignment(assign) => self.assignment(assign),
                StmtKind::Call(call) => {
                    self.expr(call);
                }
                StmtKind::Return(value) => self.return_stmt(value.as_mut(), ret, loc),
                StmtKind::If(stmt) => {
                    for (condition, body) in stmt.branches.iter_mut() {
                        self.condition(condition, "if");
                        self.block(body, ret);
                    }
                    if let Some(body) = &mut stmt.otherwise {
                        self.block(body, ret);
                    }
                }
                StmtKind::While { condition, body } => {
                    self.condition(condition, "while");
                    self.block(body, ret);
                }
                StmtKind::For(stmt) => {
                    let var_ty = self.target_type(&stmt.var);
                    let what = format!("loop over '{}'", stmt.var);
                    for bound in [Some(&mut stmt.from), Some(&mut stmt.to), stmt.step.as_mut()]
                        .into_iter()
                        .flatten()
                    {
                        self.expr(bound);
                        self.check_assignable(&what, var_ty.as_ref(), bound);
                    }
                    self.block(&mut stmt.body, ret);
                }
            }
        }
    }

    fn condition(&mut self, condition: &mut Expr, keyword: &str) {
        if let Some(ty) = self.expr(condition) {
            if !ty.is_boolean() {
                self.logger.report_error(
                    FrontendError::TypeMismatch(format!(
                        "condition of '{keyword}' must be boolean, found {ty}"
                    )),
                    condition.loc,
                );
            }
        }
    }

    fn return_stmt(&mut self, value: Option<&mut Expr>, ret: Option<&TypeSymbol>, loc: SourceLocation) {
        match value {
            Some(value) => {
                self.expr(value);
                match ret {
                    Some(TypeSymbol::Void) => self.logger.report_error(
                        FrontendError::TypeMismatch(
                            "cannot return a value from a block without return type".to_string(),
                        ),
                        value.loc,
                    ),
                    ret => self.check_assignable("return value", ret, value),
                }
            }
            None => {
                if let Some(ret) = ret.filter(|ret| **ret != TypeSymbol::Void) {
                    self.logger.report_error(
                        FrontendError::TypeMismatch(format!("missing return value of type {ret}")),
                        loc,
                    );
                }
            }
        }
    }

    fn assignment(&mut self, assign: &mut Assignment) {
        self.expr(&mut assign.value);
        let target_ty = self.target_type(&assign.target);
        let what = format!("assignment to '{}'", assign.target);
        if assign.op == AssignOp::Assign {
            self.check_assignable(what, target_ty.as_ref(), &assign.value);
            return;
        }
        let (Some(target_ty), Some(value_ty)) = (target_ty, assign.value.ty.clone()) else {
            return;
        };
        let result = match assign.op {
            AssignOp::Add | AssignOp::Sub => {
                if target_ty.is_unit() && assign.value.is_bare_number() {
                    self.check_assignable(what, Some(&target_ty), &assign.value);
                    return;
                }
                let op = if assign.op == AssignOp::Add { "+" } else { "-" };
                target_ty.additive(&value_ty, op)
            }
            _ => {
                let op = if assign.op == AssignOp::Mul { "*" } else { "/" };
                target_ty.multiplicative(&value_ty, op)
            }
        };
        match result {
            Ok(result) if target_ty.is_assignable_from(&result) => (),
            Ok(result) => {
                let message = format!("{what} expects {target_ty}, found {result}");
                self.logger
                    .report_error(FrontendError::UnitMismatch(message), assign.value.loc);
            }
            Err(err) => self.type_error(err, assign.value.loc),
        }
    }

    /// Types `expr` and its sub-expressions, recording the result on every
    /// node.
    fn expr(&mut self, expr: &mut Expr) -> Option<TypeSymbol> {
        let loc = expr.loc;
        let ty = match &mut expr.kind {
            ExprKind::Number {
                is_integer, unit, ..
            } => match unit {
                Some(suffix) => self.suffix(suffix),
                None if *is_integer => Some(TypeSymbol::Integer),
                None => Some(TypeSymbol::Real),
            },
            ExprKind::Boolean(_) => Some(TypeSymbol::Boolean),
            ExprKind::Str(_) => Some(TypeSymbol::String),
            ExprKind::Variable(var) => self.variable(var, loc),
            ExprKind::Unary { op, operand } => {
                let op = *op;
                self.unary(op, operand, loc)
            }
            ExprKind::Binary { op, left, right } => {
                let op = *op;
                self.binary(op, left, right, loc)
            }
            ExprKind::Ternary {
                condition,
                then,
                otherwise,
            } => self.ternary(condition, then, otherwise, loc),
            ExprKind::Call(call) => self.call(call, loc),
        };
        if let Some(ty) = &ty {
            self.typed += 1;
            debug!("{} has type {}", loc, ty);
        }
        expr.ty = ty.clone();
        ty
    }

    fn suffix(&mut self, suffix: &UnitSuffix) -> Option<TypeSymbol> {
        let registries = self.registries;
        let unit = match registries.resolve_unit(&suffix.name) {
            Ok(Some(unit)) => unit,
            Ok(None) => {
                self.logger.report_error(
                    FrontendError::UnknownUnit {
                        name: suffix.name.clone(),
                    },
                    suffix.loc,
                );
                return None;
            }
            Err(err) => {
                self.logger.report_error_at(LoggingLevel::Fatal, err, suffix.loc);
                return None;
            }
        };
        if suffix.exponent == 1 {
            return Some(TypeSymbol::from_unit(unit.clone()));
        }
        match unit.powi(suffix.exponent) {
            Ok(unit) => Some(TypeSymbol::from_unit(unit)),
            Err(err) => {
                self.type_error(err.into(), suffix.loc);
                None
            }
        }
    }

    fn variable(&mut self, var: &VariableRef, loc: SourceLocation) -> Option<TypeSymbol> {
        let symbol = self.table.symbol(var.symbol?);
        if matches!(symbol.kind, SymbolKind::Type | SymbolKind::Unit) {
            self.logger.report_error(
                FrontendError::TypeUsedAsValue {
                    name: var.name.clone(),
                },
                loc,
            );
            return None;
        }
        let ty = symbol.ty.clone()?;
        match ty.derivative(var.order) {
            Ok(ty) => Some(ty),
            Err(err) => {
                self.type_error(err, loc);
                None
            }
        }
    }

    fn unary(&mut self, op: UnaryOp, operand: &mut Expr, loc: SourceLocation) -> Option<TypeSymbol> {
        let ty = self.expr(operand)?;
        let accepted = match op {
            UnaryOp::Plus | UnaryOp::Minus => ty.is_numeric(),
            UnaryOp::Not => ty.is_boolean(),
        };
        if accepted {
            Some(ty)
        } else {
            self.type_error(
                TypeError::Operand {
                    op: op.to_string().trim().to_string(),
                    ty: ty.to_string(),
                },
                loc,
            );
            None
        }
    }

    fn binary(&mut self, op: BinaryOp, left: &mut Expr, right: &mut Expr, loc: SourceLocation) -> Option<TypeSymbol> {
        let left_ty = self.expr(left);
        let right_ty = self.expr(right);
        let (left_ty, right_ty) = (left_ty?, right_ty?);
        let result = match op {
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mod => left_ty.additive(&right_ty, op.as_str()),
            BinaryOp::Mul | BinaryOp::Div => left_ty.multiplicative(&right_ty, op.as_str()),
            BinaryOp::Pow => return self.power(left_ty, right_ty, right, loc),
            BinaryOp::Eq | BinaryOp::Ne if left_ty == right_ty => Ok(TypeSymbol::Boolean),
            BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge | BinaryOp::Eq | BinaryOp::Ne => {
                left_ty
                    .additive(&right_ty, op.as_str())
                    .map(|_| TypeSymbol::Boolean)
            }
            BinaryOp::And | BinaryOp::Or => {
                if left_ty.is_boolean() && right_ty.is_boolean() {
                    Ok(TypeSymbol::Boolean)
                } else {
                    let offending = if left_ty.is_boolean() { right_ty } else { left_ty };
                    Err(TypeError::Operand {
                        op: op.to_string(),
                        ty: offending.to_string(),
                    })
                }
            }
        };
        match result {
            Ok(ty) => Some(ty),
            Err(err) => {
                self.type_error(err, loc);
                None
            }
        }
    }

    /// `base ** exponent`: the exponent must be dimensionless, and for a
    /// base with a unit it must be an integer literal.
    fn power(&mut self, base: TypeSymbol, exponent_ty: TypeSymbol, exponent: &Expr, loc: SourceLocation) -> Option<TypeSymbol> {
        let result = if let Some(n) = exponent.as_integer_literal() {
            base.power(n)
        } else if exponent_ty.unit().is_some_and(|u| !u.is_dimensionless()) {
            self.logger.report_error(
                FrontendError::UnitMismatch(format!(
                    "the exponent of '**' must be dimensionless, found {exponent_ty}"
                )),
                exponent.loc,
            );
            return None;
        } else if base.is_unit() {
            self.logger.report_error(
                FrontendError::UnitMismatch(format!(
                    "a base of unit {base} can only be raised to an integer literal"
                )),
                exponent.loc,
            );
            return None;
        } else if !base.is_numeric() || !exponent_ty.is_numeric() {
            let offending = if base.is_numeric() { exponent_ty } else { base };
            Err(TypeError::Operand {
                op: "**".to_string(),
                ty: offending.to_string(),
            })
        } else if base == TypeSymbol::Integer && exponent_ty == TypeSymbol::Integer {
            Ok(TypeSymbol::Integer)
        } else {
            Ok(TypeSymbol::Real)
        };
        match result {
            Ok(ty) => Some(ty),
            Err(err) => {
                self.type_error(err, loc);
                None
            }
        }
    }

    fn ternary(&mut self, condition: &mut Expr, then: &mut Expr, otherwise: &mut Expr, loc: SourceLocation) -> Option<TypeSymbol> {
        self.condition(condition, "?");
        let then_ty = self.expr(then);
        let otherwise_ty = self.expr(otherwise);
        let (then_ty, otherwise_ty) = (then_ty?, otherwise_ty?);
        if then_ty == otherwise_ty {
            return Some(then_ty);
        }
        match then_ty.additive(&otherwise_ty, "?:") {
            Ok(ty) => Some(ty),
            Err(err) => {
                self.type_error(err, loc);
                None
            }
        }
    }

    fn call(&mut self, call: &mut Call, loc: SourceLocation) -> Option<TypeSymbol> {
        let mut args = Vec::with_capacity(call.args.len());
        for arg in call.args.iter_mut() {
            args.push(self.expr(arg));
        }
        let signature = self.table.symbol(call.symbol?).signature.clone()?;
        let Some(args) = args.into_iter().collect::<Option<Vec<_>>>() else {
            return match signature.ret {
                ParamType::Exact(ty) => Some(ty),
                ParamType::Generic => None,
            };
        };
        match signature.check_args(&args) {
            Ok(ty) => Some(ty),
            Err(SignatureMismatch::Arity { expected, found }) => {
                self.logger.report_error(
                    FrontendError::TypeMismatch(format!(
                        "'{}' expects {expected} argument(s), found {found}",
                        call.name
                    )),
                    loc,
                );
                None
            }
            Err(SignatureMismatch::Argument {
                position,
                expected,
                found,
            }) => {
                let arg_loc = call.args[position - 1].loc;
                self.logger.report_error(
                    FrontendError::ArgumentUnitMismatch {
                        function: call.name.clone(),
                        position,
                        expected,
                        found,
                    },
                    arg_loc,
                );
                None
            }
        }
    }
}
