use std::collections::HashMap;

use log::{debug, info};

use super::{ScopeId, ScopeKind, Symbol, SymbolId, SymbolKind, SymbolTable, VariableBlockKind};
use crate::ast::{
    BlockRole, CompilationUnit, Declaration, EquationBlock, EquationItem, Expr, ExprKind,
    FunctionDecl, Model, ModelItem, SourceLocation, StmtBlock, StmtKind, Target, TypeOp,
    TypeRef, TypeRefKind, VariableBlock,
};
use crate::error::FrontendError;
use crate::logger::{Logger, LoggingLevel};
use crate::predefined::{FunctionSignature, ParamType, Registries};
use crate::units::TypeSymbol;

/// The declaration whose initializer is being resolved: the names it
/// introduces and where it starts.
struct DeclContext<'d> {
    names: &'d [String],
    start: SourceLocation,
    check_order: bool,
}

fn declaration_groups<'d>(
    decls: impl Iterator<Item = &'d Declaration>,
) -> HashMap<SourceLocation, Vec<String>> {
    let mut groups: HashMap<SourceLocation, Vec<String>> = HashMap::new();
    for decl in decls {
        groups
            .entry(decl.loc)
            .or_default()
            .push(decl.name.name.clone());
    }
    groups
}

/// Builds the scope tree of a compilation unit and annotates every
/// identifier with its symbol.
///
/// Model-level members (variables, input ports and functions) are declared
/// before any body is visited, as are the inline expressions and kernels of
/// an equations block. Equations may use any of them, but initializers,
/// update blocks and function bodies may only use a `state`, `parameters`
/// or `internals` variable declared earlier in the file. Statement blocks
/// are sequential: a local is visible only after its declaration. All
/// problems are reported to the logger.
pub struct SymbolTableBuilder<'a> {
    registries: &'a Registries,
    logger: &'a mut Logger,
    table: SymbolTable,
    /// set while resolving an update block or function body
    in_body: bool,
}

impl<'a> SymbolTableBuilder<'a> {
    pub fn new(registries: &'a Registries, logger: &'a mut Logger) -> Self {
        Self {
            registries,
            logger,
            table: SymbolTable::new(),
            in_body: false,
        }
    }

    pub fn build(mut self, unit: &mut CompilationUnit) -> SymbolTable {
        for model in unit.models.iter_mut() {
            let symbol = Symbol::declared(&model.name.name, SymbolKind::Model, model.name.loc);
            model.symbol = self.declare(ScopeId::GLOBAL, symbol);
        }
        for model in unit.models.iter_mut() {
            self.model(model);
        }
        info!(
            "built symbol table with {} scopes and {} symbols",
            self.table.scope_count(),
            self.table.symbol_count()
        );
        self.table
    }

    fn declare(&mut self, scope: ScopeId, symbol: Symbol) -> Option<SymbolId> {
        let name = symbol.name.clone();
        let location = symbol.location;
        match self.table.declare(scope, symbol) {
            Ok(id) => {
                debug!("declared '{}' in scope {}", name, scope.0);
                Some(id)
            }
            Err(existing) => {
                let previous = self.table.symbol(existing).location;
                self.logger.report_error(
                    FrontendError::DuplicateDeclaration { name, previous },
                    location,
                );
                None
            }
        }
    }

    fn registry<T>(&mut self, result: Result<Option<T>, FrontendError>, loc: SourceLocation) -> Option<T> {
        match result {
            Ok(found) => found,
            Err(err) => {
                self.logger.report_error_at(LoggingLevel::Fatal, err, loc);
                None
            }
        }
    }

    fn model(&mut self, model: &mut Model) {
        let scope = self.table.add_scope(ScopeKind::Model, ScopeId::GLOBAL, model.loc);
        model.scope = Some(scope);
        for item in model.items.iter_mut() {
            match item {
                ModelItem::Variables(block) => self.hoist_variables(scope, block),
                ModelItem::Input(block) => {
                    for port in block.ports.iter_mut() {
                        let ty = match &mut port.data_type {
                            Some(data_type) => self.resolve_type_ref(data_type),
                            None => Some(TypeSymbol::Real),
                        };
                        let symbol = Symbol::variable(
                            &port.name.name,
                            ty,
                            VariableBlockKind::InputPort,
                            port.name.loc,
                        );
                        port.symbol = self.declare(scope, symbol);
                    }
                }
                ModelItem::Function(function) => self.hoist_function(scope, function),
                ModelItem::Equations(_) | ModelItem::Update(_) | ModelItem::Output(_) => (),
            }
        }
        for item in model.items.iter_mut() {
            match item {
                ModelItem::Variables(block) => self.variable_initializers(scope, block),
                ModelItem::Equations(block) => self.equations(scope, block),
                ModelItem::Update(block) => {
                    self.in_body = true;
                    self.stmt_block(scope, ScopeKind::Update, block);
                    self.in_body = false;
                }
                ModelItem::Function(function) => {
                    self.in_body = true;
                    self.function_body(scope, function);
                    self.in_body = false;
                }
                ModelItem::Input(_) | ModelItem::Output(_) => (),
            }
        }
    }

    fn hoist_variables(&mut self, scope: ScopeId, block: &mut VariableBlock) {
        let kind = match block.role {
            BlockRole::State => VariableBlockKind::State,
            BlockRole::Parameters => VariableBlockKind::Parameters,
            BlockRole::Internals => VariableBlockKind::Internals,
        };
        for decl in block.decls.iter_mut() {
            let ty = self.resolve_type_ref(&mut decl.data_type);
            let symbol = Symbol::variable(&decl.name.name, ty, kind, decl.name.loc);
            decl.symbol = self.declare(scope, symbol);
        }
    }

    fn hoist_function(&mut self, scope: ScopeId, function: &mut FunctionDecl) {
        // unresolved types are already reported; `Generic` keeps calls from
        // producing follow-up errors
        let mut params = Vec::new();
        for param in function.params.iter_mut() {
            params.push(match self.resolve_type_ref(&mut param.data_type) {
                Some(ty) => ParamType::Exact(ty),
                None => ParamType::Generic,
            });
        }
        let ret = match &mut function.return_type {
            Some(data_type) => match self.resolve_type_ref(data_type) {
                Some(ty) => ParamType::Exact(ty),
                None => ParamType::Generic,
            },
            None => ParamType::Exact(TypeSymbol::Void),
        };
        let mut symbol = Symbol::declared(&function.name.name, SymbolKind::Function, function.name.loc);
        if let ParamType::Exact(ty) = &ret {
            symbol.ty = Some(ty.clone());
        }
        symbol.signature = Some(FunctionSignature::new(&function.name.name, params, ret));
        function.symbol = self.declare(scope, symbol);
    }

    fn variable_initializers(&mut self, scope: ScopeId, block: &mut VariableBlock) {
        let groups = declaration_groups(block.decls.iter());
        for decl in block.decls.iter_mut() {
            if let Some(init) = &mut decl.initializer {
                let ctx = DeclContext {
                    names: groups.get(&decl.loc).map(Vec::as_slice).unwrap_or(&[]),
                    start: decl.loc,
                    check_order: true,
                };
                self.resolve_expr(scope, init, Some(&ctx));
            }
        }
    }

    fn equations(&mut self, model_scope: ScopeId, block: &mut EquationBlock) {
        let scope = self.table.add_scope(ScopeKind::Equations, model_scope, block.loc);
        block.scope = Some(scope);
        for item in block.items.iter_mut() {
            match item {
                EquationItem::Inline(inline) => {
                    let ty = self.resolve_type_ref(&mut inline.data_type);
                    let symbol = Symbol::variable(
                        &inline.name.name,
                        ty,
                        VariableBlockKind::Inline,
                        inline.name.loc,
                    );
                    inline.symbol = self.declare(scope, symbol);
                }
                EquationItem::Kernel(kernel) => {
                    let symbol = Symbol::variable(
                        &kernel.name.name,
                        None,
                        VariableBlockKind::Kernel,
                        kernel.name.loc,
                    );
                    kernel.symbol = self.declare(scope, symbol);
                }
                EquationItem::Ode(_) => (),
            }
        }
        for item in block.items.iter_mut() {
            match item {
                EquationItem::Inline(inline) => self.resolve_expr(scope, &mut inline.expr, None),
                EquationItem::Kernel(kernel) => self.resolve_expr(scope, &mut kernel.expr, None),
                EquationItem::Ode(ode) => {
                    self.resolve_target(scope, &mut ode.lhs);
                    if let Some(id) = ode.lhs.symbol {
                        if self.table.symbol(id).block != Some(VariableBlockKind::State) {
                            self.logger.report_error(
                                FrontendError::TypeMismatch(format!(
                                    "'{}' is not a state variable and cannot be defined by an ODE",
                                    ode.lhs.name
                                )),
                                ode.lhs.loc,
                            );
                        }
                    }
                    self.resolve_expr(scope, &mut ode.rhs, None);
                }
            }
        }
    }

    fn function_body(&mut self, model_scope: ScopeId, function: &mut FunctionDecl) {
        let scope = self.table.add_scope(ScopeKind::Function, model_scope, function.loc);
        function.scope = Some(scope);
        function.body.scope = Some(scope);
        for param in function.params.iter_mut() {
            let symbol = Symbol::variable(
                &param.name.name,
                param.data_type.resolved.clone(),
                VariableBlockKind::FunctionParameter,
                param.name.loc,
            );
            param.symbol = self.declare(scope, symbol);
        }
        self.statements(scope, &mut function.body);
    }

    fn stmt_block(&mut self, parent: ScopeId, kind: ScopeKind, block: &mut StmtBlock) {
        let scope = self.table.add_scope(kind, parent, block.loc);
        block.scope = Some(scope);
        self.statements(scope, block);
    }

    fn statements(&mut self, scope: ScopeId, block: &mut StmtBlock) {
        let groups = declaration_groups(block.stmts.iter().filter_map(|stmt| match &stmt.kind {
            StmtKind::Declaration(decl) => Some(decl),
            _ => None,
        }));
        for stmt in block.stmts.iter_mut() {
            match &mut stmt.kind {
                StmtKind::Declaration(decl) => {
                    let ty = self.resolve_type_ref(&mut decl.data_type);
                    if let Some(init) = &mut decl.initializer {
                        let ctx = DeclContext {
                            names: groups.get(&decl.loc).map(Vec::as_slice).unwrap_or(&[]),
                            start: decl.loc,
                            check_order: false,
                        };
                        self.resolve_expr(scope, init, Some(&ctx));
                    }
                    let symbol =
                        Symbol::variable(&decl.name.name, ty, VariableBlockKind::Local, decl.name.loc);
                    decl.symbol = self.declare(scope, symbol);
                }
                StmtKind::Assignment(assign) => {
                    self.resolve_target(scope, &mut assign.target);
                    self.resolve_expr(scope, &mut assign.value, None);
                }
                StmtKind::Call(call) => self.resolve_expr(scope, call, None),
                StmtKind::Return(value) => {
                    if let Some(value) = value {
                        self.resolve_expr(scope, value, None);
                    }
                }
                StmtKind::If(stmt) => {
                    for (condition, body) in stmt.branches.iter_mut() {
                        self.resolve_expr(scope, condition, None);
                        self.stmt_block(scope, ScopeKind::Block, body);
                    }
                    if let Some(body) = &mut stmt.otherwise {
                        self.stmt_block(scope, ScopeKind::Block, body);
                    }
                }
                StmtKind::While { condition, body } => {
                    self.resolve_expr(scope, condition, None);
                    self.stmt_block(scope, ScopeKind::Block, body);
                }
                StmtKind::For(stmt) => {
                    self.resolve_target(scope, &mut stmt.var);
                    self.resolve_expr(scope, &mut stmt.from, None);
                    self.resolve_expr(scope, &mut stmt.to, None);
                    if let Some(step) = &mut stmt.step {
                        self.resolve_expr(scope, step, None);
                    }
                    self.stmt_block(scope, ScopeKind::Block, &mut stmt.body);
                }
            }
        }
    }

    fn resolve_target(&mut self, scope: ScopeId, target: &mut Target) {
        target.symbol = self.resolve_value(scope, &target.name, target.loc);
        if let (Some(id), true) = (target.symbol, self.in_body) {
            self.check_declared_before(id, &target.name, target.loc, target.loc);
        }
    }

    /// Reports a reference at `loc` to a model-level variable that is
    /// declared after `point`.
    fn check_declared_before(&mut self, id: SymbolId, name: &str, point: SourceLocation, loc: SourceLocation) {
        let symbol = self.table.symbol(id);
        let declared_later = symbol.block.is_some_and(|b| b.is_model_level())
            && symbol.location.start() > point.start();
        if declared_later {
            let line = symbol.location.start_line;
            self.logger.report_error(
                FrontendError::UsedBeforeDeclaration {
                    name: name.to_string(),
                    line,
                },
                loc,
            );
        }
    }

    fn resolve_expr(&mut self, scope: ScopeId, expr: &mut Expr, ctx: Option<&DeclContext>) {
        let loc = expr.loc;
        match &mut expr.kind {
            ExprKind::Number { .. } | ExprKind::Boolean(_) | ExprKind::Str(_) => (),
            ExprKind::Variable(var) => {
                let own = ctx.is_some_and(|ctx| ctx.names.contains(&var.name));
                if own {
                    self.logger.report_error(
                        FrontendError::SelfReference {
                            name: var.name.clone(),
                        },
                        loc,
                    );
                }
                var.symbol = self.resolve_value(scope, &var.name, loc);
                let point = match ctx {
                    Some(ctx) if ctx.check_order => Some(ctx.start),
                    _ if self.in_body => Some(loc),
                    _ => None,
                };
                if let (Some(point), Some(id), false) = (point, var.symbol, own) {
                    self.check_declared_before(id, &var.name, point, loc);
                }
            }
            ExprKind::Call(call) => {
                call.symbol = self.resolve_function(scope, &call.name, loc);
                for arg in call.args.iter_mut() {
                    self.resolve_expr(scope, arg, ctx);
                }
            }
            ExprKind::Unary { operand, .. } => self.resolve_expr(scope, operand, ctx),
            ExprKind::Binary { left, right, .. } => {
                self.resolve_expr(scope, left, ctx);
                self.resolve_expr(scope, right, ctx);
            }
            ExprKind::Ternary {
                condition,
                then,
                otherwise,
            } => {
                self.resolve_expr(scope, condition, ctx);
                self.resolve_expr(scope, then, ctx);
                self.resolve_expr(scope, otherwise, ctx);
            }
        }
    }

    /// Resolves a name in value position: the scope chain, then the
    /// predefined variables, types and units. Types and units resolve so
    /// the checker can report them as used in value position.
    fn resolve_value(&mut self, scope: ScopeId, name: &str, loc: SourceLocation) -> Option<SymbolId> {
        if let Some(id) = self.table.lookup_where(scope, name, Symbol::is_value) {
            debug!("resolved '{}' at {} to symbol {}", name, loc, id.0);
            return Some(id);
        }
        let registries = self.registries;
        if let Some(ty) = self.registry(registries.resolve_variable(name), loc) {
            let ty = ty.clone();
            return Some(self.table.intern_predefined(SymbolKind::Variable, name, || Symbol {
                ty: Some(ty),
                ..Symbol::declared(name, SymbolKind::Variable, SourceLocation::UNKNOWN)
            }));
        }
        if let Some(ty) = self.registry(registries.resolve_type(name), loc) {
            let ty = ty.clone();
            return Some(self.table.intern_predefined(SymbolKind::Type, name, || Symbol {
                ty: Some(ty),
                ..Symbol::declared(name, SymbolKind::Type, SourceLocation::UNKNOWN)
            }));
        }
        if let Some(unit) = self.registry(registries.resolve_unit(name), loc) {
            let ty = TypeSymbol::Unit(unit.clone());
            return Some(self.table.intern_predefined(SymbolKind::Unit, name, || Symbol {
                ty: Some(ty),
                ..Symbol::declared(name, SymbolKind::Unit, SourceLocation::UNKNOWN)
            }));
        }
        self.logger.report_error(
            FrontendError::UndeclaredIdentifier {
                name: name.to_string(),
            },
            loc,
        );
        None
    }

    fn resolve_function(&mut self, scope: ScopeId, name: &str, loc: SourceLocation) -> Option<SymbolId> {
        if let Some(id) = self
            .table
            .lookup_where(scope, name, |s| s.kind == SymbolKind::Function)
        {
            return Some(id);
        }
        let registries = self.registries;
        if let Some(signature) = self.registry(registries.resolve_function(name), loc) {
            let signature = signature.clone();
            return Some(self.table.intern_predefined(SymbolKind::Function, name, || {
                let mut symbol = Symbol::declared(name, SymbolKind::Function, SourceLocation::UNKNOWN);
                if let ParamType::Exact(ty) = &signature.ret {
                    symbol.ty = Some(ty.clone());
                }
                symbol.signature = Some(signature);
                symbol
            }));
        }
        self.logger.report_error(
            FrontendError::UndeclaredIdentifier {
                name: name.to_string(),
            },
            loc,
        );
        None
    }

    /// Resolves a written type to a `TypeSymbol` and records it on the node.
    fn resolve_type_ref(&mut self, type_ref: &mut TypeRef) -> Option<TypeSymbol> {
        let loc = type_ref.loc;
        let resolved = match &mut type_ref.kind {
            TypeRefKind::Named(name) => match self.registries.resolve_type_name(name) {
                Ok(Some(ty)) => Some(ty),
                Ok(None) => {
                    self.logger.report_error(
                        FrontendError::UnknownUnit { name: name.clone() },
                        loc,
                    );
                    None
                }
                Err(err) => {
                    self.logger.report_error_at(LoggingLevel::Fatal, err, loc);
                    None
                }
            },
            TypeRefKind::One => Some(TypeSymbol::Real),
            TypeRefKind::Binary { op, left, right } => {
                let op = match op {
                    TypeOp::Mul => "*",
                    TypeOp::Div => "/",
                };
                let left = self.resolve_type_ref(left);
                let right = self.resolve_type_ref(right);
                match (left, right) {
                    (Some(left), Some(right)) => match left.multiplicative(&right, op) {
                        Ok(ty) => Some(ty),
                        Err(err) => {
                            self.logger
                                .report_error(FrontendError::TypeMismatch(err.to_string()), loc);
                            None
                        }
                    },
                    _ => None,
                }
            }
            TypeRefKind::Pow { base, exponent } => {
                let exponent = *exponent;
                match self.resolve_type_ref(base) {
                    Some(base) => match base.power(exponent) {
                        Ok(ty) => Some(ty),
                        Err(err) => {
                            self.logger
                                .report_error(FrontendError::TypeMismatch(err.to_string()), loc);
                            None
                        }
                    },
                    None => None,
                }
            }
        };
        type_ref.resolved = resolved.clone();
        resolved
    }
}
