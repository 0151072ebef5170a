use std::fmt;

use indexmap::IndexMap;

use crate::ast::SourceLocation;
use crate::predefined::FunctionSignature;
use crate::units::TypeSymbol;

pub mod builder;
pub use builder::SymbolTableBuilder;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SymbolId(pub usize);

impl ScopeId {
    pub const GLOBAL: ScopeId = ScopeId(0);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    Model,
    Variable,
    Function,
    Type,
    Unit,
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SymbolKind::Model => write!(f, "model"),
            SymbolKind::Variable => write!(f, "variable"),
            SymbolKind::Function => write!(f, "function"),
            SymbolKind::Type => write!(f, "type"),
            SymbolKind::Unit => write!(f, "unit"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolOrigin {
    Declared,
    Predefined,
}

/// Where a variable was declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableBlockKind {
    State,
    Parameters,
    Internals,
    Local,
    Inline,
    Kernel,
    InputPort,
    FunctionParameter,
}

impl VariableBlockKind {
    /// declared in a `state`, `parameters` or `internals` block
    pub fn is_model_level(&self) -> bool {
        matches!(
            self,
            VariableBlockKind::State | VariableBlockKind::Parameters | VariableBlockKind::Internals
        )
    }
}

impl fmt::Display for VariableBlockKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            VariableBlockKind::State => "state",
            VariableBlockKind::Parameters => "parameters",
            VariableBlockKind::Internals => "internals",
            VariableBlockKind::Local => "local",
            VariableBlockKind::Inline => "inline",
            VariableBlockKind::Kernel => "kernel",
            VariableBlockKind::InputPort => "input",
            VariableBlockKind::FunctionParameter => "parameter",
        };
        write!(f, "{name}")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    pub ty: Option<TypeSymbol>,
    pub scope: ScopeId,
    pub location: SourceLocation,
    pub origin: SymbolOrigin,
    pub block: Option<VariableBlockKind>,
    pub signature: Option<FunctionSignature>,
}

impl Symbol {
    pub fn declared(name: &str, kind: SymbolKind, location: SourceLocation) -> Self {
        Self {
            name: name.to_string(),
            kind,
            ty: None,
            scope: ScopeId::GLOBAL,
            location,
            origin: SymbolOrigin::Declared,
            block: None,
            signature: None,
        }
    }

    pub fn variable(
        name: &str,
        ty: Option<TypeSymbol>,
        block: VariableBlockKind,
        location: SourceLocation,
    ) -> Self {
        Self {
            ty,
            block: Some(block),
            ..Self::declared(name, SymbolKind::Variable, location)
        }
    }

    pub fn is_value(&self) -> bool {
        !matches!(self.kind, SymbolKind::Function | SymbolKind::Model)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    Global,
    Model,
    Equations,
    Update,
    Function,
    Block,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Scope {
    pub kind: ScopeKind,
    pub parent: Option<ScopeId>,
    pub names: IndexMap<String, SymbolId>,
    pub children: Vec<ScopeId>,
    pub location: SourceLocation,
}

/// Arena of scopes and symbols. `ScopeId`/`SymbolId` index into it and stay
/// valid for the lifetime of the table. Scope 0 is the global scope.
///
/// Symbols for predefined entities are interned on first use; they belong to
/// the global scope but are kept out of its name map, so a model may reuse a
/// predefined name.
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolTable {
    scopes: Vec<Scope>,
    symbols: Vec<Symbol>,
    predefined: IndexMap<(SymbolKind, String), SymbolId>,
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolTable {
    pub fn new() -> Self {
        Self {
            scopes: vec![Scope {
                kind: ScopeKind::Global,
                parent: None,
                names: IndexMap::new(),
                children: Vec::new(),
                location: SourceLocation::UNKNOWN,
            }],
            symbols: Vec::new(),
            predefined: IndexMap::new(),
        }
    }

    pub fn add_scope(&mut self, kind: ScopeKind, parent: ScopeId, location: SourceLocation) -> ScopeId {
        let id = ScopeId(self.scopes.len());
        self.scopes.push(Scope {
            kind,
            parent: Some(parent),
            names: IndexMap::new(),
            children: Vec::new(),
            location,
        });
        self.scopes[parent.0].children.push(id);
        id
    }

    /// Adds `symbol` to `scope`. Fails with the id of the symbol already
    /// declared under that name in the same scope.
    pub fn declare(&mut self, scope: ScopeId, mut symbol: Symbol) -> Result<SymbolId, SymbolId> {
        if let Some(existing) = self.scopes[scope.0].names.get(&symbol.name) {
            return Err(*existing);
        }
        let id = SymbolId(self.symbols.len());
        symbol.scope = scope;
        self.scopes[scope.0].names.insert(symbol.name.clone(), id);
        self.symbols.push(symbol);
        Ok(id)
    }

    /// Returns the interned predefined symbol, creating it from `make` on
    /// first use.
    pub fn intern_predefined(
        &mut self,
        kind: SymbolKind,
        name: &str,
        make: impl FnOnce() -> Symbol,
    ) -> SymbolId {
        let key = (kind, name.to_string());
        if let Some(id) = self.predefined.get(&key) {
            return *id;
        }
        let id = SymbolId(self.symbols.len());
        let mut symbol = make();
        symbol.scope = ScopeId::GLOBAL;
        symbol.origin = SymbolOrigin::Predefined;
        self.symbols.push(symbol);
        self.predefined.insert(key, id);
        id
    }

    pub fn lookup_local(&self, scope: ScopeId, name: &str) -> Option<SymbolId> {
        self.scopes[scope.0].names.get(name).copied()
    }

    /// innermost to outermost, first symbol with that name accepted by `accept`
    pub fn lookup_where(
        &self,
        scope: ScopeId,
        name: &str,
        accept: impl Fn(&Symbol) -> bool,
    ) -> Option<SymbolId> {
        let mut current = Some(scope);
        while let Some(scope) = current {
            if let Some(id) = self.lookup_local(scope, name) {
                if accept(self.symbol(id)) {
                    return Some(id);
                }
            }
            current = self.scopes[scope.0].parent;
        }
        None
    }

    pub fn lookup(&self, scope: ScopeId, name: &str) -> Option<SymbolId> {
        self.lookup_where(scope, name, |_| true)
    }

    pub fn symbol(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id.0]
    }

    pub fn symbol_mut(&mut self, id: SymbolId) -> &mut Symbol {
        &mut self.symbols[id.0]
    }

    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.0]
    }

    pub fn scopes(&self) -> impl Iterator<Item = (ScopeId, &Scope)> + '_ {
        self.scopes.iter().enumerate().map(|(i, s)| (ScopeId(i), s))
    }

    pub fn symbols(&self) -> impl Iterator<Item = (SymbolId, &Symbol)> + '_ {
        self.symbols.iter().enumerate().map(|(i, s)| (SymbolId(i), s))
    }

    pub fn scope_count(&self) -> usize {
        self.scopes.len()
    }

    pub fn symbol_count(&self) -> usize {
        self.symbols.len()
    }

    /// true if `ancestor` is `scope` or encloses it
    pub fn encloses(&self, ancestor: ScopeId, scope: ScopeId) -> bool {
        let mut current = Some(scope);
        while let Some(s) = current {
            if s == ancestor {
                return true;
            }
            current = self.scopes[s.0].parent;
        }
        false
    }

    fn fmt_scope(&self, f: &mut fmt::Formatter, id: ScopeId, depth: usize) -> fmt::Result {
        let scope = self.scope(id);
        let indent = "  ".repeat(depth);
        writeln!(f, "{indent}{:?} {}", scope.kind, scope.location)?;
        for symbol_id in scope.names.values() {
            let symbol = self.symbol(*symbol_id);
            write!(f, "{indent}  {}: {}", symbol.name, symbol.kind)?;
            if let Some(ty) = &symbol.ty {
                write!(f, " {ty}")?;
            }
            if let Some(block) = &symbol.block {
                write!(f, " ({block})")?;
            }
            writeln!(f)?;
        }
        for child in &scope.children {
            self.fmt_scope(f, *child, depth + 1)?;
        }
        Ok(())
    }
}

impl fmt::Display for SymbolTable {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.fmt_scope(f, ScopeId::GLOBAL, 0)
    }
}
