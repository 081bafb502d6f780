use smol_str::SmolStr;
use svala_arena::Idx;
use svala_diag::DiagnosticCode;
use svala_source::Span;
use svala_syntax::{BinaryOp, NodeKind, NodeRef, UnaryOp};

use crate::compilation::Compilation;
use crate::diagnostics::Diagnostic;
use crate::lookup::{LookupNameKind, LookupRefPoint, LookupResult, LookupResultKind};
use crate::scope::ScopeId;
use crate::symbols::{Lazy, SymbolId, SymbolKind};
use crate::types::{ConstEvalError, ConstInt, TypeId, TypeKind};

pub type ExprId = Idx<Expr>;
pub type StmtId = Idx<Stmt>;

/// A bound expression. Binding resolves every name through the lookup
/// engine; evaluation happens separately and on demand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExprKind {
    Literal(i64),
    NamedValue(SymbolId),
    Unary {
        op: UnaryOp,
        operand: ExprId,
    },
    Binary {
        op: BinaryOp,
        lhs: ExprId,
        rhs: ExprId,
    },
    Call {
        subroutine: SymbolId,
        args: Vec<ExprId>,
    },
    SystemCall {
        name: SmolStr,
        args: Vec<ExprId>,
    },
    Assign {
        lhs: ExprId,
        rhs: ExprId,
    },
    Error,
}

/// A bound statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StmtKind {
    Block(Vec<StmtId>),
    Expr(ExprId),
}

impl Compilation {
    /// Bind an expression syntax node in `scope` at `point`.
    ///
    /// Name-resolution failures are reported against `origin` and produce
    /// error expressions rather than aborting the bind.
    pub fn bind_expr(
        &mut self,
        node: NodeRef,
        scope: ScopeId,
        point: LookupRefPoint,
        origin: SymbolId,
    ) -> ExprId {
        let tree = self.tree(node.tree);
        let n = tree.node(node.node);
        let span = n.span;
        let kind = n.kind.clone();
        drop(tree);

        let expr_kind = match kind {
            NodeKind::Literal { value } => ExprKind::Literal(value),
            NodeKind::Ident { name } => {
                let mut result = LookupResult::new(LookupNameKind::Local, point);
                self.lookup_name(scope, &name, &mut result);
                match result.result_kind {
                    LookupResultKind::Found => {
                        ExprKind::NamedValue(result.symbol.expect("found result has a symbol"))
                    }
                    LookupResultKind::AmbiguousImport => {
                        self.add_diag(Diagnostic::error(
                            DiagnosticCode::AMBIGUOUS_WILDCARD_IMPORT,
                            span,
                            origin,
                            format!("`{name}` is ambiguously imported by multiple wildcard imports"),
                        ));
                        ExprKind::Error
                    }
                    LookupResultKind::NotFound => {
                        self.add_diag(Diagnostic::error(
                            DiagnosticCode::UNDECLARED_IDENTIFIER,
                            span,
                            origin,
                            format!("use of undeclared identifier `{name}`"),
                        ));
                        ExprKind::Error
                    }
                }
            }
            NodeKind::Unary { op, operand } => {
                let operand = self.bind_expr(node.with(operand), scope, point, origin);
                ExprKind::Unary { op, operand }
            }
            NodeKind::Binary { op, lhs, rhs } => {
                let lhs = self.bind_expr(node.with(lhs), scope, point, origin);
                let rhs = self.bind_expr(node.with(rhs), scope, point, origin);
                ExprKind::Binary { op, lhs, rhs }
            }
            NodeKind::Paren { inner } => {
                return self.bind_expr(node.with(inner), scope, point, origin);
            }
            NodeKind::Call {
                callee,
                args,
                is_system,
            } => {
                let args: Vec<ExprId> = args
                    .into_iter()
                    .map(|a| self.bind_expr(node.with(a), scope, point, origin))
                    .collect();
                if is_system {
                    if self.system_subroutine(&callee).is_some() {
                        ExprKind::SystemCall { name: callee, args }
                    } else {
                        self.add_diag(Diagnostic::error(
                            DiagnosticCode::UNKNOWN_SYSTEM_NAME,
                            span,
                            origin,
                            format!("unknown system task or function `{callee}`"),
                        ));
                        ExprKind::Error
                    }
                } else {
                    let mut result = LookupResult::new(LookupNameKind::Callable, point);
                    self.lookup_name(scope, &callee, &mut result);
                    match result.symbol {
                        Some(subroutine) => ExprKind::Call { subroutine, args },
                        None => {
                            self.add_diag(Diagnostic::error(
                                DiagnosticCode::UNDECLARED_IDENTIFIER,
                                span,
                                origin,
                                format!("use of undeclared identifier `{callee}`"),
                            ));
                            ExprKind::Error
                        }
                    }
                }
            }
            NodeKind::Assign { lhs, rhs } => {
                let lhs = self.bind_expr(node.with(lhs), scope, point, origin);
                let rhs = self.bind_expr(node.with(rhs), scope, point, origin);
                ExprKind::Assign { lhs, rhs }
            }
            _ => ExprKind::Error,
        };
        self.alloc_expr(Expr {
            kind: expr_kind,
            span,
        })
    }

    pub fn bind_statement(
        &mut self,
        node: NodeRef,
        scope: ScopeId,
        point: LookupRefPoint,
        origin: SymbolId,
    ) -> StmtId {
        let tree = self.tree(node.tree);
        let n = tree.node(node.node);
        let span = n.span;
        let kind = n.kind.clone();
        drop(tree);

        let stmt_kind = match kind {
            NodeKind::BlockStmt { stmts } => {
                let stmts = stmts
                    .into_iter()
                    .map(|s| self.bind_statement(node.with(s), scope, point, origin))
                    .collect();
                StmtKind::Block(stmts)
            }
            NodeKind::ExprStmt { expr } => {
                StmtKind::Expr(self.bind_expr(node.with(expr), scope, point, origin))
            }
            // Anything else in statement position is a bare expression.
            _ => StmtKind::Expr(self.bind_expr(node, scope, point, origin)),
        };
        self.alloc_stmt(Stmt {
            kind: stmt_kind,
            span,
        })
    }

    /// Bind the queued statement body of a statement-bodied scope and
    /// store it on the owning symbol.
    pub(crate) fn bind_statement_body(&mut self, scope: ScopeId, syntax: NodeRef) {
        let sym = self.scope_data(scope).symbol;
        let stmt = self.bind_statement(syntax, scope, LookupRefPoint::end_of_scope(scope), sym);
        match &mut self.symbol_mut(sym).kind {
            SymbolKind::ProceduralBlock { body, .. } | SymbolKind::Subroutine { body, .. } => {
                *body = Lazy::Forced(Some(stmt));
            }
            _ => {}
        }
    }

    /// Bound body of a statement-bodied symbol, if realized.
    pub fn body_of(&self, sym: SymbolId) -> Option<StmtId> {
        match &self.symbol(sym).kind {
            SymbolKind::ProceduralBlock { body, .. } | SymbolKind::Subroutine { body, .. } => {
                body.forced().flatten()
            }
            _ => None,
        }
    }

    /// Lexical scope containing `sym`.
    pub fn scope_of(&self, sym: SymbolId) -> Option<ScopeId> {
        self.symbol(sym)
            .parent
            .and_then(|p| self.symbol(p).scope)
    }

    /// Force the declared type of `sym`. Cycles resolve to the error type.
    pub fn declared_type_ty(&mut self, sym: SymbolId) -> TypeId {
        let err = self.error_type();
        let (state, type_syntax) = match self.symbol(sym).kind.declared_type() {
            None => return err,
            Some(dt) => (dt.ty, dt.type_syntax),
        };
        match state {
            Lazy::Forced(t) => return t,
            Lazy::Forcing => {
                self.set_declared_ty(sym, Lazy::Forced(err));
                return err;
            }
            Lazy::Unforced => {}
        }
        self.set_declared_ty(sym, Lazy::Forcing);

        let is_enum_owner = matches!(self.symbol(sym).kind, SymbolKind::EnumType { .. });
        let ty = match (type_syntax, self.scope_of(sym)) {
            (Some(ts), Some(scope)) => {
                let point = self.lookup_before(sym);
                let owner = if is_enum_owner { Some(sym) } else { None };
                self.resolve_type_syntax(ts, scope, point, owner, sym)
            }
            (None, _) => self.default_declared_type(sym),
            _ => err,
        };
        self.set_declared_ty(sym, Lazy::Forced(ty));
        ty
    }

    fn set_declared_ty(&mut self, sym: SymbolId, state: Lazy<TypeId>) {
        if let Some(dt) = self.symbol_mut(sym).kind.declared_type_mut() {
            dt.ty = state;
        }
    }

    fn default_declared_type(&mut self, sym: SymbolId) -> TypeId {
        use svala_syntax::BuiltinTypeKind;
        match &self.symbol(sym).kind {
            SymbolKind::Parameter { .. } => self.type_for_syntax(BuiltinTypeKind::Int),
            SymbolKind::Subroutine { is_task: true, .. } => {
                self.type_for_syntax(BuiltinTypeKind::Void)
            }
            SymbolKind::Variable { .. }
            | SymbolKind::FormalArgument { .. }
            | SymbolKind::Port { .. } => self.type_for_syntax(BuiltinTypeKind::Logic),
            _ => self.error_type(),
        }
    }

    /// Force the bound initializer of `sym`, if it has one.
    pub fn declared_init(&mut self, sym: SymbolId) -> Option<ExprId> {
        let (state, init_syntax) = match self.symbol(sym).kind.declared_type() {
            None => return None,
            Some(dt) => (dt.init, dt.init_syntax),
        };
        match state {
            Lazy::Forced(v) => return v,
            Lazy::Forcing => {
                self.set_declared_init(sym, Lazy::Forced(None));
                return None;
            }
            Lazy::Unforced => {}
        }
        self.set_declared_init(sym, Lazy::Forcing);

        let result = match (init_syntax, self.scope_of(sym)) {
            (Some(init), Some(scope)) => {
                let point = self.lookup_before(sym);
                Some(self.bind_expr(init, scope, point, sym))
            }
            _ => None,
        };
        self.set_declared_init(sym, Lazy::Forced(result));
        result
    }

    fn set_declared_init(&mut self, sym: SymbolId, state: Lazy<Option<ExprId>>) {
        if let Some(dt) = self.symbol_mut(sym).kind.declared_type_mut() {
            dt.init = state;
        }
    }

    /// Force a parameter's constant value: the instantiation-site override
    /// when present, otherwise the declared default.
    pub fn parameter_value(&mut self, sym: SymbolId) -> ConstInt {
        let (state, ov_syntax, ov_scope) = match &self.symbol(sym).kind {
            SymbolKind::Parameter {
                value,
                override_syntax,
                override_scope,
                ..
            } => (*value, *override_syntax, *override_scope),
            _ => return ConstInt::Error(ConstEvalError::NonConstant),
        };
        match state {
            Lazy::Forced(v) => return v,
            Lazy::Forcing => {
                let cycle = ConstInt::Error(ConstEvalError::Cycle);
                self.set_parameter_value(sym, Lazy::Forced(cycle));
                return cycle;
            }
            Lazy::Unforced => {}
        }
        self.set_parameter_value(sym, Lazy::Forcing);

        let result = if let (Some(os), Some(osc)) = (ov_syntax, ov_scope) {
            let expr = self.bind_expr(os, osc, LookupRefPoint::MAX, sym);
            self.eval_const(expr)
        } else {
            match self.declared_init(sym) {
                Some(expr) => self.eval_const(expr),
                None => ConstInt::Error(ConstEvalError::NonConstant),
            }
        };
        self.set_parameter_value(sym, Lazy::Forced(result));
        result
    }

    fn set_parameter_value(&mut self, sym: SymbolId, state: Lazy<ConstInt>) {
        if let SymbolKind::Parameter { value, .. } = &mut self.symbol_mut(sym).kind {
            *value = state;
        }
    }

    /// Force an enum value: the bound initializer, or predecessor + 1, or
    /// zero for the first value.
    pub fn enum_value(&mut self, sym: SymbolId) -> ConstInt {
        let (state, init_syntax, prev) = match &self.symbol(sym).kind {
            SymbolKind::EnumValue {
                value,
                init_syntax,
                prev,
                ..
            } => (*value, *init_syntax, *prev),
            _ => return ConstInt::Error(ConstEvalError::NonConstant),
        };
        match state {
            Lazy::Forced(v) => return v,
            Lazy::Forcing => {
                let cycle = ConstInt::Error(ConstEvalError::Cycle);
                self.set_enum_value(sym, Lazy::Forced(cycle));
                return cycle;
            }
            Lazy::Unforced => {}
        }
        self.set_enum_value(sym, Lazy::Forcing);

        let result = if let Some(init) = init_syntax {
            match self.scope_of(sym) {
                Some(scope) => {
                    let point = self.lookup_before(sym);
                    let expr = self.bind_expr(init, scope, point, sym);
                    self.eval_const(expr)
                }
                None => ConstInt::Error(ConstEvalError::NonConstant),
            }
        } else if let Some(prev) = prev {
            match self.enum_value(prev) {
                ConstInt::Known(v) => match v.checked_add(1) {
                    Some(v) => ConstInt::Known(v),
                    None => ConstInt::Error(ConstEvalError::Overflow),
                },
                err => err,
            }
        } else {
            ConstInt::Known(0)
        };
        self.set_enum_value(sym, Lazy::Forced(result));
        result
    }

    fn set_enum_value(&mut self, sym: SymbolId, state: Lazy<ConstInt>) {
        if let SymbolKind::EnumValue { value, .. } = &mut self.symbol_mut(sym).kind {
            *value = state;
        }
    }

    /// Force the bound assignment of a continuous-assign symbol.
    pub fn continuous_assign_expr(&mut self, sym: SymbolId) -> Option<ExprId> {
        let (state, syntax) = match &self.symbol(sym).kind {
            SymbolKind::ContinuousAssign { assignment, syntax } => (*assignment, *syntax),
            _ => return None,
        };
        match state {
            Lazy::Forced(v) => return v,
            Lazy::Forcing => {
                self.set_assign_expr(sym, Lazy::Forced(None));
                return None;
            }
            Lazy::Unforced => {}
        }
        self.set_assign_expr(sym, Lazy::Forcing);

        let result = self
            .scope_of(sym)
            .map(|scope| self.bind_expr(syntax, scope, LookupRefPoint::MAX, sym));
        self.set_assign_expr(sym, Lazy::Forced(result));
        result
    }

    fn set_assign_expr(&mut self, sym: SymbolId, state: Lazy<Option<ExprId>>) {
        if let SymbolKind::ContinuousAssign { assignment, .. } = &mut self.symbol_mut(sym).kind {
            *assignment = state;
        }
    }

    /// Force a port's bound connection, when the instantiation supplied
    /// one. Connections bind in the instantiating scope.
    pub fn port_connection(&mut self, sym: SymbolId) -> Option<ExprId> {
        let (state, syntax, scope) = match &self.symbol(sym).kind {
            SymbolKind::Port {
                connection,
                connection_syntax,
                connection_scope,
                ..
            } => (*connection, *connection_syntax, *connection_scope),
            _ => return None,
        };
        match state {
            Lazy::Forced(v) => return v,
            Lazy::Forcing => {
                self.set_port_connection(sym, Lazy::Forced(None));
                return None;
            }
            Lazy::Unforced => {}
        }
        self.set_port_connection(sym, Lazy::Forcing);

        let result = match (syntax, scope) {
            (Some(cs), Some(sc)) => Some(self.bind_expr(cs, sc, LookupRefPoint::MAX, sym)),
            _ => None,
        };
        self.set_port_connection(sym, Lazy::Forced(result));
        result
    }

    fn set_port_connection(&mut self, sym: SymbolId, state: Lazy<Option<ExprId>>) {
        if let SymbolKind::Port { connection, .. } = &mut self.symbol_mut(sym).kind {
            *connection = state;
        }
    }

    /// Force an explicit import's target symbol, diagnosing missing
    /// packages and members once.
    pub fn explicit_import_target(&mut self, sym: SymbolId) -> Option<SymbolId> {
        let (state, package, member) = match &self.symbol(sym).kind {
            SymbolKind::ExplicitImport {
                imported,
                package,
                member,
            } => (*imported, package.clone(), member.clone()),
            _ => return None,
        };
        match state {
            Lazy::Forced(v) => return v,
            Lazy::Forcing => {
                self.set_import_target(sym, Lazy::Forced(None));
                return None;
            }
            Lazy::Unforced => {}
        }
        self.set_import_target(sym, Lazy::Forcing);

        let span = self.symbol(sym).span;
        let result = match self.package(&package) {
            None => {
                self.add_diag(Diagnostic::error(
                    DiagnosticCode::PACKAGE_NOT_FOUND,
                    span,
                    sym,
                    format!("unknown package `{package}`"),
                ));
                None
            }
            Some(pkg) => {
                let target = self
                    .symbol(pkg)
                    .scope
                    .and_then(|ps| self.lookup_direct(ps, &member));
                if target.is_none() {
                    self.add_diag(Diagnostic::error(
                        DiagnosticCode::MEMBER_NOT_FOUND,
                        span,
                        sym,
                        format!("package `{package}` has no member `{member}`"),
                    ));
                }
                target
            }
        };
        self.set_import_target(sym, Lazy::Forced(result));
        result
    }

    fn set_import_target(&mut self, sym: SymbolId, state: Lazy<Option<SymbolId>>) {
        if let SymbolKind::ExplicitImport { imported, .. } = &mut self.symbol_mut(sym).kind {
            *imported = state;
        }
    }

    /// Force a wildcard import's package symbol, diagnosing a missing
    /// package once.
    pub fn wildcard_import_package(&mut self, sym: SymbolId) -> Option<SymbolId> {
        let (state, package) = match &self.symbol(sym).kind {
            SymbolKind::WildcardImport { resolved, package } => (*resolved, package.clone()),
            _ => return None,
        };
        match state {
            Lazy::Forced(v) => return v,
            Lazy::Forcing => {
                self.set_import_package(sym, Lazy::Forced(None));
                return None;
            }
            Lazy::Unforced => {}
        }
        self.set_import_package(sym, Lazy::Forcing);

        let result = self.package(&package);
        if result.is_none() {
            let span = self.symbol(sym).span;
            self.add_diag(Diagnostic::error(
                DiagnosticCode::PACKAGE_NOT_FOUND,
                span,
                sym,
                format!("unknown package `{package}`"),
            ));
        }
        self.set_import_package(sym, Lazy::Forced(result));
        result
    }

    fn set_import_package(&mut self, sym: SymbolId, state: Lazy<Option<SymbolId>>) {
        if let SymbolKind::WildcardImport { resolved, .. } = &mut self.symbol_mut(sym).kind {
            *resolved = state;
        }
    }

    /// Resolve a type syntax node to a semantic type.
    pub(crate) fn resolve_type_syntax(
        &mut self,
        syntax: NodeRef,
        scope: ScopeId,
        point: LookupRefPoint,
        enum_owner: Option<SymbolId>,
        origin: SymbolId,
    ) -> TypeId {
        let tree = self.tree(syntax.tree);
        let n = tree.node(syntax.node);
        let span = n.span;
        let kind = n.kind.clone();
        drop(tree);

        match kind {
            NodeKind::BuiltinType { kind, packed } => {
                let base = self.type_for_syntax(kind);
                let Some((msb, lsb)) = packed else {
                    return base;
                };
                let msb_expr = self.bind_expr(syntax.with(msb), scope, point, origin);
                let lsb_expr = self.bind_expr(syntax.with(lsb), scope, point, origin);
                let msb = self.eval_const(msb_expr);
                let lsb = self.eval_const(lsb_expr);
                match (msb.known(), lsb.known(), self.type_data(base).integral_flags()) {
                    (Some(m), Some(l), Some(flags))
                        if matches!(self.type_data(base).kind, TypeKind::Scalar { .. }) =>
                    {
                        let width = m.abs_diff(l).saturating_add(1);
                        match u32::try_from(width) {
                            Ok(width) if width > 0 => self.vector_type(width, flags),
                            _ => self.error_type(),
                        }
                    }
                    _ => self.error_type(),
                }
            }
            NodeKind::NamedType { name } => {
                let mut result = LookupResult::new(LookupNameKind::Local, point);
                self.lookup_name(scope, &name, &mut result);
                match result.result_kind {
                    LookupResultKind::Found => {
                        let target = result.symbol.expect("found result has a symbol");
                        let is_type = matches!(
                            self.symbol(target).kind,
                            SymbolKind::EnumType { .. } | SymbolKind::TypeAlias { .. }
                        );
                        if is_type {
                            self.declared_type_ty(target)
                        } else {
                            self.add_diag(Diagnostic::error(
                                DiagnosticCode::NOT_A_TYPE,
                                span,
                                origin,
                                format!("`{name}` is not a type"),
                            ));
                            self.error_type()
                        }
                    }
                    LookupResultKind::AmbiguousImport => {
                        self.add_diag(Diagnostic::error(
                            DiagnosticCode::AMBIGUOUS_WILDCARD_IMPORT,
                            span,
                            origin,
                            format!("`{name}` is ambiguously imported by multiple wildcard imports"),
                        ));
                        self.error_type()
                    }
                    LookupResultKind::NotFound => {
                        self.add_diag(Diagnostic::error(
                            DiagnosticCode::UNDECLARED_TYPE,
                            span,
                            origin,
                            format!("unknown type `{name}`"),
                        ));
                        self.error_type()
                    }
                }
            }
            NodeKind::EnumType { base, variants } => {
                self.build_enum_type(syntax, span, base, variants, scope, point, enum_owner, origin)
            }
            _ => self.error_type(),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn build_enum_type(
        &mut self,
        syntax: NodeRef,
        span: Span,
        base: Option<svala_syntax::NodeId>,
        variants: Vec<svala_syntax::NodeId>,
        scope: ScopeId,
        point: LookupRefPoint,
        enum_owner: Option<SymbolId>,
        origin: SymbolId,
    ) -> TypeId {
        let base_ty = match base {
            Some(b) => self.resolve_type_syntax(syntax.with(b), scope, point, None, origin),
            None => self.type_for_syntax(svala_syntax::BuiltinTypeKind::Int),
        };

        let owner = match enum_owner {
            Some(owner) => owner,
            None => {
                // Anonymous enum: give the owner a parent back-reference
                // and the introducer's index, but keep it out of the
                // member chain and name map.
                let owner = self.create_symbol(
                    SymbolKind::EnumType {
                        declared: crate::symbols::DeclaredType::new(Some(syntax), None),
                    },
                    SmolStr::default(),
                    span,
                );
                let scope_sym = self.scope_data(scope).symbol;
                let origin_index = self.symbol(origin).index;
                let o = self.symbol_mut(owner);
                o.parent = Some(scope_sym);
                o.index = origin_index;
                self.create_scope(owner);
                owner
            }
        };
        let owner_scope = match self.symbol(owner).scope {
            Some(s) => s,
            None => self.create_scope(owner),
        };

        let mut prev = None;
        for variant in variants {
            let (name, init) = self.declarator_parts(syntax.tree, variant);
            let vspan = {
                let tree = self.tree(syntax.tree);
                tree.node(variant).span
            };
            let value = self.create_symbol(
                SymbolKind::EnumValue {
                    base: base_ty,
                    init_syntax: init,
                    prev,
                    value: Lazy::Unforced,
                },
                name,
                vspan,
            );
            self.add_member(owner_scope, value);
            prev = Some(value);
        }

        let name = self.symbol(owner).name.clone();
        let ty = self.alloc_type(
            TypeKind::Enum {
                symbol: owner,
                base: base_ty,
            },
            name,
        );
        if enum_owner.is_none() {
            self.set_declared_ty(owner, Lazy::Forced(ty));
        }
        ty
    }

    /// Evaluate a bound expression to a constant integer.
    pub fn eval_const(&mut self, expr: ExprId) -> ConstInt {
        let kind = self.expr(expr).kind.clone();
        match kind {
            ExprKind::Literal(v) => ConstInt::Known(v),
            ExprKind::NamedValue(sym) => {
                enum ValueKind {
                    Parameter,
                    EnumValue,
                    Other,
                }
                let vk = match &self.symbol(sym).kind {
                    SymbolKind::Parameter { .. } => ValueKind::Parameter,
                    SymbolKind::EnumValue { .. } => ValueKind::EnumValue,
                    _ => ValueKind::Other,
                };
                match vk {
                    ValueKind::Parameter => self.parameter_value(sym),
                    ValueKind::EnumValue => self.enum_value(sym),
                    ValueKind::Other => ConstInt::Error(ConstEvalError::NonConstant),
                }
            }
            ExprKind::Unary { op, operand } => match self.eval_const(operand) {
                ConstInt::Known(v) => eval_unary(op, v),
                err => err,
            },
            ExprKind::Binary { op, lhs, rhs } => {
                let lhs = self.eval_const(lhs);
                let rhs = self.eval_const(rhs);
                match (lhs, rhs) {
                    (ConstInt::Known(l), ConstInt::Known(r)) => eval_binary(op, l, r),
                    (ConstInt::Error(e), _) | (_, ConstInt::Error(e)) => ConstInt::Error(e),
                }
            }
            ExprKind::SystemCall { name, args } if name == "$clog2" && args.len() == 1 => {
                match self.eval_const(args[0]) {
                    ConstInt::Known(v) if v >= 0 => ConstInt::Known(clog2(v as u64)),
                    ConstInt::Known(_) => ConstInt::Error(ConstEvalError::NonConstant),
                    err => err,
                }
            }
            ExprKind::SystemCall { .. } | ExprKind::Call { .. } | ExprKind::Assign { .. } => {
                ConstInt::Error(ConstEvalError::NonConstant)
            }
            ExprKind::Error => ConstInt::Error(ConstEvalError::Unresolved),
        }
    }
}

fn clog2(v: u64) -> i64 {
    if v <= 1 {
        0
    } else {
        (64 - (v - 1).leading_zeros()) as i64
    }
}

fn eval_unary(op: UnaryOp, v: i64) -> ConstInt {
    match op {
        UnaryOp::Plus => ConstInt::Known(v),
        UnaryOp::Minus => match v.checked_neg() {
            Some(v) => ConstInt::Known(v),
            None => ConstInt::Error(ConstEvalError::Overflow),
        },
        UnaryOp::Not => ConstInt::Known((v == 0) as i64),
        UnaryOp::BitNot => ConstInt::Known(!v),
    }
}

fn eval_binary(op: BinaryOp, l: i64, r: i64) -> ConstInt {
    use BinaryOp::*;
    let checked = match op {
        Add => l.checked_add(r),
        Sub => l.checked_sub(r),
        Mul => l.checked_mul(r),
        Div => {
            if r == 0 {
                return ConstInt::Error(ConstEvalError::DivideByZero);
            }
            l.checked_div(r)
        }
        Mod => {
            if r == 0 {
                return ConstInt::Error(ConstEvalError::DivideByZero);
            }
            l.checked_rem(r)
        }
        Shl => {
            if !(0..64).contains(&r) {
                return ConstInt::Error(ConstEvalError::Overflow);
            }
            l.checked_shl(r as u32)
        }
        Shr => {
            if !(0..64).contains(&r) {
                return ConstInt::Error(ConstEvalError::Overflow);
            }
            l.checked_shr(r as u32)
        }
        BitAnd => Some(l & r),
        BitOr => Some(l | r),
        BitXor => Some(l ^ r),
        LogicAnd => Some(((l != 0) && (r != 0)) as i64),
        LogicOr => Some(((l != 0) || (r != 0)) as i64),
        Eq => Some((l == r) as i64),
        Ne => Some((l != r) as i64),
        Lt => Some((l < r) as i64),
        Le => Some((l <= r) as i64),
        Gt => Some((l > r) as i64),
        Ge => Some((l >= r) as i64),
    };
    match checked {
        Some(v) => ConstInt::Known(v),
        None => ConstInt::Error(ConstEvalError::Overflow),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clog2_values() {
        assert_eq!(clog2(0), 0);
        assert_eq!(clog2(1), 0);
        assert_eq!(clog2(2), 1);
        assert_eq!(clog2(3), 2);
        assert_eq!(clog2(8), 3);
        assert_eq!(clog2(9), 4);
    }

    #[test]
    fn binary_arith() {
        assert_eq!(eval_binary(BinaryOp::Add, 2, 3), ConstInt::Known(5));
        assert_eq!(
            eval_binary(BinaryOp::Div, 1, 0),
            ConstInt::Error(ConstEvalError::DivideByZero)
        );
        assert_eq!(eval_binary(BinaryOp::Shl, 1, 4), ConstInt::Known(16));
        assert_eq!(
            eval_binary(BinaryOp::Mul, i64::MAX, 2),
            ConstInt::Error(ConstEvalError::Overflow)
        );
        assert_eq!(eval_binary(BinaryOp::Le, 3, 3), ConstInt::Known(1));
    }

    #[test]
    fn unary_ops() {
        assert_eq!(eval_unary(UnaryOp::Minus, 5), ConstInt::Known(-5));
        assert_eq!(eval_unary(UnaryOp::Not, 0), ConstInt::Known(1));
        assert_eq!(eval_unary(UnaryOp::BitNot, 0), ConstInt::Known(-1));
    }
}
