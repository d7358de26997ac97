//! Variable resolution: one walk over the AST between parsing and execution.
//!
//! Each block and function body pushes a frame mapping names to
//! "declared" (`false`) or "defined" (`true`).  For every `Variable`,
//! `Assign` and `This` node the walk records how many frames separate the
//! use from its declaration; a name found in no frame is global and gets no
//! entry.  The interpreter uses those hop counts to reach the exact scope a
//! closure captured, so a later shadowing declaration cannot change what an
//! earlier reference means.
//!
//! Static rules are checked on the way and reported into [`Diagnostics`]:
//! duplicate locals, reading a local in its own initializer, `return` at top
//! level or with a value inside `init`, and `this` outside a class.

use crate::ast::{Expr, ExprId, FunctionDecl, Stmt};
use crate::error::{Diagnostics, LoxError};
use crate::stack::ensure_sufficient_stack;
use crate::token::Token;
use log::{debug, info};
use std::collections::{HashMap, HashSet};

/// What kind of function body we are in.  Used to validate `return`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum FunctionType {
    None,
    Function,
    Method,
    Initializer,
}

/// Are we inside a class body?  Used to validate `this`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum ClassType {
    None,
    Class,
}

/// Resolution side table: reference node → number of scope hops to the
/// declaring scope.  Absent ⇒ global, looked up by name at run time.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Locals {
    depths: HashMap<ExprId, usize>,
}

impl Locals {
    pub fn depth_of(&self, id: ExprId) -> Option<usize> {
        self.depths.get(&id).copied()
    }

    pub fn len(&self) -> usize {
        self.depths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.depths.is_empty()
    }

    fn record(&mut self, id: ExprId, depth: usize) {
        self.depths.insert(id, depth);
    }
}

impl IntoIterator for Locals {
    type Item = (ExprId, usize);
    type IntoIter = std::collections::hash_map::IntoIter<ExprId, usize>;

    fn into_iter(self) -> Self::IntoIter {
        self.depths.into_iter()
    }
}

/// Walks one compilation unit and produces its [`Locals`].
pub struct Resolver<'a> {
    diagnostics: &'a mut Diagnostics,
    /// Innermost frame last.  `false` until the initializer has been resolved.
    scopes: Vec<HashMap<&'a str, bool>>,
    globals: HashSet<String>,
    current_function: FunctionType,
    current_class: ClassType,
    locals: Locals,
}

impl<'a> Resolver<'a> {
    /// Create a new resolver reporting into `diagnostics`.
    pub fn new(diagnostics: &'a mut Diagnostics) -> Self {
        info!("Resolver created");

        Resolver {
            diagnostics,
            scopes: Vec::new(),
            globals: HashSet::new(),
            current_function: FunctionType::None,
            current_class: ClassType::None,
            locals: Locals::default(),
        }
    }

    /// Names already bound in the live global environment (earlier REPL
    /// lines, natives).  A local initializer that mentions its own name may
    /// legitimately mean one of these.
    pub fn with_globals<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.globals.extend(names.into_iter().map(Into::into));
        self
    }

    /// Walk all top‑level statements and return the side table.
    pub fn resolve(mut self, statements: &'a [Stmt]) -> Locals {
        info!(
            "Beginning resolve pass over {} statement(s)",
            statements.len()
        );

        for stmt in statements {
            self.resolve_stmt(stmt);
        }

        info!("Resolved {} local reference(s)", self.locals.len());

        self.locals
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Statement resolution
    // ─────────────────────────────────────────────────────────────────────────

    fn resolve_stmt(&mut self, stmt: &'a Stmt) {
        ensure_sufficient_stack(|| self.visit_stmt(stmt));
    }

    fn visit_stmt(&mut self, stmt: &'a Stmt) {
        match stmt {
            Stmt::Block(statements) => {
                self.begin_scope();
                for s in statements {
                    self.resolve_stmt(s);
                }
                self.end_scope();
            }

            Stmt::Var { name, initializer } => {
                // declare → resolve initializer → define
                self.declare(name);
                if let Some(expr) = initializer {
                    self.resolve_expr(expr);
                }
                self.define(name);
            }

            Stmt::Function(decl) => {
                // the name is visible *inside* its own body (recursion)
                self.declare(&decl.name);
                self.define(&decl.name);
                self.resolve_function(decl, FunctionType::Function);
            }

            Stmt::Class { name, methods } => {
                self.declare(name);
                self.define(name);

                let enclosing_class = self.current_class;
                self.current_class = ClassType::Class;

                self.begin_scope();
                if let Some(scope) = self.scopes.last_mut() {
                    scope.insert("this", true);
                }

                for method in methods {
                    let kind = if method.name.lexeme == "init" {
                        FunctionType::Initializer
                    } else {
                        FunctionType::Method
                    };
                    self.resolve_function(method, kind);
                }

                self.end_scope();
                self.current_class = enclosing_class;
            }

            Stmt::Expression(expr) | Stmt::Print(expr) => {
                self.resolve_expr(expr);
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.resolve_expr(condition);
                self.resolve_stmt(then_branch);
                if let Some(eb) = else_branch.as_deref() {
                    self.resolve_stmt(eb);
                }
            }

            Stmt::While { condition, body } => {
                self.resolve_expr(condition);
                self.resolve_stmt(body);
            }

            Stmt::Return { keyword, value } => {
                if self.current_function == FunctionType::None {
                    self.error(keyword, "Can't return from top-level code.");
                }

                if let Some(expr) = value {
                    if self.current_function == FunctionType::Initializer {
                        self.error(keyword, "Can't return a value from an initializer.");
                    }
                    self.resolve_expr(expr);
                }
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Expression resolution
    // ─────────────────────────────────────────────────────────────────────────

    fn resolve_expr(&mut self, expr: &'a Expr) {
        ensure_sufficient_stack(|| self.visit_expr(expr));
    }

    fn visit_expr(&mut self, expr: &'a Expr) {
        match expr {
            Expr::Literal(_) => {}

            Expr::Grouping(inner) => self.resolve_expr(inner),

            Expr::Unary { right, .. } => self.resolve_expr(right),

            Expr::Binary { left, right, .. } | Expr::Logical { left, right, .. } => {
                self.resolve_expr(left);
                self.resolve_expr(right);
            }

            Expr::Variable { id, name } => self.resolve_local(*id, name, true),

            Expr::Assign { id, name, value } => {
                self.resolve_expr(value);
                self.resolve_local(*id, name, false);
            }

            Expr::Call {
                callee, arguments, ..
            } => {
                self.resolve_expr(callee);
                for arg in arguments {
                    self.resolve_expr(arg);
                }
            }

            Expr::Get { object, .. } => self.resolve_expr(object),

            Expr::Set { object, value, .. } => {
                self.resolve_expr(value);
                self.resolve_expr(object);
            }

            Expr::This { id, keyword } => {
                if self.current_class == ClassType::None {
                    self.error(keyword, "Can't use 'this' outside of a class.");
                    return;
                }
                self.resolve_local(*id, keyword, true);
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Function helper
    // ─────────────────────────────────────────────────────────────────────────

    /// Enter a fresh scope for a function's parameters + body.
    fn resolve_function(&mut self, decl: &'a FunctionDecl, kind: FunctionType) {
        let enclosing = self.current_function;
        self.current_function = kind;

        self.begin_scope();
        for param in &decl.params {
            self.declare(param);
            self.define(param);
        }
        for stmt in &decl.body {
            self.resolve_stmt(stmt);
        }
        self.end_scope();

        self.current_function = enclosing;
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Scope management
    // ─────────────────────────────────────────────────────────────────────────

    #[inline]
    fn begin_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    #[inline]
    fn end_scope(&mut self) {
        self.scopes.pop();
    }

    fn declare(&mut self, name: &'a Token) {
        let Some(scope) = self.scopes.last_mut() else {
            self.globals.insert(name.lexeme.clone());
            return;
        };

        if scope.insert(name.lexeme.as_str(), false).is_some() {
            self.error(name, "Already a variable with this name in this scope.");
        }
    }

    fn define(&mut self, name: &'a Token) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.lexeme.as_str(), true);
        }
    }

    fn error(&mut self, token: &Token, message: &str) {
        self.diagnostics.report(LoxError::resolve(token, message));
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Hop counts
    // ─────────────────────────────────────────────────────────────────────────

    /// Record this occurrence as either a local at depth `d` or, if not found
    /// in *any* scope, a global.
    ///
    /// A read skips a slot that is declared but not yet defined, so the
    /// initializer of `var a = a;` sees the *outer* `a`.  Only when no outer
    /// binding exists is the read reported as self‑referential.
    fn resolve_local(&mut self, id: ExprId, name: &Token, reading: bool) {
        let mut uninitialized: bool = false;

        for (depth, scope) in self.scopes.iter().rev().enumerate() {
            match scope.get(name.lexeme.as_str()) {
                Some(false) if reading => {
                    uninitialized = true;
                }

                Some(_) => {
                    debug!("Resolved '{}' at depth {}", name.lexeme, depth);
                    self.locals.record(id, depth);
                    return;
                }

                None => {}
            }
        }

        if uninitialized && !self.globals.contains(&name.lexeme) {
            self.error(name, "Can't read local variable in its own initializer.");
            return;
        }

        debug!("Resolved '{}' as global", name.lexeme);
    }
}
