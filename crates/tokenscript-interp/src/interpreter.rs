//! The tree-walking interpreter.
//!
//! Evaluates a parsed program against a symbol table, an external
//! reference map, and the shared [`Config`]. Evaluation is strict
//! left-to-right; `&&`/`||` short-circuit; every `while`/`for` body entry
//! counts against the configured iteration cap. A `return` terminates the
//! interpret call with its value; without one, the call yields the value
//! of the last evaluated expression statement, or nothing for a
//! declaration-only program.

use std::sync::Arc;

use indexmap::IndexMap;
use tokenscript_par::ast::{
    AttrExpr, BaseType, BinOp, BinaryExpr, Block, CallExpr, Expr, Program, Stmt, UnOp,
};
use tokenscript_util::{ErrorKind, Span};

use crate::config::Config;
use crate::error::{RuntimeError, RuntimeResult};
use crate::symbol_table::SymbolTable;
use crate::value::{ColorValue, DictValue, ListValue, Number, UnitValue, Value};

/// Construction options for an [`Interpreter`].
#[derive(Clone, Debug, Default)]
pub struct InterpreterOptions {
    /// Shared configuration (language options and spec managers).
    pub config: Config,

    /// External references consumed by `{name}` nodes.
    pub references: IndexMap<String, Value>,
}

/// What executing a statement produced.
enum Outcome {
    /// Control continues; the payload is the value of the most recent
    /// expression statement, if any.
    Normal(Option<Value>),

    /// A `return` fired.
    Return(Option<Value>),
}

/// The TokenScript interpreter.
///
/// # Example
///
/// ```
/// use tokenscript_interp::{Config, Interpreter, InterpreterOptions};
///
/// let config = Config::new();
/// let program = config.parse("return 2 + 3;").unwrap();
/// let mut interpreter = Interpreter::new(program, InterpreterOptions {
///     config,
///     references: Default::default(),
/// });
/// let value = interpreter.interpret().unwrap().unwrap();
/// assert_eq!(value.to_display_string(), "5");
/// ```
pub struct Interpreter {
    program: Arc<Program>,
    config: Config,
    references: IndexMap<String, Value>,
    table: SymbolTable,
    iterations: u32,
}

impl Interpreter {
    /// Creates an interpreter over a parsed program.
    pub fn new(program: impl Into<Arc<Program>>, options: InterpreterOptions) -> Self {
        Self {
            program: program.into(),
            config: options.config,
            references: options.references,
            table: SymbolTable::new(),
            iterations: 0,
        }
    }

    /// Creates a nested interpreter for a spec-embedded script.
    ///
    /// The clone of `config` shares the spec registries by reference, so
    /// the script sees every registered spec without re-registration.
    pub(crate) fn for_script(
        ast: Arc<Program>,
        config: &Config,
        references: IndexMap<String, Value>,
    ) -> Self {
        Self::new(
            ast,
            InterpreterOptions {
                config: config.clone(),
                references,
            },
        )
    }

    /// Runs the program.
    ///
    /// Returns the `return` value, or the last expression statement's
    /// value, or `None` for a declaration-only program. Root-scope
    /// bindings persist until the interpreter is dropped.
    pub fn interpret(&mut self) -> RuntimeResult<Option<Value>> {
        self.iterations = 0;
        let program = self.program.clone();

        let mut last = None;
        for stmt in program.iter() {
            match self.exec_stmt(stmt)? {
                Outcome::Return(value) => return Ok(value),
                Outcome::Normal(Some(value)) => last = Some(value),
                Outcome::Normal(None) => {}
            }
        }
        Ok(last)
    }

    // =========================================================================
    // STATEMENTS
    // =========================================================================

    fn exec_stmt(&mut self, stmt: &Stmt) -> RuntimeResult<Outcome> {
        match stmt {
            Stmt::VarDecl(decl) => {
                let value = match &decl.init {
                    Some(init) => self.eval(init)?,
                    None => default_value(&decl.ty.base, decl.ty.sub.as_ref().map(|s| s.name.clone())),
                };
                let value = self.coerce_declared(
                    decl.ty.base,
                    decl.ty.sub.as_ref().map(|s| s.name.as_str()),
                    value,
                    decl.span,
                )?;
                self.check_declared(decl.ty.base, &value, decl.span)?;
                self.table.declare(
                    &decl.name.name,
                    Some(decl.ty.base),
                    decl.ty.sub.as_ref().map(|s| s.name.clone()),
                    value,
                    decl.name.span,
                )?;
                Ok(Outcome::Normal(None))
            }

            Stmt::Reassign(assign) => {
                let value = self.eval(&assign.value)?;
                if assign.attrs.is_empty() {
                    self.assign_variable(&assign.target.name, value, assign.span)?;
                } else {
                    self.assign_attribute(assign, value)?;
                }
                Ok(Outcome::Normal(None))
            }

            Stmt::If(ifstmt) => {
                if self.eval_condition(&ifstmt.condition)? {
                    return self.exec_block(&ifstmt.then_block);
                }
                for (condition, block) in &ifstmt.elif_branches {
                    if self.eval_condition(condition)? {
                        return self.exec_block(block);
                    }
                }
                match &ifstmt.else_block {
                    Some(block) => self.exec_block(block),
                    None => Ok(Outcome::Normal(None)),
                }
            }

            Stmt::While(whilestmt) => {
                let mut last = None;
                loop {
                    if !self.eval_condition(&whilestmt.condition)? {
                        break;
                    }
                    self.enter_loop_body(whilestmt.span)?;
                    match self.exec_block(&whilestmt.body)? {
                        Outcome::Return(value) => return Ok(Outcome::Return(value)),
                        Outcome::Normal(Some(value)) => last = Some(value),
                        Outcome::Normal(None) => {}
                    }
                }
                Ok(Outcome::Normal(last))
            }

            Stmt::For(forstmt) => {
                let items = self.eval_iterable(&forstmt.iterable)?;
                let mut last = None;
                for item in items {
                    self.enter_loop_body(forstmt.span)?;
                    self.table.push_scope();
                    let outcome = self
                        .table
                        .declare(&forstmt.binding.name, None, None, item, forstmt.binding.span)
                        .and_then(|_| self.exec_stmts(&forstmt.body.stmts));
                    self.table.pop_scope();
                    match outcome? {
                        Outcome::Return(value) => return Ok(Outcome::Return(value)),
                        Outcome::Normal(Some(value)) => last = Some(value),
                        Outcome::Normal(None) => {}
                    }
                }
                Ok(Outcome::Normal(last))
            }

            Stmt::Return(ret) => {
                let value = match &ret.value {
                    Some(expr) => Some(self.eval(expr)?),
                    None => None,
                };
                Ok(Outcome::Return(value))
            }

            Stmt::Expr(stmt) => {
                let value = self.eval(&stmt.expr)?;
                Ok(Outcome::Normal(Some(value)))
            }
        }
    }

    /// Runs a block in its own scope.
    fn exec_block(&mut self, block: &Block) -> RuntimeResult<Outcome> {
        self.table.push_scope();
        let outcome = self.exec_stmts(&block.stmts);
        self.table.pop_scope();
        outcome
    }

    /// Runs statements in the current scope.
    fn exec_stmts(&mut self, stmts: &[Stmt]) -> RuntimeResult<Outcome> {
        let mut last = None;
        for stmt in stmts {
            match self.exec_stmt(stmt)? {
                Outcome::Return(value) => return Ok(Outcome::Return(value)),
                Outcome::Normal(Some(value)) => last = Some(value),
                Outcome::Normal(None) => {}
            }
        }
        Ok(Outcome::Normal(last))
    }

    /// Counts a loop-body entry against the iteration cap.
    fn enter_loop_body(&mut self, span: Span) -> RuntimeResult<()> {
        self.iterations += 1;
        if self.iterations > self.config.options.max_iterations {
            return Err(RuntimeError::new(
                ErrorKind::IterationLimitExceeded,
                format!(
                    "loop exceeded the iteration cap of {}",
                    self.config.options.max_iterations
                ),
            )
            .with_span(span));
        }
        Ok(())
    }

    fn eval_condition(&mut self, expr: &Expr) -> RuntimeResult<bool> {
        let value = self.eval(expr)?;
        value.as_bool().ok_or_else(|| {
            RuntimeError::new(
                ErrorKind::TypeMismatch,
                format!("condition must be a Boolean, got {}", value.type_name()),
            )
            .with_span(expr.span())
        })
    }

    fn eval_iterable(&mut self, expr: &Expr) -> RuntimeResult<Vec<Value>> {
        let value = self.eval(expr)?;
        match value {
            Value::List(list) => Ok(list.items.borrow().clone()),
            Value::Dict(dict) => Ok(dict.values()),
            Value::Str(s) => Ok(s.chars().map(|c| Value::Str(c.to_string())).collect()),
            other => Err(RuntimeError::new(
                ErrorKind::TypeMismatch,
                format!("cannot iterate over {}", other.type_name()),
            )
            .with_span(expr.span())),
        }
    }

    // =========================================================================
    // ASSIGNMENT
    // =========================================================================

    fn assign_variable(&mut self, name: &str, value: Value, span: Span) -> RuntimeResult<()> {
        let Some(binding) = self.table.get(name) else {
            return Err(RuntimeError::new(
                ErrorKind::UndefinedVariable,
                format!("variable '{name}' is not declared"),
            )
            .with_span(span));
        };
        let (base, sub) = (binding.base, binding.sub.clone());

        let value = match base {
            Some(base) => self.coerce_declared(base, sub.as_deref(), value, span)?,
            None => value,
        };
        self.table.assign(name, value, span)
    }

    /// Attribute assignment delegates to the owning value's contract;
    /// colors go through the color manager's schema check.
    fn assign_attribute(
        &mut self,
        assign: &tokenscript_par::ast::Reassign,
        value: Value,
    ) -> RuntimeResult<()> {
        let Some(binding) = self.table.get(&assign.target.name) else {
            return Err(RuntimeError::new(
                ErrorKind::UndefinedVariable,
                format!("variable '{}' is not declared", assign.target.name),
            )
            .with_span(assign.span));
        };

        match &binding.value {
            Value::Color(color) => {
                let color = color.clone();
                let attrs: Vec<String> =
                    assign.attrs.iter().map(|a| a.name.clone()).collect();
                self.config
                    .colors()
                    .set_attribute(&color, &attrs, value)
                    .map_err(|e| e.or_span(assign.span))
            }
            other => Err(RuntimeError::new(
                ErrorKind::TypeMismatch,
                format!(
                    "attribute assignment is not supported on {}",
                    other.type_name()
                ),
            )
            .with_span(assign.span)),
        }
    }

    /// Coerces a value toward a declared type before binding it.
    ///
    /// A declared `Number` with a unit sub-type pulls dimensioned values
    /// into that unit through the unit manager; a declared `Color` with a
    /// sub-type stamps unresolved colors and rejects mismatched ones.
    fn coerce_declared(
        &self,
        base: BaseType,
        sub: Option<&str>,
        value: Value,
        span: Span,
    ) -> RuntimeResult<Value> {
        match (base, value, sub) {
            (BaseType::Number | BaseType::NumberWithUnit, Value::UnitNumber(u), Some(unit))
                if !u.unit.eq_ignore_ascii_case(unit) =>
            {
                let converted = self
                    .config
                    .units()
                    .convert_to_keyword(&u, unit, &self.config)
                    .map_err(|e| e.or_span(span))?;
                Ok(Value::UnitNumber(converted))
            }
            (BaseType::Color, Value::Color(mut color), Some(sub)) => {
                if color.sub_type.is_empty() {
                    color.sub_type = sub.to_string();
                } else if !color.sub_type.eq_ignore_ascii_case(sub) {
                    return Err(RuntimeError::new(
                        ErrorKind::TypeMismatch,
                        format!(
                            "expected a Color.{sub}, got Color.{}",
                            color.sub_type
                        ),
                    )
                    .with_span(span));
                }
                Ok(Value::Color(color))
            }
            (_, value, _) => Ok(value),
        }
    }

    /// Verifies a value's tag against a declared base type.
    fn check_declared(&self, base: BaseType, value: &Value, span: Span) -> RuntimeResult<()> {
        if crate::symbol_table::type_matches(base, value) {
            return Ok(());
        }
        Err(RuntimeError::new(
            ErrorKind::TypeMismatch,
            format!("expected {base}, got {}", value.type_name()),
        )
        .with_span(span))
    }

    // =========================================================================
    // EXPRESSIONS
    // =========================================================================

    fn eval(&mut self, expr: &Expr) -> RuntimeResult<Value> {
        match expr {
            Expr::Int(lit) => Ok(Value::Number(Number::Int(lit.value))),
            Expr::Float(lit) => Ok(Value::Number(Number::Float(lit.value))),
            Expr::UnitNumber(lit) => {
                if !self.config.units().is_unit_keyword(&lit.unit) {
                    return Err(RuntimeError::new(
                        ErrorKind::MissingSpec,
                        format!("unit '{}' is not registered", lit.unit),
                    )
                    .with_span(lit.span));
                }
                let value = if lit.integral && lit.value.abs() < i64::MAX as f64 {
                    Number::Int(lit.value as i64)
                } else {
                    Number::Float(lit.value)
                };
                Ok(Value::UnitNumber(UnitValue::new(value, lit.unit.clone())))
            }
            Expr::Str(lit) => Ok(Value::Str(lit.value.clone())),
            Expr::Bool(lit) => Ok(Value::Bool(lit.value)),
            Expr::Null(_) => Ok(Value::Null),
            Expr::HexColor(lit) => Ok(Value::Color(ColorValue::literal("Hex", &lit.value))),

            Expr::Ident(ident) => match self.table.get(&ident.name) {
                Some(binding) => Ok(binding.value.clone()),
                None => Err(RuntimeError::new(
                    ErrorKind::UndefinedVariable,
                    format!("variable '{}' is not declared", ident.name),
                )
                .with_span(ident.span)),
            },

            Expr::Reference(reference) => match self.references.get(&reference.path) {
                Some(value) => Ok(value.clone()),
                None => Err(RuntimeError::new(
                    ErrorKind::UndefinedReference,
                    format!("reference '{{{}}}' is not defined", reference.path),
                )
                .with_span(reference.span)),
            },

            Expr::Attr(attr) => {
                let mut value = self.eval(&attr.object)?;
                for ident in &attr.attrs {
                    value = self.read_attribute(value, &ident.name, ident.span)?;
                }
                Ok(value)
            }

            Expr::Call(call) => self.eval_call(call),

            Expr::Index(index) => {
                let object = self.eval(&index.object)?;
                let key = self.eval(&index.index)?;
                self.eval_index(object, key, index.span)
            }

            Expr::Unary(unary) => {
                let operand = self.eval(&unary.operand)?;
                match (unary.op, operand) {
                    (UnOp::Neg, Value::Number(n)) => Ok(Value::Number(n.neg())),
                    (UnOp::Neg, Value::UnitNumber(u)) => Ok(Value::UnitNumber(UnitValue::new(
                        u.value.neg(),
                        u.unit,
                    ))),
                    (UnOp::Not, Value::Bool(b)) => Ok(Value::Bool(!b)),
                    (op, operand) => Err(RuntimeError::new(
                        ErrorKind::TypeMismatch,
                        format!(
                            "unary '{}' is not defined on {}",
                            match op {
                                UnOp::Neg => "-",
                                UnOp::Not => "!",
                            },
                            operand.type_name()
                        ),
                    )
                    .with_span(unary.span)),
                }
            }

            Expr::Binary(binary) => self.eval_binary(binary),

            Expr::ImplicitList(list) => {
                let items: Vec<Value> = list
                    .items
                    .iter()
                    .map(|item| self.eval(item))
                    .collect::<RuntimeResult<_>>()?;
                // Adjacent strings concatenate with single spaces; mixed
                // content stays a space-joined list.
                if items.iter().all(|item| matches!(item, Value::Str(_))) {
                    let joined = items
                        .iter()
                        .map(|item| item.to_string())
                        .collect::<Vec<_>>()
                        .join(" ");
                    Ok(Value::Str(joined))
                } else {
                    Ok(Value::List(ListValue::spaced(items)))
                }
            }

            Expr::CommaList(list) => {
                let items: Vec<Value> = list
                    .items
                    .iter()
                    .map(|item| self.eval(item))
                    .collect::<RuntimeResult<_>>()?;
                Ok(Value::List(ListValue::new(items)))
            }
        }
    }

    // =========================================================================
    // CALLS AND METHODS
    // =========================================================================

    fn eval_call(&mut self, call: &CallExpr) -> RuntimeResult<Value> {
        match call.callee.as_ref() {
            // Bare call: a registered color initializer keyword.
            Expr::Ident(ident) => {
                if !self.config.colors().has_initializer(&ident.name) {
                    return Err(RuntimeError::new(
                        ErrorKind::UndefinedVariable,
                        format!("unknown function '{}'", ident.name),
                    )
                    .with_span(ident.span));
                }
                let args = self.eval_args(&call.args)?;
                self.config
                    .colors()
                    .run_initializer(&ident.name, args, &self.config)
                    .map_err(|e| e.or_span(call.span))
            }

            // Method call: the final attribute names the method.
            Expr::Attr(attr) => {
                let receiver = self.eval_method_receiver(attr)?;
                let method = &attr.attrs[attr.attrs.len() - 1];

                if let Value::ConversionProxy(color) = receiver {
                    if !call.args.is_empty() {
                        return Err(RuntimeError::new(
                            ErrorKind::TypeMismatch,
                            "conversion calls take no arguments",
                        )
                        .with_span(call.span));
                    }
                    let converted = self
                        .config
                        .colors()
                        .convert_to_by_type(&color, &method.name, &self.config)
                        .map_err(|e| e.or_span(call.span))?;
                    return Ok(Value::Color(converted));
                }

                let args = self.eval_args(&call.args)?;
                self.call_method(receiver, &method.name, args, call.span)
            }

            other => Err(RuntimeError::new(
                ErrorKind::TypeMismatch,
                format!("{} is not callable", other_desc(other)),
            )
            .with_span(call.span)),
        }
    }

    /// Evaluates everything before the final attribute of a method call.
    fn eval_method_receiver(&mut self, attr: &AttrExpr) -> RuntimeResult<Value> {
        let mut value = self.eval(&attr.object)?;
        for ident in &attr.attrs[..attr.attrs.len() - 1] {
            value = self.read_attribute(value, &ident.name, ident.span)?;
        }
        Ok(value)
    }

    fn eval_args(&mut self, args: &[Expr]) -> RuntimeResult<Vec<Value>> {
        args.iter().map(|arg| self.eval(arg)).collect()
    }

    /// Reads an attribute (property) off a value.
    fn read_attribute(&mut self, value: Value, attr: &str, span: Span) -> RuntimeResult<Value> {
        match &value {
            Value::Color(color) => {
                if attr == "to" {
                    return Ok(Value::ConversionProxy(color.clone()));
                }
                self.config
                    .colors()
                    .get_attribute(color, attr)
                    .map_err(|e| e.or_span(span))
            }
            Value::Dict(dict) if attr == "length" => {
                Ok(Value::Number(Number::Int(dict.len() as i64)))
            }
            Value::List(list) if attr == "length" => {
                Ok(Value::Number(Number::Int(list.len() as i64)))
            }
            Value::Str(s) if attr == "length" => {
                Ok(Value::Number(Number::Int(s.chars().count() as i64)))
            }
            Value::UnitNumber(u) if attr == "value" => Ok(Value::Number(u.value)),
            Value::UnitNumber(u) if attr == "unit" => Ok(Value::Str(u.unit.clone())),
            Value::ConversionProxy(_) => Err(RuntimeError::new(
                ErrorKind::TypeMismatch,
                "a conversion target must be called, e.g. '.to.hex()'",
            )
            .with_span(span)),
            other => Err(RuntimeError::new(
                ErrorKind::TypeMismatch,
                format!("{} has no attribute '{attr}'", other.type_name()),
            )
            .with_span(span)),
        }
    }

    /// Dispatches a method call on a receiver value.
    fn call_method(
        &mut self,
        receiver: Value,
        method: &str,
        args: Vec<Value>,
        span: Span,
    ) -> RuntimeResult<Value> {
        match (&receiver, method) {
            // ----- universal -----
            (_, "toString") => {
                expect_arity(method, &args, 0, span)?;
                Ok(Value::Str(receiver.to_display_string()))
            }

            // ----- String -----
            (Value::Str(s), "trim") => {
                expect_arity(method, &args, 0, span)?;
                Ok(Value::Str(s.trim().to_string()))
            }
            (Value::Str(s), "upper") => {
                expect_arity(method, &args, 0, span)?;
                Ok(Value::Str(s.to_uppercase()))
            }
            (Value::Str(s), "lower") => {
                expect_arity(method, &args, 0, span)?;
                Ok(Value::Str(s.to_lowercase()))
            }
            (Value::Str(s), "length") => {
                expect_arity(method, &args, 0, span)?;
                Ok(Value::Number(Number::Int(s.chars().count() as i64)))
            }
            (Value::Str(s), "concat") => {
                expect_arity(method, &args, 1, span)?;
                let Value::Str(other) = &args[0] else {
                    return Err(type_error(
                        format!("concat expects a String, got {}", args[0].type_name()),
                        span,
                    ));
                };
                Ok(Value::Str(format!("{s}{other}")))
            }
            (Value::Str(s), "split") => {
                // Without a separator, splits into single characters.
                if args.is_empty() {
                    let items = s
                        .chars()
                        .map(|c| Value::Str(c.to_string()))
                        .collect::<Vec<_>>();
                    return Ok(Value::List(ListValue::new(items)));
                }
                expect_arity(method, &args, 1, span)?;
                let Value::Str(sep) = &args[0] else {
                    return Err(type_error(
                        format!("split expects a String, got {}", args[0].type_name()),
                        span,
                    ));
                };
                let items = s
                    .split(sep.as_str())
                    .map(|part| Value::Str(part.to_string()))
                    .collect::<Vec<_>>();
                Ok(Value::List(ListValue::new(items)))
            }

            // ----- List -----
            (Value::List(list), "get") => {
                expect_arity(method, &args, 1, span)?;
                let index = self.list_index(&args[0], list.len(), span)?;
                Ok(list.get(index).unwrap_or(Value::Null))
            }
            (Value::List(list), "set") => {
                expect_arity(method, &args, 2, span)?;
                let index = self.list_index(&args[0], list.len(), span)?;
                list.items.borrow_mut()[index] = args[1].clone();
                Ok(Value::Null)
            }
            (Value::List(list), "push") => {
                expect_arity(method, &args, 1, span)?;
                list.push(args[0].clone());
                Ok(Value::Null)
            }
            (Value::List(list), "remove") => {
                expect_arity(method, &args, 1, span)?;
                let index = self.list_index(&args[0], list.len(), span)?;
                let removed = list.items.borrow_mut().remove(index);
                Ok(removed)
            }
            (Value::List(list), "length") => {
                expect_arity(method, &args, 0, span)?;
                Ok(Value::Number(Number::Int(list.len() as i64)))
            }

            // ----- Dictionary -----
            (Value::Dict(dict), "set") => {
                expect_arity(method, &args, 2, span)?;
                let Value::Str(key) = &args[0] else {
                    return Err(type_error(
                        format!("dictionary keys are Strings, got {}", args[0].type_name()),
                        span,
                    ));
                };
                dict.set(key.clone(), args[1].clone());
                Ok(Value::Null)
            }
            (Value::Dict(dict), "get") => {
                expect_arity(method, &args, 1, span)?;
                let Value::Str(key) = &args[0] else {
                    return Err(type_error(
                        format!("dictionary keys are Strings, got {}", args[0].type_name()),
                        span,
                    ));
                };
                Ok(dict.get(key).unwrap_or(Value::Null))
            }
            (Value::Dict(dict), "has") => {
                expect_arity(method, &args, 1, span)?;
                let Value::Str(key) = &args[0] else {
                    return Err(type_error(
                        format!("dictionary keys are Strings, got {}", args[0].type_name()),
                        span,
                    ));
                };
                Ok(Value::Bool(dict.get(key).is_some()))
            }
            (Value::Dict(dict), "values") => {
                expect_arity(method, &args, 0, span)?;
                Ok(Value::List(ListValue::new(dict.values())))
            }
            (Value::Dict(dict), "keys") => {
                expect_arity(method, &args, 0, span)?;
                let keys = dict.keys().into_iter().map(Value::Str).collect();
                Ok(Value::List(ListValue::new(keys)))
            }
            (Value::Dict(dict), "length") => {
                expect_arity(method, &args, 0, span)?;
                Ok(Value::Number(Number::Int(dict.len() as i64)))
            }

            _ => Err(RuntimeError::new(
                ErrorKind::TypeMismatch,
                format!("{} has no method '{method}'", receiver.type_name()),
            )
            .with_span(span)),
        }
    }

    /// Checks a 0-based list index; negative indices are an error.
    fn list_index(&self, value: &Value, len: usize, span: Span) -> RuntimeResult<usize> {
        let Some(Number::Int(index)) = value.magnitude() else {
            return Err(type_error(
                format!("index must be an integer, got {}", value.type_name()),
                span,
            ));
        };
        if index < 0 {
            return Err(type_error(format!("negative index {index}"), span));
        }
        let index = index as usize;
        if index >= len {
            return Err(type_error(
                format!("index {index} out of bounds for length {len}"),
                span,
            ));
        }
        Ok(index)
    }

    fn eval_index(&mut self, object: Value, key: Value, span: Span) -> RuntimeResult<Value> {
        match &object {
            Value::List(list) => {
                let index = self.list_index(&key, list.len(), span)?;
                Ok(list.get(index).unwrap_or(Value::Null))
            }
            Value::Dict(dict) => {
                let Value::Str(key) = &key else {
                    return Err(type_error(
                        format!("dictionary keys are Strings, got {}", key.type_name()),
                        span,
                    ));
                };
                Ok(dict.get(key).unwrap_or(Value::Null))
            }
            Value::Str(s) => {
                let chars: Vec<char> = s.chars().collect();
                let index = self.list_index(&key, chars.len(), span)?;
                Ok(Value::Str(chars[index].to_string()))
            }
            other => Err(type_error(
                format!("{} is not indexable", other.type_name()),
                span,
            )),
        }
    }

    // =========================================================================
    // BINARY OPERATORS
    // =========================================================================

    fn eval_binary(&mut self, binary: &BinaryExpr) -> RuntimeResult<Value> {
        // Short-circuit logic first.
        if matches!(binary.op, BinOp::And | BinOp::Or) {
            let lhs = self.eval_condition(&binary.lhs)?;
            return match (binary.op, lhs) {
                (BinOp::And, false) => Ok(Value::Bool(false)),
                (BinOp::Or, true) => Ok(Value::Bool(true)),
                _ => Ok(Value::Bool(self.eval_condition(&binary.rhs)?)),
            };
        }

        let lhs = self.eval(&binary.lhs)?;
        let rhs = self.eval(&binary.rhs)?;
        let span = binary.span;

        match binary.op {
            BinOp::Eq => Ok(Value::Bool(self.values_equal(&lhs, &rhs)?)),
            BinOp::Ne => Ok(Value::Bool(!self.values_equal(&lhs, &rhs)?)),

            BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => {
                self.eval_comparison(binary.op, lhs, rhs, span)
            }

            BinOp::Add if matches!((&lhs, &rhs), (Value::Str(_), Value::Str(_))) => {
                // Explicit + concatenates without a separator.
                let (Value::Str(a), Value::Str(b)) = (lhs, rhs) else {
                    unreachable!()
                };
                Ok(Value::Str(format!("{a}{b}")))
            }

            BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div | BinOp::Pow | BinOp::Rem => {
                self.eval_arithmetic(binary.op, lhs, rhs, span)
            }

            BinOp::And | BinOp::Or => unreachable!("handled above"),
        }
    }

    /// Equality across mixed units compares through the common format.
    fn values_equal(&self, lhs: &Value, rhs: &Value) -> RuntimeResult<bool> {
        if let (Value::UnitNumber(a), Value::UnitNumber(b)) = (lhs, rhs) {
            if !a.unit.eq_ignore_ascii_case(&b.unit) {
                let reduced = self
                    .config
                    .units()
                    .convert_to_common_format(&[lhs.clone(), rhs.clone()], &self.config);
                if let Ok(reduced) = reduced {
                    return Ok(reduced[0] == reduced[1]);
                }
                return Ok(false);
            }
        }
        Ok(lhs == rhs)
    }

    fn eval_comparison(
        &mut self,
        op: BinOp,
        lhs: Value,
        rhs: Value,
        span: Span,
    ) -> RuntimeResult<Value> {
        // String comparison is lexicographic.
        if let (Value::Str(a), Value::Str(b)) = (&lhs, &rhs) {
            let result = match op {
                BinOp::Lt => a < b,
                BinOp::Le => a <= b,
                BinOp::Gt => a > b,
                BinOp::Ge => a >= b,
                _ => unreachable!(),
            };
            return Ok(Value::Bool(result));
        }

        let (lhs, rhs) = self.reduce_operands(lhs, rhs, span)?;
        let (Some(a), Some(b)) = (lhs.magnitude(), rhs.magnitude()) else {
            return Err(type_error(
                format!(
                    "'{}' is not defined on {} and {}",
                    op.symbol(),
                    lhs.type_name(),
                    rhs.type_name()
                ),
                span,
            ));
        };

        let result = match op {
            BinOp::Lt => a < b,
            BinOp::Le => a <= b,
            BinOp::Gt => a > b,
            BinOp::Ge => a >= b,
            _ => unreachable!(),
        };
        Ok(Value::Bool(result))
    }

    fn eval_arithmetic(
        &mut self,
        op: BinOp,
        lhs: Value,
        rhs: Value,
        span: Span,
    ) -> RuntimeResult<Value> {
        let (lhs, rhs) = self.reduce_operands(lhs, rhs, span)?;

        let (Some(a), Some(b)) = (lhs.magnitude(), rhs.magnitude()) else {
            return Err(type_error(
                format!(
                    "'{}' is not defined on {} and {}",
                    op.symbol(),
                    lhs.type_name(),
                    rhs.type_name()
                ),
                span,
            ));
        };

        let magnitude = match op {
            BinOp::Add => a.add(b),
            BinOp::Sub => a.sub(b),
            BinOp::Mul => a.mul(b),
            BinOp::Div => a.div(b),
            BinOp::Pow => a.pow(b),
            BinOp::Rem => a.rem(b),
            _ => unreachable!(),
        };

        // After reduction, at most one distinct unit remains; the result
        // carries it.
        let unit = lhs
            .unit()
            .or_else(|| rhs.unit())
            .map(|u| u.to_string());
        Ok(match unit {
            Some(unit) => Value::UnitNumber(UnitValue::new(magnitude, unit)),
            None => Value::Number(magnitude),
        })
    }

    /// Pre-reduces a pair of numeric operands to a shared format through
    /// the unit manager when their units differ.
    fn reduce_operands(
        &mut self,
        lhs: Value,
        rhs: Value,
        span: Span,
    ) -> RuntimeResult<(Value, Value)> {
        let needs_reduction = match (&lhs, &rhs) {
            (Value::UnitNumber(a), Value::UnitNumber(b)) => {
                !a.unit.eq_ignore_ascii_case(&b.unit)
            }
            // A single relative operand still resolves against its
            // companion.
            (Value::UnitNumber(u), other) | (other, Value::UnitNumber(u)) => {
                other.magnitude().is_some() && self.config.units().is_relative(&u.unit)
            }
            _ => false,
        };
        if !needs_reduction {
            return Ok((lhs, rhs));
        }

        let reduced = self
            .config
            .units()
            .convert_to_common_format(&[lhs, rhs], &self.config)
            .map_err(|e| e.or_span(span))?;
        let mut iter = reduced.into_iter();
        match (iter.next(), iter.next()) {
            (Some(lhs), Some(rhs)) => Ok((lhs, rhs)),
            _ => Err(RuntimeError::new(
                ErrorKind::NoCommonUnit,
                "operand reduction lost an operand",
            )
            .with_span(span)),
        }
    }
}

/// Default value for a declared type without an initializer.
fn default_value(base: &BaseType, sub: Option<String>) -> Value {
    match base {
        BaseType::Number => Value::Number(Number::Int(0)),
        BaseType::NumberWithUnit => Value::Number(Number::Int(0)),
        BaseType::String => Value::Str(String::new()),
        BaseType::Boolean => Value::Bool(false),
        BaseType::List => Value::List(ListValue::new(Vec::new())),
        BaseType::Dictionary => Value::Dict(DictValue::new()),
        BaseType::Color => Value::Color(ColorValue::empty(sub.unwrap_or_default())),
    }
}

fn expect_arity(method: &str, args: &[Value], expected: usize, span: Span) -> RuntimeResult<()> {
    if args.len() != expected {
        return Err(type_error(
            format!(
                "method '{method}' expects {expected} argument(s), got {}",
                args.len()
            ),
            span,
        ));
    }
    Ok(())
}

fn type_error(message: String, span: Span) -> RuntimeError {
    RuntimeError::new(ErrorKind::TypeMismatch, message).with_span(span)
}

fn other_desc(expr: &Expr) -> &'static str {
    match expr {
        Expr::Call(_) => "a call result",
        Expr::Reference(_) => "a reference",
        _ => "this expression",
    }
}

/// Parses and runs a script in one step.
pub fn interpret_source(
    source: &str,
    config: &Config,
    references: IndexMap<String, Value>,
) -> RuntimeResult<Option<Value>> {
    let program = config.parse(source)?;
    Interpreter::new(
        program,
        InterpreterOptions {
            config: config.clone(),
            references,
        },
    )
    .interpret()
}
