//! Lexically nested symbol table.
//!
//! A stack of insertion-ordered scopes. Lookups walk from the innermost
//! scope outward. Declaring a name twice in the same scope is an error;
//! shadowing a name from an outer scope is permitted. Each binding keeps
//! its declared base type (and optional sub-type) so assignments can be
//! type-checked.

use indexmap::IndexMap;
use tokenscript_par::ast::BaseType;
use tokenscript_util::{ErrorKind, Span};

use crate::error::{RuntimeError, RuntimeResult};
use crate::value::Value;

/// A declared variable.
#[derive(Clone, Debug)]
pub struct Binding {
    /// Declared base type; `None` for inferred bindings (loop variables).
    pub base: Option<BaseType>,

    /// Declared sub-type (`Rgb` in `Color.Rgb`, `Px` in `Number.Px`).
    pub sub: Option<String>,

    /// Current value.
    pub value: Value,

    /// Span of the declaration, for error attribution.
    pub span: Span,
}

/// An ordered stack of scopes.
#[derive(Debug, Default)]
pub struct SymbolTable {
    scopes: Vec<IndexMap<String, Binding>>,
}

impl SymbolTable {
    /// Creates a table with the root scope in place.
    pub fn new() -> Self {
        Self {
            scopes: vec![IndexMap::new()],
        }
    }

    /// Opens a nested scope.
    pub fn push_scope(&mut self) {
        self.scopes.push(IndexMap::new());
    }

    /// Closes the innermost scope, releasing its bindings.
    ///
    /// The root scope stays; its bindings live until the interpreter is
    /// dropped.
    pub fn pop_scope(&mut self) {
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    /// Declares a name in the innermost scope.
    pub fn declare(
        &mut self,
        name: &str,
        base: Option<BaseType>,
        sub: Option<String>,
        value: Value,
        span: Span,
    ) -> RuntimeResult<()> {
        let scope = self.scopes.last_mut().expect("scope stack never empty");
        if scope.contains_key(name) {
            return Err(RuntimeError::new(
                ErrorKind::Redeclaration,
                format!("variable '{name}' is already declared in this scope"),
            )
            .with_span(span));
        }
        scope.insert(
            name.to_string(),
            Binding {
                base,
                sub,
                value,
                span,
            },
        );
        Ok(())
    }

    /// Looks a name up, innermost scope first.
    pub fn get(&self, name: &str) -> Option<&Binding> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name))
    }

    /// Mutable lookup, innermost scope first.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut Binding> {
        self.scopes
            .iter_mut()
            .rev()
            .find_map(|scope| scope.get_mut(name))
    }

    /// Assigns to an existing binding after the caller has coerced the
    /// value; checks that the value's tag fits the declared base type.
    pub fn assign(&mut self, name: &str, value: Value, span: Span) -> RuntimeResult<()> {
        let Some(binding) = self.get_mut(name) else {
            return Err(RuntimeError::new(
                ErrorKind::UndefinedVariable,
                format!("variable '{name}' is not declared"),
            )
            .with_span(span));
        };

        if let Some(base) = binding.base {
            if !type_matches(base, &value) {
                return Err(RuntimeError::new(
                    ErrorKind::TypeMismatch,
                    format!(
                        "cannot assign {} to variable '{name}' declared as {base}",
                        value.type_name(),
                    ),
                )
                .with_span(span));
            }
        }

        binding.value = value;
        Ok(())
    }
}

/// Whether a value's type tag satisfies a declared base type.
///
/// A declared `Number` also admits `NumberWithUnit`; the interpreter
/// performs the unit coercion (through the unit manager) before the value
/// arrives here.
pub fn type_matches(base: BaseType, value: &Value) -> bool {
    match (base, value) {
        (BaseType::Number, Value::Number(_)) => true,
        (BaseType::Number, Value::UnitNumber(_)) => true,
        (BaseType::NumberWithUnit, Value::UnitNumber(_)) => true,
        (BaseType::NumberWithUnit, Value::Number(_)) => true,
        (BaseType::String, Value::Str(_)) => true,
        (BaseType::Boolean, Value::Bool(_)) => true,
        (BaseType::List, Value::List(_)) => true,
        (BaseType::Dictionary, Value::Dict(_)) => true,
        (BaseType::Color, Value::Color(_)) => true,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Number;

    fn num(v: i64) -> Value {
        Value::Number(Number::Int(v))
    }

    #[test]
    fn test_declare_and_get() {
        let mut table = SymbolTable::new();
        table
            .declare("x", Some(BaseType::Number), None, num(1), Span::DUMMY)
            .unwrap();
        assert_eq!(table.get("x").unwrap().value, num(1));
    }

    #[test]
    fn test_redeclaration_in_same_scope_fails() {
        let mut table = SymbolTable::new();
        table
            .declare("x", Some(BaseType::Number), None, num(1), Span::DUMMY)
            .unwrap();
        let err = table
            .declare("x", Some(BaseType::Number), None, num(2), Span::DUMMY)
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Redeclaration);
    }

    #[test]
    fn test_shadowing_across_scopes_is_allowed() {
        let mut table = SymbolTable::new();
        table
            .declare("x", Some(BaseType::Number), None, num(1), Span::DUMMY)
            .unwrap();
        table.push_scope();
        table
            .declare("x", Some(BaseType::String), None, Value::Str("s".into()), Span::DUMMY)
            .unwrap();
        assert_eq!(table.get("x").unwrap().base, Some(BaseType::String));
        table.pop_scope();
        assert_eq!(table.get("x").unwrap().base, Some(BaseType::Number));
    }

    #[test]
    fn test_assign_walks_outward() {
        let mut table = SymbolTable::new();
        table
            .declare("x", Some(BaseType::Number), None, num(1), Span::DUMMY)
            .unwrap();
        table.push_scope();
        table.assign("x", num(5), Span::DUMMY).unwrap();
        table.pop_scope();
        assert_eq!(table.get("x").unwrap().value, num(5));
    }

    #[test]
    fn test_assign_undeclared_fails() {
        let mut table = SymbolTable::new();
        let err = table.assign("ghost", num(1), Span::DUMMY).unwrap_err();
        assert_eq!(err.kind, ErrorKind::UndefinedVariable);
    }

    #[test]
    fn test_assign_type_mismatch() {
        let mut table = SymbolTable::new();
        table
            .declare("x", Some(BaseType::Number), None, num(1), Span::DUMMY)
            .unwrap();
        let err = table
            .assign("x", Value::Str("not a number".into()), Span::DUMMY)
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::TypeMismatch);
    }

    #[test]
    fn test_root_scope_survives_pop() {
        let mut table = SymbolTable::new();
        table
            .declare("x", Some(BaseType::Number), None, num(1), Span::DUMMY)
            .unwrap();
        table.pop_scope();
        table.pop_scope();
        assert!(table.get("x").is_some());
    }

    #[test]
    fn test_number_accepts_unit_number() {
        use crate::value::UnitValue;
        let mut table = SymbolTable::new();
        table
            .declare("x", Some(BaseType::Number), None, num(0), Span::DUMMY)
            .unwrap();
        table
            .assign(
                "x",
                Value::UnitNumber(UnitValue::new(Number::Int(4), "px")),
                Span::DUMMY,
            )
            .unwrap();
    }
}
