//! tokenscript-interp - The TokenScript runtime core.
//!
//! Everything that happens after parsing lives here: the typed value
//! model, the scoped symbol table, the tree-walking interpreter, the
//! shared configuration, and the two spec managers whose JSON-registered
//! scripts are parsed and executed by this same runtime.
//!
//! The usual flow:
//!
//! ```
//! use tokenscript_interp::{interpret_source, Config};
//!
//! let config = Config::new();
//! let value = interpret_source("return 6 * 7;", &config, Default::default())
//!     .unwrap()
//!     .unwrap();
//! assert_eq!(value.to_display_string(), "42");
//! ```
//!
//! Color and unit specifications register once on a [`Config`] and are
//! immutable afterwards; interpreters (including the nested ones spawned
//! for initializer and conversion scripts) share the registries by
//! reference.

pub mod color;
pub mod config;
pub mod error;
pub mod interpreter;
pub mod spec;
pub mod symbol_table;
pub mod unit;
pub mod uri;
pub mod value;

pub use color::ColorManager;
pub use config::{Config, LanguageOptions};
pub use error::{RuntimeError, RuntimeResult};
pub use interpreter::{interpret_source, Interpreter, InterpreterOptions};
pub use spec::{ColorSpec, UnitSpec, UnitType};
pub use symbol_table::{Binding, SymbolTable};
pub use unit::UnitManager;
pub use value::{
    ColorPayload, ColorValue, DictValue, ListSeparator, ListValue, Number, UnitValue, Value,
};
