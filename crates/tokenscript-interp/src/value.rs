//! The runtime value model.
//!
//! [`Value`] is the tagged union every expression evaluates to. Numbers
//! keep their integer tag as long as arithmetic stays exact; division or
//! power that leaves the integers promotes to float. Lists and
//! dictionaries are container values: a binding and anything that captured
//! it within one interpret call share the same container, so in-place
//! mutation is visible through every handle. Containers never cross
//! interpret calls - each call owns its root symbol table.

use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;

/// A numeric value: integer while exact, float once promoted.
#[derive(Clone, Copy, Debug)]
pub enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    /// The value as a float.
    pub fn as_f64(self) -> f64 {
        match self {
            Number::Int(v) => v as f64,
            Number::Float(v) => v,
        }
    }

    /// True while the value carries the integer tag.
    pub fn is_int(self) -> bool {
        matches!(self, Number::Int(_))
    }

    /// Addition; overflowing integer addition promotes to float.
    pub fn add(self, rhs: Number) -> Number {
        match (self, rhs) {
            (Number::Int(a), Number::Int(b)) => match a.checked_add(b) {
                Some(v) => Number::Int(v),
                None => Number::Float(a as f64 + b as f64),
            },
            _ => Number::Float(self.as_f64() + rhs.as_f64()),
        }
    }

    /// Subtraction; overflowing integer subtraction promotes to float.
    pub fn sub(self, rhs: Number) -> Number {
        match (self, rhs) {
            (Number::Int(a), Number::Int(b)) => match a.checked_sub(b) {
                Some(v) => Number::Int(v),
                None => Number::Float(a as f64 - b as f64),
            },
            _ => Number::Float(self.as_f64() - rhs.as_f64()),
        }
    }

    /// Multiplication; overflowing integer multiplication promotes to float.
    pub fn mul(self, rhs: Number) -> Number {
        match (self, rhs) {
            (Number::Int(a), Number::Int(b)) => match a.checked_mul(b) {
                Some(v) => Number::Int(v),
                None => Number::Float(a as f64 * b as f64),
            },
            _ => Number::Float(self.as_f64() * rhs.as_f64()),
        }
    }

    /// Division. Integer division with zero remainder keeps the integer
    /// tag; any other division promotes to float (never rounds).
    pub fn div(self, rhs: Number) -> Number {
        match (self, rhs) {
            (Number::Int(a), Number::Int(b)) if b != 0 && a % b == 0 => Number::Int(a / b),
            _ => Number::Float(self.as_f64() / rhs.as_f64()),
        }
    }

    /// Modulus.
    pub fn rem(self, rhs: Number) -> Number {
        match (self, rhs) {
            (Number::Int(a), Number::Int(b)) if b != 0 => Number::Int(a % b),
            _ => Number::Float(self.as_f64() % rhs.as_f64()),
        }
    }

    /// Real-valued power; an exact integer power keeps the integer tag.
    pub fn pow(self, rhs: Number) -> Number {
        if let (Number::Int(base), Number::Int(exp)) = (self, rhs) {
            if (0..=u32::MAX as i64).contains(&exp) {
                if let Some(v) = base.checked_pow(exp as u32) {
                    return Number::Int(v);
                }
            }
        }
        Number::Float(self.as_f64().powf(rhs.as_f64()))
    }

    /// Negation.
    pub fn neg(self) -> Number {
        match self {
            Number::Int(v) => match v.checked_neg() {
                Some(n) => Number::Int(n),
                None => Number::Float(-(v as f64)),
            },
            Number::Float(v) => Number::Float(-v),
        }
    }
}

impl PartialEq for Number {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Number::Int(a), Number::Int(b)) => a == b,
            _ => self.as_f64() == other.as_f64(),
        }
    }
}

impl PartialOrd for Number {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        match (self, other) {
            (Number::Int(a), Number::Int(b)) => a.partial_cmp(b),
            _ => self.as_f64().partial_cmp(&other.as_f64()),
        }
    }
}

impl std::fmt::Display for Number {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Number::Int(v) => write!(f, "{v}"),
            // Rust's float Display already renders whole floats without a
            // trailing ".0", matching the surface stringification.
            Number::Float(v) => write!(f, "{v}"),
        }
    }
}

/// A number carrying a unit keyword, e.g. `16px`.
#[derive(Clone, Debug)]
pub struct UnitValue {
    pub value: Number,
    pub unit: String,
}

impl UnitValue {
    pub fn new(value: Number, unit: impl Into<String>) -> Self {
        Self {
            value,
            unit: unit.into(),
        }
    }
}

impl PartialEq for UnitValue {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value && self.unit.eq_ignore_ascii_case(&other.unit)
    }
}

impl std::fmt::Display for UnitValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.value, self.unit)
    }
}

/// How a list renders when stringified.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ListSeparator {
    /// `", "`-joined: comma lists and collections.
    Comma,
    /// Space-joined: implicit (juxtaposed) lists.
    Space,
}

/// An ordered sequence of values sharing one underlying container.
#[derive(Clone, Debug)]
pub struct ListValue {
    pub items: Rc<RefCell<Vec<Value>>>,
    pub separator: ListSeparator,
}

impl ListValue {
    /// Creates a comma-separated list.
    pub fn new(items: Vec<Value>) -> Self {
        Self {
            items: Rc::new(RefCell::new(items)),
            separator: ListSeparator::Comma,
        }
    }

    /// Creates a space-separated (implicit) list.
    pub fn spaced(items: Vec<Value>) -> Self {
        Self {
            items: Rc::new(RefCell::new(items)),
            separator: ListSeparator::Space,
        }
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.items.borrow().len()
    }

    /// True when empty.
    pub fn is_empty(&self) -> bool {
        self.items.borrow().is_empty()
    }

    /// Clones the element at `index`.
    pub fn get(&self, index: usize) -> Option<Value> {
        self.items.borrow().get(index).cloned()
    }

    /// Appends an element in place.
    pub fn push(&self, value: Value) {
        self.items.borrow_mut().push(value);
    }
}

impl PartialEq for ListValue {
    fn eq(&self, other: &Self) -> bool {
        *self.items.borrow() == *other.items.borrow()
    }
}

/// An insertion-ordered mapping from strings to values, sharing one
/// underlying container.
#[derive(Clone, Debug)]
pub struct DictValue {
    pub entries: Rc<RefCell<IndexMap<String, Value>>>,
}

impl DictValue {
    /// Creates an empty dictionary.
    pub fn new() -> Self {
        Self {
            entries: Rc::new(RefCell::new(IndexMap::new())),
        }
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    /// True when empty.
    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    /// Clones the value under `key`.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.entries.borrow().get(key).cloned()
    }

    /// Inserts in place, preserving first-insertion order.
    pub fn set(&self, key: String, value: Value) {
        self.entries.borrow_mut().insert(key, value);
    }

    /// The values in insertion order.
    pub fn values(&self) -> Vec<Value> {
        self.entries.borrow().values().cloned().collect()
    }

    /// The keys in insertion order.
    pub fn keys(&self) -> Vec<String> {
        self.entries.borrow().keys().cloned().collect()
    }
}

impl Default for DictValue {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for DictValue {
    fn eq(&self, other: &Self) -> bool {
        *self.entries.borrow() == *other.entries.borrow()
    }
}

/// A color value: a canonical sub-type name plus either a literal string
/// payload (e.g. a hex string) or an attribute map shaped by the
/// registered spec's schema.
#[derive(Clone, Debug)]
pub struct ColorValue {
    /// Canonical color-spec name; empty while unresolved.
    pub sub_type: String,

    /// Payload.
    pub payload: ColorPayload,
}

/// A color's payload.
#[derive(Clone, Debug)]
pub enum ColorPayload {
    /// A literal string, e.g. `"#ffffff"`.
    Literal(String),

    /// Attribute map keyed by the spec schema's property names.
    Attributes(Rc<RefCell<IndexMap<String, Value>>>),
}

impl ColorValue {
    /// Creates a color with a literal string payload.
    pub fn literal(sub_type: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            sub_type: sub_type.into(),
            payload: ColorPayload::Literal(value.into()),
        }
    }

    /// Creates a color with an empty attribute map.
    pub fn empty(sub_type: impl Into<String>) -> Self {
        Self {
            sub_type: sub_type.into(),
            payload: ColorPayload::Attributes(Rc::new(RefCell::new(IndexMap::new()))),
        }
    }

    /// Creates a color from an attribute map.
    pub fn with_attributes(
        sub_type: impl Into<String>,
        attributes: IndexMap<String, Value>,
    ) -> Self {
        Self {
            sub_type: sub_type.into(),
            payload: ColorPayload::Attributes(Rc::new(RefCell::new(attributes))),
        }
    }
}

impl PartialEq for ColorValue {
    fn eq(&self, other: &Self) -> bool {
        if !self.sub_type.eq_ignore_ascii_case(&other.sub_type) {
            return false;
        }
        match (&self.payload, &other.payload) {
            (ColorPayload::Literal(a), ColorPayload::Literal(b)) => a == b,
            (ColorPayload::Attributes(a), ColorPayload::Attributes(b)) => {
                *a.borrow() == *b.borrow()
            }
            _ => false,
        }
    }
}

impl std::fmt::Display for ColorValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.payload {
            ColorPayload::Literal(s) => f.write_str(s),
            ColorPayload::Attributes(attrs) => {
                write!(f, "{}(", self.sub_type.to_lowercase())?;
                let attrs = attrs.borrow();
                let mut first = true;
                for value in attrs.values() {
                    if !first {
                        f.write_str(", ")?;
                    }
                    first = false;
                    write!(f, "{value}")?;
                }
                write!(f, ")")
            }
        }
    }
}

/// A runtime value.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// The `null` literal, and the result of lookups that find nothing.
    Null,

    /// Dimensionless number.
    Number(Number),

    /// Number with a unit keyword.
    UnitNumber(UnitValue),

    /// UTF-8 string.
    Str(String),

    /// Boolean.
    Bool(bool),

    /// Ordered sequence.
    List(ListValue),

    /// Insertion-ordered string-keyed mapping.
    Dict(DictValue),

    /// Color.
    Color(ColorValue),

    /// Interpreter-internal: the result of reading `.to` on a color,
    /// awaiting a conversion-target call. Never storable in a binding.
    ConversionProxy(ColorValue),
}

impl Value {
    /// The surface type name, for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "Null",
            Value::Number(_) => "Number",
            Value::UnitNumber(_) => "NumberWithUnit",
            Value::Str(_) => "String",
            Value::Bool(_) => "Boolean",
            Value::List(_) => "List",
            Value::Dict(_) => "Dictionary",
            Value::Color(_) => "Color",
            Value::ConversionProxy(_) => "ConversionProxy",
        }
    }

    /// The boolean payload, if this is a Boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// The numeric magnitude, if this is a Number or NumberWithUnit.
    pub fn magnitude(&self) -> Option<Number> {
        match self {
            Value::Number(n) => Some(*n),
            Value::UnitNumber(u) => Some(u.value),
            _ => None,
        }
    }

    /// The unit keyword, if this is a NumberWithUnit.
    pub fn unit(&self) -> Option<&str> {
        match self {
            Value::UnitNumber(u) => Some(&u.unit),
            _ => None,
        }
    }

    /// Canonical stringification, as used for token-set output.
    pub fn to_display_string(&self) -> String {
        self.to_string()
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Number(n) => write!(f, "{n}"),
            Value::UnitNumber(u) => write!(f, "{u}"),
            Value::Str(s) => write!(f, "{s}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::List(list) => {
                let sep = match list.separator {
                    ListSeparator::Comma => ", ",
                    ListSeparator::Space => " ",
                };
                let items = list.items.borrow();
                let mut first = true;
                for item in items.iter() {
                    if !first {
                        f.write_str(sep)?;
                    }
                    first = false;
                    write!(f, "{item}")?;
                }
                Ok(())
            }
            Value::Dict(dict) => {
                write!(f, "{{")?;
                let entries = dict.entries.borrow();
                let mut first = true;
                for (key, value) in entries.iter() {
                    if !first {
                        f.write_str(", ")?;
                    }
                    first = false;
                    write!(f, "{key}: {value}")?;
                }
                write!(f, "}}")
            }
            Value::Color(color) => write!(f, "{color}"),
            Value::ConversionProxy(color) => write!(f, "{color}.to"),
        }
    }
}
