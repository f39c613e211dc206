//! Runtime values stored as keys and values.
//!
//! `Value` is a closed set of kinds. Strings and objects are shared handles
//! owned by the host object graph; the map only holds references to them.

use crate::error::{Error, Result};
use crate::hash::HashObject;
use core::cell::{Cell, RefCell};
use core::fmt;
use std::rc::Rc;

/// Interned symbol identity. Two symbols are the same key iff their ids match.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct Sym(pub u32);

/// Discriminant of a `Value`, mixed into digests to separate kinds.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[repr(u8)]
pub enum Kind {
    Nil = 0,
    Bool = 1,
    Int = 2,
    Float = 3,
    Symbol = 4,
    String = 5,
    Object = 6,
}

#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    Symbol(Sym),
    String(RString),
    Object(ObjectRef),
}

impl Value {
    /// A fresh, mutable string value.
    pub fn str(s: impl Into<String>) -> Self {
        Value::String(RString::new(s))
    }

    pub fn sym(id: u32) -> Self {
        Value::Symbol(Sym(id))
    }

    pub fn object<T: HostObject + 'static>(obj: T) -> Self {
        Value::Object(ObjectRef::new(obj))
    }

    pub fn kind(&self) -> Kind {
        match self {
            Value::Nil => Kind::Nil,
            Value::Bool(_) => Kind::Bool,
            Value::Int(_) => Kind::Int,
            Value::Float(_) => Kind::Float,
            Value::Symbol(_) => Kind::Symbol,
            Value::String(_) => Kind::String,
            Value::Object(_) => Kind::Object,
        }
    }

    /// Host class name, for error messages.
    pub fn class_name(&self) -> &str {
        match self {
            Value::Nil => "NilClass",
            Value::Bool(true) => "TrueClass",
            Value::Bool(false) => "FalseClass",
            Value::Int(_) => "Integer",
            Value::Float(_) => "Float",
            Value::Symbol(_) => "Symbol",
            Value::String(_) => "String",
            Value::Object(o) => o.get().class_name(),
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    pub fn as_str(&self) -> Option<&RString> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }
}

/// Structural comparison for tests and host code: strings by content,
/// objects by identity, numbers without cross-kind widening. Key matching
/// inside the map goes through `KeyDispatch` instead.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Symbol(a), Value::Symbol(b)) => a == b,
            (Value::String(a), Value::String(b)) => a.content_eq(b),
            (Value::Object(a), Value::Object(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => f.write_str("nil"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{:?}", x),
            Value::Symbol(s) => write!(f, ":sym{}", s.0),
            Value::String(s) => s.fmt(f),
            Value::Object(o) => o.fmt(f),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::str(s)
    }
}

impl From<Sym> for Value {
    fn from(s: Sym) -> Self {
        Value::Symbol(s)
    }
}

impl From<RString> for Value {
    fn from(s: RString) -> Self {
        Value::String(s)
    }
}

struct StrCell {
    buf: RefCell<String>,
    frozen: Cell<bool>,
}

/// Shared handle to a host string. Clones alias the same buffer; `dup`
/// makes an independent copy.
#[derive(Clone)]
pub struct RString(Rc<StrCell>);

impl RString {
    pub fn new(s: impl Into<String>) -> Self {
        RString(Rc::new(StrCell {
            buf: RefCell::new(s.into()),
            frozen: Cell::new(false),
        }))
    }

    pub fn new_frozen(s: impl Into<String>) -> Self {
        let s = Self::new(s);
        s.freeze();
        s
    }

    pub fn is_frozen(&self) -> bool {
        self.0.frozen.get()
    }

    pub fn freeze(&self) {
        self.0.frozen.set(true);
    }

    /// Independent, unfrozen copy of the current contents.
    pub fn dup(&self) -> RString {
        RString::new(self.0.buf.borrow().clone())
    }

    pub fn push_str(&self, s: &str) -> Result<()> {
        if self.is_frozen() {
            return Err(Error::Frozen("string"));
        }
        self.0.buf.borrow_mut().push_str(s);
        Ok(())
    }

    pub fn replace(&self, s: &str) -> Result<()> {
        if self.is_frozen() {
            return Err(Error::Frozen("string"));
        }
        let mut buf = self.0.buf.borrow_mut();
        buf.clear();
        buf.push_str(s);
        Ok(())
    }

    pub fn with_str<R>(&self, f: impl FnOnce(&str) -> R) -> R {
        f(&self.0.buf.borrow())
    }

    pub fn to_string_value(&self) -> String {
        self.0.buf.borrow().clone()
    }

    pub fn content_eq(&self, other: &RString) -> bool {
        self.ptr_eq(other) || *self.0.buf.borrow() == *other.0.buf.borrow()
    }

    pub fn ptr_eq(&self, other: &RString) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for RString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", &*self.0.buf.borrow())
    }
}

/// Generic hash/equality capabilities of a host object.
///
/// Methods may run arbitrary host code; an `Err` aborts the calling map
/// operation and is returned to its caller unchanged.
pub trait HostObject {
    /// Name of the object's class, used in error messages.
    fn class_name(&self) -> &str;

    /// The object's `hash` method.
    fn hash_code(&self) -> Result<i64>;

    /// The object's `eql?` method, used for key matching.
    fn eql(&self, other: &Value) -> Result<bool>;

    /// The object's `==` method, used by value searches.
    fn equal(&self, other: &Value) -> Result<bool> {
        self.eql(other)
    }

    /// Implicit conversion to a mapping (`to_hash`), if the object has one.
    fn to_hash(&self) -> Option<Rc<RefCell<HashObject>>> {
        None
    }
}

/// Shared handle to a host object.
#[derive(Clone)]
pub struct ObjectRef(Rc<dyn HostObject>);

impl ObjectRef {
    pub fn new<T: HostObject + 'static>(obj: T) -> Self {
        ObjectRef(Rc::new(obj))
    }

    pub fn from_rc(obj: Rc<dyn HostObject>) -> Self {
        ObjectRef(obj)
    }

    pub fn get(&self) -> &dyn HostObject {
        &*self.0
    }

    pub fn ptr_eq(&self, other: &ObjectRef) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#<{}:{:p}>", self.0.class_name(), Rc::as_ptr(&self.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dup_is_independent_and_unfrozen() {
        let a = RString::new_frozen("key");
        let b = a.dup();
        assert!(a.is_frozen());
        assert!(!b.is_frozen());
        b.push_str("!").unwrap();
        assert_eq!(a.to_string_value(), "key");
        assert_eq!(b.to_string_value(), "key!");
    }

    #[test]
    fn frozen_string_rejects_mutation() {
        let s = RString::new("x");
        s.freeze();
        assert_eq!(s.push_str("y"), Err(Error::Frozen("string")));
        assert_eq!(s.replace("y"), Err(Error::Frozen("string")));
        assert_eq!(s.to_string_value(), "x");
    }

    #[test]
    fn structural_eq_does_not_widen() {
        assert_ne!(Value::Int(1), Value::Float(1.0));
        assert_eq!(Value::str("a"), Value::str("a"));
        assert_eq!(Value::sym(3), Value::Symbol(Sym(3)));
        assert_ne!(Value::Nil, Value::Bool(false));
    }
}
