//! Miss resolution for `get`: a static default value or a default proc.

use crate::error::Result;
use crate::hash::HashObject;
use crate::value::Value;
use core::fmt;
use std::rc::Rc;

/// Callback producing the value for a missing key. It receives the owning
/// map and may mutate it; those mutations go through the frozen check like
/// any other. Its result is not stored unless the proc stores it.
pub type DefaultProc = Rc<dyn Fn(&mut HashObject, &Value) -> Result<Value>>;

/// Wrap a closure as a [`DefaultProc`].
pub fn default_proc<F>(f: F) -> DefaultProc
where
    F: Fn(&mut HashObject, &Value) -> Result<Value> + 'static,
{
    Rc::new(f)
}

/// Default state of a map. The variant encodes the has-default and
/// default-is-proc flags.
#[derive(Clone, Default)]
pub enum DefaultState {
    #[default]
    None,
    Value(Value),
    Proc(DefaultProc),
}

impl DefaultState {
    /// A nil value clears the default.
    pub fn from_value(v: Value) -> Self {
        if v.is_nil() {
            DefaultState::None
        } else {
            DefaultState::Value(v)
        }
    }

    pub fn from_proc(p: Option<DefaultProc>) -> Self {
        match p {
            Some(p) => DefaultState::Proc(p),
            None => DefaultState::None,
        }
    }

    pub fn has_default(&self) -> bool {
        !matches!(self, DefaultState::None)
    }

    pub fn is_proc(&self) -> bool {
        matches!(self, DefaultState::Proc(_))
    }

    /// The static default, or nil. A proc default reports nil here.
    pub fn value(&self) -> Value {
        match self {
            DefaultState::Value(v) => v.clone(),
            _ => Value::Nil,
        }
    }

    pub fn proc(&self) -> Option<DefaultProc> {
        match self {
            DefaultState::Proc(p) => Some(p.clone()),
            _ => None,
        }
    }
}

impl fmt::Debug for DefaultState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefaultState::None => f.write_str("DefaultState::None"),
            DefaultState::Value(v) => write!(f, "DefaultState::Value({:?})", v),
            DefaultState::Proc(_) => f.write_str("DefaultState::Proc(...)"),
        }
    }
}

/// Value for a missing `key`. A proc default is invoked exactly once.
pub(crate) fn resolve_miss(owner: &mut HashObject, key: &Value) -> Result<Value> {
    match owner.default_state().clone() {
        DefaultState::Proc(p) => p(owner, key),
        DefaultState::Value(v) => Ok(v),
        DefaultState::None => Ok(Value::Nil),
    }
}
