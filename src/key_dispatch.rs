//! Hash and equality dispatch over heterogeneous keys.
//!
//! Contract: `equal(a, b)` implies `hash(a) == hash(b)`. Integers and floats
//! compare equal after widening, so both are hashed through one canonical
//! numeric identity: the widened `f64`, taken as an integer when it has no
//! fractional part.

use crate::error::Result;
use crate::value::{Kind, Value};
use core::hash::BuildHasher;
use hashbrown::hash_map::DefaultHashBuilder;

/// Canonical identity of a number after widening to `f64`.
#[inline]
fn numeric_identity(x: f64) -> u64 {
    if x.is_finite() && x.fract() == 0.0 {
        // Saturates outside the i64 range; equal inputs still agree.
        (x as i64) as u64
    } else {
        x.to_bits()
    }
}

#[derive(Clone, Debug)]
pub struct KeyDispatch<S = DefaultHashBuilder> {
    hasher: S,
}

impl KeyDispatch {
    pub fn new() -> Self {
        Self::with_hasher(Default::default())
    }
}

impl Default for KeyDispatch {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: BuildHasher> KeyDispatch<S> {
    pub fn with_hasher(hasher: S) -> Self {
        Self { hasher }
    }

    #[inline]
    fn mix(&self, kind: Kind, ident: u64) -> u64 {
        self.hasher.hash_one((kind as u8, ident))
    }

    /// Digest of `v`. Runs the object's `hash` method for object keys.
    pub fn hash(&self, v: &Value) -> Result<u64> {
        let h = match v {
            Value::String(s) => s.with_str(|s| self.hasher.hash_one((Kind::String as u8, s))),
            Value::Nil => self.mix(Kind::Nil, 0),
            Value::Bool(b) => self.mix(Kind::Bool, *b as u64),
            Value::Symbol(sym) => self.mix(Kind::Symbol, sym.0 as u64),
            // Int and Float share a tag so equal numbers collide.
            Value::Int(i) => self.mix(Kind::Int, numeric_identity(*i as f64)),
            Value::Float(x) => self.mix(Kind::Int, numeric_identity(*x)),
            Value::Object(o) => self.mix(Kind::Object, o.get().hash_code()? as u64),
        };
        Ok(h)
    }

    /// Key equality. Runs `a`'s `eql?` when `a` is an object.
    pub fn equal(&self, a: &Value, b: &Value) -> Result<bool> {
        key_eql(a, b)
    }
}

pub(crate) fn key_eql(a: &Value, b: &Value) -> Result<bool> {
    Ok(match (a, b) {
        (Value::String(x), Value::String(y)) => x.content_eq(y),
        (Value::Symbol(x), Value::Symbol(y)) => x == y,
        (Value::Int(x), Value::Int(y)) => x == y,
        (Value::Int(x), Value::Float(y)) => *x as f64 == *y,
        (Value::Float(x), Value::Int(y)) => *x == *y as f64,
        (Value::Float(x), Value::Float(y)) => x == y,
        (Value::Object(o), _) => return o.get().eql(b),
        (Value::Nil, Value::Nil) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        _ => false,
    })
}

/// Value equality (`==`), independent of key dispatch. Used by value
/// searches; objects on either side decide through their `==` method.
pub fn values_equal(a: &Value, b: &Value) -> Result<bool> {
    match (a, b) {
        (Value::Object(o), _) => o.get().equal(b),
        (_, Value::Object(o)) => o.get().equal(a),
        _ => key_eql(a, b),
    }
}
