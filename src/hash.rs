//! HashObject: the mapping type seen by the host.
//!
//! Every mutating call checks the frozen flag first, interns string keys
//! before they are stored, and notifies the collector after it succeeds.
//! Reads go straight to the segment list and fall back to the default
//! protocol on a miss.

use crate::config::{ClassTag, Config, HashBuilder};
use crate::default::{resolve_miss, DefaultProc, DefaultState};
use crate::error::{Error, Result};
use crate::key_dispatch::KeyDispatch;
use crate::lifecycle::{Collector, ObjectId, Trace};
use crate::seglist::{Iter, SegList};
use crate::value::Value;
use core::cell::RefCell;
use core::fmt;
use log::debug;
use std::rc::Rc;

/// Store a private frozen copy of a mutable string key. Frozen strings and
/// other kinds are stored as given.
fn intern_key(key: Value) -> Value {
    match key {
        Value::String(s) if !s.is_frozen() => {
            let copy = s.dup();
            copy.freeze();
            Value::String(copy)
        }
        other => other,
    }
}

/// Convert `v` to a mapping through the host's `to_hash`.
pub fn ensure_hash(v: &Value) -> Result<Rc<RefCell<HashObject>>> {
    let converted = match v {
        Value::Object(o) => o.get().to_hash(),
        _ => None,
    };
    converted.ok_or_else(|| Error::Type(format!("can't convert {} into Hash", v.class_name())))
}

/// Result of [`HashObject::shift`].
#[derive(Clone, Debug, PartialEq)]
pub enum Shift {
    /// The removed first entry.
    Entry(Value, Value),
    /// The map was empty; the default for a nil key.
    Default(Value),
}

pub struct HashObject {
    id: ObjectId,
    class: ClassTag,
    frozen: bool,
    defaults: DefaultState,
    table: SegList,
    dispatch: KeyDispatch,
    collector: Rc<dyn Collector>,
}

impl HashObject {
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// The hint is accepted for signature compatibility and ignored.
    pub fn new_with_capacity_hint(_capacity: usize) -> Self {
        Self::new()
    }

    pub fn with_config(config: Config) -> Self {
        Self {
            id: ObjectId::fresh(),
            class: config.class,
            frozen: false,
            defaults: config.default,
            table: SegList::with_segment_capacity(config.segment_capacity),
            dispatch: KeyDispatch::new(),
            collector: config.collector,
        }
    }

    /// `Hash.new(default)` / `Hash.new { |h, k| ... }`. Supplying both is an
    /// argument error.
    pub fn with_default(default: Option<Value>, proc: Option<DefaultProc>) -> Result<Self> {
        let mut config = Config::default();
        if let Some(v) = default {
            config = config.default_value(v)?;
        }
        if let Some(p) = proc {
            config = config.default_proc(p)?;
        }
        Ok(Self::with_config(config))
    }

    pub fn builder() -> HashBuilder {
        HashBuilder::new()
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn class(&self) -> ClassTag {
        self.class
    }

    pub fn segment_capacity(&self) -> usize {
        self.table.segment_capacity()
    }

    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    fn modify(&self) -> Result<()> {
        if self.frozen {
            debug!("hash {}: mutation rejected, frozen", self.id.get());
            return Err(Error::Frozen("hash"));
        }
        Ok(())
    }

    /// Identity view as the mapping type.
    pub fn to_hash(&self) -> &Self {
        self
    }

    /// Digest of `key` under this map's key dispatch.
    pub fn key_digest(&self, key: &Value) -> Result<u64> {
        self.dispatch.hash(key)
    }

    /// Value for `key`, or the default on a miss. A default proc may mutate
    /// this map; its result is returned but not stored.
    pub fn get(&mut self, key: &Value) -> Result<Value> {
        if let Some(v) = self.table.get(key)? {
            return Ok(v.clone());
        }
        resolve_miss(self, key)
    }

    /// Value for `key`, or `fallback` on a miss. Ignores any default.
    pub fn fetch(&self, key: &Value, fallback: Value) -> Result<Value> {
        Ok(self.table.get(key)?.cloned().unwrap_or(fallback))
    }

    pub fn set(&mut self, key: Value, val: Value) -> Result<()> {
        self.modify()?;
        let v = val.clone();
        let (stored, _) = self.table.put_with(key, val, intern_key)?;
        self.collector.field_write_barrier(self.id, &stored);
        self.collector.field_write_barrier(self.id, &v);
        Ok(())
    }

    /// Remove `key`, returning its value. A miss changes nothing.
    pub fn delete(&mut self, key: &Value) -> Result<Option<Value>> {
        self.modify()?;
        let removed = self.table.remove(key)?;
        if removed.is_some() {
            self.collector.write_barrier(self.id);
        }
        Ok(removed.map(|(_, v)| v))
    }

    /// Remove and return the first entry. An empty map yields the default
    /// for a nil key instead.
    pub fn shift(&mut self) -> Result<Shift> {
        self.modify()?;
        match self.table.pop_front() {
            Some((k, v)) => {
                self.collector.write_barrier(self.id);
                Ok(Shift::Entry(k, v))
            }
            None => Ok(Shift::Default(resolve_miss(self, &Value::Nil)?)),
        }
    }

    pub fn has_key(&self, key: &Value) -> Result<bool> {
        self.table.contains_key(key)
    }

    pub fn has_value(&self, val: &Value) -> Result<bool> {
        self.table.contains_value(val)
    }

    pub fn size(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn iter(&self) -> Iter<'_> {
        self.table.iter()
    }

    pub fn keys(&self) -> Vec<Value> {
        let mut out = Vec::with_capacity(self.size());
        out.extend(self.iter().map(|(k, _)| k.clone()));
        out
    }

    pub fn values(&self) -> Vec<Value> {
        let mut out = Vec::with_capacity(self.size());
        out.extend(self.iter().map(|(_, v)| v.clone()));
        out
    }

    pub fn clear(&mut self) -> Result<()> {
        self.modify()?;
        if !self.table.is_empty() {
            debug!("hash {}: clearing {} entries", self.id.get(), self.table.len());
            self.collector.write_barrier(self.id);
        }
        self.table.clear();
        Ok(())
    }

    /// Put every pair of `other` in its order; `other`'s values win on
    /// conflicting keys. A host error stops the merge where it happened.
    pub fn merge(&mut self, other: &HashObject) -> Result<()> {
        self.modify()?;
        let res = self.table.merge_from(&other.table, intern_key);
        self.collector.write_barrier(self.id);
        res
    }

    /// Merge a value that converts to a mapping.
    pub fn merge_value(&mut self, other: &Value) -> Result<()> {
        self.modify()?;
        let other = ensure_hash(other)?;
        let other = other
            .try_borrow()
            .map_err(|_| Error::Argument("hash is being modified".into()))?;
        self.merge(&other)
    }

    /// Copy with the same entries, order, class, default and key digests.
    /// The copy is not frozen.
    pub fn dup(&self) -> Result<HashObject> {
        Ok(Self {
            id: ObjectId::fresh(),
            class: self.class,
            frozen: false,
            defaults: self.defaults.clone(),
            table: self.table.copy()?,
            dispatch: self.dispatch.clone(),
            collector: self.collector.clone(),
        })
    }

    /// Replace this map's entries and default with copies of `orig`'s.
    pub fn initialize_copy(&mut self, orig: &HashObject) -> Result<()> {
        if self.class != orig.class {
            return Err(Error::Type(
                "initialize_copy should take same class object".into(),
            ));
        }
        self.modify()?;
        self.table = orig.table.copy()?;
        self.defaults = orig.defaults.clone();
        self.dispatch = orig.dispatch.clone();
        self.collector.write_barrier(self.id);
        Ok(())
    }

    /// Fail unless every key is a symbol (keyword-argument maps).
    pub fn check_kdict(&self) -> Result<()> {
        if self.iter().any(|(k, _)| !matches!(k, Value::Symbol(_))) {
            return Err(Error::Argument(
                "keyword argument hash with non symbol keys".into(),
            ));
        }
        Ok(())
    }

    pub(crate) fn default_state(&self) -> &DefaultState {
        &self.defaults
    }

    /// The static default; nil when unset or when a proc is registered.
    pub fn default_value(&self) -> Value {
        self.defaults.value()
    }

    /// `default(key)`: the static default, or the proc's result for `key`.
    /// A proc default without a key yields nil.
    pub fn default_for(&mut self, key: Option<&Value>) -> Result<Value> {
        match (self.defaults.clone(), key) {
            (DefaultState::Proc(p), Some(k)) => p(self, k),
            (DefaultState::Proc(_), None) | (DefaultState::None, _) => Ok(Value::Nil),
            (DefaultState::Value(v), _) => Ok(v),
        }
    }

    /// Register a static default, replacing any proc. Nil clears it.
    pub fn set_default(&mut self, v: Value) -> Result<()> {
        self.modify()?;
        self.collector.field_write_barrier(self.id, &v);
        self.defaults = DefaultState::from_value(v);
        Ok(())
    }

    pub fn default_proc(&self) -> Option<DefaultProc> {
        self.defaults.proc()
    }

    /// Register a default proc, replacing any static default. `None` clears it.
    pub fn set_default_proc(&mut self, p: Option<DefaultProc>) -> Result<()> {
        self.modify()?;
        self.defaults = DefaultState::from_proc(p);
        self.collector.write_barrier(self.id);
        Ok(())
    }

    /// Release all storage. Safe to call more than once and on frozen maps;
    /// used by the collector when the owner dies.
    pub fn free(&mut self) {
        if self.table.segment_count() > 0 {
            debug!("hash {}: freeing storage", self.id.get());
        }
        self.table.clear();
    }
}

impl Default for HashObject {
    fn default() -> Self {
        Self::new()
    }
}

impl Trace for HashObject {
    fn mark(&self, visit: &mut dyn FnMut(&Value)) {
        self.table.mark(|v| visit(v));
        if let DefaultState::Value(v) = &self.defaults {
            visit(v);
        }
    }

    fn gc_weight(&self) -> usize {
        self.size() * 2
    }
}

impl fmt::Debug for HashObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}
