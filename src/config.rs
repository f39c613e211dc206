//! Construction options and the `HashBuilder` for maps.

use crate::default::{DefaultProc, DefaultState};
use crate::error::{Error, Result};
use crate::hash::HashObject;
use crate::lifecycle::{Collector, NoopCollector};
use crate::seglist::DEFAULT_SEGMENT_CAPACITY;
use crate::value::Value;
use core::fmt;
use std::rc::Rc;

/// Class of a map object. Copy-construction requires matching classes.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct ClassTag(pub &'static str);

impl Default for ClassTag {
    fn default() -> Self {
        ClassTag("Hash")
    }
}

/// Construction options for a [`HashObject`].
pub struct Config {
    pub(crate) segment_capacity: usize,
    pub(crate) collector: Rc<dyn Collector>,
    pub(crate) class: ClassTag,
    pub(crate) default: DefaultState,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Slots per storage segment. Must be greater than 0.
    pub fn segment_capacity(mut self, capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(Error::Argument("segment capacity must be greater than 0".into()));
        }
        self.segment_capacity = capacity;
        Ok(self)
    }

    pub fn collector(mut self, collector: Rc<dyn Collector>) -> Self {
        self.collector = collector;
        self
    }

    pub fn class(mut self, class: ClassTag) -> Self {
        self.class = class;
        self
    }

    /// Static default. Conflicts with a previously given default proc.
    pub fn default_value(mut self, v: Value) -> Result<Self> {
        if self.default.is_proc() {
            return Err(Error::Argument("wrong number of arguments".into()));
        }
        self.default = DefaultState::from_value(v);
        Ok(self)
    }

    /// Default proc. Conflicts with a previously given static default.
    pub fn default_proc(mut self, p: DefaultProc) -> Result<Self> {
        if self.default.has_default() && !self.default.is_proc() {
            return Err(Error::Argument("wrong number of arguments".into()));
        }
        self.default = DefaultState::Proc(p);
        Ok(self)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            segment_capacity: DEFAULT_SEGMENT_CAPACITY,
            collector: Rc::new(NoopCollector),
            class: ClassTag::default(),
            default: DefaultState::None,
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("segment_capacity", &self.segment_capacity)
            .field("class", &self.class)
            .field("default", &self.default)
            .finish_non_exhaustive()
    }
}

/// Builder for a [`HashObject`] with custom configuration.
#[derive(Debug, Default)]
pub struct HashBuilder {
    config: Config,
}

impl HashBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn segment_capacity(mut self, capacity: usize) -> Result<Self> {
        self.config = self.config.segment_capacity(capacity)?;
        Ok(self)
    }

    pub fn collector(mut self, collector: Rc<dyn Collector>) -> Self {
        self.config = self.config.collector(collector);
        self
    }

    pub fn class(mut self, class: ClassTag) -> Self {
        self.config = self.config.class(class);
        self
    }

    pub fn default_value(mut self, v: Value) -> Result<Self> {
        self.config = self.config.default_value(v)?;
        Ok(self)
    }

    pub fn default_proc(mut self, p: DefaultProc) -> Result<Self> {
        self.config = self.config.default_proc(p)?;
        Ok(self)
    }

    pub fn build(self) -> HashObject {
        HashObject::with_config(self.config)
    }
}
