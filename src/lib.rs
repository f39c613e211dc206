//! segment-hashmap: the insertion-ordered map behind a dynamic language's
//! `Hash` type, storing runtime-typed keys in a chain of small segments.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: dense, allocation-sparse storage for small and medium maps on
//!   memory-constrained targets, trading lookup speed for footprint.
//! - Layers:
//!   - KeyDispatch: hash digest and equality over `Value` kinds. Integers
//!     and floats that compare equal are the same key.
//!   - SegList: fixed-capacity segments in a slotmap arena, linked head to
//!     tail. Linear scans for every lookup; deletes compact in place.
//!   - HashObject: the owner. Frozen check, string-key interning, default
//!     value or proc on a miss, write barriers toward the collector.
//!
//! Constraints
//! - Single-threaded: `!Send`/`!Sync` (values are `Rc` handles).
//! - One heap allocation per segment; no per-entry index.
//! - Every operation is O(n) in the entry count.
//! - Storage order equals insertion order; updates keep their position.
//!
//! Keys
//! - A mutable string key is duplicated and frozen before it is stored, so
//!   later mutation of the caller's string cannot change a stored key.
//!   Frozen strings are stored by reference.
//! - Object keys defer to the host's `hash`/`eql?` through `HostObject`.
//!   Errors from host code abort the running operation and propagate.
//!
//! Reentrancy policy
//! - Host `eql?`/`==`/`hash` run during a scan with the map shared-borrowed,
//!   so they may read the same map but cannot mutate it.
//! - Default procs run after the scan and receive `&mut HashObject`; nested
//!   mutation from a proc is legal and still subject to the frozen check.
//! - Iteration borrows the map, so mutation during iteration does not
//!   compile.
//!
//! Collector cooperation
//! - `Trace::mark` reports every stored key and value (plus a static
//!   default); `gc_weight` is twice the entry count.
//! - Successful mutations call the configured `Collector`'s barriers. The
//!   default collector does nothing.
//!
//! Notes and non-goals
//! - No hashed index, no thread-safe mutation, no serialization.
//! - `merge` is not transactional.

pub mod config;
pub mod default;
pub mod error;
pub mod hash;
pub mod key_dispatch;
pub mod lifecycle;
pub mod seglist;
mod seglist_proptest;
pub mod value;

// Public surface
pub use config::{ClassTag, Config, HashBuilder};
pub use default::{default_proc, DefaultProc, DefaultState};
pub use error::{Error, Result};
pub use hash::{ensure_hash, HashObject, Shift};
pub use key_dispatch::{values_equal, KeyDispatch};
pub use lifecycle::{Collector, NoopCollector, ObjectId, RememberedSet, Trace};
pub use seglist::SegList;
pub use value::{HostObject, Kind, ObjectRef, RString, Sym, Value};
