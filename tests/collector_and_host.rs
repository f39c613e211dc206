// Collector cooperation and host-object keys.
//
// - Mark: every stored key and value is reported; weight is 2 x size.
// - Barriers: successful mutations notify the collector; failed ones don't.
// - Host objects: object keys use the host's hash/eql?, conversions go
//   through to_hash, host errors abort bulk operations mid-way.
use segment_hashmap::{
    ensure_hash, Collector, Error, HashBuilder, HashObject, HostObject, ObjectId, RString,
    RememberedSet, Result, Trace, Value,
};
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

fn s(x: &str) -> Value {
    Value::str(x)
}

fn tracked() -> (HashObject, Rc<RememberedSet>) {
    let rs = Rc::new(RememberedSet::new());
    let h = HashBuilder::new()
        .segment_capacity(2)
        .unwrap()
        .collector(rs.clone())
        .build();
    (h, rs)
}

/// Object key whose identity is an integer tag.
struct Tagged(i64);

impl HostObject for Tagged {
    fn class_name(&self) -> &str {
        "Tagged"
    }
    fn hash_code(&self) -> Result<i64> {
        Ok(self.0)
    }
    fn eql(&self, other: &Value) -> Result<bool> {
        Ok(match other {
            Value::Object(o) => o.get().hash_code()? == self.0 && o.get().class_name() == "Tagged",
            _ => false,
        })
    }
}

/// A host object that converts to a mapping.
struct HashLike(Rc<RefCell<HashObject>>);

impl HostObject for HashLike {
    fn class_name(&self) -> &str {
        "HashLike"
    }
    fn hash_code(&self) -> Result<i64> {
        Ok(0)
    }
    fn eql(&self, _other: &Value) -> Result<bool> {
        Ok(false)
    }
    fn to_hash(&self) -> Option<Rc<RefCell<HashObject>>> {
        Some(self.0.clone())
    }
}

#[test]
fn mark_visits_every_key_and_value() {
    let (mut h, _) = tracked();
    for i in 0..5 {
        h.set(Value::Int(i), Value::Int(i + 100)).unwrap();
    }
    let mut seen = Vec::new();
    h.mark(&mut |v: &Value| seen.push(v.clone()));
    assert_eq!(seen.len(), 10);
    for i in 0..5 {
        assert!(seen.contains(&Value::Int(i)));
        assert!(seen.contains(&Value::Int(i + 100)));
    }
    assert_eq!(h.gc_weight(), 10);
}

#[test]
fn mark_includes_static_default() {
    let mut h = HashObject::new();
    h.set_default(s("fallback")).unwrap();
    let mut seen = Vec::new();
    h.mark(&mut |v: &Value| seen.push(v.clone()));
    assert_eq!(seen, vec![s("fallback")]);
    assert_eq!(h.gc_weight(), 0);
}

#[test]
fn set_barriers_heap_children() {
    let (mut h, rs) = tracked();
    h.set(Value::Int(1), Value::Int(2)).unwrap();
    assert!(rs.is_empty(), "immediates need no barrier");
    h.set(Value::Int(1), s("heap")).unwrap();
    assert!(rs.contains(h.id()));
}

/// Collector that keeps every child handed to a field barrier.
#[derive(Default)]
struct Recorder(RefCell<Vec<Value>>);

impl Collector for Recorder {
    fn field_write_barrier(&self, _owner: ObjectId, child: &Value) {
        self.0.borrow_mut().push(child.clone());
    }
    fn write_barrier(&self, _owner: ObjectId) {}
}

#[test]
fn set_barriers_the_stored_key_not_the_callers() {
    let rec = Rc::new(Recorder::default());
    let mut h = HashBuilder::new().collector(rec.clone()).build();
    let caller = RString::new("key");
    h.set(Value::String(caller.clone()), Value::Int(1)).unwrap();

    let keys = h.keys();
    let stored = keys[0].as_str().unwrap();
    let barriered = rec.0.borrow()[0].clone();
    let barriered = barriered.as_str().unwrap().clone();
    assert!(barriered.ptr_eq(stored));
    assert!(!barriered.ptr_eq(&caller));

    // An update barriers the key already held, not the new lookup key.
    rec.0.borrow_mut().clear();
    h.set(Value::str("key"), Value::Int(2)).unwrap();
    let barriered = rec.0.borrow()[0].clone();
    assert!(barriered.as_str().unwrap().ptr_eq(stored));
    assert_eq!(rec.0.borrow()[1], Value::Int(2));
}

#[test]
fn merge_and_delete_barrier_owner() {
    let (mut a, rs) = tracked();
    let mut b = HashObject::new();
    b.set(Value::Int(1), Value::Int(1)).unwrap();
    a.merge(&b).unwrap();
    assert_eq!(rs.drain(), vec![a.id()]);

    a.delete(&Value::Int(1)).unwrap();
    assert_eq!(rs.drain(), vec![a.id()]);

    a.delete(&Value::Int(1)).unwrap();
    assert!(rs.is_empty(), "a miss is not a mutation");
}

#[test]
fn frozen_failure_does_not_barrier() {
    let (mut h, rs) = tracked();
    h.freeze();
    assert!(h.set(s("k"), s("v")).is_err());
    assert_eq!(rs.barrier_count(), 0);
}

#[test]
fn free_is_safe_to_repeat() {
    let (mut h, _) = tracked();
    for i in 0..7 {
        h.set(Value::Int(i), Value::Nil).unwrap();
    }
    h.free();
    h.free();
    assert_eq!(h.size(), 0);
    assert_eq!(h.gc_weight(), 0);
}

#[test]
fn object_keys_use_host_eql() {
    let mut h = HashObject::new();
    h.set(Value::object(Tagged(7)), s("seven")).unwrap();
    h.set(Value::object(Tagged(7)), s("SEVEN")).unwrap();
    h.set(Value::object(Tagged(8)), s("eight")).unwrap();
    assert_eq!(h.size(), 2);
    assert_eq!(h.get(&Value::object(Tagged(7))).unwrap(), s("SEVEN"));
    assert!(!h.has_key(&Value::Int(7)).unwrap());
    assert_eq!(
        h.key_digest(&Value::object(Tagged(3))).unwrap(),
        h.key_digest(&Value::object(Tagged(3))).unwrap()
    );
}

#[test]
fn host_error_leaves_merge_partial() {
    struct Grumpy(Rc<Cell<u32>>);
    impl HostObject for Grumpy {
        fn class_name(&self) -> &str {
            "Grumpy"
        }
        fn hash_code(&self) -> Result<i64> {
            Ok(0)
        }
        fn eql(&self, _other: &Value) -> Result<bool> {
            let n = self.0.get() + 1;
            self.0.set(n);
            if n == 3 {
                Err(Error::Raised("grumpy".into()))
            } else {
                Ok(false)
            }
        }
    }

    let calls = Rc::new(Cell::new(0));
    let mut dst = HashObject::new();
    dst.set(Value::object(Grumpy(calls.clone())), Value::Nil).unwrap();
    let mut src = HashObject::new();
    for i in 0..5 {
        src.set(Value::Int(i), Value::Int(i)).unwrap();
    }
    calls.set(0);
    let err = dst.merge(&src).unwrap_err();
    assert_eq!(err, Error::Raised("grumpy".into()));
    assert_eq!(dst.size(), 3);
    assert_eq!(dst.keys()[1..], [Value::Int(0), Value::Int(1)]);
}

#[test]
fn merge_value_converts_through_to_hash() {
    let inner = Rc::new(RefCell::new(HashObject::new()));
    inner.borrow_mut().set(s("x"), Value::Int(1)).unwrap();
    let like = Value::object(HashLike(inner.clone()));

    let mut h = HashObject::new();
    h.merge_value(&like).unwrap();
    assert_eq!(h.keys(), vec![s("x")]);

    assert!(ensure_hash(&like).is_ok());
    let err = h.merge_value(&Value::Int(3)).unwrap_err();
    assert_eq!(err, Error::Type("can't convert Integer into Hash".into()));
    let err = h.merge_value(&Value::object(Tagged(1))).unwrap_err();
    assert_eq!(err, Error::Type("can't convert Tagged into Hash".into()));
}

#[test]
fn host_eql_may_read_the_same_map() {
    struct Peek {
        map: Weak<RefCell<HashObject>>,
        saw: Rc<Cell<Option<bool>>>,
    }
    impl HostObject for Peek {
        fn class_name(&self) -> &str {
            "Peek"
        }
        fn hash_code(&self) -> Result<i64> {
            Ok(0)
        }
        fn eql(&self, _other: &Value) -> Result<bool> {
            if let Some(m) = self.map.upgrade() {
                self.saw.set(Some(m.borrow().has_key(&Value::Int(42))?));
            }
            Ok(false)
        }
    }

    let map = Rc::new(RefCell::new(HashObject::new()));
    let saw = Rc::new(Cell::new(None));
    map.borrow_mut().set(Value::Int(42), Value::Nil).unwrap();
    let peek = Peek {
        map: Rc::downgrade(&map),
        saw: saw.clone(),
    };
    map.borrow_mut().set(Value::object(peek), Value::Nil).unwrap();

    assert!(!map.borrow().has_key(&Value::Int(1)).unwrap());
    assert_eq!(saw.get(), Some(true));
}
