#![cfg(test)]

// Model-based property tests for SegList, kept inside the crate so they can
// check the private segment invariants after every step.

use crate::seglist::SegList;
use crate::value::Value;
use proptest::prelude::*;

#[derive(Clone, Debug)]
enum Op {
    // `as_float` stores or looks up the key as an equal-valued float.
    Put(i64, i64, bool),
    Remove(i64, bool),
    Get(i64, bool),
    PopFront,
    Clear,
    Copy,
}

fn key(k: i64, as_float: bool) -> Value {
    if as_float {
        Value::Float(k as f64)
    } else {
        Value::Int(k)
    }
}

fn arb_op() -> impl Strategy<Value = Op> {
    let k = 0i64..8;
    prop_oneof![
        6 => (k.clone(), any::<i64>(), any::<bool>()).prop_map(|(k, v, f)| Op::Put(k, v, f)),
        3 => (k.clone(), any::<bool>()).prop_map(|(k, f)| Op::Remove(k, f)),
        2 => (k, any::<bool>()).prop_map(|(k, f)| Op::Get(k, f)),
        1 => Just(Op::PopFront),
        1 => Just(Op::Copy),
        1 => Just(Op::Clear),
    ]
}

fn model_index(model: &[(i64, i64)], k: i64) -> Option<usize> {
    model.iter().position(|(mk, _)| *mk == k)
}

fn as_int(v: &Value) -> i64 {
    match v {
        Value::Int(i) => *i,
        Value::Float(x) => *x as i64,
        other => panic!("unexpected value {:?}", other),
    }
}

proptest! {
    // Invariant: after every operation, SegList matches an ordered Vec model
    // (keys in first-insertion order, values last-written) and the segment
    // chain is well formed: all but the tail full, tail non-empty unless it
    // is the only segment, counter equal to populated slots.
    #[test]
    fn prop_seglist_matches_ordered_model(
        cap in 1usize..=4,
        ops in proptest::collection::vec(arb_op(), 1..120),
    ) {
        let mut list = SegList::with_segment_capacity(cap);
        let mut model: Vec<(i64, i64)> = Vec::new();

        for op in ops {
            match op {
                Op::Put(k, v, f) => {
                    let appended = list.put(key(k, f), Value::Int(v)).unwrap();
                    match model_index(&model, k) {
                        Some(i) => {
                            prop_assert!(!appended);
                            model[i].1 = v;
                        }
                        None => {
                            prop_assert!(appended);
                            model.push((k, v));
                        }
                    }
                }
                Op::Remove(k, f) => {
                    let got = list.remove(&key(k, f)).unwrap().map(|(_, v)| as_int(&v));
                    let want = model_index(&model, k).map(|i| model.remove(i).1);
                    prop_assert_eq!(got, want);
                }
                Op::Get(k, f) => {
                    let got = list.get(&key(k, f)).unwrap().map(as_int);
                    let want = model_index(&model, k).map(|i| model[i].1);
                    prop_assert_eq!(got, want);
                }
                Op::PopFront => {
                    let got = list.pop_front().map(|(k, v)| (as_int(&k), as_int(&v)));
                    let want = if model.is_empty() { None } else { Some(model.remove(0)) };
                    prop_assert_eq!(got, want);
                }
                Op::Copy => {
                    list = list.copy().unwrap();
                }
                Op::Clear => {
                    list.clear();
                    model.clear();
                }
            }

            list.check_invariants();
            prop_assert_eq!(list.len(), model.len());
            let seen: Vec<(i64, i64)> = list
                .iter()
                .map(|(k, v)| (as_int(k), as_int(v)))
                .collect();
            prop_assert_eq!(&seen, &model);
        }
    }
}
