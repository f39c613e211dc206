use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use segment_hashmap::{HashObject, Value};
use std::time::Duration;

fn lcg(mut s: u64) -> impl Iterator<Item = u64> {
    std::iter::from_fn(move || {
        s = s.wrapping_mul(6364136223846793005).wrapping_add(1);
        Some(s)
    })
}

fn key(n: u64) -> Value {
    Value::str(format!("k{:016x}", n))
}

// Maps here are small on purpose: every lookup is a linear scan.
const N: usize = 256;

fn filled(seed: u64) -> (HashObject, Vec<Value>) {
    let mut m = HashObject::new();
    let keys: Vec<_> = lcg(seed).take(N).map(key).collect();
    for (i, k) in keys.iter().enumerate() {
        m.set(k.clone(), Value::Int(i as i64)).unwrap();
    }
    (m, keys)
}

fn bench_set(c: &mut Criterion) {
    c.bench_function("hash_set_256", |b| {
        let keys: Vec<_> = lcg(1).take(N).map(key).collect();
        b.iter_batched(
            HashObject::new,
            |mut m| {
                for (i, k) in keys.iter().enumerate() {
                    m.set(k.clone(), Value::Int(i as i64)).unwrap();
                }
                black_box(m)
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_get_hit(c: &mut Criterion) {
    c.bench_function("hash_get_hit", |b| {
        let (mut m, keys) = filled(7);
        let mut it = keys.iter().cycle();
        b.iter(|| {
            let k = it.next().unwrap();
            black_box(m.get(k).unwrap());
        })
    });
}

fn bench_get_miss(c: &mut Criterion) {
    c.bench_function("hash_get_miss", |b| {
        let (mut m, _) = filled(11);
        let mut miss = lcg(0xdead_beef);
        b.iter(|| {
            let k = key(miss.next().unwrap());
            black_box(m.get(&k).unwrap());
        })
    });
}

fn bench_delete_front(c: &mut Criterion) {
    c.bench_function("hash_delete_all_front_first", |b| {
        b.iter_batched(
            || filled(13),
            |(mut m, keys)| {
                // Deleting from the front shifts every later entry.
                for k in &keys {
                    m.delete(k).unwrap();
                }
                black_box(m)
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_config() -> Criterion {
    Criterion::default()
        .sample_size(50)
        .measurement_time(Duration::from_secs(8))
        .warm_up_time(Duration::from_secs(2))
}

criterion_group! {
    name = benches;
    config = bench_config();
    targets = bench_set, bench_get_hit, bench_get_miss, bench_delete_front
}
criterion_main!(benches);
