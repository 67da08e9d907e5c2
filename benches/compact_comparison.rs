use core::hash::BuildHasherDefault;
use core::hint::black_box;

use compact_hash::CompactHashMap;
use compact_hash::Utf8I32Translator;
use criterion::AxisScale;
use criterion::BatchSize;
use criterion::Criterion;
use criterion::PlotConfiguration;
use criterion::Throughput;
use criterion::criterion_group;
use criterion::criterion_main;
use hashbrown::HashMap as HashbrownMap;
use rand::Rng;
use rand::SeedableRng;
use rand::TryRngCore;
use rand::distr;
use rand::rngs::OsRng;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand_distr::Zipf;
use siphasher::sip::SipHasher;

type Sip = BuildHasherDefault<SipHasher>;
type Compact = CompactHashMap<Utf8I32Translator<Sip>>;
type Hashbrown = HashbrownMap<String, i32, Sip>;

const SIZES: &[usize] = &[
    (1 << 10),
    (1 << 12),
    (1 << 14),
    (1 << 16),
    (1 << 18),
];

fn key(n: u64) -> String {
    format!("key_{:016X}", n)
}

fn compact() -> Compact {
    CompactHashMap::new(Utf8I32Translator::with_hasher(Sip::default()))
}

fn hashbrown() -> Hashbrown {
    HashbrownMap::with_hasher(Sip::default())
}

fn random_entries(size: usize) -> Vec<(String, i32)> {
    let mut rng = OsRng;
    (0..size)
        .map(|_| {
            let n = rng.try_next_u64().unwrap();
            (key(n), n as i32)
        })
        .collect()
}

fn bench_insert_random(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert_random");
    group.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Logarithmic));

    for &size in SIZES {
        let entries = random_entries(size);
        group.throughput(Throughput::Elements(size as u64));

        group.bench_function(format!("compact/{size}"), |b| {
            b.iter_batched(
                || {
                    let mut entries = entries.clone();
                    entries.shuffle(&mut SmallRng::from_os_rng());
                    entries
                },
                |entries| {
                    let mut map = compact();
                    for (key, value) in entries {
                        black_box(map.insert(key, value));
                    }
                    black_box(map)
                },
                BatchSize::SmallInput,
            )
        });

        group.bench_function(format!("hashbrown/{size}"), |b| {
            b.iter_batched(
                || {
                    let mut entries = entries.clone();
                    entries.shuffle(&mut SmallRng::from_os_rng());
                    entries
                },
                |entries| {
                    let mut map = hashbrown();
                    for (key, value) in entries {
                        black_box(map.insert(key, value));
                    }
                    black_box(map)
                },
                BatchSize::SmallInput,
            )
        });
    }

    group.finish();
}

fn bench_find_hit_miss(c: &mut Criterion) {
    let mut group = c.benchmark_group("find_hit_miss");
    group.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Logarithmic));

    for &size in SIZES {
        let entries = random_entries(size);
        let mut queries: Vec<String> = entries
            .iter()
            .map(|(key, _)| key.clone())
            .chain(random_entries(size).into_iter().map(|(key, _)| key))
            .collect();
        queries.shuffle(&mut SmallRng::from_os_rng());

        let mut compact_map = compact();
        compact_map.extend(entries.iter().cloned());
        let hashbrown_map: Hashbrown = {
            let mut map = hashbrown();
            map.extend(entries.iter().cloned());
            map
        };

        group.throughput(Throughput::Elements(queries.len() as u64));
        group.bench_function(format!("compact/{size}"), |b| {
            b.iter(|| {
                for query in &queries {
                    black_box(compact_map.get(query));
                }
            })
        });
        group.bench_function(format!("hashbrown/{size}"), |b| {
            b.iter(|| {
                for query in &queries {
                    black_box(hashbrown_map.get(query));
                }
            })
        });
    }

    group.finish();
}

fn bench_remove(c: &mut Criterion) {
    let mut group = c.benchmark_group("remove");
    group.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Logarithmic));

    for &size in SIZES {
        let entries = random_entries(size);
        let mut compact_map = compact();
        compact_map.extend(entries.iter().cloned());
        let mut hashbrown_map = hashbrown();
        hashbrown_map.extend(entries.iter().cloned());

        group.throughput(Throughput::Elements(size as u64));
        group.bench_function(format!("compact/{size}"), |b| {
            b.iter_batched(
                || compact_map.clone(),
                |mut map| {
                    for (key, _) in &entries {
                        black_box(map.remove(key));
                    }
                    black_box(map)
                },
                BatchSize::LargeInput,
            )
        });
        group.bench_function(format!("hashbrown/{size}"), |b| {
            b.iter_batched(
                || hashbrown_map.clone(),
                |mut map| {
                    for (key, _) in &entries {
                        black_box(map.remove(key));
                    }
                    black_box(map)
                },
                BatchSize::LargeInput,
            )
        });
    }

    group.finish();
}

fn bench_iteration(c: &mut Criterion) {
    let mut group = c.benchmark_group("iteration");
    group.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Logarithmic));

    for &size in SIZES {
        let entries = random_entries(size);
        let mut compact_map = compact();
        compact_map.extend(entries.iter().cloned());
        let mut hashbrown_map = hashbrown();
        hashbrown_map.extend(entries.iter().cloned());

        group.throughput(Throughput::Elements(size as u64));
        group.bench_function(format!("compact/{size}"), |b| {
            b.iter(|| {
                for entry in &compact_map {
                    black_box(entry);
                }
            })
        });
        group.bench_function(format!("hashbrown/{size}"), |b| {
            b.iter(|| {
                for entry in &hashbrown_map {
                    black_box(entry);
                }
            })
        });
    }

    group.finish();
}

fn bench_churn(c: &mut Criterion) {
    let mut group = c.benchmark_group("churn");
    group.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Logarithmic));

    for &size in SIZES {
        // Every key appears twice: the first visit inserts, the second removes.
        let mut operations: Vec<String> = (0..size as u64).flat_map(|n| [key(n), key(n)]).collect();
        operations.shuffle(&mut SmallRng::from_os_rng());

        group.throughput(Throughput::Elements(operations.len() as u64));
        group.bench_function(format!("compact/{size}"), |b| {
            b.iter(|| {
                let mut map = compact();
                for key in &operations {
                    if map.remove(key).is_none() {
                        map.insert(key.clone(), 1);
                    }
                }
                black_box(map)
            })
        });
        group.bench_function(format!("hashbrown/{size}"), |b| {
            b.iter(|| {
                let mut map = hashbrown();
                for key in &operations {
                    if map.remove(key).is_none() {
                        map.insert(key.clone(), 1);
                    }
                }
                black_box(map)
            })
        });
    }

    group.finish();
}

#[derive(Clone, Copy)]
enum Operation {
    Insert,
    Remove,
    Find,
}

fn bench_mixed_probabilistic_zipf(c: &mut Criterion) {
    const KEY_SPACE_MULTIPLIER: usize = 2;

    let mut group = c.benchmark_group("mixed_probabilistic_zipf");
    group.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Logarithmic));

    for &size in SIZES {
        let mut rng = SmallRng::from_os_rng();
        let operations: Vec<Operation> = (0..size * 3)
            .map(|_| match rng.sample(distr::Uniform::new(0, 10).unwrap()) {
                0..=3 => Operation::Insert,
                4..=5 => Operation::Remove,
                _ => Operation::Find,
            })
            .collect();
        let insert_distr = Zipf::new(size as f32 - 1.0, 1.0).unwrap();
        let find_remove_distr =
            Zipf::new((size * KEY_SPACE_MULTIPLIER) as f32 - 1.0, 1.0).unwrap();

        group.throughput(Throughput::Elements(operations.len() as u64));
        group.bench_function(format!("compact/{size}"), |b| {
            let mut rng = SmallRng::from_os_rng();
            b.iter(|| {
                let mut map = compact();
                for operation in &operations {
                    match operation {
                        Operation::Insert => {
                            let n = rng.sample(&insert_distr) as u64;
                            black_box(map.insert(key(n), n as i32));
                        }
                        Operation::Remove => {
                            let n = rng.sample(&find_remove_distr) as u64;
                            black_box(map.remove(&key(n)));
                        }
                        Operation::Find => {
                            let n = rng.sample(&find_remove_distr) as u64;
                            black_box(map.get(&key(n)));
                        }
                    }
                }
                black_box(map)
            })
        });
        group.bench_function(format!("hashbrown/{size}"), |b| {
            let mut rng = SmallRng::from_os_rng();
            b.iter(|| {
                let mut map = hashbrown();
                for operation in &operations {
                    match operation {
                        Operation::Insert => {
                            let n = rng.sample(&insert_distr) as u64;
                            black_box(map.insert(key(n), n as i32));
                        }
                        Operation::Remove => {
                            let n = rng.sample(&find_remove_distr) as u64;
                            black_box(map.remove(&key(n)));
                        }
                        Operation::Find => {
                            let n = rng.sample(&find_remove_distr) as u64;
                            black_box(map.get(&key(n)));
                        }
                    }
                }
                black_box(map)
            })
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_insert_random,
    bench_find_hit_miss,
    bench_remove,
    bench_iteration,
    bench_churn,
    bench_mixed_probabilistic_zipf,
);

criterion_main!(benches);
