use criterion::{black_box, criterion_group, criterion_main, Criterion};
use fgc::{Heap, Value};

fn bench_intern_churn(c: &mut Criterion) {
    c.bench_function("intern_10k_unique_strings", |b| {
        b.iter(|| {
            let mut heap = Heap::new();
            for i in 0..10_000 {
                black_box(heap.intern(&format!("s{i}")));
            }
        });
    });
}

fn bench_collect_with_live_set(c: &mut Criterion) {
    c.bench_function("collect_1k_garbage_with_100_live", |b| {
        b.iter(|| {
            let mut heap = Heap::new();
            let mut roots = Vec::new();
            for i in 0..1_000 {
                let s = heap.intern(&format!("s{i}"));
                if i % 10 == 0 {
                    roots.push(Value::Obj(s.cast()));
                }
            }
            heap.collect_garbage(|h| {
                for &r in &roots {
                    h.mark_root(r);
                }
            });
            black_box(heap.bytes_allocated());
        });
    });
}

criterion_group!(benches, bench_intern_churn, bench_collect_with_live_set);
criterion_main!(benches);
