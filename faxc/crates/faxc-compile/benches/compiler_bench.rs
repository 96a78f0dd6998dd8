use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use faxc_util::Handler;
use fgc::Heap;

const FIBONACCI: &str = r#"
fun fib(n) {
    if (n < 2) return n;
    return fib(n - 1) + fib(n - 2);
}
"#;

fn classes_and_closures(n: usize) -> String {
    let mut source = String::new();
    source.push_str("class Counter {\n  init() { this.n = 0; }\n  bump() { this.n = this.n + 1; return this.n; }\n}\n");
    source.push_str("var c = Counter();\n");
    for i in 0..n {
        source.push_str(&format!("fun make{i}() {{ var x = {i}; fun inner() {{ return x + c.bump(); }} return inner; }}\n"));
    }
    source
}

fn bench_small_function(c: &mut Criterion) {
    let mut group = c.benchmark_group("compile");
    group.throughput(Throughput::Bytes(FIBONACCI.len() as u64));
    group.bench_function("fibonacci_function", |b| {
        b.iter(|| {
            let mut heap = Heap::new();
            let handler = Handler::new();
            black_box(faxc_compile::compile(black_box(FIBONACCI), &mut heap, &handler));
        });
    });
    group.finish();
}

fn bench_many_closures(c: &mut Criterion) {
    let source = classes_and_closures(200);
    let mut group = c.benchmark_group("compile");
    group.throughput(Throughput::Bytes(source.len() as u64));
    group.bench_function("200_classes_and_closures", |b| {
        b.iter(|| {
            let mut heap = Heap::new();
            let handler = Handler::new();
            black_box(faxc_compile::compile(black_box(&source), &mut heap, &handler));
        });
    });
    group.finish();
}

criterion_group!(benches, bench_small_function, bench_many_closures);
criterion_main!(benches);
