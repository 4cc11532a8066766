use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use gramzip::{compress, decompress, Sequitur};

/// Highly repetitive data: one pangram cycled out to the requested length.
fn repetitive(len: usize) -> Vec<u8> {
    b"pack my box with five dozen liquor jugs. "
        .iter()
        .copied()
        .cycle()
        .take(len)
        .collect()
}

/// Line-structured data: a fixed request shape with varying numeric
/// fields, the kind of mixed repetition a log file shows.
fn log_like(len: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(len + 64);
    let mut seq = 0u32;
    while out.len() < len {
        let line = format!("GET /api/v1/items/{seq} 200 {}us\n", (seq % 17) * 31);
        out.extend_from_slice(line.as_bytes());
        seq += 1;
    }
    out.truncate(len);
    out
}

/// Bytes with almost no digram structure, from a xorshift generator.
fn noisy(len: usize) -> Vec<u8> {
    let mut state = 0x9E37_79B9_7F4A_7C15u64;
    (0..len)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            (state >> 56) as u8
        })
        .collect()
}

fn datasets(len: usize) -> [(&'static str, Vec<u8>); 3] {
    [
        ("repetitive", repetitive(len)),
        ("log_like", log_like(len)),
        ("noisy", noisy(len)),
    ]
}

fn bench_engine(c: &mut Criterion) {
    let sizes = [1_000, 10_000, 100_000];
    let mut group = c.benchmark_group("engine");

    for size in sizes.iter() {
        for (name, data) in datasets(*size) {
            group.bench_with_input(BenchmarkId::new(name, size), &data, |b, data| {
                b.iter(|| {
                    let mut seq = Sequitur::new();
                    seq.extend(black_box(data.iter().copied()));
                    black_box(seq)
                });
            });
        }
    }

    group.finish();
}

fn bench_compress(c: &mut Criterion) {
    let sizes = [1_000, 10_000, 100_000];
    let mut group = c.benchmark_group("compress");

    for size in sizes.iter() {
        for (name, data) in datasets(*size) {
            group.bench_with_input(BenchmarkId::new(name, size), &data, |b, data| {
                b.iter(|| {
                    let mut out = Vec::new();
                    compress(black_box(&data[..]), &mut out, 16).unwrap();
                    black_box(out)
                });
            });
        }
    }

    group.finish();
}

fn bench_decompress(c: &mut Criterion) {
    let sizes = [1_000, 10_000, 100_000];
    let mut group = c.benchmark_group("decompress");

    for size in sizes.iter() {
        for (name, data) in datasets(*size) {
            let mut compressed = Vec::new();
            compress(&data[..], &mut compressed, 16).unwrap();

            group.bench_with_input(
                BenchmarkId::new(name, size),
                &compressed,
                |b, compressed| {
                    b.iter(|| {
                        let mut out = Vec::new();
                        decompress(black_box(&compressed[..]), &mut out).unwrap();
                        black_box(out)
                    });
                },
            );
        }
    }

    group.finish();
}

/// Print compression statistics comparison (not a timed benchmark)
fn print_compression_stats(c: &mut Criterion) {
    let mut group = c.benchmark_group("compression_stats");
    group.sample_size(10);

    eprintln!("\n{:=^72}", " Compression Statistics ");
    eprintln!(
        "{:<25} {:>10} {:>10} {:>10} {:>12}",
        "Dataset", "Input", "Rules", "Symbols", "Compressed"
    );
    eprintln!("{:-<72}", "");

    for size in [1_000, 10_000, 100_000] {
        for (name, data) in datasets(size) {
            let mut seq = Sequitur::new();
            seq.extend(data.iter().copied());
            let stats = seq.stats();

            let mut compressed = Vec::new();
            compress(&data[..], &mut compressed, 1024).unwrap();

            eprintln!(
                "{:<25} {:>10} {:>10} {:>10} {:>12}",
                format!("{}_{}", name, size),
                size,
                stats.num_rules,
                stats.grammar_symbols,
                compressed.len()
            );
        }
    }

    eprintln!("{:=<72}\n", "");

    // Dummy benchmark to satisfy criterion
    group.bench_function("stats_printed", |b| b.iter(|| black_box(1)));
    group.finish();
}

criterion_group!(
    benches,
    bench_engine,
    bench_compress,
    bench_decompress,
    print_compression_stats,
);
criterion_main!(benches);
