use std::{fmt::Write as _, fs, hint::black_box};

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use specdoc_parser::{Options, parse, parse_file, resolve};

fn parse_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("parser");
    let options = Options::default();

    for name in ["spec", "tables"] {
        let path = format!("tests/fixtures/{name}.adoc");
        let content = fs::read_to_string(&path).expect("Failed to read benchmark fixture file");
        group.bench_with_input(BenchmarkId::new("parse", name), &content, |b, input| {
            b.iter(|| black_box(parse(black_box(input), &options)));
        });
    }

    group.bench_function(BenchmarkId::new("parse_file", "includes"), |b| {
        b.iter(|| black_box(parse_file("tests/fixtures/book.adoc", &options)));
    });

    // Many sections cross-referencing each other by title
    let mut content = String::from("= Generated\n\n");
    for n in 0..500 {
        let _ = write!(
            content,
            "== Section {n}\n\nSee <<Section {}>> and <<section_{}>>.\n\n|===\n| a | b\n| {n} | <<Section {n}>>\n|===\n\n",
            (n + 1) % 500,
            (n + 7) % 500
        );
    }
    group.bench_with_input(
        BenchmarkId::new("parse", "generated"),
        &content,
        |b, input| {
            b.iter(|| black_box(parse(black_box(input), &options)));
        },
    );

    let resolved = parse(&content, &options).expect("Failed to parse generated document");
    group.bench_function(BenchmarkId::new("resolve", "generated"), |b| {
        b.iter_batched(
            || resolved.clone(),
            |mut document| {
                resolve(&mut document, &options);
                black_box(document)
            },
            criterion::BatchSize::LargeInput,
        );
    });

    group.finish();
}

criterion_group!(benches, parse_benchmark);
criterion_main!(benches);
