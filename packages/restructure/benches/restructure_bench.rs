use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use csspress_restructure::{compress, restructure, RestructureOptions};
use csspress_syntax::parse;

fn generated_sheet(rules: usize) -> String {
    let mut source = String::new();
    for i in 0..rules {
        source.push_str(&format!(
            ".card-{} {{ color: #{:03x}; margin-top: {}px; margin-right: 0; margin-bottom: {}px; margin-left: 0 }}\n",
            i,
            i % 4096,
            i % 5,
            i % 5
        ));
        if i % 10 == 0 {
            source.push_str(&format!(
                "@media (max-width: 600px) {{ .card-{} {{ display: none }} }}\n",
                i
            ));
        }
    }
    source
}

fn restructure_small_sheet(c: &mut Criterion) {
    let source = r#"
        .a { color: red; padding: 0 }
        .b { color: red; padding: 0; margin: 0 }
        .a:hover { color: blue }
        @media print { .a { color: black } }
        @media print { .b { color: black } }
    "#;
    let tree = parse(source).expect("benchmark source parses");
    let options = RestructureOptions::default();

    c.bench_function("restructure_small_sheet", |b| {
        b.iter_batched(
            || tree.clone(),
            |mut tree| restructure(black_box(&mut tree), &options),
            BatchSize::SmallInput,
        )
    });
}

fn restructure_large_sheet(c: &mut Criterion) {
    let tree = parse(&generated_sheet(500)).expect("benchmark source parses");
    let options = RestructureOptions::default();

    c.bench_function("restructure_large_sheet_500_rules", |b| {
        b.iter_batched(
            || tree.clone(),
            |mut tree| restructure(black_box(&mut tree), &options),
            BatchSize::LargeInput,
        )
    });
}

fn compress_end_to_end(c: &mut Criterion) {
    let source = generated_sheet(200);
    let options = RestructureOptions::default();

    c.bench_function("compress_end_to_end", |b| {
        b.iter(|| compress(black_box(&source), &options))
    });
}

criterion_group!(
    benches,
    restructure_small_sheet,
    restructure_large_sheet,
    compress_end_to_end
);
criterion_main!(benches);
