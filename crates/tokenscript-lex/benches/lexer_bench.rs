//! Lexer throughput benchmark.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use tokenscript_lex::Lexer;

fn bench_lexer(c: &mut Criterion) {
    let source = r#"
        variable radius: NumberWithUnit = 4px;
        variable scale: Number = 1.25;
        variable accent: Color.Rgb = rgb(255, 128, 0);
        variable label: String = "primary" "button";
        variable i: Number = 0;
        while (i < 10) [
            radius = radius * scale; // grow per step
            i = i + 1;
        ]
        return {component.radius} + radius;
    "#
    .repeat(32);

    c.bench_function("lex_mixed_script", |b| {
        b.iter(|| {
            let tokens = Lexer::new(black_box(&source)).tokenize().unwrap();
            black_box(tokens.len())
        })
    });
}

criterion_group!(benches, bench_lexer);
criterion_main!(benches);
