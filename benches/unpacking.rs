use criterion::{Criterion, criterion_group, criterion_main};
use docs_rag::qa::parse_transcript;
use std::fmt::Write;
use std::hint::black_box;

fn synthetic_transcript(blocks: usize) -> String {
    let mut text = String::new();
    for i in 0..blocks {
        let _ = write!(text, "URL: https://docs.example.com/page{}.html\nQ&A:\n", i);
        if i % 10 == 0 {
            text.push_str("NOT ENOUGH INFORMATION\n\n");
            continue;
        }
        for q in 0..4 {
            let _ = write!(
                text,
                "QUESTION: What does setting {} on page {} control?\nANSWER: It controls behavior {}.\n",
                q, i, q
            );
        }
        text.push('\n');
    }
    text
}

pub fn criterion_benchmark(c: &mut Criterion) {
    let transcript = synthetic_transcript(2_000);
    c.bench_function("unpacking", |b| {
        b.iter(|| parse_transcript(black_box(&transcript)))
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
