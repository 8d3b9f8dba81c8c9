use criterion::{Criterion, black_box, criterion_group, criterion_main};

use tingli::audio::{AudioResolver, Catalog};
use tingli::romanize::{Answer, HanziRomanizer, apply_tone_mark, resolve};

const SOURCE: &[&str] = &[
    "你好", "妈妈", "谢谢", "米饭", "咖啡", "喜欢", "中国", "学生", "老师", "朋友",
];

fn bench_resolve(c: &mut Criterion) {
    let romanizer = HanziRomanizer;

    c.bench_function("resolve (10 words)", |b| {
        b.iter(|| resolve(&romanizer, black_box(SOURCE)))
    });
}

fn bench_tone_marks(c: &mut Criterion) {
    let syllables = ["zhuang", "lv", "xiong", "gui", "liu", "er", "a"];

    c.bench_function("apply_tone_mark (7 syllables x 5 tones)", |b| {
        b.iter(|| {
            for s in syllables {
                for tone in 1..=5 {
                    black_box(apply_tone_mark(black_box(s), tone));
                }
            }
        })
    });
}

fn bench_answer_folding(c: &mut Criterion) {
    let inputs = ["ni3", "  Nǐ ", "lü4", "zhuang 1", "LǙ"];

    c.bench_function("Answer::parse (5 inputs)", |b| {
        b.iter(|| {
            for input in inputs {
                black_box(Answer::parse(black_box(input)));
            }
        })
    });
}

fn bench_audio_lookup(c: &mut Criterion) {
    let items = resolve(&HanziRomanizer, SOURCE);
    let units: Vec<_> = items.iter().flat_map(|i| i.units.clone()).collect();

    c.bench_function("AudioResolver::resolve cold (embedded catalog)", |b| {
        b.iter(|| {
            let resolver = AudioResolver::new(Catalog::embedded(), "/audio");
            for unit in &units {
                black_box(resolver.resolve(unit));
            }
        })
    });

    let warm = AudioResolver::new(Catalog::embedded(), "/audio");
    c.bench_function("AudioResolver::resolve memoized", |b| {
        b.iter(|| {
            for unit in &units {
                black_box(warm.resolve(unit));
            }
        })
    });
}

criterion_group!(
    benches,
    bench_resolve,
    bench_tone_marks,
    bench_answer_folding,
    bench_audio_lookup
);
criterion_main!(benches);
